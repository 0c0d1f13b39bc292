//! Frame capture and rate gating
//!
//! [`CaptureLoop`] turns an externally driven tick (render loop, timer)
//! into a bounded stream of frame submissions. Time is accumulated
//! across ticks and a frame is only captured once a full frame interval
//! has elapsed, so the inference graph never sees more than the target
//! rate regardless of how fast the host ticks. Ticks where the source
//! has no new frame keep the accumulated budget, so capture resumes at
//! the first ready tick instead of waiting out another interval.

pub mod source;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::graph::{PixelFormat, VideoFrame};
use crate::session::TrackingSession;

use self::source::ImageSource;

/// Reusable pixel storage for captured frames.
///
/// The backing allocation survives across frames and is only replaced
/// when the frame dimensions change.
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(format: PixelFormat) -> Self {
        Self {
            width: 0,
            height: 0,
            format,
            data: Vec::new(),
        }
    }

    /// Size the buffer for the given dimensions. Returns true when the
    /// allocation was replaced, false when the existing one fit.
    pub fn ensure(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        let len = width as usize * height as usize * self.format.bytes_per_pixel();
        self.width = width;
        self.height = height;
        self.data = vec![0; len];
        true
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// What a single capture tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not enough time accumulated yet.
    Gated,
    /// The source had no new frame; accumulated time is kept.
    SourceNotReady,
    /// A frame was captured and submitted.
    Submitted,
    /// The interval elapsed but the frame could not be submitted.
    Skipped,
}

pub struct CaptureLoop {
    target_fps: f32,
    accumulator: Duration,
    buffer: PixelBuffer,
    submitted: Arc<AtomicU32>,
}

impl CaptureLoop {
    pub fn new(target_fps: f32) -> Self {
        Self {
            target_fps,
            accumulator: Duration::ZERO,
            buffer: PixelBuffer::new(PixelFormat::Rgba8),
            submitted: Arc::new(AtomicU32::new(0)),
        }
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.target_fps)
    }

    /// Advance the loop by `dt` and capture a frame if one is due.
    pub fn tick(
        &mut self,
        dt: Duration,
        source: &mut dyn ImageSource,
        session: &mut TrackingSession,
    ) -> TickOutcome {
        self.accumulator += dt;

        if !source.did_update() {
            return TickOutcome::SourceNotReady;
        }
        let (width, height) = source.dimensions();
        if width == 0 || height == 0 {
            return TickOutcome::SourceNotReady;
        }

        if self.accumulator < self.frame_interval() {
            return TickOutcome::Gated;
        }
        self.accumulator = Duration::ZERO;

        let timestamp = session.current_timestamp();
        if !timestamp.is_set() {
            tracing::debug!("Dropping frame: no running graph to stamp it for");
            return TickOutcome::Skipped;
        }

        self.buffer.ensure(width, height);
        if let Err(error) = source.read_pixels(&mut self.buffer) {
            tracing::warn!("Frame read failed: {}", error);
            return TickOutcome::Skipped;
        }

        let frame = VideoFrame {
            format: self.buffer.format(),
            width: self.buffer.width(),
            height: self.buffer.height(),
            stride: self.buffer.stride(),
            data: self.buffer.data(),
        };
        match session.submit_frame(&frame, timestamp) {
            Ok(()) => {
                self.submitted.fetch_add(1, Ordering::Relaxed);
                TickOutcome::Submitted
            }
            Err(error) => {
                tracing::warn!("Frame submit failed: {}", error);
                TickOutcome::Skipped
            }
        }
    }

    /// Change the target capture rate. Non-positive values are ignored.
    pub fn set_target_fps(&mut self, fps: f32) {
        if fps <= 0.0 {
            tracing::warn!("Ignoring non-positive target fps {}", fps);
            return;
        }
        self.target_fps = fps;
        tracing::debug!("Target capture rate set to {} fps", fps);
    }

    pub fn target_fps(&self) -> f32 {
        self.target_fps
    }

    /// Counter incremented once per submitted frame, shared with the
    /// rate reporter.
    pub fn submitted_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.submitted)
    }

    pub fn submitted_count(&self) -> u32 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }
}

/// Publish the number of frames submitted during each elapsed second.
///
/// The counter is swapped to zero on every report, so each published
/// value is the rate for exactly one window.
pub fn spawn_rate_reporter(
    counter: Arc<AtomicU32>,
    rate_tx: broadcast::Sender<u32>,
    mut quit_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_secs(1);
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let rate = counter.swap(0, Ordering::Relaxed);
                    let _ = rate_tx.send(rate);
                }
                result = quit_rx.changed() => {
                    if result.is_err() || *quit_rx.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("Rate reporter stopped");
    })
}
