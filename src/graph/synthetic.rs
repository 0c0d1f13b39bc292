//! Synthetic inference graph
//!
//! A self-contained stand-in for the real holistic engine: a worker
//! thread that answers every submitted frame with deterministic landmark
//! output through the registered stream callbacks. Callbacks run on the
//! worker thread, which exercises the same foreign-thread dispatch path
//! the real engine uses.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crate::error::GraphError;
use crate::graph::{
    streams, GraphFactory, InferenceGraph, OutputPacket, PacketCallback, PacketStatus, SideConfig,
    Timestamp, VideoFrame,
};
use crate::landmark::{Classification, ClassificationSet, LandmarkPoint, LandmarkSet};

/// Points in a pose landmark list.
pub const POSE_POINTS: usize = 33;
/// Points in a hand landmark list.
pub const HAND_POINTS: usize = 21;
/// Points in the base face mesh.
pub const FACE_POINTS: usize = 468;
/// Points in the refined face mesh (irises and extra contours).
pub const REFINED_FACE_POINTS: usize = 478;

/// Frame metadata forwarded to the worker. Pixels are not kept; the
/// synthetic output only depends on timestamp and dimensions.
struct FrameJob {
    width: u32,
    height: u32,
    timestamp: Timestamp,
}

/// Worker-thread graph stand-in emitting deterministic holistic output.
pub struct SyntheticGraph {
    callbacks: Vec<(String, PacketCallback)>,
    frame_tx: Option<Sender<FrameJob>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl SyntheticGraph {
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
            frame_tx: None,
            worker: None,
        }
    }
}

impl Default for SyntheticGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceGraph for SyntheticGraph {
    fn observe_output_stream(
        &mut self,
        stream: &str,
        callback: PacketCallback,
    ) -> Result<(), GraphError> {
        if self.worker.is_some() {
            return Err(GraphError::Observe {
                stream: stream.to_string(),
                message: "graph already started".to_string(),
            });
        }
        self.callbacks.push((stream.to_string(), callback));
        Ok(())
    }

    fn start(&mut self, side: &SideConfig) -> Result<(), GraphError> {
        if self.worker.is_some() {
            return Err(GraphError::Start("graph already started".to_string()));
        }

        tracing::debug!("Synthetic graph starting ({} streams)", self.callbacks.len());

        let (frame_tx, frame_rx) = bounded::<FrameJob>(8);
        let callbacks = std::mem::take(&mut self.callbacks);
        let side = side.clone();

        let worker = thread::Builder::new()
            .name("synthetic-graph".to_string())
            .spawn(move || {
                run_worker(frame_rx, callbacks, side);
            })
            .map_err(|e| GraphError::Start(format!("Failed to spawn graph worker: {}", e)))?;

        self.frame_tx = Some(frame_tx);
        self.worker = Some(worker);
        Ok(())
    }

    fn submit(&mut self, frame: &VideoFrame<'_>, timestamp: Timestamp) -> Result<(), GraphError> {
        let tx = match &self.frame_tx {
            Some(tx) => tx,
            None if self.worker.is_some() => {
                return Err(GraphError::Submit("input sources closed".to_string()));
            }
            None => return Err(GraphError::Submit("graph not started".to_string())),
        };

        tx.send(FrameJob {
            width: frame.width,
            height: frame.height,
            timestamp,
        })
        .map_err(|_| GraphError::Submit("graph worker stopped".to_string()))
    }

    fn close_all_sources(&mut self) -> Result<(), GraphError> {
        // Dropping the sender ends the worker's receive loop once the
        // queued frames are processed.
        self.frame_tx = None;
        Ok(())
    }

    fn wait_until_done(&mut self) -> Result<(), GraphError> {
        self.frame_tx = None;
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| GraphError::Drain("graph worker panicked".to_string()))?;
        }
        Ok(())
    }
}

/// Processes queued frames until every sender is gone.
fn run_worker(frame_rx: Receiver<FrameJob>, callbacks: Vec<(String, PacketCallback)>, side: SideConfig) {
    while let Ok(job) = frame_rx.recv() {
        for (stream, callback) in &callbacks {
            let packet = match make_packet(stream, &job, &side) {
                Some(p) => p,
                None => continue,
            };
            if let PacketStatus::FailedPrecondition(message) = callback(&packet) {
                tracing::warn!("Stream {} rejected packet: {}", stream, message);
            }
        }
    }
    tracing::debug!("Synthetic graph worker finished");
}

/// Build the deterministic payload for one stream on one frame.
fn make_packet(stream: &str, job: &FrameJob, side: &SideConfig) -> Option<OutputPacket> {
    let phase = job.timestamp.as_micros().max(0) as f32 * 1e-6;
    let flipped = side.input_horizontally_flipped;

    // Keep the ring circular in pixel space.
    let aspect = if job.height > 0 {
        job.width as f32 / job.height as f32
    } else {
        1.0
    };

    let face_points = if side.refine_face_landmarks {
        REFINED_FACE_POINTS
    } else {
        FACE_POINTS
    };

    match stream {
        streams::POSE_LANDMARKS => Some(OutputPacket::Landmarks(landmark_ring(
            POSE_POINTS,
            phase,
            aspect,
            flipped,
        ))),
        streams::POSE_WORLD_LANDMARKS => {
            // World landmarks are meter-scale around the hip origin.
            let set = landmark_ring(POSE_POINTS, phase, aspect, flipped)
                .iter()
                .map(|p| LandmarkPoint::new(p.x - 0.5, p.y - 0.5, p.z, p.visibility))
                .collect();
            Some(OutputPacket::Landmarks(set))
        }
        streams::FACE_LANDMARKS => Some(OutputPacket::Landmarks(landmark_ring(
            face_points,
            phase,
            aspect,
            flipped,
        ))),
        streams::LEFT_HAND_LANDMARKS => Some(OutputPacket::Landmarks(landmark_ring(
            HAND_POINTS,
            phase + 1.0,
            aspect,
            flipped,
        ))),
        streams::RIGHT_HAND_LANDMARKS => Some(OutputPacket::Landmarks(landmark_ring(
            HAND_POINTS,
            phase + 2.0,
            aspect,
            flipped,
        ))),
        streams::FACE_EMOTIONS => Some(OutputPacket::Classifications(ClassificationSet::new(
            vec![
                Classification::new("neutral", 0.8),
                Classification::new("happy", 0.15),
                Classification::new("surprised", 0.05),
            ],
        ))),
        _ => None,
    }
}

/// Normalized landmark ring centered in frame, slowly rotating with the
/// submission timestamp.
fn landmark_ring(count: usize, phase: f32, aspect: f32, flipped: bool) -> LandmarkSet {
    let radius_x = 0.25 / aspect.max(0.1);
    let mut points = Vec::with_capacity(count);
    for i in 0..count {
        let t = i as f32 / count as f32 * std::f32::consts::TAU;
        let mut x = 0.5 + radius_x * (t + phase).sin();
        if flipped {
            x = 1.0 - x;
        }
        let y = 0.5 + 0.25 * (t + phase).cos();
        let z = -0.05 * (t + phase).sin();
        points.push(LandmarkPoint::new(x, y, z, 1.0));
    }
    LandmarkSet::new(points)
}

/// Factory for [`SyntheticGraph`] instances.
///
/// Counts builds so lifecycle tests can assert graph replacement.
pub struct SyntheticGraphFactory {
    built: Arc<AtomicUsize>,
}

impl SyntheticGraphFactory {
    pub fn new() -> Self {
        Self {
            built: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared build counter, usable after the factory is handed off.
    pub fn build_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.built)
    }
}

impl Default for SyntheticGraphFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphFactory for SyntheticGraphFactory {
    fn build(&self, config_text: &str) -> Result<Box<dyn InferenceGraph>, GraphError> {
        if config_text.trim().is_empty() {
            return Err(GraphError::Build("empty graph config".to_string()));
        }
        self.built.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Building synthetic graph for config {}", config_text);
        Ok(Box::new(SyntheticGraph::new()))
    }
}
