//! Tracking session lifecycle
//!
//! A [`TrackingSession`] owns one inference graph instance end to end:
//! it registers itself for callback dispatch, builds and starts the
//! graph, stamps and submits frames, and drains the marshalled stream
//! events back on the owning thread. Reconfiguration (toggling hand
//! tracking) tears the old graph down completely before the next one
//! is built.

pub mod dispatch;
pub mod registry;

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::SessionError;
use crate::graph::{presets, GraphFactory, InferenceGraph, SideConfig, Timestamp, VideoFrame};
use crate::Result;

use self::dispatch::{stream_callback, StreamEvent, StreamKind};
use self::registry::{SessionHandle, SessionId, SessionRegistry};

pub struct TrackingSession {
    registry: Arc<SessionRegistry>,
    factory: Box<dyn GraphFactory>,
    graph: Option<Box<dyn InferenceGraph>>,
    id: Option<SessionId>,
    side: SideConfig,
    track_hands: bool,
    /// Started when the graph starts; frame timestamps are micros since
    /// this instant.
    stopwatch: Option<Instant>,
    events: Receiver<StreamEvent>,
    events_tx: Sender<StreamEvent>,
    frame_size: (u32, u32),
}

impl TrackingSession {
    pub fn new(
        registry: Arc<SessionRegistry>,
        factory: Box<dyn GraphFactory>,
        side: SideConfig,
    ) -> Self {
        let (events_tx, events) = unbounded();
        Self {
            registry,
            factory,
            graph: None,
            id: None,
            side,
            track_hands: false,
            stopwatch: None,
            events,
            events_tx,
            frame_size: (0, 0),
        }
    }

    fn ensure_registered(&mut self) -> Result<SessionId> {
        if let Some(id) = self.id {
            return Ok(id);
        }
        let id = self
            .registry
            .register(SessionHandle::new(self.events_tx.clone()))?;
        self.id = Some(id);
        Ok(id)
    }

    /// Build and start a graph for the requested tracking mode.
    ///
    /// If a graph is already running it is fully drained and dropped
    /// first, so packets from the old graph can never land after the
    /// new one starts.
    pub fn configure(&mut self, track_hands: bool) -> Result<()> {
        if let Some(mut graph) = self.graph.take() {
            self.stopwatch = None;
            graph.close_all_sources()?;
            graph.wait_until_done()?;
            drop(graph);
        }

        let id = self.ensure_registered()?;
        let preset = if track_hands {
            presets::HOLISTIC_WITH_HANDS
        } else {
            presets::HOLISTIC_WITHOUT_HANDS
        };
        let mut graph = self.factory.build(preset)?;

        let mut kinds = vec![StreamKind::Pose, StreamKind::PoseWorld, StreamKind::Face];
        if track_hands {
            kinds.push(StreamKind::LeftHand);
            kinds.push(StreamKind::RightHand);
        }
        kinds.push(StreamKind::Emotions);
        for kind in kinds {
            let callback = stream_callback(Arc::clone(&self.registry), id, kind);
            graph.observe_output_stream(kind.stream_name(), callback)?;
        }

        graph.start(&self.side)?;
        self.track_hands = track_hands;
        self.graph = Some(graph);
        self.stopwatch = Some(Instant::now());
        tracing::info!("Inference graph started (hands: {})", track_hands);
        Ok(())
    }

    /// Submit one frame to the running graph.
    pub fn submit_frame(&mut self, frame: &VideoFrame<'_>, timestamp: Timestamp) -> Result<()> {
        let graph = self.graph.as_mut().ok_or(SessionError::NotConfigured)?;
        graph.submit(frame, timestamp)?;
        self.frame_size = (frame.width, frame.height);
        Ok(())
    }

    /// Timestamp for the next frame, in micros since graph start.
    /// [`Timestamp::UNSET`] while no graph is running.
    pub fn current_timestamp(&self) -> Timestamp {
        match self.stopwatch {
            Some(started) => Timestamp::from_micros(started.elapsed().as_micros() as i64),
            None => Timestamp::UNSET,
        }
    }

    /// Drain every queued stream event into `route`, in arrival order.
    /// Returns the number of events handled.
    pub fn drain_events<F: FnMut(StreamEvent)>(&mut self, mut route: F) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            route(event);
            handled += 1;
        }
        handled
    }

    /// Stop the graph and unregister. Safe to call more than once.
    pub fn shutdown(&mut self) -> Result<()> {
        self.stopwatch = None;
        if let Some(mut graph) = self.graph.take() {
            graph.close_all_sources()?;
            graph.wait_until_done()?;
            drop(graph);
            tracing::info!("Tracking session stopped");
        }
        if let Some(id) = self.id.take() {
            self.registry.remove(id);
            tracing::debug!("Session {} unregistered", id);
        }
        Ok(())
    }

    pub fn side_mut(&mut self) -> &mut SideConfig {
        &mut self.side
    }

    pub fn id(&self) -> Option<SessionId> {
        self.id
    }

    pub fn track_hands(&self) -> bool {
        self.track_hands
    }

    /// Dimensions of the most recently submitted frame.
    pub fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }
}
