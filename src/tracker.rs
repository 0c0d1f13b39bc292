//! Holistic tracker facade
//!
//! [`HolisticTracker`] wires the whole pipeline together: a capture
//! loop feeding a tracking session, the rig fan-out for drained
//! landmarks, the face solver bridge, and broadcast channels publishing
//! detection state, capture rate, emotions, landmark snapshots and
//! solved face state. Drive it by calling [`HolisticTracker::tick`]
//! from the host loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::capture::source::ImageSource;
use crate::capture::{spawn_rate_reporter, CaptureLoop, TickOutcome};
use crate::config::Config;
use crate::graph::GraphFactory;
use crate::landmark::ClassificationSet;
use crate::rig::sinks::{LandmarkSnapshot, SnapshotSink, SolverStateSink};
use crate::rig::solver::{FaceSolver, SolverBridge, SolverState};
use crate::rig::{categories, MotionRig};
use crate::session::dispatch::{StreamEvent, StreamKind};
use crate::session::registry::SessionRegistry;
use crate::session::TrackingSession;
use crate::Result;

pub struct HolisticTracker {
    session: TrackingSession,
    capture: CaptureLoop,
    source: Box<dyn ImageSource>,
    rig: MotionRig,
    bridge: SolverBridge,
    detected_tx: broadcast::Sender<bool>,
    rate_tx: broadcast::Sender<u32>,
    emotions_tx: broadcast::Sender<ClassificationSet>,
    snapshot_tx: broadcast::Sender<LandmarkSnapshot>,
    solver_tx: broadcast::Sender<SolverState>,
    quit_tx: watch::Sender<bool>,
    track_hands: bool,
}

impl HolisticTracker {
    pub fn new(
        config: &Config,
        factory: Box<dyn GraphFactory>,
        source: Box<dyn ImageSource>,
        solver: Box<dyn FaceSolver>,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new(config.session.registry_capacity));
        let session = TrackingSession::new(registry, factory, config.graph.side_config());
        let capture = CaptureLoop::new(config.capture.target_fps as f32);

        let (detected_tx, _) = broadcast::channel(64);
        let (rate_tx, _) = broadcast::channel(16);
        let (emotions_tx, _) = broadcast::channel(64);
        let (snapshot_tx, _) = broadcast::channel(256);
        let (solver_tx, _) = broadcast::channel(64);
        let (quit_tx, _) = watch::channel(false);

        let mut rig = MotionRig::new();
        for category in [
            categories::POSE,
            categories::POSE_WORLD,
            categories::FACE,
            categories::LEFT_HAND,
            categories::RIGHT_HAND,
        ] {
            rig.attach_points(
                category,
                Box::new(SnapshotSink::new(category, snapshot_tx.clone())),
            );
        }
        rig.attach_solver(
            categories::FACE_SOLVER,
            Box::new(SolverStateSink::new(solver_tx.clone())),
        );

        Self {
            session,
            capture,
            source,
            rig,
            bridge: SolverBridge::new(solver),
            detected_tx,
            rate_tx,
            emotions_tx,
            snapshot_tx,
            solver_tx,
            quit_tx,
            track_hands: config.graph.track_hands,
        }
    }

    /// Build and start the inference graph.
    pub fn start(&mut self) -> Result<()> {
        self.session.configure(self.track_hands)
    }

    /// Advance capture by `dt` and route everything the graph has
    /// delivered since the last tick. Returns the number of stream
    /// events handled.
    pub fn tick(&mut self, dt: Duration) -> usize {
        let outcome = self
            .capture
            .tick(dt, self.source.as_mut(), &mut self.session);
        if outcome == TickOutcome::SourceNotReady {
            let _ = self.detected_tx.send(false);
        }

        let (frame_width, frame_height) = self.session.frame_size();
        let rig = &mut self.rig;
        let bridge = &mut self.bridge;
        let detected_tx = &self.detected_tx;
        let emotions_tx = &self.emotions_tx;
        self.session.drain_events(|event| match event {
            StreamEvent::Landmarks { kind, set } => {
                if let Some(category) = kind.category() {
                    rig.distribute(category, &set);
                }
                if kind == StreamKind::Face {
                    let _ = detected_tx.send(true);
                    bridge.apply(rig, &set, frame_width, frame_height);
                }
            }
            StreamEvent::Emotions(set) => {
                let _ = emotions_tx.send(set);
            }
            StreamEvent::FaceLost => {
                let _ = detected_tx.send(false);
            }
        })
    }

    /// Toggle hand tracking. Rebuilds the graph when the mode actually
    /// changes.
    pub fn set_track_hands(&mut self, track_hands: bool) -> Result<()> {
        if self.track_hands == track_hands && self.session.id().is_some() {
            return Ok(());
        }
        self.track_hands = track_hands;
        self.session.configure(track_hands)
    }

    pub fn set_target_fps(&mut self, fps: u32) {
        self.capture.set_target_fps(fps as f32);
    }

    /// Change input mirroring. Applied when the graph next restarts.
    pub fn set_flip_input(&mut self, flip: bool) {
        self.session.side_mut().input_horizontally_flipped = flip;
        tracing::debug!("Input flip set to {}, applies on next graph start", flip);
    }

    /// Start the once-per-second capture rate reporter. Must be called
    /// within a tokio runtime.
    pub fn start_rate_reporter(&self) -> JoinHandle<()> {
        spawn_rate_reporter(
            self.capture.submitted_counter(),
            self.rate_tx.clone(),
            self.quit_tx.subscribe(),
        )
    }

    pub fn subscribe_detected(&self) -> broadcast::Receiver<bool> {
        self.detected_tx.subscribe()
    }

    pub fn subscribe_rate(&self) -> broadcast::Receiver<u32> {
        self.rate_tx.subscribe()
    }

    pub fn subscribe_emotions(&self) -> broadcast::Receiver<ClassificationSet> {
        self.emotions_tx.subscribe()
    }

    pub fn subscribe_landmarks(&self) -> broadcast::Receiver<LandmarkSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn subscribe_solver(&self) -> broadcast::Receiver<SolverState> {
        self.solver_tx.subscribe()
    }

    /// Mutable rig access for attaching consumer sinks.
    pub fn rig_mut(&mut self) -> &mut MotionRig {
        &mut self.rig
    }

    /// Stop the reporter, drain the graph and unregister the session.
    pub fn shutdown(&mut self) -> Result<()> {
        let _ = self.quit_tx.send(true);
        self.session.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PixelBuffer;
    use crate::error::CaptureError;
    use crate::graph::synthetic::SyntheticGraphFactory;
    use crate::rig::solver::CentroidSolver;
    use std::sync::atomic::Ordering;

    fn tracker_with(config: &Config, factory: SyntheticGraphFactory) -> HolisticTracker {
        HolisticTracker::new(
            config,
            Box::new(factory),
            Box::new(crate::capture::source::TestPatternSource::new(64, 48)),
            Box::new(CentroidSolver),
        )
    }

    fn drain_flag(rx: &mut broadcast::Receiver<bool>) -> Option<bool> {
        let mut last = None;
        loop {
            match rx.try_recv() {
                Ok(value) => last = Some(value),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        last
    }

    #[test]
    fn test_end_to_end_tracking_flow() {
        let config = Config::default();
        let mut tracker = tracker_with(&config, SyntheticGraphFactory::new());
        let mut detected_rx = tracker.subscribe_detected();
        let mut snapshot_rx = tracker.subscribe_landmarks();
        let mut solver_rx = tracker.subscribe_solver();
        let mut emotions_rx = tracker.subscribe_emotions();

        tracker.start().unwrap();

        let dt = Duration::from_millis(40);
        let mut saw_detected = false;
        let mut saw_face_snapshot = false;
        for _ in 0..200 {
            tracker.tick(dt);
            std::thread::sleep(Duration::from_millis(2));

            if drain_flag(&mut detected_rx) == Some(true) {
                saw_detected = true;
            }
            loop {
                match snapshot_rx.try_recv() {
                    Ok(snapshot) => {
                        if snapshot.category == categories::FACE {
                            assert_eq!(snapshot.set.len(), 478);
                            assert!(snapshot
                                .set
                                .points()
                                .iter()
                                .all(|p| (0.0..=1.0).contains(&p.x)));
                            saw_face_snapshot = true;
                        }
                    }
                    Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
            if saw_detected && saw_face_snapshot {
                break;
            }
        }

        assert!(saw_detected, "face detection never reported");
        assert!(saw_face_snapshot, "face landmarks never published");

        // Solved face state is published in the same tick that
        // distributed the face mesh, and every frame carries emotions.
        assert!(solver_rx.try_recv().is_ok());
        assert!(emotions_rx.try_recv().is_ok());

        tracker.shutdown().unwrap();
    }

    #[test]
    fn test_hand_toggle_rebuilds_graph() {
        let config = Config::default();
        let factory = SyntheticGraphFactory::new();
        let builds = factory.build_counter();
        let mut tracker = tracker_with(&config, factory);

        tracker.start().unwrap();
        assert_eq!(builds.load(Ordering::Relaxed), 1);

        // Default config tracks hands; turning them off rebuilds.
        tracker.set_track_hands(false).unwrap();
        assert_eq!(builds.load(Ordering::Relaxed), 2);

        // Same mode again is a no-op.
        tracker.set_track_hands(false).unwrap();
        assert_eq!(builds.load(Ordering::Relaxed), 2);

        tracker.shutdown().unwrap();
    }

    struct NeverReadySource;

    impl ImageSource for NeverReadySource {
        fn did_update(&self) -> bool {
            false
        }

        fn dimensions(&self) -> (u32, u32) {
            (64, 48)
        }

        fn read_pixels(
            &mut self,
            _buffer: &mut PixelBuffer,
        ) -> std::result::Result<(), CaptureError> {
            Ok(())
        }
    }

    #[test]
    fn test_stalled_source_reports_not_detected() {
        let config = Config::default();
        let mut tracker = HolisticTracker::new(
            &config,
            Box::new(SyntheticGraphFactory::new()),
            Box::new(NeverReadySource),
            Box::new(CentroidSolver),
        );
        let mut detected_rx = tracker.subscribe_detected();

        tracker.start().unwrap();
        tracker.tick(Duration::from_millis(40));
        assert_eq!(drain_flag(&mut detected_rx), Some(false));
        tracker.shutdown().unwrap();
    }
}
