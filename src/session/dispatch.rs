//! Stream callback dispatch
//!
//! The graph engine invokes output stream callbacks on threads it owns.
//! Those callbacks never touch session state directly: they recover the
//! session through the registry, convert the packet into a
//! [`StreamEvent`], and queue it for the owning thread to drain. The
//! queue is the only hand-off point between graph threads and session
//! state.

use std::sync::Arc;

use crate::graph::{streams, OutputPacket, PacketCallback, PacketStatus};
use crate::landmark::{ClassificationSet, LandmarkSet};
use crate::rig::categories;
use crate::session::registry::{SessionId, SessionRegistry};

/// The output streams a session can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Pose,
    PoseWorld,
    Face,
    LeftHand,
    RightHand,
    Emotions,
}

impl StreamKind {
    /// Graph output stream this kind is wired to.
    pub fn stream_name(&self) -> &'static str {
        match self {
            StreamKind::Pose => streams::POSE_LANDMARKS,
            StreamKind::PoseWorld => streams::POSE_WORLD_LANDMARKS,
            StreamKind::Face => streams::FACE_LANDMARKS,
            StreamKind::LeftHand => streams::LEFT_HAND_LANDMARKS,
            StreamKind::RightHand => streams::RIGHT_HAND_LANDMARKS,
            StreamKind::Emotions => streams::FACE_EMOTIONS,
        }
    }

    /// Rig category the stream's landmarks are distributed to. The
    /// emotion stream carries classifications and has no point category.
    pub fn category(&self) -> Option<&'static str> {
        match self {
            StreamKind::Pose => Some(categories::POSE),
            StreamKind::PoseWorld => Some(categories::POSE_WORLD),
            StreamKind::Face => Some(categories::FACE),
            StreamKind::LeftHand => Some(categories::LEFT_HAND),
            StreamKind::RightHand => Some(categories::RIGHT_HAND),
            StreamKind::Emotions => None,
        }
    }
}

/// One marshalled callback payload, drained on the owning thread.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A non-empty landmark list for one stream.
    Landmarks { kind: StreamKind, set: LandmarkSet },
    /// A non-empty classification list from the emotion stream.
    Emotions(ClassificationSet),
    /// The face stream delivered an empty packet: tracking lost. The
    /// face stream is the sole detection presence indicator; empty
    /// packets on other streams are silently skipped.
    FaceLost,
}

/// Build the callback for one observed stream.
///
/// The closure captures only the registry and the session id, so it
/// stays valid however long the graph outlives the wiring code; all
/// other context is recovered per invocation.
pub fn stream_callback(
    registry: Arc<SessionRegistry>,
    session: SessionId,
    kind: StreamKind,
) -> PacketCallback {
    Box::new(move |packet: &OutputPacket| {
        let handle = match registry.lookup(session) {
            Some(handle) => handle,
            None => {
                return PacketStatus::FailedPrecondition(format!(
                    "invalid session id {}",
                    session
                ));
            }
        };

        if packet.is_empty() {
            if kind == StreamKind::Face {
                handle.enqueue(StreamEvent::FaceLost);
            }
            return PacketStatus::Ok;
        }

        match packet {
            OutputPacket::Landmarks(set) => match kind {
                StreamKind::Emotions => {
                    tracing::warn!("Landmark packet on stream {}", kind.stream_name());
                }
                _ => handle.enqueue(StreamEvent::Landmarks {
                    kind,
                    set: set.clone(),
                }),
            },
            OutputPacket::Classifications(set) => match kind {
                StreamKind::Emotions => handle.enqueue(StreamEvent::Emotions(set.clone())),
                _ => {
                    tracing::warn!("Classification packet on stream {}", kind.stream_name());
                }
            },
        }

        PacketStatus::Ok
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{Classification, LandmarkPoint};
    use crate::session::registry::SessionHandle;
    use crossbeam_channel::{unbounded, Receiver};

    fn registered_session(
        registry: &Arc<SessionRegistry>,
    ) -> (SessionId, Receiver<StreamEvent>) {
        let (tx, rx) = unbounded();
        let id = registry.register(SessionHandle::new(tx)).unwrap();
        (id, rx)
    }

    fn landmarks(n: usize) -> OutputPacket {
        OutputPacket::Landmarks(
            (0..n)
                .map(|i| LandmarkPoint::new(i as f32 * 0.1, 0.5, 0.0, 1.0))
                .collect(),
        )
    }

    #[test]
    fn test_callback_enqueues_landmarks() {
        let registry = Arc::new(SessionRegistry::default());
        let (id, rx) = registered_session(&registry);

        let callback = stream_callback(Arc::clone(&registry), id, StreamKind::Pose);
        let status = callback(&landmarks(3));

        assert_eq!(status, PacketStatus::Ok);
        match rx.try_recv().unwrap() {
            StreamEvent::Landmarks { kind, set } => {
                assert_eq!(kind, StreamKind::Pose);
                assert_eq!(set.len(), 3);
                assert!((set.get(2).unwrap().x - 0.2).abs() < 1e-6);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_session_fails_precondition() {
        let registry = Arc::new(SessionRegistry::default());
        let (id, rx) = registered_session(&registry);

        // A stale id after teardown is the realistic miss case.
        registry.remove(id);

        let callback = stream_callback(Arc::clone(&registry), id, StreamKind::Pose);
        let status = callback(&landmarks(3));

        assert!(matches!(status, PacketStatus::FailedPrecondition(_)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_empty_non_face_is_skipped() {
        let registry = Arc::new(SessionRegistry::default());
        let (id, rx) = registered_session(&registry);

        let callback = stream_callback(Arc::clone(&registry), id, StreamKind::LeftHand);
        let status = callback(&landmarks(0));

        assert_eq!(status, PacketStatus::Ok);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_empty_face_reports_tracking_lost() {
        let registry = Arc::new(SessionRegistry::default());
        let (id, rx) = registered_session(&registry);

        let callback = stream_callback(Arc::clone(&registry), id, StreamKind::Face);
        let status = callback(&landmarks(0));

        assert_eq!(status, PacketStatus::Ok);
        assert!(matches!(rx.try_recv().unwrap(), StreamEvent::FaceLost));
    }

    #[test]
    fn test_emotions_enqueued() {
        let registry = Arc::new(SessionRegistry::default());
        let (id, rx) = registered_session(&registry);

        let callback = stream_callback(Arc::clone(&registry), id, StreamKind::Emotions);
        let packet = OutputPacket::Classifications(ClassificationSet::new(vec![
            Classification::new("happy", 0.9),
        ]));
        let status = callback(&packet);

        assert_eq!(status, PacketStatus::Ok);
        match rx.try_recv().unwrap() {
            StreamEvent::Emotions(set) => assert_eq!(set.entries[0].label, "happy"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_per_stream_order_preserved() {
        let registry = Arc::new(SessionRegistry::default());
        let (id, rx) = registered_session(&registry);

        let callback = stream_callback(Arc::clone(&registry), id, StreamKind::Face);
        callback(&landmarks(1));
        callback(&landmarks(2));
        callback(&landmarks(3));

        let lens: Vec<usize> = rx
            .try_iter()
            .map(|event| match event {
                StreamEvent::Landmarks { set, .. } => set.len(),
                other => panic!("unexpected event: {:?}", other),
            })
            .collect();
        assert_eq!(lens, vec![1, 2, 3]);
    }

    #[test]
    fn test_mismatched_packet_type_dropped() {
        let registry = Arc::new(SessionRegistry::default());
        let (id, rx) = registered_session(&registry);

        let callback = stream_callback(Arc::clone(&registry), id, StreamKind::Emotions);
        let status = callback(&landmarks(5));

        assert_eq!(status, PacketStatus::Ok);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_callbacks_usable_across_threads() {
        let registry = Arc::new(SessionRegistry::default());
        let (id, rx) = registered_session(&registry);

        let callback = stream_callback(Arc::clone(&registry), id, StreamKind::Pose);
        let worker = std::thread::spawn(move || callback(&landmarks(4)));
        assert_eq!(worker.join().unwrap(), PacketStatus::Ok);

        assert!(matches!(
            rx.try_recv().unwrap(),
            StreamEvent::Landmarks { .. }
        ));
    }
}
