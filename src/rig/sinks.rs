//! Built-in broadcast sinks
//!
//! These sinks snapshot whatever the rig distributes and publish it on
//! tokio broadcast channels, which is how the rest of the process (and
//! the demo binary) observes tracking output without holding the rig.

use glam::Vec3;
use tokio::sync::broadcast;

use crate::landmark::{LandmarkPoint, LandmarkSet};

use super::solver::SolverState;
use super::{PointSink, SolverSink};

/// One published frame of landmarks for a category.
#[derive(Debug, Clone)]
pub struct LandmarkSnapshot {
    pub category: String,
    pub set: LandmarkSet,
}

/// Collects a category's points and publishes a snapshot per flush.
pub struct SnapshotSink {
    category: String,
    points: Vec<LandmarkPoint>,
    tx: broadcast::Sender<LandmarkSnapshot>,
}

impl SnapshotSink {
    pub fn new(category: &str, tx: broadcast::Sender<LandmarkSnapshot>) -> Self {
        Self {
            category: category.to_string(),
            points: Vec::new(),
            tx,
        }
    }
}

impl PointSink for SnapshotSink {
    fn reallocate(&mut self, count: usize) {
        self.points = vec![LandmarkPoint::default(); count];
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn set_point(&mut self, index: usize, position: Vec3, visibility: f32) {
        if let Some(point) = self.points.get_mut(index) {
            *point = LandmarkPoint::new(position.x, position.y, position.z, visibility);
        }
    }

    fn flush(&mut self) {
        let snapshot = LandmarkSnapshot {
            category: self.category.clone(),
            set: self.points.iter().copied().collect(),
        };
        // Nobody listening is fine.
        let _ = self.tx.send(snapshot);
    }
}

/// Publishes each solved face state as-is.
pub struct SolverStateSink {
    tx: broadcast::Sender<SolverState>,
}

impl SolverStateSink {
    pub fn new(tx: broadcast::Sender<SolverState>) -> Self {
        Self { tx }
    }
}

impl SolverSink for SolverStateSink {
    fn set_state(&mut self, state: &SolverState) {
        let _ = self.tx.send(state.clone());
    }

    fn flush(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::categories;

    #[test]
    fn test_snapshot_published_on_flush() {
        let (tx, mut rx) = broadcast::channel(4);
        let mut sink = SnapshotSink::new(categories::POSE, tx);

        sink.reallocate(3);
        for i in 0..3 {
            sink.set_point(i, Vec3::new(i as f32, 2.0, 3.0), 0.9);
        }
        sink.flush();

        let snapshot = rx.try_recv().unwrap();
        assert_eq!(snapshot.category, categories::POSE);
        assert_eq!(snapshot.set.len(), 3);
        let point = snapshot.set.get(1).unwrap();
        assert_eq!(point.x, 1.0);
        assert_eq!(point.visibility, 0.9);
    }

    #[test]
    fn test_out_of_range_write_is_dropped() {
        let (tx, mut rx) = broadcast::channel(4);
        let mut sink = SnapshotSink::new(categories::FACE, tx);

        sink.reallocate(2);
        sink.set_point(5, Vec3::ONE, 1.0);
        sink.flush();

        let snapshot = rx.try_recv().unwrap();
        assert_eq!(snapshot.set.len(), 2);
        assert_eq!(snapshot.set.get(0).unwrap().x, 0.0);
    }

    #[test]
    fn test_solver_state_published() {
        let (tx, mut rx) = broadcast::channel(4);
        let mut sink = SolverStateSink::new(tx);

        let mut state = SolverState::default();
        state.blendshapes.insert("jawOpen".to_string(), 0.25);
        sink.set_state(&state);
        sink.flush();

        let received = rx.try_recv().unwrap();
        assert_eq!(received.blendshapes.get("jawOpen"), Some(&0.25));
        assert_eq!(received.head_rotation, [0.0, 0.0, 0.0, 1.0]);
    }
}
