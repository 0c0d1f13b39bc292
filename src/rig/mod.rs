//! Motion rig fan-out
//!
//! The rig is the bridge between tracking results and whatever consumes
//! them. Consumers attach sinks under a category name; each drained
//! landmark set is distributed to every sink registered under its
//! category. Categories are plain strings matched exactly, so a rig can
//! carry consumer-defined categories next to the built-in ones.

pub mod sinks;
pub mod solver;

use std::collections::HashMap;

use glam::Vec3;

use crate::landmark::LandmarkSet;

use self::solver::SolverState;

/// Built-in category names, one per tracked landmark stream plus the
/// face solver output.
pub mod categories {
    pub const POSE: &str = "PoseLandmark";
    pub const POSE_WORLD: &str = "PoseWorldLandmark";
    pub const FACE: &str = "FaceLandmark";
    pub const LEFT_HAND: &str = "LeftHandLandmark";
    pub const RIGHT_HAND: &str = "RightHandLandmark";
    pub const FACE_SOLVER: &str = "FaceSolver";
}

/// Receives positional landmark updates for one category.
///
/// Sinks are told to reallocate when the incoming point count differs
/// from their current capacity, then receive every point, then a flush
/// marking the end of the batch.
pub trait PointSink: Send {
    fn reallocate(&mut self, count: usize);
    fn len(&self) -> usize;
    fn set_point(&mut self, index: usize, position: Vec3, visibility: f32);
    fn flush(&mut self);
}

/// Receives solved face state.
pub trait SolverSink: Send {
    fn set_state(&mut self, state: &SolverState);
    fn flush(&mut self);
}

#[derive(Default)]
pub struct MotionRig {
    points: HashMap<String, Vec<Box<dyn PointSink>>>,
    solvers: HashMap<String, Vec<Box<dyn SolverSink>>>,
}

impl MotionRig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach_points(&mut self, category: &str, sink: Box<dyn PointSink>) {
        self.points.entry(category.to_string()).or_default().push(sink);
        tracing::debug!("Point sink attached to category {}", category);
    }

    pub fn attach_solver(&mut self, category: &str, sink: Box<dyn SolverSink>) {
        self.solvers.entry(category.to_string()).or_default().push(sink);
        tracing::debug!("Solver sink attached to category {}", category);
    }

    /// Distribute one landmark set to every point sink in `category`.
    /// Unknown categories are a no-op.
    pub fn distribute(&mut self, category: &str, set: &LandmarkSet) {
        let sinks = match self.points.get_mut(category) {
            Some(sinks) if !sinks.is_empty() => sinks,
            _ => return,
        };
        for sink in sinks {
            if sink.len() != set.len() {
                sink.reallocate(set.len());
            }
            for (index, point) in set.iter().enumerate() {
                sink.set_point(index, point.position(), point.visibility);
            }
            sink.flush();
        }
    }

    /// Distribute solved face state to every solver sink in `category`.
    pub fn distribute_solver(&mut self, category: &str, state: &SolverState) {
        let sinks = match self.solvers.get_mut(category) {
            Some(sinks) if !sinks.is_empty() => sinks,
            _ => return,
        };
        for sink in sinks {
            sink.set_state(state);
            sink.flush();
        }
    }

    pub fn point_sink_count(&self, category: &str) -> usize {
        self.points.get(category).map_or(0, Vec::len)
    }

    pub fn solver_sink_count(&self, category: &str) -> usize {
        self.solvers.get(category).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::LandmarkPoint;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingState {
        len: usize,
        realloc_count: usize,
        flush_count: usize,
        writes: Vec<(usize, Vec3, f32)>,
        write_before_realloc: bool,
    }

    struct RecordingSink {
        state: Arc<Mutex<RecordingState>>,
    }

    impl PointSink for RecordingSink {
        fn reallocate(&mut self, count: usize) {
            let mut state = self.state.lock().unwrap();
            state.len = count;
            state.realloc_count += 1;
        }

        fn len(&self) -> usize {
            self.state.lock().unwrap().len
        }

        fn set_point(&mut self, index: usize, position: Vec3, visibility: f32) {
            let mut state = self.state.lock().unwrap();
            if index >= state.len {
                state.write_before_realloc = true;
            }
            state.writes.push((index, position, visibility));
        }

        fn flush(&mut self) {
            self.state.lock().unwrap().flush_count += 1;
        }
    }

    fn recording_sink() -> (Box<dyn PointSink>, Arc<Mutex<RecordingState>>) {
        let state = Arc::new(Mutex::new(RecordingState::default()));
        let sink = RecordingSink {
            state: Arc::clone(&state),
        };
        (Box::new(sink), state)
    }

    fn set_of(n: usize) -> LandmarkSet {
        (0..n)
            .map(|i| LandmarkPoint::new(i as f32, 0.0, 0.0, 0.5))
            .collect()
    }

    #[test]
    fn test_every_sink_in_category_served() {
        let mut rig = MotionRig::new();
        let (first, first_state) = recording_sink();
        let (second, second_state) = recording_sink();
        rig.attach_points(categories::POSE, first);
        rig.attach_points(categories::POSE, second);

        rig.distribute(categories::POSE, &set_of(3));

        for state in [first_state, second_state] {
            let state = state.lock().unwrap();
            assert_eq!(state.realloc_count, 1);
            assert_eq!(state.writes.len(), 3);
            assert_eq!(state.flush_count, 1);
            assert!(!state.write_before_realloc);
        }
    }

    #[test]
    fn test_realloc_only_on_count_change() {
        let mut rig = MotionRig::new();
        let (sink, state) = recording_sink();
        rig.attach_points(categories::FACE, sink);

        rig.distribute(categories::FACE, &set_of(4));
        rig.distribute(categories::FACE, &set_of(4));
        assert_eq!(state.lock().unwrap().realloc_count, 1);

        rig.distribute(categories::FACE, &set_of(6));
        let state = state.lock().unwrap();
        assert_eq!(state.realloc_count, 2);
        assert_eq!(state.len, 6);
    }

    #[test]
    fn test_unknown_category_is_noop() {
        let mut rig = MotionRig::new();
        let (sink, state) = recording_sink();
        rig.attach_points(categories::POSE, sink);

        rig.distribute("NoSuchCategory", &set_of(2));
        assert!(state.lock().unwrap().writes.is_empty());
    }

    #[test]
    fn test_category_match_is_case_sensitive() {
        let mut rig = MotionRig::new();
        let (sink, state) = recording_sink();
        rig.attach_points(categories::POSE, sink);

        rig.distribute("poselandmark", &set_of(2));
        assert!(state.lock().unwrap().writes.is_empty());

        rig.distribute(categories::POSE, &set_of(2));
        assert_eq!(state.lock().unwrap().writes.len(), 2);
    }

    #[test]
    fn test_points_delivered_in_index_order() {
        let mut rig = MotionRig::new();
        let (sink, state) = recording_sink();
        rig.attach_points(categories::LEFT_HAND, sink);

        rig.distribute(categories::LEFT_HAND, &set_of(5));

        let state = state.lock().unwrap();
        for (expected, (index, position, visibility)) in state.writes.iter().enumerate() {
            assert_eq!(*index, expected);
            assert_eq!(position.x, expected as f32);
            assert_eq!(*visibility, 0.5);
        }
    }

    #[test]
    fn test_sink_counts() {
        let mut rig = MotionRig::new();
        assert_eq!(rig.point_sink_count(categories::POSE), 0);
        let (sink, _state) = recording_sink();
        rig.attach_points(categories::POSE, sink);
        assert_eq!(rig.point_sink_count(categories::POSE), 1);
        assert_eq!(rig.point_sink_count(categories::FACE), 0);
    }
}
