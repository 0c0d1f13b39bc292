//! Face solver bridge
//!
//! Face landmark meshes are dense enough (468+ points) that consumers
//! rarely want the raw points. A [`FaceSolver`] condenses a mesh into
//! blendshape weights plus a head transform; the bridge feeds it from
//! drained face sets and fans the solved state out through the rig's
//! solver sinks.

use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::landmark::LandmarkSet;

use super::{categories, MotionRig};

/// The full face mesh has 468 points; refined variants add more. A set
/// below this size is a partial detection and is not worth solving.
pub const MIN_FACE_POINTS: usize = 468;

/// Solved face state: named blendshape weights plus a head transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverState {
    pub blendshapes: HashMap<String, f32>,
    pub head_position: [f32; 3],
    /// Quaternion, x y z w.
    pub head_rotation: [f32; 4],
}

impl Default for SolverState {
    fn default() -> Self {
        Self {
            blendshapes: HashMap::new(),
            head_position: [0.0; 3],
            head_rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Turns a face mesh into a [`SolverState`].
pub trait FaceSolver: Send {
    fn solve(&mut self, points: &[Vec3], frame_width: u32, frame_height: u32) -> SolverState;
}

/// Feeds a [`FaceSolver`] from drained face landmark sets.
///
/// The point scratch buffer is reused across frames, so steady-state
/// solving allocates nothing.
pub struct SolverBridge {
    solver: Box<dyn FaceSolver>,
    scratch: Vec<Vec3>,
}

impl SolverBridge {
    pub fn new(solver: Box<dyn FaceSolver>) -> Self {
        Self {
            solver,
            scratch: Vec::new(),
        }
    }

    /// Solve one face set and distribute the result. Returns the solved
    /// state, or None when the mesh is too sparse to solve.
    pub fn apply(
        &mut self,
        rig: &mut MotionRig,
        set: &LandmarkSet,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<SolverState> {
        if set.len() < MIN_FACE_POINTS {
            return None;
        }

        if self.scratch.len() != set.len() {
            self.scratch.resize(set.len(), Vec3::ZERO);
        }
        for (slot, point) in self.scratch.iter_mut().zip(set.iter()) {
            *slot = point.position();
        }

        let state = self.solver.solve(&self.scratch, frame_width, frame_height);
        rig.distribute_solver(categories::FACE_SOLVER, &state);
        Some(state)
    }

    pub fn scratch_len(&self) -> usize {
        self.scratch.len()
    }
}

/// Minimal built-in solver: head position from the mesh centroid,
/// identity rotation, a single neutral blendshape. Stands in until a
/// real solver is attached.
pub struct CentroidSolver;

impl FaceSolver for CentroidSolver {
    fn solve(&mut self, points: &[Vec3], frame_width: u32, frame_height: u32) -> SolverState {
        let mut centroid = Vec3::ZERO;
        for point in points {
            centroid += *point;
        }
        if !points.is_empty() {
            centroid /= points.len() as f32;
        }

        let mut blendshapes = HashMap::new();
        blendshapes.insert("neutral".to_string(), 1.0);
        SolverState {
            blendshapes,
            head_position: [
                centroid.x * frame_width as f32,
                centroid.y * frame_height as f32,
                centroid.z,
            ],
            head_rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}
