//! Inference graph boundary
//!
//! holorig drives an external MediaPipe-style holistic graph but never
//! looks inside it. Everything the pipeline needs from the engine lives
//! behind the [`InferenceGraph`] trait: frame submission, output stream
//! observation, and the drain protocol used when a session replaces its
//! graph. [`synthetic`] provides an in-tree stand-in for runs and tests
//! without the real engine.

pub mod synthetic;

use crate::error::GraphError;
use crate::landmark::{ClassificationSet, LandmarkSet};

/// Output stream names produced by the holistic graph.
pub mod streams {
    pub const POSE_LANDMARKS: &str = "pose_landmarks";
    pub const POSE_WORLD_LANDMARKS: &str = "pose_world_landmarks";
    pub const FACE_LANDMARKS: &str = "face_landmarks";
    pub const LEFT_HAND_LANDMARKS: &str = "left_hand_landmarks";
    pub const RIGHT_HAND_LANDMARKS: &str = "right_hand_landmarks";
    pub const FACE_EMOTIONS: &str = "face_emotions";
}

/// Embedded graph config presets, selected by hand-tracking mode.
///
/// These are opaque engine identifiers; the topology behind them belongs
/// to the engine.
pub mod presets {
    /// Full holistic topology including the hand landmark subgraphs.
    pub const HOLISTIC_WITH_HANDS: &str = "holistic_tracking_with_hands";
    /// Reduced topology without hand landmark subgraphs.
    pub const HOLISTIC_WITHOUT_HANDS: &str = "holistic_tracking";
}

/// Microsecond timestamp from a session-local stopwatch.
///
/// [`Timestamp::UNSET`] marks "no stopwatch running". It is a sentinel,
/// not a zero: callers drop timestamp-dependent work instead of
/// submitting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Sentinel for "no timestamp available".
    pub const UNSET: Timestamp = Timestamp(-1);

    pub fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    pub fn as_micros(&self) -> i64 {
        self.0
    }

    pub fn is_set(&self) -> bool {
        self.0 >= 0
    }
}

/// Pixel layout of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit RGBA, 4 bytes per pixel.
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// A borrowed video frame handed to the graph.
///
/// The pixel data stays owned by the capture loop's reusable buffer; the
/// graph must copy anything it keeps past the `submit` call.
#[derive(Debug)]
pub struct VideoFrame<'a> {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes (width times bytes per pixel, no padding).
    pub stride: usize,
    pub data: &'a [u8],
}

/// Graph-global side inputs fixed at start time.
#[derive(Debug, Clone, PartialEq)]
pub struct SideConfig {
    /// Input rotation in degrees (0, 90, 180, 270).
    pub input_rotation: i32,
    /// Mirror the input horizontally before inference.
    pub input_horizontally_flipped: bool,
    /// Flip the input vertically before inference.
    pub input_vertically_flipped: bool,
    /// Run the refined face mesh with iris landmarks.
    pub refine_face_landmarks: bool,
    /// Pose model complexity (0 = lite, 1 = full, 2 = heavy).
    pub model_complexity: i32,
}

impl Default for SideConfig {
    fn default() -> Self {
        Self {
            input_rotation: 180,
            input_horizontally_flipped: true,
            input_vertically_flipped: false,
            refine_face_landmarks: true,
            model_complexity: 0,
        }
    }
}

/// One output packet delivered to a stream callback.
///
/// Empty payloads are how the graph reports "nothing detected this
/// frame"; they are part of normal operation, not errors.
#[derive(Debug, Clone)]
pub enum OutputPacket {
    /// A landmark list, possibly empty.
    Landmarks(LandmarkSet),
    /// A classification list, possibly empty.
    Classifications(ClassificationSet),
}

impl OutputPacket {
    pub fn is_empty(&self) -> bool {
        match self {
            OutputPacket::Landmarks(set) => set.is_empty(),
            OutputPacket::Classifications(set) => set.is_empty(),
        }
    }
}

/// Status returned from a stream callback to the graph engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketStatus {
    Ok,
    /// The callback could not recover its dispatch context (e.g. an
    /// unknown session id). Reported on the engine's own error channel;
    /// the graph keeps running.
    FailedPrecondition(String),
}

/// Stream observation callback.
///
/// Invoked by the graph engine on threads holorig does not own. The
/// packet borrow is only valid for the duration of the call; callbacks
/// extract what they keep by value.
pub type PacketCallback = Box<dyn Fn(&OutputPacket) -> PacketStatus + Send + Sync>;

/// The external inference engine driving one session.
///
/// Call order is: build (via [`GraphFactory`]), `observe_output_stream`
/// for each stream of interest, `start`, any number of `submit` calls,
/// then `close_all_sources`, `wait_until_done`, drop.
pub trait InferenceGraph: Send {
    /// Register a callback for a named output stream. Must happen before
    /// `start`.
    fn observe_output_stream(
        &mut self,
        stream: &str,
        callback: PacketCallback,
    ) -> Result<(), GraphError>;

    /// Start the graph with the given side inputs.
    fn start(&mut self, side: &SideConfig) -> Result<(), GraphError>;

    /// Submit one video frame at the given timestamp.
    fn submit(&mut self, frame: &VideoFrame<'_>, timestamp: Timestamp) -> Result<(), GraphError>;

    /// Close all input sources. No further `submit` calls are allowed.
    fn close_all_sources(&mut self) -> Result<(), GraphError>;

    /// Block until every in-flight packet has been delivered.
    fn wait_until_done(&mut self) -> Result<(), GraphError>;
}

/// Builds fresh graph instances from a graph config text.
pub trait GraphFactory: Send + Sync {
    fn build(&self, config_text: &str) -> Result<Box<dyn InferenceGraph>, GraphError>;
}
