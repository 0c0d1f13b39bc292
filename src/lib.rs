//! holorig - Holistic Landmark Tracking Core
//!
//! A modular Rust core for holistic body tracking that:
//! - Captures frames at a configurable rate, independent of the host tick
//! - Drives an external inference graph behind a pluggable trait boundary
//! - Marshals callback results from graph threads back to the owning thread
//! - Fans landmarks out to category-keyed rig sinks and a face solver
//!
//! The inference engine itself stays external: anything implementing
//! [`graph::InferenceGraph`] can sit behind a [`HolisticTracker`]. A
//! deterministic synthetic graph is built in for demos and tests.

pub mod capture;
pub mod config;
pub mod error;
pub mod graph;
pub mod landmark;
pub mod rig;
pub mod session;
pub mod tracker;

pub use config::Config;
pub use error::{HolorigError, Result};
pub use tracker::HolisticTracker;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
