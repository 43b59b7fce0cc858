//! Utility types and functions for the bridge.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Error`] / [`Result`] - Error handling
//! - [`Time`] - Time coordinate on the document's time axis
//! - Math helpers (handedness mirroring, euler conversion)
//! - Debug-level controlled logging setup

mod error;
mod math;
mod logging;

pub use error::*;
pub use math::*;
pub use logging::*;

/// Time coordinate on the document's time axis.
///
/// All sample read/write calls are keyed by an explicit `Time` value;
/// sample resolution (nearest/held/linear) happens in the stage layer.
pub type Time = f64;
