//! # usd-bridge
//!
//! Scene-graph bridge exposing USD documents through a stable, flat,
//! ownership-transparent interface suitable for driving from another
//! runtime (game-engine importers, test harnesses).
//!
//! The document's open-ended schema and attribute types are collapsed at
//! the boundary onto a small closed set of node kinds and value tags,
//! preserving object lifetime, identity, and time-sampled read/write
//! semantics.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (Time, errors, math helpers, logging)
//! - [`usda`] - Text container format (parse/serialize)
//! - [`stage`] - Document session (prims, values, time samples, variants)
//! - [`schema`] - Node kinds, classification, typed attribute access
//! - [`context`] - Session lifecycle and tree construction
//! - [`capi`] - Flat `extern "C"` surface (feature `capi`, on by default)
//!
//! ## Example
//!
//! ```ignore
//! use usd_bridge::prelude::*;
//!
//! let mut ctx = Context::new();
//! ctx.open("scene.usda")?;
//! let root = ctx.root().unwrap();
//!
//! for child in root.children() {
//!     println!("{} [{}]", child.path(), child.type_name());
//! }
//! ```

pub mod context;
pub mod schema;
pub mod stage;
pub mod usda;
pub mod util;

// Flat C interface (optional, enabled with "capi" feature)
#[cfg(feature = "capi")]
pub mod capi;

// Re-export commonly used types
pub use context::{Context, ExportConfig, ImportConfig};
pub use schema::{Attribute, AttributeType, Node, NodeKind};
pub use stage::{Interpolation, Stage};
pub use util::{set_debug_level, Error, Result, Time};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::{Context, ExportConfig, ImportConfig};
    pub use crate::schema::{
        Attribute, AttributeType, CameraData, CameraNode, MeshNode, MeshSample, MeshSummary,
        Node, NodeKind, PointsNode, PointsSample, PointsSummary, TopologyVariance, XformData,
        XformNode,
    };
    pub use crate::stage::{Interpolation, Stage};
    pub use crate::util::{set_debug_level, Error, Result, Time};
}
