//! Document session layer.
//!
//! A [`Stage`] is one opened (read-only) or freshly created (writable)
//! scene-description document: an arena of prims addressed by [`PrimId`],
//! each carrying typed, time-sampled attributes and optional variant sets.
//! The bridge layer above classifies prims into exported node kinds; this
//! module knows nothing about that mapping.
//!
//! - [`Stage::open`] / [`Stage::create_new`] / [`Stage::export`] - session lifecycle
//! - [`Prim`] / [`PrimAttr`] - tree entities and their value slots
//! - [`Value`] / [`TimeSamples`] / [`Interpolation`] - the native value model

pub mod time_samples;
pub mod value;

pub use time_samples::{Interpolation, TimeSamples};
pub use value::{token_is_array, Value};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

use crate::usda;
use crate::util::{Error, Result, Time};

/// Stable index of a prim inside its stage's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PrimId(pub(crate) u32);

impl PrimId {
    /// The pseudo-root prim, present in every stage.
    pub const ROOT: PrimId = PrimId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One named, typed, time-sampled value slot on a prim.
#[derive(Clone, Debug)]
pub struct PrimAttr {
    pub name: String,
    /// Declared type token, e.g. `float3`, `int[]`, `matrix4d`.
    pub type_token: String,
    pub samples: TimeSamples,
}

impl PrimAttr {
    pub fn new(name: impl Into<String>, type_token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_token: type_token.into(),
            samples: TimeSamples::new(),
        }
    }

    pub fn is_array(&self) -> bool {
        token_is_array(&self.type_token)
    }
}

/// One alternate sub-hierarchy inside a variant set.
#[derive(Clone, Debug, Default)]
pub struct Variant {
    pub name: String,
    /// Prims grafted into the owner's child list while selected.
    pub children: Vec<PrimId>,
}

/// A named document-level choice between alternate sub-hierarchies.
#[derive(Clone, Debug, Default)]
pub struct VariantSet {
    pub name: String,
    pub variants: Vec<Variant>,
    pub selection: Option<String>,
}

impl VariantSet {
    fn selected(&self) -> Option<&Variant> {
        let sel = self.selection.as_deref()?;
        self.variants.iter().find(|v| v.name == sel)
    }
}

/// One entity in the document tree.
#[derive(Clone, Debug)]
pub struct Prim {
    pub path: String,
    pub name: String,
    /// Declared schema type token, e.g. `Xform`, `Mesh`. Empty for the root.
    pub type_token: String,
    /// Deactivated prims are loaded but excluded from composition.
    pub active: bool,
    pub parent: Option<PrimId>,
    pub children: Vec<PrimId>,
    pub attrs: Vec<PrimAttr>,
    pub variant_sets: Vec<VariantSet>,
}

impl Prim {
    fn new(path: String, name: String, type_token: String, parent: Option<PrimId>) -> Self {
        Self {
            path,
            name,
            type_token,
            active: true,
            parent,
            children: Vec::new(),
            attrs: Vec::new(),
            variant_sets: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&PrimAttr> {
        self.attrs.iter().find(|a| a.name == name)
    }

    pub fn attr_mut(&mut self, name: &str) -> Option<&mut PrimAttr> {
        self.attrs.iter_mut().find(|a| a.name == name)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Get or create an attribute with the given declared type.
    pub fn ensure_attr(&mut self, name: &str, type_token: &str) -> &mut PrimAttr {
        if let Some(i) = self.attrs.iter().position(|a| a.name == name) {
            return &mut self.attrs[i];
        }
        self.attrs.push(PrimAttr::new(name, type_token));
        self.attrs.last_mut().unwrap()
    }

    /// Children in native order, with the selected variant's children
    /// grafted at the end.
    pub fn visible_children(&self) -> Vec<PrimId> {
        let mut out = self.children.clone();
        for vs in &self.variant_sets {
            if let Some(v) = vs.selected() {
                out.extend_from_slice(&v.children);
            }
        }
        out
    }
}

/// Interior stage state; accessed through [`Stage::read`] / [`Stage::write`].
#[derive(Debug)]
pub struct StageData {
    pub(crate) identifier: String,
    pub(crate) prims: Vec<Prim>,
    pub(crate) interpolation: Interpolation,
    pub(crate) start_time: Time,
    pub(crate) end_time: Time,
    pub(crate) has_time_range: bool,
    pub(crate) default_prim: Option<String>,
    pub(crate) read_only: bool,
}

impl StageData {
    fn new(identifier: String, read_only: bool) -> Self {
        Self {
            identifier,
            prims: vec![Prim::new("/".into(), String::new(), String::new(), None)],
            interpolation: Interpolation::default(),
            start_time: 0.0,
            end_time: 0.0,
            has_time_range: false,
            default_prim: None,
            read_only,
        }
    }

    /// Fresh anonymous stage state, used by parser tests.
    #[cfg(test)]
    pub(crate) fn new_for_tests() -> Self {
        Self::new("<test>".into(), true)
    }

    /// Flip an in-memory session to read-only, used by access tests.
    #[cfg(test)]
    pub(crate) fn set_read_only_for_tests(&mut self) {
        self.read_only = true;
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn num_prims(&self) -> usize {
        self.prims.len()
    }

    pub fn root(&self) -> &Prim {
        &self.prims[0]
    }

    pub fn prim(&self, id: PrimId) -> &Prim {
        &self.prims[id.index()]
    }

    pub fn prim_mut(&mut self, id: PrimId) -> &mut Prim {
        &mut self.prims[id.index()]
    }

    pub fn find_prim(&self, path: &str) -> Option<PrimId> {
        self.prims
            .iter()
            .position(|p| p.path == path)
            .map(|i| PrimId(i as u32))
    }

    /// Create a prim without attaching it to its parent's child list.
    ///
    /// Used for variant children, which become visible through selection.
    pub fn new_detached_prim(
        &mut self,
        parent: PrimId,
        name: &str,
        type_token: &str,
    ) -> PrimId {
        let parent_path = &self.prim(parent).path;
        let path = if parent_path == "/" {
            format!("/{name}")
        } else {
            format!("{parent_path}/{name}")
        };
        let id = PrimId(self.prims.len() as u32);
        self.prims.push(Prim::new(
            path,
            name.to_string(),
            type_token.to_string(),
            Some(parent),
        ));
        id
    }

    /// Define a prim under `parent`, preserving native child order.
    pub fn define_prim(&mut self, parent: PrimId, name: &str, type_token: &str) -> PrimId {
        let id = self.new_detached_prim(parent, name, type_token);
        self.prim_mut(parent).children.push(id);
        id
    }

    /// Select `variant` in every variant set named `set` across the stage.
    ///
    /// Returns whether any selection was applied.
    pub fn set_variant_selection(&mut self, set: &str, variant: &str) -> bool {
        let mut applied = false;
        for prim in &mut self.prims {
            for vs in &mut prim.variant_sets {
                if vs.name == set && vs.variants.iter().any(|v| v.name == variant) {
                    vs.selection = Some(variant.to_string());
                    applied = true;
                }
            }
        }
        applied
    }

    /// Declared time range, falling back to the span of recorded samples.
    pub fn time_range(&self) -> (Time, Time) {
        if self.has_time_range {
            return (self.start_time, self.end_time);
        }
        let mut range: Option<(Time, Time)> = None;
        for prim in &self.prims {
            for attr in &prim.attrs {
                let (Some(first), Some(last)) =
                    (attr.samples.first_time(), attr.samples.last_time())
                else {
                    continue;
                };
                range = Some(match range {
                    Some((lo, hi)) => (lo.min(first), hi.max(last)),
                    None => (first, last),
                });
            }
        }
        range.unwrap_or((0.0, 0.0))
    }
}

/// Establish the resolution context for an asset path.
///
/// Normalizes to an absolute path and verifies the asset exists.
fn resolve_asset(path: &str) -> Result<PathBuf> {
    let p = Path::new(path);
    if !p.is_file() {
        return Err(Error::FileNotFound(p.to_path_buf()));
    }
    Ok(std::fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf()))
}

/// Shared handle to one document session.
///
/// Cloning is cheap (reference-counted); all clones see the same state.
/// Reads from multiple threads against a read-only session are safe.
#[derive(Clone, Debug)]
pub struct Stage {
    inner: Arc<RwLock<StageData>>,
}

impl Stage {
    /// Open an existing document for reading.
    pub fn open(path: &str) -> Result<Self> {
        let resolved = resolve_asset(path)?;
        trace!("Stage::open: {}", resolved.display());

        let content = std::fs::read_to_string(&resolved)?;
        let mut data = StageData::new(path.to_string(), true);
        usda::parse_into(&content, &mut data)?;

        debug!("Stage::open: {} prims", data.num_prims());
        Ok(Self { inner: Arc::new(RwLock::new(data)) })
    }

    /// Create a brand-new, empty, writable session.
    pub fn create_new(identifier: &str) -> Self {
        trace!("Stage::create_new: {identifier}");
        let data = StageData::new(identifier.to_string(), false);
        Self { inner: Arc::new(RwLock::new(data)) }
    }

    /// Serialize the session to `path`. Does not mutate in-memory state.
    pub fn export(&self, path: &str) -> Result<()> {
        let text = usda::write_usda(&self.read());
        std::fs::write(path, text).map_err(|e| Error::ExportFailed(e.to_string()))?;
        debug!("Stage::export: wrote {path}");
        Ok(())
    }

    pub fn read(&self) -> RwLockReadGuard<'_, StageData> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, StageData> {
        self.inner.write()
    }

    pub fn identifier(&self) -> String {
        self.read().identifier.clone()
    }

    pub fn is_read_only(&self) -> bool {
        self.read().read_only
    }

    pub fn interpolation(&self) -> Interpolation {
        self.read().interpolation
    }

    pub fn set_interpolation(&self, mode: Interpolation) {
        self.write().interpolation = mode;
    }

    /// Declared (or computed) start/end time codes.
    pub fn time_range(&self) -> (Time, Time) {
        self.read().time_range()
    }
}
