//! Context: session lifecycle and tree construction.
//!
//! A [`Context`] owns one document session and the arena of every [`Node`]
//! created for it. Opening a document resets all prior state, applies the
//! import configuration and pending variant selections, then classifies
//! and binds the whole entity tree parent-first. Teardown releases nodes
//! in strict reverse creation order (children before parents), then the
//! session handle.

use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, trace, warn};

use crate::schema::{Attribute, AttributeType, Node};
use crate::stage::{Interpolation, PrimId, Stage};
use crate::util::{Error, Result, Time};

/// Conversions applied when reading samples out of an opened document.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImportConfig {
    /// Pushed into the live session whenever the config is set.
    pub interpolation: Interpolation,
    /// Uniform scale applied to positions and velocities.
    pub scale: f32,
    /// Fill triangulated index buffers on mesh reads.
    pub triangulate: bool,
    /// Mirror across the YZ plane (left/right handed conversion).
    pub swap_handedness: bool,
    /// Reverse per-face winding order.
    pub swap_faces: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::Linear,
            scale: 1.0,
            triangulate: true,
            swap_handedness: true,
            swap_faces: true,
        }
    }
}

/// Conversions applied when writing samples into a created session.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportConfig {
    pub scale: f32,
    pub swap_handedness: bool,
    pub swap_faces: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { scale: 1.0, swap_handedness: true, swap_faces: true }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ConfigState {
    pub import: ImportConfig,
    pub export: ExportConfig,
}

/// Config handle shared between a Context and the nodes it owns.
pub(crate) type SharedConfig = Arc<RwLock<ConfigState>>;

/// Owns one document session and every node created for it.
pub struct Context {
    stage: Option<Stage>,
    /// Flat registry in creation order; the root is the front entry.
    /// Entries are heap nodes released only by [`Context::reset`].
    nodes: Vec<NonNull<Node>>,
    id_seed: i32,
    start_time: Time,
    end_time: Time,
    config: SharedConfig,
    /// Variant-set name -> selected variant, applied at open time.
    variants: HashMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        trace!("Context::new");
        Self {
            stage: None,
            nodes: Vec::new(),
            id_seed: 0,
            start_time: 0.0,
            end_time: 0.0,
            config: SharedConfig::default(),
            variants: HashMap::new(),
        }
    }

    /// Whether a document session is currently open.
    pub fn valid(&self) -> bool {
        self.stage.is_some()
    }

    /// Release all nodes (reverse creation order) and close the session.
    ///
    /// Configs and pending variant selections survive a reset.
    pub fn reset(&mut self) {
        while let Some(ptr) = self.nodes.pop() {
            // Children were created after their parents, so popping from
            // the back releases them first.
            drop(unsafe { Box::from_raw(ptr.as_ptr()) });
        }
        self.stage = None;
        self.id_seed = 0;
        self.start_time = 0.0;
        self.end_time = 0.0;
    }

    /// Open a document for reading and build the node tree.
    ///
    /// On failure the Context is left fully reset and safe to reuse.
    pub fn open(&mut self, path: &str) -> Result<()> {
        self.reset();

        let import = self.config.read().import;
        trace!("Context::open: {path}");
        trace!("  scale: {}", import.scale);
        trace!("  triangulate: {}", import.triangulate);
        trace!("  swap_handedness: {}", import.swap_handedness);
        trace!("  swap_faces: {}", import.swap_faces);

        let stage = match Stage::open(path) {
            Ok(s) => s,
            Err(e) => {
                warn!("Context::open: failed to load {path}: {e}");
                return Err(e);
            }
        };

        stage.set_interpolation(import.interpolation);
        let (start, end) = stage.time_range();
        self.start_time = start;
        self.end_time = end;

        // Selections determine which children are visible, so they are
        // applied before any node is constructed.
        {
            let mut g = stage.write();
            for (set, sel) in &self.variants {
                if !g.set_variant_selection(set, sel) {
                    warn!("Context::open: no variant '{sel}' in set '{set}'");
                }
            }
        }

        self.stage = Some(stage.clone());
        self.build_recursive(None, PrimId::ROOT, &stage);
        if self.nodes.is_empty() {
            warn!("Context::open: document root is not valid");
            self.reset();
            return Err(Error::invalid("document root is not valid"));
        }
        info!("Context::open: {path}: {} nodes", self.nodes.len());
        Ok(())
    }

    /// Reset and create a brand-new writable session.
    ///
    /// The new document is empty apart from its root entity, which is
    /// bound as the root node so created nodes have a parent to land
    /// under.
    pub fn create_stage(&mut self, identifier: &str) {
        self.reset();
        let stage = Stage::create_new(identifier);
        self.stage = Some(stage.clone());
        self.build_recursive(None, PrimId::ROOT, &stage);
        info!("Context::create_stage: {identifier}");
    }

    /// Serialize the session to `path`. The in-memory tree is unchanged.
    pub fn write(&self, path: &str) -> Result<()> {
        let export = self.config.read().export;
        trace!("Context::write: {path}");
        trace!("  scale: {}", export.scale);
        trace!("  swap_handedness: {}", export.swap_handedness);
        trace!("  swap_faces: {}", export.swap_faces);

        let Some(stage) = &self.stage else {
            warn!("Context::write: no document is open");
            return Err(Error::NoDocument);
        };
        match stage.export(path) {
            Ok(()) => {
                info!("Context::write: done");
                Ok(())
            }
            Err(e) => {
                warn!("Context::write: failed: {e}");
                Err(e)
            }
        }
    }

    /// Classify and bind `prim`, then recurse into its visible children.
    /// Parents are always processed before any of their children.
    fn build_recursive(&mut self, parent: Option<NonNull<Node>>, prim: PrimId, stage: &Stage) {
        let (active, children) = {
            let g = stage.read();
            let p = g.prim(prim);
            (p.active, p.visible_children())
        };
        if !active {
            trace!("skipping inactive entity");
            return;
        }

        let id = self.generate_id();
        let node = Node::bind(id, stage.clone(), self.config.clone(), prim, parent);
        debug!("bound node {} [{}] {}", id, node.kind().name(), node.path());
        let ptr = unsafe { NonNull::new_unchecked(Box::into_raw(node)) };
        if let Some(parent) = parent {
            unsafe { (*parent.as_ptr()).add_child(ptr) };
        }
        self.nodes.push(ptr);

        for child in children {
            self.build_recursive(Some(ptr), child, stage);
        }
    }

    fn generate_id(&mut self) -> i32 {
        self.id_seed += 1;
        self.id_seed
    }

    /// The first node in creation order, or None with no open document.
    pub fn root(&self) -> Option<&Node> {
        self.nodes.first().map(|p| unsafe { &*p.as_ptr() })
    }

    /// Every node in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().map(|p| unsafe { &*p.as_ptr() })
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn find_ptr(&self, id: i32) -> Option<NonNull<Node>> {
        self.nodes
            .iter()
            .copied()
            .find(|p| unsafe { (*p.as_ptr()).id() } == id)
    }

    pub fn node_by_id(&self, id: i32) -> Option<&Node> {
        self.find_ptr(id).map(|p| unsafe { &*p.as_ptr() })
    }

    pub fn find_node(&self, path: &str) -> Option<&Node> {
        self.nodes()
            .find(|n| n.path() == path)
    }

    /// Session start time code, cached at open.
    pub fn start_time(&self) -> Time {
        self.start_time
    }

    /// Session end time code, cached at open.
    pub fn end_time(&self) -> Time {
        self.end_time
    }

    pub fn import_config(&self) -> ImportConfig {
        self.config.read().import
    }

    /// Store the import config and push its side effects into the live
    /// session (interpolation mode). Already-read samples are unaffected.
    pub fn set_import_config(&mut self, v: ImportConfig) {
        self.config.write().import = v;
        if let Some(stage) = &self.stage {
            stage.set_interpolation(v.interpolation);
        }
    }

    pub fn export_config(&self) -> ExportConfig {
        self.config.read().export
    }

    /// Store the export config; consumed at write time.
    pub fn set_export_config(&mut self, v: ExportConfig) {
        self.config.write().export = v;
    }

    /// Record a variant selection to apply on the next open.
    pub fn set_variant_selection(&mut self, set: &str, variant: &str) {
        debug!("variant selection: {set} = {variant}");
        self.variants.insert(set.to_string(), variant.to_string());
    }

    // === Caller-driven node creation (writable sessions) ===

    pub fn create_xform(&mut self, parent: Option<i32>, name: &str) -> Option<&Node> {
        self.create_node("Xform", parent, name)
    }

    pub fn create_camera(&mut self, parent: Option<i32>, name: &str) -> Option<&Node> {
        self.create_node("Camera", parent, name)
    }

    pub fn create_mesh(&mut self, parent: Option<i32>, name: &str) -> Option<&Node> {
        self.create_node("Mesh", parent, name)
    }

    pub fn create_points(&mut self, parent: Option<i32>, name: &str) -> Option<&Node> {
        self.create_node("Points", parent, name)
    }

    /// Define a typed entity under `parent` (the root when None), then
    /// classify and register it like any built node.
    fn create_node(&mut self, type_token: &str, parent: Option<i32>, name: &str) -> Option<&Node> {
        let stage = self.stage.clone()?;
        if stage.is_read_only() {
            warn!("create_node on read-only session: '{name}'");
            return None;
        }
        let parent_ptr = match parent {
            Some(id) => self.find_ptr(id)?,
            None => *self.nodes.first()?,
        };

        let parent_prim = unsafe { (*parent_ptr.as_ptr()).prim_id() };
        let prim = stage.write().define_prim(parent_prim, name, type_token);
        let id = self.generate_id();
        let node = Node::bind(id, stage.clone(), self.config.clone(), prim, Some(parent_ptr));
        debug!("created node {} [{}] {}", id, type_token, node.path());
        let ptr = unsafe { NonNull::new_unchecked(Box::into_raw(node)) };
        unsafe { (*parent_ptr.as_ptr()).add_child(ptr) };
        self.nodes.push(ptr);
        Some(unsafe { &*ptr.as_ptr() })
    }

    /// Create an attribute on the node with identity `node_id`.
    pub fn create_attribute(
        &mut self,
        node_id: i32,
        name: &str,
        ty: AttributeType,
    ) -> Option<&Attribute> {
        let ptr = self.find_ptr(node_id)?;
        unsafe { (*ptr.as_ptr()).create_attribute(name, ty) }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.reset();
        trace!("Context dropped");
    }
}
