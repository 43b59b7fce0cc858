//! Exported node kinds and the classification bridge.
//!
//! A [`Node`] is the bridge's classified, owned representation of one
//! document entity. The open-ended native schema set is collapsed onto a
//! closed set of kinds by a fixed priority-ordered probe at tree-build
//! time; unmatched entities become [`NodeKind::Unknown`] but stay in the
//! tree. Kind capabilities are exposed through borrowing wrappers
//! ([`XformNode`], [`CameraNode`], [`MeshNode`], [`PointsNode`]) obtained
//! via the `as_*` down-casts.

pub mod attribute;
pub mod camera;
pub mod mesh;
pub mod points;
pub mod xform;

pub use attribute::{Attribute, AttributeType};
pub use camera::{CameraData, CameraNode};
pub use mesh::{
    fan_triangulate, reverse_winding, triangulated_index_count, MeshNode, MeshSample,
    MeshSummary, TopologyVariance,
};
pub use points::{PointsNode, PointsSample, PointsSummary};
pub use xform::{XformData, XformNode};

use std::ptr::NonNull;

use tracing::warn;

use crate::context::SharedConfig;
use crate::stage::{PrimId, Stage};

/// Closed set of exported node kinds.
///
/// Fixed at construction; classification never changes over a node's
/// lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Unknown,
    Xform,
    Camera,
    Mesh,
    Points,
}

impl NodeKind {
    /// Probe a native entity's declared schema, first match wins.
    ///
    /// Priority order: Points, Mesh, Camera, then the generic
    /// transform-bearing kind. Everything else is Unknown.
    pub(crate) fn classify(type_token: &str) -> Self {
        const PROBES: [(&str, NodeKind); 4] = [
            ("Points", NodeKind::Points),
            ("Mesh", NodeKind::Mesh),
            ("Camera", NodeKind::Camera),
            ("Xform", NodeKind::Xform),
        ];
        for (token, kind) in PROBES {
            if type_token == token {
                return kind;
            }
        }
        NodeKind::Unknown
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Unknown => "Unknown",
            NodeKind::Xform => "Xform",
            NodeKind::Camera => "Camera",
            NodeKind::Mesh => "Mesh",
            NodeKind::Points => "Points",
        }
    }
}

/// One tree entity, owned by its Context.
///
/// Nodes live in the Context's arena for the whole session; parent/child
/// links are non-owning pointers into that arena and never participate in
/// destruction order. Structural mutation happens only behind the
/// Context's exclusive borrow, so shared access through the links stays
/// sound.
#[derive(Debug)]
pub struct Node {
    id: i32,
    path: String,
    name: String,
    type_name: String,
    kind: NodeKind,
    prim: PrimId,
    stage: Stage,
    config: SharedConfig,
    parent: Option<NonNull<Node>>,
    children: Vec<NonNull<Node>>,
    attrs: Vec<Box<Attribute>>,
    #[cfg(feature = "capi")]
    pub(crate) c_strings: CStrings,
}

/// NUL-terminated copies of the string accessors for the flat interface.
#[cfg(feature = "capi")]
#[derive(Debug)]
pub(crate) struct CStrings {
    pub path: std::ffi::CString,
    pub name: std::ffi::CString,
    pub type_name: std::ffi::CString,
}

impl Node {
    /// Bind a node to a native entity, discovering its attributes.
    pub(crate) fn bind(
        id: i32,
        stage: Stage,
        config: SharedConfig,
        prim: PrimId,
        parent: Option<NonNull<Node>>,
    ) -> Box<Node> {
        let (path, name, type_name, attr_decls) = {
            let g = stage.read();
            let p = g.prim(prim);
            let decls: Vec<(String, String)> = p
                .attrs
                .iter()
                .map(|a| (a.name.clone(), a.type_token.clone()))
                .collect();
            (p.path.clone(), p.name.clone(), p.type_token.clone(), decls)
        };

        let kind = NodeKind::classify(&type_name);
        let attrs = attr_decls
            .into_iter()
            .map(|(name, token)| Box::new(Attribute::bind(stage.clone(), prim, &name, &token)))
            .collect();

        #[cfg(feature = "capi")]
        let c_strings = CStrings {
            path: std::ffi::CString::new(path.clone()).unwrap_or_default(),
            name: std::ffi::CString::new(name.clone()).unwrap_or_default(),
            type_name: std::ffi::CString::new(type_name.clone()).unwrap_or_default(),
        };

        Box::new(Node {
            id,
            path,
            name,
            type_name,
            kind,
            prim,
            stage,
            config,
            parent,
            children: Vec::new(),
            attrs,
            #[cfg(feature = "capi")]
            c_strings,
        })
    }

    /// Stable integer identity, unique per session, increasing in
    /// creation order.
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared native schema type token (empty for the root).
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<&Node> {
        // Arena nodes outlive every link to them (teardown is
        // children-first behind an exclusive Context borrow).
        self.parent.map(|p| unsafe { &*p.as_ptr() })
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, i: usize) -> Option<&Node> {
        self.children.get(i).map(|p| unsafe { &*p.as_ptr() })
    }

    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().map(|p| unsafe { &*p.as_ptr() })
    }

    pub fn num_attributes(&self) -> usize {
        self.attrs.len()
    }

    pub fn attribute(&self, i: usize) -> Option<&Attribute> {
        self.attrs.get(i).map(|a| a.as_ref())
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs.iter().map(|a| a.as_ref())
    }

    pub fn find_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name() == name).map(|a| a.as_ref())
    }

    /// Create a new attribute on this node with the canonical native type
    /// for `ty`. Only meaningful on writable sessions.
    pub fn create_attribute(&mut self, name: &str, ty: AttributeType) -> Option<&Attribute> {
        if self.stage.is_read_only() {
            warn!("create_attribute on read-only session: '{name}'");
            return None;
        }
        if self.find_attribute(name).is_some() {
            warn!("attribute '{name}' already exists on {}", self.path);
            return None;
        }
        let token = ty.type_token();
        {
            let mut g = self.stage.write();
            g.prim_mut(self.prim).ensure_attr(name, token);
        }
        self.attrs
            .push(Box::new(Attribute::bind(self.stage.clone(), self.prim, name, token)));
        self.attrs.last().map(|a| a.as_ref())
    }

    // === Kind down-casts ===

    /// The transform capability; present on every kind except Unknown.
    pub fn as_xform(&self) -> Option<XformNode<'_>> {
        XformNode::new(self)
    }

    pub fn as_camera(&self) -> Option<CameraNode<'_>> {
        CameraNode::new(self)
    }

    pub fn as_mesh(&self) -> Option<MeshNode<'_>> {
        MeshNode::new(self)
    }

    pub fn as_points(&self) -> Option<PointsNode<'_>> {
        PointsNode::new(self)
    }

    // === Crate-internal plumbing ===

    pub(crate) fn stage(&self) -> &Stage {
        &self.stage
    }

    pub(crate) fn prim_id(&self) -> PrimId {
        self.prim
    }

    pub(crate) fn config(&self) -> &SharedConfig {
        &self.config
    }

    pub(crate) fn add_child(&mut self, child: NonNull<Node>) {
        self.children.push(child);
    }
}
