//! Transform schema access.
//!
//! Every visual node kind carries a local transform; [`XformNode`] is the
//! capability wrapper that reads and writes it as a decomposed
//! position/rotation/scale triple, resolving the document's transform-op
//! stack at an arbitrary time coordinate.

use glam::{Quat, Vec3};
use smallvec::SmallVec;
use tracing::trace;

use crate::schema::{Node, NodeKind};
use crate::stage::Value;
use crate::util::{euler_xyz_degrees_to_quat, mirror_quat, mirror_vec3, Time};

/// Decomposed local transform sample.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct XformData {
    pub position: Vec3,
    /// Unit quaternion.
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for XformData {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// Transform ops resolved by the reader, in application order.
const OP_CANDIDATES: [&str; 5] = [
    "xformOp:transform",
    "xformOp:translate",
    "xformOp:rotateXYZ",
    "xformOp:orient",
    "xformOp:scale",
];

/// Capability wrapper over a transform-bearing node.
pub struct XformNode<'a> {
    node: &'a Node,
}

impl<'a> XformNode<'a> {
    /// Wrap a node as a transform.
    /// Returns None for kinds that do not carry a transform (Unknown).
    pub fn new(node: &'a Node) -> Option<Self> {
        match node.kind() {
            NodeKind::Xform | NodeKind::Camera | NodeKind::Mesh | NodeKind::Points => {
                Some(Self { node })
            }
            NodeKind::Unknown => None,
        }
    }

    pub fn node(&self) -> &Node {
        self.node
    }

    /// Number of recorded transform samples (max across op channels).
    pub fn num_samples(&self) -> usize {
        let g = self.node.stage().read();
        let prim = g.prim(self.node.prim_id());
        OP_CANDIDATES
            .iter()
            .filter_map(|op| prim.attr(op))
            .map(|a| a.samples.num_samples())
            .max()
            .unwrap_or(0)
    }

    /// Read the local transform at `t`.
    ///
    /// Ops without a sample at `t` leave their channel at the identity; a
    /// node with no transform ops reads as the identity transform.
    pub fn read_sample(&self, t: Time) -> Option<XformData> {
        let mut data = XformData::default();
        {
            let g = self.node.stage().read();
            let prim = g.prim(self.node.prim_id());
            let interp = g.interpolation();

            // Op stacks are tiny; keep the resolved order on the stack.
            let order: SmallVec<[String; 4]> = prim
                .attr("xformOpOrder")
                .and_then(|a| a.samples.resolve(t, interp))
                .and_then(|v| v.as_token_array().map(|s| s.iter().cloned().collect()))
                .unwrap_or_else(|| {
                    OP_CANDIDATES
                        .iter()
                        .filter(|op| prim.has_attr(op))
                        .map(|s| s.to_string())
                        .collect()
                });

            for op in &order {
                let Some(attr) = prim.attr(op) else {
                    continue;
                };
                let Some(v) = attr.samples.resolve(t, interp) else {
                    continue;
                };
                match op.as_str() {
                    "xformOp:translate" => {
                        if let Some(p) = v.as_vec3() {
                            data.position = p;
                        }
                    }
                    "xformOp:orient" => {
                        if let Some(q) = v.as_quat() {
                            data.rotation = q;
                        }
                    }
                    "xformOp:rotateXYZ" => {
                        if let Some(e) = v.as_vec3() {
                            data.rotation = euler_xyz_degrees_to_quat(e);
                        }
                    }
                    "xformOp:scale" => {
                        if let Some(s) = v.as_vec3() {
                            data.scale = s;
                        }
                    }
                    "xformOp:transform" => {
                        if let Some(m) = v.as_mat4d() {
                            let (s, r, p) = m.as_mat4().to_scale_rotation_translation();
                            data.scale = s;
                            data.rotation = r;
                            data.position = p;
                        }
                    }
                    other => trace!("unhandled transform op: {other}"),
                }
            }
        }

        let import = self.node.config().read().import;
        data.position *= import.scale;
        if import.swap_handedness {
            data.position = mirror_vec3(data.position);
            data.rotation = mirror_quat(data.rotation);
        }
        Some(data)
    }

    /// Write the local transform at `t` as translate/orient/scale ops.
    pub fn write_sample(&self, src: &XformData, t: Time) -> bool {
        if self.node.stage().is_read_only() {
            return false;
        }

        let export = self.node.config().read().export;
        let mut position = src.position * export.scale;
        let mut rotation = src.rotation;
        if export.swap_handedness {
            position = mirror_vec3(position);
            rotation = mirror_quat(rotation);
        }

        let mut g = self.node.stage().write();
        let prim = g.prim_mut(self.node.prim_id());
        prim.ensure_attr("xformOp:translate", "float3")
            .samples
            .set(t, Value::Float3(position));
        prim.ensure_attr("xformOp:orient", "quatf")
            .samples
            .set(t, Value::Quatf(rotation));
        prim.ensure_attr("xformOp:scale", "float3")
            .samples
            .set(t, Value::Float3(src.scale));

        let order = prim.ensure_attr("xformOpOrder", "token[]");
        if order.samples.is_empty() {
            order.samples.set_default(Value::TokenArray(vec![
                "xformOp:translate".into(),
                "xformOp:orient".into(),
                "xformOp:scale".into(),
            ]));
        }
        true
    }
}
