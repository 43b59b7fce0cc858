//! Polygon mesh schema access.
//!
//! Meshes carry point/velocity/normal/uv buffers plus face topology. The
//! reader layers the import conversions on top of the raw document data:
//! uniform scale, handedness mirroring, winding reversal, and fan
//! triangulation into a flat index buffer engines can consume directly.

use glam::{Vec2, Vec3};

use crate::schema::{Node, NodeKind};
use crate::stage::{PrimAttr, Value};
use crate::util::{mirror_vec3_slice, Time};

/// How a mesh's geometry changes across samples.
///
/// Governs whether a caller may cache triangulated index buffers across
/// frames.
#[repr(i32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TopologyVariance {
    /// Neither vertices nor topology change across samples.
    #[default]
    Constant = 0,
    /// Vertices animate, topology is fixed.
    Homogenous = 1,
    /// Both vertices and topology animate.
    Heterogenous = 2,
}

/// Session-wide peak counts and capability flags for a mesh.
///
/// Peaks let callers pre-allocate worst-case buffers once, since array
/// sizes can vary across samples for non-constant topology.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshSummary {
    pub peak_num_points: u32,
    pub peak_num_counts: u32,
    pub peak_num_indices: u32,
    pub peak_num_indices_triangulated: u32,
    pub topology_variance: TopologyVariance,
    pub has_normals: bool,
    pub has_uvs: bool,
    pub has_velocities: bool,
}

/// One mesh sample. Empty buffers mean the channel is absent.
#[derive(Clone, Debug, Default)]
pub struct MeshSample {
    pub points: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    /// Vertices per face.
    pub counts: Vec<i32>,
    /// Flat face-vertex indices.
    pub indices: Vec<i32>,
    /// Fan-triangulated indices (filled on import when enabled).
    pub indices_triangulated: Vec<i32>,
}

impl MeshSample {
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn num_faces(&self) -> usize {
        self.counts.len()
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty()
    }

    pub fn has_velocities(&self) -> bool {
        !self.velocities.is_empty()
    }
}

/// Number of triangulated indices a face-count buffer expands to.
pub fn triangulated_index_count(counts: &[i32]) -> usize {
    counts
        .iter()
        .filter(|&&c| c >= 3)
        .map(|&c| 3 * (c as usize - 2))
        .sum()
}

/// Fan-triangulate n-gon faces into a flat triangle index buffer.
///
/// A face `[0, 1, 2, 3]` expands to `(0,1,2), (0,2,3)`. Degenerate faces
/// (fewer than 3 vertices) are dropped.
pub fn fan_triangulate(counts: &[i32], indices: &[i32]) -> Vec<i32> {
    let mut out = Vec::with_capacity(triangulated_index_count(counts));
    let mut offset = 0usize;
    for &count in counts {
        let count = count as usize;
        if offset + count > indices.len() {
            break;
        }
        if count >= 3 {
            for i in 1..count - 1 {
                out.push(indices[offset]);
                out.push(indices[offset + i]);
                out.push(indices[offset + i + 1]);
            }
        }
        offset += count;
    }
    out
}

/// Reverse the vertex order of every face run in place.
pub fn reverse_winding(counts: &[i32], indices: &mut [i32]) {
    let mut offset = 0usize;
    for &count in counts {
        let count = count as usize;
        if offset + count > indices.len() {
            break;
        }
        indices[offset..offset + count].reverse();
        offset += count;
    }
}

/// Peak element count across every recorded value of an attribute.
fn peak_len(attr: Option<&PrimAttr>) -> u32 {
    attr.map(|a| {
        a.samples
            .values()
            .filter_map(|v| v.array_len())
            .max()
            .unwrap_or(0) as u32
    })
    .unwrap_or(0)
}

/// Whether an attribute's recorded values animate (more than one sample).
fn animated(attr: Option<&PrimAttr>) -> bool {
    attr.map(|a| a.samples.num_samples() > 1).unwrap_or(false)
}

/// Capability wrapper over a mesh node.
pub struct MeshNode<'a> {
    node: &'a Node,
}

impl<'a> MeshNode<'a> {
    /// Wrap a node as a mesh. Returns None for any other kind.
    pub fn new(node: &'a Node) -> Option<Self> {
        match node.kind() {
            NodeKind::Mesh => Some(Self { node }),
            _ => None,
        }
    }

    pub fn node(&self) -> &Node {
        self.node
    }

    /// Number of recorded point samples.
    pub fn num_samples(&self) -> usize {
        let g = self.node.stage().read();
        g.prim(self.node.prim_id())
            .attr("points")
            .map(|a| a.samples.num_samples())
            .unwrap_or(0)
    }

    /// Session-wide peak counts, channel flags, and topology variance.
    pub fn summary(&self) -> MeshSummary {
        let g = self.node.stage().read();
        let prim = g.prim(self.node.prim_id());

        let points = prim.attr("points");
        let counts = prim.attr("faceVertexCounts");
        let indices = prim.attr("faceVertexIndices");

        let peak_counts_attr = peak_len(counts);
        let peak_indices_triangulated = counts
            .map(|a| {
                a.samples
                    .values()
                    .filter_map(|v| v.as_i32_array())
                    .map(|c| triangulated_index_count(c) as u32)
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);

        let topology_animated = animated(counts) || animated(indices);
        let points_animated = animated(points);
        let topology_variance = match (points_animated, topology_animated) {
            (_, true) => TopologyVariance::Heterogenous,
            (true, false) => TopologyVariance::Homogenous,
            (false, false) => TopologyVariance::Constant,
        };

        MeshSummary {
            peak_num_points: peak_len(points),
            peak_num_counts: peak_counts_attr,
            peak_num_indices: peak_len(indices),
            peak_num_indices_triangulated: peak_indices_triangulated,
            topology_variance,
            has_normals: prim.has_attr("normals"),
            has_uvs: prim.has_attr("primvars:st") || prim.has_attr("uv"),
            has_velocities: prim.has_attr("velocities"),
        }
    }

    /// Read one mesh sample at `t`, applying the import conversions.
    ///
    /// Returns None when no point sample can be located.
    pub fn read_sample(&self, t: Time) -> Option<MeshSample> {
        let mut sample = MeshSample::default();
        {
            let g = self.node.stage().read();
            let prim = g.prim(self.node.prim_id());
            let interp = g.interpolation();

            let resolve = |name: &str| {
                prim.attr(name)
                    .and_then(|a| a.samples.resolve(t, interp))
                    .map(|v| v.into_owned())
            };

            sample.points = resolve("points")?.as_vec3_array()?.to_vec();
            if let Some(v) = resolve("velocities") {
                sample.velocities = v.as_vec3_array().map(|s| s.to_vec()).unwrap_or_default();
            }
            if let Some(v) = resolve("normals") {
                sample.normals = v.as_vec3_array().map(|s| s.to_vec()).unwrap_or_default();
            }
            if let Some(v) = resolve("primvars:st").or_else(|| resolve("uv")) {
                sample.uvs = v.as_vec2_array().map(|s| s.to_vec()).unwrap_or_default();
            }
            if let Some(v) = resolve("faceVertexCounts") {
                sample.counts = v.as_i32_array().map(|s| s.to_vec()).unwrap_or_default();
            }
            if let Some(v) = resolve("faceVertexIndices") {
                sample.indices = v.as_i32_array().map(|s| s.to_vec()).unwrap_or_default();
            }
        }

        let import = self.node.config().read().import;
        if import.scale != 1.0 {
            for p in &mut sample.points {
                *p *= import.scale;
            }
            for v in &mut sample.velocities {
                *v *= import.scale;
            }
        }
        if import.swap_handedness {
            mirror_vec3_slice(&mut sample.points);
            mirror_vec3_slice(&mut sample.velocities);
            mirror_vec3_slice(&mut sample.normals);
        }
        if import.swap_faces {
            let counts = &sample.counts;
            reverse_winding(counts, &mut sample.indices);
        }
        if import.triangulate {
            sample.indices_triangulated = fan_triangulate(&sample.counts, &sample.indices);
        }
        Some(sample)
    }

    /// Write one mesh sample at `t`, applying the export conversions.
    ///
    /// Empty source buffers leave their channel unset for that sample.
    pub fn write_sample(&self, src: &MeshSample, t: Time) -> bool {
        if self.node.stage().is_read_only() {
            return false;
        }

        let export = self.node.config().read().export;
        let mut points = src.points.clone();
        let mut velocities = src.velocities.clone();
        let mut normals = src.normals.clone();
        let mut indices = src.indices.clone();
        if export.scale != 1.0 {
            for p in &mut points {
                *p *= export.scale;
            }
            for v in &mut velocities {
                *v *= export.scale;
            }
        }
        if export.swap_handedness {
            mirror_vec3_slice(&mut points);
            mirror_vec3_slice(&mut velocities);
            mirror_vec3_slice(&mut normals);
        }
        if export.swap_faces {
            reverse_winding(&src.counts, &mut indices);
        }

        let mut g = self.node.stage().write();
        let prim = g.prim_mut(self.node.prim_id());
        if !points.is_empty() {
            prim.ensure_attr("points", "point3f[]")
                .samples
                .set(t, Value::Float3Array(points));
        }
        if !velocities.is_empty() {
            prim.ensure_attr("velocities", "vector3f[]")
                .samples
                .set(t, Value::Float3Array(velocities));
        }
        if !normals.is_empty() {
            prim.ensure_attr("normals", "normal3f[]")
                .samples
                .set(t, Value::Float3Array(normals));
        }
        if !src.uvs.is_empty() {
            prim.ensure_attr("primvars:st", "texCoord2f[]")
                .samples
                .set(t, Value::Float2Array(src.uvs.clone()));
        }
        if !src.counts.is_empty() {
            prim.ensure_attr("faceVertexCounts", "int[]")
                .samples
                .set(t, Value::IntArray(src.counts.clone()));
        }
        if !indices.is_empty() {
            prim.ensure_attr("faceVertexIndices", "int[]")
                .samples
                .set(t, Value::IntArray(indices));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    #[test]
    fn test_fan_triangulate_quad() {
        let counts = [4];
        let indices = [0, 1, 2, 3];
        assert_eq!(fan_triangulate(&counts, &indices), vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(triangulated_index_count(&counts), 6);
    }

    #[test]
    fn test_fan_triangulate_mixed_and_degenerate() {
        let counts = [3, 2, 4];
        let indices = [0, 1, 2, 3, 4, 5, 6, 7, 8];
        let tris = fan_triangulate(&counts, &indices);
        assert_eq!(tris, vec![0, 1, 2, 5, 6, 7, 5, 7, 8]);
        assert_eq!(triangulated_index_count(&counts), 9);
    }

    #[test]
    fn test_reverse_winding() {
        let counts = [3, 4];
        let mut indices = [0, 1, 2, 3, 4, 5, 6];
        reverse_winding(&counts, &mut indices);
        assert_eq!(indices, [2, 1, 0, 6, 5, 4, 3]);
    }

    fn identity_context() -> Context {
        let mut ctx = Context::new();
        let mut import = ctx.import_config();
        import.scale = 1.0;
        import.swap_handedness = false;
        import.swap_faces = false;
        ctx.set_import_config(import);
        let mut export = ctx.export_config();
        export.scale = 1.0;
        export.swap_handedness = false;
        export.swap_faces = false;
        ctx.set_export_config(export);
        ctx
    }

    #[test]
    fn test_mesh_roundtrip_and_summary() {
        let mut ctx = identity_context();
        ctx.create_stage("mesh_test.usda");
        let id = ctx.create_mesh(None, "tri").unwrap().id();
        let node = ctx.node_by_id(id).unwrap();
        let mesh = node.as_mesh().unwrap();

        let written = MeshSample {
            points: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            counts: vec![3],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        assert!(mesh.write_sample(&written, 0.0));

        let summary = mesh.summary();
        assert_eq!(summary.peak_num_points, 3);
        assert_eq!(summary.peak_num_counts, 1);
        assert_eq!(summary.peak_num_indices, 3);
        assert_eq!(summary.peak_num_indices_triangulated, 3);
        assert_eq!(summary.topology_variance, TopologyVariance::Constant);
        assert!(!summary.has_normals);

        let read = mesh.read_sample(0.0).unwrap();
        assert_eq!(read.points, written.points);
        assert_eq!(read.counts, written.counts);
        assert_eq!(read.indices, written.indices);
        assert_eq!(read.indices_triangulated, vec![0, 1, 2]);
    }

    #[test]
    fn test_topology_variance_classification() {
        let mut ctx = identity_context();
        ctx.create_stage("variance_test.usda");
        let id = ctx.create_mesh(None, "anim").unwrap().id();
        let node = ctx.node_by_id(id).unwrap();
        let mesh = node.as_mesh().unwrap();

        let base = MeshSample {
            points: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            counts: vec![3],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        assert!(mesh.write_sample(&base, 0.0));
        assert_eq!(mesh.summary().topology_variance, TopologyVariance::Constant);

        // Same topology, moved points: homogenous.
        let moved = MeshSample {
            points: vec![Vec3::ONE, Vec3::X, Vec3::Y],
            ..base.clone()
        };
        assert!(mesh.write_sample(&moved, 10.0));
        assert_eq!(mesh.summary().topology_variance, TopologyVariance::Homogenous);

        // Changed topology: heterogenous, and peaks track the maximum.
        let grown = MeshSample {
            points: vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ONE],
            counts: vec![4],
            indices: vec![0, 1, 2, 3],
            ..Default::default()
        };
        assert!(mesh.write_sample(&grown, 20.0));
        let summary = mesh.summary();
        assert_eq!(summary.topology_variance, TopologyVariance::Heterogenous);
        assert_eq!(summary.peak_num_points, 4);
        assert_eq!(summary.peak_num_indices_triangulated, 6);
    }

    #[test]
    fn test_winding_and_handedness_import() {
        let mut ctx = Context::new(); // defaults: mirror + rewind + triangulate
        ctx.create_stage("import_test.usda");
        let id = ctx.create_mesh(None, "quad").unwrap().id();
        let node = ctx.node_by_id(id).unwrap();
        let mesh = node.as_mesh().unwrap();

        // Export conversions mirror/rewind on the way in, import mirrors
        // back; the roundtrip must reproduce the source buffers.
        let written = MeshSample {
            points: vec![Vec3::ZERO, Vec3::X, Vec3::X + Vec3::Y, Vec3::Y],
            counts: vec![4],
            indices: vec![0, 1, 2, 3],
            ..Default::default()
        };
        assert!(mesh.write_sample(&written, 0.0));
        let read = mesh.read_sample(0.0).unwrap();
        assert_eq!(read.points, written.points);
        assert_eq!(read.indices, written.indices);
        assert_eq!(read.indices_triangulated, vec![0, 1, 2, 0, 2, 3]);
    }
}
