//! Camera schema access.
//!
//! Cameras are transform-bearing nodes with lens state. The exported
//! sample is engine-flavored (vertical FOV in degrees, aspect ratio); the
//! document stores physical lens attributes (apertures and focal length in
//! millimeters), so the reader derives FOV and the writer derives
//! apertures.

use crate::schema::{Node, NodeKind};
use crate::stage::Value;
use crate::util::Time;

/// Camera sample data.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraData {
    pub near_clipping_plane: f32,
    pub far_clipping_plane: f32,
    /// Vertical field of view in degrees.
    pub field_of_view: f32,
    pub aspect_ratio: f32,
    /// Focus distance in centimeters.
    pub focus_distance: f32,
    /// Focal length in millimeters.
    pub focal_length: f32,
    /// Vertical aperture in millimeters.
    pub aperture: f32,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            near_clipping_plane: 0.3,
            far_clipping_plane: 1000.0,
            field_of_view: 60.0,
            aspect_ratio: 16.0 / 9.0,
            focus_distance: 5.0,
            focal_length: 0.0,
            aperture: 35.0,
        }
    }
}

impl CameraData {
    /// Vertical FOV in degrees from focal length and vertical aperture.
    pub fn fov_from_lens(focal_length: f32, aperture: f32) -> f32 {
        (2.0 * (aperture / (2.0 * focal_length)).atan()).to_degrees()
    }
}

/// Capability wrapper over a camera node.
pub struct CameraNode<'a> {
    node: &'a Node,
}

impl<'a> CameraNode<'a> {
    /// Wrap a node as a camera. Returns None for any other kind.
    pub fn new(node: &'a Node) -> Option<Self> {
        match node.kind() {
            NodeKind::Camera => Some(Self { node }),
            _ => None,
        }
    }

    pub fn node(&self) -> &Node {
        self.node
    }

    /// Number of recorded lens samples (max across channels).
    pub fn num_samples(&self) -> usize {
        let g = self.node.stage().read();
        let prim = g.prim(self.node.prim_id());
        ["clippingRange", "focalLength", "focusDistance", "verticalAperture"]
            .iter()
            .filter_map(|name| prim.attr(name))
            .map(|a| a.samples.num_samples())
            .max()
            .unwrap_or(0)
    }

    /// Read lens state at `t`. Missing channels keep their defaults.
    pub fn read_sample(&self, t: Time) -> Option<CameraData> {
        let g = self.node.stage().read();
        let prim = g.prim(self.node.prim_id());
        let interp = g.interpolation();

        let mut data = CameraData::default();
        let channel = |name: &str| {
            prim.attr(name)
                .and_then(|a| a.samples.resolve(t, interp))
                .map(|v| v.into_owned())
        };

        if let Some(v) = channel("clippingRange").and_then(|v| v.as_vec2()) {
            data.near_clipping_plane = v.x;
            data.far_clipping_plane = v.y;
        }
        if let Some(v) = channel("focusDistance").and_then(|v| v.as_f32()) {
            data.focus_distance = v;
        }
        if let Some(v) = channel("focalLength").and_then(|v| v.as_f32()) {
            data.focal_length = v;
        }

        let vertical = channel("verticalAperture").and_then(|v| v.as_f32());
        let horizontal = channel("horizontalAperture").and_then(|v| v.as_f32());
        if let Some(v) = vertical {
            data.aperture = v;
        }
        if let (Some(h), Some(v)) = (horizontal, vertical) {
            if v > 0.0 {
                data.aspect_ratio = h / v;
            }
        }
        if data.focal_length > 0.0 && data.aperture > 0.0 {
            data.field_of_view = CameraData::fov_from_lens(data.focal_length, data.aperture);
        }
        Some(data)
    }

    /// Write lens state at `t` as physical lens attributes.
    pub fn write_sample(&self, src: &CameraData, t: Time) -> bool {
        if self.node.stage().is_read_only() {
            return false;
        }
        let mut g = self.node.stage().write();
        let prim = g.prim_mut(self.node.prim_id());

        prim.ensure_attr("clippingRange", "float2").samples.set(
            t,
            Value::Float2(glam::Vec2::new(src.near_clipping_plane, src.far_clipping_plane)),
        );
        prim.ensure_attr("focusDistance", "float")
            .samples
            .set(t, Value::Float(src.focus_distance));

        // Derive the lens from FOV when no focal length is given.
        let focal_length = if src.focal_length > 0.0 {
            src.focal_length
        } else {
            src.aperture / (2.0 * (src.field_of_view.to_radians() * 0.5).tan())
        };
        prim.ensure_attr("focalLength", "float")
            .samples
            .set(t, Value::Float(focal_length));
        prim.ensure_attr("verticalAperture", "float")
            .samples
            .set(t, Value::Float(src.aperture));
        prim.ensure_attr("horizontalAperture", "float")
            .samples
            .set(t, Value::Float(src.aperture * src.aspect_ratio));
        true
    }
}
