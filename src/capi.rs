#![allow(non_snake_case)]
#![allow(clippy::missing_safety_doc)]

//! Flat `extern "C"` interface.
//!
//! One function per operation, no implicit state beyond the explicit
//! handles. Handles are opaque pointers whose validity is tied to the
//! owning Context's lifetime; using a handle after its Context is
//! destroyed is undefined. All fallible operations resolve to boolean or
//! null-pointer results; nothing unwinds across this boundary.
//!
//! Buffer contracts mirror the library layer: the caller discriminates on
//! the attribute type tag and sizes array buffers from
//! `usdbAttrGetArraySize` at the same time coordinate. `char*` results
//! point into storage owned by the handle they came from and stay valid
//! until the next string read through that handle.

use std::ffi::{c_char, c_int, c_void, CStr, CString};

use glam::{Quat, Vec2, Vec3, Vec4};

use crate::context::{Context, ExportConfig, ImportConfig};
use crate::schema::{
    Attribute, AttributeType, CameraData, MeshSample, MeshSummary, Node, NodeKind,
    PointsSample, PointsSummary, XformData,
};
use crate::util::{set_debug_level, Time};

/// Mesh sample I/O block for the flat interface.
///
/// Pointer fields may be null: ignored on read, channel unset on write.
/// Non-null read destinations must hold at least the counts reported by
/// `usdbMeshGetSummary` (array sizes vary across samples for non-constant
/// topology). Count fields are filled on read and consumed on write.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct MeshData {
    pub points: *mut Vec3,
    pub velocities: *mut Vec3,
    pub normals: *mut Vec3,
    pub uvs: *mut Vec2,
    pub counts: *mut i32,
    pub indices: *mut i32,
    pub indices_triangulated: *mut i32,

    pub num_points: u32,
    pub num_counts: u32,
    pub num_indices: u32,
    pub num_indices_triangulated: u32,
}

impl Default for MeshData {
    fn default() -> Self {
        Self {
            points: std::ptr::null_mut(),
            velocities: std::ptr::null_mut(),
            normals: std::ptr::null_mut(),
            uvs: std::ptr::null_mut(),
            counts: std::ptr::null_mut(),
            indices: std::ptr::null_mut(),
            indices_triangulated: std::ptr::null_mut(),
            num_points: 0,
            num_counts: 0,
            num_indices: 0,
            num_indices_triangulated: 0,
        }
    }
}

/// Points sample I/O block for the flat interface; same pointer contract
/// as [`MeshData`].
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct PointsData {
    pub points: *mut Vec3,
    pub velocities: *mut Vec3,
    pub num_points: u32,
}

impl Default for PointsData {
    fn default() -> Self {
        Self {
            points: std::ptr::null_mut(),
            velocities: std::ptr::null_mut(),
            num_points: 0,
        }
    }
}

unsafe fn cstr<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

fn attr_type_from_i32(v: i32) -> AttributeType {
    const TAGS: [AttributeType; 22] = [
        AttributeType::Unknown,
        AttributeType::Byte,
        AttributeType::Int,
        AttributeType::UInt,
        AttributeType::Float,
        AttributeType::Float2,
        AttributeType::Float3,
        AttributeType::Float4,
        AttributeType::Quaternion,
        AttributeType::Token,
        AttributeType::String,
        AttributeType::UnknownArray,
        AttributeType::ByteArray,
        AttributeType::IntArray,
        AttributeType::UIntArray,
        AttributeType::FloatArray,
        AttributeType::Float2Array,
        AttributeType::Float3Array,
        AttributeType::Float4Array,
        AttributeType::QuaternionArray,
        AttributeType::TokenArray,
        AttributeType::StringArray,
    ];
    TAGS.iter()
        .copied()
        .find(|t| *t as i32 == v)
        .unwrap_or(AttributeType::Unknown)
}

// ============================================================================
// Diagnostics
// ============================================================================

#[no_mangle]
pub extern "C" fn usdbSetDebugLevel(l: c_int) {
    set_debug_level(l);
}

// ============================================================================
// Context interface
// ============================================================================

#[no_mangle]
pub extern "C" fn usdbCreateContext() -> *mut Context {
    Box::into_raw(Box::new(Context::new()))
}

#[no_mangle]
pub unsafe extern "C" fn usdbDestroyContext(ctx: *mut Context) {
    if !ctx.is_null() {
        drop(Box::from_raw(ctx));
    }
}

#[no_mangle]
pub unsafe extern "C" fn usdbOpen(ctx: *mut Context, path: *const c_char) -> bool {
    let Some(path) = cstr(path) else {
        return false;
    };
    (*ctx).open(path).is_ok()
}

#[no_mangle]
pub unsafe extern "C" fn usdbCreateStage(ctx: *mut Context, identifier: *const c_char) {
    let Some(identifier) = cstr(identifier) else {
        return;
    };
    (*ctx).create_stage(identifier);
}

#[no_mangle]
pub unsafe extern "C" fn usdbWrite(ctx: *mut Context, path: *const c_char) -> bool {
    let Some(path) = cstr(path) else {
        return false;
    };
    (*ctx).write(path).is_ok()
}

#[no_mangle]
pub unsafe extern "C" fn usdbSetImportConfig(ctx: *mut Context, conf: *const ImportConfig) {
    (*ctx).set_import_config(std::ptr::read_unaligned(conf));
}

#[no_mangle]
pub unsafe extern "C" fn usdbGetImportConfig(ctx: *mut Context, conf: *mut ImportConfig) {
    std::ptr::write_unaligned(conf, (*ctx).import_config());
}

#[no_mangle]
pub unsafe extern "C" fn usdbSetExportConfig(ctx: *mut Context, conf: *const ExportConfig) {
    (*ctx).set_export_config(std::ptr::read_unaligned(conf));
}

#[no_mangle]
pub unsafe extern "C" fn usdbGetExportConfig(ctx: *mut Context, conf: *mut ExportConfig) {
    std::ptr::write_unaligned(conf, (*ctx).export_config());
}

#[no_mangle]
pub unsafe extern "C" fn usdbSetVariantSelection(
    ctx: *mut Context,
    set: *const c_char,
    variant: *const c_char,
) {
    let (Some(set), Some(variant)) = (cstr(set), cstr(variant)) else {
        return;
    };
    (*ctx).set_variant_selection(set, variant);
}

#[no_mangle]
pub unsafe extern "C" fn usdbGetStartTime(ctx: *mut Context) -> Time {
    (*ctx).start_time()
}

#[no_mangle]
pub unsafe extern "C" fn usdbGetEndTime(ctx: *mut Context) -> Time {
    (*ctx).end_time()
}

#[no_mangle]
pub unsafe extern "C" fn usdbGetRoot(ctx: *mut Context) -> *mut Node {
    match (*ctx).root() {
        Some(node) => node as *const Node as *mut Node,
        None => std::ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn usdbFindNode(ctx: *mut Context, path: *const c_char) -> *mut Node {
    let Some(path) = cstr(path) else {
        return std::ptr::null_mut();
    };
    match (*ctx).find_node(path) {
        Some(node) => node as *const Node as *mut Node,
        None => std::ptr::null_mut(),
    }
}

// ============================================================================
// Node interface
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn usdbGetID(node: *mut Node) -> c_int {
    (*node).id()
}

#[no_mangle]
pub unsafe extern "C" fn usdbGetPath(node: *mut Node) -> *const c_char {
    (*node).c_strings.path.as_ptr()
}

#[no_mangle]
pub unsafe extern "C" fn usdbGetName(node: *mut Node) -> *const c_char {
    (*node).c_strings.name.as_ptr()
}

#[no_mangle]
pub unsafe extern "C" fn usdbGetTypeName(node: *mut Node) -> *const c_char {
    (*node).c_strings.type_name.as_ptr()
}

#[no_mangle]
pub unsafe extern "C" fn usdbGetParent(node: *mut Node) -> *mut Node {
    match (*node).parent() {
        Some(parent) => parent as *const Node as *mut Node,
        None => std::ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn usdbGetNumChildren(node: *mut Node) -> c_int {
    (*node).num_children() as c_int
}

#[no_mangle]
pub unsafe extern "C" fn usdbGetChild(node: *mut Node, i: c_int) -> *mut Node {
    match (*node).child(i as usize) {
        Some(child) => child as *const Node as *mut Node,
        None => std::ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn usdbGetNumAttributes(node: *mut Node) -> c_int {
    (*node).num_attributes() as c_int
}

#[no_mangle]
pub unsafe extern "C" fn usdbGetAttribute(node: *mut Node, i: c_int) -> *mut Attribute {
    match (*node).attribute(i as usize) {
        Some(attr) => attr as *const Attribute as *mut Attribute,
        None => std::ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn usdbFindAttribute(
    node: *mut Node,
    name: *const c_char,
) -> *mut Attribute {
    let Some(name) = cstr(name) else {
        return std::ptr::null_mut();
    };
    match (*node).find_attribute(name) {
        Some(attr) => attr as *const Attribute as *mut Attribute,
        None => std::ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn usdbCreateAttribute(
    node: *mut Node,
    name: *const c_char,
    ty: c_int,
) -> *mut Attribute {
    let Some(name) = cstr(name) else {
        return std::ptr::null_mut();
    };
    match (*node).create_attribute(name, attr_type_from_i32(ty)) {
        Some(attr) => attr as *const Attribute as *mut Attribute,
        None => std::ptr::null_mut(),
    }
}

// ============================================================================
// Kind casts and constructors
// ============================================================================

unsafe fn cast_kind(node: *mut Node, wanted: &[NodeKind]) -> *mut Node {
    if node.is_null() {
        return std::ptr::null_mut();
    }
    if wanted.contains(&(*node).kind()) {
        node
    } else {
        std::ptr::null_mut()
    }
}

/// Down-cast to the transform capability (any kind derived from Xform).
#[no_mangle]
pub unsafe extern "C" fn usdbAsXform(node: *mut Node) -> *mut Node {
    cast_kind(
        node,
        &[NodeKind::Xform, NodeKind::Camera, NodeKind::Mesh, NodeKind::Points],
    )
}

#[no_mangle]
pub unsafe extern "C" fn usdbAsCamera(node: *mut Node) -> *mut Node {
    cast_kind(node, &[NodeKind::Camera])
}

#[no_mangle]
pub unsafe extern "C" fn usdbAsMesh(node: *mut Node) -> *mut Node {
    cast_kind(node, &[NodeKind::Mesh])
}

#[no_mangle]
pub unsafe extern "C" fn usdbAsPoints(node: *mut Node) -> *mut Node {
    cast_kind(node, &[NodeKind::Points])
}

unsafe fn create_kind(
    ctx: *mut Context,
    parent: *mut Node,
    name: *const c_char,
    create: for<'a> fn(&'a mut Context, Option<i32>, &str) -> Option<&'a Node>,
) -> *mut Node {
    let Some(name) = cstr(name) else {
        return std::ptr::null_mut();
    };
    let parent_id = if parent.is_null() { None } else { Some((*parent).id()) };
    match create(&mut *ctx, parent_id, name) {
        Some(node) => node as *const Node as *mut Node,
        None => std::ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn usdbCreateXform(
    ctx: *mut Context,
    parent: *mut Node,
    name: *const c_char,
) -> *mut Node {
    create_kind(ctx, parent, name, Context::create_xform)
}

#[no_mangle]
pub unsafe extern "C" fn usdbCreateCamera(
    ctx: *mut Context,
    parent: *mut Node,
    name: *const c_char,
) -> *mut Node {
    create_kind(ctx, parent, name, Context::create_camera)
}

#[no_mangle]
pub unsafe extern "C" fn usdbCreateMesh(
    ctx: *mut Context,
    parent: *mut Node,
    name: *const c_char,
) -> *mut Node {
    create_kind(ctx, parent, name, Context::create_mesh)
}

#[no_mangle]
pub unsafe extern "C" fn usdbCreatePoints(
    ctx: *mut Context,
    parent: *mut Node,
    name: *const c_char,
) -> *mut Node {
    create_kind(ctx, parent, name, Context::create_points)
}

// ============================================================================
// Per-kind sample I/O
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn usdbXformReadSample(
    node: *mut Node,
    dst: *mut XformData,
    t: Time,
) -> bool {
    let Some(xf) = (*node).as_xform() else {
        return false;
    };
    match xf.read_sample(t) {
        Some(data) => {
            std::ptr::write_unaligned(dst, data);
            true
        }
        None => false,
    }
}

#[no_mangle]
pub unsafe extern "C" fn usdbXformWriteSample(
    node: *mut Node,
    src: *const XformData,
    t: Time,
) -> bool {
    let Some(xf) = (*node).as_xform() else {
        return false;
    };
    xf.write_sample(&std::ptr::read_unaligned(src), t)
}

#[no_mangle]
pub unsafe extern "C" fn usdbCameraReadSample(
    node: *mut Node,
    dst: *mut CameraData,
    t: Time,
) -> bool {
    let Some(cam) = (*node).as_camera() else {
        return false;
    };
    match cam.read_sample(t) {
        Some(data) => {
            std::ptr::write_unaligned(dst, data);
            true
        }
        None => false,
    }
}

#[no_mangle]
pub unsafe extern "C" fn usdbCameraWriteSample(
    node: *mut Node,
    src: *const CameraData,
    t: Time,
) -> bool {
    let Some(cam) = (*node).as_camera() else {
        return false;
    };
    cam.write_sample(&std::ptr::read_unaligned(src), t)
}

unsafe fn copy_out<T: Copy>(dst: *mut T, src: &[T]) {
    if !dst.is_null() && !src.is_empty() {
        std::ptr::copy_nonoverlapping(src.as_ptr(), dst, src.len());
    }
}

unsafe fn slice_in<'a, T>(ptr: *const T, len: u32) -> &'a [T] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, len as usize)
    }
}

#[no_mangle]
pub unsafe extern "C" fn usdbMeshGetSummary(node: *mut Node, dst: *mut MeshSummary) {
    if let Some(mesh) = (*node).as_mesh() {
        std::ptr::write_unaligned(dst, mesh.summary());
    }
}

#[no_mangle]
pub unsafe extern "C" fn usdbMeshReadSample(
    node: *mut Node,
    dst: *mut MeshData,
    t: Time,
) -> bool {
    let Some(mesh) = (*node).as_mesh() else {
        return false;
    };
    let Some(sample) = mesh.read_sample(t) else {
        return false;
    };

    let out = &mut *dst;
    out.num_points = sample.points.len() as u32;
    out.num_counts = sample.counts.len() as u32;
    out.num_indices = sample.indices.len() as u32;
    out.num_indices_triangulated = sample.indices_triangulated.len() as u32;

    copy_out(out.points, &sample.points);
    copy_out(out.velocities, &sample.velocities);
    copy_out(out.normals, &sample.normals);
    copy_out(out.uvs, &sample.uvs);
    copy_out(out.counts, &sample.counts);
    copy_out(out.indices, &sample.indices);
    copy_out(out.indices_triangulated, &sample.indices_triangulated);
    true
}

#[no_mangle]
pub unsafe extern "C" fn usdbMeshWriteSample(
    node: *mut Node,
    src: *const MeshData,
    t: Time,
) -> bool {
    let Some(mesh) = (*node).as_mesh() else {
        return false;
    };
    let data = &*src;
    let sample = MeshSample {
        points: slice_in(data.points, data.num_points).to_vec(),
        velocities: slice_in(data.velocities, data.num_points).to_vec(),
        normals: slice_in(data.normals, data.num_points).to_vec(),
        uvs: slice_in(data.uvs, data.num_points).to_vec(),
        counts: slice_in(data.counts, data.num_counts).to_vec(),
        indices: slice_in(data.indices, data.num_indices).to_vec(),
        indices_triangulated: Vec::new(),
    };
    mesh.write_sample(&sample, t)
}

#[no_mangle]
pub unsafe extern "C" fn usdbPointsGetSummary(node: *mut Node, dst: *mut PointsSummary) {
    if let Some(points) = (*node).as_points() {
        std::ptr::write_unaligned(dst, points.summary());
    }
}

#[no_mangle]
pub unsafe extern "C" fn usdbPointsReadSample(
    node: *mut Node,
    dst: *mut PointsData,
    t: Time,
) -> bool {
    let Some(points) = (*node).as_points() else {
        return false;
    };
    let Some(sample) = points.read_sample(t) else {
        return false;
    };
    let out = &mut *dst;
    out.num_points = sample.points.len() as u32;
    copy_out(out.points, &sample.points);
    copy_out(out.velocities, &sample.velocities);
    true
}

#[no_mangle]
pub unsafe extern "C" fn usdbPointsWriteSample(
    node: *mut Node,
    src: *const PointsData,
    t: Time,
) -> bool {
    let Some(points) = (*node).as_points() else {
        return false;
    };
    let data = &*src;
    let sample = PointsSample {
        points: slice_in(data.points, data.num_points).to_vec(),
        velocities: slice_in(data.velocities, data.num_points).to_vec(),
    };
    points.write_sample(&sample, t)
}

// ============================================================================
// Attribute interface
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn usdbAttrGetName(attr: *mut Attribute) -> *const c_char {
    (*attr).name_c.as_ptr()
}

#[no_mangle]
pub unsafe extern "C" fn usdbAttrGetTypeName(attr: *mut Attribute) -> *const c_char {
    (*attr).type_name_c.as_ptr()
}

#[no_mangle]
pub unsafe extern "C" fn usdbAttrGetType(attr: *mut Attribute) -> c_int {
    (*attr).attr_type() as c_int
}

#[no_mangle]
pub unsafe extern "C" fn usdbAttrGetArraySize(attr: *mut Attribute, t: Time) -> c_int {
    (*attr).array_size(t) as c_int
}

#[no_mangle]
pub unsafe extern "C" fn usdbAttrGetNumSamples(attr: *mut Attribute) -> c_int {
    (*attr).num_samples() as c_int
}

/// Cache strings on the attribute and hand back their `char*`s.
/// Valid until the next string read through the same attribute handle.
unsafe fn cache_strings(attr: &Attribute, items: Vec<String>, out: *mut *const c_char) -> bool {
    let mut cache = attr.cstr_cache.lock();
    cache.clear();
    for item in items {
        cache.push(CString::new(item).unwrap_or_default());
    }
    for (i, c) in cache.iter().enumerate() {
        *out.add(i) = c.as_ptr();
    }
    true
}

#[no_mangle]
pub unsafe extern "C" fn usdbAttrReadSample(
    attr: *mut Attribute,
    dst: *mut c_void,
    t: Time,
) -> bool {
    let attr = &*attr;

    macro_rules! read_pod {
        ($ty:ty) => {{
            let mut tmp = <$ty>::default();
            if attr.read_sample(&mut tmp, t) {
                std::ptr::copy_nonoverlapping(
                    (&tmp as *const $ty).cast::<u8>(),
                    dst.cast::<u8>(),
                    std::mem::size_of::<$ty>(),
                );
                true
            } else {
                false
            }
        }};
    }

    match attr.attr_type() {
        AttributeType::Byte => read_pod!(u8),
        AttributeType::Int => read_pod!(i32),
        AttributeType::UInt => read_pod!(u32),
        AttributeType::Float => read_pod!(f32),
        AttributeType::Float2 => read_pod!(Vec2),
        AttributeType::Float3 => read_pod!(Vec3),
        AttributeType::Float4 => read_pod!(Vec4),
        AttributeType::Quaternion => read_pod!(Quat),
        AttributeType::Token | AttributeType::String => match attr.read_string(t) {
            Some(s) => cache_strings(attr, vec![s], dst.cast::<*const c_char>()),
            None => false,
        },
        _ => false,
    }
}

#[no_mangle]
pub unsafe extern "C" fn usdbAttrReadArraySample(
    attr: *mut Attribute,
    dst: *mut c_void,
    size: c_int,
    t: Time,
) -> bool {
    let attr = &*attr;
    let n = size.max(0) as usize;

    macro_rules! read_pod_array {
        ($ty:ty) => {{
            let mut buf: Vec<$ty> = vec![<$ty>::default(); n];
            if attr.read_array_sample(&mut buf, t) {
                std::ptr::copy_nonoverlapping(
                    buf.as_ptr().cast::<u8>(),
                    dst.cast::<u8>(),
                    n * std::mem::size_of::<$ty>(),
                );
                true
            } else {
                false
            }
        }};
    }

    match attr.attr_type() {
        AttributeType::ByteArray => read_pod_array!(u8),
        AttributeType::IntArray => read_pod_array!(i32),
        AttributeType::UIntArray => read_pod_array!(u32),
        AttributeType::FloatArray => read_pod_array!(f32),
        AttributeType::Float2Array => read_pod_array!(Vec2),
        AttributeType::Float3Array => read_pod_array!(Vec3),
        AttributeType::Float4Array => read_pod_array!(Vec4),
        AttributeType::QuaternionArray => read_pod_array!(Quat),
        AttributeType::TokenArray | AttributeType::StringArray => {
            match attr.read_string_array(t) {
                Some(mut items) => {
                    items.truncate(n);
                    cache_strings(attr, items, dst.cast::<*const c_char>())
                }
                None => false,
            }
        }
        _ => false,
    }
}

#[no_mangle]
pub unsafe extern "C" fn usdbAttrWriteSample(
    attr: *mut Attribute,
    src: *const c_void,
    t: Time,
) -> bool {
    let attr = &*attr;

    macro_rules! write_pod {
        ($ty:ty) => {{
            let tmp = std::ptr::read_unaligned(src.cast::<$ty>());
            attr.write_sample(&tmp, t)
        }};
    }

    match attr.attr_type() {
        AttributeType::Byte => write_pod!(u8),
        AttributeType::Int => write_pod!(i32),
        AttributeType::UInt => write_pod!(u32),
        AttributeType::Float => write_pod!(f32),
        AttributeType::Float2 => write_pod!(Vec2),
        AttributeType::Float3 => write_pod!(Vec3),
        AttributeType::Float4 => write_pod!(Vec4),
        AttributeType::Quaternion => write_pod!(Quat),
        AttributeType::Token | AttributeType::String => {
            match cstr(std::ptr::read_unaligned(src.cast::<*const c_char>())) {
                Some(s) => attr.write_string(s, t),
                None => false,
            }
        }
        _ => false,
    }
}

#[no_mangle]
pub unsafe extern "C" fn usdbAttrWriteArraySample(
    attr: *mut Attribute,
    src: *const c_void,
    size: c_int,
    t: Time,
) -> bool {
    let attr = &*attr;
    let n = size.max(0) as usize;

    macro_rules! write_pod_array {
        ($ty:ty) => {{
            let mut buf: Vec<$ty> = vec![<$ty>::default(); n];
            std::ptr::copy_nonoverlapping(
                src.cast::<u8>(),
                buf.as_mut_ptr().cast::<u8>(),
                n * std::mem::size_of::<$ty>(),
            );
            attr.write_array_sample(&buf, t)
        }};
    }

    match attr.attr_type() {
        AttributeType::ByteArray => write_pod_array!(u8),
        AttributeType::IntArray => write_pod_array!(i32),
        AttributeType::UIntArray => write_pod_array!(u32),
        AttributeType::FloatArray => write_pod_array!(f32),
        AttributeType::Float2Array => write_pod_array!(Vec2),
        AttributeType::Float3Array => write_pod_array!(Vec3),
        AttributeType::Float4Array => write_pod_array!(Vec4),
        AttributeType::QuaternionArray => write_pod_array!(Quat),
        AttributeType::TokenArray | AttributeType::StringArray => {
            let ptrs = std::slice::from_raw_parts(src.cast::<*const c_char>(), n);
            let mut items = Vec::with_capacity(n);
            for &p in ptrs {
                match cstr(p) {
                    Some(s) => items.push(s.to_string()),
                    None => return false,
                }
            }
            attr.write_string_array(&items, t)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    fn write_scene() -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new()
            .suffix(".usda")
            .tempfile()
            .expect("temp file");
        f.write_all(
            b"#usda 1.0\n\
              def Xform \"world\"\n\
              {\n\
                  float3 xformOp:translate = (1, 2, 3)\n\
                  uniform token[] xformOpOrder = [\"xformOp:translate\"]\n\
                  def Mesh \"tri\"\n\
                  {\n\
                      point3f[] points = [(0, 0, 0), (1, 0, 0), (0, 1, 0)]\n\
                      int[] faceVertexCounts = [3]\n\
                      int[] faceVertexIndices = [0, 1, 2]\n\
                  }\n\
              }\n",
        )
        .unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn test_open_null_and_missing_path() {
        unsafe {
            let ctx = usdbCreateContext();
            assert!(!usdbOpen(ctx, std::ptr::null()));
            assert!(usdbGetRoot(ctx).is_null());
            assert!(!usdbOpen(ctx, c("/nonexistent.usda").as_ptr()));
            assert!(usdbGetRoot(ctx).is_null());
            usdbDestroyContext(ctx);
        }
    }

    #[test]
    fn test_open_traverse_and_casts() {
        let scene = write_scene();
        let path = c(scene.path().to_str().unwrap());
        unsafe {
            let ctx = usdbCreateContext();
            assert!(usdbOpen(ctx, path.as_ptr()));

            let root = usdbGetRoot(ctx);
            assert!(!root.is_null());
            assert!(usdbGetParent(root).is_null());
            assert_eq!(usdbGetNumChildren(root), 1);

            let world = usdbGetChild(root, 0);
            assert_eq!(CStr::from_ptr(usdbGetPath(world)).to_str().unwrap(), "/world");
            assert_eq!(CStr::from_ptr(usdbGetTypeName(world)).to_str().unwrap(), "Xform");
            assert!(!usdbAsXform(world).is_null());
            assert!(usdbAsMesh(world).is_null());

            let tri = usdbGetChild(world, 0);
            assert!(!usdbAsMesh(tri).is_null());
            assert!(!usdbAsXform(tri).is_null());
            assert!(usdbAsCamera(tri).is_null());
            assert_eq!(usdbGetParent(tri), world);

            // Attribute lookup + typed read through the flat protocol
            let attr = usdbFindAttribute(world, c("xformOp:translate").as_ptr());
            assert!(!attr.is_null());
            assert_eq!(usdbAttrGetType(attr), AttributeType::Float3 as i32);
            let mut v = Vec3::ZERO;
            assert!(usdbAttrReadSample(attr, (&mut v as *mut Vec3).cast(), 0.0));
            assert_eq!(v, Vec3::new(1.0, 2.0, 3.0));

            usdbDestroyContext(ctx);
        }
    }

    #[test]
    fn test_mesh_read_null_fields() {
        let scene = write_scene();
        let path = c(scene.path().to_str().unwrap());
        unsafe {
            let ctx = usdbCreateContext();
            // Identity import so the fixture points come back verbatim.
            let mut conf = ImportConfig::default();
            conf.swap_handedness = false;
            conf.swap_faces = false;
            usdbSetImportConfig(ctx, &conf);
            assert!(usdbOpen(ctx, path.as_ptr()));

            let mesh = usdbAsMesh(usdbGetChild(usdbGetChild(usdbGetRoot(ctx), 0), 0));
            assert!(!mesh.is_null());

            let mut summary = MeshSummary::default();
            usdbMeshGetSummary(mesh, &mut summary);
            assert_eq!(summary.peak_num_points, 3);
            assert_eq!(summary.peak_num_counts, 1);
            assert_eq!(summary.topology_variance, crate::schema::TopologyVariance::Constant);

            // Only the points destination is non-null; counts stay
            // reported but uncopied.
            let mut points = vec![Vec3::ZERO; summary.peak_num_points as usize];
            let mut data = MeshData {
                points: points.as_mut_ptr(),
                ..Default::default()
            };
            assert!(usdbMeshReadSample(mesh, &mut data, 0.0));
            assert_eq!(data.num_points, 3);
            assert_eq!(data.num_counts, 1);
            assert_eq!(data.num_indices_triangulated, 3);
            assert_eq!(points[1], Vec3::new(1.0, 0.0, 0.0));

            usdbDestroyContext(ctx);
        }
    }

    #[test]
    fn test_create_write_reopen_roundtrip() {
        let out = tempfile::Builder::new()
            .suffix(".usda")
            .tempfile()
            .expect("temp file");
        let out_path = c(out.path().to_str().unwrap());
        unsafe {
            let ctx = usdbCreateContext();
            usdbCreateStage(ctx, c("roundtrip.usda").as_ptr());
            let xf = usdbCreateXform(ctx, std::ptr::null_mut(), c("rig").as_ptr());
            assert!(!xf.is_null());

            let written = XformData {
                position: Vec3::new(1.0, 2.0, 3.0),
                rotation: Quat::from_rotation_y(0.25),
                scale: Vec3::ONE,
            };
            assert!(usdbXformWriteSample(xf, &written, 0.0));
            assert!(usdbWrite(ctx, out_path.as_ptr()));

            // Reopen and verify kind + sample
            assert!(usdbOpen(ctx, out_path.as_ptr()));
            let node = usdbFindNode(ctx, c("/rig").as_ptr());
            assert!(!node.is_null());
            let xf = usdbAsXform(node);
            assert!(!xf.is_null());
            let mut read = XformData::default();
            assert!(usdbXformReadSample(xf, &mut read, 0.0));
            assert!((read.position - written.position).length() < 1e-5);
            assert!(read.rotation.angle_between(written.rotation) < 1e-5);

            usdbDestroyContext(ctx);
        }
    }

    #[test]
    fn test_attr_create_and_array_io() {
        unsafe {
            let ctx = usdbCreateContext();
            usdbCreateStage(ctx, c("attrs.usda").as_ptr());
            let node = usdbCreateXform(ctx, std::ptr::null_mut(), c("n").as_ptr());

            let attr = usdbCreateAttribute(
                node,
                c("weights").as_ptr(),
                AttributeType::FloatArray as i32,
            );
            assert!(!attr.is_null());

            let src = [0.25f32, 0.5, 0.75];
            assert!(usdbAttrWriteArraySample(attr, src.as_ptr().cast(), 3, 0.0));
            assert_eq!(usdbAttrGetArraySize(attr, 0.0), 3);
            assert_eq!(usdbAttrGetNumSamples(attr), 1);

            let mut dst = [0.0f32; 3];
            assert!(usdbAttrReadArraySample(attr, dst.as_mut_ptr().cast(), 3, 0.0));
            assert_eq!(dst, src);

            // Token attribute through the char* protocol
            let tok = usdbCreateAttribute(node, c("tag").as_ptr(), AttributeType::Token as i32);
            let value = c("hero");
            let value_ptr = value.as_ptr();
            assert!(usdbAttrWriteSample(
                tok,
                (&value_ptr as *const *const c_char).cast(),
                0.0
            ));
            let mut read_ptr: *const c_char = std::ptr::null();
            assert!(usdbAttrReadSample(tok, (&mut read_ptr as *mut *const c_char).cast(), 0.0));
            assert_eq!(CStr::from_ptr(read_ptr).to_str().unwrap(), "hero");

            usdbDestroyContext(ctx);
        }
    }
}
