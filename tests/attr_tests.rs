//! Integration tests for the type-tagged attribute protocol.

use std::io::Write;

use glam::{Quat, Vec2, Vec3, Vec4};
use usd_bridge::prelude::*;

fn scene_file(content: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new()
        .suffix(".usda")
        .tempfile()
        .expect("Failed to create temp file");
    f.write_all(content.as_bytes()).expect("write scene");
    f.flush().unwrap();
    f
}

const TYPED_SCENE: &str = "#usda 1.0\n\
def Xform \"typed\"\n\
{\n\
    uchar flags = 7\n\
    int count = -3\n\
    uint mask = 12\n\
    float weight = 2.5\n\
    float2 range = (0.5, 1.5)\n\
    float3 tint = (1, 0, 0.5)\n\
    float4 plane = (0, 1, 0, 2)\n\
    quatf twist = (1, 0, 0, 0)\n\
    token mode = \"rigid\"\n\
    string note = \"hello world\"\n\
    int[] ids = [10, 20, 30]\n\
    float[] weights = [0.25, 0.5]\n\
    float3[] offsets = [(1, 0, 0), (0, 1, 0)]\n\
    token[] tags = [\"a\", \"b\", \"c\"]\n\
    matrix4d xformOp:transform = ( (1, 0, 0, 0), (0, 1, 0, 0), (0, 0, 1, 0), (0, 0, 0, 1) )\n\
}\n";

fn open_typed() -> (tempfile::NamedTempFile, Context) {
    let scene = scene_file(TYPED_SCENE);
    let mut ctx = Context::new();
    ctx.open(scene.path().to_str().unwrap()).expect("open failed");
    (scene, ctx)
}

#[test]
fn test_discovered_tags_and_type_names() {
    let (_scene, ctx) = open_typed();
    let node = ctx.find_node("/typed").unwrap();
    assert_eq!(node.num_attributes(), 15);

    let expect = [
        ("flags", AttributeType::Byte, "uchar"),
        ("count", AttributeType::Int, "int"),
        ("mask", AttributeType::UInt, "uint"),
        ("weight", AttributeType::Float, "float"),
        ("range", AttributeType::Float2, "float2"),
        ("tint", AttributeType::Float3, "float3"),
        ("plane", AttributeType::Float4, "float4"),
        ("twist", AttributeType::Quaternion, "quatf"),
        ("mode", AttributeType::Token, "token"),
        ("note", AttributeType::String, "string"),
        ("ids", AttributeType::IntArray, "int[]"),
        ("weights", AttributeType::FloatArray, "float[]"),
        ("offsets", AttributeType::Float3Array, "float3[]"),
        ("tags", AttributeType::TokenArray, "token[]"),
        // Native-only kind collapses to the Unknown tag but keeps its name
        ("xformOp:transform", AttributeType::Unknown, "matrix4d"),
    ];
    for (name, tag, type_name) in expect {
        let attr = node.find_attribute(name).unwrap_or_else(|| panic!("missing {name}"));
        assert_eq!(attr.attr_type(), tag, "{name}");
        assert_eq!(attr.type_name(), type_name, "{name}");
    }
}

#[test]
fn test_scalar_reads() {
    let (_scene, ctx) = open_typed();
    let node = ctx.find_node("/typed").unwrap();

    let mut b = 0u8;
    assert!(node.find_attribute("flags").unwrap().read_sample(&mut b, 0.0));
    assert_eq!(b, 7);

    let mut i = 0i32;
    assert!(node.find_attribute("count").unwrap().read_sample(&mut i, 0.0));
    assert_eq!(i, -3);

    let mut u = 0u32;
    assert!(node.find_attribute("mask").unwrap().read_sample(&mut u, 0.0));
    assert_eq!(u, 12);

    let mut f = 0.0f32;
    assert!(node.find_attribute("weight").unwrap().read_sample(&mut f, 0.0));
    assert_eq!(f, 2.5);

    let mut v2 = Vec2::ZERO;
    assert!(node.find_attribute("range").unwrap().read_sample(&mut v2, 0.0));
    assert_eq!(v2, Vec2::new(0.5, 1.5));

    let mut v3 = Vec3::ZERO;
    assert!(node.find_attribute("tint").unwrap().read_sample(&mut v3, 0.0));
    assert_eq!(v3, Vec3::new(1.0, 0.0, 0.5));

    let mut v4 = Vec4::ZERO;
    assert!(node.find_attribute("plane").unwrap().read_sample(&mut v4, 0.0));
    assert_eq!(v4, Vec4::new(0.0, 1.0, 0.0, 2.0));

    let mut q = Quat::IDENTITY;
    assert!(node.find_attribute("twist").unwrap().read_sample(&mut q, 0.0));
    assert_eq!(q, Quat::IDENTITY);

    assert_eq!(
        node.find_attribute("mode").unwrap().read_string(0.0).as_deref(),
        Some("rigid")
    );
    assert_eq!(
        node.find_attribute("note").unwrap().read_string(0.0).as_deref(),
        Some("hello world")
    );
}

#[test]
fn test_array_reads_sized_by_query() {
    let (_scene, ctx) = open_typed();
    let node = ctx.find_node("/typed").unwrap();

    let ids = node.find_attribute("ids").unwrap();
    let n = ids.array_size(0.0);
    assert_eq!(n, 3);
    let mut buf = vec![0i32; n];
    assert!(ids.read_array_sample(&mut buf, 0.0));
    assert_eq!(buf, vec![10, 20, 30]);

    let offsets = node.find_attribute("offsets").unwrap();
    let mut buf = vec![Vec3::ZERO; offsets.array_size(0.0)];
    assert!(offsets.read_array_sample(&mut buf, 0.0));
    assert_eq!(buf, vec![Vec3::X, Vec3::Y]);

    let tags = node.find_attribute("tags").unwrap();
    assert_eq!(tags.array_size(0.0), 3);
    assert_eq!(
        tags.read_string_array(0.0).unwrap(),
        vec!["a".to_string(), "b".into(), "c".into()]
    );
}

#[test]
fn test_unknown_tag_is_traversable_not_readable() {
    let (_scene, ctx) = open_typed();
    let node = ctx.find_node("/typed").unwrap();
    let attr = node.find_attribute("xformOp:transform").unwrap();
    assert_eq!(attr.attr_type(), AttributeType::Unknown);
    let mut buf = [0.0f32; 16];
    assert!(!attr.read_array_sample(&mut buf, 0.0));
}

#[test]
fn test_heterogenous_array_size_varies_and_exact_reads_succeed() {
    let scene = scene_file(
        "#usda 1.0\n\
         def Points \"spray\"\n\
         {\n\
             point3f[] points.timeSamples = {\n\
                 0: [(0, 0, 0)],\n\
                 10: [(0, 0, 0), (1, 0, 0), (0, 1, 0)],\n\
             }\n\
         }\n",
    );
    let mut ctx = Context::new();
    ctx.open(scene.path().to_str().unwrap()).unwrap();
    let node = ctx.find_node("/spray").unwrap();
    let attr = node.find_attribute("points").unwrap();

    // Sizes legitimately differ between time coordinates
    let n0 = attr.array_size(0.0);
    let n1 = attr.array_size(10.0);
    assert_eq!(n0, 1);
    assert_eq!(n1, 3);

    // A buffer sized by the query at the same coordinate never fails
    let mut buf = vec![Vec3::ZERO; n0];
    assert!(attr.read_array_sample(&mut buf, 0.0));
    let mut buf = vec![Vec3::ZERO; n1];
    assert!(attr.read_array_sample(&mut buf, 10.0));
}

#[test]
fn test_time_sample_counts_and_interpolation() {
    let scene = scene_file(
        "#usda 1.0\n\
         def Xform \"anim\"\n\
         {\n\
             float blend.timeSamples = {\n\
                 0: 0,\n\
                 10: 1,\n\
             }\n\
         }\n",
    );
    let path = scene.path().to_str().unwrap().to_string();

    // Linear (default) blends between bracketing samples
    let mut ctx = Context::new();
    ctx.open(&path).unwrap();
    let node = ctx.find_node("/anim").unwrap();
    let attr = node.find_attribute("blend").unwrap();
    assert_eq!(attr.num_samples(), 2);
    let mut v = 0.0f32;
    assert!(attr.read_sample(&mut v, 5.0));
    assert!((v - 0.5).abs() < 1e-6);

    // Held snaps to the nearest sample at or before
    let mut held = ctx.import_config();
    held.interpolation = Interpolation::Held;
    ctx.set_import_config(held);
    let node = ctx.find_node("/anim").unwrap();
    let attr = node.find_attribute("blend").unwrap();
    let mut v = 9.0f32;
    assert!(attr.read_sample(&mut v, 5.0));
    assert_eq!(v, 0.0);
}

#[test]
fn test_sample_not_found_is_reported_not_fatal() {
    let scene = scene_file(
        "#usda 1.0\n\
         def Xform \"sparse\"\n\
         {\n\
             float3 declared_only\n\
         }\n",
    );
    let mut ctx = Context::new();
    ctx.open(scene.path().to_str().unwrap()).unwrap();
    let node = ctx.find_node("/sparse").unwrap();

    let attr = node.find_attribute("declared_only").unwrap();
    assert_eq!(attr.num_samples(), 0);
    let mut v = Vec3::ZERO;
    assert!(!attr.read_sample(&mut v, 0.0));
    // The failed read changes nothing; the attribute stays usable
    assert_eq!(attr.attr_type(), AttributeType::Float3);
}

#[test]
fn test_create_attribute_and_write_on_fresh_stage() {
    let mut ctx = Context::new();
    ctx.create_stage("authored.usda");
    let id = ctx.create_xform(None, "rig").unwrap().id();

    let attr = ctx
        .create_attribute(id, "custom:mass", AttributeType::Float)
        .expect("create_attribute failed");
    assert_eq!(attr.attr_type(), AttributeType::Float);
    assert!(attr.write_sample(&12.5f32, 0.0));

    let node = ctx.node_by_id(id).unwrap();
    assert_eq!(node.num_attributes(), 1);
    let mut v = 0.0f32;
    assert!(node.find_attribute("custom:mass").unwrap().read_sample(&mut v, 0.0));
    assert_eq!(v, 12.5);

    // Duplicate creation is rejected
    assert!(ctx.create_attribute(id, "custom:mass", AttributeType::Float).is_none());
}

#[test]
fn test_writes_rejected_on_opened_session() {
    let scene = scene_file(TYPED_SCENE);
    let mut ctx = Context::new();
    ctx.open(scene.path().to_str().unwrap()).unwrap();
    let node = ctx.find_node("/typed").unwrap();

    // Opened documents are read-only sessions
    let attr = node.find_attribute("weight").unwrap();
    assert!(!attr.write_sample(&9.0f32, 0.0));
    let mut v = 0.0f32;
    assert!(attr.read_sample(&mut v, 0.0));
    assert_eq!(v, 2.5, "rejected write must not alter the sample");

    let id = node.id();
    assert!(ctx.create_attribute(id, "custom:new", AttributeType::Int).is_none());
}

#[test]
fn test_roundtrip_custom_attribute_through_file() {
    let out = tempfile::Builder::new().suffix(".usda").tempfile().unwrap();
    let path = out.path().to_str().unwrap();

    {
        let mut ctx = Context::new();
        ctx.create_stage("attrs.usda");
        let id = ctx.create_xform(None, "rig").unwrap().id();
        let attr = ctx
            .create_attribute(id, "custom:offsets", AttributeType::Float3Array)
            .unwrap();
        assert!(attr.write_array_sample(&[Vec3::X, Vec3::Y], 0.0));
        assert!(attr.write_array_sample(&[Vec3::Z], 10.0));
        ctx.write(path).unwrap();
    }

    let mut ctx = Context::new();
    ctx.open(path).unwrap();
    let node = ctx.find_node("/rig").unwrap();
    let attr = node.find_attribute("custom:offsets").unwrap();
    assert_eq!(attr.attr_type(), AttributeType::Float3Array);
    assert_eq!(attr.num_samples(), 2);
    assert_eq!(attr.array_size(0.0), 2);
    assert_eq!(attr.array_size(10.0), 1);
    let mut buf = vec![Vec3::ZERO; 2];
    assert!(attr.read_array_sample(&mut buf, 0.0));
    assert_eq!(buf, vec![Vec3::X, Vec3::Y]);
}
