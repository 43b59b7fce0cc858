//! Integration tests for opening documents and traversing the node tree.

use std::collections::HashSet;
use std::io::Write;

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

const TWO_NODE_SCENE: &str = "#usda 1.0\n\
def Xform \"world\"\n\
{\n\
    float3 xformOp:translate = (0, 1, 0)\n\
    uniform token[] xformOpOrder = [\"xformOp:translate\"]\n\
    def Mesh \"tri\"\n\
    {\n\
        point3f[] points = [(0, 0, 0), (1, 0, 0), (0, 1, 0)]\n\
        int[] faceVertexCounts = [3]\n\
        int[] faceVertexIndices = [0, 1, 2]\n\
    }\n\
}\n";

const ZOO_SCENE: &str = "#usda 1.0\n\
(\n\
    startTimeCode = 1\n\
    endTimeCode = 24\n\
)\n\
def Xform \"world\"\n\
{\n\
    def Camera \"shotCam\"\n\
    {\n\
        float focalLength = 50\n\
    }\n\
    def Mesh \"prop\"\n\
    {\n\
        point3f[] points = [(0, 0, 0)]\n\
    }\n\
    def Points \"spray\"\n\
    {\n\
        point3f[] points = [(0, 0, 0)]\n\
    }\n\
    def Scope \"materials\"\n\
    {\n\
    }\n\
}\n";

fn open(path: &std::path::Path) -> Context {
    let mut ctx = Context::new();
    ctx.open(path.to_str().unwrap()).expect("open failed");
    ctx
}

#[test]
fn test_traversal_visits_every_node_once_with_correct_parent() {
    let scene = scene_file(ZOO_SCENE);
    let ctx = open(scene.path());

    // Depth-first walk from the root
    fn walk<'a>(node: &'a Node, visited: &mut Vec<&'a Node>) {
        visited.push(node);
        for child in node.children() {
            assert_eq!(
                child.parent().map(|p| p.id()),
                Some(node.id()),
                "child {} must report the node it was reached through",
                child.path()
            );
            walk(child, visited);
        }
    }

    let mut visited = Vec::new();
    walk(ctx.root().unwrap(), &mut visited);

    let walked: HashSet<&str> = visited.iter().map(|n| n.path()).collect();
    let registered: HashSet<&str> = ctx.nodes().map(|n| n.path()).collect();
    assert_eq!(visited.len(), walked.len(), "no node may be visited twice");
    assert_eq!(walked, registered, "traversal must reach every created node");
    assert_eq!(ctx.num_nodes(), 6); // root + world + 4 children
}

#[test]
fn test_ids_distinct_and_increasing_in_creation_order() {
    let scene = scene_file(ZOO_SCENE);
    let ctx = open(scene.path());

    let ids: Vec<i32> = ctx.nodes().map(|n| n.id()).collect();
    assert_eq!(ids[0], 1, "ids start at 1 for a fresh session");
    for pair in ids.windows(2) {
        assert!(pair[0] < pair[1], "ids must strictly increase");
    }
}

#[test]
fn test_classification_determinism_across_reopen() {
    let scene = scene_file(ZOO_SCENE);
    let first: Vec<(String, NodeKind)> = {
        let ctx = open(scene.path());
        ctx.nodes().map(|n| (n.path().to_string(), n.kind())).collect()
    };
    let second: Vec<(String, NodeKind)> = {
        let ctx = open(scene.path());
        ctx.nodes().map(|n| (n.path().to_string(), n.kind())).collect()
    };
    assert_eq!(first, second);
}

#[test]
fn test_kind_classification_and_casts() {
    let scene = scene_file(ZOO_SCENE);
    let ctx = open(scene.path());

    assert_eq!(ctx.find_node("/world").unwrap().kind(), NodeKind::Xform);
    assert_eq!(ctx.find_node("/world/shotCam").unwrap().kind(), NodeKind::Camera);
    assert_eq!(ctx.find_node("/world/prop").unwrap().kind(), NodeKind::Mesh);
    assert_eq!(ctx.find_node("/world/spray").unwrap().kind(), NodeKind::Points);
    // Unmatched schema types stay in the tree as Unknown
    let scope = ctx.find_node("/world/materials").unwrap();
    assert_eq!(scope.kind(), NodeKind::Unknown);
    assert!(scope.as_xform().is_none());

    // Every transform-bearing kind down-casts to Xform
    for path in ["/world", "/world/shotCam", "/world/prop", "/world/spray"] {
        assert!(ctx.find_node(path).unwrap().as_xform().is_some(), "{path}");
    }
    // Exact-kind casts reject other kinds
    let cam = ctx.find_node("/world/shotCam").unwrap();
    assert!(cam.as_camera().is_some());
    assert!(cam.as_mesh().is_none());
    assert!(cam.as_points().is_none());
}

#[test]
fn test_two_node_scenario_with_mesh_summary() {
    let scene = scene_file(TWO_NODE_SCENE);
    let ctx = open(scene.path());

    // Two scene nodes under the synthetic root
    let scene_nodes: Vec<&Node> = ctx.nodes().filter(|n| n.path() != "/").collect();
    assert_eq!(scene_nodes.len(), 2);
    assert_eq!(scene_nodes[0].kind(), NodeKind::Xform);
    assert_eq!(scene_nodes[1].kind(), NodeKind::Mesh);

    let mesh = scene_nodes[1].as_mesh().unwrap();
    let summary = mesh.summary();
    assert_eq!(summary.peak_num_points, 3);
    assert_eq!(summary.peak_num_counts, 1);
    assert_eq!(summary.topology_variance, TopologyVariance::Constant);
}

#[test]
fn test_open_failures_leave_context_reusable() {
    let mut ctx = Context::new();
    assert!(ctx.open("/nonexistent/scene.usda").is_err());
    assert!(ctx.root().is_none());
    assert_eq!(ctx.num_nodes(), 0);

    // Corrupt document (bad header)
    let bad = scene_file("not a scene\n");
    assert!(ctx.open(bad.path().to_str().unwrap()).is_err());
    assert!(ctx.root().is_none());

    // The same context still opens a good document afterwards
    let good = scene_file(TWO_NODE_SCENE);
    assert!(ctx.open(good.path().to_str().unwrap()).is_ok());
    assert!(ctx.root().is_some());
}

#[test]
fn test_reopen_resets_prior_session() {
    let a = scene_file(ZOO_SCENE);
    let b = scene_file(TWO_NODE_SCENE);

    let mut ctx = Context::new();
    ctx.open(a.path().to_str().unwrap()).unwrap();
    assert_eq!(ctx.num_nodes(), 6);

    ctx.open(b.path().to_str().unwrap()).unwrap();
    assert_eq!(ctx.num_nodes(), 3);
    // Ids restart for the new session
    assert_eq!(ctx.root().unwrap().id(), 1);
}

#[test]
fn test_inactive_children_are_skipped() {
    let scene = scene_file(
        "#usda 1.0\n\
         def Xform \"world\"\n\
         {\n\
             def Mesh \"kept\"\n\
             {\n\
             }\n\
             def Mesh \"dropped\" (\n\
                 active = false\n\
             )\n\
             {\n\
             }\n\
         }\n",
    );
    let ctx = open(scene.path());
    assert!(ctx.find_node("/world/kept").is_some());
    assert!(ctx.find_node("/world/dropped").is_none());
    assert_eq!(ctx.find_node("/world").unwrap().num_children(), 1);
}

#[test]
fn test_variant_selection_applied_at_open() {
    let content = "#usda 1.0\n\
def Xform \"world\"\n\
{\n\
    variantSet \"lod\" = {\n\
        \"high\" {\n\
            def Mesh \"hi\" {\n\
            }\n\
        }\n\
        \"low\" {\n\
            def Mesh \"lo\" {\n\
            }\n\
        }\n\
    }\n\
}\n";
    let scene = scene_file(content);
    let path = scene.path().to_str().unwrap();

    // No selection: neither alternate hierarchy is visible
    let ctx = open(scene.path());
    assert_eq!(ctx.find_node("/world").unwrap().num_children(), 0);
    drop(ctx);

    let mut ctx = Context::new();
    ctx.set_variant_selection("lod", "low");
    ctx.open(path).unwrap();
    assert!(ctx.find_node("/world/lo").is_some());
    assert!(ctx.find_node("/world/hi").is_none());

    // Selections persist across reopen on the same context
    ctx.set_variant_selection("lod", "high");
    ctx.open(path).unwrap();
    assert!(ctx.find_node("/world/hi").is_some());
    assert!(ctx.find_node("/world/lo").is_none());
}

#[test]
fn test_session_time_range() {
    let scene = scene_file(ZOO_SCENE);
    let ctx = open(scene.path());
    assert_eq!(ctx.start_time(), 1.0);
    assert_eq!(ctx.end_time(), 24.0);
}
