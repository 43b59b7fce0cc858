//! usd-bridge CLI - Tool for inspecting bridged scene documents.

use std::env;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};

use glam::{Quat, Vec2, Vec3, Vec4};
use usd_bridge::prelude::*;

/// Verbosity level (thread-safe)
const LOG_QUIET: u8 = 0;
const LOG_INFO: u8 = 1;
const LOG_DEBUG: u8 = 2;
const LOG_TRACE: u8 = 3;

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LOG_INFO);

#[inline]
fn log_level() -> u8 {
    LOG_LEVEL.load(Ordering::Relaxed)
}

#[inline]
fn set_log_level(level: u8) {
    LOG_LEVEL.store(level, Ordering::Relaxed);
}

macro_rules! info {
    ($($arg:tt)*) => {
        if log_level() >= LOG_INFO {
            println!("[INFO] {}", format!($($arg)*));
        }
    };
}

macro_rules! debug {
    ($($arg:tt)*) => {
        if log_level() >= LOG_DEBUG {
            println!("[DEBUG] {}", format!($($arg)*));
        }
    };
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => {
                set_log_level(LOG_DEBUG);
                set_debug_level(3);
            }
            "-vv" | "--trace" => {
                set_log_level(LOG_TRACE);
                set_debug_level(4);
            }
            "-q" | "--quiet" => set_log_level(LOG_QUIET),
            _ => filtered_args.push(arg),
        }
    }

    if filtered_args.is_empty() {
        print_usage(&args[0]);
        return;
    }

    match filtered_args[0] {
        "info" | "i" => {
            if filtered_args.len() < 2 {
                eprintln!("Usage: {} info <file.usda>", args[0]);
                std::process::exit(1);
            }
            cmd_info(filtered_args[1]);
        }
        "tree" | "t" => {
            if filtered_args.len() < 2 {
                eprintln!("Usage: {} tree <file.usda>", args[0]);
                std::process::exit(1);
            }
            cmd_tree(filtered_args[1]);
        }
        "dump" | "d" => {
            if filtered_args.len() < 2 {
                eprintln!("Usage: {} dump <file.usda>", args[0]);
                std::process::exit(1);
            }
            cmd_dump(filtered_args[1]);
        }
        "json" | "j" => {
            if filtered_args.len() < 2 {
                eprintln!("Usage: {} json <file.usda>", args[0]);
                std::process::exit(1);
            }
            cmd_json(filtered_args[1]);
        }
        "help" | "h" | "-h" | "--help" => print_usage(&args[0]),
        _ => {
            // Assume it's a file path
            if Path::new(filtered_args[0]).exists() {
                cmd_dump(filtered_args[0]);
            } else {
                eprintln!("Unknown command: {}", filtered_args[0]);
                print_usage(&args[0]);
                std::process::exit(1);
            }
        }
    }
}

fn print_usage(prog: &str) {
    println!("usd-bridge CLI - Inspect bridged scene documents");
    println!();
    println!("Usage: {prog} [options] <command> <file.usda>");
    println!();
    println!("Commands:");
    println!("  i, info    Show document info and node counts");
    println!("  t, tree    Show the node hierarchy");
    println!("  d, dump    Show nodes with typed attribute values");
    println!("  j, json    Dump the hierarchy as JSON");
    println!("  h, help    Show this help");
    println!();
    println!("Options:");
    println!("  -v, --verbose  Debug output");
    println!("  -vv, --trace   Trace output (very verbose)");
    println!("  -q, --quiet    Suppress output");
}

fn open_or_die(path: &str) -> Context {
    info!("Opening document: {}", path);
    let mut ctx = Context::new();
    if let Err(e) = ctx.open(path) {
        eprintln!("Failed to open {path}: {e}");
        std::process::exit(1);
    }
    debug!("Document opened: {} nodes", ctx.num_nodes());
    ctx
}

fn cmd_info(path: &str) {
    let ctx = open_or_die(path);

    println!("Document: {path}");
    println!("Time range: {} .. {}", ctx.start_time(), ctx.end_time());
    println!();

    let mut counts = NodeCounts::default();
    for node in ctx.nodes() {
        counts.add(node);
    }

    println!("Nodes:");
    println!("  Xforms:  {}", counts.xform);
    println!("  Meshes:  {} ({} peak vertices)", counts.mesh, counts.peak_verts);
    println!("  Points:  {}", counts.points);
    println!("  Cameras: {}", counts.camera);
    if counts.unknown > 0 {
        println!("  Other:   {}", counts.unknown);
    }
    println!();
    println!("Total nodes: {}", counts.total());
}

#[derive(Default)]
struct NodeCounts {
    xform: usize,
    camera: usize,
    mesh: usize,
    points: usize,
    unknown: usize,
    peak_verts: usize,
}

impl NodeCounts {
    fn add(&mut self, node: &Node) {
        match node.kind() {
            NodeKind::Xform => self.xform += 1,
            NodeKind::Camera => self.camera += 1,
            NodeKind::Mesh => {
                self.mesh += 1;
                if let Some(mesh) = node.as_mesh() {
                    self.peak_verts += mesh.summary().peak_num_points as usize;
                }
            }
            NodeKind::Points => self.points += 1,
            NodeKind::Unknown => self.unknown += 1,
        }
    }

    fn total(&self) -> usize {
        self.xform + self.camera + self.mesh + self.points + self.unknown
    }
}

fn cmd_tree(path: &str) {
    let ctx = open_or_die(path);

    println!("Document: {path}");
    println!();
    if let Some(root) = ctx.root() {
        println!("/");
        for child in root.children() {
            print_tree(child, 1);
        }
    }
}

fn print_tree(node: &Node, depth: usize) {
    println!(
        "{}{} [{}] id={}",
        "  ".repeat(depth),
        node.name(),
        node.kind().name(),
        node.id()
    );
    for child in node.children() {
        print_tree(child, depth + 1);
    }
}

fn cmd_dump(path: &str) {
    let ctx = open_or_die(path);
    let t = ctx.start_time();
    if let Some(root) = ctx.root() {
        for child in root.children() {
            dump_node(child, t);
        }
    }
}

fn dump_node(node: &Node, t: Time) {
    println!("  {} ({})", node.path(), node.type_name());
    for attr in node.attributes() {
        println!(
            "    {} ({}): {}",
            attr.name(),
            attr.type_name(),
            format_attr(attr, t)
        );
    }
    for child in node.children() {
        dump_node(child, t);
    }
}

/// Read and format one attribute value, dispatching on the type tag.
fn format_attr(attr: &Attribute, t: Time) -> String {
    macro_rules! scalar {
        ($ty:ty, $init:expr) => {{
            let mut v: $ty = $init;
            if attr.read_sample(&mut v, t) {
                format!("{v:?}")
            } else {
                "<no sample>".to_string()
            }
        }};
    }
    macro_rules! array {
        ($ty:ty, $init:expr) => {{
            let mut v: Vec<$ty> = vec![$init; attr.array_size(t)];
            if attr.read_array_sample(&mut v, t) {
                format!("{v:?}")
            } else {
                "<no sample>".to_string()
            }
        }};
    }

    match attr.attr_type() {
        AttributeType::Byte => scalar!(u8, 0),
        AttributeType::Int => scalar!(i32, 0),
        AttributeType::UInt => scalar!(u32, 0),
        AttributeType::Float => scalar!(f32, 0.0),
        AttributeType::Float2 => scalar!(Vec2, Vec2::ZERO),
        AttributeType::Float3 => scalar!(Vec3, Vec3::ZERO),
        AttributeType::Float4 => scalar!(Vec4, Vec4::ZERO),
        AttributeType::Quaternion => scalar!(Quat, Quat::IDENTITY),
        AttributeType::Token | AttributeType::String => match attr.read_string(t) {
            Some(s) => format!("{s:?}"),
            None => "<no sample>".to_string(),
        },
        AttributeType::ByteArray => array!(u8, 0),
        AttributeType::IntArray => array!(i32, 0),
        AttributeType::UIntArray => array!(u32, 0),
        AttributeType::FloatArray => array!(f32, 0.0),
        AttributeType::Float2Array => array!(Vec2, Vec2::ZERO),
        AttributeType::Float3Array => array!(Vec3, Vec3::ZERO),
        AttributeType::Float4Array => array!(Vec4, Vec4::ZERO),
        AttributeType::QuaternionArray => array!(Quat, Quat::IDENTITY),
        AttributeType::TokenArray | AttributeType::StringArray => {
            match attr.read_string_array(t) {
                Some(v) => format!("{v:?}"),
                None => "<no sample>".to_string(),
            }
        }
        AttributeType::Unknown | AttributeType::UnknownArray => "<unknown type>".to_string(),
    }
}

fn cmd_json(path: &str) {
    let ctx = open_or_die(path);
    let root = match ctx.root() {
        Some(root) => node_json(root),
        None => serde_json::Value::Null,
    };
    let doc = serde_json::json!({
        "document": path,
        "start_time": ctx.start_time(),
        "end_time": ctx.end_time(),
        "num_nodes": ctx.num_nodes(),
        "root": root,
    });
    println!("{}", serde_json::to_string_pretty(&doc).unwrap_or_default());
}

fn node_json(node: &Node) -> serde_json::Value {
    let attrs: Vec<serde_json::Value> = node
        .attributes()
        .map(|a| {
            serde_json::json!({
                "name": a.name(),
                "type": a.type_name(),
                "num_samples": a.num_samples(),
            })
        })
        .collect();
    let children: Vec<serde_json::Value> = node.children().map(node_json).collect();
    serde_json::json!({
        "id": node.id(),
        "path": node.path(),
        "kind": node.kind().name(),
        "type": node.type_name(),
        "attributes": attrs,
        "children": children,
    })
}
