//! USDA (ASCII) document serialization.
//!
//! Deterministic re-emission of a stage: header metadata, prims in native
//! child order, default values before `.timeSamples`, variant sets with
//! their detached children. Output re-parses to an equivalent stage.

use glam::Quat;

use crate::stage::{PrimAttr, PrimId, StageData, Value};

/// Serialize a stage to USDA text.
pub fn write_usda(data: &StageData) -> String {
    let mut out = String::new();
    out.push_str("#usda 1.0\n");

    let (start, end) = data.time_range();
    let has_meta = data.has_time_range || data.default_prim.is_some();
    if has_meta {
        out.push_str("(\n");
        if data.has_time_range {
            out.push_str(&format!("    startTimeCode = {}\n", fmt_f64(start)));
            out.push_str(&format!("    endTimeCode = {}\n", fmt_f64(end)));
        }
        if let Some(dp) = &data.default_prim {
            out.push_str(&format!("    defaultPrim = \"{}\"\n", escape(dp)));
        }
        out.push_str(")\n");
    }
    out.push('\n');

    for &child in &data.root().children {
        write_prim(data, child, 0, &mut out);
    }
    out
}

fn write_prim(data: &StageData, id: PrimId, indent: usize, out: &mut String) {
    let prim = data.prim(id);
    let pad = "    ".repeat(indent);

    out.push_str(&pad);
    if prim.type_token.is_empty() {
        out.push_str(&format!("def \"{}\"", escape(&prim.name)));
    } else {
        out.push_str(&format!("def {} \"{}\"", prim.type_token, escape(&prim.name)));
    }
    if !prim.active {
        out.push_str(&format!("\n{pad}(\n{pad}    active = false\n{pad})"));
    }
    out.push_str(&format!("\n{pad}{{\n"));

    for attr in &prim.attrs {
        write_attr(attr, indent + 1, out);
    }

    for vs in &prim.variant_sets {
        write_variant_set(data, vs, indent + 1, out);
    }

    for &child in &prim.children {
        write_prim(data, child, indent + 1, out);
    }

    out.push_str(&format!("{pad}}}\n"));
}

fn write_attr(attr: &PrimAttr, indent: usize, out: &mut String) {
    let pad = "    ".repeat(indent);

    if let Some(default) = attr.samples.default_value() {
        out.push_str(&format!(
            "{pad}{} {} = {}\n",
            attr.type_token,
            attr.name,
            fmt_value(default)
        ));
    } else if attr.samples.num_samples() == 0 {
        // Bare declaration keeps the attribute discoverable.
        out.push_str(&format!("{pad}{} {}\n", attr.type_token, attr.name));
    }

    if attr.samples.num_samples() > 0 {
        out.push_str(&format!(
            "{pad}{} {}.timeSamples = {{\n",
            attr.type_token, attr.name
        ));
        for (t, v) in attr.samples.samples() {
            out.push_str(&format!("{pad}    {}: {},\n", fmt_f64(*t), fmt_value(v)));
        }
        out.push_str(&format!("{pad}}}\n"));
    }
}

fn write_variant_set(
    data: &StageData,
    vs: &crate::stage::VariantSet,
    indent: usize,
    out: &mut String,
) {
    let pad = "    ".repeat(indent);
    out.push_str(&format!("{pad}variantSet \"{}\" = {{\n", escape(&vs.name)));
    for variant in &vs.variants {
        out.push_str(&format!("{pad}    \"{}\" {{\n", escape(&variant.name)));
        for &child in &variant.children {
            write_prim(data, child, indent + 2, out);
        }
        out.push_str(&format!("{pad}    }}\n"));
    }
    out.push_str(&format!("{pad}}}\n"));
}

/// Format a float without trailing noise (`1` not `1.0`).
fn fmt_f32(v: f32) -> String {
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

fn fmt_f64(v: f64) -> String {
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

fn fmt_quat(q: &Quat) -> String {
    // Real part first on disk.
    format!(
        "({}, {}, {}, {})",
        fmt_f32(q.w),
        fmt_f32(q.x),
        fmt_f32(q.y),
        fmt_f32(q.z)
    )
}

fn fmt_value(v: &Value) -> String {
    match v {
        Value::Bool(b) => format!("{b}"),
        Value::Byte(b) => format!("{b}"),
        Value::Int(i) => format!("{i}"),
        Value::UInt(u) => format!("{u}"),
        Value::Float(f) => fmt_f32(*f),
        Value::Double(d) => fmt_f64(*d),
        Value::Float2(v) => format!("({}, {})", fmt_f32(v.x), fmt_f32(v.y)),
        Value::Float3(v) => {
            format!("({}, {}, {})", fmt_f32(v.x), fmt_f32(v.y), fmt_f32(v.z))
        }
        Value::Float4(v) => format!(
            "({}, {}, {}, {})",
            fmt_f32(v.x),
            fmt_f32(v.y),
            fmt_f32(v.z),
            fmt_f32(v.w)
        ),
        Value::Quatf(q) => fmt_quat(q),
        Value::Matrix4d(m) => {
            // Column-major in memory, rows on disk.
            let m = m.transpose().to_cols_array();
            let row = |r: usize| {
                format!(
                    "({}, {}, {}, {})",
                    fmt_f64(m[r * 4]),
                    fmt_f64(m[r * 4 + 1]),
                    fmt_f64(m[r * 4 + 2]),
                    fmt_f64(m[r * 4 + 3])
                )
            };
            format!("( {}, {}, {}, {} )", row(0), row(1), row(2), row(3))
        }
        Value::Token(s) | Value::String(s) => format!("\"{}\"", escape(s)),
        Value::ByteArray(v) => fmt_array(v, |e| format!("{e}")),
        Value::IntArray(v) => fmt_array(v, |e| format!("{e}")),
        Value::UIntArray(v) => fmt_array(v, |e| format!("{e}")),
        Value::FloatArray(v) => fmt_array(v, |e| fmt_f32(*e)),
        Value::DoubleArray(v) => fmt_array(v, |e| fmt_f64(*e)),
        Value::Float2Array(v) => {
            fmt_array(v, |e| format!("({}, {})", fmt_f32(e.x), fmt_f32(e.y)))
        }
        Value::Float3Array(v) => fmt_array(v, |e| {
            format!("({}, {}, {})", fmt_f32(e.x), fmt_f32(e.y), fmt_f32(e.z))
        }),
        Value::Float4Array(v) => fmt_array(v, |e| {
            format!(
                "({}, {}, {}, {})",
                fmt_f32(e.x),
                fmt_f32(e.y),
                fmt_f32(e.z),
                fmt_f32(e.w)
            )
        }),
        Value::QuatfArray(v) => fmt_array(v, fmt_quat),
        Value::TokenArray(v) | Value::StringArray(v) => {
            fmt_array(v, |e| format!("\"{}\"", escape(e)))
        }
    }
}

fn fmt_array<T>(items: &[T], f: impl Fn(&T) -> String) -> String {
    let parts: Vec<String> = items.iter().map(f).collect();
    format!("[{}]", parts.join(", "))
}

fn escape(s: &str) -> String {
    s.replace('"', "\\\"")
}
