//! USDA (ASCII) document parser.
//!
//! Line-by-line parsing with bracket-balanced statement joining, so
//! multi-line arrays and `.timeSamples` blocks are handled without a full
//! grammar.

use std::collections::VecDeque;

use glam::{DMat4, Quat, Vec2, Vec3, Vec4};
use tracing::trace;

use crate::stage::{token_is_array, PrimId, StageData, Value, Variant, VariantSet};
use crate::usda::{base_type, is_known_type};
use crate::util::{Error, Result};

/// Parse USDA text into an existing (fresh) stage.
pub fn parse_into(content: &str, data: &mut StageData) -> Result<()> {
    let mut parser = Parser::new(content);
    parser.check_header()?;
    parser.parse_file_metadata(data)?;

    while let Some((line_no, line)) = parser.next_meaningful() {
        if line.starts_with("def ") {
            parser.parse_def(line, line_no, PrimId::ROOT, true, data)?;
        } else {
            trace!("skipping top-level statement at line {line_no}: {line}");
        }
    }
    Ok(())
}

struct Parser {
    lines: VecDeque<(usize, String)>,
}

impl Parser {
    fn new(content: &str) -> Self {
        let lines = content
            .lines()
            .enumerate()
            .map(|(i, s)| (i + 1, s.trim().to_string()))
            .collect();
        Self { lines }
    }

    /// Pop the next non-empty, non-comment line.
    fn next_meaningful(&mut self) -> Option<(usize, String)> {
        while let Some((no, line)) = self.lines.pop_front() {
            if !line.is_empty() && !line.starts_with('#') {
                return Some((no, line));
            }
        }
        None
    }

    fn push_back(&mut self, no: usize, line: String) {
        self.lines.push_front((no, line));
    }

    fn check_header(&mut self) -> Result<()> {
        match self.lines.pop_front() {
            Some((_, line)) if line.starts_with("#usda") => Ok(()),
            _ => Err(Error::InvalidHeader),
        }
    }

    /// Optional `( ... )` metadata block following the header.
    fn parse_file_metadata(&mut self, data: &mut StageData) -> Result<()> {
        let Some((no, line)) = self.next_meaningful() else {
            return Ok(());
        };
        if !line.starts_with('(') {
            self.push_back(no, line);
            return Ok(());
        }

        let stmt = self.join_statement(no, line)?;
        let inner = stmt
            .trim()
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| Error::parse(no, "unbalanced file metadata block"))?;

        for entry in split_top_level(inner, '\n') {
            let entry = entry.trim().trim_end_matches(',');
            let Some((key, value)) = entry.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            match key {
                "startTimeCode" => {
                    if let Ok(t) = value.parse() {
                        data.start_time = t;
                        data.has_time_range = true;
                    }
                }
                "endTimeCode" => {
                    if let Ok(t) = value.parse() {
                        data.end_time = t;
                        data.has_time_range = true;
                    }
                }
                "defaultPrim" => {
                    data.default_prim = strip_quotes(value).ok();
                }
                _ => trace!("skipping file metadata: {key}"),
            }
        }
        Ok(())
    }

    /// Join lines onto `first` until all brackets are balanced.
    fn join_statement(&mut self, line_no: usize, first: String) -> Result<String> {
        let mut stmt = first;
        let mut depth = bracket_depth(&stmt);
        while depth > 0 {
            let Some((_, line)) = self.lines.pop_front() else {
                return Err(Error::parse(line_no, "unexpected end of file"));
            };
            depth += bracket_depth(&line);
            stmt.push('\n');
            stmt.push_str(&line);
        }
        Ok(stmt)
    }

    /// Parse a `def [Type] "Name" [( metadata )] { ... }` block.
    ///
    /// `attach` controls whether the prim joins its parent's child list
    /// (variant children stay detached until selected).
    fn parse_def(
        &mut self,
        first: String,
        line_no: usize,
        parent: PrimId,
        attach: bool,
        data: &mut StageData,
    ) -> Result<PrimId> {
        // Accumulate the header until the opening brace.
        let mut header = first;
        while find_unquoted(&header, '{').is_none() {
            let Some((_, line)) = self.lines.pop_front() else {
                return Err(Error::parse(line_no, "prim header without body"));
            };
            header.push('\n');
            header.push_str(&line);
        }
        let brace = find_unquoted(&header, '{').unwrap();
        let header_text = header[..brace].trim().to_string();
        let rest = header[brace + 1..].trim().to_string();
        if !rest.is_empty() {
            self.push_back(line_no, rest);
        }

        let (type_token, name, active) = parse_prim_header(&header_text, line_no)?;
        let id = if attach {
            data.define_prim(parent, &name, &type_token)
        } else {
            data.new_detached_prim(parent, &name, &type_token)
        };
        data.prim_mut(id).active = active;
        trace!("def {} \"{}\" -> {}", type_token, name, data.prim(id).path);

        self.parse_body(id, line_no, data)?;
        Ok(id)
    }

    /// Parse statements inside a prim block until the closing brace.
    fn parse_body(&mut self, prim: PrimId, line_no: usize, data: &mut StageData) -> Result<()> {
        loop {
            let Some((no, line)) = self.next_meaningful() else {
                return Err(Error::parse(line_no, "unclosed prim block"));
            };
            if line == "}" {
                return Ok(());
            }
            if line.starts_with("def ") {
                self.parse_def(line, no, prim, true, data)?;
            } else if line.starts_with("variantSet ") {
                self.parse_variant_set(line, no, prim, data)?;
            } else if line.starts_with("rel ") || line.starts_with("over ") {
                let _ = self.join_statement(no, line);
            } else {
                let stmt = self.join_statement(no, line)?;
                parse_attr_statement(&stmt, no, prim, data)?;
            }
        }
    }

    /// Parse `variantSet "name" = { "variant" { ... } ... }`.
    fn parse_variant_set(
        &mut self,
        first: String,
        line_no: usize,
        prim: PrimId,
        data: &mut StageData,
    ) -> Result<()> {
        let name_part = first
            .strip_prefix("variantSet")
            .map(str::trim)
            .and_then(|s| s.split('=').next())
            .ok_or_else(|| Error::parse(line_no, "malformed variantSet"))?;
        let set_name = strip_quotes(name_part.trim())
            .map_err(|_| Error::parse(line_no, "variantSet name must be quoted"))?;

        let mut set = VariantSet { name: set_name, variants: Vec::new(), selection: None };

        loop {
            let Some((no, line)) = self.next_meaningful() else {
                return Err(Error::parse(line_no, "unclosed variantSet block"));
            };
            if line == "}" {
                break;
            }
            // `"variantName" {`
            let name_part = line.trim_end_matches('{').trim();
            let variant_name = strip_quotes(name_part)
                .map_err(|_| Error::parse(no, "variant name must be quoted"))?;
            let mut variant = Variant { name: variant_name, children: Vec::new() };
            if !line.trim_end().ends_with('{') {
                // Brace on its own line
                let Some((_, brace)) = self.next_meaningful() else {
                    return Err(Error::parse(no, "variant without body"));
                };
                if brace != "{" {
                    return Err(Error::parse(no, "expected '{' after variant name"));
                }
            }

            loop {
                let Some((vno, vline)) = self.next_meaningful() else {
                    return Err(Error::parse(no, "unclosed variant block"));
                };
                if vline == "}" {
                    break;
                }
                if vline.starts_with("def ") {
                    let child = self.parse_def(vline, vno, prim, false, data)?;
                    variant.children.push(child);
                } else {
                    // Attribute overrides inside variants are not composed.
                    let _ = self.join_statement(vno, vline);
                    trace!("skipping variant statement at line {vno}");
                }
            }
            set.variants.push(variant);
        }

        data.prim_mut(prim).variant_sets.push(set);
        Ok(())
    }
}

/// Split a prim header into (type token, name, active flag).
fn parse_prim_header(header: &str, line_no: usize) -> Result<(String, String, bool)> {
    let rest = header
        .strip_prefix("def")
        .ok_or_else(|| Error::parse(line_no, "expected 'def'"))?
        .trim();

    // Optional `( metadata )` suffix.
    let (decl, meta) = match find_unquoted(rest, '(') {
        Some(i) => (rest[..i].trim(), Some(&rest[i..])),
        None => (rest, None),
    };

    let (type_token, name_part) = match decl.find('"') {
        Some(0) => (String::new(), decl),
        Some(i) => (decl[..i].trim().to_string(), decl[i..].trim()),
        None => return Err(Error::parse(line_no, "prim name must be quoted")),
    };
    let name =
        strip_quotes(name_part).map_err(|_| Error::parse(line_no, "prim name must be quoted"))?;
    if name.is_empty() {
        return Err(Error::parse(line_no, "empty prim name"));
    }

    let mut active = true;
    if let Some(meta) = meta {
        let inner = meta.trim().trim_start_matches('(').trim_end_matches(')');
        for entry in split_top_level(inner, '\n') {
            let entry = entry.trim();
            if let Some((key, value)) = entry.split_once('=') {
                if key.trim() == "active" {
                    active = value.trim() != "false";
                }
            }
        }
    }

    Ok((type_token, name, active))
}

/// Parse one attribute statement (default value or `.timeSamples` block).
fn parse_attr_statement(
    stmt: &str,
    line_no: usize,
    prim: PrimId,
    data: &mut StageData,
) -> Result<()> {
    let mut decl = stmt.trim();
    for qualifier in ["uniform ", "custom "] {
        decl = decl.strip_prefix(qualifier).unwrap_or(decl).trim_start();
    }

    let (lhs, rhs) = match find_unquoted(decl, '=') {
        Some(i) => (decl[..i].trim(), Some(decl[i + 1..].trim())),
        None => (decl, None),
    };

    let mut parts = lhs.split_whitespace();
    let (Some(type_token), Some(attr_name)) = (parts.next(), parts.next()) else {
        trace!("skipping statement at line {line_no}: {lhs}");
        return Ok(());
    };
    if parts.next().is_some() {
        trace!("skipping statement at line {line_no}: {lhs}");
        return Ok(());
    }

    let (attr_name, is_time_samples) = match attr_name.strip_suffix(".timeSamples") {
        Some(base) => (base, true),
        None => (attr_name, false),
    };

    let attr = data.prim_mut(prim).ensure_attr(attr_name, type_token);
    let Some(rhs) = rhs else {
        return Ok(()); // bare declaration, no value
    };

    if !is_known_type(type_token) {
        trace!("unknown type '{}' at line {}; value skipped", type_token, line_no);
        return Ok(());
    }

    let rhs = strip_value_metadata(rhs);

    if is_time_samples {
        let inner = rhs
            .strip_prefix('{')
            .and_then(|s| s.trim_end().strip_suffix('}'))
            .ok_or_else(|| Error::parse(line_no, "timeSamples must be a { } block"))?;
        for entry in split_top_level(inner, ',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (time_text, value_text) = entry
                .split_once(':')
                .ok_or_else(|| Error::parse(line_no, "timeSamples entry must be 'time: value'"))?;
            let t: f64 = time_text
                .trim()
                .parse()
                .map_err(|_| Error::parse(line_no, "invalid sample time"))?;
            let value = parse_value(type_token, value_text.trim(), line_no)?;
            attr.samples.set(t, value);
        }
    } else {
        let value = parse_value(type_token, rhs, line_no)?;
        attr.samples.set_default(value);
    }
    Ok(())
}

/// Parse a literal for a known declared type.
pub(crate) fn parse_value(type_token: &str, text: &str, line_no: usize) -> Result<Value> {
    let text = text.trim();
    if token_is_array(type_token) {
        let inner = text
            .strip_prefix('[')
            .and_then(|s| s.trim_end().strip_suffix(']'))
            .ok_or_else(|| Error::parse(line_no, "array literal must be [ ... ]"))?;
        let elems: Vec<&str> = split_top_level(inner, ',')
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        macro_rules! scalar_array {
            ($variant:ident, $ty:ty) => {{
                let mut out: Vec<$ty> = Vec::with_capacity(elems.len());
                for e in &elems {
                    out.push(
                        e.parse()
                            .map_err(|_| Error::parse(line_no, format!("invalid element: {e}")))?,
                    );
                }
                Value::$variant(out)
            }};
        }

        let value = match base_type(type_token) {
            "uchar" => scalar_array!(ByteArray, u8),
            "int" => scalar_array!(IntArray, i32),
            "uint" => scalar_array!(UIntArray, u32),
            "float" => scalar_array!(FloatArray, f32),
            "double" => scalar_array!(DoubleArray, f64),
            "float2" => Value::Float2Array(
                elems.iter().map(|e| parse_vec2(e, line_no)).collect::<Result<_>>()?,
            ),
            "float3" => Value::Float3Array(
                elems.iter().map(|e| parse_vec3(e, line_no)).collect::<Result<_>>()?,
            ),
            "float4" => Value::Float4Array(
                elems.iter().map(|e| parse_vec4(e, line_no)).collect::<Result<_>>()?,
            ),
            "quatf" => Value::QuatfArray(
                elems.iter().map(|e| parse_quat(e, line_no)).collect::<Result<_>>()?,
            ),
            "token" => Value::TokenArray(
                elems.iter().map(|e| strip_quotes(e)).collect::<Result<_>>()?,
            ),
            "string" => Value::StringArray(
                elems.iter().map(|e| strip_quotes(e)).collect::<Result<_>>()?,
            ),
            other => return Err(Error::parse(line_no, format!("unsupported array type: {other}"))),
        };
        return Ok(value);
    }

    let value = match base_type(type_token) {
        "bool" => Value::Bool(matches!(text, "true" | "1")),
        "uchar" => Value::Byte(
            text.parse().map_err(|_| Error::parse(line_no, "invalid uchar literal"))?,
        ),
        "int" => {
            Value::Int(text.parse().map_err(|_| Error::parse(line_no, "invalid int literal"))?)
        }
        "uint" => Value::UInt(
            text.parse().map_err(|_| Error::parse(line_no, "invalid uint literal"))?,
        ),
        "float" => Value::Float(
            text.parse().map_err(|_| Error::parse(line_no, "invalid float literal"))?,
        ),
        "double" => Value::Double(
            text.parse().map_err(|_| Error::parse(line_no, "invalid double literal"))?,
        ),
        "float2" => Value::Float2(parse_vec2(text, line_no)?),
        "float3" => Value::Float3(parse_vec3(text, line_no)?),
        "float4" => Value::Float4(parse_vec4(text, line_no)?),
        "quatf" => Value::Quatf(parse_quat(text, line_no)?),
        "matrix4d" => Value::Matrix4d(parse_matrix4d(text, line_no)?),
        "token" => Value::Token(strip_quotes(text)?),
        "string" => Value::String(strip_quotes(text)?),
        other => return Err(Error::parse(line_no, format!("unsupported type: {other}"))),
    };
    Ok(value)
}

/// Drop trailing `( interpolation = "vertex" )`-style attribute metadata.
fn strip_value_metadata(rhs: &str) -> &str {
    let rhs = rhs.trim();
    let close = match rhs.chars().next() {
        Some('[') => ']',
        Some('(') => ')',
        Some('{') => '}',
        Some('"') => {
            // Literal ends at the closing quote.
            let mut escaped = false;
            for (i, c) in rhs.char_indices().skip(1) {
                if escaped {
                    escaped = false;
                    continue;
                }
                match c {
                    '\\' => escaped = true,
                    '"' => return &rhs[..=i],
                    _ => {}
                }
            }
            return rhs;
        }
        _ => {
            // Bare scalar literal; cut at any metadata opener.
            if let Some(i) = rhs.find('(') {
                return rhs[..i].trim_end();
            }
            return rhs;
        }
    };
    let mut depth = 0i32;
    for (i, c) in rhs.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                if depth == 0 && c == close {
                    return &rhs[..=i];
                }
            }
            _ => {}
        }
    }
    rhs
}

fn parse_tuple(text: &str, n: usize, line_no: usize) -> Result<Vec<f32>> {
    let inner = text
        .strip_prefix('(')
        .and_then(|s| s.trim_end().strip_suffix(')'))
        .ok_or_else(|| Error::parse(line_no, "tuple literal must be ( ... )"))?;
    let vals: Vec<f32> = split_top_level(inner, ',')
        .into_iter()
        .map(|s| s.trim().parse::<f32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| Error::parse(line_no, "invalid tuple element"))?;
    if vals.len() != n {
        return Err(Error::parse(line_no, format!("expected {n}-tuple, got {}", vals.len())));
    }
    Ok(vals)
}

fn parse_vec2(text: &str, line_no: usize) -> Result<Vec2> {
    let v = parse_tuple(text, 2, line_no)?;
    Ok(Vec2::new(v[0], v[1]))
}

fn parse_vec3(text: &str, line_no: usize) -> Result<Vec3> {
    let v = parse_tuple(text, 3, line_no)?;
    Ok(Vec3::new(v[0], v[1], v[2]))
}

fn parse_vec4(text: &str, line_no: usize) -> Result<Vec4> {
    let v = parse_tuple(text, 4, line_no)?;
    Ok(Vec4::new(v[0], v[1], v[2], v[3]))
}

/// Quaternions are written real part first: `(w, x, y, z)`.
fn parse_quat(text: &str, line_no: usize) -> Result<Quat> {
    let v = parse_tuple(text, 4, line_no)?;
    Ok(Quat::from_xyzw(v[1], v[2], v[3], v[0]))
}

/// `( (r00, r01, r02, r03), ..., (r30, r31, r32, r33) )`, row-major.
fn parse_matrix4d(text: &str, line_no: usize) -> Result<DMat4> {
    let inner = text
        .strip_prefix('(')
        .and_then(|s| s.trim_end().strip_suffix(')'))
        .ok_or_else(|| Error::parse(line_no, "matrix literal must be ( ... )"))?;
    let rows = split_top_level(inner, ',');
    if rows.len() != 4 {
        return Err(Error::parse(line_no, "matrix literal must have 4 rows"));
    }
    let mut m = [0.0f64; 16];
    for (r, row_text) in rows.iter().enumerate() {
        let row_inner = row_text
            .trim()
            .strip_prefix('(')
            .and_then(|s| s.trim_end().strip_suffix(')'))
            .ok_or_else(|| Error::parse(line_no, "matrix row must be ( ... )"))?;
        let vals: Vec<f64> = split_top_level(row_inner, ',')
            .into_iter()
            .map(|s| s.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| Error::parse(line_no, "invalid matrix element"))?;
        if vals.len() != 4 {
            return Err(Error::parse(line_no, "matrix row must have 4 elements"));
        }
        m[r * 4..r * 4 + 4].copy_from_slice(&vals);
    }
    // Row-major in text; DMat4 is column-major.
    Ok(DMat4::from_cols_array(&m).transpose())
}

/// Remove surrounding quotes and unescape embedded quotes.
fn strip_quotes(text: &str) -> Result<String> {
    let text = text.trim();
    let inner = text
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| Error::invalid(format!("expected quoted string: {text}")))?;
    Ok(inner.replace("\\\"", "\""))
}

/// Split at `sep` occurrences outside brackets and quotes.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0usize;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '(' | '[' | '{' if !in_quotes => depth += 1,
            ')' | ']' | '}' if !in_quotes => depth -= 1,
            c if c == sep && !in_quotes && depth == 0 => {
                out.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

/// Net bracket nesting delta of a line, ignoring quoted sections.
fn bracket_depth(text: &str) -> i32 {
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut escaped = false;
    for c in text.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '(' | '[' | '{' if !in_quotes => depth += 1,
            ')' | ']' | '}' if !in_quotes => depth -= 1,
            _ => {}
        }
    }
    depth
}

/// First position of `c` outside quoted sections.
fn find_unquoted(text: &str, c: char) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ch if ch == c && !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Interpolation;

    fn parse(content: &str) -> StageData {
        let mut data = StageData::new_for_tests();
        parse_into(content, &mut data).expect("parse failed");
        data
    }

    #[test]
    fn test_header_required() {
        let mut data = StageData::new_for_tests();
        let err = parse_into("def Xform \"a\" {}\n", &mut data).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader));
    }

    #[test]
    fn test_minimal_prim_tree() {
        let data = parse(
            "#usda 1.0\n\
             def Xform \"world\"\n\
             {\n\
                 def Mesh \"mesh\"\n\
                 {\n\
                 }\n\
             }\n",
        );
        assert_eq!(data.num_prims(), 3);
        let world = data.find_prim("/world").unwrap();
        let mesh = data.find_prim("/world/mesh").unwrap();
        assert_eq!(data.prim(world).type_token, "Xform");
        assert_eq!(data.prim(mesh).type_token, "Mesh");
        assert_eq!(data.prim(mesh).parent, Some(world));
    }

    #[test]
    fn test_file_metadata() {
        let data = parse(
            "#usda 1.0\n\
             (\n\
                 startTimeCode = 1\n\
                 endTimeCode = 48\n\
                 defaultPrim = \"world\"\n\
             )\n\
             def Xform \"world\" {\n\
             }\n",
        );
        assert!(data.has_time_range);
        assert_eq!(data.time_range(), (1.0, 48.0));
        assert_eq!(data.default_prim.as_deref(), Some("world"));
    }

    #[test]
    fn test_default_values_and_aliases() {
        let data = parse(
            "#usda 1.0\n\
             def Mesh \"m\"\n\
             {\n\
                 point3f[] points = [(0, 0, 0), (1, 0, 0), (0, 1, 0)]\n\
                 int[] faceVertexCounts = [3]\n\
                 int[] faceVertexIndices = [0, 1, 2]\n\
                 texCoord2f[] primvars:st = [(0, 0), (1, 0), (0, 1)]\n\
                 uniform token subdivisionScheme = \"none\"\n\
                 float weight = 2.5\n\
             }\n",
        );
        let m = data.find_prim("/m").unwrap();
        let prim = data.prim(m);
        let points = prim.attr("points").unwrap();
        assert_eq!(points.type_token, "point3f[]");
        let v = points.samples.resolve(0.0, Interpolation::Held).unwrap();
        assert_eq!(v.as_ref().array_len(), Some(3));
        assert_eq!(
            prim.attr("subdivisionScheme").unwrap().samples.default_value(),
            Some(&Value::Token("none".into()))
        );
        assert_eq!(
            prim.attr("weight").unwrap().samples.default_value(),
            Some(&Value::Float(2.5))
        );
        assert_eq!(
            prim.attr("primvars:st").unwrap().samples.default_value().unwrap().array_len(),
            Some(3)
        );
    }

    #[test]
    fn test_time_samples_multiline() {
        let data = parse(
            "#usda 1.0\n\
             def Xform \"x\"\n\
             {\n\
                 float3 xformOp:translate.timeSamples = {\n\
                     0: (0, 0, 0),\n\
                     24: (0, 5, 0),\n\
                 }\n\
                 uniform token[] xformOpOrder = [\"xformOp:translate\"]\n\
             }\n",
        );
        let x = data.find_prim("/x").unwrap();
        let attr = data.prim(x).attr("xformOp:translate").unwrap();
        assert_eq!(attr.samples.num_samples(), 2);
        let v = attr.samples.resolve(24.0, Interpolation::Held).unwrap();
        assert_eq!(v.as_ref(), &Value::Float3(Vec3::new(0.0, 5.0, 0.0)));
    }

    #[test]
    fn test_quat_real_part_first() {
        let data = parse(
            "#usda 1.0\n\
             def Xform \"x\"\n\
             {\n\
                 quatf xformOp:orient = (1, 0, 0, 0)\n\
             }\n",
        );
        let x = data.find_prim("/x").unwrap();
        let v = data
            .prim(x)
            .attr("xformOp:orient")
            .unwrap()
            .samples
            .default_value()
            .unwrap()
            .clone();
        assert_eq!(v, Value::Quatf(Quat::IDENTITY));
    }

    #[test]
    fn test_inactive_prim_metadata() {
        let data = parse(
            "#usda 1.0\n\
             def Xform \"world\"\n\
             {\n\
                 def Mesh \"hidden\" (\n\
                     active = false\n\
                 )\n\
                 {\n\
                 }\n\
             }\n",
        );
        let hidden = data.find_prim("/world/hidden").unwrap();
        assert!(!data.prim(hidden).active);
    }

    #[test]
    fn test_variant_sets() {
        let data = parse(
            "#usda 1.0\n\
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
             }\n",
        );
        let mut data = data;
        let world = data.find_prim("/world").unwrap();
        assert_eq!(data.prim(world).variant_sets.len(), 1);
        assert!(data.prim(world).visible_children().is_empty());
        assert!(data.set_variant_selection("lod", "low"));
        let visible = data.prim(world).visible_children();
        assert_eq!(visible.len(), 1);
        assert_eq!(data.prim(visible[0]).name, "lo");
    }

    #[test]
    fn test_unknown_types_kept_without_value() {
        let data = parse(
            "#usda 1.0\n\
             def Xform \"x\"\n\
             {\n\
                 matrix4d xformOp:transform = ( (1, 0, 0, 0), (0, 1, 0, 0), (0, 0, 1, 0), (4, 5, 6, 1) )\n\
                 custom asset inputs:file = @tex.png@\n\
             }\n",
        );
        let x = data.find_prim("/x").unwrap();
        let m = data
            .prim(x)
            .attr("xformOp:transform")
            .unwrap()
            .samples
            .default_value()
            .unwrap()
            .as_mat4d()
            .unwrap();
        assert_eq!(m.w_axis, glam::DVec4::new(4.0, 5.0, 6.0, 1.0));
        // Unknown-typed attr is kept, valueless
        let asset = data.prim(x).attr("inputs:file").unwrap();
        assert_eq!(asset.type_token, "asset");
        assert!(asset.samples.is_empty());
    }

    #[test]
    fn test_split_top_level_nesting() {
        let parts = split_top_level("(1, 2), (3, 4)", ',');
        assert_eq!(parts, vec!["(1, 2)", " (3, 4)"]);
        let parts = split_top_level("\"a,b\", \"c\"", ',');
        assert_eq!(parts, vec!["\"a,b\"", " \"c\""]);
    }
}
