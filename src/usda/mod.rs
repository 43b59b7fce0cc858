//! Text container format (USDA dialect).
//!
//! Line-oriented parse and deterministic re-emission of the document
//! format the stage layer sits on. The parser is intentionally simple and
//! handles the common patterns: nested `def` blocks, default values,
//! `.timeSamples` blocks, prim metadata, and `variantSet` blocks.
//! Unknown statements are skipped with a trace, never fatal.

mod parser;
mod writer;

pub use parser::parse_into;
pub use writer::write_usda;

/// Normalize a declared type token to the base kind the value parser
/// dispatches on. Role-specific aliases share storage with their base type.
pub(crate) fn base_type(type_token: &str) -> &str {
    let base = type_token.trim_end_matches("[]");
    match base {
        "point3f" | "normal3f" | "color3f" | "vector3f" => "float3",
        "texCoord2f" => "float2",
        "half" => "float",
        other => other,
    }
}

/// Whether a declared type token is one the value parser understands.
pub(crate) fn is_known_type(type_token: &str) -> bool {
    matches!(
        base_type(type_token),
        "bool"
            | "uchar"
            | "int"
            | "uint"
            | "float"
            | "double"
            | "float2"
            | "float3"
            | "float4"
            | "quatf"
            | "matrix4d"
            | "token"
            | "string"
    )
}
