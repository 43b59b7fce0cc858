//! Native value model for document attributes.
//!
//! The document's type system is open-ended; this enum covers the value
//! kinds our dialect records. The bridge maps a closed subset of these onto
//! its exported tag set and classifies the rest as unknown.

use glam::{DMat4, Quat, Vec2, Vec3, Vec4};

/// One stored attribute value (a single time sample or a default).
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(u8),
    Int(i32),
    UInt(u32),
    Float(f32),
    Double(f64),
    Float2(Vec2),
    Float3(Vec3),
    Float4(Vec4),
    Quatf(Quat),
    Matrix4d(DMat4),
    Token(String),
    String(String),
    ByteArray(Vec<u8>),
    IntArray(Vec<i32>),
    UIntArray(Vec<u32>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    Float2Array(Vec<Vec2>),
    Float3Array(Vec<Vec3>),
    Float4Array(Vec<Vec4>),
    QuatfArray(Vec<Quat>),
    TokenArray(Vec<String>),
    StringArray(Vec<String>),
}

impl Value {
    /// The declared type token this value serializes under.
    pub fn type_token(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Byte(_) => "uchar",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Float2(_) => "float2",
            Value::Float3(_) => "float3",
            Value::Float4(_) => "float4",
            Value::Quatf(_) => "quatf",
            Value::Matrix4d(_) => "matrix4d",
            Value::Token(_) => "token",
            Value::String(_) => "string",
            Value::ByteArray(_) => "uchar[]",
            Value::IntArray(_) => "int[]",
            Value::UIntArray(_) => "uint[]",
            Value::FloatArray(_) => "float[]",
            Value::DoubleArray(_) => "double[]",
            Value::Float2Array(_) => "float2[]",
            Value::Float3Array(_) => "float3[]",
            Value::Float4Array(_) => "float4[]",
            Value::QuatfArray(_) => "quatf[]",
            Value::TokenArray(_) => "token[]",
            Value::StringArray(_) => "string[]",
        }
    }

    /// Whether this is an array-form value.
    pub fn is_array(&self) -> bool {
        self.array_len().is_some()
    }

    /// Element count for array values, None for scalars.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Value::ByteArray(v) => Some(v.len()),
            Value::IntArray(v) => Some(v.len()),
            Value::UIntArray(v) => Some(v.len()),
            Value::FloatArray(v) => Some(v.len()),
            Value::DoubleArray(v) => Some(v.len()),
            Value::Float2Array(v) => Some(v.len()),
            Value::Float3Array(v) => Some(v.len()),
            Value::Float4Array(v) => Some(v.len()),
            Value::QuatfArray(v) => Some(v.len()),
            Value::TokenArray(v) => Some(v.len()),
            Value::StringArray(v) => Some(v.len()),
            _ => None,
        }
    }

    /// Linear blend towards `other` for interpolatable kinds.
    ///
    /// Float scalars, float vectors, quaternions, and float arrays of equal
    /// length interpolate; everything else resolves held (None).
    pub fn lerp(&self, other: &Value, alpha: f32) -> Option<Value> {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => Some(Value::Float(a + (b - a) * alpha)),
            (Value::Double(a), Value::Double(b)) => {
                Some(Value::Double(a + (b - a) * alpha as f64))
            }
            (Value::Float2(a), Value::Float2(b)) => Some(Value::Float2(a.lerp(*b, alpha))),
            (Value::Float3(a), Value::Float3(b)) => Some(Value::Float3(a.lerp(*b, alpha))),
            (Value::Float4(a), Value::Float4(b)) => Some(Value::Float4(a.lerp(*b, alpha))),
            (Value::Quatf(a), Value::Quatf(b)) => Some(Value::Quatf(a.slerp(*b, alpha))),
            (Value::FloatArray(a), Value::FloatArray(b)) if a.len() == b.len() => {
                Some(Value::FloatArray(
                    a.iter().zip(b).map(|(x, y)| x + (y - x) * alpha).collect(),
                ))
            }
            (Value::Float2Array(a), Value::Float2Array(b)) if a.len() == b.len() => {
                Some(Value::Float2Array(
                    a.iter().zip(b).map(|(x, y)| x.lerp(*y, alpha)).collect(),
                ))
            }
            (Value::Float3Array(a), Value::Float3Array(b)) if a.len() == b.len() => {
                Some(Value::Float3Array(
                    a.iter().zip(b).map(|(x, y)| x.lerp(*y, alpha)).collect(),
                ))
            }
            (Value::Float4Array(a), Value::Float4Array(b)) if a.len() == b.len() => {
                Some(Value::Float4Array(
                    a.iter().zip(b).map(|(x, y)| x.lerp(*y, alpha)).collect(),
                ))
            }
            (Value::QuatfArray(a), Value::QuatfArray(b)) if a.len() == b.len() => {
                Some(Value::QuatfArray(
                    a.iter().zip(b).map(|(x, y)| x.slerp(*y, alpha)).collect(),
                ))
            }
            _ => None,
        }
    }

    // === Typed accessors used by the schema layer ===

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Double(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<Vec2> {
        match self {
            Value::Float2(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Value::Float3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_quat(&self) -> Option<Quat> {
        match self {
            Value::Quatf(v) => Some(*v),
            Value::Float4(v) => Some(Quat::from_xyzw(v.x, v.y, v.z, v.w)),
            _ => None,
        }
    }

    pub fn as_mat4d(&self) -> Option<DMat4> {
        match self {
            Value::Matrix4d(m) => Some(*m),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            Value::Token(s) | Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_token_array(&self) -> Option<&[String]> {
        match self {
            Value::TokenArray(v) | Value::StringArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec3_array(&self) -> Option<&[Vec3]> {
        match self {
            Value::Float3Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec2_array(&self) -> Option<&[Vec2]> {
        match self {
            Value::Float2Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32_array(&self) -> Option<&[i32]> {
        match self {
            Value::IntArray(v) => Some(v),
            _ => None,
        }
    }
}

/// Whether a declared type token names an array form.
pub fn token_is_array(type_token: &str) -> bool {
    type_token.ends_with("[]")
}
