//! Type-tagged attribute access.
//!
//! The document's open-ended type system is discriminated once, at
//! discovery, into a closed tag set ([`AttributeType`]). All downstream
//! buffer traffic is a flat copy keyed by that single tag: callers check
//! the tag and the per-sample element count, then supply a matching
//! buffer. String kinds go through dedicated accessors since they have no
//! flat layout.

use bytemuck::Pod;
use tracing::{error, warn};

use crate::stage::{PrimId, Stage, Value};
use crate::usda;
use crate::util::Time;

/// Closed tag set exported by the bridge.
///
/// Array forms mirror the scalar forms at an offset of `0x100`, so
/// `tag & 0xff` identifies the element kind.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Unknown = 0,
    Byte = 1,
    Int = 2,
    UInt = 3,
    Float = 4,
    Float2 = 5,
    Float3 = 6,
    Float4 = 7,
    Quaternion = 8,
    Token = 9,
    String = 10,
    UnknownArray = 0x100,
    ByteArray = 0x101,
    IntArray = 0x102,
    UIntArray = 0x103,
    FloatArray = 0x104,
    Float2Array = 0x105,
    Float3Array = 0x106,
    Float4Array = 0x107,
    QuaternionArray = 0x108,
    TokenArray = 0x109,
    StringArray = 0x10A,
}

impl AttributeType {
    /// Map a declared native type token onto the tag set.
    pub fn from_type_token(token: &str) -> Self {
        let array = token.ends_with("[]");
        let scalar = match usda::base_type(token) {
            "uchar" => Self::Byte,
            "int" => Self::Int,
            "uint" => Self::UInt,
            "float" => Self::Float,
            "float2" => Self::Float2,
            "float3" => Self::Float3,
            "float4" => Self::Float4,
            "quatf" => Self::Quaternion,
            "token" => Self::Token,
            "string" => Self::String,
            _ => Self::Unknown,
        };
        if array {
            scalar.array_of()
        } else {
            scalar
        }
    }

    pub fn is_array(self) -> bool {
        (self as i32) & 0x100 != 0
    }

    /// The scalar tag for an array tag (identity for scalars).
    pub fn element(self) -> Self {
        match self {
            Self::UnknownArray => Self::Unknown,
            Self::ByteArray => Self::Byte,
            Self::IntArray => Self::Int,
            Self::UIntArray => Self::UInt,
            Self::FloatArray => Self::Float,
            Self::Float2Array => Self::Float2,
            Self::Float3Array => Self::Float3,
            Self::Float4Array => Self::Float4,
            Self::QuaternionArray => Self::Quaternion,
            Self::TokenArray => Self::Token,
            Self::StringArray => Self::String,
            scalar => scalar,
        }
    }

    /// The array tag for a scalar tag (identity for arrays).
    pub fn array_of(self) -> Self {
        match self {
            Self::Unknown => Self::UnknownArray,
            Self::Byte => Self::ByteArray,
            Self::Int => Self::IntArray,
            Self::UInt => Self::UIntArray,
            Self::Float => Self::FloatArray,
            Self::Float2 => Self::Float2Array,
            Self::Float3 => Self::Float3Array,
            Self::Float4 => Self::Float4Array,
            Self::Quaternion => Self::QuaternionArray,
            Self::Token => Self::TokenArray,
            Self::String => Self::StringArray,
            array => array,
        }
    }

    /// Byte size of one element for flat-copyable kinds.
    pub fn element_size(self) -> Option<usize> {
        match self.element() {
            Self::Byte => Some(1),
            Self::Int | Self::UInt | Self::Float => Some(4),
            Self::Float2 => Some(8),
            Self::Float3 => Some(12),
            Self::Float4 | Self::Quaternion => Some(16),
            _ => None,
        }
    }

    /// Whether this is one of the string kinds.
    pub fn is_string_kind(self) -> bool {
        matches!(self.element(), Self::Token | Self::String)
    }

    /// Canonical native type token for this tag.
    pub fn type_token(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Byte => "uchar",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::Float2 => "float2",
            Self::Float3 => "float3",
            Self::Float4 => "float4",
            Self::Quaternion => "quatf",
            Self::Token => "token",
            Self::String => "string",
            Self::UnknownArray => "unknown[]",
            Self::ByteArray => "uchar[]",
            Self::IntArray => "int[]",
            Self::UIntArray => "uint[]",
            Self::FloatArray => "float[]",
            Self::Float2Array => "float2[]",
            Self::Float3Array => "float3[]",
            Self::Float4Array => "float4[]",
            Self::QuaternionArray => "quatf[]",
            Self::TokenArray => "token[]",
            Self::StringArray => "string[]",
        }
    }
}

/// One named value slot on a node, bound at discovery.
///
/// Self-contained: holds a session handle, so reads and writes need no
/// other state. Safe to share across threads for concurrent reads of a
/// read-only session.
#[derive(Debug)]
pub struct Attribute {
    name: String,
    /// Declared native type token as found in the document.
    type_name: String,
    ty: AttributeType,
    prim: PrimId,
    stage: Stage,
    /// Backing storage for `char*` results handed across the flat interface.
    #[cfg(feature = "capi")]
    pub(crate) cstr_cache: parking_lot::Mutex<Vec<std::ffi::CString>>,
    #[cfg(feature = "capi")]
    pub(crate) name_c: std::ffi::CString,
    #[cfg(feature = "capi")]
    pub(crate) type_name_c: std::ffi::CString,
}

impl Attribute {
    pub(crate) fn bind(stage: Stage, prim: PrimId, name: &str, type_token: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_token.to_string(),
            ty: AttributeType::from_type_token(type_token),
            prim,
            stage,
            #[cfg(feature = "capi")]
            cstr_cache: parking_lot::Mutex::new(Vec::new()),
            #[cfg(feature = "capi")]
            name_c: std::ffi::CString::new(name).unwrap_or_default(),
            #[cfg(feature = "capi")]
            type_name_c: std::ffi::CString::new(type_token).unwrap_or_default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared native type string (immutable after discovery).
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The fixed value-type tag (immutable after discovery).
    pub fn attr_type(&self) -> AttributeType {
        self.ty
    }

    /// Total count of discrete time samples recorded for this attribute.
    pub fn num_samples(&self) -> usize {
        let g = self.stage.read();
        g.prim(self.prim)
            .attr(&self.name)
            .map(|a| a.samples.num_samples())
            .unwrap_or(0)
    }

    /// Element count at sample time `t`; always 1 for scalar attributes.
    pub fn array_size(&self, t: Time) -> usize {
        if !self.ty.is_array() {
            return 1;
        }
        let g = self.stage.read();
        let Some(attr) = g.prim(self.prim).attr(&self.name) else {
            return 0;
        };
        attr.samples
            .resolve(t, g.interpolation())
            .and_then(|v| v.array_len())
            .unwrap_or(0)
    }

    fn resolve(&self, t: Time) -> Option<Value> {
        let g = self.stage.read();
        let attr = g.prim(self.prim).attr(&self.name)?;
        attr.samples.resolve(t, g.interpolation()).map(|v| v.into_owned())
    }

    /// Read one scalar sample into `dst`.
    ///
    /// `T`'s layout must match the type tag; a size mismatch is rejected.
    /// Returns false when no sample can be located at `t`.
    pub fn read_sample<T: Pod>(&self, dst: &mut T, t: Time) -> bool {
        if self.ty.is_array() || self.ty.is_string_kind() {
            warn!("read_sample on non-scalar attribute '{}'", self.name);
            return false;
        }
        let Some(esize) = self.ty.element_size() else {
            return false;
        };
        if std::mem::size_of::<T>() != esize {
            error!(
                "buffer layout mismatch on '{}': {} bytes vs {} declared",
                self.name,
                std::mem::size_of::<T>(),
                esize
            );
            return false;
        }
        let Some(v) = self.resolve(t) else {
            return false;
        };
        copy_scalar(&v, self.ty, bytemuck::bytes_of_mut(dst))
    }

    /// Read up to `dst.len()` elements of an array sample into `dst`.
    ///
    /// Size the buffer with [`Attribute::array_size`] at the same `t`.
    pub fn read_array_sample<T: Pod>(&self, dst: &mut [T], t: Time) -> bool {
        if !self.ty.is_array() || self.ty.is_string_kind() {
            warn!("read_array_sample on non-array attribute '{}'", self.name);
            return false;
        }
        let Some(esize) = self.ty.element_size() else {
            return false;
        };
        if std::mem::size_of::<T>() != esize {
            error!(
                "buffer layout mismatch on '{}': {} bytes vs {} declared",
                self.name,
                std::mem::size_of::<T>(),
                esize
            );
            return false;
        }
        let Some(v) = self.resolve(t) else {
            return false;
        };
        copy_array(&v, self.ty, bytemuck::cast_slice_mut(dst))
    }

    /// Read a token/string scalar sample.
    pub fn read_string(&self, t: Time) -> Option<String> {
        if !self.ty.is_string_kind() || self.ty.is_array() {
            return None;
        }
        self.resolve(t)?.as_token().map(str::to_string)
    }

    /// Read a token/string array sample.
    pub fn read_string_array(&self, t: Time) -> Option<Vec<String>> {
        if !self.ty.is_string_kind() || !self.ty.is_array() {
            return None;
        }
        self.resolve(t)?.as_token_array().map(|v| v.to_vec())
    }

    fn writable(&self) -> bool {
        if self.stage.is_read_only() {
            warn!("write on read-only session: attribute '{}'", self.name);
            return false;
        }
        true
    }

    fn store(&self, t: Time, value: Value) -> bool {
        let mut g = self.stage.write();
        let prim = g.prim_mut(self.prim);
        let Some(attr) = prim.attr_mut(&self.name) else {
            return false;
        };
        attr.samples.set(t, value);
        true
    }

    /// Write one scalar sample at `t`. Only meaningful on writable sessions.
    pub fn write_sample<T: Pod>(&self, src: &T, t: Time) -> bool {
        if !self.writable() {
            return false;
        }
        if self.ty.is_array() || self.ty.is_string_kind() {
            return false;
        }
        if self.ty.element_size() != Some(std::mem::size_of::<T>()) {
            error!("buffer layout mismatch writing '{}'", self.name);
            return false;
        }
        let Some(value) = scalar_from_bytes(self.ty, bytemuck::bytes_of(src)) else {
            return false;
        };
        self.store(t, value)
    }

    /// Write one array sample at `t`, replacing any sample at that time.
    pub fn write_array_sample<T: Pod>(&self, src: &[T], t: Time) -> bool {
        if !self.writable() {
            return false;
        }
        if !self.ty.is_array() || self.ty.is_string_kind() {
            return false;
        }
        if self.ty.element_size() != Some(std::mem::size_of::<T>()) {
            error!("buffer layout mismatch writing '{}'", self.name);
            return false;
        }
        let Some(value) = array_from_bytes(self.ty, bytemuck::cast_slice(src)) else {
            return false;
        };
        self.store(t, value)
    }

    /// Write a token/string scalar sample.
    pub fn write_string(&self, s: &str, t: Time) -> bool {
        if !self.writable() || self.ty.is_array() {
            return false;
        }
        let value = match self.ty {
            AttributeType::Token => Value::Token(s.to_string()),
            AttributeType::String => Value::String(s.to_string()),
            _ => return false,
        };
        self.store(t, value)
    }

    /// Write a token/string array sample.
    pub fn write_string_array(&self, items: &[String], t: Time) -> bool {
        if !self.writable() {
            return false;
        }
        let value = match self.ty {
            AttributeType::TokenArray => Value::TokenArray(items.to_vec()),
            AttributeType::StringArray => Value::StringArray(items.to_vec()),
            _ => return false,
        };
        self.store(t, value)
    }
}

/// Copy a resolved scalar value into a caller buffer keyed by tag.
fn copy_scalar(v: &Value, ty: AttributeType, dst: &mut [u8]) -> bool {
    match (ty, v) {
        (AttributeType::Byte, Value::Byte(b)) => dst.copy_from_slice(bytemuck::bytes_of(b)),
        (AttributeType::Int, Value::Int(i)) => dst.copy_from_slice(bytemuck::bytes_of(i)),
        (AttributeType::UInt, Value::UInt(u)) => dst.copy_from_slice(bytemuck::bytes_of(u)),
        (AttributeType::Float, Value::Float(f)) => dst.copy_from_slice(bytemuck::bytes_of(f)),
        (AttributeType::Float2, Value::Float2(v)) => dst.copy_from_slice(bytemuck::bytes_of(v)),
        (AttributeType::Float3, Value::Float3(v)) => dst.copy_from_slice(bytemuck::bytes_of(v)),
        (AttributeType::Float4, Value::Float4(v)) => dst.copy_from_slice(bytemuck::bytes_of(v)),
        (AttributeType::Quaternion, Value::Quatf(q)) => {
            dst.copy_from_slice(bytemuck::bytes_of(q))
        }
        _ => return false,
    }
    true
}

/// Copy up to `dst.len()` bytes worth of elements from an array value.
fn copy_array(v: &Value, ty: AttributeType, dst: &mut [u8]) -> bool {
    let src: &[u8] = match (ty, v) {
        (AttributeType::ByteArray, Value::ByteArray(a)) => a,
        (AttributeType::IntArray, Value::IntArray(a)) => bytemuck::cast_slice(a),
        (AttributeType::UIntArray, Value::UIntArray(a)) => bytemuck::cast_slice(a),
        (AttributeType::FloatArray, Value::FloatArray(a)) => bytemuck::cast_slice(a),
        (AttributeType::Float2Array, Value::Float2Array(a)) => bytemuck::cast_slice(a),
        (AttributeType::Float3Array, Value::Float3Array(a)) => bytemuck::cast_slice(a),
        (AttributeType::Float4Array, Value::Float4Array(a)) => bytemuck::cast_slice(a),
        (AttributeType::QuaternionArray, Value::QuatfArray(a)) => bytemuck::cast_slice(a),
        _ => return false,
    };
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
    true
}

fn scalar_from_bytes(ty: AttributeType, src: &[u8]) -> Option<Value> {
    let value = match ty {
        AttributeType::Byte => Value::Byte(src[0]),
        AttributeType::Int => Value::Int(*bytemuck::from_bytes(src)),
        AttributeType::UInt => Value::UInt(*bytemuck::from_bytes(src)),
        AttributeType::Float => Value::Float(*bytemuck::from_bytes(src)),
        AttributeType::Float2 => Value::Float2(*bytemuck::from_bytes(src)),
        AttributeType::Float3 => Value::Float3(*bytemuck::from_bytes(src)),
        AttributeType::Float4 => Value::Float4(*bytemuck::from_bytes(src)),
        AttributeType::Quaternion => Value::Quatf(*bytemuck::from_bytes(src)),
        _ => return None,
    };
    Some(value)
}

fn array_from_bytes(ty: AttributeType, src: &[u8]) -> Option<Value> {
    let value = match ty {
        AttributeType::ByteArray => Value::ByteArray(src.to_vec()),
        AttributeType::IntArray => Value::IntArray(bytemuck::cast_slice(src).to_vec()),
        AttributeType::UIntArray => Value::UIntArray(bytemuck::cast_slice(src).to_vec()),
        AttributeType::FloatArray => Value::FloatArray(bytemuck::cast_slice(src).to_vec()),
        AttributeType::Float2Array => Value::Float2Array(bytemuck::cast_slice(src).to_vec()),
        AttributeType::Float3Array => Value::Float3Array(bytemuck::cast_slice(src).to_vec()),
        AttributeType::Float4Array => Value::Float4Array(bytemuck::cast_slice(src).to_vec()),
        AttributeType::QuaternionArray => {
            Value::QuatfArray(bytemuck::cast_slice(src).to_vec())
        }
        _ => return None,
    };
    Some(value)
}
