//! Primitive type identities and the dynamic [`Value`] carried between the
//! stream codec and record accessors.
//!
//! Every field access made by the object engine goes through a `Value`:
//! accessors produce one on encode and consume one on decode.  This is what
//! lets the engine resolve sibling array lengths, apply primitive mappings
//! and copy fields by name between two different record types without
//! knowing either type statically.
//!
//! # Numeric conversion
//! [`Value::convert`] performs checked widening/narrowing between numeric
//! primitives.  Integers convert exactly or fail; floats round half-to-even
//! before narrowing to an integer; booleans read as `0`/`1` and any non-zero
//! number converts to `true`.

use std::fmt;

use crate::error::{Error, Result};
use crate::schema::DynRecord;

// ── PrimitiveType ────────────────────────────────────────────────────────────

/// On-stream primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Bool,
    U8,
    I8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 11] = [
        PrimitiveType::Bool,
        PrimitiveType::U8,
        PrimitiveType::I8,
        PrimitiveType::I16,
        PrimitiveType::U16,
        PrimitiveType::I32,
        PrimitiveType::U32,
        PrimitiveType::I64,
        PrimitiveType::U64,
        PrimitiveType::F32,
        PrimitiveType::F64,
    ];

    /// Encoded width in bytes.
    #[inline]
    pub fn size(self) -> usize {
        match self {
            PrimitiveType::Bool | PrimitiveType::U8 | PrimitiveType::I8 => 1,
            PrimitiveType::I16 | PrimitiveType::U16 => 2,
            PrimitiveType::I32 | PrimitiveType::U32 | PrimitiveType::F32 => 4,
            PrimitiveType::I64 | PrimitiveType::U64 | PrimitiveType::F64 => 8,
        }
    }

    /// Canonical short name (diagnostics and CLI).
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::U8   => "u8",
            PrimitiveType::I8   => "i8",
            PrimitiveType::I16  => "i16",
            PrimitiveType::U16  => "u16",
            PrimitiveType::I32  => "i32",
            PrimitiveType::U32  => "u32",
            PrimitiveType::I64  => "i64",
            PrimitiveType::U64  => "u64",
            PrimitiveType::F32  => "f32",
            PrimitiveType::F64  => "f64",
        }
    }

    /// Resolve a type name.  Accepts the canonical names plus the common
    /// C-style spellings (`uint32`, `short`, `double`, ...).
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bool" | "boolean"                    => Some(PrimitiveType::Bool),
            "u8" | "byte" | "uint8"               => Some(PrimitiveType::U8),
            "i8" | "sbyte" | "int8"               => Some(PrimitiveType::I8),
            "i16" | "int16" | "short"             => Some(PrimitiveType::I16),
            "u16" | "uint16" | "ushort"           => Some(PrimitiveType::U16),
            "i32" | "int32" | "int"               => Some(PrimitiveType::I32),
            "u32" | "uint32" | "uint"             => Some(PrimitiveType::U32),
            "i64" | "int64" | "long"              => Some(PrimitiveType::I64),
            "u64" | "uint64" | "ulong"            => Some(PrimitiveType::U64),
            "f32" | "single" | "float"            => Some(PrimitiveType::F32),
            "f64" | "double"                      => Some(PrimitiveType::F64),
            _                                     => None,
        }
    }

    /// Like [`from_name`](Self::from_name) but reports unknown names as a
    /// configuration error.
    pub fn parse(s: &str) -> Result<Self> {
        Self::from_name(s)
            .ok_or_else(|| Error::configuration(s, "unsupported primitive type"))
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Value ────────────────────────────────────────────────────────────────────

/// One decoded (or to-be-encoded) field value.
#[derive(Debug)]
pub enum Value {
    Bool(bool),
    U8(u8),
    I8(i8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Array(Vec<Value>),
    Record(Box<dyn DynRecord>),
}

#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i128),
    Float(f64),
}

impl Numeric {
    fn is_nonzero(self) -> bool {
        match self {
            Numeric::Int(i)   => i != 0,
            Numeric::Float(f) => f != 0.0,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(i)   => i as f64,
            Numeric::Float(f) => f,
        }
    }

    fn narrow<T: TryFrom<i128>>(self) -> Option<T> {
        let wide = match self {
            Numeric::Int(i) => i,
            Numeric::Float(f) if f.is_finite() => f.round_ties_even() as i128,
            Numeric::Float(_) => return None,
        };
        T::try_from(wide).ok()
    }
}

impl Value {
    /// The primitive type of this value, `None` for strings, arrays and
    /// records.
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        Some(match self {
            Value::Bool(_) => PrimitiveType::Bool,
            Value::U8(_)   => PrimitiveType::U8,
            Value::I8(_)   => PrimitiveType::I8,
            Value::I16(_)  => PrimitiveType::I16,
            Value::U16(_)  => PrimitiveType::U16,
            Value::I32(_)  => PrimitiveType::I32,
            Value::U32(_)  => PrimitiveType::U32,
            Value::I64(_)  => PrimitiveType::I64,
            Value::U64(_)  => PrimitiveType::U64,
            Value::F32(_)  => PrimitiveType::F32,
            Value::F64(_)  => PrimitiveType::F64,
            Value::String(_) | Value::Array(_) | Value::Record(_) => return None,
        })
    }

    /// Short description of the value's kind for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Array(_)  => "array",
            Value::Record(r) => r.record_type_name(),
            other => other.primitive_type().map_or("value", PrimitiveType::name),
        }
    }

    fn numeric(&self) -> Option<Numeric> {
        Some(match *self {
            Value::Bool(v) => Numeric::Int(v as i128),
            Value::U8(v)   => Numeric::Int(v.into()),
            Value::I8(v)   => Numeric::Int(v.into()),
            Value::I16(v)  => Numeric::Int(v.into()),
            Value::U16(v)  => Numeric::Int(v.into()),
            Value::I32(v)  => Numeric::Int(v.into()),
            Value::U32(v)  => Numeric::Int(v.into()),
            Value::I64(v)  => Numeric::Int(v.into()),
            Value::U64(v)  => Numeric::Int(v.into()),
            Value::F32(v)  => Numeric::Float(v.into()),
            Value::F64(v)  => Numeric::Float(v),
            Value::String(_) | Value::Array(_) | Value::Record(_) => return None,
        })
    }

    /// Convert to another primitive type.
    ///
    /// Fails with [`Error::TypeConversion`] if the value is not numeric or
    /// does not fit the destination.
    pub fn convert(self, to: PrimitiveType) -> Result<Value> {
        if self.primitive_type() == Some(to) {
            return Ok(self);
        }
        let num = self
            .numeric()
            .ok_or_else(|| Error::conversion(self.kind_name(), to.name(), &self))?;

        let converted = match to {
            PrimitiveType::Bool => Some(Value::Bool(num.is_nonzero())),
            PrimitiveType::U8   => num.narrow().map(Value::U8),
            PrimitiveType::I8   => num.narrow().map(Value::I8),
            PrimitiveType::I16  => num.narrow().map(Value::I16),
            PrimitiveType::U16  => num.narrow().map(Value::U16),
            PrimitiveType::I32  => num.narrow().map(Value::I32),
            PrimitiveType::U32  => num.narrow().map(Value::U32),
            PrimitiveType::I64  => num.narrow().map(Value::I64),
            PrimitiveType::U64  => num.narrow().map(Value::U64),
            PrimitiveType::F32  => Some(Value::F32(num.as_f64() as f32)),
            PrimitiveType::F64  => Some(Value::F64(num.as_f64())),
        };
        converted.ok_or_else(|| Error::conversion(self.kind_name(), to.name(), &self))
    }

    /// Interpret the value as an element count.
    pub fn to_count(&self) -> Result<usize> {
        self.numeric()
            .and_then(Numeric::narrow::<usize>)
            .ok_or_else(|| Error::conversion(self.kind_name(), "usize", self))
    }

    pub fn into_string(self) -> Result<String> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(Error::conversion(other.kind_name(), "string", &other)),
        }
    }

    pub fn into_array(self) -> Result<Vec<Value>> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(Error::conversion(other.kind_name(), "array", &other)),
        }
    }

    pub fn into_record(self) -> Result<Box<dyn DynRecord>> {
        match self {
            Value::Record(r) => Ok(r),
            other => Err(Error::conversion(other.kind_name(), "record", &other)),
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        match self {
            Value::Bool(v)   => Value::Bool(*v),
            Value::U8(v)     => Value::U8(*v),
            Value::I8(v)     => Value::I8(*v),
            Value::I16(v)    => Value::I16(*v),
            Value::U16(v)    => Value::U16(*v),
            Value::I32(v)    => Value::I32(*v),
            Value::U32(v)    => Value::U32(*v),
            Value::I64(v)    => Value::I64(*v),
            Value::U64(v)    => Value::U64(*v),
            Value::F32(v)    => Value::F32(*v),
            Value::F64(v)    => Value::F64(*v),
            Value::String(s) => Value::String(s.clone()),
            Value::Array(a)  => Value::Array(a.clone()),
            Value::Record(r) => Value::Record(r.clone_record()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v)   => write!(f, "{v}"),
            Value::U8(v)     => write!(f, "{v}"),
            Value::I8(v)     => write!(f, "{v}"),
            Value::I16(v)    => write!(f, "{v}"),
            Value::U16(v)    => write!(f, "{v}"),
            Value::I32(v)    => write!(f, "{v}"),
            Value::U32(v)    => write!(f, "{v}"),
            Value::I64(v)    => write!(f, "{v}"),
            Value::U64(v)    => write!(f, "{v}"),
            Value::F32(v)    => write!(f, "{v}"),
            Value::F64(v)    => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Record(r) => write!(f, "{r:?}"),
        }
    }
}

// ── Primitive trait ──────────────────────────────────────────────────────────

/// A Rust type that maps one-to-one onto a [`PrimitiveType`].
pub trait Primitive: Copy + Send + Sync + fmt::Debug + 'static {
    const TYPE: PrimitiveType;

    fn into_value(self) -> Value;

    /// Extract from a value, converting numerically if needed.
    fn from_value(value: Value) -> Result<Self>;
}

macro_rules! impl_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const TYPE: PrimitiveType = PrimitiveType::$variant;

                #[inline]
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: Value) -> Result<Self> {
                    match value.convert(PrimitiveType::$variant)? {
                        Value::$variant(v) => Ok(v),
                        other => Err(Error::conversion(other.kind_name(), stringify!($ty), &other)),
                    }
                }
            }
        )*
    };
}

impl_primitive! {
    bool => Bool,
    u8   => U8,
    i8   => I8,
    i16  => I16,
    u16  => U16,
    i32  => I32,
    u32  => U32,
    i64  => I64,
    u64  => U64,
    f32  => F32,
    f64  => F64,
}
