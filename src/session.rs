//! Codec session state: everything a reader or writer instance carries for
//! its whole lifetime.
//!
//! [`CodecOptions`] is the serialisable part (endianness, schema version,
//! text encoding).  [`Session`] adds the runtime tables that cannot be
//! serialised: primitive/object mappings and the schema registry handle.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::mapping::{ObjectMappings, PrimitiveMappings};
use crate::schema::SchemaRegistry;

/// Default active schema version.
pub const DEFAULT_VERSION: f64 = 1.0;

// ── Endianness ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl Endianness {
    /// Put a little-endian byte block into stream order (or back).
    /// Big-endian reverses the block; little-endian is the identity.
    #[inline]
    pub fn orient(self, bytes: &mut [u8]) {
        if self == Endianness::Big {
            bytes.reverse();
        }
    }
}

// ── TextEncoding ─────────────────────────────────────────────────────────────

/// Text encoding applied to string fields.
///
/// Decoding never fails: invalid UTF-8 becomes U+FFFD and non-ASCII bytes
/// become `?` under [`TextEncoding::Ascii`].  Encoding replaces characters
/// the encoding cannot represent with `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
    Ascii,
}

impl TextEncoding {
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8   => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            TextEncoding::Ascii  => bytes
                .iter()
                .map(|&b| if b.is_ascii() { char::from(b) } else { '?' })
                .collect(),
        }
    }

    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8   => text.as_bytes().to_vec(),
            TextEncoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
            TextEncoding::Ascii  => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
        }
    }

    /// Parse from a CLI string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "").as_str() {
            "utf8"                          => Some(TextEncoding::Utf8),
            "latin1" | "iso88591"           => Some(TextEncoding::Latin1),
            "ascii" | "usascii"             => Some(TextEncoding::Ascii),
            _                               => None,
        }
    }
}

// ── CodecOptions ─────────────────────────────────────────────────────────────

/// Construction parameters for a reader, writer or stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    pub endianness: Endianness,
    /// Active schema version; fractional sub-versions are allowed.
    pub version:    f64,
    pub encoding:   TextEncoding,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            endianness: Endianness::Little,
            version:    DEFAULT_VERSION,
            encoding:   TextEncoding::Utf8,
        }
    }
}

impl CodecOptions {
    pub fn with_endianness(endianness: Endianness) -> Self {
        Self { endianness, ..Self::default() }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

// ── Session ──────────────────────────────────────────────────────────────────

/// Per-instance codec state.
#[derive(Debug, Clone)]
pub struct Session {
    pub endianness:         Endianness,
    pub version:            f64,
    pub encoding:           TextEncoding,
    pub primitive_mappings: PrimitiveMappings,
    pub object_mappings:    ObjectMappings,
    pub registry:           Arc<SchemaRegistry>,
}

impl Session {
    /// A session backed by the process-wide schema registry.
    pub fn new(options: CodecOptions) -> Self {
        Self::with_registry(options, SchemaRegistry::global())
    }

    pub fn with_registry(options: CodecOptions, registry: Arc<SchemaRegistry>) -> Self {
        Self {
            endianness:         options.endianness,
            version:            options.version,
            encoding:           options.encoding,
            primitive_mappings: PrimitiveMappings::default(),
            object_mappings:    ObjectMappings::default(),
            registry,
        }
    }

    pub fn options(&self) -> CodecOptions {
        CodecOptions {
            endianness: self.endianness,
            version:    self.version,
            encoding:   self.encoding,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(CodecOptions::default())
    }
}
