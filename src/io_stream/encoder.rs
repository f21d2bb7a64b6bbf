//! Primitive write side, mirroring [`Decoder`](super::Decoder).

use std::io::{Seek, SeekFrom, Write};

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use super::WriteSeek;
use crate::error::{Error, Result};
use crate::session::{Endianness, Session, TextEncoding};
use crate::value::{PrimitiveType, Value};

macro_rules! write_endian {
    ($self:ident, $method:ident, $value:expr, $size:expr) => {{
        let start = $self.position()?;
        let result = match $self.session.endianness {
            Endianness::Little => $self.io.$method::<LittleEndian>($value),
            Endianness::Big    => $self.io.$method::<BigEndian>($value),
        };
        result.map_err(|e| Error::from_io(e, start, $size))
    }};
}

/// Write cursor over a sink plus the session it encodes under.
pub struct Encoder<'a> {
    io:      &'a mut dyn WriteSeek,
    session: &'a Session,
}

impl<'a> Encoder<'a> {
    pub fn new(io: &'a mut dyn WriteSeek, session: &'a Session) -> Self {
        Self { io, session }
    }

    pub fn session(&self) -> &'a Session {
        self.session
    }

    pub fn position(&mut self) -> Result<u64> {
        Ok(self.io.stream_position()?)
    }

    pub fn seek(&mut self, addr: u64) -> Result<()> {
        self.io.seek(SeekFrom::Start(addr))?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.io.flush()?)
    }

    // ── Fixed width ──────────────────────────────────────────────────────────

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_raw(&[value])
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        write_endian!(self, write_i16, value, 2)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        write_endian!(self, write_u16, value, 2)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        write_endian!(self, write_i32, value, 4)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        write_endian!(self, write_u32, value, 4)
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        write_endian!(self, write_i64, value, 8)
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        write_endian!(self, write_u64, value, 8)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        write_endian!(self, write_f32, value, 4)
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        write_endian!(self, write_f64, value, 8)
    }

    /// Write a primitive value with its own width.
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        match *value {
            Value::Bool(v) => self.write_bool(v),
            Value::U8(v)   => self.write_u8(v),
            Value::I8(v)   => self.write_i8(v),
            Value::I16(v)  => self.write_i16(v),
            Value::U16(v)  => self.write_u16(v),
            Value::I32(v)  => self.write_i32(v),
            Value::U32(v)  => self.write_u32(v),
            Value::I64(v)  => self.write_i64(v),
            Value::U64(v)  => self.write_u64(v),
            Value::F32(v)  => self.write_f32(v),
            Value::F64(v)  => self.write_f64(v),
            Value::String(_) | Value::Array(_) | Value::Record(_) => {
                Err(Error::conversion(value.kind_name(), "primitive", value))
            }
        }
    }

    /// Write a value declared as `declared`, converting it to the session's
    /// mapped on-stream type first.
    pub fn write_mapped(&mut self, declared: PrimitiveType, value: Value) -> Result<()> {
        let on_stream = self.session.primitive_mappings.resolve(declared);
        self.write_value(&value.convert(on_stream)?)
    }

    // ── Blocks and strings ───────────────────────────────────────────────────

    /// Write `bytes`; reversed when the session is big-endian.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if self.session.endianness == Endianness::Big {
            let mut block = bytes.to_vec();
            block.reverse();
            self.write_raw(&block)
        } else {
            self.write_raw(bytes)
        }
    }

    /// Write `bytes` in the given order regardless of endianness.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let start = self.position()?;
        self.io.write_all(bytes).map_err(|e| Error::from_io(e, start, bytes.len()))
    }

    pub fn write_null_terminated_string(&mut self, text: &str) -> Result<()> {
        self.write_fixed_length_string_with(text, None, self.session.encoding)
    }

    pub fn write_null_terminated_string_with(&mut self, text: &str, encoding: TextEncoding) -> Result<()> {
        self.write_fixed_length_string_with(text, None, encoding)
    }

    pub fn write_fixed_length_string(&mut self, text: &str, size: Option<usize>) -> Result<()> {
        self.write_fixed_length_string_with(text, size, self.session.encoding)
    }

    /// Without `size`, writes the encoded bytes plus one zero byte.  With
    /// `size`, writes exactly that many bytes: zero padded when the text is
    /// shorter, cut when it is longer.
    pub fn write_fixed_length_string_with(
        &mut self,
        text:     &str,
        size:     Option<usize>,
        encoding: TextEncoding,
    ) -> Result<()> {
        let mut bytes = encoding.encode(text);
        let size = size.unwrap_or(bytes.len() + 1);
        bytes.resize(size, 0);
        self.write_raw(&bytes)
    }
}
