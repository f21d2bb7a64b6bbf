//! Primitive read side: fixed-width values, raw blocks, strings and
//! compressed integers at the current position of a seekable source.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use super::ReadSeek;
use crate::codec::PREALLOC_LIMIT;
use crate::compressed::{self, MAX_COMPRESSED_SIZE};
use crate::error::{Error, Result};
use crate::session::{Endianness, Session, TextEncoding};
use crate::value::{PrimitiveType, Value};

macro_rules! read_endian {
    ($self:ident, $method:ident, $size:expr) => {{
        let start = $self.position()?;
        let result = match $self.session.endianness {
            Endianness::Little => $self.io.$method::<LittleEndian>(),
            Endianness::Big    => $self.io.$method::<BigEndian>(),
        };
        result.map_err(|e| Error::from_io(e, start, $size))
    }};
}

/// Read cursor over a stream plus the session it decodes under.
///
/// Obtained from [`ObjectReader::lock`](super::ObjectReader::lock) (or the
/// stream equivalent); every operation advances the underlying cursor.
pub struct Decoder<'a> {
    io:      &'a mut dyn ReadSeek,
    session: &'a Session,
}

impl<'a> Decoder<'a> {
    pub fn new(io: &'a mut dyn ReadSeek, session: &'a Session) -> Self {
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

    /// Fill `buf` completely.  A short read reports the offset the read
    /// started at.
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        let start = self.position()?;
        self.io.read_exact(buf).map_err(|e| Error::from_io(e, start, buf.len()))
    }

    // ── Fixed width ──────────────────────────────────────────────────────────

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.fill(&mut byte)?;
        Ok(byte[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Any non-zero byte is `true`.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        read_endian!(self, read_i16, 2)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        read_endian!(self, read_u16, 2)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        read_endian!(self, read_i32, 4)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        read_endian!(self, read_u32, 4)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        read_endian!(self, read_i64, 8)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        read_endian!(self, read_u64, 8)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        read_endian!(self, read_f32, 4)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        read_endian!(self, read_f64, 8)
    }

    /// Read one value of an on-stream primitive type.
    pub fn read_value(&mut self, ty: PrimitiveType) -> Result<Value> {
        Ok(match ty {
            PrimitiveType::Bool => Value::Bool(self.read_bool()?),
            PrimitiveType::U8   => Value::U8(self.read_u8()?),
            PrimitiveType::I8   => Value::I8(self.read_i8()?),
            PrimitiveType::I16  => Value::I16(self.read_i16()?),
            PrimitiveType::U16  => Value::U16(self.read_u16()?),
            PrimitiveType::I32  => Value::I32(self.read_i32()?),
            PrimitiveType::U32  => Value::U32(self.read_u32()?),
            PrimitiveType::I64  => Value::I64(self.read_i64()?),
            PrimitiveType::U64  => Value::U64(self.read_u64()?),
            PrimitiveType::F32  => Value::F32(self.read_f32()?),
            PrimitiveType::F64  => Value::F64(self.read_f64()?),
        })
    }

    /// Read a value declared as `declared`, honouring the session's
    /// primitive mapping.  The result always has type `declared`.
    pub fn read_mapped(&mut self, declared: PrimitiveType) -> Result<Value> {
        match self.session.primitive_mappings.get(declared) {
            Some(on_stream) => self.read_value(on_stream)?.convert(declared),
            None => self.read_value(declared),
        }
    }

    // ── Blocks and strings ───────────────────────────────────────────────────

    /// Read `count` bytes; reversed when the session is big-endian.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut buf = self.read_raw(count)?;
        self.session.endianness.orient(&mut buf);
        Ok(buf)
    }

    /// Read `count` bytes in stream order regardless of endianness.
    ///
    /// The buffer grows with the bytes actually read, so an oversized
    /// `count` fails with [`Error::BufferExhausted`] instead of allocating.
    pub fn read_raw(&mut self, count: usize) -> Result<Vec<u8>> {
        let start = self.position()?;
        let mut buf = Vec::with_capacity(count.min(PREALLOC_LIMIT));
        let limit = u64::try_from(count).unwrap_or(u64::MAX);
        (&mut *self.io)
            .take(limit)
            .read_to_end(&mut buf)
            .map_err(|e| Error::from_io(e, start, count))?;
        if buf.len() < count {
            return Err(Error::BufferExhausted { position: start, requested: count });
        }
        Ok(buf)
    }

    pub fn read_null_terminated_string(&mut self) -> Result<String> {
        self.read_null_terminated_string_with(self.session.encoding)
    }

    /// Bytes up to a zero terminator, which is consumed but not returned.
    pub fn read_null_terminated_string_with(&mut self, encoding: TextEncoding) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            match self.read_u8()? {
                0 => break,
                b => bytes.push(b),
            }
        }
        Ok(encoding.decode(&bytes))
    }

    pub fn read_fixed_length_string(&mut self, length: usize) -> Result<String> {
        self.read_fixed_length_string_with(length, self.session.encoding)
    }

    /// Exactly `length` bytes, cut at the first zero byte.
    pub fn read_fixed_length_string_with(&mut self, length: usize, encoding: TextEncoding) -> Result<String> {
        let bytes = self.read_raw(length)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(encoding.decode(&bytes[..end]))
    }

    // ── Compressed integers ──────────────────────────────────────────────────

    /// Returns the value and the number of bytes consumed.
    pub fn read_compressed_u32(&mut self) -> Result<(u32, usize)> {
        let mut buf = [0u8; MAX_COMPRESSED_SIZE];
        buf[0] = self.read_u8()?;
        let len = compressed::encoded_len(buf[0]);
        self.fill(&mut buf[1..len])?;
        compressed::decode_u32(&buf[..len], self.session.endianness)
    }

    pub fn read_compressed_i32(&mut self) -> Result<(i32, usize)> {
        let (raw, len) = self.read_compressed_u32()?;
        Ok((compressed::to_signed(raw), len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CodecOptions;
    use std::io::Cursor;

    fn session(endianness: Endianness) -> Session {
        Session::new(CodecOptions::with_endianness(endianness))
    }

    #[test]
    fn endianness_selects_byte_order() {
        let bytes = [0x01, 0x02, 0x03, 0x04];
        let le = session(Endianness::Little);
        let be = session(Endianness::Big);

        let mut io = Cursor::new(&bytes[..]);
        assert_eq!(Decoder::new(&mut io, &le).read_u32().unwrap(), 0x0403_0201);
        let mut io = Cursor::new(&bytes[..]);
        assert_eq!(Decoder::new(&mut io, &be).read_u32().unwrap(), 0x0102_0304);
        let mut io = Cursor::new(&bytes[..]);
        assert_eq!(Decoder::new(&mut io, &be).read_bytes(4).unwrap(), [4, 3, 2, 1]);
    }

    #[test]
    fn strings_are_never_reversed() {
        let be = session(Endianness::Big);
        let mut io = Cursor::new(&b"AB\0CDEF\0\0"[..]);
        let mut dec = Decoder::new(&mut io, &be);
        assert_eq!(dec.read_null_terminated_string().unwrap(), "AB");
        assert_eq!(dec.read_fixed_length_string(6).unwrap(), "CDEF");
        assert_eq!(dec.position().unwrap(), 9);
    }

    #[test]
    fn missing_terminator_is_exhausted() {
        let le = session(Endianness::Little);
        let mut io = Cursor::new(&b"ABC"[..]);
        let err = Decoder::new(&mut io, &le).read_null_terminated_string().unwrap_err();
        assert!(err.is_buffer_exhausted());
    }

    #[test]
    fn short_read_reports_request() {
        let le = session(Endianness::Little);
        let mut io = Cursor::new(&[1u8, 2, 3][..]);
        match Decoder::new(&mut io, &le).read_u64() {
            Err(Error::BufferExhausted { requested, .. }) => assert_eq!(requested, 8),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn oversized_raw_read_is_exhausted() {
        let le = session(Endianness::Little);
        let mut io = Cursor::new(&[1u8, 2, 3][..]);
        let mut dec = Decoder::new(&mut io, &le);
        match dec.read_raw(usize::MAX) {
            Err(Error::BufferExhausted { position, requested }) => {
                assert_eq!((position, requested), (0, usize::MAX));
            }
            other => panic!("unexpected {other:?}"),
        }
        dec.seek(1).unwrap();
        assert!(dec.read_fixed_length_string(1 << 40).unwrap_err().is_buffer_exhausted());
    }

    #[test]
    fn exhausted_offset_is_start_of_read() {
        let le = session(Endianness::Little);
        let mut io = Cursor::new(&[0u8; 10][..]);
        let mut dec = Decoder::new(&mut io, &le);
        dec.seek(6).unwrap();
        match dec.read_u64() {
            Err(Error::BufferExhausted { position, requested }) => assert_eq!((position, requested), (6, 8)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn compressed_reads_report_width() {
        let le = session(Endianness::Little);
        let mut io = Cursor::new(&[0x80, 0x01, 0xFF, 0x07][..]);
        let mut dec = Decoder::new(&mut io, &le);
        assert_eq!(dec.read_compressed_u32().unwrap(), (1, 2));
        assert_eq!(dec.read_compressed_i32().unwrap(), (i32::MAX, 1));
        assert_eq!(dec.read_compressed_i32().unwrap(), (-4, 1));
    }

    #[test]
    fn mapped_read_converts_to_declared() {
        let mut le = session(Endianness::Little);
        le.primitive_mappings.insert(PrimitiveType::U32, PrimitiveType::U16);
        let mut io = Cursor::new(&[0x34, 0x12][..]);
        let v = Decoder::new(&mut io, &le).read_mapped(PrimitiveType::U32).unwrap();
        assert!(matches!(v, Value::U32(0x1234)));
    }
}
