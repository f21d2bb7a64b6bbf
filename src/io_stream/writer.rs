use std::io::{Seek, Write};

use parking_lot::Mutex;

use super::Encoder;
use crate::error::Result;
use crate::schema::Record;
use crate::session::{CodecOptions, Session};

/// Encodes primitives, strings and records into a seekable sink.
///
/// Writing past the end of a fixed-size sink (for example a
/// `Cursor<&mut [u8]>`) fails with
/// [`Error::BufferExhausted`](crate::Error::BufferExhausted).
pub struct ObjectWriter<W> {
    io:      Mutex<W>,
    session: Session,
}

impl<W: Write + Seek> ObjectWriter<W> {
    /// Little-endian, version 1.0, UTF-8, process-wide schema registry.
    pub fn new(inner: W) -> Self {
        Self::with_session(inner, Session::default())
    }

    pub fn with_options(inner: W, options: CodecOptions) -> Self {
        Self::with_session(inner, Session::new(options))
    }

    pub fn with_session(inner: W, session: Session) -> Self {
        Self { io: Mutex::new(inner), session }
    }

    /// Encoder over the exclusively borrowed sink.
    pub fn encoder(&mut self) -> Encoder<'_> {
        Encoder::new(self.io.get_mut(), &self.session)
    }

    fn write_at_addr(&self, addr: u64, op: impl FnOnce(&mut Encoder<'_>) -> Result<()>) -> Result<()> {
        let mut lock = self.lock();
        let mut enc = lock.encoder();
        enc.seek(addr)?;
        op(&mut enc)
    }

    session_surface!(W);
    write_surface!();

    /// Encode `record` at the current position.
    pub fn write_record<T: Record>(&mut self, record: &T) -> Result<()> {
        self.encoder().write_record(record)
    }

    /// Encode `record` at `addr` under the instance lock.
    pub fn write_record_at<T: Record>(&self, addr: u64, record: &T) -> Result<()> {
        self.write_at_addr(addr, |e| e.write_record(record))
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.io.get_mut().flush()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Endianness;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn sequential_writes_follow_endianness() {
        let mut writer = ObjectWriter::with_options(
            Cursor::new(Vec::new()),
            CodecOptions::with_endianness(Endianness::Big),
        );
        writer.write_u16(0x0102).unwrap();
        writer.write_i32(-1).unwrap();
        writer.write_null_terminated_string("ok").unwrap();
        assert_eq!(writer.position().unwrap(), 9);
        assert_eq!(writer.into_inner().into_inner(), [1, 2, 0xFF, 0xFF, 0xFF, 0xFF, b'o', b'k', 0]);
    }

    #[test]
    fn addressed_writes_from_many_threads() {
        let writer = Arc::new(ObjectWriter::new(Cursor::new(vec![0u8; 64])));
        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let writer = Arc::clone(&writer);
                thread::spawn(move || writer.write_u64_at(t * 8, t * 0x0101_0101).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let writer = Arc::try_unwrap(writer).ok().unwrap();
        let bytes = writer.into_inner().into_inner();
        for t in 0..8usize {
            let v = u64::from_le_bytes(bytes[t * 8..t * 8 + 8].try_into().unwrap());
            assert_eq!(v, t as u64 * 0x0101_0101);
        }
    }

    #[test]
    fn fixed_sink_overflow_is_exhausted() {
        let mut backing = [0u8; 2];
        let mut writer = ObjectWriter::new(Cursor::new(&mut backing[..]));
        writer.write_u8(1).unwrap();
        assert!(writer.write_u16(2).unwrap_err().is_buffer_exhausted());
    }
}
