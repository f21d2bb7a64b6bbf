use std::io::{Read, Seek};

use parking_lot::Mutex;

use super::Decoder;
use crate::error::Result;
use crate::schema::Record;
use crate::session::{CodecOptions, Session};

/// Decodes primitives, strings and records from a seekable source.
///
/// ```
/// use std::io::Cursor;
/// use binobject::{CodecOptions, Endianness, ObjectReader};
///
/// let bytes = [0x00, 0x00, 0x12, 0x34];
/// let reader = ObjectReader::with_options(
///     Cursor::new(&bytes[..]),
///     CodecOptions::with_endianness(Endianness::Big),
/// );
/// assert_eq!(reader.read_u16_at(2).unwrap(), 0x1234);
/// ```
pub struct ObjectReader<R> {
    io:      Mutex<R>,
    session: Session,
}

impl<R: Read + Seek> ObjectReader<R> {
    /// Little-endian, version 1.0, UTF-8, process-wide schema registry.
    pub fn new(inner: R) -> Self {
        Self::with_session(inner, Session::default())
    }

    pub fn with_options(inner: R, options: CodecOptions) -> Self {
        Self::with_session(inner, Session::new(options))
    }

    pub fn with_session(inner: R, session: Session) -> Self {
        Self { io: Mutex::new(inner), session }
    }

    /// Decoder over the exclusively borrowed stream.
    pub fn decoder(&mut self) -> Decoder<'_> {
        Decoder::new(self.io.get_mut(), &self.session)
    }

    fn read_at_addr<T>(&self, addr: u64, op: impl FnOnce(&mut Decoder<'_>) -> Result<T>) -> Result<T> {
        let mut lock = self.lock();
        let mut dec = lock.decoder();
        dec.seek(addr)?;
        op(&mut dec)
    }

    session_surface!(R);
    read_surface!();

    /// Decode one `T` at the current position.
    pub fn read_record<T: Record>(&mut self) -> Result<T> {
        self.decoder().read_record()
    }

    /// Decode one `T` at `addr` under the instance lock.
    pub fn read_record_at<T: Record>(&self, addr: u64) -> Result<T> {
        self.read_at_addr(addr, |d| d.read_record())
    }
}
