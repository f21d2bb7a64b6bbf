use std::io::Cursor;

use parking_lot::Mutex;

use super::{Decoder, Encoder};
use crate::error::Result;
use crate::schema::Record;
use crate::session::{CodecOptions, Session};

/// Growable in-memory buffer with both the read and the write surface and a
/// single shared configuration.
pub struct ObjectStream {
    io:      Mutex<Cursor<Vec<u8>>>,
    session: Session,
}

impl Default for ObjectStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStream {
    /// Empty buffer with default options.
    pub fn new() -> Self {
        Self::from_bytes(Vec::new(), CodecOptions::default())
    }

    pub fn with_options(options: CodecOptions) -> Self {
        Self::from_bytes(Vec::new(), options)
    }

    /// Wrap existing content; the cursor starts at offset 0.
    pub fn from_bytes(bytes: Vec<u8>, options: CodecOptions) -> Self {
        Self::with_session(bytes, Session::new(options))
    }

    pub fn with_session(bytes: Vec<u8>, session: Session) -> Self {
        Self { io: Mutex::new(Cursor::new(bytes)), session }
    }

    pub fn decoder(&mut self) -> Decoder<'_> {
        Decoder::new(self.io.get_mut(), &self.session)
    }

    pub fn encoder(&mut self) -> Encoder<'_> {
        Encoder::new(self.io.get_mut(), &self.session)
    }

    fn read_at_addr<T>(&self, addr: u64, op: impl FnOnce(&mut Decoder<'_>) -> Result<T>) -> Result<T> {
        let mut lock = self.lock();
        let mut dec = lock.decoder();
        dec.seek(addr)?;
        op(&mut dec)
    }

    fn write_at_addr(&self, addr: u64, op: impl FnOnce(&mut Encoder<'_>) -> Result<()>) -> Result<()> {
        let mut lock = self.lock();
        let mut enc = lock.encoder();
        enc.seek(addr)?;
        op(&mut enc)
    }

    session_surface!(Cursor<Vec<u8>>);
    read_surface!();
    write_surface!();

    pub fn read_record<T: Record>(&mut self) -> Result<T> {
        self.decoder().read_record()
    }

    pub fn read_record_at<T: Record>(&self, addr: u64) -> Result<T> {
        self.read_at_addr(addr, |d| d.read_record())
    }

    pub fn write_record<T: Record>(&mut self, record: &T) -> Result<()> {
        self.encoder().write_record(record)
    }

    pub fn write_record_at<T: Record>(&self, addr: u64, record: &T) -> Result<()> {
        self.write_at_addr(addr, |e| e.write_record(record))
    }

    /// Current buffer length in bytes.
    pub fn len(&self) -> usize {
        self.io.lock().get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the buffer content.
    pub fn to_vec(&self) -> Vec<u8> {
        self.io.lock().get_ref().clone()
    }

    /// Consume the stream and return the buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.into_inner().into_inner()
    }
}
