//! Positioned binary I/O.
//!
//! # Layers
//! - [`Decoder`] / [`Encoder`]: cursor-relative primitive transfer over a
//!   borrowed stream and session.  The object engine in `codec` adds record,
//!   element and array operations to both.
//! - [`ObjectReader`], [`ObjectWriter`], [`ObjectStream`]: owned stream plus
//!   [`Session`].  Every operation exists in a current-position form
//!   (`read_u32`, `&mut self`) and an addressed form (`read_u32_at`,
//!   `&self`) that seeks and transfers under the instance lock.
//!
//! # Locking
//! Addressed operations take the instance mutex for the whole seek+transfer
//! sequence, so an instance can be shared between threads (`Arc`) and
//! addressed calls never interleave.  Current-position operations need
//! `&mut self` and therefore exclusive ownership.  [`lock`](ObjectReader::lock)
//! hands out a [`StreamLock`] for multi-step critical sections.
//!
//! # Endianness
//! Multi-byte primitives and `read_bytes`/`write_bytes` blocks follow the
//! session endianness.  Strings are always transferred in stream order.

use std::io::{Read, Seek, Write};

use parking_lot::MutexGuard;

use crate::session::Session;

mod decoder;
mod encoder;

pub use decoder::Decoder;
pub use encoder::Encoder;

/// Object-safe `Read + Seek`.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// Object-safe `Write + Seek`.
pub trait WriteSeek: Write + Seek {}
impl<T: Write + Seek + ?Sized> WriteSeek for T {}

// ── Method surfaces ──────────────────────────────────────────────────────────
//
// Each instance type provides `decoder()`/`encoder()` over its exclusively
// borrowed stream and `read_at_addr`/`write_at_addr` for locked addressed
// access; these macros generate the public operations on top of them.

macro_rules! read_surface {
    () => {
        read_surface! { @emit
            fn read_u8 / read_u8_at () -> u8;
            fn read_i8 / read_i8_at () -> i8;
            /// Any non-zero byte is `true`.
            fn read_bool / read_bool_at () -> bool;
            fn read_i16 / read_i16_at () -> i16;
            fn read_u16 / read_u16_at () -> u16;
            fn read_i32 / read_i32_at () -> i32;
            fn read_u32 / read_u32_at () -> u32;
            fn read_i64 / read_i64_at () -> i64;
            fn read_u64 / read_u64_at () -> u64;
            fn read_f32 / read_f32_at () -> f32;
            fn read_f64 / read_f64_at () -> f64;
            /// Raw block, reversed when big-endian.
            fn read_bytes / read_bytes_at (count: usize) -> Vec<u8>;
            fn read_null_terminated_string / read_null_terminated_string_at () -> String;
            fn read_null_terminated_string_with / read_null_terminated_string_with_at
                (encoding: $crate::session::TextEncoding) -> String;
            /// Exactly `length` bytes, cut at the first zero byte.
            fn read_fixed_length_string / read_fixed_length_string_at (length: usize) -> String;
            fn read_fixed_length_string_with / read_fixed_length_string_with_at
                (length: usize, encoding: $crate::session::TextEncoding) -> String;
            /// Value and number of bytes consumed.
            fn read_compressed_u32 / read_compressed_u32_at () -> (u32, usize);
            /// Value and number of bytes consumed.
            fn read_compressed_i32 / read_compressed_i32_at () -> (i32, usize);
            /// One primitive or record.
            fn read_object / read_object_at <E: $crate::schema::Element> () -> E;
            /// `count` consecutive primitives or records.
            fn read_array / read_array_at <E: $crate::schema::Element> (count: usize) -> Vec<E>;
        }
    };
    (@emit $(
        $(#[$doc:meta])*
        fn $name:ident / $at:ident $(<$g:ident: $bound:path>)? ($($arg:ident: $argty:ty),*) -> $ret:ty;
    )*) => {
        $(
            $(#[$doc])*
            pub fn $name $(<$g: $bound>)? (&mut self, $($arg: $argty),*) -> $crate::error::Result<$ret> {
                self.decoder().$name $(::<$g>)? ($($arg),*)
            }

            $(#[$doc])*
            ///
            /// Seeks to `addr` first; runs under the instance lock.
            pub fn $at $(<$g: $bound>)? (&self, addr: u64, $($arg: $argty),*) -> $crate::error::Result<$ret> {
                self.read_at_addr(addr, |d| d.$name $(::<$g>)? ($($arg),*))
            }
        )*
    };
}

macro_rules! write_surface {
    () => {
        write_surface! { @emit
            fn write_u8 / write_u8_at (value: u8);
            fn write_i8 / write_i8_at (value: i8);
            fn write_bool / write_bool_at (value: bool);
            fn write_i16 / write_i16_at (value: i16);
            fn write_u16 / write_u16_at (value: u16);
            fn write_i32 / write_i32_at (value: i32);
            fn write_u32 / write_u32_at (value: u32);
            fn write_i64 / write_i64_at (value: i64);
            fn write_u64 / write_u64_at (value: u64);
            fn write_f32 / write_f32_at (value: f32);
            fn write_f64 / write_f64_at (value: f64);
            /// Raw block, reversed when big-endian.
            fn write_bytes / write_bytes_at (bytes: &[u8]);
            /// Encoded text followed by a zero byte.
            fn write_null_terminated_string / write_null_terminated_string_at (text: &str);
            fn write_null_terminated_string_with / write_null_terminated_string_with_at
                (text: &str, encoding: $crate::session::TextEncoding);
            /// `None`: text plus one zero byte.  `Some(n)`: exactly `n` bytes,
            /// zero padded or cut.
            fn write_fixed_length_string / write_fixed_length_string_at (text: &str, size: Option<usize>);
            fn write_fixed_length_string_with / write_fixed_length_string_with_at
                (text: &str, size: Option<usize>, encoding: $crate::session::TextEncoding);
            /// One primitive or record.
            fn write_object / write_object_at <E: $crate::schema::Element> (value: &E);
            /// Every element of `items`, back to back.
            fn write_array / write_array_at <E: $crate::schema::Element> (items: &[E]);
        }
    };
    (@emit $(
        $(#[$doc:meta])*
        fn $name:ident / $at:ident $(<$g:ident: $bound:path>)? ($($arg:ident: $argty:ty),*);
    )*) => {
        $(
            $(#[$doc])*
            pub fn $name $(<$g: $bound>)? (&mut self, $($arg: $argty),*) -> $crate::error::Result<()> {
                self.encoder().$name $(::<$g>)? ($($arg),*)
            }

            $(#[$doc])*
            ///
            /// Seeks to `addr` first; runs under the instance lock.
            pub fn $at $(<$g: $bound>)? (&self, addr: u64, $($arg: $argty),*) -> $crate::error::Result<()> {
                self.write_at_addr(addr, |e| e.$name $(::<$g>)? ($($arg),*))
            }
        )*
    };
}

macro_rules! session_surface {
    ($inner:ty) => {
        pub fn session(&self) -> &$crate::session::Session {
            &self.session
        }

        pub fn session_mut(&mut self) -> &mut $crate::session::Session {
            &mut self.session
        }

        pub fn endianness(&self) -> $crate::session::Endianness {
            self.session.endianness
        }

        pub fn set_endianness(&mut self, endianness: $crate::session::Endianness) {
            self.session.endianness = endianness;
        }

        /// Active schema version.
        pub fn version(&self) -> f64 {
            self.session.version
        }

        pub fn set_version(&mut self, version: f64) {
            self.session.version = version;
        }

        pub fn encoding(&self) -> $crate::session::TextEncoding {
            self.session.encoding
        }

        pub fn set_encoding(&mut self, encoding: $crate::session::TextEncoding) {
            self.session.encoding = encoding;
        }

        pub fn primitive_mappings(&self) -> &$crate::mapping::PrimitiveMappings {
            &self.session.primitive_mappings
        }

        pub fn primitive_mappings_mut(&mut self) -> &mut $crate::mapping::PrimitiveMappings {
            &mut self.session.primitive_mappings
        }

        pub fn object_mappings(&self) -> &$crate::mapping::ObjectMappings {
            &self.session.object_mappings
        }

        pub fn object_mappings_mut(&mut self) -> &mut $crate::mapping::ObjectMappings {
            &mut self.session.object_mappings
        }

        /// Current stream offset.
        pub fn position(&mut self) -> $crate::error::Result<u64> {
            Ok(std::io::Seek::stream_position(self.io.get_mut())?)
        }

        pub fn set_position(&mut self, addr: u64) -> $crate::error::Result<()> {
            std::io::Seek::seek(self.io.get_mut(), std::io::SeekFrom::Start(addr))?;
            Ok(())
        }

        /// Take the instance lock for a multi-step critical section.
        pub fn lock(&self) -> $crate::io_stream::StreamLock<'_, $inner> {
            $crate::io_stream::StreamLock::new(self.io.lock(), &self.session)
        }

        /// Release the underlying stream.
        pub fn into_inner(self) -> $inner {
            self.io.into_inner()
        }
    };
}

mod reader;
mod stream;
mod writer;

pub use reader::ObjectReader;
pub use stream::ObjectStream;
pub use writer::ObjectWriter;

// ── StreamLock ───────────────────────────────────────────────────────────────

/// Exclusive access to an instance's stream while held.
pub struct StreamLock<'a, S> {
    io:      MutexGuard<'a, S>,
    session: &'a Session,
}

impl<'a, S> StreamLock<'a, S> {
    pub(crate) fn new(io: MutexGuard<'a, S>, session: &'a Session) -> Self {
        Self { io, session }
    }

    pub fn session(&self) -> &Session {
        self.session
    }
}

impl<S: Read + Seek> StreamLock<'_, S> {
    pub fn decoder(&mut self) -> Decoder<'_> {
        Decoder::new(&mut *self.io, self.session)
    }
}

impl<S: Write + Seek> StreamLock<'_, S> {
    pub fn encoder(&mut self) -> Encoder<'_> {
        Encoder::new(&mut *self.io, self.session)
    }
}
