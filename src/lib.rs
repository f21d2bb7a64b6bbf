//! Declarative binary object codec.
//!
//! Record types describe their on-stream layout once through
//! [`Record::schema`]; readers and writers then decode and encode them
//! against any seekable byte stream, honouring endianness, schema versions,
//! primitive/object remapping and the session's text encoding.
//!
//! ```
//! use binobject::{ArrayLength, ObjectStream, Record, SchemaBuilder, StringMode};
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Entry {
//!     count: u8,
//!     items: Vec<u16>,
//!     name:  String,
//! }
//!
//! impl Record for Entry {
//!     fn schema(s: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
//!         s.primitive("count", |r| r.count, |r, v| r.count = v)
//!          .array("items", ArrayLength::Field("count"), |r| &r.items, |r, v| r.items = v)
//!          .string("name", StringMode::NullTerminated, |r| &r.name, |r, v| r.name = v)
//!     }
//! }
//!
//! let entry = Entry { count: 2, items: vec![7, 9], name: "pair".into() };
//! let stream = ObjectStream::new();
//! stream.write_record_at(0, &entry).unwrap();
//! assert_eq!(stream.read_record_at::<Entry>(0).unwrap(), entry);
//! ```

pub mod error;
pub mod value;
pub mod session;
pub mod mapping;
pub mod schema;
pub mod compressed;
pub mod io_stream;
mod codec;

pub use error::{Error, Result};
pub use value::{Primitive, PrimitiveType, Value};
pub use session::{CodecOptions, Endianness, Session, TextEncoding, DEFAULT_VERSION};
pub use mapping::{ObjectMappings, PrimitiveMappings};
pub use schema::{
    ArrayLength, Element, ElementType, FieldDescriptor, FieldKind, Record, Schema,
    SchemaBuilder, SchemaRegistry, StringMode, VersionRange,
};
pub use io_stream::{Decoder, Encoder, ObjectReader, ObjectStream, ObjectWriter, StreamLock};
