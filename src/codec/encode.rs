use tracing::trace;

use super::{field_context, fixed_string_len, resolve_count};
use crate::error::{Error, Result};
use crate::io_stream::Encoder;
use crate::schema::{Element, ElementType, FieldDescriptor, FieldKind, Record, Schema};
use crate::value::Value;

impl Encoder<'_> {
    /// Encode `record` at the current position using `T`'s own layout.
    pub fn write_record<T: Record>(&mut self, record: &T) -> Result<()> {
        let session = self.session();
        let schema = session.registry.schema::<T>()?;
        for field in schema.fields() {
            if field.skip_when_reading() || !field.is_included(session.version) {
                continue;
            }
            self.write_field(&schema, field, record)
                .map_err(|e| field_context(&schema, field, e))?;
        }
        trace!(record = schema.name(), "record encoded");
        Ok(())
    }

    fn write_field<T: Record>(
        &mut self,
        schema: &Schema<T>,
        field:  &FieldDescriptor<T>,
        record: &T,
    ) -> Result<()> {
        let value = field.get(record);
        match *field.kind() {
            FieldKind::Primitive(ty) => self.write_mapped(ty, value),
            FieldKind::String(mode) => {
                let size = fixed_string_len(schema, field, mode)?;
                let text = value.into_string()?;
                match size {
                    Some(len) => self.write_fixed_length_string(&text, Some(len)),
                    None => self.write_null_terminated_string(&text),
                }
            }
            FieldKind::Array { length, element } => {
                let count = resolve_count(schema, field, length, record)?;
                let items = value.into_array()?;
                if items.len() != count {
                    return Err(Error::configuration(
                        format!("{}.{}", schema.name(), field.name()),
                        format!("array holds {} element(s) but its length resolves to {count}", items.len()),
                    ));
                }
                for item in items {
                    self.write_element(element, item)?;
                }
                Ok(())
            }
            FieldKind::Record(nested) => {
                let inner = value.into_record()?;
                nested.encode(self, &*inner)
            }
        }
    }

    /// Encode one array element or top-level object of the given type.
    pub fn write_element(&mut self, element: ElementType, value: Value) -> Result<()> {
        match element {
            ElementType::Primitive(ty) => self.write_mapped(ty, value),
            ElementType::Record(record) => {
                let inner = value.into_record()?;
                record.encode(self, &*inner)
            }
        }
    }

    /// Encode a single primitive or record.
    pub fn write_object<E: Element>(&mut self, value: &E) -> Result<()> {
        self.write_element(E::element_type(), value.to_value())
    }

    /// Encode every item of `items` back to back.
    pub fn write_array<E: Element>(&mut self, items: &[E]) -> Result<()> {
        items.iter().try_for_each(|item| self.write_object(item))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::io_stream::{Decoder, Encoder};
    use crate::schema::{ArrayLength, Record, SchemaBuilder, StringMode, VersionRange};
    use crate::session::{CodecOptions, Endianness, Session};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Entry {
        kind:  u8,
        items: Vec<u32>,
        label: String,
        note:  String,
        cache: u64,
    }

    impl Record for Entry {
        fn schema(s: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
            s.primitive("kind", |r| r.kind, |r, v| r.kind = v)
             .array("items", ArrayLength::Field("kind"), |r| &r.items, |r, v| r.items = v)
             .string("label", StringMode::NullTerminated, |r| &r.label, |r, v| r.label = v)
             .string("note", StringMode::FixedSize(3), |r| &r.note, |r, v| r.note = v)
             .version(VersionRange::between(1.0, 1.5))
             .primitive("cache", |r| r.cache, |r, v| r.cache = v)
             .skip_when_reading()
        }
    }

    fn encode<T: Record>(record: &T, session: &Session) -> crate::Result<Vec<u8>> {
        let mut io = Cursor::new(Vec::new());
        Encoder::new(&mut io, session).write_record(record)?;
        Ok(io.into_inner())
    }

    fn sample() -> Entry {
        Entry { kind: 2, items: vec![1, 0x0A0B], label: "hi".into(), note: "abcdef".into(), cache: 99 }
    }

    #[test]
    fn layout_matches_schema() {
        let bytes = encode(&sample(), &Session::default()).unwrap();
        assert_eq!(bytes, [2, 1, 0, 0, 0, 0x0B, 0x0A, 0, 0, b'h', b'i', 0, b'a', b'b', b'c']);
    }

    #[test]
    fn version_and_skip_filter_match_decode() {
        let session = Session::new(CodecOptions {
            endianness: Endianness::Big,
            version:    2.0,
            ..CodecOptions::default()
        });
        let bytes = encode(&sample(), &session).unwrap();
        assert_eq!(bytes, [2, 0, 0, 0, 1, 0, 0, 0x0A, 0x0B, b'h', b'i', 0]);

        let mut io = Cursor::new(&bytes[..]);
        let back: Entry = Decoder::new(&mut io, &session).read_record().unwrap();
        assert_eq!(back, Entry { cache: 0, note: String::new(), ..sample() });
    }

    #[test]
    fn count_mismatch_is_configuration_error() {
        let bad = Entry { kind: 3, ..sample() };
        assert!(encode(&bad, &Session::default()).unwrap_err().is_configuration());
    }
}
