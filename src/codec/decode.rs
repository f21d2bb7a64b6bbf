use std::any::TypeId;

use tracing::trace;

use super::{field_context, fixed_string_len, resolve_count, PREALLOC_LIMIT};
use crate::error::Result;
use crate::io_stream::Decoder;
use crate::mapping::copy_by_name;
use crate::schema::{Element, ElementType, FieldDescriptor, FieldKind, Record, Schema};
use crate::value::Value;

impl Decoder<'_> {
    /// Decode one `T` at the current position.
    ///
    /// If the session maps `T` to another record type, that type is decoded
    /// instead and its fields are copied into `T` by name.
    pub fn read_record<T: Record>(&mut self) -> Result<T> {
        let session = self.session();
        if let Some(source) = session.object_mappings.source_for::<T>() {
            if source.type_id() != TypeId::of::<T>() {
                session.object_mappings.check_chain::<T>()?;
                trace!(target_record = T::record_name(), source_record = source.name(), "object mapping applied");
                let decoded = source.decode(self)?;
                return copy_by_name::<T>(&*decoded, &session.registry);
            }
        }

        let schema = session.registry.schema::<T>()?;
        self.read_fields(&schema)
    }

    fn read_fields<T: Record>(&mut self, schema: &Schema<T>) -> Result<T> {
        let version = self.session().version;
        let mut record = T::default();
        for field in schema.fields() {
            if field.skip_when_reading() || !field.is_included(version) {
                continue;
            }
            let value = self
                .read_field(schema, field, &record)
                .map_err(|e| field_context(schema, field, e))?;
            field
                .set(&mut record, value)
                .map_err(|e| field_context(schema, field, e))?;
        }
        trace!(record = schema.name(), "record decoded");
        Ok(record)
    }

    fn read_field<T: Record>(
        &mut self,
        schema:  &Schema<T>,
        field:   &FieldDescriptor<T>,
        partial: &T,
    ) -> Result<Value> {
        match *field.kind() {
            FieldKind::Primitive(ty) => self.read_mapped(ty),
            FieldKind::String(mode) => {
                let text = match fixed_string_len(schema, field, mode)? {
                    Some(len) => self.read_fixed_length_string(len)?,
                    None => self.read_null_terminated_string()?,
                };
                Ok(Value::String(text))
            }
            FieldKind::Array { length, element } => {
                let count = resolve_count(schema, field, length, partial)?;
                let mut items = Vec::with_capacity(count.min(PREALLOC_LIMIT));
                for _ in 0..count {
                    items.push(self.read_element(element)?);
                }
                Ok(Value::Array(items))
            }
            FieldKind::Record(nested) => nested.decode(self).map(Value::Record),
        }
    }

    /// Decode one array element or top-level object of the given type.
    pub fn read_element(&mut self, element: ElementType) -> Result<Value> {
        match element {
            ElementType::Primitive(ty) => self.read_mapped(ty),
            ElementType::Record(record) => record.decode(self).map(Value::Record),
        }
    }

    /// Decode a single primitive or record.
    pub fn read_object<E: Element>(&mut self) -> Result<E> {
        E::from_value(self.read_element(E::element_type())?)
    }

    /// Decode `count` consecutive primitives or records.
    pub fn read_array<E: Element>(&mut self, count: usize) -> Result<Vec<E>> {
        let mut items = Vec::with_capacity(count.min(PREALLOC_LIMIT));
        for _ in 0..count {
            items.push(self.read_object::<E>()?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::schema::{ArrayLength, Record, SchemaBuilder, StringMode, VersionRange};
    use crate::session::{CodecOptions, Endianness, Session};
    use crate::value::PrimitiveType;
    use crate::io_stream::Decoder;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Point {
        x: i16,
        y: i16,
    }

    impl Record for Point {
        fn schema(s: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
            s.primitive("x", |r| r.x, |r, v| r.x = v)
             .primitive("y", |r| r.y, |r, v| r.y = v)
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Shape {
        count:  u8,
        points: Vec<Point>,
        tag:    String,
        hidden: u32,
        late:   u8,
    }

    impl Record for Shape {
        fn schema(s: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
            s.primitive("count", |r| r.count, |r, v| r.count = v)
             .array("points", ArrayLength::Field("count"), |r| &r.points, |r, v| r.points = v)
             .string("tag", StringMode::FixedSize(4), |r| &r.tag, |r, v| r.tag = v)
             .primitive("hidden", |r| r.hidden, |r, v| r.hidden = v)
             .skip_when_reading()
             .primitive("late", |r| r.late, |r, v| r.late = v)
             .version(VersionRange::since(2.0))
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Forward {
        items: Vec<u8>,
        n:     u8,
    }

    impl Record for Forward {
        fn schema(s: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
            s.array("items", ArrayLength::Field("n"), |r| &r.items, |r, v| r.items = v)
             .primitive("n", |r| r.n, |r, v| r.n = v)
        }
    }

    const SHAPE: &[u8] = &[2, 1, 0, 2, 0, 3, 0, 4, 0, b'a', b'b', 0, 0, 7];

    fn decode<T: Record>(bytes: &[u8], session: &Session) -> crate::Result<T> {
        let mut io = Cursor::new(bytes);
        Decoder::new(&mut io, session).read_record::<T>()
    }

    #[test]
    fn nested_arrays_and_fixed_strings() {
        let shape: Shape = decode(SHAPE, &Session::default()).unwrap();
        assert_eq!(shape.points, vec![Point { x: 1, y: 2 }, Point { x: 3, y: 4 }]);
        assert_eq!(shape.tag, "ab");
        assert_eq!(shape.hidden, 0);
        assert_eq!(shape.late, 0);
    }

    #[test]
    fn version_gate_admits_late_field() {
        let session = Session::new(CodecOptions { version: 2.0, ..CodecOptions::default() });
        let shape: Shape = decode(SHAPE, &session).unwrap();
        assert_eq!(shape.late, 7);
    }

    #[test]
    fn primitive_mapping_applies_inside_records() {
        let mut session = Session::new(CodecOptions::with_endianness(Endianness::Big));
        session.primitive_mappings.insert(PrimitiveType::I16, PrimitiveType::I8);
        let point: Point = decode(&[0xFF, 0x05], &session).unwrap();
        assert_eq!(point, Point { x: -1, y: 5 });
    }

    #[test]
    fn forward_length_reference_is_rejected() {
        let err = decode::<Forward>(&[1, 1], &Session::default()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn truncated_input_fails_whole_record() {
        let err = decode::<Shape>(&SHAPE[..6], &Session::default()).unwrap_err();
        assert!(err.is_buffer_exhausted());
    }
}
