//! Object engine: schema-driven record traversal on top of the primitive
//! [`Decoder`](crate::io_stream::Decoder) and
//! [`Encoder`](crate::io_stream::Encoder).
//!
//! # Traversal
//! Fields are visited in declaration order.  A field is transferred only if
//! it is not skip-marked and its version ranges admit the session version.
//! Decoding and encoding apply exactly the same filter, so a record encoded
//! at version `V` decodes at version `V` to the same included fields.
//!
//! # Array lengths
//! An array's count is either a constant or the value of an earlier sibling
//! field.  On decode the sibling has already been populated; on encode its
//! current value is used and the array must hold exactly that many
//! elements.
//!
//! # Mappings
//! Primitive mappings apply to every primitive transfer in both directions.
//! Object mappings apply on decode only.

mod decode;
mod encode;

use crate::error::{Error, Result};
use crate::schema::{ArrayLength, FieldDescriptor, Record, Schema, StringMode};

/// Upper bound on speculative array preallocation; larger counts grow as
/// elements are decoded.
pub(crate) const PREALLOC_LIMIT: usize = 4096;

fn target<T>(schema: &Schema<T>, field: &FieldDescriptor<T>) -> String {
    format!("{}.{}", schema.name(), field.name())
}

/// Byte length of a fixed-size string field.
pub(crate) fn fixed_string_len<T>(
    schema: &Schema<T>,
    field:  &FieldDescriptor<T>,
    mode:   StringMode,
) -> Result<Option<usize>> {
    match mode {
        StringMode::NullTerminated => Ok(None),
        StringMode::FixedSize(0) => Err(Error::configuration(
            target(schema, field),
            "fixed string size must be greater than zero",
        )),
        StringMode::FixedSize(n) => Ok(Some(n)),
    }
}

/// Element count of an array field, given the record's current state.
pub(crate) fn resolve_count<T: Record>(
    schema: &Schema<T>,
    field:  &FieldDescriptor<T>,
    length: ArrayLength,
    record: &T,
) -> Result<usize> {
    match length {
        ArrayLength::Fixed(0) => Err(Error::configuration(
            target(schema, field),
            "fixed array size must be greater than zero",
        )),
        ArrayLength::Fixed(n) => Ok(n),
        ArrayLength::Field(sibling) => {
            let own = schema.index_of(field.name());
            match schema.index_of(sibling) {
                Some(i) if Some(i) < own => schema.fields()[i].get(record).to_count(),
                Some(_) => Err(Error::configuration(
                    target(schema, field),
                    format!("length field `{sibling}` must be declared before the array"),
                )),
                None => Err(Error::configuration(
                    target(schema, field),
                    format!("length field `{sibling}` does not exist"),
                )),
            }
        }
    }
}

/// Log the field a failure came from before propagating it.
pub(crate) fn field_context<T>(schema: &Schema<T>, field: &FieldDescriptor<T>, err: Error) -> Error {
    tracing::debug!(record = schema.name(), field = field.name(), error = %err, "field transfer failed");
    err
}
