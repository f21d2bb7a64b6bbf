//! Record schemas: the declarative description of how a record type is laid
//! out on the stream.
//!
//! A record type implements [`Record`] and lists its fields, in stream order,
//! through a [`SchemaBuilder`]:
//!
//! ```
//! use binobject::schema::{ArrayLength, Record, SchemaBuilder, StringMode, VersionRange};
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Header {
//!     count: i32,
//!     items: Vec<u16>,
//!     name:  String,
//!     extra: u8,
//! }
//!
//! impl Record for Header {
//!     fn schema(s: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
//!         s.primitive("count", |r| r.count, |r, v| r.count = v)
//!          .array("items", ArrayLength::Field("count"), |r| &r.items, |r, v| r.items = v)
//!          .string("name", StringMode::FixedSize(8), |r| &r.name, |r, v| r.name = v)
//!          .primitive("extra", |r| r.extra, |r, v| r.extra = v)
//!          .version(VersionRange::since(2.0))
//!     }
//! }
//! ```
//!
//! The builder runs once per type per [`SchemaRegistry`]; the resulting
//! [`Schema`] is immutable and shared by every reader and writer using that
//! registry.

mod registry;

pub use registry::SchemaRegistry;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::io_stream::{Decoder, Encoder};
use crate::value::{Primitive, PrimitiveType, Value};

// ── Record ───────────────────────────────────────────────────────────────────

/// A type that can be decoded from and encoded to a binary stream.
///
/// Decoding starts from `Default::default()`; fields that are version-gated
/// out or skip-marked keep their default value.
pub trait Record: Default + Clone + fmt::Debug + Send + Sync + 'static {
    /// Declare the fields in stream order.
    fn schema(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self>;

    /// Name used in diagnostics.  Defaults to the unqualified type name.
    fn record_name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let base_end = full.find('<').unwrap_or(full.len());
    let start = full[..base_end].rfind("::").map_or(0, |i| i + 2);
    &full[start..]
}

/// Object-safe view of any [`Record`], used where the concrete type is only
/// known at runtime (nested fields, object mappings).
pub trait DynRecord: Any + Send + Sync + fmt::Debug {
    fn record_type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn clone_record(&self) -> Box<dyn DynRecord>;

    /// Every field value, in declaration order.
    fn field_values(&self, registry: &SchemaRegistry) -> Result<Vec<(&'static str, Value)>>;
}

impl<T: Record> DynRecord for T {
    fn record_type_name(&self) -> &'static str {
        T::record_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_record(&self) -> Box<dyn DynRecord> {
        Box::new(self.clone())
    }

    fn field_values(&self, registry: &SchemaRegistry) -> Result<Vec<(&'static str, Value)>> {
        let schema = registry.schema::<T>()?;
        Ok(schema.fields().iter().map(|f| (f.name(), f.get(self))).collect())
    }
}

pub(crate) fn downcast_record<R: Record>(record: Box<dyn DynRecord>) -> Result<R> {
    let name = record.record_type_name();
    record
        .into_any()
        .downcast::<R>()
        .map(|boxed| *boxed)
        .map_err(|_| Error::conversion(name, R::record_name(), "record"))
}

// ── RecordRef ────────────────────────────────────────────────────────────────

/// Type-erased handle to a record type's decode/encode entry points,
/// resolved once when the schema is built.
#[derive(Clone, Copy)]
pub struct RecordRef {
    type_id: TypeId,
    name:    &'static str,
    decode:  fn(&mut Decoder<'_>) -> Result<Box<dyn DynRecord>>,
    encode:  fn(&mut Encoder<'_>, &dyn DynRecord) -> Result<()>,
}

impl RecordRef {
    pub fn of<T: Record>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name:    T::record_name(),
            decode:  decode_erased::<T>,
            encode:  encode_erased::<T>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn decode(&self, dec: &mut Decoder<'_>) -> Result<Box<dyn DynRecord>> {
        (self.decode)(dec)
    }

    pub(crate) fn encode(&self, enc: &mut Encoder<'_>, record: &dyn DynRecord) -> Result<()> {
        (self.encode)(enc, record)
    }
}

fn decode_erased<T: Record>(dec: &mut Decoder<'_>) -> Result<Box<dyn DynRecord>> {
    Ok(Box::new(dec.read_record::<T>()?))
}

fn encode_erased<T: Record>(enc: &mut Encoder<'_>, record: &dyn DynRecord) -> Result<()> {
    let typed = record
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::conversion(record.record_type_name(), T::record_name(), "record"))?;
    enc.write_record(typed)
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordRef").field(&self.name).finish()
    }
}

impl PartialEq for RecordRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for RecordRef {}

// ── Element ──────────────────────────────────────────────────────────────────

/// What an array holds, or what a single `read_object`/`write_object` call
/// transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Primitive(PrimitiveType),
    Record(RecordRef),
}

/// A type usable as an array element or as a top-level object: every
/// [`Primitive`] and every [`Record`].
pub trait Element: Sized + Send + Sync + 'static {
    fn element_type() -> ElementType;
    fn to_value(&self) -> Value;
    fn from_value(value: Value) -> Result<Self>;
}

impl<T: Record> Element for T {
    fn element_type() -> ElementType {
        ElementType::Record(RecordRef::of::<T>())
    }

    fn to_value(&self) -> Value {
        Value::Record(Box::new(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self> {
        downcast_record(value.into_record()?)
    }
}

macro_rules! impl_primitive_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Element for $ty {
                #[inline]
                fn element_type() -> ElementType {
                    ElementType::Primitive(<$ty as Primitive>::TYPE)
                }

                #[inline]
                fn to_value(&self) -> Value {
                    Primitive::into_value(*self)
                }

                #[inline]
                fn from_value(value: Value) -> Result<Self> {
                    <$ty as Primitive>::from_value(value)
                }
            }
        )*
    };
}

impl_primitive_element!(bool, u8, i8, i16, u16, i32, u32, i64, u64, f32, f64);

// ── Field configuration ──────────────────────────────────────────────────────

/// Inclusive schema-version range.  `None` on either side is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VersionRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl VersionRange {
    /// Bound value meaning "no limit" in [`from_bounds`](Self::from_bounds).
    pub const UNBOUNDED: f64 = -1.0;

    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn since(min: f64) -> Self {
        Self { min: Some(min), max: None }
    }

    pub fn until(max: f64) -> Self {
        Self { min: None, max: Some(max) }
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    /// Attribute-style constructor: `-1` on either side means unbounded.
    pub fn from_bounds(min: f64, max: f64) -> Self {
        let bound = |b: f64| (b != Self::UNBOUNDED).then_some(b);
        Self { min: bound(min), max: bound(max) }
    }

    #[inline]
    pub fn contains(&self, version: f64) -> bool {
        self.min.map_or(true, |m| version >= m) && self.max.map_or(true, |m| version <= m)
    }
}

/// How a string field is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringMode {
    /// Bytes up to (and consuming) a zero terminator.
    #[default]
    NullTerminated,
    /// Exactly this many bytes, zero padded.  Must be non-zero.
    FixedSize(usize),
}

/// Where an array field gets its element count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLength {
    /// The value of an earlier sibling field.
    Field(&'static str),
    /// A constant count.  Must be non-zero.
    Fixed(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Primitive(PrimitiveType),
    String(StringMode),
    Array { length: ArrayLength, element: ElementType },
    Record(RecordRef),
}

// ── FieldDescriptor ──────────────────────────────────────────────────────────

type Getter<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, Value) -> Result<()> + Send + Sync>;

/// One field of a record schema.
pub struct FieldDescriptor<T> {
    name:              &'static str,
    kind:              FieldKind,
    versions:          Vec<VersionRange>,
    skip_when_reading: bool,
    get:               Getter<T>,
    set:               Setter<T>,
}

impl<T> FieldDescriptor<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn versions(&self) -> &[VersionRange] {
        &self.versions
    }

    pub fn skip_when_reading(&self) -> bool {
        self.skip_when_reading
    }

    /// True if the field takes part in the layout at `version`: no
    /// constraints, or at least one matching constraint.
    #[inline]
    pub fn is_included(&self, version: f64) -> bool {
        self.versions.is_empty() || self.versions.iter().any(|r| r.contains(version))
    }

    pub fn get(&self, record: &T) -> Value {
        (self.get)(record)
    }

    pub fn set(&self, record: &mut T, value: Value) -> Result<()> {
        (self.set)(record, value)
    }
}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("versions", &self.versions)
            .field("skip_when_reading", &self.skip_when_reading)
            .finish()
    }
}

// ── Schema ───────────────────────────────────────────────────────────────────

/// The immutable, ordered field list of one record type.
pub struct Schema<T> {
    name:   &'static str,
    fields: Vec<FieldDescriptor<T>>,
    index:  HashMap<&'static str, usize>,
}

impl<T> Schema<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor<T>> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Declaration index of the field called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

// ── SchemaBuilder ────────────────────────────────────────────────────────────

/// Collects field declarations for [`Record::schema`].
///
/// `version` and `skip_when_reading` modify the most recently declared
/// field.  Misuse is reported as [`Error::Configuration`] the first time the
/// schema is requested.
pub struct SchemaBuilder<T> {
    fields: Vec<FieldDescriptor<T>>,
    error:  Option<Error>,
}

impl<T: Record> Default for SchemaBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> SchemaBuilder<T> {
    pub fn new() -> Self {
        Self { fields: Vec::new(), error: None }
    }

    /// A fixed-width primitive field.
    pub fn primitive<P: Primitive>(
        self,
        name: &'static str,
        get:  fn(&T) -> P,
        set:  fn(&mut T, P),
    ) -> Self {
        self.push(
            name,
            FieldKind::Primitive(P::TYPE),
            Box::new(move |r| get(r).into_value()),
            Box::new(move |r, v| {
                set(r, P::from_value(v)?);
                Ok(())
            }),
        )
    }

    /// A text field.
    pub fn string(
        self,
        name: &'static str,
        mode: StringMode,
        get:  fn(&T) -> &String,
        set:  fn(&mut T, String),
    ) -> Self {
        self.push(
            name,
            FieldKind::String(mode),
            Box::new(move |r| Value::String(get(r).clone())),
            Box::new(move |r, v| {
                set(r, v.into_string()?);
                Ok(())
            }),
        )
    }

    /// An array of primitives or records.
    pub fn array<E: Element>(
        self,
        name:   &'static str,
        length: ArrayLength,
        get:    fn(&T) -> &Vec<E>,
        set:    fn(&mut T, Vec<E>),
    ) -> Self {
        self.push(
            name,
            FieldKind::Array { length, element: E::element_type() },
            Box::new(move |r| Value::Array(get(r).iter().map(Element::to_value).collect())),
            Box::new(move |r, v| {
                let items = v
                    .into_array()?
                    .into_iter()
                    .map(E::from_value)
                    .collect::<Result<Vec<E>>>()?;
                set(r, items);
                Ok(())
            }),
        )
    }

    /// A nested record.
    pub fn record<R: Record>(
        self,
        name: &'static str,
        get:  fn(&T) -> &R,
        set:  fn(&mut T, R),
    ) -> Self {
        self.push(
            name,
            FieldKind::Record(RecordRef::of::<R>()),
            Box::new(move |r| Value::Record(Box::new(get(r).clone()))),
            Box::new(move |r, v| {
                set(r, downcast_record(v.into_record()?)?);
                Ok(())
            }),
        )
    }

    /// Gate the last declared field on a version range.  Repeatable; the
    /// field is included if any of its ranges matches.
    pub fn version(mut self, range: VersionRange) -> Self {
        match self.fields.last_mut() {
            Some(field) => field.versions.push(range),
            None => self.misuse("version() called before any field was declared"),
        }
        self
    }

    /// Exclude the last declared field from the stream layout: never decoded,
    /// never encoded.
    pub fn skip_when_reading(mut self) -> Self {
        match self.fields.last_mut() {
            Some(field) => field.skip_when_reading = true,
            None => self.misuse("skip_when_reading() called before any field was declared"),
        }
        self
    }

    pub fn build(self) -> Result<Schema<T>> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut index = HashMap::with_capacity(self.fields.len());
        for (i, field) in self.fields.iter().enumerate() {
            if index.insert(field.name, i).is_some() {
                return Err(Error::configuration(
                    format!("{}.{}", T::record_name(), field.name),
                    "duplicate field name",
                ));
            }
        }
        Ok(Schema { name: T::record_name(), fields: self.fields, index })
    }

    fn push(mut self, name: &'static str, kind: FieldKind, get: Getter<T>, set: Setter<T>) -> Self {
        self.fields.push(FieldDescriptor {
            name,
            kind,
            versions: Vec::new(),
            skip_when_reading: false,
            get,
            set,
        });
        self
    }

    fn misuse(&mut self, reason: &str) {
        if self.error.is_none() {
            self.error = Some(Error::configuration(T::record_name(), reason));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Inner {
        x: u16,
    }

    impl Record for Inner {
        fn schema(s: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
            s.primitive("x", |r| r.x, |r, v| r.x = v)
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Outer {
        count: u8,
        items: Vec<Inner>,
        label: String,
    }

    impl Record for Outer {
        fn schema(s: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
            s.primitive("count", |r| r.count, |r, v| r.count = v)
             .array("items", ArrayLength::Field("count"), |r| &r.items, |r, v| r.items = v)
             .string("label", StringMode::NullTerminated, |r| &r.label, |r, v| r.label = v)
             .version(VersionRange::until(1.0))
             .version(VersionRange::since(3.0))
        }
    }

    #[test]
    fn version_range_bounds() {
        let r = VersionRange::between(1.5, 2.0);
        assert!(!r.contains(1.4));
        assert!(r.contains(1.5));
        assert!(r.contains(2.0));
        assert!(!r.contains(2.01));
        assert!(VersionRange::default().contains(-100.0));
        assert_eq!(VersionRange::from_bounds(-1.0, 2.0), VersionRange::until(2.0));
        assert_eq!(VersionRange::from_bounds(3.0, -1.0), VersionRange::since(3.0));
    }

    #[test]
    fn descriptors_keep_declaration_order() {
        let schema = Outer::schema(SchemaBuilder::new()).build().unwrap();
        let names: Vec<_> = schema.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, ["count", "items", "label"]);
        assert_eq!(schema.name(), "Outer");
        assert!(matches!(
            schema.field("items").unwrap().kind(),
            FieldKind::Array { length: ArrayLength::Field("count"), element: ElementType::Record(r) }
                if r.name() == "Inner"
        ));
    }

    #[test]
    fn multiple_versions_are_or_combined() {
        let schema = Outer::schema(SchemaBuilder::new()).build().unwrap();
        let label = schema.field("label").unwrap();
        assert!(label.is_included(1.0));
        assert!(!label.is_included(2.0));
        assert!(label.is_included(3.5));
        assert!(schema.field("count").unwrap().is_included(2.0));
    }

    #[test]
    fn accessors_round_trip_values() {
        let schema = Outer::schema(SchemaBuilder::new()).build().unwrap();
        let src = Outer { count: 1, items: vec![Inner { x: 7 }], label: "hi".into() };
        let mut dst = Outer::default();
        for field in schema.fields() {
            field.set(&mut dst, field.get(&src)).unwrap();
        }
        assert_eq!(dst, src);
    }

    #[test]
    fn setter_rejects_wrong_kind() {
        let schema = Outer::schema(SchemaBuilder::new()).build().unwrap();
        let mut dst = Outer::default();
        let err = schema.field("label").unwrap().set(&mut dst, Value::U32(5)).unwrap_err();
        assert!(err.is_type_conversion());
    }

    #[test]
    fn builder_misuse_is_reported() {
        let err = SchemaBuilder::<Inner>::new().skip_when_reading().build().unwrap_err();
        assert!(err.is_configuration());

        let err = SchemaBuilder::<Inner>::new()
            .primitive("x", |r| r.x, |r, v| r.x = v)
            .primitive("x", |r| r.x, |r, v| r.x = v)
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn short_names_strip_paths() {
        assert_eq!(short_type_name("a::b::Thing"), "Thing");
        assert_eq!(short_type_name("a::Wrap<b::Inner>"), "Wrap<b::Inner>");
        assert_eq!(short_type_name("Plain"), "Plain");
    }
}
