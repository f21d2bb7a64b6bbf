//! Type remapping tables.
//!
//! [`PrimitiveMappings`] substitutes the on-stream width of a declared
//! primitive: a field declared `u32` can be stored as `u16` in a particular
//! file revision without touching the record type.  The value is converted
//! with checked numeric conversion in both directions.
//!
//! [`ObjectMappings`] substitutes a whole record layout on decode: the
//! source record is decoded and its fields are copied by name into a default
//! instance of the target.  Encoding always uses the target's own layout.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::schema::{DynRecord, Record, RecordRef, SchemaRegistry};
use crate::value::PrimitiveType;

// ── PrimitiveMappings ────────────────────────────────────────────────────────

/// Declared primitive type → on-stream primitive type.
#[derive(Debug, Clone, Default)]
pub struct PrimitiveMappings {
    table: HashMap<PrimitiveType, PrimitiveType>,
}

impl PrimitiveMappings {
    /// Store `declared` values as `on_stream`.  Replaces any earlier entry.
    pub fn insert(&mut self, declared: PrimitiveType, on_stream: PrimitiveType) {
        debug!(%declared, %on_stream, "primitive mapping installed");
        self.table.insert(declared, on_stream);
    }

    pub fn remove(&mut self, declared: PrimitiveType) -> Option<PrimitiveType> {
        self.table.remove(&declared)
    }

    /// The on-stream type for `declared`, if remapped.
    #[inline]
    pub fn get(&self, declared: PrimitiveType) -> Option<PrimitiveType> {
        self.table.get(&declared).copied()
    }

    /// The type actually transferred for `declared`.
    #[inline]
    pub fn resolve(&self, declared: PrimitiveType) -> PrimitiveType {
        self.get(declared).unwrap_or(declared)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PrimitiveType, PrimitiveType)> + '_ {
        self.table.iter().map(|(&k, &v)| (k, v))
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }
}

// ── ObjectMappings ───────────────────────────────────────────────────────────

/// Target record type → source record type decoded in its place.
#[derive(Clone, Default)]
pub struct ObjectMappings {
    table: HashMap<TypeId, RecordRef>,
}

impl ObjectMappings {
    /// Decode `S` from the stream whenever `T` is requested.
    pub fn insert<T: Record, S: Record>(&mut self) {
        debug!(target_record = T::record_name(), source_record = S::record_name(), "object mapping installed");
        self.table.insert(TypeId::of::<T>(), RecordRef::of::<S>());
    }

    pub fn remove<T: Record>(&mut self) -> bool {
        self.table.remove(&TypeId::of::<T>()).is_some()
    }

    /// Source layout registered for `T`.
    #[inline]
    pub fn source_for<T: Record>(&self) -> Option<RecordRef> {
        self.table.get(&TypeId::of::<T>()).copied()
    }

    /// Follow the mapping chain from `T`.  A type mapped to itself ends the
    /// chain; reaching any other type twice is a configuration error.
    pub(crate) fn check_chain<T: Record>(&self) -> Result<()> {
        let mut seen = vec![TypeId::of::<T>()];
        let mut current = TypeId::of::<T>();
        while let Some(next) = self.table.get(&current) {
            let id = next.type_id();
            if id == current {
                return Ok(());
            }
            if seen.contains(&id) {
                return Err(Error::configuration(
                    T::record_name(),
                    format!("object mapping cycle through `{}`", next.name()),
                ));
            }
            seen.push(id);
            current = id;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }
}

impl fmt::Debug for ObjectMappings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.table.values()).finish()
    }
}

// ── Field copy ───────────────────────────────────────────────────────────────

/// Build a `T` from `source` by copying every field whose name also exists
/// on `T`.  Fields only present on the source are dropped; fields only
/// present on `T` keep their default.
pub fn copy_by_name<T: Record>(source: &dyn DynRecord, registry: &SchemaRegistry) -> Result<T> {
    let schema = registry.schema::<T>()?;
    let mut target = T::default();
    for (name, value) in source.field_values(registry)? {
        match schema.field(name) {
            Some(field) => field.set(&mut target, value)?,
            None => trace!(source_record = source.record_type_name(), field = name, "field dropped by object mapping"),
        }
    }
    Ok(target)
}
