//! Schema cache keyed by record `TypeId`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use super::{Record, Schema, SchemaBuilder};
use crate::error::{Error, Result};

type Entry = Arc<dyn Any + Send + Sync>;

/// Lazily populated, shared cache of built schemas.
///
/// Each record type's schema is built on first request and kept for the
/// lifetime of the registry.  Two threads racing on the same type may both
/// build it; the first stored entry wins and the other is discarded.
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<TypeId, Entry>>,
}

static GLOBAL: OnceLock<Arc<SchemaRegistry>> = OnceLock::new();

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by sessions that do not bring their own.
    pub fn global() -> Arc<SchemaRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(SchemaRegistry::new())))
    }

    /// Schema of `T`, building and caching it on first use.
    pub fn schema<T: Record>(&self) -> Result<Arc<Schema<T>>> {
        let key = TypeId::of::<T>();
        if let Some(entry) = self.schemas.read().get(&key) {
            return Self::downcast::<T>(Arc::clone(entry));
        }

        // Built outside the lock: a schema builder may request nested
        // schemas from this same registry.
        let built: Entry = Arc::new(T::schema(SchemaBuilder::new()).build()?);

        let entry = {
            let mut schemas = self.schemas.write();
            let len_before = schemas.len();
            let entry = Arc::clone(schemas.entry(key).or_insert(built));
            if schemas.len() > len_before {
                debug!(record = T::record_name(), "schema cached");
            }
            entry
        };
        Self::downcast::<T>(entry)
    }

    /// Build and cache `T`'s schema ahead of first use, surfacing builder
    /// errors early.
    pub fn register<T: Record>(&self) -> Result<()> {
        self.schema::<T>().map(|_| ())
    }

    pub fn contains<T: Record>(&self) -> bool {
        self.schemas.read().contains_key(&TypeId::of::<T>())
    }

    /// Number of cached schemas.
    pub fn len(&self) -> usize {
        self.schemas.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.read().is_empty()
    }

    fn downcast<T: Record>(entry: Entry) -> Result<Arc<Schema<T>>> {
        entry
            .downcast::<Schema<T>>()
            .map_err(|_| Error::configuration(T::record_name(), "schema registry entry has the wrong type"))
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry").field("schemas", &self.len()).finish()
    }
}
