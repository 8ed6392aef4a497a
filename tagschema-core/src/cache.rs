use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::debug;

use crate::binding::Schematic;
use crate::error::SchemaError;
use crate::schema::{Schema, SchemaBuilder};

/// Memoizes built schemas per type.
///
/// Entries are never invalidated. Registering a codec after a type's schema
/// has been cached does not change that schema.
#[derive(Default)]
pub struct SchemaCache {
    schemas: RwLock<HashMap<TypeId, Arc<Schema>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide cache, paired with
    /// [`CodecRegistry::global`](crate::CodecRegistry::global).
    pub fn global() -> &'static SchemaCache {
        static GLOBAL: OnceLock<SchemaCache> = OnceLock::new();
        GLOBAL.get_or_init(SchemaCache::new)
    }

    pub fn get(&self, type_id: TypeId) -> Option<Arc<Schema>> {
        let schemas = self.schemas.read().unwrap_or_else(PoisonError::into_inner);
        schemas.get(&type_id).cloned()
    }

    /// Returns the cached schema of `T`, building it on first use.
    ///
    /// When two threads build the same schema at once, the first one stored
    /// wins and both callers receive it.
    pub fn get_or_build<T: Schematic>(
        &self,
        builder: &SchemaBuilder<'_>,
    ) -> Result<Arc<Schema>, SchemaError> {
        let type_id = TypeId::of::<T>();
        if let Some(schema) = self.get(type_id) {
            builder.check(&schema)?;
            return Ok(schema);
        }

        debug!(type_name = std::any::type_name::<T>(), "schema cache miss");
        let built = Arc::new(builder.build_for::<T>()?);

        let mut schemas = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
        Ok(schemas.entry(type_id).or_insert(built).clone())
    }

    pub fn len(&self) -> usize {
        self.schemas.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
