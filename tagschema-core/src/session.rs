use std::sync::Arc;

use crate::binding::Schematic;
use crate::cache::SchemaCache;
use crate::document::Document;
use crate::error::SchemaError;
use crate::registry::CodecRegistry;
use crate::schema::{Schema, SchemaBuilder};
use crate::traverse;

/// Reads a `T` out of `doc`, hands it to `action`, then writes it back.
///
/// Uses the process-wide registry and schema cache.
///
/// ```
/// use tagschema_core::{Document, Schematic, with_session};
///
/// #[derive(Default, Schematic)]
/// struct Counter {
///     counter: i32,
/// }
///
/// let mut doc = Document::new();
/// with_session(&mut doc, |c: &mut Counter| c.counter += 1).unwrap();
/// with_session(&mut doc, |c: &mut Counter| c.counter += 1).unwrap();
/// assert_eq!(doc.get_int("counter").unwrap(), 2);
/// ```
pub fn with_session<T, R>(doc: &mut Document, action: impl FnOnce(&mut T) -> R) -> Result<R, SchemaError>
where
    T: Schematic,
{
    Session::global().run(doc, action)
}

/// Like [`with_session`], with an explicitly supplied schema.
pub fn with_session_using<T, R>(
    doc: &mut Document,
    schema: &Schema,
    action: impl FnOnce(&mut T) -> R,
) -> Result<R, SchemaError>
where
    T: Schematic,
{
    let mut object = T::default();
    traverse::read(doc, schema, &mut object)?;
    let result = action(&mut object);
    traverse::write(doc, schema, &object)?;
    Ok(result)
}

/// A registry, a schema cache and a build policy to run sessions against.
#[derive(Clone, Copy)]
pub struct Session<'a> {
    registry: &'a CodecRegistry,
    cache: &'a SchemaCache,
    strict: bool,
}

impl Session<'static> {
    /// A session context over the process-wide registry and cache.
    pub fn global() -> Self {
        Session::new(CodecRegistry::global(), SchemaCache::global())
    }
}

impl<'a> Session<'a> {
    pub fn new(registry: &'a CodecRegistry, cache: &'a SchemaCache) -> Self {
        Session {
            registry,
            cache,
            strict: false,
        }
    }

    /// Fail instead of skipping fields whose type cannot be resolved.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Returns the schema of `T`, building and caching it on first use.
    pub fn schema<T: Schematic>(&self) -> Result<Arc<Schema>, SchemaError> {
        let builder = SchemaBuilder::new(self.registry).strict(self.strict);
        self.cache.get_or_build::<T>(&builder)
    }

    /// Reads a default `T` from `doc`, runs `action` on it and writes it back.
    pub fn run<T, R>(&self, doc: &mut Document, action: impl FnOnce(&mut T) -> R) -> Result<R, SchemaError>
    where
        T: Schematic,
    {
        let schema = self.schema::<T>()?;
        with_session_using(doc, &schema, action)
    }

    /// Reads a `T` from `doc` without writing anything back other than the
    /// sub-documents the read creates.
    pub fn load<T: Schematic>(&self, doc: &mut Document) -> Result<T, SchemaError> {
        let schema = self.schema::<T>()?;
        let mut object = T::default();
        traverse::read(doc, &schema, &mut object)?;
        Ok(object)
    }

    /// Writes `value` into `doc`.
    pub fn store<T: Schematic>(&self, doc: &mut Document, value: &T) -> Result<(), SchemaError> {
        let schema = self.schema::<T>()?;
        traverse::write(doc, &schema, value)
    }
}
