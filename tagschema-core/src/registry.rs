use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Once, OnceLock, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::codec::{Codec, ScalarKind, ValueCodec};

/// Outcome of a codec registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The slot was empty and now holds the new codec.
    Installed,
    /// A codec was already registered; it stays active.
    Duplicate,
    /// A codec was already registered and has been replaced.
    Replaced,
}

struct Registered {
    type_name: &'static str,
    codec: Codec,
}

/// Maps type identities to the codec that reads and writes them.
///
/// At most one codec is active per type. Built-in codecs are installed the
/// first time a schema is built against the registry, and only into slots
/// that are still empty.
pub struct CodecRegistry {
    codecs: RwLock<HashMap<TypeId, Registered>>,
    builtins: Once,
}

impl CodecRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        CodecRegistry {
            codecs: RwLock::new(HashMap::new()),
            builtins: Once::new(),
        }
    }

    /// Returns the process-wide registry.
    pub fn global() -> &'static CodecRegistry {
        static GLOBAL: OnceLock<CodecRegistry> = OnceLock::new();
        GLOBAL.get_or_init(CodecRegistry::new)
    }

    /// Registers a codec for values of type `T`.
    pub fn register<T: 'static, C: ValueCodec<T>>(&self, codec: C, overwrite: bool) -> Registration {
        self.register_codec(
            TypeId::of::<T>(),
            std::any::type_name::<T>(),
            Codec::custom(codec),
            overwrite,
        )
    }

    /// Registers an already-erased codec under `type_id`.
    ///
    /// Without `overwrite`, an existing registration wins and the call only
    /// logs a warning.
    pub fn register_codec(
        &self,
        type_id: TypeId,
        type_name: &'static str,
        codec: Codec,
        overwrite: bool,
    ) -> Registration {
        let mut codecs = self.codecs.write().unwrap_or_else(PoisonError::into_inner);
        match codecs.get_mut(&type_id) {
            None => {
                codecs.insert(type_id, Registered { type_name, codec });
                Registration::Installed
            }
            Some(existing) if overwrite => {
                info!(type_name, previous = ?existing.codec, "replacing registered codec");
                *existing = Registered { type_name, codec };
                Registration::Replaced
            }
            Some(existing) => {
                warn!(
                    type_name = existing.type_name,
                    "codec already registered; keeping the existing one"
                );
                Registration::Duplicate
            }
        }
    }

    /// Returns the codec registered for `type_id`.
    pub fn lookup(&self, type_id: TypeId) -> Option<Codec> {
        let codecs = self.codecs.read().unwrap_or_else(PoisonError::into_inner);
        codecs.get(&type_id).map(|registered| registered.codec.clone())
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        let codecs = self.codecs.read().unwrap_or_else(PoisonError::into_inner);
        codecs.contains_key(&type_id)
    }

    /// Returns the number of registered codecs.
    pub fn len(&self) -> usize {
        self.codecs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Installs the built-in scalar codecs into every empty slot. Runs once
    /// per registry.
    pub fn ensure_builtins(&self) {
        self.builtins.call_once(|| {
            let mut codecs = self.codecs.write().unwrap_or_else(PoisonError::into_inner);
            let mut installed = 0usize;
            for kind in ScalarKind::ALL {
                codecs.entry(kind.value_type_id()).or_insert_with(|| {
                    installed += 1;
                    Registered {
                        type_name: kind.type_name(),
                        codec: Codec::Builtin(kind),
                    }
                });
            }
            debug!(installed, "built-in codecs installed");
        });
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::error::SchemaError;

    struct Decimal;

    impl ValueCodec<i32> for Decimal {
        fn read(&self, doc: &Document, key: &str) -> Result<i32, SchemaError> {
            let text = doc.get_string(key)?;
            Ok(text.parse().unwrap_or_default())
        }

        fn write(&self, doc: &mut Document, key: &str, value: &i32) -> Result<(), SchemaError> {
            doc.put_string(key, value.to_string());
            Ok(())
        }
    }

    #[test]
    fn lookup_is_empty_before_bootstrap() {
        let registry = CodecRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.lookup(TypeId::of::<i32>()).is_none());
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let registry = CodecRegistry::new();
        registry.ensure_builtins();
        registry.ensure_builtins();

        assert_eq!(registry.len(), ScalarKind::ALL.len());
        assert!(registry.lookup(TypeId::of::<i32>()).unwrap().is_builtin());
    }

    #[test]
    fn bootstrap_keeps_user_codecs() {
        let registry = CodecRegistry::new();
        assert_eq!(registry.register(Decimal, false), Registration::Installed);

        registry.ensure_builtins();

        assert!(!registry.lookup(TypeId::of::<i32>()).unwrap().is_builtin());
        assert_eq!(registry.len(), ScalarKind::ALL.len());
    }

    #[test]
    fn duplicate_registration_keeps_original() {
        let registry = CodecRegistry::new();
        registry.ensure_builtins();

        assert_eq!(registry.register(Decimal, false), Registration::Duplicate);
        assert!(registry.lookup(TypeId::of::<i32>()).unwrap().is_builtin());
    }

    #[test]
    fn overwrite_replaces_codec() {
        let registry = CodecRegistry::new();
        registry.ensure_builtins();

        assert_eq!(registry.register(Decimal, true), Registration::Replaced);

        let codec = registry.lookup(TypeId::of::<i32>()).unwrap();
        assert!(!codec.is_builtin());

        let mut doc = Document::new();
        codec.write(&mut doc, "n", &42i32).unwrap();
        assert_eq!(doc.get_string("n").unwrap(), "42");
    }
}
