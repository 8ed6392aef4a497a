use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::binding::{Link, Schematic, TypeDescriptor};
use crate::codec::Codec;
use crate::error::SchemaError;
use crate::fingerprint::Fingerprint;
use crate::registry::CodecRegistry;

/// Maximum nesting depth for schema building and traversal.
pub const MAX_DEPTH: usize = 256;

pub(crate) fn check_depth(depth: usize) -> Result<(), SchemaError> {
    if depth > MAX_DEPTH {
        return Err(SchemaError::DepthExceeded {
            depth,
            max: MAX_DEPTH,
        });
    }
    Ok(())
}

/// How one type's fields map onto document entries.
///
/// Every eligible field is either a node (read and written by a codec) or a
/// sub-schema (decomposed into a nested document), never both. A schema is
/// immutable once built.
#[derive(Clone)]
pub struct Schema {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) nodes: IndexMap<String, Codec>,
    pub(crate) subschemas: IndexMap<String, Arc<Schema>>,
    pub(crate) node_links: IndexMap<String, Link>,
    pub(crate) subschema_links: IndexMap<String, Link>,
    pub(crate) unresolved: Vec<(String, &'static str)>,
}

impl Schema {
    fn empty(descriptor: &TypeDescriptor) -> Self {
        Schema {
            type_id: descriptor.id(),
            type_name: descriptor.name(),
            nodes: IndexMap::new(),
            subschemas: IndexMap::new(),
            node_links: IndexMap::new(),
            subschema_links: IndexMap::new(),
            unresolved: Vec::new(),
        }
    }

    /// Identity of the type this schema was built for.
    pub fn owner_type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Keys of fields handled by a codec, in declaration order.
    pub fn node_keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Keys of fields decomposed into nested documents, in declaration order.
    pub fn subschema_keys(&self) -> impl Iterator<Item = &str> {
        self.subschemas.keys().map(String::as_str)
    }

    pub fn node(&self, key: &str) -> Option<&Codec> {
        self.nodes.get(key)
    }

    pub fn subschema(&self, key: &str) -> Option<&Schema> {
        self.subschemas.get(key).map(Arc::as_ref)
    }

    /// Fields left out because their type could not be resolved, as
    /// `(key, declared type)` pairs.
    pub fn unresolved_fields(&self) -> &[(String, &'static str)] {
        &self.unresolved
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.nodes.contains_key(key) || self.subschemas.contains_key(key)
    }

    /// Number of nodes plus sub-schemas at this level.
    pub fn len(&self) -> usize {
        self.nodes.len() + self.subschemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Digest of the schema's shape, including every nested sub-schema.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = blake3::Hasher::new();
        self.hash_into(&mut hasher);
        Fingerprint::from_hasher(&hasher)
    }

    fn hash_into(&self, hasher: &mut blake3::Hasher) {
        hash_str(hasher, self.type_name);
        hasher.update(&(self.nodes.len() as u64).to_le_bytes());
        for (key, codec) in &self.nodes {
            hash_str(hasher, key);
            hash_str(hasher, codec.value_type());
        }
        hasher.update(&(self.subschemas.len() as u64).to_le_bytes());
        for (key, sub) in &self.subschemas {
            hash_str(hasher, key);
            sub.hash_into(hasher);
        }
    }

    fn first_unresolved(&self) -> Option<SchemaError> {
        if let Some((field, type_name)) = self.unresolved.first() {
            return Some(SchemaError::UnresolvableFieldType {
                owner: self.type_name,
                field: field.clone(),
                type_name,
            });
        }
        self.subschemas.values().find_map(|sub| sub.first_unresolved())
    }
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("type_name", &self.type_name)
            .field("nodes", &self.nodes)
            .field("subschemas", &self.subschemas)
            .finish()
    }
}

/// Derives schemas from binding tables, consulting a codec registry.
///
/// Fields whose type has neither a codec nor a binding table are skipped
/// with a warning. A strict builder fails with
/// [`SchemaError::UnresolvableFieldType`] instead.
pub struct SchemaBuilder<'r> {
    registry: &'r CodecRegistry,
    strict: bool,
}

impl<'r> SchemaBuilder<'r> {
    pub fn new(registry: &'r CodecRegistry) -> Self {
        SchemaBuilder {
            registry,
            strict: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn registry(&self) -> &'r CodecRegistry {
        self.registry
    }

    /// Builds the schema of `T`.
    pub fn build_for<T: Schematic>(&self) -> Result<Schema, SchemaError> {
        self.build(&TypeDescriptor::of::<T>())
    }

    /// Builds the schema described by `descriptor`. A leaf type yields an
    /// empty schema.
    pub fn build(&self, descriptor: &TypeDescriptor) -> Result<Schema, SchemaError> {
        Ok(self
            .build_at(descriptor, 1)?
            .unwrap_or_else(|| Schema::empty(descriptor)))
    }

    /// Rejects a previously built schema that skipped fields, when strict.
    pub(crate) fn check(&self, schema: &Schema) -> Result<(), SchemaError> {
        match schema.first_unresolved() {
            Some(err) if self.strict => Err(err),
            _ => Ok(()),
        }
    }

    fn build_at(
        &self,
        descriptor: &TypeDescriptor,
        depth: usize,
    ) -> Result<Option<Schema>, SchemaError> {
        check_depth(depth)?;
        self.registry.ensure_builtins();

        let Some(bindings) = descriptor.bindings() else {
            return Ok(None);
        };

        let mut schema = Schema::empty(descriptor);
        for binding in bindings {
            if binding.is_ignored() {
                trace!(owner = descriptor.name(), field = binding.name(), "ignored field");
                continue;
            }

            let key = binding.name().to_string();
            if schema.contains_key(&key) || schema.unresolved.iter().any(|(k, _)| *k == key) {
                return Err(SchemaError::SchemaIntegrity {
                    schema: descriptor.name(),
                    detail: format!("a binding table with duplicate key `{key}`"),
                });
            }

            let (Some(target), Some(link)) = (binding.target(), binding.link()) else {
                let type_name = binding.unresolved_type().unwrap_or("<unknown>");
                self.skip(&mut schema, key, type_name)?;
                continue;
            };

            if let Some(codec) = self.registry.lookup(target.id()) {
                schema.nodes.insert(key.clone(), codec);
                schema.node_links.insert(key, link.clone());
                continue;
            }

            match self.build_at(target, depth + 1)? {
                Some(sub) => {
                    schema.subschemas.insert(key.clone(), Arc::new(sub));
                    schema.subschema_links.insert(key, link.clone());
                }
                None => self.skip(&mut schema, key, target.name())?,
            }
        }

        debug!(
            type_name = descriptor.name(),
            depth,
            nodes = schema.nodes.len(),
            subschemas = schema.subschemas.len(),
            "schema built"
        );
        Ok(Some(schema))
    }

    fn skip(&self, schema: &mut Schema, field: String, type_name: &'static str) -> Result<(), SchemaError> {
        if self.strict {
            return Err(SchemaError::UnresolvableFieldType {
                owner: schema.type_name,
                field,
                type_name,
            });
        }
        warn!(
            owner = schema.type_name,
            field = %field,
            type_name,
            "skipping field with unresolvable type"
        );
        schema.unresolved.push((field, type_name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::FieldBinding;

    #[derive(Default)]
    struct Inner {
        value: i32,
    }

    impl Schematic for Inner {
        fn bindings() -> Option<Vec<FieldBinding>> {
            Some(vec![FieldBinding::bound::<Self, i32, i32>(
                "value",
                |s| &s.value,
                |s| &mut s.value,
            )])
        }
    }

    #[derive(Default)]
    struct Outer {
        name: String,
        inner: Inner,
        scratch: u64,
        cache: Vec<String>,
    }

    impl Schematic for Outer {
        fn bindings() -> Option<Vec<FieldBinding>> {
            Some(vec![
                FieldBinding::bound::<Self, String, String>("name", |s| &s.name, |s| &mut s.name),
                FieldBinding::bound::<Self, Inner, Inner>("inner", |s| &s.inner, |s| &mut s.inner),
                FieldBinding::bound::<Self, u64, u64>("scratch", |s| &s.scratch, |s| &mut s.scratch),
                FieldBinding::ignored("cache"),
                FieldBinding::unresolved("callback", "fn()"),
            ])
        }
    }

    #[derive(Default)]
    struct Looping {
        next: Option<Box<Looping>>,
    }

    impl Schematic for Looping {
        fn bindings() -> Option<Vec<FieldBinding>> {
            Some(vec![FieldBinding::bound::<Self, Option<Box<Looping>>, Looping>(
                "next",
                |s| &s.next,
                |s| &mut s.next,
            )])
        }
    }

    #[derive(Default)]
    struct Twice {
        a: i32,
        b: i32,
    }

    impl Schematic for Twice {
        fn bindings() -> Option<Vec<FieldBinding>> {
            Some(vec![
                FieldBinding::bound::<Self, i32, i32>("key", |s| &s.a, |s| &mut s.a),
                FieldBinding::bound::<Self, i32, i32>("key", |s| &s.b, |s| &mut s.b),
            ])
        }
    }

    #[test]
    fn partitions_fields() {
        let registry = CodecRegistry::new();
        let schema = SchemaBuilder::new(&registry).build_for::<Outer>().unwrap();

        assert_eq!(schema.node_keys().collect::<Vec<_>>(), vec!["name"]);
        assert_eq!(schema.subschema_keys().collect::<Vec<_>>(), vec!["inner"]);
        assert!(!schema.contains_key("cache"));

        let inner = schema.subschema("inner").unwrap();
        assert_eq!(inner.node_keys().collect::<Vec<_>>(), vec!["value"]);
    }

    #[test]
    fn unresolvable_fields_are_skipped() {
        let registry = CodecRegistry::new();
        let schema = SchemaBuilder::new(&registry).build_for::<Outer>().unwrap();

        let skipped: Vec<_> = schema.unresolved_fields().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(skipped, vec!["scratch", "callback"]);
        assert!(!schema.contains_key("scratch"));
    }

    #[test]
    fn strict_builder_rejects_unresolvable_fields() {
        let registry = CodecRegistry::new();
        let err = SchemaBuilder::new(&registry)
            .strict(true)
            .build_for::<Outer>()
            .unwrap_err();

        assert!(matches!(
            err,
            SchemaError::UnresolvableFieldType { ref field, .. } if field == "scratch"
        ));
    }

    #[test]
    fn registering_a_codec_turns_a_skip_into_a_node() {
        struct Wide;

        impl crate::codec::ValueCodec<u64> for Wide {
            fn read(&self, doc: &crate::Document, key: &str) -> Result<u64, SchemaError> {
                Ok(doc.get_long(key)? as u64)
            }

            fn write(&self, doc: &mut crate::Document, key: &str, value: &u64) -> Result<(), SchemaError> {
                doc.put_long(key, *value as i64);
                Ok(())
            }
        }

        let registry = CodecRegistry::new();
        registry.register(Wide, false);
        let schema = SchemaBuilder::new(&registry).build_for::<Outer>().unwrap();

        assert!(schema.node("scratch").is_some());
    }

    #[test]
    fn self_reference_exceeds_depth() {
        let registry = CodecRegistry::new();
        let err = SchemaBuilder::new(&registry).build_for::<Looping>().unwrap_err();

        assert_eq!(
            err,
            SchemaError::DepthExceeded {
                depth: MAX_DEPTH + 1,
                max: MAX_DEPTH
            }
        );
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let registry = CodecRegistry::new();
        let err = SchemaBuilder::new(&registry).build_for::<Twice>().unwrap_err();
        assert!(matches!(err, SchemaError::SchemaIntegrity { .. }));
    }

    #[test]
    fn repeated_builds_share_a_fingerprint() {
        let registry = CodecRegistry::new();
        let builder = SchemaBuilder::new(&registry);

        let first = builder.build_for::<Outer>().unwrap();
        let second = builder.build_for::<Outer>().unwrap();
        let other = builder.build_for::<Inner>().unwrap();

        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_ne!(first.fingerprint(), other.fingerprint());
    }

    #[test]
    fn leaf_type_builds_empty_schema() {
        let registry = CodecRegistry::new();
        let schema = SchemaBuilder::new(&registry).build_for::<i32>().unwrap();
        assert!(schema.is_empty());
    }

    #[test]
    fn owner_identity_survives_shared_handles() {
        let registry = CodecRegistry::new();
        let shared = Arc::new(SchemaBuilder::new(&registry).build_for::<Outer>().unwrap());

        assert_eq!(shared.owner_type_id(), TypeId::of::<Outer>());
        assert_eq!(shared.subschema("inner").unwrap().owner_type_id(), TypeId::of::<Inner>());
    }
}
