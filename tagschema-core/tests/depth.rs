//! Depth ceiling checks on long chains of nested types.
#![recursion_limit = "1024"]

use tagschema_core::{
    CodecRegistry, Document, MAX_DEPTH, Schema, SchemaBuilder, SchemaCache, SchemaError,
    Schematic, Session,
};

#[derive(Debug, Default, Schematic)]
struct Nest<T> {
    inner: T,
}

#[derive(Debug, Default, Schematic)]
struct Bottom {
    value: i32,
}

type N2<T> = Nest<Nest<T>>;
type N4<T> = N2<N2<T>>;
type N8<T> = N4<N4<T>>;
type N16<T> = N8<N8<T>>;
type N32<T> = N16<N16<T>>;
type N64<T> = N32<N32<T>>;
type N128<T> = N64<N64<T>>;
type N256<T> = N128<N128<T>>;

/// 254 wrappers around `Bottom`: a chain of 255 types.
type Chain255 = N128<N64<N32<N16<N8<N4<N2<Bottom>>>>>>>;
/// 255 wrappers: a chain of exactly `MAX_DEPTH` types.
type Chain256 = Nest<Chain255>;
/// 256 wrappers: one level too many.
type Chain257 = N256<Bottom>;

fn depth_of(schema: &Schema) -> usize {
    match schema.subschema("inner") {
        Some(inner) => 1 + depth_of(inner),
        None => 1,
    }
}

#[test]
fn chain_of_255_builds() {
    let registry = CodecRegistry::new();
    let schema = SchemaBuilder::new(&registry).build_for::<Chain255>().unwrap();
    assert_eq!(depth_of(&schema), 255);
}

#[test]
fn chain_at_the_ceiling_builds() {
    let registry = CodecRegistry::new();
    let schema = SchemaBuilder::new(&registry).build_for::<Chain256>().unwrap();
    assert_eq!(depth_of(&schema), MAX_DEPTH);
}

#[test]
fn chain_of_257_exceeds_depth() {
    let registry = CodecRegistry::new();
    let err = SchemaBuilder::new(&registry).build_for::<Chain257>().unwrap_err();
    assert_eq!(
        err,
        SchemaError::DepthExceeded {
            depth: MAX_DEPTH + 1,
            max: MAX_DEPTH
        }
    );
}

#[test]
fn deep_chain_round_trips() {
    let registry = CodecRegistry::new();
    let cache = SchemaCache::new();
    let session = Session::new(&registry, &cache);
    let mut doc = Document::new();

    session
        .run(&mut doc, |c: &mut N8<Bottom>| {
            c.inner.inner.inner.inner.inner.inner.inner.inner.value = 8
        })
        .unwrap();

    let mut level = &doc;
    for _ in 0..8 {
        level = level.compound("inner").expect("nested document");
    }
    assert_eq!(level.get_int("value").unwrap(), 8);
}
