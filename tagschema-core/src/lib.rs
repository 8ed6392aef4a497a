//! Tagschema maps typed objects to and from hierarchical tagged documents.
//!
//! Core concepts:
//! - **Document**: an insertion-ordered tree of named tags, each a scalar,
//!   an array or a nested document
//! - **Codec**: reads and writes one value type at a document key
//! - **Binding table**: per-type list of fields with their accessors,
//!   generated by `#[derive(Schematic)]`
//! - **Schema**: partitions a type's fields into codec-backed nodes and
//!   nested sub-schemas, derived once per type and cached
//! - **Session**: read a document into an object, let the caller mutate it,
//!   write it back
//!
//! # Example
//!
//! ```
//! use tagschema_core::{Document, Schematic, with_session};
//!
//! #[derive(Default, Schematic)]
//! struct Inner {
//!     value: i32,
//! }
//!
//! #[derive(Default, Schematic)]
//! struct Outer {
//!     inner: Inner,
//!     #[schematic(ignore)]
//!     scratch: Vec<String>,
//! }
//!
//! let mut doc = Document::new();
//! with_session(&mut doc, |outer: &mut Outer| outer.inner.value = 5).unwrap();
//!
//! assert_eq!(doc.compound("inner").unwrap().get_int("value").unwrap(), 5);
//! ```
//!
//! # Concurrency
//!
//! The global [`CodecRegistry`] and [`SchemaCache`] are guarded by locks, so
//! registration and first-use schema builds are safe from any thread.
//! Traversals themselves are synchronous and borrow the document and object
//! exclusively for the duration of the call.

extern crate self as tagschema_core;

mod binding;
mod cache;
mod codec;
mod document;
mod error;
mod fingerprint;
mod registry;
mod schema;
mod session;
mod traverse;

pub use binding::{FieldBinding, Holder, Link, Schematic, TypeDescriptor};
pub use cache::SchemaCache;
pub use codec::{Codec, ErasedCodec, ScalarKind, ValueCodec};
pub use document::{Document, Tag};
pub use error::SchemaError;
pub use fingerprint::Fingerprint;
pub use registry::{CodecRegistry, Registration};
pub use schema::{MAX_DEPTH, Schema, SchemaBuilder};
pub use session::{Session, with_session, with_session_using};
pub use traverse::{read, write};

#[doc(hidden)]
pub mod __private {
    pub use crate::binding::{BindSchematic, BindUnresolved, FieldCandidate};
}

#[cfg(feature = "derive")]
pub use tagschema_derive::Schematic;
