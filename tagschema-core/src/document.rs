use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SchemaError;

/// A single entry value in a [`Document`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    ByteArray(Vec<u8>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    /// A nested document.
    Compound(Document),
}

impl Tag {
    /// Returns the name of this tag's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Tag::Byte(_) => "Byte",
            Tag::Short(_) => "Short",
            Tag::Int(_) => "Int",
            Tag::Long(_) => "Long",
            Tag::Float(_) => "Float",
            Tag::Double(_) => "Double",
            Tag::String(_) => "String",
            Tag::ByteArray(_) => "ByteArray",
            Tag::IntArray(_) => "IntArray",
            Tag::LongArray(_) => "LongArray",
            Tag::Compound(_) => "Compound",
        }
    }
}

/// A hierarchical, key-unique map of named tags.
///
/// Entries keep their insertion order. Overwriting a key keeps its original
/// position.
///
/// Typed getters return the kind's zero value when the key is absent and a
/// [`SchemaError::CodecTypeMismatch`] when the key holds a different kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    entries: IndexMap<String, Tag>,
}

macro_rules! scalar_accessors {
    ($($get:ident, $put:ident, $variant:ident, $t:ty;)*) => {
        $(
            #[doc = concat!("Reads a `", stringify!($variant), "` entry.")]
            pub fn $get(&self, key: &str) -> Result<$t, SchemaError> {
                match self.entries.get(key) {
                    None => Ok(<$t>::default()),
                    Some(Tag::$variant(value)) => Ok(value.clone()),
                    Some(other) => Err(SchemaError::mismatch(key, stringify!($variant), other.kind_name())),
                }
            }

            #[doc = concat!("Writes a `", stringify!($variant), "` entry.")]
            pub fn $put(&mut self, key: impl Into<String>, value: $t) {
                self.entries.insert(key.into(), Tag::$variant(value));
            }
        )*
    };
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.entries.get(key)
    }

    /// Inserts a tag, returning the one it replaced.
    pub fn insert(&mut self, key: impl Into<String>, tag: Tag) -> Option<Tag> {
        self.entries.insert(key.into(), tag)
    }

    /// Removes a tag, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Tag> {
        self.entries.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tag)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the nested document at `key`, if there is one.
    pub fn compound(&self, key: &str) -> Option<&Document> {
        match self.entries.get(key) {
            Some(Tag::Compound(doc)) => Some(doc),
            _ => None,
        }
    }

    pub fn compound_mut(&mut self, key: &str) -> Option<&mut Document> {
        match self.entries.get_mut(key) {
            Some(Tag::Compound(doc)) => Some(doc),
            _ => None,
        }
    }

    /// Returns the nested document at `key`, inserting an empty one if the
    /// key is absent.
    pub fn compound_entry(&mut self, key: &str) -> Result<&mut Document, SchemaError> {
        let tag = match self.entries.entry(key.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Tag::Compound(Document::new())),
        };
        match tag {
            Tag::Compound(doc) => Ok(doc),
            other => Err(SchemaError::mismatch(key, "Compound", other.kind_name())),
        }
    }

    scalar_accessors! {
        get_byte, put_byte, Byte, i8;
        get_short, put_short, Short, i16;
        get_int, put_int, Int, i32;
        get_long, put_long, Long, i64;
        get_float, put_float, Float, f32;
        get_double, put_double, Double, f64;
        get_string, put_string, String, String;
        get_byte_array, put_byte_array, ByteArray, Vec<u8>;
        get_int_array, put_int_array, IntArray, Vec<i32>;
        get_long_array, put_long_array, LongArray, Vec<i64>;
    }

    /// Reads a boolean stored as a `Byte`; any non-zero byte is `true`.
    pub fn get_bool(&self, key: &str) -> Result<bool, SchemaError> {
        Ok(self.get_byte(key)? != 0)
    }

    pub fn put_bool(&mut self, key: impl Into<String>, value: bool) {
        self.put_byte(key, i8::from(value));
    }

    /// Reads a UUID stored as four ints, most significant first.
    pub fn get_uuid(&self, key: &str) -> Result<Uuid, SchemaError> {
        match self.entries.get(key) {
            None => Ok(Uuid::nil()),
            Some(Tag::IntArray(words)) if words.len() == 4 => {
                let bits = words
                    .iter()
                    .fold(0u128, |acc, word| (acc << 32) | u128::from(*word as u32));
                Ok(Uuid::from_u128(bits))
            }
            Some(Tag::IntArray(_)) => Err(SchemaError::mismatch(key, "IntArray[4]", "IntArray")),
            Some(other) => Err(SchemaError::mismatch(key, "IntArray[4]", other.kind_name())),
        }
    }

    pub fn put_uuid(&mut self, key: impl Into<String>, value: Uuid) {
        let bits = value.as_u128();
        let words = (0..4)
            .rev()
            .map(|i| (bits >> (i * 32)) as u32 as i32)
            .collect();
        self.put_int_array(key, words);
    }

    /// Encodes the document as a CBOR snapshot.
    ///
    /// The snapshot is for saving and restoring a document around a session;
    /// it is not the host's wire format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SchemaError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| SchemaError::Snapshot(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes a snapshot produced by [`Document::to_bytes`].
    pub fn from_bytes(data: &[u8]) -> Result<Self, SchemaError> {
        ciborium::from_reader(data).map_err(|e| SchemaError::Snapshot(e.to_string()))
    }
}
