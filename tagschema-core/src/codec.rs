use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::document::Document;
use crate::error::SchemaError;

/// The scalar kinds that ship with a built-in codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Text,
    Bytes,
    IntArray,
    LongArray,
    Bool,
    Uuid,
}

impl ScalarKind {
    /// All built-in kinds, in bootstrap order.
    pub const ALL: [ScalarKind; 12] = [
        ScalarKind::I8,
        ScalarKind::I16,
        ScalarKind::I32,
        ScalarKind::I64,
        ScalarKind::F32,
        ScalarKind::F64,
        ScalarKind::Text,
        ScalarKind::Bytes,
        ScalarKind::IntArray,
        ScalarKind::LongArray,
        ScalarKind::Bool,
        ScalarKind::Uuid,
    ];

    /// Identity of the Rust type this kind reads and writes.
    pub fn value_type_id(self) -> TypeId {
        match self {
            ScalarKind::I8 => TypeId::of::<i8>(),
            ScalarKind::I16 => TypeId::of::<i16>(),
            ScalarKind::I32 => TypeId::of::<i32>(),
            ScalarKind::I64 => TypeId::of::<i64>(),
            ScalarKind::F32 => TypeId::of::<f32>(),
            ScalarKind::F64 => TypeId::of::<f64>(),
            ScalarKind::Text => TypeId::of::<String>(),
            ScalarKind::Bytes => TypeId::of::<Vec<u8>>(),
            ScalarKind::IntArray => TypeId::of::<Vec<i32>>(),
            ScalarKind::LongArray => TypeId::of::<Vec<i64>>(),
            ScalarKind::Bool => TypeId::of::<bool>(),
            ScalarKind::Uuid => TypeId::of::<Uuid>(),
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Text => "String",
            ScalarKind::Bytes => "Vec<u8>",
            ScalarKind::IntArray => "Vec<i32>",
            ScalarKind::LongArray => "Vec<i64>",
            ScalarKind::Bool => "bool",
            ScalarKind::Uuid => "Uuid",
        }
    }
}

/// Reads and writes one concrete value type at a document key.
///
/// Implement this for types that should be stored as a single entry rather
/// than decomposed into fields, then register it with
/// [`CodecRegistry::register`](crate::CodecRegistry::register).
pub trait ValueCodec<T>: Send + Sync + 'static {
    fn read(&self, doc: &Document, key: &str) -> Result<T, SchemaError>;

    fn write(&self, doc: &mut Document, key: &str, value: &T) -> Result<(), SchemaError>;
}

/// Object-safe form of [`ValueCodec`], with values passed as `dyn Any`.
pub trait ErasedCodec: Send + Sync {
    fn value_type(&self) -> &'static str;

    fn read_any(&self, doc: &Document, key: &str) -> Result<Box<dyn Any>, SchemaError>;

    fn write_any(&self, doc: &mut Document, key: &str, value: &dyn Any) -> Result<(), SchemaError>;
}

struct Erased<T, C> {
    codec: C,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: 'static, C: ValueCodec<T>> ErasedCodec for Erased<T, C> {
    fn value_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn read_any(&self, doc: &Document, key: &str) -> Result<Box<dyn Any>, SchemaError> {
        Ok(Box::new(self.codec.read(doc, key)?))
    }

    fn write_any(&self, doc: &mut Document, key: &str, value: &dyn Any) -> Result<(), SchemaError> {
        let value = downcast::<T>(key, value)?;
        self.codec.write(doc, key, value)
    }
}

/// A codec as stored in the registry.
///
/// Built-in kinds are dispatched by matching on [`ScalarKind`]; custom codecs
/// go through their [`ErasedCodec`] implementation.
#[derive(Clone)]
pub enum Codec {
    Builtin(ScalarKind),
    Custom(Arc<dyn ErasedCodec>),
}

impl Codec {
    /// Wraps a user codec for value type `T`.
    pub fn custom<T: 'static, C: ValueCodec<T>>(codec: C) -> Self {
        Codec::Custom(Arc::new(Erased {
            codec,
            _marker: std::marker::PhantomData,
        }))
    }

    /// Returns the name of the value type this codec handles.
    pub fn value_type(&self) -> &'static str {
        match self {
            Codec::Builtin(kind) => kind.type_name(),
            Codec::Custom(codec) => codec.value_type(),
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Codec::Builtin(_))
    }

    /// Decodes the entry at `key`.
    pub fn read(&self, doc: &Document, key: &str) -> Result<Box<dyn Any>, SchemaError> {
        let kind = match self {
            Codec::Builtin(kind) => *kind,
            Codec::Custom(codec) => return codec.read_any(doc, key),
        };
        let value: Box<dyn Any> = match kind {
            ScalarKind::I8 => Box::new(doc.get_byte(key)?),
            ScalarKind::I16 => Box::new(doc.get_short(key)?),
            ScalarKind::I32 => Box::new(doc.get_int(key)?),
            ScalarKind::I64 => Box::new(doc.get_long(key)?),
            ScalarKind::F32 => Box::new(doc.get_float(key)?),
            ScalarKind::F64 => Box::new(doc.get_double(key)?),
            ScalarKind::Text => Box::new(doc.get_string(key)?),
            ScalarKind::Bytes => Box::new(doc.get_byte_array(key)?),
            ScalarKind::IntArray => Box::new(doc.get_int_array(key)?),
            ScalarKind::LongArray => Box::new(doc.get_long_array(key)?),
            ScalarKind::Bool => Box::new(doc.get_bool(key)?),
            ScalarKind::Uuid => Box::new(doc.get_uuid(key)?),
        };
        Ok(value)
    }

    /// Encodes `value` into the entry at `key`.
    pub fn write(&self, doc: &mut Document, key: &str, value: &dyn Any) -> Result<(), SchemaError> {
        let kind = match self {
            Codec::Builtin(kind) => *kind,
            Codec::Custom(codec) => return codec.write_any(doc, key, value),
        };
        match kind {
            ScalarKind::I8 => doc.put_byte(key, *downcast::<i8>(key, value)?),
            ScalarKind::I16 => doc.put_short(key, *downcast::<i16>(key, value)?),
            ScalarKind::I32 => doc.put_int(key, *downcast::<i32>(key, value)?),
            ScalarKind::I64 => doc.put_long(key, *downcast::<i64>(key, value)?),
            ScalarKind::F32 => doc.put_float(key, *downcast::<f32>(key, value)?),
            ScalarKind::F64 => doc.put_double(key, *downcast::<f64>(key, value)?),
            ScalarKind::Text => doc.put_string(key, downcast::<String>(key, value)?.clone()),
            ScalarKind::Bytes => doc.put_byte_array(key, downcast::<Vec<u8>>(key, value)?.clone()),
            ScalarKind::IntArray => doc.put_int_array(key, downcast::<Vec<i32>>(key, value)?.clone()),
            ScalarKind::LongArray => {
                doc.put_long_array(key, downcast::<Vec<i64>>(key, value)?.clone())
            }
            ScalarKind::Bool => doc.put_bool(key, *downcast::<bool>(key, value)?),
            ScalarKind::Uuid => doc.put_uuid(key, *downcast::<Uuid>(key, value)?),
        }
        Ok(())
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Builtin(kind) => f.debug_tuple("Builtin").field(kind).finish(),
            Codec::Custom(codec) => f.debug_tuple("Custom").field(&codec.value_type()).finish(),
        }
    }
}

fn downcast<'a, T: 'static>(key: &str, value: &'a dyn Any) -> Result<&'a T, SchemaError> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| SchemaError::mismatch(key, std::any::type_name::<T>(), "another type"))
}
