//! Field-binding tables.
//!
//! A binding table lists, for one struct type, every field the engine may
//! touch: its document key, the identity of its declared type and a pair of
//! accessors. Tables are normally generated by `#[derive(Schematic)]`, but
//! they are plain values and can be written by hand.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::SchemaError;

/// A type that can appear in a schema, either as a node or as a sub-schema.
///
/// Leaf types (anything a codec reads and writes as a single entry) keep the
/// default `bindings`, which returns `None`. Composite types return their
/// binding table.
pub trait Schematic: Any + Default {
    /// Returns the binding table of this type, or `None` for leaf types.
    fn bindings() -> Option<Vec<FieldBinding>> {
        None
    }
}

macro_rules! impl_schematic_leaf {
    ($($t:ty),* $(,)?) => {
        $(impl Schematic for $t {})*
    };
}

impl_schematic_leaf!(
    i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, bool, char, String, Vec<u8>, Vec<i32>,
    Vec<i64>, Uuid,
);

/// Identity of a schematic type together with the entry point to its
/// binding table.
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
    bindings: fn() -> Option<Vec<FieldBinding>>,
}

impl TypeDescriptor {
    pub fn of<T: Schematic>() -> Self {
        TypeDescriptor {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            bindings: T::bindings,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn bindings(&self) -> Option<Vec<FieldBinding>> {
        (self.bindings)()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeDescriptor").field(&self.name).finish()
    }
}

/// How a field stores its value.
///
/// `T` itself always holds a value. `Option<T>` and `Option<Box<T>>` may be
/// empty, which the engine treats as an absent value.
pub trait Holder<T>: 'static {
    fn held(&self) -> Option<&T>;

    fn held_mut(&mut self) -> Option<&mut T>;

    fn hold(&mut self, value: T);
}

impl<T: 'static> Holder<T> for T {
    fn held(&self) -> Option<&T> {
        Some(self)
    }

    fn held_mut(&mut self) -> Option<&mut T> {
        Some(self)
    }

    fn hold(&mut self, value: T) {
        *self = value;
    }
}

impl<T: 'static> Holder<T> for Option<T> {
    fn held(&self) -> Option<&T> {
        self.as_ref()
    }

    fn held_mut(&mut self) -> Option<&mut T> {
        self.as_mut()
    }

    fn hold(&mut self, value: T) {
        *self = Some(value);
    }
}

impl<T: 'static> Holder<T> for Box<T> {
    fn held(&self) -> Option<&T> {
        Some(&**self)
    }

    fn held_mut(&mut self) -> Option<&mut T> {
        Some(&mut **self)
    }

    fn hold(&mut self, value: T) {
        **self = value;
    }
}

impl<T: 'static> Holder<T> for Option<Box<T>> {
    fn held(&self) -> Option<&T> {
        self.as_deref()
    }

    fn held_mut(&mut self) -> Option<&mut T> {
        self.as_deref_mut()
    }

    fn hold(&mut self, value: T) {
        *self = Some(Box::new(value));
    }
}

trait Access: Send + Sync {
    fn get<'a>(&self, owner: &'a dyn Any) -> Result<Option<&'a dyn Any>, SchemaError>;

    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Result<Option<&'a mut dyn Any>, SchemaError>;

    fn set(&self, owner: &mut dyn Any, value: Box<dyn Any>) -> Result<(), SchemaError>;

    fn fresh(&self) -> Box<dyn Any>;
}

struct FieldAccess<O, H, T> {
    field: &'static str,
    get: fn(&O) -> &H,
    get_mut: fn(&mut O) -> &mut H,
    _target: PhantomData<fn() -> T>,
}

impl<O: 'static, H: Holder<T>, T: Schematic> FieldAccess<O, H, T> {
    fn foreign_owner(&self) -> SchemaError {
        SchemaError::SchemaIntegrity {
            schema: std::any::type_name::<O>(),
            detail: format!("an object of another type (accessing `{}`)", self.field),
        }
    }
}

impl<O: 'static, H: Holder<T>, T: Schematic> Access for FieldAccess<O, H, T> {
    fn get<'a>(&self, owner: &'a dyn Any) -> Result<Option<&'a dyn Any>, SchemaError> {
        let owner = owner.downcast_ref::<O>().ok_or_else(|| self.foreign_owner())?;
        Ok(<H as Holder<T>>::held((self.get)(owner)).map(|value| value as &dyn Any))
    }

    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Result<Option<&'a mut dyn Any>, SchemaError> {
        let owner = owner.downcast_mut::<O>().ok_or_else(|| self.foreign_owner())?;
        Ok(<H as Holder<T>>::held_mut((self.get_mut)(owner)).map(|value| value as &mut dyn Any))
    }

    fn set(&self, owner: &mut dyn Any, value: Box<dyn Any>) -> Result<(), SchemaError> {
        let owner = owner.downcast_mut::<O>().ok_or_else(|| self.foreign_owner())?;
        let value = value.downcast::<T>().map_err(|_| {
            SchemaError::mismatch(self.field, std::any::type_name::<T>(), "another type")
        })?;
        <H as Holder<T>>::hold((self.get_mut)(owner), *value);
        Ok(())
    }

    fn fresh(&self) -> Box<dyn Any> {
        Box::new(T::default())
    }
}

/// A type-erased getter/setter pair for one field of one owner type.
#[derive(Clone)]
pub struct Link {
    access: Arc<dyn Access>,
}

impl Link {
    /// Returns the field's current value, or `None` when it holds none.
    pub fn get<'a>(&self, owner: &'a dyn Any) -> Result<Option<&'a dyn Any>, SchemaError> {
        self.access.get(owner)
    }

    pub fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Result<Option<&'a mut dyn Any>, SchemaError> {
        self.access.get_mut(owner)
    }

    /// Stores `value` into the field. The value must be of the field's
    /// target type.
    pub fn set(&self, owner: &mut dyn Any, value: Box<dyn Any>) -> Result<(), SchemaError> {
        self.access.set(owner, value)
    }

    /// Constructs a default instance of the field's target type.
    pub fn fresh(&self) -> Box<dyn Any> {
        self.access.fresh()
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Link")
    }
}

#[derive(Debug, Clone)]
enum BindingKind {
    Bound { target: TypeDescriptor, link: Link },
    Ignored,
    Unresolved { type_name: &'static str },
}

/// One row of a binding table.
#[derive(Debug, Clone)]
pub struct FieldBinding {
    name: String,
    kind: BindingKind,
}

impl FieldBinding {
    /// Binds a field of owner `O`, stored as `H`, whose value type is `T`.
    ///
    /// ```
    /// use tagschema_core::{FieldBinding, Schematic};
    ///
    /// #[derive(Default)]
    /// struct Slot {
    ///     count: i32,
    ///     label: Option<String>,
    /// }
    ///
    /// impl Schematic for Slot {
    ///     fn bindings() -> Option<Vec<FieldBinding>> {
    ///         Some(vec![
    ///             FieldBinding::bound::<Self, i32, i32>("count", |s| &s.count, |s| &mut s.count),
    ///             FieldBinding::bound::<Self, Option<String>, String>(
    ///                 "label",
    ///                 |s| &s.label,
    ///                 |s| &mut s.label,
    ///             ),
    ///         ])
    ///     }
    /// }
    /// ```
    pub fn bound<O, H, T>(
        name: &'static str,
        get: fn(&O) -> &H,
        get_mut: fn(&mut O) -> &mut H,
    ) -> Self
    where
        O: 'static,
        H: Holder<T>,
        T: Schematic,
    {
        let access = FieldAccess::<O, H, T> {
            field: name,
            get,
            get_mut,
            _target: PhantomData,
        };
        FieldBinding {
            name: name.to_string(),
            kind: BindingKind::Bound {
                target: TypeDescriptor::of::<T>(),
                link: Link {
                    access: Arc::new(access),
                },
            },
        }
    }

    /// A field excluded from every schema.
    pub fn ignored(name: impl Into<String>) -> Self {
        FieldBinding {
            name: name.into(),
            kind: BindingKind::Ignored,
        }
    }

    /// A field whose declared type cannot be named as a schematic type.
    pub fn unresolved(name: impl Into<String>, type_name: &'static str) -> Self {
        FieldBinding {
            name: name.into(),
            kind: BindingKind::Unresolved { type_name },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self.kind, BindingKind::Ignored)
    }

    /// Returns the declared type of a bound field.
    pub fn target(&self) -> Option<&TypeDescriptor> {
        match &self.kind {
            BindingKind::Bound { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn link(&self) -> Option<&Link> {
        match &self.kind {
            BindingKind::Bound { link, .. } => Some(link),
            _ => None,
        }
    }

    /// Returns the declared type name of an unresolved field.
    pub fn unresolved_type(&self) -> Option<&'static str> {
        match self.kind {
            BindingKind::Unresolved { type_name } => Some(type_name),
            _ => None,
        }
    }
}

/// Row builder used by the derive for every non-ignored field.
///
/// Method lookup on `&&FieldCandidate` prefers [`BindSchematic`], which only
/// applies when the value type implements `Schematic`; any other field type
/// falls through to [`BindUnresolved`] and becomes an unresolved row.
#[doc(hidden)]
pub struct FieldCandidate<O, H, T>(PhantomData<fn() -> (O, H, T)>);

impl<O, H, T> FieldCandidate<O, H, T> {
    pub fn new() -> Self {
        FieldCandidate(PhantomData)
    }
}

impl<O, H, T> Default for FieldCandidate<O, H, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[doc(hidden)]
pub trait BindSchematic {
    type Owner;
    type Held;

    fn bind(
        &self,
        name: &'static str,
        get: fn(&Self::Owner) -> &Self::Held,
        get_mut: fn(&mut Self::Owner) -> &mut Self::Held,
        type_name: &'static str,
    ) -> FieldBinding;
}

impl<O, H, T> BindSchematic for &FieldCandidate<O, H, T>
where
    O: 'static,
    H: Holder<T>,
    T: Schematic,
{
    type Owner = O;
    type Held = H;

    fn bind(
        &self,
        name: &'static str,
        get: fn(&O) -> &H,
        get_mut: fn(&mut O) -> &mut H,
        _type_name: &'static str,
    ) -> FieldBinding {
        FieldBinding::bound::<O, H, T>(name, get, get_mut)
    }
}

#[doc(hidden)]
pub trait BindUnresolved {
    type Owner;
    type Held;

    fn bind(
        &self,
        name: &'static str,
        get: fn(&Self::Owner) -> &Self::Held,
        get_mut: fn(&mut Self::Owner) -> &mut Self::Held,
        type_name: &'static str,
    ) -> FieldBinding;
}

impl<O, H, T> BindUnresolved for FieldCandidate<O, H, T> {
    type Owner = O;
    type Held = H;

    fn bind(
        &self,
        name: &'static str,
        _get: fn(&O) -> &H,
        _get_mut: fn(&mut O) -> &mut H,
        type_name: &'static str,
    ) -> FieldBinding {
        FieldBinding::unresolved(name, type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Pair {
        left: i32,
        right: Option<String>,
        boxed: Box<i64>,
    }

    fn left() -> FieldBinding {
        FieldBinding::bound::<Pair, i32, i32>("left", |p| &p.left, |p| &mut p.left)
    }

    fn right() -> FieldBinding {
        FieldBinding::bound::<Pair, Option<String>, String>("right", |p| &p.right, |p| &mut p.right)
    }

    #[test]
    fn direct_field_round_trip() {
        let binding = left();
        let link = binding.link().unwrap();
        let mut pair = Pair::default();

        link.set(&mut pair, Box::new(7i32)).unwrap();
        let value = link.get(&pair).unwrap().unwrap();

        assert_eq!(value.downcast_ref::<i32>(), Some(&7));
        assert_eq!(pair.left, 7);
    }

    #[test]
    fn optional_field_reports_absence() {
        let binding = right();
        let link = binding.link().unwrap();
        let mut pair = Pair::default();

        assert!(link.get(&pair).unwrap().is_none());

        link.set(&mut pair, link.fresh()).unwrap();
        assert_eq!(pair.right, Some(String::new()));
    }

    #[test]
    fn boxed_field_is_seen_through() {
        let binding =
            FieldBinding::bound::<Pair, Box<i64>, i64>("boxed", |p| &p.boxed, |p| &mut p.boxed);
        let link = binding.link().unwrap();
        let mut pair = Pair::default();

        link.set(&mut pair, Box::new(9i64)).unwrap();
        assert_eq!(*pair.boxed, 9);
        assert_eq!(binding.target().unwrap().id(), TypeId::of::<i64>());
    }

    #[test]
    fn foreign_owner_is_an_integrity_error() {
        let binding = left();
        let link = binding.link().unwrap();
        let not_a_pair = 5u8;

        assert!(matches!(
            link.get(&not_a_pair),
            Err(SchemaError::SchemaIntegrity { .. })
        ));
    }

    #[test]
    fn wrong_value_type_is_a_mismatch() {
        let binding = left();
        let link = binding.link().unwrap();
        let mut pair = Pair::default();

        let err = link.set(&mut pair, Box::new("seven".to_string())).unwrap_err();
        assert!(matches!(err, SchemaError::CodecTypeMismatch { .. }));
        assert_eq!(pair.left, 0);
    }

    #[test]
    fn markers_carry_no_link() {
        let ignored = FieldBinding::ignored("cache");
        assert!(ignored.is_ignored());
        assert!(ignored.link().is_none());

        let opaque = FieldBinding::unresolved("callback", "fn()");
        assert_eq!(opaque.unresolved_type(), Some("fn()"));
        assert!(opaque.target().is_none());
    }

    #[derive(Default)]
    struct Mixed {
        count: i32,
        tags: Vec<String>,
    }

    #[test]
    fn candidates_fall_back_to_unresolved_rows() {
        let count = (&&FieldCandidate::<Mixed, i32, i32>::new()).bind(
            "count",
            |m| &m.count,
            |m| &mut m.count,
            "i32",
        );
        let tags = (&&FieldCandidate::<Mixed, Vec<String>, Vec<String>>::new()).bind(
            "tags",
            |m| &m.tags,
            |m| &mut m.tags,
            "Vec<String>",
        );

        assert!(count.link().is_some());
        assert_eq!(count.target().map(TypeDescriptor::id), Some(TypeId::of::<i32>()));
        assert!(tags.link().is_none());
        assert_eq!(tags.unresolved_type(), Some("Vec<String>"));
    }

    #[test]
    fn leaf_types_have_no_bindings() {
        assert!(TypeDescriptor::of::<i32>().bindings().is_none());
        assert!(TypeDescriptor::of::<Uuid>().bindings().is_none());
    }
}
