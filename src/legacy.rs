//! Loosely-typed access to dictionaries through `dyn Any`.
//!
//! Everything here is layered on the typed `Dictionary` API; nothing
//! touches the entry store directly. Keys and values cross the boundary as
//! `Box<dyn Any>` / `&dyn Any` and are checked against the dictionary's
//! concrete types at run time. A missing object (`None`) stands for a null
//! reference.
//!
//! Rules
//! - A null key is always an `InvalidArgument` naming "key".
//! - `set_object`/`add_object` check, in order: null key, null value (only
//!   legal when `V` is nullable), key type, value type.
//! - Lookups with a key of the wrong type find nothing.
//! - `copy_to_array` validates the destination completely before it
//!   writes anything.

use crate::dictionary::Dictionary;
use crate::enumerator::ResettableEnumerator;
use crate::error::{check_copy_bounds, ArgumentFault, Error, Result};
use crate::strategy::{KeyStrategy, TypeKey};
use crate::views::{Keys, Values};
use core::any::{type_name, Any, TypeId};
use core::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// An owned, loosely-typed object.
pub type Object = Box<dyn Any>;

/// Value types that know whether they have a null representation.
///
/// Only `Option<T>` is nullable out of the box; a null stored into it
/// becomes `None`.
pub trait NullableValue: Sized {
    fn null() -> Option<Self> {
        None
    }
}

impl<T> NullableValue for Option<T> {
    fn null() -> Option<Self> {
        Some(None)
    }
}

macro_rules! non_nullable {
    ($($t:ty),* $(,)?) => {
        $(impl NullableValue for $t {})*
    };
}

non_nullable!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    String, &'static str, TypeKey,
);

impl<T> NullableValue for Vec<T> {}
impl<T: ?Sized> NullableValue for Box<T> {}
impl<T: ?Sized> NullableValue for Rc<T> {}
impl<T: ?Sized> NullableValue for Arc<T> {}

/// Element type of a [`LegacyArray`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    /// Holds any object.
    Object,
    /// Holds [`DictionaryEntry`] records.
    Entry,
    /// Holds exactly one concrete type.
    Exact { id: TypeId, name: &'static str },
}

impl ElementType {
    pub fn of<T: Any>() -> Self {
        ElementType::Exact {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Object => "object",
            ElementType::Entry => type_name::<DictionaryEntry>(),
            ElementType::Exact { name, .. } => name,
        }
    }

    fn is<T: Any>(&self) -> bool {
        matches!(self, ElementType::Exact { id, .. } if *id == TypeId::of::<T>())
    }
}

/// A loosely-typed array: a shape plus a run of nullable object slots.
///
/// Only one-dimensional, zero-based arrays can be copied into; the other
/// shapes exist so callers can hand over what they have and get a precise
/// error back.
pub struct LegacyArray {
    element: ElementType,
    rank: usize,
    lower_bound: isize,
    items: Vec<Option<Object>>,
}

impl LegacyArray {
    /// A `len`-slot array typed to hold `T`.
    pub fn of<T: Any>(len: usize) -> Self {
        Self::with_shape(ElementType::of::<T>(), 1, 0, len)
    }

    pub fn objects(len: usize) -> Self {
        Self::with_shape(ElementType::Object, 1, 0, len)
    }

    pub fn entries(len: usize) -> Self {
        Self::with_shape(ElementType::Entry, 1, 0, len)
    }

    pub fn with_shape(element: ElementType, rank: usize, lower_bound: isize, len: usize) -> Self {
        Self {
            element,
            rank,
            lower_bound,
            items: (0..len).map(|_| None).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn lower_bound(&self) -> isize {
        self.lower_bound
    }

    pub fn element_type(&self) -> ElementType {
        self.element
    }

    /// The object at `index`; `None` for a null slot or out of range.
    pub fn get(&self, index: usize) -> Option<&dyn Any> {
        self.items.get(index)?.as_deref()
    }

    pub fn get_as<T: Any>(&self, index: usize) -> Option<&T> {
        self.get(index)?.downcast_ref::<T>()
    }

    /// Shape and bounds checks shared by every copy-out.
    fn check_destination(&self, index: usize, count: usize) -> Result<()> {
        if self.rank != 1 {
            return Err(Error::argument("array", ArgumentFault::MultiDimensional));
        }
        if self.lower_bound != 0 {
            return Err(Error::argument("array", ArgumentFault::NonZeroLowerBound));
        }
        check_copy_bounds(self.items.len(), index, count)
    }

    fn invalid_type(&self) -> Error {
        Error::argument(
            "array",
            ArgumentFault::InvalidArrayType {
                found: self.element.name(),
            },
        )
    }

    fn fill<I>(&mut self, index: usize, objects: I)
    where
        I: IntoIterator<Item = Object>,
    {
        for (slot, object) in self.items[index..].iter_mut().zip(objects) {
            *slot = Some(object);
        }
    }
}

impl fmt::Debug for LegacyArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyArray")
            .field("element", &self.element.name())
            .field("rank", &self.rank)
            .field("lower_bound", &self.lower_bound)
            .field("len", &self.items.len())
            .finish()
    }
}

/// Owned key/value record written by `copy_to_array` into entry arrays.
pub struct DictionaryEntry {
    pub key: Object,
    pub value: Object,
}

impl fmt::Debug for DictionaryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictionaryEntry").finish_non_exhaustive()
    }
}

/// Borrowed key/value record yielded by [`ObjectEnumerator`].
#[derive(Clone, Copy)]
pub struct DictionaryEntryRef<'a> {
    pub key: &'a dyn Any,
    pub value: &'a dyn Any,
}

impl fmt::Debug for DictionaryEntryRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictionaryEntryRef").finish_non_exhaustive()
    }
}

/// Copy-out into a [`LegacyArray`].
pub trait ObjectCollection {
    /// Copies every element, in enumeration order, into `array` starting at
    /// `index`. Rejects multi-dimensional and non-zero-based arrays, an
    /// out-of-range `index`, too little room and incompatible element types
    /// before writing anything.
    fn copy_to_array(&self, array: &mut LegacyArray, index: usize) -> Result<()>;
}

impl<K, V, S> ObjectCollection for Dictionary<K, V, S>
where
    K: Any + Clone,
    V: Any + Clone,
{
    /// Accepts `(K, V)`, [`DictionaryEntry`] and object arrays; object
    /// arrays receive boxed `(K, V)` pairs.
    fn copy_to_array(&self, array: &mut LegacyArray, index: usize) -> Result<()> {
        array.check_destination(index, self.len())?;
        match array.element_type() {
            ElementType::Entry => array.fill(
                index,
                self.iter().map(|(k, v)| -> Object {
                    Box::new(DictionaryEntry {
                        key: Box::new(k.clone()),
                        value: Box::new(v.clone()),
                    })
                }),
            ),
            ElementType::Object => array.fill(index, boxed_pairs(self)),
            element if element.is::<(K, V)>() => array.fill(index, boxed_pairs(self)),
            _ => return Err(array.invalid_type()),
        }
        Ok(())
    }
}

fn boxed_pairs<'a, K, V, S>(dict: &'a Dictionary<K, V, S>) -> impl Iterator<Item = Object> + 'a
where
    K: Any + Clone,
    V: Any + Clone,
{
    dict.iter()
        .map(|(k, v)| -> Object { Box::new((k.clone(), v.clone())) })
}

impl<K, V, S> ObjectCollection for Keys<'_, K, V, S>
where
    K: Any + Clone,
{
    fn copy_to_array(&self, array: &mut LegacyArray, index: usize) -> Result<()> {
        array.check_destination(index, self.len())?;
        let element = array.element_type();
        if element != ElementType::Object && !element.is::<K>() {
            return Err(array.invalid_type());
        }
        array.fill(index, self.iter().map(|k| -> Object { Box::new(k.clone()) }));
        Ok(())
    }
}

impl<K, V, S> ObjectCollection for Values<'_, K, V, S>
where
    V: Any + Clone,
{
    fn copy_to_array(&self, array: &mut LegacyArray, index: usize) -> Result<()> {
        array.check_destination(index, self.len())?;
        let element = array.element_type();
        if element != ElementType::Object && !element.is::<V>() {
            return Err(array.invalid_type());
        }
        array.fill(index, self.iter().map(|v| -> Object { Box::new(v.clone()) }));
        Ok(())
    }
}

/// Loosely-typed dictionary access.
pub trait ObjectDictionary {
    type Enumerator;

    /// The value stored under `key`; `Ok(None)` when absent or when `key`
    /// has the wrong type.
    fn get_object(&self, key: Option<&dyn Any>) -> Result<Option<&dyn Any>>;

    /// Inserts or overwrites.
    fn set_object(&mut self, key: Option<Object>, value: Option<Object>) -> Result<()>;

    /// Inserts; fails with `KeyConflict` when the key is present.
    fn add_object(&mut self, key: Option<Object>, value: Option<Object>) -> Result<()>;

    fn contains_object(&self, key: Option<&dyn Any>) -> Result<bool>;

    /// Removes `key` if present; a wrong-typed key is a no-op.
    fn remove_object(&mut self, key: Option<&dyn Any>) -> Result<()>;

    fn object_enumerator(&self) -> Self::Enumerator;

    fn is_fixed_size(&self) -> bool {
        false
    }

    fn is_read_only(&self) -> bool {
        false
    }
}

fn require_key<T: ?Sized>(key: Option<&T>) -> Result<&T> {
    key.ok_or_else(|| Error::null("key"))
}

/// Converts the loosely-typed arguments of `set_object`/`add_object`.
fn convert_pair<K: Any, V: Any + NullableValue>(
    key: Option<Object>,
    value: Option<Object>,
) -> Result<(K, V)> {
    let key = key.ok_or_else(|| Error::null("key"))?;
    let null_value = match value {
        None => Some(V::null().ok_or_else(|| {
            Error::argument(
                "value",
                ArgumentFault::NullValue {
                    expected: type_name::<V>(),
                },
            )
        })?),
        Some(_) => None,
    };
    let key = key.downcast::<K>().map_err(|_| {
        Error::argument(
            "key",
            ArgumentFault::WrongKeyType {
                expected: type_name::<K>(),
            },
        )
    })?;
    let value = match (value, null_value) {
        (_, Some(null)) => null,
        (Some(object), None) => *object.downcast::<V>().map_err(|_| {
            Error::argument(
                "value",
                ArgumentFault::WrongValueType {
                    expected: type_name::<V>(),
                },
            )
        })?,
        (None, None) => unreachable!("a missing value is either converted or rejected"),
    };
    Ok((*key, value))
}

impl<K, V, S> ObjectDictionary for Dictionary<K, V, S>
where
    K: Any,
    V: Any + NullableValue,
    S: KeyStrategy<K>,
{
    type Enumerator = ObjectEnumerator<K, V, S>;

    fn get_object(&self, key: Option<&dyn Any>) -> Result<Option<&dyn Any>> {
        let key = require_key(key)?;
        Ok(key
            .downcast_ref::<K>()
            .and_then(|k| self.get(k))
            .map(|v| v as &dyn Any))
    }

    fn set_object(&mut self, key: Option<Object>, value: Option<Object>) -> Result<()> {
        let (key, value) = convert_pair::<K, V>(key, value)?;
        self.insert(key, value);
        Ok(())
    }

    fn add_object(&mut self, key: Option<Object>, value: Option<Object>) -> Result<()> {
        let (key, value) = convert_pair::<K, V>(key, value)?;
        self.add(key, value)
    }

    fn contains_object(&self, key: Option<&dyn Any>) -> Result<bool> {
        let key = require_key(key)?;
        Ok(key.downcast_ref::<K>().is_some_and(|k| self.contains_key(k)))
    }

    fn remove_object(&mut self, key: Option<&dyn Any>) -> Result<()> {
        let key = require_key(key)?;
        if let Some(k) = key.downcast_ref::<K>() {
            self.remove(k);
        }
        Ok(())
    }

    fn object_enumerator(&self) -> Self::Enumerator {
        ObjectEnumerator {
            inner: self.resettable_enumerator(),
        }
    }
}

/// Reset-capable, loosely-typed enumerator over a dictionary.
///
/// Reads fail with `InvalidState` before the first `move_next`, after the
/// last one, and once the dictionary was structurally mutated.
pub struct ObjectEnumerator<K, V, S> {
    inner: ResettableEnumerator<K, V, S>,
}

impl<K: Any, V: Any, S> ObjectEnumerator<K, V, S> {
    pub fn move_next(&mut self, dict: &Dictionary<K, V, S>) -> Result<bool> {
        self.inner.move_next(dict)
    }

    pub fn reset(&mut self, dict: &Dictionary<K, V, S>) -> Result<()> {
        self.inner.reset(dict)
    }

    pub fn entry<'d>(&self, dict: &'d Dictionary<K, V, S>) -> Result<DictionaryEntryRef<'d>> {
        let (key, value) = self.inner.entry(dict)?;
        Ok(DictionaryEntryRef { key, value })
    }

    pub fn key<'d>(&self, dict: &'d Dictionary<K, V, S>) -> Result<&'d dyn Any> {
        self.entry(dict).map(|e| e.key)
    }

    pub fn value<'d>(&self, dict: &'d Dictionary<K, V, S>) -> Result<&'d dyn Any> {
        self.entry(dict).map(|e| e.value)
    }
}
