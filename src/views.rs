//! Read-only key and value projections of a dictionary.
//!
//! A view is just a borrow of its dictionary: no storage of its own, no
//! version of its own. Enumerating a view walks the dictionary's slots.

use crate::dictionary::Dictionary;
use crate::enumerator::{Cursor, Iter};
use crate::error::{check_copy_bounds, Error, Result};
use crate::strategy::KeyStrategy;
use core::iter::FusedIterator;
use core::marker::PhantomData;

const READ_ONLY: &str = "mutating a read-only dictionary view is not supported";

/// Collection contract shared by the key and value views.
///
/// The mutating methods exist for interface parity and always fail with
/// [`Error::NotSupported`].
pub trait ReadOnlyCollection<T> {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, item: &T) -> bool;

    /// Clones every item into `dest[index..]` in enumeration order.
    /// Nothing is written when the bounds check fails.
    fn copy_to(&self, dest: &mut [T], index: usize) -> Result<()>
    where
        T: Clone;

    fn is_read_only(&self) -> bool {
        true
    }

    fn add(&mut self, _item: T) -> Result<()> {
        Err(Error::NotSupported(READ_ONLY))
    }

    fn remove(&mut self, _item: &T) -> Result<bool> {
        Err(Error::NotSupported(READ_ONLY))
    }

    fn clear(&mut self) -> Result<()> {
        Err(Error::NotSupported(READ_ONLY))
    }
}

/// Key projection returned by [`Dictionary::keys`].
pub struct Keys<'a, K, V, S> {
    dict: &'a Dictionary<K, V, S>,
}

impl<'a, K, V, S> Keys<'a, K, V, S> {
    pub(crate) fn new(dict: &'a Dictionary<K, V, S>) -> Self {
        Self { dict }
    }

    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    pub fn iter(&self) -> KeyIter<'a, K, V> {
        KeyIter {
            inner: self.dict.iter(),
        }
    }

    /// Detached versioned enumerator over the keys.
    pub fn enumerator(&self) -> KeyEnumerator<K, V, S> {
        KeyEnumerator {
            cursor: Cursor::new(self.dict.store()),
            _marker: PhantomData,
        }
    }
}

impl<K, V, S> Clone for Keys<'_, K, V, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, S> Copy for Keys<'_, K, V, S> {}

impl<K, V, S> ReadOnlyCollection<K> for Keys<'_, K, V, S>
where
    S: KeyStrategy<K>,
{
    fn len(&self) -> usize {
        self.dict.len()
    }

    /// Membership under the dictionary's key strategy.
    fn contains(&self, item: &K) -> bool {
        self.dict.contains_key(item)
    }

    fn copy_to(&self, dest: &mut [K], index: usize) -> Result<()>
    where
        K: Clone,
    {
        check_copy_bounds(dest.len(), index, self.len())?;
        for (slot, key) in dest[index..].iter_mut().zip(self.iter()) {
            *slot = key.clone();
        }
        Ok(())
    }
}

impl<'a, K, V, S> IntoIterator for Keys<'a, K, V, S> {
    type Item = &'a K;
    type IntoIter = KeyIter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Value projection returned by [`Dictionary::values`].
pub struct Values<'a, K, V, S> {
    dict: &'a Dictionary<K, V, S>,
}

impl<'a, K, V, S> Values<'a, K, V, S> {
    pub(crate) fn new(dict: &'a Dictionary<K, V, S>) -> Self {
        Self { dict }
    }

    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    pub fn iter(&self) -> ValueIter<'a, K, V> {
        ValueIter {
            inner: self.dict.iter(),
        }
    }

    pub fn enumerator(&self) -> ValueEnumerator<K, V, S> {
        ValueEnumerator {
            cursor: Cursor::new(self.dict.store()),
            _marker: PhantomData,
        }
    }
}

impl<K, V, S> Clone for Values<'_, K, V, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, S> Copy for Values<'_, K, V, S> {}

impl<K, V, S> ReadOnlyCollection<V> for Values<'_, K, V, S>
where
    V: PartialEq,
{
    fn len(&self) -> usize {
        self.dict.len()
    }

    /// Linear scan using `V: PartialEq`.
    fn contains(&self, item: &V) -> bool {
        self.dict.contains_value(item)
    }

    fn copy_to(&self, dest: &mut [V], index: usize) -> Result<()>
    where
        V: Clone,
    {
        check_copy_bounds(dest.len(), index, self.len())?;
        for (slot, value) in dest[index..].iter_mut().zip(self.iter()) {
            *slot = value.clone();
        }
        Ok(())
    }
}

impl<'a, K, V, S> IntoIterator for Values<'a, K, V, S> {
    type Item = &'a V;
    type IntoIter = ValueIter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct KeyIter<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for KeyIter<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for KeyIter<'_, K, V> {}
impl<K, V> FusedIterator for KeyIter<'_, K, V> {}

pub struct ValueIter<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for ValueIter<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValueIter<'_, K, V> {}
impl<K, V> FusedIterator for ValueIter<'_, K, V> {}

/// Detached versioned enumerator over a dictionary's keys.
///
/// `current` is lenient and returns `None` where `key` reports why.
pub struct KeyEnumerator<K, V, S> {
    cursor: Cursor,
    _marker: PhantomData<fn(&Dictionary<K, V, S>)>,
}

impl<K, V, S> KeyEnumerator<K, V, S> {
    pub fn move_next(&mut self, dict: &Dictionary<K, V, S>) -> Result<bool> {
        self.cursor.move_next(dict.store())
    }

    pub fn current<'d>(&self, dict: &'d Dictionary<K, V, S>) -> Option<&'d K> {
        self.cursor.current(dict.store()).map(|e| &e.key)
    }

    /// Fails with `InvalidState` when not positioned on a key or once the
    /// dictionary was structurally mutated.
    pub fn key<'d>(&self, dict: &'d Dictionary<K, V, S>) -> Result<&'d K> {
        self.cursor.current_strict(dict.store()).map(|e| &e.key)
    }

    pub fn reset(&mut self, dict: &Dictionary<K, V, S>) -> Result<()> {
        self.cursor.reset(dict.store())
    }
}

impl<K, V, S> Clone for KeyEnumerator<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            cursor: self.cursor.clone(),
            _marker: PhantomData,
        }
    }
}

/// Detached versioned enumerator over a dictionary's values.
pub struct ValueEnumerator<K, V, S> {
    cursor: Cursor,
    _marker: PhantomData<fn(&Dictionary<K, V, S>)>,
}

impl<K, V, S> ValueEnumerator<K, V, S> {
    pub fn move_next(&mut self, dict: &Dictionary<K, V, S>) -> Result<bool> {
        self.cursor.move_next(dict.store())
    }

    pub fn current<'d>(&self, dict: &'d Dictionary<K, V, S>) -> Option<&'d V> {
        self.cursor.current(dict.store()).map(|e| &e.value)
    }

    pub fn value<'d>(&self, dict: &'d Dictionary<K, V, S>) -> Result<&'d V> {
        self.cursor.current_strict(dict.store()).map(|e| &e.value)
    }

    pub fn reset(&mut self, dict: &Dictionary<K, V, S>) -> Result<()> {
        self.cursor.reset(dict.store())
    }
}

impl<K, V, S> Clone for ValueEnumerator<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            cursor: self.cursor.clone(),
            _marker: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ArgumentFault, StateFault};
    use crate::strategy::ByteSequenceKeys;
    use test_log::test;

    type Bytes = Dictionary<Vec<u8>, u32, ByteSequenceKeys>;

    fn sample() -> Bytes {
        let mut d = Bytes::new();
        d.insert(b"one".to_vec(), 1);
        d.insert(b"two".to_vec(), 2);
        d.insert(b"three".to_vec(), 3);
        d
    }

    #[test]
    fn views_follow_slot_order() {
        let mut d = sample();
        d.remove(&b"one".to_vec());
        d.insert(b"four".to_vec(), 4);
        let keys: Vec<&[u8]> = d.keys().iter().map(Vec::as_slice).collect();
        assert_eq!(keys, vec![&b"four"[..], &b"two"[..], &b"three"[..]]);
        let values: Vec<u32> = d.values().into_iter().copied().collect();
        assert_eq!(values, vec![4, 2, 3]);
        assert_eq!(d.keys().len(), 3);
    }

    #[test]
    fn contains_uses_strategy_and_eq() {
        let d = sample();
        assert!(d.keys().contains(&b"two".to_vec()));
        assert!(!d.keys().contains(&b"TWO".to_vec()));
        assert!(d.values().contains(&3));
        assert!(!d.values().contains(&7));
    }

    #[test]
    fn mutation_is_rejected() {
        let d = sample();
        let mut keys = d.keys();
        assert!(keys.is_read_only());
        assert!(matches!(keys.add(b"x".to_vec()), Err(Error::NotSupported(_))));
        assert!(matches!(keys.remove(&b"one".to_vec()), Err(Error::NotSupported(_))));
        let mut values = d.values();
        assert!(matches!(values.clear(), Err(Error::NotSupported(_))));
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn copy_to_validates_before_writing() {
        let d = sample();
        let mut out = vec![0u32; 4];
        assert_eq!(
            d.values().copy_to(&mut out, 2),
            Err(Error::argument("array", ArgumentFault::ArrayTooSmall))
        );
        assert_eq!(out, vec![0; 4]);
        assert_eq!(
            d.values().copy_to(&mut out, 5),
            Err(Error::argument("index", ArgumentFault::IndexOutOfRange))
        );
        d.values().copy_to(&mut out, 1).unwrap();
        assert_eq!(out, vec![0, 1, 2, 3]);

        let mut keys = vec![Vec::new(); 3];
        d.keys().copy_to(&mut keys, 0).unwrap();
        assert_eq!(keys[2], b"three".to_vec());
    }

    #[test]
    fn view_enumerators_share_the_dictionary_version() {
        let mut d = sample();
        let mut k = d.keys().enumerator();
        let mut v = d.values().enumerator();
        assert!(k.move_next(&d).unwrap());
        assert!(v.move_next(&d).unwrap());
        assert_eq!(k.current(&d), Some(&b"one".to_vec()));
        assert_eq!(v.current(&d), Some(&1));

        *d.get_mut(&b"one".to_vec()).unwrap() = 10;
        assert_eq!(v.current(&d), Some(&10));
        assert!(v.move_next(&d).unwrap());

        d.insert(b"five".to_vec(), 5);
        let stale = Err(Error::InvalidState(StateFault::VersionChanged));
        assert_eq!(k.move_next(&d), stale);
        assert_eq!(v.move_next(&d), stale);
    }

    #[test]
    fn view_enumerators_read_strictly_and_rewind() {
        let mut d = sample();
        let mut k = d.keys().enumerator();
        let mut v = d.values().enumerator();
        let not_positioned = Err(Error::InvalidState(StateFault::NotPositioned));
        assert_eq!(k.key(&d).map(|_| ()), not_positioned);
        assert_eq!(v.value(&d).map(|_| ()), not_positioned);

        assert!(k.move_next(&d).unwrap());
        assert!(v.move_next(&d).unwrap());
        let saved = v.clone();
        assert!(v.move_next(&d).unwrap());
        assert_eq!(k.key(&d), Ok(&b"one".to_vec()));
        assert_eq!(saved.value(&d), Ok(&1));
        assert_eq!(v.value(&d), Ok(&2));
        v.reset(&d).unwrap();
        assert_eq!(v.current(&d), None);

        d.remove(&b"one".to_vec());
        d.insert(b"six".to_vec(), 6);
        let stale = Err(Error::InvalidState(StateFault::VersionChanged));
        assert_eq!(k.current(&d), None);
        assert_eq!(k.key(&d).map(|_| ()), stale);
        assert_eq!(saved.value(&d).map(|_| ()), stale);
        assert_eq!(k.reset(&d), stale);
    }
}
