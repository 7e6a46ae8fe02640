//! Enumeration over a dictionary's slot array.
//!
//! Two families live here:
//! - Borrowing iterators (`Iter`, `IterMut`, `IntoIter`, `ValuesMut`). The
//!   borrow checker already rules out mutation while they are alive.
//! - Detached enumerators (`Enumerator`, `ResettableEnumerator`). They hold
//!   no borrow; each call takes the dictionary and checks it against the
//!   store identity and version recorded at creation. After a structural
//!   mutation, or when handed a different dictionary, every call fails
//!   with `InvalidState` (lenient reads return `None`). Overwriting the
//!   value of an existing key is not structural.
//!
//! Both walk slots in index order and skip vacant ones.

use crate::dictionary::Dictionary;
use crate::entry_store::{Entry, EntryStore, Slot};
use crate::error::{Error, Result, StateFault};
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::slice;
use std::vec;

/// Borrowing iterator over `(&K, &V)` in slot order.
pub struct Iter<'a, K, V> {
    slots: slice::Iter<'a, Slot<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(len: usize, slots: &'a [Slot<K, V>]) -> Self {
        Self {
            slots: slots.iter(),
            remaining: len,
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.slots.by_ref().find_map(Slot::entry)?;
        self.remaining -= 1;
        Some((&entry.key, &entry.value))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Borrowing iterator over `(&K, &mut V)` in slot order.
pub struct IterMut<'a, K, V> {
    slots: slice::IterMut<'a, Slot<K, V>>,
    remaining: usize,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(len: usize, slots: &'a mut [Slot<K, V>]) -> Self {
        Self {
            slots: slots.iter_mut(),
            remaining: len,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.slots.by_ref().find_map(Slot::entry_mut)?;
        self.remaining -= 1;
        Some((&entry.key, &mut entry.value))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Mutable iterator over values only.
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> ValuesMut<'a, K, V> {
    pub(crate) fn new(len: usize, slots: &'a mut [Slot<K, V>]) -> Self {
        Self {
            inner: IterMut::new(len, slots),
        }
    }
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

/// Owning iterator returned by `Dictionary::into_iter`.
pub struct IntoIter<K, V> {
    slots: vec::IntoIter<Slot<K, V>>,
    remaining: usize,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(len: usize, slots: Vec<Slot<K, V>>) -> Self {
        Self {
            slots: slots.into_iter(),
            remaining: len,
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.slots.by_ref().find_map(|slot| match slot {
            Slot::Occupied(e) => Some(e),
            Slot::Vacant { .. } => None,
        })?;
        self.remaining -= 1;
        Some((entry.key, entry.value))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Position {
    BeforeFirst,
    At(usize),
    Finished,
}

/// Version-checked position shared by every detached enumerator.
#[derive(Clone, Debug)]
pub(crate) struct Cursor {
    store_id: u64,
    version: u64,
    position: Position,
}

impl Cursor {
    pub(crate) fn new<K, V, S>(store: &EntryStore<K, V, S>) -> Self {
        Self {
            store_id: store.id(),
            version: store.version(),
            position: Position::BeforeFirst,
        }
    }

    fn check_version<K, V, S>(&self, store: &EntryStore<K, V, S>) -> Result<()> {
        if self.store_id != store.id() {
            return Err(Error::InvalidState(StateFault::ForeignDictionary));
        }
        if self.version != store.version() {
            return Err(Error::InvalidState(StateFault::VersionChanged));
        }
        Ok(())
    }

    pub(crate) fn move_next<K, V, S>(&mut self, store: &EntryStore<K, V, S>) -> Result<bool> {
        self.check_version(store)?;
        let start = match self.position {
            Position::BeforeFirst => 0,
            Position::At(index) => index + 1,
            Position::Finished => return Ok(false),
        };
        let slots = store.slots();
        let found = slots
            .get(start..)
            .and_then(|rest| rest.iter().position(|s| s.entry().is_some()));
        match found {
            Some(offset) => {
                self.position = Position::At(start + offset);
                Ok(true)
            }
            None => {
                self.position = Position::Finished;
                Ok(false)
            }
        }
    }

    pub(crate) fn reset<K, V, S>(&mut self, store: &EntryStore<K, V, S>) -> Result<()> {
        self.check_version(store)?;
        self.position = Position::BeforeFirst;
        Ok(())
    }

    /// The current entry, or `None` when not positioned on one or when the
    /// store no longer matches.
    pub(crate) fn current<'d, K, V, S>(
        &self,
        store: &'d EntryStore<K, V, S>,
    ) -> Option<&'d Entry<K, V>> {
        self.current_strict(store).ok()
    }

    /// Like [`current`](Self::current) but reports why nothing is there.
    pub(crate) fn current_strict<'d, K, V, S>(
        &self,
        store: &'d EntryStore<K, V, S>,
    ) -> Result<&'d Entry<K, V>> {
        self.check_version(store)?;
        match self.position {
            Position::At(index) => store
                .entry_at(index)
                .ok_or(Error::InvalidState(StateFault::VersionChanged)),
            Position::BeforeFirst | Position::Finished => {
                Err(Error::InvalidState(StateFault::NotPositioned))
            }
        }
    }
}

/// Single-pass detached enumerator over `(key, value)` pairs.
///
/// Calls with any dictionary other than the one that created it fail with
/// `InvalidState`.
///
/// ```
/// use keyed_dict::ByteDictionary;
///
/// let mut d: ByteDictionary<u32> = ByteDictionary::new();
/// d.insert_bytes(b"a", 1);
/// let mut e = d.enumerator();
/// assert!(e.current(&d).is_none());
/// while e.move_next(&d).unwrap() {
///     let (_, v) = e.current(&d).unwrap();
///     assert_eq!(*v, 1);
/// }
/// d.insert_bytes(b"b", 2);
/// assert!(e.move_next(&d).is_err());
/// ```
pub struct Enumerator<K, V, S> {
    cursor: Cursor,
    _marker: PhantomData<fn(&Dictionary<K, V, S>)>,
}

impl<K, V, S> Enumerator<K, V, S> {
    pub(crate) fn new(dict: &Dictionary<K, V, S>) -> Self {
        Self {
            cursor: Cursor::new(dict.store()),
            _marker: PhantomData,
        }
    }

    /// Advances to the next live entry. Fails with `InvalidState` when the
    /// dictionary was structurally mutated since this enumerator was made.
    pub fn move_next(&mut self, dict: &Dictionary<K, V, S>) -> Result<bool> {
        self.cursor.move_next(dict.store())
    }

    /// The current pair; `None` before the first `move_next`, after the last
    /// one, and once the dictionary was structurally mutated.
    pub fn current<'d>(&self, dict: &'d Dictionary<K, V, S>) -> Option<(&'d K, &'d V)> {
        self.cursor.current(dict.store()).map(|e| (&e.key, &e.value))
    }
}

impl<K, V, S> Clone for Enumerator<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            cursor: self.cursor.clone(),
            _marker: PhantomData,
        }
    }
}

/// Detached enumerator that can be rewound and rejects reads while not
/// positioned on an entry.
pub struct ResettableEnumerator<K, V, S> {
    cursor: Cursor,
    _marker: PhantomData<fn(&Dictionary<K, V, S>)>,
}

impl<K, V, S> ResettableEnumerator<K, V, S> {
    pub(crate) fn new(dict: &Dictionary<K, V, S>) -> Self {
        Self {
            cursor: Cursor::new(dict.store()),
            _marker: PhantomData,
        }
    }

    pub fn move_next(&mut self, dict: &Dictionary<K, V, S>) -> Result<bool> {
        self.cursor.move_next(dict.store())
    }

    /// Rewinds to before the first entry. Fails once the dictionary was
    /// structurally mutated.
    pub fn reset(&mut self, dict: &Dictionary<K, V, S>) -> Result<()> {
        self.cursor.reset(dict.store())
    }

    /// The current pair. Fails with `InvalidState` when not positioned on
    /// an entry or once the dictionary was structurally mutated.
    pub fn entry<'d>(&self, dict: &'d Dictionary<K, V, S>) -> Result<(&'d K, &'d V)> {
        self.cursor.current_strict(dict.store()).map(|e| (&e.key, &e.value))
    }

    pub fn key<'d>(&self, dict: &'d Dictionary<K, V, S>) -> Result<&'d K> {
        self.entry(dict).map(|(k, _)| k)
    }

    pub fn value<'d>(&self, dict: &'d Dictionary<K, V, S>) -> Result<&'d V> {
        self.entry(dict).map(|(_, v)| v)
    }
}

impl<K, V, S> Clone for ResettableEnumerator<K, V, S> {
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
    use crate::strategy::ByteSequenceKeys;
    use test_log::test;

    type Bytes = Dictionary<Vec<u8>, u32, ByteSequenceKeys>;

    fn filled(n: u32) -> Bytes {
        let mut d = Bytes::new();
        for i in 0..n {
            d.insert(i.to_le_bytes().to_vec(), i);
        }
        d
    }

    #[test]
    fn iterators_skip_vacant_slots() {
        let mut d = filled(6);
        d.remove(&1u32.to_le_bytes().to_vec());
        d.remove(&4u32.to_le_bytes().to_vec());
        let it = d.iter();
        assert_eq!(it.len(), 4);
        let values: Vec<u32> = it.map(|(_, v)| *v).collect();
        assert_eq!(values, vec![0, 2, 3, 5]);

        for v in d.values_mut() {
            *v *= 10;
        }
        let values: Vec<u32> = d.into_iter().map(|(_, v)| v).collect();
        assert_eq!(values, vec![0, 20, 30, 50]);
    }

    #[test]
    fn enumerator_placeholder_and_exhaustion() {
        let d = filled(2);
        let mut e = d.enumerator();
        assert!(e.current(&d).is_none());
        assert!(e.move_next(&d).unwrap());
        assert_eq!(e.current(&d).map(|(_, v)| *v), Some(0));
        assert!(e.move_next(&d).unwrap());
        assert!(!e.move_next(&d).unwrap());
        assert!(e.current(&d).is_none());
        assert!(!e.move_next(&d).unwrap());
    }

    #[test]
    fn structural_mutation_invalidates_every_enumerator() {
        let mut d = filled(3);
        let mut a = d.enumerator();
        let mut b = d.resettable_enumerator();
        assert!(a.move_next(&d).unwrap());

        d.insert(0u32.to_le_bytes().to_vec(), 99);
        assert!(a.move_next(&d).unwrap(), "overwrite is not structural");
        assert_eq!(b.move_next(&d), Ok(true));

        d.remove(&2u32.to_le_bytes().to_vec());
        let stale = Err(Error::InvalidState(StateFault::VersionChanged));
        assert_eq!(a.move_next(&d), stale);
        assert_eq!(b.move_next(&d), stale);
        assert_eq!(b.reset(&d), Err(Error::InvalidState(StateFault::VersionChanged)));
    }

    #[test]
    fn resettable_is_strict_when_not_positioned() {
        let d = filled(1);
        let mut e = d.resettable_enumerator();
        let not_positioned = Err(Error::InvalidState(StateFault::NotPositioned));
        assert_eq!(e.key(&d).map(|_| ()), not_positioned);
        assert!(e.move_next(&d).unwrap());
        assert_eq!(e.value(&d), Ok(&0));
        assert!(!e.move_next(&d).unwrap());
        assert_eq!(e.entry(&d).map(|_| ()), not_positioned);
        e.reset(&d).unwrap();
        assert!(e.move_next(&d).unwrap());
        assert_eq!(e.key(&d), Ok(&0u32.to_le_bytes().to_vec()));
    }

    #[test]
    fn reads_fail_once_the_slot_was_recycled() {
        let mut d = Bytes::new();
        d.insert(b"a".to_vec(), 1);
        let mut e = d.enumerator();
        let mut r = d.resettable_enumerator();
        assert!(e.move_next(&d).unwrap());
        assert!(r.move_next(&d).unwrap());

        // "z" lands in the slot "a" vacated, under the cursors' position.
        d.remove(&b"a".to_vec());
        d.insert(b"z".to_vec(), 26);
        assert_eq!(d.iter().next(), Some((&b"z".to_vec(), &26)));

        assert_eq!(e.current(&d), None);
        let stale = Err(Error::InvalidState(StateFault::VersionChanged));
        assert_eq!(r.value(&d).map(|_| ()), stale);
        assert_eq!(r.key(&d).map(|_| ()), stale);
        assert_eq!(r.entry(&d).map(|_| ()), stale);
    }

    #[test]
    fn enumerators_reject_other_dictionaries() {
        let a = filled(2);
        let b = filled(2);
        assert_eq!(a.store().version(), b.store().version());

        let foreign = Err(Error::InvalidState(StateFault::ForeignDictionary));
        let mut e = a.enumerator();
        assert_eq!(e.move_next(&b).map(|_| ()), foreign);
        assert!(e.move_next(&a).unwrap());
        assert_eq!(e.current(&b), None);
        assert_eq!(e.current(&a).map(|(_, v)| *v), Some(0));

        let copy = a.clone();
        let mut r = a.resettable_enumerator();
        assert_eq!(r.move_next(&copy).map(|_| ()), foreign);
        assert_eq!(r.reset(&copy), foreign);
        assert!(r.move_next(&a).unwrap());
        assert_eq!(r.value(&copy).map(|_| ()), foreign);
        assert_eq!(r.value(&a), Ok(&0));
    }

    #[test]
    fn clear_invalidates_even_when_empty() {
        let mut d = Bytes::new();
        let mut e = d.enumerator();
        d.clear();
        assert!(e.move_next(&d).is_err());
    }
}
