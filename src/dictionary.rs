//! Dictionary: typed public facade over the entry store.

use crate::enumerator::{Enumerator, IntoIter, Iter, IterMut, ResettableEnumerator, ValuesMut};
use crate::entry_store::{DuplicatePolicy, EntryStore, InsertOutcome};
use crate::error::{check_copy_bounds, ArgumentFault, Error, Result};
use crate::strategy::{KeyStrategy, ViewStrategy};
use crate::views::{Keys, Values};
use core::fmt;

/// A single-threaded hash map whose hashing and key equality come from the
/// key strategy `S`.
///
/// Entries live in a flat slot array; iteration follows slot order, which
/// is insertion order except where removed slots were recycled.
pub struct Dictionary<K, V, S> {
    store: EntryStore<K, V, S>,
}

impl<K, V, S> Dictionary<K, V, S>
where
    S: KeyStrategy<K> + Default,
{
    pub fn new() -> Self {
        Self::with_strategy(S::default())
    }

    /// Creates a dictionary with room for `capacity` entries, rounded up to
    /// a prime. A zero capacity allocates nothing.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds the largest supported table size.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_strategy(capacity, S::default())
    }
}

impl<K, V, S> Default for Dictionary<K, V, S>
where
    S: KeyStrategy<K> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> Dictionary<K, V, S> {
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            store: EntryStore::new(strategy),
        }
    }

    /// # Panics
    ///
    /// Panics if `capacity` exceeds the largest supported table size; see
    /// [`try_with_capacity_and_strategy`](Self::try_with_capacity_and_strategy).
    pub fn with_capacity_and_strategy(capacity: usize, strategy: S) -> Self {
        match Self::try_with_capacity_and_strategy(capacity, strategy) {
            Ok(dict) => dict,
            Err(e) => panic!("{e}"),
        }
    }

    /// Fails with `InvalidArgument` naming "capacity" instead of panicking.
    pub fn try_with_capacity_and_strategy(capacity: usize, strategy: S) -> Result<Self> {
        Ok(Self {
            store: EntryStore::with_capacity(capacity, strategy)?,
        })
    }

    pub(crate) fn store(&self) -> &EntryStore<K, V, S> {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.len() == 0
    }

    /// Number of slots allocated; always 0 or a prime.
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn strategy(&self) -> &S {
        self.store.strategy()
    }

    /// Removes every entry, keeping the allocated capacity. Invalidates all
    /// outstanding enumerators.
    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Grows so at least `capacity` entries fit without resizing; returns
    /// the new capacity. Capacities beyond the largest supported table size
    /// are rejected and leave the dictionary unchanged.
    pub fn ensure_capacity(&mut self, capacity: usize) -> Result<usize> {
        self.store.ensure_capacity(capacity)
    }

    /// Shrinks the capacity to the smallest prime that holds the current
    /// entries, compacting away recycled slots.
    pub fn trim_excess(&mut self) -> Result<()> {
        self.store.trim_excess(self.store.len())
    }

    /// Like [`trim_excess`](Self::trim_excess) with an explicit target;
    /// fails when `capacity` is below the current count.
    pub fn trim_excess_to(&mut self, capacity: usize) -> Result<()> {
        self.store.trim_excess(capacity)
    }

    pub fn keys(&self) -> Keys<'_, K, V, S> {
        Keys::new(self)
    }

    pub fn values(&self) -> Values<'_, K, V, S> {
        Values::new(self)
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::new(self.store.len(), self.store.slots_mut())
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.store.len(), self.store.slots())
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(self.store.len(), self.store.slots_mut())
    }

    /// Detached single-pass enumerator; see [`Enumerator`].
    pub fn enumerator(&self) -> Enumerator<K, V, S> {
        Enumerator::new(self)
    }

    /// Detached enumerator with `reset` and strict positioning.
    pub fn resettable_enumerator(&self) -> ResettableEnumerator<K, V, S> {
        ResettableEnumerator::new(self)
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.iter().any(|(_, v)| v == value)
    }

    /// Clones every pair into `dest[index..]` in enumeration order.
    pub fn copy_to(&self, dest: &mut [(K, V)], index: usize) -> Result<()>
    where
        K: Clone,
        V: Clone,
    {
        check_copy_bounds(dest.len(), index, self.len())?;
        for (slot, (k, v)) in dest[index..].iter_mut().zip(self.iter()) {
            *slot = (k.clone(), v.clone());
        }
        Ok(())
    }
}

impl<K, V, S> Dictionary<K, V, S>
where
    S: KeyStrategy<K>,
{
    /// Builds a dictionary from seed pairs; a repeated key is an
    /// `InvalidArgument` error naming "collection".
    pub fn from_pairs<I>(pairs: I, strategy: S) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let pairs = pairs.into_iter();
        let mut dict = Self::try_with_capacity_and_strategy(pairs.size_hint().0, strategy)?;
        for (k, v) in pairs {
            let outcome = dict.store.try_insert(k, v, DuplicatePolicy::Reject);
            if let InsertOutcome::RejectedDuplicate = outcome {
                return Err(Error::argument("collection", ArgumentFault::DuplicateKey));
            }
        }
        Ok(dict)
    }

    /// Inserts or, depending on `policy`, overwrites or rejects an existing
    /// key. Overwriting does not invalidate enumerators.
    pub fn try_insert(&mut self, key: K, value: V, policy: DuplicatePolicy) -> InsertOutcome<V> {
        self.store.try_insert(key, value, policy)
    }

    /// Indexed assignment: inserts, or replaces the value of an existing key
    /// and returns the old value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.store.try_insert(key, value, DuplicatePolicy::Overwrite) {
            InsertOutcome::Overwrote(old) => Some(old),
            InsertOutcome::Inserted | InsertOutcome::RejectedDuplicate => None,
        }
    }

    /// Inserts a new key; fails with `KeyConflict` if it is already present.
    pub fn add(&mut self, key: K, value: V) -> Result<()> {
        if self.try_add(key, value) {
            Ok(())
        } else {
            Err(Error::KeyConflict)
        }
    }

    /// Inserts a new key; returns `false` and leaves the map unchanged if it
    /// is already present.
    pub fn try_add(&mut self, key: K, value: V) -> bool {
        matches!(
            self.store.try_insert(key, value, DuplicatePolicy::Reject),
            InsertOutcome::Inserted
        )
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let index = self.store.find(key)?;
        self.store.entry_at(index).map(|e| &e.value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.store.find(key)?;
        self.store.entry_at_mut(index).map(|e| &mut e.value)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let index = self.store.find(key)?;
        self.store.entry_at(index).map(|e| (&e.key, &e.value))
    }

    /// Indexed read: fails with `KeyNotFound` when the key is absent.
    pub fn try_get(&self, key: &K) -> Result<&V> {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.store.find(key).is_some()
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.store.remove(key).map(|(_, v)| v)
    }

    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        self.store.remove(key)
    }
}

/// Lookups by a borrowed view of a key, for strategies that support one.
///
/// Every method behaves exactly like its owned-key counterpart; none of them
/// allocates a key unless an entry is actually inserted.
impl<K, V, S> Dictionary<K, V, S>
where
    S: KeyStrategy<K>,
{
    pub fn get_view<Q>(&self, view: &Q) -> Option<&V>
    where
        Q: ?Sized,
        S: ViewStrategy<K, Q>,
    {
        let index = self.store.find_view(view)?;
        self.store.entry_at(index).map(|e| &e.value)
    }

    pub fn get_view_mut<Q>(&mut self, view: &Q) -> Option<&mut V>
    where
        Q: ?Sized,
        S: ViewStrategy<K, Q>,
    {
        let index = self.store.find_view(view)?;
        self.store.entry_at_mut(index).map(|e| &mut e.value)
    }

    pub fn get_key_value_view<Q>(&self, view: &Q) -> Option<(&K, &V)>
    where
        Q: ?Sized,
        S: ViewStrategy<K, Q>,
    {
        let index = self.store.find_view(view)?;
        self.store.entry_at(index).map(|e| (&e.key, &e.value))
    }

    pub fn contains_view<Q>(&self, view: &Q) -> bool
    where
        Q: ?Sized,
        S: ViewStrategy<K, Q>,
    {
        self.store.find_view(view).is_some()
    }

    pub fn remove_view<Q>(&mut self, view: &Q) -> Option<V>
    where
        Q: ?Sized,
        S: ViewStrategy<K, Q>,
    {
        self.store.remove_view(view).map(|(_, v)| v)
    }

    pub fn remove_view_entry<Q>(&mut self, view: &Q) -> Option<(K, V)>
    where
        Q: ?Sized,
        S: ViewStrategy<K, Q>,
    {
        self.store.remove_view(view)
    }

    /// Inserts by view. `make_key` runs only when a new entry is linked in;
    /// `make_value` runs on insert and on overwrite.
    pub fn try_insert_view<Q, FK, FV>(
        &mut self,
        view: &Q,
        make_key: FK,
        make_value: FV,
        policy: DuplicatePolicy,
    ) -> InsertOutcome<V>
    where
        Q: ?Sized,
        S: ViewStrategy<K, Q>,
        FK: FnOnce(&Q) -> K,
        FV: FnOnce() -> V,
    {
        self.store
            .try_insert_view(view, make_key, make_value, policy)
    }

    /// Returns the value for `view`, inserting `make_value()` under a key
    /// converted from the view when absent.
    pub fn get_or_insert_view_with<Q, F>(&mut self, view: &Q, make_value: F) -> &mut V
    where
        Q: ?Sized,
        S: ViewStrategy<K, Q>,
        K: for<'q> From<&'q Q>,
        F: FnOnce() -> V,
    {
        let index = self
            .store
            .find_or_insert_view(view, |v: &Q| K::from(v), make_value);
        &mut self
            .store
            .entry_at_mut(index)
            .expect("slot returned by find_or_insert_view is occupied")
            .value
    }
}

impl<K: Clone, V: Clone, S: Clone> Clone for Dictionary<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for Dictionary<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for Dictionary<K, V, S>
where
    S: KeyStrategy<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a Dictionary<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut Dictionary<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S> IntoIterator for Dictionary<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        let len = self.store.len();
        IntoIter::new(len, self.store.into_slots())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ByteSequenceKeys;
    use test_log::test;

    type Bytes = Dictionary<Vec<u8>, i32, ByteSequenceKeys>;

    #[test]
    fn insert_add_and_try_get() {
        let mut d = Bytes::new();
        assert_eq!(d.insert(b"a".to_vec(), 1), None);
        assert_eq!(d.insert(b"a".to_vec(), 2), Some(1));
        assert_eq!(d.add(b"a".to_vec(), 3), Err(Error::KeyConflict));
        assert!(!d.try_add(b"a".to_vec(), 3));
        assert_eq!(d.try_get(&b"a".to_vec()), Ok(&2));
        assert_eq!(d.try_get(&b"b".to_vec()), Err(Error::KeyNotFound));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn from_pairs_rejects_duplicates() {
        let ok = Bytes::from_pairs(
            vec![(b"x".to_vec(), 1), (b"y".to_vec(), 2)],
            ByteSequenceKeys::default(),
        )
        .unwrap();
        assert_eq!(ok.len(), 2);
        assert_eq!(ok.capacity(), 3);

        let err = Bytes::from_pairs(
            vec![(b"x".to_vec(), 1), (b"x".to_vec(), 2)],
            ByteSequenceKeys::default(),
        )
        .unwrap_err();
        assert_eq!(err.param(), Some("collection"));
    }

    #[test]
    fn view_methods_match_owned_methods() {
        let mut d = Bytes::new();
        *d.get_or_insert_view_with(&b"k"[..], || 0) += 5;
        *d.get_or_insert_view_with(&b"k"[..], || 100) += 1;
        assert_eq!(d.get_view(&b"k"[..]), Some(&6));
        assert_eq!(d.get(&b"k".to_vec()), Some(&6));
        assert_eq!(d.get_key_value_view(&b"k"[..]), Some((&b"k".to_vec(), &6)));
        assert!(d.contains_view(&b"k"[..]));
        assert_eq!(d.remove_view(&b"k"[..]), Some(6));
        assert!(!d.contains_key(&b"k".to_vec()));
    }

    #[test]
    fn copy_to_and_contains_value() {
        let mut d = Bytes::new();
        d.insert(b"a".to_vec(), 1);
        d.insert(b"b".to_vec(), 2);
        assert!(d.contains_value(&2));
        assert!(!d.contains_value(&3));

        let mut out = vec![(Vec::new(), 0); 3];
        d.copy_to(&mut out, 1).unwrap();
        assert_eq!(out[1], (b"a".to_vec(), 1));
        assert_eq!(out[2], (b"b".to_vec(), 2));
        assert!(d.copy_to(&mut out, 2).is_err());
        assert!(d.copy_to(&mut out, 4).is_err());
    }

    #[test]
    fn trim_excess_keeps_contents() {
        let mut d = Bytes::with_capacity(1000);
        assert_eq!(d.capacity(), 1103);
        d.insert(b"a".to_vec(), 1);
        d.trim_excess().unwrap();
        assert_eq!(d.capacity(), 3);
        assert_eq!(d.get(&b"a".to_vec()), Some(&1));
        assert!(d.trim_excess_to(0).is_err());
    }

    #[test]
    fn debug_and_into_iter() {
        let mut d = Bytes::new();
        d.insert(vec![1], 1);
        assert_eq!(format!("{d:?}"), "{[1]: 1}");
        let pairs: Vec<_> = d.into_iter().collect();
        assert_eq!(pairs, vec![(vec![1], 1)]);
    }
}
