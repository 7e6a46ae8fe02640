//! EntryStore: chained hash table over flat arrays with a free list.
//!
//! Layout
//! - `buckets[hash % capacity]` holds the index of the first entry of a
//!   chain; entries link to the next entry of their chain by index.
//! - `entries` grows up to `capacity` slots. Removing an entry turns its
//!   slot vacant and pushes it onto the free list, which later inserts pop
//!   before appending.
//! - `version` increases on every structural mutation so detached
//!   enumerators can notice that the table changed under them.
//!
//! The store knows nothing about the public dictionary API; facades supply
//! a key strategy and translate outcomes into errors.

use crate::error::{ArgumentFault, Error, Result};
use crate::primes;
use crate::reentrancy::DebugReentrancy;
use crate::strategy::{KeyStrategy, ViewStrategy};
use core::mem;
use core::sync::atomic::{AtomicU64, Ordering};

/// Result of an insert attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum InsertOutcome<V> {
    /// The key was absent and a new entry was linked in.
    Inserted,
    /// The key was present and its value replaced; carries the old value.
    Overwrote(V),
    /// The key was present and the policy rejected the insert.
    RejectedDuplicate,
}

/// What an insert does when the key is already present.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DuplicatePolicy {
    Overwrite,
    Reject,
}

#[derive(Debug, Clone)]
pub(crate) struct Entry<K, V> {
    pub(crate) hash_code: u32,
    next: Option<usize>,
    pub(crate) key: K,
    pub(crate) value: V,
}

#[derive(Debug, Clone)]
pub(crate) enum Slot<K, V> {
    Occupied(Entry<K, V>),
    Vacant { next_free: Option<usize> },
}

impl<K, V> Slot<K, V> {
    #[inline]
    pub(crate) fn entry(&self) -> Option<&Entry<K, V>> {
        match self {
            Slot::Occupied(e) => Some(e),
            Slot::Vacant { .. } => None,
        }
    }

    #[inline]
    pub(crate) fn entry_mut(&mut self) -> Option<&mut Entry<K, V>> {
        match self {
            Slot::Occupied(e) => Some(e),
            Slot::Vacant { .. } => None,
        }
    }
}

pub(crate) struct EntryStore<K, V, S> {
    strategy: S,
    table: RawTable<K, V>,
    // Distinguishes stores whose versions happen to be equal.
    id: u64,
    reentrancy: DebugReentrancy,
}

fn next_store_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

fn check_capacity(capacity: usize) -> Result<()> {
    if capacity > primes::MAX_PRIME_ARRAY_LENGTH {
        return Err(Error::argument("capacity", ArgumentFault::CapacityTooLarge));
    }
    Ok(())
}

/// Storage half of the store; never calls user code except `Drop`.
#[derive(Clone)]
struct RawTable<K, V> {
    buckets: Box<[Option<usize>]>,
    entries: Vec<Slot<K, V>>,
    free_list: Option<usize>,
    free_count: usize,
    count: usize,
    version: u64,
}

impl<K, V> RawTable<K, V> {
    fn new() -> Self {
        Self {
            buckets: Box::default(),
            entries: Vec::new(),
            free_list: None,
            free_count: 0,
            count: 0,
            version: 0,
        }
    }

    fn initialize(&mut self, capacity: usize) -> usize {
        let size = primes::get_prime(capacity);
        self.buckets = vec![None; size].into_boxed_slice();
        self.entries = Vec::with_capacity(size);
        self.free_list = None;
        self.free_count = 0;
        size
    }

    #[inline]
    fn bucket_of(&self, hash_code: u32) -> usize {
        hash_code as usize % self.buckets.len()
    }

    #[inline]
    fn chained(&self, index: usize) -> &Entry<K, V> {
        self.entries[index]
            .entry()
            .expect("bucket chains link only occupied slots")
    }

    fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    fn clear(&mut self) {
        if !self.entries.is_empty() {
            log::trace!(
                "clearing {} entries, keeping capacity {}",
                self.count,
                self.buckets.len()
            );
            self.buckets.fill(None);
            self.entries.clear();
            self.free_list = None;
            self.free_count = 0;
            self.count = 0;
        }
        self.bump_version();
    }

    fn ensure_capacity(&mut self, capacity: usize) -> Result<usize> {
        let current = self.buckets.len();
        if current >= capacity {
            return Ok(current);
        }
        check_capacity(capacity)?;
        if current == 0 {
            return Ok(self.initialize(capacity));
        }
        let new_size = primes::get_prime(capacity);
        self.resize(new_size);
        Ok(new_size)
    }

    fn trim_excess(&mut self, capacity: usize) -> Result<()> {
        if capacity < self.count {
            return Err(Error::argument("capacity", ArgumentFault::CapacityBelowCount));
        }
        check_capacity(capacity)?;
        let new_size = primes::get_prime(capacity);
        if new_size >= self.buckets.len() {
            return Ok(());
        }
        log::trace!(
            "trimming entry store from {} to {new_size} slots",
            self.buckets.len()
        );
        let old = mem::take(&mut self.entries);
        self.initialize(new_size);
        for slot in old {
            if let Slot::Occupied(mut entry) = slot {
                let index = self.entries.len();
                let bucket = self.bucket_of(entry.hash_code);
                entry.next = self.buckets[bucket];
                self.buckets[bucket] = Some(index);
                self.entries.push(Slot::Occupied(entry));
            }
        }
        self.bump_version();
        Ok(())
    }

    /// Re-links every live entry into `new_size` buckets, in slot order.
    /// Vacant slots keep their free-list links.
    fn resize(&mut self, new_size: usize) {
        debug_assert!(new_size >= self.entries.len());
        log::trace!(
            "resizing entry store from {} to {new_size} slots ({} live)",
            self.buckets.len(),
            self.count
        );
        let mut buckets = vec![None; new_size].into_boxed_slice();
        for (index, slot) in self.entries.iter_mut().enumerate() {
            if let Slot::Occupied(entry) = slot {
                let bucket = entry.hash_code as usize % new_size;
                entry.next = buckets[bucket];
                buckets[bucket] = Some(index);
            }
        }
        self.entries.reserve_exact(new_size - self.entries.len());
        self.buckets = buckets;
    }

    /// Walks the chain for `hash_code` and returns the slot whose key matches.
    fn find_with<F>(&self, hash_code: u32, matches: F) -> Option<usize>
    where
        F: Fn(&K) -> bool,
    {
        if self.buckets.is_empty() {
            return None;
        }
        let mut cursor = self.buckets[self.bucket_of(hash_code)];
        while let Some(index) = cursor {
            let entry = self.chained(index);
            if entry.hash_code == hash_code && matches(&entry.key) {
                return Some(index);
            }
            cursor = entry.next;
        }
        None
    }

    /// Links a new entry whose key is known to be absent; returns its slot.
    fn link_new(&mut self, hash_code: u32, key: K, value: V) -> usize {
        if self.buckets.is_empty() {
            self.initialize(0);
        }
        let index = match self.free_list {
            Some(free) => {
                self.free_list = match self.entries[free] {
                    Slot::Vacant { next_free } => next_free,
                    Slot::Occupied(_) => unreachable!("free list links only vacant slots"),
                };
                self.free_count -= 1;
                free
            }
            None => {
                if self.entries.len() == self.buckets.len() {
                    self.resize(primes::expand_prime(self.count));
                }
                self.entries.push(Slot::Vacant { next_free: None });
                self.entries.len() - 1
            }
        };
        let bucket = self.bucket_of(hash_code);
        self.entries[index] = Slot::Occupied(Entry {
            hash_code,
            next: self.buckets[bucket],
            key,
            value,
        });
        self.buckets[bucket] = Some(index);
        self.count += 1;
        debug_assert!(self.count + self.free_count <= self.entries.len());
        self.bump_version();
        index
    }

    fn overwrite(&mut self, index: usize, value: V) -> V {
        let entry = self.entries[index]
            .entry_mut()
            .expect("matched slot must be occupied");
        mem::replace(&mut entry.value, value)
    }

    /// Unlinks the matching entry, pushes its slot on the free list and
    /// returns the owned pair.
    fn remove_with<F>(&mut self, hash_code: u32, matches: F) -> Option<(K, V)>
    where
        F: Fn(&K) -> bool,
    {
        if self.buckets.is_empty() {
            return None;
        }
        let bucket = self.bucket_of(hash_code);
        let mut last: Option<usize> = None;
        let mut cursor = self.buckets[bucket];
        while let Some(index) = cursor {
            let entry = self.chained(index);
            let next = entry.next;
            if entry.hash_code == hash_code && matches(&entry.key) {
                match last {
                    None => self.buckets[bucket] = next,
                    Some(prev) => {
                        self.entries[prev]
                            .entry_mut()
                            .expect("bucket chains link only occupied slots")
                            .next = next;
                    }
                }
                let freed = mem::replace(
                    &mut self.entries[index],
                    Slot::Vacant {
                        next_free: self.free_list,
                    },
                );
                self.free_list = Some(index);
                self.free_count += 1;
                self.count -= 1;
                self.bump_version();
                return match freed {
                    Slot::Occupied(e) => Some((e.key, e.value)),
                    Slot::Vacant { .. } => unreachable!("matched slot must be occupied"),
                };
            }
            last = Some(index);
            cursor = next;
        }
        None
    }

    #[cfg(test)]
    fn assert_invariants(&self) {
        let cap = self.buckets.len();
        assert!(cap == 0 || primes::is_prime(cap), "capacity {cap} not prime");
        assert!(self.entries.len() <= cap);
        assert!(self.count + self.free_count <= self.entries.len());
        assert_eq!(
            self.entries.iter().filter(|s| s.entry().is_some()).count(),
            self.count
        );
        let mut reached = vec![0usize; self.entries.len()];
        for (bucket, head) in self.buckets.iter().enumerate() {
            let mut cursor = *head;
            while let Some(index) = cursor {
                let entry = self.chained(index);
                assert_eq!(entry.hash_code as usize % cap, bucket);
                reached[index] += 1;
                cursor = entry.next;
            }
        }
        for (index, slot) in self.entries.iter().enumerate() {
            let expected = usize::from(slot.entry().is_some());
            assert_eq!(reached[index], expected, "slot {index} reachability");
        }
        let mut free = 0;
        let mut cursor = self.free_list;
        while let Some(index) = cursor {
            match self.entries[index] {
                Slot::Vacant { next_free } => cursor = next_free,
                Slot::Occupied(_) => panic!("free list reaches occupied slot {index}"),
            }
            free += 1;
        }
        assert_eq!(free, self.free_count);
    }
}

impl<K, V, S> EntryStore<K, V, S> {
    pub(crate) fn new(strategy: S) -> Self {
        Self {
            strategy,
            table: RawTable::new(),
            id: next_store_id(),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub(crate) fn with_capacity(capacity: usize, strategy: S) -> Result<Self> {
        check_capacity(capacity)?;
        let mut store = Self::new(strategy);
        if capacity > 0 {
            store.table.initialize(capacity);
        }
        Ok(store)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.table.count
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.table.buckets.len()
    }

    #[inline]
    pub(crate) fn version(&self) -> u64 {
        self.table.version
    }

    /// Process-unique identity of this store; clones get a fresh one.
    #[inline]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub(crate) fn strategy(&self) -> &S {
        &self.strategy
    }

    /// All slots in enumeration order, vacant ones included.
    #[inline]
    pub(crate) fn slots(&self) -> &[Slot<K, V>] {
        &self.table.entries
    }

    #[inline]
    pub(crate) fn slots_mut(&mut self) -> &mut [Slot<K, V>] {
        &mut self.table.entries
    }

    pub(crate) fn into_slots(self) -> Vec<Slot<K, V>> {
        self.table.entries
    }

    #[inline]
    pub(crate) fn entry_at(&self, index: usize) -> Option<&Entry<K, V>> {
        self.table.entries.get(index).and_then(Slot::entry)
    }

    #[inline]
    pub(crate) fn entry_at_mut(&mut self, index: usize) -> Option<&mut Entry<K, V>> {
        self.table.entries.get_mut(index).and_then(Slot::entry_mut)
    }

    pub(crate) fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        self.table.clear();
    }

    /// Grows to at least `capacity` and returns the resulting capacity.
    pub(crate) fn ensure_capacity(&mut self, capacity: usize) -> Result<usize> {
        let _g = self.reentrancy.enter();
        self.table.ensure_capacity(capacity)
    }

    /// Compacts live entries into the smallest prime capacity `>= capacity`.
    pub(crate) fn trim_excess(&mut self, capacity: usize) -> Result<()> {
        let _g = self.reentrancy.enter();
        self.table.trim_excess(capacity)
    }

    #[cfg(test)]
    pub(crate) fn free_count(&self) -> usize {
        self.table.free_count
    }

    /// Checks every structural invariant; used by tests.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        self.table.assert_invariants();
    }
}

impl<K, V, S> EntryStore<K, V, S>
where
    S: KeyStrategy<K>,
{
    pub(crate) fn try_insert(
        &mut self,
        key: K,
        value: V,
        policy: DuplicatePolicy,
    ) -> InsertOutcome<V> {
        let _g = self.reentrancy.enter();
        let strategy = &self.strategy;
        let hash_code = strategy.hash(&key);
        let found = self.table.find_with(hash_code, |k| strategy.equals(k, &key));
        match (found, policy) {
            (Some(index), DuplicatePolicy::Overwrite) => {
                InsertOutcome::Overwrote(self.table.overwrite(index, value))
            }
            (Some(_), DuplicatePolicy::Reject) => InsertOutcome::RejectedDuplicate,
            (None, _) => {
                self.table.link_new(hash_code, key, value);
                InsertOutcome::Inserted
            }
        }
    }

    pub(crate) fn find(&self, key: &K) -> Option<usize> {
        let _g = self.reentrancy.enter();
        let strategy = &self.strategy;
        let hash_code = strategy.hash(key);
        self.table.find_with(hash_code, |k| strategy.equals(k, key))
    }

    pub(crate) fn remove(&mut self, key: &K) -> Option<(K, V)> {
        let _g = self.reentrancy.enter();
        let strategy = &self.strategy;
        let hash_code = strategy.hash(key);
        self.table.remove_with(hash_code, |k| strategy.equals(k, key))
    }

    /// Zero-copy insert: probes with `view` and only calls `make_key` when a
    /// new entry is actually linked in.
    pub(crate) fn try_insert_view<Q, FK, FV>(
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
        let _g = self.reentrancy.enter();
        let strategy = &self.strategy;
        let hash_code = strategy.hash_view(view);
        let found = self.table.find_with(hash_code, |k| strategy.equals_view(k, view));
        match (found, policy) {
            (Some(index), DuplicatePolicy::Overwrite) => {
                InsertOutcome::Overwrote(self.table.overwrite(index, make_value()))
            }
            (Some(_), DuplicatePolicy::Reject) => InsertOutcome::RejectedDuplicate,
            (None, _) => {
                let key = materialize(strategy, view, hash_code, make_key);
                self.table.link_new(hash_code, key, make_value());
                InsertOutcome::Inserted
            }
        }
    }

    /// Returns the slot for `view`, inserting a new entry when absent.
    pub(crate) fn find_or_insert_view<Q, FK, FV>(
        &mut self,
        view: &Q,
        make_key: FK,
        make_value: FV,
    ) -> usize
    where
        Q: ?Sized,
        S: ViewStrategy<K, Q>,
        FK: FnOnce(&Q) -> K,
        FV: FnOnce() -> V,
    {
        let _g = self.reentrancy.enter();
        let strategy = &self.strategy;
        let hash_code = strategy.hash_view(view);
        match self.table.find_with(hash_code, |k| strategy.equals_view(k, view)) {
            Some(index) => index,
            None => {
                let key = materialize(strategy, view, hash_code, make_key);
                self.table.link_new(hash_code, key, make_value())
            }
        }
    }

    pub(crate) fn find_view<Q>(&self, view: &Q) -> Option<usize>
    where
        Q: ?Sized,
        S: ViewStrategy<K, Q>,
    {
        let _g = self.reentrancy.enter();
        let strategy = &self.strategy;
        let hash_code = strategy.hash_view(view);
        self.table.find_with(hash_code, |k| strategy.equals_view(k, view))
    }

    pub(crate) fn remove_view<Q>(&mut self, view: &Q) -> Option<(K, V)>
    where
        Q: ?Sized,
        S: ViewStrategy<K, Q>,
    {
        let _g = self.reentrancy.enter();
        let strategy = &self.strategy;
        let hash_code = strategy.hash_view(view);
        self.table.remove_with(hash_code, |k| strategy.equals_view(k, view))
    }
}

fn materialize<K, Q, S, FK>(strategy: &S, view: &Q, hash_code: u32, make_key: FK) -> K
where
    Q: ?Sized,
    S: ViewStrategy<K, Q>,
    FK: FnOnce(&Q) -> K,
{
    let key = make_key(view);
    debug_assert!(
        strategy.hash(&key) == hash_code && strategy.equals_view(&key, view),
        "materialized key must hash and compare like its view"
    );
    key
}

impl<K: Clone, V: Clone, S: Clone> Clone for EntryStore<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            strategy: self.strategy.clone(),
            table: self.table.clone(),
            id: next_store_id(),
            reentrancy: DebugReentrancy::new(),
        }
    }
}
