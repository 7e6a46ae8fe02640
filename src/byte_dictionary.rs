//! Dictionaries keyed by byte sequences.

use crate::dictionary::Dictionary;
use crate::entry_store::{DuplicatePolicy, InsertOutcome};
use crate::error::{Error, Result};
use crate::strategy::ByteSequenceKeys;
use core::borrow::Borrow;
use core::hash::BuildHasher;
use std::collections::hash_map::RandomState;

/// Dictionary with byte-sequence keys compared by content.
///
/// Lookups take a plain `&[u8]` and never allocate; an owned key is built
/// from the slice only when a new entry is inserted.
pub type ByteDictionary<V, K = Box<[u8]>, H = RandomState> = Dictionary<K, V, ByteSequenceKeys<H>>;

impl<K, V, H> Dictionary<K, V, ByteSequenceKeys<H>>
where
    K: Borrow<[u8]> + for<'a> From<&'a [u8]>,
    H: BuildHasher,
{
    pub fn get_bytes(&self, key: &[u8]) -> Option<&V> {
        self.get_view(key)
    }

    pub fn get_bytes_mut(&mut self, key: &[u8]) -> Option<&mut V> {
        self.get_view_mut(key)
    }

    pub fn contains_bytes(&self, key: &[u8]) -> bool {
        self.contains_view(key)
    }

    pub fn remove_bytes(&mut self, key: &[u8]) -> Option<V> {
        self.remove_view(key)
    }

    /// Inserts or overwrites; returns the previous value.
    pub fn insert_bytes(&mut self, key: &[u8], value: V) -> Option<V> {
        let policy = DuplicatePolicy::Overwrite;
        match self.try_insert_view(key, |k: &[u8]| K::from(k), move || value, policy) {
            InsertOutcome::Overwrote(old) => Some(old),
            InsertOutcome::Inserted | InsertOutcome::RejectedDuplicate => None,
        }
    }

    /// Inserts a new key; `KeyConflict` if it is already present.
    pub fn add_bytes(&mut self, key: &[u8], value: V) -> Result<()> {
        let policy = DuplicatePolicy::Reject;
        match self.try_insert_view(key, |k: &[u8]| K::from(k), move || value, policy) {
            InsertOutcome::Inserted => Ok(()),
            InsertOutcome::RejectedDuplicate | InsertOutcome::Overwrote(_) => {
                Err(Error::KeyConflict)
            }
        }
    }

    pub fn get_or_insert_bytes_with<F>(&mut self, key: &[u8], make_value: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        self.get_or_insert_view_with(key, make_value)
    }
}
