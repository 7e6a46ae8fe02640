//! Dictionaries keyed by reference identity.

use crate::dictionary::Dictionary;
use crate::strategy::{Identity, ReferenceIdentityKeys};
use core::hash::BuildHasher;
use std::collections::hash_map::RandomState;

/// Dictionary whose keys are pointers compared by address.
///
/// Two keys pointing at equal but distinct objects are distinct keys. A
/// borrowed pointee (`&K::Target`) can be used to look entries up.
pub type IdentityDictionary<K, V, H = RandomState> = Dictionary<K, V, ReferenceIdentityKeys<H>>;

impl<K, V, H> Dictionary<K, V, ReferenceIdentityKeys<H>>
where
    K: Identity,
    H: BuildHasher,
{
    pub fn get_by_referent(&self, target: &K::Target) -> Option<&V> {
        self.get_view(target)
    }

    pub fn contains_referent(&self, target: &K::Target) -> bool {
        self.contains_view(target)
    }

    pub fn remove_referent(&mut self, target: &K::Target) -> Option<V> {
        self.remove_view(target)
    }
}
