//! Dictionaries keyed by Rust types.

use crate::dictionary::Dictionary;
use crate::error::Result;
use crate::strategy::{TypeIdentityKeys, TypeKey};
use core::any::Any;
use core::hash::BuildHasher;
use std::collections::hash_map::RandomState;

/// Dictionary keyed by type identity, e.g. a registry of per-type handlers.
pub type TypeDictionary<V, H = RandomState> = Dictionary<TypeKey, V, TypeIdentityKeys<H>>;

impl<V, H: BuildHasher> Dictionary<TypeKey, V, TypeIdentityKeys<H>> {
    pub fn insert_type<T: ?Sized + Any>(&mut self, value: V) -> Option<V> {
        self.insert(TypeKey::of::<T>(), value)
    }

    pub fn add_type<T: ?Sized + Any>(&mut self, value: V) -> Result<()> {
        self.add(TypeKey::of::<T>(), value)
    }

    pub fn get_type<T: ?Sized + Any>(&self) -> Option<&V> {
        self.get(&TypeKey::of::<T>())
    }

    pub fn get_type_mut<T: ?Sized + Any>(&mut self) -> Option<&mut V> {
        self.get_mut(&TypeKey::of::<T>())
    }

    pub fn contains_type<T: ?Sized + Any>(&self) -> bool {
        self.contains_key(&TypeKey::of::<T>())
    }

    pub fn remove_type<T: ?Sized + Any>(&mut self) -> Option<V> {
        self.remove(&TypeKey::of::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use test_log::test;

    #[test]
    fn distinct_types_are_distinct_keys() {
        let mut d: TypeDictionary<&'static str> = TypeDictionary::new();
        assert_eq!(d.insert_type::<u32>("u32"), None);
        d.insert_type::<i32>("i32");
        d.insert_type::<str>("str");
        d.insert_type::<[u8]>("bytes");
        assert_eq!(d.add_type::<u32>("again"), Err(Error::KeyConflict));
        assert_eq!(d.get_type::<u32>(), Some(&"u32"));
        assert_eq!(d.get_type::<str>(), Some(&"str"));
        assert!(!d.contains_type::<String>());
        assert_eq!(d.remove_type::<i32>(), Some("i32"));
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn keys_print_type_names() {
        let mut d: TypeDictionary<u8> = TypeDictionary::new();
        d.insert_type::<bool>(1);
        *d.get_type_mut::<bool>().unwrap() += 1;
        assert_eq!(format!("{d:?}"), "{bool: 2}");
    }
}
