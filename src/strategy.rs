//! Key strategies: how a dictionary hashes and compares its keys.
//!
//! A strategy is a compile-time parameter of `Dictionary`, so every variant
//! gets its own monomorphized table with no per-comparison indirection.
//! Strategies that understand a borrowed *view* of a key (for example a
//! byte slice standing in for an owned byte buffer) also implement
//! [`ViewStrategy`], which lets the table probe without materializing a key.

use core::any::{type_name, Any, TypeId};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use hashbrown::Equivalent;
use std::collections::hash_map::RandomState;
use std::rc::Rc;
use std::sync::Arc;

/// Hash and equality for stored keys of type `K`.
pub trait KeyStrategy<K: ?Sized> {
    fn hash(&self, key: &K) -> u32;
    fn equals(&self, stored: &K, other: &K) -> bool;
}

/// Zero-copy comparison of a borrowed view `Q` against stored keys `K`.
///
/// For any view `q` and the key `k` it would materialize into,
/// `hash_view(q) == hash(&k)` and `equals_view(s, q) == equals(s, &k)`
/// must hold for every stored key `s`.
pub trait ViewStrategy<K, Q: ?Sized>: KeyStrategy<K> {
    fn hash_view(&self, view: &Q) -> u32;
    fn equals_view(&self, stored: &K, view: &Q) -> bool;
}

#[inline]
fn fold(hash: u64) -> u32 {
    (hash as u32) ^ ((hash >> 32) as u32)
}

/// Structural equality over the contents of byte sequences.
///
/// Works for any owned key that borrows as `[u8]` (`Box<[u8]>`, `Vec<u8>`,
/// `Rc<[u8]>`, ...); lookups can be made with a plain `&[u8]`.
#[derive(Clone, Debug, Default)]
pub struct ByteSequenceKeys<H = RandomState> {
    hasher: H,
}

impl<H> ByteSequenceKeys<H> {
    pub fn with_hasher(hasher: H) -> Self {
        Self { hasher }
    }
}

impl<H: BuildHasher> ByteSequenceKeys<H> {
    #[inline]
    fn hash_bytes(&self, bytes: &[u8]) -> u32 {
        fold(self.hasher.hash_one(bytes))
    }
}

impl<K, H> KeyStrategy<K> for ByteSequenceKeys<H>
where
    K: Borrow<[u8]>,
    H: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        self.hash_bytes(key.borrow())
    }

    #[inline]
    fn equals(&self, stored: &K, other: &K) -> bool {
        stored.borrow() == other.borrow()
    }
}

impl<K, H> ViewStrategy<K, [u8]> for ByteSequenceKeys<H>
where
    K: Borrow<[u8]>,
    H: BuildHasher,
{
    #[inline]
    fn hash_view(&self, view: &[u8]) -> u32 {
        self.hash_bytes(view)
    }

    #[inline]
    fn equals_view(&self, stored: &K, view: &[u8]) -> bool {
        view.equivalent(stored)
    }
}

/// Key identifying a Rust type.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Diagnostic name; not part of the key's identity.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Type identity: two keys match when they describe the same type.
#[derive(Clone, Debug, Default)]
pub struct TypeIdentityKeys<H = RandomState> {
    hasher: H,
}

impl<H> TypeIdentityKeys<H> {
    pub fn with_hasher(hasher: H) -> Self {
        Self { hasher }
    }
}

impl<H: BuildHasher> KeyStrategy<TypeKey> for TypeIdentityKeys<H> {
    #[inline]
    fn hash(&self, key: &TypeKey) -> u32 {
        fold(self.hasher.hash_one(key.id))
    }

    #[inline]
    fn equals(&self, stored: &TypeKey, other: &TypeKey) -> bool {
        stored.id == other.id
    }
}

/// Pointer-like keys whose identity is the address they point at.
pub trait Identity {
    /// The pointee; a `&Target` is a valid lookup view for the key.
    type Target: ?Sized;

    fn identity(&self) -> *const ();
}

impl<T: ?Sized> Identity for Rc<T> {
    type Target = T;

    fn identity(&self) -> *const () {
        Rc::as_ptr(self).cast()
    }
}

impl<T: ?Sized> Identity for Arc<T> {
    type Target = T;

    fn identity(&self) -> *const () {
        Arc::as_ptr(self).cast()
    }
}

impl<T: ?Sized> Identity for &T {
    type Target = T;

    fn identity(&self) -> *const () {
        (*self as *const T).cast()
    }
}

/// Reference identity: keys match only when they point at the same object,
/// regardless of any `Eq`/`Hash` the pointee implements.
#[derive(Clone, Debug, Default)]
pub struct ReferenceIdentityKeys<H = RandomState> {
    hasher: H,
}

impl<H> ReferenceIdentityKeys<H> {
    pub fn with_hasher(hasher: H) -> Self {
        Self { hasher }
    }
}

impl<K, H> KeyStrategy<K> for ReferenceIdentityKeys<H>
where
    K: Identity,
    H: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        fold(self.hasher.hash_one(key.identity() as usize))
    }

    #[inline]
    fn equals(&self, stored: &K, other: &K) -> bool {
        core::ptr::eq(stored.identity(), other.identity())
    }
}

impl<K, H> ViewStrategy<K, K::Target> for ReferenceIdentityKeys<H>
where
    K: Identity,
    H: BuildHasher,
{
    #[inline]
    fn hash_view(&self, view: &K::Target) -> u32 {
        let addr: *const () = (view as *const K::Target).cast();
        fold(self.hasher.hash_one(addr as usize))
    }

    #[inline]
    fn equals_view(&self, stored: &K, view: &K::Target) -> bool {
        core::ptr::eq(stored.identity(), (view as *const K::Target).cast::<()>())
    }
}
