//! keyed-dict: single-threaded dictionaries keyed by byte sequences, by
//! type identity and by reference identity, sharing one hash-table engine.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one table implementation behind several key disciplines, with
//!   the full contract of a general-purpose mutable map (versioned
//!   enumeration, read-only views, loosely-typed access) and lookups by a
//!   borrowed view of a key that never allocate.
//! - Layers:
//!   - EntryStore<K, V, S>: chained hash table over flat arrays. Buckets
//!     hold the index of a chain head; entries link to each other by index;
//!     removed slots go on a free list that inserts drain before the entry
//!     array grows. Includes a debug-only reentrancy guard.
//!   - Dictionary<K, V, S>: typed public API over the store. Translates
//!     store outcomes into `Result`s and owns no table logic.
//!   - Views, enumerators and the legacy adapter: built on `Dictionary`
//!     only.
//!   - ByteDictionary, TypeDictionary, IdentityDictionary: aliases of
//!     `Dictionary` fixing the key strategy, plus a few convenience
//!     methods.
//!
//! Key strategies
//! - `S: KeyStrategy<K>` supplies `hash -> u32` and `equals`. A strategy
//!   that also implements `ViewStrategy<K, Q>` can probe with `&Q` (e.g.
//!   `&[u8]` for owned byte buffers) and materialize `K` from the view only
//!   when a new entry is linked in.
//! - Each entry caches its hash; resizes never call back into the strategy.
//!
//! Capacity
//! - Capacity is 0 until storage is first needed, and prime afterwards.
//!   Automatic growth picks the smallest table prime at least twice the
//!   count. `trim_excess` compacts live entries into a smaller prime.
//! - Capacity requests above the largest table prime are rejected with
//!   `InvalidArgument` rather than clamped.
//!
//! Versions and enumeration
//! - Insert, remove, clear and a shrinking trim bump the version; value
//!   overwrites and `ensure_capacity` do not.
//! - Borrowing iterators (`iter`, `iter_mut`, ...) need no version check.
//!   Detached enumerators hold no borrow and take the dictionary on every
//!   call; they fail with `InvalidState` once the version moved, or when
//!   handed a dictionary other than the one that created them (each store
//!   carries a process-unique id, fresh for clones).
//! - Enumeration order is slot order: insertion order, except that a slot
//!   freed by a removal is reused by the next insert.
//!
//! Reentrancy
//! - Store entry points that run user code (hashers, strategies, key and
//!   value factories) take a debug-only guard. Re-entering the same
//!   dictionary from such code panics in debug builds.
//!
//! Notes and non-goals
//! - Single-threaded: dictionaries are `!Send`/`!Sync`.
//! - No persistence or serialization.
//! - Errors are values of [`Error`]; internal invariant violations panic.

mod byte_dictionary;
mod dictionary;
mod entry_store;
mod entry_store_proptest;
mod enumerator;
mod error;
mod identity_dictionary;
pub mod legacy;
mod primes;
mod reentrancy;
pub mod strategy;
mod type_dictionary;
pub mod views;

// Public surface
pub use byte_dictionary::ByteDictionary;
pub use dictionary::Dictionary;
pub use entry_store::{DuplicatePolicy, InsertOutcome};
pub use enumerator::{Enumerator, IntoIter, Iter, IterMut, ResettableEnumerator, ValuesMut};
pub use error::{ArgumentFault, Error, Result, StateFault};
pub use identity_dictionary::IdentityDictionary;
pub use legacy::{ObjectCollection, ObjectDictionary};
pub use strategy::{
    ByteSequenceKeys, Identity, KeyStrategy, ReferenceIdentityKeys, TypeIdentityKeys, TypeKey,
    ViewStrategy,
};
pub use type_dictionary::TypeDictionary;
pub use views::{Keys, ReadOnlyCollection, Values};
