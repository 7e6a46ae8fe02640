//! Nested-entry detection for the entry store.
//!
//! Hashing, key comparison and the key and value factories all run user
//! code while a bucket chain or the free list can be half rewired. If that
//! code calls back into the same dictionary, debug builds panic at the
//! nested call instead of letting it observe the torn structure. Release
//! builds keep only the `!Send` marker.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;

/// Tracks whether a store operation is in progress. Store entry points
/// open a section with `let _g = self.reentrancy.enter();`.
#[derive(Debug)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    active: Cell<bool>,
    // Raw pointer marker: stores are confined to one thread.
    _nosend: PhantomData<*mut ()>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(false),
            _nosend: PhantomData,
        }
    }

    /// Opens a section that lasts until the returned guard drops.
    #[inline]
    pub(crate) fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            let nested = self.active.replace(true);
            assert!(
                !nested,
                "dictionary re-entered from its own hasher, strategy or factory"
            );
            ReentrancyGuard { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            ReentrancyGuard { _z: PhantomData }
        }
    }
}

/// Closes its section on drop, including during unwinding.
pub(crate) struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let was_active = self.owner.active.replace(false);
            debug_assert!(was_active);
        }
    }
}
