#![cfg(test)]

// Property tests for the entry store, driven through `Dictionary` and kept
// inside the crate so they can check the store's structural invariants.

use crate::dictionary::Dictionary;
use crate::entry_store::{DuplicatePolicy, InsertOutcome};
use crate::error::Error;
use crate::primes;
use crate::strategy::{ByteSequenceKeys, KeyStrategy};
use core::hash::{BuildHasher, Hasher};
use hashbrown::HashMap;
use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::hash_map::RandomState;
use std::collections::BTreeSet;
use std::rc::Rc;

// Pool-indexed operations so shrinking moves towards earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    Add(usize, i32),
    InsertView(usize, i32),
    Remove(usize),
    RemoveView(usize),
    Find(usize),
    Contains(Vec<u8>),
    Mutate(usize, i32),
    Iterate,
    Clear,
    Trim,
    Reserve(usize),
}

fn arb_scenario() -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<Op>)> {
    let pool = proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..4), 1..=12);
    pool.prop_flat_map(|pool| {
        let idx = 0..pool.len();
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Add(i, v)),
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::InsertView(i, v)),
            3 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::RemoveView),
            2 => idx.clone().prop_map(Op::Find),
            1 => proptest::collection::vec(any::<u8>(), 0..4).prop_map(Op::Contains),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => Just(Op::Iterate),
            1 => Just(Op::Clear),
            1 => Just(Op::Trim),
            1 => (0usize..64).prop_map(Op::Reserve),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// State-machine equivalence against a hashbrown::HashMap model.
// Invariants exercised after every operation:
// - Contents, `len` and membership match the model.
// - Capacity is 0 or prime and never below `len`.
// - Every live entry is reachable exactly once from its bucket; the free
//   list only links vacant slots.
// - Overwrites leave outstanding enumerators valid; structural mutations
//   invalidate them.
fn run_state_machine<H>(hasher: H, pool: Vec<Vec<u8>>, ops: Vec<Op>) -> Result<(), TestCaseError>
where
    H: BuildHasher,
{
    let mut sut: Dictionary<Vec<u8>, i32, ByteSequenceKeys<H>> =
        Dictionary::with_strategy(ByteSequenceKeys::with_hasher(hasher));
    let mut model: HashMap<Vec<u8>, i32> = HashMap::new();

    for op in ops {
        let mut watcher = sut.enumerator();
        let mut structural = false;
        match op {
            Op::Insert(i, v) => {
                let k = pool[i].clone();
                let old = sut.insert(k.clone(), v);
                structural = old.is_none();
                prop_assert_eq!(old, model.insert(k, v));
            }
            Op::Add(i, v) => {
                let k = pool[i].clone();
                let already = model.contains_key(&k);
                match sut.add(k.clone(), v) {
                    Ok(()) => {
                        prop_assert!(!already, "add must fail on duplicate");
                        model.insert(k, v);
                        structural = true;
                    }
                    Err(Error::KeyConflict) => prop_assert!(already),
                    Err(e) => prop_assert!(false, "unexpected error {e}"),
                }
            }
            Op::InsertView(i, v) => {
                let k = &pool[i];
                let made = RefCell::new(0);
                let outcome = sut.try_insert_view(
                    &k[..],
                    |view: &[u8]| {
                        *made.borrow_mut() += 1;
                        view.to_vec()
                    },
                    || v,
                    DuplicatePolicy::Overwrite,
                );
                match outcome {
                    InsertOutcome::Inserted => {
                        prop_assert_eq!(*made.borrow(), 1);
                        prop_assert!(model.insert(k.clone(), v).is_none());
                        structural = true;
                    }
                    InsertOutcome::Overwrote(old) => {
                        prop_assert_eq!(*made.borrow(), 0, "overwrite must not build a key");
                        prop_assert_eq!(Some(old), model.insert(k.clone(), v));
                    }
                    InsertOutcome::RejectedDuplicate => {
                        prop_assert!(false, "overwrite never rejects")
                    }
                }
            }
            Op::Remove(i) => {
                let removed = sut.remove_entry(&pool[i]);
                structural = removed.is_some();
                prop_assert_eq!(removed, model.remove_entry(&pool[i]));
            }
            Op::RemoveView(i) => {
                let removed = sut.remove_view(&pool[i][..]);
                structural = removed.is_some();
                prop_assert_eq!(removed, model.remove(&pool[i]));
            }
            Op::Find(i) => {
                prop_assert_eq!(sut.get(&pool[i]), model.get(&pool[i]));
                prop_assert_eq!(sut.get_view(&pool[i][..]), model.get(&pool[i]));
            }
            Op::Contains(k) => {
                prop_assert_eq!(sut.contains_view(&k[..]), model.contains_key(&k));
            }
            Op::Mutate(i, d) => {
                if let Some(v) = sut.get_mut(&pool[i]) {
                    *v = v.wrapping_add(d);
                }
                if let Some(v) = model.get_mut(&pool[i]) {
                    *v = v.wrapping_add(d);
                }
            }
            Op::Iterate => {
                let mut seen = BTreeSet::new();
                let mut e = sut.enumerator();
                while e.move_next(&sut).map_err(|e| TestCaseError::fail(e.to_string()))? {
                    let (k, v) = e.current(&sut).expect("positioned");
                    prop_assert_eq!(model.get(k), Some(v));
                    prop_assert!(seen.insert(k.clone()), "key yielded twice");
                }
                prop_assert_eq!(seen.len(), model.len());
            }
            Op::Clear => {
                sut.clear();
                model.clear();
                structural = true;
            }
            Op::Trim => {
                let before = sut.capacity();
                sut.trim_excess().map_err(|e| TestCaseError::fail(e.to_string()))?;
                structural = sut.capacity() != before;
            }
            Op::Reserve(n) => {
                let cap = sut
                    .ensure_capacity(n)
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                prop_assert!(cap >= n);
                prop_assert_eq!(cap, sut.capacity());
            }
        }

        sut.store().assert_invariants();
        let cap = sut.capacity();
        prop_assert!(cap == 0 || primes::is_prime(cap), "capacity {} not prime", cap);
        prop_assert!(sut.len() <= cap);
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(watcher.move_next(&sut).is_err(), structural);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 96, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(RandomState::new(), pool, ops)?;
    }
}

// Collision variant using a constant hasher so every key shares one chain.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(ConstBuildHasher, pool, ops)?;
    }
}

// Strategy whose hashing calls a hook, used to re-enter the dictionary.
type Hook = Rc<RefCell<Option<Box<dyn Fn()>>>>;

#[derive(Clone, Default)]
struct HookKeys {
    hook: Hook,
}

impl KeyStrategy<u32> for HookKeys {
    fn hash(&self, key: &u32) -> u32 {
        if let Some(hook) = self.hook.borrow().as_ref() {
            hook();
        }
        *key
    }

    fn equals(&self, stored: &u32, other: &u32) -> bool {
        stored == other
    }
}

#[cfg(debug_assertions)]
#[test]
fn reentrant_lookup_from_strategy_panics_in_debug() {
    let hook: Hook = Rc::default();
    let mut d: Dictionary<u32, u32, HookKeys> = Dictionary::with_strategy(HookKeys {
        hook: Rc::clone(&hook),
    });
    d.insert(1, 1);

    let ptr: *const Dictionary<u32, u32, HookKeys> = &d;
    *hook.borrow_mut() = Some(Box::new(move || {
        // SAFETY: only shared access, `d` outlives the hook call below.
        let _ = unsafe { (*ptr).contains_key(&1) };
    }));
    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| d.contains_key(&2)));
    assert!(res.is_err(), "expected nested entry to panic in debug builds");

    *hook.borrow_mut() = None;
    assert_eq!(d.get(&1), Some(&1), "store stays usable after the panic");
    d.store().assert_invariants();
}
