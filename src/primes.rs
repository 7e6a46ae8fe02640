//! Prime capacities for the entry store.
//!
//! Bucket counts are always prime so that `hash % capacity` stays well
//! spread even when hashes share arithmetic structure.

/// Largest prime below the largest array length the store will allocate.
pub(crate) const MAX_PRIME_ARRAY_LENGTH: usize = 0x7FFF_FFC3;

/// Primes whose successive entries grow by roughly 1.2x.
const PRIMES: [usize; 72] = [
    3, 7, 11, 17, 23, 29, 37, 47, 59, 71, 89, 107, 131, 163, 197, 239, 293, 353, 431, 521, 631,
    761, 919, 1103, 1327, 1597, 1931, 2333, 2801, 3371, 4049, 4861, 5839, 7013, 8419, 10103,
    12143, 14591, 17519, 21023, 25229, 30293, 36353, 43627, 52361, 62851, 75431, 90523, 108631,
    130363, 156437, 187751, 225307, 270371, 324449, 389357, 467237, 560689, 672827, 807403,
    968897, 1162687, 1395263, 1674319, 2009191, 2411033, 2893249, 3471899, 4166287, 4999559,
    5999471, 7199369,
];

// Candidates `p` with `(p - 1) % HASH_PRIME == 0` are skipped outside the table.
const HASH_PRIME: usize = 101;

pub(crate) fn is_prime(candidate: usize) -> bool {
    if candidate & 1 == 0 {
        return candidate == 2;
    }
    let mut divisor = 3;
    while divisor * divisor <= candidate {
        if candidate % divisor == 0 {
            return false;
        }
        divisor += 2;
    }
    candidate != 1
}

/// Smallest usable prime `>= min`.
///
/// `min` must not exceed [`MAX_PRIME_ARRAY_LENGTH`]; the store rejects
/// larger capacities before getting here.
pub(crate) fn get_prime(min: usize) -> usize {
    debug_assert!(min <= MAX_PRIME_ARRAY_LENGTH, "capacity {min} out of range");
    if let Some(&p) = PRIMES.iter().find(|&&p| p >= min) {
        return p;
    }
    let mut candidate = min | 1;
    while candidate < MAX_PRIME_ARRAY_LENGTH {
        if is_prime(candidate) && (candidate - 1) % HASH_PRIME != 0 {
            return candidate;
        }
        candidate += 2;
    }
    MAX_PRIME_ARRAY_LENGTH
}

/// Capacity to grow to when a store holding `old_size` entries is full.
pub(crate) fn expand_prime(old_size: usize) -> usize {
    let new_size = old_size.saturating_mul(2);
    if new_size > MAX_PRIME_ARRAY_LENGTH && MAX_PRIME_ARRAY_LENGTH > old_size {
        return MAX_PRIME_ARRAY_LENGTH;
    }
    get_prime(new_size)
}
