//! Prime bucket counts and the growth policy.
//!
//! Bucket counts are never powers of two, which keeps the multiplicative
//! reduction in [`crate::hash_table::reduce`] from clustering on tables whose
//! size shares factors with the hash distribution.

use crate::error::Error;
use crate::error::Result;

/// Largest capacity the table will grow to. Dense indices are stored as `u32`
/// with `u32::MAX` reserved, so this stays well below that.
pub const MAX_PRIME: usize = 0x7FEF_FFFD;

/// Candidates found by trial division must not satisfy
/// `(candidate - 1) % HASH_PRIME == 0`.
pub const HASH_PRIME: usize = 101;

/// Precomputed primes, roughly 1.2x apart.
pub const PRIMES: [usize; 72] = [
    3, 7, 11, 17, 23, 29, 37, 47, 59, 71, 89, 107, 131, 163, 197, 239, 293, 353, 431, 521, 631,
    761, 919, 1103, 1327, 1597, 1931, 2333, 2801, 3371, 4049, 4861, 5839, 7013, 8419, 10103, 12143,
    14591, 17519, 21023, 25229, 30293, 36353, 43627, 52361, 62851, 75431, 90523, 108631, 130363,
    156437, 187751, 225307, 270371, 324449, 389357, 467237, 560689, 672827, 807403, 968897,
    1162687, 1395263, 1674319, 2009191, 2411033, 2893249, 3471899, 4166287, 4999559, 5999471,
    7199369,
];

/// Returns `true` if `candidate` is prime.
pub fn is_prime(candidate: usize) -> bool {
    if candidate & 1 == 0 {
        return candidate == 2;
    }
    if candidate < 3 {
        return false;
    }

    let mut divisor = 3;
    while divisor <= candidate / divisor {
        if candidate % divisor == 0 {
            return false;
        }
        divisor += 2;
    }
    true
}

/// Returns the smallest usable prime that is at least `min`.
///
/// Values covered by [`PRIMES`] come straight from the table. Larger requests
/// fall back to trial division over odd candidates, skipping any `p` with
/// `(p - 1) % 101 == 0`.
///
/// # Errors
///
/// [`Error::InvalidArgument`] if `min` is above [`MAX_PRIME`].
///
/// # Examples
///
/// ```rust
/// use dense_hash::primes::next_prime;
///
/// assert_eq!(next_prime(0).unwrap(), 3);
/// assert_eq!(next_prime(100).unwrap(), 107);
/// ```
pub fn next_prime(min: usize) -> Result<usize> {
    if min > MAX_PRIME {
        return Err(Error::InvalidArgument(
            "requested size exceeds the largest supported prime",
        ));
    }

    if let Some(&prime) = PRIMES.iter().find(|&&prime| prime >= min) {
        return Ok(prime);
    }

    let mut candidate = min | 1;
    while candidate < MAX_PRIME {
        if is_prime(candidate) && (candidate - 1) % HASH_PRIME != 0 {
            return Ok(candidate);
        }
        candidate += 2;
    }
    Ok(MAX_PRIME)
}

/// Returns the capacity to grow to from `old_capacity`: the next usable prime
/// at or above twice the old capacity, capped at [`MAX_PRIME`].
///
/// # Errors
///
/// [`Error::InvalidArgument`] once `old_capacity` has already reached
/// [`MAX_PRIME`].
pub fn expand(old_capacity: usize) -> Result<usize> {
    let doubled = old_capacity.saturating_mul(2);
    if doubled > MAX_PRIME && MAX_PRIME > old_capacity {
        return Ok(MAX_PRIME);
    }
    next_prime(doubled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_and_prime() {
        for pair in PRIMES.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        for prime in PRIMES {
            assert!(is_prime(prime), "{prime} is not prime");
        }
        assert!(is_prime(MAX_PRIME));
    }

    #[test]
    fn is_prime_small_values() {
        let primes: alloc::vec::Vec<usize> = (0..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, [2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn next_prime_from_table() {
        assert_eq!(next_prime(0), Ok(3));
        assert_eq!(next_prime(1), Ok(3));
        assert_eq!(next_prime(3), Ok(3));
        assert_eq!(next_prime(4), Ok(7));
        assert_eq!(next_prime(7199369), Ok(7199369));
    }

    #[test]
    fn next_prime_falls_back_to_trial_division() {
        let prime = next_prime(7199370).unwrap();
        assert!(prime >= 7199370);
        assert!(is_prime(prime));
        assert_ne!((prime - 1) % HASH_PRIME, 0);
        assert!((7199370..prime).all(|n| !is_prime(n) || (n - 1) % HASH_PRIME == 0));
    }

    #[test]
    fn fallback_skips_hash_prime_resonance() {
        let resonant = (7199371..7_300_000)
            .step_by(2)
            .find(|&n| is_prime(n) && (n - 1) % HASH_PRIME == 0)
            .expect("no resonant prime in range");

        let chosen = next_prime(resonant).unwrap();
        assert!(chosen > resonant);
        assert!(is_prime(chosen));
        assert_ne!((chosen - 1) % HASH_PRIME, 0);
    }

    #[test]
    fn next_prime_rejects_oversized_requests() {
        assert!(matches!(
            next_prime(MAX_PRIME + 1),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(next_prime(MAX_PRIME), Ok(MAX_PRIME));
    }

    #[test]
    fn expand_doubles_then_rounds_to_prime() {
        assert_eq!(expand(1), Ok(3));
        assert_eq!(expand(3), Ok(7));
        assert_eq!(expand(7), Ok(17));
        assert_eq!(expand(100), Ok(239));
    }

    #[test]
    fn expand_caps_at_max_prime() {
        assert_eq!(expand(MAX_PRIME / 2 + 1), Ok(MAX_PRIME));
        assert!(expand(MAX_PRIME).is_err());
    }
}
