//! Prime utilities: primality testing and NTT-friendly prime generation
//! (spec §4.1).

use crate::word::mod_exp;

/// Deterministic Miller–Rabin witnesses that certify primality for every
/// `u64` (Pomerance, Selfridge & Wagstaff / Jaeschke): testing base `a`
/// against these twelve witnesses is exact for all candidates below
/// `3,317,044,064,679,887,385,961,981`, which covers the full 64-bit range.
const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Miller–Rabin primality test, deterministic for the full `u64` range.
pub fn is_prime(q: u64) -> bool {
    if q < 2 {
        return false;
    }
    for &p in &[2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
        if q == p {
            return true;
        }
        if q % p == 0 {
            return false;
        }
    }

    let mut d = q - 1;
    let mut r = 0u32;
    while d & 1 == 0 {
        d >>= 1;
        r += 1;
    }

    'witness: for &a in &WITNESSES {
        if a >= q {
            continue;
        }
        let mut x = mod_exp(a, d, q);
        if x == 1 || x == q - 1 {
            continue;
        }
        for _ in 1..r {
            x = mod_exp(x, 2, q);
            if x == q - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Find a primitive `nth_root`-th root of unity modulo the prime `q`.
///
/// Requires `nth_root | (q - 1)`. Searches small candidate generators `g`
/// and raises each to `(q-1)/nth_root`, accepting the first whose order is
/// exactly `nth_root` (checked by confirming `g^(nth_root/2) != 1` for every
/// prime factor 2 component, which for a power-of-two `nth_root` reduces to
/// a single check against `nth_root/2`).
pub fn primitive_nth_root(q: u64, nth_root: u64) -> Option<u64> {
    if (q - 1) % nth_root != 0 {
        return None;
    }
    let exp = (q - 1) / nth_root;
    for g in 2u64..q {
        let candidate = mod_exp(g, exp, q);
        if candidate == 0 || candidate == 1 {
            continue;
        }
        // nth_root is a power of two (2N or 4N with N a power of two), so
        // the only nontrivial divisor to rule out is nth_root/2.
        if mod_exp(candidate, nth_root / 2, q) != q - 1 {
            continue;
        }
        return Some(candidate);
    }
    None
}

/// Generate `count` distinct primes of bit-length `log_q` satisfying
/// `q ≡ 1 (mod nth_root)`, searching outward from `2^log_q` by `nth_root`
/// steps alternately upward and downward (spec §4.1).
///
/// Returns `None` if fewer than `count` candidates are found before the
/// search runs past a bounded number of steps in both directions.
pub fn generate_ntt_primes(log_q: u32, nth_root: u64, count: usize) -> Option<Vec<u64>> {
    const MAX_STEPS: u64 = 1 << 20;

    let center: u64 = 1u64 << log_q;
    // round up to the first candidate >= center congruent to 1 mod nth_root
    let mut up = center + ((nth_root - (center % nth_root)) % nth_root) + 1;
    if up <= center {
        up += nth_root;
    }
    let mut down = up - nth_root;

    let mut found = Vec::with_capacity(count);
    let mut steps = 0u64;
    loop {
        if found.len() >= count {
            break;
        }
        if steps >= MAX_STEPS {
            break;
        }
        if up.leading_zeros() >= 2 && is_prime(up) && primitive_nth_root(up, nth_root).is_some() {
            found.push(up);
        }
        up += nth_root;
        if found.len() >= count {
            break;
        }
        if down > nth_root && is_prime(down) && primitive_nth_root(down, nth_root).is_some() {
            found.push(down);
        }
        down = down.saturating_sub(nth_root);
        steps += 1;
    }

    found.sort_unstable();
    found.dedup();
    if found.len() >= count {
        found.truncate(count);
        Some(found)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_primes() {
        assert!(is_prime(2));
        assert!(is_prime(97));
        assert!(is_prime(12289));
        assert!(is_prime(1073741827));
        assert!(!is_prime(1));
        assert!(!is_prime(0));
        assert!(!is_prime(1073741827 * 3));
    }

    #[test]
    fn composite_near_prime() {
        assert!(!is_prime(97 * 97));
        assert!(!is_prime(561)); // Carmichael number
        assert!(!is_prime(41041)); // Carmichael number
    }

    #[test]
    fn finds_2n_th_root_for_ntt_prime() {
        let nth_root = 32u64; // N = 16
        assert!((12289 - 1) % nth_root == 0);
        let root = primitive_nth_root(12289, nth_root).expect("root exists");
        assert_eq!(mod_exp(root, nth_root, 12289), 1);
        assert_ne!(mod_exp(root, nth_root / 2, 12289), 1);
    }

    #[test]
    fn generates_requested_prime_count() {
        let nth_root = 32u64;
        let primes = generate_ntt_primes(30, nth_root, 3).expect("enough primes found");
        assert_eq!(primes.len(), 3);
        for p in primes {
            assert!(is_prime(p));
            assert_eq!((p - 1) % nth_root, 0);
        }
    }
}
