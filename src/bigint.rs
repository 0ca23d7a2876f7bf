//! Big-integer interop at the RNS boundary (spec §9 "Big-integer interop").
//!
//! The CRT representation this crate operates on is a vector of per-prime
//! residues; reconstructing or decomposing the big integer those residues
//! represent needs arbitrary-precision arithmetic, which this crate already
//! pulls in (`num-bigint`) for the one-off Barrett/Montgomery constant
//! precomputation in [`crate::word`]. Rather than committing callers to a
//! specific bignum crate for every large-scalar need (key generation,
//! plaintext encoding, and similar concerns it does not own), this module
//! exposes a narrow capability: reduce an arbitrary big integer against a
//! prime chain, and reconstruct one from its per-prime residues via CRT.

use num_bigint::BigUint;
use num_traits::Zero;

/// Reduce `value` modulo each prime in `moduli`, in chain order.
///
/// `out.len()` must equal `moduli.len()`; each residue is written in plain
/// (non-Montgomery) form, matching [`crate::ring::Ring::mul_scalar`]'s input
/// convention.
pub fn to_u64_residues(value: &BigUint, moduli: &[u64], out: &mut [u64]) {
    debug_assert_eq!(out.len(), moduli.len());
    for (o, &q) in out.iter_mut().zip(moduli.iter()) {
        *o = (value % BigUint::from(q)).to_u64_digits().first().copied().unwrap_or(0);
    }
}

/// Reconstruct the unique `value < prod(moduli)` whose residues (in chain
/// order) are `residues`, via the standard CRT garner-free formula:
/// `value = sum_i residues[i] * M_i * (M_i^{-1} mod q_i) mod M`, where
/// `M_i = M / q_i`.
///
/// Not constant-time or asymptotically fast — this runs once per
/// reconstruction (e.g. decrypting a final result), never inside an
/// arithmetic hot loop.
pub fn from_u64_residues(residues: &[u64], moduli: &[u64]) -> BigUint {
    debug_assert_eq!(residues.len(), moduli.len());
    if moduli.is_empty() {
        return BigUint::zero();
    }
    let m: BigUint = moduli.iter().map(|&q| BigUint::from(q)).product();
    let mut acc = BigUint::zero();
    for (&r, &q) in residues.iter().zip(moduli.iter()) {
        let qb = BigUint::from(q);
        let mi = &m / &qb;
        let mi_inv = mod_inverse(&mi, &qb);
        acc += BigUint::from(r) * &mi * mi_inv;
    }
    acc % &m
}

/// Modular inverse of `a mod m` via the extended Euclidean algorithm on
/// signed big integers, converted back to an unsigned residue.
fn mod_inverse(a: &BigUint, m: &BigUint) -> BigUint {
    use num_bigint::BigInt;
    use num_traits::One;

    let (mut old_r, mut r) = (BigInt::from(a.clone()), BigInt::from(m.clone()));
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
    while !r.is_zero() {
        let quotient = &old_r / &r;
        let new_r = &old_r - &quotient * &r;
        old_r = std::mem::replace(&mut r, new_r);
        let new_s = &old_s - &quotient * &s;
        old_s = std::mem::replace(&mut s, new_s);
    }
    let m_signed = BigInt::from(m.clone());
    let inv = ((old_s % &m_signed) + &m_signed) % &m_signed;
    inv.to_biguint().expect("inverse reduced into [0, m) is non-negative")
}
