//! Modular word arithmetic on `u64` lanes (spec §4.1, component C1).
//!
//! Every prime modulus handled here is word-sized (at most 62 bits), so a
//! single `u128` holds any 64×64 product exactly. A 256-bit scalar field's
//! arithmetic needs hand-rolled `adc`/`mac`/`sbb` carry-propagating limb
//! helpers to emulate wide multiplication across four `u64` limbs; this
//! crate's moduli fit in one limb, so the widening happens natively through
//! `u128` instead of a limb-by-limb schoolbook loop — the same
//! Montgomery-form discipline a scalar field implementation uses (values
//! kept "always in Montgomery form"), just at one limb of width instead of
//! four.
//!
//! All functions here are data-oblivious (no branch depends on the *value*
//! of a secret residue, only on its known range), matching spec §1's
//! disclaimer: throughput is the goal, not side-channel resistance.

/// Precomputed Barrett constant for a modulus `q`: `⌊2^128 / q⌋`, split into
/// high/low 64-bit words as spec §3 describes for `SubRing::bred_constant`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BarrettConstant {
    pub hi: u64,
    pub lo: u64,
}

impl BarrettConstant {
    /// Precompute `⌊2^128 / q⌋` using an arbitrary-precision division; this
    /// runs once per `SubRing` construction, never on a hot path.
    pub fn for_modulus(q: u64) -> Self {
        use num_bigint::BigUint;
        use num_traits::One;

        let numerator = BigUint::one() << 128u32;
        let mu = numerator / BigUint::from(q);
        let digits = mu.to_u64_digits();
        BarrettConstant {
            lo: digits.first().copied().unwrap_or(0),
            hi: digits.get(1).copied().unwrap_or(0),
        }
    }

    #[inline(always)]
    fn as_u128(self) -> u128 {
        ((self.hi as u128) << 64) | self.lo as u128
    }
}

/// High 128 bits of the exact 256-bit product `a * b`, for `a, b: u128`.
///
/// Schoolbook multiplication split into four 64×64→128 partial products;
/// each partial product and the running cross-term sum stays well under
/// `2^128`, so no wider integer type is needed.
#[inline(always)]
fn mul_u128_hi(a: u128, b: u128) -> u128 {
    let a_lo = a as u64 as u128;
    let a_hi = (a >> 64) as u64 as u128;
    let b_lo = b as u64 as u128;
    let b_hi = (b >> 64) as u64 as u128;

    let lo_lo = a_lo * b_lo;
    let hi_lo = a_hi * b_lo;
    let lo_hi = a_lo * b_hi;
    let hi_hi = a_hi * b_hi;

    let cross = (lo_lo >> 64) + (hi_lo & u64::MAX as u128) + (lo_hi & u64::MAX as u128);
    hi_hi + (hi_lo >> 64) + (lo_hi >> 64) + (cross >> 64)
}

/// One conditional subtraction: `if x >= q { x - q } else { x }`.
///
/// Requires `x < 2q`. This is the primitive every "exact" kernel ends on to
/// collapse a lazy `[0, 2q)` (or wider) result down to `[0, q)`.
#[inline(always)]
pub fn c_red(x: u64, q: u64) -> u64 {
    if x >= q {
        x - q
    } else {
        x
    }
}

/// Barrett-reduce `x*y mod q`, leaving the result in `[0, 2q)`.
///
/// `x, y` must individually be in `[0, q)`, so `x*y < q^2 <= 2^124` for a
/// 62-bit modulus; the classical Barrett error bound guarantees the
/// quotient estimate undershoots the true quotient by at most 2, so the
/// remainder before correction lies in `[0, 3q)` and a single conditional
/// subtraction collapses it to `[0, 2q)`.
#[inline(always)]
pub fn b_red_lazy(x: u64, y: u64, q: u64, c: BarrettConstant) -> u64 {
    let p = x as u128 * y as u128;
    let quot = mul_u128_hi(p, c.as_u128());
    let qq = q as u128;
    let mut r = p - quot * qq;
    if r >= qq + qq {
        r -= qq;
    }
    r as u64
}

/// Exact Barrett reduction: `x*y mod q` in `[0, q)`.
#[inline(always)]
pub fn b_red(x: u64, y: u64, q: u64, c: BarrettConstant) -> u64 {
    c_red(b_red_lazy(x, y, q, c), q)
}

/// Barrett-reduce a single word `x < 2^64` modulo `q`, exact result in `[0, q)`.
#[inline(always)]
pub fn b_red_add(x: u64, q: u64, c: BarrettConstant) -> u64 {
    let p = x as u128;
    let quot = mul_u128_hi(p, c.as_u128());
    let qq = q as u128;
    let mut r = p - quot * qq;
    if r >= qq {
        r -= qq;
    }
    if r >= qq {
        r -= qq;
    }
    r as u64
}

/// `-q^{-1} mod 2^64`, the Montgomery constant `SubRing::mred_constant`.
///
/// Computed by Newton's iteration for the inverse of an odd number modulo a
/// power of two (doubling the correct bit-count each step), then negated.
pub fn mont_constant(q: u64) -> u64 {
    debug_assert!(q & 1 == 1, "montgomery reduction requires an odd modulus");
    let mut inv = q; // correct mod 2^3 for any odd q
    for _ in 0..5 {
        inv = inv.wrapping_mul(2u64.wrapping_sub(q.wrapping_mul(inv)));
    }
    inv.wrapping_neg()
}

/// Montgomery-reduce `x*y*R^{-1} mod q` with `R = 2^64`, result in `[0, 2q)`.
///
/// `mred_constant` is `-q^{-1} mod 2^64`. Standard REDC: `m = (x*y mod R) *
/// mred_constant mod R`; the sum `x*y + m*q` is then an exact multiple of
/// `R`, so the shift is lossless, and the textbook bound guarantees the
/// quotient is below `2q` whenever `x*y < q*R`.
#[inline(always)]
pub fn m_red_lazy(x: u64, y: u64, q: u64, mred_constant: u64) -> u64 {
    let t = x as u128 * y as u128;
    let m = (t as u64).wrapping_mul(mred_constant);
    let mq = m as u128 * q as u128;
    ((t + mq) >> 64) as u64
}

/// Exact Montgomery reduction: `x*y*R^{-1} mod q` in `[0, q)`.
#[inline(always)]
pub fn m_red(x: u64, y: u64, q: u64, mred_constant: u64) -> u64 {
    c_red(m_red_lazy(x, y, q, mred_constant), q)
}

/// Convert `x` into Montgomery form: `x*R mod q`.
///
/// Implemented as a Montgomery multiplication by `R^2 mod q` (the standard
/// trick: `REDC(x * R^2) = x*R^2*R^{-1} = x*R`).
#[inline(always)]
pub fn m_form(x: u64, q: u64, mred_constant: u64, r2: u64) -> u64 {
    m_red(x, r2, q, mred_constant)
}

/// Invert [`m_form`]: recover `x` from its Montgomery form `x*R mod q`.
///
/// `REDC(xR * 1) = xR * R^{-1} = x`.
#[inline(always)]
pub fn i_m_form(x_mont: u64, q: u64, mred_constant: u64) -> u64 {
    m_red(x_mont, 1, q, mred_constant)
}

/// `R^2 mod q`, needed to seed [`m_form`]. Computed once at `SubRing`
/// construction via arbitrary-precision arithmetic, not on any hot path.
pub fn r_squared_mod(q: u64) -> u64 {
    use num_bigint::BigUint;
    use num_traits::One;
    let r = BigUint::one() << 64u32;
    let r2 = (&r * &r) % BigUint::from(q);
    let digits = r2.to_u64_digits();
    digits.first().copied().unwrap_or(0)
}

/// Square-and-multiply exponentiation in plain (non-Montgomery) form.
pub fn mod_exp(mut base: u64, mut exp: u64, q: u64) -> u64 {
    let c = BarrettConstant::for_modulus(q);
    let mut result: u64 = if q == 1 { 0 } else { 1 };
    base %= q;
    while exp > 0 {
        if exp & 1 == 1 {
            result = b_red(result, base, q, c);
        }
        base = b_red(base, base, q, c);
        exp >>= 1;
    }
    result
}

/// Square-and-multiply exponentiation operating entirely in Montgomery form.
///
/// `base_mont` must already be `base*R mod q`; the result is `base^exp * R
/// mod q`, i.e. still in Montgomery form.
pub fn mod_exp_montgomery(mut base_mont: u64, mut exp: u64, q: u64, mred_constant: u64, r_mont: u64) -> u64 {
    let mut result = r_mont; // Montgomery form of 1
    while exp > 0 {
        if exp & 1 == 1 {
            result = m_red(result, base_mont, q, mred_constant);
        }
        base_mont = m_red(base_mont, base_mont, q, mred_constant);
        exp >>= 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_PRIMES: [u64; 4] = [97, 12289, 1073741827, 4611686018326724609];

    #[test]
    fn barrett_matches_naive_mod() {
        for &q in &SMALL_PRIMES {
            let c = BarrettConstant::for_modulus(q);
            for x in [0u64, 1, q - 1, q / 2, q - 2] {
                for y in [0u64, 1, q - 1, q / 2, 12345 % q] {
                    let expect = ((x as u128 * y as u128) % q as u128) as u64;
                    assert_eq!(b_red(x, y, q, c), expect, "q={q} x={x} y={y}");
                }
            }
        }
    }

    #[test]
    fn barrett_add_matches_naive_mod() {
        for &q in &SMALL_PRIMES {
            let c = BarrettConstant::for_modulus(q);
            for x in [0u64, 1, q - 1, u64::MAX, u64::MAX - q] {
                assert_eq!(b_red_add(x, q, c), (x as u128 % q as u128) as u64);
            }
        }
    }

    #[test]
    fn montgomery_round_trips() {
        for &q in &SMALL_PRIMES {
            let minv = mont_constant(q);
            let r2 = r_squared_mod(q);
            for x in [0u64, 1, q - 1, q / 2, 42 % q] {
                let mont = m_form(x, q, minv, r2);
                let back = i_m_form(mont, q, minv);
                assert_eq!(back, x, "q={q} x={x}");
            }
        }
    }

    #[test]
    fn montgomery_multiply_matches_naive_mod() {
        for &q in &SMALL_PRIMES {
            let minv = mont_constant(q);
            let r2 = r_squared_mod(q);
            for a in [1u64, 2, q - 1, q / 3] {
                for b in [1u64, 5, q - 1, q / 7 + 1] {
                    let am = m_form(a, q, minv, r2);
                    let bm = m_form(b, q, minv, r2);
                    let prod_mont = m_red(am, bm, q, minv);
                    let prod = i_m_form(prod_mont, q, minv);
                    let expect = ((a as u128 * b as u128) % q as u128) as u64;
                    assert_eq!(prod, expect, "q={q} a={a} b={b}");
                }
            }
        }
    }

    #[test]
    fn mod_exp_matches_repeated_multiply() {
        for &q in &SMALL_PRIMES {
            let base = 7u64 % q;
            let mut expect = 1u64;
            for _ in 0..10 {
                expect = ((expect as u128 * base as u128) % q as u128) as u64;
            }
            assert_eq!(mod_exp(base, 10, q), expect);
        }
    }
}
