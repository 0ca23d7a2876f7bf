//! RNS basis extension, mod-down, and gadget decomposition (spec §4.4,
//! component C6).
//!
//! Basis extension uses the approximate fast basis conversion of
//! Halevi, Polyakov & Shoup: a residue tuple `(x mod q_0, ..., x mod q_L)`
//! over `Q = prod q_i` is re-expressed as
//!
//! ```text
//! x = sum_i y_i * (Q/q_i) - v * Q,    y_i = x * (Q/q_i)^{-1} mod q_i
//! ```
//!
//! with `v` the (small, non-negative) number of times the exact sum
//! `sum_i y_i/q_i` wrapped past an integer. Reducing the right-hand side
//! modulo a target prime `p_j` only needs `(Q/q_i) mod p_j` and `Q mod p_j`,
//! both precomputed once per `(source chain, target chain)` pair, so the
//! hot loop per output coefficient is a dot product plus one correction
//! term — no exact division or big-integer work. `v` is estimated from a
//! `f64` accumulation of `y_i/q_i`, per spec §4.4 and its Open Question
//! about the `|Q|+1` bound on that estimator.

use rayon::prelude::*;

use crate::error::{ConstructionError, ShapeError};
use crate::poly::Poly;
use crate::ring::Ring;
use crate::word::{self, m_red};

/// Precomputed constants for converting residues from one RNS basis (the
/// constructor's `from_moduli`) into another (`to_moduli`), spec §4.4's
/// `ModUpConstants`.
#[derive(Clone, Debug)]
pub struct ModUpConstants {
    /// `(Q/q_i)^{-1} mod q_i`, one per source prime `q_i`.
    q_over_qi_inv_qi: Vec<u64>,
    /// `q_over_qi_mod_pj[j][i]` = `(Q/q_i) mod p_j`.
    q_over_qi_mod_pj: Vec<Vec<u64>>,
    /// `Q mod p_j`, one per target prime.
    q_mod_pj: Vec<u64>,
    from_moduli: Vec<u64>,
    to_moduli: Vec<u64>,
}

impl ModUpConstants {
    fn build(from_moduli: &[u64], to_moduli: &[u64]) -> Self {
        use num_bigint::BigUint;

        let big_q: BigUint = from_moduli.iter().map(|&q| BigUint::from(q)).product();

        let mut q_over_qi_inv_qi = Vec::with_capacity(from_moduli.len());
        let mut q_over_qi_big = Vec::with_capacity(from_moduli.len());
        for &qi in from_moduli {
            let m = &big_q / BigUint::from(qi);
            let m_mod_qi = (&m % BigUint::from(qi)).to_u64_digits().first().copied().unwrap_or(0);
            let inv = word::mod_exp(m_mod_qi, qi - 2, qi);
            q_over_qi_inv_qi.push(inv);
            q_over_qi_big.push(m);
        }

        let mut q_over_qi_mod_pj = Vec::with_capacity(to_moduli.len());
        let mut q_mod_pj = Vec::with_capacity(to_moduli.len());
        for &pj in to_moduli {
            let row = q_over_qi_big
                .iter()
                .map(|m| (m % BigUint::from(pj)).to_u64_digits().first().copied().unwrap_or(0))
                .collect();
            q_over_qi_mod_pj.push(row);
            q_mod_pj.push((&big_q % BigUint::from(pj)).to_u64_digits().first().copied().unwrap_or(0));
        }

        ModUpConstants {
            q_over_qi_inv_qi,
            q_over_qi_mod_pj,
            q_mod_pj,
            from_moduli: from_moduli.to_vec(),
            to_moduli: to_moduli.to_vec(),
        }
    }
}

/// Extends residues from a base ring `ring_q` into an auxiliary ring
/// `ring_p` (or the reverse direction), used by RNS-CKKS-style rescaling and
/// key-switching (spec §4.4).
#[derive(Clone, Debug)]
pub struct BasisExtender {
    q_to_p: ModUpConstants,
    p_to_q: ModUpConstants,
}

impl BasisExtender {
    /// Precompute the constants to extend between `ring_q`'s and `ring_p`'s
    /// active moduli chains in both directions.
    pub fn new(ring_q: &Ring, ring_p: &Ring) -> Result<Self, ConstructionError> {
        let q_moduli = ring_q.modulus_chain();
        let p_moduli = ring_p.modulus_chain();
        if q_moduli.is_empty() || p_moduli.is_empty() {
            return Err(ConstructionError::EmptyModulusChain);
        }
        Ok(BasisExtender {
            q_to_p: ModUpConstants::build(&q_moduli, &p_moduli),
            p_to_q: ModUpConstants::build(&p_moduli, &q_moduli),
        })
    }

    /// Extend `a` (residues over `ring_q`'s active chain, coefficient
    /// domain) into `out` (residues over `ring_p`'s active chain). `out`
    /// must already carry `ring_p`'s degree and at least `ring_p.level()+1`
    /// channels.
    pub fn mod_up_q_to_p(&self, ring_q: &Ring, ring_p: &Ring, a: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        mod_up(ring_q, ring_p, &self.q_to_p, a, out)
    }

    /// As [`Self::mod_up_q_to_p`] but in the opposite direction.
    pub fn mod_up_p_to_q(&self, ring_p: &Ring, ring_q: &Ring, a: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        mod_up(ring_p, ring_q, &self.p_to_q, a, out)
    }

    /// Drop the auxiliary basis `P` from a polynomial held over the joint
    /// basis `QP`: compute `round(x / P) mod q_i` for every `q_i` in
    /// `ring_q`'s active chain, given `a_q`/`a_p` holding the `Q`- and
    /// `P`-channels of the same value `x` (spec §4.4 `mod_down_qp_to_q`).
    /// Operates in coefficient domain.
    pub fn mod_down_qp_to_q(
        &self,
        ring_q: &Ring,
        ring_p: &Ring,
        a_q: &Poly,
        a_p: &Poly,
        out: &mut Poly,
    ) -> Result<(), ShapeError> {
        // Basis-extend P's residues into Q, subtract from a_q, then scale
        // by P^{-1} mod q_i: this is exactly dividing by P and rounding,
        // since a_q - (a_p extended into Q) is divisible by P by construction.
        let mut p_in_q = Poly::new(ring_q.n(), ring_q.level());
        self.mod_up_p_to_q(ring_p, ring_q, a_p, &mut p_in_q)?;
        mod_down_core(ring_q, ring_p, a_q, &p_in_q, out)
    }

    /// As [`Self::mod_down_qp_to_q`], but `a_q`/`a_p` are already in NTT
    /// domain and the result is produced in NTT domain (spec §4.4
    /// `mod_down_qp_to_q_ntt`): converts to coefficient domain internally
    /// since the mod-down correction is not an NTT-domain-linear operation.
    pub fn mod_down_qp_to_q_ntt(
        &self,
        ring_q: &Ring,
        ring_p: &Ring,
        a_q_ntt: &Poly,
        a_p_ntt: &Poly,
        out_ntt: &mut Poly,
    ) -> Result<(), ShapeError> {
        let mut a_q_coeffs = Poly::new(ring_q.n(), ring_q.level());
        ring_q.intt(a_q_ntt, &mut a_q_coeffs)?;
        let mut a_p_coeffs = Poly::new(ring_p.n(), ring_p.level());
        ring_p.intt(a_p_ntt, &mut a_p_coeffs)?;

        let mut out_coeffs = Poly::new(ring_q.n(), ring_q.level());
        self.mod_down_qp_to_q(ring_q, ring_p, &a_q_coeffs, &a_p_coeffs, &mut out_coeffs)?;
        ring_q.ntt(&out_coeffs, out_ntt)
    }

    /// Drop the base `Q` instead of `P`: `round(x / Q) mod p_j` (used when
    /// `P` is the retained basis after a key-switch, spec §4.4
    /// `mod_down_qp_to_p`).
    pub fn mod_down_qp_to_p(
        &self,
        ring_q: &Ring,
        ring_p: &Ring,
        a_q: &Poly,
        a_p: &Poly,
        out: &mut Poly,
    ) -> Result<(), ShapeError> {
        let mut q_in_p = Poly::new(ring_p.n(), ring_p.level());
        self.mod_up_q_to_p(ring_q, ring_p, a_q, &mut q_in_p)?;
        mod_down_core(ring_p, ring_q, a_p, &q_in_p, out)
    }
}

/// Shared mod-up kernel (spec §4.4): for every source channel `i`, reduce
/// `a_i` into `y_i = a_i * (Q/q_i)^{-1} mod q_i`; estimate the wraparound
/// count `v` by float accumulation of `y_i/q_i`; then for every target
/// prime `p_j`, accumulate `sum_i y_i * ((Q/q_i) mod p_j) - v*(Q mod p_j)
/// mod p_j`.
fn mod_up(from: &Ring, to: &Ring, c: &ModUpConstants, a: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
    if a.n() != from.n() || a.level() < from.level() {
        return Err(ShapeError::DegreeMismatch {
            expected: from.n(),
            found: a.n(),
        });
    }
    if out.n() != to.n() || out.level() < to.level() {
        return Err(ShapeError::DestinationTooSmall {
            expected: to.level() + 1,
            found: out.channel_count(),
        });
    }

    let n = from.n();
    let from_count = from.level() + 1;
    let to_count = to.level() + 1;

    // y_i = a_i * (Q/q_i)^{-1} mod q_i for every source channel, plus a
    // float-accumulated estimate of v per coefficient (spec §4.4 and its
    // Open Question on the `v` estimator's one-sided rounding error).
    let mut y = vec![0u64; n * from_count];
    let mut v = vec![0u32; n];
    for i in 0..from_count {
        let sr = from.sub_ring(i);
        let qi = sr.modulus;
        let inv = c.q_over_qi_inv_qi[i];
        let dst = &mut y[i * n..(i + 1) * n];
        let src = a.channel(i);
        for (x, o) in src.iter().zip(dst.iter_mut()) {
            let ai = *x % qi;
            *o = word::b_red(ai, inv, qi, sr.bred_constant);
        }
    }
    for coeff in 0..n {
        let mut acc = 0.0f64;
        for i in 0..from_count {
            let qi = from.sub_ring(i).modulus;
            acc += y[i * n + coeff] as f64 / qi as f64;
        }
        v[coeff] = acc as u32;
    }

    out.buffer_mut()[..n * to_count]
        .par_chunks_mut(n)
        .enumerate()
        .for_each(|(j, dst)| {
            let pj = to.sub_ring(j).modulus as u128;
            let row = &c.q_over_qi_mod_pj[j];
            let q_mod_pj = c.q_mod_pj[j] as u128;
            for coeff in 0..n {
                let mut acc: u128 = 0;
                for i in 0..from_count {
                    acc += y[i * n + coeff] as u128 * (row[i] as u128 % pj);
                }
                acc %= pj;
                let correction = (v[coeff] as u128 * q_mod_pj) % pj;
                let result = if acc >= correction { acc - correction } else { acc + pj - correction };
                dst[coeff] = result as u64;
            }
        });
    Ok(())
}

fn mod_down_core(keep: &Ring, drop: &Ring, a_keep: &Poly, dropped_in_keep: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
    if out.n() != keep.n() || out.level() < keep.level() {
        return Err(ShapeError::DestinationTooSmall {
            expected: keep.level() + 1,
            found: out.channel_count(),
        });
    }
    let n = keep.n();
    let keep_count = keep.level() + 1;
    let drop_moduli = drop.modulus_chain();
    let big_drop: num_bigint::BigUint = drop_moduli.iter().map(|&q| num_bigint::BigUint::from(q)).product();

    out.buffer_mut()[..n * keep_count]
        .par_chunks_mut(n)
        .enumerate()
        .for_each(|(ch, dst)| {
            let sr = keep.sub_ring(ch);
            let qj = sr.modulus;
            let drop_mod_qj = (&big_drop % num_bigint::BigUint::from(qj))
                .to_u64_digits()
                .first()
                .copied()
                .unwrap_or(0);
            let inv = word::mod_exp(drop_mod_qj, qj - 2, qj);
            let inv_mont = sr.m_form(inv);
            let a_chan = a_keep.channel(ch);
            let dropped_chan = dropped_in_keep.channel(ch);
            for coeff in 0..n {
                let diff = crate::word::c_red(a_chan[coeff] + qj - (dropped_chan[coeff] % qj), qj);
                dst[coeff] = m_red(diff, inv_mont, qj, sr.mred_constant);
            }
        });
    Ok(())
}

/// Precomputed fixed-block gadget decomposition for key-switching (spec
/// §4.4 `Decomposer`): splits a base-`Q` polynomial into digits, each
/// itself a residue vector over a window of `Q`'s primes, and lifts that
/// digit into the full `QP` basis.
#[derive(Clone, Debug)]
pub struct Decomposer {
    /// Primes per digit (the last digit may have fewer).
    digit_size: usize,
    num_digits: usize,
    extenders: Vec<BasisExtender>,
}

impl Decomposer {
    /// Build a decomposer splitting `ring_q`'s active chain into digits of
    /// `digit_size` primes each, every digit basis-extended into `ring_p`.
    pub fn new(ring_q: &Ring, ring_p: &Ring, digit_size: usize) -> Result<Self, ConstructionError> {
        if digit_size == 0 {
            return Err(ConstructionError::EmptyModulusChain);
        }
        let chain_len = ring_q.level() + 1;
        let num_digits = chain_len.div_ceil(digit_size);
        let mut extenders = Vec::with_capacity(num_digits);
        let moduli = ring_q.modulus_chain();
        for d in 0..num_digits {
            let start = d * digit_size;
            let end = (start + digit_size).min(moduli.len());
            let digit_ring = Ring::new(ring_q.n(), &moduli[start..end])?;
            extenders.push(BasisExtender::new(&digit_ring, ring_p)?);
        }
        Ok(Decomposer {
            digit_size,
            num_digits,
            extenders,
        })
    }

    pub fn num_digits(&self) -> usize {
        self.num_digits
    }

    /// Split `a` into its `num_digits` digit polynomials (each holding only
    /// that digit's slice of `ring_q`'s chain) and basis-extend each one
    /// into `ring_p`, writing `digits_q[d]` and `digits_p[d]` for `d` in
    /// `0..num_digits` (spec §4.4 `decompose_and_split`).
    pub fn decompose_and_split(
        &self,
        ring_q: &Ring,
        ring_p: &Ring,
        a: &Poly,
        digits_q: &mut [Poly],
        digits_p: &mut [Poly],
    ) -> Result<(), ShapeError> {
        if digits_q.len() != self.num_digits || digits_p.len() != self.num_digits {
            return Err(ShapeError::DestinationTooSmall {
                expected: self.num_digits,
                found: digits_q.len().min(digits_p.len()),
            });
        }
        let moduli = ring_q.modulus_chain();
        for d in 0..self.num_digits {
            let start = d * self.digit_size;
            let end = (start + self.digit_size).min(moduli.len());
            let digit_level = end - start - 1;
            let digit_ring = Ring::new(ring_q.n(), &moduli[start..end]).map_err(|_| ShapeError::LevelOutOfRange {
                level: digit_level,
                chain_len: moduli.len(),
            })?;

            let mut digit_poly = Poly::new(ring_q.n(), digit_level);
            for (local_ch, global_ch) in (start..end).enumerate() {
                digit_poly.channel_mut(local_ch).copy_from_slice(a.channel(global_ch));
            }
            digits_q[d].copy(&digit_poly)?;
            self.extenders[d].mod_up_q_to_p(&digit_ring, ring_p, &digit_poly, &mut digits_p[d])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mod_up_preserves_small_values() {
        // A coefficient value smaller than every prime in both bases should
        // extend to the same value modulo every prime of the target basis.
        let ring_q = Ring::new(16, &[97]).unwrap();
        let ring_p = Ring::new(16, &[193, 257]).unwrap();
        let ext = BasisExtender::new(&ring_q, &ring_p).unwrap();

        let mut a = Poly::new(16, 0);
        for c in a.channel_mut(0).iter_mut() {
            *c = 42;
        }
        let mut out = Poly::new(16, 1);
        ext.mod_up_q_to_p(&ring_q, &ring_p, &a, &mut out).unwrap();
        for c in out.channel(0) {
            assert_eq!(*c, 42);
        }
        for c in out.channel(1) {
            assert_eq!(*c, 42);
        }
    }

    #[test]
    fn mod_up_matches_seed_scenario() {
        // spec §8 scenario 3: Q = [q0, q1], P = [p0]; x = 2*q0*q1 + 1. The
        // spec's own example primes are only 2 mod 4 (resp. 8 mod 32), one
        // 2-adic step short of the 1 mod 32 a Standard ring of N=16 needs;
        // these are the nearest primes of the same 31-bit shape that are.
        let q0 = 1073741857u64;
        let q1 = 1073741953u64;
        let p0 = 1073742113u64;
        let ring_q = Ring::new(16, &[q0, q1]).unwrap();
        let ring_p = Ring::new(16, &[p0]).unwrap();
        let ext = BasisExtender::new(&ring_q, &ring_p).unwrap();

        let x: u128 = 2u128 * q0 as u128 * q1 as u128 + 1;
        let mut a = Poly::new(16, 1);
        for c in a.channel_mut(0).iter_mut() {
            *c = (x % q0 as u128) as u64;
        }
        for c in a.channel_mut(1).iter_mut() {
            *c = (x % q1 as u128) as u64;
        }
        let mut out = Poly::new(16, 0);
        ext.mod_up_q_to_p(&ring_q, &ring_p, &a, &mut out).unwrap();

        let expect = (x % p0 as u128) as u64;
        for c in out.channel(0) {
            assert_eq!(*c, expect);
        }
    }

    #[test]
    fn decomposer_splits_expected_digit_count() {
        // All four primes must be 1 mod 32 (n=16's Standard nth_root); 337
        // and 401 are not (337-1 and 401-1 are only 16 mod 32), so this
        // chain uses 353 and 449 instead, which are.
        let ring_q = Ring::new(16, &[97, 193, 257, 353]).unwrap();
        let ring_p = Ring::new(16, &[449]).unwrap();
        let dec = Decomposer::new(&ring_q, &ring_p, 2).unwrap();
        assert_eq!(dec.num_digits(), 2);
    }

    #[test]
    fn decompose_and_split_matches_hand_computed_digits() {
        // Q-chain [97, 193, 257, 353] split into two digits of two primes
        // each; P-chain [449]. Using the constant value 42 (smaller than
        // every prime in Q and P) makes every residue in sight equal 42:
        // digit d's copied-through Q-residues are 42 in both its channels
        // (a straight copy of the input), and its basis extension into P is
        // 42 too, exactly as in `mod_up_preserves_small_values`.
        let ring_q = Ring::new(16, &[97, 193, 257, 353]).unwrap();
        let ring_p = Ring::new(16, &[449]).unwrap();
        let dec = Decomposer::new(&ring_q, &ring_p, 2).unwrap();
        assert_eq!(dec.num_digits(), 2);

        let mut a = Poly::new(16, 3);
        for ch in 0..=3 {
            for c in a.channel_mut(ch).iter_mut() {
                *c = 42;
            }
        }

        let mut digits_q = vec![Poly::new(16, 1), Poly::new(16, 1)];
        let mut digits_p = vec![Poly::new(16, 0), Poly::new(16, 0)];
        dec.decompose_and_split(&ring_q, &ring_p, &a, &mut digits_q, &mut digits_p).unwrap();

        for digit in &digits_q {
            for ch in 0..=1 {
                for &c in digit.channel(ch) {
                    assert_eq!(c, 42);
                }
            }
        }
        for digit in &digits_p {
            for &c in digit.channel(0) {
                assert_eq!(c, 42);
            }
        }
    }

    #[test]
    fn mod_down_round_trips_exact_multiple() {
        // x = p0 * 5 is an exact multiple of P, so floor(x/P) = 5 exactly.
        let ring_q = Ring::new(16, &[97, 193]).unwrap();
        let ring_p = Ring::new(16, &[257]).unwrap();
        let ext = BasisExtender::new(&ring_q, &ring_p).unwrap();

        let x: u64 = 257 * 5;
        let mut a_q = Poly::new(16, 1);
        for c in a_q.channel_mut(0).iter_mut() {
            *c = x % 97;
        }
        for c in a_q.channel_mut(1).iter_mut() {
            *c = x % 193;
        }
        let mut a_p = Poly::new(16, 0);
        for c in a_p.channel_mut(0).iter_mut() {
            *c = x % 257;
        }

        let mut out = Poly::new(16, 1);
        ext.mod_down_qp_to_q(&ring_q, &ring_p, &a_q, &a_p, &mut out).unwrap();
        for c in out.channel(0) {
            assert_eq!(*c, 5);
        }
        for c in out.channel(1) {
            assert_eq!(*c, 5);
        }
    }
}
