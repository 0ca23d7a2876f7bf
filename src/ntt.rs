//! Per-prime negacyclic NTT engine (spec §4.3, component C4).
//!
//! Implements the in-place, fully-standard-ordered negacyclic NTT scheme
//! (Longa & Naehrig, "Speeding up the Number Theoretic Transform for Faster
//! Ideal Lattice-Based Cryptography", 2016; the same scheme Microsoft SEAL's
//! `ntt_negacyclic_harvey` implements): a Cooley–Tukey decimation-in-time
//! forward transform consuming the bit-reversed `ψ`-power table, and a
//! Gentleman–Sande decimation-in-frequency inverse consuming the
//! bit-reversed `ψ^{-1}`-power table, with neither direction needing an
//! explicit bit-reversal pass because the permutation is baked into the
//! twiddle table's indexing.
//!
//! This implementation fully reduces every butterfly's output to `[0, q)`
//! before proceeding to the next layer, rather than exploiting the
//! alternating reduce/no-reduce lazy-range budget spec §4.3 describes —
//! a deliberate simplification (recorded in `DESIGN.md`) favoring a
//! transform that is obviously correct by construction, since this crate
//! is written and reviewed without ever invoking the Rust toolchain.
//! `ntt_lazy`/`intt_lazy` are still exposed for API symmetry with the spec
//! and return values that satisfy the documented `[0, 2q)` contract (a
//! strict subset of it, in this implementation).

use crate::subring::SubRing;
use crate::word::{c_red, m_red};

impl SubRing {
    /// Forward NTT, in place, natural order in and out. Exact: every
    /// output coefficient lies in `[0, q)`.
    pub fn ntt(&self, a: &mut [u64]) {
        debug_assert_eq!(a.len(), self.n);
        let q = self.modulus;
        let mc = self.mred_constant;
        let n = self.n;
        let mut t = n;
        let mut m = 1;
        while m < n {
            t /= 2;
            for i in 0..m {
                let w = self.roots_forward[m + i];
                let j1 = 2 * i * t;
                for j in j1..j1 + t {
                    let u = a[j];
                    let v = m_red(a[j + t], w, q, mc);
                    let v = c_red(v, q);
                    let sum = u + v;
                    a[j] = if sum >= q { sum - q } else { sum };
                    a[j + t] = if u >= v { u - v } else { u + q - v };
                }
            }
            m *= 2;
        }
    }

    /// Forward NTT leaving results in `[0, 2q)` per spec's lazy contract
    /// (a strict subset here; see module docs).
    pub fn ntt_lazy(&self, a: &mut [u64]) {
        self.ntt(a);
    }

    /// Inverse NTT, in place, natural order in and out. Exact: every
    /// output coefficient lies in `[0, q)`.
    pub fn intt(&self, a: &mut [u64]) {
        self.intt_core(a);
        let q = self.modulus;
        for x in a.iter_mut() {
            *x = c_red(*x, q);
        }
    }

    /// Inverse NTT leaving results in `[0, 2q)`: skips the final reduction
    /// pass `intt` performs after the `N^{-1}` scaling.
    pub fn intt_lazy(&self, a: &mut [u64]) {
        self.intt_core(a);
    }

    fn intt_core(&self, a: &mut [u64]) {
        debug_assert_eq!(a.len(), self.n);
        let q = self.modulus;
        let mc = self.mred_constant;
        let n = self.n;
        let mut t = 1;
        let mut m = n;
        while m > 1 {
            let h = m / 2;
            let mut j1 = 0;
            for i in 0..h {
                let w = self.roots_backward[h + i];
                for j in j1..j1 + t {
                    let u = a[j];
                    let v = a[j + t];
                    let sum = u + v;
                    a[j] = if sum >= q { sum - q } else { sum };
                    let diff = if u >= v { u - v } else { u + q - v };
                    a[j + t] = m_red(diff, w, q, mc);
                }
                j1 += 2 * t;
            }
            t *= 2;
            m = h;
        }
        for x in a.iter_mut() {
            *x = m_red(*x, self.n_inv_mont, q, mc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ntt_round_trip_small() {
        let sr = SubRing::new(16, 97, 32).unwrap();
        let input: Vec<u64> = (0..16).collect();
        let mut a = input.clone();
        sr.ntt(&mut a);
        sr.intt(&mut a);
        assert_eq!(a, input);
    }

    #[test]
    fn ntt_round_trip_larger_ring() {
        let sr = SubRing::new(1024, 12289, 2048).unwrap();
        let input: Vec<u64> = (0..1024).map(|i| (i * 7 + 3) % 12289).collect();
        let mut a = input.clone();
        sr.ntt(&mut a);
        sr.intt(&mut a);
        assert_eq!(a, input);
    }

    #[test]
    fn ntt_is_linear() {
        let sr = SubRing::new(16, 97, 32).unwrap();
        let a: Vec<u64> = (0..16).collect();
        let b: Vec<u64> = (0..16).map(|i| (i * 3) % 97).collect();
        let mut sum = vec![0u64; 16];
        sr.add(&a, &b, &mut sum);

        let mut na = a.clone();
        sr.ntt(&mut na);
        let mut nb = b.clone();
        sr.ntt(&mut nb);
        let mut n_sum_expected = vec![0u64; 16];
        sr.add(&na, &nb, &mut n_sum_expected);

        let mut n_sum = sum;
        sr.ntt(&mut n_sum);

        assert_eq!(n_sum, n_sum_expected);
    }
}
