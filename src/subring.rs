//! Per-prime ring state and coefficient kernels (spec §4.2, component C2).
//!
//! A [`SubRing`] is immutable after construction: its modulus, reduction
//! constants and twiddle tables are all derived once from `q` and `n` and
//! never mutate again, the same lifecycle the teacher's field constants
//! (`MODULUS`, `INV`, `R`, `R2`, `ROOT_OF_UNITY`, ...) have for a curve's
//! scalar field — except here those constants are computed at runtime for
//! an arbitrary prime instead of hard-coded for one fixed field.

use crate::error::ConstructionError;
use crate::primes::{is_prime, primitive_nth_root};
use crate::word::{
    self, b_red, b_red_lazy, c_red, m_form, m_red, m_red_lazy, mont_constant, r_squared_mod,
    BarrettConstant,
};

/// One RNS channel: a prime modulus and everything needed to do NTT-domain
/// and coefficient-domain arithmetic modulo it.
#[derive(Clone, Debug)]
pub struct SubRing {
    pub(crate) n: usize,
    pub modulus: u64,
    pub bred_constant: BarrettConstant,
    pub mred_constant: u64,
    /// `R^2 mod q`, used to move values into Montgomery form.
    pub r2: u64,
    /// `N^{-1} mod q`, in Montgomery form.
    pub n_inv_mont: u64,
    /// `ψ^{bitrev(i)} mod q` in Montgomery form, for the forward NTT.
    pub(crate) roots_forward: Vec<u64>,
    /// `ψ^{-bitrev(i)} mod q` in Montgomery form, for the inverse NTT.
    pub(crate) roots_backward: Vec<u64>,
}

impl SubRing {
    /// Build the per-prime state for `modulus` over a ring of degree `n`
    /// with `nth_root`-th roots of unity (`2n` for the standard variant,
    /// `4n` for the conjugate-invariant one).
    pub fn new(n: usize, modulus: u64, nth_root: u64) -> Result<Self, ConstructionError> {
        if modulus >> 62 != 0 {
            return Err(ConstructionError::ModulusTooLarge(modulus));
        }
        if !is_prime(modulus) {
            return Err(ConstructionError::NotPrime(modulus));
        }
        if (modulus - 1) % nth_root != 0 {
            return Err(ConstructionError::NoNthRoot { modulus, nth_root });
        }

        let bred_constant = BarrettConstant::for_modulus(modulus);
        let mred_constant = mont_constant(modulus);
        let r2 = r_squared_mod(modulus);

        let psi = primitive_nth_root(modulus, nth_root)
            .ok_or(ConstructionError::NoNthRoot { modulus, nth_root })?;
        let psi_inv = word::mod_exp(psi, modulus - 2, modulus);

        let log_n = n.trailing_zeros();
        let mut roots_forward = vec![0u64; n];
        let mut roots_backward = vec![0u64; n];
        for i in 0..n {
            let rev = bit_reverse(i as u64, log_n) as u64;
            let fwd_val = word::mod_exp(psi, rev, modulus);
            let bwd_val = word::mod_exp(psi_inv, rev, modulus);
            roots_forward[i] = m_form(fwd_val, modulus, mred_constant, r2);
            roots_backward[i] = m_form(bwd_val, modulus, mred_constant, r2);
        }

        let n_inv = word::mod_exp(n as u64 % modulus, modulus - 2, modulus);
        let n_inv_mont = m_form(n_inv, modulus, mred_constant, r2);

        Ok(SubRing {
            n,
            modulus,
            bred_constant,
            mred_constant,
            r2,
            n_inv_mont,
            roots_forward,
            roots_backward,
        })
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn m_form(&self, x: u64) -> u64 {
        m_form(x, self.modulus, self.mred_constant, self.r2)
    }

    #[inline]
    pub fn i_m_form(&self, x: u64) -> u64 {
        word::i_m_form(x, self.modulus, self.mred_constant)
    }

    // ---- coefficient-wise kernels (spec §4.2) ----
    // Every kernel below operates over full-length slices of `self.n`
    // lanes. `n` is always a multiple of 8 (enforced at `Ring` construction),
    // so the 8-wide chunk iterator below is exact and never falls back to a
    // ragged remainder loop — the safe-Rust analog of the teacher's
    // pointer-cast 8-lane windows (spec §9's "pointer-cast 8-lane
    // unrolling" design note).

    pub fn add(&self, a: &[u64], b: &[u64], out: &mut [u64]) {
        let q = self.modulus;
        self.for_each_lane(a, b, out, |x, y| {
            let s = x + y;
            if s >= q {
                s - q
            } else {
                s
            }
        });
    }

    pub fn add_lazy(&self, a: &[u64], b: &[u64], out: &mut [u64]) {
        self.for_each_lane(a, b, out, |x, y| x + y);
    }

    pub fn sub(&self, a: &[u64], b: &[u64], out: &mut [u64]) {
        let q = self.modulus;
        self.for_each_lane(a, b, out, |x, y| if x >= y { x - y } else { x + q - y });
    }

    pub fn sub_lazy(&self, a: &[u64], b: &[u64], out: &mut [u64]) {
        let q = self.modulus;
        self.for_each_lane(a, b, out, |x, y| x + q - y);
    }

    pub fn neg(&self, a: &[u64], out: &mut [u64]) {
        let q = self.modulus;
        self.for_each_lane_unary(a, out, |x| if x == 0 { 0 } else { q - x });
    }

    pub fn mul_coeffs_barrett(&self, a: &[u64], b: &[u64], out: &mut [u64]) {
        let (q, c) = (self.modulus, self.bred_constant);
        self.for_each_lane(a, b, out, |x, y| b_red(x, y, q, c));
    }

    pub fn mul_coeffs_barrett_lazy(&self, a: &[u64], b: &[u64], out: &mut [u64]) {
        let (q, c) = (self.modulus, self.bred_constant);
        self.for_each_lane(a, b, out, |x, y| b_red_lazy(x, y, q, c));
    }

    pub fn mul_coeffs_montgomery(&self, a: &[u64], b: &[u64], out: &mut [u64]) {
        let (q, mc) = (self.modulus, self.mred_constant);
        self.for_each_lane(a, b, out, |x, y| m_red(x, y, q, mc));
    }

    pub fn mul_coeffs_montgomery_lazy(&self, a: &[u64], b: &[u64], out: &mut [u64]) {
        let (q, mc) = (self.modulus, self.mred_constant);
        self.for_each_lane(a, b, out, |x, y| m_red_lazy(x, y, q, mc));
    }

    pub fn mul_scalar_montgomery(&self, a: &[u64], scalar_mont: u64, out: &mut [u64]) {
        let (q, mc) = (self.modulus, self.mred_constant);
        self.for_each_lane_unary(a, out, |x| m_red(x, scalar_mont, q, mc));
    }

    pub fn mul_scalar_montgomery_then_add(&self, a: &[u64], scalar_mont: u64, out: &mut [u64]) {
        let (q, mc) = (self.modulus, self.mred_constant);
        debug_assert_eq!(a.len(), out.len());
        for (x, o) in a.iter().zip(out.iter_mut()) {
            let t = m_red(*x, scalar_mont, q, mc);
            let s = *o + t;
            *o = if s >= q { s - q } else { s };
        }
    }

    /// `out = (b - a + q') * s mod q`, the mod-down primitive of §4.4.
    ///
    /// `q'` is an extra multiple of `q` supplied by the caller so that
    /// `b - a + q'` never underflows even when `b < a`; callers pick
    /// `q' = k*q` for the smallest `k` making that true.
    pub fn sub_then_mul_scalar_montgomery_two_modulus(
        &self,
        a: &[u64],
        b: &[u64],
        q_prime: u64,
        scalar_mont: u64,
        out: &mut [u64],
    ) {
        let (q, mc) = (self.modulus, self.mred_constant);
        debug_assert_eq!(a.len(), b.len());
        debug_assert_eq!(a.len(), out.len());
        for ((x, y), o) in a.iter().zip(b.iter()).zip(out.iter_mut()) {
            let diff = c_red(y + q_prime - x, q);
            *o = m_red(diff, scalar_mont, q, mc);
        }
    }

    pub fn add_scalar(&self, a: &[u64], scalar: u64, out: &mut [u64]) {
        let q = self.modulus;
        let scalar = scalar % q;
        self.for_each_lane_unary(a, out, |x| {
            let s = x + scalar;
            if s >= q {
                s - q
            } else {
                s
            }
        });
    }

    pub fn sub_scalar_montgomery(&self, a: &[u64], scalar: u64, out: &mut [u64]) {
        let q = self.modulus;
        let scalar = scalar % q;
        self.for_each_lane_unary(a, out, |x| if x >= scalar { x - scalar } else { x + q - scalar });
    }

    #[inline]
    fn for_each_lane(&self, a: &[u64], b: &[u64], out: &mut [u64], f: impl Fn(u64, u64) -> u64 + Sync) {
        debug_assert_eq!(a.len(), self.n);
        debug_assert_eq!(b.len(), self.n);
        debug_assert_eq!(out.len(), self.n);
        for ((a8, b8), o8) in a.chunks_exact(8).zip(b.chunks_exact(8)).zip(out.chunks_exact_mut(8)) {
            unroll::unroll_for_loops! {
                for l in 0..8 {
                    o8[l] = f(a8[l], b8[l]);
                }
            }
        }
    }

    #[inline]
    fn for_each_lane_unary(&self, a: &[u64], out: &mut [u64], f: impl Fn(u64) -> u64 + Sync) {
        debug_assert_eq!(a.len(), self.n);
        debug_assert_eq!(out.len(), self.n);
        for (a8, o8) in a.chunks_exact(8).zip(out.chunks_exact_mut(8)) {
            unroll::unroll_for_loops! {
                for l in 0..8 {
                    o8[l] = f(a8[l]);
                }
            }
        }
    }
}

/// Reverse the low `bits` bits of `x`.
pub(crate) fn bit_reverse(x: u64, bits: u32) -> u64 {
    let mut x = x;
    let mut r = 0u64;
    for _ in 0..bits {
        r = (r << 1) | (x & 1);
        x >>= 1;
    }
    r
}
