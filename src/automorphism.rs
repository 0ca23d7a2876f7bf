//! Galois automorphisms `σ_g: X^i ↦ X^{g·i}` (spec §4.5, component C7).
//!
//! In NTT domain, `σ_g` diagonalises into a pure coordinate permutation
//! (since the NTT diagonalises the cyclotomic regular representation); in
//! coefficient domain it is a negacyclic index shift with a sign flip on
//! wraparound.

use crate::poly::Poly;
use crate::ring::Ring;
use crate::subring::bit_reverse;

/// Precompute the NTT-domain permutation index table for `σ_g`.
///
/// `g` must be odd and coprime to `nth_root` (callers in practice pick `g`
/// coprime to `2N`). Spec §4.5:
/// ```text
/// for i in 0..N:
///     t1 = 2*bitrev(i, log2(nth_root)) + 1
///     t2 = ((g*t1) mod nth_root - 1) / 2
///     index[i] = bitrev(t2, log2(nth_root))
/// ```
pub fn permute_ntt_index(n: usize, nth_root: u64, g: u64) -> Vec<usize> {
    // Bit-reversal width is always log2(N), the channel length — not
    // log2(nth_root), which is log2(2N) for Standard rings but log2(4N)
    // for ConjugateInvariant ones and would index past the N-length slice.
    let log_n = n.trailing_zeros();
    let mut index = vec![0usize; n];
    for i in 0..n {
        let t1 = 2 * bit_reverse(i as u64, log_n) + 1;
        let t2 = (((g as u128 * t1 as u128) % nth_root as u128) as u64 - 1) / 2;
        index[i] = bit_reverse(t2, log_n) as usize;
    }
    index
}

impl Ring {
    /// Apply a precomputed NTT-domain permutation to every active channel:
    /// `out.channel[ch][j] = in.channel[ch][index[j]]`.
    pub fn permute_ntt_with_index(&self, a: &Poly, index: &[usize], out: &mut Poly) {
        let n = self.n();
        for ch in 0..=self.level() {
            let src = a.channel(ch);
            let dst_buf = out.buffer_mut();
            for (j, &idx) in index.iter().enumerate().take(n) {
                dst_buf[ch * n + j] = src[idx];
            }
        }
    }

    /// As [`Self::permute_ntt_with_index`], but compute `index` from `g`
    /// first (spec §6 `permute_ntt`).
    pub fn permute_ntt(&self, a: &Poly, g: u64, out: &mut Poly) {
        let index = permute_ntt_index(self.n(), self.nth_root(), g);
        self.permute_ntt_with_index(a, &index, out);
    }

    /// Like [`Self::permute_ntt_with_index`], but accumulates into `out`
    /// without any modular reduction (upstream key-switch accumulation,
    /// spec §4.5). Caller must ensure the accumulated sums cannot overflow
    /// `u64` before the next reduction pass.
    pub fn permute_ntt_with_index_and_add_no_mod(&self, a: &Poly, index: &[usize], out: &mut Poly) {
        let n = self.n();
        for ch in 0..=self.level() {
            let src = a.channel(ch);
            let dst_buf = out.buffer_mut();
            for (j, &idx) in index.iter().enumerate().take(n) {
                dst_buf[ch * n + j] = dst_buf[ch * n + j].wrapping_add(src[idx]);
            }
        }
    }

    /// Coefficient-domain application of `σ_g`:
    /// `out[(i*g) mod N] = ± in[i]`, sign flipping on negacyclic wrap
    /// (spec §4.5). `g` must be odd.
    pub fn permute(&self, a: &Poly, g: u64, out: &mut Poly) {
        let n = self.n() as u64;
        for ch in 0..=self.level() {
            let q = self.sub_ring(ch).modulus;
            let src = a.channel(ch);
            let dst_buf = out.buffer_mut();
            let offset = ch * self.n();
            for i in 0..n {
                let prod = i * g;
                let dst_index = (prod % n) as usize;
                let wraps_odd = (prod / n) % 2 == 1;
                let v = src[i as usize];
                dst_buf[offset + dst_index] = if wraps_odd {
                    if v == 0 {
                        0
                    } else {
                        q - v
                    }
                } else {
                    v
                };
            }
        }
    }

    /// Multiply by the monomial `X^k` (negacyclic shift), built directly
    /// on [`Self::permute`] with `g = 1`... shifting is not a Galois
    /// automorphism, so it is implemented directly instead of through
    /// `permute` (SPEC_FULL §11 "shift/rotation helpers").
    pub fn mul_by_monomial(&self, a: &Poly, k: i64, out: &mut Poly) {
        let n = self.n() as i64;
        let k = k.rem_euclid(2 * n);
        for ch in 0..=self.level() {
            let q = self.sub_ring(ch).modulus;
            let src = a.channel(ch);
            let dst_buf = out.buffer_mut();
            let offset = ch * self.n();
            for i in 0..n {
                let shifted = i + k;
                let wraps_odd = shifted.div_euclid(n) % 2 != 0;
                let dst_index = shifted.rem_euclid(n) as usize;
                let v = src[i as usize];
                dst_buf[offset + dst_index] = if wraps_odd {
                    if v == 0 {
                        0
                    } else {
                        q - v
                    }
                } else {
                    v
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn galois_shift_matches_spec_scenario() {
        // Ring N=16, q=97; coefficient-domain poly [0..16); permute with g=3.
        let ring = Ring::new(16, &[97]).unwrap();
        let mut p = Poly::new(16, 0);
        for (i, c) in p.channel_mut(0).iter_mut().enumerate() {
            *c = i as u64;
        }
        let mut out = Poly::new(16, 0);
        ring.permute(&p, 3, &mut out);

        for i in 0..16u64 {
            let prod = i * 3;
            let dst = (prod % 16) as usize;
            let wraps_odd = (prod / 16) % 2 == 1;
            let expect = if wraps_odd {
                if i == 0 {
                    0
                } else {
                    97 - i
                }
            } else {
                i
            };
            assert_eq!(out.channel(0)[dst], expect, "position {i}");
        }
    }

    #[test]
    fn permute_ntt_index_stays_in_bounds_for_conjugate_invariant() {
        // nth_root = 4N here, twice what a Standard ring of the same N
        // would use; the bit-reversal width must still come from N, or
        // `index[i]` can land in [N, 2N) and `permute_ntt` panics on the
        // N-length channel slice. The modulus must be 1 mod 64 for this
        // nth_root (97 is only 1 mod 32, enough for Standard but not this);
        // 193 = 3*64 + 1 qualifies.
        let ring = Ring::new_conjugate_invariant(16, &[193]).unwrap();
        let index = permute_ntt_index(ring.n(), ring.nth_root(), 3);
        assert_eq!(index.len(), 16);
        for &idx in &index {
            assert!(idx < 16, "index {idx} out of bounds for n=16");
        }

        let mut p = Poly::new(16, 0);
        for (i, c) in p.channel_mut(0).iter_mut().enumerate() {
            *c = i as u64;
        }
        let mut p_ntt = Poly::new(16, 0);
        ring.ntt(&p, &mut p_ntt).unwrap();
        let mut permuted = Poly::new(16, 0);
        // Must not panic.
        ring.permute_ntt(&p_ntt, 3, &mut permuted);
    }

    #[test]
    fn permute_ntt_matches_coefficient_permute_under_ntt() {
        let ring = Ring::new(16, &[97]).unwrap();
        let mut p = Poly::new(16, 0);
        for (i, c) in p.channel_mut(0).iter_mut().enumerate() {
            *c = i as u64;
        }
        let g = 3u64;

        let mut p_ntt = Poly::new(16, 0);
        ring.ntt(&p, &mut p_ntt).unwrap();
        let mut permuted_ntt = Poly::new(16, 0);
        ring.permute_ntt(&p_ntt, g, &mut permuted_ntt);

        let mut p_perm = Poly::new(16, 0);
        ring.permute(&p, g, &mut p_perm);
        let mut p_perm_ntt = Poly::new(16, 0);
        ring.ntt(&p_perm, &mut p_perm_ntt).unwrap();

        assert!(permuted_ntt.equal(&p_perm_ntt));
    }
}
