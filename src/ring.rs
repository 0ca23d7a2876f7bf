//! The composite ring `R_Q` over a chain of `SubRing`s (spec §4, component
//! C3): `Standard` (negacyclic, `X^N+1`) and `ConjugateInvariant`
//! (`Z[X+X^-1]/(X^2N+1)`) variants, with level-aware dispatch across the
//! active prefix of the modulus chain.

use std::sync::Arc;

use rayon::prelude::*;

use crate::error::{ConstructionError, EncodingError, ShapeError};
use crate::poly::Poly;
use crate::subring::SubRing;

/// Which cyclotomic variant a [`Ring`] implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RingVariant {
    /// `Z_Q[X]/(X^N+1)`, `nth_root = 2N`.
    Standard,
    /// `Z_Q[X+X^-1]/(X^2N+1)`, `nth_root = 4N`.
    ConjugateInvariant,
}

/// An ordered RNS modulus chain and the per-prime state to operate on it.
#[derive(Clone, Debug)]
pub struct Ring {
    n: usize,
    nth_root: u64,
    variant: RingVariant,
    /// Shared with every `at_level` view of this ring (spec §9
    /// "Ring-level view": a view "shares the underlying SubRing slice and
    /// tables"; `Arc` is what makes that sharing cheap instead of a deep
    /// per-channel twiddle-table copy).
    sub_rings: Arc<Vec<SubRing>>,
    /// `rescale_constants[k][j]` = `q_k^{-1} mod q_j` in Montgomery form,
    /// for `j < k`, used when dropping the top modulus of the chain
    /// (`div_floor_by_last_modulus` and friends, spec §6 "Scaling"). Kept
    /// at `Ring` granularity rather than inside each `SubRing`, since the
    /// set of "preceding primes" is a property of a prime's position in
    /// *this* chain, not of the prime in isolation (see `DESIGN.md`).
    /// Also shared via `Arc` with `at_level` views.
    rescale_constants: Arc<Vec<Vec<u64>>>,
    /// The currently active level (an index into `sub_rings`, inclusive).
    level: usize,
}

impl Ring {
    /// Build a `Standard` ring of degree `n` over the prime chain `moduli`
    /// (spec §7 `ConstructionError`s apply here).
    pub fn new(n: usize, moduli: &[u64]) -> Result<Self, ConstructionError> {
        Self::build(n, moduli, RingVariant::Standard)
    }

    /// Build a `ConjugateInvariant` ring: same prime chain, but each
    /// `SubRing`'s NTT uses `nth_root = 4N` since only the left half of the
    /// length-`2N` negacyclic NTT is computed (spec §4.3).
    pub fn new_conjugate_invariant(n: usize, moduli: &[u64]) -> Result<Self, ConstructionError> {
        Self::build(n, moduli, RingVariant::ConjugateInvariant)
    }

    fn build(n: usize, moduli: &[u64], variant: RingVariant) -> Result<Self, ConstructionError> {
        if n == 0 || (n as u64).count_ones() != 1 {
            return Err(ConstructionError::NotPowerOfTwo(n as u64));
        }
        if n < 8 {
            return Err(ConstructionError::DegreeTooSmall(n as u64));
        }
        if moduli.is_empty() {
            return Err(ConstructionError::EmptyModulusChain);
        }
        let mut seen = std::collections::HashSet::with_capacity(moduli.len());
        for &q in moduli {
            if !seen.insert(q) {
                return Err(ConstructionError::DuplicateModulus(q));
            }
        }

        let nth_root: u64 = match variant {
            RingVariant::Standard => 2 * n as u64,
            RingVariant::ConjugateInvariant => 4 * n as u64,
        };

        let mut sub_rings = Vec::with_capacity(moduli.len());
        for &q in moduli {
            sub_rings.push(SubRing::new(n, q, nth_root)?);
        }

        let mut rescale_constants = Vec::with_capacity(moduli.len());
        for k in 0..moduli.len() {
            let qk = moduli[k];
            let mut row = Vec::with_capacity(k);
            for j in 0..k {
                let qj = moduli[j];
                let inv = crate::word::mod_exp(qk % qj, qj - 2, qj);
                row.push(sub_rings[j].m_form(inv));
            }
            rescale_constants.push(row);
        }

        let level = sub_rings.len() - 1;
        Ok(Ring {
            n,
            nth_root,
            variant,
            sub_rings: Arc::new(sub_rings),
            rescale_constants: Arc::new(rescale_constants),
            level,
        })
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn nth_root(&self) -> u64 {
        self.nth_root
    }

    #[inline]
    pub fn variant(&self) -> RingVariant {
        self.variant
    }

    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    #[inline]
    pub fn max_level(&self) -> usize {
        self.sub_rings.len() - 1
    }

    pub fn modulus_chain(&self) -> Vec<u64> {
        self.sub_rings.iter().map(|s| s.modulus).collect()
    }

    /// Bit-exact binary serialization of the ring's construction parameters
    /// (spec §6 "Ring serialization"): `n`, `nth_root`, a variant tag (`0` =
    /// `Standard`, `1` = `ConjugateInvariant`), the chain length, then the
    /// prime moduli in order. Does not encode `level` — a fresh ring
    /// decodes at its maximum level, matching `Ring::new`'s own default.
    pub fn marshal(&self) -> Vec<u8> {
        let moduli = self.modulus_chain();
        let mut out = Vec::with_capacity(32 + 8 * moduli.len());
        out.extend_from_slice(&(self.n as i64).to_le_bytes());
        out.extend_from_slice(&(self.nth_root as i64).to_le_bytes());
        let variant_tag: i64 = match self.variant {
            RingVariant::Standard => 0,
            RingVariant::ConjugateInvariant => 1,
        };
        out.extend_from_slice(&variant_tag.to_le_bytes());
        out.extend_from_slice(&(moduli.len() as i64).to_le_bytes());
        for q in moduli {
            out.extend_from_slice(&q.to_le_bytes());
        }
        out
    }

    /// Decode a ring marshaled by [`Self::marshal`], re-invoking
    /// [`Ring::new`]/[`Ring::new_conjugate_invariant`] on the decoded `(n,
    /// moduli)` pair so that a chain with a prime failing the NTT-prime
    /// test is rejected rather than producing a partial `Ring` (spec §6:
    /// "the decoder MUST return an error and MUST NOT leave a partial
    /// Ring"). The decoded `nth_root` is checked against the one the
    /// re-built ring derives from `n` and the variant tag, since `nth_root`
    /// is otherwise fully determined by those two fields.
    pub fn unmarshal(bytes: &[u8]) -> Result<Self, EncodingError> {
        if bytes.len() < 32 {
            return Err(EncodingError::HeaderTruncated { expected: 32, found: bytes.len() });
        }
        let n = i64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let nth_root = i64::from_le_bytes(bytes[8..16].try_into().unwrap());
        let variant_tag = i64::from_le_bytes(bytes[16..24].try_into().unwrap());
        let chain_len = i64::from_le_bytes(bytes[24..32].try_into().unwrap());
        if n <= 0 {
            return Err(EncodingError::InvalidHeader(format!("n must be > 0, got {n}")));
        }
        if chain_len <= 0 {
            return Err(EncodingError::InvalidHeader(format!("chain length must be > 0, got {chain_len}")));
        }
        let variant = match variant_tag {
            0 => RingVariant::Standard,
            1 => RingVariant::ConjugateInvariant,
            other => return Err(EncodingError::InvalidHeader(format!("unknown ring variant tag {other}"))),
        };

        let chain_len = chain_len as usize;
        let expected_body = chain_len * 8;
        let found_body = bytes.len() - 32;
        if found_body != expected_body {
            return Err(EncodingError::BodyLengthMismatch { expected: expected_body, found: found_body });
        }
        let mut moduli = Vec::with_capacity(chain_len);
        for chunk in bytes[32..].chunks_exact(8) {
            moduli.push(u64::from_le_bytes(chunk.try_into().unwrap()));
        }

        let n = n as usize;
        let expected_nth_root: u64 = match variant {
            RingVariant::Standard => 2 * n as u64,
            RingVariant::ConjugateInvariant => 4 * n as u64,
        };
        if nth_root != expected_nth_root as i64 {
            return Err(EncodingError::InvalidHeader(format!(
                "nth_root {nth_root} does not match the {expected_nth_root} implied by n={n} and the variant tag"
            )));
        }

        let ring = match variant {
            RingVariant::Standard => Ring::new(n, &moduli)?,
            RingVariant::ConjugateInvariant => Ring::new_conjugate_invariant(n, &moduli)?,
        };
        Ok(ring)
    }

    #[inline]
    pub fn sub_ring(&self, channel: usize) -> &SubRing {
        &self.sub_rings[channel]
    }

    pub(crate) fn sub_rings(&self) -> &[SubRing] {
        &self.sub_rings
    }

    pub(crate) fn rescale_row(&self, k: usize) -> &[u64] {
        &self.rescale_constants[k]
    }

    /// A lightweight borrowing view clamped to `level`: shares the
    /// `SubRing` vector and tables via `Arc`, heap-allocating nothing new
    /// beyond the two pointer-sized `Arc` clones (spec §9 "Ring-level
    /// view": "Do not copy tables; do not heap-allocate in this call").
    pub fn at_level(&self, level: usize) -> Result<Ring, ShapeError> {
        if level > self.max_level() {
            return Err(ShapeError::LevelOutOfRange {
                level,
                chain_len: self.sub_rings.len(),
            });
        }
        Ok(Ring {
            n: self.n,
            nth_root: self.nth_root,
            variant: self.variant,
            sub_rings: Arc::clone(&self.sub_rings),
            rescale_constants: Arc::clone(&self.rescale_constants),
            level,
        })
    }

    fn check_shape(&self, p: &Poly) -> Result<(), ShapeError> {
        if p.n() != self.n {
            return Err(ShapeError::DegreeMismatch {
                expected: self.n,
                found: p.n(),
            });
        }
        if p.level() < self.level {
            return Err(ShapeError::LevelOutOfRange {
                level: self.level,
                chain_len: p.level() + 1,
            });
        }
        Ok(())
    }

    /// Apply `f(sub_ring, dst_channel)` to every active channel's output
    /// slice in parallel. `f` reads whatever else it needs (e.g. `a`'s and
    /// `b`'s channels) through its own captures, which are always shared
    /// (`&Poly`) references and therefore safe to read from multiple
    /// threads at once; only the output buffer is split up front via
    /// `par_chunks_mut` so no two threads ever hold overlapping `&mut`
    /// slices (spec §5: per-channel kernels are "trivially data-parallel").
    fn dispatch_mut(&self, out: &mut Poly, f: impl Fn(&SubRing, usize, &mut [u64]) + Sync) {
        let n = self.n;
        let active = self.level + 1;
        let sub_rings = &self.sub_rings[..active];
        out.buffer_mut()[..n * active]
            .par_chunks_mut(n)
            .zip(sub_rings.par_iter())
            .enumerate()
            .for_each(|(ch, (dst, sr))| f(sr, ch, dst));
    }

    pub fn add(&self, a: &Poly, b: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        self.check_shape(a)?;
        self.check_shape(b)?;
        self.check_shape(out)?;
        self.dispatch_mut(out, |sr, ch, dst| sr.add(a.channel(ch), b.channel(ch), dst));
        Ok(())
    }

    pub fn sub(&self, a: &Poly, b: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        self.check_shape(a)?;
        self.check_shape(b)?;
        self.check_shape(out)?;
        self.dispatch_mut(out, |sr, ch, dst| sr.sub(a.channel(ch), b.channel(ch), dst));
        Ok(())
    }

    pub fn neg(&self, a: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        self.check_shape(a)?;
        self.check_shape(out)?;
        self.dispatch_mut(out, |sr, ch, dst| sr.neg(a.channel(ch), dst));
        Ok(())
    }

    pub fn mul_coeffs_montgomery(&self, a: &Poly, b: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        self.check_shape(a)?;
        self.check_shape(b)?;
        self.check_shape(out)?;
        self.dispatch_mut(out, |sr, ch, dst| sr.mul_coeffs_montgomery(a.channel(ch), b.channel(ch), dst));
        Ok(())
    }

    /// Add a per-channel scalar (plain, non-Montgomery form) to every
    /// coefficient (seed scenario 2 of spec §8).
    pub fn add_scalar(&self, a: &Poly, scalars: &[u64], out: &mut Poly) -> Result<(), ShapeError> {
        self.check_shape(a)?;
        self.check_shape(out)?;
        if scalars.len() <= self.level {
            return Err(ShapeError::DestinationTooSmall {
                expected: self.level + 1,
                found: scalars.len(),
            });
        }
        self.dispatch_mut(out, |sr, ch, dst| sr.add_scalar(a.channel(ch), scalars[ch], dst));
        Ok(())
    }

    /// Per-channel scalar multiply; `scalars[ch]` is in plain (non-Montgomery) form.
    pub fn mul_scalar(&self, a: &Poly, scalars: &[u64], out: &mut Poly) -> Result<(), ShapeError> {
        self.check_shape(a)?;
        self.check_shape(out)?;
        if scalars.len() <= self.level {
            return Err(ShapeError::DestinationTooSmall {
                expected: self.level + 1,
                found: scalars.len(),
            });
        }
        self.dispatch_mut(out, |sr, ch, dst| {
            let s_mont = sr.m_form(scalars[ch] % sr.modulus);
            sr.mul_scalar_montgomery(a.channel(ch), s_mont, dst);
        });
        Ok(())
    }

    /// Multiply by a big-integer scalar reduced mod each active prime
    /// (spec §6 `mul_scalar_bigint`).
    pub fn mul_scalar_bigint(&self, a: &Poly, scalar: &num_bigint::BigUint, out: &mut Poly) -> Result<(), ShapeError> {
        let scalars: Vec<u64> = self.sub_rings[..=self.level]
            .iter()
            .map(|sr| (scalar % num_bigint::BigUint::from(sr.modulus)).to_u64_digits().first().copied().unwrap_or(0))
            .collect();
        self.mul_scalar(a, &scalars, out)
    }

    /// Reduce every coefficient into `[0, q_ch)`: collapses a polynomial
    /// that may hold lazily-widened values back to the documented range.
    pub fn reduce(&self, a: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        self.check_shape(a)?;
        self.check_shape(out)?;
        self.dispatch_mut(out, |sr, ch, dst| {
            let q = sr.modulus;
            for (x, o) in a.channel(ch).iter().zip(dst.iter_mut()) {
                let mut v = *x;
                while v >= q {
                    v -= q;
                }
                *o = v;
            }
        });
        Ok(())
    }

    pub fn m_form(&self, a: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        self.check_shape(a)?;
        self.check_shape(out)?;
        self.dispatch_mut(out, |sr, ch, dst| {
            for (x, o) in a.channel(ch).iter().zip(dst.iter_mut()) {
                *o = sr.m_form(*x);
            }
        });
        Ok(())
    }

    pub fn i_m_form(&self, a: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        self.check_shape(a)?;
        self.check_shape(out)?;
        self.dispatch_mut(out, |sr, ch, dst| {
            for (x, o) in a.channel(ch).iter().zip(dst.iter_mut()) {
                *o = sr.i_m_form(*x);
            }
        });
        Ok(())
    }

    // ---- conjugate-invariant fold/unfold (SPEC_FULL §11) ----

    /// Project a coefficient-domain polynomial onto the Conjugate-Invariant
    /// sub-ring fixed by `σ_g` with `g = nth_root - 1` (the conjugation
    /// endomorphism, spec §4.5's closing paragraph: "used to fold ...
    /// values into the Conjugate-Invariant sub-ring"). `out = (p +
    /// σ_g(p)) / 2`: a value already fixed by conjugation passes through
    /// unchanged, since `σ_g(p) == p` for it.
    pub fn fold(&self, p: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        self.check_shape(p)?;
        self.check_shape(out)?;
        let g = self.nth_root - 1;
        let mut conj = Poly::new(p.n(), p.level());
        self.permute(p, g, &mut conj);
        self.add(p, &conj, out)?;
        for ch in 0..=self.level {
            let sr = &self.sub_rings[ch];
            let q = sr.modulus;
            let inv2 = crate::word::mod_exp(2 % q, q - 2, q);
            let inv2_mont = sr.m_form(inv2);
            let mc = sr.mred_constant;
            for x in out.channel_mut(ch) {
                *x = crate::word::m_red(*x, inv2_mont, q, mc);
            }
        }
        Ok(())
    }

    /// Right inverse of [`Self::fold`] on the sub-ring it projects onto:
    /// since this crate represents a Conjugate-Invariant `Ring`'s elements
    /// at the same degree `n` as the projector's output (rather than as a
    /// compressed half of a doubled-degree ring, per the Open Question
    /// recorded in `DESIGN.md`), a value already fixed by conjugation
    /// needs no further reconstruction: `unfold` is the identity copy, and
    /// `unfold(fold(p)) == p` holds whenever `p` is already invariant
    /// (spec §8's testable property).
    pub fn unfold(&self, p: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        self.check_shape(p)?;
        self.check_shape(out)?;
        out.copy_values(p);
        Ok(())
    }

    // ---- NTT dispatch (spec §4.3) ----

    pub fn ntt(&self, a: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        self.check_shape(a)?;
        self.check_shape(out)?;
        self.dispatch_mut(out, |sr, ch, dst| {
            dst.copy_from_slice(a.channel(ch));
            sr.ntt(dst);
        });
        Ok(())
    }

    pub fn ntt_lazy(&self, a: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        self.check_shape(a)?;
        self.check_shape(out)?;
        self.dispatch_mut(out, |sr, ch, dst| {
            dst.copy_from_slice(a.channel(ch));
            sr.ntt_lazy(dst);
        });
        Ok(())
    }

    pub fn intt(&self, a: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        self.check_shape(a)?;
        self.check_shape(out)?;
        self.dispatch_mut(out, |sr, ch, dst| {
            dst.copy_from_slice(a.channel(ch));
            sr.intt(dst);
        });
        Ok(())
    }

    pub fn intt_lazy(&self, a: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        self.check_shape(a)?;
        self.check_shape(out)?;
        self.dispatch_mut(out, |sr, ch, dst| {
            dst.copy_from_slice(a.channel(ch));
            sr.intt_lazy(dst);
        });
        Ok(())
    }

    // ---- scaling: divide out the top modulus of the active chain ----

    /// `⌊x / q_level⌋ mod q_j` for every `j < level`, dropping the top
    /// channel (spec §6 `div_floor_by_last_modulus`). `a` must hold
    /// `level+1` channels in coefficient domain; `out` must hold at least
    /// `level` channels (the top one is left untouched).
    pub fn div_floor_by_last_modulus(&self, a: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        self.div_by_last_modulus(a, out, false)
    }

    /// As [`Self::div_floor_by_last_modulus`], but rounds to nearest
    /// instead of flooring.
    pub fn div_round_by_last_modulus(&self, a: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        self.div_by_last_modulus(a, out, true)
    }

    fn div_by_last_modulus(&self, a: &Poly, out: &mut Poly, round: bool) -> Result<(), ShapeError> {
        if self.level == 0 {
            return Err(ShapeError::LevelOutOfRange { level: 0, chain_len: 1 });
        }
        self.check_shape(a)?;
        if out.n() != self.n || out.channel_count() < self.level {
            return Err(ShapeError::DestinationTooSmall {
                expected: self.level,
                found: out.channel_count(),
            });
        }
        let last = &self.sub_rings[self.level];
        let q_last = last.modulus;
        let half = q_last / 2;
        let n = self.n;
        let level = self.level;
        let rescale_row = &self.rescale_constants[level];
        let sub_rings = &self.sub_rings[..level];

        out.buffer_mut()[..n * level]
            .par_chunks_mut(n)
            .zip(sub_rings.par_iter())
            .enumerate()
            .for_each(|(j, (dst, sr_j))| {
                let q_j = sr_j.modulus;
                let inv_mont = rescale_row[j];
                let last_chan = a.channel(level);
                let j_chan = a.channel(j);
                for idx in 0..n {
                    let x_last = last_chan[idx];
                    let round_bias = round && x_last >= half;
                    let x_last_mod_j = x_last % q_j;
                    let diff = crate::word::c_red(j_chan[idx] + q_j - x_last_mod_j, q_j);
                    let mut val = crate::word::m_red(diff, inv_mont, q_j, sr_j.mred_constant);
                    if round_bias {
                        val = if val + 1 >= q_j { val + 1 - q_j } else { val + 1 };
                    }
                    dst[idx] = val;
                }
            });
        Ok(())
    }

    /// Drop the top `nb_moduli` channels by repeated application of
    /// [`Self::div_floor_by_last_modulus`] (spec §6
    /// `div_floor_by_last_modulus_many`). `out` ends up with
    /// `level + 1 - nb_moduli` channels.
    pub fn div_floor_by_last_modulus_many(&self, a: &Poly, nb_moduli: usize, out: &mut Poly) -> Result<(), ShapeError> {
        self.div_by_last_modulus_many(a, nb_moduli, out, false)
    }

    /// As [`Self::div_floor_by_last_modulus_many`], rounding instead of
    /// flooring at each dropped modulus.
    pub fn div_round_by_last_modulus_many(&self, a: &Poly, nb_moduli: usize, out: &mut Poly) -> Result<(), ShapeError> {
        self.div_by_last_modulus_many(a, nb_moduli, out, true)
    }

    fn div_by_last_modulus_many(&self, a: &Poly, nb_moduli: usize, out: &mut Poly, round: bool) -> Result<(), ShapeError> {
        if nb_moduli == 0 {
            out.copy_values(a);
            return Ok(());
        }
        if nb_moduli > self.level {
            return Err(ShapeError::LevelOutOfRange {
                level: self.level,
                chain_len: nb_moduli,
            });
        }
        let mut cur = Poly::new(self.n, self.level);
        cur.copy_values(a);
        for step in 0..nb_moduli {
            let view = self.at_level(self.level - step)?;
            let mut next = Poly::new(self.n, self.level - step - 1);
            view.div_by_last_modulus(&cur, &mut next, round)?;
            cur = next;
        }
        out.copy_values(&cur);
        Ok(())
    }

    /// NTT-domain variant of [`Self::div_floor_by_last_modulus`]: converts
    /// to coefficient domain, drops the top channel, and transforms back
    /// with the reduced-level ring (spec §6 `div_floor_by_last_modulus_ntt`).
    pub fn div_floor_by_last_modulus_ntt(&self, a: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        self.div_by_last_modulus_many_ntt(a, 1, out, false)
    }

    /// As [`Self::div_floor_by_last_modulus_ntt`], rounding instead of flooring.
    pub fn div_round_by_last_modulus_ntt(&self, a: &Poly, out: &mut Poly) -> Result<(), ShapeError> {
        self.div_by_last_modulus_many_ntt(a, 1, out, true)
    }

    /// NTT-domain variant of [`Self::div_floor_by_last_modulus_many`].
    pub fn div_floor_by_last_modulus_many_ntt(&self, a: &Poly, nb_moduli: usize, out: &mut Poly) -> Result<(), ShapeError> {
        self.div_by_last_modulus_many_ntt(a, nb_moduli, out, false)
    }

    /// As [`Self::div_floor_by_last_modulus_many_ntt`], rounding instead of flooring.
    pub fn div_round_by_last_modulus_many_ntt(&self, a: &Poly, nb_moduli: usize, out: &mut Poly) -> Result<(), ShapeError> {
        self.div_by_last_modulus_many_ntt(a, nb_moduli, out, true)
    }

    fn div_by_last_modulus_many_ntt(&self, a: &Poly, nb_moduli: usize, out: &mut Poly, round: bool) -> Result<(), ShapeError> {
        self.check_shape(a)?;
        if nb_moduli > self.level {
            return Err(ShapeError::LevelOutOfRange {
                level: self.level,
                chain_len: nb_moduli,
            });
        }
        let mut coeffs = Poly::new(self.n, self.level);
        self.intt(a, &mut coeffs)?;
        let mut dropped_coeffs = Poly::new(self.n, self.level - nb_moduli);
        self.div_by_last_modulus_many(&coeffs, nb_moduli, &mut dropped_coeffs, round)?;
        let view = self.at_level(self.level - nb_moduli)?;
        view.ntt(&dropped_coeffs, out)
    }
}
