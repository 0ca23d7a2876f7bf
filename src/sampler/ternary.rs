//! Ternary (`{-1, 0, +1}`-valued) sampler, density-`p` and fixed-Hamming-
//! weight variants (spec §4.6 `new_ternary_sampler`).

use crate::distribution::Distribution;
use crate::error::{DistributionError, SamplerError};
use crate::poly::Poly;
use crate::prng::Prng;
use crate::ring::Ring;
use crate::sampler::BitCursor;

const PRECISION_BITS: u32 = 56;

/// Draws `{-1, 0, +1}`-valued coefficients, either at density `p` or with an
/// exact Hamming weight, for every active channel of a [`Ring`]. The same
/// sign/zero decision applies across all channels for a given coefficient
/// index, mapped through each channel's own `q_i - 1` representation of -1.
pub struct TernarySampler<'r, P: Prng> {
    ring: &'r Ring,
    prng: P,
    distribution: Distribution,
    /// When set, coefficients are written already converted into Montgomery
    /// form (spec §6 `new_ternary_sampler(..., montgomery)`).
    montgomery: bool,
}

/// Build a ternary sampler over `ring`'s active channel prefix. `X` selects
/// density-`p` or fixed-Hamming-weight behavior (exactly one of `p`/`h` set,
/// spec §7 `DistributionError::TernaryAmbiguous`).
pub fn new_ternary_sampler<P: Prng>(
    prng: P,
    ring: &Ring,
    x: Distribution,
    montgomery: bool,
) -> Result<TernarySampler<'_, P>, DistributionError> {
    x.validate()?;
    if !matches!(x, Distribution::Ternary { .. }) {
        return Err(DistributionError::TernaryAmbiguous { p: 0.0, h: 0 });
    }
    Ok(TernarySampler { ring, prng, distribution: x, montgomery })
}

impl<'r, P: Prng> TernarySampler<'r, P> {
    pub fn read(&mut self, out: &mut Poly) -> Result<(), SamplerError> {
        self.fill(out, false)
    }

    pub fn read_and_add(&mut self, out: &mut Poly) -> Result<(), SamplerError> {
        self.fill(out, true)
    }

    fn fill(&mut self, out: &mut Poly, add: bool) -> Result<(), SamplerError> {
        let n = self.ring.n();
        let signs = match self.distribution {
            Distribution::Ternary { h, .. } if h > 0 => self.draw_sparse(n, h as usize)?,
            Distribution::Ternary { p, .. } => self.draw_dense(n, p)?,
            _ => unreachable!("validated to be Ternary at construction"),
        };

        for ch in 0..=self.ring.level() {
            let sr = self.ring.sub_ring(ch);
            let q = sr.modulus;
            let dst = out.channel_mut(ch);
            for (slot, sign) in dst.iter_mut().take(n).zip(signs.iter()) {
                let plain = match sign {
                    Sign::Zero => 0u64,
                    Sign::Positive => 1u64,
                    Sign::Negative => q - 1,
                };
                let value = if self.montgomery { sr.m_form(plain) } else { plain };
                *slot = if add {
                    let s = *slot + value;
                    if s >= q {
                        s - q
                    } else {
                        s
                    }
                } else {
                    value
                };
            }
        }
        Ok(())
    }

    /// Draw `h` distinct nonzero indices via a shrinking rejection-sampled
    /// candidate pool (swap-with-last), each with an independent sign bit;
    /// all other positions are zero (spec §4.6 "Ternary sparse").
    fn draw_sparse(&mut self, n: usize, h: usize) -> Result<Vec<Sign>, SamplerError> {
        let h = h.min(n);
        let mut pool: Vec<usize> = (0..n).collect();
        let mut result = vec![Sign::Zero; n];
        let mut cursor = BitCursor::new(&mut self.prng);
        let mut remaining = n;
        for _ in 0..h {
            let pick = uniform_index_below(&mut cursor, remaining)?;
            let index = pool[pick];
            pool.swap(pick, remaining - 1);
            remaining -= 1;
            result[index] = if cursor.next_bit()? == 1 { Sign::Negative } else { Sign::Positive };
        }
        Ok(result)
    }

    /// Draw `n` independent coefficients, each nonzero with probability `p`
    /// (split evenly between +1/-1) via a binary-expansion Bernoulli
    /// comparison, except `p = 0.5` which reads the nonzero/sign bits
    /// directly (spec §4.6 "Ternary density-p").
    fn draw_dense(&mut self, n: usize, p: f64) -> Result<Vec<Sign>, SamplerError> {
        let mut cursor = BitCursor::new(&mut self.prng);
        let mut result = Vec::with_capacity(n);
        let threshold = ((p.clamp(0.0, 1.0)) * (1u64 << PRECISION_BITS) as f64).round() as u64;
        let is_half = (p - 0.5).abs() < f64::EPSILON;
        for _ in 0..n {
            let nonzero = if is_half {
                cursor.next_bit()? == 1
            } else {
                bernoulli_fixed_point(&mut cursor, threshold)?
            };
            result.push(if !nonzero {
                Sign::Zero
            } else if cursor.next_bit()? == 1 {
                Sign::Negative
            } else {
                Sign::Positive
            });
        }
        Ok(result)
    }
}

#[derive(Clone, Copy)]
enum Sign {
    Zero,
    Positive,
    Negative,
}

/// Compare a random `PRECISION_BITS`-bit fraction against `threshold`'s
/// binary expansion bit by bit, returning `true` (event occurs) as soon as
/// the random stream's bit is less than `threshold`'s bit at the first
/// position they differ — the standard technique for drawing an exact
/// Bernoulli(`threshold / 2^PRECISION_BITS`) without materializing a full
/// uniform integer first.
fn bernoulli_fixed_point<P: Prng>(cursor: &mut BitCursor<'_, P>, threshold: u64) -> Result<bool, SamplerError> {
    for col in (0..PRECISION_BITS).rev() {
        let p_bit = (threshold >> col) & 1;
        let r_bit = cursor.next_bit()? as u64;
        if r_bit != p_bit {
            return Ok(r_bit < p_bit);
        }
    }
    Ok(false)
}

/// Uniform index in `0..bound` via byte-width rejection sampling over the
/// bit cursor's underlying PRNG.
fn uniform_index_below<P: Prng>(cursor: &mut BitCursor<'_, P>, bound: usize) -> Result<usize, SamplerError> {
    if bound <= 1 {
        return Ok(0);
    }
    let (mask, _) = crate::sampler::rejection_mask(bound as u64);
    loop {
        let mut bits = 0u64;
        let width = 64 - (bound as u64 - 1).leading_zeros();
        for _ in 0..width {
            bits = (bits << 1) | cursor.next_bit()? as u64;
        }
        let candidate = bits & mask;
        if (candidate as usize) < bound {
            return Ok(candidate as usize);
        }
    }
}
