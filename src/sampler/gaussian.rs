//! Centered discrete Gaussian sampler via Knuth–Yao (spec §4.6
//! `new_gaussian_sampler`).
//!
//! The magnitude is drawn from a precomputed binary-expansion probability
//! table (56-bit fixed-point precision, spec §4.6) folding the `+m`/`-m`
//! mass of each nonzero magnitude together; the sign is then drawn
//! separately as a single fair bit. Magnitudes are truncated to
//! `[0, bound]` by construction, so no post-hoc rejection is needed.

use crate::error::{DistributionError, SamplerError};
use crate::poly::Poly;
use crate::prng::Prng;
use crate::ring::Ring;
use crate::sampler::BitCursor;

const PRECISION_BITS: u32 = 56;

/// Draws centered discrete Gaussian coefficients, truncated to
/// `[-bound, bound]`, for every active channel of a [`Ring`].
pub struct GaussianSampler<'r, P: Prng> {
    ring: &'r Ring,
    prng: P,
    bound: i64,
    /// `table[row]` = the 56-bit fixed-point combined probability mass of
    /// magnitude `row` (`row == 0` is unsigned; `row > 0` folds `+row` and
    /// `-row` together, split later by an independent sign bit).
    table: Vec<u64>,
}

/// Build a Gaussian sampler over `ring`'s active channel prefix with
/// standard deviation `sigma`, truncated to `[-bound, bound]`.
pub fn new_gaussian_sampler<P: Prng>(
    prng: P,
    ring: &Ring,
    sigma: f64,
    bound: i64,
) -> Result<GaussianSampler<'_, P>, DistributionError> {
    if sigma <= 0.0 {
        return Err(DistributionError::NonPositiveSigma(sigma));
    }
    if bound < 0 {
        return Err(DistributionError::NegativeBound(bound));
    }
    let table = build_probability_table(sigma, bound);
    Ok(GaussianSampler { ring, prng, bound, table })
}

/// Build the 56-bit fixed-point magnitude-probability table described above.
fn build_probability_table(sigma: f64, bound: i64) -> Vec<u64> {
    let rows = (bound + 1) as usize;
    let mut weights = vec![0f64; rows];
    weights[0] = gaussian_density(0.0, sigma);
    for m in 1..rows {
        weights[m] = 2.0 * gaussian_density(m as f64, sigma);
    }
    let total: f64 = weights.iter().sum();
    let scale = (1u64 << PRECISION_BITS) as f64;

    let mut table: Vec<u64> = weights.iter().map(|w| ((w / total) * scale).round() as u64).collect();

    // Rounding can leave the fixed-point probabilities summing to slightly
    // more or less than 2^PRECISION_BITS; fold the discrepancy into the
    // heaviest row (row 0, the mode of the distribution) so Knuth–Yao's
    // exact-termination invariant holds.
    let sum: i128 = table.iter().map(|&x| x as i128).sum();
    let target = 1i128 << PRECISION_BITS;
    let delta = target - sum;
    if delta != 0 {
        let adjusted = table[0] as i128 + delta;
        table[0] = adjusted.max(0) as u64;
    }
    table
}

fn gaussian_density(x: f64, sigma: f64) -> f64 {
    (-x * x / (2.0 * sigma * sigma)).exp()
}

impl<'r, P: Prng> GaussianSampler<'r, P> {
    /// Overwrite every active coefficient of `out` with a fresh draw.
    pub fn read(&mut self, out: &mut Poly) -> Result<(), SamplerError> {
        self.fill(out, false)
    }

    /// Accumulate a fresh draw into `out`, reducing mod `q_i`.
    pub fn read_and_add(&mut self, out: &mut Poly) -> Result<(), SamplerError> {
        self.fill(out, true)
    }

    /// Draw one signed magnitude per coefficient index (shared across every
    /// channel, mirroring `TernarySampler::draw_sparse`/`draw_dense`): the
    /// polynomial's coefficient at index `i` is a single underlying integer,
    /// so its residue at every `q_i` must come from the same draw rather
    /// than an independent one per channel.
    fn draw_magnitudes(&mut self, n: usize) -> Result<Vec<i64>, SamplerError> {
        let table = &self.table;
        let mut cursor = BitCursor::new(&mut self.prng);
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            let magnitude = sample_magnitude(&mut cursor, table)? as i64;
            let signed = if magnitude == 0 {
                0
            } else if cursor.next_bit()? == 1 {
                -magnitude
            } else {
                magnitude
            };
            values.push(signed);
        }
        Ok(values)
    }

    fn fill(&mut self, out: &mut Poly, add: bool) -> Result<(), SamplerError> {
        let n = self.ring.n();
        let values = self.draw_magnitudes(n)?;

        for ch in 0..=self.ring.level() {
            let q = self.ring.sub_ring(ch).modulus;
            let dst = out.channel_mut(ch);
            for (slot, &v) in dst.iter_mut().take(n).zip(values.iter()) {
                let signed = if v == 0 {
                    0u64
                } else if v < 0 {
                    q - (-v) as u64 % q
                } else {
                    v as u64 % q
                };
                *slot = if add {
                    let s = *slot + signed;
                    if s >= q {
                        s - q
                    } else {
                        s
                    }
                } else {
                    signed
                };
            }
        }
        Ok(())
    }

    pub fn bound(&self) -> i64 {
        self.bound
    }
}

/// Knuth–Yao DDG-tree traversal over `table` (one probability per row),
/// consuming one fresh bit per column. Terminates as soon as the running
/// distance hits `-1` against some row's probability bit; a capped column
/// count guards against the fixed-point rounding residue ever preventing
/// termination (in practice it always resolves well before the cap).
fn sample_magnitude<P: Prng>(cursor: &mut BitCursor<'_, P>, table: &[u64]) -> Result<usize, SamplerError> {
    let mut distance: i64 = 0;
    for column in (0..PRECISION_BITS).rev() {
        let bit = cursor.next_bit()?;
        distance = 2 * distance + bit as i64;
        for (row, &prob) in table.iter().enumerate() {
            let prob_bit = ((prob >> column) & 1) as i64;
            distance -= prob_bit;
            if distance == -1 {
                return Ok(row);
            }
        }
    }
    Ok(table.len() - 1)
}
