//! Uniform sampler: `[0, q_i)` per channel via rejection sampling (spec
//! §4.6 `new_uniform_sampler`).

use crate::error::SamplerError;
use crate::poly::Poly;
use crate::prng::Prng;
use crate::ring::Ring;
use crate::sampler::{bytes_to_u64_le, rejection_mask, ByteBuffer};

/// Draws coefficients uniformly from `[0, q_i)` for every active channel of
/// a [`Ring`].
pub struct UniformSampler<'r, P: Prng> {
    ring: &'r Ring,
    prng: P,
}

/// Build a uniform sampler over `ring`'s active channel prefix, reading
/// randomness from `prng` (spec §6 `new_uniform_sampler(prng, ring)`).
pub fn new_uniform_sampler<P: Prng>(prng: P, ring: &Ring) -> UniformSampler<'_, P> {
    UniformSampler { ring, prng }
}

impl<'r, P: Prng> UniformSampler<'r, P> {
    /// Overwrite every active coefficient of `out` with a fresh uniform draw.
    pub fn read(&mut self, out: &mut Poly) -> Result<(), SamplerError> {
        self.fill(out, false)
    }

    /// Accumulate a fresh uniform draw into `out`, reducing mod `q_i`.
    pub fn read_and_add(&mut self, out: &mut Poly) -> Result<(), SamplerError> {
        self.fill(out, true)
    }

    fn fill(&mut self, out: &mut Poly, add: bool) -> Result<(), SamplerError> {
        let n = self.ring.n();
        for ch in 0..=self.ring.level() {
            let q = self.ring.sub_ring(ch).modulus;
            let (mask, byte_width) = rejection_mask(q);
            let mut buffer = ByteBuffer::new(&mut self.prng, n * byte_width);
            let dst = out.channel_mut(ch);
            for slot in dst.iter_mut().take(n) {
                let value = loop {
                    let bytes = buffer.next_bytes(byte_width)?;
                    let candidate = bytes_to_u64_le(bytes) & mask;
                    if candidate < q {
                        break candidate;
                    }
                };
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;
    use rand_core::SeedableRng;

    #[test]
    fn draws_stay_in_range() {
        let ring = Ring::new(64, &[12289]).unwrap();
        let rng = ChaCha8Rng::seed_from_u64(7);
        let mut sampler = new_uniform_sampler(rng, &ring);
        let mut p = Poly::new(64, 0);
        sampler.read(&mut p).unwrap();
        for &c in p.channel(0) {
            assert!(c < 12289);
        }
    }

    #[test]
    fn repeated_reads_differ() {
        let ring = Ring::new(64, &[12289]).unwrap();
        let rng = ChaCha8Rng::seed_from_u64(11);
        let mut sampler = new_uniform_sampler(rng, &ring);
        let mut a = Poly::new(64, 0);
        sampler.read(&mut a).unwrap();
        let mut b = Poly::new(64, 0);
        sampler.read(&mut b).unwrap();
        assert_ne!(a.channel(0), b.channel(0));
    }
}
