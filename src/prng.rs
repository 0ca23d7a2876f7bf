//! The capability interface samplers read from (spec §6: `Prng::fill`).
//!
//! The core never opens or reseeds a PRNG; it only consumes one injected by
//! the caller. Any `rand_core::RngCore` satisfies this trait for free, since
//! `fill_bytes` is infallible there; a caller wiring in a fallible entropy
//! source (e.g. a hardware RNG) implements [`Prng`] directly and returns
//! [`crate::error::SamplerError::PrngFailure`] on exhaustion.

use crate::error::SamplerError;

/// A byte-filling randomness source. Mirrors `rand_core::RngCore::fill_bytes`
/// but returns a `Result` so a fallible entropy source can report failure
/// instead of panicking (spec §7: `SamplerDrainError`).
pub trait Prng {
    /// Fill `dest` completely with fresh random bytes.
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), SamplerError>;
}

impl<R: rand_core::RngCore> Prng for R {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), SamplerError> {
        self.fill_bytes(dest);
        Ok(())
    }
}
