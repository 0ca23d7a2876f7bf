//! Error taxonomy for the ring-arithmetic boundary.
//!
//! Internal kernels that presuppose validated shapes (matching `N`, a level
//! within range) use `debug_assert!` instead of returning a `Result`: a
//! mismatch there is a caller bug, not a recoverable runtime condition.

use thiserror::Error;

/// Failure constructing a [`crate::ring::Ring`] or [`crate::subring::SubRing`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("ring degree n = {0} is not a power of two")]
    NotPowerOfTwo(u64),

    #[error("ring degree n = {0} is below the minimum of 8")]
    DegreeTooSmall(u64),

    #[error("modulus chain is empty")]
    EmptyModulusChain,

    #[error("modulus {0} is not prime")]
    NotPrime(u64),

    #[error("modulus {modulus} does not satisfy modulus ≡ 1 (mod {nth_root})")]
    NoNthRoot { modulus: u64, nth_root: u64 },

    #[error("modulus {0} appears more than once in the chain")]
    DuplicateModulus(u64),

    #[error("modulus {0} exceeds the 62-bit word limit")]
    ModulusTooLarge(u64),

    #[error("requested {requested} NTT-friendly primes but only found {found} within the search window")]
    InsufficientPrimes { requested: usize, found: usize },
}

/// Failure on a polynomial-shape boundary (level, length, aliasing contract).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("polynomial degree n = {found} does not match ring degree n = {expected}")]
    DegreeMismatch { expected: usize, found: usize },

    #[error("level {level} is out of range for a chain of length {chain_len}")]
    LevelOutOfRange { level: usize, chain_len: usize },

    #[error("destination buffer has {found} channels, need at least {expected}")]
    DestinationTooSmall { expected: usize, found: usize },

    #[error("operation does not support in-place aliasing of its arguments")]
    AliasedInPlace,
}

/// Failure decoding a serialized [`crate::poly::Poly`] or [`crate::ring::Ring`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("buffer truncated: header requires at least {expected} bytes, got {found}")]
    HeaderTruncated { expected: usize, found: usize },

    #[error("invalid header field: {0}")]
    InvalidHeader(String),

    #[error("body length mismatch: expected {expected} bytes, got {found}")]
    BodyLengthMismatch { expected: usize, found: usize },

    #[error(transparent)]
    Construction(#[from] ConstructionError),
}

/// Failure configuring a distribution for a sampler.
///
/// `PartialEq` only (not `Eq`): the `f64` fields carried by some variants
/// are not reflexively comparable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistributionError {
    #[error("ternary distribution must set exactly one of density p, hamming weight h (got p={p}, h={h})")]
    TernaryAmbiguous { p: f64, h: i64 },

    #[error("ternary density p = {0} is out of range (0, 1]")]
    TernaryDensityOutOfRange(f64),

    #[error("gaussian standard deviation must be positive, got {0}")]
    NonPositiveSigma(f64),

    #[error("gaussian bound must be non-negative, got {0}")]
    NegativeBound(i64),

    #[error("hamming weight {requested} exceeds ring degree {n}, clamping to {n}")]
    HammingWeightClamped { requested: usize, n: usize },
}

/// Failure reading from the injected PRNG.
#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("distribution configuration error: {0}")]
    Distribution(#[from] DistributionError),

    #[error("prng exhausted or failed: {0}")]
    PrngFailure(String),
}

/// Top level error returned by the public, fallible entry points of this crate.
#[derive(Error, Debug)]
pub enum RingError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Distribution(#[from] DistributionError),

    #[error(transparent)]
    Sampler(#[from] SamplerError),
}
