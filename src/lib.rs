//! RNS polynomial-ring arithmetic for ring-learning-with-errors
//! cryptosystems: negacyclic and conjugate-invariant cyclotomic rings over a
//! chain of word-sized NTT-friendly primes, with RNS basis conversion,
//! Galois automorphisms, and the samplers such systems draw secrets and
//! error terms from.
//!
//! This crate is a throughput-oriented arithmetic core, not a cryptosystem:
//! it has no notion of a key, a ciphertext, or a security parameter beyond
//! the ring dimension and modulus chain the caller chooses. Side-channel
//! resistance is explicitly out of scope (see [`word`]'s module docs).

pub mod automorphism;
pub mod basis;
pub mod bigint;
pub mod distribution;
pub mod error;
pub mod ntt;
pub mod poly;
pub mod primes;
pub mod prng;
pub mod ring;
pub mod sampler;
pub mod subring;
pub mod word;

pub use basis::{BasisExtender, Decomposer, ModUpConstants};
pub use distribution::Distribution;
pub use error::{ConstructionError, DistributionError, EncodingError, RingError, SamplerError, ShapeError};
pub use poly::{Poly, Pool, PolyShape};
pub use prng::Prng;
pub use ring::{Ring, RingVariant};
pub use sampler::{new_gaussian_sampler, new_ternary_sampler, new_uniform_sampler, GaussianSampler, TernarySampler, UniformSampler};
pub use subring::SubRing;
