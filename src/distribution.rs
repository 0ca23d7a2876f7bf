//! Sampler distribution configuration and its tagged wire format (spec §6
//! "Distribution tagged serialization").

use crate::error::DistributionError;

/// Which probability distribution a sampler draws coefficients from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Distribution {
    /// Uniform over `[0, q_i)` per channel.
    Uniform,
    /// `{-1, 0, +1}`-valued: either a density `p` (each coefficient is
    /// nonzero with probability `p`, split evenly between +1 and -1) or a
    /// fixed Hamming weight `h` (exactly `h` nonzero coefficients).
    Ternary { p: f64, h: i64 },
    /// Centered discrete Gaussian with standard deviation `sigma`,
    /// truncated to `[-bound, bound]`.
    Gaussian { sigma: f64, bound: i64 },
}

impl Distribution {
    pub fn uniform() -> Self {
        Distribution::Uniform
    }

    /// Ternary distribution by density: each coefficient is nonzero with
    /// probability `p` (this constructor always sets `h = 0`). `p` must be
    /// in `(0, 1]`: `p = 0` would construct a value indistinguishable from
    /// "neither p nor h set", which [`Self::validate`] rejects (spec §9's
    /// Open Question: the ambiguous/all-zero ternary distribution is
    /// rejected, not silently treated as the zero polynomial), so this
    /// constructor rejects it up front too rather than building a
    /// `Distribution` that would fail its own `validate`.
    pub fn ternary_density(p: f64) -> Result<Self, DistributionError> {
        if !(p > 0.0 && p <= 1.0) {
            return Err(DistributionError::TernaryDensityOutOfRange(p));
        }
        Ok(Distribution::Ternary { p, h: 0 })
    }

    /// Ternary distribution by exact Hamming weight `h`. `h` is clamped to
    /// `n` with a non-fatal [`DistributionError::HammingWeightClamped`]
    /// surfaced to the caller as a warning return rather than failing.
    pub fn ternary_hamming_weight(h: usize, n: usize) -> (Self, Option<DistributionError>) {
        let (clamped, warning) = if h > n {
            (n, Some(DistributionError::HammingWeightClamped { requested: h, n }))
        } else {
            (h, None)
        };
        (Distribution::Ternary { p: 0.0, h: clamped as i64 }, warning)
    }

    pub fn gaussian(sigma: f64, bound: i64) -> Result<Self, DistributionError> {
        if sigma <= 0.0 {
            return Err(DistributionError::NonPositiveSigma(sigma));
        }
        if bound < 0 {
            return Err(DistributionError::NegativeBound(bound));
        }
        Ok(Distribution::Gaussian { sigma, bound })
    }

    /// Validate the exactly-one-of-{P,H} invariant for a manually
    /// constructed [`Distribution::Ternary`] (e.g. after deserializing).
    pub fn validate(&self) -> Result<(), DistributionError> {
        match *self {
            Distribution::Ternary { p, h } => {
                let p_set = p != 0.0;
                let h_set = h != 0;
                if p_set == h_set {
                    return Err(DistributionError::TernaryAmbiguous { p, h });
                }
                Ok(())
            }
            Distribution::Gaussian { sigma, bound } => {
                if sigma <= 0.0 {
                    return Err(DistributionError::NonPositiveSigma(sigma));
                }
                if bound < 0 {
                    return Err(DistributionError::NegativeBound(bound));
                }
                Ok(())
            }
            Distribution::Uniform => Ok(()),
        }
    }

    pub fn marshal(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(17);
        match *self {
            Distribution::Uniform => {
                out.push(1);
            }
            Distribution::Ternary { p, h } => {
                out.push(2);
                out.extend_from_slice(&p.to_bits().to_le_bytes());
                out.extend_from_slice(&h.to_le_bytes());
            }
            Distribution::Gaussian { sigma, bound } => {
                out.push(3);
                out.extend_from_slice(&sigma.to_bits().to_le_bytes());
                out.extend_from_slice(&bound.to_le_bytes());
            }
        }
        out
    }

    pub fn unmarshal(bytes: &[u8]) -> Result<Self, crate::error::EncodingError> {
        use crate::error::EncodingError;
        if bytes.is_empty() {
            return Err(EncodingError::HeaderTruncated { expected: 1, found: 0 });
        }
        match bytes[0] {
            1 => Ok(Distribution::Uniform),
            2 => {
                if bytes.len() != 17 {
                    return Err(EncodingError::BodyLengthMismatch { expected: 16, found: bytes.len() - 1 });
                }
                let p = f64::from_bits(u64::from_le_bytes(bytes[1..9].try_into().unwrap()));
                let h = i64::from_le_bytes(bytes[9..17].try_into().unwrap());
                Ok(Distribution::Ternary { p, h })
            }
            3 => {
                if bytes.len() != 17 {
                    return Err(EncodingError::BodyLengthMismatch { expected: 16, found: bytes.len() - 1 });
                }
                let sigma = f64::from_bits(u64::from_le_bytes(bytes[1..9].try_into().unwrap()));
                let bound = i64::from_le_bytes(bytes[9..17].try_into().unwrap());
                Ok(Distribution::Gaussian { sigma, bound })
            }
            other => Err(EncodingError::InvalidHeader(format!("unknown distribution kind tag {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_round_trips() {
        let d = Distribution::Uniform;
        assert_eq!(Distribution::unmarshal(&d.marshal()).unwrap(), d);
    }

    #[test]
    fn ternary_round_trips() {
        let d = Distribution::Ternary { p: 0.25, h: 0 };
        assert_eq!(Distribution::unmarshal(&d.marshal()).unwrap(), d);
    }

    #[test]
    fn gaussian_round_trips() {
        let d = Distribution::Gaussian { sigma: 3.2, bound: 19 };
        assert_eq!(Distribution::unmarshal(&d.marshal()).unwrap(), d);
    }

    #[test]
    fn rejects_ambiguous_ternary_on_validate() {
        let both = Distribution::Ternary { p: 0.5, h: 4 };
        assert!(both.validate().is_err());
        let neither = Distribution::Ternary { p: 0.0, h: 0 };
        assert!(neither.validate().is_err());
    }

    #[test]
    fn ternary_density_rejects_zero_and_out_of_range() {
        // p = 0 would build a Ternary{p: 0.0, h: 0} indistinguishable from
        // "neither set", which `validate` rejects — the constructor must
        // refuse it up front instead of disagreeing with `validate`.
        assert!(Distribution::ternary_density(0.0).is_err());
        assert!(Distribution::ternary_density(-0.1).is_err());
        assert!(Distribution::ternary_density(1.1).is_err());
        assert!(Distribution::ternary_density(1.0).is_ok());
    }

    #[test]
    fn hamming_weight_clamps_when_too_large() {
        let (d, warning) = Distribution::ternary_hamming_weight(100, 16);
        assert!(warning.is_some());
        assert_eq!(d, Distribution::Ternary { p: 0.0, h: 16 });
    }
}
