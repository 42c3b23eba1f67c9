//! Hill-type dose-response kinetics.
//!
//! The response to a signal concentration `c` is
//! `E(c) = c^h / (c^h + k^h) * 0.5`, evaluated here as `0.5 / (1 + (k/c)^h)`
//! so that very large concentrations saturate instead of overflowing.
//! `E(0) = 0`, `E(k) = 0.25`, and `E -> 0.5` as `c -> inf`. A Hill coefficient of
//! zero pins `E` at `0.25` for every concentration.

use crate::constants::HILL_RESPONSE_CEILING;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KineticsError {
    #[error("Hill coefficient must be finite and non-negative")]
    InvalidHillCoefficient,
    /// A zero half-max leaves `E(0)` undefined.
    #[error("half-maximal concentration must be positive and finite")]
    DegenerateHalfMax,
    #[error("maximum apoptosis rate must be finite and non-negative")]
    InvalidMaxApoptosis,
    #[error("potential threshold must be finite")]
    InvalidPotentialThreshold,
}

/// Per-agent pharmacodynamic parameters. Read-only once an agent exists.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KineticParams {
    #[serde(alias = "Hill_coefficient")]
    pub hill_coefficient: f64,
    #[serde(alias = "PD_half_max")]
    pub half_max: f64,
    #[serde(alias = "PD_max_apoptosis")]
    pub max_apoptosis: f64,
    /// Half-width of the symmetric potential band that damps secretion.
    pub potential_threshold: f64,
}

impl Default for KineticParams {
    fn default() -> Self {
        Self {
            hill_coefficient: 2.0,
            half_max: 0.5,
            max_apoptosis: 0.1,
            potential_threshold: 0.05,
        }
    }
}

impl KineticParams {
    pub fn validate(&self) -> Result<(), KineticsError> {
        if !(self.hill_coefficient.is_finite() && self.hill_coefficient >= 0.0) {
            return Err(KineticsError::InvalidHillCoefficient);
        }
        if !(self.half_max.is_finite() && self.half_max > 0.0) {
            return Err(KineticsError::DegenerateHalfMax);
        }
        if !(self.max_apoptosis.is_finite() && self.max_apoptosis >= 0.0) {
            return Err(KineticsError::InvalidMaxApoptosis);
        }
        if !self.potential_threshold.is_finite() {
            return Err(KineticsError::InvalidPotentialThreshold);
        }
        Ok(())
    }

    /// Normalized Hill response to `concentration`.
    pub fn response(&self, concentration: f64) -> f64 {
        hill_response(concentration, self.hill_coefficient, self.half_max)
    }

    /// True when `potential` lies strictly inside `(-threshold, threshold)`.
    pub fn in_potential_band(&self, potential: f64) -> bool {
        potential > -self.potential_threshold && potential < self.potential_threshold
    }
}

/// `c^h / (c^h + k^h) * 0.5`. Concentrations are not validated.
pub fn hill_response(concentration: f64, hill_coefficient: f64, half_max: f64) -> f64 {
    let ratio = (half_max / concentration).powf(hill_coefficient);
    HILL_RESPONSE_CEILING / (1.0 + ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn response_is_zero_without_signal() {
        assert_eq!(hill_response(0.0, 2.0, 0.5), 0.0);
        assert_eq!(hill_response(0.0, 0.5, 3.0), 0.0);
    }

    #[test]
    fn response_is_quarter_at_half_max() {
        for (h, k) in [(1.0, 0.5), (2.0, 0.5), (4.0, 12.0), (0.3, 1e-3)] {
            assert_eq!(hill_response(k, h, k), 0.25, "h={h} k={k}");
        }
    }

    #[test]
    fn response_saturates_at_ceiling() {
        let e = hill_response(1e12, 2.0, 0.5);
        assert!((e - HILL_RESPONSE_CEILING).abs() < 1e-12);
        assert_eq!(hill_response(f64::INFINITY, 2.0, 0.5), HILL_RESPONSE_CEILING);
        assert_eq!(hill_response(f64::MAX, 8.0, 0.5), HILL_RESPONSE_CEILING);
    }

    #[test]
    fn zero_hill_coefficient_is_constant_quarter() {
        for c in [0.0, 1e-9, 0.5, 3.0, 1e9] {
            assert_eq!(hill_response(c, 0.0, 0.5), 0.25, "c={c}");
        }
    }

    #[test]
    fn potential_band_excludes_endpoints() {
        let params = KineticParams {
            potential_threshold: 0.2,
            ..KineticParams::default()
        };
        assert!(params.in_potential_band(0.0));
        assert!(params.in_potential_band(0.199));
        assert!(params.in_potential_band(-0.199));
        assert!(!params.in_potential_band(0.2));
        assert!(!params.in_potential_band(-0.2));
        assert!(!params.in_potential_band(0.5));
        assert!(!params.in_potential_band(f64::NAN));
    }

    #[test]
    fn non_positive_threshold_gives_empty_band() {
        let params = KineticParams {
            potential_threshold: 0.0,
            ..KineticParams::default()
        };
        assert!(!params.in_potential_band(0.0));
    }

    #[test]
    fn validate_rejects_degenerate_parameters() {
        let base = KineticParams::default();
        assert!(base.validate().is_ok());
        let cases = [
            (
                KineticParams {
                    half_max: 0.0,
                    ..base
                },
                KineticsError::DegenerateHalfMax,
            ),
            (
                KineticParams {
                    half_max: -1.0,
                    ..base
                },
                KineticsError::DegenerateHalfMax,
            ),
            (
                KineticParams {
                    hill_coefficient: f64::NAN,
                    ..base
                },
                KineticsError::InvalidHillCoefficient,
            ),
            (
                KineticParams {
                    max_apoptosis: -0.1,
                    ..base
                },
                KineticsError::InvalidMaxApoptosis,
            ),
            (
                KineticParams {
                    potential_threshold: f64::INFINITY,
                    ..base
                },
                KineticsError::InvalidPotentialThreshold,
            ),
        ];
        for (params, expected) in cases {
            assert_eq!(params.validate(), Err(expected));
        }
    }

    #[test]
    fn validate_accepts_zero_hill_coefficient() {
        let params = KineticParams {
            hill_coefficient: 0.0,
            ..KineticParams::default()
        };
        assert!(params.validate().is_ok());
    }

    proptest! {
        #[test]
        fn proptest_response_matches_textbook_form(
            c in 1e-3f64..1e3,
            h in 0.0f64..6.0,
            k in 1e-3f64..1e3,
        ) {
            let c_h = c.powf(h);
            let k_h = k.powf(h);
            let textbook = c_h / (c_h + k_h) * 0.5;
            prop_assert!((hill_response(c, h, k) - textbook).abs() < 1e-12);
        }

        #[test]
        fn proptest_response_bounded_and_monotone(
            c in 0.0f64..1e6,
            dc in 0.0f64..1e6,
            h in 1e-3f64..8.0,
            k in 1e-3f64..1e3,
        ) {
            let lo = hill_response(c, h, k);
            let hi = hill_response(c + dc, h, k);
            prop_assert!((0.0..=HILL_RESPONSE_CEILING).contains(&lo));
            prop_assert!((0.0..=HILL_RESPONSE_CEILING).contains(&hi));
            prop_assert!(hi >= lo - 1e-15);
        }
    }
}
