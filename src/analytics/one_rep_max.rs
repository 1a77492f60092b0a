//! One-rep-max estimation

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Estimation formula
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OneRepMaxFormula {
    /// `w * (1 + r / 30)`
    #[default]
    Epley,
    /// `w * 36 / (37 - r)`, reps capped at 36
    Brzycki,
}

/// Reps beyond which Brzycki's denominator stops making sense
const BRZYCKI_MAX_REPS: i64 = 36;

impl OneRepMaxFormula {
    /// Estimate a one-rep max
    ///
    /// Zero or negative reps, and weights that are negative or not finite,
    /// estimate to 0. A single rep estimates to the weight itself.
    pub fn estimate(self, weight: f64, reps: i64) -> f64 {
        if reps <= 0 || !weight.is_finite() || weight <= 0.0 {
            return 0.0;
        }
        if reps == 1 {
            return weight;
        }
        match self {
            OneRepMaxFormula::Epley => weight * (1.0 + reps as f64 / 30.0),
            OneRepMaxFormula::Brzycki => {
                let reps = reps.min(BRZYCKI_MAX_REPS) as f64;
                weight * 36.0 / (37.0 - reps)
            }
        }
    }
}

impl FromStr for OneRepMaxFormula {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "epley" => Ok(OneRepMaxFormula::Epley),
            "brzycki" => Ok(OneRepMaxFormula::Brzycki),
            other => Err(format!("Unknown formula: {}. Use epley or brzycki", other)),
        }
    }
}

/// Epley estimate, the formula the app uses by default
pub fn estimate_one_rep_max(weight: f64, reps: i64) -> f64 {
    OneRepMaxFormula::Epley.estimate(weight, reps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_cases() {
        assert_eq!(estimate_one_rep_max(100.0, 0), 0.0);
        assert_eq!(estimate_one_rep_max(100.0, -3), 0.0);
        assert_eq!(estimate_one_rep_max(100.0, 1), 100.0);
        assert_eq!(estimate_one_rep_max(-50.0, 5), 0.0);
        assert_eq!(estimate_one_rep_max(f64::NAN, 5), 0.0);
    }

    #[test]
    fn test_known_values() {
        assert!((estimate_one_rep_max(100.0, 10) - 133.333_333).abs() < 1e-3);
        assert!((OneRepMaxFormula::Brzycki.estimate(100.0, 10) - 133.333_333).abs() < 1e-3);
        assert!((OneRepMaxFormula::Brzycki.estimate(100.0, 5) - 112.5).abs() < 1e-9);
    }

    #[test]
    fn test_monotonic_in_weight_and_reps() {
        for formula in [OneRepMaxFormula::Epley, OneRepMaxFormula::Brzycki] {
            for reps in 0..=40 {
                let mut previous = 0.0;
                for step in 0..=100 {
                    let weight = step as f64 * 2.5;
                    let estimate = formula.estimate(weight, reps);
                    assert!(estimate >= previous, "{:?} not monotonic in weight", formula);
                    previous = estimate;
                }
            }
            for step in 0..=100 {
                let weight = step as f64 * 2.5;
                let mut previous = 0.0;
                for reps in 0..=40 {
                    let estimate = formula.estimate(weight, reps);
                    assert!(estimate >= previous, "{:?} not monotonic in reps", formula);
                    previous = estimate;
                }
            }
        }
    }

    #[test]
    fn test_formula_parse() {
        assert_eq!("Brzycki".parse::<OneRepMaxFormula>(), Ok(OneRepMaxFormula::Brzycki));
        assert!("lander".parse::<OneRepMaxFormula>().is_err());
    }
}
