//! Unit conversion
//!
//! Fixed multiplicative factors between the mass and length units a user
//! can pick in settings.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Pounds per kilogram
pub const LBS_PER_KG: f64 = 2.20462;

/// Centimetres per inch
pub const CM_PER_INCH: f64 = 2.54;

/// Mass unit for weights and body weight
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MassUnit {
    #[default]
    Kg,
    Lbs,
}

impl MassUnit {
    /// Convert a value expressed in `self` into `to`
    pub fn convert(self, value: f64, to: MassUnit) -> f64 {
        match (self, to) {
            (MassUnit::Kg, MassUnit::Lbs) => value * LBS_PER_KG,
            (MassUnit::Lbs, MassUnit::Kg) => value / LBS_PER_KG,
            _ => value,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            MassUnit::Kg => "kg",
            MassUnit::Lbs => "lbs",
        }
    }
}

/// Length unit for body measurements
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    #[default]
    Cm,
    In,
}

impl LengthUnit {
    /// Convert a value expressed in `self` into `to`
    pub fn convert(self, value: f64, to: LengthUnit) -> f64 {
        match (self, to) {
            (LengthUnit::Cm, LengthUnit::In) => value / CM_PER_INCH,
            (LengthUnit::In, LengthUnit::Cm) => value * CM_PER_INCH,
            _ => value,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            LengthUnit::Cm => "cm",
            LengthUnit::In => "in",
        }
    }
}

impl std::fmt::Display for MassUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl std::fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Any unit the converter understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Mass(MassUnit),
    Length(LengthUnit),
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kg" | "kgs" | "kilograms" => Ok(Unit::Mass(MassUnit::Kg)),
            "lb" | "lbs" | "pounds" => Ok(Unit::Mass(MassUnit::Lbs)),
            "cm" | "centimeters" | "centimetres" => Ok(Unit::Length(LengthUnit::Cm)),
            "in" | "inch" | "inches" => Ok(Unit::Length(LengthUnit::In)),
            other => Err(format!("Unknown unit: {}. Use kg, lbs, cm or in", other)),
        }
    }
}

/// Convert between two units of the same dimension
///
/// Returns `None` when asked to convert mass into length or vice versa.
pub fn convert(value: f64, from: Unit, to: Unit) -> Option<f64> {
    match (from, to) {
        (Unit::Mass(a), Unit::Mass(b)) => Some(a.convert(value, b)),
        (Unit::Length(a), Unit::Length(b)) => Some(a.convert(value, b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kg_to_lbs() {
        let lbs = MassUnit::Kg.convert(100.0, MassUnit::Lbs);
        assert!((lbs - 220.462).abs() < 1e-9);
    }

    #[test]
    fn test_mass_round_trip() {
        let back = MassUnit::Lbs.convert(MassUnit::Kg.convert(82.5, MassUnit::Lbs), MassUnit::Kg);
        assert!((back - 82.5).abs() < 1e-9);
        assert_eq!(MassUnit::Kg.convert(60.0, MassUnit::Kg), 60.0);
    }

    #[test]
    fn test_length_conversion() {
        assert!((LengthUnit::In.convert(10.0, LengthUnit::Cm) - 25.4).abs() < 1e-9);
        assert!((LengthUnit::Cm.convert(2.54, LengthUnit::In) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_and_convert() {
        let from: Unit = "kg".parse().unwrap();
        let to: Unit = "LBS".parse().unwrap();
        assert!((convert(100.0, from, to).unwrap() - 220.462).abs() < 1e-9);

        let cm: Unit = "cm".parse().unwrap();
        assert_eq!(convert(1.0, from, cm), None);
        assert!("stone".parse::<Unit>().is_err());
    }
}
