//! Fixed-point blur widths.
//!
//! Sigma values are stored in thousandths so they can key hash maps and
//! compare exactly. The decimal string form ("0", "0.25", "1") only exists
//! at the serialization boundary.

use crate::errors::{ChemhexError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const SCALE: u32 = 1000;
const TOLERANCE: f64 = 1e-6;

/// A blur width σ in thousandths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SigmaKey(u32);

impl SigmaKey {
    pub const ZERO: SigmaKey = SigmaKey(0);

    pub fn from_thousandths(thousandths: u32) -> Self {
        SigmaKey(thousandths)
    }

    /// Converts a float σ, rejecting negative values and values that are not
    /// a whole number of thousandths.
    pub fn from_f64(sigma: f64) -> Result<Self> {
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(ChemhexError::config(format!(
                "sigma must be finite and non-negative, got {}",
                sigma
            )));
        }
        let scaled = sigma * SCALE as f64;
        let rounded = scaled.round();
        if (scaled - rounded).abs() > TOLERANCE * SCALE as f64 || rounded > u32::MAX as f64 {
            return Err(ChemhexError::config(format!(
                "sigma {} is not a multiple of 0.001",
                sigma
            )));
        }
        Ok(SigmaKey(rounded as u32))
    }

    pub fn thousandths(&self) -> u32 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SigmaKey {
    /// Shortest decimal form: "0", "0.25", "1", "0.125".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SCALE;
        let frac = self.0 % SCALE;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:03}", frac);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for SigmaKey {
    type Err = ChemhexError;

    fn from_str(s: &str) -> Result<Self> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| ChemhexError::UnknownSigma(s.to_string()))?;
        SigmaKey::from_f64(value).map_err(|_| ChemhexError::UnknownSigma(s.to_string()))
    }
}

impl Serialize for SigmaKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SigmaKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// σ values `0, step, 2·step, …` up to and including `max_sigma`.
pub fn sigma_range(max_sigma: f64, step: f64) -> Result<Vec<SigmaKey>> {
    if !max_sigma.is_finite() || max_sigma < 0.0 {
        return Err(ChemhexError::config(format!(
            "blur maximum must be non-negative, got {}",
            max_sigma
        )));
    }
    if !step.is_finite() || step <= 0.0 {
        return Err(ChemhexError::config(format!(
            "blur step must be positive, got {}",
            step
        )));
    }
    let count = (max_sigma / step + TOLERANCE).floor() as usize;
    (0..=count)
        .map(|i| SigmaKey::from_f64(i as f64 * step))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortest_decimal_form() {
        assert_eq!(SigmaKey::ZERO.to_string(), "0");
        assert_eq!(SigmaKey::from_f64(0.25).unwrap().to_string(), "0.25");
        assert_eq!(SigmaKey::from_f64(1.0).unwrap().to_string(), "1");
        assert_eq!(SigmaKey::from_f64(0.125).unwrap().to_string(), "0.125");
        assert_eq!(SigmaKey::from_f64(3.5).unwrap().to_string(), "3.5");
    }

    #[test]
    fn test_parse_round_trips_display() {
        for text in ["0", "0.25", "1", "2.75"] {
            let key: SigmaKey = text.parse().unwrap();
            assert_eq!(key.to_string(), text);
        }
        assert_eq!("1.0".parse::<SigmaKey>().unwrap().to_string(), "1");
        assert!(matches!(
            "abc".parse::<SigmaKey>(),
            Err(ChemhexError::UnknownSigma(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_sigma() {
        assert!(SigmaKey::from_f64(-0.25).is_err());
        assert!(SigmaKey::from_f64(f64::NAN).is_err());
        assert!(SigmaKey::from_f64(0.0001).is_err());
    }

    #[test]
    fn test_default_range() {
        let keys = sigma_range(4.0, 0.25).unwrap();
        assert_eq!(keys.len(), 17);
        assert_eq!(keys[0], SigmaKey::ZERO);
        assert_eq!(keys[1].to_string(), "0.25");
        assert_eq!(keys[16].to_string(), "4");
    }

    #[test]
    fn test_range_with_inexact_step() {
        let keys = sigma_range(0.3, 0.1).unwrap();
        let labels: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(labels, vec!["0", "0.1", "0.2", "0.3"]);
        assert!(sigma_range(1.0, 0.0).is_err());
        assert_eq!(sigma_range(0.0, 0.25).unwrap(), vec![SigmaKey::ZERO]);
    }

    #[test]
    fn test_serde_as_string() {
        let key = SigmaKey::from_f64(0.75).unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"0.75\"");
        let back: SigmaKey = serde_json::from_str("\"0.75\"").unwrap();
        assert_eq!(back, key);
    }
}
