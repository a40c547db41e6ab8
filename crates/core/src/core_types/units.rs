//! Semantic unit types for the carbon model
//!
//! Carbon pools are plain `f64` (MgC/ha) so they can be summed across
//! replicates without ceremony. The quantities that carry a validity range
//! (fractions, half-lives) get newtypes with validated constructors.
//!
//! # Usage
//! ```
//! use forest_carbon_core::core_types::units::{Fraction, HalfLife};
//!
//! let efficiency = Fraction::new(0.25);
//! assert_eq!(efficiency * 4.0, 1.0);
//!
//! let litter = HalfLife::years(2.0);
//! assert!((litter.annual_loss_fraction() - 0.2928932).abs() < 1e-6);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Deref, Mul};

// ============================================================================
// DIMENSIONLESS RATIOS
// ============================================================================

/// A fraction (0-1)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
#[repr(transparent)]
pub struct Fraction(f64);

impl Fraction {
    /// Zero fraction
    pub const ZERO: Fraction = Fraction(0.0);

    /// Create a new fraction. Asserts value is within [0, 1].
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        assert!(
            value >= 0.0 && value <= 1.0,
            "Fraction::new: value not in [0, 1]"
        );
        Fraction(value)
    }

    /// Create a fraction, returning `None` outside [0, 1] or for NaN.
    #[inline]
    pub fn try_new(value: f64) -> Option<Self> {
        (0.0..=1.0).contains(&value).then_some(Fraction(value))
    }

    /// Remaining share, `1 - self`
    #[inline]
    #[must_use]
    pub fn complement(self) -> Fraction {
        Fraction(1.0 - self.0)
    }
}

impl Deref for Fraction {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.0.total_cmp(&other.0))
    }
}

impl TryFrom<f64> for Fraction {
    type Error = String;

    fn try_from(v: f64) -> Result<Self, Self::Error> {
        Fraction::try_new(v).ok_or_else(|| format!("fraction {v} not in [0, 1]"))
    }
}

impl From<Fraction> for f64 {
    fn from(f: Fraction) -> f64 {
        f.0
    }
}

impl Mul<f64> for Fraction {
    type Output = f64;
    fn mul(self, rhs: f64) -> f64 {
        self.0 * rhs
    }
}

impl Mul<Fraction> for f64 {
    type Output = f64;
    fn mul(self, rhs: Fraction) -> f64 {
        self * rhs.0
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

// ============================================================================
// FIRST-ORDER DECAY
// ============================================================================

/// Half-life of a first-order decaying pool, in years
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
#[repr(transparent)]
pub struct HalfLife(f64);

impl HalfLife {
    /// Create a half-life. Asserts the value is positive and finite.
    #[inline]
    #[must_use]
    pub fn years(value: f64) -> Self {
        assert!(
            value.is_finite() && value > 0.0,
            "HalfLife::years: value must be positive and finite"
        );
        HalfLife(value)
    }

    /// Decay constant `k = -ln(0.5) / t_half` (1/year)
    #[inline]
    #[must_use]
    pub fn decay_rate(self) -> f64 {
        -(0.5_f64.ln()) / self.0
    }

    /// Share of the pool lost over one year, `1 - exp(-k)`
    #[inline]
    #[must_use]
    pub fn annual_loss_fraction(self) -> f64 {
        1.0 - (-self.decay_rate()).exp()
    }
}

impl TryFrom<f64> for HalfLife {
    type Error = String;

    fn try_from(v: f64) -> Result<Self, Self::Error> {
        if v.is_finite() && v > 0.0 {
            Ok(HalfLife(v))
        } else {
            Err(format!("half-life {v} must be positive and finite"))
        }
    }
}

impl From<HalfLife> for f64 {
    fn from(h: HalfLife) -> f64 {
        h.0
    }
}

impl fmt::Display for HalfLife {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} yr", self.0)
    }
}
