//! Unit newtypes for the quantities devices report.
//!
//! Device data is stored in natural units (MW, Mvar, MVA). The assembly layer
//! unwraps them with [`Megawatts::value`] and friends when it writes bounds and
//! coefficients, so a load's reactive peak can never be passed where an active
//! limit is expected.
//!
//! ```
//! use pcm_core::units::{Megawatts, Megavars};
//!
//! let pmax = Megawatts(80.0) + Megawatts(20.0);
//! assert_eq!(pmax.value(), 100.0);
//!
//! // Different units do not mix:
//! // let wrong = pmax + Megavars(5.0);
//! let _q = Megavars(5.0);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

macro_rules! power_unit {
    ($type:ident, $symbol:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.3} {}", self.0, $symbol)
            }
        }

        impl $type {
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Raw numeric value in the unit's natural scale.
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Convert to per-unit on the given system base (MVA).
            #[inline]
            pub fn to_per_unit(self, base_power: f64) -> PerUnit {
                PerUnit(self.0 / base_power)
            }
        }
    };
}

/// Active power (MW).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Megawatts(pub f64);

power_unit!(Megawatts, "MW");

/// Reactive power (Mvar).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Megavars(pub f64);

power_unit!(Megavars, "Mvar");

/// Apparent power (MVA), used for branch ratings.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MegavoltAmperes(pub f64);

power_unit!(MegavoltAmperes, "MVA");

/// Dimensionless per-unit value.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerUnit(pub f64);

impl PerUnit {
    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_stays_in_unit() {
        let p = Megawatts(10.0) - Megawatts(4.0);
        assert_eq!(p, Megawatts(6.0));
        assert_eq!((-p).value(), -6.0);
        assert_eq!((Megavars(3.0) * 2.0).value(), 6.0);
    }

    #[test]
    fn test_per_unit_conversion_uses_base() {
        assert_eq!(Megawatts(50.0).to_per_unit(100.0), PerUnit(0.5));
        assert_eq!(MegavoltAmperes(200.0).to_per_unit(100.0).value(), 2.0);
    }

    #[test]
    fn test_display_includes_symbol() {
        assert_eq!(Megawatts(1.5).to_string(), "1.500 MW");
        assert_eq!(Megavars(2.0).to_string(), "2.000 Mvar");
    }
}
