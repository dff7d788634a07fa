use std::ops::Mul;

use serde::{Deserialize, Serialize};

use crate::units::{currency::Euro, rate::EuroPerMegawattHour};

/// Whole watt-hours. The balance engine works in exact integer energies,
/// so period arithmetic never accumulates drift.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
    derive_more::Add,
    derive_more::AddAssign,
    derive_more::Display,
    derive_more::From,
    derive_more::FromStr,
    derive_more::Neg,
    derive_more::Sub,
    derive_more::SubAssign,
    derive_more::Sum,
)]
#[display("{_0} Wh")]
pub struct WattHours(pub i64);

impl WattHours {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn min(self, rhs: Self) -> Self {
        if rhs.0 < self.0 { rhs } else { self }
    }

    #[must_use]
    pub const fn max(self, rhs: Self) -> Self {
        if rhs.0 > self.0 { rhs } else { self }
    }

    #[must_use]
    pub const fn clamp(self, min: Self, max: Self) -> Self {
        self.max(min).min(max)
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Mul<EuroPerMegawattHour> for WattHours {
    type Output = Euro;

    #[expect(clippy::cast_precision_loss)]
    fn mul(self, rhs: EuroPerMegawattHour) -> Self::Output {
        Euro::from(self.0 as f64 * rhs.0 / 1_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(WattHours(5).clamp(WattHours(-3), WattHours(3)), WattHours(3));
        assert_eq!(WattHours(-5).clamp(WattHours(-3), WattHours(3)), WattHours(-3));
        assert_eq!(WattHours(1).clamp(WattHours(-3), WattHours(3)), WattHours(1));
    }

    #[test]
    fn test_cost() {
        assert_eq!(WattHours(250_000) * EuroPerMegawattHour(100.0), Euro::from(25.0));
    }
}
