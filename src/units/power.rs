use serde::{Deserialize, Serialize};

/// Whole watts. Hardware envelopes are snapshotted in watts and converted
/// to per-period energies by the period duration.
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
#[display("{_0} W")]
pub struct Watts(pub i64);

impl Watts {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}
