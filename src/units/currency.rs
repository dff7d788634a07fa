use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Accumulated cost. Wraps [`OrderedFloat`] so that fitness values are
/// totally ordered.
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
    derive_more::Neg,
    derive_more::Sub,
    derive_more::SubAssign,
    derive_more::Sum,
)]
#[display("€{_0:.4}")]
pub struct Euro(pub OrderedFloat<f64>);

impl Euro {
    pub const ZERO: Self = Self(OrderedFloat(0.0));
}

impl From<f64> for Euro {
    fn from(value: f64) -> Self {
        Self(OrderedFloat(value))
    }
}
