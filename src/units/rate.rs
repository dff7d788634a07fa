use serde::{Deserialize, Serialize};

/// Day-ahead energy price, the resolution tariff providers publish at.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
    derive_more::Add,
    derive_more::Display,
    derive_more::FromStr,
    derive_more::Sub,
    derive_more::Sum,
)]
#[display("€{_0:.2}/MWh")]
pub struct EuroPerMegawattHour(pub f64);
