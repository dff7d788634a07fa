use chrono::NaiveDateTime;

use crate::units::{EuroPerMegawattHour, WattHours, Watts};

/// Resolution of a planning time slice.
///
/// The near horizon is planned in quarters, the far horizon in hours. The
/// duration is what converts a power envelope into a per-period energy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PeriodDuration {
    Quarter,
    Hour,
}

impl PeriodDuration {
    pub const fn minutes(self) -> i64 {
        match self {
            Self::Quarter => 15,
            Self::Hour => 60,
        }
    }

    /// Energy transferred over this duration at the given constant power.
    pub const fn energy(self, power: Watts) -> WattHours {
        WattHours(power.0 * self.minutes() / 60)
    }
}

/// Atomic 15-minute slice with its forecast values.
#[derive(Clone, Debug)]
pub struct Quarter {
    /// Position of the quarter within the forecast series.
    pub index: usize,
    pub start: NaiveDateTime,
    /// Forecast production over the slice.
    pub production: WattHours,
    /// Forecast consumption that no schedule handler controls.
    pub unmanaged_consumption: WattHours,
    pub price: EuroPerMegawattHour,
}

/// One planning time slice of the optimization horizon.
///
/// The `index` is the position within the context's period list. A
/// [`Period::Hour`] aggregates four consecutive quarters and keeps them for
/// drill-down; its energies are the quarter sums and its price is the
/// quarter average.
#[derive(Clone, Debug)]
pub enum Period {
    Quarter {
        index: usize,
        quarter: Quarter,
    },
    Hour {
        index: usize,
        start: NaiveDateTime,
        production: WattHours,
        unmanaged_consumption: WattHours,
        price: EuroPerMegawattHour,
        quarters: Vec<Quarter>,
    },
}

impl Period {
    /// Aggregates four consecutive quarters into an hour period.
    ///
    /// The `index` is the position within the period list, not the quarter
    /// series.
    pub fn hour_from_quarters(index: usize, quarters: Vec<Quarter>) -> Self {
        debug_assert_eq!(quarters.len(), 4);
        #[expect(clippy::cast_precision_loss)]
        let price = EuroPerMegawattHour(
            quarters.iter().map(|quarter| quarter.price.0).sum::<f64>() / quarters.len() as f64,
        );
        Self::Hour {
            index,
            start: quarters[0].start,
            production: quarters.iter().map(|quarter| quarter.production).sum(),
            unmanaged_consumption: quarters
                .iter()
                .map(|quarter| quarter.unmanaged_consumption)
                .sum(),
            price,
            quarters,
        }
    }

    pub const fn index(&self) -> usize {
        match self {
            Self::Quarter { index, .. } | Self::Hour { index, .. } => *index,
        }
    }

    pub const fn start(&self) -> NaiveDateTime {
        match self {
            Self::Quarter { quarter, .. } => quarter.start,
            Self::Hour { start, .. } => *start,
        }
    }

    pub const fn duration(&self) -> PeriodDuration {
        match self {
            Self::Quarter { .. } => PeriodDuration::Quarter,
            Self::Hour { .. } => PeriodDuration::Hour,
        }
    }

    pub const fn production(&self) -> WattHours {
        match self {
            Self::Quarter { quarter, .. } => quarter.production,
            Self::Hour { production, .. } => *production,
        }
    }

    pub const fn unmanaged_consumption(&self) -> WattHours {
        match self {
            Self::Quarter { quarter, .. } => quarter.unmanaged_consumption,
            Self::Hour { unmanaged_consumption, .. } => *unmanaged_consumption,
        }
    }

    pub const fn price(&self) -> EuroPerMegawattHour {
        match self {
            Self::Quarter { quarter, .. } => quarter.price,
            Self::Hour { price, .. } => *price,
        }
    }
}
