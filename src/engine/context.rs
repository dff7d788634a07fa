use chrono::{NaiveDateTime, TimeDelta};
use itertools::Itertools;

use crate::{
    engine::{
        handler::{EnergyScheduleHandler, MultiModeHandler},
        period::{Period, Quarter},
    },
    prelude::*,
    units::{EuroPerMegawattHour, WattHours, Watts},
};

/// How aggressively schedules may run the battery against forecast errors.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum RiskLevel {
    /// Trust the forecast, use the full battery.
    Low,

    #[default]
    Medium,

    /// Keep a noticeable reserve for forecast misses.
    High,
}

impl RiskLevel {
    /// Share of the battery capacity kept untouchable as a reserve.
    pub const fn reserve_percent(self) -> i64 {
        match self {
            Self::Low => 0,
            Self::Medium => 5,
            Self::High => 10,
        }
    }
}

/// Grid-connection envelope, fixed for one optimization run.
#[derive(Clone, Copy, Debug)]
pub struct Grid {
    pub max_buy: Watts,
    pub max_sell: Watts,
}

/// Battery envelope, snapshotted from the hardware at context-build time.
#[derive(Clone, Copy, Debug)]
pub struct Ess {
    pub capacity: WattHours,
    /// Stored energy at the start of the horizon.
    pub initial_energy: WattHours,
    pub max_charge: Watts,
    pub max_discharge: Watts,
}

/// Immutable per-run snapshot every trajectory evaluation reads from.
///
/// Built once per optimization run and never mutated afterwards; each trial
/// allocates its own transient flow models, fitness and schedule contexts
/// against this one shared context, which is what makes concurrent
/// evaluation safe.
#[derive(bon::Builder)]
pub struct GlobalOptimizationContext {
    pub start: NaiveDateTime,
    #[builder(default)]
    pub risk_level: RiskLevel,
    pub grid: Grid,
    pub ess: Ess,
    pub periods: Vec<Period>,
    pub handlers: Vec<EnergyScheduleHandler>,
}

impl GlobalOptimizationContext {
    /// The handlers the optimizer actually steers: those exposing multiple
    /// discrete modes, in registration order.
    pub fn multi_mode_handlers(&self) -> impl Iterator<Item = &dyn MultiModeHandler> {
        self.handlers.iter().filter_map(EnergyScheduleHandler::as_multi_mode)
    }
}

/// Assembles the period list from aligned quarter-resolution forecasts.
///
/// The first `quarter_horizon` slices stay at quarter resolution, the
/// remainder is aggregated into hours. A trailing group of fewer than four
/// quarters stays at quarter resolution so that the horizon is fully
/// covered.
#[expect(clippy::cast_possible_wrap)]
pub fn build_periods(
    start: NaiveDateTime,
    productions: &[WattHours],
    unmanaged_consumptions: &[WattHours],
    prices: &[EuroPerMegawattHour],
    quarter_horizon: usize,
) -> Result<Vec<Period>> {
    ensure!(!productions.is_empty(), "the forecast horizon is empty");
    ensure!(
        productions.len() == unmanaged_consumptions.len()
            && productions.len() == prices.len(),
        "forecast series are not aligned: {} production, {} consumption, {} price samples",
        productions.len(),
        unmanaged_consumptions.len(),
        prices.len(),
    );

    let quarters: Vec<Quarter> = itertools::izip!(productions, unmanaged_consumptions, prices)
        .enumerate()
        .map(|(index, (&production, &unmanaged_consumption, &price))| {
            ensure!(!production.is_negative(), "negative production forecast at sample {index}");
            ensure!(
                !unmanaged_consumption.is_negative(),
                "negative consumption forecast at sample {index}",
            );
            Ok(Quarter {
                index,
                start: start + TimeDelta::minutes(15 * index as i64),
                production,
                unmanaged_consumption,
                price,
            })
        })
        .collect::<Result<_>>()?;

    let quarter_horizon = quarter_horizon.min(quarters.len());
    let mut periods = Vec::with_capacity(quarters.len());
    let mut quarters = quarters.into_iter();
    for quarter in quarters.by_ref().take(quarter_horizon) {
        periods.push(Period::Quarter { index: periods.len(), quarter });
    }
    for chunk in &quarters.chunks(4) {
        let chunk: Vec<Quarter> = chunk.collect();
        if chunk.len() == 4 {
            periods.push(Period::hour_from_quarters(periods.len(), chunk));
        } else {
            for quarter in chunk {
                periods.push(Period::Quarter { index: periods.len(), quarter });
            }
        }
    }
    Ok(periods)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_misaligned_series_fail() {
        let result = build_periods(
            start(),
            &[WattHours(1); 3],
            &[WattHours(1); 2],
            &[EuroPerMegawattHour(1.0); 3],
            4,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_horizon_fails() {
        assert!(build_periods(start(), &[], &[], &[], 4).is_err());
    }

    #[test]
    fn test_quarters_then_hours_then_remainder() {
        // 4 leading quarters, 8 aggregable quarters, 2 left over:
        let n = 14;
        let periods = build_periods(
            start(),
            &vec![WattHours(100); n],
            &vec![WattHours(50); n],
            &vec![EuroPerMegawattHour(80.0); n],
            4,
        )
        .unwrap();
        assert_eq!(periods.len(), 4 + 2 + 2);
        assert!(periods[..4].iter().all(|period| matches!(period, Period::Quarter { .. })));
        assert!(periods[4..6].iter().all(|period| matches!(period, Period::Hour { .. })));
        assert!(periods[6..].iter().all(|period| matches!(period, Period::Quarter { .. })));
        // Contiguous, strictly ordered, indexed by position:
        for (index, pair) in periods.windows(2).enumerate() {
            assert_eq!(pair[0].index(), index);
            assert!(pair[0].start() < pair[1].start());
            let end = pair[0].start() + TimeDelta::minutes(pair[0].duration().minutes());
            assert_eq!(end, pair[1].start());
        }
    }
}
