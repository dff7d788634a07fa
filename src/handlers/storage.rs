use enumset::EnumSet;

use crate::{
    engine::{
        Fitness,
        GlobalScheduleContext,
        Model,
        MultiModeHandler,
        Period,
        ScheduleContext,
    },
    prelude::*,
    units::WattHours,
};

/// Battery dispatch mode for one period.
#[derive(Debug, clap::ValueEnum, enumset::EnumSetType)]
pub enum StorageMode {
    /// Charge on excess production, discharge to cover the deficit.
    Balancing,

    /// Charge on excess production, but hold the stored energy back.
    DelayDischarge,

    /// Forced charging from any source, the grid included.
    ChargeFromGrid,
}

/// Schedules the battery. The optimizer picks one [`StorageMode`] per
/// period; this handler turns the mode into a committed ess flow.
///
/// The stored-energy window comes from the running schedule context; the
/// risk level widens the untouchable reserve at the bottom of the battery.
pub struct StorageHandler {
    id: String,
    modes: Vec<StorageMode>,
}

impl StorageHandler {
    pub fn new(id: impl Into<String>, modes: EnumSet<StorageMode>) -> Self {
        let mut modes: Vec<StorageMode> = modes.into_iter().collect();
        if modes.is_empty() {
            modes.push(StorageMode::Balancing);
        }
        Self { id: id.into(), modes }
    }

    fn reserve(gsc: &GlobalScheduleContext<'_>) -> WattHours {
        WattHours(gsc.goc.ess.capacity.0 * gsc.goc.risk_level.reserve_percent() / 100)
    }

    fn mode(&self, mode_index: usize) -> StorageMode {
        self.modes.get(mode_index).copied().unwrap_or(StorageMode::Balancing)
    }
}

impl MultiModeHandler for StorageHandler {
    fn id(&self) -> &str {
        &self.id
    }

    fn mode_count(&self, _period: &Period) -> usize {
        self.modes.len()
    }

    fn default_mode(&self) -> usize {
        self.modes.iter().position(|mode| *mode == StorageMode::Balancing).unwrap_or(0)
    }

    fn mode_label(&self, mode_index: usize) -> String {
        format!("{:?}", self.mode(mode_index))
    }

    /// Keeps the search out of dead modes: grid-charging a full battery is
    /// just balancing with extra steps.
    fn pre_process_period(
        &self,
        _period: &Period,
        gsc: &GlobalScheduleContext<'_>,
        mode_index: usize,
    ) -> usize {
        let mode_index = mode_index.min(self.modes.len() - 1);
        if self.mode(mode_index) == StorageMode::ChargeFromGrid
            && gsc.ess_energy >= gsc.goc.ess.capacity
        {
            return self.default_mode();
        }
        mode_index
    }

    fn simulate(
        &self,
        _period: &Period,
        gsc: &GlobalScheduleContext<'_>,
        _sctx: &mut ScheduleContext,
        flow: &mut Model,
        mode_index: usize,
        fitness: &mut Fitness,
    ) -> Result {
        let chargeable = (gsc.goc.ess.capacity - gsc.ess_energy).max(WattHours::ZERO);
        let dischargeable = (gsc.ess_energy - Self::reserve(gsc)).max(WattHours::ZERO);
        let charge_bound = flow.set_ess_max_charge(chargeable);
        let discharge_bound = flow.set_ess_max_discharge(dischargeable);
        if charge_bound > chargeable || discharge_bound > dischargeable {
            // The balance forces the battery outside its stored-energy
            // window, the period cannot be operated within the hard limits.
            fitness.add_hard_violation();
        }

        match self.mode(mode_index) {
            StorageMode::Balancing => {
                flow.set_ess(-flow.surplus());
            }
            StorageMode::DelayDischarge => {
                flow.set_ess((-flow.surplus()).min(WattHours::ZERO));
            }
            StorageMode::ChargeFromGrid => {
                flow.set_ess(-charge_bound);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        engine::{
            EnergyScheduleHandler,
            Ess,
            GlobalOptimizationContext,
            Grid,
            RiskLevel,
            simulate_trajectory_with_outcomes,
            test_support::quarter_periods,
        },
        units::Watts,
    };

    fn context(
        risk_level: RiskLevel,
        initial_energy: i64,
        rows: &[(i64, i64, f64)],
    ) -> GlobalOptimizationContext {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        GlobalOptimizationContext::builder()
            .start(start)
            .risk_level(risk_level)
            .grid(Grid { max_buy: Watts(8000), max_sell: Watts(8000) })
            .ess(Ess {
                capacity: WattHours(2000),
                initial_energy: WattHours(initial_energy),
                max_charge: Watts(4000),
                max_discharge: Watts(4000),
            })
            .periods(quarter_periods(start, rows))
            .handlers(vec![EnergyScheduleHandler::MultiMode(Box::new(StorageHandler::new(
                "ess0",
                EnumSet::all(),
            )))])
            .build()
    }

    #[test]
    fn test_balancing_respects_the_risk_reserve() {
        // 10 % of 2000 Wh stays untouchable at high risk:
        let goc = context(RiskLevel::High, 500, &[(0, 400, 100.0), (0, 400, 100.0)]);
        let balancing = vec![vec![0], vec![0]];
        let (fitness, outcomes) = simulate_trajectory_with_outcomes(&goc, &balancing);
        assert_eq!(fitness.hard_violations(), 0);
        // First period drains down to the reserve, second buys everything:
        assert_eq!(outcomes[0].flow.unwrap().ess, WattHours(300));
        assert_eq!(outcomes[0].flow.unwrap().grid, WattHours(100));
        assert_eq!(outcomes[1].ess_energy, WattHours(200));
        assert_eq!(outcomes[1].flow.unwrap().ess, WattHours::ZERO);
        assert_eq!(outcomes[1].flow.unwrap().grid, WattHours(400));
    }

    #[test]
    fn test_balancing_stores_the_surplus() {
        let goc = context(RiskLevel::Low, 0, &[(600, 100, 100.0)]);
        let (fitness, outcomes) = simulate_trajectory_with_outcomes(&goc, &vec![vec![0]]);
        assert_eq!(fitness.hard_violations(), 0);
        assert_eq!(outcomes[0].flow.unwrap().ess, WattHours(-500));
        assert_eq!(outcomes[0].flow.unwrap().grid, WattHours::ZERO);
    }

    #[test]
    fn test_delay_discharge_never_discharges() {
        let goc = context(RiskLevel::Low, 1000, &[(0, 400, 100.0)]);
        let delay = vec![vec![1]];
        let (_, outcomes) = simulate_trajectory_with_outcomes(&goc, &delay);
        assert_eq!(outcomes[0].flow.unwrap().ess, WattHours::ZERO);
        assert_eq!(outcomes[0].flow.unwrap().grid, WattHours(400));
    }

    #[test]
    fn test_charge_from_grid_fills_the_battery() {
        let goc = context(RiskLevel::Low, 1500, &[(0, 0, 100.0)]);
        let charge = vec![vec![2]];
        let (_, outcomes) = simulate_trajectory_with_outcomes(&goc, &charge);
        // Headroom is 500 Wh, below the 1000 Wh quarter envelope:
        assert_eq!(outcomes[0].flow.unwrap().ess, WattHours(-500));
        assert_eq!(outcomes[0].flow.unwrap().grid, WattHours(500));
    }

    #[test]
    fn test_charge_from_grid_degrades_when_full() {
        let goc = context(RiskLevel::Low, 2000, &[(0, 100, 100.0)]);
        let charge = vec![vec![2]];
        let (_, outcomes) = simulate_trajectory_with_outcomes(&goc, &charge);
        // Pre-processing replaced the mode with balancing:
        assert_eq!(outcomes[0].modes, vec![0]);
    }
}
