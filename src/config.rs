use std::{fs, path::Path};

use chrono::NaiveDateTime;
use enumset::EnumSet;
use itertools::Itertools;
use serde::Deserialize;

use crate::{
    engine::{
        EnergyScheduleHandler,
        Ess,
        GlobalOptimizationContext,
        Grid,
        RiskLevel,
        build_periods,
    },
    handlers::{ConsumerHandler, StorageHandler, StorageMode},
    prelude::*,
    units::{EuroPerMegawattHour, WattHours, Watts},
};

/// Scenario file: forecasts and hardware envelopes for one optimization run.
///
/// In production these come from the prediction providers and the device
/// bridges; the file is the same snapshot in portable form.
#[derive(Deserialize)]
pub struct Scenario {
    pub start: NaiveDateTime,
    pub grid: GridConfig,
    pub ess: EssConfig,

    #[serde(default)]
    pub consumers: Vec<ConsumerConfig>,

    /// Quarter-resolution forecast rows covering the horizon.
    pub quarters: Vec<QuarterForecast>,
}

#[derive(Deserialize)]
pub struct GridConfig {
    #[serde(rename = "max_buy_watts")]
    pub max_buy: Watts,

    #[serde(rename = "max_sell_watts")]
    pub max_sell: Watts,
}

#[derive(Deserialize)]
pub struct EssConfig {
    #[serde(rename = "capacity_watt_hours")]
    pub capacity: WattHours,

    #[serde(rename = "initial_energy_watt_hours")]
    pub initial_energy: WattHours,

    #[serde(rename = "max_charge_watts")]
    pub max_charge: Watts,

    #[serde(rename = "max_discharge_watts")]
    pub max_discharge: Watts,
}

#[derive(Deserialize)]
pub struct ConsumerConfig {
    pub id: String,

    #[serde(rename = "power_watts")]
    pub power: Watts,

    pub from_hour: u32,
    pub to_hour: u32,

    #[serde(rename = "demand_watt_hours")]
    pub demand: WattHours,

    #[serde(default, rename = "lost_load_rate_euros_per_megawatt_hour")]
    pub lost_load_rate: Option<EuroPerMegawattHour>,
}

#[derive(Deserialize)]
pub struct QuarterForecast {
    #[serde(rename = "production_watt_hours")]
    pub production: WattHours,

    #[serde(rename = "consumption_watt_hours")]
    pub consumption: WattHours,

    #[serde(rename = "price_euros_per_megawatt_hour")]
    pub price: EuroPerMegawattHour,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse `{}`", path.display()))
    }

    /// Validates the scenario and assembles the immutable context, with the
    /// battery handler and one handler per configured consumer registered.
    pub fn into_context(
        self,
        risk_level: RiskLevel,
        quarter_horizon: usize,
        storage_modes: EnumSet<StorageMode>,
    ) -> Result<GlobalOptimizationContext> {
        ensure!(
            !self.grid.max_buy.is_negative() && !self.grid.max_sell.is_negative(),
            "grid envelope must be non-negative",
        );
        ensure!(
            !self.ess.capacity.is_negative()
                && !self.ess.max_charge.is_negative()
                && !self.ess.max_discharge.is_negative(),
            "battery envelope must be non-negative",
        );
        ensure!(
            WattHours::ZERO <= self.ess.initial_energy
                && self.ess.initial_energy <= self.ess.capacity,
            "initial battery energy must be within the capacity",
        );

        let (productions, consumptions, prices): (Vec<_>, Vec<_>, Vec<_>) = self
            .quarters
            .iter()
            .map(|quarter| (quarter.production, quarter.consumption, quarter.price))
            .multiunzip();
        let periods =
            build_periods(self.start, &productions, &consumptions, &prices, quarter_horizon)?;

        let mut handlers = vec![EnergyScheduleHandler::MultiMode(Box::new(
            StorageHandler::new("ess0", storage_modes),
        ))];
        for consumer in self.consumers {
            ensure!(
                consumer.from_hour < 24 && consumer.to_hour < 24,
                "consumer `{}` has an out-of-range hour window",
                consumer.id,
            );
            ensure!(
                !consumer.power.is_negative() && !consumer.demand.is_negative(),
                "consumer `{}` must have non-negative power and demand",
                consumer.id,
            );
            handlers.push(EnergyScheduleHandler::OneMode(Box::new(
                ConsumerHandler::builder()
                    .id(consumer.id)
                    .power(consumer.power)
                    .from_hour(consumer.from_hour)
                    .to_hour(consumer.to_hour)
                    .demand(consumer.demand)
                    .maybe_lost_load_rate(consumer.lost_load_rate)
                    .build(),
            )));
        }

        Ok(GlobalOptimizationContext::builder()
            .start(self.start)
            .risk_level(risk_level)
            .grid(Grid { max_buy: self.grid.max_buy, max_sell: self.grid.max_sell })
            .ess(Ess {
                capacity: self.ess.capacity,
                initial_energy: self.ess.initial_energy,
                max_charge: self.ess.max_charge,
                max_discharge: self.ess.max_discharge,
            })
            .periods(periods)
            .handlers(handlers)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
        start = "2026-03-01T00:00:00"

        [grid]
        max_buy_watts = 17250
        max_sell_watts = 17250

        [ess]
        capacity_watt_hours = 10000
        initial_energy_watt_hours = 4000
        max_charge_watts = 5000
        max_discharge_watts = 5000

        [[consumers]]
        id = "boiler"
        power_watts = 2000
        from_hour = 12
        to_hour = 16
        demand_watt_hours = 4000

        [[quarters]]
        production_watt_hours = 0
        consumption_watt_hours = 150
        price_euros_per_megawatt_hour = 92.5

        [[quarters]]
        production_watt_hours = 120
        consumption_watt_hours = 150
        price_euros_per_megawatt_hour = 80.0
    "#;

    #[test]
    fn test_scenario_round_trip() {
        let scenario: Scenario = toml::from_str(SCENARIO).unwrap();
        assert_eq!(scenario.quarters.len(), 2);
        let goc = scenario
            .into_context(RiskLevel::Medium, 96, EnumSet::all())
            .unwrap();
        assert_eq!(goc.periods.len(), 2);
        // The battery handler plus the boiler:
        assert_eq!(goc.handlers.len(), 2);
        assert_eq!(goc.multi_mode_handlers().count(), 1);
    }

    #[test]
    fn test_overfull_battery_is_rejected() {
        let mut scenario: Scenario = toml::from_str(SCENARIO).unwrap();
        scenario.ess.initial_energy = WattHours(20_000);
        assert!(scenario.into_context(RiskLevel::Low, 96, EnumSet::all()).is_err());
    }
}
