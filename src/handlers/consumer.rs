use chrono::Timelike;

use crate::{
    engine::{
        Fitness,
        GlobalScheduleContext,
        Model,
        OneModeHandler,
        Period,
        ScheduleContext,
    },
    prelude::*,
    units::{EuroPerMegawattHour, WattHours, Watts},
};

/// A managed load without a discrete choice: it draws power whenever its
/// daily window is open and energy is still owed.
///
/// The demand still outstanding is carried across the periods of one
/// trajectory in the schedule context; whatever stays unserved at the end
/// of the horizon is valued at the lost-load rate on the soft channel.
#[derive(bon::Builder)]
pub struct ConsumerHandler {
    #[builder(into)]
    id: String,
    power: Watts,

    /// Daily activity window; `from_hour == to_hour` means always on, a
    /// window may wrap around midnight.
    from_hour: u32,
    to_hour: u32,

    /// Total energy owed over the horizon.
    demand: WattHours,

    #[builder(default = EuroPerMegawattHour(3000.0))]
    lost_load_rate: EuroPerMegawattHour,
}

struct Outstanding {
    remaining: WattHours,
}

impl ConsumerHandler {
    fn is_open(&self, hour: u32) -> bool {
        if self.from_hour == self.to_hour {
            true
        } else if self.from_hour < self.to_hour {
            (self.from_hour..self.to_hour).contains(&hour)
        } else {
            hour >= self.from_hour || hour < self.to_hour
        }
    }
}

impl OneModeHandler for ConsumerHandler {
    fn id(&self) -> &str {
        &self.id
    }

    fn create_schedule_context(&self) -> ScheduleContext {
        Box::new(Outstanding { remaining: self.demand })
    }

    fn simulate(
        &self,
        period: &Period,
        gsc: &GlobalScheduleContext<'_>,
        sctx: &mut ScheduleContext,
        flow: &mut Model,
        fitness: &mut Fitness,
    ) -> Result {
        let outstanding =
            sctx.downcast_mut::<Outstanding>().context("unexpected schedule context")?;

        if self.is_open(period.start().hour()) && outstanding.remaining > WattHours::ZERO {
            let wanted = period.duration().energy(self.power).min(outstanding.remaining);
            let granted = flow.add_managed_consumption(&self.id, wanted);
            outstanding.remaining -= granted;
        }

        if period.index() + 1 == gsc.goc.periods.len()
            && outstanding.remaining > WattHours::ZERO
        {
            trace!(id = %self.id, remaining = %outstanding.remaining, "demand not fully served");
            fitness.add_cost(outstanding.remaining * self.lost_load_rate);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::engine::{
        EnergyScheduleHandler,
        Ess,
        GlobalOptimizationContext,
        Grid,
        simulate_trajectory_with_outcomes,
        test_support::quarter_periods,
    };

    fn context(
        handlers: Vec<EnergyScheduleHandler>,
        max_buy: Watts,
        rows: &[(i64, i64, f64)],
    ) -> GlobalOptimizationContext {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        GlobalOptimizationContext::builder()
            .start(start)
            .grid(Grid { max_buy, max_sell: Watts(8000) })
            .ess(Ess {
                capacity: WattHours::ZERO,
                initial_energy: WattHours::ZERO,
                max_charge: Watts::ZERO,
                max_discharge: Watts::ZERO,
            })
            .periods(quarter_periods(start, rows))
            .handlers(handlers)
            .build()
    }

    fn consumer(id: &str, power: i64, demand: i64) -> EnergyScheduleHandler {
        EnergyScheduleHandler::OneMode(Box::new(
            ConsumerHandler::builder()
                .id(id)
                .power(Watts(power))
                .from_hour(0)
                .to_hour(0)
                .demand(WattHours(demand))
                .lost_load_rate(EuroPerMegawattHour(1_000_000.0))
                .build(),
        ))
    }

    #[test]
    fn test_demand_is_spread_until_served() {
        let goc = context(
            vec![consumer("boiler", 2000, 800)],
            Watts(8000),
            &[(0, 0, 100.0), (0, 0, 100.0), (0, 0, 100.0)],
        );
        let (fitness, outcomes) = simulate_trajectory_with_outcomes(&goc, &Vec::new());
        // 500 Wh per quarter at 2 kW, 800 Wh in total:
        assert_eq!(outcomes[0].flow.unwrap().managed_consumption, WattHours(500));
        assert_eq!(outcomes[1].flow.unwrap().managed_consumption, WattHours(300));
        assert_eq!(outcomes[2].flow.unwrap().managed_consumption, WattHours::ZERO);
        // Fully served, only the plain energy bill remains:
        let expected = WattHours(800) * EuroPerMegawattHour(100.0);
        assert!((fitness.cost() - expected).0.abs() < 1e-9);
    }

    #[test]
    fn test_unserved_demand_is_penalized() {
        // 250 Wh of grid headroom per quarter cannot serve 2000 Wh:
        let goc = context(
            vec![consumer("boiler", 2000, 2000)],
            Watts(1000),
            &[(0, 0, 100.0), (0, 0, 100.0)],
        );
        let (fitness, outcomes) = simulate_trajectory_with_outcomes(&goc, &Vec::new());
        assert_eq!(outcomes[0].flow.unwrap().managed_consumption, WattHours(250));
        assert_eq!(outcomes[1].flow.unwrap().managed_consumption, WattHours(250));
        let energy_bill = WattHours(500) * EuroPerMegawattHour(100.0);
        let penalty = WattHours(1500) * EuroPerMegawattHour(1_000_000.0);
        assert!((fitness.cost() - energy_bill - penalty).0.abs() < 1e-9);
        assert_eq!(fitness.hard_violations(), 0);
    }

    #[test]
    fn test_allocation_is_first_come_first_served() {
        let goc = context(
            vec![consumer("first", 2000, 2000), consumer("second", 2000, 2000)],
            Watts(2000),
            &[(0, 0, 100.0)],
        );
        let (_, outcomes) = simulate_trajectory_with_outcomes(&goc, &Vec::new());
        // 500 Wh of headroom, the first registered handler takes it all:
        assert_eq!(outcomes[0].flow.unwrap().managed_consumption, WattHours(500));
    }
}
