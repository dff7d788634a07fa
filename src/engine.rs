mod context;
mod fitness;
mod flow;
mod handler;
mod period;
mod simulator;

#[cfg(test)]
pub use self::period::test_support;

pub use self::{
    context::{Ess, GlobalOptimizationContext, Grid, RiskLevel, build_periods},
    fitness::Fitness,
    flow::{EnergyFlow, Model, Unsolvable},
    handler::{EnergyScheduleHandler, MultiModeHandler, OneModeHandler, ScheduleContext},
    period::{Period, PeriodDuration, Quarter},
    simulator::{
        GlobalScheduleContext,
        ModeAssignment,
        PeriodOutcome,
        default_assignment,
        simulate_trajectory,
        simulate_trajectory_with_outcomes,
    },
};
