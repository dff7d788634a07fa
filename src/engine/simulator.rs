use crate::{
    engine::{
        context::GlobalOptimizationContext,
        fitness::Fitness,
        flow::{EnergyFlow, Model},
        handler::{EnergyScheduleHandler, ScheduleContext},
    },
    prelude::*,
    units::WattHours,
};

/// Per-trajectory carry-over view derived from the global context.
///
/// This is the seam through which state flows from one period into the
/// next within a single trajectory. Handlers read it; the simulator owns
/// the updates.
pub struct GlobalScheduleContext<'a> {
    pub goc: &'a GlobalOptimizationContext,

    /// Stored battery energy at the start of the current period.
    pub ess_energy: WattHours,
}

/// One full-horizon candidate: per period, one mode index per multi-mode
/// handler, in registration order.
pub type ModeAssignment = Vec<Vec<usize>>;

/// The assignment that schedules every handler's default mode everywhere.
pub fn default_assignment(goc: &GlobalOptimizationContext) -> ModeAssignment {
    let defaults: Vec<usize> =
        goc.multi_mode_handlers().map(|handler| handler.default_mode()).collect();
    goc.periods.iter().map(|_| defaults.clone()).collect()
}

/// Committed outcome of one simulated period, for inspection and reporting.
pub struct PeriodOutcome {
    /// `None` when the period's initial setup was not solvable.
    pub flow: Option<EnergyFlow>,

    /// Pre-processed mode indexes, aligned with the multi-mode handlers.
    pub modes: Vec<usize>,

    /// Stored battery energy at the period start.
    pub ess_energy: WattHours,
}

/// Evaluates one candidate schedule and returns its fitness.
///
/// This is the hot path: it is called once per candidate by the optimizer
/// and allocates only the per-trajectory transients.
pub fn simulate_trajectory(goc: &GlobalOptimizationContext, assignment: &ModeAssignment) -> Fitness {
    simulate(goc, assignment, None)
}

/// Like [`simulate_trajectory`], additionally collecting the per-period
/// committed outcomes.
pub fn simulate_trajectory_with_outcomes(
    goc: &GlobalOptimizationContext,
    assignment: &ModeAssignment,
) -> (Fitness, Vec<PeriodOutcome>) {
    let mut outcomes = Vec::with_capacity(goc.periods.len());
    let fitness = simulate(goc, assignment, Some(&mut outcomes));
    (fitness, outcomes)
}

fn simulate(
    goc: &GlobalOptimizationContext,
    assignment: &ModeAssignment,
    mut outcomes: Option<&mut Vec<PeriodOutcome>>,
) -> Fitness {
    let mut fitness = Fitness::default();
    let mut schedule_contexts: Vec<ScheduleContext> =
        goc.handlers.iter().map(EnergyScheduleHandler::create_schedule_context).collect();
    let mut gsc = GlobalScheduleContext {
        goc,
        ess_energy: goc.ess.initial_energy.clamp(WattHours::ZERO, goc.ess.capacity),
    };

    for (position, period) in goc.periods.iter().enumerate() {
        let duration = period.duration();
        let model = Model::new(
            period.production(),
            period.unmanaged_consumption(),
            duration.energy(goc.ess.max_charge),
            duration.energy(goc.ess.max_discharge),
            duration.energy(goc.grid.max_buy),
            duration.energy(goc.grid.max_sell),
        );
        let mut model = match model {
            Ok(model) => model,
            Err(error) => {
                trace!(period = position, %error, "skipping period");
                fitness.add_hard_violation();
                if let Some(outcomes) = outcomes.as_deref_mut() {
                    outcomes.push(PeriodOutcome {
                        flow: None,
                        modes: Vec::new(),
                        ess_energy: gsc.ess_energy,
                    });
                }
                continue;
            }
        };

        let mut modes = Vec::new();
        let mut column = 0;
        for (handler, sctx) in goc.handlers.iter().zip(&mut schedule_contexts) {
            let result = match handler {
                EnergyScheduleHandler::OneMode(handler) => {
                    handler.simulate(period, &gsc, sctx, &mut model, &mut fitness)
                }
                EnergyScheduleHandler::MultiMode(handler) => {
                    let raw = assignment
                        .get(position)
                        .and_then(|row| row.get(column))
                        .copied()
                        .unwrap_or_else(|| handler.default_mode());
                    column += 1;
                    let mode = handler.pre_process_period(period, &gsc, raw);
                    if outcomes.is_some() {
                        modes.push(mode);
                    }
                    handler.simulate(period, &gsc, sctx, &mut model, mode, &mut fitness)
                }
            };
            if let Err(error) = result {
                trace!(period = position, handler = handler.id(), %error, "handler failed");
                fitness.add_hard_violation();
            }
        }

        // Bought energy is billed at the period price; sold energy earns
        // nothing.
        fitness.add_cost(model.grid().max(WattHours::ZERO) * period.price());

        let flow = model.snapshot();
        if let Some(outcomes) = outcomes.as_deref_mut() {
            outcomes.push(PeriodOutcome { flow: Some(flow), modes, ess_energy: gsc.ess_energy });
        }
        gsc.ess_energy =
            (gsc.ess_energy - flow.ess).clamp(WattHours::ZERO, goc.ess.capacity);
    }

    fitness
}
