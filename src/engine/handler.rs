use std::any::Any;

use crate::{
    engine::{fitness::Fitness, flow, period::Period, simulator::GlobalScheduleContext},
    prelude::*,
};

/// Handler-private state carried across the periods of one trajectory.
///
/// Created fresh per trajectory and threaded through that trajectory only.
/// Handlers never keep running state in themselves, which is what keeps
/// concurrent trajectory evaluations independent.
pub type ScheduleContext = Box<dyn Any>;

/// A component without a discrete choice: it behaves the same way in every
/// candidate schedule, but still participates in every period simulation.
pub trait OneModeHandler: Send + Sync {
    fn id(&self) -> &str;

    fn create_schedule_context(&self) -> ScheduleContext {
        Box::new(())
    }

    /// Simulates one period, mutating the flow model and the shared fitness.
    ///
    /// An error is recorded as a hard violation for the trajectory and never
    /// aborts the optimization run.
    fn simulate(
        &self,
        period: &Period,
        gsc: &GlobalScheduleContext<'_>,
        sctx: &mut ScheduleContext,
        flow: &mut flow::Model,
        fitness: &mut Fitness,
    ) -> Result;
}

/// A component with an enumerable per-period mode set the optimizer steers.
///
/// Modes are addressed by index; the handler owns the meaning of each index
/// and may translate or veto a raw index in
/// [`MultiModeHandler::pre_process_period`].
pub trait MultiModeHandler: Send + Sync {
    fn id(&self) -> &str;

    /// Number of modes available in the given period, at least one.
    fn mode_count(&self, period: &Period) -> usize;

    /// Mode used when none is explicitly scheduled.
    fn default_mode(&self) -> usize {
        0
    }

    /// Human-readable label of a mode, for reporting.
    fn mode_label(&self, mode_index: usize) -> String;

    /// Translates a raw mode index before simulation, e.g. replaces a mode
    /// that is infeasible in this period. Out-of-range indexes must degrade
    /// to a valid one.
    fn pre_process_period(
        &self,
        period: &Period,
        gsc: &GlobalScheduleContext<'_>,
        mode_index: usize,
    ) -> usize {
        let _ = (period, gsc);
        mode_index
    }

    fn create_schedule_context(&self) -> ScheduleContext {
        Box::new(())
    }

    /// Simulates one period in the given (pre-processed) mode.
    fn simulate(
        &self,
        period: &Period,
        gsc: &GlobalScheduleContext<'_>,
        sctx: &mut ScheduleContext,
        flow: &mut flow::Model,
        mode_index: usize,
        fitness: &mut Fitness,
    ) -> Result;
}

/// A registered schedule handler, one of the two capability variants.
///
/// Kept as a closed sum so the per-period simulation step dispatches
/// exhaustively; a new variant is a compile-time concern at that one call
/// site.
pub enum EnergyScheduleHandler {
    OneMode(Box<dyn OneModeHandler>),
    MultiMode(Box<dyn MultiModeHandler>),
}

impl EnergyScheduleHandler {
    pub fn id(&self) -> &str {
        match self {
            Self::OneMode(handler) => handler.id(),
            Self::MultiMode(handler) => handler.id(),
        }
    }

    pub fn create_schedule_context(&self) -> ScheduleContext {
        match self {
            Self::OneMode(handler) => handler.create_schedule_context(),
            Self::MultiMode(handler) => handler.create_schedule_context(),
        }
    }

    pub fn as_multi_mode(&self) -> Option<&dyn MultiModeHandler> {
        match self {
            Self::OneMode(_) => None,
            Self::MultiMode(handler) => Some(handler.as_ref()),
        }
    }
}
