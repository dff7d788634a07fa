use std::path::PathBuf;

use clap::{Parser, Subcommand};
use enumset::EnumSet;

use crate::{engine::RiskLevel, handlers::StorageMode};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: optimize the dispatch schedule for a scenario.
    #[clap(name = "plan")]
    Plan(Box<PlanArgs>),

    /// Evaluate the default modes only and dump the per-period flows.
    #[clap(name = "replay")]
    Replay(Box<ReplayArgs>),
}

#[derive(Parser)]
pub struct ScenarioArgs {
    /// Scenario file with the forecasts and hardware envelopes.
    #[clap(long, env = "CORSAC_SCENARIO", default_value = "scenario.toml")]
    pub scenario: PathBuf,

    #[clap(long, value_enum, default_value = "medium", env = "CORSAC_RISK_LEVEL")]
    pub risk_level: RiskLevel,

    /// Leading periods kept at quarter resolution; the rest is planned in
    /// hours.
    #[clap(long, default_value = "24", env = "CORSAC_QUARTER_HORIZON")]
    pub quarter_horizon: usize,

    #[clap(
        long = "storage-modes",
        env = "CORSAC_STORAGE_MODES",
        value_delimiter = ',',
        num_args = 1..,
        default_value = "balancing,delay-discharge,charge-from-grid",
    )]
    pub storage_modes: Vec<StorageMode>,
}

impl ScenarioArgs {
    #[must_use]
    pub fn storage_modes(&self) -> EnumSet<StorageMode> {
        self.storage_modes.iter().copied().collect()
    }
}

#[derive(Parser)]
pub struct PlanArgs {
    #[clap(flatten)]
    pub scenario: ScenarioArgs,

    #[clap(flatten)]
    pub search: SearchArgs,
}

#[derive(Copy, Clone, Parser)]
pub struct SearchArgs {
    #[clap(long, default_value = "64", env = "CORSAC_POPULATION_SIZE")]
    pub population_size: usize,

    /// Total evaluation budget of the search.
    #[clap(long, default_value = "4096", env = "CORSAC_EVALUATIONS")]
    pub evaluations: usize,

    /// Seed of the search; the same seed reproduces the same plan.
    #[clap(long, default_value = "0", env = "CORSAC_SEED")]
    pub seed: u64,
}

#[derive(Parser)]
pub struct ReplayArgs {
    #[clap(flatten)]
    pub scenario: ScenarioArgs,
}
