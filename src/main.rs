mod cli;
mod config;
mod engine;
mod handlers;
mod optimizer;
mod prelude;
mod tables;
mod units;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::{
    cli::{Args, Command, ScenarioArgs},
    config::Scenario,
    engine::{GlobalOptimizationContext, default_assignment, simulate_trajectory_with_outcomes},
    optimizer::{GeneticOptimizer, Optimizer},
    prelude::*,
    tables::build_plan_table,
};

fn main() -> Result {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Args::parse().command {
        Command::Plan(args) => {
            let goc = build_context(&args.scenario)?;
            let optimizer = GeneticOptimizer::builder()
                .population_size(args.search.population_size)
                .evaluations(args.search.evaluations)
                .seed(args.search.seed)
                .build();
            let plan = optimizer.optimize(&goc)?;
            info!(
                cost = %plan.fitness.cost(),
                hard_violations = plan.fitness.hard_violations(),
                "planned",
            );
            println!("{}", build_plan_table(&goc, &plan.outcomes));
            Ok(())
        }

        Command::Replay(args) => {
            let goc = build_context(&args.scenario)?;
            let (fitness, outcomes) =
                simulate_trajectory_with_outcomes(&goc, &default_assignment(&goc));
            info!(
                cost = %fitness.cost(),
                hard_violations = fitness.hard_violations(),
                "replayed the default modes",
            );
            println!("{}", build_plan_table(&goc, &outcomes));
            Ok(())
        }
    }
}

fn build_context(args: &ScenarioArgs) -> Result<GlobalOptimizationContext> {
    let scenario = Scenario::load(&args.scenario)?;
    let goc =
        scenario.into_context(args.risk_level, args.quarter_horizon, args.storage_modes())?;
    info!(
        periods = goc.periods.len(),
        handlers = goc.handlers.len(),
        risk_level = ?goc.risk_level,
        "context ready",
    );
    Ok(goc)
}
