use std::{cmp::Ordering, collections::BinaryHeap};

use crate::{
    engine::{
        Fitness,
        GlobalOptimizationContext,
        ModeAssignment,
        PeriodOutcome,
        default_assignment,
        simulate_trajectory,
        simulate_trajectory_with_outcomes,
    },
    prelude::*,
};

/// The winning schedule of one optimization run.
pub struct Plan {
    pub fitness: Fitness,
    pub assignment: ModeAssignment,
    pub outcomes: Vec<PeriodOutcome>,
}

/// The search over candidate mode assignments.
///
/// The engine only promises cheap, deterministic evaluation; what
/// enumerates the candidates is pluggable behind this trait.
pub trait Optimizer {
    fn optimize(&self, goc: &GlobalOptimizationContext) -> Result<Plan>;
}

/// Mini genetic search over mode assignments.
///
/// A fixed-size population ordered by fitness, uniform per-period
/// crossover and a coin-flip point mutation. Deliberately small: the
/// default-mode baseline is always part of the initial population, so the
/// result never ranks worse than doing nothing special.
#[derive(bon::Builder)]
pub struct GeneticOptimizer {
    #[builder(default = 64)]
    population_size: usize,

    /// Total evaluation budget, including the initial population.
    #[builder(default = 4096)]
    evaluations: usize,

    #[builder(default)]
    seed: u64,
}

impl Optimizer for GeneticOptimizer {
    #[instrument(skip_all, fields(periods = goc.periods.len()))]
    fn optimize(&self, goc: &GlobalOptimizationContext) -> Result<Plan> {
        // Mode counts per period and steerable handler, the genome bounds:
        let mode_counts: Vec<Vec<usize>> = goc
            .periods
            .iter()
            .map(|period| {
                goc.multi_mode_handlers()
                    .map(|handler| handler.mode_count(period).max(1))
                    .collect()
            })
            .collect();
        let steerable: Vec<(usize, usize)> = mode_counts
            .iter()
            .enumerate()
            .flat_map(|(period, counts)| {
                counts
                    .iter()
                    .enumerate()
                    .filter(|&(_, &count)| count > 1)
                    .map(move |(column, _)| (period, column))
            })
            .collect();

        let mut rng = fastrand::Rng::with_seed(self.seed);
        let mut population = BinaryHeap::with_capacity(self.population_size + 1);
        let evaluate = |assignment: ModeAssignment, population: &mut BinaryHeap<Candidate>| {
            let fitness = simulate_trajectory(goc, &assignment);
            population.push(Candidate { fitness, assignment });
        };

        evaluate(default_assignment(goc), &mut population);
        if !steerable.is_empty() {
            for _ in 1..self.population_size {
                evaluate(random_assignment(&mut rng, &mode_counts), &mut population);
            }
            for _ in 0..self.evaluations.saturating_sub(self.population_size) {
                let child = {
                    let parent_1 =
                        rng.choice(population.iter()).context("no parents available")?;
                    let parent_2 =
                        rng.choice(population.iter()).context("no parents available")?;
                    let mut child =
                        crossover(&mut rng, &parent_1.assignment, &parent_2.assignment);
                    if rng.bool() {
                        mutate(&mut rng, &mut child, &mode_counts, &steerable);
                    }
                    child
                };
                evaluate(child, &mut population);
                // The heap keeps the worst candidate on top:
                while population.len() > self.population_size {
                    population.pop();
                }
            }
        }

        let best = population.into_sorted_vec().into_iter().next().context("empty population")?;
        info!(
            cost = %best.fitness.cost(),
            hard_violations = best.fitness.hard_violations(),
            "search finished",
        );
        let (fitness, outcomes) = simulate_trajectory_with_outcomes(goc, &best.assignment);
        debug_assert_eq!(fitness, best.fitness);
        Ok(Plan { fitness, assignment: best.assignment, outcomes })
    }
}

fn random_assignment(rng: &mut fastrand::Rng, mode_counts: &[Vec<usize>]) -> ModeAssignment {
    mode_counts
        .iter()
        .map(|counts| counts.iter().map(|&count| rng.usize(0..count)).collect())
        .collect()
}

/// Uniform crossover: every period row comes from either parent.
fn crossover(
    rng: &mut fastrand::Rng,
    parent_1: &ModeAssignment,
    parent_2: &ModeAssignment,
) -> ModeAssignment {
    parent_1
        .iter()
        .zip(parent_2)
        .map(|(row_1, row_2)| if rng.bool() { row_1.clone() } else { row_2.clone() })
        .collect()
}

/// Re-rolls one steerable gene.
fn mutate(
    rng: &mut fastrand::Rng,
    assignment: &mut ModeAssignment,
    mode_counts: &[Vec<usize>],
    steerable: &[(usize, usize)],
) {
    let (period, column) = steerable[rng.usize(0..steerable.len())];
    assignment[period][column] = rng.usize(0..mode_counts[period][column]);
}

struct Candidate {
    fitness: Fitness,
    assignment: ModeAssignment,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fitness.cmp(&other.fitness)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use enumset::EnumSet;

    use super::*;
    use crate::{
        engine::{
            EnergyScheduleHandler,
            Ess,
            Grid,
            RiskLevel,
            test_support::quarter_periods,
        },
        handlers::StorageHandler,
        units::{WattHours, Watts},
    };

    /// A cheap quarter followed by an expensive one; 250 Wh in the battery.
    ///
    /// Delaying the discharge through the cheap quarter and balancing in
    /// the expensive one is the unique best plan.
    fn context() -> GlobalOptimizationContext {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        GlobalOptimizationContext::builder()
            .start(start)
            .risk_level(RiskLevel::Low)
            .grid(Grid { max_buy: Watts(4000), max_sell: Watts(4000) })
            .ess(Ess {
                capacity: WattHours(250),
                initial_energy: WattHours(250),
                max_charge: Watts(1000),
                max_discharge: Watts(1000),
            })
            .periods(quarter_periods(start, &[(0, 250, 50.0), (0, 250, 500.0)]))
            .handlers(vec![EnergyScheduleHandler::MultiMode(Box::new(StorageHandler::new(
                "ess0",
                EnumSet::all(),
            )))])
            .build()
    }

    #[test]
    fn test_finds_the_delay_then_discharge_plan() {
        let goc = context();
        let optimizer =
            GeneticOptimizer::builder().population_size(16).evaluations(256).seed(42).build();
        let plan = optimizer.optimize(&goc).unwrap();
        // Delay through the cheap quarter, discharge in the expensive one:
        let expected = simulate_trajectory(&goc, &vec![vec![1], vec![0]]);
        assert_eq!(plan.fitness, expected);
        assert_eq!(plan.fitness.hard_violations(), 0);
    }

    #[test]
    fn test_same_seed_reproduces_the_plan() {
        let goc = context();
        let optimizer =
            GeneticOptimizer::builder().population_size(8).evaluations(64).seed(7).build();
        let first = optimizer.optimize(&goc).unwrap();
        let second = optimizer.optimize(&goc).unwrap();
        assert_eq!(first.fitness, second.fitness);
        assert_eq!(first.assignment, second.assignment);
    }

    #[test]
    fn test_never_prefers_a_violating_plan() {
        let goc = context();
        let optimizer = GeneticOptimizer::builder().evaluations(128).seed(3).build();
        let plan = optimizer.optimize(&goc).unwrap();
        // The balancing baseline is violation-free, so the winner must be:
        assert_eq!(plan.fitness.hard_violations(), 0);
    }

    #[test]
    fn test_without_steerable_handlers_returns_the_baseline() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let goc = GlobalOptimizationContext::builder()
            .start(start)
            .grid(Grid { max_buy: Watts(4000), max_sell: Watts(4000) })
            .ess(Ess {
                capacity: WattHours::ZERO,
                initial_energy: WattHours::ZERO,
                max_charge: Watts::ZERO,
                max_discharge: Watts::ZERO,
            })
            .periods(quarter_periods(start, &[(0, 100, 100.0)]))
            .handlers(Vec::new())
            .build();
        let plan = GeneticOptimizer::builder().build().optimize(&goc).unwrap();
        assert_eq!(plan.fitness.hard_violations(), 0);
        assert_eq!(plan.outcomes.len(), 1);
    }
}
