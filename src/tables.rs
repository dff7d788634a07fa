use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::{
    engine::{GlobalOptimizationContext, PeriodOutcome},
    units::WattHours,
};

/// Renders the per-period outcomes of a plan.
#[must_use]
pub fn build_plan_table(goc: &GlobalOptimizationContext, outcomes: &[PeriodOutcome]) -> Table {
    let median_price = {
        let mut prices: Vec<OrderedFloat<f64>> =
            goc.periods.iter().map(|period| OrderedFloat(period.price().0)).collect();
        prices.sort_unstable();
        prices.get(prices.len() / 2).map_or(0.0, |price| price.0)
    };

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table.set_header(vec![
        "Start",
        "Len",
        "Price",
        "Production",
        "Consumption",
        "Modes",
        "Ess",
        "Grid",
        "Stored",
        "Cost",
    ]);

    for (period, outcome) in goc.periods.iter().zip(outcomes) {
        let start = Cell::new(period.start().format("%d %H:%M"));
        let length = Cell::new(format!("{}m", period.duration().minutes()))
            .add_attribute(Attribute::Dim);
        let price = Cell::new(period.price()).fg(if period.price().0 >= median_price {
            Color::Red
        } else {
            Color::Green
        });

        let Some(flow) = outcome.flow else {
            table.add_row(vec![
                start,
                length,
                price,
                Cell::new("not solvable")
                    .fg(Color::Red)
                    .add_attribute(Attribute::Bold),
            ]);
            continue;
        };

        let modes = goc
            .multi_mode_handlers()
            .zip(&outcome.modes)
            .map(|(handler, &mode)| handler.mode_label(mode))
            .join(", ");
        let cost = flow.grid.max(WattHours::ZERO) * period.price();
        table.add_row(vec![
            start,
            length,
            price,
            Cell::new(flow.production).set_alignment(CellAlignment::Right),
            Cell::new(flow.consumption()).set_alignment(CellAlignment::Right),
            Cell::new(modes),
            Cell::new(flow.ess).set_alignment(CellAlignment::Right).fg(
                if flow.ess.is_negative() {
                    // Charging:
                    Color::Green
                } else if flow.ess > WattHours::ZERO {
                    Color::Red
                } else {
                    Color::Reset
                },
            ),
            Cell::new(flow.grid).set_alignment(CellAlignment::Right).fg(
                if flow.grid > WattHours::ZERO {
                    Color::Red
                } else if flow.grid.is_negative() {
                    Color::Green
                } else {
                    Color::Reset
                },
            ),
            Cell::new(outcome.ess_energy).set_alignment(CellAlignment::Right),
            Cell::new(cost).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
