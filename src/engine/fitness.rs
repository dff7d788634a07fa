use crate::units::Euro;

/// Two-channel score of one simulated trajectory, lower is better.
///
/// The field order gives the derived ordering its meaning: any trajectory
/// with a hard violation ranks strictly worse than any trajectory without,
/// no matter the cost. Hard physical and contractual limits are never traded
/// off against money.
#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub struct Fitness {
    hard_violations: u32,
    cost: Euro,
}

impl Fitness {
    /// Records one hard constraint violation.
    pub const fn add_hard_violation(&mut self) {
        self.hard_violations += 1;
    }

    /// Accumulates soft cost. The channel is monotone, costs never get
    /// taken back.
    pub fn add_cost(&mut self, cost: Euro) {
        debug_assert!(cost >= Euro::ZERO);
        self.cost += cost;
    }

    pub const fn hard_violations(self) -> u32 {
        self.hard_violations
    }

    pub const fn cost(self) -> Euro {
        self.cost
    }
}
