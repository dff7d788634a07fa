use crate::{prelude::*, units::WattHours};

/// Committed outcome of one period: the four balanced flows.
///
/// Sign conventions: `ess` positive is discharging, `grid` positive is
/// buying.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EnergyFlow {
    pub production: WattHours,
    pub unmanaged_consumption: WattHours,
    pub managed_consumption: WattHours,
    pub ess: WattHours,
    pub grid: WattHours,
}

impl EnergyFlow {
    pub const fn consumption(&self) -> WattHours {
        WattHours(self.unmanaged_consumption.0 + self.managed_consumption.0)
    }
}

/// The balance gap cannot be closed even with both envelopes fully used.
///
/// Raised at model construction only; every later operation clamps instead
/// of failing.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("initial setup is not solvable: surplus of {surplus} exceeds the headroom of {headroom}")]
pub struct Unsolvable {
    pub surplus: WattHours,
    pub headroom: WattHours,
}

/// Which flow is the committed driving variable of the period.
///
/// At most one of ess and grid is ever committed; the other is always
/// re-derived from the balance equation. There is no reverse transition.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Committed {
    None,
    Ess(WattHours),
    Grid(WattHours),
}

/// Per-period mutable balance engine.
///
/// Maintains `production + ess + grid == unmanaged + managed consumption`
/// after every mutating call, in whole watt-hours. Envelopes only ever
/// tighten; out-of-range requests clamp to the feasible boundary.
#[derive(Debug)]
pub struct Model {
    production: WattHours,
    unmanaged_consumption: WattHours,
    managed_consumption: WattHours,
    ess_max_charge: WattHours,
    ess_max_discharge: WattHours,
    grid_max_buy: WattHours,
    grid_max_sell: WattHours,
    committed: Committed,
    ess: WattHours,
    grid: WattHours,
}

impl Model {
    /// Builds the model and runs the feasibility pre-check.
    ///
    /// All arguments must be non-negative; the envelopes are magnitudes.
    pub fn new(
        production: WattHours,
        unmanaged_consumption: WattHours,
        ess_max_charge: WattHours,
        ess_max_discharge: WattHours,
        grid_max_buy: WattHours,
        grid_max_sell: WattHours,
    ) -> Result<Self, Unsolvable> {
        assert!(!production.is_negative());
        assert!(!unmanaged_consumption.is_negative());
        assert!(!ess_max_charge.is_negative());
        assert!(!ess_max_discharge.is_negative());
        assert!(!grid_max_buy.is_negative());
        assert!(!grid_max_sell.is_negative());

        let surplus = production - unmanaged_consumption;
        if surplus > WattHours::ZERO {
            let headroom = grid_max_sell + ess_max_charge;
            if surplus > headroom {
                return Err(Unsolvable { surplus, headroom });
            }
        } else {
            let headroom = grid_max_buy + ess_max_discharge;
            if -surplus > headroom {
                return Err(Unsolvable { surplus, headroom });
            }
        }

        let mut this = Self {
            production,
            unmanaged_consumption,
            managed_consumption: WattHours::ZERO,
            ess_max_charge,
            ess_max_discharge,
            grid_max_buy,
            grid_max_sell,
            committed: Committed::None,
            ess: WattHours::ZERO,
            grid: WattHours::ZERO,
        };
        this.rebalance();
        Ok(this)
    }

    pub const fn production(&self) -> WattHours {
        self.production
    }

    /// Total consumption, unmanaged plus managed.
    pub const fn consumption(&self) -> WattHours {
        WattHours(self.unmanaged_consumption.0 + self.managed_consumption.0)
    }

    pub const fn managed_consumption(&self) -> WattHours {
        self.managed_consumption
    }

    /// Production minus total consumption; negative is a deficit.
    pub const fn surplus(&self) -> WattHours {
        WattHours(self.production.0 - self.consumption().0)
    }

    pub const fn ess(&self) -> WattHours {
        self.ess
    }

    pub const fn grid(&self) -> WattHours {
        self.grid
    }

    pub const fn snapshot(&self) -> EnergyFlow {
        EnergyFlow {
            production: self.production,
            unmanaged_consumption: self.unmanaged_consumption,
            managed_consumption: self.managed_consumption,
            ess: self.ess,
            grid: self.grid,
        }
    }

    /// Tightens the battery charge envelope, returns the applied magnitude.
    ///
    /// The ceiling is the current envelope, so tightening is monotone. The
    /// floor is the charge the battery is already required to carry to keep
    /// the grid inside its sell envelope. Once the ess flow is committed,
    /// the envelope collapses to the committed magnitude.
    pub fn set_ess_max_charge(&mut self, value: WattHours) -> WattHours {
        let (floor, ceiling) = match self.committed {
            Committed::Ess(ess) => {
                let charge = (-ess).max(WattHours::ZERO);
                (charge, charge)
            }
            Committed::Grid(grid) => {
                ((self.surplus() + grid).max(WattHours::ZERO), self.ess_max_charge)
            }
            Committed::None => {
                ((self.surplus() - self.grid_max_sell).max(WattHours::ZERO), self.ess_max_charge)
            }
        };
        self.ess_max_charge = value.max(WattHours::ZERO).clamp(floor, ceiling);
        self.rebalance();
        self.ess_max_charge
    }

    /// Tightens the battery discharge envelope, returns the applied
    /// magnitude. See [`Model::set_ess_max_charge`] for the clamping rules.
    pub fn set_ess_max_discharge(&mut self, value: WattHours) -> WattHours {
        let (floor, ceiling) = match self.committed {
            Committed::Ess(ess) => {
                let discharge = ess.max(WattHours::ZERO);
                (discharge, discharge)
            }
            Committed::Grid(grid) => {
                ((-self.surplus() - grid).max(WattHours::ZERO), self.ess_max_discharge)
            }
            Committed::None => (
                (-self.surplus() - self.grid_max_buy).max(WattHours::ZERO),
                self.ess_max_discharge,
            ),
        };
        self.ess_max_discharge = value.max(WattHours::ZERO).clamp(floor, ceiling);
        self.rebalance();
        self.ess_max_discharge
    }

    /// Tightens the grid buy envelope, returns the applied magnitude.
    pub fn set_grid_max_buy(&mut self, value: WattHours) -> WattHours {
        let (floor, ceiling) = match self.committed {
            Committed::Grid(grid) => {
                let buy = grid.max(WattHours::ZERO);
                (buy, buy)
            }
            Committed::Ess(ess) => {
                ((-self.surplus() - ess).max(WattHours::ZERO), self.grid_max_buy)
            }
            Committed::None => (
                (-self.surplus() - self.ess_max_discharge).max(WattHours::ZERO),
                self.grid_max_buy,
            ),
        };
        self.grid_max_buy = value.max(WattHours::ZERO).clamp(floor, ceiling);
        self.rebalance();
        self.grid_max_buy
    }

    /// Tightens the grid sell envelope, returns the applied magnitude.
    pub fn set_grid_max_sell(&mut self, value: WattHours) -> WattHours {
        let (floor, ceiling) = match self.committed {
            Committed::Grid(grid) => {
                let sell = (-grid).max(WattHours::ZERO);
                (sell, sell)
            }
            Committed::Ess(ess) => {
                ((self.surplus() + ess).max(WattHours::ZERO), self.grid_max_sell)
            }
            Committed::None => (
                (self.surplus() - self.ess_max_charge).max(WattHours::ZERO),
                self.grid_max_sell,
            ),
        };
        self.grid_max_sell = value.max(WattHours::ZERO).clamp(floor, ceiling);
        self.rebalance();
        self.grid_max_sell
    }

    /// Grants up to the remaining suppliable headroom, first come first
    /// served, and returns the granted energy.
    pub fn add_managed_consumption(&mut self, name: &str, requested: WattHours) -> WattHours {
        let headroom = match self.committed {
            Committed::None => {
                self.production + self.ess_max_discharge + self.grid_max_buy - self.consumption()
            }
            Committed::Ess(ess) => self.production + ess + self.grid_max_buy - self.consumption(),
            Committed::Grid(grid) => {
                self.production + self.ess_max_discharge + grid - self.consumption()
            }
        }
        .max(WattHours::ZERO);
        let granted = requested.max(WattHours::ZERO).min(headroom);
        self.managed_consumption += granted;
        self.rebalance();
        trace!(name, %requested, %granted, "managed consumption");
        granted
    }

    /// Commits the battery flow, clamped into the still-feasible range, and
    /// returns the applied value. The grid is re-derived from the balance.
    ///
    /// When the grid is already the driving variable, the call does not
    /// re-commit: the derived battery flow is returned unchanged.
    pub fn set_ess(&mut self, value: WattHours) -> WattHours {
        if let Committed::Grid(_) = self.committed {
            trace!(%value, "grid flow is already committed, keeping the derived ess flow");
            return self.ess;
        }
        let surplus = self.surplus();
        let lo = (-self.ess_max_charge).max(-surplus - self.grid_max_buy);
        let hi = self.ess_max_discharge.min(self.grid_max_sell - surplus);
        let value = value.clamp(lo, hi);
        self.committed = Committed::Ess(value);
        self.rebalance();
        value
    }

    /// Commits the grid flow, clamped into the still-feasible range, and
    /// returns the applied value. The battery is re-derived from the
    /// balance. Symmetric to [`Model::set_ess`].
    pub fn set_grid(&mut self, value: WattHours) -> WattHours {
        if let Committed::Ess(_) = self.committed {
            trace!(%value, "ess flow is already committed, keeping the derived grid flow");
            return self.grid;
        }
        let surplus = self.surplus();
        let lo = (-self.grid_max_sell).max(-surplus - self.ess_max_discharge);
        let hi = self.grid_max_buy.min(self.ess_max_charge - surplus);
        let value = value.clamp(lo, hi);
        self.committed = Committed::Grid(value);
        self.rebalance();
        value
    }

    /// Re-derives the non-committed flows from the balance equation.
    ///
    /// Without a committed flow the grid is the preferred balancer and the
    /// battery only carries what the grid envelope cannot.
    fn rebalance(&mut self) {
        let surplus = self.surplus();
        match self.committed {
            Committed::None => {
                self.grid = (-surplus).clamp(-self.grid_max_sell, self.grid_max_buy);
                self.ess = -surplus - self.grid;
            }
            Committed::Ess(ess) => {
                self.ess = ess;
                self.grid = -surplus - ess;
            }
            Committed::Grid(grid) => {
                self.grid = grid;
                self.ess = -surplus - grid;
            }
        }
        debug_assert_eq!(self.production + self.ess + self.grid, self.consumption());
    }
}
