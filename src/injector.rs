//! Boundary reservoirs: tops up a column band of the grid toward a target
//! particle concentration every step, modelling an inflow/outflow plenum.
//!
//! The original implementation picked an injected particle's direction by
//! sampling `0..=6` — which could land on bit 6, the rest-particle slot, and
//! silently inject a non-moving particle where a moving one was asked for.
//! Direction is sampled from `0..=5` here instead.

use rand::Rng;

use crate::error::SimError;
use crate::grid::{Grid, WALL_BIT};

/// Concentrations above this are unreachable: six direction slots per cell,
/// out of seven total bit slots (the seventh being the rest particle, which
/// the injector never sets).
const MAX_CONCENTRATION: f64 = 6.0 / 7.0;

pub struct Injector;

impl Injector {
    /// Tops up every column `c` in `[at, at + width)` toward `concentration`,
    /// by adding particles — never removing any. A column already at or
    /// above its target occupancy is left untouched.
    pub fn spawn_at_x<R: Rng>(
        &self,
        rng: &mut R,
        grid: &mut Grid,
        concentration: f64,
        at: usize,
        width: usize,
    ) -> Result<(), SimError> {
        if concentration > MAX_CONCENTRATION {
            return Err(SimError::ConcentrationInfeasible { concentration });
        }

        let height = grid.height();
        for x in at..(at + width).min(grid.width()) {
            let mut walls = 0usize;
            let mut occupied = 0u32;
            for y in 0..height {
                let cell = grid.get(x, y);
                if cell & (1 << WALL_BIT) != 0 {
                    walls += 1;
                }
                occupied += (cell & 0x7F).count_ones();
            }

            let target = ((height - walls) as f64 * 7.0 * concentration).floor() as u32;
            if occupied >= target {
                continue;
            }

            let mut to_spawn = target - occupied;
            while to_spawn > 0 {
                let y = rng.gen_range(0, height);
                let d = rng.gen_range(0u8, 6u8);
                let cell = grid.get(x, y);
                if cell & (1 << WALL_BIT) != 0 || cell & (1 << d) != 0 {
                    continue;
                }
                grid.set(x, y, cell | (1 << d));
                to_spawn -= 1;
            }
        }

        Ok(())
    }
}
