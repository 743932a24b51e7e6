//! In-place collision resolution against the global [`CollisionTable`].
//!
//! The original implementation drew its tie-breaking coin flips from one RNG
//! shared across worker threads, which is a data race (and, depending on the
//! RNG's internals, a potential source of UB). Here each worker seeds and
//! owns its own [`SmallRng`], deterministically derived from a single root
//! seed so a whole step is still reproducible given that seed.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::collision::COLLISION_TABLE;
use crate::error::SimError;
use crate::fanout;
use crate::grid::{Grid, WALL_BIT};

pub struct Collider {
    n_threads: usize,
}

impl Collider {
    pub fn new(n_threads: usize) -> Self {
        Collider { n_threads }
    }

    /// Resolves collisions in place, row by row. `seed` fixes the coin-flip
    /// sequence for this call; callers that want a fresh draw every step
    /// should derive `seed` from a supervisor-owned RNG, not reuse one value.
    pub fn step(&self, grid: &mut Grid, seed: u64) -> Result<(), SimError> {
        let width = grid.width();
        let table = &*COLLISION_TABLE;

        fanout::parallel_rows_mut(grid.cells_mut(), width, self.n_threads, |y, row| {
            // Distinct, disjoint seed per row so two rows never share a
            // coin-flip sequence even when bands are rebalanced differently
            // between calls.
            let mut rng = SmallRng::seed_from_u64(seed ^ (y as u64).wrapping_mul(0x9E3779B97F4A7C15));
            for cell in row.iter_mut() {
                let wall = *cell & (1 << WALL_BIT) != 0;
                let coin = if wall { false } else { rng.gen() };
                *cell = table.collide(*cell, coin);
            }
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::Direction;

    #[test]
    fn deterministic_entries_are_seed_independent() {
        let mut a = Grid::new(4, 2);
        a.set(0, 0, Direction::D0.bit());
        let mut b = a.clone();
        Collider::new(1).step(&mut a, 1).unwrap();
        Collider::new(1).step(&mut b, 2).unwrap();
        assert_eq!(a.cells(), b.cells());
    }

    #[test]
    fn wall_cells_bounce_back_regardless_of_coin() {
        let mut g = Grid::new(3, 1);
        g.set(1, 0, (1 << WALL_BIT) | Direction::D0.bit());
        Collider::new(1).step(&mut g, 42).unwrap();
        assert_eq!(g.get(1, 0), (1 << WALL_BIT) | Direction::D3.bit());
    }

    #[test]
    fn row_parallel_result_matches_single_threaded() {
        let mut src = Grid::new(6, 6);
        for y in 0..6 {
            for x in 0..6 {
                src.set(x, y, ((x * 3 + y * 7) % 0x40) as u8);
            }
        }
        let mut single = src.clone();
        let mut multi = src.clone();
        Collider::new(1).step(&mut single, 7).unwrap();
        Collider::new(3).step(&mut multi, 7).unwrap();
        assert_eq!(single.cells(), multi.cells());
    }

    #[test]
    fn mass_is_conserved_across_a_full_grid() {
        let mut g = Grid::new(5, 5);
        for y in 0..5 {
            for x in 0..5 {
                g.set(x, y, ((x + 2 * y) % 0x80) as u8);
            }
        }
        let before: u32 = g.cells().iter().map(|b| (b & 0x7F).count_ones()).sum();
        Collider::new(2).step(&mut g, 99).unwrap();
        let after: u32 = g.cells().iter().map(|b| (b & 0x7F).count_ones()).sum();
        assert_eq!(before, after);
    }
}
