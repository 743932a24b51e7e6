//! Coarse-grains the lattice into a `cx x cy`-sized block grid of density and
//! velocity samples, for visualisation and for the streamline tracer.
//!
//! Velocity is accumulated as the integer-weighted sums `vx_int`/`vy_int`
//! over a block's constituent cells, then normalised by the block's particle
//! count (`vx_int` is in halves; `vy_int` is in units of `sqrt(3)/2`, matching
//! the hex lattice's direction geometry).

use cgmath::Vector2;

use crate::error::SimError;
use crate::fanout;
use crate::grid::Grid;

const SQRT_3_OVER_2: f64 = 0.866_025_403_784_438_6;

pub struct Reducer {
    n_threads: usize,
}

impl Reducer {
    pub fn new(n_threads: usize) -> Self {
        Reducer { n_threads }
    }

    /// Returns a `(density, |velocity|)` pair for every `cell_x x cell_y` block.
    pub fn density_velocity_magnitude(
        &self,
        grid: &Grid,
        cell_x: usize,
        cell_y: usize,
    ) -> Result<Vec<(f64, f64)>, SimError> {
        let blocks = self.reduce(grid, cell_x, cell_y)?;
        Ok(blocks.into_iter().map(|(density, v)| (density, (v.x * v.x + v.y * v.y).sqrt())).collect())
    }

    /// Returns a `(velocity, density)` pair for every `cell_x x cell_y` block.
    pub fn velocity_and_density(
        &self,
        grid: &Grid,
        cell_x: usize,
        cell_y: usize,
    ) -> Result<Vec<(Vector2<f64>, f64)>, SimError> {
        let blocks = self.reduce(grid, cell_x, cell_y)?;
        Ok(blocks.into_iter().map(|(density, v)| (v, density)).collect())
    }

    fn reduce(&self, grid: &Grid, cell_x: usize, cell_y: usize) -> Result<Vec<(f64, Vector2<f64>)>, SimError> {
        let width = grid.width();
        let height = grid.height();
        if cell_x == 0 || cell_y == 0 || width % cell_x != 0 || height % cell_y != 0 {
            return Err(SimError::IndivisibleCellSize { width, height, cell_x, cell_y });
        }

        let blocks_w = width / cell_x;
        let blocks_h = height / cell_y;
        let mut out = vec![(0.0f64, Vector2::new(0.0f64, 0.0f64)); blocks_w * blocks_h];
        let capacity = (cell_x * cell_y * 7) as f64;

        fanout::parallel_rows_mut(&mut out, blocks_w, self.n_threads, |by, row| {
            for (bx, slot) in row.iter_mut().enumerate() {
                let mut vx_int: i64 = 0;
                let mut vy_int: i64 = 0;
                let mut count: u32 = 0;

                for y in (by * cell_y)..((by + 1) * cell_y) {
                    for x in (bx * cell_x)..((bx + 1) * cell_x) {
                        let cell = grid.get(x, y);
                        count += (cell & 0x7F).count_ones();

                        let bit = |i: u32| i64::from((cell >> i) & 1);
                        vx_int += -bit(0) - bit(4) + bit(1) + bit(3) + 2 * (bit(2) - bit(5));
                        vy_int += bit(0) + bit(1) - bit(3) - bit(4);
                    }
                }

                let (vx, vy) = if count == 0 {
                    (0.0, 0.0)
                } else {
                    let count = count as f64;
                    ((vx_int as f64 / 2.0) / count, (vy_int as f64 * SQRT_3_OVER_2) / count)
                };

                *slot = (count as f64 / capacity, Vector2::new(vx, vy));
            }
        })?;

        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::Direction;

    #[test]
    fn rejects_indivisible_cell_size() {
        let g = Grid::new(10, 10);
        let err = Reducer::new(1).density_velocity_magnitude(&g, 3, 2).unwrap_err();
        assert_eq!(err, SimError::IndivisibleCellSize { width: 10, height: 10, cell_x: 3, cell_y: 2 });
    }

    #[test]
    fn empty_block_has_zero_density_and_velocity() {
        let g = Grid::new(4, 4);
        let blocks = Reducer::new(1).density_velocity_magnitude(&g, 2, 2).unwrap();
        assert!(blocks.iter().all(|&(d, v)| d == 0.0 && v == 0.0));
    }

    #[test]
    fn single_d2_particle_gives_unit_velocity_along_x() {
        let mut g = Grid::new(2, 2);
        g.set(0, 0, Direction::D2.bit());
        let blocks = Reducer::new(1).velocity_and_density(&g, 2, 2).unwrap();
        assert_eq!(blocks.len(), 1);
        let (v, density) = blocks[0];
        assert!((density - 1.0 / (4.0 * 7.0)).abs() < 1e-12);
        assert!((v.x - 1.0).abs() < 1e-12);
        assert!(v.y.abs() < 1e-12);
    }

    #[test]
    fn opposing_directions_cancel_momentum() {
        let mut g = Grid::new(1, 1);
        g.set(0, 0, Direction::D0.bit() | Direction::D3.bit());
        let blocks = Reducer::new(1).velocity_and_density(&g, 1, 1).unwrap();
        let (v, _) = blocks[0];
        assert!(v.x.abs() < 1e-12);
        assert!(v.y.abs() < 1e-12);
    }

    #[test]
    fn density_is_bounded_by_one() {
        let mut g = Grid::new(1, 1);
        g.set(0, 0, 0x7F);
        let blocks = Reducer::new(1).density_velocity_magnitude(&g, 1, 1).unwrap();
        assert!((blocks[0].0 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rest_particles_dilute_velocity_through_the_shared_count_divisor() {
        // A rest particle adds to `count` (the velocity divisor) without
        // contributing momentum, so it lowers the averaged speed even though
        // it carries no direction of its own.
        let mut g = Grid::new(1, 1);
        g.set(0, 0, Direction::D2.bit() | (1 << 6));
        let blocks = Reducer::new(1).velocity_and_density(&g, 1, 1).unwrap();
        let (v, _) = blocks[0];
        assert!((v.x - 0.5).abs() < 1e-12);
    }
}
