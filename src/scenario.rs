//! Declarative initial-condition descriptors for [`SimRunner`](crate::sim_runner::SimRunner).
//!
//! A scenario fully describes a grid's starting layout (walls, fill
//! concentration, reservoir bands, point sources) and the per-step driving
//! the runner applies, so a run can be captured, serialised, and replayed
//! from config.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::grid::{Grid, WALL_BIT};
use crate::injector::Injector;

/// A rectangular obstacle, in grid coordinates, with walls on all four sides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Barrier {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// One inflow/outflow reservoir band, maintained every step by the `Injector`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reservoir {
    pub concentration: f64,
    pub at: usize,
    pub width: usize,
}

/// A circular patch of elevated concentration, seeded once at grid build time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveSource {
    pub origin_x: usize,
    pub origin_y: usize,
    pub radius: usize,
    pub concentration: f64,
}

/// A complete, serialisable description of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub width: usize,
    pub height: usize,
    pub steps: usize,
    pub fill_concentration: f64,
    pub barrier: Option<Barrier>,
    pub reservoirs: Vec<Reservoir>,
    pub wave_source: Option<WaveSource>,
    pub n_threads: usize,
}

impl ScenarioConfig {
    /// The reference "flow past a plate" scenario: a wide channel, walled top
    /// and bottom, with a rectangular barrier set back from the inlet and a
    /// concentration differential between the inflow and outflow reservoirs.
    pub fn plate() -> Self {
        let width = 4000;
        let height = 1000;
        let reserve_width = 50;
        let barrier_height = 400;
        let barrier_pos = 700;
        ScenarioConfig {
            width,
            height,
            steps: 100_000,
            fill_concentration: 0.2,
            barrier: Some(Barrier {
                x: barrier_pos - barrier_height / 4,
                y: (height - barrier_height) / 2,
                width: barrier_height / 2,
                height: barrier_height,
            }),
            reservoirs: vec![
                Reservoir { concentration: 0.4, at: 0, width: reserve_width },
                Reservoir { concentration: 0.2, at: width - reserve_width, width: reserve_width },
            ],
            wave_source: None,
            n_threads: num_cpus_fallback(),
        }
    }

    /// A smaller, faster scenario for demos and tests: same shape as `plate`
    /// but scaled down so a full run finishes in well under a second.
    pub fn plate_scaled(width: usize, height: usize, steps: usize) -> Self {
        let mut cfg = Self::plate();
        let reserve_width = (width / 80).max(2);
        let barrier_height = (height * 2 / 5).max(2);
        cfg.width = width;
        cfg.height = height;
        cfg.steps = steps;
        cfg.barrier = Some(Barrier {
            x: width / 6,
            y: (height - barrier_height) / 2,
            width: (width / 200).max(1),
            height: barrier_height,
        });
        cfg.reservoirs = vec![
            Reservoir { concentration: 0.4, at: 0, width: reserve_width },
            Reservoir { concentration: 0.2, at: width - reserve_width, width: reserve_width },
        ];
        cfg
    }

    /// A point-source excitation scenario: an open, walled box with a single
    /// circular high-concentration disc near `(origin_x, origin_y)`, used to
    /// watch a wavefront propagate in isolation. No reservoirs, no barrier.
    pub fn wave(width: usize, height: usize, origin_x: usize, origin_y: usize, radius: usize, steps: usize) -> Self {
        ScenarioConfig {
            width,
            height,
            steps,
            fill_concentration: 0.0,
            barrier: None,
            reservoirs: Vec::new(),
            wave_source: Some(WaveSource { origin_x, origin_y, radius, concentration: 0.6 }),
            n_threads: num_cpus_fallback(),
        }
    }

    /// Builds the initial grid: top/bottom walls, a uniform background fill,
    /// the barrier rasterised as wall cells, and any point source seeded in.
    /// Reservoirs are not applied here; `SimRunner` drives them every step
    /// via `Injector`.
    pub fn build_grid(&self) -> Grid {
        let mut grid = Grid::new(self.width, self.height);

        for x in 0..self.width {
            grid.set(x, 0, 1 << WALL_BIT);
            grid.set(x, self.height - 1, 1 << WALL_BIT);
        }

        if self.fill_concentration > 0.0 {
            let mut rng = SmallRng::seed_from_u64(0xC0FFEE);
            let _ = Injector.spawn_at_x(&mut rng, &mut grid, self.fill_concentration, 0, self.width);
        }

        if let Some(b) = &self.barrier {
            for y in b.y..(b.y + b.height).min(self.height) {
                for x in b.x..(b.x + b.width).min(self.width) {
                    grid.set(x, y, 1 << WALL_BIT);
                }
            }
        }

        if let Some(src) = &self.wave_source {
            let mut rng = SmallRng::seed_from_u64(0xBEEF);
            let r = src.radius as isize;
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx * dx + dy * dy > r * r {
                        continue;
                    }
                    let x = src.origin_x as isize + dx;
                    let y = src.origin_y as isize + dy;
                    if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
                        continue;
                    }
                    let _ = Injector.spawn_at_x(&mut rng, &mut grid, src.concentration, x as usize, 1);
                }
            }
        }

        grid
    }
}

fn num_cpus_fallback() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn plate_matches_the_reference_parameters() {
        let cfg = ScenarioConfig::plate();
        assert_eq!(cfg.width, 4000);
        assert_eq!(cfg.height, 1000);
        assert_eq!(cfg.steps, 100_000);
        assert_eq!(cfg.reservoirs[0], Reservoir { concentration: 0.4, at: 0, width: 50 });
        assert_eq!(cfg.barrier.unwrap().height, 400);
        assert_eq!(cfg.barrier.unwrap().x, 600);
        assert_eq!(cfg.barrier.unwrap().width, 200);
    }

    #[test]
    fn build_grid_walls_off_top_and_bottom_rows() {
        let cfg = ScenarioConfig::plate_scaled(40, 20, 10);
        let grid = cfg.build_grid();
        for x in 0..40 {
            assert_eq!(grid.get(x, 0), 1 << WALL_BIT);
            assert_eq!(grid.get(x, 19), 1 << WALL_BIT);
        }
    }

    #[test]
    fn build_grid_rasterises_the_barrier() {
        let cfg = ScenarioConfig::plate_scaled(40, 20, 10);
        let grid = cfg.build_grid();
        let b = cfg.barrier.unwrap();
        assert_eq!(grid.get(b.x, b.y + 1), 1 << WALL_BIT);
    }

    #[test]
    fn wave_scenario_seeds_a_disc_with_no_barrier_or_reservoirs() {
        let cfg = ScenarioConfig::wave(30, 30, 15, 15, 4, 10);
        assert!(cfg.barrier.is_none());
        assert!(cfg.reservoirs.is_empty());
        let grid = cfg.build_grid();
        assert_ne!(grid.get(15, 15), 0);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = ScenarioConfig::plate_scaled(20, 10, 5);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ScenarioConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.width, cfg.width);
        assert_eq!(back.reservoirs.len(), cfg.reservoirs.len());
    }
}
