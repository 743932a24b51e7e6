//! The background supervisor that drives a scenario to completion on its own
//! thread and publishes periodic coarse-grained snapshots for readers to
//! poll.
//!
//! Mirrors the teacher's `SimulationController` step-loop shape (own thread,
//! cooperative stop flag, externally-readable status) but the published
//! state here is plain numeric fields behind a mutex rather than GPU
//! resources.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use cgmath::Vector2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::collider::Collider;
use crate::error::SimError;
use crate::grid::Grid;
use crate::injector::Injector;
use crate::reducer::Reducer;
use crate::scenario::ScenarioConfig;
use crate::streamer::Streamer;

/// A published coarse-grained snapshot: one `(density, |velocity|)` sample
/// per reducer block, plus the streamline traces from the last tracer pass.
#[derive(Debug, Clone, Default)]
pub struct FieldSnapshot {
    pub blocks_wide: usize,
    pub blocks_high: usize,
    pub density: Vec<f64>,
    pub velocity_magnitude: Vec<f64>,
    pub streamlines: Vec<Vec<(f64, f64)>>,
}

struct Shared {
    field: Mutex<FieldSnapshot>,
    stop: AtomicBool,
}

const REDUCE_CELL: usize = 10;
const STREAMLINE_TRACERS_X: usize = 30;
const STREAMLINE_TRACERS_Y: usize = 100;
const STREAMLINE_STEPS: usize = 500;
const STREAMLINE_STOP_EPS: f64 = 0.000_001;
const BURN_IN_STEP: usize = 30_000;

/// Owns the background simulation thread. `start()` is idempotent: calling it
/// while a run is already in progress stops and joins that run first, then
/// starts a fresh one from the scenario's initial conditions. Dropping
/// without calling `stop()` leaves the worker running detached to completion.
pub struct SimRunner {
    scenario: ScenarioConfig,
    grid: Option<Grid>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl SimRunner {
    /// Builds the initial grid from `scenario` and takes one priming sample,
    /// so an immediate `density()`/`velocity_magnitude()` call before the
    /// background thread produces its first real sample returns the initial
    /// field rather than all-zero.
    pub fn new(scenario: ScenarioConfig) -> Result<Self, SimError> {
        let grid = scenario.build_grid();
        let reducer = Reducer::new(scenario.n_threads.max(1));
        let cell = reduce_cell_size(&scenario);
        let primed = sample_field(&reducer, &grid, cell, scenario.width, scenario.height)?;
        let shared = Arc::new(Shared { field: Mutex::new(primed), stop: AtomicBool::new(false) });
        Ok(SimRunner { scenario, grid: Some(grid), shared, handle: None })
    }

    /// Spawns the background worker thread. Idempotent: if a run is already
    /// in progress it is stopped and joined first, then a fresh run starts
    /// from the scenario's initial conditions. Never fails.
    pub fn start(&mut self) {
        self.stop();
        let grid = self.grid.take().unwrap_or_else(|| self.scenario.build_grid());
        let scenario = self.scenario.clone();
        let shared = Arc::clone(&self.shared);
        shared.stop.store(false, Ordering::SeqCst);

        let handle = std::thread::Builder::new()
            .name("sim-runner".into())
            .spawn(move || {
                if let Err(err) = run_loop(&scenario, grid, &shared) {
                    log::error!("simulation worker stopped: {}", err);
                }
            })
            .expect("failed to spawn simulation worker thread");
        self.handle = Some(handle);
    }

    /// Requests a cooperative stop and joins the worker thread, if running.
    pub fn stop(&mut self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    pub fn density(&self) -> Vec<f64> {
        self.shared.field.lock().expect("field mutex poisoned").density.clone()
    }

    pub fn velocity_magnitude(&self) -> Vec<f64> {
        self.shared.field.lock().expect("field mutex poisoned").velocity_magnitude.clone()
    }

    pub fn field_snapshot(&self) -> FieldSnapshot {
        self.shared.field.lock().expect("field mutex poisoned").clone()
    }
}

fn run_loop(scenario: &ScenarioConfig, mut front: Grid, shared: &Shared) -> Result<(), SimError> {
    let n_threads = scenario.n_threads.max(1);
    let streamer = Streamer::new(n_threads);
    let collider = Collider::new(n_threads);
    let injector = Injector;
    let reducer = Reducer::new(n_threads);
    let cell = reduce_cell_size(scenario);

    let mut back = Grid::new(scenario.width, scenario.height);
    let mut root_rng = SmallRng::seed_from_u64(seed_for_scenario(scenario));

    let blocks_w = scenario.width / cell.0;
    let blocks_h = scenario.height / cell.1;
    let mut density_acc = vec![0.0f64; blocks_w * blocks_h];
    let mut velmag_acc = vec![0.0f64; blocks_w * blocks_h];
    let mut mean_count = 0usize;

    for i in 0..scenario.steps {
        if shared.stop.load(Ordering::Relaxed) {
            break;
        }

        streamer.step(&front, &mut back)?;
        front.swap(&mut back);

        let collide_seed: u64 = root_rng.gen();
        collider.step(&mut front, collide_seed)?;

        for reservoir in &scenario.reservoirs {
            injector.spawn_at_x(&mut root_rng, &mut front, reservoir.concentration, reservoir.at, reservoir.width)?;
        }

        let phase = if i < BURN_IN_STEP { i % 200 } else { i % 100 };
        if phase <= 9 {
            let blocks = reducer.density_velocity_magnitude(&front, cell.0, cell.1)?;
            let density: Vec<f64> = blocks.iter().map(|&(d, _)| d).collect();
            let velmag: Vec<f64> = blocks.iter().map(|&(_, v)| v).collect();
            accumulate_mean(&mut density_acc, mean_count, &density);
            accumulate_mean(&mut velmag_acc, mean_count, &velmag);
            mean_count += 1;
        }

        if phase == 10 {
            let velocities = reducer.velocity_and_density(&front, cell.0, cell.1)?;
            let streamlines = trace_streamlines(&velocities, blocks_w, blocks_h, cell, scenario.width, scenario.height);

            let mut field = shared.field.lock().expect("field mutex poisoned");
            field.blocks_wide = blocks_w;
            field.blocks_high = blocks_h;
            field.density = density_acc.clone();
            field.velocity_magnitude = velmag_acc.clone();
            field.streamlines = streamlines;
            drop(field);

            density_acc.iter_mut().for_each(|x| *x = 0.0);
            velmag_acc.iter_mut().for_each(|x| *x = 0.0);
            mean_count = 0;
        }
    }

    Ok(())
}

/// Running-mean update: `m_{k+1} = (m_k * k + x_{k+1}) / (k + 1)`.
fn accumulate_mean(acc: &mut [f64], k: usize, sample: &[f64]) {
    let k = k as f64;
    for (a, &x) in acc.iter_mut().zip(sample.iter()) {
        *a = (*a * k + x) / (k + 1.0);
    }
}

fn sample_field(
    reducer: &Reducer,
    grid: &Grid,
    cell: (usize, usize),
    width: usize,
    height: usize,
) -> Result<FieldSnapshot, SimError> {
    let blocks = reducer.density_velocity_magnitude(grid, cell.0, cell.1)?;
    Ok(FieldSnapshot {
        blocks_wide: width / cell.0,
        blocks_high: height / cell.1,
        density: blocks.iter().map(|&(d, _)| d).collect(),
        velocity_magnitude: blocks.iter().map(|&(_, v)| v).collect(),
        streamlines: Vec::new(),
    })
}

/// Largest block size at most [`REDUCE_CELL`] that evenly divides both grid
/// dimensions; falls back to `1` (which always divides) for odd sizes.
fn reduce_cell_size(scenario: &ScenarioConfig) -> (usize, usize) {
    let mut c = REDUCE_CELL.min(scenario.width).min(scenario.height).max(1);
    while c > 1 && (scenario.width % c != 0 || scenario.height % c != 0) {
        c -= 1;
    }
    (c, c)
}

fn seed_for_scenario(scenario: &ScenarioConfig) -> u64 {
    (scenario.width as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (scenario.height as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9)
        ^ scenario.steps as u64
}

/// Traces `STREAMLINE_TRACERS_X x STREAMLINE_TRACERS_Y` particles through a
/// frozen velocity field, clamping per-step displacement to unit length and
/// stopping a tracer once it enters a near-zero velocity region.
fn trace_streamlines(
    velocities: &[(Vector2<f64>, f64)],
    blocks_w: usize,
    blocks_h: usize,
    cell: (usize, usize),
    width: usize,
    height: usize,
) -> Vec<Vec<(f64, f64)>> {
    let mut paths = Vec::with_capacity(STREAMLINE_TRACERS_X * STREAMLINE_TRACERS_Y);

    for ty in 0..STREAMLINE_TRACERS_Y {
        for tx in 0..STREAMLINE_TRACERS_X {
            let mut x = (tx as f64 + 0.5) * width as f64 / STREAMLINE_TRACERS_X as f64;
            let mut y = (ty as f64 + 0.5) * height as f64 / STREAMLINE_TRACERS_Y as f64;
            let mut path = vec![(x, y)];

            for _ in 0..STREAMLINE_STEPS {
                let bx = ((x as usize) / cell.0).min(blocks_w.saturating_sub(1));
                let by = ((y as usize) / cell.1).min(blocks_h.saturating_sub(1));
                let (v, _) = velocities[by * blocks_w + bx];
                let m = (v.x * v.x + v.y * v.y).sqrt();
                if m < STREAMLINE_STOP_EPS {
                    break;
                }
                let scale = m.min(1.0) / m;
                x += v.x * scale;
                y += v.y * scale;
                if x < 0.0 || y < 0.0 || x >= width as f64 || y >= height as f64 {
                    break;
                }
                path.push((x, y));
            }

            paths.push(path);
        }
    }

    paths
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accumulate_mean_matches_running_average() {
        let mut acc = vec![0.0];
        accumulate_mean(&mut acc, 0, &[10.0]);
        accumulate_mean(&mut acc, 1, &[20.0]);
        accumulate_mean(&mut acc, 2, &[30.0]);
        assert!((acc[0] - 20.0).abs() < 1e-12);
    }

    #[test]
    fn new_primes_a_nonzero_initial_snapshot() {
        let scenario = ScenarioConfig::plate_scaled(20, 10, 5);
        let runner = SimRunner::new(scenario).unwrap();
        let snapshot = runner.field_snapshot();
        assert_eq!(snapshot.density.len(), snapshot.blocks_wide * snapshot.blocks_high);
        assert!(snapshot.density.iter().any(|&d| d > 0.0));
    }

    #[test]
    fn start_and_stop_completes_a_short_run() {
        let scenario = ScenarioConfig::plate_scaled(20, 10, 30);
        let mut runner = SimRunner::new(scenario).unwrap();
        runner.start();
        // Let the short run finish on its own; stop() is idempotent even
        // after natural completion since the worker already exited.
        std::thread::sleep(std::time::Duration::from_millis(200));
        runner.stop();
        assert!(!runner.is_running());
    }

    #[test]
    fn start_is_idempotent_and_restarts_from_scratch() {
        let scenario = ScenarioConfig::plate_scaled(20, 10, 5_000);
        let mut runner = SimRunner::new(scenario).unwrap();
        runner.start();
        assert!(runner.is_running());
        runner.start(); // stops the first run, joins it, and starts a fresh one
        assert!(runner.is_running());
        runner.stop();
        assert!(!runner.is_running());
    }

    #[test]
    fn reduce_cell_size_always_divides_both_dimensions() {
        let scenario = ScenarioConfig::plate_scaled(37, 23, 1);
        let (cx, cy) = reduce_cell_size(&scenario);
        assert_eq!(scenario.width % cx, 0);
        assert_eq!(scenario.height % cy, 0);
    }
}
