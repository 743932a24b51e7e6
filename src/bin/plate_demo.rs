//! Headless demo runner: drives a scaled-down `plate` scenario to completion
//! and logs density/velocity summaries as it goes.

use std::time::Duration;

use fhp_lgca::{ScenarioConfig, SimRunner};

fn main() {
    env_logger::init();

    let scenario = ScenarioConfig::plate_scaled(400, 100, 2_000);
    log::info!(
        "starting plate demo: {}x{} grid, {} steps, {} threads",
        scenario.width,
        scenario.height,
        scenario.steps,
        scenario.n_threads
    );

    let mut runner = match SimRunner::new(scenario) {
        Ok(runner) => runner,
        Err(err) => {
            log::error!("failed to build initial grid: {}", err);
            std::process::exit(1);
        }
    };

    runner.start();
    while runner.is_running() {
        std::thread::sleep(Duration::from_millis(250));
        let density = runner.density();
        let velocity = runner.velocity_magnitude();
        let avg_density = density.iter().sum::<f64>() / density.len().max(1) as f64;
        let max_velocity = velocity.iter().cloned().fold(0.0f64, f64::max);
        log::info!("avg density = {:.4}, max |v| = {:.4}", avg_density, max_velocity);
    }
    runner.stop();
    log::info!("plate demo finished");
}
