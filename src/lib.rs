//! FHP hexagonal lattice-gas cellular automaton fluid solver.
//!
//! `Grid` holds the packed-byte lattice; `Streamer`, `Collider`, `Injector`,
//! and `Reducer` are the four per-step operators, each parallelised row-wise
//! through [`fanout::parallel_rows_mut`]. `SimRunner` drives a `ScenarioConfig`
//! to completion on a background thread and publishes coarse-grained
//! snapshots for callers to poll.

#[macro_use]
extern crate lazy_static;

pub mod collider;
pub mod collision;
pub mod error;
pub mod fanout;
pub mod grid;
pub mod injector;
pub mod reducer;
pub mod scenario;
pub mod sim_runner;
pub mod streamer;

pub use collider::Collider;
pub use error::SimError;
pub use grid::{Direction, Grid};
pub use injector::Injector;
pub use reducer::Reducer;
pub use scenario::{Barrier, Reservoir, ScenarioConfig, WaveSource};
pub use sim_runner::{FieldSnapshot, SimRunner};
pub use streamer::Streamer;
