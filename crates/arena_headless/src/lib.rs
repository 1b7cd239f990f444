//! Headless arena runner for AI soak testing and CI verification.
//!
//! This crate drives [`arena_core`] without graphics:
//!
//! - **Soak testing**: a scripted autopilot plays through levels so the
//!   enemy AI, collision recovery and level flow run for hours unattended
//! - **CI verification**: the same seed replays to the same state hash
//! - **Level validation**: authored level sets are checked before use
//!
//! Results are JSON on stdout or in a file; logs go to stderr.
//!
//! # Example
//!
//! ```bash
//! # Play one seed and print a summary
//! cargo run -p arena_headless -- run --seed 7
//!
//! # Run 200 seeds in parallel
//! cargo run -p arena_headless -- batch --count 200 --output results/batch.json
//!
//! # Verify determinism
//! cargo run -p arena_headless -- verify --seed 12345 --runs 5
//! ```

pub mod autopilot;
pub mod batch;
pub mod levels;
pub mod metrics;
pub mod runner;

pub use autopilot::autopilot_input;
pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, VerifyReport};
pub use levels::{load_config, load_level_set, validate_level_set, LevelReport, LevelSetError};
pub use metrics::{BatchSummary, EventTally, Outcome, RunSummary};
pub use runner::{run_game, HeadlessRunner, RunConfig, RunError};
