//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! A seeded run must replay bit-for-bit. Sources of non-determinism include:
//!
//! - **Floating-point math**: positions, speeds and timers use
//!   [`arena_core::math::Fixed`]; floats only appear in config ratios that
//!   are converted once.
//!
//! - **HashMap iteration order**: terrain lives in ordered maps and units in
//!   vectors, so iteration order never depends on a hasher seed.
//!
//! - **Randomness**: every draw comes from a `SmallRng` derived from the
//!   simulation seed and tick number.
//!
//! - **Wall-clock time**: callers supply the elapsed frame time; tests use a
//!   fixed [`TimeScale`].

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use arena_core::components::{ControlInput, Direction};
use arena_core::simulation::Simulation;
use arena_core::timer::TimeScale;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Scripted input for tick `tick`: a slow clockwise drive with fire held
/// every other tick.
#[must_use]
pub fn scripted_input(tick: u64) -> ControlInput {
    let direction = Direction::CLOCKWISE[((tick / 45) % 4) as usize];
    let input = ControlInput::toward(direction);
    if tick % 2 == 0 {
        input.firing()
    } else {
        input
    }
}

/// Advance `sim` by one scripted tick at unit scale.
pub fn step_scripted(sim: &mut Simulation) {
    let input = scripted_input(sim.get_tick());
    sim.tick_scaled(input, TimeScale::ONE);
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a scripted simulation twice and compare final state hashes.
///
/// # Example
///
/// ```
/// use arena_core::prelude::*;
/// use arena_test_utils::determinism::verify_simulation_determinism;
///
/// let ok = verify_simulation_determinism(
///     || Simulation::new(SimConfig::default(), LevelSet::builtin(), 9),
///     60,
/// );
/// assert!(ok);
/// ```
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let result = verify_determinism(2, num_ticks, &setup_fn, step_scripted, |sim| {
        sim.state_hash()
    });
    result.is_deterministic
}

/// Run N scripted simulations on scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> Vec<u64>
where
    F: Fn() -> Simulation + Sync,
{
    thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        step_scripted(&mut sim);
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        step_scripted(&mut sim1);
        step_scripted(&mut sim2);

        if sim1.state_hash() != sim2.state_hash() {
            tracing::warn!(tick, "Simulations diverged");
            return Some(tick);
        }
    }

    None
}

/// Verify that a snapshot taken mid-run resumes to the same final state.
pub fn verify_snapshot_determinism<F>(setup_fn: F, split: u64, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut reference = setup_fn();
    for _ in 0..num_ticks {
        step_scripted(&mut reference);
    }

    let mut sim = setup_fn();
    for _ in 0..split {
        step_scripted(&mut sim);
    }
    let Ok(bytes) = sim.snapshot() else {
        return false;
    };

    let mut resumed = setup_fn();
    if resumed.restore(&bytes).is_err() {
        return false;
    }
    for _ in split..num_ticks {
        step_scripted(&mut resumed);
    }

    resumed.state_hash() == reference.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
