//! Level generation and solving.
//!
//! Both subsystems are search loops over the same move-resolution engine
//! the game plays with: the generator simulates backwards and re-validates
//! every step forwards; the solver walks the move graph depth-first.
//! Neither runs concurrently with anything, but both can take a while, so
//! each polls a [`CancelFlag`] between steps.

pub mod generator;
pub mod solver;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub use generator::{GeneratorOptions, GeneratorStats, generate_level};
pub use solver::{SolverMove, solve_puzzle};

/// Cooperative cancellation for the long-running searches: a shared flag
/// polled between search steps. Cloning shares the flag.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
