//! Tabular Q-learning against discrete environments.
//!
//! A [`QTableAgent`](algo::tabular::q_table::QTableAgent) learns a dense [`QTable`](ds::QTable) by
//! repeatedly playing episodes of an [`Environment`](env::Environment), choosing actions with an
//! [`EpsilonGreedy`](exploration::EpsilonGreedy) policy driven by a caller-supplied random source.
//! Exploration and learning rate are annealed between episodes, and the outcome of every episode is
//! kept in a [`RewardHistory`](metrics::RewardHistory) for reporting.

/// Implemented RL algorithms
pub mod algo;

/// Data structures
pub mod ds;

/// Environment
pub mod env;

/// Error type
pub mod error;

/// Exploration policies
pub mod exploration;

/// Episode outcome tracking
pub mod metrics;

mod util;

pub use error::{Error, Result};
