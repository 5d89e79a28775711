use thiserror::Error;

/// Errors produced while training, evaluating, or persisting a Q-table
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode Q-table snapshot: {0}")]
    Decode(#[from] bincode::Error),

    #[error("Corrupt Q-table snapshot: {0}")]
    CorruptSnapshot(String),

    /// The Q-table's shape does not match the environment it is used with
    #[error("Q-table shape {table:?} does not match environment shape {env:?}")]
    ShapeMismatch {
        table: (usize, usize),
        env: (usize, usize),
    },

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// `step` was called after the episode terminated or was truncated, without a `reset`
    #[error("Episode is over, reset the environment before stepping")]
    EpisodeOver,

    #[error("Environment error: {0}")]
    Environment(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an arbitrary error raised by an [`Environment`](crate::env::Environment) implementation
    pub fn environment<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Environment(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
