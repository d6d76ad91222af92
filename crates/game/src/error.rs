//! Error types for the simulation crate.

use physics::PhysicsError;
use thiserror::Error;

/// Errors raised by the simulation. Only setup failures are fatal; everything
/// a running session can hit is contained and surfaces as a value or a log.
#[derive(Debug, Error)]
pub enum SimError {
    /// An operation was attempted in a state that does not allow it, such as
    /// firing while dead.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("physics setup failed: {0}")]
    Physics(#[from] PhysicsError),

    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from parsing or validating a [`crate::GameConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse RON: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("failed to serialize RON: {0}")]
    Serialize(#[from] ron::Error),

    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
