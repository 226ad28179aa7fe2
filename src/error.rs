//! Error types shared by the core and the terminal front end

use thiserror::Error;

/// Everything that can go wrong while setting up or running a session.
///
/// Runtime faults in the signal path (out-of-range samples, clock jitter) are
/// absorbed by the conditioner and never surface here.
#[derive(Debug, Error)]
pub enum Error {
    /// Filter parameter that must be strictly positive was not
    #[error("filter parameter `{name}` must be > 0 (got {value})")]
    InvalidFilterParameter { name: &'static str, value: f64 },

    /// Generic configuration problem
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A sequence definition with no presses
    #[error("sequence `{0}` is empty")]
    EmptySequence(String),

    /// A sequence refers to a key outside the active hand group
    #[error("sequence `{id}` uses key {key} but only {active} keys are active")]
    KeyOutOfRange { id: String, key: usize, active: usize },

    /// Presentation order names a sequence the catalog does not have
    #[error("unknown sequence id `{0}`")]
    UnknownSequence(String),

    /// Refusing to overwrite an existing subject's logs
    #[error("log directory already exists: {0}")]
    SubjectExists(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
