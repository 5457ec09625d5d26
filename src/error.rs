//! Reasons an optional pipeline stage is downgraded instead of run.

use thiserror::Error;

/// A missing prerequisite for an optional stage.
///
/// These never abort a run: the orchestrator records the message as the
/// stage's skip reason and moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("credential contains characters that cannot be sent in an HTTP header")]
    InvalidCredential,

    #[error("GIS host runtime unavailable: {0}")]
    HostUnavailable(String),

    #[error("{0} stage is not configured")]
    NotConfigured(&'static str),
}
