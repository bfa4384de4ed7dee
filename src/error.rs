//! Error types for the stat engine.
//!
//! Construction errors (blank ids, non-finite values, bad configuration)
//! are programming errors and are reported at the construction site.
//! Listener and binding errors travel back out of the mutation that
//! triggered the dispatch.

use crate::stat_id::StatId;
use thiserror::Error;

/// Errors produced by the stat engine.
///
/// # Examples
///
/// ```rust
/// use statcore::{StatError, StatId};
///
/// let err = StatId::new("").unwrap_err();
/// assert_eq!(err, StatError::BlankIdentifier { kind: "stat" });
/// println!("{}", err); // "Blank stat identifier"
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatError {
    /// An identifier was empty or whitespace only.
    #[error("Blank {kind} identifier")]
    BlankIdentifier { kind: &'static str },

    /// A source id contained an empty path segment.
    #[error("Invalid source id {0:?}: empty path segment")]
    InvalidSourceId(String),

    /// A base or modifier value was NaN or infinite.
    #[error("Non-finite value {value} for stat {stat}")]
    NonFiniteValue { stat: StatId, value: f64 },

    /// Registry configuration could not be loaded.
    #[error("Invalid stat configuration: {0}")]
    Config(String),

    /// A change listener failed while handling a change.
    #[error("Listener failed: {0}")]
    Listener(String),

    /// A stat binding failed while applying a change.
    #[error("Binding for stat {stat} failed: {message}")]
    Binding { stat: StatId, message: String },
}

impl From<serde_json::Error> for StatError {
    fn from(err: serde_json::Error) -> Self {
        StatError::Config(err.to_string())
    }
}
