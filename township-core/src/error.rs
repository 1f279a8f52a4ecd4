//! Error types for the township core library.
//!
//! Soft unavailability (no architect, no lawyer, no vacant housing) is not an
//! error: those paths resolve to a fallback inside the engine. What remains
//! here are unknown handles, logic errors, and configuration failures.

use thiserror::Error;

use crate::types::{
    AgentId, CompanyId, DwellingId, EventId, LotId, MarriageId, OccupationId, RelationshipId,
};

/// Top-level error type for all township operations.
#[derive(Error, Debug)]
pub enum TownError {
    /// No agent is registered under this handle.
    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    /// No occupation is registered under this handle.
    #[error("Occupation not found: {0}")]
    OccupationNotFound(OccupationId),

    /// No company is registered under this handle.
    #[error("Company not found: {0}")]
    CompanyNotFound(CompanyId),

    /// No dwelling is registered under this handle.
    #[error("Dwelling not found: {0}")]
    DwellingNotFound(DwellingId),

    /// No lot is registered under this handle.
    #[error("Lot not found: {0}")]
    LotNotFound(LotId),

    /// No event is registered under this handle.
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    /// No relationship record is registered under this handle.
    #[error("Relationship not found: {0}")]
    RelationshipNotFound(RelationshipId),

    /// No marriage record is registered under this handle.
    #[error("Marriage not found: {0}")]
    MarriageNotFound(MarriageId),

    /// A building site was required but the town has no lot that could
    /// possibly host it. This is a world-generation error, not a soft miss.
    #[error("No lot available: {purpose}")]
    NoLotAvailable {
        /// What the lot was needed for.
        purpose: String,
    },

    /// An operation was attempted on entities in a state that forbids it.
    #[error("Invalid state for {operation}: {reason}")]
    InvalidState {
        /// The operation that was rejected.
        operation: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TownError {
    /// Shorthand for an [`TownError::InvalidState`] error.
    pub(crate) fn invalid(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            operation,
            reason: reason.into(),
        }
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, TownError>;
