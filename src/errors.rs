// Copyright 2025 Cowboy AI, LLC.

//! Error types for transfer domain operations

use thiserror::Error;

/// Errors that can occur in transfer domain operations
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// Transfer not found
    #[error("Transfer not found: {0}")]
    TransferNotFound(String),

    /// Partner not found
    #[error("Partner not found: {0}")]
    PartnerNotFound(String),

    /// Animal not found
    #[error("Animal not found: {0}")]
    AnimalNotFound(String),

    /// Invalid state transition
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: String,
        /// Attempted target state
        to: String,
    },

    /// Partner intake capacity is exhausted
    #[error("Partner {partner_id} is at capacity ({current}/{max})")]
    CapacityExceeded {
        /// The partner whose capacity is exhausted
        partner_id: String,
        /// Current occupancy
        current: u32,
        /// Maximum intake capacity
        max: u32,
    },

    /// Partner is not accepting intakes
    #[error("Partner {0} is not accepting intakes")]
    NotAccepting(String),

    /// Invalid operation
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Reason why the operation is invalid
        reason: String,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Concurrency conflict
    #[error("Concurrency conflict: expected version {expected}, but found {actual}")]
    ConcurrencyConflict {
        /// Expected version
        expected: u64,
        /// Actual version
        actual: u64,
    },

    /// External collaborator error
    #[error("External service error: {service} - {message}")]
    ExternalServiceError {
        /// Name of the external service
        service: String,
        /// Error message from the service
        message: String,
    },
}

/// Result type for transfer domain operations
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::ValidationError(msg.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::TransferNotFound(_)
                | DomainError::PartnerNotFound(_)
                | DomainError::AnimalNotFound(_)
        )
    }

    /// Check if this is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            DomainError::ValidationError(_) | DomainError::InvalidOperation { .. }
        )
    }

    /// Check if this is a concurrency error
    ///
    /// Concurrency conflicts are the one error kind where retrying the same
    /// operation is expected to succeed once contention clears.
    pub fn is_concurrency_error(&self) -> bool {
        matches!(self, DomainError::ConcurrencyConflict { .. })
    }

    /// Check if this is a capacity rejection
    pub fn is_capacity_error(&self) -> bool {
        matches!(
            self,
            DomainError::CapacityExceeded { .. } | DomainError::NotAccepting(_)
        )
    }
}
