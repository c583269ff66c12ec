// Copyright 2025 Cowboy AI, LLC.

//! State machine framework for workflow aggregates
//!
//! Aggregates whose lifecycle is a closed state machine implement
//! [`StateTransitions`] with a single match over the current state; that
//! match is the one source of truth for which edges exist. Every mutation
//! goes through [`ensure_transition`], so an illegal edge can never be
//! applied, and terminal states reject all exits.

use crate::errors::{DomainError, DomainResult};
use std::fmt::Debug;

/// Trait for types that can be used as states in a state machine
pub trait State: Debug + Clone + PartialEq + Eq + Send + Sync {
    /// Get the name of this state for logging/debugging
    fn name(&self) -> &'static str;

    /// Check if this is a terminal state
    fn is_terminal(&self) -> bool {
        false
    }
}

/// State-dependent transition table
pub trait StateTransitions: State {
    /// Get all valid target states from this state
    fn valid_transitions(&self) -> Vec<Self>;

    /// Check if a transition to the target state is valid
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }
}

/// Validate a transition, returning `InvalidTransition` for illegal edges
///
/// Terminal states have no outgoing edges, so any transition attempted from
/// one fails here regardless of the target.
pub fn ensure_transition<S: StateTransitions>(from: &S, to: &S) -> DomainResult<()> {
    if from.is_terminal() || !from.can_transition_to(to) {
        return Err(DomainError::InvalidTransition {
            from: from.name().to_string(),
            to: to.name().to_string(),
        });
    }
    Ok(())
}
