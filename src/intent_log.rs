// Copyright 2025 Cowboy AI, LLC.

//! Transition intent log
//!
//! A transfer transition with a capacity side effect performs two writes
//! with no surrounding database transaction: the transfer record and the
//! partner capacity record. The intent log brackets the pair so a crash
//! between them is recoverable: the engine records the intended capacity
//! action before touching anything, applies both writes, then marks the
//! intent complete (or aborted, after compensating). Recovery tooling reads
//! [`IntentLog::in_flight`] to find brackets that never closed and reconcile
//! the capacity counts they name.

use crate::entity::{PartnerId, TransferId};
use crate::errors::{DomainError, DomainResult};
use crate::transfer::TransferDirection;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// The capacity side effect an intent brackets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityAction {
    /// One intake slot is being reserved
    Reserve,
    /// One intake slot is being released
    Release,
}

/// Outcome state of a recorded intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentState {
    /// Recorded but not yet closed; a crash leaves intents here
    InFlight,
    /// Both writes landed
    Completed,
    /// The transition failed and the side effect was compensated
    Aborted,
}

/// One bracketed capacity side effect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionIntent {
    /// Unique identifier of this intent
    pub intent_id: Uuid,
    /// The transfer whose transition drives the side effect
    pub transfer_id: TransferId,
    /// The partner whose capacity is touched
    pub partner_id: PartnerId,
    /// Reserve or release
    pub action: CapacityAction,
    /// Direction of the underlying transfer
    pub direction: TransferDirection,
    /// Outcome state
    pub state: IntentState,
    /// When the intent was recorded
    pub recorded_at: DateTime<Utc>,
}

impl TransitionIntent {
    /// Record a new in-flight intent
    pub fn new(
        transfer_id: TransferId,
        partner_id: PartnerId,
        action: CapacityAction,
        direction: TransferDirection,
    ) -> Self {
        Self {
            intent_id: Uuid::new_v4(),
            transfer_id,
            partner_id,
            action,
            direction,
            state: IntentState::InFlight,
            recorded_at: Utc::now(),
        }
    }
}

/// Port for durable intent bookkeeping
#[async_trait]
pub trait IntentLog: Send + Sync {
    /// Record an intent before any write is applied
    async fn begin(&self, intent: TransitionIntent) -> DomainResult<()>;

    /// Close an intent after both writes landed
    async fn complete(&self, intent_id: Uuid) -> DomainResult<()>;

    /// Close an intent whose transition failed and was compensated
    async fn abort(&self, intent_id: Uuid) -> DomainResult<()>;

    /// Intents that were begun but never closed
    async fn in_flight(&self) -> DomainResult<Vec<TransitionIntent>>;
}

/// In-memory intent log
#[derive(Clone, Default)]
pub struct InMemoryIntentLog {
    intents: Arc<RwLock<HashMap<Uuid, TransitionIntent>>>,
}

impl InMemoryIntentLog {
    /// Create an empty intent log
    pub fn new() -> Self {
        Self::default()
    }
}

impl InMemoryIntentLog {
    async fn close(&self, intent_id: Uuid, state: IntentState) -> DomainResult<()> {
        let mut intents = self.intents.write().await;
        let intent = intents.get_mut(&intent_id).ok_or_else(|| {
            DomainError::InvalidOperation {
                reason: format!("unknown intent {intent_id}"),
            }
        })?;
        intent.state = state;
        Ok(())
    }
}

#[async_trait]
impl IntentLog for InMemoryIntentLog {
    async fn begin(&self, intent: TransitionIntent) -> DomainResult<()> {
        self.intents.write().await.insert(intent.intent_id, intent);
        Ok(())
    }

    async fn complete(&self, intent_id: Uuid) -> DomainResult<()> {
        self.close(intent_id, IntentState::Completed).await
    }

    async fn abort(&self, intent_id: Uuid) -> DomainResult<()> {
        self.close(intent_id, IntentState::Aborted).await
    }

    async fn in_flight(&self) -> DomainResult<Vec<TransitionIntent>> {
        Ok(self
            .intents
            .read()
            .await
            .values()
            .filter(|i| i.state == IntentState::InFlight)
            .cloned()
            .collect())
    }
}
