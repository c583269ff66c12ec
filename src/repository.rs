// Copyright 2025 Cowboy AI, LLC.

//! Transfer record storage port
//!
//! The workflow engine treats storage as transactional-enough: each
//! transition reads the record immediately before validating and writes it
//! immediately after applying, within the same logical operation. The write
//! is guarded by the aggregate version, so two transitions racing on the same
//! transfer cannot both land; the loser gets `ConcurrencyConflict`.

use crate::entity::{AggregateRoot, AnimalId, PartnerId, TransferId};
use crate::errors::{DomainError, DomainResult};
use crate::transfer::{Transfer, TransferStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Filter for listing transfer records
#[derive(Debug, Clone, Default)]
pub struct TransferFilter {
    /// Restrict to one animal
    pub animal_id: Option<AnimalId>,
    /// Restrict to one partner organization
    pub partner_id: Option<PartnerId>,
    /// Restrict to one lifecycle status
    pub status: Option<TransferStatus>,
    /// Lower bound (inclusive) on the scheduled date
    pub scheduled_from: Option<DateTime<Utc>>,
    /// Upper bound (inclusive) on the scheduled date
    pub scheduled_to: Option<DateTime<Utc>>,
}

impl TransferFilter {
    /// An empty filter matching every record
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one animal
    pub fn with_animal(mut self, animal_id: AnimalId) -> Self {
        self.animal_id = Some(animal_id);
        self
    }

    /// Restrict to one partner organization
    pub fn with_partner(mut self, partner_id: PartnerId) -> Self {
        self.partner_id = Some(partner_id);
        self
    }

    /// Restrict to one lifecycle status
    pub fn with_status(mut self, status: TransferStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to scheduled dates within `[from, to]`
    ///
    /// Records with no scheduled date never match a bounded filter.
    pub fn scheduled_between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.scheduled_from = Some(from);
        self.scheduled_to = Some(to);
        self
    }

    /// Whether a record satisfies every bound in this filter
    pub fn matches(&self, transfer: &Transfer) -> bool {
        if self.animal_id.is_some_and(|id| id != transfer.animal_id()) {
            return false;
        }
        if self.partner_id.is_some_and(|id| id != transfer.partner_id()) {
            return false;
        }
        if self.status.is_some_and(|s| s != transfer.status()) {
            return false;
        }
        if self.scheduled_from.is_some() || self.scheduled_to.is_some() {
            let Some(scheduled) = transfer.scheduled_date() else {
                return false;
            };
            if self.scheduled_from.is_some_and(|from| scheduled < from) {
                return false;
            }
            if self.scheduled_to.is_some_and(|to| scheduled > to) {
                return false;
            }
        }
        true
    }
}

/// Port for transfer record persistence
#[async_trait]
pub trait TransferRepository: Send + Sync {
    /// Persist a newly created transfer
    async fn create(&self, transfer: Transfer) -> DomainResult<()>;

    /// Load a transfer by ID
    async fn find_by_id(&self, id: TransferId) -> DomainResult<Transfer>;

    /// Persist a mutated transfer, guarded by the version read before mutation
    ///
    /// Fails with `ConcurrencyConflict` when the stored version no longer
    /// matches `expected_version`; the caller re-reads and re-validates.
    async fn update(&self, transfer: Transfer, expected_version: u64) -> DomainResult<()>;

    /// List transfers matching the filter, oldest first
    async fn list(&self, filter: &TransferFilter) -> DomainResult<Vec<Transfer>>;
}

/// In-memory transfer repository
#[derive(Clone, Default)]
pub struct InMemoryTransferRepository {
    storage: Arc<RwLock<HashMap<TransferId, Transfer>>>,
}

impl InMemoryTransferRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferRepository for InMemoryTransferRepository {
    async fn create(&self, transfer: Transfer) -> DomainResult<()> {
        let mut storage = self.storage.write().await;
        if storage.contains_key(&transfer.id()) {
            return Err(DomainError::InvalidOperation {
                reason: format!("transfer {} already exists", transfer.id()),
            });
        }
        storage.insert(transfer.id(), transfer);
        Ok(())
    }

    async fn find_by_id(&self, id: TransferId) -> DomainResult<Transfer> {
        self.storage
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::TransferNotFound(id.to_string()))
    }

    async fn update(&self, transfer: Transfer, expected_version: u64) -> DomainResult<()> {
        let mut storage = self.storage.write().await;
        let stored = storage
            .get(&transfer.id())
            .ok_or_else(|| DomainError::TransferNotFound(transfer.id().to_string()))?;
        if stored.version() != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                expected: expected_version,
                actual: stored.version(),
            });
        }
        storage.insert(transfer.id(), transfer);
        Ok(())
    }

    async fn list(&self, filter: &TransferFilter) -> DomainResult<Vec<Transfer>> {
        let storage = self.storage.read().await;
        let mut results: Vec<Transfer> = storage
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        results.sort_by_key(|t| t.created_at());
        Ok(results)
    }
}
