// Copyright 2025 Cowboy AI, LLC.

//! Partner intake capacity tracking
//!
//! Capacity is tracked on the partner's side. An outbound transfer (shelter
//! to partner) consumes partner capacity at approval and releases it if the
//! transfer is cancelled after approval. An inbound transfer (partner to
//! shelter) never reserves; it releases the partner's held slot when the
//! transfer completes and the animal has left their care.
//!
//! The tracker is mutated only by the workflow engine, except for the manual
//! correction operation [`CapacityTracker::set_capacity`], which exists for
//! administrative capacity resyncs and is not part of the state machine.

use crate::entity::PartnerId;
use crate::errors::{DomainError, DomainResult};
use crate::transfer::TransferDirection;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// A partner organization's intake capacity record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PartnerCapacity {
    partner_id: PartnerId,
    accepts_intakes: bool,
    current_capacity: u32,
    max_capacity: u32,
    updated_at: DateTime<Utc>,
}

impl PartnerCapacity {
    /// Create a capacity record with zero current occupancy
    pub fn new(partner_id: PartnerId, max_capacity: u32, accepts_intakes: bool) -> Self {
        Self {
            partner_id,
            accepts_intakes,
            current_capacity: 0,
            max_capacity,
            updated_at: Utc::now(),
        }
    }

    /// Set the current occupancy, validating it against the maximum
    pub fn with_current(mut self, current_capacity: u32) -> DomainResult<Self> {
        if current_capacity > self.max_capacity {
            return Err(DomainError::validation(format!(
                "current capacity {current_capacity} exceeds maximum {}",
                self.max_capacity
            )));
        }
        self.current_capacity = current_capacity;
        Ok(self)
    }

    /// The partner this record belongs to
    pub fn partner_id(&self) -> PartnerId {
        self.partner_id
    }

    /// Whether the partner accepts intakes at all
    pub fn accepts_intakes(&self) -> bool {
        self.accepts_intakes
    }

    /// Current occupancy
    pub fn current_capacity(&self) -> u32 {
        self.current_capacity
    }

    /// Maximum intake capacity
    pub fn max_capacity(&self) -> u32 {
        self.max_capacity
    }

    /// Whether the partner has room for one more animal
    pub fn has_room(&self) -> bool {
        self.current_capacity < self.max_capacity
    }

    /// When the record was last mutated
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Count one animal against the partner's intake limit
    ///
    /// Only outbound transfers consume partner capacity; an inbound
    /// reservation is a no-op success because the shelter absorbs the animal.
    pub fn reserve(&mut self, direction: TransferDirection) -> DomainResult<()> {
        match direction {
            TransferDirection::Outbound => {
                if !self.accepts_intakes {
                    return Err(DomainError::NotAccepting(self.partner_id.to_string()));
                }
                if !self.has_room() {
                    return Err(DomainError::CapacityExceeded {
                        partner_id: self.partner_id.to_string(),
                        current: self.current_capacity,
                        max: self.max_capacity,
                    });
                }
                self.current_capacity += 1;
                self.updated_at = Utc::now();
                Ok(())
            }
            TransferDirection::Inbound => Ok(()),
        }
    }

    /// Release one counted animal, clamping at zero
    ///
    /// Returns `true` when the count was already zero and had to be clamped.
    /// Historical capacity desync must not block operations, so the clamp is
    /// reported to the caller for logging rather than raised as an error.
    pub fn release(&mut self) -> bool {
        if self.current_capacity == 0 {
            return true;
        }
        self.current_capacity -= 1;
        self.updated_at = Utc::now();
        false
    }

    /// Manually correct the current occupancy
    pub fn set_current(&mut self, new_current: u32) -> DomainResult<()> {
        if new_current > self.max_capacity {
            return Err(DomainError::validation(format!(
                "current capacity {new_current} exceeds maximum {}",
                self.max_capacity
            )));
        }
        self.current_capacity = new_current;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Port for partner capacity bookkeeping
///
/// Implementations must serialize `reserve`/`release`/`set_capacity` per
/// partner so the capacity invariant holds under concurrent transitions on
/// different transfers referencing the same partner.
#[async_trait]
pub trait CapacityTracker: Send + Sync {
    /// Fetch a partner's capacity record
    async fn get(&self, partner_id: PartnerId) -> DomainResult<PartnerCapacity>;

    /// Install or replace a partner's capacity record
    async fn register(&self, capacity: PartnerCapacity) -> DomainResult<()>;

    /// Reserve one intake slot for an approved transfer
    async fn reserve(
        &self,
        partner_id: PartnerId,
        direction: TransferDirection,
    ) -> DomainResult<()>;

    /// Release one intake slot
    async fn release(
        &self,
        partner_id: PartnerId,
        direction: TransferDirection,
    ) -> DomainResult<()>;

    /// Manual capacity correction (administrative, outside the state machine)
    async fn set_capacity(&self, partner_id: PartnerId, new_current: u32) -> DomainResult<()>;
}

/// In-memory capacity tracker
///
/// The write lock is held across check-and-increment, which serializes
/// capacity mutations for all partners; contention fails fast through the
/// capacity checks rather than queuing.
#[derive(Clone, Default)]
pub struct InMemoryCapacityTracker {
    partners: Arc<RwLock<HashMap<PartnerId, PartnerCapacity>>>,
}

impl InMemoryCapacityTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CapacityTracker for InMemoryCapacityTracker {
    async fn get(&self, partner_id: PartnerId) -> DomainResult<PartnerCapacity> {
        self.partners
            .read()
            .await
            .get(&partner_id)
            .cloned()
            .ok_or_else(|| DomainError::PartnerNotFound(partner_id.to_string()))
    }

    async fn register(&self, capacity: PartnerCapacity) -> DomainResult<()> {
        self.partners
            .write()
            .await
            .insert(capacity.partner_id(), capacity);
        Ok(())
    }

    async fn reserve(
        &self,
        partner_id: PartnerId,
        direction: TransferDirection,
    ) -> DomainResult<()> {
        let mut partners = self.partners.write().await;
        let capacity = partners
            .get_mut(&partner_id)
            .ok_or_else(|| DomainError::PartnerNotFound(partner_id.to_string()))?;
        capacity.reserve(direction)
    }

    async fn release(
        &self,
        partner_id: PartnerId,
        direction: TransferDirection,
    ) -> DomainResult<()> {
        let mut partners = self.partners.write().await;
        let capacity = partners
            .get_mut(&partner_id)
            .ok_or_else(|| DomainError::PartnerNotFound(partner_id.to_string()))?;
        if capacity.release() {
            warn!(
                partner_id = %partner_id,
                ?direction,
                "capacity release clamped at zero; partner counts were out of sync"
            );
        }
        Ok(())
    }

    async fn set_capacity(&self, partner_id: PartnerId, new_current: u32) -> DomainResult<()> {
        let mut partners = self.partners.write().await;
        let capacity = partners
            .get_mut(&partner_id)
            .ok_or_else(|| DomainError::PartnerNotFound(partner_id.to_string()))?;
        capacity.set_current(new_current)
    }
}
