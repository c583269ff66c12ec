// Copyright 2025 Cowboy AI, LLC.

//! Domain events for the transfer workflow
//!
//! Events represent facts that have occurred in the domain. The workflow
//! engine emits one after every successfully applied transition; consumers
//! (notification fan-out, projections, reporting) subscribe through the
//! engine's publisher port.

use crate::entity::{AnimalId, PartnerId, StaffId, TransferId};
use crate::transfer::{TransferDirection, TransferReason, TransferStatus};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Base trait for all domain events
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Get the aggregate ID this event relates to
    fn aggregate_id(&self) -> Uuid;

    /// Get the event type name
    fn event_type(&self) -> &'static str;

    /// Get the schema version
    fn version(&self) -> &'static str {
        "v1"
    }
}

/// A transfer request was created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TransferRequested {
    /// The transfer that was created
    pub transfer_id: TransferId,
    /// The animal being moved
    pub animal_id: AnimalId,
    /// The partner organization involved
    pub partner_id: PartnerId,
    /// Direction of the movement
    pub direction: TransferDirection,
    /// Coded reason for the transfer
    pub reason: TransferReason,
    /// Who requested the transfer
    pub requested_by: StaffId,
    /// When the request was created
    pub requested_at: DateTime<Utc>,
}

/// A transfer was given a scheduled date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TransferScheduled {
    /// The transfer that was scheduled
    pub transfer_id: TransferId,
    /// The scheduled movement date
    pub scheduled_date: DateTime<Utc>,
}

/// A transfer was approved and, for outbound moves, partner capacity reserved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TransferApproved {
    /// The transfer that was approved
    pub transfer_id: TransferId,
    /// The partner whose capacity was reserved for outbound moves
    pub partner_id: PartnerId,
    /// Direction of the movement
    pub direction: TransferDirection,
    /// Who approved the transfer
    pub approved_by: StaffId,
    /// When the approval happened
    pub approved_at: DateTime<Utc>,
}

/// A pending transfer request was declined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TransferRejected {
    /// The transfer that was rejected
    pub transfer_id: TransferId,
    /// Why the request was declined
    pub reason: String,
    /// When the rejection happened
    pub rejected_at: DateTime<Utc>,
}

/// The animal left for its destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TransferTransitStarted {
    /// The transfer now in transit
    pub transfer_id: TransferId,
    /// When transit started
    pub started_at: DateTime<Utc>,
}

/// The animal arrived; the transfer is complete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TransferCompleted {
    /// The transfer that completed
    pub transfer_id: TransferId,
    /// The animal that moved
    pub animal_id: AnimalId,
    /// The partner organization involved
    pub partner_id: PartnerId,
    /// Direction of the movement
    pub direction: TransferDirection,
    /// Whether a follow-up check-in was flagged
    pub follow_up_required: bool,
    /// Who completed the transfer
    pub completed_by: StaffId,
    /// When the transfer completed
    pub completed_at: DateTime<Utc>,
}

/// The transfer was called off before completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TransferCancelled {
    /// The transfer that was cancelled
    pub transfer_id: TransferId,
    /// The partner organization involved
    pub partner_id: PartnerId,
    /// Direction of the movement
    pub direction: TransferDirection,
    /// The status the transfer was cancelled from
    pub from_status: TransferStatus,
    /// Why the transfer was called off
    pub reason: String,
    /// Who cancelled the transfer
    pub cancelled_by: StaffId,
    /// When the cancellation happened
    pub cancelled_at: DateTime<Utc>,
}

/// Enum wrapper for all transfer events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum TransferEvent {
    /// A transfer request was created
    Requested(TransferRequested),
    /// A transfer was given a scheduled date
    Scheduled(TransferScheduled),
    /// A transfer was approved
    Approved(TransferApproved),
    /// A pending transfer was declined
    Rejected(TransferRejected),
    /// The animal left for its destination
    TransitStarted(TransferTransitStarted),
    /// The animal arrived
    Completed(TransferCompleted),
    /// The transfer was called off
    Cancelled(TransferCancelled),
}

impl TransferEvent {
    /// The transfer this event relates to
    pub fn transfer_id(&self) -> TransferId {
        match self {
            Self::Requested(e) => e.transfer_id,
            Self::Scheduled(e) => e.transfer_id,
            Self::Approved(e) => e.transfer_id,
            Self::Rejected(e) => e.transfer_id,
            Self::TransitStarted(e) => e.transfer_id,
            Self::Completed(e) => e.transfer_id,
            Self::Cancelled(e) => e.transfer_id,
        }
    }
}

impl DomainEvent for TransferEvent {
    fn aggregate_id(&self) -> Uuid {
        *self.transfer_id().as_uuid()
    }

    fn event_type(&self) -> &'static str {
        match self {
            Self::Requested(_) => "TransferRequested",
            Self::Scheduled(_) => "TransferScheduled",
            Self::Approved(_) => "TransferApproved",
            Self::Rejected(_) => "TransferRejected",
            Self::TransitStarted(_) => "TransferTransitStarted",
            Self::Completed(_) => "TransferCompleted",
            Self::Cancelled(_) => "TransferCancelled",
        }
    }
}

impl From<TransferRequested> for TransferEvent {
    fn from(event: TransferRequested) -> Self {
        Self::Requested(event)
    }
}

impl From<TransferScheduled> for TransferEvent {
    fn from(event: TransferScheduled) -> Self {
        Self::Scheduled(event)
    }
}

impl From<TransferApproved> for TransferEvent {
    fn from(event: TransferApproved) -> Self {
        Self::Approved(event)
    }
}

impl From<TransferRejected> for TransferEvent {
    fn from(event: TransferRejected) -> Self {
        Self::Rejected(event)
    }
}

impl From<TransferTransitStarted> for TransferEvent {
    fn from(event: TransferTransitStarted) -> Self {
        Self::TransitStarted(event)
    }
}

impl From<TransferCompleted> for TransferEvent {
    fn from(event: TransferCompleted) -> Self {
        Self::Completed(event)
    }
}

impl From<TransferCancelled> for TransferEvent {
    fn from(event: TransferCancelled) -> Self {
        Self::Cancelled(event)
    }
}
