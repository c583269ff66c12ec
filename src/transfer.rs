// Copyright 2025 Cowboy AI, LLC.

//! The Transfer aggregate
//!
//! A transfer represents one in-flight or historical animal movement between
//! the shelter and a partner organization. Its lifecycle is a closed state
//! machine: `Pending → Approved → InTransit → Completed`, with `Rejected`
//! reachable from `Pending` and `Cancelled` reachable from any non-terminal
//! state. The transition table lives in [`TransferStatus::valid_transitions`]
//! and every mutation is guarded by it, so an illegal edge can never be
//! applied and terminal records can never change again.
//!
//! Capacity side effects are not applied here; the aggregate records *what*
//! happened and the workflow engine drives the partner capacity tracker.

use crate::entity::{AggregateRoot, AnimalId, PartnerId, StaffId, TransferId};
use crate::errors::{DomainError, DomainResult};
use crate::events::{
    TransferApproved, TransferCancelled, TransferCompleted, TransferRejected, TransferRequested,
    TransferScheduled, TransferTransitStarted,
};
use crate::state_machine::{ensure_transition, State, StateTransitions};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Direction of an animal movement, seen from the shelter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    /// A partner is sending an animal to the shelter
    Inbound,
    /// The shelter is sending an animal to a partner
    Outbound,
}

/// Coded reason for a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransferReason {
    /// The sending side is over capacity
    Overcapacity,
    /// The receiving side specializes in this animal's needs
    Specialization,
    /// Medical care the sending side cannot provide
    Medical,
    /// Movement toward an adoption placement
    Adoption,
    /// Placement into a foster network
    Foster,
    /// Behavioral placement
    Behavioral,
    /// Reunification with an owner or group
    Reunification,
    /// Permanent sanctuary placement
    Sanctuary,
    /// Anything else; requires free-text details
    Other,
}

impl TransferReason {
    /// Whether completed transfers with this reason get a follow-up check-in
    pub fn needs_follow_up(&self) -> bool {
        matches!(self, Self::Medical | Self::Behavioral | Self::Foster)
    }
}

/// Lifecycle status of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    /// Requested, awaiting an approval decision
    Pending,
    /// Approved; partner capacity is reserved for outbound transfers
    Approved,
    /// The animal is physically in transit
    InTransit,
    /// Terminal: the animal arrived
    Completed,
    /// Terminal: the request was declined
    Rejected,
    /// Terminal: the transfer was called off
    Cancelled,
}

impl State for TransferStatus {
    fn name(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::InTransit => "InTransit",
            Self::Completed => "Completed",
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Cancelled)
    }
}

impl StateTransitions for TransferStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use TransferStatus::*;

        match self {
            Pending => vec![Approved, Rejected, Cancelled],
            Approved => vec![InTransit, Cancelled],
            InTransit => vec![Completed, Cancelled],
            Completed | Rejected | Cancelled => vec![],
        }
    }
}

impl TransferStatus {
    /// Whether a scheduled date may be set in this status
    pub fn allows_scheduling(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

/// One animal movement between the shelter and a partner organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    id: TransferId,
    animal_id: AnimalId,
    partner_id: PartnerId,
    direction: TransferDirection,
    status: TransferStatus,
    reason: TransferReason,
    reason_details: Option<String>,
    scheduled_date: Option<DateTime<Utc>>,
    requested_by: StaffId,
    approved_by: Option<StaffId>,
    approved_at: Option<DateTime<Utc>>,
    completed_by: Option<StaffId>,
    cancelled_by: Option<StaffId>,
    rejection_reason: Option<String>,
    cancellation_reason: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    follow_up_required: bool,
    follow_up_recorded_at: Option<DateTime<Utc>>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Transfer {
    /// Create a new transfer request in `Pending` status
    ///
    /// Validates the identity references and the reason. No capacity is
    /// reserved at creation; that happens at approval.
    pub fn new(
        animal_id: AnimalId,
        partner_id: PartnerId,
        direction: TransferDirection,
        reason: TransferReason,
        reason_details: Option<String>,
        requested_by: StaffId,
    ) -> DomainResult<Self> {
        if animal_id.as_uuid().is_nil() {
            return Err(DomainError::validation("Animal ID is required"));
        }
        if partner_id.as_uuid().is_nil() {
            return Err(DomainError::validation("Partner ID is required"));
        }
        let reason_details = match reason_details {
            Some(details) => {
                if details.trim().is_empty() {
                    return Err(DomainError::validation(
                        "Transfer reason details must not be blank",
                    ));
                }
                Some(details)
            }
            None => {
                if matches!(reason, TransferReason::Other) {
                    return Err(DomainError::validation(
                        "Transfer reason details are required",
                    ));
                }
                None
            }
        };

        let now = Utc::now();
        Ok(Self {
            id: TransferId::new(),
            animal_id,
            partner_id,
            direction,
            status: TransferStatus::Pending,
            reason,
            reason_details,
            scheduled_date: None,
            requested_by,
            approved_by: None,
            approved_at: None,
            completed_by: None,
            cancelled_by: None,
            rejection_reason: None,
            cancellation_reason: None,
            completed_at: None,
            follow_up_required: false,
            follow_up_recorded_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// The creation event for this transfer
    pub fn requested_event(&self) -> TransferRequested {
        TransferRequested {
            transfer_id: self.id,
            animal_id: self.animal_id,
            partner_id: self.partner_id,
            direction: self.direction,
            reason: self.reason,
            requested_by: self.requested_by,
            requested_at: self.created_at,
        }
    }

    /// Set or overwrite the scheduled date
    ///
    /// Legal while `Pending` or `Approved`. Scheduling the same date twice is
    /// a no-op success; a new date overwrites the prior one and must lie in
    /// the future.
    pub fn schedule(&mut self, date: DateTime<Utc>) -> DomainResult<TransferScheduled> {
        if !self.status.allows_scheduling() {
            return Err(self.illegal_stay());
        }
        let event = TransferScheduled {
            transfer_id: self.id,
            scheduled_date: date,
        };
        if self.scheduled_date == Some(date) {
            // Idempotent re-submission; leave the record untouched.
            return Ok(event);
        }
        if date < Utc::now() {
            return Err(DomainError::validation(
                "Scheduled date must be in the future",
            ));
        }
        self.scheduled_date = Some(date);
        self.touch();
        Ok(event)
    }

    /// Approve the transfer
    ///
    /// Capacity must already have been reserved by the caller; this method
    /// only applies the record-side transition.
    pub fn approve(&mut self, approved_by: StaffId) -> DomainResult<TransferApproved> {
        self.transition_to(TransferStatus::Approved)?;
        let now = Utc::now();
        self.approved_by = Some(approved_by);
        self.approved_at = Some(now);
        Ok(TransferApproved {
            transfer_id: self.id,
            partner_id: self.partner_id,
            direction: self.direction,
            approved_by,
            approved_at: now,
        })
    }

    /// Reject the transfer request
    pub fn reject(&mut self, reason: &str) -> DomainResult<TransferRejected> {
        if reason.trim().is_empty() {
            return Err(DomainError::validation("Rejection reason is required"));
        }
        self.transition_to(TransferStatus::Rejected)?;
        self.rejection_reason = Some(reason.to_string());
        Ok(TransferRejected {
            transfer_id: self.id,
            reason: reason.to_string(),
            rejected_at: self.updated_at,
        })
    }

    /// Mark the animal as physically in transit
    pub fn start_transit(&mut self) -> DomainResult<TransferTransitStarted> {
        self.transition_to(TransferStatus::InTransit)?;
        Ok(TransferTransitStarted {
            transfer_id: self.id,
            started_at: self.updated_at,
        })
    }

    /// Complete the transfer
    ///
    /// Stamps `completed_at` exactly once and derives whether a follow-up
    /// check-in is required from the transfer reason.
    pub fn complete(&mut self, completed_by: StaffId) -> DomainResult<TransferCompleted> {
        self.transition_to(TransferStatus::Completed)?;
        let now = Utc::now();
        self.completed_by = Some(completed_by);
        self.completed_at = Some(now);
        self.follow_up_required = self.reason.needs_follow_up();
        Ok(TransferCompleted {
            transfer_id: self.id,
            animal_id: self.animal_id,
            partner_id: self.partner_id,
            direction: self.direction,
            follow_up_required: self.follow_up_required,
            completed_by,
            completed_at: now,
        })
    }

    /// Cancel the transfer
    ///
    /// Legal from any non-terminal status. The event carries the status the
    /// transfer was cancelled from, which the engine uses to decide whether a
    /// capacity reservation must be released.
    pub fn cancel(&mut self, reason: &str, cancelled_by: StaffId) -> DomainResult<TransferCancelled> {
        if reason.trim().is_empty() {
            return Err(DomainError::validation("Cancellation reason is required"));
        }
        let from_status = self.status;
        self.transition_to(TransferStatus::Cancelled)?;
        self.cancelled_by = Some(cancelled_by);
        self.cancellation_reason = Some(reason.to_string());
        Ok(TransferCancelled {
            transfer_id: self.id,
            partner_id: self.partner_id,
            direction: self.direction,
            from_status,
            reason: reason.to_string(),
            cancelled_by,
            cancelled_at: self.updated_at,
        })
    }

    /// Amend the free-text reason details
    ///
    /// Only a `Pending` transfer may be amended.
    pub fn amend_reason(&mut self, details: impl Into<String>) -> DomainResult<()> {
        if self.status != TransferStatus::Pending {
            return Err(DomainError::InvalidOperation {
                reason: format!(
                    "reason details can only be amended while pending (status: {})",
                    self.status.name()
                ),
            });
        }
        let details = details.into();
        if details.trim().is_empty() {
            return Err(DomainError::validation(
                "Transfer reason details must not be blank",
            ));
        }
        self.reason_details = Some(details);
        self.touch();
        Ok(())
    }

    /// Stamp the follow-up as recorded
    ///
    /// Invoked on behalf of the external follow-up collaborator; the workflow
    /// engine never calls this.
    pub fn record_follow_up(&mut self) -> DomainResult<()> {
        if self.status != TransferStatus::Completed {
            return Err(DomainError::InvalidOperation {
                reason: format!(
                    "follow-up applies to completed transfers only (status: {})",
                    self.status.name()
                ),
            });
        }
        if self.follow_up_recorded_at.is_none() {
            self.follow_up_recorded_at = Some(Utc::now());
            self.touch();
        }
        Ok(())
    }

    /// Whether the transfer is past its scheduled date and still open
    ///
    /// A transfer with no scheduled date is never overdue, regardless of age.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self.status,
            TransferStatus::Pending | TransferStatus::Approved
        ) && self.scheduled_date.is_some_and(|d| d < now)
    }

    /// Whether a completed transfer still awaits its follow-up check-in
    pub fn awaits_follow_up(&self) -> bool {
        self.status == TransferStatus::Completed
            && self.follow_up_required
            && self.follow_up_recorded_at.is_none()
    }

    fn transition_to(&mut self, next: TransferStatus) -> DomainResult<()> {
        ensure_transition(&self.status, &next)?;
        self.status = next;
        self.touch();
        Ok(())
    }

    // Non-transition operation attempted in a status that forbids it.
    fn illegal_stay(&self) -> DomainError {
        DomainError::InvalidTransition {
            from: self.status.name().to_string(),
            to: self.status.name().to_string(),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// The transfer's unique identifier
    pub fn id(&self) -> TransferId {
        self.id
    }

    /// The animal being moved
    pub fn animal_id(&self) -> AnimalId {
        self.animal_id
    }

    /// The partner organization involved
    pub fn partner_id(&self) -> PartnerId {
        self.partner_id
    }

    /// Direction of the movement
    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    /// Current lifecycle status
    pub fn status(&self) -> TransferStatus {
        self.status
    }

    /// Coded transfer reason
    pub fn reason(&self) -> TransferReason {
        self.reason
    }

    /// Free-text reason details, if any
    pub fn reason_details(&self) -> Option<&str> {
        self.reason_details.as_deref()
    }

    /// Scheduled movement date, if set
    pub fn scheduled_date(&self) -> Option<DateTime<Utc>> {
        self.scheduled_date
    }

    /// Who requested the transfer
    pub fn requested_by(&self) -> StaffId {
        self.requested_by
    }

    /// Who approved the transfer, once approved
    pub fn approved_by(&self) -> Option<StaffId> {
        self.approved_by
    }

    /// When the transfer was approved, once approved
    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    /// Who completed the transfer, once completed
    pub fn completed_by(&self) -> Option<StaffId> {
        self.completed_by
    }

    /// Who cancelled the transfer, once cancelled
    pub fn cancelled_by(&self) -> Option<StaffId> {
        self.cancelled_by
    }

    /// Why the transfer was rejected, once rejected
    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    /// Why the transfer was cancelled, once cancelled
    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    /// When the transfer completed, once completed
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Whether a follow-up check-in is required after completion
    pub fn follow_up_required(&self) -> bool {
        self.follow_up_required
    }

    /// When the follow-up was recorded, if it has been
    pub fn follow_up_recorded_at(&self) -> Option<DateTime<Utc>> {
        self.follow_up_recorded_at
    }

    /// When the record was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the record was last updated
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl AggregateRoot for Transfer {
    type Id = TransferId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn increment_version(&mut self) {
        self.version += 1;
    }
}
