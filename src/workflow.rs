// Copyright 2025 Cowboy AI, LLC.

//! Transfer workflow engine
//!
//! The engine is the only writer of transfer records and partner capacity.
//! Every operation is one read-modify-write: load the record, validate the
//! transition against the state machine, apply it, persist behind the
//! version guard, drive the capacity side effect, then emit an audit entry
//! and a domain event. Collaborators (audit, animal status, event fan-out)
//! are injected ports, so the engine is testable in isolation with fakes.
//!
//! Capacity ordering: reservations are taken *before* the record write and
//! compensated if the write loses a version race; releases are applied
//! *after* the record write. Both are bracketed by the intent log so a crash
//! between the two writes is recoverable.

use crate::capacity::CapacityTracker;
use crate::entity::{AggregateRoot, AnimalId, PartnerId, StaffId, TransferId};
use crate::errors::{DomainError, DomainResult};
use crate::events::{DomainEvent, TransferEvent};
use crate::intent_log::{CapacityAction, IntentLog, TransitionIntent};
use crate::repository::TransferRepository;
use crate::state_machine::ensure_transition;
use crate::transfer::{Transfer, TransferDirection, TransferReason, TransferStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// One audit trail entry, emitted after every successful transition
///
/// Failed transitions are not audited.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuditEntry {
    /// Who performed the action
    pub actor_id: StaffId,
    /// The operation that was applied
    pub action: String,
    /// The kind of entity acted on
    pub entity_type: String,
    /// The entity acted on
    pub entity_id: Uuid,
    /// Human-readable summary
    pub note: String,
    /// When the entry was recorded
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Build an entry for a transfer operation
    pub fn for_transfer(
        actor_id: StaffId,
        action: impl Into<String>,
        transfer_id: TransferId,
        note: impl Into<String>,
    ) -> Self {
        Self {
            actor_id,
            action: action.into(),
            entity_type: "transfer".to_string(),
            entity_id: *transfer_id.as_uuid(),
            note: note.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Port to the audit collaborator
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Record one audit entry
    async fn record(&self, entry: AuditEntry) -> DomainResult<()>;
}

/// Recording audit log for tests
#[derive(Clone, Default)]
pub struct RecordingAuditLog {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl RecordingAuditLog {
    /// Create an empty recording log
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries recorded so far
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().unwrap().clone()
    }
}

#[async_trait]
impl AuditLog for RecordingAuditLog {
    async fn record(&self, entry: AuditEntry) -> DomainResult<()> {
        self.entries.write().unwrap().push(entry);
        Ok(())
    }
}

/// Port to the animal-status collaborator
///
/// The engine does not own animal records; it checks that the animal exists
/// when a transfer is requested and notifies the collaborator when a
/// transfer completes, which is when the animal physically moves.
#[async_trait]
pub trait AnimalStatusGateway: Send + Sync {
    /// Fail with `AnimalNotFound` for unknown animals
    async fn ensure_exists(&self, animal_id: AnimalId) -> DomainResult<()>;

    /// Update residency/ownership after a completed movement
    async fn transfer_completed(
        &self,
        animal_id: AnimalId,
        direction: TransferDirection,
    ) -> DomainResult<()>;
}

/// In-memory animal directory for tests
#[derive(Clone, Default)]
pub struct StaticAnimalDirectory {
    known: Arc<RwLock<Vec<AnimalId>>>,
    completions: Arc<RwLock<Vec<(AnimalId, TransferDirection)>>>,
}

impl StaticAnimalDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an animal as known
    pub fn admit(&self, animal_id: AnimalId) {
        self.known.write().unwrap().push(animal_id);
    }

    /// Completion notifications received so far
    pub fn completions(&self) -> Vec<(AnimalId, TransferDirection)> {
        self.completions.read().unwrap().clone()
    }
}

#[async_trait]
impl AnimalStatusGateway for StaticAnimalDirectory {
    async fn ensure_exists(&self, animal_id: AnimalId) -> DomainResult<()> {
        if self.known.read().unwrap().contains(&animal_id) {
            Ok(())
        } else {
            Err(DomainError::AnimalNotFound(animal_id.to_string()))
        }
    }

    async fn transfer_completed(
        &self,
        animal_id: AnimalId,
        direction: TransferDirection,
    ) -> DomainResult<()> {
        self.completions.write().unwrap().push((animal_id, direction));
        Ok(())
    }
}

/// Port for publishing domain events to downstream consumers
pub trait EventPublisher: Send + Sync {
    /// Publish one domain event
    fn publish(&self, event: &TransferEvent) -> DomainResult<()>;
}

/// Mock event publisher for tests; records event type names
#[derive(Clone, Default)]
pub struct MockEventPublisher {
    published: Arc<RwLock<Vec<String>>>,
}

impl MockEventPublisher {
    /// Create a new mock publisher
    pub fn new() -> Self {
        Self::default()
    }

    /// Event type names published so far
    pub fn published(&self) -> Vec<String> {
        self.published.read().unwrap().clone()
    }
}

impl EventPublisher for MockEventPublisher {
    fn publish(&self, event: &TransferEvent) -> DomainResult<()> {
        self.published
            .write()
            .unwrap()
            .push(event.event_type().to_string());
        Ok(())
    }
}

/// Input for requesting a new transfer
#[derive(Debug, Clone)]
pub struct CreateTransferRequest {
    /// The animal being moved
    pub animal_id: AnimalId,
    /// The partner organization involved
    pub partner_id: PartnerId,
    /// Direction of the movement
    pub direction: TransferDirection,
    /// Coded reason for the transfer
    pub reason: TransferReason,
    /// Free-text details; required when the reason is `Other`
    pub reason_details: Option<String>,
    /// Who is requesting the transfer
    pub requested_by: StaffId,
}

/// The transfer workflow engine
pub struct TransferWorkflow {
    transfers: Arc<dyn TransferRepository>,
    capacity: Arc<dyn CapacityTracker>,
    animals: Arc<dyn AnimalStatusGateway>,
    audit: Arc<dyn AuditLog>,
    events: Arc<dyn EventPublisher>,
    intents: Arc<dyn IntentLog>,
}

impl TransferWorkflow {
    /// Assemble an engine from its collaborator ports
    pub fn new(
        transfers: Arc<dyn TransferRepository>,
        capacity: Arc<dyn CapacityTracker>,
        animals: Arc<dyn AnimalStatusGateway>,
        audit: Arc<dyn AuditLog>,
        events: Arc<dyn EventPublisher>,
        intents: Arc<dyn IntentLog>,
    ) -> Self {
        Self {
            transfers,
            capacity,
            animals,
            audit,
            events,
            intents,
        }
    }

    /// Request a new transfer; the record starts `Pending`
    ///
    /// Validates that the animal and partner exist. No capacity is reserved
    /// yet; that happens at approval.
    pub async fn create(&self, request: CreateTransferRequest) -> DomainResult<Transfer> {
        self.animals.ensure_exists(request.animal_id).await?;
        // Partner existence only; the capacity gate applies at approval.
        self.capacity.get(request.partner_id).await?;

        let transfer = Transfer::new(
            request.animal_id,
            request.partner_id,
            request.direction,
            request.reason,
            request.reason_details,
            request.requested_by,
        )?;
        self.transfers.create(transfer.clone()).await?;

        info!(transfer_id = %transfer.id(), direction = ?transfer.direction(), "transfer requested");
        self.record_audit(
            request.requested_by,
            "create",
            transfer.id(),
            "requested transfer",
        )
        .await;
        self.publish(transfer.requested_event().into());
        Ok(transfer)
    }

    /// Set or overwrite the scheduled date of a pending or approved transfer
    pub async fn schedule(
        &self,
        transfer_id: TransferId,
        date: DateTime<Utc>,
        actor_id: StaffId,
    ) -> DomainResult<Transfer> {
        let mut transfer = self.transfers.find_by_id(transfer_id).await?;
        let before = transfer.scheduled_date();
        let event = transfer.schedule(date)?;

        if transfer.scheduled_date() != before {
            let expected = transfer.version();
            transfer.increment_version();
            self.transfers.update(transfer.clone(), expected).await?;
        }

        self.record_audit(actor_id, "schedule", transfer_id, "scheduled transfer")
            .await;
        self.publish(event.into());
        Ok(transfer)
    }

    /// Approve a pending transfer, reserving partner capacity for outbound moves
    ///
    /// A capacity rejection (`CapacityExceeded`, `NotAccepting`) leaves the
    /// status `Pending`; the caller corrects capacity and re-attempts.
    pub async fn approve(
        &self,
        transfer_id: TransferId,
        approved_by: StaffId,
    ) -> DomainResult<Transfer> {
        let mut transfer = self.transfers.find_by_id(transfer_id).await?;
        // Validate the edge before reserving so a slot is never taken for a
        // transition that cannot happen.
        ensure_transition(&transfer.status(), &TransferStatus::Approved)?;

        let partner_id = transfer.partner_id();
        let direction = transfer.direction();
        let outbound = direction == TransferDirection::Outbound;

        // Inbound approval has no capacity effect to bracket.
        let intent_id = if outbound {
            let intent =
                TransitionIntent::new(transfer_id, partner_id, CapacityAction::Reserve, direction);
            let id = intent.intent_id;
            self.intents.begin(intent).await?;
            Some(id)
        } else {
            None
        };

        if let Err(err) = self.capacity.reserve(partner_id, direction).await {
            if let Some(id) = intent_id {
                self.intents.abort(id).await?;
            }
            return Err(err);
        }

        let event = transfer.approve(approved_by)?;
        let expected = transfer.version();
        transfer.increment_version();
        if let Err(err) = self.transfers.update(transfer.clone(), expected).await {
            // The losing writer must not leak the slot it reserved.
            if outbound {
                warn!(%transfer_id, "approval write lost a race; releasing reserved capacity");
                self.capacity.release(partner_id, direction).await?;
            }
            if let Some(id) = intent_id {
                self.intents.abort(id).await?;
            }
            return Err(err);
        }
        if let Some(id) = intent_id {
            self.intents.complete(id).await?;
        }

        info!(%transfer_id, %partner_id, ?direction, "transfer approved");
        self.record_audit(approved_by, "approve", transfer_id, "approved transfer")
            .await;
        self.publish(event.into());
        Ok(transfer)
    }

    /// Decline a pending transfer request
    pub async fn reject(
        &self,
        transfer_id: TransferId,
        reason: &str,
        actor_id: StaffId,
    ) -> DomainResult<Transfer> {
        let mut transfer = self.transfers.find_by_id(transfer_id).await?;
        let event = transfer.reject(reason)?;
        let expected = transfer.version();
        transfer.increment_version();
        self.transfers.update(transfer.clone(), expected).await?;

        info!(%transfer_id, "transfer rejected");
        self.record_audit(
            actor_id,
            "reject",
            transfer_id,
            format!("rejected transfer: {reason}"),
        )
        .await;
        self.publish(event.into());
        Ok(transfer)
    }

    /// Mark an approved transfer as physically in transit
    ///
    /// Capacity was already reserved at approval; this transition has no
    /// capacity effect.
    pub async fn start_transit(
        &self,
        transfer_id: TransferId,
        actor_id: StaffId,
    ) -> DomainResult<Transfer> {
        let mut transfer = self.transfers.find_by_id(transfer_id).await?;
        let event = transfer.start_transit()?;
        let expected = transfer.version();
        transfer.increment_version();
        self.transfers.update(transfer.clone(), expected).await?;

        info!(%transfer_id, "transfer in transit");
        self.record_audit(actor_id, "start_transit", transfer_id, "started transit")
            .await;
        self.publish(event.into());
        Ok(transfer)
    }

    /// Complete an in-transit transfer
    ///
    /// Inbound completions release the partner's held slot (the animal has
    /// left their care). Outbound completions keep the reservation: the
    /// partner is now caring for the animal and reports future capacity
    /// changes independently. The animal-status collaborator is notified
    /// here, at the physical movement.
    pub async fn complete(
        &self,
        transfer_id: TransferId,
        actor_id: StaffId,
    ) -> DomainResult<Transfer> {
        let mut transfer = self.transfers.find_by_id(transfer_id).await?;
        let event = transfer.complete(actor_id)?;
        let expected = transfer.version();
        transfer.increment_version();
        self.transfers.update(transfer.clone(), expected).await?;

        if transfer.direction() == TransferDirection::Inbound {
            let intent = TransitionIntent::new(
                transfer_id,
                transfer.partner_id(),
                CapacityAction::Release,
                transfer.direction(),
            );
            let intent_id = intent.intent_id;
            self.intents.begin(intent).await?;
            self.capacity
                .release(transfer.partner_id(), transfer.direction())
                .await?;
            self.intents.complete(intent_id).await?;
        }

        if let Err(err) = self
            .animals
            .transfer_completed(transfer.animal_id(), transfer.direction())
            .await
        {
            warn!(%transfer_id, %err, "animal status collaborator was not notified");
        }

        info!(%transfer_id, follow_up = transfer.follow_up_required(), "transfer completed");
        self.record_audit(actor_id, "complete", transfer_id, "completed transfer")
            .await;
        self.publish(event.into());
        Ok(transfer)
    }

    /// Call off a transfer from any non-terminal status
    ///
    /// Cancelling an outbound transfer after approval releases the capacity
    /// reserved for it. A cancellation from `Pending` has no capacity effect.
    pub async fn cancel(
        &self,
        transfer_id: TransferId,
        reason: &str,
        actor_id: StaffId,
    ) -> DomainResult<Transfer> {
        let mut transfer = self.transfers.find_by_id(transfer_id).await?;
        let event = transfer.cancel(reason, actor_id)?;
        let expected = transfer.version();
        transfer.increment_version();
        self.transfers.update(transfer.clone(), expected).await?;

        let reserved = matches!(
            event.from_status,
            TransferStatus::Approved | TransferStatus::InTransit
        ) && transfer.direction() == TransferDirection::Outbound;
        if reserved {
            let intent = TransitionIntent::new(
                transfer_id,
                transfer.partner_id(),
                CapacityAction::Release,
                transfer.direction(),
            );
            let intent_id = intent.intent_id;
            self.intents.begin(intent).await?;
            self.capacity
                .release(transfer.partner_id(), transfer.direction())
                .await?;
            self.intents.complete(intent_id).await?;
        }

        info!(%transfer_id, from = ?event.from_status, "transfer cancelled");
        self.record_audit(
            actor_id,
            "cancel",
            transfer_id,
            format!("cancelled transfer: {reason}"),
        )
        .await;
        self.publish(event.into());
        Ok(transfer)
    }

    /// Amend the free-text reason details of a pending transfer
    pub async fn amend_reason(
        &self,
        transfer_id: TransferId,
        details: String,
        actor_id: StaffId,
    ) -> DomainResult<Transfer> {
        let mut transfer = self.transfers.find_by_id(transfer_id).await?;
        transfer.amend_reason(details)?;
        let expected = transfer.version();
        transfer.increment_version();
        self.transfers.update(transfer.clone(), expected).await?;

        self.record_audit(actor_id, "amend_reason", transfer_id, "amended reason details")
            .await;
        Ok(transfer)
    }

    /// Record the follow-up check-in for a completed transfer
    ///
    /// Exposed for the external follow-up collaborator; not part of the
    /// state machine.
    pub async fn record_follow_up(
        &self,
        transfer_id: TransferId,
        actor_id: StaffId,
    ) -> DomainResult<Transfer> {
        let mut transfer = self.transfers.find_by_id(transfer_id).await?;
        transfer.record_follow_up()?;
        let expected = transfer.version();
        transfer.increment_version();
        self.transfers.update(transfer.clone(), expected).await?;

        self.record_audit(actor_id, "record_follow_up", transfer_id, "recorded follow-up")
            .await;
        Ok(transfer)
    }

    // Post-transition collaborator calls are best effort: a completed
    // transition is not rolled back because a side channel hiccuped.
    async fn record_audit(
        &self,
        actor_id: StaffId,
        action: &str,
        transfer_id: TransferId,
        note: impl Into<String>,
    ) {
        let entry = AuditEntry::for_transfer(actor_id, action, transfer_id, note);
        if let Err(err) = self.audit.record(entry).await {
            warn!(%transfer_id, %err, "audit entry was not recorded");
        }
    }

    fn publish(&self, event: TransferEvent) {
        if let Err(err) = self.events.publish(&event) {
            warn!(event_type = event.event_type(), %err, "event publication failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::{InMemoryCapacityTracker, PartnerCapacity};
    use crate::entity::PartnerId;
    use crate::intent_log::InMemoryIntentLog;
    use crate::repository::InMemoryTransferRepository;
    use mockall::mock;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    mock! {
        AnimalGateway {}

        #[async_trait]
        impl AnimalStatusGateway for AnimalGateway {
            async fn ensure_exists(&self, animal_id: AnimalId) -> DomainResult<()>;
            async fn transfer_completed(
                &self,
                animal_id: AnimalId,
                direction: TransferDirection,
            ) -> DomainResult<()>;
        }
    }

    struct Harness {
        workflow: TransferWorkflow,
        transfers: Arc<InMemoryTransferRepository>,
        capacity: Arc<InMemoryCapacityTracker>,
        animals: Arc<StaticAnimalDirectory>,
        audit: Arc<RecordingAuditLog>,
        events: Arc<MockEventPublisher>,
        intents: Arc<InMemoryIntentLog>,
    }

    fn harness() -> Harness {
        let transfers = Arc::new(InMemoryTransferRepository::new());
        let capacity = Arc::new(InMemoryCapacityTracker::new());
        let animals = Arc::new(StaticAnimalDirectory::new());
        let audit = Arc::new(RecordingAuditLog::new());
        let events = Arc::new(MockEventPublisher::new());
        let intents = Arc::new(InMemoryIntentLog::new());
        let workflow = TransferWorkflow::new(
            transfers.clone(),
            capacity.clone(),
            animals.clone(),
            audit.clone(),
            events.clone(),
            intents.clone(),
        );
        Harness {
            workflow,
            transfers,
            capacity,
            animals,
            audit,
            events,
            intents,
        }
    }

    async fn seeded_request(h: &Harness, direction: TransferDirection) -> CreateTransferRequest {
        let animal_id = AnimalId::new();
        h.animals.admit(animal_id);
        let partner_id = PartnerId::new();
        h.capacity
            .register(PartnerCapacity::new(partner_id, 5, true))
            .await
            .unwrap();
        CreateTransferRequest {
            animal_id,
            partner_id,
            direction,
            reason: TransferReason::Adoption,
            reason_details: None,
            requested_by: StaffId::new(),
        }
    }

    #[tokio::test]
    async fn test_create_requires_known_animal() {
        let h = harness();
        let partner_id = PartnerId::new();
        h.capacity
            .register(PartnerCapacity::new(partner_id, 5, true))
            .await
            .unwrap();

        let err = h
            .workflow
            .create(CreateTransferRequest {
                animal_id: AnimalId::new(),
                partner_id,
                direction: TransferDirection::Outbound,
                reason: TransferReason::Adoption,
                reason_details: None,
                requested_by: StaffId::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::AnimalNotFound(_)));
        assert!(h.audit.entries().is_empty());
        assert!(h.events.published().is_empty());
    }

    #[tokio::test]
    async fn test_create_requires_known_partner() {
        let h = harness();
        let animal_id = AnimalId::new();
        h.animals.admit(animal_id);

        let err = h
            .workflow
            .create(CreateTransferRequest {
                animal_id,
                partner_id: PartnerId::new(),
                direction: TransferDirection::Outbound,
                reason: TransferReason::Adoption,
                reason_details: None,
                requested_by: StaffId::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::PartnerNotFound(_)));
    }

    #[tokio::test]
    async fn test_create_audits_and_publishes() {
        let h = harness();
        let request = seeded_request(&h, TransferDirection::Outbound).await;
        let requested_by = request.requested_by;

        let transfer = h.workflow.create(request).await.unwrap();

        let entries = h.audit.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "create");
        assert_eq!(entries[0].entity_type, "transfer");
        assert_eq!(entries[0].entity_id, *transfer.id().as_uuid());
        assert_eq!(entries[0].actor_id, requested_by);
        assert_eq!(h.events.published(), vec!["TransferRequested"]);
    }

    #[tokio::test]
    async fn test_approve_reserves_outbound_capacity() {
        let h = harness();
        let request = seeded_request(&h, TransferDirection::Outbound).await;
        let partner_id = request.partner_id;
        let transfer = h.workflow.create(request).await.unwrap();

        h.workflow
            .approve(transfer.id(), StaffId::new())
            .await
            .unwrap();

        assert_eq!(h.capacity.get(partner_id).await.unwrap().current_capacity(), 1);
        assert!(h.intents.in_flight().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_approve_capacity_failure_keeps_pending() {
        let h = harness();
        let animal_id = AnimalId::new();
        h.animals.admit(animal_id);
        let partner_id = PartnerId::new();
        h.capacity
            .register(
                PartnerCapacity::new(partner_id, 5, true)
                    .with_current(5)
                    .unwrap(),
            )
            .await
            .unwrap();
        let transfer = h
            .workflow
            .create(CreateTransferRequest {
                animal_id,
                partner_id,
                direction: TransferDirection::Outbound,
                reason: TransferReason::Overcapacity,
                reason_details: None,
                requested_by: StaffId::new(),
            })
            .await
            .unwrap();

        let err = h
            .workflow
            .approve(transfer.id(), StaffId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CapacityExceeded { .. }));

        let stored = h.transfers.find_by_id(transfer.id()).await.unwrap();
        assert_eq!(stored.status(), TransferStatus::Pending);
        assert!(stored.approved_by().is_none());
        // The aborted reservation leaves no dangling intent.
        assert!(h.intents.in_flight().await.unwrap().is_empty());
        // Only the creation was audited.
        assert_eq!(h.audit.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_approve_after_manual_correction_succeeds() {
        let h = harness();
        let animal_id = AnimalId::new();
        h.animals.admit(animal_id);
        let partner_id = PartnerId::new();
        h.capacity
            .register(
                PartnerCapacity::new(partner_id, 5, true)
                    .with_current(5)
                    .unwrap(),
            )
            .await
            .unwrap();
        let transfer = h
            .workflow
            .create(CreateTransferRequest {
                animal_id,
                partner_id,
                direction: TransferDirection::Outbound,
                reason: TransferReason::Overcapacity,
                reason_details: None,
                requested_by: StaffId::new(),
            })
            .await
            .unwrap();

        assert!(h.workflow.approve(transfer.id(), StaffId::new()).await.is_err());

        // Manual correction, then the caller re-attempts the same approve.
        h.capacity.set_capacity(partner_id, 4).await.unwrap();
        let approved = h
            .workflow
            .approve(transfer.id(), StaffId::new())
            .await
            .unwrap();
        assert_eq!(approved.status(), TransferStatus::Approved);
        assert_eq!(h.capacity.get(partner_id).await.unwrap().current_capacity(), 5);
    }

    /// Repository double that fails the first `update` with a version
    /// conflict, simulating a concurrent writer landing in between.
    struct ConflictOnFirstUpdate {
        inner: InMemoryTransferRepository,
        tripped: RwLock<bool>,
    }

    #[async_trait]
    impl TransferRepository for ConflictOnFirstUpdate {
        async fn create(&self, transfer: Transfer) -> DomainResult<()> {
            self.inner.create(transfer).await
        }

        async fn find_by_id(&self, id: TransferId) -> DomainResult<Transfer> {
            self.inner.find_by_id(id).await
        }

        async fn update(&self, transfer: Transfer, expected_version: u64) -> DomainResult<()> {
            {
                let mut tripped = self.tripped.write().unwrap();
                if !*tripped {
                    *tripped = true;
                    return Err(DomainError::ConcurrencyConflict {
                        expected: expected_version,
                        actual: expected_version + 1,
                    });
                }
            }
            self.inner.update(transfer, expected_version).await
        }

        async fn list(
            &self,
            filter: &crate::repository::TransferFilter,
        ) -> DomainResult<Vec<Transfer>> {
            self.inner.list(filter).await
        }
    }

    #[tokio::test]
    async fn test_losing_approve_compensates_reservation() {
        let transfers = Arc::new(ConflictOnFirstUpdate {
            inner: InMemoryTransferRepository::new(),
            tripped: RwLock::new(false),
        });
        let capacity = Arc::new(InMemoryCapacityTracker::new());
        let animals = Arc::new(StaticAnimalDirectory::new());
        let audit = Arc::new(RecordingAuditLog::new());
        let events = Arc::new(MockEventPublisher::new());
        let intents = Arc::new(InMemoryIntentLog::new());
        let workflow = TransferWorkflow::new(
            transfers.clone(),
            capacity.clone(),
            animals.clone(),
            audit.clone(),
            events.clone(),
            intents.clone(),
        );

        let animal_id = AnimalId::new();
        animals.admit(animal_id);
        let partner_id = PartnerId::new();
        capacity
            .register(PartnerCapacity::new(partner_id, 5, true))
            .await
            .unwrap();
        let transfer = workflow
            .create(CreateTransferRequest {
                animal_id,
                partner_id,
                direction: TransferDirection::Outbound,
                reason: TransferReason::Adoption,
                reason_details: None,
                requested_by: StaffId::new(),
            })
            .await
            .unwrap();

        let err = workflow
            .approve(transfer.id(), StaffId::new())
            .await
            .unwrap_err();
        assert!(err.is_concurrency_error());

        // The reservation taken before the losing write was released and the
        // intent closed; counts never drift.
        assert_eq!(capacity.get(partner_id).await.unwrap().current_capacity(), 0);
        assert!(intents.in_flight().await.unwrap().is_empty());

        // A retry of the same operation succeeds once contention clears.
        let approved = workflow.approve(transfer.id(), StaffId::new()).await.unwrap();
        assert_eq!(approved.status(), TransferStatus::Approved);
        assert_eq!(capacity.get(partner_id).await.unwrap().current_capacity(), 1);
    }

    #[tokio::test]
    async fn test_complete_notifies_animal_collaborator() {
        let h = harness();
        let request = seeded_request(&h, TransferDirection::Outbound).await;
        let animal_id = request.animal_id;
        let transfer = h.workflow.create(request).await.unwrap();
        let actor = StaffId::new();

        h.workflow.approve(transfer.id(), actor).await.unwrap();
        h.workflow.start_transit(transfer.id(), actor).await.unwrap();
        h.workflow.complete(transfer.id(), actor).await.unwrap();

        assert_eq!(
            h.animals.completions(),
            vec![(animal_id, TransferDirection::Outbound)]
        );
        assert_eq!(
            h.events.published(),
            vec![
                "TransferRequested",
                "TransferApproved",
                "TransferTransitStarted",
                "TransferCompleted",
            ]
        );
    }

    #[tokio::test]
    async fn test_animal_notification_failure_does_not_fail_completion() {
        let transfers = Arc::new(InMemoryTransferRepository::new());
        let capacity = Arc::new(InMemoryCapacityTracker::new());
        let audit = Arc::new(RecordingAuditLog::new());
        let events = Arc::new(MockEventPublisher::new());
        let intents = Arc::new(InMemoryIntentLog::new());

        let animal_id = AnimalId::new();
        let mut gateway = MockAnimalGateway::new();
        gateway
            .expect_ensure_exists()
            .with(eq(animal_id))
            .returning(|_| Ok(()));
        gateway
            .expect_transfer_completed()
            .returning(|_, _| {
                Err(DomainError::ExternalServiceError {
                    service: "AnimalRegistry".to_string(),
                    message: "unreachable".to_string(),
                })
            });

        let workflow = TransferWorkflow::new(
            transfers,
            capacity.clone(),
            Arc::new(gateway),
            audit,
            events,
            intents,
        );

        let partner_id = PartnerId::new();
        capacity
            .register(PartnerCapacity::new(partner_id, 5, true))
            .await
            .unwrap();
        let actor = StaffId::new();
        let transfer = workflow
            .create(CreateTransferRequest {
                animal_id,
                partner_id,
                direction: TransferDirection::Outbound,
                reason: TransferReason::Adoption,
                reason_details: None,
                requested_by: actor,
            })
            .await
            .unwrap();
        workflow.approve(transfer.id(), actor).await.unwrap();
        workflow.start_transit(transfer.id(), actor).await.unwrap();

        let completed = workflow.complete(transfer.id(), actor).await.unwrap();
        assert_eq!(completed.status(), TransferStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancel_from_pending_has_no_capacity_effect() {
        let h = harness();
        let request = seeded_request(&h, TransferDirection::Outbound).await;
        let partner_id = request.partner_id;
        let transfer = h.workflow.create(request).await.unwrap();

        h.workflow
            .cancel(transfer.id(), "request withdrawn", StaffId::new())
            .await
            .unwrap();

        assert_eq!(h.capacity.get(partner_id).await.unwrap().current_capacity(), 0);
    }

    #[tokio::test]
    async fn test_cancel_inbound_after_approval_keeps_partner_counts() {
        // An inbound approval reserved nothing, so cancellation releases
        // nothing either.
        let h = harness();
        let request = seeded_request(&h, TransferDirection::Inbound).await;
        let partner_id = request.partner_id;
        h.capacity.set_capacity(partner_id, 3).await.unwrap();
        let transfer = h.workflow.create(request).await.unwrap();
        let actor = StaffId::new();

        h.workflow.approve(transfer.id(), actor).await.unwrap();
        h.workflow
            .cancel(transfer.id(), "partner keeps the animal", actor)
            .await
            .unwrap();

        assert_eq!(h.capacity.get(partner_id).await.unwrap().current_capacity(), 3);
    }

    #[tokio::test]
    async fn test_schedule_same_date_twice_preserves_record() {
        let h = harness();
        let request = seeded_request(&h, TransferDirection::Outbound).await;
        let transfer = h.workflow.create(request).await.unwrap();
        let actor = StaffId::new();
        let date = Utc::now() + chrono::Duration::days(5);

        let first = h.workflow.schedule(transfer.id(), date, actor).await.unwrap();
        let second = h.workflow.schedule(transfer.id(), date, actor).await.unwrap();

        assert_eq!(first.scheduled_date(), second.scheduled_date());
        assert_eq!(first.version(), second.version());
        assert_eq!(first.updated_at(), second.updated_at());
    }
}
