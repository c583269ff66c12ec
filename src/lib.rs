// Copyright 2025 Cowboy AI, LLC.

//! # Shelter Transfers
//!
//! Animal transfer management for shelter operations: the workflow that
//! moves an animal between the shelter and partner organizations (rescues,
//! other shelters, foster networks) through approval, scheduling, transit,
//! and completion, with partner intake capacity tracked as a side effect of
//! the transitions.
//!
//! The crate provides:
//! - **Transfer**: the aggregate whose lifecycle is a closed state machine
//!   (`Pending → Approved → InTransit → Completed`, with `Rejected` and
//!   `Cancelled` as the other terminal states)
//! - **Partner capacity tracking**: reservations taken at approval for
//!   outbound moves, released on cancellation or inbound completion, with
//!   the `0 ≤ current ≤ max` invariant held under concurrency
//! - **Workflow engine**: the single writer; validates transitions, drives
//!   capacity side effects, and emits audit entries and domain events
//!   through injected collaborator ports
//! - **Query service**: read-only dashboard views (pending, upcoming,
//!   overdue, follow-up worklists, and by-animal/partner/status lookups)
//!
//! ## Design Principles
//!
//! 1. **Type Safety**: phantom-typed ids; closed status enums so illegal
//!    values cannot be constructed
//! 2. **One transition table**: the state machine match is the single source
//!    of truth for legal edges
//! 3. **Injected collaborators**: audit, animal status, and event fan-out
//!    are ports, so the engine is testable in isolation with fakes
//! 4. **Recoverable side effects**: every capacity write is bracketed by an
//!    intent record, so the two-write transition is crash-recoverable

#![warn(missing_docs)]

mod capacity;
mod entity;
mod errors;
mod events;
mod intent_log;
mod queries;
mod repository;
mod state_machine;
mod transfer;
mod workflow;

// Re-export core types
pub use capacity::{CapacityTracker, InMemoryCapacityTracker, PartnerCapacity};
pub use entity::{
    AggregateRoot, AnimalId, AnimalMarker, EntityId, PartnerId, PartnerMarker, StaffId,
    StaffMarker, TransferId, TransferMarker,
};
pub use errors::{DomainError, DomainResult};
pub use events::{
    DomainEvent, TransferApproved, TransferCancelled, TransferCompleted, TransferEvent,
    TransferRejected, TransferRequested, TransferScheduled, TransferTransitStarted,
};
pub use intent_log::{
    CapacityAction, InMemoryIntentLog, IntentLog, IntentState, TransitionIntent,
};
pub use queries::{TransferQueries, TransferView};
pub use repository::{InMemoryTransferRepository, TransferFilter, TransferRepository};
pub use state_machine::{ensure_transition, State, StateTransitions};
pub use transfer::{Transfer, TransferDirection, TransferReason, TransferStatus};
pub use workflow::{
    AnimalStatusGateway, AuditEntry, AuditLog, CreateTransferRequest, EventPublisher,
    MockEventPublisher, RecordingAuditLog, StaticAnimalDirectory, TransferWorkflow,
};
