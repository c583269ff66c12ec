// Copyright 2025 Cowboy AI, LLC.

//! Transfer Workflow Demo
//!
//! This demo walks a transfer through its full lifecycle, demonstrating how
//! partner capacity moves as a side effect of the transitions:
//! - An outbound transfer reserves a partner slot at approval
//! - Cancellation after approval returns the slot
//! - An inbound transfer frees a partner slot only at completion

use shelter_transfers::{
    AnimalId, CapacityTracker, CreateTransferRequest, InMemoryCapacityTracker, InMemoryIntentLog,
    InMemoryTransferRepository, MockEventPublisher, PartnerCapacity, PartnerId, RecordingAuditLog,
    StaffId, StaticAnimalDirectory, TransferDirection, TransferQueries, TransferReason,
    TransferWorkflow,
};
use chrono::{Duration, Utc};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let transfers = Arc::new(InMemoryTransferRepository::new());
    let capacity = Arc::new(InMemoryCapacityTracker::new());
    let animals = Arc::new(StaticAnimalDirectory::new());
    let audit = Arc::new(RecordingAuditLog::new());
    let workflow = TransferWorkflow::new(
        transfers.clone(),
        capacity.clone(),
        animals.clone(),
        audit.clone(),
        Arc::new(MockEventPublisher::new()),
        Arc::new(InMemoryIntentLog::new()),
    );
    let queries = TransferQueries::new(transfers);

    // A rescue partner with two free slots
    let partner_id = PartnerId::new();
    capacity
        .register(
            PartnerCapacity::new(partner_id, 5, true)
                .with_current(3)
                .unwrap(),
        )
        .await?;
    println!("=== Transfer Workflow Demo ===\n");
    println!("1. Partner registered with capacity 3/5");

    // An outbound transfer toward an adoption placement
    let animal_id = AnimalId::new();
    animals.admit(animal_id);
    let staff = StaffId::new();
    let transfer = workflow
        .create(CreateTransferRequest {
            animal_id,
            partner_id,
            direction: TransferDirection::Outbound,
            reason: TransferReason::Adoption,
            reason_details: None,
            requested_by: staff,
        })
        .await?;
    println!("\n2. Outbound transfer requested");
    println!("   Status: {:?}", transfer.status());

    workflow
        .schedule(transfer.id(), Utc::now() + Duration::days(3), staff)
        .await?;
    println!("\n3. Movement scheduled three days out");

    let approved = workflow.approve(transfer.id(), staff).await?;
    println!("\n4. Transfer approved; one slot reserved");
    println!("   Status: {:?}", approved.status());
    println!(
        "   Partner capacity: {}/5",
        capacity.get(partner_id).await?.current_capacity()
    );

    workflow.start_transit(transfer.id(), staff).await?;
    let completed = workflow.complete(transfer.id(), staff).await?;
    println!("\n5. Animal delivered; transfer complete");
    println!("   Status: {:?}", completed.status());
    println!("   Follow-up required: {}", completed.follow_up_required());
    println!(
        "   Partner capacity stays at {}/5 (the partner now cares for the animal)",
        capacity.get(partner_id).await?.current_capacity()
    );

    // An inbound transfer frees the partner's slot at completion
    let returning = AnimalId::new();
    animals.admit(returning);
    let inbound = workflow
        .create(CreateTransferRequest {
            animal_id: returning,
            partner_id,
            direction: TransferDirection::Inbound,
            reason: TransferReason::Medical,
            reason_details: None,
            requested_by: staff,
        })
        .await?;
    workflow.approve(inbound.id(), staff).await?;
    workflow.start_transit(inbound.id(), staff).await?;
    workflow.complete(inbound.id(), staff).await?;
    println!("\n6. Inbound medical transfer completed");
    println!(
        "   Partner capacity: {}/5 (their held animal left for the shelter)",
        capacity.get(partner_id).await?.current_capacity()
    );

    let follow_ups = queries.requiring_follow_up().await?;
    println!("\n7. Follow-up worklist has {} entry", follow_ups.len());

    println!("\n8. Audit trail:");
    for entry in audit.entries() {
        println!("   {} {} {}", entry.action, entry.entity_type, entry.entity_id);
    }

    Ok(())
}
