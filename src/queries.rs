// Copyright 2025 Cowboy AI, LLC.

//! Read-side projections over transfer records
//!
//! Operational dashboards consume these views; none of them mutate transfer
//! records or partner capacity. Filter semantics follow the workflow rules:
//! a transfer with no scheduled date is never upcoming or overdue, and only
//! completed transfers flagged for follow-up with no follow-up recorded yet
//! appear in the follow-up worklist.

use crate::entity::{AnimalId, PartnerId, StaffId, TransferId};
use crate::errors::DomainResult;
use crate::repository::{TransferFilter, TransferRepository};
use crate::transfer::{Transfer, TransferDirection, TransferReason, TransferStatus};
use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Dashboard projection of one transfer record
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TransferView {
    /// The transfer's unique identifier
    pub transfer_id: TransferId,
    /// The animal being moved
    pub animal_id: AnimalId,
    /// The partner organization involved
    pub partner_id: PartnerId,
    /// Direction of the movement
    pub direction: TransferDirection,
    /// Current lifecycle status
    pub status: TransferStatus,
    /// Coded transfer reason
    pub reason: TransferReason,
    /// Free-text reason details, if any
    pub reason_details: Option<String>,
    /// Scheduled movement date, if set
    pub scheduled_date: Option<DateTime<Utc>>,
    /// Who requested the transfer
    pub requested_by: StaffId,
    /// Who approved the transfer, once approved
    pub approved_by: Option<StaffId>,
    /// When the transfer completed, once completed
    pub completed_at: Option<DateTime<Utc>>,
    /// Whether a follow-up check-in is required after completion
    pub follow_up_required: bool,
    /// When the record was created
    pub created_at: DateTime<Utc>,
}

impl From<&Transfer> for TransferView {
    fn from(transfer: &Transfer) -> Self {
        Self {
            transfer_id: transfer.id(),
            animal_id: transfer.animal_id(),
            partner_id: transfer.partner_id(),
            direction: transfer.direction(),
            status: transfer.status(),
            reason: transfer.reason(),
            reason_details: transfer.reason_details().map(str::to_string),
            scheduled_date: transfer.scheduled_date(),
            requested_by: transfer.requested_by(),
            approved_by: transfer.approved_by(),
            completed_at: transfer.completed_at(),
            follow_up_required: transfer.follow_up_required(),
            created_at: transfer.created_at(),
        }
    }
}

/// Read-only query service over transfer records
pub struct TransferQueries {
    transfers: Arc<dyn TransferRepository>,
}

impl TransferQueries {
    /// Create a query service over a repository
    pub fn new(transfers: Arc<dyn TransferRepository>) -> Self {
        Self { transfers }
    }

    /// Transfers awaiting an approval decision
    pub async fn pending(&self) -> DomainResult<Vec<TransferView>> {
        let filter = TransferFilter::new().with_status(TransferStatus::Pending);
        Ok(project(&self.transfers.list(&filter).await?))
    }

    /// Open transfers scheduled within the next `days` days
    pub async fn upcoming(&self, days: i64) -> DomainResult<Vec<TransferView>> {
        let now = Utc::now();
        let filter = TransferFilter::new().scheduled_between(now, now + Duration::days(days));
        let records = self.transfers.list(&filter).await?;
        Ok(project_filtered(&records, |t| {
            matches!(
                t.status(),
                TransferStatus::Pending | TransferStatus::Approved
            )
        }))
    }

    /// Open transfers whose scheduled date has passed
    ///
    /// A transfer with no scheduled date is never overdue, regardless of age.
    pub async fn overdue(&self) -> DomainResult<Vec<TransferView>> {
        let now = Utc::now();
        let records = self.transfers.list(&TransferFilter::new()).await?;
        Ok(project_filtered(&records, |t| t.is_overdue(now)))
    }

    /// Completed transfers flagged for follow-up with none recorded yet
    pub async fn requiring_follow_up(&self) -> DomainResult<Vec<TransferView>> {
        let filter = TransferFilter::new().with_status(TransferStatus::Completed);
        let records = self.transfers.list(&filter).await?;
        Ok(project_filtered(&records, Transfer::awaits_follow_up))
    }

    /// All transfers for one animal
    pub async fn by_animal(&self, animal_id: AnimalId) -> DomainResult<Vec<TransferView>> {
        let filter = TransferFilter::new().with_animal(animal_id);
        Ok(project(&self.transfers.list(&filter).await?))
    }

    /// All transfers involving one partner
    pub async fn by_partner(&self, partner_id: PartnerId) -> DomainResult<Vec<TransferView>> {
        let filter = TransferFilter::new().with_partner(partner_id);
        Ok(project(&self.transfers.list(&filter).await?))
    }

    /// All transfers in one lifecycle status
    pub async fn by_status(&self, status: TransferStatus) -> DomainResult<Vec<TransferView>> {
        let filter = TransferFilter::new().with_status(status);
        Ok(project(&self.transfers.list(&filter).await?))
    }
}

fn project(records: &[Transfer]) -> Vec<TransferView> {
    records.iter().map(TransferView::from).collect()
}

fn project_filtered(records: &[Transfer], keep: impl Fn(&Transfer) -> bool) -> Vec<TransferView> {
    records
        .iter()
        .filter(|t| keep(t))
        .map(TransferView::from)
        .collect()
}
