// Copyright 2025 Cowboy AI, LLC.

//! Typed identities for the transfer domain
//!
//! Every reference that crosses an aggregate boundary is a phantom-typed
//! `EntityId<T>`, so an animal id can never be handed to an API expecting a
//! partner id. The marker types carry no data; they exist only to make the
//! ids distinct at compile time.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

/// A typed entity ID using phantom types for type safety
///
/// IDs are globally unique and persistent. The phantom type parameter
/// ensures that IDs for different entity types cannot be mixed up at
/// compile time.
///
/// # Examples
///
/// ```rust
/// use shelter_transfers::{AnimalId, PartnerId};
///
/// let animal_id = AnimalId::new();
/// let partner_id = PartnerId::new();
///
/// // These are different types - won't compile if mixed up:
/// // let _: AnimalId = partner_id; // ERROR!
/// # let _ = (animal_id, partner_id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId<T> {
    id: Uuid,
    #[serde(skip)]
    _phantom: PhantomData<T>,
}

impl<T> EntityId<T> {
    /// Create a new random entity ID
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            _phantom: PhantomData,
        }
    }

    /// Create an entity ID from a UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.id
    }
}

impl<T> fmt::Display for EntityId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<T> Default for EntityId<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<EntityId<T>> for Uuid {
    fn from(id: EntityId<T>) -> Self {
        id.id
    }
}

impl<T> From<&EntityId<T>> for Uuid {
    fn from(id: &EntityId<T>) -> Self {
        id.id
    }
}

// The phantom parameter contributes nothing to the wire shape, so every
// EntityId<T> shares the plain UUID schema.
impl<T> JsonSchema for EntityId<T> {
    fn schema_name() -> String {
        "EntityId".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        <Uuid as JsonSchema>::json_schema(gen)
    }
}

/// Trait for aggregate roots with optimistic-concurrency versions
///
/// All changes to an aggregate go through its root, and every applied
/// change increments the version. Repositories use the version as the
/// conditional-update token that guards against lost updates.
pub trait AggregateRoot: Sized {
    /// The type of ID for this aggregate
    type Id: Copy + Eq + Send + Sync;

    /// Get the aggregate's ID
    fn id(&self) -> Self::Id;

    /// Get the aggregate's version for optimistic concurrency
    fn version(&self) -> u64;

    /// Increment the version
    fn increment_version(&mut self);
}

// Marker types for entity IDs

/// Marker for transfer records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferMarker;

/// Marker for partner organizations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartnerMarker;

/// Marker for animal records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimalMarker;

/// Marker for staff identities resolved by the external auth layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaffMarker;

/// Identifier of a transfer record
pub type TransferId = EntityId<TransferMarker>;

/// Identifier of a partner organization
pub type PartnerId = EntityId<PartnerMarker>;

/// Identifier of an animal record
pub type AnimalId = EntityId<AnimalMarker>;

/// Opaque identity reference for a staff member or system actor
pub type StaffId = EntityId<StaffMarker>;
