//! Store error types.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// A uniqueness constraint was violated.
    #[error("{entity_type} already exists: {field}")]
    AlreadyExists {
        entity_type: &'static str,
        field: String,
    },

    /// The event has no seat left.
    #[error("Event {event_id} is full")]
    EventFull { event_id: Uuid },

    /// The user is already enrolled in the event.
    #[error("User {user_id} already participates in event {event_id}")]
    AlreadyParticipant { event_id: Uuid, user_id: Uuid },

    /// The user is not enrolled in the event or conversation.
    #[error("User {user_id} does not participate in {entity_type} {id}")]
    NotParticipant {
        entity_type: &'static str,
        id: Uuid,
        user_id: Uuid,
    },

    /// An update would leave more participants than seats.
    #[error("Capacity {capacity} is below the current {participants} participants")]
    CapacityTooLow { capacity: u32, participants: usize },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be decoded.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Creates a not found error.
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Creates an already exists error.
    pub fn already_exists(entity_type: &'static str, field: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity_type,
            field: field.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
