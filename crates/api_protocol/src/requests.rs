//! API request types.
//!
//! Required fields are still `Option`s so that a missing field is reported
//! by the handler with a readable message instead of a decoder error.

use chrono::{DateTime, Utc};
use entities::Location;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Auth Requests
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(alias = "currentPassword")]
    pub current_password: Option<String>,
    #[serde(alias = "newPassword")]
    pub new_password: Option<String>,
}

// ============================================================================
// User Requests
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateUserRequest {
    pub rating: Option<i64>,
}

// ============================================================================
// Event Requests
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<Location>,
    pub date: Option<DateTime<Utc>>,
    pub category: Option<String>,
    #[serde(alias = "maxParticipants")]
    pub max_participants: Option<i64>,
    #[serde(default)]
    pub photos: Vec<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<Location>,
    pub date: Option<DateTime<Utc>>,
    pub category: Option<String>,
    #[serde(alias = "maxParticipants")]
    pub max_participants: Option<i64>,
    pub photos: Option<Vec<String>>,
}

/// Query string of `GET /events` and `GET /conversations/my-conversations`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

// ============================================================================
// Conversation Requests
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateConversationRequest {
    #[serde(alias = "recipientId")]
    pub recipient_id: Option<Uuid>,
    #[serde(alias = "eventId")]
    pub event_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostMessageRequest {
    pub content: Option<String>,
}

// ============================================================================
// Integration Requests
// ============================================================================

/// Query string of `GET /places/restaurants`. Parsed by the handler so that
/// bad coordinates get a readable message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacesQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}
