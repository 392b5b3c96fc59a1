//! API response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::*;

// ============================================================================
// Auth Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: Uuid,
    pub username: String,
}

// ============================================================================
// Event Responses
// ============================================================================

/// Returned by event creation and join: the event and its conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventWithConversation {
    pub event: EventView,
    pub conversation: ConversationView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveEventResponse {
    pub event: EventView,
}

// ============================================================================
// Common Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusMessageResponse {
    pub message: String,
}

impl StatusMessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
    pub public_id: String,
}
