//! View types returned by the API.
//!
//! Views resolve the ids stored on entities into the display data clients
//! need (usernames, event titles). Resolution happens at read time, so a
//! renamed user shows up with the new name everywhere.

use chrono::{DateTime, Utc};
use entities::{AverageRating, ConversationScope, EventCategory, Location, Review, User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display name used when a referenced user cannot be found.
pub const UNKNOWN_USERNAME: &str = "unknown user";

/// Participant of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// Message sender or event owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
    pub username: String,
}

impl UserRef {
    /// Reference to a user that no longer resolves.
    pub fn unknown(id: Uuid) -> Self {
        Self {
            id,
            username: UNKNOWN_USERNAME.to_string(),
        }
    }
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// Parent event of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: Uuid,
    pub title: String,
    pub category: EventCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: Uuid,
    pub sender: UserRef,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationView {
    pub id: Uuid,
    pub event_id: Uuid,
    /// `None` once the parent event has been deleted.
    pub event: Option<EventSummary>,
    pub scope: ConversationScope,
    pub participants: Vec<UserSummary>,
    pub messages: Vec<MessageView>,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: Location,
    pub date: DateTime<Utc>,
    pub category: EventCategory,
    pub created_by: UserRef,
    pub participants: Vec<Uuid>,
    pub max_participants: u32,
    pub photos: Vec<String>,
    pub conversation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public profile. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub photo: String,
    pub bio: Option<String>,
    pub average_rating: AverageRating,
    pub reviews_received: Vec<Review>,
    pub proposed_activities: Vec<Uuid>,
    pub reserved_activities: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for ProfileView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            photo: user.photo.clone(),
            bio: user.bio.clone(),
            average_rating: user.average_rating(),
            reviews_received: user.reviews_received.clone(),
            proposed_activities: user.proposed_activities.clone(),
            reserved_activities: user.reserved_activities.clone(),
            created_at: user.created_at,
        }
    }
}

/// A place returned by the places search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
