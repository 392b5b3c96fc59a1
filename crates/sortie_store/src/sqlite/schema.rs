use chrono::{DateTime, SecondsFormat, Utc};
use entities::{
    Conversation, ConversationScope, Event, EventCategory, Location, Message, Review, User,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{StoreError, StoreResult};

/// SQL schema definition
pub(crate) const SCHEMA_SQL: &str = r#"
-- Users table
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    photo TEXT NOT NULL,
    bio TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Reviews received by users (append-only)
CREATE TABLE IF NOT EXISTS user_reviews (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    reviewer_id TEXT NOT NULL,
    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    created_at TEXT NOT NULL
);

-- Events table
CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    date TEXT NOT NULL,
    category TEXT NOT NULL,
    created_by TEXT NOT NULL,
    max_participants INTEGER NOT NULL CHECK (max_participants >= 1),
    photos TEXT NOT NULL DEFAULT '[]',  -- JSON array of URLs
    conversation_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Event participants, in join order (rowid)
CREATE TABLE IF NOT EXISTS event_participants (
    event_id TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    PRIMARY KEY (event_id, user_id)
);

-- Conversations table; one row per (event, scope)
CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY NOT NULL,
    event_id TEXT NOT NULL,
    scope_key TEXT NOT NULL,
    last_updated TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (event_id, scope_key)
);

-- Conversation participants, in enrollment order (rowid)
CREATE TABLE IF NOT EXISTS conversation_participants (
    conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    PRIMARY KEY (conversation_id, user_id)
);

-- Messages table; seq is the position in the log
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY NOT NULL,
    conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
    seq INTEGER NOT NULL,
    sender TEXT NOT NULL,
    content TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    UNIQUE (conversation_id, seq)
);

CREATE INDEX IF NOT EXISTS idx_user_reviews_user ON user_reviews(user_id);
CREATE INDEX IF NOT EXISTS idx_events_date ON events(date);
CREATE INDEX IF NOT EXISTS idx_events_created_by ON events(created_by);
CREATE INDEX IF NOT EXISTS idx_event_participants_user ON event_participants(user_id);
CREATE INDEX IF NOT EXISTS idx_conversation_participants_user ON conversation_participants(user_id);
CREATE INDEX IF NOT EXISTS idx_conversations_last_updated ON conversations(last_updated);
"#;

/// Encodes a timestamp so that string order matches time order.
pub(crate) fn encode_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_time(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("invalid timestamp '{value}': {e}")))
}

pub(crate) fn decode_id(value: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| StoreError::Corrupt(format!("invalid id '{value}': {e}")))
}

pub(crate) fn decode_ids(values: Vec<String>) -> StoreResult<Vec<Uuid>> {
    values.iter().map(|v| decode_id(v)).collect()
}

/// Database row for User
#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub photo: String,
    pub bio: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRow {
    pub fn into_user(
        self,
        reviews_received: Vec<Review>,
        proposed_activities: Vec<Uuid>,
        reserved_activities: Vec<Uuid>,
    ) -> StoreResult<User> {
        Ok(User {
            id: decode_id(&self.id)?,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            photo: self.photo,
            bio: self.bio,
            reviews_received,
            proposed_activities,
            reserved_activities,
            created_at: decode_time(&self.created_at)?,
            updated_at: decode_time(&self.updated_at)?,
        })
    }
}

/// Database row for Review
#[derive(Debug, FromRow)]
pub(crate) struct ReviewRow {
    pub reviewer_id: String,
    pub rating: i64,
    pub created_at: String,
}

impl TryFrom<ReviewRow> for Review {
    type Error = StoreError;

    fn try_from(row: ReviewRow) -> StoreResult<Self> {
        let rating = u8::try_from(row.rating)
            .map_err(|_| StoreError::Corrupt(format!("invalid rating {}", row.rating)))?;
        Ok(Review {
            reviewer_id: decode_id(&row.reviewer_id)?,
            rating,
            created_at: decode_time(&row.created_at)?,
        })
    }
}

/// Database row for Event
#[derive(Debug, FromRow)]
pub(crate) struct EventRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date: String,
    pub category: String,
    pub created_by: String,
    pub max_participants: i64,
    pub photos: String,
    pub conversation_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl EventRow {
    pub fn into_event(self, participants: Vec<Uuid>) -> StoreResult<Event> {
        let category: EventCategory = self
            .category
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("{e}")))?;
        let max_participants = u32::try_from(self.max_participants).map_err(|_| {
            StoreError::Corrupt(format!("invalid capacity {}", self.max_participants))
        })?;

        Ok(Event {
            id: decode_id(&self.id)?,
            title: self.title,
            description: self.description,
            location: Location::new(self.latitude, self.longitude),
            date: decode_time(&self.date)?,
            category,
            created_by: decode_id(&self.created_by)?,
            participants,
            max_participants,
            photos: serde_json::from_str(&self.photos)?,
            conversation_id: self.conversation_id.as_deref().map(decode_id).transpose()?,
            created_at: decode_time(&self.created_at)?,
            updated_at: decode_time(&self.updated_at)?,
        })
    }
}

/// Database row for Conversation
#[derive(Debug, FromRow)]
pub(crate) struct ConversationRow {
    pub id: String,
    pub event_id: String,
    pub scope_key: String,
    pub last_updated: String,
    pub created_at: String,
}

impl ConversationRow {
    pub fn into_conversation(
        self,
        participants: Vec<Uuid>,
        messages: Vec<Message>,
    ) -> StoreResult<Conversation> {
        let scope = ConversationScope::from_key(&self.scope_key)
            .ok_or_else(|| StoreError::Corrupt(format!("invalid scope '{}'", self.scope_key)))?;
        let event_id = decode_id(&self.event_id)?;

        let mut conversation = match scope {
            ConversationScope::Event => Conversation::for_event(event_id, Uuid::nil()),
            ConversationScope::Direct { first, second } => {
                Conversation::direct(event_id, first, second)
            }
        }
        .with_message_log(messages);
        conversation.id = decode_id(&self.id)?;
        conversation.participants = participants;
        conversation.last_updated = decode_time(&self.last_updated)?;
        conversation.created_at = decode_time(&self.created_at)?;
        Ok(conversation)
    }
}

/// Database row for Message
#[derive(Debug, FromRow)]
pub(crate) struct MessageRow {
    pub id: String,
    pub sender: String,
    pub content: String,
    pub timestamp: String,
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> StoreResult<Self> {
        Ok(Message {
            id: decode_id(&row.id)?,
            sender: decode_id(&row.sender)?,
            content: row.content,
            timestamp: decode_time(&row.timestamp)?,
        })
    }
}
