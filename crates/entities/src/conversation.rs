//! Conversation and message entity definitions.
//!
//! A [`Conversation`] is always scoped to one event and owns its message log.
//! Messages are value records: they can only be appended through
//! [`Conversation::append_message`] and are never edited or removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which participants a conversation is meant for.
///
/// Together with the event id, the scope forms the conversation's uniqueness
/// key: one event-wide conversation per event, and one direct conversation
/// per event and unordered pair of users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationScope {
    /// The group conversation of an event.
    Event,
    /// A conversation opened between two users around an event.
    /// `first <= second` always holds.
    Direct { first: Uuid, second: Uuid },
}

impl ConversationScope {
    const EVENT_KEY: &'static str = "event";
    const DIRECT_PREFIX: &'static str = "direct:";

    /// Builds a direct scope. The pair is stored sorted, so argument order
    /// does not matter.
    pub fn direct(a: Uuid, b: Uuid) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self::Direct { first, second }
    }

    /// Canonical string used by storage backends for the uniqueness index.
    pub fn key(&self) -> String {
        match self {
            Self::Event => Self::EVENT_KEY.to_string(),
            Self::Direct { first, second } => {
                format!("{}{}:{}", Self::DIRECT_PREFIX, first, second)
            }
        }
    }

    /// Parses a key produced by [`ConversationScope::key`].
    pub fn from_key(key: &str) -> Option<Self> {
        if key == Self::EVENT_KEY {
            return Some(Self::Event);
        }
        let pair = key.strip_prefix(Self::DIRECT_PREFIX)?;
        let (a, b) = pair.split_once(':')?;
        Some(Self::direct(a.parse().ok()?, b.parse().ok()?))
    }
}

/// One message in a conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique within the owning conversation.
    pub id: Uuid,
    /// Author.
    pub sender: Uuid,
    /// Non-empty text.
    pub content: String,
    /// Append time. Non-decreasing along the log.
    pub timestamp: DateTime<Utc>,
}

/// An event-scoped chat with an append-only message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique identifier.
    pub id: Uuid,
    /// Parent event. Never changes.
    pub event_id: Uuid,
    /// Intended audience.
    pub scope: ConversationScope,
    /// Members in enrollment order.
    pub participants: Vec<Uuid>,
    messages: Vec<Message>,
    /// Time of the last append, or of creation.
    pub last_updated: DateTime<Utc>,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    fn new(event_id: Uuid, scope: ConversationScope, participants: Vec<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            event_id,
            scope,
            participants,
            messages: Vec::new(),
            last_updated: now,
            created_at: now,
        }
    }

    /// Creates the group conversation of an event, with its creator enrolled.
    pub fn for_event(event_id: Uuid, creator: Uuid) -> Self {
        Self::new(event_id, ConversationScope::Event, vec![creator])
    }

    /// Creates a direct conversation between `initiator` and `recipient`.
    pub fn direct(event_id: Uuid, initiator: Uuid, recipient: Uuid) -> Self {
        Self::new(
            event_id,
            ConversationScope::direct(initiator, recipient),
            vec![initiator, recipient],
        )
    }

    /// Replaces the message log with one loaded from storage.
    pub fn with_message_log(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// The message log in append order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns true if `user_id` belongs to this conversation.
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participants.contains(&user_id)
    }

    /// Enrolls `user_id`. Returns false if already enrolled.
    pub fn add_participant(&mut self, user_id: Uuid) -> bool {
        if self.is_participant(user_id) {
            return false;
        }
        self.participants.push(user_id);
        true
    }

    /// Removes `user_id`. Returns false if not enrolled.
    pub fn remove_participant(&mut self, user_id: Uuid) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| *p != user_id);
        before != self.participants.len()
    }

    /// Appends a message and bumps `last_updated`.
    ///
    /// The timestamp never goes backwards along the log, even if the clock
    /// does.
    pub fn append_message(&mut self, sender: Uuid, content: impl Into<String>) -> &Message {
        let mut timestamp = Utc::now();
        if let Some(last) = self.messages.last() {
            timestamp = timestamp.max(last.timestamp);
        }
        self.messages.push(Message {
            id: Uuid::new_v4(),
            sender,
            content: content.into(),
            timestamp,
        });
        self.last_updated = timestamp;
        &self.messages[self.messages.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_scope_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(ConversationScope::direct(a, b), ConversationScope::direct(b, a));
        assert_eq!(
            ConversationScope::direct(a, b).key(),
            ConversationScope::direct(b, a).key()
        );
    }

    #[test]
    fn test_scope_key_parses_back() {
        let scope = ConversationScope::direct(Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(ConversationScope::from_key(&scope.key()), Some(scope));
        assert_eq!(ConversationScope::from_key("event"), Some(ConversationScope::Event));
        assert_eq!(ConversationScope::from_key("direct:nope"), None);
    }

    #[test]
    fn test_append_keeps_insertion_order() {
        let sender = Uuid::new_v4();
        let mut conversation = Conversation::for_event(Uuid::new_v4(), sender);

        for i in 0..5 {
            conversation.append_message(sender, format!("message {i}"));
        }

        let contents: Vec<&str> = conversation
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(
            contents,
            vec!["message 0", "message 1", "message 2", "message 3", "message 4"]
        );
        assert!(
            conversation
                .messages()
                .windows(2)
                .all(|w| w[0].timestamp <= w[1].timestamp)
        );
        assert_eq!(
            conversation.last_updated,
            conversation.messages()[4].timestamp
        );
    }

    #[test]
    fn test_participants_are_a_set() {
        let owner = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let mut conversation = Conversation::for_event(Uuid::new_v4(), owner);

        assert!(conversation.add_participant(guest));
        assert!(!conversation.add_participant(guest));
        assert_eq!(conversation.participants, vec![owner, guest]);

        assert!(conversation.remove_participant(guest));
        assert!(!conversation.remove_participant(guest));
    }

    #[test]
    fn test_direct_conversation_enrolls_both_users() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let conversation = Conversation::direct(Uuid::new_v4(), a, b);

        assert!(conversation.is_participant(a));
        assert!(conversation.is_participant(b));
        assert!(conversation.messages().is_empty());
    }
}
