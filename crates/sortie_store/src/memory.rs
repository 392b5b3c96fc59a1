//! In-memory store implementation.
//!
//! Locks are always taken in the order users → events → conversations, and
//! compound operations hold every write lock they need for their whole
//! duration.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use entities::{Conversation, ConversationScope, Event, Message, Review, User};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{ConversationFilter, EventFilter, SortieStore, StoreError, StoreResult};

/// Conversations indexed by id and by uniqueness key.
#[derive(Debug, Default)]
struct ConversationIndex {
    by_id: HashMap<Uuid, Conversation>,
    by_key: HashMap<(Uuid, ConversationScope), Uuid>,
}

impl ConversationIndex {
    /// Returns the id of the conversation sharing `conversation`'s key,
    /// inserting `conversation` first if the key is free.
    fn get_or_insert(&mut self, conversation: Conversation) -> Uuid {
        let key = (conversation.event_id, conversation.scope);
        if let Some(id) = self.by_key.get(&key) {
            return *id;
        }
        let id = conversation.id;
        self.by_key.insert(key, id);
        self.by_id.insert(id, conversation);
        id
    }

    fn get_mut(&mut self, id: Uuid) -> StoreResult<&mut Conversation> {
        self.by_id
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Conversation", id))
    }
}

/// In-memory store, used when no database is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    events: Arc<RwLock<HashMap<Uuid, Event>>>,
    conversations: Arc<RwLock<ConversationIndex>>,
}

impl MemoryStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Fills the denormalized activity lists of `user` from the event registry.
fn with_activities(mut user: User, events: &HashMap<Uuid, Event>) -> User {
    let mut proposed: Vec<&Event> = events.values().filter(|e| e.is_owner(user.id)).collect();
    let mut reserved: Vec<&Event> = events
        .values()
        .filter(|e| !e.is_owner(user.id) && e.is_participant(user.id))
        .collect();
    proposed.sort_by_key(|e| e.created_at);
    reserved.sort_by_key(|e| e.created_at);

    user.proposed_activities = proposed.iter().map(|e| e.id).collect();
    user.reserved_activities = reserved.iter().map(|e| e.id).collect();
    user
}

fn check_unique_identity(users: &HashMap<Uuid, User>, candidate: &User) -> StoreResult<()> {
    for other in users.values().filter(|u| u.id != candidate.id) {
        if other.email == candidate.email {
            return Err(StoreError::already_exists("User", "email"));
        }
        if other.username == candidate.username {
            return Err(StoreError::already_exists("User", "username"));
        }
    }
    Ok(())
}

#[async_trait]
impl SortieStore for MemoryStore {
    // =========================================================================
    // User operations
    // =========================================================================

    async fn create_user(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(StoreError::already_exists("User", "id"));
        }
        check_unique_identity(&users, &user)?;
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        let events = self.events.read().await;
        Ok(users.get(&id).cloned().map(|u| with_activities(u, &events)))
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        let events = self.events.read().await;
        Ok(users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .map(|u| with_activities(u, &events)))
    }

    async fn get_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn update_user(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        let events = self.events.read().await;
        let stored = users
            .get(&user.id)
            .ok_or_else(|| StoreError::not_found("User", user.id))?;
        check_unique_identity(&users, &user)?;

        let updated = User {
            reviews_received: stored.reviews_received.clone(),
            created_at: stored.created_at,
            updated_at: Utc::now(),
            ..user
        };
        users.insert(updated.id, updated.clone());
        Ok(with_activities(updated, &events))
    }

    async fn add_review(&self, user_id: Uuid, review: Review) -> StoreResult<User> {
        let mut users = self.users.write().await;
        let events = self.events.read().await;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::not_found("User", user_id))?;
        user.reviews_received.push(review);
        user.updated_at = Utc::now();
        Ok(with_activities(user.clone(), &events))
    }

    // =========================================================================
    // Event operations
    // =========================================================================

    async fn create_event(&self, mut event: Event) -> StoreResult<(Event, Conversation)> {
        let mut events = self.events.write().await;
        let mut conversations = self.conversations.write().await;
        if events.contains_key(&event.id) {
            return Err(StoreError::already_exists("Event", "id"));
        }
        if !event.is_participant(event.created_by) {
            event.participants.insert(0, event.created_by);
        }

        let conversation_id =
            conversations.get_or_insert(Conversation::for_event(event.id, event.created_by));
        let conversation = conversations.get_mut(conversation_id)?.clone();
        event.conversation_id = Some(conversation.id);
        events.insert(event.id, event.clone());

        Ok((event, conversation))
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let events = self.events.read().await;
        Ok(events.get(&id).cloned())
    }

    async fn get_events(&self, ids: &[Uuid]) -> StoreResult<Vec<Event>> {
        let events = self.events.read().await;
        Ok(ids.iter().filter_map(|id| events.get(id).cloned()).collect())
    }

    async fn list_events(&self, filter: EventFilter) -> StoreResult<Vec<Event>> {
        let events = self.events.read().await;
        let mut result: Vec<Event> = events
            .values()
            .filter(|e| {
                filter.category.is_none_or(|c| e.category == c)
                    && filter.created_by.is_none_or(|owner| e.created_by == owner)
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
        Ok(result)
    }

    async fn update_event(&self, event: Event) -> StoreResult<Event> {
        let mut events = self.events.write().await;
        let stored = events
            .get_mut(&event.id)
            .ok_or_else(|| StoreError::not_found("Event", event.id))?;
        if (event.max_participants as usize) < stored.participants.len() {
            return Err(StoreError::CapacityTooLow {
                capacity: event.max_participants,
                participants: stored.participants.len(),
            });
        }

        stored.title = event.title;
        stored.description = event.description;
        stored.location = event.location;
        stored.date = event.date;
        stored.category = event.category;
        stored.max_participants = event.max_participants;
        stored.photos = event.photos;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<()> {
        let mut events = self.events.write().await;
        if events.remove(&id).is_none() {
            return Err(StoreError::not_found("Event", id));
        }
        Ok(())
    }

    async fn join_event(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<(Event, Conversation)> {
        let mut events = self.events.write().await;
        let mut conversations = self.conversations.write().await;
        let event = events
            .get_mut(&event_id)
            .ok_or_else(|| StoreError::not_found("Event", event_id))?;
        if event.is_participant(user_id) {
            return Err(StoreError::AlreadyParticipant { event_id, user_id });
        }
        if event.is_full() {
            return Err(StoreError::EventFull { event_id });
        }

        let conversation_id = match event
            .conversation_id
            .filter(|id| conversations.by_id.contains_key(id))
        {
            Some(id) => id,
            None => {
                tracing::warn!(event_id = %event_id, "Event had no conversation, creating one");
                conversations.get_or_insert(Conversation::for_event(event_id, event.created_by))
            }
        };
        let conversation = conversations.get_mut(conversation_id)?;
        conversation.add_participant(user_id);

        event.conversation_id = Some(conversation_id);
        event.participants.push(user_id);
        event.updated_at = Utc::now();

        Ok((event.clone(), conversation.clone()))
    }

    async fn leave_event(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        leave_conversation: bool,
    ) -> StoreResult<Event> {
        let mut events = self.events.write().await;
        let mut conversations = self.conversations.write().await;
        let event = events
            .get_mut(&event_id)
            .ok_or_else(|| StoreError::not_found("Event", event_id))?;
        if !event.is_participant(user_id) {
            return Err(StoreError::NotParticipant {
                entity_type: "Event",
                id: event_id,
                user_id,
            });
        }

        event.participants.retain(|p| *p != user_id);
        event.updated_at = Utc::now();

        if leave_conversation {
            if let Some(conversation) = event
                .conversation_id
                .and_then(|id| conversations.by_id.get_mut(&id))
            {
                conversation.remove_participant(user_id);
            }
        }

        Ok(event.clone())
    }

    // =========================================================================
    // Conversation operations
    // =========================================================================

    async fn get_or_create_conversation(
        &self,
        conversation: Conversation,
    ) -> StoreResult<Conversation> {
        let mut conversations = self.conversations.write().await;
        let id = conversations.get_or_insert(conversation);
        Ok(conversations.get_mut(id)?.clone())
    }

    async fn get_conversation(&self, id: Uuid) -> StoreResult<Option<Conversation>> {
        let conversations = self.conversations.read().await;
        Ok(conversations.by_id.get(&id).cloned())
    }

    async fn list_conversations(
        &self,
        filter: ConversationFilter,
    ) -> StoreResult<Vec<Conversation>> {
        let conversations = self.conversations.read().await;
        let mut result: Vec<Conversation> = conversations
            .by_id
            .values()
            .filter(|c| {
                filter.participant_id.is_none_or(|user| c.is_participant(user))
                    && filter.event_id.is_none_or(|event| c.event_id == event)
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(result)
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender: Uuid,
        content: String,
    ) -> StoreResult<Message> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations.get_mut(conversation_id)?;
        if !conversation.is_participant(sender) {
            return Err(StoreError::NotParticipant {
                entity_type: "Conversation",
                id: conversation_id,
                user_id: sender,
            });
        }
        Ok(conversation.append_message(sender, content).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract;

    #[tokio::test]
    async fn test_user_crud() {
        contract::user_crud(MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_duplicate_identity_rejected() {
        contract::duplicate_identity_rejected(MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_reviews_and_activities() {
        contract::reviews_and_activities(MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_create_event_links_conversation() {
        contract::create_event_links_conversation(MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_join_enrolls_in_conversation() {
        contract::join_enrolls_in_conversation(MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_join_rejects_when_full() {
        contract::join_rejects_when_full(MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_join_rejects_duplicate() {
        contract::join_rejects_duplicate(MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_leave_policies() {
        contract::leave_policies(MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_leave_without_joining() {
        contract::leave_without_joining(MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_update_and_delete_event() {
        contract::update_and_delete_event(MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_list_events_by_category() {
        contract::list_events_by_category(MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        contract::get_or_create_is_idempotent(MemoryStore::new()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_create_yields_one_conversation() {
        contract::concurrent_create_yields_one_conversation(Arc::new(MemoryStore::new())).await;
    }

    #[tokio::test]
    async fn test_append_requires_participant() {
        contract::append_requires_participant(MemoryStore::new()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_respect_capacity() {
        contract::concurrent_joins_respect_capacity(Arc::new(MemoryStore::new())).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_are_all_kept() {
        contract::concurrent_appends_are_all_kept(Arc::new(MemoryStore::new())).await;
    }

    #[tokio::test]
    async fn test_list_conversations_for_participant() {
        contract::list_conversations_for_participant(MemoryStore::new()).await;
    }
}
