//! Resolution of stored entities into API views.
//!
//! Entities only store ids; usernames, emails and event titles are looked up
//! here, once per response, with batched store reads.

use std::collections::{HashMap, HashSet};

use api_protocol::{
    ConversationView, EventSummary, EventView, MessageView, UNKNOWN_USERNAME, UserRef, UserSummary,
};
use entities::{Conversation, Event, Message, User};
use sortie_store::SortieStore;
use uuid::Uuid;

use crate::error::{ServerError, ServerResult};

/// Users loaded for one response, keyed by id.
struct UserDirectory(HashMap<Uuid, User>);

impl UserDirectory {
    async fn load<S: SortieStore>(store: &S, mut ids: Vec<Uuid>) -> ServerResult<Self> {
        let mut seen = HashSet::new();
        ids.retain(|id| seen.insert(*id));
        let users = store.get_users(&ids).await?;
        Ok(Self(users.into_iter().map(|u| (u.id, u)).collect()))
    }

    fn reference(&self, id: Uuid) -> UserRef {
        self.0.get(&id).map(UserRef::from).unwrap_or_else(|| UserRef::unknown(id))
    }

    fn summary(&self, id: Uuid) -> UserSummary {
        self.0.get(&id).map(UserSummary::from).unwrap_or_else(|| UserSummary {
            id,
            username: UNKNOWN_USERNAME.to_string(),
            email: String::new(),
        })
    }
}

fn build_event_view(event: Event, users: &UserDirectory) -> EventView {
    EventView {
        id: event.id,
        created_by: users.reference(event.created_by),
        title: event.title,
        description: event.description,
        location: event.location,
        date: event.date,
        category: event.category,
        participants: event.participants,
        max_participants: event.max_participants,
        photos: event.photos,
        conversation_id: event.conversation_id,
        created_at: event.created_at,
        updated_at: event.updated_at,
    }
}

fn build_message_view(message: &Message, users: &UserDirectory) -> MessageView {
    MessageView {
        id: message.id,
        sender: users.reference(message.sender),
        content: message.content.clone(),
        timestamp: message.timestamp,
    }
}

fn build_conversation_view(
    conversation: &Conversation,
    users: &UserDirectory,
    events: &HashMap<Uuid, EventSummary>,
) -> ConversationView {
    ConversationView {
        id: conversation.id,
        event_id: conversation.event_id,
        event: events.get(&conversation.event_id).cloned(),
        scope: conversation.scope,
        participants: conversation
            .participants
            .iter()
            .map(|id| users.summary(*id))
            .collect(),
        messages: conversation
            .messages()
            .iter()
            .map(|m| build_message_view(m, users))
            .collect(),
        last_updated: conversation.last_updated,
        created_at: conversation.created_at,
    }
}

/// Resolves one event.
pub async fn event_view<S: SortieStore>(store: &S, event: Event) -> ServerResult<EventView> {
    let users = UserDirectory::load(store, vec![event.created_by]).await?;
    Ok(build_event_view(event, &users))
}

/// Resolves a list of events, keeping their order.
pub async fn event_views<S: SortieStore>(
    store: &S,
    events: Vec<Event>,
) -> ServerResult<Vec<EventView>> {
    let users = UserDirectory::load(store, events.iter().map(|e| e.created_by).collect()).await?;
    Ok(events
        .into_iter()
        .map(|e| build_event_view(e, &users))
        .collect())
}

/// Resolves one message.
pub async fn message_view<S: SortieStore>(
    store: &S,
    message: &Message,
) -> ServerResult<MessageView> {
    let users = UserDirectory::load(store, vec![message.sender]).await?;
    Ok(build_message_view(message, &users))
}

/// Resolves one conversation.
pub async fn conversation_view<S: SortieStore>(
    store: &S,
    conversation: &Conversation,
) -> ServerResult<ConversationView> {
    conversation_views(store, std::slice::from_ref(conversation))
        .await?
        .pop()
        .ok_or_else(|| ServerError::Internal("conversation view not resolved".to_string()))
}

/// Resolves a list of conversations, keeping their order.
pub async fn conversation_views<S: SortieStore>(
    store: &S,
    conversations: &[Conversation],
) -> ServerResult<Vec<ConversationView>> {
    let mut user_ids = Vec::new();
    for conversation in conversations {
        user_ids.extend(conversation.participants.iter().copied());
        user_ids.extend(conversation.messages().iter().map(|m| m.sender));
    }
    let users = UserDirectory::load(store, user_ids).await?;

    let mut seen = HashSet::new();
    let event_ids: Vec<Uuid> = conversations
        .iter()
        .map(|c| c.event_id)
        .filter(|id| seen.insert(*id))
        .collect();
    let events: HashMap<Uuid, EventSummary> = store
        .get_events(&event_ids)
        .await?
        .into_iter()
        .map(|e| {
            (
                e.id,
                EventSummary {
                    id: e.id,
                    title: e.title,
                    category: e.category,
                },
            )
        })
        .collect();

    Ok(conversations
        .iter()
        .map(|c| build_conversation_view(c, &users, &events))
        .collect())
}
