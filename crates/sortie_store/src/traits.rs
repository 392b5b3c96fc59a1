//! Store trait definitions.

use async_trait::async_trait;
use entities::{Conversation, Event, EventCategory, Message, Review, User};
use uuid::Uuid;

use crate::StoreResult;

/// Filter options for listing events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Filter by category.
    pub category: Option<EventCategory>,
    /// Filter by owner.
    pub created_by: Option<Uuid>,
}

/// Filter options for listing conversations.
#[derive(Debug, Clone, Default)]
pub struct ConversationFilter {
    /// Only conversations this user participates in.
    pub participant_id: Option<Uuid>,
    /// Only conversations of this event.
    pub event_id: Option<Uuid>,
}

/// Trait for storage operations.
///
/// Every method is a single atomic step: compound operations such as
/// [`SortieStore::join_event`] never leave a partially applied state behind,
/// and concurrent callers observe them in some serial order.
#[async_trait]
pub trait SortieStore: Send + Sync {
    // =========================================================================
    // User operations
    // =========================================================================

    /// Creates a new user. Fails with `AlreadyExists` if the email or the
    /// username is taken.
    async fn create_user(&self, user: User) -> StoreResult<User>;

    /// Gets a user by ID, with activities filled in.
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Gets a user by (lowercase) email.
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Gets the users with the given IDs, in the given order. Unknown IDs are
    /// skipped and activities are left empty.
    async fn get_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    /// Updates the profile fields and credentials of a user.
    async fn update_user(&self, user: User) -> StoreResult<User>;

    /// Appends a review to a user's received reviews.
    async fn add_review(&self, user_id: Uuid, review: Review) -> StoreResult<User>;

    // =========================================================================
    // Event operations
    // =========================================================================

    /// Stores a new event together with its event-wide conversation, and links
    /// the two through `Event::conversation_id`.
    async fn create_event(&self, event: Event) -> StoreResult<(Event, Conversation)>;

    /// Gets an event by ID.
    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>>;

    /// Gets the events with the given IDs, in the given order. Unknown IDs are
    /// skipped.
    async fn get_events(&self, ids: &[Uuid]) -> StoreResult<Vec<Event>>;

    /// Lists events sorted by date, soonest first.
    async fn list_events(&self, filter: EventFilter) -> StoreResult<Vec<Event>>;

    /// Updates the editable fields of an event. Owner, participants and
    /// conversation link are kept from the stored record.
    async fn update_event(&self, event: Event) -> StoreResult<Event>;

    /// Deletes an event. Its conversation is kept.
    async fn delete_event(&self, id: Uuid) -> StoreResult<()>;

    /// Enrolls a user in an event and in the event's conversation, creating
    /// the conversation if the event has none yet.
    async fn join_event(&self, event_id: Uuid, user_id: Uuid)
        -> StoreResult<(Event, Conversation)>;

    /// Removes a user from an event, and from its conversation when
    /// `leave_conversation` is set.
    async fn leave_event(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        leave_conversation: bool,
    ) -> StoreResult<Event>;

    // =========================================================================
    // Conversation operations
    // =========================================================================

    /// Returns the conversation with the same event and scope as
    /// `conversation`, inserting `conversation` if there is none.
    ///
    /// Concurrent calls with the same key all return the same record.
    async fn get_or_create_conversation(
        &self,
        conversation: Conversation,
    ) -> StoreResult<Conversation>;

    /// Gets a conversation by ID, with its full message log.
    async fn get_conversation(&self, id: Uuid) -> StoreResult<Option<Conversation>>;

    /// Lists conversations, most recently updated first.
    async fn list_conversations(
        &self,
        filter: ConversationFilter,
    ) -> StoreResult<Vec<Conversation>>;

    /// Appends a message to a conversation the sender participates in, and
    /// bumps its `last_updated`.
    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender: Uuid,
        content: String,
    ) -> StoreResult<Message>;
}
