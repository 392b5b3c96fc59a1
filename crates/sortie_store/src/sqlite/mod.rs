//! SQLite store implementation.
//!
//! Every compound operation runs in one transaction whose first statement is
//! a write, so the database write lock is held from the start and concurrent
//! callers are serialized.

mod schema;

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use entities::{Conversation, Event, Message, Review, User};
use schema::*;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions},
    Pool, Sqlite,
};
use uuid::Uuid;

use crate::{ConversationFilter, EventFilter, SortieStore, StoreError, StoreResult};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, photo, bio, created_at, updated_at";
const EVENT_COLUMNS: &str = "id, title, description, latitude, longitude, date, category, \
                             created_by, max_participants, photos, conversation_id, created_at, \
                             updated_at";
const CONVERSATION_COLUMNS: &str = "id, event_id, scope_key, last_updated, created_at";

/// SQLite-backed store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Connects to the database at `url`, creating it if missing, and applies
    /// the schema.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        tracing::info!(max_connections, "Connected to SQLite database");
        Ok(store)
    }

    /// Opens a private in-memory database.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        // An in-memory database lives as long as its single connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }
}

/// Current time, truncated to the stored precision.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Maps a unique constraint failure to `AlreadyExists`, naming the column.
fn unique_violation(err: sqlx::Error, entity_type: &'static str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            // SQLite reports "UNIQUE constraint failed: table.column"
            let field = db.message().rsplit('.').next().unwrap_or("id").to_string();
            StoreError::already_exists(entity_type, field)
        }
        _ => StoreError::Database(err),
    }
}

// =============================================================================
// Row loading helpers
// =============================================================================

async fn load_user(
    conn: &mut SqliteConnection,
    row: UserRow,
    with_activities: bool,
) -> StoreResult<User> {
    let reviews: Vec<ReviewRow> = sqlx::query_as(
        "SELECT reviewer_id, rating, created_at FROM user_reviews WHERE user_id = ? ORDER BY \
         rowid",
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;
    let reviews = reviews
        .into_iter()
        .map(Review::try_from)
        .collect::<StoreResult<Vec<_>>>()?;

    if !with_activities {
        return row.into_user(reviews, Vec::new(), Vec::new());
    }

    let proposed: Vec<String> =
        sqlx::query_scalar("SELECT id FROM events WHERE created_by = ? ORDER BY created_at, rowid")
            .bind(&row.id)
            .fetch_all(&mut *conn)
            .await?;
    let reserved: Vec<String> = sqlx::query_scalar(
        "SELECT e.id FROM event_participants p JOIN events e ON e.id = p.event_id WHERE \
         p.user_id = ? AND e.created_by != p.user_id ORDER BY e.created_at, e.rowid",
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;

    row.into_user(reviews, decode_ids(proposed)?, decode_ids(reserved)?)
}

async fn fetch_user(
    conn: &mut SqliteConnection,
    id: &str,
    with_activities: bool,
) -> StoreResult<Option<User>> {
    let row: Option<UserRow> =
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    match row {
        Some(row) => Ok(Some(load_user(conn, row, with_activities).await?)),
        None => Ok(None),
    }
}

async fn load_event(conn: &mut SqliteConnection, row: EventRow) -> StoreResult<Event> {
    let participants: Vec<String> = sqlx::query_scalar(
        "SELECT user_id FROM event_participants WHERE event_id = ? ORDER BY rowid",
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;
    row.into_event(decode_ids(participants)?)
}

async fn fetch_event(conn: &mut SqliteConnection, id: &str) -> StoreResult<Option<Event>> {
    let row: Option<EventRow> =
        sqlx::query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    match row {
        Some(row) => Ok(Some(load_event(conn, row).await?)),
        None => Ok(None),
    }
}

async fn load_conversation(
    conn: &mut SqliteConnection,
    row: ConversationRow,
) -> StoreResult<Conversation> {
    let participants: Vec<String> = sqlx::query_scalar(
        "SELECT user_id FROM conversation_participants WHERE conversation_id = ? ORDER BY rowid",
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;
    let messages: Vec<MessageRow> = sqlx::query_as(
        "SELECT id, sender, content, timestamp FROM messages WHERE conversation_id = ? ORDER BY \
         seq",
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;
    let messages = messages
        .into_iter()
        .map(Message::try_from)
        .collect::<StoreResult<Vec<_>>>()?;

    row.into_conversation(decode_ids(participants)?, messages)
}

async fn fetch_conversation(
    conn: &mut SqliteConnection,
    id: &str,
) -> StoreResult<Option<Conversation>> {
    let row: Option<ConversationRow> = sqlx::query_as(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(row) => Ok(Some(load_conversation(conn, row).await?)),
        None => Ok(None),
    }
}

/// Inserts `conversation` unless one with the same key exists, and returns
/// the id of the stored one.
async fn insert_conversation_if_absent(
    conn: &mut SqliteConnection,
    conversation: &Conversation,
) -> StoreResult<String> {
    let scope_key = conversation.scope.key();
    let event_id = conversation.event_id.to_string();

    let inserted = sqlx::query(
        "INSERT INTO conversations (id, event_id, scope_key, last_updated, created_at) VALUES \
         (?, ?, ?, ?, ?) ON CONFLICT (event_id, scope_key) DO NOTHING",
    )
    .bind(conversation.id.to_string())
    .bind(&event_id)
    .bind(&scope_key)
    .bind(encode_time(&conversation.last_updated))
    .bind(encode_time(&conversation.created_at))
    .execute(&mut *conn)
    .await?
    .rows_affected()
        == 1;

    if inserted {
        for user_id in &conversation.participants {
            add_conversation_participant(conn, &conversation.id.to_string(), user_id).await?;
        }
        return Ok(conversation.id.to_string());
    }

    let id: String =
        sqlx::query_scalar("SELECT id FROM conversations WHERE event_id = ? AND scope_key = ?")
            .bind(&event_id)
            .bind(&scope_key)
            .fetch_one(&mut *conn)
            .await?;
    Ok(id)
}

async fn add_conversation_participant(
    conn: &mut SqliteConnection,
    conversation_id: &str,
    user_id: &Uuid,
) -> StoreResult<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO conversation_participants (conversation_id, user_id) VALUES (?, ?)",
    )
    .bind(conversation_id)
    .bind(user_id.to_string())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[async_trait]
impl SortieStore for SqliteStore {
    // =========================================================================
    // User operations
    // =========================================================================

    async fn create_user(&self, user: User) -> StoreResult<User> {
        sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.photo)
        .bind(&user.bio)
        .bind(encode_time(&user.created_at))
        .bind(encode_time(&user.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "User"))?;

        tracing::debug!(user_id = %user.id, "Stored user");
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        fetch_user(&mut conn, &id.to_string(), true).await
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
                .bind(email)
                .fetch_optional(&mut *conn)
                .await?;
        match row {
            Some(row) => Ok(Some(load_user(&mut conn, row, true).await?)),
            None => Ok(None),
        }
    }

    async fn get_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let mut conn = self.pool.acquire().await?;
        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = fetch_user(&mut conn, &id.to_string(), false).await? {
                users.push(user);
            }
        }
        Ok(users)
    }

    async fn update_user(&self, user: User) -> StoreResult<User> {
        let result = sqlx::query(
            "UPDATE users SET username = ?, email = ?, password_hash = ?, photo = ?, bio = ?, \
             updated_at = ? WHERE id = ?",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.photo)
        .bind(&user.bio)
        .bind(encode_time(&now()))
        .bind(user.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "User"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("User", user.id));
        }
        self.get_user(user.id)
            .await?
            .ok_or_else(|| StoreError::not_found("User", user.id))
    }

    async fn add_review(&self, user_id: Uuid, review: Review) -> StoreResult<User> {
        let id = user_id.to_string();
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE users SET updated_at = ? WHERE id = ?")
            .bind(encode_time(&now()))
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(StoreError::not_found("User", user_id));
        }

        sqlx::query(
            "INSERT INTO user_reviews (user_id, reviewer_id, rating, created_at) VALUES (?, ?, ?, \
             ?)",
        )
        .bind(&id)
        .bind(review.reviewer_id.to_string())
        .bind(i64::from(review.rating))
        .bind(encode_time(&review.created_at))
        .execute(&mut *tx)
        .await?;

        let user = fetch_user(&mut tx, &id, true)
            .await?
            .ok_or_else(|| StoreError::not_found("User", user_id))?;
        tx.commit().await?;
        Ok(user)
    }

    // =========================================================================
    // Event operations
    // =========================================================================

    async fn create_event(&self, mut event: Event) -> StoreResult<(Event, Conversation)> {
        if !event.is_participant(event.created_by) {
            event.participants.insert(0, event.created_by);
        }
        let mut tx = self.pool.begin().await?;

        let conversation_id = insert_conversation_if_absent(
            &mut tx,
            &Conversation::for_event(event.id, event.created_by),
        )
        .await?;

        let id = event.id.to_string();
        sqlx::query(&format!(
            "INSERT INTO events ({EVENT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.location.latitude)
        .bind(event.location.longitude)
        .bind(encode_time(&event.date))
        .bind(event.category.as_str())
        .bind(event.created_by.to_string())
        .bind(i64::from(event.max_participants))
        .bind(serde_json::to_string(&event.photos)?)
        .bind(&conversation_id)
        .bind(encode_time(&event.created_at))
        .bind(encode_time(&event.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, "Event"))?;

        for user_id in &event.participants {
            sqlx::query("INSERT INTO event_participants (event_id, user_id) VALUES (?, ?)")
                .bind(&id)
                .bind(user_id.to_string())
                .execute(&mut *tx)
                .await?;
        }

        let conversation = fetch_conversation(&mut tx, &conversation_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Conversation", &conversation_id))?;
        tx.commit().await?;

        event.conversation_id = Some(conversation.id);
        Ok((event, conversation))
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let mut conn = self.pool.acquire().await?;
        fetch_event(&mut conn, &id.to_string()).await
    }

    async fn get_events(&self, ids: &[Uuid]) -> StoreResult<Vec<Event>> {
        let mut conn = self.pool.acquire().await?;
        let mut events = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(event) = fetch_event(&mut conn, &id.to_string()).await? {
                events.push(event);
            }
        }
        Ok(events)
    }

    async fn list_events(&self, filter: EventFilter) -> StoreResult<Vec<Event>> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE (?1 IS NULL OR category = ?1) AND (?2 IS \
             NULL OR created_by = ?2) ORDER BY date, created_at"
        ))
        .bind(filter.category.map(|c| c.as_str()))
        .bind(filter.created_by.map(|id| id.to_string()))
        .fetch_all(&mut *conn)
        .await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            events.push(load_event(&mut conn, row).await?);
        }
        Ok(events)
    }

    async fn update_event(&self, event: Event) -> StoreResult<Event> {
        let id = event.id.to_string();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE events SET title = ?, description = ?, latitude = ?, longitude = ?, date = ?, \
             category = ?, max_participants = ?, photos = ?, updated_at = ? WHERE id = ? AND ? \
             >= (SELECT COUNT(*) FROM event_participants WHERE event_id = ?)",
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.location.latitude)
        .bind(event.location.longitude)
        .bind(encode_time(&event.date))
        .bind(event.category.as_str())
        .bind(i64::from(event.max_participants))
        .bind(serde_json::to_string(&event.photos)?)
        .bind(encode_time(&now()))
        .bind(&id)
        .bind(i64::from(event.max_participants))
        .bind(&id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let stored = fetch_event(&mut tx, &id)
                .await?
                .ok_or_else(|| StoreError::not_found("Event", event.id))?;
            return Err(StoreError::CapacityTooLow {
                capacity: event.max_participants,
                participants: stored.participants.len(),
            });
        }

        let stored = fetch_event(&mut tx, &id)
            .await?
            .ok_or_else(|| StoreError::not_found("Event", event.id))?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Event", id));
        }
        Ok(())
    }

    async fn join_event(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<(Event, Conversation)> {
        let id = event_id.to_string();
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE events SET updated_at = ? WHERE id = ?")
            .bind(encode_time(&now()))
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(StoreError::not_found("Event", event_id));
        }

        let event = fetch_event(&mut tx, &id)
            .await?
            .ok_or_else(|| StoreError::not_found("Event", event_id))?;
        if event.is_participant(user_id) {
            return Err(StoreError::AlreadyParticipant { event_id, user_id });
        }
        if event.is_full() {
            return Err(StoreError::EventFull { event_id });
        }

        sqlx::query("INSERT INTO event_participants (event_id, user_id) VALUES (?, ?)")
            .bind(&id)
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await?;

        let linked = match event.conversation_id {
            Some(conversation_id) => {
                let exists: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM conversations WHERE id = ?")
                        .bind(conversation_id.to_string())
                        .fetch_one(&mut *tx)
                        .await?;
                (exists > 0).then(|| conversation_id.to_string())
            }
            None => None,
        };
        let conversation_id = match linked {
            Some(conversation_id) => conversation_id,
            None => {
                tracing::warn!(event_id = %event_id, "Event had no conversation, creating one");
                let conversation_id = insert_conversation_if_absent(
                    &mut tx,
                    &Conversation::for_event(event_id, event.created_by),
                )
                .await?;
                sqlx::query("UPDATE events SET conversation_id = ? WHERE id = ?")
                    .bind(&conversation_id)
                    .bind(&id)
                    .execute(&mut *tx)
                    .await?;
                conversation_id
            }
        };
        add_conversation_participant(&mut tx, &conversation_id, &user_id).await?;

        let event = fetch_event(&mut tx, &id)
            .await?
            .ok_or_else(|| StoreError::not_found("Event", event_id))?;
        let conversation = fetch_conversation(&mut tx, &conversation_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Conversation", &conversation_id))?;
        tx.commit().await?;
        Ok((event, conversation))
    }

    async fn leave_event(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        leave_conversation: bool,
    ) -> StoreResult<Event> {
        let id = event_id.to_string();
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE events SET updated_at = ? WHERE id = ?")
            .bind(encode_time(&now()))
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(StoreError::not_found("Event", event_id));
        }

        let removed = sqlx::query("DELETE FROM event_participants WHERE event_id = ? AND user_id = ?")
            .bind(&id)
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await?;
        if removed.rows_affected() == 0 {
            return Err(StoreError::NotParticipant {
                entity_type: "Event",
                id: event_id,
                user_id,
            });
        }

        if leave_conversation {
            sqlx::query(
                "DELETE FROM conversation_participants WHERE user_id = ? AND conversation_id = \
                 (SELECT conversation_id FROM events WHERE id = ?)",
            )
            .bind(user_id.to_string())
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        }

        let event = fetch_event(&mut tx, &id)
            .await?
            .ok_or_else(|| StoreError::not_found("Event", event_id))?;
        tx.commit().await?;
        Ok(event)
    }

    // =========================================================================
    // Conversation operations
    // =========================================================================

    async fn get_or_create_conversation(
        &self,
        conversation: Conversation,
    ) -> StoreResult<Conversation> {
        let mut tx = self.pool.begin().await?;
        let id = insert_conversation_if_absent(&mut tx, &conversation).await?;
        let stored = fetch_conversation(&mut tx, &id)
            .await?
            .ok_or_else(|| StoreError::not_found("Conversation", &id))?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn get_conversation(&self, id: Uuid) -> StoreResult<Option<Conversation>> {
        let mut conn = self.pool.acquire().await?;
        fetch_conversation(&mut conn, &id.to_string()).await
    }

    async fn list_conversations(
        &self,
        filter: ConversationFilter,
    ) -> StoreResult<Vec<Conversation>> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<ConversationRow> = sqlx::query_as(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations c WHERE (?1 IS NULL OR EXISTS \
             (SELECT 1 FROM conversation_participants cp WHERE cp.conversation_id = c.id AND \
             cp.user_id = ?1)) AND (?2 IS NULL OR c.event_id = ?2) ORDER BY c.last_updated DESC"
        ))
        .bind(filter.participant_id.map(|id| id.to_string()))
        .bind(filter.event_id.map(|id| id.to_string()))
        .fetch_all(&mut *conn)
        .await?;

        let mut conversations = Vec::with_capacity(rows.len());
        for row in rows {
            conversations.push(load_conversation(&mut conn, row).await?);
        }
        Ok(conversations)
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender: Uuid,
        content: String,
    ) -> StoreResult<Message> {
        let id = conversation_id.to_string();
        let mut tx = self.pool.begin().await?;

        let touched =
            sqlx::query("UPDATE conversations SET last_updated = last_updated WHERE id = ?")
                .bind(&id)
                .execute(&mut *tx)
                .await?;
        if touched.rows_affected() == 0 {
            return Err(StoreError::not_found("Conversation", conversation_id));
        }

        let enrolled: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM conversation_participants WHERE conversation_id = ? AND user_id \
             = ?",
        )
        .bind(&id)
        .bind(sender.to_string())
        .fetch_one(&mut *tx)
        .await?;
        if enrolled == 0 {
            return Err(StoreError::NotParticipant {
                entity_type: "Conversation",
                id: conversation_id,
                user_id: sender,
            });
        }

        let last: Option<(i64, String)> = sqlx::query_as(
            "SELECT seq, timestamp FROM messages WHERE conversation_id = ? ORDER BY seq DESC \
             LIMIT 1",
        )
        .bind(&id)
        .fetch_optional(&mut *tx)
        .await?;
        let (seq, timestamp) = match last {
            Some((seq, timestamp)) => (seq + 1, now().max(decode_time(&timestamp)?)),
            None => (1, now()),
        };

        let message = Message {
            id: Uuid::new_v4(),
            sender,
            content,
            timestamp,
        };
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, seq, sender, content, timestamp) VALUES \
             (?, ?, ?, ?, ?, ?)",
        )
        .bind(message.id.to_string())
        .bind(&id)
        .bind(seq)
        .bind(sender.to_string())
        .bind(&message.content)
        .bind(encode_time(&message.timestamp))
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE conversations SET last_updated = ? WHERE id = ?")
            .bind(encode_time(&message.timestamp))
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::contract;

    async fn store() -> SqliteStore {
        SqliteStore::in_memory().await.unwrap()
    }

    /// A database file in its own temporary directory.
    struct FileDatabase {
        dir: std::path::PathBuf,
        url: String,
    }

    impl FileDatabase {
        fn new() -> Self {
            let dir = std::env::temp_dir().join(format!("sortie-store-{}", Uuid::new_v4()));
            std::fs::create_dir_all(&dir).unwrap();
            let url = format!("sqlite://{}", dir.join("sortie.db").display());
            Self { dir, url }
        }

        /// Opens a pool with several connections, so writers really race.
        async fn pooled(&self) -> Arc<SqliteStore> {
            Arc::new(SqliteStore::connect(&self.url, 8).await.unwrap())
        }
    }

    impl Drop for FileDatabase {
        fn drop(&mut self) {
            std::fs::remove_dir_all(&self.dir).ok();
        }
    }

    #[tokio::test]
    async fn test_user_crud() {
        contract::user_crud(store().await).await;
    }

    #[tokio::test]
    async fn test_duplicate_identity_rejected() {
        contract::duplicate_identity_rejected(store().await).await;
    }

    #[tokio::test]
    async fn test_reviews_and_activities() {
        contract::reviews_and_activities(store().await).await;
    }

    #[tokio::test]
    async fn test_create_event_links_conversation() {
        contract::create_event_links_conversation(store().await).await;
    }

    #[tokio::test]
    async fn test_join_enrolls_in_conversation() {
        contract::join_enrolls_in_conversation(store().await).await;
    }

    #[tokio::test]
    async fn test_join_rejects_when_full() {
        contract::join_rejects_when_full(store().await).await;
    }

    #[tokio::test]
    async fn test_join_rejects_duplicate() {
        contract::join_rejects_duplicate(store().await).await;
    }

    #[tokio::test]
    async fn test_leave_policies() {
        contract::leave_policies(store().await).await;
    }

    #[tokio::test]
    async fn test_leave_without_joining() {
        contract::leave_without_joining(store().await).await;
    }

    #[tokio::test]
    async fn test_update_and_delete_event() {
        contract::update_and_delete_event(store().await).await;
    }

    #[tokio::test]
    async fn test_list_events_by_category() {
        contract::list_events_by_category(store().await).await;
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        contract::get_or_create_is_idempotent(store().await).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_create_yields_one_conversation() {
        contract::concurrent_create_yields_one_conversation(Arc::new(store().await)).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_create_on_file_database() {
        let db = FileDatabase::new();
        let store = db.pooled().await;

        contract::concurrent_create_yields_one_conversation(Arc::clone(&store)).await;

        store.pool().close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_respect_capacity() {
        contract::concurrent_joins_respect_capacity(Arc::new(store().await)).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_on_file_database() {
        let db = FileDatabase::new();
        let store = db.pooled().await;

        contract::concurrent_joins_respect_capacity(Arc::clone(&store)).await;

        store.pool().close().await;
    }

    #[tokio::test]
    async fn test_append_requires_participant() {
        contract::append_requires_participant(store().await).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_are_all_kept() {
        contract::concurrent_appends_are_all_kept(Arc::new(store().await)).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_on_file_database() {
        let db = FileDatabase::new();
        let store = db.pooled().await;

        contract::concurrent_appends_are_all_kept(Arc::clone(&store)).await;

        store.pool().close().await;
    }

    #[tokio::test]
    async fn test_list_conversations_for_participant() {
        contract::list_conversations_for_participant(store().await).await;
    }

    #[tokio::test]
    async fn test_file_database_persists_across_connections() {
        let db = FileDatabase::new();

        let user = User::new("alice", "alice@example.com", "hash");
        {
            let store = SqliteStore::connect(&db.url, 2).await.unwrap();
            store.create_user(user.clone()).await.unwrap();
            store.pool().close().await;
        }

        let store = SqliteStore::connect(&db.url, 2).await.unwrap();
        let loaded = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(loaded.username, "alice");

        store.pool().close().await;
    }
}
