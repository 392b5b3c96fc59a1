//! Conversation endpoints.

use std::sync::Arc;

use api_protocol::{
    CategoryQuery, ConversationView, CreateConversationRequest, MessageView, PostMessageRequest,
};
use axum::{Extension, Json, extract::State, http::StatusCode};
use entities::{Conversation, ConversationScope};
use sortie_store::{ConversationFilter, SortieStore};

use crate::error::{ServerError, ServerResult};
use crate::extract::{IdPath, ValidJson, ValidQuery};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;
use crate::validation::CategoryFilter;
use crate::{validation, views};

/// Opens a conversation between the caller and another user about an event.
///
/// Returns the existing conversation of that event the two already share,
/// if any, otherwise a new direct one. Both answer 201.
pub async fn create_conversation<S: SortieStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    ValidJson(request): ValidJson<CreateConversationRequest>,
) -> ServerResult<(StatusCode, Json<ConversationView>)> {
    let recipient_id = request
        .recipient_id
        .ok_or_else(|| ServerError::InvalidRequest("recipient_id is required".to_string()))?;
    let event_id = request
        .event_id
        .ok_or_else(|| ServerError::InvalidRequest("event_id is required".to_string()))?;
    if recipient_id == caller.id {
        return Err(ServerError::InvalidRequest(
            "You cannot start a conversation with yourself".to_string(),
        ));
    }

    if state.store.get_users(&[recipient_id]).await?.is_empty() {
        return Err(ServerError::NotFound("Recipient not found".to_string()));
    }
    if state.store.get_event(event_id).await?.is_none() {
        return Err(ServerError::NotFound("Event not found".to_string()));
    }

    let shared = state
        .store
        .list_conversations(ConversationFilter {
            participant_id: Some(caller.id),
            event_id: Some(event_id),
        })
        .await?
        .into_iter()
        .filter(|c| c.is_participant(recipient_id))
        .min_by_key(|c| !matches!(c.scope, ConversationScope::Direct { .. }));

    let conversation = match shared {
        Some(existing) => existing,
        None => {
            let candidate = Conversation::direct(event_id, caller.id, recipient_id);
            let candidate_id = candidate.id;
            let conversation = state.store.get_or_create_conversation(candidate).await?;
            if conversation.id == candidate_id {
                tracing::info!(
                    conversation_id = %conversation.id,
                    event_id = %event_id,
                    user_id = %caller.id,
                    recipient_id = %recipient_id,
                    "Conversation created"
                );
            }
            conversation
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(views::conversation_view(&state.store, &conversation).await?),
    ))
}

/// Appends a message to a conversation the caller participates in.
pub async fn post_message<S: SortieStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    IdPath(conversation_id): IdPath,
    ValidJson(request): ValidJson<PostMessageRequest>,
) -> ServerResult<Json<MessageView>> {
    let content = validation::required_text(request.content, "content")?;

    let message = state
        .store
        .append_message(conversation_id, caller.id, content)
        .await?;

    tracing::info!(
        conversation_id = %conversation_id,
        message_id = %message.id,
        user_id = %caller.id,
        username = %caller.username,
        "Message posted"
    );

    Ok(Json(views::message_view(&state.store, &message).await?))
}

/// Lists the caller's conversations, most recently active first.
pub async fn list_my_conversations<S: SortieStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    ValidQuery(query): ValidQuery<CategoryQuery>,
) -> ServerResult<Json<Vec<ConversationView>>> {
    let category = validation::category_filter(query.category.as_deref());

    let conversations = state
        .store
        .list_conversations(ConversationFilter {
            participant_id: Some(caller.id),
            ..Default::default()
        })
        .await?;

    let mut views = views::conversation_views(&state.store, &conversations).await?;
    if category != CategoryFilter::Any {
        views.retain(|view| view.event.as_ref().is_some_and(|e| category.matches(e.category)));
    }

    Ok(Json(views))
}

/// Gets a conversation the caller participates in.
pub async fn get_conversation<S: SortieStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    IdPath(id): IdPath,
) -> ServerResult<Json<ConversationView>> {
    let conversation = state
        .store
        .get_conversation(id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Conversation not found".to_string()))?;

    if !conversation.is_participant(caller.id) {
        tracing::debug!(conversation_id = %id, user_id = %caller.id, "Conversation access denied");
        return Err(ServerError::PermissionDenied(
            "You are not a participant of this conversation".to_string(),
        ));
    }

    Ok(Json(
        views::conversation_view(&state.store, &conversation).await?,
    ))
}
