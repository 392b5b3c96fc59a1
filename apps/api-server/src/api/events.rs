//! Event registry endpoints.

use std::sync::Arc;

use api_protocol::{
    CategoryQuery, CreateEventRequest, EventView, EventWithConversation, LeaveEventResponse,
    StatusMessageResponse, UpdateEventRequest,
};
use axum::{Extension, Json, extract::State, http::StatusCode};
use entities::{Conversation, Event, Location};
use sortie_store::{EventFilter, SortieStore};
use uuid::Uuid;

use crate::error::{ServerError, ServerResult};
use crate::extract::{IdPath, ValidJson, ValidQuery};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;
use crate::validation::CategoryFilter;
use crate::{validation, views};

fn validate_location(location: Location) -> ServerResult<Location> {
    if location.is_valid() {
        Ok(location)
    } else {
        Err(ServerError::InvalidRequest(
            "location must have latitude in [-90, 90] and longitude in [-180, 180]".to_string(),
        ))
    }
}

fn validate_photos(photos: Vec<String>) -> ServerResult<Vec<String>> {
    photos
        .iter()
        .map(|photo| validation::http_url(photo, "photos"))
        .collect()
}

async fn load_event<S: SortieStore>(store: &S, id: Uuid) -> ServerResult<Event> {
    store
        .get_event(id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Event not found".to_string()))
}

/// Loads an event the caller owns.
async fn load_owned_event<S: SortieStore>(
    store: &S,
    id: Uuid,
    caller: &AuthenticatedUser,
) -> ServerResult<Event> {
    let event = load_event(store, id).await?;
    if !event.is_owner(caller.id) {
        tracing::debug!(event_id = %id, user_id = %caller.id, "Non-owner tried to modify event");
        return Err(ServerError::PermissionDenied(
            "Only the organizer can modify this event".to_string(),
        ));
    }
    Ok(event)
}

async fn with_conversation<S: SortieStore>(
    store: &S,
    event: Event,
    conversation: &Conversation,
) -> ServerResult<EventWithConversation> {
    Ok(EventWithConversation {
        event: views::event_view(store, event).await?,
        conversation: views::conversation_view(store, conversation).await?,
    })
}

/// Creates an event and its group conversation.
pub async fn create_event<S: SortieStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    ValidJson(request): ValidJson<CreateEventRequest>,
) -> ServerResult<(StatusCode, Json<EventWithConversation>)> {
    let title = validation::required_text(request.title, "title")?;
    let description = validation::required_text(request.description, "description")?;
    let location = request
        .location
        .ok_or_else(|| ServerError::InvalidRequest("location is required".to_string()))
        .and_then(validate_location)?;
    let date = request
        .date
        .ok_or_else(|| ServerError::InvalidRequest("date is required".to_string()))?;
    let category = request
        .category
        .ok_or_else(|| ServerError::InvalidRequest("category is required".to_string()))
        .and_then(|c| validation::category(&c))?;
    let max_participants = request
        .max_participants
        .ok_or_else(|| ServerError::InvalidRequest("max_participants is required".to_string()))
        .and_then(validation::max_participants)?;
    let photos = validate_photos(request.photos)?;

    let event = Event::new(
        caller.id,
        title,
        description,
        location,
        date,
        category,
        max_participants,
    )
    .with_photos(photos);

    let (event, conversation) = state.store.create_event(event).await?;

    tracing::info!(
        event_id = %event.id,
        conversation_id = %conversation.id,
        user_id = %caller.id,
        username = %caller.username,
        category = %event.category,
        "Event created"
    );

    let body = with_conversation(&state.store, event, &conversation).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

/// Lists events, soonest first.
pub async fn list_events<S: SortieStore>(
    State(state): State<Arc<AppState<S>>>,
    ValidQuery(query): ValidQuery<CategoryQuery>,
) -> ServerResult<Json<Vec<EventView>>> {
    let category = match validation::category_filter(query.category.as_deref()) {
        CategoryFilter::Any => None,
        CategoryFilter::Only(category) => Some(category),
        CategoryFilter::Unmatched => return Ok(Json(Vec::new())),
    };
    let filter = EventFilter {
        category,
        ..Default::default()
    };

    let events = state.store.list_events(filter).await?;

    Ok(Json(views::event_views(&state.store, events).await?))
}

/// Gets an event.
pub async fn get_event<S: SortieStore>(
    State(state): State<Arc<AppState<S>>>,
    IdPath(id): IdPath,
) -> ServerResult<Json<EventView>> {
    let event = load_event(&state.store, id).await?;

    Ok(Json(views::event_view(&state.store, event).await?))
}

/// Applies a partial update to an event the caller owns.
pub async fn update_event<S: SortieStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    IdPath(id): IdPath,
    ValidJson(request): ValidJson<UpdateEventRequest>,
) -> ServerResult<Json<EventView>> {
    let mut event = load_owned_event(&state.store, id, &caller).await?;

    if let Some(title) = request.title {
        event.title = validation::required_text(Some(title), "title")?;
    }
    if let Some(description) = request.description {
        event.description = validation::required_text(Some(description), "description")?;
    }
    if let Some(location) = request.location {
        event.location = validate_location(location)?;
    }
    if let Some(date) = request.date {
        event.date = date;
    }
    if let Some(category) = request.category {
        event.category = validation::category(&category)?;
    }
    if let Some(max_participants) = request.max_participants {
        event.max_participants = validation::max_participants(max_participants)?;
    }
    if let Some(photos) = request.photos {
        event.photos = validate_photos(photos)?;
    }

    let event = state.store.update_event(event).await?;

    tracing::info!(event_id = %event.id, user_id = %caller.id, "Event updated");

    Ok(Json(views::event_view(&state.store, event).await?))
}

/// Deletes an event the caller owns. Its conversation is kept.
pub async fn delete_event<S: SortieStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    IdPath(id): IdPath,
) -> ServerResult<Json<StatusMessageResponse>> {
    load_owned_event(&state.store, id, &caller).await?;

    state.store.delete_event(id).await?;

    tracing::info!(event_id = %id, user_id = %caller.id, "Event deleted");

    Ok(Json(StatusMessageResponse::new("Event deleted")))
}

/// Enrolls the caller in an event and its group conversation.
pub async fn join_event<S: SortieStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    IdPath(id): IdPath,
) -> ServerResult<Json<EventWithConversation>> {
    let (event, conversation) = state.store.join_event(id, caller.id).await?;

    tracing::info!(
        event_id = %id,
        user_id = %caller.id,
        participants = event.participants.len(),
        "Joined event"
    );

    Ok(Json(
        with_conversation(&state.store, event, &conversation).await?,
    ))
}

/// Withdraws the caller from an event.
pub async fn leave_event<S: SortieStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    IdPath(id): IdPath,
) -> ServerResult<Json<LeaveEventResponse>> {
    let event = load_event(&state.store, id).await?;
    if event.is_owner(caller.id) {
        return Err(ServerError::Conflict(
            "The organizer cannot leave their own event".to_string(),
        ));
    }

    let leave_conversation = state.config.leave_policy.leaves_conversation();
    let event = state
        .store
        .leave_event(id, caller.id, leave_conversation)
        .await?;

    tracing::info!(event_id = %id, user_id = %caller.id, leave_conversation, "Left event");

    Ok(Json(LeaveEventResponse {
        event: views::event_view(&state.store, event).await?,
    }))
}
