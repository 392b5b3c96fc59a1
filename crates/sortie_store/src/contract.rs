//! Behavior shared by every store backend, run against each of them from
//! their own test modules.

use std::{collections::HashSet, sync::Arc};

use chrono::{Duration, Utc};
use entities::{Conversation, ConversationScope, Event, EventCategory, Location, Review, User};
use uuid::Uuid;

use crate::{ConversationFilter, EventFilter, SortieStore, StoreError};

fn event_for(owner: Uuid, capacity: u32) -> Event {
    Event::new(
        owner,
        "Picnic",
        "Picnic by the river",
        Location::new(45.76, 4.83),
        Utc::now() + Duration::days(3),
        EventCategory::Sorties,
        capacity,
    )
}

async fn new_user<S: SortieStore>(store: &S, name: &str) -> User {
    store
        .create_user(User::new(name, format!("{name}@example.com"), "hash"))
        .await
        .unwrap()
}

pub async fn user_crud<S: SortieStore>(store: S) {
    let alice = new_user(&store, "alice").await;
    let bob = new_user(&store, "bob").await;

    let loaded = store.get_user(alice.id).await.unwrap().unwrap();
    assert_eq!(loaded.username, "alice");
    assert_eq!(loaded.password_hash, "hash");

    let by_email = store.get_user_by_email("bob@example.com").await.unwrap().unwrap();
    assert_eq!(by_email.id, bob.id);
    assert!(store.get_user_by_email("nobody@example.com").await.unwrap().is_none());

    let mut edited = loaded.with_bio("Likes hiking");
    edited.photo = "https://img.example.com/a.png".to_string();
    let updated = store.update_user(edited).await.unwrap();
    assert_eq!(updated.bio.as_deref(), Some("Likes hiking"));
    assert_eq!(updated.photo, "https://img.example.com/a.png");

    let users = store.get_users(&[bob.id, Uuid::new_v4(), alice.id]).await.unwrap();
    let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![bob.id, alice.id]);

    let missing = store
        .update_user(User::new("ghost", "ghost@example.com", "hash"))
        .await
        .unwrap_err();
    assert!(matches!(missing, StoreError::NotFound { .. }));
}

pub async fn duplicate_identity_rejected<S: SortieStore>(store: S) {
    new_user(&store, "alice").await;

    let same_email = store
        .create_user(User::new("alice2", "alice@example.com", "hash"))
        .await
        .unwrap_err();
    assert!(matches!(same_email, StoreError::AlreadyExists { ref field, .. } if field == "email"));

    let same_name = store
        .create_user(User::new("alice", "other@example.com", "hash"))
        .await
        .unwrap_err();
    assert!(
        matches!(same_name, StoreError::AlreadyExists { ref field, .. } if field == "username")
    );
}

pub async fn reviews_and_activities<S: SortieStore>(store: S) {
    let owner = new_user(&store, "owner").await;
    let guest = new_user(&store, "guest").await;
    let (event, _) = store.create_event(event_for(owner.id, 5)).await.unwrap();
    store.join_event(event.id, guest.id).await.unwrap();

    store.add_review(owner.id, Review::new(guest.id, 4)).await.unwrap();
    let rated = store.add_review(owner.id, Review::new(guest.id, 5)).await.unwrap();
    assert_eq!(rated.reviews_received.len(), 2);
    assert_eq!(rated.average_rating().to_string(), "4.5");

    let owner = store.get_user(owner.id).await.unwrap().unwrap();
    assert_eq!(owner.proposed_activities, vec![event.id]);
    assert!(owner.reserved_activities.is_empty());

    let guest = store.get_user(guest.id).await.unwrap().unwrap();
    assert!(guest.proposed_activities.is_empty());
    assert_eq!(guest.reserved_activities, vec![event.id]);

    let missing = store
        .add_review(Uuid::new_v4(), Review::new(guest.id, 3))
        .await
        .unwrap_err();
    assert!(matches!(missing, StoreError::NotFound { .. }));
}

pub async fn create_event_links_conversation<S: SortieStore>(store: S) {
    let owner = Uuid::new_v4();
    let (event, conversation) = store.create_event(event_for(owner, 4)).await.unwrap();

    assert_eq!(event.conversation_id, Some(conversation.id));
    assert_eq!(event.participants, vec![owner]);
    assert_eq!(conversation.event_id, event.id);
    assert_eq!(conversation.scope, ConversationScope::Event);
    assert_eq!(conversation.participants, vec![owner]);
    assert!(conversation.messages().is_empty());

    let stored = store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(stored.conversation_id, Some(conversation.id));
    assert!(store.get_conversation(conversation.id).await.unwrap().is_some());
}

pub async fn join_enrolls_in_conversation<S: SortieStore>(store: S) {
    let owner = Uuid::new_v4();
    let guest = Uuid::new_v4();
    let (event, _) = store.create_event(event_for(owner, 4)).await.unwrap();

    let (joined, conversation) = store.join_event(event.id, guest).await.unwrap();
    assert_eq!(joined.participants, vec![owner, guest]);
    assert_eq!(conversation.participants, vec![owner, guest]);
    assert_eq!(joined.conversation_id, Some(conversation.id));

    let missing = store.join_event(Uuid::new_v4(), guest).await.unwrap_err();
    assert!(matches!(missing, StoreError::NotFound { .. }));
}

pub async fn join_rejects_when_full<S: SortieStore>(store: S) {
    let owner = Uuid::new_v4();
    let (event, _) = store.create_event(event_for(owner, 20)).await.unwrap();

    for _ in 0..19 {
        store.join_event(event.id, Uuid::new_v4()).await.unwrap();
    }
    let err = store.join_event(event.id, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, StoreError::EventFull { event_id } if event_id == event.id));

    let stored = store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(stored.participants.len(), 20);
}

pub async fn concurrent_joins_respect_capacity<S: SortieStore + 'static>(store: Arc<S>) {
    let owner = Uuid::new_v4();
    let (event, _) = store.create_event(event_for(owner, 5)).await.unwrap();
    let event_id = event.id;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.join_event(event_id, Uuid::new_v4()).await })
        })
        .collect();

    let mut joined = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => joined += 1,
            Err(StoreError::EventFull { .. }) => {}
            Err(e) => panic!("unexpected join error: {e}"),
        }
    }
    assert_eq!(joined, 4);

    let stored = store.get_event(event_id).await.unwrap().unwrap();
    assert_eq!(stored.participants.len(), 5);
    let conversation = store
        .get_conversation(stored.conversation_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.participants.len(), 5);
}

pub async fn join_rejects_duplicate<S: SortieStore>(store: S) {
    let owner = Uuid::new_v4();
    let (event, _) = store.create_event(event_for(owner, 4)).await.unwrap();

    let err = store.join_event(event.id, owner).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyParticipant { .. }));
}

pub async fn leave_policies<S: SortieStore>(store: S) {
    let owner = Uuid::new_v4();
    let stays_in_chat = Uuid::new_v4();
    let leaves_chat = Uuid::new_v4();
    let (event, conversation) = store.create_event(event_for(owner, 4)).await.unwrap();
    store.join_event(event.id, stays_in_chat).await.unwrap();
    store.join_event(event.id, leaves_chat).await.unwrap();

    store.leave_event(event.id, stays_in_chat, false).await.unwrap();
    let event_after = store.leave_event(event.id, leaves_chat, true).await.unwrap();
    assert_eq!(event_after.participants, vec![owner]);

    let conversation = store.get_conversation(conversation.id).await.unwrap().unwrap();
    assert!(conversation.is_participant(stays_in_chat));
    assert!(!conversation.is_participant(leaves_chat));
}

pub async fn leave_without_joining<S: SortieStore>(store: S) {
    let (event, _) = store.create_event(event_for(Uuid::new_v4(), 4)).await.unwrap();

    let err = store.leave_event(event.id, Uuid::new_v4(), true).await.unwrap_err();
    assert!(matches!(err, StoreError::NotParticipant { .. }));

    let missing = store
        .leave_event(Uuid::new_v4(), Uuid::new_v4(), true)
        .await
        .unwrap_err();
    assert!(matches!(missing, StoreError::NotFound { .. }));
}

pub async fn update_and_delete_event<S: SortieStore>(store: S) {
    let owner = Uuid::new_v4();
    let (event, conversation) = store.create_event(event_for(owner, 4)).await.unwrap();
    store.join_event(event.id, Uuid::new_v4()).await.unwrap();
    store.join_event(event.id, Uuid::new_v4()).await.unwrap();

    let mut edit = store.get_event(event.id).await.unwrap().unwrap();
    edit.title = "Evening picnic".to_string();
    edit.category = EventCategory::Culinaire;
    edit.max_participants = 3;
    edit.photos = vec!["https://img.example.com/1.jpg".to_string()];
    let updated = store.update_event(edit.clone()).await.unwrap();
    assert_eq!(updated.title, "Evening picnic");
    assert_eq!(updated.category, EventCategory::Culinaire);
    assert_eq!(updated.max_participants, 3);
    assert_eq!(updated.photos, edit.photos);
    assert_eq!(updated.participants.len(), 3);

    edit.max_participants = 2;
    let err = store.update_event(edit).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::CapacityTooLow {
            capacity: 2,
            participants: 3
        }
    ));

    store.delete_event(event.id).await.unwrap();
    assert!(store.get_event(event.id).await.unwrap().is_none());
    assert!(store.get_conversation(conversation.id).await.unwrap().is_some());

    let again = store.delete_event(event.id).await.unwrap_err();
    assert!(matches!(again, StoreError::NotFound { .. }));
}

pub async fn list_events_by_category<S: SortieStore>(store: S) {
    let owner = Uuid::new_v4();
    let mut later = event_for(owner, 4);
    later.date = Utc::now() + Duration::days(10);
    later.category = EventCategory::Sport;
    let mut sooner = event_for(owner, 4);
    sooner.date = Utc::now() + Duration::days(1);
    let (later, _) = store.create_event(later).await.unwrap();
    let (sooner, _) = store.create_event(sooner).await.unwrap();
    let (other, _) = store.create_event(event_for(Uuid::new_v4(), 4)).await.unwrap();

    let all = store.list_events(EventFilter::default()).await.unwrap();
    let ids: Vec<Uuid> = all.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![sooner.id, other.id, later.id]);

    let sport = store
        .list_events(EventFilter {
            category: Some(EventCategory::Sport),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(sport.len(), 1);
    assert_eq!(sport[0].id, later.id);

    let owned = store
        .list_events(EventFilter {
            created_by: Some(owner),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(owned.len(), 2);
}

pub async fn get_or_create_is_idempotent<S: SortieStore>(store: S) {
    let event_id = Uuid::new_v4();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    let first = store
        .get_or_create_conversation(Conversation::direct(event_id, a, b))
        .await
        .unwrap();
    let second = store
        .get_or_create_conversation(Conversation::direct(event_id, b, a))
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.participants, vec![a, b]);

    let elsewhere = store
        .get_or_create_conversation(Conversation::direct(Uuid::new_v4(), a, b))
        .await
        .unwrap();
    assert_ne!(elsewhere.id, first.id);
}

pub async fn concurrent_create_yields_one_conversation<S: SortieStore + 'static>(store: Arc<S>) {
    let event_id = Uuid::new_v4();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let store = Arc::clone(&store);
            let candidate = if i % 2 == 0 {
                Conversation::direct(event_id, a, b)
            } else {
                Conversation::direct(event_id, b, a)
            };
            tokio::spawn(async move { store.get_or_create_conversation(candidate).await })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap().id);
    }
    assert_eq!(ids.len(), 1);

    let stored = store
        .list_conversations(ConversationFilter {
            event_id: Some(event_id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

pub async fn append_requires_participant<S: SortieStore>(store: S) {
    let owner = Uuid::new_v4();
    let (_, conversation) = store.create_event(event_for(owner, 4)).await.unwrap();

    let err = store
        .append_message(conversation.id, Uuid::new_v4(), "hello".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotParticipant { .. }));

    let missing = store
        .append_message(Uuid::new_v4(), owner, "hello".to_string())
        .await
        .unwrap_err();
    assert!(matches!(missing, StoreError::NotFound { .. }));

    let message = store
        .append_message(conversation.id, owner, "hello".to_string())
        .await
        .unwrap();
    let stored = store.get_conversation(conversation.id).await.unwrap().unwrap();
    assert_eq!(stored.messages(), &[message.clone()]);
    assert_eq!(stored.last_updated, message.timestamp);
}

pub async fn concurrent_appends_are_all_kept<S: SortieStore + 'static>(store: Arc<S>) {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let conversation = store
        .get_or_create_conversation(Conversation::direct(Uuid::new_v4(), a, b))
        .await
        .unwrap();

    for i in 0..5 {
        store
            .append_message(conversation.id, a, format!("sequential {i}"))
            .await
            .unwrap();
    }

    let handles: Vec<_> = (0..40)
        .map(|i| {
            let store = Arc::clone(&store);
            let sender = if i % 2 == 0 { a } else { b };
            tokio::spawn(async move {
                store
                    .append_message(conversation.id, sender, format!("concurrent {i}"))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = store.get_conversation(conversation.id).await.unwrap().unwrap();
    let messages = stored.messages();
    assert_eq!(messages.len(), 45);

    let first: Vec<&str> = messages[..5].iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        first,
        vec!["sequential 0", "sequential 1", "sequential 2", "sequential 3", "sequential 4"]
    );

    let contents: HashSet<&str> = messages[5..].iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents.len(), 40);
    let ids: HashSet<Uuid> = messages.iter().map(|m| m.id).collect();
    assert_eq!(ids.len(), 45);
    assert!(messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

pub async fn list_conversations_for_participant<S: SortieStore>(store: S) {
    let user = Uuid::new_v4();
    let (_, older) = store.create_event(event_for(user, 4)).await.unwrap();
    let (_, newer) = store.create_event(event_for(user, 4)).await.unwrap();
    store
        .append_message(older.id, user, "bump".to_string())
        .await
        .unwrap();

    let mine = store
        .list_conversations(ConversationFilter {
            participant_id: Some(user),
            ..Default::default()
        })
        .await
        .unwrap();
    let ids: Vec<Uuid> = mine.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![older.id, newer.id]);

    let stranger = store
        .list_conversations(ConversationFilter {
            participant_id: Some(Uuid::new_v4()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(stranger.is_empty());
}
