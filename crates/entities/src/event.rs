//! Event ("sortie") entity definitions.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of activity an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    Sport,
    Culturel,
    Sorties,
    Culinaire,
}

impl EventCategory {
    /// Every category, in display order.
    pub const ALL: [EventCategory; 4] = [
        EventCategory::Sport,
        EventCategory::Culturel,
        EventCategory::Sorties,
        EventCategory::Culinaire,
    ];

    /// Canonical name, as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sport => "Sport",
            Self::Culturel => "Culturel",
            Self::Sorties => "Sorties",
            Self::Culinaire => "Culinaire",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCategoryError(pub String);

impl fmt::Display for ParseCategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = EventCategory::ALL.iter().map(|c| c.as_str()).collect();
        write!(
            f,
            "unknown category '{}', expected one of: {}",
            self.0,
            names.join(", ")
        )
    }
}

impl std::error::Error for ParseCategoryError {}

impl FromStr for EventCategory {
    type Err = ParseCategoryError;

    /// Case-insensitive exact match on the category name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

/// Geographic position of an event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Degrees north, within [-90, 90].
    pub latitude: f64,
    /// Degrees east, within [-180, 180].
    pub longitude: f64,
}

impl Location {
    /// Creates a new location.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns true if both coordinates are finite and within range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A scheduled social activity with an owner and a capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier.
    pub id: Uuid,
    /// Short title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Where the event takes place.
    pub location: Location,
    /// When the event takes place.
    pub date: DateTime<Utc>,
    /// Activity category.
    pub category: EventCategory,
    /// Owner. Never changes after creation.
    pub created_by: Uuid,
    /// Enrolled users in join order. The owner is always first.
    pub participants: Vec<Uuid>,
    /// Capacity, at least 1.
    pub max_participants: u32,
    /// Photo URLs in display order.
    pub photos: Vec<String>,
    /// Event-wide conversation, set when the event is stored.
    pub conversation_id: Option<Uuid>,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
    /// When this record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Creates a new event owned by `created_by`, who is enrolled immediately.
    pub fn new(
        created_by: Uuid,
        title: impl Into<String>,
        description: impl Into<String>,
        location: Location,
        date: DateTime<Utc>,
        category: EventCategory,
        max_participants: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            location,
            date,
            category,
            created_by,
            participants: vec![created_by],
            max_participants,
            photos: Vec::new(),
            conversation_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the photo URLs.
    pub fn with_photos(mut self, photos: Vec<String>) -> Self {
        self.photos = photos;
        self
    }

    /// Returns true if `user_id` owns this event.
    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.created_by == user_id
    }

    /// Returns true if `user_id` is enrolled.
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participants.contains(&user_id)
    }

    /// Returns true if no seat is left.
    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_participants as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(owner: Uuid, capacity: u32) -> Event {
        Event::new(
            owner,
            "Climbing",
            "Bouldering at the gym",
            Location::new(48.85, 2.35),
            Utc::now(),
            EventCategory::Sport,
            capacity,
        )
    }

    #[test]
    fn test_owner_is_first_participant() {
        let owner = Uuid::new_v4();
        let event = sample_event(owner, 3);

        assert_eq!(event.participants, vec![owner]);
        assert!(event.is_owner(owner));
        assert!(event.is_participant(owner));
        assert!(event.conversation_id.is_none());
    }

    #[test]
    fn test_is_full() {
        let mut event = sample_event(Uuid::new_v4(), 2);
        assert!(!event.is_full());

        event.participants.push(Uuid::new_v4());
        assert!(event.is_full());
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("sport".parse::<EventCategory>(), Ok(EventCategory::Sport));
        assert_eq!("CULINAIRE".parse::<EventCategory>(), Ok(EventCategory::Culinaire));
        assert!("Spor".parse::<EventCategory>().is_err());
    }

    #[test]
    fn test_category_serializes_with_canonical_name() {
        let json = serde_json::to_string(&EventCategory::Culturel).unwrap();
        assert_eq!(json, "\"Culturel\"");
    }

    #[test]
    fn test_location_validation() {
        assert!(Location::new(45.0, 4.8).is_valid());
        assert!(!Location::new(91.0, 0.0).is_valid());
        assert!(!Location::new(0.0, f64::NAN).is_valid());
    }
}
