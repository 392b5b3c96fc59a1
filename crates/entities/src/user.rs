//! User-related entity definitions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Photo assigned to accounts that never uploaded one.
pub const DEFAULT_USER_PHOTO: &str =
    "https://res.cloudinary.com/dasntwyhd/image/upload/v1712345678/default-avatar.jpg";

/// Lowest rating a reviewer can give.
pub const MIN_RATING: u8 = 1;

/// Highest rating a reviewer can give.
pub const MAX_RATING: u8 = 5;

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,
    /// Unique public handle.
    pub username: String,
    /// Unique, lowercase email address.
    pub email: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Profile photo URL.
    pub photo: String,
    /// Free-form biography.
    pub bio: Option<String>,
    /// Ratings received from other users, oldest first.
    pub reviews_received: Vec<Review>,
    /// Events created by this user.
    pub proposed_activities: Vec<Uuid>,
    /// Events this user joined without owning them.
    pub reserved_activities: Vec<Uuid>,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
    /// When this record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user with the default photo and no reviews.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            photo: DEFAULT_USER_PHOTO.to_string(),
            bio: None,
            reviews_received: Vec::new(),
            proposed_activities: Vec::new(),
            reserved_activities: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the biography.
    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    /// Mean of all received ratings.
    pub fn average_rating(&self) -> AverageRating {
        AverageRating::from_reviews(&self.reviews_received)
    }
}

/// A rating left by one user on another user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Who left the rating.
    pub reviewer_id: Uuid,
    /// Rating between [`MIN_RATING`] and [`MAX_RATING`].
    pub rating: u8,
    /// When the rating was left.
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Creates a review timestamped now.
    pub fn new(reviewer_id: Uuid, rating: u8) -> Self {
        Self {
            reviewer_id,
            rating,
            created_at: Utc::now(),
        }
    }

    /// Returns true if `rating` lies within the accepted range.
    pub fn is_valid_rating(rating: i64) -> bool {
        (i64::from(MIN_RATING)..=i64::from(MAX_RATING)).contains(&rating)
    }
}

/// Average of a user's received ratings.
///
/// Serialized as a string: one decimal (`"4.5"`) or `"not yet rated"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AverageRating {
    /// No review received yet.
    NotYetRated,
    /// Arithmetic mean of all ratings.
    Rated(f64),
}

impl AverageRating {
    /// Sentinel text for users without reviews.
    pub const NOT_YET_RATED: &'static str = "not yet rated";

    /// Computes the mean rating of `reviews`.
    pub fn from_reviews(reviews: &[Review]) -> Self {
        if reviews.is_empty() {
            return Self::NotYetRated;
        }
        let sum: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
        Self::Rated(f64::from(sum) / reviews.len() as f64)
    }
}

impl fmt::Display for AverageRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotYetRated => f.write_str(Self::NOT_YET_RATED),
            // Ties round away from zero.
            Self::Rated(mean) => write!(f, "{:.1}", (mean * 10.0).round() / 10.0),
        }
    }
}

impl Serialize for AverageRating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
