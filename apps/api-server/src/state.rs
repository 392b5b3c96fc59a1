//! Application state.

use std::sync::Arc;

use auth::{JwtConfig, JwtManager, PasswordHasher};
use sortie_store::SortieStore;

use crate::config::Config;
use crate::services::{MediaHost, PlacesProvider};

/// Shared application state.
pub struct AppState<S: SortieStore> {
    /// Server configuration.
    pub config: Config,
    /// Sortie store.
    pub store: S,
    /// JWT manager.
    pub jwt_manager: JwtManager,
    /// Password hasher.
    pub password_hasher: PasswordHasher,
    /// Places search, if configured.
    pub places: Option<Arc<dyn PlacesProvider>>,
    /// Image hosting, if configured.
    pub media: Option<Arc<dyn MediaHost>>,
}

impl<S: SortieStore> AppState<S> {
    /// Creates new application state without integrations.
    pub fn new(config: Config, store: S) -> Self {
        let jwt_manager = JwtManager::new(
            JwtConfig::new(config.jwt_secret.clone())
                .with_expiration_hours(config.jwt_expiration_hours),
        );

        Self {
            config,
            store,
            jwt_manager,
            password_hasher: PasswordHasher::new(),
            places: None,
            media: None,
        }
    }

    /// Replaces the password hasher.
    pub fn with_password_hasher(mut self, password_hasher: PasswordHasher) -> Self {
        self.password_hasher = password_hasher;
        self
    }

    /// Enables places search.
    pub fn with_places(mut self, places: Arc<dyn PlacesProvider>) -> Self {
        self.places = Some(places);
        self
    }

    /// Enables image uploads.
    pub fn with_media(mut self, media: Arc<dyn MediaHost>) -> Self {
        self.media = Some(media);
        self
    }
}
