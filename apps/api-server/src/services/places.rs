use std::time::Duration;

use api_protocol::Place;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{IntegrationError, IntegrationResult, REQUEST_TIMEOUT, http_client};

/// Foursquare API base URL
const FOURSQUARE_API_BASE: &str = "https://api.foursquare.com";

/// Place search endpoint
const FOURSQUARE_PLACES_SEARCH: &str = "/v3/places/search";

const SEARCH_RADIUS_METERS: u32 = 5000;
/// Foursquare category id for restaurants
const RESTAURANT_CATEGORY: &str = "13065";
const RESULT_LIMIT: u32 = 20;

const ADDRESS_UNAVAILABLE: &str = "Address unavailable";
const UNKNOWN_CITY: &str = "Unknown city";

/// Source of nearby places.
#[async_trait]
pub trait PlacesProvider: Send + Sync {
    /// Restaurants around the given coordinates.
    async fn restaurants_near(&self, latitude: f64, longitude: f64)
        -> IntegrationResult<Vec<Place>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<FoursquarePlace>,
}

#[derive(Debug, Deserialize)]
struct FoursquarePlace {
    fsq_id: String,
    name: String,
    #[serde(default)]
    location: FoursquareLocation,
    geocodes: Option<Geocodes>,
}

#[derive(Debug, Default, Deserialize)]
struct FoursquareLocation {
    address: Option<String>,
    locality: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geocodes {
    main: Option<Coordinates>,
}

#[derive(Debug, Deserialize)]
struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl From<FoursquarePlace> for Place {
    fn from(place: FoursquarePlace) -> Self {
        let main = place.geocodes.and_then(|g| g.main);
        Place {
            id: place.fsq_id,
            name: place.name,
            address: place
                .location
                .address
                .unwrap_or_else(|| ADDRESS_UNAVAILABLE.to_string()),
            city: place
                .location
                .locality
                .unwrap_or_else(|| UNKNOWN_CITY.to_string()),
            latitude: main.as_ref().map(|c| c.latitude),
            longitude: main.as_ref().map(|c| c.longitude),
        }
    }
}

/// Client for the Foursquare places API
pub struct FoursquareClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FoursquareClient {
    /// Creates a new client
    pub fn new(api_key: impl Into<String>) -> IntegrationResult<Self> {
        Ok(Self {
            client: http_client(REQUEST_TIMEOUT)?,
            api_key: api_key.into(),
            base_url: FOURSQUARE_API_BASE.to_string(),
        })
    }

    /// Replaces the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> IntegrationResult<Self> {
        self.client = http_client(timeout)?;
        Ok(self)
    }

    /// Points the client at another host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl PlacesProvider for FoursquareClient {
    async fn restaurants_near(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> IntegrationResult<Vec<Place>> {
        tracing::debug!(latitude, longitude, "Searching restaurants");

        let response = self
            .client
            .get(format!("{}{}", self.base_url, FOURSQUARE_PLACES_SEARCH))
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[
                ("ll", format!("{latitude},{longitude}")),
                ("radius", SEARCH_RADIUS_METERS.to_string()),
                ("categories", RESTAURANT_CATEGORY.to_string()),
                ("limit", RESULT_LIMIT.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IntegrationError::Provider {
                service: "foursquare",
                status: status.as_u16(),
                message,
            });
        }

        let body: SearchResponse =
            response
                .json()
                .await
                .map_err(|e| IntegrationError::InvalidResponse {
                    service: "foursquare",
                    message: e.to_string(),
                })?;

        Ok(body.results.into_iter().map(Place::from).collect())
    }
}
