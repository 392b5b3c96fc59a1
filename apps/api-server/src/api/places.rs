//! Places search endpoint.

use std::sync::Arc;

use api_protocol::{Place, PlacesQuery};
use axum::{Json, extract::State};
use sortie_store::SortieStore;

use crate::error::{ServerError, ServerResult};
use crate::extract::ValidQuery;
use crate::state::AppState;

fn coordinate(value: Option<String>, name: &str, bound: f64) -> ServerResult<f64> {
    let raw = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServerError::InvalidRequest(format!("{name} is required")))?;

    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() <= bound)
        .ok_or_else(|| {
            ServerError::InvalidRequest(format!("{name} must be a number in [-{bound}, {bound}]"))
        })
}

/// Restaurants near a point.
pub async fn restaurants_near<S: SortieStore>(
    State(state): State<Arc<AppState<S>>>,
    ValidQuery(query): ValidQuery<PlacesQuery>,
) -> ServerResult<Json<Vec<Place>>> {
    let latitude = coordinate(query.lat, "lat", 90.0)?;
    let longitude = coordinate(query.lon, "lon", 180.0)?;

    let places = state.places.as_ref().ok_or_else(|| {
        ServerError::ServiceUnavailable("Places search is not configured".to_string())
    })?;

    let results = places.restaurants_near(latitude, longitude).await?;

    tracing::debug!(latitude, longitude, count = results.len(), "Places search");

    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_parsing() {
        assert_eq!(coordinate(Some(" 48.85 ".to_string()), "lat", 90.0).unwrap(), 48.85);
        assert!(coordinate(Some("91".to_string()), "lat", 90.0).is_err());
        assert!(coordinate(Some("north".to_string()), "lat", 90.0).is_err());
        assert!(coordinate(Some("NaN".to_string()), "lon", 180.0).is_err());
        assert!(coordinate(None, "lon", 180.0).is_err());
    }
}
