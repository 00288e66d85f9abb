//! IP-based position lookup, the terminal-friendly stand-in for platform
//! geolocation. Failure is terminal: callers direct the user to search by
//! city instead.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

const DEFAULT_ENDPOINT: &str = "http://ip-api.com/json";
const LOCATE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unable to determine your location: {reason}")]
pub struct GeolocateError {
    reason: String,
}

impl GeolocateError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoPosition {
    pub lat: f64,
    pub lon: f64,
    pub city: Option<String>,
}

pub struct GeoLocator {
    client: reqwest::Client,
    endpoint: String,
}

impl Default for GeoLocator {
    fn default() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }
}

impl GeoLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    #[instrument(skip(self))]
    pub async fn locate(&self) -> Result<GeoPosition, GeolocateError> {
        let request = self.client.get(&self.endpoint).send();
        let response = tokio::time::timeout(LOCATE_TIMEOUT, request)
            .await
            .map_err(|_| GeolocateError::new("lookup timed out"))?
            .map_err(|err| GeolocateError::new(err.to_string()))?
            .error_for_status()
            .map_err(|err| GeolocateError::new(err.to_string()))?;

        let body: GeoResponse = response
            .json()
            .await
            .map_err(|err| GeolocateError::new(err.to_string()))?;
        position_from(body)
    }
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    city: Option<String>,
}

fn position_from(response: GeoResponse) -> Result<GeoPosition, GeolocateError> {
    if response.status != "success" {
        return Err(GeolocateError::new(format!(
            "provider answered {}",
            response.status
        )));
    }
    match (response.lat, response.lon) {
        (Some(lat), Some(lon)) => Ok(GeoPosition {
            lat,
            lon,
            city: response.city,
        }),
        _ => Err(GeolocateError::new("provider answered without coordinates")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_successful_answer() {
        let body = r#"{ "status": "success", "lat": 41.15, "lon": -8.61, "city": "Porto" }"#;
        let response: GeoResponse = serde_json::from_str(body).expect("parse");
        let position = position_from(response).expect("position");
        assert_eq!(position.lat, 41.15);
        assert_eq!(position.lon, -8.61);
        assert_eq!(position.city.as_deref(), Some("Porto"));
    }

    #[test]
    fn failure_status_is_an_error() {
        let body = r#"{ "status": "fail", "lat": null, "lon": null, "city": null }"#;
        let response: GeoResponse = serde_json::from_str(body).expect("parse");
        assert!(position_from(response).is_err());
    }

    #[test]
    fn missing_coordinates_are_an_error() {
        let body = r#"{ "status": "success", "lat": 41.15, "lon": null, "city": null }"#;
        let response: GeoResponse = serde_json::from_str(body).expect("parse");
        assert!(position_from(response).is_err());
    }
}
