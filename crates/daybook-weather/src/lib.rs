//! Weather provider client: one outbound GET per lookup, a bounded wait,
//! and a small error taxonomy that drives the retry affordance.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{instrument, warn};

pub mod debounce;
pub mod geolocate;

/// Retries stop once the attempt counter reaches this ceiling.
pub const MAX_ATTEMPTS: u32 = 3;

const DEFAULT_API_BASE: &str = "https://api.openweathermap.org/data/2.5";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);
const ICON_BASE: &str = "https://openweathermap.org/img/wn";

/// Provider settings. The base URL is overridable for self-hosted proxies
/// and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherConfig {
    pub api_key: String,
    pub api_base: Option<String>,
    pub timeout: Duration,
}

impl WeatherConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Lookup failure taxonomy. `InvalidApiKey` and `NotFound` are terminal;
/// `TimedOut` and `Unavailable` may be retried while attempts remain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WeatherError {
    #[error("enter a city to see the weather")]
    EmptyQuery,
    #[error("invalid API key")]
    InvalidApiKey,
    #[error("city not found")]
    NotFound,
    #[error("request timed out")]
    TimedOut,
    #[error("weather data currently unavailable: {reason}")]
    Unavailable { reason: String },
}

impl WeatherError {
    pub fn retryable(&self) -> bool {
        matches!(self, WeatherError::TimedOut | WeatherError::Unavailable { .. })
    }
}

/// Whether a retry should be offered for this failure at this attempt count.
pub fn retry_available(err: &WeatherError, attempt: u32) -> bool {
    err.retryable() && attempt < MAX_ATTEMPTS
}

/// What to display for a successful lookup. Replaced wholesale on every
/// new lookup, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub location: String,
    pub temperature_c: i64,
    pub condition: String,
    pub description: String,
    pub icon_url: String,
}

/// What a lookup was keyed by, kept so retries can re-issue the same
/// request.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupTarget {
    City(String),
    Coords { lat: f64, lon: f64 },
}

pub struct WeatherClient {
    client: reqwest::Client,
    cfg: WeatherConfig,
}

impl WeatherClient {
    pub fn new(cfg: WeatherConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            cfg,
        }
    }

    fn api_base(&self) -> &str {
        self.cfg
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
    }

    #[instrument(skip(self))]
    pub async fn current_by_city(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(WeatherError::EmptyQuery);
        }
        self.fetch(&[("q", city.to_string())], true).await
    }

    /// Coordinate lookups do not get a distinguished not-found: the
    /// provider answers coordinate queries even for remote positions.
    #[instrument(skip(self))]
    pub async fn current_by_coords(&self, lat: f64, lon: f64) -> Result<WeatherReport, WeatherError> {
        self.fetch(
            &[("lat", lat.to_string()), ("lon", lon.to_string())],
            false,
        )
        .await
    }

    pub async fn current(&self, target: &LookupTarget) -> Result<WeatherReport, WeatherError> {
        match target {
            LookupTarget::City(city) => self.current_by_city(city).await,
            LookupTarget::Coords { lat, lon } => self.current_by_coords(*lat, *lon).await,
        }
    }

    /// Lookup with the bounded retry policy applied: retryable failures are
    /// re-issued until the attempt counter reaches `MAX_ATTEMPTS`; terminal
    /// failures return immediately.
    pub async fn current_with_retry(
        &self,
        target: &LookupTarget,
    ) -> Result<WeatherReport, WeatherError> {
        let mut attempt = 0u32;
        loop {
            match self.current(target).await {
                Ok(report) => return Ok(report),
                Err(err) if retry_available(&err, attempt) => {
                    attempt += 1;
                    warn!(%err, attempt, "weather lookup failed, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch(
        &self,
        params: &[(&str, String)],
        city_query: bool,
    ) -> Result<WeatherReport, WeatherError> {
        let url = format!("{}/weather", self.api_base());
        let request = self
            .client
            .get(&url)
            .query(params)
            .query(&[
                ("appid", self.cfg.api_key.as_str()),
                ("units", "metric"),
            ])
            .send();

        // The timeout aborts the in-flight request when it elapses.
        let response = tokio::time::timeout(self.cfg.timeout, request)
            .await
            .map_err(|_| WeatherError::TimedOut)?
            .map_err(|err| {
                if err.is_timeout() {
                    WeatherError::TimedOut
                } else {
                    WeatherError::Unavailable {
                        reason: err.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, city_query));
        }

        let body: WeatherResponse =
            response
                .json()
                .await
                .map_err(|err| WeatherError::Unavailable {
                    reason: format!("malformed response: {err}"),
                })?;
        report_from(body)
    }
}

fn classify_status(status: StatusCode, city_query: bool) -> WeatherError {
    match status {
        StatusCode::UNAUTHORIZED => WeatherError::InvalidApiKey,
        StatusCode::NOT_FOUND if city_query => WeatherError::NotFound,
        other => WeatherError::Unavailable {
            reason: format!("server error ({})", other.as_u16()),
        },
    }
}

/// The provider's fixed response shape; only the fields we display.
#[derive(Debug, Deserialize)]
struct WeatherResponse {
    name: String,
    main: MainReadings,
    weather: Vec<ConditionEntry>,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionEntry {
    main: String,
    description: String,
    icon: String,
}

fn report_from(response: WeatherResponse) -> Result<WeatherReport, WeatherError> {
    let condition = response
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::Unavailable {
            reason: "response carries no condition".to_string(),
        })?;

    Ok(WeatherReport {
        location: response.name,
        temperature_c: response.main.temp.round() as i64,
        condition: condition.main,
        description: condition.description,
        icon_url: format!("{ICON_BASE}/{}@2x.png", condition.icon),
    })
}
