//! QWeather HTTP client
//!
//! Implements [`Geocoder`] and [`WeatherFetcher`] against the QWeather v7 API.
//! All calls are idempotent GETs, bounded by a timeout and retried on
//! connect or timeout failures.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::model::{
    CurrentObservation, ForecastDay, ForecastHorizon, HistoricalDate, HistoricalRecord,
    LocationCandidate, WeatherSnapshot,
};
use crate::{Geocoder, ResolutionFailure, Result, WeatherError, WeatherFetcher};

const GEO_LOOKUP: &str = "/geo/v2/city/lookup";
const WEATHER_NOW: &str = "/v7/weather/now";
const HISTORICAL_WEATHER: &str = "/v7/historical/weather";

/// Business code the provider uses for success
const CODE_OK: &str = "200";

#[derive(Deserialize)]
struct GeoItem {
    id: String,
    name: String,
}

/// Short-lived cache of geocode results keyed by the trimmed name
struct GeoCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, Vec<LocationCandidate>)>>,
}

impl GeoCache {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, key: &str) -> Option<Vec<LocationCandidate>> {
        if self.ttl.is_zero() {
            return None;
        }
        let mut entries = self.entries.lock().ok()?;
        let cached = entries
            .get(key)
            .map(|(stored, candidates)| (stored.elapsed() < self.ttl, candidates.clone()));
        match cached {
            Some((true, candidates)) => Some(candidates),
            Some((false, _)) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, candidates: &[LocationCandidate]) {
        if self.ttl.is_zero() {
            return;
        }
        if let Ok(mut entries) = self.entries.lock() {
            let ttl = self.ttl;
            entries.retain(|_, (stored, _)| stored.elapsed() < ttl);
            entries.insert(key.to_string(), (Instant::now(), candidates.to_vec()));
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }
}

pub struct QWeatherClient {
    http: Client,
    api_host: String,
    api_key: String,
    timeout: Duration,
    max_retries: u32,
    geo_cache: GeoCache,
}

impl QWeatherClient {
    pub fn new(api_host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_host: api_host.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
            max_retries: 2,
            geo_cache: GeoCache::new(Duration::from_secs(300)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extra attempts after a connect or timeout failure
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// A zero TTL disables geocode caching
    pub fn with_geo_cache_ttl(mut self, ttl: Duration) -> Self {
        self.geo_cache = GeoCache::new(ttl);
        self
    }

    /// GET an endpoint and decode the body as JSON.
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}{}", self.api_host, path);
        let mut attempt = 0;

        let response = loop {
            trace!("GET {} (attempt {})", url, attempt + 1);
            let sent = self
                .http
                .get(&url)
                .query(query)
                .query(&[("key", self.api_key.as_str())])
                .timeout(self.timeout)
                .send()
                .await;

            match sent {
                Ok(response) => break response,
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.max_retries => {
                    attempt += 1;
                    warn!("{} failed ({}), retry {}/{}", path, e, attempt, self.max_retries);
                    tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
                }
                Err(e) => return Err(WeatherError::Transport(format!("{}: {}", path, e))),
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Transport(format!("{} returned HTTP {}", path, status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| WeatherError::Transport(format!("{}: {}", path, e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| WeatherError::Parse(format!("{} body is not JSON: {}", path, e)))
    }

    /// Fail with `Rejected` when the body carries a non-success business code.
    fn check_code(body: &Value) -> Result<()> {
        match body.get("code").and_then(Value::as_str) {
            Some(code) if code != CODE_OK => Err(WeatherError::Rejected {
                code: code.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Decode a required top-level field.
    fn field<T: DeserializeOwned>(body: &mut Value, name: &str) -> Result<T> {
        let value = body
            .get_mut(name)
            .map(Value::take)
            .ok_or_else(|| WeatherError::Parse(format!("missing '{}' in response", name)))?;
        serde_json::from_value(value)
            .map_err(|e| WeatherError::Parse(format!("malformed '{}': {}", name, e)))
    }

    async fn lookup(&self, name: &str) -> std::result::Result<Vec<LocationCandidate>, ResolutionFailure> {
        let mut body = match self.get_json(GEO_LOOKUP, &[("location", name)]).await {
            Ok(body) => body,
            Err(WeatherError::Parse(_)) => return Err(ResolutionFailure::Malformed),
            Err(e) => return Err(ResolutionFailure::Transport(e.to_string())),
        };

        match body.get("code").and_then(Value::as_str) {
            Some(CODE_OK) | None => {}
            Some("404") | Some("204") => return Err(ResolutionFailure::NoMatch),
            Some(code) => return Err(ResolutionFailure::Status(code.to_string())),
        }

        let items: Vec<GeoItem> =
            Self::field(&mut body, "location").map_err(|_| ResolutionFailure::Malformed)?;
        if items.is_empty() {
            return Err(ResolutionFailure::NoMatch);
        }

        Ok(items
            .into_iter()
            .map(|item| LocationCandidate::new(item.id, item.name))
            .collect())
    }
}

#[async_trait]
impl Geocoder for QWeatherClient {
    async fn resolve(&self, name: &str) -> Result<Vec<LocationCandidate>> {
        let key = name.trim();
        if let Some(candidates) = self.geo_cache.get(key) {
            debug!("geocode cache hit for '{}'", key);
            return Ok(candidates);
        }

        let candidates = self
            .lookup(key)
            .await
            .map_err(|reason| WeatherError::ResolutionFailed {
                name: key.to_string(),
                reason,
            })?;

        self.geo_cache.put(key, &candidates);
        Ok(candidates)
    }
}

#[async_trait]
impl WeatherFetcher for QWeatherClient {
    async fn current(&self, candidate: &LocationCandidate) -> Result<WeatherSnapshot> {
        let mut body = self
            .get_json(WEATHER_NOW, &[("location", candidate.id.as_str())])
            .await?;
        Self::check_code(&body)?;
        let observation: CurrentObservation = Self::field(&mut body, "now")?;

        Ok(WeatherSnapshot {
            location: candidate.display_name.clone(),
            observation,
        })
    }

    async fn forecast(
        &self,
        candidate: &LocationCandidate,
        horizon: ForecastHorizon,
    ) -> Result<Vec<ForecastDay>> {
        let mut body = self
            .get_json(horizon.endpoint(), &[("location", candidate.id.as_str())])
            .await?;
        Self::check_code(&body)?;
        Self::field(&mut body, "daily")
    }

    async fn historical(
        &self,
        candidate: &LocationCandidate,
        date: &HistoricalDate,
    ) -> Result<HistoricalRecord> {
        let date = date.as_param();
        let mut body = self
            .get_json(
                HISTORICAL_WEATHER,
                &[("location", candidate.id.as_str()), ("date", date.as_str())],
            )
            .await?;
        Self::check_code(&body)?;

        Ok(HistoricalRecord {
            daily: Self::field(&mut body, "weatherDaily")?,
            hourly: Self::field(&mut body, "weatherHourly")?,
        })
    }
}
