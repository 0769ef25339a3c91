//! Response assembly: resolve, fetch, and wrap data with its glossary

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::glossary::{self, Description};
use crate::model::{
    ForecastHorizon, ForecastReport, HistoricalDate, HistoricalReport, LocationCandidate,
    WeatherSnapshot,
};
use crate::{Geocoder, ResolutionFailure, Result, WeatherError, WeatherFetcher};

/// Self-describing `{description, data}` pair handed to the engine
#[derive(Debug, Clone, Serialize)]
pub struct QueryEnvelope<T> {
    pub description: Description,
    pub data: T,
}

impl<T: Serialize> QueryEnvelope<T> {
    pub fn new(description: Description, data: T) -> Self {
        Self { description, data }
    }

    /// Heading line followed by the pretty-printed envelope
    pub fn render(&self, heading: &str) -> Result<String> {
        let body = serde_json::to_string_pretty(self)
            .map_err(|e| WeatherError::Parse(format!("envelope encoding failed: {}", e)))?;
        Ok(format!("{}\n{}", heading, body))
    }
}

/// Builds envelopes for the three weather views.
///
/// Current conditions fan out over every candidate a name resolves to;
/// forecast and historical views use only the first candidate.
#[derive(Clone)]
pub struct ResponseAssembler {
    geocoder: Arc<dyn Geocoder>,
    fetcher: Arc<dyn WeatherFetcher>,
}

impl ResponseAssembler {
    pub fn new(geocoder: Arc<dyn Geocoder>, fetcher: Arc<dyn WeatherFetcher>) -> Self {
        Self { geocoder, fetcher }
    }

    /// Use one client for both roles
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: Geocoder + WeatherFetcher + 'static,
    {
        Self {
            geocoder: client.clone(),
            fetcher: client,
        }
    }

    async fn candidates(&self, city: &str) -> Result<Vec<LocationCandidate>> {
        let candidates = self.geocoder.resolve(city).await?;
        if candidates.is_empty() {
            return Err(WeatherError::ResolutionFailed {
                name: city.to_string(),
                reason: ResolutionFailure::NoMatch,
            });
        }
        debug!("'{}' resolved to {} candidate(s)", city, candidates.len());
        Ok(candidates)
    }

    async fn first_candidate(&self, city: &str) -> Result<LocationCandidate> {
        let mut candidates = self.candidates(city).await?;
        if candidates.len() > 1 {
            debug!(
                "'{}' is ambiguous, using '{}' and dropping {} other(s)",
                city,
                candidates[0].display_name,
                candidates.len() - 1
            );
        }
        Ok(candidates.swap_remove(0))
    }

    /// Current conditions for every candidate, in resolution order
    pub async fn now(&self, city: &str) -> Result<QueryEnvelope<Vec<WeatherSnapshot>>> {
        let candidates = self.candidates(city).await?;

        let mut data = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            data.push(self.fetcher.current(candidate).await?);
        }

        Ok(QueryEnvelope::new(Description::Flat(glossary::CURRENT), data))
    }

    /// Forecast for the first candidate; `days` is validated before any lookup
    pub async fn forecast(&self, city: &str, days: u32) -> Result<QueryEnvelope<ForecastReport>> {
        let horizon = ForecastHorizon::try_from(days)?;
        let candidate = self.first_candidate(city).await?;
        let daily = self.fetcher.forecast(&candidate, horizon).await?;

        Ok(QueryEnvelope::new(
            Description::Flat(glossary::FORECAST),
            ForecastReport {
                location: candidate.display_name,
                daily,
            },
        ))
    }

    /// One past date for the first candidate; `date` is validated before any lookup
    pub async fn past(&self, city: &str, date: &str) -> Result<QueryEnvelope<HistoricalReport>> {
        let date = HistoricalDate::parse(date)?;
        let candidate = self.first_candidate(city).await?;
        let record = self.fetcher.historical(&candidate, &date).await?;

        Ok(QueryEnvelope::new(
            Description::Sections(glossary::HISTORICAL),
            HistoricalReport {
                location: candidate.display_name,
                record,
            },
        ))
    }
}
