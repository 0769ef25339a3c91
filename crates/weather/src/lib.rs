//! Weather retrieval for the assistant
//!
//! Place-name resolution, the three weather views (current, forecast,
//! historical) and the self-describing envelopes returned to the engine.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

pub mod envelope;
pub mod glossary;
pub mod model;
pub mod qweather;

pub use envelope::{QueryEnvelope, ResponseAssembler};
pub use glossary::{Description, Glossary};
pub use model::{
    CurrentObservation, ForecastDay, ForecastHorizon, ForecastReport, HistoricalDaily,
    HistoricalDate, HistoricalRecord, HistoricalReport, HourlyReading, LocationCandidate,
    WeatherSnapshot,
};
pub use qweather::QWeatherClient;

/// Why a place name produced no usable candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// The provider knows no place by that name
    NoMatch,
    /// The provider answered with a non-success code
    Status(String),
    /// The payload had no usable location list
    Malformed,
    /// The lookup never got an answer
    Transport(String),
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionFailure::NoMatch => f.write_str("no matching place"),
            ResolutionFailure::Status(code) => write!(f, "provider returned code {}", code),
            ResolutionFailure::Malformed => f.write_str("malformed lookup response"),
            ResolutionFailure::Transport(msg) => write!(f, "lookup failed: {}", msg),
        }
    }
}

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("could not find '{name}': {reason}")]
    ResolutionFailed {
        name: String,
        reason: ResolutionFailure,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("weather provider unreachable: {0}")]
    Transport(String),

    #[error("weather provider rejected the request (code {code})")]
    Rejected { code: String },

    #[error("unexpected weather payload: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, WeatherError>;

/// Turns a free-text place name into ordered candidates.
///
/// Implementations report "nothing found" as
/// [`WeatherError::ResolutionFailed`] rather than an empty list.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<Vec<LocationCandidate>>;
}

/// The three weather views for one resolved candidate
#[async_trait]
pub trait WeatherFetcher: Send + Sync {
    async fn current(&self, candidate: &LocationCandidate) -> Result<WeatherSnapshot>;

    async fn forecast(
        &self,
        candidate: &LocationCandidate,
        horizon: ForecastHorizon,
    ) -> Result<Vec<ForecastDay>>;

    async fn historical(
        &self,
        candidate: &LocationCandidate,
        date: &HistoricalDate,
    ) -> Result<HistoricalRecord>;
}
