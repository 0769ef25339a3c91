//! Typed weather records and argument domains

use std::fmt;
use std::sync::OnceLock;

use chrono::{Duration, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Result, WeatherError};

/// Days of past data the provider keeps, today excluded
pub const HISTORY_WINDOW_DAYS: i64 = 10;

/// One resolved place for a (possibly ambiguous) name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub id: String,
    pub display_name: String,
}

impl LocationCandidate {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Observed conditions, as reported by `/v7/weather/now`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentObservation {
    pub obs_time: String,
    pub temp: String,
    pub feels_like: String,
    pub icon: String,
    pub text: String,
    pub wind360: String,
    pub wind_dir: String,
    pub wind_scale: String,
    pub wind_speed: String,
    pub humidity: String,
    pub precip: String,
    pub pressure: String,
    pub vis: String,
    #[serde(default)]
    pub cloud: String,
    #[serde(default)]
    pub dew: String,
}

/// Current conditions tagged with the candidate they belong to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: String,
    #[serde(flatten)]
    pub observation: CurrentObservation,
}

/// One day of a multi-day forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub fx_date: String,
    #[serde(default)]
    pub sunrise: String,
    #[serde(default)]
    pub sunset: String,
    #[serde(default)]
    pub moonrise: String,
    #[serde(default)]
    pub moonset: String,
    #[serde(default)]
    pub moon_phase: String,
    #[serde(default)]
    pub moon_phase_icon: String,
    pub temp_max: String,
    pub temp_min: String,
    pub icon_day: String,
    pub text_day: String,
    pub icon_night: String,
    pub text_night: String,
    pub wind360_day: String,
    pub wind_dir_day: String,
    pub wind_scale_day: String,
    pub wind_speed_day: String,
    pub wind360_night: String,
    pub wind_dir_night: String,
    pub wind_scale_night: String,
    pub wind_speed_night: String,
    pub precip: String,
    #[serde(default)]
    pub uv_index: String,
    pub humidity: String,
    pub pressure: String,
    #[serde(default)]
    pub vis: String,
    #[serde(default)]
    pub cloud: String,
}

/// Forecast days for the first resolved candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub location: String,
    pub daily: Vec<ForecastDay>,
}

/// Whole-day summary of a past date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalDaily {
    pub date: String,
    #[serde(default)]
    pub sunrise: String,
    #[serde(default)]
    pub sunset: String,
    #[serde(default)]
    pub moonrise: String,
    #[serde(default)]
    pub moonset: String,
    #[serde(default)]
    pub moon_phase: String,
    pub temp_max: String,
    pub temp_min: String,
    pub precip: String,
    #[serde(default)]
    pub pressure: String,
    #[serde(default)]
    pub humidity: String,
}

/// One hour of a past date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyReading {
    pub time: String,
    pub temp: String,
    pub icon: String,
    pub text: String,
    pub wind360: String,
    pub wind_dir: String,
    pub wind_scale: String,
    pub wind_speed: String,
    pub humidity: String,
    pub precip: String,
    pub pressure: String,
}

/// Daily summary plus ordered hourly readings for one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    #[serde(rename = "weatherDaily")]
    pub daily: HistoricalDaily,
    #[serde(rename = "weatherHourly")]
    pub hourly: Vec<HourlyReading>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalReport {
    pub location: String,
    #[serde(flatten)]
    pub record: HistoricalRecord,
}

/// Forecast length; the provider only serves these horizons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForecastHorizon {
    ThreeDays,
    SevenDays,
    TenDays,
    FifteenDays,
    ThirtyDays,
}

impl ForecastHorizon {
    pub const ALL: [ForecastHorizon; 5] = [
        ForecastHorizon::ThreeDays,
        ForecastHorizon::SevenDays,
        ForecastHorizon::TenDays,
        ForecastHorizon::FifteenDays,
        ForecastHorizon::ThirtyDays,
    ];

    pub fn days(self) -> u32 {
        match self {
            ForecastHorizon::ThreeDays => 3,
            ForecastHorizon::SevenDays => 7,
            ForecastHorizon::TenDays => 10,
            ForecastHorizon::FifteenDays => 15,
            ForecastHorizon::ThirtyDays => 30,
        }
    }

    /// Provider endpoint serving this horizon
    pub fn endpoint(self) -> &'static str {
        match self {
            ForecastHorizon::ThreeDays => "/v7/weather/3d",
            ForecastHorizon::SevenDays => "/v7/weather/7d",
            ForecastHorizon::TenDays => "/v7/weather/10d",
            ForecastHorizon::FifteenDays => "/v7/weather/15d",
            ForecastHorizon::ThirtyDays => "/v7/weather/30d",
        }
    }
}

impl TryFrom<u32> for ForecastHorizon {
    type Error = WeatherError;

    fn try_from(days: u32) -> Result<Self> {
        ForecastHorizon::ALL
            .into_iter()
            .find(|h| h.days() == days)
            .ok_or_else(|| {
                WeatherError::InvalidArgument(format!(
                    "forecast days must be one of 3, 7, 10, 15, 30 (got {})",
                    days
                ))
            })
    }
}

impl fmt::Display for ForecastHorizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days())
    }
}

fn date_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| Regex::new(r"^[0-9]{8}$").expect("static pattern"))
}

/// A `yyyyMMdd` calendar date for the historical endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HistoricalDate(NaiveDate);

impl HistoricalDate {
    /// Parse exactly eight digits forming a real date. Surrounding
    /// whitespace is rejected like any other stray character.
    pub fn parse(input: &str) -> Result<Self> {
        if !date_shape().is_match(input) {
            return Err(WeatherError::InvalidArgument(format!(
                "date must be formatted yyyyMMdd, e.g. 20200531 (got '{}')",
                input
            )));
        }
        NaiveDate::parse_from_str(input, "%Y%m%d")
            .map(HistoricalDate)
            .map_err(|_| {
                WeatherError::InvalidArgument(format!("'{}' is not a calendar date", input))
            })
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Query-string form
    pub fn as_param(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// Whether the provider keeps data for this date: one of the ten days
    /// strictly before `today`. Not enforced here; the provider rejects the rest.
    pub fn within_window(&self, today: NaiveDate) -> bool {
        self.0 < today && self.0 >= today - Duration::days(HISTORY_WINDOW_DAYS)
    }
}

impl From<NaiveDate> for HistoricalDate {
    fn from(date: NaiveDate) -> Self {
        HistoricalDate(date)
    }
}

impl fmt::Display for HistoricalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_param())
    }
}
