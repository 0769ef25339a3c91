//! Weather tools backed by the response assembler

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use nimbus_config::WeatherConfig;
use nimbus_weather::{HistoricalDate, QWeatherClient, ResponseAssembler, WeatherError};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::ToolTrait;

/// QWeather client configured from `weather` settings
pub fn weather_client(config: &WeatherConfig, api_key: impl Into<String>) -> QWeatherClient {
    QWeatherClient::new(config.api_host.clone(), api_key)
        .with_timeout(Duration::from_secs(config.timeout_secs))
        .with_max_retries(config.max_retries)
        .with_geo_cache_ttl(Duration::from_secs(config.geo_cache_ttl_secs))
}

fn error_text(err: &WeatherError) -> String {
    format!("Error: {}", err)
}

fn city_schema() -> Value {
    json!({
        "type": "string",
        "description": "City or place name, e.g. 北京 or Tokyo"
    })
}

#[derive(Deserialize)]
struct CityArgs {
    city: String,
}

/// Current conditions for every place matching a name
pub struct WeatherNowTool {
    assembler: Arc<ResponseAssembler>,
}

impl WeatherNowTool {
    pub fn new(assembler: Arc<ResponseAssembler>) -> Self {
        Self { assembler }
    }
}

#[async_trait]
impl ToolTrait for WeatherNowTool {
    fn name(&self) -> &str {
        "weather_now"
    }

    fn description(&self) -> &str {
        "Get the current weather for a city. Use when the question is about today or right now."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "city": city_schema() },
            "required": ["city"]
        })
    }

    async fn execute(
        &self,
        args: Value,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let CityArgs { city } = serde_json::from_value(args)?;

        let rendered = match self.assembler.now(&city).await {
            Ok(envelope) => envelope.render(&format!("Weather data related to {}:", city)),
            Err(e) => Err(e),
        };
        Ok(rendered.unwrap_or_else(|e| error_text(&e)))
    }
}

#[derive(Deserialize)]
struct ForecastArgs {
    city: String,
    days: u32,
}

/// Multi-day forecast for the first place matching a name
pub struct WeatherForecastTool {
    assembler: Arc<ResponseAssembler>,
}

impl WeatherForecastTool {
    pub fn new(assembler: Arc<ResponseAssembler>) -> Self {
        Self { assembler }
    }
}

#[async_trait]
impl ToolTrait for WeatherForecastTool {
    fn name(&self) -> &str {
        "weather_forecast"
    }

    fn description(&self) -> &str {
        "Get the daily weather forecast for a city. Use when the question is about a future \
         date. `days` is the forecast length and must be one of 3, 7, 10, 15 or 30; pick the \
         smallest value that covers the requested date."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": city_schema(),
                "days": {
                    "type": "integer",
                    "enum": [3, 7, 10, 15, 30],
                    "description": "Number of forecast days"
                }
            },
            "required": ["city", "days"]
        })
    }

    async fn execute(
        &self,
        args: Value,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let ForecastArgs { city, days } = serde_json::from_value(args)?;

        let rendered = match self.assembler.forecast(&city, days).await {
            Ok(envelope) => envelope.render(&format!("Forecast for {} ({} days):", city, days)),
            Err(e) => Err(e),
        };
        Ok(rendered.unwrap_or_else(|e| error_text(&e)))
    }
}

#[derive(Deserialize)]
struct PastArgs {
    city: String,
    date: String,
}

/// One recent past day for the first place matching a name
pub struct WeatherPastTool {
    assembler: Arc<ResponseAssembler>,
}

impl WeatherPastTool {
    pub fn new(assembler: Arc<ResponseAssembler>) -> Self {
        Self { assembler }
    }
}

#[async_trait]
impl ToolTrait for WeatherPastTool {
    fn name(&self) -> &str {
        "weather_past"
    }

    fn description(&self) -> &str {
        "Get the recorded weather of a city on a past date, with daily summary and hourly \
         readings. Only the 10 days before today are available (today itself is not). \
         `date` is formatted yyyyMMdd, e.g. 20200531."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": city_schema(),
                "date": {
                    "type": "string",
                    "pattern": "^[0-9]{8}$",
                    "description": "Date formatted yyyyMMdd"
                }
            },
            "required": ["city", "date"]
        })
    }

    async fn execute(
        &self,
        args: Value,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let PastArgs { city, date } = serde_json::from_value(args)?;

        match self.assembler.past(&city, &date).await {
            Ok(envelope) => Ok(envelope
                .render(&format!("Weather in {} on {}:", city, date))
                .unwrap_or_else(|e| error_text(&e))),
            Err(e) => {
                let mut text = error_text(&e);
                let outside = matches!(e, WeatherError::Rejected { .. })
                    && HistoricalDate::parse(&date)
                        .map(|d| !d.within_window(Local::now().date_naive()))
                        .unwrap_or(false);
                if outside {
                    debug!("{} is outside the historical window", date);
                    text.push_str(" (historical data covers only the 10 days before today)");
                }
                Ok(text)
            }
        }
    }
}
