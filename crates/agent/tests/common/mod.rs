//! Shared doubles for agent tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Local;
use mockall::{mock, Sequence};
use nimbus_agent::{register_weather_tools, ToolRegistry};
use nimbus_provider::{ChatParams, ChatResponse, Provider, ProviderError, ToolCall};
use nimbus_weather::{
    ForecastDay, ForecastHorizon, Geocoder, HistoricalDate, HistoricalRecord, LocationCandidate,
    ResolutionFailure, ResponseAssembler, WeatherError, WeatherFetcher, WeatherSnapshot,
};
use serde_json::{json, Value};

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError>;
        fn default_model(&self) -> String;
    }
}

/// Every `ChatParams` the engine double received, in order
pub type SeenParams = Arc<Mutex<Vec<ChatParams>>>;

/// Engine double that replays `responses` in order and records its inputs
pub fn scripted_provider(responses: Vec<ChatResponse>) -> (MockProvider, SeenParams) {
    let seen: SeenParams = Arc::new(Mutex::new(Vec::new()));
    let mut provider = MockProvider::new();
    provider
        .expect_default_model()
        .returning(|| "mock-model".to_string());

    let mut seq = Sequence::new();
    for response in responses {
        let seen = seen.clone();
        provider
            .expect_chat()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |params| {
                seen.lock().unwrap().push(params);
                Ok(response.clone())
            });
    }
    (provider, seen)
}

pub fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

/// In-process weather provider with a fixed gazetteer
pub struct FakeWeather {
    places: HashMap<&'static str, Vec<LocationCandidate>>,
    pub geocode_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl FakeWeather {
    pub fn new() -> Self {
        let mut places = HashMap::new();
        places.insert("北京", vec![LocationCandidate::new("101010100", "北京")]);
        places.insert("上海", vec![LocationCandidate::new("101020100", "上海")]);
        places.insert("东京", vec![LocationCandidate::new("1D2A3", "东京")]);
        places.insert(
            "朝阳",
            vec![
                LocationCandidate::new("101010300", "朝阳"),
                LocationCandidate::new("101071201", "朝阳县"),
            ],
        );
        Self {
            places,
            geocode_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn geocodes(&self) -> usize {
        self.geocode_calls.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for FakeWeather {
    async fn resolve(&self, name: &str) -> Result<Vec<LocationCandidate>, WeatherError> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        self.places
            .get(name)
            .cloned()
            .ok_or_else(|| WeatherError::ResolutionFailed {
                name: name.to_string(),
                reason: ResolutionFailure::NoMatch,
            })
    }
}

#[async_trait]
impl WeatherFetcher for FakeWeather {
    async fn current(&self, candidate: &LocationCandidate) -> Result<WeatherSnapshot, WeatherError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let mut body = json!({
            "obsTime": "2024-01-11T08:00+08:00",
            "temp": "-3",
            "feelsLike": "-8",
            "icon": "100",
            "text": "晴",
            "wind360": "315",
            "windDir": "西北风",
            "windScale": "3",
            "windSpeed": "15",
            "humidity": "23",
            "precip": "0.0",
            "pressure": "1032",
            "vis": "30"
        });
        body["location"] = json!(candidate.display_name);
        Ok(serde_json::from_value(body).unwrap())
    }

    async fn forecast(
        &self,
        _candidate: &LocationCandidate,
        horizon: ForecastHorizon,
    ) -> Result<Vec<ForecastDay>, WeatherError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok((1..=horizon.days())
            .map(|d| {
                serde_json::from_value(json!({
                    "fxDate": format!("2024-01-{:02}", d),
                    "tempMax": "3",
                    "tempMin": "-7",
                    "iconDay": "100",
                    "textDay": "晴",
                    "iconNight": "150",
                    "textNight": "晴",
                    "wind360Day": "315",
                    "windDirDay": "西北风",
                    "windScaleDay": "1-3",
                    "windSpeedDay": "16",
                    "wind360Night": "0",
                    "windDirNight": "北风",
                    "windScaleNight": "1-3",
                    "windSpeedNight": "3",
                    "humidity": "30",
                    "precip": "0.0",
                    "pressure": "1030",
                    "uvIndex": "2"
                }))
                .unwrap()
            })
            .collect())
    }

    async fn historical(
        &self,
        _candidate: &LocationCandidate,
        date: &HistoricalDate,
    ) -> Result<HistoricalRecord, WeatherError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if !date.within_window(Local::now().date_naive()) {
            return Err(WeatherError::Rejected {
                code: "400".to_string(),
            });
        }
        Ok(serde_json::from_value(json!({
            "weatherDaily": {
                "date": date.date().format("%Y-%m-%d").to_string(),
                "tempMax": "9",
                "tempMin": "1",
                "humidity": "61",
                "precip": "0.0",
                "pressure": "1025"
            },
            "weatherHourly": [{
                "time": "00:00",
                "temp": "3",
                "icon": "150",
                "text": "晴",
                "wind360": "338",
                "windDir": "西北风",
                "windScale": "1",
                "windSpeed": "4",
                "humidity": "80",
                "precip": "0.0",
                "pressure": "1024"
            }]
        }))
        .unwrap())
    }
}

/// Registry with all four tools wired to `weather`
pub fn registry_with(weather: Arc<FakeWeather>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    register_weather_tools(&mut registry, Arc::new(ResponseAssembler::from_client(weather)));
    registry
}
