//! Shared fixtures for weather tests
#![allow(dead_code)]

use nimbus_weather::{
    CurrentObservation, ForecastDay, HistoricalDaily, HistoricalRecord, HourlyReading,
    LocationCandidate, WeatherSnapshot,
};
use serde_json::{json, Value};

pub fn candidate(id: &str, name: &str) -> LocationCandidate {
    LocationCandidate::new(id, name)
}

pub fn now_json() -> Value {
    json!({
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
        "vis": "30",
        "cloud": "0",
        "dew": "-20"
    })
}

pub fn observation() -> CurrentObservation {
    serde_json::from_value(now_json()).unwrap()
}

pub fn snapshot(location: &str) -> WeatherSnapshot {
    WeatherSnapshot {
        location: location.to_string(),
        observation: observation(),
    }
}

pub fn forecast_day_json(date: &str) -> Value {
    json!({
        "fxDate": date,
        "sunrise": "07:36",
        "sunset": "17:12",
        "moonrise": "06:02",
        "moonset": "15:40",
        "moonPhase": "残月",
        "moonPhaseIcon": "807",
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
        "vis": "25",
        "cloud": "0",
        "uvIndex": "2"
    })
}

pub fn forecast_days(n: usize) -> Vec<ForecastDay> {
    (1..=n)
        .map(|d| serde_json::from_value(forecast_day_json(&format!("2024-01-{:02}", d))).unwrap())
        .collect()
}

pub fn historical_json() -> Value {
    json!({
        "code": "200",
        "weatherDaily": {
            "date": "2024-01-01",
            "sunrise": "07:36",
            "sunset": "17:01",
            "moonrise": "22:40",
            "moonset": "11:16",
            "moonPhase": "亏凸月",
            "tempMax": "9",
            "tempMin": "1",
            "humidity": "61",
            "precip": "0.0",
            "pressure": "1025"
        },
        "weatherHourly": [
            {
                "time": "2024-01-01 00:00",
                "temp": "3",
                "icon": "150",
                "text": "晴",
                "precip": "0.0",
                "wind360": "338",
                "windDir": "西北风",
                "windScale": "1",
                "windSpeed": "4",
                "humidity": "80",
                "pressure": "1024"
            },
            {
                "time": "2024-01-01 01:00",
                "temp": "2",
                "icon": "150",
                "text": "晴",
                "precip": "0.0",
                "wind360": "0",
                "windDir": "北风",
                "windScale": "1",
                "windSpeed": "3",
                "humidity": "83",
                "pressure": "1024"
            }
        ]
    })
}

pub fn historical_record() -> HistoricalRecord {
    let body = historical_json();
    HistoricalRecord {
        daily: serde_json::from_value::<HistoricalDaily>(body["weatherDaily"].clone()).unwrap(),
        hourly: serde_json::from_value::<Vec<HourlyReading>>(body["weatherHourly"].clone())
            .unwrap(),
    }
}
