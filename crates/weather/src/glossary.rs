//! Field glossaries embedded in every envelope
//!
//! Each table maps a payload field to a one-line meaning with its unit, so the
//! reasoning engine can explain values without outside documentation.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Ordered `field -> meaning` table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glossary {
    entries: &'static [(&'static str, &'static str)],
}

impl Glossary {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }
}

impl Serialize for Glossary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, meaning) in self.entries {
            map.serialize_entry(name, meaning)?;
        }
        map.end()
    }
}

/// The `description` half of an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Description {
    Flat(Glossary),
    Sections(&'static [(&'static str, Glossary)]),
}

impl Serialize for Description {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Description::Flat(glossary) => glossary.serialize(serializer),
            Description::Sections(sections) => {
                let mut map = serializer.serialize_map(Some(sections.len()))?;
                for (name, glossary) in sections.iter() {
                    map.serialize_entry(name, glossary)?;
                }
                map.end()
            }
        }
    }
}

pub const CURRENT: Glossary = Glossary::new(&[
    ("location", "Observed place name: city, district, county or station"),
    ("obsTime", "Observation time, ISO 8601 (YYYY-MM-DDTHH:MM+offset)"),
    ("temp", "Air temperature, °C"),
    ("feelsLike", "Apparent temperature combining temperature, humidity and wind, °C"),
    ("icon", "Weather condition icon code (e.g. 101 = cloudy)"),
    ("text", "Weather condition text, e.g. sunny, cloudy, overcast, light rain"),
    ("wind360", "Wind direction angle in degrees: 0 north, 90 east, 180 south, 270 west"),
    ("windDir", "Wind direction text, e.g. north, northeast, southwest"),
    ("windScale", "Wind force on the Beaufort-style 0-12 scale"),
    ("windSpeed", "Wind speed, km/h"),
    ("humidity", "Relative humidity, %"),
    ("precip", "Precipitation over the past hour, mm"),
    ("pressure", "Atmospheric pressure, hPa"),
    ("vis", "Visibility, km"),
    ("cloud", "Cloud cover, % of sky; may be empty"),
    ("dew", "Dew point temperature, °C; may be empty"),
]);

pub const FORECAST: Glossary = Glossary::new(&[
    ("location", "Place the forecast was issued for"),
    ("fxDate", "Forecast date, YYYY-MM-DD"),
    ("sunrise", "Sunrise time HH:MM; may be empty at high latitudes"),
    ("sunset", "Sunset time HH:MM; may be empty at high latitudes"),
    ("moonrise", "Moonrise time HH:MM; may be empty"),
    ("moonset", "Moonset time HH:MM; may be empty"),
    ("moonPhase", "Moon phase name, e.g. new moon, full moon, first quarter"),
    ("moonPhaseIcon", "Moon phase icon code"),
    ("tempMax", "Forecast daily maximum temperature, °C"),
    ("tempMin", "Forecast daily minimum temperature, °C"),
    ("iconDay", "Daytime condition icon code"),
    ("textDay", "Daytime condition text, e.g. sunny, cloudy, light rain"),
    ("iconNight", "Night condition icon code"),
    ("textNight", "Night condition text, e.g. clear, cloudy, light rain"),
    ("wind360Day", "Daytime wind direction angle in degrees, 0 north, 90 east"),
    ("windDirDay", "Daytime wind direction text"),
    ("windScaleDay", "Daytime wind force, 0-12 scale"),
    ("windSpeedDay", "Daytime wind speed, km/h"),
    ("wind360Night", "Night wind direction angle in degrees, 0 north, 90 east"),
    ("windDirNight", "Night wind direction text"),
    ("windScaleNight", "Night wind force, 0-12 scale"),
    ("windSpeedNight", "Night wind speed, km/h"),
    ("precip", "Total precipitation for the day, mm"),
    ("uvIndex", "UV index; higher is stronger"),
    ("humidity", "Relative humidity, %"),
    ("pressure", "Atmospheric pressure, hPa"),
    ("vis", "Visibility, km"),
    ("cloud", "Cloud cover, %; may be empty"),
]);

pub const HISTORICAL_DAILY: Glossary = Glossary::new(&[
    ("date", "Date, YYYY-MM-DD"),
    ("sunrise", "Sunrise time HH:MM; may be empty at high latitudes"),
    ("sunset", "Sunset time HH:MM; may be empty at high latitudes"),
    ("moonrise", "Moonrise time HH:MM; may be empty"),
    ("moonset", "Moonset time HH:MM; may be empty"),
    ("moonPhase", "Moon phase name"),
    ("tempMax", "Daily maximum temperature, °C"),
    ("tempMin", "Daily minimum temperature, °C"),
    ("precip", "Total precipitation for the day, mm"),
    ("pressure", "Mean atmospheric pressure, hPa"),
    ("humidity", "Mean relative humidity, %"),
]);

pub const HISTORICAL_HOURLY: Glossary = Glossary::new(&[
    ("time", "Hour, YYYY-MM-DD HH:MM"),
    ("temp", "Air temperature for the hour, °C"),
    ("icon", "Condition icon code for the hour"),
    ("text", "Condition text for the hour, e.g. sunny, cloudy, light rain"),
    ("wind360", "Wind direction angle in degrees, 0 north, 90 east"),
    ("windDir", "Wind direction text"),
    ("windScale", "Wind force, 0-12 scale"),
    ("windSpeed", "Wind speed, km/h"),
    ("humidity", "Relative humidity, %"),
    ("precip", "Accumulated precipitation for the hour, mm"),
    ("pressure", "Atmospheric pressure, hPa"),
]);

pub const HISTORICAL: &[(&str, Glossary)] = &[
    ("weatherDaily", HISTORICAL_DAILY),
    ("weatherHourly", HISTORICAL_HOURLY),
];
