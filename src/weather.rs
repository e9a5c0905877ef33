use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::error::WeatherError;

/// Summary metrics carried by the 24-hour forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Temperature,
    Humidity,
    Wind,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Wind => "wind",
        };
        f.write_str(name)
    }
}

impl FromStr for Metric {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temperature" => Ok(Metric::Temperature),
            "humidity" | "relative_humidity" | "relativehumidity" => Ok(Metric::Humidity),
            "wind" => Ok(Metric::Wind),
            _ => Err(WeatherError::UnknownMetric(s.to_string())),
        }
    }
}

/// A high/low reading, optionally with a wind direction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Reading {
    pub high: Option<f32>,
    pub low: Option<f32>,
    pub direction: Option<String>,
}

impl Reading {
    pub fn range(low: f32, high: f32) -> Self {
        Self {
            high: Some(high),
            low: Some(low),
            direction: None,
        }
    }

    /// Midpoint of the range, or `None` unless both ends are present.
    pub fn average(&self) -> Option<f32> {
        match (self.high, self.low) {
            (Some(high), Some(low)) => Some((high + low) / 2.0),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.high.is_none() && self.low.is_none() && self.direction.is_none()
    }
}

/// Today's summary from the 24-hour forecast.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TodaySummary {
    pub forecast: Option<String>,
    pub readings: HashMap<Metric, Reading>,
}

/// Near-term condition text for one area, keeping the upstream spelling of its name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaForecast {
    pub area: String,
    pub forecast: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyForecast {
    pub date: Option<NaiveDate>,
    pub temperature: Option<Reading>,
    pub humidity: Option<Reading>,
    pub wind: Option<Reading>,
    pub forecast: Option<String>,
}

/// Everything cached from one successful refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ForecastSnapshot {
    /// Keyed by lowercased area name.
    pub near_term_by_area: HashMap<String, AreaForecast>,
    pub multi_day: Vec<DailyForecast>,
    pub today: Option<TodaySummary>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl ForecastSnapshot {
    pub fn is_empty(&self) -> bool {
        self.last_updated.is_none()
    }

    pub fn area_key(area: &str) -> String {
        area.trim().to_lowercase()
    }

    pub fn insert_area(&mut self, entry: AreaForecast) {
        self.near_term_by_area
            .insert(Self::area_key(&entry.area), entry);
    }
}
