use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::cache::{ForecastCache, RefreshOutcome};
use crate::clock::{Clock, SystemClock};
use crate::condition::{normalize, Normalized};
use crate::error::WeatherError;
use crate::transport::{HttpTransport, Transport};
use crate::units::direction;
use crate::weather::Metric;

pub const ATTRIBUTION: &str = "Data provided by the Meteorological Service Singapore";
pub const TEMPERATURE_UNIT: &str = "°C";
const UNKNOWN_STATION: &str = "(unknown station)";

/// One day of the multi-day forecast as shown on a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastEntry {
    pub date: NaiveDate,
    pub temperature: Option<f32>,
    pub temperature_low: Option<f32>,
    pub condition: Option<Normalized>,
    /// Upstream wording before normalisation.
    pub condition_class: Option<String>,
    pub attribution: &'static str,
}

/// Dashboard view of one forecast area.
///
/// Owns the cache it reads from; the host calls [`update`](Self::update) on
/// its own schedule and the accessors never touch the network.
pub struct WeatherEntity<T = HttpTransport, C = SystemClock> {
    data: ForecastCache<T, C>,
    location_name: Option<String>,
}

impl<T: Transport, C: Clock> WeatherEntity<T, C> {
    pub fn new(data: ForecastCache<T, C>, location_name: Option<String>) -> Self {
        Self {
            data,
            location_name,
        }
    }

    pub fn update(&mut self) -> Result<RefreshOutcome, WeatherError> {
        self.data.refresh()
    }

    pub fn data(&self) -> &ForecastCache<T, C> {
        &self.data
    }

    pub fn location_name(&self) -> Option<&str> {
        self.location_name.as_deref()
    }

    pub fn name(&self) -> String {
        format!("NEA: {}", self.location_name().unwrap_or(UNKNOWN_STATION))
    }

    pub fn condition(&self) -> Option<Normalized> {
        self.data.condition(self.location_name()?)
    }

    pub fn temperature(&self) -> Option<f32> {
        self.data.today_metric(Metric::Temperature).ok()?.average()
    }

    pub fn humidity(&self) -> Option<f32> {
        self.data.today_metric(Metric::Humidity).ok()?.average()
    }

    pub fn wind_speed(&self) -> Option<f32> {
        self.data.today_metric(Metric::Wind).ok()?.average()
    }

    /// Compass point as published, e.g. `"NNE"`.
    pub fn wind_bearing(&self) -> Option<&str> {
        self.data
            .today_metric(Metric::Wind)
            .ok()?
            .direction
            .as_deref()
    }

    pub fn wind_bearing_degrees(&self) -> Option<f32> {
        direction::compass_to_degree(self.wind_bearing()?)
    }

    pub fn temperature_unit(&self) -> &'static str {
        TEMPERATURE_UNIT
    }

    pub fn attribution(&self) -> &'static str {
        ATTRIBUTION
    }

    /// Days without a published date are numbered from the day after `today`.
    pub fn forecast(&self, today: NaiveDate) -> Vec<ForecastEntry> {
        self.data
            .forecast()
            .iter()
            .enumerate()
            .map(|(index, day)| {
                let temperature = day.temperature.as_ref();
                ForecastEntry {
                    date: day
                        .date
                        .unwrap_or(today + Duration::days(index as i64 + 1)),
                    temperature: temperature.and_then(|t| t.high),
                    temperature_low: temperature.and_then(|t| t.low),
                    condition: day.forecast.as_deref().map(normalize),
                    condition_class: day.forecast.clone(),
                    attribution: ATTRIBUTION,
                }
            })
            .collect()
    }
}
