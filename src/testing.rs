//! Test doubles and canned NEA responses.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::error::TransportError;
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct FakeClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl FakeClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Serves canned bodies by URL. Clones share state, so a test can keep a
/// handle to inject failures after handing the transport to a cache.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    bodies: Rc<RefCell<HashMap<String, String>>>,
    failures: Rc<RefCell<HashMap<String, TransportError>>>,
    calls: Rc<Cell<usize>>,
}

impl FakeTransport {
    pub fn with_body(self, url: &str, body: &str) -> Self {
        self.bodies
            .borrow_mut()
            .insert(url.to_string(), body.to_string());
        self
    }

    /// Makes every later request to `url` fail with `err`.
    pub fn fail(&self, url: &str, err: TransportError) {
        self.failures.borrow_mut().insert(url.to_string(), err);
    }

    pub fn calls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }
}

impl Transport for FakeTransport {
    fn get(&self, url: &str) -> Result<String, TransportError> {
        self.calls.set(self.calls.get() + 1);
        if let Some(err) = self.failures.borrow().get(url) {
            return Err(match err {
                TransportError::Timeout => TransportError::Timeout,
                TransportError::Status(code) => TransportError::Status(*code),
                TransportError::Http(_) => TransportError::Status(500),
            });
        }
        self.bodies
            .borrow()
            .get(url)
            .cloned()
            .ok_or(TransportError::Status(404))
    }
}

pub mod fixtures {
    pub const V1_NEAR_TERM: &str = r#"{
        "area_metadata": [
            {"name": "Ang Mo Kio", "label_location": {"latitude": 1.375, "longitude": 103.839}}
        ],
        "items": [{
            "update_timestamp": "2024-01-02T11:30:00+08:00",
            "timestamp": "2024-01-02T11:30:00+08:00",
            "valid_period": {"start": "2024-01-02T11:30:00+08:00", "end": "2024-01-02T13:30:00+08:00"},
            "forecasts": [
                {"area": "Ang Mo Kio", "forecast": "Partly Cloudy (Day)"},
                {"area": "Bedok", "forecast": "Cloudy"},
                {"area": "Clementi", "forecast": "Thundery Showers"}
            ]
        }],
        "api_info": {"status": "healthy"}
    }"#;

    pub const V1_MULTI_DAY: &str = r#"{
        "items": [{
            "update_timestamp": "2024-01-02T11:33:00+08:00",
            "forecasts": [
                {
                    "date": "2024-01-03",
                    "forecast": "Thundery showers",
                    "temperature": {"low": 24, "high": 32},
                    "relative_humidity": {"low": 60, "high": 95},
                    "wind": {"speed": {"low": 10, "high": 20}, "direction": "NNE"}
                },
                {
                    "date": "2024-01-04",
                    "forecast": "Fair & Warm",
                    "temperature": {"low": 25, "high": 34},
                    "relative_humidity": {"low": 55, "high": 90},
                    "wind": {"speed": {"low": 15, "high": 25}, "direction": "NE"}
                }
            ]
        }],
        "api_info": {"status": "healthy"}
    }"#;

    pub const V1_TODAY: &str = r#"{
        "items": [{
            "update_timestamp": "2024-01-02T11:40:00+08:00",
            "general": {
                "forecast": "Partly Cloudy",
                "relative_humidity": {"low": 60, "high": 95},
                "temperature": {"low": 24, "high": 30},
                "wind": {"speed": {"low": 10, "high": 20}, "direction": "NE"}
            }
        }],
        "api_info": {"status": "healthy"}
    }"#;

    pub const V2_NEAR_TERM: &str = r#"{
        "Channel2HrForecast": {
            "Item": {
                "ForecastIssue": {"DateTime": "2024-01-02T12:00:00+08:00"},
                "WeatherForecast": {
                    "Area": [
                        {"Name": "Ang Mo Kio", "Forecast": "PC"},
                        {"Name": "Clementi", "Forecast": "TL"},
                        {"Name": "Nowhere"}
                    ]
                }
            }
        }
    }"#;

    pub const V2_MULTI_DAY: &str = r#"{
        "Channel4DayForecast": {
            "Item": {
                "WeatherForecast": {
                    "Day": [
                        {"Date": "2024-01-03", "Forecast": "SH", "Temperature": "25 - 33 °C"},
                        {"Forecast": "FA", "Temperature": "26 - 34 °C"}
                    ]
                }
            }
        }
    }"#;

    pub const V2_TODAY: &str = r#"{
        "Channel24HrForecast": {
            "Item": {"ForecastIssue": {"DateTime": "2024-01-02T12:00:00+08:00"}},
            "Main": {
                "Forecast": "TL",
                "Temperature": {"High": "33", "Low": "25"},
                "Wind": {"Speed": "10 - 20", "Direction": "NNE"}
            }
        }
    }"#;
}
