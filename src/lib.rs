//! Polling cache for the NEA (Meteorological Service Singapore) forecast feeds.
//!
//! [`ForecastCache`] fetches the 2-hour, 4-day and 24-hour forecasts behind a
//! cooldown and a freshness window, and [`condition::normalize`] maps the
//! vendor wording onto a fixed set of dashboard condition codes.

pub mod cache;
pub mod clock;
pub mod condition;
pub mod entity;
pub mod error;
pub mod nea;
pub mod transport;
pub mod units;
pub mod weather;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{should_refresh, Endpoints, FetcherConfig, ForecastCache, RefreshOutcome};
pub use condition::{normalize, ConditionCode, Normalized};
pub use entity::{ForecastEntry, WeatherEntity};
pub use error::{Missing, Resource, TransportError, WeatherError};
pub use nea::SchemaSelection;
pub use weather::{DailyForecast, ForecastSnapshot, Metric, Reading};
