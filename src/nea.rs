//! Response schemas for the NEA forecast feeds.
//!
//! The feeds have shipped under two envelope layouts. Both are described here
//! with every field optional, so a missing branch at any depth reads as "no
//! data" instead of failing the whole response. Each layout is exposed
//! through [`SchemaAdapter`]; [`SchemaSelection`] picks one, either fixed or by
//! sniffing the body.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::Resource;
use crate::weather::{AreaForecast, DailyForecast, Metric, Reading, TodaySummary};

pub const V1_NEAR_TERM_URL: &str = "https://api.data.gov.sg/v1/environment/2-hour-weather-forecast";
pub const V1_MULTI_DAY_URL: &str = "https://api.data.gov.sg/v1/environment/4-day-weather-forecast";
pub const V1_TODAY_URL: &str = "https://api.data.gov.sg/v1/environment/24-hour-weather-forecast";

/// Data pulled from one response, with the issue time the server reported.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub data: T,
    pub issued_at: Option<DateTime<Utc>>,
}

/// Parses the three forecast resources out of one vendor layout.
///
/// Each method returns `Ok(None)` when the body is well formed but carries no
/// data for the resource, and `Err` when the body does not fit the layout's
/// types at all.
pub trait SchemaAdapter {
    fn name(&self) -> &'static str;

    /// Whether `body` looks like this layout's response for `resource`.
    fn recognizes(&self, resource: Resource, body: &Value) -> bool;

    fn near_term(&self, body: Value) -> Result<Option<Parsed<Vec<AreaForecast>>>, serde_json::Error>;

    fn multi_day(&self, body: Value) -> Result<Option<Parsed<Vec<DailyForecast>>>, serde_json::Error>;

    fn today(&self, body: Value) -> Result<Option<Parsed<TodaySummary>>, serde_json::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaSelection {
    /// Pick the layout per response by looking at its top-level keys.
    #[default]
    Auto,
    V1,
    V2,
}

const ADAPTERS: &[&dyn SchemaAdapter] = &[&V1Schema, &V2Schema];

impl SchemaSelection {
    pub fn adapter_for(&self, resource: Resource, body: &Value) -> Option<&'static dyn SchemaAdapter> {
        match self {
            SchemaSelection::V1 => Some(&V1Schema),
            SchemaSelection::V2 => Some(&V2Schema),
            SchemaSelection::Auto => ADAPTERS
                .iter()
                .copied()
                .find(|adapter| adapter.recognizes(resource, body)),
        }
    }
}

mod de {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::{Map, Value};

    use crate::units::range;
    use crate::weather::Reading;

    /// Accepts `{"low": 24, "high": 32}` (any key case, numbers or numeric
    /// strings), `"24 - 32 °C"` or a bare number.
    pub fn reading<'de, D>(deserializer: D) -> Result<Option<Reading>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(reading_from))
    }

    /// Reads the field as `T`, or `None` when it holds some other type, so one
    /// odd leaf only costs that leaf.
    pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.and_then(|v| serde_json::from_value(v).ok()))
    }

    pub fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|t| t.with_timezone(&Utc)))
    }

    /// Accepts `"2024-01-02"` or a full timestamp starting with a date.
    pub fn date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| s.trim().get(..10))
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()))
    }

    fn reading_from(value: &Value) -> Option<Reading> {
        let reading = match value {
            Value::Object(map) => Reading {
                high: field(map, "high"),
                low: field(map, "low"),
                direction: None,
            },
            Value::String(text) => {
                let (low, high) = range::parse(text)?;
                Reading::range(low, high)
            }
            Value::Number(_) => {
                let n = number(value)?;
                Reading::range(n, n)
            }
            _ => return None,
        };
        (!reading.is_empty()).then_some(reading)
    }

    fn field(map: &Map<String, Value>, key: &str) -> Option<f32> {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, v)| number(v))
    }

    fn number(value: &Value) -> Option<f32> {
        match value {
            Value::Number(n) => n.as_f64().map(|n| n as f32),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

// Leaf records are shared by both layouts; only the field case differs.

#[derive(Deserialize, Debug, Default)]
pub struct AreaEntry {
    #[serde(default, alias = "Name", deserialize_with = "de::lenient")]
    pub area: Option<String>,

    #[serde(default, alias = "Forecast", deserialize_with = "de::lenient")]
    pub forecast: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Wind {
    #[serde(default, alias = "Speed", deserialize_with = "de::reading")]
    pub speed: Option<Reading>,

    #[serde(default, alias = "Direction", deserialize_with = "de::lenient")]
    pub direction: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Day {
    #[serde(default, alias = "Date", deserialize_with = "de::date")]
    pub date: Option<NaiveDate>,

    #[serde(default, alias = "Forecast", deserialize_with = "de::lenient")]
    pub forecast: Option<String>,

    #[serde(default, alias = "Temperature", deserialize_with = "de::reading")]
    pub temperature: Option<Reading>,

    #[serde(default, alias = "RelativeHumidity", deserialize_with = "de::reading")]
    pub relative_humidity: Option<Reading>,

    #[serde(default, alias = "Wind", deserialize_with = "de::lenient")]
    pub wind: Option<Wind>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Summary {
    #[serde(default, alias = "Forecast", deserialize_with = "de::lenient")]
    pub forecast: Option<String>,

    #[serde(default, alias = "Temperature", deserialize_with = "de::reading")]
    pub temperature: Option<Reading>,

    #[serde(default, alias = "RelativeHumidity", deserialize_with = "de::reading")]
    pub relative_humidity: Option<Reading>,

    #[serde(default, alias = "Wind", deserialize_with = "de::lenient")]
    pub wind: Option<Wind>,
}

impl Wind {
    fn into_reading(self) -> Option<Reading> {
        let mut reading = self.speed.unwrap_or_default();
        reading.direction = self.direction;
        (!reading.is_empty()).then_some(reading)
    }
}

impl From<Day> for DailyForecast {
    fn from(day: Day) -> Self {
        Self {
            date: day.date,
            temperature: day.temperature,
            humidity: day.relative_humidity,
            wind: day.wind.and_then(Wind::into_reading),
            forecast: day.forecast,
        }
    }
}

impl From<Summary> for TodaySummary {
    fn from(summary: Summary) -> Self {
        let readings = [
            (Metric::Temperature, summary.temperature),
            (Metric::Humidity, summary.relative_humidity),
            (Metric::Wind, summary.wind.and_then(Wind::into_reading)),
        ]
        .into_iter()
        .filter_map(|(metric, reading)| reading.map(|r| (metric, r)))
        .collect();

        Self {
            forecast: summary.forecast,
            readings,
        }
    }
}

fn areas(entries: Vec<AreaEntry>) -> Vec<AreaForecast> {
    entries
        .into_iter()
        .filter_map(|entry| {
            Some(AreaForecast {
                area: entry.area?,
                forecast: entry.forecast?,
            })
        })
        .collect()
}

/// `items[0].forecasts[]` / `items[0].general`, as served by `api.data.gov.sg/v1`.
pub mod v1 {
    use super::*;

    #[derive(Deserialize, Debug)]
    pub struct Response<I> {
        pub items: Option<Vec<I>>,
    }

    impl<I> Response<I> {
        pub fn first(self) -> Option<I> {
            self.items.into_iter().flatten().next()
        }
    }

    #[derive(Deserialize, Debug)]
    pub struct Item<F> {
        #[serde(default, deserialize_with = "de::timestamp")]
        pub update_timestamp: Option<DateTime<Utc>>,

        pub forecasts: Option<Vec<F>>,
    }

    #[derive(Deserialize, Debug)]
    pub struct TodayItem {
        #[serde(default, deserialize_with = "de::timestamp")]
        pub update_timestamp: Option<DateTime<Utc>>,

        #[serde(default, deserialize_with = "de::lenient")]
        pub general: Option<Summary>,
    }
}

/// `Channel2HrForecast.Item.WeatherForecast.Area[]` and its siblings.
pub mod v2 {
    use serde::de::IgnoredAny;

    use super::*;

    pub const NEAR_TERM_CHANNEL: &str = "Channel2HrForecast";
    pub const MULTI_DAY_CHANNEL: &str = "Channel4DayForecast";
    pub const TODAY_CHANNEL: &str = "Channel24HrForecast";

    pub fn channel(resource: Resource) -> &'static str {
        match resource {
            Resource::NearTerm => NEAR_TERM_CHANNEL,
            Resource::MultiDay => MULTI_DAY_CHANNEL,
            Resource::Today => TODAY_CHANNEL,
        }
    }

    #[derive(Deserialize, Debug)]
    pub struct NearTermResponse {
        #[serde(rename = "Channel2HrForecast")]
        pub channel: Option<Channel<AreaList>>,
    }

    #[derive(Deserialize, Debug)]
    pub struct MultiDayResponse {
        #[serde(rename = "Channel4DayForecast")]
        pub channel: Option<Channel<DayList>>,
    }

    #[derive(Deserialize, Debug)]
    pub struct TodayResponse {
        #[serde(rename = "Channel24HrForecast")]
        pub channel: Option<Channel<IgnoredAny>>,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "PascalCase")]
    pub struct Channel<W> {
        pub item: Option<Item<W>>,

        #[serde(default, deserialize_with = "de::lenient")]
        pub main: Option<Summary>,
    }

    impl<W> Channel<W> {
        pub fn issued_at(&self) -> Option<DateTime<Utc>> {
            self.item
                .as_ref()
                .and_then(|item| item.forecast_issue.as_ref())
                .and_then(|issue| issue.date_time)
        }
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "PascalCase")]
    pub struct Item<W> {
        pub forecast_issue: Option<Issue>,
        pub weather_forecast: Option<W>,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "PascalCase")]
    pub struct Issue {
        #[serde(default, deserialize_with = "de::timestamp")]
        pub date_time: Option<DateTime<Utc>>,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "PascalCase")]
    pub struct AreaList {
        pub area: Option<Vec<AreaEntry>>,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "PascalCase")]
    pub struct DayList {
        pub day: Option<Vec<Day>>,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct V1Schema;

impl SchemaAdapter for V1Schema {
    fn name(&self) -> &'static str {
        "v1"
    }

    fn recognizes(&self, _resource: Resource, body: &Value) -> bool {
        body.get("items").is_some()
    }

    fn near_term(&self, body: Value) -> Result<Option<Parsed<Vec<AreaForecast>>>, serde_json::Error> {
        let response: v1::Response<v1::Item<AreaEntry>> = serde_json::from_value(body)?;
        Ok(response.first().and_then(|item| {
            Some(Parsed {
                data: areas(item.forecasts?),
                issued_at: item.update_timestamp,
            })
        }))
    }

    fn multi_day(&self, body: Value) -> Result<Option<Parsed<Vec<DailyForecast>>>, serde_json::Error> {
        let response: v1::Response<v1::Item<Day>> = serde_json::from_value(body)?;
        Ok(response.first().and_then(|item| {
            Some(Parsed {
                data: item.forecasts?.into_iter().map(DailyForecast::from).collect(),
                issued_at: item.update_timestamp,
            })
        }))
    }

    fn today(&self, body: Value) -> Result<Option<Parsed<TodaySummary>>, serde_json::Error> {
        let response: v1::Response<v1::TodayItem> = serde_json::from_value(body)?;
        Ok(response.first().and_then(|item| {
            Some(Parsed {
                data: item.general?.into(),
                issued_at: item.update_timestamp,
            })
        }))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct V2Schema;

impl SchemaAdapter for V2Schema {
    fn name(&self) -> &'static str {
        "v2"
    }

    fn recognizes(&self, resource: Resource, body: &Value) -> bool {
        body.get(v2::channel(resource)).is_some()
    }

    fn near_term(&self, body: Value) -> Result<Option<Parsed<Vec<AreaForecast>>>, serde_json::Error> {
        let response: v2::NearTermResponse = serde_json::from_value(body)?;
        Ok(response.channel.and_then(|channel| {
            let issued_at = channel.issued_at();
            let entries = channel.item?.weather_forecast?.area?;
            Some(Parsed {
                data: areas(entries),
                issued_at,
            })
        }))
    }

    fn multi_day(&self, body: Value) -> Result<Option<Parsed<Vec<DailyForecast>>>, serde_json::Error> {
        let response: v2::MultiDayResponse = serde_json::from_value(body)?;
        Ok(response.channel.and_then(|channel| {
            let issued_at = channel.issued_at();
            let days = channel.item?.weather_forecast?.day?;
            Some(Parsed {
                data: days.into_iter().map(DailyForecast::from).collect(),
                issued_at,
            })
        }))
    }

    fn today(&self, body: Value) -> Result<Option<Parsed<TodaySummary>>, serde_json::Error> {
        let response: v2::TodayResponse = serde_json::from_value(body)?;
        Ok(response.channel.and_then(|channel| {
            let issued_at = channel.issued_at();
            Some(Parsed {
                data: channel.main?.into(),
                issued_at,
            })
        }))
    }
}
