//! Throttled fetcher that owns the last good forecast snapshot.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{debug, error, info, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::condition::{normalize, Normalized};
use crate::error::{Missing, Resource, TransportError, WeatherError};
use crate::nea::{self, Parsed, SchemaAdapter, SchemaSelection};
use crate::transport::{HttpTransport, Transport};
use crate::weather::{DailyForecast, ForecastSnapshot, Metric, Reading};

pub const DEFAULT_MIN_INTERVAL_MINUTES: i64 = 35;
pub const DEFAULT_COOLDOWN_SECONDS: i64 = 60;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub near_term: String,
    pub multi_day: String,
    pub today: String,
}

impl Endpoints {
    pub fn url(&self, resource: Resource) -> &str {
        match resource {
            Resource::NearTerm => &self.near_term,
            Resource::MultiDay => &self.multi_day,
            Resource::Today => &self.today,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            near_term: nea::V1_NEAR_TERM_URL.to_string(),
            multi_day: nea::V1_MULTI_DAY_URL.to_string(),
            today: nea::V1_TODAY_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub endpoints: Endpoints,
    pub schema: SchemaSelection,
    /// Minimum age of the cached data before the network is hit again.
    pub min_interval: Duration,
    /// Minimum spacing between refresh attempts, whatever the data age.
    pub cooldown: Duration,
    /// Per-request timeout.
    pub timeout: StdDuration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            schema: SchemaSelection::Auto,
            min_interval: Duration::minutes(DEFAULT_MIN_INTERVAL_MINUTES),
            cooldown: Duration::seconds(DEFAULT_COOLDOWN_SECONDS),
            timeout: StdDuration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot was fetched and installed.
    Updated,
    /// The cached data is still within the freshness window.
    Fresh,
    /// Called again before the cooldown elapsed.
    Throttled,
}

/// True when nothing is cached or the cached data is strictly older than `min_interval`.
///
/// A window that reaches past the representable date range never expires.
pub fn should_refresh(
    now: DateTime<Utc>,
    last_updated: Option<DateTime<Utc>>,
    min_interval: Duration,
) -> bool {
    match last_updated {
        None => true,
        Some(last) => last
            .checked_add_signed(min_interval)
            .is_some_and(|due| now > due),
    }
}

pub struct ForecastCache<T = HttpTransport, C = SystemClock> {
    config: FetcherConfig,
    transport: T,
    clock: C,
    snapshot: ForecastSnapshot,
    last_attempt: Option<DateTime<Utc>>,
}

impl ForecastCache {
    pub fn new(config: FetcherConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config.timeout)?;
        Ok(Self::with_parts(config, transport, SystemClock))
    }
}

impl<T: Transport, C: Clock> ForecastCache<T, C> {
    pub fn with_parts(config: FetcherConfig, transport: T, clock: C) -> Self {
        Self {
            config,
            transport,
            clock,
            snapshot: ForecastSnapshot::default(),
            last_attempt: None,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetches all three resources if the cooldown and freshness window allow it.
    ///
    /// On failure the cached snapshot is cleared before the error is returned,
    /// so readers never see data from an older cycle next to nothing from the
    /// failed one.
    pub fn refresh(&mut self) -> Result<RefreshOutcome, WeatherError> {
        let now = self.clock.now();

        if let Some(last) = self.last_attempt {
            let open = last.checked_add_signed(self.config.cooldown);
            if open.map_or(true, |open| now < open) {
                trace!(last_attempt = %last, "refresh throttled");
                return Ok(RefreshOutcome::Throttled);
            }
        }
        self.last_attempt = Some(now);

        if !should_refresh(now, self.snapshot.last_updated, self.config.min_interval) {
            if let Some(last) = self.snapshot.last_updated {
                debug!(
                    age_secs = (now - last).num_seconds(),
                    min_interval_secs = self.config.min_interval.num_seconds(),
                    last_updated = %last,
                    "forecast still fresh, skipping update"
                );
            }
            return Ok(RefreshOutcome::Fresh);
        }

        match self.fetch(now) {
            Ok(snapshot) => {
                info!(
                    areas = snapshot.near_term_by_area.len(),
                    days = snapshot.multi_day.len(),
                    has_today = snapshot.today.is_some(),
                    last_updated = ?snapshot.last_updated,
                    "forecast updated"
                );
                self.snapshot = snapshot;
                Ok(RefreshOutcome::Updated)
            }
            Err(err) => {
                error!(error = %err, at = %now, "forecast update failed, clearing cached data");
                self.snapshot = ForecastSnapshot::default();
                Err(err)
            }
        }
    }

    fn fetch(&self, received_at: DateTime<Utc>) -> Result<ForecastSnapshot, WeatherError> {
        let near_term = self.load(Resource::NearTerm, |adapter, body| adapter.near_term(body))?;
        let multi_day = self.load(Resource::MultiDay, |adapter, body| adapter.multi_day(body))?;
        let today = self.load(Resource::Today, |adapter, body| adapter.today(body))?;

        let mut snapshot = ForecastSnapshot::default();
        let issued_at = [
            today.as_ref().and_then(|p| p.issued_at),
            near_term.as_ref().and_then(|p| p.issued_at),
            multi_day.as_ref().and_then(|p| p.issued_at),
        ]
        .into_iter()
        .flatten()
        .next();

        if let Some(near_term) = near_term {
            near_term
                .data
                .into_iter()
                .for_each(|entry| snapshot.insert_area(entry));
        }
        if let Some(multi_day) = multi_day {
            snapshot.multi_day = multi_day.data;
        }
        snapshot.today = today.map(|p| p.data);
        snapshot.last_updated = Some(issued_at.unwrap_or(received_at));

        Ok(snapshot)
    }

    /// Fetches one resource and parses it with whichever adapter claims it.
    ///
    /// `Ok(None)` means the resource carried no usable data; the other
    /// resources are unaffected.
    fn load<D>(
        &self,
        resource: Resource,
        parse: impl FnOnce(&dyn SchemaAdapter, Value) -> Result<Option<Parsed<D>>, serde_json::Error>,
    ) -> Result<Option<Parsed<D>>, WeatherError> {
        let url = self.config.endpoints.url(resource);
        debug!(%resource, url, "fetching");

        let body = self
            .transport
            .get(url)
            .map_err(|source| WeatherError::Fetch { resource, source })?;
        let body: Value =
            serde_json::from_str(&body).map_err(|source| WeatherError::Format { resource, source })?;

        let Some(adapter) = self.config.schema.adapter_for(resource, &body) else {
            warn!(%resource, "response matches no known schema, treating as empty");
            return Ok(None);
        };

        let parsed =
            parse(adapter, body).map_err(|source| WeatherError::Format { resource, source })?;
        if parsed.is_none() {
            warn!(%resource, schema = adapter.name(), "response carried no data");
        }
        Ok(parsed)
    }

    /// Raw near-term condition text for `area`, matched case-insensitively.
    pub fn reading(&self, area: &str) -> Option<&str> {
        self.snapshot
            .near_term_by_area
            .get(&ForecastSnapshot::area_key(area))
            .map(|entry| entry.forecast.as_str())
    }

    pub fn condition(&self, area: &str) -> Option<Normalized> {
        self.reading(area).map(normalize)
    }

    pub fn today_metric(&self, metric: Metric) -> Result<&Reading, WeatherError> {
        if self.snapshot.is_empty() {
            return Err(WeatherError::MissingData {
                metric,
                cause: Missing::NeverFetched,
            });
        }
        self.snapshot
            .today
            .as_ref()
            .and_then(|today| today.readings.get(&metric))
            .ok_or(WeatherError::MissingData {
                metric,
                cause: Missing::Absent,
            })
    }

    /// Like [`today_metric`](Self::today_metric), taking names such as `"Temperature"`
    /// or `"RelativeHumidity"`.
    pub fn today_metric_named(&self, name: &str) -> Result<&Reading, WeatherError> {
        self.today_metric(name.parse()?)
    }

    pub fn today_forecast(&self) -> Option<&str> {
        self.snapshot.today.as_ref()?.forecast.as_deref()
    }

    pub fn forecast(&self) -> &[DailyForecast] {
        &self.snapshot.multi_day
    }

    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot.last_updated
    }

    /// Area names as published upstream, sorted.
    pub fn areas(&self) -> Vec<&str> {
        let mut areas: Vec<_> = self
            .snapshot
            .near_term_by_area
            .values()
            .map(|entry| entry.area.as_str())
            .collect();
        areas.sort_unstable();
        areas
    }

    pub fn snapshot(&self) -> &ForecastSnapshot {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionCode;
    use crate::testing::{fixtures, FakeClock, FakeTransport};
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, h, m, s).unwrap()
    }

    fn v1_transport() -> FakeTransport {
        let endpoints = Endpoints::default();
        FakeTransport::default()
            .with_body(&endpoints.near_term, fixtures::V1_NEAR_TERM)
            .with_body(&endpoints.multi_day, fixtures::V1_MULTI_DAY)
            .with_body(&endpoints.today, fixtures::V1_TODAY)
    }

    fn cache(transport: FakeTransport, clock: &FakeClock) -> ForecastCache<FakeTransport, FakeClock> {
        ForecastCache::with_parts(FetcherConfig::default(), transport, clock.clone())
    }

    #[test]
    fn test_should_refresh() {
        let minutes = Duration::minutes(35);
        let last = at(3, 0, 0);
        assert!(should_refresh(last, None, minutes));
        assert!(!should_refresh(last + Duration::minutes(10), Some(last), minutes));
        assert!(!should_refresh(last + minutes, Some(last), minutes));
        assert!(should_refresh(last + minutes + Duration::seconds(1), Some(last), minutes));
        assert!(should_refresh(last + Duration::minutes(3), Some(last), Duration::minutes(2)));
    }

    #[test]
    fn test_huge_windows_never_expire() {
        let last = at(3, 0, 0);
        let forever = Duration::minutes(1_000_000_000_000);
        assert!(!should_refresh(last + Duration::days(365), Some(last), forever));
        assert!(should_refresh(last, None, forever));

        let clock = FakeClock::new(last);
        let config = FetcherConfig {
            cooldown: forever,
            ..FetcherConfig::default()
        };
        let mut cache = ForecastCache::with_parts(config, v1_transport(), clock.clone());
        assert_eq!(cache.refresh().unwrap(), RefreshOutcome::Updated);
        clock.advance(Duration::days(365));
        assert_eq!(cache.refresh().unwrap(), RefreshOutcome::Throttled);
    }

    #[test]
    fn test_empty_cache_reports_no_data() {
        let clock = FakeClock::new(at(3, 35, 0));
        let cache = cache(v1_transport(), &clock);
        assert_eq!(cache.reading("Clementi"), None);
        assert!(cache.forecast().is_empty());
        assert_eq!(cache.last_updated_at(), None);
        assert!(matches!(
            cache.today_metric(Metric::Temperature),
            Err(WeatherError::MissingData {
                metric: Metric::Temperature,
                cause: Missing::NeverFetched
            })
        ));
    }

    #[test]
    fn test_refresh_populates_snapshot() {
        let clock = FakeClock::new(at(3, 35, 0));
        let mut cache = cache(v1_transport(), &clock);

        assert_eq!(cache.refresh().unwrap(), RefreshOutcome::Updated);
        assert_eq!(cache.reading("Clementi"), Some("Thundery Showers"));
        assert_eq!(cache.reading("clementi"), cache.reading("Clementi"));
        assert_eq!(cache.reading("CLEMENTI"), Some("Thundery Showers"));
        assert_eq!(cache.reading("Atlantis"), None);
        assert_eq!(
            cache.condition("clementi"),
            Some(Normalized::Code(ConditionCode::LightningRainy))
        );
        assert_eq!(cache.forecast().len(), 2);
        assert_eq!(cache.areas(), ["Ang Mo Kio", "Bedok", "Clementi"]);

        let temperature = cache.today_metric(Metric::Temperature).unwrap();
        assert_eq!(temperature.average(), Some(27.0));
        assert_eq!(cache.today_metric_named("Temperature").unwrap(), temperature);
        assert_eq!(cache.today_forecast(), Some("Partly Cloudy"));
    }

    #[test]
    fn test_server_timestamp_wins_over_receipt_time() {
        let clock = FakeClock::new(at(3, 35, 0));
        let mut cache = cache(v1_transport(), &clock);
        cache.refresh().unwrap();
        // 24-hour feed says 11:40+08:00.
        assert_eq!(cache.last_updated_at(), Some(at(3, 40, 0)));
    }

    #[test]
    fn test_receipt_time_used_without_server_timestamp() {
        let endpoints = Endpoints::default();
        let transport = FakeTransport::default()
            .with_body(&endpoints.near_term, r#"{"items": [{"forecasts": []}]}"#)
            .with_body(&endpoints.multi_day, r#"{"items": []}"#)
            .with_body(&endpoints.today, r#"{"items": []}"#);
        let clock = FakeClock::new(at(5, 0, 0));
        let mut cache = cache(transport, &clock);
        cache.refresh().unwrap();
        assert_eq!(cache.last_updated_at(), Some(at(5, 0, 0)));
    }

    #[test]
    fn test_cooldown_blocks_repeat_calls() {
        let clock = FakeClock::new(at(3, 35, 0));
        let transport = v1_transport();
        let calls = transport.calls();
        let mut cache = cache(transport, &clock);

        cache.refresh().unwrap();
        assert_eq!(calls.get(), 3);

        clock.advance(Duration::seconds(30));
        assert_eq!(cache.refresh().unwrap(), RefreshOutcome::Throttled);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_fresh_data_skips_network() {
        let clock = FakeClock::new(at(3, 45, 0));
        let transport = v1_transport();
        let calls = transport.calls();
        let mut cache = cache(transport, &clock);

        cache.refresh().unwrap();
        clock.advance(Duration::minutes(5));
        assert_eq!(cache.refresh().unwrap(), RefreshOutcome::Fresh);
        assert_eq!(calls.get(), 3);

        // last_updated is 03:40, so 04:16 is past the 35 minute window.
        clock.set(at(4, 16, 0));
        assert_eq!(cache.refresh().unwrap(), RefreshOutcome::Updated);
        assert_eq!(calls.get(), 6);
    }

    #[test]
    fn test_failed_refresh_clears_everything() {
        let clock = FakeClock::new(at(3, 45, 0));
        let transport = v1_transport();
        let mut cache = cache(transport.clone(), &clock);
        cache.refresh().unwrap();
        assert!(cache.reading("Clementi").is_some());

        transport.fail(&Endpoints::default().today, TransportError::Timeout);
        clock.set(at(5, 0, 0));
        let err = cache.refresh().unwrap_err();
        assert!(matches!(
            err,
            WeatherError::Fetch {
                resource: Resource::Today,
                source: TransportError::Timeout
            }
        ));

        assert_eq!(cache.reading("Clementi"), None);
        assert!(cache.forecast().is_empty());
        assert_eq!(cache.last_updated_at(), None);
        assert!(matches!(
            cache.today_metric(Metric::Temperature),
            Err(WeatherError::MissingData {
                cause: Missing::NeverFetched,
                ..
            })
        ));
    }

    #[test]
    fn test_unparsable_body_is_format_error() {
        let clock = FakeClock::new(at(3, 45, 0));
        let transport = v1_transport().with_body(&Endpoints::default().multi_day, "<html>busy</html>");
        let mut cache = cache(transport, &clock);
        let err = cache.refresh().unwrap_err();
        assert!(matches!(
            err,
            WeatherError::Format {
                resource: Resource::MultiDay,
                ..
            }
        ));
        assert_eq!(cache.snapshot(), &ForecastSnapshot::default());
    }

    #[test]
    fn test_retry_waits_for_cooldown_after_failure() {
        let clock = FakeClock::new(at(3, 45, 0));
        let transport = v1_transport();
        transport.fail(&Endpoints::default().near_term, TransportError::Status(503));
        let calls = transport.calls();
        let mut cache = cache(transport, &clock);

        assert!(cache.refresh().is_err());
        assert_eq!(calls.get(), 1);
        clock.advance(Duration::seconds(10));
        assert_eq!(cache.refresh().unwrap(), RefreshOutcome::Throttled);
        clock.advance(Duration::seconds(60));
        assert!(cache.refresh().is_err());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_missing_today_leaves_siblings_usable() {
        let endpoints = Endpoints::default();
        let transport = v1_transport().with_body(
            &endpoints.today,
            r#"{"items": [{"update_timestamp": "2024-01-02T11:40:00+08:00"}]}"#,
        );
        let clock = FakeClock::new(at(3, 45, 0));
        let mut cache = cache(transport, &clock);

        assert_eq!(cache.refresh().unwrap(), RefreshOutcome::Updated);
        assert_eq!(cache.reading("Bedok"), Some("Cloudy"));
        assert_eq!(cache.forecast().len(), 2);
        assert!(matches!(
            cache.today_metric(Metric::Humidity),
            Err(WeatherError::MissingData {
                cause: Missing::Absent,
                ..
            })
        ));
        // Falls back to the near-term feed's timestamp.
        assert_eq!(cache.last_updated_at(), Some(at(3, 30, 0)));
    }

    #[test]
    fn test_mistyped_field_leaves_siblings_usable() {
        let endpoints = Endpoints::default();
        let transport = v1_transport().with_body(
            &endpoints.near_term,
            r#"{"items":[{"forecasts":[{"area":"Clementi","forecast":"Cloudy"},{"area":"Bedok","forecast":7}]}]}"#,
        );
        let clock = FakeClock::new(at(3, 45, 0));
        let mut cache = cache(transport, &clock);

        assert_eq!(cache.refresh().unwrap(), RefreshOutcome::Updated);
        assert_eq!(cache.reading("Clementi"), Some("Cloudy"));
        assert_eq!(cache.reading("Bedok"), None);
        assert_eq!(cache.forecast().len(), 2);
        assert_eq!(
            cache.today_metric(Metric::Temperature).unwrap(),
            &Reading::range(24.0, 30.0)
        );
    }

    #[test]
    fn test_unknown_layout_is_treated_as_absent() {
        let endpoints = Endpoints::default();
        let transport = v1_transport().with_body(&endpoints.multi_day, r#"{"message": "moved"}"#);
        let clock = FakeClock::new(at(3, 45, 0));
        let mut cache = cache(transport, &clock);

        assert_eq!(cache.refresh().unwrap(), RefreshOutcome::Updated);
        assert!(cache.forecast().is_empty());
        assert!(cache.reading("Ang Mo Kio").is_some());
    }

    #[test]
    fn test_v2_payloads_in_auto_mode() {
        let endpoints = Endpoints::default();
        let transport = FakeTransport::default()
            .with_body(&endpoints.near_term, fixtures::V2_NEAR_TERM)
            .with_body(&endpoints.multi_day, fixtures::V2_MULTI_DAY)
            .with_body(&endpoints.today, fixtures::V2_TODAY);
        let clock = FakeClock::new(at(4, 5, 0));
        let mut cache = cache(transport, &clock);

        cache.refresh().unwrap();
        assert_eq!(cache.reading("clementi"), Some("TL"));
        assert_eq!(
            cache.condition("Clementi"),
            Some(Normalized::Code(ConditionCode::LightningRainy))
        );
        assert_eq!(cache.today_metric(Metric::Temperature).unwrap().average(), Some(29.0));
        assert_eq!(cache.forecast()[0].forecast.as_deref(), Some("SH"));
    }

    #[test]
    fn test_two_minute_window() {
        let config = FetcherConfig {
            min_interval: Duration::minutes(2),
            cooldown: Duration::seconds(0),
            ..FetcherConfig::default()
        };
        let clock = FakeClock::new(at(3, 41, 0));
        let transport = v1_transport();
        let calls = transport.calls();
        let mut cache = ForecastCache::with_parts(config, transport, clock.clone());
        assert_eq!(cache.config().min_interval, Duration::minutes(2));

        cache.refresh().unwrap();
        assert_eq!(cache.refresh().unwrap(), RefreshOutcome::Fresh);
        clock.set(at(3, 42, 1));
        assert_eq!(cache.refresh().unwrap(), RefreshOutcome::Updated);
        assert_eq!(calls.get(), 6);
    }
}
