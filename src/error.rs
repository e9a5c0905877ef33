use std::fmt;

use crate::weather::Metric;

/// One of the three upstream data sets fetched per refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    NearTerm,
    MultiDay,
    Today,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::NearTerm => "2-hour forecast",
            Resource::MultiDay => "4-day forecast",
            Resource::Today => "24-hour forecast",
        };
        f.write_str(name)
    }
}

/// Why a summary metric could not be returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// Nothing has been cached since startup or the last failed refresh.
    NeverFetched,
    /// The last response did not carry this metric.
    Absent,
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::NeverFetched => f.write_str("no data fetched yet"),
            Missing::Absent => f.write_str("not present in last response"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("failed to fetch {resource}: {source}")]
    Fetch {
        resource: Resource,
        #[source]
        source: TransportError,
    },
    #[error("malformed {resource} response: {source}")]
    Format {
        resource: Resource,
        #[source]
        source: serde_json::Error,
    },
    #[error("no {metric} reading: {cause}")]
    MissingData { metric: Metric, cause: Missing },
    #[error("unknown metric {0:?}")]
    UnknownMetric(String),
}
