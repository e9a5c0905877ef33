use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::Duration;
use clap::builder::{styling::AnsiColor, Styles};
use clap::{Parser, ValueEnum};

use nea_wx::cache::{DEFAULT_COOLDOWN_SECONDS, DEFAULT_MIN_INTERVAL_MINUTES, DEFAULT_TIMEOUT_SECONDS};
use nea_wx::{Endpoints, FetcherConfig, SchemaSelection};

const MAX_MIN_INTERVAL_MINUTES: i64 = 7 * 24 * 60;
const MAX_COOLDOWN_SECONDS: i64 = 24 * 60 * 60;

const ABOUT: &str = "NEA weather dashboard";

const LONG_ABOUT: &str = "
Dashboard for the Meteorological Service Singapore forecasts published on data.gov.sg.

The user supplies the forecast area to follow (e.g. Clementi, \"Ang Mo Kio\"). The 2-hour,
4-day and 24-hour forecasts are polled in the background; the network is only hit once the
cached data is older than --min-interval, and never more than once per --cooldown.

Logging is controlled with RUST_LOG. In dashboard mode logs are only written when --log-file
is given.
";

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default())
    .usage(AnsiColor::Green.on_default())
    .literal(AnsiColor::Green.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaArg {
    /// Detect the layout from each response
    Auto,
    /// items[0].forecasts[] (api.data.gov.sg/v1)
    V1,
    /// Channel2HrForecast.Item.WeatherForecast.Area[]
    V2,
}

impl From<SchemaArg> for SchemaSelection {
    fn from(arg: SchemaArg) -> Self {
        match arg {
            SchemaArg::Auto => SchemaSelection::Auto,
            SchemaArg::V1 => SchemaSelection::V1,
            SchemaArg::V2 => SchemaSelection::V2,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, styles=STYLES, about=ABOUT, long_about = LONG_ABOUT)]
pub struct Args {
    #[arg(help = "Forecast area to display (e.g. Clementi, \"Ang Mo Kio\")")]
    pub area: Option<String>,

    #[arg(long, value_enum, default_value_t = SchemaArg::Auto, help = "Response layout of the upstream feeds")]
    pub schema: SchemaArg,

    #[arg(
        long,
        value_name = "MINUTES",
        default_value_t = DEFAULT_MIN_INTERVAL_MINUTES,
        value_parser = clap::value_parser!(i64).range(0..=MAX_MIN_INTERVAL_MINUTES),
        help = "Minimum age of cached data before refetching"
    )]
    pub min_interval: i64,

    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = DEFAULT_COOLDOWN_SECONDS,
        value_parser = clap::value_parser!(i64).range(0..=MAX_COOLDOWN_SECONDS),
        help = "Minimum spacing between refresh attempts"
    )]
    pub cooldown: i64,

    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT_SECONDS, help = "Per-request timeout")]
    pub timeout: u64,

    #[arg(long, value_name = "URL", help = "Override the 2-hour forecast endpoint")]
    pub near_term_url: Option<String>,

    #[arg(long, value_name = "URL", help = "Override the 4-day forecast endpoint")]
    pub multi_day_url: Option<String>,

    #[arg(long, value_name = "URL", help = "Override the 24-hour forecast endpoint")]
    pub today_url: Option<String>,

    #[arg(long, help = "Fetch once, print a summary and exit")]
    pub once: bool,

    #[arg(long, requires = "once", help = "Print the --once summary as JSON")]
    pub json: bool,

    #[arg(long, value_name = "PATH", help = "Write logs to this file")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn fetcher_config(&self) -> FetcherConfig {
        let defaults = Endpoints::default();
        FetcherConfig {
            endpoints: Endpoints {
                near_term: self.near_term_url.clone().unwrap_or(defaults.near_term),
                multi_day: self.multi_day_url.clone().unwrap_or(defaults.multi_day),
                today: self.today_url.clone().unwrap_or(defaults.today),
            },
            schema: self.schema.into(),
            min_interval: Duration::minutes(self.min_interval),
            cooldown: Duration::seconds(self.cooldown),
            timeout: StdDuration::from_secs(self.timeout),
        }
    }
}
