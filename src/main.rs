use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use serde::Serialize;
use std::fs::File;
use std::sync::Mutex;
use std::time::Duration;
use std::{error::Error, io};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;

use crate::app::run_app;
use crate::cli::Args;

use chrono::{DateTime, Local, Utc};
use nea_wx::{ForecastCache, ForecastEntry, Normalized, WeatherEntity};

const TICK_RATE: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct Summary<'a> {
    name: String,
    area: Option<&'a str>,
    condition: Option<Normalized>,
    temperature: Option<f32>,
    humidity: Option<f32>,
    wind_speed: Option<f32>,
    wind_bearing: Option<&'a str>,
    last_updated: Option<DateTime<Utc>>,
    areas: Vec<&'a str>,
    forecast: Vec<ForecastEntry>,
    attribution: &'static str,
}

impl<'a> Summary<'a> {
    fn new(entity: &'a WeatherEntity) -> Self {
        Self {
            name: entity.name(),
            area: entity.location_name(),
            condition: entity.condition(),
            temperature: entity.temperature(),
            humidity: entity.humidity(),
            wind_speed: entity.wind_speed(),
            wind_bearing: entity.wind_bearing(),
            last_updated: entity.data().last_updated_at(),
            areas: entity.data().areas(),
            forecast: entity.forecast(Local::now().date_naive()),
            attribution: entity.attribution(),
        }
    }
}

fn init_logging(args: &Args) -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match &args.log_file {
        Some(path) => {
            let file = File::create(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None if args.once => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
        // Anything written to stderr would corrupt the dashboard.
        None => {}
    }
    Ok(())
}

fn print_once(entity: &mut WeatherEntity, json: bool) -> Result<(), Box<dyn Error>> {
    if let Err(err) = entity.update() {
        error!(error = %err, "could not fetch forecast");
        return Err(err.into());
    }

    let summary = Summary::new(entity);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let show = |value: Option<String>| value.unwrap_or_else(|| "--".to_string());
    println!("{}", summary.name);
    println!("  {:13}{}", "Conditions", show(summary.condition.as_ref().map(|c| c.to_string())));
    println!("  {:13}{}", "Temperature", show(summary.temperature.map(|t| format!("{t:.1} °C"))));
    println!("  {:13}{}", "Humidity", show(summary.humidity.map(|h| format!("{h:.0}%"))));
    println!("  {:13}{}", "Wind", show(summary.wind_speed.map(|s| format!("{s:.0} km/h"))));
    println!("  {:13}{}", "Bearing", show(summary.wind_bearing.map(str::to_string)));
    for entry in &summary.forecast {
        println!(
            "  {:13}{}",
            entry.date.format("%a %d %b").to_string(),
            show(entry.condition.as_ref().map(|c| c.to_string()))
        );
    }
    if summary.area.is_some() && summary.condition.is_none() {
        println!("  known areas: {}", summary.areas.join(", "));
    }
    println!("{}", summary.attribution);
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let cache = ForecastCache::new(args.fetcher_config())?;
    let mut entity = WeatherEntity::new(cache, args.area.clone());

    if args.once {
        return print_once(&mut entity, args.json);
    }

    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // create app and run it
    let res = run_app(&mut terminal, &mut entity, TICK_RATE);

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}
