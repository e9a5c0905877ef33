use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::io;
use std::{time::Duration, time::Instant};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, List, ListItem, Paragraph, Row, Table},
    Frame, Terminal,
};
use tracing::warn;

use chrono::{DateTime, Local};
use nea_wx::{ForecastEntry, RefreshOutcome, WeatherEntity};

const MISSING: &str = "--";

pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    entity: &mut WeatherEntity,
    tick_rate: Duration,
) -> io::Result<()> {
    let mut status = None;
    refresh(entity, &mut status);
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| ui(f, entity, status.as_deref()))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && key.code == KeyCode::Char('q') {
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
            refresh(entity, &mut status);
        }
    }
}

// Keeps the last error on screen until a refresh actually installs new data.
fn refresh(entity: &mut WeatherEntity, status: &mut Option<String>) {
    match entity.update() {
        Ok(RefreshOutcome::Updated) => *status = None,
        Ok(_) => {}
        Err(err) => {
            warn!(error = %err, "dashboard refresh failed");
            *status = Some(err.to_string());
        }
    }
}

fn value_or_missing(value: Option<String>) -> String {
    value.unwrap_or_else(|| MISSING.to_string())
}

fn display_forecast(entry: &ForecastEntry) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from("")];

    lines.push(Line::from(vec![
        Span::raw(" "),
        Span::styled(
            entry.date.format("%a %d %b").to_string(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
    ]));

    let temp = match (entry.temperature_low, entry.temperature) {
        (Some(low), Some(high)) => format!("{low:.0} - {high:.0} °C"),
        _ => MISSING.to_string(),
    };
    lines.push(Line::from(vec![
        Span::raw(format!(" {:13}", "Temperature")),
        Span::styled(temp, Style::default().fg(Color::Green)),
    ]));

    let condition = value_or_missing(entry.condition.as_ref().map(|c| c.to_string()));
    lines.push(Line::from(vec![
        Span::raw(format!(" {:13}", "Conditions")),
        Span::styled(condition, Style::default().fg(Color::Green)),
    ]));

    let text = value_or_missing(entry.condition_class.clone());
    lines.push(Line::from(vec![
        Span::raw(format!(" {:13}", "")),
        Span::styled(text, Style::default().fg(Color::DarkGray)),
    ]));
    lines
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(Color::Yellow),
        ))
        .title_alignment(Alignment::Left)
        .border_style(Style::default().fg(Color::Cyan))
        .border_type(BorderType::Rounded)
}

fn display_current_conditions(entity: &WeatherEntity) -> Table<'static> {
    let mut rows = vec![Row::new(vec![Cell::from("")])];

    let mut push = |label: &'static str, value: String| {
        rows.push(Row::new(vec![
            Cell::from(format!(" {label}")),
            Cell::from(value).style(Style::default().fg(Color::Green)),
        ]));
    };

    push(
        "Conditions",
        value_or_missing(entity.condition().map(|c| c.to_string())),
    );
    push(
        "Temperature",
        value_or_missing(
            entity
                .temperature()
                .map(|t| format!("{t:.1} {}", entity.temperature_unit())),
        ),
    );
    push(
        "Humidity",
        value_or_missing(entity.humidity().map(|h| format!("{h:.0}%"))),
    );
    let wind = match (entity.wind_speed(), entity.wind_bearing()) {
        (Some(speed), Some(dir)) => format!("{speed:.0} km/h ({dir})"),
        (Some(speed), None) => format!("{speed:.0} km/h"),
        _ => MISSING.to_string(),
    };
    push("Wind", wind);

    Table::new(rows, [Constraint::Length(14), Constraint::Min(15)])
        .block(panel("Current Conditions"))
}

fn display_today(entity: &WeatherEntity) -> Paragraph<'static> {
    let data = entity.data();
    let summary = value_or_missing(data.today_forecast().map(str::to_string));
    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::raw(format!(" {:13}", "Outlook")),
            Span::styled(summary, Style::default().fg(Color::Green)),
        ]),
        Line::from(""),
    ];

    let areas = data.areas();
    if areas.is_empty() {
        lines.push(Line::from(format!(" {MISSING}")));
    } else {
        for area in areas {
            let raw = data.reading(area).unwrap_or(MISSING).to_string();
            lines.push(Line::from(vec![
                Span::raw(format!(" {area:24}")),
                Span::styled(raw, Style::default().fg(Color::Green)),
            ]));
        }
    }

    Paragraph::new(lines).block(panel("Today"))
}

fn display_headline(entity: &WeatherEntity, status: Option<&str>) -> Paragraph<'static> {
    let updated = entity
        .data()
        .last_updated_at()
        .map(|t| {
            let local: DateTime<Local> = t.with_timezone(&Local);
            local.format("%d-%m-%Y %H:%M").to_string()
        })
        .unwrap_or_else(|| MISSING.to_string());
    let every = entity.data().config().min_interval.num_minutes();
    let updated = format!("{updated} (every {every} min)");

    let second = match status {
        Some(err) => Line::from(vec![
            Span::raw(format!(" {updated}  ")),
            Span::styled(err.to_string(), Style::default().fg(Color::Red)),
        ]),
        None => Line::from(format!(" {updated}")),
    };

    Paragraph::new(vec![
        Line::from(vec![
            Span::raw(" "),
            Span::styled(entity.name(), Style::default().fg(Color::Blue)),
            Span::raw(" : "),
            Span::styled(entity.attribution(), Style::default().fg(Color::Yellow)),
        ]),
        second,
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .border_type(BorderType::Rounded),
    )
}

fn ui(f: &mut Frame, entity: &WeatherEntity, status: Option<&str>) {
    let vert_layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(f.area());

    f.render_widget(display_headline(entity, status), vert_layout[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(vert_layout[1]);

    let lchunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(0)])
        .split(chunks[0]);

    f.render_widget(display_current_conditions(entity), lchunks[0]);
    f.render_widget(display_today(entity), lchunks[1]);

    let today = Local::now().date_naive();
    let mut list_items = vec![];
    for entry in entity.forecast(today) {
        list_items.push(ListItem::new(display_forecast(&entry)));
    }
    if list_items.is_empty() {
        list_items.push(ListItem::new(format!("\n  {MISSING}")));
    }
    let list = List::new(list_items).block(panel("Forecast"));

    f.render_widget(list, chunks[1]);
}
