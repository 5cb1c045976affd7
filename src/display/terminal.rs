// src/display/terminal.rs
//! Terminal dashboard for decoded GPS data

use crate::{
    error::{GpsError, Result},
    gps::{geo, GpsData},
};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType, DisableLineWrap, EnableLineWrap},
};
use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
    time::Duration,
};
use tokio::time::sleep;

pub struct TerminalDisplay {
    refresh: Duration,
}

impl TerminalDisplay {
    pub fn new(refresh: Duration) -> Self {
        Self { refresh }
    }

    /// Redraw the dashboard until `running` is cleared or Ctrl+C is pressed
    pub async fn run(&self, data: Arc<RwLock<GpsData>>, running: Arc<AtomicBool>) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(stdout, Hide, DisableLineWrap)?;

        let running_clone = Arc::clone(&running);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                running_clone.store(false, Ordering::Relaxed);
            }
        });

        while running.load(Ordering::Relaxed) {
            execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;

            let gps_data = match data.read() {
                Ok(guard) => guard.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            };
            render(&mut stdout, &gps_data)?;

            stdout.flush()?;
            sleep(self.refresh).await;
        }

        execute!(stdout, Show, EnableLineWrap)?;
        println!("\nShutting down...");
        Ok(())
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

fn section(stdout: &mut impl Write, color: Color, title: &str) -> Result<()> {
    execute!(stdout, SetForegroundColor(color), Print(title), Print("\n"), ResetColor)
        .map_err(GpsError::Io)
}

fn line(stdout: &mut impl Write, text: String) -> Result<()> {
    execute!(stdout, Print(text), Print("\n")).map_err(GpsError::Io)
}

/// Render one frame of the dashboard
pub fn render(stdout: &mut impl Write, data: &GpsData) -> Result<()> {
    section(stdout, Color::Green, &"=".repeat(60))?;
    section(stdout, Color::Green, "GPS Tracker - NMEA decoder")?;
    section(stdout, Color::Green, &"=".repeat(60))?;

    let timestamp_str = match data.timestamp {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "No sentence validated yet".to_string(),
    };
    let source_str = data.source.as_deref().unwrap_or("Unknown");
    line(stdout, format!("Last Update: {} ({})\n", timestamp_str, source_str))?;

    section(stdout, Color::Yellow, "POSITION:")?;
    line(stdout, format!("  Latitude:  {}", GpsData::format_coordinate(data.latitude)))?;
    line(stdout, format!("  Longitude: {}", GpsData::format_coordinate(data.longitude)))?;
    line(stdout, format!("  Altitude:  {}", GpsData::format_value(data.altitude, "m")))?;
    if let Some(age) = data.location_age_ms {
        line(stdout, format!("  Fix age:   {:>12} ms", age))?;
    }
    line(stdout, String::new())?;

    section(stdout, Color::Cyan, "MOVEMENT:")?;
    line(
        stdout,
        format!("  Speed:     {}", GpsData::format_value(data.speed.map(|s| format!("{:.1}", s)), "km/h")),
    )?;
    let course = data
        .course
        .map(|c| format!("{:.1}° {}", c, geo::cardinal(c)));
    line(stdout, format!("  Course:    {}", GpsData::format_value(course, "")))?;
    line(stdout, String::new())?;

    section(stdout, Color::Magenta, "QUALITY:")?;
    line(stdout, format!("  Satellites: {}", GpsData::format_value(data.satellites, "")))?;
    line(stdout, format!("  HDOP:       {}", GpsData::format_value(data.hdop, "")))?;
    line(stdout, format!("  Fix Type:   {:>12}", data.get_fix_description()))?;
    line(stdout, String::new())?;

    section(stdout, Color::White, "TIME:")?;
    line(stdout, format!("  Date:       {}", GpsData::format_value(data.date, "")))?;
    line(stdout, format!("  UTC:        {}", GpsData::format_value(data.time, "")))?;
    line(stdout, String::new())?;

    if !data.custom.is_empty() {
        section(stdout, Color::DarkYellow, "CUSTOM FIELDS:")?;
        for field in &data.custom {
            line(
                stdout,
                format!(
                    "  {:<8} #{:<3} {}",
                    field.sentence,
                    field.term,
                    field.value.as_deref().unwrap_or("-")
                ),
            )?;
        }
        line(stdout, String::new())?;
    }

    section(stdout, Color::Blue, "DECODER:")?;
    line(
        stdout,
        format!(
            "  chars {}  passed {}  failed {}  with fix {}",
            data.stats.chars_processed,
            data.stats.passed_checksum,
            data.stats.failed_checksum,
            data.stats.sentences_with_fix
        ),
    )?;
    let raw_display = if data.raw_data.is_empty() {
        "No data"
    } else {
        &data.raw_data
    };
    line(stdout, format!("  {}\n", raw_display))?;

    section(stdout, Color::Green, &"=".repeat(60))?;
    section(stdout, Color::Green, "Press Ctrl+C to exit")?;
    Ok(())
}
