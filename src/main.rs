// src/main.rs
//! GPS Tracker - decode NMEA from a serial GPS receiver or a recorded log

use anyhow::Context;
use clap::{Parser, Subcommand};
use gps_tracker::{
    cardinal,
    config::GpsConfig,
    course_to,
    display::TerminalDisplay,
    distance_between,
    monitor::{self, GpsMonitor, GpsSource},
};
use std::{path::PathBuf, time::Duration};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gps-tracker", version, about = "Streaming NMEA-0183 decoder and monitor")]
struct Cli {
    /// Log filter, e.g. "debug" or "gps_tracker=trace" (overrides the config file)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Register a custom field, as SENTENCE:TERM (e.g. GPRMC:7); repeatable
    #[arg(long = "custom", global = true, value_parser = parse_custom)]
    custom: Vec<(String, u8)>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a live receiver on a serial port
    Monitor {
        /// Serial port, e.g. /dev/ttyUSB0
        #[arg(short, long)]
        port: Option<String>,
        /// Baud rate
        #[arg(short, long)]
        baud: Option<u32>,
    },
    /// Decode a recorded NMEA log
    Replay {
        file: PathBuf,
        /// Pace playback to this many characters per second
        #[arg(short, long)]
        rate: Option<u32>,
        /// Print final statistics instead of showing the dashboard
        #[arg(long)]
        summary: bool,
    },
    /// List available serial ports
    Ports,
    /// Great-circle distance and initial course between two positions
    Distance {
        #[arg(allow_hyphen_values = true)]
        lat1: f64,
        #[arg(allow_hyphen_values = true)]
        lon1: f64,
        #[arg(allow_hyphen_values = true)]
        lat2: f64,
        #[arg(allow_hyphen_values = true)]
        lon2: f64,
    },
    /// Show the effective configuration
    Config {
        /// Write the effective configuration back to the config file
        #[arg(long)]
        save: bool,
    },
}

fn parse_custom(s: &str) -> Result<(String, u8), String> {
    let (sentence, term) = s
        .split_once(':')
        .ok_or_else(|| format!("expected SENTENCE:TERM, got {:?}", s))?;
    let term = term
        .parse::<u8>()
        .map_err(|e| format!("bad term index {:?}: {}", term, e))?;
    if sentence.is_empty() || term == 0 {
        return Err(format!("expected SENTENCE:TERM with TERM >= 1, got {:?}", s));
    }
    Ok((sentence.to_string(), term))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = GpsConfig::load().context("loading configuration")?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    for (sentence, term) in &cli.custom {
        config.add_custom_field(sentence, *term);
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Monitor { port, baud } => {
            let port = port
                .or_else(|| config.serial_port.clone())
                .context("no serial port given; pass --port or set serial_port in the config file")?;
            let baudrate = baud.unwrap_or(config.serial_baudrate);
            config.update_serial(port.clone(), baudrate);
            run_dashboard(&config, GpsSource::Serial { port, baudrate }).await?;
        }
        Command::Replay {
            file,
            rate,
            summary,
        } => {
            let source = GpsSource::Replay {
                path: file,
                chars_per_sec: rate,
            };
            if summary {
                replay_summary(&config, source).await?;
            } else {
                run_dashboard(&config, source).await?;
            }
        }
        Command::Ports => monitor::list_serial_ports()?,
        Command::Distance {
            lat1,
            lon1,
            lat2,
            lon2,
        } => {
            let meters = distance_between(lat1, lon1, lat2, lon2);
            let course = course_to(lat1, lon1, lat2, lon2);
            println!("Distance: {:.1} m ({:.3} km)", meters, meters / 1000.0);
            println!("Course:   {:.1}° ({})", course, cardinal(course));
        }
        Command::Config { save } => {
            config.validate()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                config.save()?;
                println!("Saved to {}", GpsConfig::get_config_path()?.display());
            }
        }
    }

    Ok(())
}

async fn run_dashboard(config: &GpsConfig, source: GpsSource) -> anyhow::Result<()> {
    config.validate()?;
    let monitor = GpsMonitor::with_custom_fields(config.custom_fields.clone());
    let decoding = monitor.start(source).await?;

    let display = TerminalDisplay::new(Duration::from_millis(config.refresh_ms));
    display.run(monitor.shared_data(), monitor.running_flag()).await?;

    monitor.stop();
    decoding.abort();
    Ok(())
}

async fn replay_summary(config: &GpsConfig, source: GpsSource) -> anyhow::Result<()> {
    config.validate()?;
    let monitor = GpsMonitor::with_custom_fields(config.custom_fields.clone());
    let stats = monitor.start(source).await?.await.context("decoder task failed")??;
    let data = monitor.get_data();

    println!("Characters:       {}", stats.chars_processed);
    println!("Checksum passed:  {}", stats.passed_checksum);
    println!("Checksum failed:  {}", stats.failed_checksum);
    println!("Sentences w/ fix: {}", stats.sentences_with_fix);
    if let (Some(lat), Some(lon)) = (data.latitude, data.longitude) {
        println!("Last position:    {:.6}, {:.6}", lat, lon);
    }
    if let (Some(date), Some(time)) = (data.date, data.time) {
        println!("Last UTC:         {} {}", date, time);
    }
    for field in &data.custom {
        println!(
            "{}#{}:{}{}",
            field.sentence,
            field.term,
            " ".repeat(12usize.saturating_sub(field.sentence.len() + 3)),
            field.value.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
