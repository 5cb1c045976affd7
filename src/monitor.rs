// src/monitor.rs
//! Feeds bytes from a GPS source into the decoder and publishes snapshots

use crate::{
    config::CustomFieldConfig,
    error::{GpsError, Result},
    gps::{
        data::GpsData,
        decoder::{DecoderStats, NmeaDecoder},
        field::Clock,
    },
};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    task::JoinHandle,
};
use tokio_serial::SerialPortBuilderExt;

/// Longest line kept for the raw sentence display
const MAX_ECHO_LEN: usize = 120;

/// GPS data source configuration
#[derive(Debug, Clone)]
pub enum GpsSource {
    /// Receiver attached to a serial port
    Serial { port: String, baudrate: u32 },
    /// Recorded NMEA log, optionally paced to a character rate
    Replay {
        path: PathBuf,
        chars_per_sec: Option<u32>,
    },
}

impl GpsSource {
    fn name(&self) -> &'static str {
        match self {
            GpsSource::Serial { .. } => "Serial GPS",
            GpsSource::Replay { .. } => "Replay",
        }
    }
}

/// Coordinates the decoding task and the shared snapshot
pub struct GpsMonitor {
    data: Arc<RwLock<GpsData>>,
    running: Arc<AtomicBool>,
    custom_fields: Vec<CustomFieldConfig>,
}

impl GpsMonitor {
    /// Create a new GPS monitor
    pub fn new() -> Self {
        Self::with_custom_fields(Vec::new())
    }

    /// Create a monitor whose decoder carries the given custom fields
    pub fn with_custom_fields(custom_fields: Vec<CustomFieldConfig>) -> Self {
        Self {
            data: Arc::new(RwLock::new(GpsData::new())),
            running: Arc::new(AtomicBool::new(true)),
            custom_fields,
        }
    }

    /// Build a decoder with every configured custom field registered
    pub fn build_decoder(&self) -> Result<NmeaDecoder> {
        let mut decoder = NmeaDecoder::new();
        for field in &self.custom_fields {
            decoder.register_custom(&field.sentence, field.term)?;
        }
        Ok(decoder)
    }

    /// Open the source and start decoding it on a background task
    pub async fn start(&self, source: GpsSource) -> Result<JoinHandle<Result<DecoderStats>>> {
        let decoder = self.build_decoder()?;
        let name = source.name();
        let data = Arc::clone(&self.data);
        let running = Arc::clone(&self.running);

        let handle = match source {
            GpsSource::Serial { port, baudrate } => {
                let serial = Self::connect_serial(&port, baudrate)?;
                tokio::spawn(pump(serial, decoder, data, running, name, None))
            }
            GpsSource::Replay {
                path,
                chars_per_sec,
            } => {
                let file = tokio::fs::File::open(&path).await.map_err(|e| {
                    GpsError::Connection(format!("Failed to open {}: {}", path.display(), e))
                })?;
                tracing::info!(path = %path.display(), ?chars_per_sec, "replaying NMEA log");
                tokio::spawn(pump(file, decoder, data, running, name, chars_per_sec))
            }
        };

        Ok(handle)
    }

    /// Connect to a GPS device via serial port
    fn connect_serial(port: &str, baudrate: u32) -> Result<tokio_serial::SerialStream> {
        tracing::info!(port, baudrate, "opening serial port");

        let serial = tokio_serial::new(port, baudrate)
            .timeout(Duration::from_millis(1000))
            .open_native_async()
            .map_err(|e| GpsError::Connection(format!("Failed to open serial port {}: {}", port, e)))?;

        tracing::info!(port, "serial port open");
        Ok(serial)
    }

    /// Stop the monitor
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Check if the monitor is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn shared_data(&self) -> Arc<RwLock<GpsData>> {
        Arc::clone(&self.data)
    }

    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Get a clone of the current GPS data
    pub fn get_data(&self) -> GpsData {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for GpsMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects the text of the sentence currently arriving, for display only
#[derive(Default)]
struct SentenceEcho {
    line: String,
}

impl SentenceEcho {
    /// Returns a finished line when `b` ends one
    fn push(&mut self, b: u8) -> Option<String> {
        match b {
            b'$' => {
                self.line.clear();
                self.line.push('$');
                None
            }
            b'\r' | b'\n' => {
                if self.line.is_empty() {
                    None
                } else {
                    Some(std::mem::take(&mut self.line))
                }
            }
            _ => {
                if !self.line.is_empty() && self.line.len() < MAX_ECHO_LEN {
                    self.line.push(b as char);
                }
                None
            }
        }
    }
}

/// Drain `reader` into `decoder` one byte at a time until EOF, an I/O error
/// or `running` is cleared. The decoder lives on this task only; the
/// snapshot is refreshed after every validated sentence.
pub async fn pump<R, C>(
    mut reader: R,
    mut decoder: NmeaDecoder<C>,
    data: Arc<RwLock<GpsData>>,
    running: Arc<AtomicBool>,
    source: &'static str,
    chars_per_sec: Option<u32>,
) -> Result<DecoderStats>
where
    R: AsyncRead + Unpin,
    C: Clock,
{
    // Paced replay reads about a tenth of a second of data at a time
    let chunk = match chars_per_sec {
        Some(rate) => (rate as usize / 10).clamp(1, 256),
        None => 256,
    };
    let mut buf = [0u8; 256];
    let mut echo = SentenceEcho::default();

    while running.load(Ordering::Relaxed) {
        let n = match reader.read(&mut buf[..chunk]).await {
            Ok(0) => {
                tracing::info!(source, "end of input");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                tracing::error!(source, error = %e, "read failed");
                return Err(GpsError::Io(e));
            }
        };

        for &b in &buf[..n] {
            let validated = decoder.decode(b);
            let line = echo.push(b);

            if validated || line.is_some() {
                let mut guard = match data.write() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if validated {
                    guard.refresh(&mut decoder);
                    guard.update_timestamp();
                    guard.set_source(source);
                }
                if let Some(line) = line {
                    tracing::trace!(%line, "sentence received");
                    guard.add_raw_sentence(&line);
                }
            }
        }

        if let Some(rate) = chars_per_sec {
            tokio::time::sleep(Duration::from_secs_f64(n as f64 / rate.max(1) as f64)).await;
        }
    }

    let stats = decoder.stats();
    tracing::info!(
        source,
        chars = stats.chars_processed,
        passed = stats.passed_checksum,
        failed = stats.failed_checksum,
        with_fix = stats.sentences_with_fix,
        "decoder stopped"
    );
    Ok(stats)
}

/// List available serial ports
pub fn list_serial_ports() -> Result<()> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| GpsError::Other(format!("Failed to list serial ports: {}", e)))?;

    if ports.is_empty() {
        println!("No serial ports found.");
    } else {
        println!("Available serial ports:");
        for port in ports {
            println!("  {} - {:?}", port.port_name, port.port_type);
        }
    }

    Ok(())
}
