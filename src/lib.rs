// src/lib.rs
//! GPS Tracker Library
//!
//! A streaming NMEA-0183 decoder for GPS tracker firmware, with typed
//! two-phase field containers, application-defined custom fields and
//! great-circle helpers, plus the host-side plumbing to drive it from a
//! serial port or a recorded log.

pub mod config;
pub mod display;
pub mod error;
pub mod gps;
pub mod monitor;

// Re-export main types for convenience
pub use error::{GpsError, Result};
pub use gps::{
    data::GpsData,
    decoder::{DecoderStats, NmeaDecoder},
    geo::{cardinal, course_to, distance_between},
};
pub use monitor::{GpsMonitor, GpsSource};
