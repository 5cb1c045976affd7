// src/gps/mod.rs
//! Streaming NMEA-0183 decoding and the data it produces

pub mod codec;
pub mod custom;
pub mod data;
pub mod decoder;
pub mod field;
pub mod geo;

pub use custom::{CustomHandle, CustomRegistry};
pub use data::GpsData;
pub use decoder::{DecoderStats, NmeaDecoder, SentenceKind};
pub use field::{Clock, FixMode, FixQuality, ManualClock, MonotonicClock};
