// src/gps/data.rs
//! Consumer-side snapshot of decoded GPS data

use super::{
    decoder::{DecoderStats, NmeaDecoder},
    field::{Clock, FixMode, FixQuality},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Last committed text of a registered custom field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomValue {
    pub sentence: String,
    pub term: u8,
    pub value: Option<String>,
}

/// Plain copy of everything the decoder has committed so far.
///
/// The decoder stays owned by the task feeding it bytes; this is what gets
/// shared with the display.
#[derive(Debug, Clone, Default)]
pub struct GpsData {
    pub timestamp: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>, // meters
    pub speed: Option<f64>,    // km/h
    pub course: Option<f64>,   // degrees
    pub satellites: Option<u32>,
    pub hdop: Option<f64>,
    pub fix_quality: Option<FixQuality>,
    pub fix_mode: Option<FixMode>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub location_age_ms: Option<u32>,
    pub custom: Vec<CustomValue>,
    pub stats: DecoderStats,
    pub source: Option<String>,
    pub raw_data: String,
    pub raw_history: Vec<String>, // Recent NMEA sentences
}

impl GpsData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the GPS data represents a valid position fix
    pub fn has_fix(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Copy every field the decoder committed since the last refresh.
    ///
    /// Fields that were not updated keep their previous snapshot value, and
    /// reading a field clears its updated flag in the decoder.
    pub fn refresh<C: Clock>(&mut self, gps: &mut NmeaDecoder<C>) {
        let now = gps.now_ms();

        if gps.location.is_updated() {
            self.latitude = Some(gps.location.lat());
            self.longitude = Some(gps.location.lng());
            self.fix_quality = Some(gps.location.fix_quality());
            self.fix_mode = Some(gps.location.fix_mode());
        }
        if gps.location.is_valid() {
            self.location_age_ms = Some(gps.location.age(now));
        }
        if gps.altitude.is_updated() {
            self.altitude = Some(gps.altitude.meters());
        }
        if gps.speed.is_updated() {
            self.speed = Some(gps.speed.kmph());
        }
        if gps.course.is_updated() {
            self.course = Some(gps.course.deg());
        }
        if gps.satellites.is_updated() {
            self.satellites = Some(gps.satellites.value());
        }
        if gps.hdop.is_updated() {
            self.hdop = Some(gps.hdop.hdop());
        }
        if gps.date.is_updated() {
            self.date = gps.date.naive_date();
        }
        if gps.time.is_updated() {
            self.time = gps.time.naive_time();
        }

        let keys: Vec<_> = gps
            .custom_fields()
            .keys()
            .map(|(sentence, term, handle)| (sentence.to_string(), term, handle))
            .collect();
        self.custom = keys
            .into_iter()
            .map(|(sentence, term, handle)| {
                let value = gps
                    .custom_mut(handle)
                    .filter(|field| field.is_valid())
                    .map(|field| field.value().to_string());
                CustomValue {
                    sentence,
                    term,
                    value,
                }
            })
            .collect();

        self.stats = gps.stats();
    }

    /// Update the timestamp to now
    pub fn update_timestamp(&mut self) {
        self.timestamp = Some(Utc::now());
    }

    /// Set the data source
    pub fn set_source(&mut self, source: &str) {
        self.source = Some(source.to_string());
    }

    /// Add a raw NMEA sentence to history (keep last 5)
    pub fn add_raw_sentence(&mut self, sentence: &str) {
        self.raw_data = sentence.to_string();
        self.raw_history.push(sentence.to_string());

        if self.raw_history.len() > 5 {
            self.raw_history.remove(0);
        }
    }

    /// Get fix type description
    pub fn get_fix_description(&self) -> String {
        match (self.fix_quality, self.fix_mode) {
            (Some(FixQuality::Unknown(b)), _) => format!("Unknown ({})", b as char),
            (Some(quality), _) => quality.description().to_string(),
            (None, Some(FixMode::Autonomous)) => "Autonomous".to_string(),
            (None, Some(FixMode::Differential)) => "Differential".to_string(),
            (None, Some(FixMode::Estimated)) => "Estimated".to_string(),
            (None, Some(_)) => "No fix".to_string(),
            (None, None) => "Unknown".to_string(),
        }
    }

    /// Format coordinate for display
    pub fn format_coordinate(coord: Option<f64>) -> String {
        match coord {
            Some(val) => format!("{:>12.6}°", val),
            None => "No fix".to_string(),
        }
    }

    /// Format value with unit for display
    pub fn format_value<T: std::fmt::Display>(value: Option<T>, unit: &str) -> String {
        match value {
            Some(val) => format!("{:>12} {}", val, unit),
            None => "Unknown".to_string(),
        }
    }
}
