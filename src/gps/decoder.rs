// src/gps/decoder.rs
//! Character-at-a-time NMEA-0183 sentence decoder
//!
//! `NmeaDecoder::decode` is fed one byte per call, in arrival order. It
//! never blocks, never allocates and never fails: a sentence with a bad
//! checksum is dropped and decoding recovers at the next `$`.

use super::{
    codec,
    custom::{Cursor, CustomHandle, CustomRegistry},
    field::{
        AltitudeField, Clock, CourseField, CustomField, DateField, HdopField, IntegerField,
        LocationField, MonotonicClock, SpeedField, TimeField,
    },
};
use crate::error::Result;
use tinyvec::ArrayVec;

/// Size of the term buffer. One byte is kept in reserve, as for a C string
/// terminator, so at most `MAX_TERM_SIZE - 1` bytes of a term are stored.
pub const MAX_TERM_SIZE: usize = 15;

/// Talker ID second letters accepted for RMC/GGA (GPS, GNSS, Galileo, BeiDou, GLONASS)
const TALKER_IDS: &[u8] = b"PNABL";

type TermBuffer = ArrayVec<[u8; MAX_TERM_SIZE]>;

/// Sentence types the decoder routes into its built-in fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceKind {
    Gga,
    Rmc,
    Other,
}

impl SentenceKind {
    /// Classify a sentence name such as `GPRMC` or `GNGGA`
    pub fn classify(name: &[u8]) -> Self {
        match name {
            [b'G', talker, rest @ ..] if TALKER_IDS.contains(talker) => match rest {
                b"RMC" => SentenceKind::Rmc,
                b"GGA" => SentenceKind::Gga,
                _ => SentenceKind::Other,
            },
            _ => SentenceKind::Other,
        }
    }
}

/// Where a body term of an RMC or GGA sentence goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Time,
    RmcStatus,
    Latitude,
    LatHemisphere,
    Longitude,
    LngHemisphere,
    Speed,
    Course,
    Date,
    GgaQuality,
    Satellites,
    Hdop,
    Altitude,
    RmcMode,
}

fn route(kind: SentenceKind, term_index: u8) -> Option<Route> {
    use SentenceKind::*;
    let route = match (kind, term_index) {
        (Rmc | Gga, 1) => Route::Time,
        (Rmc, 2) => Route::RmcStatus,
        (Rmc, 3) | (Gga, 2) => Route::Latitude,
        (Rmc, 4) | (Gga, 3) => Route::LatHemisphere,
        (Rmc, 5) | (Gga, 4) => Route::Longitude,
        (Rmc, 6) | (Gga, 5) => Route::LngHemisphere,
        (Rmc, 7) => Route::Speed,
        (Rmc, 8) => Route::Course,
        (Rmc, 9) => Route::Date,
        (Gga, 6) => Route::GgaQuality,
        (Gga, 7) => Route::Satellites,
        (Gga, 8) => Route::Hdop,
        (Gga, 9) => Route::Altitude,
        (Rmc, 12) => Route::RmcMode,
        _ => return None,
    };
    Some(route)
}

/// Running decoder counters. Never reset after construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub chars_processed: u32,
    pub sentences_with_fix: u32,
    pub passed_checksum: u32,
    pub failed_checksum: u32,
}

/// Streaming NMEA decoder with two-phase field commits
#[derive(Debug)]
pub struct NmeaDecoder<C: Clock = MonotonicClock> {
    pub location: LocationField,
    pub date: DateField,
    pub time: TimeField,
    pub speed: SpeedField,
    pub course: CourseField,
    pub altitude: AltitudeField,
    pub satellites: IntegerField,
    pub hdop: HdopField,

    clock: C,

    // parsing state
    parity: u8,
    is_checksum_term: bool,
    term: TermBuffer,
    sentence: SentenceKind,
    term_number: u8,
    sentence_has_fix: bool,

    custom: CustomRegistry,
    custom_cursor: Option<Cursor>,

    stats: DecoderStats,
}

impl NmeaDecoder<MonotonicClock> {
    /// Create a decoder stamping commits with a monotonic host clock
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }
}

impl Default for NmeaDecoder<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> NmeaDecoder<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            location: LocationField::default(),
            date: DateField::default(),
            time: TimeField::default(),
            speed: SpeedField::default(),
            course: CourseField::default(),
            altitude: AltitudeField::default(),
            satellites: IntegerField::default(),
            hdop: HdopField::default(),
            clock,
            parity: 0,
            is_checksum_term: false,
            term: TermBuffer::new(),
            sentence: SentenceKind::Other,
            term_number: 0,
            sentence_has_fix: false,
            custom: CustomRegistry::new(),
            custom_cursor: None,
            stats: DecoderStats::default(),
        }
    }

    /// Feed one received character. Returns `true` only on the character
    /// that completes the checksum term of a sentence whose checksum
    /// matched; its fields have been committed by then.
    pub fn decode(&mut self, c: u8) -> bool {
        self.stats.chars_processed = self.stats.chars_processed.wrapping_add(1);

        match c {
            b',' | b'\r' | b'\n' | b'*' => {
                // Commas are part of the checksum, the other terminators are not
                if c == b',' {
                    self.parity ^= c;
                }
                let is_valid_sentence = self.end_of_term();
                self.term_number = self.term_number.wrapping_add(1);
                self.term.clear();
                self.is_checksum_term = c == b'*';
                is_valid_sentence
            }
            b'$' => {
                self.term_number = 0;
                self.term.clear();
                self.parity = 0;
                self.sentence = SentenceKind::Other;
                self.is_checksum_term = false;
                self.sentence_has_fix = false;
                self.custom_cursor = None;
                false
            }
            _ => {
                // Overflowing bytes are dropped but still checksummed
                if self.term.len() < MAX_TERM_SIZE - 1 {
                    self.term.push(c);
                }
                if !self.is_checksum_term {
                    self.parity ^= c;
                }
                false
            }
        }
    }

    /// Feed a run of bytes, returning how many sentences validated
    pub fn decode_all(&mut self, bytes: &[u8]) -> usize {
        bytes.iter().filter(|&&b| self.decode(b)).count()
    }

    /// Register a custom field for `(sentence, term_index)`. Register all
    /// custom fields before decoding starts.
    pub fn register_custom(&mut self, sentence: &str, term_index: u8) -> Result<CustomHandle> {
        self.custom.register(sentence, term_index)
    }

    pub fn custom(&self, handle: CustomHandle) -> Option<&CustomField> {
        self.custom.get(handle)
    }

    pub fn custom_mut(&mut self, handle: CustomHandle) -> Option<&mut CustomField> {
        self.custom.get_mut(handle)
    }

    pub fn custom_fields(&self) -> &CustomRegistry {
        &self.custom
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    pub fn chars_processed(&self) -> u32 {
        self.stats.chars_processed
    }

    pub fn sentences_with_fix(&self) -> u32 {
        self.stats.sentences_with_fix
    }

    pub fn failed_checksum(&self) -> u32 {
        self.stats.failed_checksum
    }

    pub fn passed_checksum(&self) -> u32 {
        self.stats.passed_checksum
    }

    /// Current reading of the decoder's clock, for use with `age`
    pub fn now_ms(&self) -> u32 {
        self.clock.now_ms()
    }

    /// Handle a just-completed term. Returns true if the sentence has just
    /// passed its checksum.
    fn end_of_term(&mut self) -> bool {
        if self.is_checksum_term {
            return self.end_of_sentence();
        }

        if self.term_number == 0 {
            self.sentence = SentenceKind::classify(&self.term);
            self.custom_cursor = self.custom.locate(&self.term);
            return false;
        }

        if self.sentence != SentenceKind::Other && !self.term.is_empty() {
            if let Some(route) = route(self.sentence, self.term_number) {
                self.apply(route);
            }
        }

        if let Some(cursor) = self.custom_cursor {
            self.custom.stage(cursor, self.term_number, &self.term);
        }

        false
    }

    fn end_of_sentence(&mut self) -> bool {
        let checksum = codec::parse_hex_byte(&self.term);
        if checksum != self.parity {
            self.stats.failed_checksum = self.stats.failed_checksum.wrapping_add(1);
            tracing::debug!(
                expected = checksum,
                computed = self.parity,
                "NMEA checksum mismatch, sentence dropped"
            );
            return false;
        }

        self.stats.passed_checksum = self.stats.passed_checksum.wrapping_add(1);
        if self.sentence_has_fix {
            self.stats.sentences_with_fix = self.stats.sentences_with_fix.wrapping_add(1);
        }

        let now = self.clock.now_ms();
        match self.sentence {
            SentenceKind::Rmc => {
                self.date.commit(now);
                self.time.commit(now);
                if self.sentence_has_fix {
                    self.location.commit(now);
                    self.speed.commit(now);
                    self.course.commit(now);
                }
            }
            SentenceKind::Gga => {
                self.time.commit(now);
                if self.sentence_has_fix {
                    self.location.commit(now);
                    self.altitude.commit(now);
                }
                self.satellites.commit(now);
                self.hdop.commit(now);
            }
            SentenceKind::Other => {}
        }

        if let Some(cursor) = self.custom_cursor {
            self.custom.commit(cursor, now);
        }

        tracing::trace!(sentence = ?self.sentence, fix = self.sentence_has_fix, "sentence committed");
        true
    }

    fn apply(&mut self, route: Route) {
        let term = self.term.as_slice();
        let first = term[0];
        match route {
            Route::Time => self.time.set_time(term),
            Route::RmcStatus => self.sentence_has_fix = first == b'A',
            Route::Latitude => self.location.set_latitude(term),
            Route::LatHemisphere => self.location.set_lat_hemisphere(term),
            Route::Longitude => self.location.set_longitude(term),
            Route::LngHemisphere => self.location.set_lng_hemisphere(term),
            Route::Speed => self.speed.set(term),
            Route::Course => self.course.set(term),
            Route::Date => self.date.set_date(term),
            Route::GgaQuality => {
                self.sentence_has_fix = first > b'0';
                self.location.set_fix_quality(first);
            }
            Route::Satellites => self.satellites.set(term),
            Route::Hdop => self.hdop.set(term),
            Route::Altitude => self.altitude.set(term),
            Route::RmcMode => self.location.set_fix_mode(first),
        }
    }
}
