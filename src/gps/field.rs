// src/gps/field.rs
//! Typed field containers with two-phase (stage/commit) visibility
//!
//! The decoder writes into the staged side of a field term by term. Readers
//! only ever see the committed side, which changes in one step when a
//! sentence passes its checksum.

use super::codec::{self, RawDegrees};
use chrono::{NaiveDate, NaiveTime};
use std::{
    marker::PhantomData,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Instant,
};
use tinyvec::ArrayVec;

pub const MPH_PER_KNOT: f64 = 1.15077945;
pub const MPS_PER_KNOT: f64 = 0.51444444;
pub const KMPH_PER_KNOT: f64 = 1.852;
pub const MILES_PER_METER: f64 = 0.00062137112;
pub const KM_PER_METER: f64 = 0.001;
pub const FEET_PER_METER: f64 = 3.2808399;

/// Capacity of a custom field's text buffer
pub const MAX_FIELD_SIZE: usize = 15;

/// Monotonic millisecond time source used to stamp commits
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Milliseconds since the clock was created
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u32 {
        // Wraps after ~49 days, like a firmware millis() counter
        self.start.elapsed().as_millis() as u32
    }
}

/// Externally driven clock. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: u32) {
        self.now.store(ms, Ordering::Relaxed);
    }

    pub fn advance(&self, ms: u32) {
        self.now.fetch_add(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.load(Ordering::Relaxed)
    }
}

/// Value being assembled from the sentence currently in flight
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Staged<T>(T);

/// Value last published by a checksum-validated sentence
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Committed<T>(T);

/// A staged/committed pair plus the freshness bookkeeping every field shares.
///
/// `commit` is the only way anything reaches the committed side.
#[derive(Debug, Clone, Default)]
pub struct TwoPhase<T> {
    staged: Staged<T>,
    committed: Committed<T>,
    valid: bool,
    updated: bool,
    last_commit_ms: u32,
}

impl<T: Clone> TwoPhase<T> {
    pub(crate) fn stage(&mut self, value: T) {
        self.staged.0 = value;
    }

    pub(crate) fn staged_mut(&mut self) -> &mut T {
        &mut self.staged.0
    }

    pub(crate) fn commit(&mut self, now_ms: u32) {
        self.committed = Committed(self.staged.0.clone());
        self.last_commit_ms = now_ms;
        self.valid = true;
        self.updated = true;
    }

    /// Committed value; clears the updated flag
    fn read(&mut self) -> &T {
        self.updated = false;
        &self.committed.0
    }

    /// Committed value without touching the updated flag
    fn peek(&self) -> &T {
        &self.committed.0
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn is_updated(&self) -> bool {
        self.updated
    }

    fn age(&self, now_ms: u32) -> u32 {
        if self.valid {
            now_ms.wrapping_sub(self.last_commit_ms)
        } else {
            u32::MAX
        }
    }
}

macro_rules! freshness_accessors {
    ($inner:ident) => {
        /// Whether this field has ever been committed
        pub fn is_valid(&self) -> bool {
            self.$inner.is_valid()
        }

        /// Whether a commit happened since the last read
        pub fn is_updated(&self) -> bool {
            self.$inner.is_updated()
        }

        /// Milliseconds since the last commit, `u32::MAX` if never committed
        pub fn age(&self, now_ms: u32) -> u32 {
            self.$inner.age(now_ms)
        }
    };
}

/// GGA fix quality indicator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FixQuality {
    #[default]
    Invalid,
    Gps,
    Dgps,
    Pps,
    Rtk,
    FloatRtk,
    Estimated,
    Manual,
    Simulated,
    Unknown(u8),
}

impl FixQuality {
    pub fn from_byte(b: u8) -> Self {
        match b {
            b'0' => FixQuality::Invalid,
            b'1' => FixQuality::Gps,
            b'2' => FixQuality::Dgps,
            b'3' => FixQuality::Pps,
            b'4' => FixQuality::Rtk,
            b'5' => FixQuality::FloatRtk,
            b'6' => FixQuality::Estimated,
            b'7' => FixQuality::Manual,
            b'8' => FixQuality::Simulated,
            other => FixQuality::Unknown(other),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FixQuality::Invalid => "No fix",
            FixQuality::Gps => "GPS",
            FixQuality::Dgps => "DGPS",
            FixQuality::Pps => "PPS",
            FixQuality::Rtk => "RTK",
            FixQuality::FloatRtk => "Float RTK",
            FixQuality::Estimated => "Estimated",
            FixQuality::Manual => "Manual",
            FixQuality::Simulated => "Simulation",
            FixQuality::Unknown(_) => "Unknown",
        }
    }
}

/// RMC positioning mode indicator (NMEA 2.3+)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FixMode {
    #[default]
    NotValid,
    Autonomous,
    Differential,
    Estimated,
    Unknown(u8),
}

impl FixMode {
    pub fn from_byte(b: u8) -> Self {
        match b {
            b'N' => FixMode::NotValid,
            b'A' => FixMode::Autonomous,
            b'D' => FixMode::Differential,
            b'E' => FixMode::Estimated,
            other => FixMode::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Position {
    lat: RawDegrees,
    lng: RawDegrees,
    quality: FixQuality,
    mode: FixMode,
}

/// Latitude/longitude plus the fix quality and mode that came with it
#[derive(Debug, Clone, Default)]
pub struct LocationField {
    inner: TwoPhase<Position>,
}

impl LocationField {
    freshness_accessors!(inner);

    pub fn raw_lat(&mut self) -> RawDegrees {
        self.inner.read().lat
    }

    pub fn raw_lng(&mut self) -> RawDegrees {
        self.inner.read().lng
    }

    /// Latitude in signed decimal degrees
    pub fn lat(&mut self) -> f64 {
        self.inner.read().lat.to_degrees()
    }

    /// Longitude in signed decimal degrees
    pub fn lng(&mut self) -> f64 {
        self.inner.read().lng.to_degrees()
    }

    pub fn fix_quality(&mut self) -> FixQuality {
        self.inner.read().quality
    }

    pub fn fix_mode(&mut self) -> FixMode {
        self.inner.read().mode
    }

    pub(crate) fn set_latitude(&mut self, term: &[u8]) {
        self.inner.staged_mut().lat = codec::parse_degrees(term);
    }

    pub(crate) fn set_longitude(&mut self, term: &[u8]) {
        self.inner.staged_mut().lng = codec::parse_degrees(term);
    }

    pub(crate) fn set_lat_hemisphere(&mut self, term: &[u8]) {
        self.inner.staged_mut().lat.negative = term.first() == Some(&b'S');
    }

    pub(crate) fn set_lng_hemisphere(&mut self, term: &[u8]) {
        self.inner.staged_mut().lng.negative = term.first() == Some(&b'W');
    }

    pub(crate) fn set_fix_quality(&mut self, b: u8) {
        self.inner.staged_mut().quality = FixQuality::from_byte(b);
    }

    pub(crate) fn set_fix_mode(&mut self, b: u8) {
        self.inner.staged_mut().mode = FixMode::from_byte(b);
    }

    pub(crate) fn commit(&mut self, now_ms: u32) {
        self.inner.commit(now_ms);
    }
}

/// UTC date packed as `DDMMYY`, the way RMC transmits it
#[derive(Debug, Clone, Default)]
pub struct DateField {
    inner: TwoPhase<u32>,
}

impl DateField {
    freshness_accessors!(inner);

    pub fn value(&mut self) -> u32 {
        *self.inner.read()
    }

    /// Four-digit year. Two-digit years below 80 are 20xx, the rest 19xx.
    pub fn year(&mut self) -> u16 {
        let yy = (*self.inner.read() % 100) as u16;
        if yy < 80 {
            2000 + yy
        } else {
            1900 + yy
        }
    }

    pub fn month(&mut self) -> u8 {
        ((*self.inner.read() / 100) % 100) as u8
    }

    pub fn day(&mut self) -> u8 {
        (*self.inner.read() / 10000) as u8
    }

    /// Calendar date, `None` if the packed value is not a real date
    pub fn naive_date(&mut self) -> Option<NaiveDate> {
        let (year, month, day) = (self.year(), self.month(), self.day());
        NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
    }

    pub(crate) fn set_date(&mut self, term: &[u8]) {
        self.inner.stage(codec::parse_integer(term) as u32);
    }

    pub(crate) fn commit(&mut self, now_ms: u32) {
        self.inner.commit(now_ms);
    }
}

/// UTC time of day packed as `HHMMSScc`
#[derive(Debug, Clone, Default)]
pub struct TimeField {
    inner: TwoPhase<u32>,
}

impl TimeField {
    freshness_accessors!(inner);

    pub fn value(&mut self) -> u32 {
        *self.inner.read()
    }

    pub fn hour(&mut self) -> u8 {
        (*self.inner.read() / 1_000_000) as u8
    }

    pub fn minute(&mut self) -> u8 {
        ((*self.inner.read() / 10_000) % 100) as u8
    }

    pub fn second(&mut self) -> u8 {
        ((*self.inner.read() / 100) % 100) as u8
    }

    pub fn centisecond(&mut self) -> u8 {
        (*self.inner.read() % 100) as u8
    }

    pub fn naive_time(&mut self) -> Option<NaiveTime> {
        let (h, m, s, cs) = (self.hour(), self.minute(), self.second(), self.centisecond());
        NaiveTime::from_hms_milli_opt(h as u32, m as u32, s as u32, cs as u32 * 10)
    }

    pub(crate) fn set_time(&mut self, term: &[u8]) {
        self.inner.stage(codec::parse_decimal(term) as u32);
    }

    pub(crate) fn commit(&mut self, now_ms: u32) {
        self.inner.commit(now_ms);
    }
}

/// Unit marker for speed over ground (knots)
#[derive(Debug, Clone, Copy, Default)]
pub struct Speed;
/// Unit marker for course over ground (degrees)
#[derive(Debug, Clone, Copy, Default)]
pub struct Course;
/// Unit marker for altitude above mean sea level (meters)
#[derive(Debug, Clone, Copy, Default)]
pub struct Altitude;
/// Unit marker for horizontal dilution of precision
#[derive(Debug, Clone, Copy, Default)]
pub struct Hdop;

/// Signed fixed-point value with two implied decimal digits
#[derive(Debug, Clone, Default)]
pub struct DecimalField<U> {
    inner: TwoPhase<i32>,
    unit: PhantomData<U>,
}

pub type SpeedField = DecimalField<Speed>;
pub type CourseField = DecimalField<Course>;
pub type AltitudeField = DecimalField<Altitude>;
pub type HdopField = DecimalField<Hdop>;

impl<U> DecimalField<U> {
    freshness_accessors!(inner);

    /// Raw value scaled by 100
    pub fn value(&mut self) -> i32 {
        *self.inner.read()
    }

    fn scaled(&mut self) -> f64 {
        self.value() as f64 / 100.0
    }

    pub(crate) fn set(&mut self, term: &[u8]) {
        self.inner.stage(codec::parse_decimal(term));
    }

    pub(crate) fn commit(&mut self, now_ms: u32) {
        self.inner.commit(now_ms);
    }
}

impl DecimalField<Speed> {
    pub fn knots(&mut self) -> f64 {
        self.scaled()
    }

    pub fn mph(&mut self) -> f64 {
        MPH_PER_KNOT * self.scaled()
    }

    pub fn mps(&mut self) -> f64 {
        MPS_PER_KNOT * self.scaled()
    }

    pub fn kmph(&mut self) -> f64 {
        KMPH_PER_KNOT * self.scaled()
    }
}

impl DecimalField<Course> {
    pub fn deg(&mut self) -> f64 {
        self.scaled()
    }
}

impl DecimalField<Altitude> {
    pub fn meters(&mut self) -> f64 {
        self.scaled()
    }

    pub fn miles(&mut self) -> f64 {
        MILES_PER_METER * self.scaled()
    }

    pub fn kilometers(&mut self) -> f64 {
        KM_PER_METER * self.scaled()
    }

    pub fn feet(&mut self) -> f64 {
        FEET_PER_METER * self.scaled()
    }
}

impl DecimalField<Hdop> {
    pub fn hdop(&mut self) -> f64 {
        self.scaled()
    }
}

/// Unsigned integer field (satellites in use)
#[derive(Debug, Clone, Default)]
pub struct IntegerField {
    inner: TwoPhase<u32>,
}

impl IntegerField {
    freshness_accessors!(inner);

    pub fn value(&mut self) -> u32 {
        *self.inner.read()
    }

    pub(crate) fn set(&mut self, term: &[u8]) {
        self.inner.stage(codec::parse_integer(term) as u32);
    }

    pub(crate) fn commit(&mut self, now_ms: u32) {
        self.inner.commit(now_ms);
    }
}

pub(crate) type FieldText = ArrayVec<[u8; MAX_FIELD_SIZE]>;

/// Raw text of an application-defined term. Longer terms are truncated.
#[derive(Debug, Clone, Default)]
pub struct CustomField {
    inner: TwoPhase<FieldText>,
}

impl CustomField {
    freshness_accessors!(inner);

    /// Committed term text. NMEA is ASCII; anything else reads as empty.
    pub fn value(&mut self) -> &str {
        std::str::from_utf8(self.inner.read().as_slice()).unwrap_or("")
    }

    /// Like `value` but leaves the updated flag alone
    pub fn peek(&self) -> &str {
        std::str::from_utf8(self.inner.peek().as_slice()).unwrap_or("")
    }

    pub(crate) fn set(&mut self, term: &[u8]) {
        let staged = self.inner.staged_mut();
        staged.clear();
        staged.extend_from_slice(&term[..term.len().min(MAX_FIELD_SIZE)]);
    }

    pub(crate) fn commit(&mut self, now_ms: u32) {
        self.inner.commit(now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_phase_staging_is_invisible() {
        let mut speed = SpeedField::default();
        speed.set(b"022.4");
        assert!(!speed.is_valid());
        assert!(!speed.is_updated());
        assert_eq!(speed.value(), 0);

        speed.commit(10);
        assert!(speed.is_valid());
        assert!(speed.is_updated());
        assert_eq!(speed.value(), 2240);
        assert!(!speed.is_updated());
    }

    #[test]
    fn test_updated_cleared_by_any_read() {
        let mut time = TimeField::default();
        time.set_time(b"123519");
        time.commit(0);

        assert!(time.is_updated());
        assert_eq!(time.hour(), 12);
        assert!(!time.is_updated());
        assert_eq!(time.minute(), 35);
        assert_eq!(time.second(), 19);
        assert_eq!(time.centisecond(), 0);
    }

    #[test]
    fn test_reads_are_idempotent() {
        let mut sats = IntegerField::default();
        sats.set(b"08");
        sats.commit(0);
        assert!(sats.is_updated());
        assert_eq!(sats.value(), 8);
        assert!(!sats.is_updated());
        assert_eq!(sats.value(), 8);
        assert!(!sats.is_updated());
    }

    #[test]
    fn test_valid_is_sticky() {
        let mut hdop = HdopField::default();
        hdop.set(b"0.9");
        hdop.commit(0);
        let _ = hdop.hdop();
        hdop.set(b"1.2");
        assert!(hdop.is_valid());
        assert!((hdop.hdop() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_age() {
        let mut date = DateField::default();
        assert_eq!(date.age(1234), u32::MAX);
        date.set_date(b"230394");
        date.commit(1000);
        assert_eq!(date.age(1500), 500);
        // millis() wrap-around
        date.commit(u32::MAX - 9);
        assert_eq!(date.age(10), 20);
    }

    #[test]
    fn test_date_components() {
        let mut date = DateField::default();
        date.set_date(b"230394");
        date.commit(0);
        assert_eq!(date.day(), 23);
        assert_eq!(date.month(), 3);
        assert_eq!(date.year(), 1994);
        assert_eq!(date.naive_date(), NaiveDate::from_ymd_opt(1994, 3, 23));

        date.set_date(b"100117");
        date.commit(0);
        assert_eq!(date.year(), 2017);
    }

    #[test]
    fn test_naive_time() {
        let mut time = TimeField::default();
        time.set_time(b"001031.50");
        time.commit(0);
        assert_eq!(time.naive_time(), NaiveTime::from_hms_milli_opt(0, 10, 31, 500));
    }

    #[test]
    fn test_unit_conversions() {
        let mut speed = SpeedField::default();
        speed.set(b"10.00");
        speed.commit(0);
        assert!((speed.knots() - 10.0).abs() < 1e-9);
        assert!((speed.kmph() - 18.52).abs() < 1e-9);
        assert!((speed.mph() - 11.5077945).abs() < 1e-9);
        assert!((speed.mps() - 5.1444444).abs() < 1e-9);

        let mut alt = AltitudeField::default();
        alt.set(b"545.4");
        alt.commit(0);
        assert!((alt.meters() - 545.4).abs() < 1e-9);
        assert!((alt.kilometers() - 0.5454).abs() < 1e-9);
        assert!((alt.feet() - 545.4 * FEET_PER_METER).abs() < 1e-9);
        assert!((alt.miles() - 545.4 * MILES_PER_METER).abs() < 1e-9);
    }

    #[test]
    fn test_location_hemispheres() {
        let mut loc = LocationField::default();
        loc.set_latitude(b"5321.6802");
        loc.set_lat_hemisphere(b"S");
        loc.set_longitude(b"00630.3372");
        loc.set_lng_hemisphere(b"W");
        loc.set_fix_quality(b'1');
        loc.commit(0);

        assert!((loc.lat() + 53.361336).abs() < 1e-6);
        assert!((loc.lng() + 6.505620).abs() < 1e-6);
        assert_eq!(loc.fix_quality(), FixQuality::Gps);
        assert_eq!(loc.fix_mode(), FixMode::NotValid);
    }

    #[test]
    fn test_custom_field_truncates() {
        let mut custom = CustomField::default();
        custom.set(b"0123456789abcdefghij");
        custom.commit(0);
        assert_eq!(custom.peek(), "0123456789abcde");
        assert!(custom.is_updated());
        assert_eq!(custom.value().len(), MAX_FIELD_SIZE);
        assert!(!custom.is_updated());
    }

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.set(100);
        handle.advance(25);
        assert_eq!(clock.now_ms(), 125);
    }
}
