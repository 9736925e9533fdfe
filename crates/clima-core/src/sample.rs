//! Timestamped temperature/humidity readings

use core::fmt::{self, Write as _};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

/// Length of the `YYYY-MM-DD HH:MM:SS` text form.
pub const TIMESTAMP_TEXT_LEN: usize = 19;

/// Wall-clock time of a reading, in the logger's local time zone.
///
/// Displays as the fixed-width `YYYY-MM-DD HH:MM:SS` form used by the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// Build a timestamp from calendar components, `None` if they are out of range.
    pub fn from_ymd_hms(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .map(Self)
    }

    /// Convert Unix seconds to local time at a fixed UTC offset.
    pub fn from_unix(secs: i64, utc_offset_secs: i32) -> Option<Self> {
        let utc = DateTime::from_timestamp(secs, 0)?.naive_utc();
        utc.checked_add_signed(TimeDelta::seconds(i64::from(utc_offset_secs)))
            .map(Self)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn second(&self) -> u32 {
        self.0.second()
    }

    /// The fixed-width text form as an owned stack string.
    pub fn to_text(&self) -> heapless::String<TIMESTAMP_TEXT_LEN> {
        let mut text = heapless::String::new();
        // Four-digit years always fit; anything wider is truncated by the capacity.
        let _ = write!(text, "{}", self);
        text
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year(),
            self.month(),
            self.day(),
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}

/// One timestamped temperature and humidity reading.
///
/// Samples are only created by the sampler once every part of the reading is
/// valid, and are never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    timestamp: Timestamp,
    temperature: f32,
    humidity: f32,
}

impl Sample {
    pub const fn new(timestamp: Timestamp, temperature: f32, humidity: f32) -> Self {
        Self {
            timestamp,
            temperature,
            humidity,
        }
    }

    pub const fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Temperature in °C
    pub const fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Relative humidity in %
    pub const fn humidity(&self) -> f32 {
        self.humidity
    }
}

/// The measured quantity a query reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Temperature,
    Humidity,
}

impl Quantity {
    /// JSON member name for the value
    pub const fn key(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
        }
    }

    pub const fn value_of(self, sample: &Sample) -> f32 {
        match self {
            Self::Temperature => sample.temperature,
            Self::Humidity => sample.humidity,
        }
    }
}
