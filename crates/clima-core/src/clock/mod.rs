//! Wall-clock sources for timestamping samples

#[cfg(feature = "rtc-ds3231")]
mod ds3231;
pub mod ntp;

use core::future::Future;

use thiserror_no_std::Error;

use crate::sample::Timestamp;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// The clock has never been set, or lost its time since.
    #[error("clock is not synchronized")]
    Unsynchronized,
    #[error("clock bus error: {details}")]
    Bus { details: &'static str },
    #[error("clock holds an invalid date/time")]
    InvalidDateTime,
}

/// Provider of the current local time.
pub trait ClockSource {
    /// Current time, or [`ClockError::Unsynchronized`] while no valid time is known.
    fn now(&mut self) -> impl Future<Output = Result<Timestamp, ClockError>>;
}

#[cfg(feature = "rtc-ds3231")]
pub use ds3231::Ds3231;
