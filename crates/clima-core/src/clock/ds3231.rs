//! Maxim DS3231 battery-backed real-time clock
//!
//! The RTC keeps counting on its coin cell while the logger is unpowered.
//! Its oscillator-stop flag is set whenever the oscillator has stopped,
//! including the very first power-up, so a set flag means the stored time
//! cannot be trusted until [`Ds3231::set_datetime`] writes a fresh one.
//!
//! Register access goes through the `ds323x` driver, which talks to a
//! blocking bus. A transaction is a handful of bytes, so it is run inline
//! from the async [`ClockSource::now`].

use core::fmt::Debug;

use ds323x::interface::I2cInterface;
use ds323x::{DateTimeAccess, Datelike, Ds323x, NaiveDate, Timelike, ic};
use embedded_hal::i2c::I2c;
use log::{error, info};

use super::{ClockError, ClockSource};
use crate::sample::Timestamp;

/// Years the DS3231 calendar can represent with its century bit
const MIN_YEAR: i32 = 2000;
const MAX_YEAR: i32 = 2100;

pub struct Ds3231<I> {
    rtc: Ds323x<I2cInterface<I>, ic::DS3231>,
}

impl<I, E> Ds3231<I>
where
    I: I2c<Error = E>,
    E: Debug,
{
    pub fn new(i2c: I) -> Self {
        Self {
            rtc: Ds323x::new_ds3231(i2c),
        }
    }

    /// Write a new date/time, make sure the oscillator keeps running on
    /// battery and clear the oscillator-stop flag.
    pub fn set_datetime(&mut self, timestamp: Timestamp) -> Result<(), ClockError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&timestamp.year()) {
            return Err(ClockError::InvalidDateTime);
        }
        let datetime = NaiveDate::from_ymd_opt(timestamp.year(), timestamp.month(), timestamp.day())
            .and_then(|date| {
                date.and_hms_opt(timestamp.hour(), timestamp.minute(), timestamp.second())
            })
            .ok_or(ClockError::InvalidDateTime)?;

        self.rtc
            .set_datetime(&datetime)
            .map_err(|e| bus_error("time write", e))?;
        self.rtc
            .enable()
            .map_err(|e| bus_error("oscillator enable", e))?;
        self.rtc
            .clear_has_been_stopped_flag()
            .map_err(|e| bus_error("status write", e))?;

        info!("DS3231: time set to {}", timestamp);
        Ok(())
    }

    /// Whether the stored time survived since it was last set
    pub fn is_valid(&mut self) -> Result<bool, ClockError> {
        self.rtc
            .has_been_stopped()
            .map(|stopped| !stopped)
            .map_err(|e| bus_error("status read", e))
    }
}

impl<I, E> ClockSource for Ds3231<I>
where
    I: I2c<Error = E>,
    E: Debug,
{
    async fn now(&mut self) -> Result<Timestamp, ClockError> {
        if !self.is_valid()? {
            return Err(ClockError::Unsynchronized);
        }

        let datetime = self
            .rtc
            .datetime()
            .map_err(|e| bus_error("time read", e))?;

        Timestamp::from_ymd_hms(
            datetime.year(),
            datetime.month(),
            datetime.day(),
            datetime.hour(),
            datetime.minute(),
            datetime.second(),
        )
        .ok_or(ClockError::InvalidDateTime)
    }
}

fn bus_error<E: Debug>(operation: &'static str, e: E) -> ClockError {
    error!("DS3231 {} failed: {:?}", operation, e);
    ClockError::Bus { details: operation }
}
