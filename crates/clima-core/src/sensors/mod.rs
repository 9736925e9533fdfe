#[cfg(feature = "sensor-sht40")]
mod sht40;

use core::future::Future;

use thiserror_no_std::Error;

use crate::sample::Quantity;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: failed to {operation} ({details})")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: {quantity:?} reading is not a number")]
    NotANumber {
        sensor: &'static str,
        quantity: Quantity,
    },
}

/// Source of temperature and humidity readings.
///
/// Each read is expected to complete within a bounded, short time. A failed
/// read is reported as an error and the caller decides what to drop.
pub trait ClimateSensor {
    /// Temperature in °C
    fn read_temperature(&mut self) -> impl Future<Output = Result<f32, SensorError>>;

    /// Relative humidity in %
    fn read_humidity(&mut self) -> impl Future<Output = Result<f32, SensorError>>;
}

/// Reject readings a driver reports as NaN.
pub fn check_reading(
    sensor: &'static str,
    quantity: Quantity,
    value: f32,
) -> Result<f32, SensorError> {
    if value.is_nan() {
        Err(SensorError::NotANumber { sensor, quantity })
    } else {
        Ok(value)
    }
}

#[cfg(feature = "sensor-sht40")]
pub use sht40::SHT40Sensor;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_reading_rejects_nan() {
        assert_eq!(
            check_reading("test", Quantity::Humidity, f32::NAN),
            Err(SensorError::NotANumber {
                sensor: "test",
                quantity: Quantity::Humidity
            })
        );
        assert_eq!(check_reading("test", Quantity::Temperature, -4.5), Ok(-4.5));
    }
}
