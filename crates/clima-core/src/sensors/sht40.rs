use crate::sample::Quantity;
use crate::sensors::{ClimateSensor, SensorError, check_reading};

use embedded_hal_async::i2c::I2c;
use log::error;
use sht4x::Sht4xAsync;

const SENSOR_NAME: &str = "SHT40";

/// Sensirion SHT40 temperature/humidity sensor on I2C.
///
/// A single measurement yields both values. The humidity of the measurement
/// taken by [`ClimateSensor::read_temperature`] is held back for the next
/// humidity read, so a sampler reading temperature then humidity gets one
/// coherent pair from one conversion.
pub struct SHT40Sensor<I> {
    sensor: Sht4xAsync<I, embassy_time::Delay>,
    pending_humidity: Option<f32>,
}

impl<I: I2c> SHT40Sensor<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            sensor: Sht4xAsync::<I, embassy_time::Delay>::new(i2c),
            pending_humidity: None,
        }
    }

    /// Returns (°C, %RH)
    async fn measure(&mut self) -> Result<(f32, f32), SensorError> {
        let measurement = self
            .sensor
            .measure(sht4x::Precision::High, &mut embassy_time::Delay)
            .await
            .map_err(|e| {
                error!("SHT40 measurement failed: {:?}", e);
                SensorError::ReadFailed {
                    sensor: SENSOR_NAME,
                    operation: "measure temperature/humidity",
                    details: "I2C communication error or sensor not responding",
                }
            })?;

        Ok((
            measurement.temperature_celsius().to_num::<f32>(),
            measurement.humidity_percent().to_num::<f32>(),
        ))
    }
}

impl<I: I2c> ClimateSensor for SHT40Sensor<I> {
    async fn read_temperature(&mut self) -> Result<f32, SensorError> {
        self.pending_humidity = None;
        let (temperature, humidity) = self.measure().await?;
        self.pending_humidity = Some(humidity);
        check_reading(SENSOR_NAME, Quantity::Temperature, temperature)
    }

    async fn read_humidity(&mut self) -> Result<f32, SensorError> {
        let humidity = match self.pending_humidity.take() {
            Some(humidity) => humidity,
            None => self.measure().await?.1,
        };
        check_reading(SENSOR_NAME, Quantity::Humidity, humidity)
    }
}
