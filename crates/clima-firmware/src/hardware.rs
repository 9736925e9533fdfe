//! Hardware initialization for the clima logger
//!
//! The SHT40 sits on I2C0 in async mode. The DS3231 driver only speaks the
//! blocking I2C traits, so the RTC gets I2C1 in blocking mode.

use clima_core::clock::Ds3231;
use clima_core::sensors::SHT40Sensor;
use esp_hal::i2c::master::{Config as I2cConfig, ConfigError, I2c};
use esp_hal::{Async, Blocking, time::Rate};
use log::info;

pub type SensorBus = I2c<'static, Async>;
pub type RtcBus = I2c<'static, Blocking>;

pub type Sensor = SHT40Sensor<SensorBus>;
pub type Rtc = Ds3231<RtcBus>;

/// Devices on the I2C buses
pub struct I2cHardware {
    pub sensor: Sensor,
    pub rtc: Rtc,
}

fn bus_config() -> I2cConfig {
    I2cConfig::default().with_frequency(Rate::from_khz(400))
}

/// Create the sensor bus (I2C0) at 400 kHz.
pub fn create_sensor_bus(
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: esp_hal::peripherals::GPIO12<'static>,
    scl: esp_hal::peripherals::GPIO11<'static>,
) -> Result<SensorBus, ConfigError> {
    Ok(I2c::new(i2c0, bus_config())?
        .with_sda(sda)
        .with_scl(scl)
        .into_async())
}

/// Create the RTC bus (I2C1) at 400 kHz.
pub fn create_rtc_bus(
    i2c1: esp_hal::peripherals::I2C1<'static>,
    sda: esp_hal::peripherals::GPIO13<'static>,
    scl: esp_hal::peripherals::GPIO14<'static>,
) -> Result<RtcBus, ConfigError> {
    Ok(I2c::new(i2c1, bus_config())?.with_sda(sda).with_scl(scl))
}

pub fn init_i2c_hardware(sensor_bus: SensorBus, rtc_bus: RtcBus) -> I2cHardware {
    info!("I2C0 ready (SHT40), I2C1 ready (DS3231)");

    I2cHardware {
        sensor: SHT40Sensor::new(sensor_bus),
        rtc: Ds3231::new(rtc_bus),
    }
}
