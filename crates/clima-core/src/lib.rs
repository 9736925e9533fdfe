//! Hardware-independent core library for clima
//!
//! This crate contains all platform-agnostic logic for the clima temperature
//! and humidity logger: the bounded sample history, the cooperative sampler,
//! JSON query serialization, HTTP request routing, the embedded web UI and
//! the sensor/clock abstractions with their I2C drivers.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod app_state;
pub mod assets;
pub mod clock;
pub mod config;
pub mod history;
pub mod http;
pub mod query;
pub mod sample;
pub mod sampler;
pub mod sensors;
