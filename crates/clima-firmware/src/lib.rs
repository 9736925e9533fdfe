//! ESP32-S3 firmware-specific modules for clima
//!
//! This crate contains hardware-specific code that cannot compile on desktop
//! targets: ESP32 peripheral initialization, the Wi-Fi/TCP/UDP network
//! plumbing, SNTP time synchronization and the cooperative logger main loop.

#![no_std]

extern crate alloc;

pub mod hardware;
pub mod net;
pub mod server;
pub mod wifi_secrets;
