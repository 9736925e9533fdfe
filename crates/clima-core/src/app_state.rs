//! Application-wide run state and error types for clima

use core::fmt::{Debug, Write as _};

use log::{info, warn};
use thiserror_no_std::Error;

/// Start-up progression of the logger.
///
/// The device serves the API from `Serving` onwards; `Error` is entered when
/// start-up cannot continue and is only left by a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRunState {
    Uninitialized,
    WifiConnecting,
    WifiConnected,
    TimeSyncing,
    TimeKnown,
    Serving,
    Error,
}

/// Run state plus the facts later stages depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppState {
    pub run_state: AppRunState,
    pub wifi_connected: bool,
    pub time_known: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub const fn new() -> Self {
        Self {
            run_state: AppRunState::Uninitialized,
            wifi_connected: false,
            time_known: false,
        }
    }

    /// Move to `next`, logging the transition.
    pub fn transition(&mut self, next: AppRunState) {
        if next == self.run_state {
            return;
        }
        match next {
            AppRunState::Error => warn!("State {:?} -> {:?}", self.run_state, next),
            _ => info!("State {:?} -> {:?}", self.run_state, next),
        }

        match next {
            AppRunState::WifiConnected => self.wifi_connected = true,
            AppRunState::TimeKnown => self.time_known = true,
            _ => {}
        }
        self.run_state = next;
    }

    /// Record a start-up failure and enter [`AppRunState::Error`].
    pub fn fail(&mut self, error: &AppError) {
        warn!("Start-up failed: {}", error);
        self.transition(AppRunState::Error);
    }
}

const DETAIL_LEN: usize = 64;

pub type ErrorDetail = heapless::String<DETAIL_LEN>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("WiFi connection failed: {0}")]
    Wifi(ErrorDetail),
    #[error("Time sync failed: {0}")]
    TimeSync(ErrorDetail),
    #[error("Sensor error: {0}")]
    Sensor(ErrorDetail),
    #[error("Clock error: {0}")]
    Clock(ErrorDetail),
    #[error("Network error: {0}")]
    Network(ErrorDetail),
    /// A peripheral could not be configured
    #[error("Hardware setup failed: {0}")]
    Hardware(ErrorDetail),
    #[error("Task spawn failed: {0}")]
    Spawn(ErrorDetail),
}

/// Copy `text` into an [`ErrorDetail`], cutting it at the last character
/// boundary that fits.
pub fn detail(text: &str) -> ErrorDetail {
    let mut end = text.len().min(DETAIL_LEN);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = ErrorDetail::new();
    // Cannot fail: the slice fits by construction
    let _ = out.push_str(&text[..end]);
    out
}

/// `Debug` rendering of a driver error as an [`ErrorDetail`], truncated if long.
pub fn debug_detail(error: impl Debug) -> ErrorDetail {
    let mut out = ErrorDetail::new();
    let _ = write!(out, "{:?}", error);
    out
}
