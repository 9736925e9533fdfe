//! Desktop simulator for the clima logger.
//!
//! Serves the device's HTTP API and web UI from a host TCP port, backed by a
//! synthetic sensor and the host clock, so the API can be exercised without
//! hardware.
//!
//! ```text
//! clima-simulator [config.json]
//! ```
//!
//! The optional JSON file has the same shape as `clima_core::config::Config`;
//! missing sections keep their defaults. Without a file the simulator listens
//! on port 8080 and samples every ten seconds.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clima_core::assets::WEB_UI;
use clima_core::clock::{ClockError, ClockSource};
use clima_core::config::Config;
use clima_core::history::{History, SensorHistory};
use clima_core::http::{self, Request};
use clima_core::sample::{Quantity, Timestamp};
use clima_core::sampler::{SampleTrigger, Sampler};
use clima_core::sensors::{ClimateSensor, SensorError, check_reading};
use embassy_futures::block_on;
use log::{error, info, warn};

// ---------------------------------------------------------------------------
// Simulator constants
// ---------------------------------------------------------------------------

const DEFAULT_PORT: u16 = 8080;

const DEFAULT_PERIOD_SECS: u64 = 10;

/// Sleep between polls of the listener and the trigger
const POLL_INTERVAL: Duration = Duration::from_millis(20);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_REQUEST_SIZE: usize = 1024;

/// Every n-th reading fails, to exercise the dropped-sample path
const NAN_EVERY: u64 = 7;

static SAMPLE_TRIGGER: SampleTrigger = SampleTrigger::new();

// ---------------------------------------------------------------------------
// Mock sources
// ---------------------------------------------------------------------------

/// Synthetic sensor with slowly varying readings.
struct MockSensor {
    /// Seconds of simulated time, advanced one period per reading
    elapsed_secs: f64,
    period_secs: f64,
    reads: u64,
    humidity: f32,
}

impl MockSensor {
    fn new(period_secs: u64) -> Self {
        Self {
            elapsed_secs: 0.0,
            period_secs: period_secs as f64,
            reads: 0,
            humidity: f32::NAN,
        }
    }
}

impl ClimateSensor for MockSensor {
    async fn read_temperature(&mut self) -> Result<f32, SensorError> {
        self.elapsed_secs += self.period_secs;
        self.reads += 1;
        let t = self.elapsed_secs;

        // Temperature: 20–26 °C sinusoidal with slow drift
        let temperature = 23.0 + 3.0 * (t / 1200.0).sin() + 0.5 * (t / 370.0).cos();

        // Humidity: 40–60 % with a different period
        self.humidity = (50.0 + 10.0 * (t / 1800.0).sin() + 2.0 * (t / 230.0).cos()) as f32;

        let temperature = if self.reads % NAN_EVERY == 0 {
            f32::NAN
        } else {
            temperature as f32
        };
        check_reading("mock", Quantity::Temperature, temperature)
    }

    async fn read_humidity(&mut self) -> Result<f32, SensorError> {
        check_reading("mock", Quantity::Humidity, self.humidity)
    }
}

/// Host wall clock shifted to the configured time zone.
struct SystemClock {
    utc_offset_secs: i32,
}

impl ClockSource for SystemClock {
    async fn now(&mut self) -> Result<Timestamp, ClockError> {
        let unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| ClockError::Unsynchronized)?;
        let secs = i64::try_from(unix.as_secs()).map_err(|_| ClockError::InvalidDateTime)?;
        Timestamp::from_unix(secs, self.utc_offset_secs).ok_or(ClockError::InvalidDateTime)
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

fn serve<const N: usize>(mut stream: TcpStream, history: &History<N>) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(REQUEST_TIMEOUT))?;

    let mut buf = [0u8; MAX_REQUEST_SIZE];
    let mut total = 0;
    while total < buf.len() {
        let n = stream.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
        if buf[..total].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    if total == 0 {
        return Ok(());
    }

    let response = match Request::parse(&buf[..total]) {
        Ok(request) => http::handle(&request, history, &WEB_UI),
        Err(e) => http::bad_request(e),
    };

    stream.write_all(response.head().as_bytes())?;
    stream.write_all(response.body())?;
    stream.flush()
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn load_config(text: Option<&str>) -> Result<Config<'_>, serde_json::Error> {
    match text {
        Some(text) => serde_json::from_str(text),
        None => {
            let mut config = Config::default();
            config.http.port = DEFAULT_PORT;
            config.sampling.period_secs = DEFAULT_PERIOD_SECS;
            Ok(config)
        }
    }
}

fn main() {
    env_logger::init();
    info!("Starting clima simulator");

    let config_text = match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(text) => {
                info!("Loading config from {}", path);
                Some(text)
            }
            Err(e) => {
                error!("Cannot read {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => None,
    };
    let config = match load_config(config_text.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid config: {}", e);
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(("0.0.0.0", config.http.port)) {
        Ok(listener) => listener,
        Err(e) => {
            error!("Cannot listen on port {}: {}", config.http.port, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = listener.set_nonblocking(true) {
        error!("Cannot make listener non-blocking: {}", e);
        std::process::exit(1);
    }
    info!(
        "Serving on http://localhost:{} (sample every {} s, UTC{:+}h)",
        config.http.port,
        config.sampling.period_secs,
        config.clock.utc_offset_secs / 3600
    );

    // The timer only flags a due sample; the loop below does the work
    let period = Duration::from_secs(config.sampling.period_secs.max(1));
    std::thread::spawn(move || {
        loop {
            std::thread::sleep(period);
            SAMPLE_TRIGGER.fire();
        }
    });

    let mut history = SensorHistory::new();
    let mut sampler = Sampler::new(
        MockSensor::new(config.sampling.period_secs),
        SystemClock {
            utc_offset_secs: config.clock.utc_offset_secs,
        },
    );

    SAMPLE_TRIGGER.fire();

    loop {
        // Failures are logged by the sampler
        let _ = block_on(sampler.poll(&SAMPLE_TRIGGER, &mut history));

        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = serve(stream, &history) {
                    warn!("Connection from {} failed: {}", peer, e);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => std::thread::sleep(POLL_INTERVAL),
            Err(e) => warn!("Accept failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_sensor_drops_every_seventh_reading() {
        let mut sensor = MockSensor::new(600);
        let mut failures = 0;
        for _ in 0..14 {
            if block_on(sensor.read_temperature()).is_err() {
                failures += 1;
            }
            assert!(block_on(sensor.read_humidity()).is_ok());
        }
        assert_eq!(failures, 2);
    }

    #[test]
    fn test_mock_readings_stay_in_range() {
        let mut sensor = MockSensor::new(600);
        for _ in 0..100 {
            if let Ok(t) = block_on(sensor.read_temperature()) {
                assert!((19.0..=27.0).contains(&t));
            }
            let h = block_on(sensor.read_humidity()).unwrap();
            assert!((37.0..=63.0).contains(&h));
        }
    }

    #[test]
    fn test_config_without_file_uses_simulator_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.http.port, DEFAULT_PORT);
        assert_eq!(config.sampling.period_secs, DEFAULT_PERIOD_SECS);
    }

    #[test]
    fn test_config_from_json() {
        let config = load_config(Some(r#"{"clock":{"ntp_server":"x","utc_offset_secs":0}}"#)).unwrap();
        assert_eq!(config.clock.utc_offset_secs, 0);
        assert_eq!(config.http.port, 80);
    }

    #[test]
    fn test_system_clock_is_synchronized() {
        let mut clock = SystemClock { utc_offset_secs: 0 };
        assert!(block_on(clock.now()).unwrap().year() >= 2024);
    }
}
