use embassy_time::Duration;
use serde::{Deserialize, Serialize};

/// Number of samples kept in memory (one day at a ten-minute cadence)
pub const HISTORY_CAPACITY: usize = 144;

/// Seconds between two samples
pub const SAMPLE_PERIOD_SECS: u64 = 600;

/// Offset of the logger's local time zone from UTC (UTC+9)
pub const UTC_OFFSET_SECS: i32 = 9 * 3600;

pub const NTP_SERVER: &str = "pool.ntp.org";

pub const HTTP_PORT: u16 = 80;

#[derive(Serialize, Deserialize, Debug)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    #[serde(default)]
    pub internet: InternetConfig<'a>,
    #[serde(default)]
    pub clock: ClockConfig<'a>,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for Config<'_> {
    fn default() -> Self {
        Self {
            internet: InternetConfig::default(),
            clock: ClockConfig::default(),
            sampling: SamplingConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ClockConfig<'a> {
    pub ntp_server: &'a str,
    pub utc_offset_secs: i32,
}

impl Default for ClockConfig<'_> {
    fn default() -> Self {
        Self {
            ntp_server: NTP_SERVER,
            utc_offset_secs: UTC_OFFSET_SECS,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct SamplingConfig {
    pub period_secs: u64,
}

impl SamplingConfig {
    pub const fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            period_secs: SAMPLE_PERIOD_SECS,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct HttpConfig {
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { port: HTTP_PORT }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_build_constants() {
        let config = Config::default();
        assert_eq!(config.sampling.period_secs, 600);
        assert_eq!(config.clock.utc_offset_secs, 9 * 3600);
        assert_eq!(config.clock.ntp_server, "pool.ntp.org");
        assert_eq!(config.http.port, 80);
    }

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let json = r#"{"internet":{"ssid":"lab","password":"hunter2"},"http":{"port":8080}}"#;
        let config: Config<'_> = serde_json::from_str(json).unwrap();
        assert_eq!(config.internet.ssid, "lab");
        assert_eq!(config.internet.password, "hunter2");
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.sampling.period_secs, SAMPLE_PERIOD_SECS);
        assert_eq!(config.clock.ntp_server, NTP_SERVER);
    }
}
