//! JSON views of the history for the HTTP API
//!
//! Every reading is reported as `{"time":"YYYY-MM-DD HH:MM:SS","<quantity>":"21.0"}`.
//! Values carry exactly one fractional digit and are JSON strings, not numbers;
//! existing web clients depend on that shape.

use core::fmt::Write as _;

use alloc::string::String;
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror_no_std::Error;

use crate::history::{History, Snapshot};
use crate::sample::{Quantity, Sample};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
    /// No sample has been recorded yet.
    #[error("history is empty")]
    HistoryEmpty,
    #[error("failed to serialize response")]
    Serialization,
}

/// Value text, e.g. `-3.5` or `101.0`
type ValueText = heapless::String<24>;

/// One fractional digit, ties rounded away from zero (`20.25` -> `20.3`).
///
/// `{:.1}` alone rounds exact ties to even, which would make the output
/// depend on the digit.
fn format_value(value: f32) -> ValueText {
    let mut text = ValueText::new();
    let _ = write!(text, "{:.1}", libm::roundf(value * 10.0) / 10.0);
    text
}

/// One sample seen through one quantity
struct Reading<'a> {
    sample: &'a Sample,
    quantity: Quantity,
}

impl Serialize for Reading<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("time", self.sample.timestamp().to_text().as_str())?;
        map.serialize_entry(
            self.quantity.key(),
            format_value(self.quantity.value_of(self.sample)).as_str(),
        )?;
        map.end()
    }
}

/// Every retained sample seen through one quantity, oldest first
struct Series<'a> {
    snapshot: Snapshot<'a>,
    quantity: Quantity,
}

impl Serialize for Series<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let quantity = self.quantity;
        serializer.collect_seq(
            self.snapshot
                .iter()
                .map(move |sample| Reading { sample, quantity }),
        )
    }
}

/// JSON object for the most recent sample.
pub fn latest<const N: usize>(
    history: &History<N>,
    quantity: Quantity,
) -> Result<String, QueryError> {
    let sample = history.latest().ok_or(QueryError::HistoryEmpty)?;
    serde_json::to_string(&Reading { sample, quantity }).map_err(|_| QueryError::Serialization)
}

/// JSON array of every retained sample in chronological order.
pub fn all<const N: usize>(history: &History<N>, quantity: Quantity) -> Result<String, QueryError> {
    let snapshot = history.all();
    if snapshot.is_empty() {
        return Err(QueryError::HistoryEmpty);
    }
    serde_json::to_string(&Series { snapshot, quantity }).map_err(|_| QueryError::Serialization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Timestamp;

    fn sample(hour: u32, minute: u32, temperature: f32, humidity: f32) -> Sample {
        let ts = Timestamp::from_ymd_hms(2024, 1, 1, hour, minute, 0).unwrap();
        Sample::new(ts, temperature, humidity)
    }

    #[test]
    fn test_value_has_one_fraction_digit() {
        assert_eq!(format_value(21.0).as_str(), "21.0");
        assert_eq!(format_value(20.54).as_str(), "20.5");
        assert_eq!(format_value(-3.24).as_str(), "-3.2");
        assert_eq!(format_value(99.96).as_str(), "100.0");
    }

    #[test]
    fn test_value_ties_round_away_from_zero() {
        assert_eq!(format_value(20.25).as_str(), "20.3");
        assert_eq!(format_value(40.75).as_str(), "40.8");
        assert_eq!(format_value(0.05).as_str(), "0.1");
        assert_eq!(format_value(-3.25).as_str(), "-3.3");
    }

    #[test]
    fn test_tied_sample_is_reported_rounded_up() {
        let mut history: History<4> = History::new();
        history.append(sample(0, 0, 20.25, 40.75));

        assert_eq!(
            latest(&history, Quantity::Temperature).unwrap(),
            r#"{"time":"2024-01-01 00:00:00","temperature":"20.3"}"#
        );
        assert_eq!(
            all(&history, Quantity::Humidity).unwrap(),
            r#"[{"time":"2024-01-01 00:00:00","humidity":"40.8"}]"#
        );
    }

    #[test]
    fn test_latest_on_empty_history() {
        let history: History<4> = History::new();
        assert_eq!(
            latest(&history, Quantity::Temperature),
            Err(QueryError::HistoryEmpty)
        );
        assert_eq!(
            all(&history, Quantity::Humidity),
            Err(QueryError::HistoryEmpty)
        );
    }

    #[test]
    fn test_latest_reports_newest_sample() {
        let mut history: History<4> = History::new();
        history.append(sample(0, 0, 20.5, 40.0));
        history.append(sample(0, 10, 21.0, 41.24));

        assert_eq!(
            latest(&history, Quantity::Temperature).unwrap(),
            r#"{"time":"2024-01-01 00:10:00","temperature":"21.0"}"#
        );
        assert_eq!(
            latest(&history, Quantity::Humidity).unwrap(),
            r#"{"time":"2024-01-01 00:10:00","humidity":"41.2"}"#
        );
    }

    #[test]
    fn test_all_temperatures_in_order() {
        let mut history: History<4> = History::new();
        history.append(sample(0, 0, 20.5, 40.0));
        history.append(sample(0, 10, 21.0, 42.0));

        assert_eq!(
            all(&history, Quantity::Temperature).unwrap(),
            r#"[{"time":"2024-01-01 00:00:00","temperature":"20.5"},{"time":"2024-01-01 00:10:00","temperature":"21.0"}]"#
        );
    }

    #[test]
    fn test_all_after_eviction_starts_at_oldest_survivor() {
        let mut history: History<2> = History::new();
        history.append(sample(1, 0, 10.0, 30.0));
        history.append(sample(2, 0, 11.0, 31.0));
        history.append(sample(3, 0, 12.0, 32.0));

        assert_eq!(
            all(&history, Quantity::Humidity).unwrap(),
            r#"[{"time":"2024-01-01 02:00:00","humidity":"31.0"},{"time":"2024-01-01 03:00:00","humidity":"32.0"}]"#
        );
    }
}
