//! Periodic sampling into the history
//!
//! Sampling is split between two contexts:
//!
//! - a periodic timer, which only calls [`SampleTrigger::fire`], and
//! - the main loop, which owns the history and the [`Sampler`] and performs
//!   at most one sample-and-append cycle each time it finds the trigger set.
//!
//! The trigger is a single slot: fires that arrive while a sample is already
//! due collapse into one, so a late drain never produces a burst of samples.
//!
//! ```text
//!            fire()               take() / wait()
//!   Idle ───────────► SampleDue ─────────────────► Idle + one cycle
//!                      │    ▲
//!                      └────┘ fire() (coalesced)
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{debug, warn};
use thiserror_no_std::Error;

use crate::clock::{ClockError, ClockSource};
use crate::history::History;
use crate::sample::Sample;
use crate::sensors::{ClimateSensor, SensorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Idle,
    SampleDue,
}

/// Single-slot pending-sample flag shared between the timer and the main loop.
pub struct SampleTrigger {
    pending: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for SampleTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleTrigger {
    pub const fn new() -> Self {
        Self {
            pending: Signal::new(),
        }
    }

    /// Mark a sample as due. Safe to call from any context.
    pub fn fire(&self) {
        self.pending.signal(());
    }

    /// Consume the pending flag, returning whether a sample was due.
    pub fn take(&self) -> bool {
        self.pending.try_take().is_some()
    }

    /// Wait until a sample is due and consume the flag.
    pub async fn wait(&self) {
        self.pending.wait().await
    }

    pub fn state(&self) -> SamplerState {
        if self.pending.signaled() {
            SamplerState::SampleDue
        } else {
            SamplerState::Idle
        }
    }
}

/// Why a sample cycle produced nothing
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleError {
    #[error("sensor read invalid: {0}")]
    SensorReadInvalid(SensorError),
    #[error("clock unavailable: {0}")]
    ClockUnsynchronized(ClockError),
}

impl From<SensorError> for SampleError {
    fn from(value: SensorError) -> Self {
        Self::SensorReadInvalid(value)
    }
}

impl From<ClockError> for SampleError {
    fn from(value: ClockError) -> Self {
        Self::ClockUnsynchronized(value)
    }
}

/// Produces samples from a sensor and a clock and appends them to a history.
pub struct Sampler<S, C> {
    sensor: S,
    clock: C,
}

impl<S, C> Sampler<S, C>
where
    S: ClimateSensor,
    C: ClockSource,
{
    pub const fn new(sensor: S, clock: C) -> Self {
        Self { sensor, clock }
    }

    /// Take one complete reading.
    ///
    /// Temperature, humidity and time are read in that order and the first
    /// failure aborts the reading; partial readings are never returned.
    pub async fn sample(&mut self) -> Result<Sample, SampleError> {
        let temperature = self.sensor.read_temperature().await?;
        let humidity = self.sensor.read_humidity().await?;
        let timestamp = self.clock.now().await?;
        Ok(Sample::new(timestamp, temperature, humidity))
    }

    /// Take one reading and append it. On failure the history is unchanged and
    /// the period is skipped; the next period tries again from scratch.
    pub async fn run_cycle<const N: usize>(
        &mut self,
        history: &mut History<N>,
    ) -> Result<(), SampleError> {
        match self.sample().await {
            Ok(sample) => {
                history.append(sample);
                debug!(
                    "Sample {} {:.1}°C {:.1}% appended ({}/{})",
                    sample.timestamp(),
                    sample.temperature(),
                    sample.humidity(),
                    history.len(),
                    N
                );
                Ok(())
            }
            Err(e) => {
                warn!("Sample dropped: {}", e);
                Err(e)
            }
        }
    }

    /// One main-loop step: run a cycle if the trigger says a sample is due.
    pub async fn poll<const N: usize>(
        &mut self,
        trigger: &SampleTrigger,
        history: &mut History<N>,
    ) -> Option<Result<(), SampleError>> {
        if !trigger.take() {
            return None;
        }
        Some(self.run_cycle(history).await)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{Quantity, Timestamp};
    use alloc::collections::VecDeque;
    use embassy_futures::block_on;

    /// Replays scripted readings; an exhausted script reads as NaN.
    struct ScriptedSensor {
        temperatures: VecDeque<f32>,
        humidities: VecDeque<f32>,
    }

    impl ScriptedSensor {
        fn new(temperatures: &[f32], humidities: &[f32]) -> Self {
            Self {
                temperatures: temperatures.iter().copied().collect(),
                humidities: humidities.iter().copied().collect(),
            }
        }
    }

    impl ClimateSensor for ScriptedSensor {
        async fn read_temperature(&mut self) -> Result<f32, SensorError> {
            let value = self.temperatures.pop_front().unwrap_or(f32::NAN);
            crate::sensors::check_reading("scripted", Quantity::Temperature, value)
        }

        async fn read_humidity(&mut self) -> Result<f32, SensorError> {
            let value = self.humidities.pop_front().unwrap_or(f32::NAN);
            crate::sensors::check_reading("scripted", Quantity::Humidity, value)
        }
    }

    /// Ten-minute steps from midnight, unsynchronized for the first reads.
    struct SteppingClock {
        minutes: u32,
        unsynced_reads: u32,
    }

    impl ClockSource for SteppingClock {
        async fn now(&mut self) -> Result<Timestamp, ClockError> {
            if self.unsynced_reads > 0 {
                self.unsynced_reads -= 1;
                return Err(ClockError::Unsynchronized);
            }
            let ts = Timestamp::from_ymd_hms(2024, 1, 1, self.minutes / 60, self.minutes % 60, 0)
                .ok_or(ClockError::InvalidDateTime)?;
            self.minutes += 10;
            Ok(ts)
        }
    }

    fn clock() -> SteppingClock {
        SteppingClock {
            minutes: 0,
            unsynced_reads: 0,
        }
    }

    #[test]
    fn test_trigger_coalesces_repeated_fires() {
        let trigger = SampleTrigger::new();
        assert_eq!(trigger.state(), SamplerState::Idle);

        trigger.fire();
        trigger.fire();
        trigger.fire();
        assert_eq!(trigger.state(), SamplerState::SampleDue);

        assert!(trigger.take());
        assert_eq!(trigger.state(), SamplerState::Idle);
        assert!(!trigger.take());
    }

    #[test]
    fn test_poll_runs_one_cycle_per_fire() {
        let trigger = SampleTrigger::new();
        let mut history: History<8> = History::new();
        let mut sampler = Sampler::new(
            ScriptedSensor::new(&[20.0, 21.0, 22.0], &[40.0, 41.0, 42.0]),
            clock(),
        );

        assert_eq!(block_on(sampler.poll(&trigger, &mut history)), None);

        trigger.fire();
        trigger.fire();
        assert_eq!(block_on(sampler.poll(&trigger, &mut history)), Some(Ok(())));
        assert_eq!(block_on(sampler.poll(&trigger, &mut history)), None);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_nan_temperature_drops_period() {
        let mut history: History<8> = History::new();
        let mut sampler = Sampler::new(
            ScriptedSensor::new(&[f32::NAN, 21.0], &[45.0]),
            clock(),
        );

        let result = block_on(sampler.run_cycle(&mut history));
        assert!(matches!(
            result,
            Err(SampleError::SensorReadInvalid(SensorError::NotANumber {
                quantity: Quantity::Temperature,
                ..
            }))
        ));
        assert!(history.is_empty());

        // Next period recovers on its own
        assert_eq!(block_on(sampler.run_cycle(&mut history)), Ok(()));
        let latest = history.latest().unwrap();
        assert_eq!(latest.temperature(), 21.0);
        assert_eq!(latest.humidity(), 45.0);
    }

    #[test]
    fn test_nan_humidity_keeps_nothing() {
        let mut history: History<8> = History::new();
        let mut sampler = Sampler::new(ScriptedSensor::new(&[20.0], &[f32::NAN]), clock());

        let result = block_on(sampler.run_cycle(&mut history));
        assert!(matches!(
            result,
            Err(SampleError::SensorReadInvalid(SensorError::NotANumber {
                quantity: Quantity::Humidity,
                ..
            }))
        ));
        assert!(history.is_empty());
    }

    #[test]
    fn test_unsynchronized_clock_drops_sample() {
        let mut history: History<8> = History::new();
        let mut sampler = Sampler::new(
            ScriptedSensor::new(&[20.0, 20.5], &[40.0, 40.5]),
            SteppingClock {
                minutes: 0,
                unsynced_reads: 1,
            },
        );

        assert_eq!(
            block_on(sampler.run_cycle(&mut history)),
            Err(SampleError::ClockUnsynchronized(ClockError::Unsynchronized))
        );
        assert!(history.is_empty());

        assert_eq!(block_on(sampler.run_cycle(&mut history)), Ok(()));
        assert_eq!(
            history.latest().unwrap().timestamp().to_text().as_str(),
            "2024-01-01 00:00:00"
        );
    }

    #[test]
    fn test_failed_cycle_on_full_history_evicts_nothing() {
        let mut history: History<2> = History::new();
        let mut sampler = Sampler::new(
            ScriptedSensor::new(&[1.0, 2.0, f32::NAN], &[10.0, 20.0]),
            clock(),
        );

        for _ in 0..2 {
            assert_eq!(block_on(sampler.run_cycle(&mut history)), Ok(()));
        }
        assert!(block_on(sampler.run_cycle(&mut history)).is_err());

        assert_eq!(history.len(), 2);
        assert_eq!(history.all().first().map(|s| s.temperature()), Some(1.0));
    }
}
