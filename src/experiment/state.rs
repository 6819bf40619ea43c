//! Session state for the experiment controller.
//!
//! `ExperimentState` is created once at startup, mutated only through
//! controller transitions, and reset to the Idle baseline rather than
//! destroyed.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sampling modality. Selects which variable pool feeds the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Balls tumbling in a mixer; draws from the user-defined pool.
    Mixer,
    /// Spinner wheel; draws from the user-defined pool, grouped by label.
    Spinner,
    /// Draws from case data pulled out of a host collection.
    Collector,
}

impl Device {
    /// Whether this device sources variables from host case data.
    #[must_use]
    pub const fn is_collector(self) -> bool {
        matches!(self, Self::Collector)
    }

    /// Mixer and collector share the tumbling-mixer animation.
    #[must_use]
    pub const fn uses_mixer_animation(self) -> bool {
        matches!(self, Self::Mixer | Self::Collector)
    }
}

/// Animation pacing.
///
/// Persisted numerically the way the host envelope stores it: the pacing
/// factor for the timed speeds, `3` for instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub enum Speed {
    /// Half pace, one draw every two seconds.
    Slow,
    /// Normal pace, one draw per second.
    Medium,
    /// Double pace, one draw every half second.
    Fast,
    /// No animation; the whole sequence is flushed synchronously.
    Instant,
}

impl Speed {
    /// Tick period for the timed speeds (`1000 ms / factor`); `None` for
    /// instant, which never schedules.
    #[must_use]
    pub const fn period(self) -> Option<Duration> {
        match self {
            Self::Slow => Some(Duration::from_millis(2000)),
            Self::Medium => Some(Duration::from_millis(1000)),
            Self::Fast => Some(Duration::from_millis(500)),
            Self::Instant => None,
        }
    }

    /// Whether this speed bypasses the scheduler entirely.
    #[must_use]
    pub const fn is_instant(self) -> bool {
        matches!(self, Self::Instant)
    }
}

impl From<Speed> for f64 {
    fn from(speed: Speed) -> Self {
        match speed {
            Speed::Slow => 0.5,
            Speed::Medium => 1.0,
            Speed::Fast => 2.0,
            Speed::Instant => 3.0,
        }
    }
}

impl TryFrom<f64> for Speed {
    type Error = String;

    fn try_from(value: f64) -> std::result::Result<Self, Self::Error> {
        // Exact factors only; the host never persists anything in between.
        if value == 0.5 {
            Ok(Self::Slow)
        } else if value == 1.0 {
            Ok(Self::Medium)
        } else if value == 2.0 {
            Ok(Self::Fast)
        } else if value == 3.0 {
            Ok(Self::Instant)
        } else {
            Err(format!("unsupported speed factor: {value}"))
        }
    }
}

/// Mutable session state owned by the experiment controller.
///
/// Invariants upheld by the controller:
/// - `sent_run <= num_runs`
/// - `paused` implies `running`
/// - `sample_size >= 1` and `num_runs >= 1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentState {
    /// Monotonically increasing count of successfully started experiments.
    pub experiment_number: u32,
    /// Index of the run currently being animated (1-based once underway).
    pub run_number: u32,
    /// Number of runs flushed to the sink for the live experiment.
    pub sent_run: u32,
    /// Active sampling device.
    pub device: Device,
    /// Animation pacing.
    pub speed: Speed,
    /// Draws per run. Always at least 1.
    pub sample_size: u32,
    /// Runs per experiment. Always at least 1.
    pub num_runs: u32,
    /// Whether an experiment is live.
    pub running: bool,
    /// Whether the live experiment is paused.
    pub paused: bool,
}

impl Default for ExperimentState {
    fn default() -> Self {
        Self {
            experiment_number: 0,
            run_number: 0,
            sent_run: 0,
            device: Device::Mixer,
            speed: Speed::Medium,
            sample_size: 5,
            num_runs: 3,
            running: false,
            paused: false,
        }
    }
}

impl ExperimentState {
    /// Create state at the Idle baseline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new experiment if Idle.
    ///
    /// Increments `experiment_number`, zeroes the run counters and marks the
    /// state running. Returns the new experiment number, or `None` if an
    /// experiment is already live (guarded no-op).
    pub fn begin(&mut self) -> Option<u32> {
        if self.running {
            return None;
        }
        self.experiment_number += 1;
        self.run_number = 0;
        self.sent_run = 0;
        self.running = true;
        self.paused = false;
        Some(self.experiment_number)
    }

    /// Return to the Idle baseline without touching configuration.
    pub fn go_idle(&mut self) {
        self.running = false;
        self.paused = false;
        self.run_number = 0;
        self.sent_run = 0;
    }

    /// Whether no experiment is live.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        !self.running
    }
}
