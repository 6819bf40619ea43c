//! Persistence envelope for host save/restore.
//!
//! The host hands back whatever it stored, which may predate the current
//! field set. Decoding is therefore lenient: unknown or invalid `speed` and
//! `device` values collapse to "absent", and absent or falsy fields keep the
//! controller's current value on restore. Running/paused are never persisted.

use serde::{Deserialize, Deserializer, Serialize};

use super::state::{Device, Speed};
use crate::Result;

fn lenient_speed<'de, D>(deserializer: D) -> std::result::Result<Option<Speed>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| v.as_f64())
        .and_then(|factor| Speed::try_from(factor).ok()))
}

fn lenient_device<'de, D>(deserializer: D) -> std::result::Result<Option<Device>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// The serializable subset of the session configuration, using the host
/// envelope's key names (`draw` = sample size, `repeat` = number of runs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedSnapshot {
    /// Experiment counter at capture time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiment_number: Option<u32>,
    /// The active variable pool at capture time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<String>>,
    /// Draws per run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw: Option<u32>,
    /// Runs per experiment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat: Option<u32>,
    /// Animation pacing, persisted numerically.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_speed")]
    pub speed: Option<Speed>,
    /// Active device.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_device")]
    pub device: Option<Device>,
}

impl PersistedSnapshot {
    /// Collapse falsy fields (zero counters, empty pools) to absent, matching
    /// the host's `field || current` merge behavior.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            experiment_number: self.experiment_number.filter(|&n| n > 0),
            variables: self.variables.filter(|v| !v.is_empty()),
            draw: self.draw.filter(|&n| n > 0),
            repeat: self.repeat.filter(|&n| n > 0),
            speed: self.speed,
            device: self.device,
        }
    }
}

/// Host persistence envelope: `{success, values}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    /// Whether the capture succeeded. Always true for engine-made captures.
    pub success: bool,
    /// The captured configuration.
    pub values: PersistedSnapshot,
}

impl SnapshotEnvelope {
    /// Wrap a snapshot in a successful envelope.
    #[must_use]
    pub const fn ok(values: PersistedSnapshot) -> Self {
        Self {
            success: true,
            values,
        }
    }

    /// Encode for the host save lifecycle.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Snapshot`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a host-restored envelope.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Snapshot`] if the envelope is not valid JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
