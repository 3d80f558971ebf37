//! Session configuration.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Errors from loading a [`SessionConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("invalid session config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A field holds a value the session cannot run with.
    #[error("invalid session config: {0}")]
    Invalid(String),
}

/// Timing and buffering parameters for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Fixed wait spent in each processing stage before the next begins.
    #[serde(with = "duration_serde")]
    pub stage_delay: Duration,

    /// Longest the final stage waits for the composition backend.
    #[serde(with = "duration_serde")]
    pub composition_timeout: Duration,

    /// Number of events buffered per subscriber before the oldest are
    /// dropped for slow readers.
    pub event_capacity: usize,
}

impl SessionConfig {
    /// Default per-stage wait.
    pub const DEFAULT_STAGE_DELAY: Duration = Duration::from_millis(1500);

    /// Default composition timeout.
    pub const DEFAULT_COMPOSITION_TIMEOUT: Duration = Duration::from_secs(30);

    /// Default event buffer size.
    pub const DEFAULT_EVENT_CAPACITY: usize = 64;

    /// Parse and validate a JSON config document.
    ///
    /// Missing fields take their defaults; unknown fields are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed JSON or unknown
    /// fields, and [`ConfigError::Invalid`] if validation fails.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the session relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `event_capacity` is zero or
    /// `composition_timeout` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_capacity must be at least 1".into(),
            ));
        }
        if self.composition_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "composition_timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stage_delay: Self::DEFAULT_STAGE_DELAY,
            composition_timeout: Self::DEFAULT_COMPOSITION_TIMEOUT,
            event_capacity: Self::DEFAULT_EVENT_CAPACITY,
        }
    }
}
