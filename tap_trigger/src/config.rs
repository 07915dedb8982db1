//! Trigger constants.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

pub const DEFAULT_ALPHA:     f32      = 0.6;
pub const DEFAULT_THRESHOLD: f32      = 0.03;
pub const DEFAULT_COOLDOWN:  Duration = Duration::from_millis(180);

/// Smoothing, edge and refractory parameters shared by every slot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// EMA weight of the newest sample, in (0, 1].  1.0 disables smoothing.
    pub alpha:     f32,
    /// Minimum downward step of the smoothed y (fraction of frame height).
    pub threshold: f32,
    /// Minimum time between two triggers of the same slot.
    #[serde(rename = "cooldown_secs", with = "secs")]
    pub cooldown:  Duration,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        TriggerConfig {
            alpha:     DEFAULT_ALPHA,
            threshold: DEFAULT_THRESHOLD,
            cooldown:  DEFAULT_COOLDOWN,
        }
    }
}

impl TriggerConfig {
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Reject constants the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(ConfigError::AlphaOutOfRange(self.alpha));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

/// `Duration` ⇄ fractional seconds.
mod secs {
    use std::time::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let v = f64::deserialize(d)?;
        Duration::try_from_secs_f64(v).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = TriggerConfig::default();
        assert_eq!(c.alpha, 0.6);
        assert_eq!(c.threshold, 0.03);
        assert_eq!(c.cooldown, Duration::from_millis(180));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn alpha_bounds() {
        assert!(TriggerConfig::default().alpha(1.0).validate().is_ok());
        assert_eq!(
            TriggerConfig::default().alpha(0.0).validate(),
            Err(ConfigError::AlphaOutOfRange(0.0)),
        );
        assert!(TriggerConfig::default().alpha(1.5).validate().is_err());
        assert!(TriggerConfig::default().alpha(f32::NAN).validate().is_err());
    }

    #[test]
    fn negative_threshold_rejected() {
        assert!(TriggerConfig::default().threshold(-0.01).validate().is_err());
        assert!(TriggerConfig::default().threshold(0.0).validate().is_ok());
    }
}
