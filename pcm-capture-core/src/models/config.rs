use serde::{Deserialize, Serialize};

/// Persisted level-meter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterSettings {
    /// Gain applied before measuring, in dB (default: 0).
    pub gain_db: f32,

    /// Per-poll multiplier applied to the held peak, in `[0, 1)` (default: 0.9).
    pub peak_decay: f32,
}

impl MeterSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !self.gain_db.is_finite() {
            return Err("meter gain must be finite".into());
        }
        if !(0.0..1.0).contains(&self.peak_decay) {
            return Err(format!("peak decay out of range: {}", self.peak_decay));
        }
        Ok(())
    }

    /// Linear multiplier equivalent of `gain_db`.
    pub fn linear_gain(&self) -> f32 {
        10f32.powf(self.gain_db / 20.0)
    }
}

impl Default for MeterSettings {
    fn default() -> Self {
        Self {
            gain_db: 0.0,
            peak_decay: 0.9,
        }
    }
}

/// Persisted audio engine state: the enable toggle and nested meter settings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub enabled: bool,
    pub meter: MeterSettings,
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), String> {
        self.meter.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_are_disabled_unity_gain() {
        let settings = EngineSettings::default();
        assert!(!settings.enabled);
        assert_relative_eq!(settings.meter.linear_gain(), 1.0);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn six_db_roughly_doubles() {
        let meter = MeterSettings {
            gain_db: 6.0,
            ..MeterSettings::default()
        };
        assert_relative_eq!(meter.linear_gain(), 1.995, epsilon = 1e-3);
    }

    #[test]
    fn rejects_bad_decay() {
        let meter = MeterSettings {
            peak_decay: 1.0,
            ..MeterSettings::default()
        };
        assert!(meter.validate().is_err());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: EngineSettings = serde_json::from_str(r#"{"enabled": true}"#).unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.meter, MeterSettings::default());
    }
}
