//! Analog axis conditioning (sensitivity, deadzone)

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Largest deadzone accepted
pub const MAX_DEADZONE: f64 = 0.5;
/// Largest sensitivity multiplier accepted
pub const MAX_SENSITIVITY: f64 = 2.0;

/// Per-device analog settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalogSettings {
    /// Readings (after scaling) with magnitude below this become 0.0
    pub deadzone: f64,
    /// Multiplier applied to every raw reading
    pub sensitivity: f64,
}

impl Default for AnalogSettings {
    fn default() -> Self {
        Self {
            deadzone: 0.1,
            sensitivity: 1.0,
        }
    }
}

impl AnalogSettings {
    /// Settings with both values clamped into range
    pub fn new(deadzone: f64, sensitivity: f64) -> Self {
        Self::default().with_deadzone(deadzone).with_sensitivity(sensitivity)
    }

    /// Deadzone clamped to `[0, 0.5]`; NaN keeps the current value
    pub fn with_deadzone(mut self, deadzone: f64) -> Self {
        if !deadzone.is_nan() {
            self.deadzone = deadzone.clamp(0.0, MAX_DEADZONE);
        }
        self
    }

    /// Sensitivity clamped to `[0, 2]`; NaN keeps the current value
    pub fn with_sensitivity(mut self, sensitivity: f64) -> Self {
        if !sensitivity.is_nan() {
            self.sensitivity = sensitivity.clamp(0.0, MAX_SENSITIVITY);
        }
        self
    }

    /// Re-clamp values that came in through deserialization
    pub fn clamped(self) -> Self {
        Self::new(self.deadzone, self.sensitivity)
    }
}

/// Process a raw axis reading through sensitivity and deadzone
///
/// # Arguments
/// * `raw_value` - Raw axis value from the device (nominally -1.0 to 1.0)
/// * `settings` - Analog settings (deadzone, sensitivity)
///
/// # Returns
/// Scaled value, 0.0 inside the deadzone or when the reading is not finite
pub fn process_axis(raw_value: f64, settings: &AnalogSettings) -> f64 {
    if !raw_value.is_finite() {
        return 0.0;
    }

    let scaled = raw_value * settings.sensitivity;
    if scaled.abs() < settings.deadzone {
        0.0
    } else {
        scaled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadzone_filters_small_values() {
        let settings = AnalogSettings::new(0.1, 1.0);

        assert_eq!(process_axis(0.05, &settings), 0.0);
        assert_eq!(process_axis(-0.09, &settings), 0.0);
        assert_eq!(process_axis(0.5, &settings), 0.5);
        assert_eq!(process_axis(-0.5, &settings), -0.5);
    }

    #[test]
    fn test_sensitivity_applies_before_deadzone() {
        let settings = AnalogSettings::new(0.1, 2.0);

        // 0.06 * 2 = 0.12 clears the deadzone
        assert!((process_axis(0.06, &settings) - 0.12).abs() < 1e-12);
        assert_eq!(process_axis(0.04, &settings), 0.0);
    }

    #[test]
    fn test_settings_are_clamped() {
        let settings = AnalogSettings::new(0.9, 7.0);
        assert_eq!(settings.deadzone, MAX_DEADZONE);
        assert_eq!(settings.sensitivity, MAX_SENSITIVITY);

        let settings = AnalogSettings::new(-1.0, f64::NAN);
        assert_eq!(settings.deadzone, 0.0);
        assert_eq!(settings.sensitivity, 1.0);
    }

    #[test]
    fn test_non_finite_readings_are_zero() {
        let settings = AnalogSettings::default();
        assert_eq!(process_axis(f64::NAN, &settings), 0.0);
        assert_eq!(process_axis(f64::NEG_INFINITY, &settings), 0.0);
    }
}
