// THEORY:
// A session is configured once, before the first frame is acquired, and never
// reloaded. The defaults are the values the live camera tester has always run
// with, so `SessionConfig::default()` is a ready-to-use desk-camera setup.
//
// Configuration can come from three places, applied in this order:
// 1.  `Default`,
// 2.  an optional JSON file (missing keys keep their defaults),
// 3.  front-end overrides (CLI flags or the interactive strategy menu).
//
// Whatever the origin, `validate` runs before a pipeline is built. An out-of-range
// value is rejected with `InvalidConfiguration`; it is never clamped or replaced.

use crate::error::{MotionError, MotionResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Largest window the per-pixel `u32` running moments can hold without overflow
/// (`255² · N` must fit in a `u32`), rounded down to a comfortable power of two.
pub const MAX_WINDOW_SIZE: usize = 4096;

/// Largest structuring-element side; the anchor offset has to fit in a byte.
pub const MAX_KERNEL_SIDE: u32 = 255;

/// Which deviation formula scores the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Two-pass floating point RMS deviation, row-major sequential pass.
    /// Best rendering, slowest.
    #[default]
    Reference,
    /// Integer running moments, row-parallel pass.
    Optimized,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Reference => "reference",
            Strategy::Optimized => "optimized",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = MotionError;

    /// Accepts the strategy names as well as the menu numbers `1` and `2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "reference" => Ok(Strategy::Reference),
            "2" | "optimized" | "optimised" => Ok(Strategy::Optimized),
            other => Err(MotionError::invalid_configuration(format!(
                "unknown strategy `{other}`, expected `reference` (1) or `optimized` (2)"
            ))),
        }
    }
}

/// Everything that stays fixed for the lifetime of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Number of frames in the rolling background window (N).
    pub window_size: usize,
    /// Minimum deviation for a pixel to count as moving (σ). Inclusive.
    pub sensitivity: f64,
    /// Outer contours with fewer boundary points than this are treated as noise.
    pub min_contour_points: usize,
    /// Width of the elliptical structuring element used by the opening.
    pub kernel_width: u32,
    /// Height of the elliptical structuring element used by the opening.
    pub kernel_height: u32,
    /// Erosions (then the same number of dilations) applied by the opening.
    pub opening_iterations: u32,
    pub strategy: Strategy,
    /// Worker threads for the parallel grid pass. `None` uses one per logical CPU.
    pub worker_threads: Option<usize>,
    /// Stop after this many analyzed frames. `None` runs until the source dries up.
    pub max_frames: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            sensitivity: 3.0,
            min_contour_points: 40,
            kernel_width: 10,
            kernel_height: 10,
            opening_iterations: 2,
            strategy: Strategy::Reference,
            worker_threads: None,
            max_frames: None,
        }
    }
}

impl SessionConfig {
    /// Reads a JSON configuration file and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> MotionResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&content)?;
        log::debug!("Loaded session configuration from {:?}", path);
        config.validate()?;
        Ok(config)
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Rejects any value the pipeline cannot honour.
    pub fn validate(&self) -> MotionResult<()> {
        if self.window_size == 0 || self.window_size > MAX_WINDOW_SIZE {
            return Err(MotionError::invalid_configuration(format!(
                "window_size must be between 1 and {MAX_WINDOW_SIZE}, got {}",
                self.window_size
            )));
        }
        if !self.sensitivity.is_finite() || self.sensitivity < 0.0 {
            return Err(MotionError::invalid_configuration(format!(
                "sensitivity must be a finite, non-negative number, got {}",
                self.sensitivity
            )));
        }
        for (name, side) in [
            ("kernel_width", self.kernel_width),
            ("kernel_height", self.kernel_height),
        ] {
            if side == 0 || side > MAX_KERNEL_SIDE {
                return Err(MotionError::invalid_configuration(format!(
                    "{name} must be between 1 and {MAX_KERNEL_SIDE}, got {side}"
                )));
            }
        }
        if self.worker_threads == Some(0) {
            return Err(MotionError::invalid_configuration(
                "worker_threads must be at least 1 when set",
            ));
        }
        if self.max_frames == Some(0) {
            return Err(MotionError::invalid_configuration(
                "max_frames must be at least 1 when set",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_suit_a_desk_camera() {
        let config = SessionConfig::default();
        assert_eq!(config.window_size, 10);
        assert_eq!(config.sensitivity, 3.0);
        assert_eq!(config.min_contour_points, 40);
        assert_eq!((config.kernel_width, config.kernel_height), (10, 10));
        assert_eq!(config.opening_iterations, 2);
        assert_eq!(config.strategy, Strategy::Reference);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn strategy_accepts_menu_numbers_and_names() {
        assert_eq!("1".parse::<Strategy>().unwrap(), Strategy::Reference);
        assert_eq!(" 2\n".parse::<Strategy>().unwrap(), Strategy::Optimized);
        assert_eq!("Optimized".parse::<Strategy>().unwrap(), Strategy::Optimized);
        assert_eq!("reference".parse::<Strategy>().unwrap(), Strategy::Reference);
    }

    #[test]
    fn unknown_strategy_is_rejected_not_defaulted() {
        let err = "3".parse::<Strategy>().unwrap_err();
        assert!(matches!(err, MotionError::InvalidConfiguration { .. }));
        assert!("".parse::<Strategy>().is_err());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let bad = [
            SessionConfig { window_size: 0, ..Default::default() },
            SessionConfig { window_size: MAX_WINDOW_SIZE + 1, ..Default::default() },
            SessionConfig { sensitivity: -1.0, ..Default::default() },
            SessionConfig { sensitivity: f64::NAN, ..Default::default() },
            SessionConfig { kernel_width: 0, ..Default::default() },
            SessionConfig { kernel_height: 256, ..Default::default() },
            SessionConfig { worker_threads: Some(0), ..Default::default() },
            SessionConfig { max_frames: Some(0), ..Default::default() },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(MotionError::InvalidConfiguration { .. })),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn json_keeps_defaults_for_missing_keys() {
        let config: SessionConfig =
            serde_json::from_str(r#"{ "window_size": 5, "strategy": "optimized" }"#).unwrap();
        assert_eq!(config.window_size, 5);
        assert_eq!(config.strategy, Strategy::Optimized);
        assert_eq!(config.sensitivity, 3.0);
        assert_eq!(config.min_contour_points, 40);
    }

    #[test]
    fn json_file_is_validated() {
        let path = std::env::temp_dir().join(format!("motion_sentry_config_{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "window_size": 0 }"#).unwrap();
        let result = SessionConfig::from_json_file(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(MotionError::InvalidConfiguration { .. })));
    }
}
