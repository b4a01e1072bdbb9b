use crate::types::Config;
use anyhow::{ensure, Context, Result};
use std::fs;
use std::path::Path;

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Like `load`, but a missing file yields the built-in defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.reinit.frames_between_reinit > 0,
            "reinit.frames_between_reinit must be at least 1"
        );
        ensure!(
            self.arrows.top_n_arrows > 0,
            "arrows.top_n_arrows must be at least 1"
        );
        ensure!(
            self.arrows.shift_acceptance_threshold.is_finite()
                && self.arrows.shift_acceptance_threshold > 0.0,
            "arrows.shift_acceptance_threshold must be a positive number, got {}",
            self.arrows.shift_acceptance_threshold
        );
        ensure!(
            self.arrows.display_length.is_finite() && self.arrows.display_length > 0.0,
            "arrows.display_length must be a positive number, got {}",
            self.arrows.display_length
        );
        ensure!(
            self.features.max_features > 0,
            "features.max_features must be at least 1"
        );
        ensure!(
            self.flow.window_size > 0 && self.flow.window_size % 2 == 1,
            "flow.window_size must be a positive odd number, got {}",
            self.flow.window_size
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Anchor;

    #[test]
    fn test_defaults_match_lk_demo_values() {
        let config = Config::default();
        assert_eq!(config.features.max_features, 800);
        assert_eq!(config.arrows.shift_acceptance_threshold, 15.0);
        assert_eq!(config.arrows.top_n_arrows, 5);
        assert_eq!(config.reinit.frames_between_reinit, 20);
        assert_eq!(config.display.quit_key, 27);
        assert_eq!(config.arrows.anchor, Anchor::FrameCenter);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = "arrows:\n  top_n_arrows: 7\n  anchor:\n    mode: fixed\n    x: 640\n    y: 360\n";
        let config = Config::from_yaml_str(yaml).unwrap();

        assert_eq!(config.arrows.top_n_arrows, 7);
        assert_eq!(config.arrows.anchor, Anchor::Fixed { x: 640, y: 360 });
        assert_eq!(config.arrows.shift_acceptance_threshold, 15.0);
        assert_eq!(config.flow.window_size, 5);
    }

    #[test]
    fn test_zero_reinit_interval_rejected() {
        let yaml = "reinit:\n  frames_between_reinit: 0\n";
        assert!(Config::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_zero_top_n_rejected() {
        let mut config = Config::default();
        config.arrows.top_n_arrows = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_even_flow_window_rejected() {
        let mut config = Config::default();
        config.flow.window_size = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load_or_default("definitely/not/here/motion_arrow.yaml").unwrap();
        assert_eq!(config.arrows.top_n_arrows, 5);
    }
}
