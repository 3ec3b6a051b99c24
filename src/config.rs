//! Engine configuration loaded from TOML.
//!
//! Every section is optional; anything left out keeps the built-in value.
//!
//! ```toml
//! [analysis]
//! frame_length = 2048
//! hop_length = 512
//!
//! [autotune]
//! scale = "minor"
//! root = "A3"
//!
//! [echo]
//! delay_time = 0.25
//! repeats = 2
//! decay = 0.4
//!
//! [rough]
//! noise_sigma = 0.02
//!
//! [robot]
//! high_gain = 2.0
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::effects::{DelayLine, RobotVoice, RoughSettings};
use crate::error::Result;
use crate::pitch::{PitchAnalyzer, ScaleDefinition, ScaleKind, parse_note};
use crate::resynth::Resynthesizer;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pitch tracker used by every pitch-correction effect
    pub analysis: PitchAnalyzer,
    pub autotune: AutotuneConfig,
    pub echo: DelayLine,
    pub rough: RoughSettings,
    pub robot: RobotVoice,
}

/// Scale and noise seed shared by the pitch-correction effects.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AutotuneConfig {
    pub scale: ScaleKind,
    /// Root note name, e.g. `"C4"` or `"F#3"`
    pub root: String,
    /// Seed of the vocoder's noise generator
    pub seed: u64,
}

impl Default for AutotuneConfig {
    fn default() -> Self {
        Self {
            scale: ScaleKind::Major,
            root: "C4".to_string(),
            seed: Resynthesizer::DEFAULT_SEED,
        }
    }
}

impl AutotuneConfig {
    /// The configured scale.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EffectError::InvalidNote`] when `root` is not a note
    /// name.
    pub fn scale_definition(&self) -> Result<ScaleDefinition> {
        let root = parse_note(&self.root)?;
        Ok(ScaleDefinition::preset(self.scale, root))
    }
}

impl EngineConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Examples
    ///
    /// ```
    /// use voxshift::config::EngineConfig;
    ///
    /// let config = EngineConfig::from_toml_str("[echo]\nrepeats = 5").unwrap();
    /// assert_eq!(config.echo.repeats, 5);
    /// assert_eq!(config.echo.delay_time, 0.3);
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.analysis.validate()?;
        config.autotune.scale_definition()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EffectError;

    #[test]
    fn test_empty_config_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.echo, DelayLine::echo());
        assert_eq!(config.analysis, PitchAnalyzer::default());
    }

    #[test]
    fn test_partial_sections() {
        let text = r#"
            [analysis]
            hop_length = 256

            [autotune]
            scale = "minor_pentatonic"
            root = "A3"

            [rough]
            noise_sigma = 0.01
        "#;
        let config = EngineConfig::from_toml_str(text).unwrap();
        assert_eq!(config.analysis.hop_length, 256);
        assert_eq!(config.analysis.frame_length, 2048);
        assert_eq!(config.rough.noise_sigma, 0.01);
        assert_eq!(config.rough.tilt_gain, 3.0);

        let scale = config.autotune.scale_definition().unwrap();
        assert_eq!(scale.root(), 57);
        assert_eq!(scale.offsets(), ScaleKind::MinorPentatonic.offsets());
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert!(matches!(
            EngineConfig::from_toml_str("[autotune]\nroot = \"H9\""),
            Err(EffectError::InvalidNote { .. })
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[autotune]\nscale = \"dorian\""),
            Err(EffectError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[echo]\nrepeats = -1"),
            Err(EffectError::Config(_))
        ));
    }

    #[test]
    fn test_analysis_range_is_checked() {
        for text in [
            "[analysis]\nfmax = 0.0",
            "[analysis]\nfmin = 900.0\nfmax = 800.0",
            "[analysis]\nhop_length = 0",
            "[analysis]\nframe_length = 2",
        ] {
            assert!(
                matches!(EngineConfig::from_toml_str(text), Err(EffectError::InvalidConfig(_))),
                "accepted {:?}",
                text
            );
        }
    }

    #[test]
    fn test_echo_values_are_clamped() {
        let config = EngineConfig::from_toml_str("[echo]\ndecay = 5.0\ndelay_time = -1.0").unwrap();
        assert_eq!(config.echo.decay, 1.0);
        assert_eq!(config.echo.delay_time, 0.0);
        assert_eq!(config.echo.repeats, 3);

        let config = EngineConfig::from_toml_str("[echo]\ndecay = -0.5").unwrap();
        assert_eq!(config.echo.decay, 0.0);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            EngineConfig::load("/definitely/not/here.toml"),
            Err(EffectError::Io(_))
        ));
    }
}
