//! Error type shared by every processing stage.

use thiserror::Error;

/// Errors produced by the effect engine.
///
/// Most variants describe a stage that could not run. The dispatcher absorbs
/// those and hands the caller the original audio; only
/// [`EffectError::UnknownEffect`] is meant to reach the caller as a hard
/// failure.
#[derive(Debug, Error)]
pub enum EffectError {
    /// The effect identifier is not part of the registered set.
    #[error("unknown effect `{0}`")]
    UnknownEffect(String),

    /// The input buffer holds no samples.
    #[error("input buffer is empty")]
    EmptyInput,

    /// The buffer's sample rate is zero.
    #[error("sample rate must be non-zero")]
    InvalidSampleRate,

    /// A stage produced NaN or infinite samples.
    #[error("stage `{stage}` produced non-finite samples")]
    NonFinite { stage: &'static str },

    /// A scale definition was rejected.
    #[error("invalid scale: {0}")]
    InvalidScale(String),

    /// A note name could not be parsed.
    #[error("invalid note name `{name}`: {reason}")]
    InvalidNote { name: String, reason: String },

    /// A pitch contour does not line up with the buffer it is applied to.
    #[error("pitch contour does not match buffer: {0}")]
    ContourMismatch(String),

    /// The resampler could not be constructed.
    #[error(transparent)]
    ResamplerSetup(#[from] rubato::ResamplerConstructionError),

    /// The resampler failed while processing.
    #[error(transparent)]
    Resampler(#[from] rubato::ResampleError),

    /// The configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A configuration value is out of range.
    #[error("invalid configuration value: {0}")]
    InvalidConfig(String),

    /// A file could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Reading or writing a WAV file failed.
    #[cfg(feature = "wav")]
    #[error(transparent)]
    Wav(#[from] hound::Error),
}

/// Convenience alias used across the crate.
pub type Result<T, E = EffectError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            EffectError::UnknownEffect("chorus".into()).to_string(),
            "unknown effect `chorus`"
        );
        assert_eq!(
            EffectError::NonFinite { stage: "robot" }.to_string(),
            "stage `robot` produced non-finite samples"
        );
        assert_eq!(
            EffectError::InvalidNote {
                name: "H2".into(),
                reason: "unknown pitch class".into()
            }
            .to_string(),
            "invalid note name `H2`: unknown pitch class"
        );
    }

    #[test]
    fn test_config_error_conversion() {
        let parse: std::result::Result<toml::Value, _> = toml::from_str("not = [valid");
        let err: EffectError = parse.unwrap_err().into();
        assert!(matches!(err, EffectError::Config(_)));
    }
}
