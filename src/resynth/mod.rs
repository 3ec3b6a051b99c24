//! Applying a pitch correction to audio.
//!
//! Two strategies are available:
//!
//! - [`ResynthesisStrategy::Vocoder`] analyzes the buffer into a fundamental,
//!   a smoothed spectral envelope and an aperiodicity measure, swaps in the
//!   corrected fundamental and synthesizes a new waveform. Timbre follows the
//!   original envelope, so formants do not move with the pitch.
//! - [`ResynthesisStrategy::FrameShift`] resamples each voiced frame by its
//!   correction ratio and overlap-adds the frames back together.
//!
//! Both keep the input length and sample rate.

pub mod analysis;
pub mod shift;
pub mod synthesis;

pub use analysis::VocoderAnalysis;
pub use shift::frame_shift;
pub use synthesis::synthesize;

use tracing::debug;

use crate::AudioBuffer;
use crate::error::{EffectError, Result};
use crate::pitch::{CorrectionCurve, PitchContour};

/// How a [`Resynthesizer`] rebuilds the corrected signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResynthesisStrategy {
    /// Full analysis and resynthesis.
    #[default]
    Vocoder,
    /// Per-frame resampling and overlap-add.
    FrameShift,
}

/// Applies a [`CorrectionCurve`] to a buffer.
///
/// # Examples
///
/// ```
/// use voxshift::AudioBuffer;
/// use voxshift::pitch::{CorrectionCurve, PitchAnalyzer};
/// use voxshift::resynth::{ResynthesisStrategy, Resynthesizer};
///
/// // nothing voiced: the buffer comes back as it was
/// let silence = AudioBuffer::new(vec![0.0; 4_000], 16_000);
/// let contour = PitchAnalyzer::default().analyze(&silence);
/// let curve = CorrectionCurve::flat(contour.len());
///
/// let output = Resynthesizer::new(ResynthesisStrategy::Vocoder)
///     .apply(&silence, &contour, &curve)
///     .unwrap();
/// assert_eq!(output, silence);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resynthesizer {
    strategy: ResynthesisStrategy,
    seed: u64,
}

impl Resynthesizer {
    /// Seed of the vocoder's noise generator unless one is given.
    pub const DEFAULT_SEED: u64 = 0x5eed;

    pub fn new(strategy: ResynthesisStrategy) -> Self {
        Self {
            strategy,
            seed: Self::DEFAULT_SEED,
        }
    }

    /// Uses a different seed for the aperiodic noise.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn strategy(&self) -> ResynthesisStrategy {
        self.strategy
    }

    /// Rebuilds `buffer` with the pitch of every frame of `contour` moved by
    /// the matching entry of `curve`.
    ///
    /// # Errors
    ///
    /// - [`EffectError::EmptyInput`] / [`EffectError::InvalidSampleRate`] for
    ///   unusable buffers
    /// - [`EffectError::ContourMismatch`] when the contour and curve lengths
    ///   differ or the contour was computed at another sample rate
    /// - [`EffectError::NonFinite`] when synthesis produced NaN or infinity
    pub fn apply(
        &self,
        buffer: &AudioBuffer,
        contour: &PitchContour,
        curve: &CorrectionCurve,
    ) -> Result<AudioBuffer> {
        buffer.validate()?;
        if contour.len() != curve.len() {
            return Err(EffectError::ContourMismatch(format!(
                "{} frames but {} corrections",
                contour.len(),
                curve.len()
            )));
        }
        if contour.sample_rate() != buffer.sample_rate() {
            return Err(EffectError::ContourMismatch(format!(
                "contour at {} Hz, buffer at {} Hz",
                contour.sample_rate(),
                buffer.sample_rate()
            )));
        }
        if !contour.has_voiced() {
            debug!("no voiced frames, skipping resynthesis");
            return Ok(buffer.clone());
        }

        debug!(strategy = ?self.strategy, frames = contour.len(), "resynthesizing");
        let samples = match self.strategy {
            ResynthesisStrategy::Vocoder => {
                let analysis = VocoderAnalysis::analyze(buffer, contour);
                let corrected: Vec<f64> = analysis
                    .f0()
                    .iter()
                    .enumerate()
                    .map(|(i, &f0)| f0 * curve.ratio(i))
                    .collect();
                synthesize(&analysis, &corrected, buffer.len(), self.seed)?
            }
            ResynthesisStrategy::FrameShift => frame_shift(buffer, contour, curve),
        };

        if samples.iter().any(|s| !s.is_finite()) {
            return Err(EffectError::NonFinite {
                stage: "resynthesis",
            });
        }
        Ok(buffer.with_samples(samples))
    }
}

impl Default for Resynthesizer {
    fn default() -> Self {
        Self::new(ResynthesisStrategy::default())
    }
}
