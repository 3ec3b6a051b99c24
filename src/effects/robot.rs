//! Robotic timbre: brightened highs, synthetic harmonics, metallic edge.

use rustfft::num_complex::Complex;

use super::spectral::{FrameContext, SpectralTransform, add_harmonics};
use crate::dsp::pre_emphasis;

/// Spectral transform giving a voice a metallic, robotic colour.
///
/// Per frame, every bin above `brighten_above` Hz is multiplied by
/// `high_gain`, then each bin's content is echoed at its 2nd, 3rd and 4th
/// harmonic bins with weight `harmonic_gain / h`. After reconstruction a
/// pre-emphasis filter sharpens the result.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct RobotVoice {
    /// Frequency in Hz above which bins are boosted
    pub brighten_above: f64,
    /// Gain for bins above `brighten_above` (greater than 1)
    pub high_gain: f64,
    /// Weight of the synthetic harmonics
    pub harmonic_gain: f64,
    /// Pre-emphasis coefficient applied to the whole buffer
    pub emphasis: f64,
}

impl Default for RobotVoice {
    fn default() -> Self {
        Self {
            brighten_above: 1_000.0,
            high_gain: 1.5,
            harmonic_gain: 0.5,
            emphasis: 0.97,
        }
    }
}

impl SpectralTransform for RobotVoice {
    fn transform_bins(&mut self, bins: &mut [Complex<f64>], ctx: &FrameContext) {
        for (k, bin) in bins.iter_mut().enumerate() {
            if ctx.bin_frequency(k) > self.brighten_above {
                *bin *= self.high_gain;
            }
        }
        add_harmonics(bins, 2..=4, self.harmonic_gain);
    }

    fn finish(&mut self, samples: &mut [f64]) {
        pre_emphasis(samples, self.emphasis);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AudioBuffer;
    use crate::effects::SpectralFrameProcessor;
    use std::f64::consts::TAU;

    #[test]
    fn test_boosts_only_high_bins() {
        let ctx = FrameContext {
            sample_rate: 16_000,
            fft_size: 1024,
            frame_index: 0,
        };
        let mut robot = RobotVoice {
            harmonic_gain: 0.0,
            ..RobotVoice::default()
        };
        let mut bins = vec![Complex::new(1.0, 0.0); 513];
        robot.transform_bins(&mut bins, &ctx);
        // 64 * 16000 / 1024 = 1000 Hz exactly, not above the threshold
        assert_eq!(bins[64].re, 1.0);
        assert_eq!(bins[65].re, 1.5);
        assert_eq!(bins[512].re, 1.5);
    }

    #[test]
    fn test_robot_on_voice_like_tone() {
        let samples: Vec<f64> = (0..16_000)
            .map(|i| {
                let t = i as f64 / 16_000.0;
                0.5 * (TAU * 180.0 * t).sin() + 0.2 * (TAU * 360.0 * t).sin()
            })
            .collect();
        let output = SpectralFrameProcessor::default()
            .process(AudioBuffer::new(samples, 16_000), &mut RobotVoice::default());
        assert_eq!(output.len(), 16_000);
        assert!(output.samples().iter().all(|s| s.is_finite()));
        assert!((output.peak() - 1.0).abs() < 1e-9);
    }
}
