//! Rough, distorted voice: tilted spectrum, dense harmonics, saturation and
//! breath noise.

use rand::Rng;
use rustfft::num_complex::Complex;

use super::spectral::{FrameContext, SpectralTransform, add_harmonics};
use crate::dsp::{GaussianNoise, pre_emphasis, saturate};

/// Parameters of the rough-voice effect.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct RoughSettings {
    /// Gain at the Nyquist bin; ramps linearly from 1.0 at DC
    pub tilt_gain: f64,
    /// Weight of harmonics 2 to 5
    pub harmonic_gain: f64,
    /// Per-frame `tanh` drive
    pub frame_drive: f64,
    /// Standard deviation of the per-frame noise
    pub noise_sigma: f64,
    /// Final `tanh` drive on the rebuilt buffer
    pub global_drive: f64,
    /// Pre-emphasis coefficient on the rebuilt buffer
    pub emphasis: f64,
}

impl Default for RoughSettings {
    fn default() -> Self {
        Self {
            tilt_gain: 3.0,
            harmonic_gain: 0.8,
            frame_drive: 3.0,
            noise_sigma: 0.05,
            global_drive: 2.0,
            emphasis: 0.95,
        }
    }
}

/// Spectral transform for the rough voice.
///
/// The spectrum of each frame is tilted upwards and thickened with harmonics;
/// each resynthesized frame is then driven through `tanh` and gets Gaussian
/// noise added. The rebuilt buffer goes through a second, gentler
/// saturation and a pre-emphasis filter.
pub struct RoughVoice<R: Rng = rand::rngs::ThreadRng> {
    settings: RoughSettings,
    noise: GaussianNoise<R>,
}

impl RoughVoice<rand::rngs::ThreadRng> {
    pub fn new(settings: RoughSettings) -> Self {
        Self::with_rng(settings, rand::thread_rng())
    }
}

impl Default for RoughVoice<rand::rngs::ThreadRng> {
    fn default() -> Self {
        Self::new(RoughSettings::default())
    }
}

impl<R: Rng> RoughVoice<R> {
    /// Creates the transform with a custom RNG for the noise.
    pub fn with_rng(settings: RoughSettings, rng: R) -> Self {
        Self {
            settings,
            noise: GaussianNoise::with_rng(settings.noise_sigma, rng),
        }
    }

    pub fn settings(&self) -> &RoughSettings {
        &self.settings
    }
}

impl<R: Rng> SpectralTransform for RoughVoice<R> {
    fn transform_bins(&mut self, bins: &mut [Complex<f64>], _ctx: &FrameContext) {
        let last = (bins.len() - 1).max(1) as f64;
        let slope = self.settings.tilt_gain - 1.0;
        for (k, bin) in bins.iter_mut().enumerate() {
            *bin *= 1.0 + slope * k as f64 / last;
        }
        add_harmonics(bins, 2..=5, self.settings.harmonic_gain);
    }

    fn shape_frame(&mut self, frame: &mut [f64]) {
        saturate(frame, self.settings.frame_drive);
        self.noise.add_to(frame);
    }

    fn finish(&mut self, samples: &mut [f64]) {
        saturate(samples, self.settings.global_drive);
        pre_emphasis(samples, self.settings.emphasis);
    }
}
