//! Windowed FFT / IFFT engine with overlap-add reconstruction.
//!
//! The processor owns the framing, FFTs and overlap-add; what happens to the
//! spectrum of each frame is delegated to a [`SpectralTransform`].

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::AudioBuffer;
use crate::dsp::{hann_window, normalize, peak, sanitize};

/// Frames whose analysis peak falls below this are treated as silence and
/// skipped.
const SILENCE_FLOOR: f64 = 1e-10;

/// Information about the frame currently being transformed.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    /// Sample rate of the buffer in Hz
    pub sample_rate: u32,
    /// FFT length in samples
    pub fft_size: usize,
    /// Index of the frame within the buffer
    pub frame_index: usize,
}

impl FrameContext {
    /// Frequency in Hz of a bin.
    pub fn bin_frequency(&self, bin: usize) -> f64 {
        bin as f64 * f64::from(self.sample_rate) / self.fft_size as f64
    }
}

/// A per-frame spectral effect.
///
/// `transform_bins` receives the non-negative half of the spectrum (bins
/// `0..=fft_size / 2`); the processor restores conjugate symmetry afterwards,
/// so implementations never have to. The two hooks run in the time domain.
pub trait SpectralTransform {
    /// Rewrites the spectrum of one frame.
    fn transform_bins(&mut self, bins: &mut [Complex<f64>], ctx: &FrameContext);

    /// Shapes one frame after the inverse FFT, before local normalization.
    fn shape_frame(&mut self, _frame: &mut [f64]) {}

    /// Post-processes the reconstructed buffer, before global normalization.
    fn finish(&mut self, _samples: &mut [f64]) {}
}

/// Generic short-time spectral processor.
///
/// Splits the buffer into Hann-windowed frames with 75% overlap, runs each
/// frame through FFT → transform → IFFT, rescales each processed frame to the
/// peak of the frame it came from, and rebuilds the buffer with weighted
/// overlap-add. Output length always equals input length and the result is
/// peak-normalized.
///
/// # Examples
///
/// ```
/// use voxshift::AudioBuffer;
/// use voxshift::effects::{RobotVoice, SpectralFrameProcessor};
///
/// let input = AudioBuffer::new(vec![0.0; 4_096], 16_000);
/// let output = SpectralFrameProcessor::default().process(input, &mut RobotVoice::default());
/// assert_eq!(output.len(), 4_096);
/// assert!(output.is_silent());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpectralFrameProcessor {
    frame_size: usize,
    hop_size: usize,
}

impl SpectralFrameProcessor {
    /// Default frame length in samples.
    pub const DEFAULT_FRAME_SIZE: usize = 1024;

    /// Creates a processor with the given frame length and a hop of a
    /// quarter frame. Frame sizes below 4 are raised to 4.
    pub fn new(frame_size: usize) -> Self {
        let frame_size = frame_size.max(4);
        Self {
            frame_size,
            hop_size: frame_size / 4,
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Runs `transform` over the buffer.
    pub fn process<T: SpectralTransform + ?Sized>(
        &self,
        buffer: AudioBuffer,
        transform: &mut T,
    ) -> AudioBuffer {
        if buffer.is_empty() {
            return buffer;
        }

        let n = self.frame_size;
        let hop = self.hop_size;
        let half = n / 2;
        let len = buffer.len();

        // Leading pad gives the first real sample full window coverage.
        let lead = n - hop;
        let frames = (lead + len).div_ceil(hop);
        let padded_len = (frames - 1) * hop + n;
        let mut padded = vec![0.0; padded_len];
        padded[lead..lead + len].copy_from_slice(buffer.samples());

        let mut planner = FftPlanner::<f64>::new();
        let forward: Arc<dyn Fft<f64>> = planner.plan_fft_forward(n);
        let inverse: Arc<dyn Fft<f64>> = planner.plan_fft_inverse(n);

        let window = hann_window(n);
        let mut output = vec![0.0; padded_len];
        let mut weight = vec![0.0; padded_len];
        let mut spectrum = vec![Complex::new(0.0, 0.0); n];
        let mut frame = vec![0.0; n];

        for index in 0..frames {
            let start = index * hop;
            for (w, &win) in weight[start..start + n].iter_mut().zip(&window) {
                *w += win * win;
            }

            for ((bin, &x), &win) in spectrum
                .iter_mut()
                .zip(&padded[start..start + n])
                .zip(&window)
            {
                *bin = Complex::new(x * win, 0.0);
            }
            let source_peak = spectrum.iter().fold(0.0_f64, |acc, c| acc.max(c.re.abs()));
            if source_peak < SILENCE_FLOOR {
                continue;
            }

            forward.process(&mut spectrum);

            let ctx = FrameContext {
                sample_rate: buffer.sample_rate(),
                fft_size: n,
                frame_index: index,
            };
            transform.transform_bins(&mut spectrum[..=half], &ctx);

            // Restore conjugate symmetry so the inverse is real.
            spectrum[0].im = 0.0;
            spectrum[half].im = 0.0;
            for k in 1..half {
                spectrum[n - k] = spectrum[k].conj();
            }

            inverse.process(&mut spectrum);
            let scale = 1.0 / n as f64;
            for (sample, bin) in frame.iter_mut().zip(&spectrum) {
                *sample = bin.re * scale;
            }

            transform.shape_frame(&mut frame);
            sanitize(&mut frame);

            let frame_peak = peak(&frame);
            if frame_peak <= 0.0 {
                continue;
            }
            let gain = source_peak / frame_peak;
            for ((out, &sample), &win) in output[start..start + n]
                .iter_mut()
                .zip(&frame)
                .zip(&window)
            {
                *out += sample * gain * win;
            }
        }

        let mut samples: Vec<f64> = output[lead..lead + len]
            .iter()
            .zip(&weight[lead..lead + len])
            .map(|(&out, &w)| if w > 1e-12 { out / w } else { 0.0 })
            .collect();

        transform.finish(&mut samples);
        normalize(&mut samples);
        buffer.with_samples(samples)
    }
}

impl Default for SpectralFrameProcessor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FRAME_SIZE)
    }
}

/// Adds each bin's content at its harmonic positions `h * k` for `h` in
/// `harmonics`, weighted by `gain / h`. Reads from a snapshot so added energy
/// is not itself re-harmonized.
pub(crate) fn add_harmonics(
    bins: &mut [Complex<f64>],
    harmonics: std::ops::RangeInclusive<usize>,
    gain: f64,
) {
    let snapshot = bins.to_vec();
    let top = bins.len();
    for h in harmonics {
        let weight = gain / h as f64;
        for (k, &value) in snapshot.iter().enumerate().skip(1) {
            let target = k * h;
            if target >= top {
                break;
            }
            bins[target] += value * weight;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    struct Identity;

    impl SpectralTransform for Identity {
        fn transform_bins(&mut self, _bins: &mut [Complex<f64>], _ctx: &FrameContext) {}
    }

    struct CountFrames(usize);

    impl SpectralTransform for CountFrames {
        fn transform_bins(&mut self, bins: &mut [Complex<f64>], ctx: &FrameContext) {
            assert_eq!(bins.len(), ctx.fft_size / 2 + 1);
            self.0 += 1;
        }
    }

    fn sine(freq: f64, sample_rate: u32, len: usize) -> AudioBuffer {
        let samples = (0..len)
            .map(|i| (TAU * freq * i as f64 / f64::from(sample_rate)).sin() * 0.5)
            .collect();
        AudioBuffer::new(samples, sample_rate)
    }

    #[test]
    fn test_identity_reconstructs_input() {
        let input = sine(330.0, 16_000, 8_000);
        let output = SpectralFrameProcessor::default().process(input.clone(), &mut Identity);
        assert_eq!(output.len(), input.len());
        // identity frames keep their own peak, so the result is the input
        // scaled to unit peak
        let scale = 1.0 / input.peak();
        for (out, inp) in output.samples().iter().zip(input.samples()) {
            assert!((out - inp * scale).abs() < 1e-9);
        }
    }

    #[test]
    fn test_length_preserved_for_odd_lengths() {
        for len in [1_024, 1_025, 3_333, 100] {
            let input = sine(200.0, 8_000, len);
            let output = SpectralFrameProcessor::default().process(input, &mut Identity);
            assert_eq!(output.len(), len);
        }
    }

    #[test]
    fn test_zero_in_zero_out() {
        let mut counter = CountFrames(0);
        let output = SpectralFrameProcessor::default()
            .process(AudioBuffer::new(vec![0.0; 5_000], 16_000), &mut counter);
        assert!(output.samples().iter().all(|&s| s == 0.0));
        assert_eq!(counter.0, 0);
    }

    #[test]
    fn test_bin_frequency() {
        let ctx = FrameContext {
            sample_rate: 16_000,
            fft_size: 1024,
            frame_index: 0,
        };
        assert_eq!(ctx.bin_frequency(64), 1_000.0);
    }

    #[test]
    fn test_add_harmonics() {
        let mut bins = vec![Complex::new(0.0, 0.0); 9];
        bins[2] = Complex::new(1.0, 0.0);
        add_harmonics(&mut bins, 2..=4, 1.0);
        assert!((bins[4].re - 0.5).abs() < 1e-12);
        assert!((bins[6].re - 1.0 / 3.0).abs() < 1e-12);
        assert!((bins[8].re - 0.25).abs() < 1e-12);
        assert_eq!(bins[2].re, 1.0);
    }
}
