//! Waveform synthesis from vocoder parameters: a pulse train for the
//! periodic part plus shaped noise for the aperiodic part.

use std::f64::consts::TAU;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use tracing::debug;

use super::analysis::VocoderAnalysis;
use crate::dsp::{GaussianNoise, hann_window};
use crate::error::{EffectError, Result};

/// Builds `len` samples from `analysis`, driven by the per-frame
/// fundamentals in `f0` (0.0 on unvoiced frames).
///
/// Pulses are zero-phase, placed at fractional times where the integrated
/// fundamental completes a cycle, and carry `sqrt(env * (1 - ap))`. Noise
/// frames carry `sqrt(env * ap)`. The same `seed` gives the same output.
pub fn synthesize(analysis: &VocoderAnalysis, f0: &[f64], len: usize, seed: u64) -> Result<Vec<f64>> {
    if f0.len() != analysis.frame_count() {
        return Err(EffectError::ContourMismatch(format!(
            "{} fundamentals for {} frames",
            f0.len(),
            analysis.frame_count()
        )));
    }
    let mut output = vec![0.0; len];
    if len == 0 || f0.is_empty() {
        return Ok(output);
    }

    let pulses = add_pulses(analysis, f0, &mut output);
    add_noise(analysis, &mut output, seed);
    debug!(pulses, len, "vocoder synthesis done");

    if output.iter().any(|s| !s.is_finite()) {
        return Err(EffectError::NonFinite { stage: "vocoder" });
    }
    Ok(output)
}

/// Overlap-adds one pulse per fundamental period. Returns the pulse count.
fn add_pulses(analysis: &VocoderAnalysis, f0: &[f64], output: &mut [f64]) -> usize {
    let n = analysis.fft_size();
    let half = n / 2;
    let sr = f64::from(analysis.sample_rate().max(1));
    let inverse = FftPlanner::<f64>::new().plan_fft_inverse(n);
    let mut spectrum = vec![Complex::new(0.0, 0.0); n];

    let mut phase = 0.0;
    let mut count = 0;
    for i in 0..output.len() {
        let freq = analysis.f0_at(f0, i as f64);
        if freq <= 0.0 {
            continue;
        }
        let step = freq / sr;
        if phase + step < 1.0 {
            phase += step;
            continue;
        }
        let time = i as f64 + (1.0 - phase) / step;
        phase += step - 1.0;

        let (envelope, aperiodicity) = analysis.spectrum_at(time);
        // sqrt(period) restores the harmonic amplitude of the analyzed tone
        let gain = (sr / freq).sqrt();
        let frac = time - time.floor();
        let delay = half as f64 + frac;

        spectrum.fill(Complex::new(0.0, 0.0));
        for k in 1..half {
            let periodic = envelope[k] * (1.0 - aperiodicity[k]);
            let amplitude = periodic.max(0.0).sqrt() * gain;
            let bin = Complex::from_polar(amplitude, -TAU * k as f64 * delay / n as f64);
            spectrum[k] = bin;
            spectrum[n - k] = bin.conj();
        }
        inverse.process(&mut spectrum);

        let base = time.floor() as i64 - half as i64;
        overlap_add(output, base, spectrum.iter().map(|c| c.re / n as f64));
        count += 1;
    }
    count
}

/// Overlap-adds Hann-windowed, spectrally shaped Gaussian noise at a hop of
/// a quarter FFT.
fn add_noise(analysis: &VocoderAnalysis, output: &mut [f64], seed: u64) {
    let n = analysis.fft_size();
    let half = n / 2;
    let hop = n / 4;
    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);
    let window = hann_window(n);
    // squared periodic Hann windows overlap to 3n / (8 hop)
    let scale = (8.0 * hop as f64 / (3.0 * n as f64)).sqrt() / n as f64;

    let mut noise = GaussianNoise::with_rng(1.0, StdRng::seed_from_u64(seed));
    let mut spectrum = vec![Complex::new(0.0, 0.0); n];
    let mut gains = vec![0.0; half + 1];

    let mut start = -(n as i64);
    while start < output.len() as i64 {
        let centre = (start + half as i64) as f64;
        let (envelope, aperiodicity) = analysis.spectrum_at(centre);
        for ((g, e), a) in gains.iter_mut().zip(&envelope).zip(&aperiodicity) {
            *g = (e * a).max(0.0).sqrt();
        }
        for bin in spectrum.iter_mut() {
            *bin = Complex::new(noise.next_sample(), 0.0);
        }

        if gains.iter().any(|&g| g > 1e-12) {
            forward.process(&mut spectrum);
            for k in 0..=half {
                spectrum[k] *= gains[k];
                if k > 0 && k < half {
                    spectrum[n - k] *= gains[k];
                }
            }
            inverse.process(&mut spectrum);
            let frame = spectrum
                .iter()
                .zip(&window)
                .map(|(c, w)| c.re * w * scale);
            overlap_add(output, start, frame);
        }
        start += hop as i64;
    }
}

/// Adds `frame` into `output` starting at `base`, dropping samples that fall
/// outside.
fn overlap_add(output: &mut [f64], base: i64, frame: impl Iterator<Item = f64>) {
    for (j, value) in frame.enumerate() {
        let pos = base + j as i64;
        if let Ok(pos) = usize::try_from(pos) {
            if let Some(out) = output.get_mut(pos) {
                *out += value;
            }
        }
    }
}
