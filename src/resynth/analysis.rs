//! Source-filter analysis for the vocoder: refined f0, smoothed spectral
//! envelope and aperiodicity at every pitch frame.

use std::f64::consts::TAU;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::AudioBuffer;
use crate::dsp::window::hann_window_symmetric;
use crate::pitch::PitchContour;

/// Lowest fundamental the analysis windows are sized for.
const F0_FLOOR: f64 = 40.0;
/// Stand-in fundamental used to size windows on unvoiced frames.
const UNVOICED_F0: f64 = 500.0;
/// Refined estimates further than this from the tracker's are rejected.
const REFINE_TOLERANCE: f64 = 0.05;
const MIN_APERIODICITY: f64 = 0.001;

/// Per-frame parameters of a buffer, ready for resynthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct VocoderAnalysis {
    sample_rate: u32,
    fft_size: usize,
    hop: usize,
    times: Vec<f64>,
    f0: Vec<f64>,
    envelope: Vec<Vec<f64>>,
    aperiodicity: Vec<Vec<f64>>,
}

impl VocoderAnalysis {
    /// Analyzes `buffer` at the frames of `contour`.
    ///
    /// Unvoiced frames keep an f0 of 0.0 and a fully aperiodic spectrum.
    pub fn analyze(buffer: &AudioBuffer, contour: &PitchContour) -> Self {
        let sample_rate = buffer.sample_rate();
        let sr = f64::from(sample_rate.max(1));
        let fft_size = fft_size_for(sr);
        let mut spectra = PowerSpectrum::new(fft_size);

        let samples = buffer.samples();
        let count = contour.len();
        let mut times = Vec::with_capacity(count);
        let mut f0 = Vec::with_capacity(count);
        let mut envelope = Vec::with_capacity(count);
        let mut aperiodicity = Vec::with_capacity(count);

        for (i, frame) in contour.frames().iter().enumerate() {
            let centre = contour.frame_center(i);
            let estimate = if frame.voiced && frame.f0 > 0.0 {
                let coarse = frame.f0.max(F0_FLOOR);
                refine_f0(samples, centre, coarse, sr).unwrap_or(coarse)
            } else {
                0.0
            };

            let window_f0 = if estimate > 0.0 { estimate } else { UNVOICED_F0 };
            envelope.push(spectra.envelope(samples, centre, window_f0, sr));
            aperiodicity.push(if estimate > 0.0 {
                spectra.aperiodicity(samples, centre, estimate, sr)
            } else {
                vec![1.0; fft_size / 2 + 1]
            });
            times.push(centre);
            f0.push(estimate);
        }

        Self {
            sample_rate,
            fft_size,
            hop: contour.hop_length(),
            times,
            f0,
            envelope,
            aperiodicity,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// FFT length of the envelope and aperiodicity spectra.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn frame_count(&self) -> usize {
        self.f0.len()
    }

    /// Refined fundamentals, 0.0 on unvoiced frames.
    pub fn f0(&self) -> &[f64] {
        &self.f0
    }

    /// Smoothed power envelope of frame `index`, bins `0..=fft_size / 2`.
    pub fn envelope(&self, index: usize) -> &[f64] {
        &self.envelope[index]
    }

    /// Aperiodicity of frame `index` in `[0.001, 1]`, bins `0..=fft_size / 2`.
    pub fn aperiodicity(&self, index: usize) -> &[f64] {
        &self.aperiodicity[index]
    }

    /// Frames surrounding sample time `t` and the weight of the second one.
    pub(crate) fn locate(&self, t: f64) -> (usize, usize, f64) {
        let Some(last) = self.times.len().checked_sub(1) else {
            return (0, 0, 0.0);
        };
        let u = (t - self.times[0]) / self.hop as f64;
        if u <= 0.0 || last == 0 {
            return (0, 0, 0.0);
        }
        if u >= last as f64 {
            return (last, last, 0.0);
        }
        let i = u.floor() as usize;
        (i, i + 1, u - i as f64)
    }

    /// Fundamental at time `t` taken from `f0` (one value per frame):
    /// interpolated between two voiced frames, otherwise the nearest frame's.
    pub(crate) fn f0_at(&self, f0: &[f64], t: f64) -> f64 {
        let (i, j, w) = self.locate(t);
        let (a, b) = (f0[i], f0[j]);
        if a > 0.0 && b > 0.0 {
            a + (b - a) * w
        } else if w < 0.5 {
            a
        } else {
            b
        }
    }

    /// Envelope and aperiodicity at time `t`, interpolated between frames.
    pub(crate) fn spectrum_at(&self, t: f64) -> (Vec<f64>, Vec<f64>) {
        let (i, j, w) = self.locate(t);
        let lerp = |a: &[f64], b: &[f64]| -> Vec<f64> {
            a.iter().zip(b).map(|(x, y)| x + (y - x) * w).collect()
        };
        (
            lerp(&self.envelope[i], &self.envelope[j]),
            lerp(&self.aperiodicity[i], &self.aperiodicity[j]),
        )
    }
}

/// Smallest power of two holding six periods of the lowest fundamental.
pub(crate) fn fft_size_for(sample_rate: f64) -> usize {
    ((6.0 * sample_rate / F0_FLOOR).ceil() as usize + 1).next_power_of_two()
}

/// Instantaneous frequency near `f0` at `centre`, from the phase advance of
/// a windowed single-bin DFT shifted by one sample.
///
/// Returns `None` when the frame carries no energy at `f0` or the result
/// strays more than 5% from `f0`.
pub(crate) fn refine_f0(samples: &[f64], centre: f64, f0: f64, sample_rate: f64) -> Option<f64> {
    let len = ((4.0 * sample_rate / f0).round() as usize).max(8);
    let window = hann_window_symmetric(len);
    let start = centre.round() as i64 - (len / 2) as i64;
    let omega = TAU * f0 / sample_rate;

    let mut current = Complex::new(0.0, 0.0);
    let mut shifted = Complex::new(0.0, 0.0);
    for (n, &w) in window.iter().enumerate() {
        let basis = Complex::from_polar(w, -omega * n as f64);
        let pos = start + n as i64;
        current += basis * sample_at(samples, pos);
        shifted += basis * sample_at(samples, pos + 1);
    }
    if current.norm() < 1e-9 {
        return None;
    }

    let advance = (shifted * current.conj()).arg();
    let refined = advance * sample_rate / TAU;
    (refined > 0.0 && (refined / f0 - 1.0).abs() <= REFINE_TOLERANCE).then_some(refined)
}

fn sample_at(samples: &[f64], pos: i64) -> f64 {
    usize::try_from(pos)
        .ok()
        .and_then(|p| samples.get(p))
        .copied()
        .unwrap_or(0.0)
}

/// Windowed power spectra at a fixed FFT length.
struct PowerSpectrum {
    fft_size: usize,
    forward: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl PowerSpectrum {
    fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        Self {
            fft_size,
            forward: planner.plan_fft_forward(fft_size),
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    /// Power of a Hann window of `periods / f0` seconds centred on `centre`,
    /// normalized by the window energy. Bins `0..=fft_size / 2`.
    fn power(&mut self, samples: &[f64], centre: f64, f0: f64, periods: f64, sr: f64) -> Vec<f64> {
        let len = ((periods * sr / f0).round() as usize).clamp(4, self.fft_size);
        let window = hann_window_symmetric(len);
        let energy: f64 = window.iter().map(|w| w * w).sum();
        let start = centre.round() as i64 - (len / 2) as i64;

        self.scratch.fill(Complex::new(0.0, 0.0));
        for (n, (bin, &w)) in self.scratch.iter_mut().zip(&window).enumerate() {
            *bin = Complex::new(w * sample_at(samples, start + n as i64), 0.0);
        }
        self.forward.process(&mut self.scratch);

        self.scratch[..=self.fft_size / 2]
            .iter()
            .map(|c| c.norm_sqr() / energy)
            .collect()
    }

    /// Three-period power spectrum averaged over a band one `f0` wide.
    fn envelope(&mut self, samples: &[f64], centre: f64, f0: f64, sr: f64) -> Vec<f64> {
        let power = self.power(samples, centre, f0, 3.0, sr);
        let half_width = (f0 * self.fft_size as f64 / sr / 2.0).round() as usize;

        let mut prefix = Vec::with_capacity(power.len() + 1);
        prefix.push(0.0);
        for &p in &power {
            let last = prefix[prefix.len() - 1];
            prefix.push(last + p);
        }

        let top = power.len() - 1;
        (0..power.len())
            .map(|k| {
                let lo = k.saturating_sub(half_width);
                let hi = (k + half_width).min(top);
                (prefix[hi + 1] - prefix[lo]) / (hi + 1 - lo) as f64
            })
            .collect()
    }

    /// Six-period spectrum, per harmonic band: the band's lowest power over
    /// its highest. Bins past the last complete band stay at 1.0.
    fn aperiodicity(&mut self, samples: &[f64], centre: f64, f0: f64, sr: f64) -> Vec<f64> {
        let power = self.power(samples, centre, f0, 6.0, sr);
        let top = power.len() - 1;
        let bin_f0 = f0 * self.fft_size as f64 / sr;
        let mut ap = vec![1.0; power.len()];

        for harmonic in 1.. {
            let lo = ((harmonic as f64 - 0.5) * bin_f0).floor() as usize;
            let hi = ((harmonic as f64 + 0.5) * bin_f0).ceil() as usize;
            if hi > top || lo >= hi {
                break;
            }
            let band = &power[lo..=hi];
            let peak = band.iter().copied().fold(0.0, f64::max);
            let trough = band.iter().copied().fold(f64::INFINITY, f64::min);
            let ratio = if peak > 0.0 { trough / peak } else { 1.0 };
            let ratio = ratio.clamp(MIN_APERIODICITY, 1.0);

            let from = if harmonic == 1 { 0 } else { lo };
            ap[from..=hi].fill(ratio);
        }
        ap
    }
}
