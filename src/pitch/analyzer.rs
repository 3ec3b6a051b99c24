//! Frame-by-frame fundamental frequency estimation.
//!
//! Uses the YIN difference function: the squared difference between a frame
//! and a lagged copy of itself, normalized by its running mean so that the
//! first lag dipping below a threshold is the period.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use tracing::debug;

use crate::AudioBuffer;
use crate::error::{EffectError, Result};

/// One analysis frame of a [`PitchContour`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchFrame {
    /// Position of the frame in the contour
    pub index: usize,
    /// Estimated fundamental in Hz, 0.0 when unvoiced
    pub f0: f64,
    pub voiced: bool,
    /// Periodicity of the frame in [0, 1]
    pub confidence: f64,
}

impl PitchFrame {
    /// An unvoiced frame.
    pub fn unvoiced(index: usize) -> Self {
        Self {
            index,
            f0: 0.0,
            voiced: false,
            confidence: 0.0,
        }
    }

    /// A voiced frame with full confidence.
    pub fn voiced(index: usize, f0: f64) -> Self {
        Self {
            index,
            f0,
            voiced: true,
            confidence: 1.0,
        }
    }
}

/// Per-frame pitch estimates over a buffer.
///
/// Frame `i` covers samples `[i * hop_length, i * hop_length + frame_length)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchContour {
    frames: Vec<PitchFrame>,
    frame_length: usize,
    hop_length: usize,
    sample_rate: u32,
}

impl PitchContour {
    pub fn new(
        frames: Vec<PitchFrame>,
        frame_length: usize,
        hop_length: usize,
        sample_rate: u32,
    ) -> Self {
        Self {
            frames,
            frame_length,
            hop_length: hop_length.max(1),
            sample_rate,
        }
    }

    pub fn frames(&self) -> &[PitchFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Sample position of the centre of frame `index`.
    pub fn frame_center(&self, index: usize) -> f64 {
        (index * self.hop_length) as f64 + self.frame_length as f64 / 2.0
    }

    pub fn voiced_count(&self) -> usize {
        self.frames.iter().filter(|f| f.voiced).count()
    }

    pub fn has_voiced(&self) -> bool {
        self.frames.iter().any(|f| f.voiced)
    }

    /// Median fundamental of the voiced frames, if any.
    pub fn median_f0(&self) -> Option<f64> {
        let voiced: Vec<f64> = self
            .frames
            .iter()
            .filter(|f| f.voiced)
            .map(|f| f.f0)
            .collect();
        median(voiced)
    }
}

/// Median of a set of finite values; `None` when empty.
pub(crate) fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// YIN pitch tracker.
///
/// # Examples
///
/// ```
/// use std::f64::consts::TAU;
/// use voxshift::AudioBuffer;
/// use voxshift::pitch::PitchAnalyzer;
///
/// let samples = (0..16_000)
///     .map(|i| 0.5 * (TAU * 220.0 * i as f64 / 16_000.0).sin())
///     .collect();
/// let contour = PitchAnalyzer::default().analyze(&AudioBuffer::new(samples, 16_000));
///
/// let f0 = contour.median_f0().unwrap();
/// assert!((f0 - 220.0).abs() < 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct PitchAnalyzer {
    /// Analysis frame length in samples
    pub frame_length: usize,
    /// Distance between frame starts in samples
    pub hop_length: usize,
    /// Lowest detectable fundamental in Hz
    pub fmin: f64,
    /// Highest detectable fundamental in Hz
    pub fmax: f64,
    /// YIN absolute threshold on the normalized difference
    pub threshold: f64,
    /// Frames with a lower confidence are unvoiced
    pub voicing_threshold: f64,
    /// Frames with a lower RMS are silent
    pub silence_rms: f64,
}

impl Default for PitchAnalyzer {
    fn default() -> Self {
        Self {
            frame_length: 2048,
            hop_length: 512,
            fmin: 65.0,
            fmax: 2_000.0,
            threshold: 0.15,
            voicing_threshold: 0.7,
            silence_rms: 1e-4,
        }
    }
}

impl PitchAnalyzer {
    /// Analyzer with custom framing and default detection settings.
    pub fn new(frame_length: usize, hop_length: usize) -> Self {
        Self {
            frame_length,
            hop_length,
            ..Self::default()
        }
    }

    /// Number of frames produced for `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        let frame = self.frame_length.max(1);
        let hop = self.hop_length.max(1);
        match len {
            0 => 0,
            n if n < frame => 1,
            n => (n - frame) / hop + 1,
        }
    }

    /// Checks that the settings describe a usable search range.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::InvalidConfig`] unless `0 < fmin < fmax`,
    /// `hop_length > 0` and `frame_length >= 4`.
    pub fn validate(&self) -> Result<()> {
        if !(self.fmin.is_finite() && self.fmax.is_finite() && 0.0 < self.fmin && self.fmin < self.fmax) {
            return Err(EffectError::InvalidConfig(format!(
                "analysis needs 0 < fmin < fmax, got fmin = {} and fmax = {}",
                self.fmin, self.fmax
            )));
        }
        if self.hop_length == 0 {
            return Err(EffectError::InvalidConfig("analysis hop_length must be positive".into()));
        }
        if self.frame_length < 4 {
            return Err(EffectError::InvalidConfig(format!(
                "analysis frame_length must be at least 4, got {}",
                self.frame_length
            )));
        }
        Ok(())
    }

    /// Estimates a pitch for every frame of `buffer`.
    ///
    /// Never fails: silent or noisy frames come back unvoiced.
    pub fn analyze(&self, buffer: &AudioBuffer) -> PitchContour {
        let frame_length = self.frame_length.max(4);
        let hop = self.hop_length.max(1);
        let sample_rate = buffer.sample_rate();
        let count = self.frame_count(buffer.len());

        if count == 0 || sample_rate == 0 {
            return PitchContour::new(
                (0..count).map(PitchFrame::unvoiced).collect(),
                frame_length,
                hop,
                sample_rate,
            );
        }

        let sr = f64::from(sample_rate);
        let max_lag = frame_length / 2;
        let tau_min = ((sr / self.fmax).floor() as usize).max(2);
        let tau_max = ((sr / self.fmin).ceil() as usize).min(max_lag.saturating_sub(1));

        let mut yin = YinFrame::new(frame_length, tau_max);
        let samples = buffer.samples();
        let mut frame = vec![0.0; frame_length];

        let frames = (0..count)
            .map(|index| {
                let start = index * hop;
                let end = (start + frame_length).min(samples.len());
                frame.fill(0.0);
                frame[..end - start].copy_from_slice(&samples[start..end]);

                let rms = (frame.iter().map(|x| x * x).sum::<f64>() / frame_length as f64).sqrt();
                if rms < self.silence_rms || tau_max <= tau_min.saturating_add(1) {
                    return PitchFrame::unvoiced(index);
                }

                let Some((lag, confidence)) = yin.estimate(&frame, tau_min, self.threshold) else {
                    return PitchFrame::unvoiced(index);
                };
                let f0 = sr / lag;
                if confidence < self.voicing_threshold || f0 < self.fmin || f0 > self.fmax {
                    PitchFrame {
                        confidence,
                        ..PitchFrame::unvoiced(index)
                    }
                } else {
                    PitchFrame {
                        index,
                        f0,
                        voiced: true,
                        confidence,
                    }
                }
            })
            .collect::<Vec<_>>();

        let contour = PitchContour::new(frames, frame_length, hop, sample_rate);
        debug!(
            frames = contour.len(),
            voiced = contour.voiced_count(),
            "pitch analysis done"
        );
        contour
    }
}

/// Scratch space for the YIN difference function of one frame length.
struct YinFrame {
    fft_size: usize,
    integration: usize,
    tau_max: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    spectrum: Vec<Complex<f64>>,
    head: Vec<Complex<f64>>,
    diff: Vec<f64>,
    cmnd: Vec<f64>,
}

impl YinFrame {
    fn new(frame_length: usize, tau_max: usize) -> Self {
        let fft_size = frame_length.next_power_of_two();
        let mut planner = FftPlanner::<f64>::new();
        Self {
            fft_size,
            integration: frame_length - tau_max,
            tau_max,
            forward: planner.plan_fft_forward(fft_size),
            inverse: planner.plan_fft_inverse(fft_size),
            spectrum: vec![Complex::new(0.0, 0.0); fft_size],
            head: vec![Complex::new(0.0, 0.0); fft_size],
            diff: vec![0.0; tau_max + 1],
            cmnd: vec![1.0; tau_max + 1],
        }
    }

    /// Best lag (fractional) and its confidence, or `None` for a flat frame.
    fn estimate(&mut self, frame: &[f64], tau_min: usize, threshold: f64) -> Option<(f64, f64)> {
        self.difference(frame);

        let mut running = 0.0;
        self.cmnd[0] = 1.0;
        for tau in 1..=self.tau_max {
            running += self.diff[tau];
            self.cmnd[tau] = if running > 0.0 {
                self.diff[tau] * tau as f64 / running
            } else {
                1.0
            };
        }

        let range = tau_min..=self.tau_max;
        let mut best = range.clone().find(|&tau| self.cmnd[tau] < threshold);
        if let Some(mut tau) = best {
            while tau < self.tau_max && self.cmnd[tau + 1] < self.cmnd[tau] {
                tau += 1;
            }
            best = Some(tau);
        } else {
            best = range.min_by(|&a, &b| self.cmnd[a].total_cmp(&self.cmnd[b]));
        }
        let tau = best?;

        let lag = self.refine(tau);
        let confidence = (1.0 - self.cmnd[tau]).clamp(0.0, 1.0);
        Some((lag, confidence))
    }

    /// `d(tau) = sum_j (x[j] - x[j + tau])^2` over the integration window,
    /// expanded into energies and a cross-correlation computed by FFT.
    fn difference(&mut self, frame: &[f64]) {
        let w = self.integration;

        let mut prefix = Vec::with_capacity(frame.len() + 1);
        prefix.push(0.0);
        for &x in frame {
            let last = prefix[prefix.len() - 1];
            prefix.push(last + x * x);
        }

        for (i, bin) in self.spectrum.iter_mut().enumerate() {
            *bin = Complex::new(frame.get(i).copied().unwrap_or(0.0), 0.0);
        }
        for (i, bin) in self.head.iter_mut().enumerate() {
            *bin = Complex::new(if i < w { frame[i] } else { 0.0 }, 0.0);
        }
        self.forward.process(&mut self.spectrum);
        self.forward.process(&mut self.head);
        for (x, a) in self.spectrum.iter_mut().zip(&self.head) {
            *x *= a.conj();
        }
        self.inverse.process(&mut self.spectrum);

        let scale = 1.0 / self.fft_size as f64;
        let energy_head = prefix[w];
        for tau in 0..=self.tau_max {
            let energy_lagged = prefix[tau + w] - prefix[tau];
            let cross = self.spectrum[tau].re * scale;
            self.diff[tau] = (energy_head + energy_lagged - 2.0 * cross).max(0.0);
        }
    }

    /// Parabolic interpolation of the minimum around `tau`.
    fn refine(&self, tau: usize) -> f64 {
        if tau == 0 || tau >= self.tau_max {
            return tau as f64;
        }
        let (a, b, c) = (self.cmnd[tau - 1], self.cmnd[tau], self.cmnd[tau + 1]);
        let denom = a - 2.0 * b + c;
        if denom.abs() < 1e-12 {
            return tau as f64;
        }
        let shift = (0.5 * (a - c) / denom).clamp(-1.0, 1.0);
        tau as f64 + shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f64::consts::TAU;

    fn tone(freqs: &[f64], sample_rate: u32, len: usize) -> AudioBuffer {
        let samples = (0..len)
            .map(|i| {
                let t = i as f64 / f64::from(sample_rate);
                freqs
                    .iter()
                    .enumerate()
                    .map(|(h, f)| 0.5 / (h + 1) as f64 * (TAU * f * t).sin())
                    .sum()
            })
            .collect();
        AudioBuffer::new(samples, sample_rate)
    }

    #[test]
    fn test_validate_search_range() {
        assert!(PitchAnalyzer::default().validate().is_ok());
        for analyzer in [
            PitchAnalyzer { fmax: 0.0, ..PitchAnalyzer::default() },
            PitchAnalyzer { fmin: 500.0, fmax: 400.0, ..PitchAnalyzer::default() },
            PitchAnalyzer { fmin: f64::NAN, ..PitchAnalyzer::default() },
            PitchAnalyzer { hop_length: 0, ..PitchAnalyzer::default() },
            PitchAnalyzer { frame_length: 3, ..PitchAnalyzer::default() },
        ] {
            assert!(matches!(analyzer.validate(), Err(EffectError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_degenerate_range_is_unvoiced() {
        let input = AudioBuffer::new(
            (0..8_000).map(|i| 0.5 * (TAU * 220.0 * i as f64 / 16_000.0).sin()).collect(),
            16_000,
        );
        for analyzer in [
            PitchAnalyzer { fmax: 0.0, ..PitchAnalyzer::default() },
            PitchAnalyzer { fmin: -5.0, ..PitchAnalyzer::default() },
        ] {
            let contour = analyzer.analyze(&input);
            assert!(!contour.is_empty());
            assert!(!contour.has_voiced());
        }
    }

    #[test]
    fn test_frame_count() {
        let analyzer = PitchAnalyzer::new(2048, 512);
        assert_eq!(analyzer.frame_count(0), 0);
        assert_eq!(analyzer.frame_count(100), 1);
        assert_eq!(analyzer.frame_count(2048), 1);
        assert_eq!(analyzer.frame_count(2559), 1);
        assert_eq!(analyzer.frame_count(2560), 2);
        assert_eq!(analyzer.frame_count(16_000), 28);
    }

    #[test]
    fn test_pure_tones() {
        for freq in [110.0, 220.0, 440.0, 880.0] {
            let contour = PitchAnalyzer::default().analyze(&tone(&[freq], 16_000, 8_000));
            assert_eq!(contour.voiced_count(), contour.len());
            for frame in contour.frames() {
                let cents = 1_200.0 * (frame.f0 / freq).log2();
                assert!(cents.abs() < 5.0, "{} Hz read as {}", freq, frame.f0);
            }
        }
    }

    #[test]
    fn test_harmonic_tone_reports_fundamental() {
        let contour = PitchAnalyzer::default().analyze(&tone(&[150.0, 300.0, 450.0], 22_050, 11_025));
        let f0 = contour.median_f0().unwrap();
        assert!((f0 - 150.0).abs() < 1.0, "got {}", f0);
    }

    #[test]
    fn test_silence_is_unvoiced() {
        let contour = PitchAnalyzer::default().analyze(&AudioBuffer::new(vec![0.0; 10_000], 16_000));
        assert_eq!(contour.len(), 16);
        assert!(!contour.has_voiced());
        assert!(contour.frames().iter().all(|f| f.f0 == 0.0));
        assert_eq!(contour.median_f0(), None);
    }

    #[test]
    fn test_noise_is_mostly_unvoiced() {
        let mut noise = crate::dsp::GaussianNoise::with_rng(0.3, StdRng::seed_from_u64(3));
        let samples = (0..16_000).map(|_| noise.next_sample()).collect();
        let contour = PitchAnalyzer::default().analyze(&AudioBuffer::new(samples, 16_000));
        assert!(contour.voiced_count() * 4 < contour.len());
    }

    #[test]
    fn test_short_and_empty_input() {
        let short = PitchAnalyzer::default().analyze(&tone(&[300.0], 16_000, 1_500));
        assert_eq!(short.len(), 1);
        let empty = PitchAnalyzer::default().analyze(&AudioBuffer::new(vec![], 16_000));
        assert!(empty.is_empty());
    }

    #[test]
    fn test_frame_center_and_median() {
        let contour = PitchContour::new(
            vec![
                PitchFrame::voiced(0, 100.0),
                PitchFrame::unvoiced(1),
                PitchFrame::voiced(2, 300.0),
            ],
            1024,
            256,
            16_000,
        );
        assert_eq!(contour.frame_center(2), 1024.0);
        assert_eq!(contour.median_f0(), Some(200.0));
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
    }
}
