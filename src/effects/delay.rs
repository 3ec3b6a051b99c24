//! Echo with a fixed number of decaying repeats.

use crate::AudioBuffer;
use crate::dsp::normalize;

/// Multi-tap echo.
///
/// Each repeat `k` adds the input delayed by `k * delay_time` and scaled by
/// `decay^k`:
///
/// `out[n] = in[n] + sum(k = 1..=repeats) decay^k * in[n - k * d]`
///
/// where `d = round(delay_time * sample_rate)`. The output keeps the input
/// length (echoes past the end are cut) and is peak-normalized.
///
/// # Examples
///
/// ```
/// use voxshift::{AudioBuffer, effects::DelayLine};
///
/// let input = AudioBuffer::new(vec![1.0, 0.0, 0.0, 0.0], 4);
/// let output = DelayLine::new(0.5, 1, 0.5).process(input);
/// assert_eq!(output.samples(), &[1.0, 0.0, 0.5, 0.0]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(from = "DelaySettings")]
pub struct DelayLine {
    /// Time between repeats in seconds
    pub delay_time: f64,
    /// Number of echoes after the dry signal
    pub repeats: u32,
    /// Gain applied per repeat (0.0 to 1.0)
    pub decay: f64,
}

impl DelayLine {
    /// Creates a new echo.
    ///
    /// # Arguments
    ///
    /// * `delay_time` - Time between repeats in seconds (negative values act as 0)
    /// * `repeats` - Number of echoes
    /// * `decay` - Gain per repeat, clamped to 0.0..=1.0
    pub fn new(delay_time: f64, repeats: u32, decay: f64) -> Self {
        Self {
            delay_time: delay_time.max(0.0),
            repeats,
            decay: if decay.is_nan() { 0.0 } else { decay.clamp(0.0, 1.0) },
        }
    }

    /// Three repeats 300 ms apart, each at half the level of the last.
    pub fn echo() -> Self {
        Self::new(0.3, 3, 0.5)
    }

    /// A single short echo 75 ms after the dry signal.
    pub fn slapback() -> Self {
        Self::new(0.075, 1, 0.4)
    }

    /// Delay between repeats in whole samples.
    pub fn delay_samples(&self, sample_rate: u32) -> usize {
        (self.delay_time.max(0.0) * f64::from(sample_rate)).round() as usize
    }

    /// Applies the echo and peak-normalizes the result.
    pub fn process(&self, buffer: AudioBuffer) -> AudioBuffer {
        let delay = self.delay_samples(buffer.sample_rate());
        let input = buffer.samples();
        let mut output = input.to_vec();

        let mut gain = 1.0;
        for k in 1..=self.repeats as usize {
            gain *= self.decay;
            let offset = k.saturating_mul(delay);
            if offset >= input.len() {
                break;
            }
            for (out, &dry) in output[offset..].iter_mut().zip(input) {
                *out += gain * dry;
            }
        }

        normalize(&mut output);
        buffer.with_samples(output)
    }
}

impl Default for DelayLine {
    fn default() -> Self {
        Self::echo()
    }
}

/// `[echo]` as written in a config file, before clamping.
#[derive(serde::Deserialize)]
#[serde(default)]
struct DelaySettings {
    delay_time: f64,
    repeats: u32,
    decay: f64,
}

impl Default for DelaySettings {
    fn default() -> Self {
        let echo = DelayLine::echo();
        Self {
            delay_time: echo.delay_time,
            repeats: echo.repeats,
            decay: echo.decay,
        }
    }
}

impl From<DelaySettings> for DelayLine {
    fn from(settings: DelaySettings) -> Self {
        Self::new(settings.delay_time, settings.repeats, settings.decay)
    }
}
