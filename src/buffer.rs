//! Owned mono audio buffer passed between pipeline stages.

use crate::error::{EffectError, Result};

/// An owned block of mono samples plus the rate they were recorded at.
///
/// Samples are `f64` in roughly [-1.0, 1.0]. Integer PCM is converted on
/// the way in by [`AudioBuffer::from_i16`] and [`AudioBuffer::from_i32`].
/// Every stage consumes a buffer and hands back a new one; buffers are never
/// shared between stages.
///
/// # Examples
///
/// ```
/// use voxshift::AudioBuffer;
///
/// let buffer = AudioBuffer::new(vec![0.0, 0.5, -0.5], 16_000);
/// assert_eq!(buffer.len(), 3);
/// assert_eq!(buffer.sample_rate(), 16_000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f64>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Creates a buffer from float samples.
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Creates a buffer from 16-bit PCM, scaling to [-1.0, 1.0).
    ///
    /// # Examples
    ///
    /// ```
    /// use voxshift::AudioBuffer;
    ///
    /// let buffer = AudioBuffer::from_i16(&[i16::MIN, 0, 16_384], 8_000);
    /// assert_eq!(buffer.samples(), &[-1.0, 0.0, 0.5]);
    /// ```
    pub fn from_i16(pcm: &[i16], sample_rate: u32) -> Self {
        let samples = pcm.iter().map(|&s| f64::from(s) / 32_768.0).collect();
        Self::new(samples, sample_rate)
    }

    /// Creates a buffer from integer PCM stored in `i32` with the given bit
    /// depth (e.g. 24-bit samples from a WAV reader).
    pub fn from_i32(pcm: &[i32], bits_per_sample: u16, sample_rate: u32) -> Self {
        let bits = bits_per_sample.clamp(1, 32);
        let max_value = (1u64 << (bits - 1)) as f64;
        let samples = pcm.iter().map(|&s| f64::from(s) / max_value).collect();
        Self::new(samples, sample_rate)
    }

    /// Converts the samples to 16-bit PCM, clipping anything outside [-1, 1].
    pub fn to_i16(&self) -> Vec<i16> {
        self.samples
            .iter()
            .map(|&s| {
                let s = if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 };
                (s * f64::from(i16::MAX)).round() as i16
            })
            .collect()
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f64] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds, or 0.0 when the sample rate is zero.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Largest absolute sample value. Non-finite samples are ignored.
    pub fn peak(&self) -> f64 {
        crate::dsp::peak(&self.samples)
    }

    /// Returns true when every sample is exactly zero (or the buffer is empty).
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0.0)
    }

    /// Replaces the samples, keeping the sample rate.
    pub fn with_samples(&self, samples: Vec<f64>) -> Self {
        Self::new(samples, self.sample_rate)
    }

    /// Checks that the buffer can be processed at all.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(EffectError::InvalidSampleRate);
        }
        if self.samples.is_empty() {
            return Err(EffectError::EmptyInput);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_i16_scaling() {
        let buffer = AudioBuffer::from_i16(&[i16::MIN, -16_384, 0, 16_384], 16_000);
        assert_eq!(buffer.samples(), &[-1.0, -0.5, 0.0, 0.5]);
    }

    #[test]
    fn test_from_i32_24_bit() {
        let buffer = AudioBuffer::from_i32(&[-8_388_608, 4_194_304], 24, 48_000);
        assert_eq!(buffer.samples(), &[-1.0, 0.5]);
    }

    #[test]
    fn test_to_i16_clips_and_zeroes_nan() {
        let buffer = AudioBuffer::new(vec![2.0, -2.0, f64::NAN, 0.0], 8_000);
        assert_eq!(buffer.to_i16(), vec![i16::MAX, -i16::MAX, 0, 0]);
    }

    #[test]
    fn test_duration() {
        let buffer = AudioBuffer::new(vec![0.0; 8_000], 16_000);
        assert_eq!(buffer.duration_secs(), 0.5);
        assert_eq!(AudioBuffer::new(vec![0.0; 10], 0).duration_secs(), 0.0);
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            AudioBuffer::new(vec![], 16_000).validate(),
            Err(EffectError::EmptyInput)
        ));
        assert!(matches!(
            AudioBuffer::new(vec![0.1], 0).validate(),
            Err(EffectError::InvalidSampleRate)
        ));
        assert!(AudioBuffer::new(vec![0.1], 16_000).validate().is_ok());
    }

    #[test]
    fn test_silence_and_peak() {
        let silent = AudioBuffer::new(vec![0.0; 4], 16_000);
        assert!(silent.is_silent());
        assert_eq!(silent.peak(), 0.0);

        let loud = AudioBuffer::new(vec![0.0, -0.8, 0.3], 16_000);
        assert!(!loud.is_silent());
        assert_eq!(loud.peak(), 0.8);
    }
}
