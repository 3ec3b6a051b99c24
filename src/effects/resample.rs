//! Duration change by resampling.
//!
//! Both converters keep the reported sample rate and change the number of
//! samples instead: a buffer slowed down 2:1 plays back at the original rate
//! for twice as long (and an octave lower).

use rubato::{FftFixedIn, Resampler};
use tracing::debug;

use crate::AudioBuffer;
use crate::error::Result;

/// Input chunk size handed to the FFT resampler.
const CHUNK_SIZE: usize = 1024;

/// Rational-ratio resampler with an anti-aliasing filter.
///
/// Produces `round(len * up / down)` samples. Uses rubato's FFT resampler,
/// which band-limits before decimating, then removes the resampler's delay so
/// the output lines up with the input.
///
/// # Examples
///
/// ```
/// use voxshift::{AudioBuffer, effects::RateConverter};
///
/// let input = AudioBuffer::new(vec![0.0; 4_000], 16_000);
/// let slowed = RateConverter::slow().process(input).unwrap();
/// assert_eq!(slowed.len(), 8_000);
/// assert_eq!(slowed.sample_rate(), 16_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateConverter {
    up: usize,
    down: usize,
}

impl RateConverter {
    /// Creates a converter producing `up` output samples per `down` input
    /// samples. Zero terms are treated as 1.
    pub fn new(up: usize, down: usize) -> Self {
        Self {
            up: up.max(1),
            down: down.max(1),
        }
    }

    /// Twice as many samples: half speed, an octave down.
    pub fn slow() -> Self {
        Self::new(2, 1)
    }

    /// Half as many samples: double speed, an octave up.
    pub fn fast() -> Self {
        Self::new(1, 2)
    }

    pub fn ratio(&self) -> (usize, usize) {
        (self.up, self.down)
    }

    /// Number of samples produced for `len` input samples.
    pub fn output_len(&self, len: usize) -> usize {
        (len * self.up + self.down / 2) / self.down
    }

    /// Resamples the buffer, keeping its sample rate.
    pub fn process(&self, buffer: AudioBuffer) -> Result<AudioBuffer> {
        if self.up == self.down || buffer.is_empty() {
            return Ok(buffer);
        }

        let input = buffer.samples();
        let target = self.output_len(input.len());

        let mut resampler = FftFixedIn::<f64>::new(self.down, self.up, CHUNK_SIZE, 2, 1)?;
        let delay = resampler.output_delay();
        debug!(
            up = self.up,
            down = self.down,
            delay,
            target,
            "resampling buffer"
        );

        let mut output = Vec::with_capacity(target + delay + CHUNK_SIZE * self.up);
        let mut pos = 0;
        while output.len() < target + delay {
            let needed = resampler.input_frames_next();
            let mut chunk = vec![0.0; needed];
            if pos < input.len() {
                let end = (pos + needed).min(input.len());
                chunk[..end - pos].copy_from_slice(&input[pos..end]);
            }
            pos += needed;

            let waves = vec![chunk];
            let resampled = resampler.process(&waves, None)?;
            output.extend_from_slice(&resampled[0]);
        }

        output.drain(..delay);
        output.truncate(target);
        Ok(buffer.with_samples(output))
    }
}

/// Changes speed and pitch together by linear interpolation.
///
/// `rate < 1.0` stretches the buffer (slower and deeper), `rate > 1.0`
/// shortens it. Output length is `floor((len - 1) / rate) + 1`; non-positive
/// or non-finite rates return the buffer unchanged.
///
/// # Examples
///
/// ```
/// use voxshift::{AudioBuffer, effects::varispeed};
///
/// let deeper = varispeed(AudioBuffer::new(vec![0.0, 1.0], 8_000), 0.5);
/// assert_eq!(deeper.samples(), &[0.0, 0.5, 1.0]);
/// ```
pub fn varispeed(buffer: AudioBuffer, rate: f64) -> AudioBuffer {
    if !(rate.is_finite() && rate > 0.0) || buffer.len() < 2 {
        return buffer;
    }
    let input = buffer.samples();
    let last = input.len() - 1;
    let out_len = (last as f64 / rate).floor() as usize + 1;

    let output = (0..out_len)
        .map(|i| {
            let pos = i as f64 * rate;
            let index = (pos.floor() as usize).min(last);
            let frac = pos - index as f64;
            if index == last {
                input[last]
            } else {
                input[index] + (input[index + 1] - input[index]) * frac
            }
        })
        .collect();
    buffer.with_samples(output)
}
