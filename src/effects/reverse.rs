//! Playback reversal.

use crate::AudioBuffer;

/// Returns the buffer with its samples in reverse order.
///
/// The sample rate is unchanged. Total: works on any buffer, including an
/// empty one.
///
/// # Examples
///
/// ```
/// use voxshift::{AudioBuffer, effects::reverse};
///
/// let reversed = reverse(AudioBuffer::new(vec![1.0, 2.0, 3.0], 8_000));
/// assert_eq!(reversed.samples(), &[3.0, 2.0, 1.0]);
/// ```
pub fn reverse(buffer: AudioBuffer) -> AudioBuffer {
    let sample_rate = buffer.sample_rate();
    let mut samples = buffer.into_samples();
    samples.reverse();
    AudioBuffer::new(samples, sample_rate)
}
