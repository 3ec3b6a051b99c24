//! WAV file reading and writing.

use std::path::Path;

use tracing::debug;

use crate::AudioBuffer;
use crate::error::{EffectError, Result};

/// Reads a WAV file into a mono buffer.
///
/// Integer and float PCM of any bit depth are accepted. Multi-channel files
/// are mixed down by averaging the channels of each frame.
///
/// # Errors
///
/// Returns [`EffectError::Wav`] when the file is missing or malformed and
/// [`EffectError::EmptyInput`] when it holds no samples.
pub fn read_wav(path: impl AsRef<Path>) -> Result<AudioBuffer> {
    let path = path.as_ref();
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let pcm: Vec<i32> = reader
                .samples::<i32>()
                .collect::<std::result::Result<_, _>>()?;
            AudioBuffer::from_i32(&pcm, spec.bits_per_sample, spec.sample_rate).into_samples()
        }
    };
    if interleaved.is_empty() {
        return Err(EffectError::EmptyInput);
    }

    let channels = usize::from(spec.channels.max(1));
    let samples = if channels > 1 {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f64>() / frame.len() as f64)
            .collect()
    } else {
        interleaved
    };

    debug!(
        path = %path.display(),
        channels,
        sample_rate = spec.sample_rate,
        samples = samples.len(),
        "wav read"
    );
    Ok(AudioBuffer::new(samples, spec.sample_rate))
}

/// Writes a buffer as 16-bit mono PCM, clipping anything outside [-1, 1].
pub fn write_wav(path: impl AsRef<Path>, buffer: &AudioBuffer) -> Result<()> {
    let path = path.as_ref();
    buffer.validate()?;
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for sample in buffer.to_i16() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    debug!(path = %path.display(), samples = buffer.len(), "wav written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("voxshift-{}-{}.wav", name, std::process::id()))
    }

    #[test]
    fn test_write_then_read() {
        let path = temp_path("mono");
        let input = AudioBuffer::new(vec![0.0, 0.5, -0.5, 0.25], 16_000);
        write_wav(&path, &input).unwrap();

        let output = read_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(output.sample_rate(), 16_000);
        assert_eq!(output.len(), 4);
        for (out, inp) in output.samples().iter().zip(input.samples()) {
            assert!((out - inp).abs() < 1e-3);
        }
    }

    #[test]
    fn test_stereo_float_is_mixed_down() {
        let path = temp_path("stereo");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for (left, right) in [(0.5f32, 0.25f32), (-1.0, 0.0)] {
            writer.write_sample(left).unwrap();
            writer.write_sample(right).unwrap();
        }
        writer.finalize().unwrap();

        let buffer = read_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(buffer.sample_rate(), 8_000);
        assert_eq!(buffer.samples(), &[0.375, -0.5]);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read_wav("/definitely/not/here.wav"),
            Err(EffectError::Wav(_))
        ));
    }

    #[test]
    fn test_write_rejects_empty_buffer() {
        let path = temp_path("empty");
        assert!(matches!(
            write_wav(&path, &AudioBuffer::new(vec![], 16_000)),
            Err(EffectError::EmptyInput)
        ));
    }
}
