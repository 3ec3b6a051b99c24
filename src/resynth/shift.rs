//! Per-frame pitch shifting with overlap-add.

use crate::AudioBuffer;
use crate::dsp::hann_window;
use crate::pitch::{CorrectionCurve, PitchContour};

/// Samples whose summed window weight is below this keep the input value.
const MIN_COVERAGE: f64 = 1e-3;

/// Shifts every voiced frame by its correction and overlap-adds the frames
/// back at the analysis hop.
///
/// A shifted frame is read from the buffer at `anchor + (j - L/2) * ratio`
/// with linear interpolation, so its pitch changes by `ratio`. The anchor is
/// the point within half a period of the frame centre that keeps every
/// shifted frame in phase with its neighbours: `anchor - ratio * centre` is a
/// whole number of periods of the frame's fundamental. Unvoiced or
/// uncorrected frames are copied.
pub fn frame_shift(buffer: &AudioBuffer, contour: &PitchContour, curve: &CorrectionCurve) -> Vec<f64> {
    let sample_rate = f64::from(buffer.sample_rate().max(1));
    let input = buffer.samples();
    let len = input.len();
    let frame_length = contour.frame_length();
    let hop = contour.hop_length();
    let window = hann_window(frame_length);

    let span = (contour.len().saturating_sub(1)) * hop + frame_length;
    let mut acc = vec![0.0; span.max(len)];
    let mut weight = vec![0.0; span.max(len)];
    let mut segment = vec![0.0; frame_length];

    for (i, frame) in contour.frames().iter().enumerate() {
        let start = i * hop;
        let shift = curve.get(i);
        if frame.voiced && frame.f0 > 0.0 && shift.abs() > 1e-6 {
            let ratio = curve.ratio(i);
            let centre = contour.frame_center(i);
            let period = sample_rate / frame.f0;
            let drift = centre * (1.0 - ratio);
            let anchor = centre * ratio + period * (drift / period).round();
            let half = frame_length as f64 / 2.0;
            for (j, out) in segment.iter_mut().enumerate() {
                *out = interpolate(input, anchor + (j as f64 - half) * ratio);
            }
        } else {
            for (j, out) in segment.iter_mut().enumerate() {
                *out = input.get(start + j).copied().unwrap_or(0.0);
            }
        }

        for (j, (&sample, &w)) in segment.iter().zip(&window).enumerate() {
            acc[start + j] += sample * w;
            weight[start + j] += w;
        }
    }

    (0..len)
        .map(|n| {
            if weight[n] > MIN_COVERAGE {
                acc[n] / weight[n]
            } else {
                input[n]
            }
        })
        .collect()
}

/// Linear interpolation of `samples` at a fractional position; zero outside.
fn interpolate(samples: &[f64], pos: f64) -> f64 {
    if pos < 0.0 || !pos.is_finite() {
        return 0.0;
    }
    let index = pos.floor() as usize;
    let frac = pos - index as f64;
    match (samples.get(index), samples.get(index + 1)) {
        (Some(&a), Some(&b)) => a + (b - a) * frac,
        (Some(&a), None) => a * (1.0 - frac),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::{PitchAnalyzer, PitchFrame};
    use std::f64::consts::TAU;

    fn sine(freq: f64, len: usize) -> AudioBuffer {
        let samples = (0..len)
            .map(|i| 0.5 * (TAU * freq * i as f64 / 16_000.0).sin())
            .collect();
        AudioBuffer::new(samples, 16_000)
    }

    #[test]
    fn test_interpolate() {
        let samples = [0.0, 1.0, 3.0];
        assert_eq!(interpolate(&samples, 0.5), 0.5);
        assert_eq!(interpolate(&samples, 1.25), 1.5);
        assert_eq!(interpolate(&samples, -0.1), 0.0);
        assert_eq!(interpolate(&samples, 9.0), 0.0);
    }

    #[test]
    fn test_zero_correction_is_transparent() {
        let input = sine(200.0, 6_000);
        let contour = PitchAnalyzer::default().analyze(&input);
        let curve = CorrectionCurve::flat(contour.len());
        let output = frame_shift(&input, &contour, &curve);
        assert_eq!(output.len(), input.len());
        for (out, inp) in output.iter().zip(input.samples()) {
            assert!((out - inp).abs() < 1e-9);
        }
    }

    #[test]
    fn test_shift_raises_pitch() {
        let input = sine(200.0, 16_000);
        let contour = PitchAnalyzer::default().analyze(&input);
        let curve = CorrectionCurve::new(vec![3.0; contour.len()]);
        let output = frame_shift(&input, &contour, &curve);
        assert_eq!(output.len(), 16_000);

        let shifted = PitchAnalyzer::default().analyze(&AudioBuffer::new(output, 16_000));
        let expected = 200.0 * 2.0_f64.powf(3.0 / 12.0);
        let f0 = shifted.median_f0().unwrap();
        assert!((f0 - expected).abs() < 4.0, "median {} vs {}", f0, expected);
    }

    #[test]
    fn test_unvoiced_frames_pass_through() {
        let input = sine(200.0, 4_096);
        let contour = PitchContour::new(
            vec![PitchFrame::unvoiced(0), PitchFrame::unvoiced(1)],
            2048,
            2048,
            16_000,
        );
        let curve = CorrectionCurve::new(vec![5.0, 5.0]);
        let output = frame_shift(&input, &contour, &curve);
        for (out, inp) in output.iter().zip(input.samples()) {
            assert!((out - inp).abs() < 1e-9);
        }
    }
}
