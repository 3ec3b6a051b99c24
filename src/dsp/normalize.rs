//! Peak normalization with guards for silence, clipping and NaN.

/// How a pipeline's output is brought back into range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// Scale so the peak magnitude is exactly 1.0.
    Peak,
    /// Only scale down, and only when the peak exceeds 1.0.
    Limit,
}

impl Normalization {
    /// Applies this normalization in place.
    pub fn apply(self, samples: &mut [f64]) {
        match self {
            Normalization::Peak => normalize(samples),
            Normalization::Limit => limit(samples),
        }
    }
}

/// Largest absolute value among the finite samples; 0.0 for an empty slice.
pub fn peak(samples: &[f64]) -> f64 {
    samples
        .iter()
        .filter(|s| s.is_finite())
        .fold(0.0_f64, |acc, s| acc.max(s.abs()))
}

/// Replaces NaN and infinite samples with silence.
///
/// Returns the number of samples that were replaced.
pub fn sanitize(samples: &mut [f64]) -> usize {
    let mut replaced = 0;
    for sample in samples.iter_mut() {
        if !sample.is_finite() {
            *sample = 0.0;
            replaced += 1;
        }
    }
    replaced
}

/// Scales the samples so the peak magnitude is 1.0.
///
/// Non-finite samples are zeroed first. An all-zero slice is left untouched,
/// so the output is all-zero only if the input was.
///
/// # Examples
///
/// ```
/// use voxshift::dsp::normalize;
///
/// let mut samples = vec![0.25, -0.5, 0.1];
/// normalize(&mut samples);
/// assert_eq!(samples, vec![0.5, -1.0, 0.2]);
/// ```
pub fn normalize(samples: &mut [f64]) {
    sanitize(samples);
    let peak = peak(samples);
    if peak > 0.0 {
        for sample in samples.iter_mut() {
            *sample /= peak;
        }
    }
}

/// Scales the samples down to a peak of 1.0 if, and only if, they clip.
///
/// Samples already within range are returned bit-for-bit unchanged.
pub fn limit(samples: &mut [f64]) {
    sanitize(samples);
    let peak = peak(samples);
    if peak > 1.0 {
        for sample in samples.iter_mut() {
            *sample /= peak;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_peak_is_one() {
        let mut samples = vec![0.1, -0.3, 0.2, 1e-7];
        normalize(&mut samples);
        assert!((peak(&samples) - 1.0).abs() < 1e-12);
        assert!(samples.iter().all(|s| s.abs() <= 1.0 + 1e-12));
    }

    #[test]
    fn test_normalize_tiny_input() {
        let mut samples = vec![1e-300, -2e-300, 0.0];
        normalize(&mut samples);
        assert!(samples.iter().all(|s| s.is_finite()));
        assert!((peak(&samples) - 1.0).abs() < 1e-12);
        assert_eq!(samples[2], 0.0);
    }

    #[test]
    fn test_normalize_zero_stays_zero() {
        let mut samples = vec![0.0; 64];
        normalize(&mut samples);
        assert!(samples.iter().all(|&s| s == 0.0));

        let mut empty: Vec<f64> = vec![];
        normalize(&mut empty);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_normalize_scrubs_nan() {
        let mut samples = vec![f64::NAN, 0.5, f64::INFINITY, -0.25];
        normalize(&mut samples);
        assert_eq!(samples, vec![0.0, 1.0, 0.0, -0.5]);
    }

    #[test]
    fn test_limit_leaves_in_range_untouched() {
        let original = vec![0.3, -0.9, 0.123_456_789];
        let mut samples = original.clone();
        limit(&mut samples);
        assert_eq!(samples, original);
    }

    #[test]
    fn test_limit_scales_clipping() {
        let mut samples = vec![2.0, -4.0, 1.0];
        limit(&mut samples);
        assert_eq!(samples, vec![0.5, -1.0, 0.25]);
    }

    #[test]
    fn test_sanitize_counts() {
        let mut samples = vec![f64::NAN, 1.0, f64::NEG_INFINITY];
        assert_eq!(sanitize(&mut samples), 2);
        assert_eq!(samples, vec![0.0, 1.0, 0.0]);
    }
}
