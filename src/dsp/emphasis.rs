//! Pre-emphasis and soft saturation applied to whole buffers.

/// Applies the first-order pre-emphasis filter `y[n] = x[n] - coef * x[n-1]`.
///
/// The first sample is kept as is. Brightens the signal by tilting the
/// spectrum towards high frequencies; the robot effect uses it for its
/// metallic edge.
///
/// # Examples
///
/// ```
/// use voxshift::dsp::pre_emphasis;
///
/// let mut samples = vec![1.0, 1.0, 1.0];
/// pre_emphasis(&mut samples, 0.5);
/// assert_eq!(samples, vec![1.0, 0.5, 0.5]);
/// ```
pub fn pre_emphasis(samples: &mut [f64], coef: f64) {
    let mut previous = match samples.first() {
        Some(&first) => first,
        None => return,
    };
    for sample in samples.iter_mut().skip(1) {
        let current = *sample;
        *sample = current - coef * previous;
        previous = current;
    }
}

/// Soft-clips every sample with `tanh(drive * x)`.
///
/// At low drive this adds warmth; at higher drive it flattens peaks and adds
/// odd harmonics. Output is always within [-1, 1].
pub fn saturate(samples: &mut [f64], drive: f64) {
    for sample in samples.iter_mut() {
        *sample = (*sample * drive).tanh();
    }
}
