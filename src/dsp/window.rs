//! Window functions for framed analysis and overlap-add.

use std::f64::consts::TAU;

/// Periodic Hann window of the given length.
///
/// The periodic form (denominator `len`, not `len - 1`) sums to a constant
/// when overlapped at hops of `len / 2` or `len / 4`, which is what the
/// overlap-add stages rely on.
///
/// # Examples
///
/// ```
/// use voxshift::dsp::hann_window;
///
/// let window = hann_window(4);
/// assert_eq!(window[0], 0.0);
/// assert!((window[2] - 1.0).abs() < 1e-12);
/// ```
pub fn hann_window(len: usize) -> Vec<f64> {
    if len == 0 {
        return Vec::new();
    }
    (0..len)
        .map(|i| 0.5 * (1.0 - (TAU * i as f64 / len as f64).cos()))
        .collect()
}

/// Symmetric Hann window, used for the short analysis windows centred on a
/// single instant.
pub fn hann_window_symmetric(len: usize) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => (0..len)
            .map(|i| 0.5 * (1.0 - (TAU * i as f64 / (len - 1) as f64).cos()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_periodic_hann_overlap_sum_is_constant() {
        let len = 1024;
        let hop = len / 4;
        let window = hann_window(len);
        for offset in 0..hop {
            let sum: f64 = (0..4).map(|k| window[offset + k * hop]).sum();
            assert!((sum - 2.0).abs() < 1e-9, "sum {} at {}", sum, offset);
        }
    }

    #[test]
    fn test_symmetric_hann_endpoints() {
        let window = hann_window_symmetric(5);
        assert_eq!(window.len(), 5);
        assert!(window[0].abs() < 1e-12);
        assert!(window[4].abs() < 1e-12);
        assert!((window[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_lengths() {
        assert!(hann_window(0).is_empty());
        assert_eq!(hann_window_symmetric(1), vec![1.0]);
    }
}
