//! Low-level sample utilities shared by the effects.
//!
//! - `normalize`: peak measurement, NaN scrubbing, peak normalization
//! - `window`: analysis/synthesis windows
//! - `emphasis`: pre-emphasis filter and tanh saturation
//! - `noise`: Gaussian noise with an injectable RNG

pub mod emphasis;
pub mod noise;
pub mod normalize;
pub mod window;

pub use emphasis::{pre_emphasis, saturate};
pub use noise::GaussianNoise;
pub use normalize::{Normalization, limit, normalize, peak, sanitize};
pub use window::hann_window;
