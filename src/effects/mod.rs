//! Audio effects applied to whole buffers.
//!
//! Structural effects (delay, reverse, resample) work directly on samples;
//! timbral effects (robot, rough) are [`SpectralTransform`]s run by the
//! [`SpectralFrameProcessor`].

mod delay;
mod resample;
mod reverse;
mod robot;
mod rough;
mod spectral;

pub use delay::DelayLine;
pub use resample::{RateConverter, varispeed};
pub use reverse::reverse;
pub use robot::RobotVoice;
pub use rough::{RoughSettings, RoughVoice};
pub use spectral::{FrameContext, SpectralFrameProcessor, SpectralTransform};
