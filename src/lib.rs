//! Voxshift - voice message effects for Rust
//!
//! This library turns a recorded voice clip into a processed one: robot and
//! rough timbres, echo, speed changes, reversal and pitch correction to a
//! musical scale.
//!
//! The entry point is [`EffectDispatcher`], which looks an effect up by its
//! identifier, runs it, normalizes the result and falls back to the original
//! audio if anything goes wrong.
//!
//! ```
//! use voxshift::{AudioBuffer, EffectDispatcher, EffectKind};
//!
//! let samples = (0..8_000)
//!     .map(|i| 0.5 * (std::f64::consts::TAU * 220.0 * i as f64 / 16_000.0).sin())
//!     .collect();
//! let input = AudioBuffer::new(samples, 16_000);
//!
//! let outcome = EffectDispatcher::new().apply(input, EffectKind::Reverse);
//! assert!(!outcome.is_fallback());
//! assert_eq!(outcome.buffer.len(), 8_000);
//! ```

pub mod buffer;
pub mod config;
pub mod dispatch;
pub mod dsp;
pub mod effects;
pub mod error;
#[cfg(feature = "wav")]
pub mod io;
pub mod pitch;
pub mod resynth;
pub mod session;

// Re-export commonly used types at the crate root
pub use buffer::AudioBuffer;
pub use config::EngineConfig;
pub use dispatch::{EffectDispatcher, EffectKind, EffectOutcome, EffectSpec, EffectTable};
pub use error::{EffectError, Result};
pub use session::SessionStore;
pub use voxshift_macros::note;
