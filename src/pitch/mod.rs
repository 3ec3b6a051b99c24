//! Pitch analysis and scale correction.
//!
//! [`PitchAnalyzer`] turns a buffer into a [`PitchContour`];
//! [`NoteQuantizer`] turns the contour into a [`CorrectionCurve`] that the
//! resynthesis stage applies.

pub mod analyzer;
pub mod note;
pub mod quantizer;
pub mod scale;

pub use analyzer::{PitchAnalyzer, PitchContour, PitchFrame};
pub use note::{PitchClass, hz_to_midi, midi_to_hz, parse_note, semitones_to_ratio};
pub use quantizer::{CorrectionCurve, MAX_CORRECTION, NoteQuantizer, RootMode, Vibrato};
pub use scale::{ScaleDefinition, ScaleKind};
