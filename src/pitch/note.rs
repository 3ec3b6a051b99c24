//! Note names, MIDI numbers and frequencies.

use std::str::FromStr;

use crate::error::EffectError;

/// Reference pitch: A4 = MIDI 69 = 440 Hz.
const A4_MIDI: f64 = 69.0;
const A4_HZ: f64 = 440.0;

/// Converts a frequency in Hz to a continuous MIDI pitch.
///
/// `p = 69 + 12 * log2(f / 440)`. Non-positive frequencies have no pitch and
/// return `None`.
///
/// # Examples
///
/// ```
/// use voxshift::pitch::hz_to_midi;
///
/// assert_eq!(hz_to_midi(440.0), Some(69.0));
/// assert!((hz_to_midi(261.63).unwrap() - 60.0).abs() < 0.01);
/// assert_eq!(hz_to_midi(0.0), None);
/// ```
pub fn hz_to_midi(hz: f64) -> Option<f64> {
    (hz > 0.0 && hz.is_finite()).then(|| A4_MIDI + 12.0 * (hz / A4_HZ).log2())
}

/// Converts a (possibly fractional) MIDI pitch to Hz.
///
/// # Examples
///
/// ```
/// use voxshift::pitch::midi_to_hz;
///
/// assert_eq!(midi_to_hz(69.0), 440.0);
/// assert!((midi_to_hz(57.0) - 220.0).abs() < 1e-9);
/// ```
pub fn midi_to_hz(midi: f64) -> f64 {
    A4_HZ * 2.0_f64.powf((midi - A4_MIDI) / 12.0)
}

/// Frequency ratio of a shift in semitones.
pub fn semitones_to_ratio(semitones: f64) -> f64 {
    2.0_f64.powf(semitones / 12.0)
}

/// The twelve pitch classes, sharps only.
///
/// # Examples
///
/// ```
/// use voxshift::pitch::PitchClass;
///
/// let class: PitchClass = "Bb".parse().unwrap();
/// assert_eq!(class, PitchClass::ASharp);
/// assert_eq!(class.semitone(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// Semitone offset from C (0-11).
    pub fn semitone(&self) -> u8 {
        match self {
            PitchClass::C => 0,
            PitchClass::CSharp => 1,
            PitchClass::D => 2,
            PitchClass::DSharp => 3,
            PitchClass::E => 4,
            PitchClass::F => 5,
            PitchClass::FSharp => 6,
            PitchClass::G => 7,
            PitchClass::GSharp => 8,
            PitchClass::A => 9,
            PitchClass::ASharp => 10,
            PitchClass::B => 11,
        }
    }

    /// MIDI note number of this class in the given octave, or `None` when the
    /// result falls outside 0-127.
    ///
    /// C4 (middle C) is 60; octaves run from -1 to 9.
    pub fn to_midi(&self, octave: i8) -> Option<u8> {
        let midi = (i16::from(octave) + 1) * 12 + i16::from(self.semitone());
        u8::try_from(midi).ok().filter(|m| *m <= 127)
    }
}

impl FromStr for PitchClass {
    type Err = EffectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "C" | "B#" => Ok(PitchClass::C),
            "C#" | "DB" => Ok(PitchClass::CSharp),
            "D" => Ok(PitchClass::D),
            "D#" | "EB" => Ok(PitchClass::DSharp),
            "E" | "FB" => Ok(PitchClass::E),
            "F" | "E#" => Ok(PitchClass::F),
            "F#" | "GB" => Ok(PitchClass::FSharp),
            "G" => Ok(PitchClass::G),
            "G#" | "AB" => Ok(PitchClass::GSharp),
            "A" => Ok(PitchClass::A),
            "A#" | "BB" => Ok(PitchClass::ASharp),
            "B" | "CB" => Ok(PitchClass::B),
            _ => Err(invalid_note(s, "unknown pitch class")),
        }
    }
}

/// Parses a note name such as `"C4"`, `"F#3"` or `"Bb"` into a MIDI number.
///
/// The octave defaults to 4. This is the runtime counterpart of the
/// [`note!`](crate::note) macro, used for names that come from configuration.
///
/// # Examples
///
/// ```
/// use voxshift::pitch::parse_note;
///
/// assert_eq!(parse_note("C4").unwrap(), 60);
/// assert_eq!(parse_note("A").unwrap(), 69);
/// assert!(parse_note("H2").is_err());
/// ```
pub fn parse_note(name: &str) -> Result<u8, EffectError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(invalid_note(name, "empty note name"));
    }

    let octave_start = trimmed.chars().position(|c| c.is_ascii_digit() || c == '-');
    let (class_str, octave) = match octave_start {
        Some(0) => return Err(invalid_note(name, "missing pitch class")),
        Some(pos) => {
            let octave = trimmed[pos..]
                .parse::<i8>()
                .map_err(|_| invalid_note(name, "invalid octave"))?;
            if !(-1..=9).contains(&octave) {
                return Err(invalid_note(name, "octave out of range (-1 to 9)"));
            }
            (&trimmed[..pos], octave)
        }
        None => (trimmed, 4),
    };

    let class: PitchClass = class_str.parse().map_err(|_| invalid_note(name, "unknown pitch class"))?;
    class
        .to_midi(octave + octave_carry(class_str))
        .ok_or_else(|| invalid_note(name, "outside the MIDI range"))
}

/// B# is C of the octave above and Cb is B of the octave below.
fn octave_carry(class: &str) -> i8 {
    match class.to_uppercase().as_str() {
        "B#" => 1,
        "CB" => -1,
        _ => 0,
    }
}

fn invalid_note(name: &str, reason: &str) -> EffectError {
    EffectError::InvalidNote {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
