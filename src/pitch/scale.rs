//! Scales: which semitones a corrected pitch is allowed to land on.

use voxshift_macros::note;

use crate::error::{EffectError, Result};

/// Named scale shapes.
///
/// Deserializes from snake_case names such as `"major"` or
/// `"minor_pentatonic"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleKind {
    Major,
    Minor,
    Chromatic,
    MajorPentatonic,
    MinorPentatonic,
    Blues,
}

impl ScaleKind {
    /// Semitone offsets of the scale above its root.
    pub fn offsets(&self) -> &'static [u8] {
        match self {
            ScaleKind::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleKind::Minor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleKind::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            ScaleKind::MajorPentatonic => &[0, 2, 4, 7, 9],
            ScaleKind::MinorPentatonic => &[0, 3, 5, 7, 10],
            ScaleKind::Blues => &[0, 3, 5, 6, 7, 10],
        }
    }
}

/// A set of allowed semitone offsets within one octave, anchored at a root
/// MIDI note.
///
/// Offsets are strictly ascending and below 12. Once built, a scale cannot be
/// changed.
///
/// # Examples
///
/// ```
/// use voxshift::pitch::ScaleDefinition;
///
/// let c_major = ScaleDefinition::major(60);
/// assert_eq!(c_major.root(), 60);
/// assert_eq!(c_major.offsets(), &[0, 2, 4, 5, 7, 9, 11]);
///
/// assert!(ScaleDefinition::new(60, vec![0, 4, 4]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleDefinition {
    root: u8,
    offsets: Vec<u8>,
}

impl ScaleDefinition {
    /// Builds a scale from raw offsets.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::InvalidScale`] when the offsets are empty, not
    /// strictly ascending, reach 12 or above, or when the root is not a MIDI
    /// note.
    pub fn new(root: u8, offsets: Vec<u8>) -> Result<Self> {
        if root > 127 {
            return Err(EffectError::InvalidScale(format!(
                "root {} is outside the MIDI range",
                root
            )));
        }
        if offsets.is_empty() {
            return Err(EffectError::InvalidScale("no offsets".to_string()));
        }
        if offsets.iter().any(|&o| o >= 12) {
            return Err(EffectError::InvalidScale(format!(
                "offsets must be below 12, got {:?}",
                offsets
            )));
        }
        if offsets.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(EffectError::InvalidScale(format!(
                "offsets must be strictly ascending, got {:?}",
                offsets
            )));
        }
        Ok(Self { root, offsets })
    }

    /// One of the named scales on the given root.
    pub fn preset(kind: ScaleKind, root: u8) -> Self {
        Self {
            root: root.min(127),
            offsets: kind.offsets().to_vec(),
        }
    }

    pub fn major(root: u8) -> Self {
        Self::preset(ScaleKind::Major, root)
    }

    /// Natural minor.
    pub fn minor(root: u8) -> Self {
        Self::preset(ScaleKind::Minor, root)
    }

    pub fn chromatic(root: u8) -> Self {
        Self::preset(ScaleKind::Chromatic, root)
    }

    pub fn major_pentatonic(root: u8) -> Self {
        Self::preset(ScaleKind::MajorPentatonic, root)
    }

    pub fn minor_pentatonic(root: u8) -> Self {
        Self::preset(ScaleKind::MinorPentatonic, root)
    }

    pub fn blues(root: u8) -> Self {
        Self::preset(ScaleKind::Blues, root)
    }

    /// Root MIDI note.
    pub fn root(&self) -> u8 {
        self.root
    }

    pub fn offsets(&self) -> &[u8] {
        &self.offsets
    }

    /// Whether a MIDI note belongs to the scale, in any octave.
    pub fn contains(&self, midi: u8) -> bool {
        let offset = (i16::from(midi) - i16::from(self.root)).rem_euclid(12) as u8;
        self.offsets.contains(&offset)
    }
}

impl Default for ScaleDefinition {
    /// C major on middle C.
    fn default() -> Self {
        Self::major(note!("C4"))
    }
}
