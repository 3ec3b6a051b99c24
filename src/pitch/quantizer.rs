//! Snapping analyzed pitch onto a scale.

use std::f64::consts::TAU;

use tracing::debug;

use super::analyzer::{PitchContour, median};
use super::note::hz_to_midi;
use super::scale::ScaleDefinition;

/// Largest correction, in semitones, in either direction.
pub const MAX_CORRECTION: f64 = 36.0;

/// How the reference root of the scale is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RootMode {
    /// Use the scale's own root.
    #[default]
    Fixed,
    /// Keep the scale root's pitch class but move it to the octave nearest
    /// the median voiced pitch of the utterance.
    Median,
}

/// Periodic pitch wobble added to voiced frames.
///
/// Frame `i` of `n` gets `depth * sin(2π * cycles * i / n)` semitones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vibrato {
    /// Peak deviation in semitones
    pub depth: f64,
    /// Full cycles over the length of the contour
    pub cycles: f64,
}

impl Vibrato {
    pub fn new(depth: f64, cycles: f64) -> Self {
        Self { depth, cycles }
    }

    /// Vibrato term for frame `index` out of `total`.
    pub fn at(&self, index: usize, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        self.depth * (TAU * self.cycles * index as f64 / total as f64).sin()
    }
}

/// Per-frame pitch shifts in semitones, aligned with a [`PitchContour`].
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionCurve {
    shifts: Vec<f64>,
}

impl CorrectionCurve {
    /// Wraps raw shifts, clamping each to ±[`MAX_CORRECTION`]. Non-finite
    /// shifts become 0.
    pub fn new(shifts: Vec<f64>) -> Self {
        Self {
            shifts: shifts
                .into_iter()
                .map(|s| {
                    if s.is_finite() {
                        s.clamp(-MAX_CORRECTION, MAX_CORRECTION)
                    } else {
                        0.0
                    }
                })
                .collect(),
        }
    }

    /// A curve of `len` zero shifts.
    pub fn flat(len: usize) -> Self {
        Self {
            shifts: vec![0.0; len],
        }
    }

    pub fn shifts(&self) -> &[f64] {
        &self.shifts
    }

    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    /// Shift of frame `index`, 0.0 past the end.
    pub fn get(&self, index: usize) -> f64 {
        self.shifts.get(index).copied().unwrap_or(0.0)
    }

    /// Frequency ratio `2^(shift / 12)` of frame `index`.
    pub fn ratio(&self, index: usize) -> f64 {
        2.0_f64.powf(self.get(index) / 12.0)
    }
}

/// Turns a pitch contour into a correction curve.
///
/// Each voiced frame is moved toward the nearest tone of the scale by
/// `strength` (1.0 lands exactly on the tone), then shifted by `transpose`
/// semitones and given optional vibrato. Unvoiced frames get no correction.
///
/// # Examples
///
/// ```
/// use voxshift::pitch::{NoteQuantizer, PitchContour, PitchFrame, ScaleDefinition};
///
/// // 450 Hz sits just above A4 (440 Hz), which is in C major
/// let contour = PitchContour::new(vec![PitchFrame::voiced(0, 450.0)], 2048, 512, 16_000);
/// let curve = NoteQuantizer::new(ScaleDefinition::major(60), 1.0).quantize(&contour);
///
/// let expected = 12.0 * (440.0_f64 / 450.0).log2();
/// assert!((curve.get(0) - expected).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NoteQuantizer {
    scale: ScaleDefinition,
    strength: f64,
    root_mode: RootMode,
    transpose: f64,
    vibrato: Option<Vibrato>,
}

impl NoteQuantizer {
    pub fn new(scale: ScaleDefinition, strength: f64) -> Self {
        Self {
            scale,
            strength: strength.max(0.0),
            root_mode: RootMode::Fixed,
            transpose: 0.0,
            vibrato: None,
        }
    }

    pub fn with_root_mode(mut self, root_mode: RootMode) -> Self {
        self.root_mode = root_mode;
        self
    }

    /// Adds a constant shift, in semitones, to every voiced frame.
    pub fn with_transpose(mut self, semitones: f64) -> Self {
        self.transpose = semitones;
        self
    }

    pub fn with_vibrato(mut self, vibrato: Vibrato) -> Self {
        self.vibrato = Some(vibrato);
        self
    }

    pub fn scale(&self) -> &ScaleDefinition {
        &self.scale
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn root_mode(&self) -> RootMode {
        self.root_mode
    }

    pub fn transpose(&self) -> f64 {
        self.transpose
    }

    pub fn vibrato(&self) -> Option<Vibrato> {
        self.vibrato
    }

    /// Computes the correction of every frame of `contour`.
    pub fn quantize(&self, contour: &PitchContour) -> CorrectionCurve {
        let pitches: Vec<Option<f64>> = contour
            .frames()
            .iter()
            .map(|frame| {
                if frame.voiced {
                    hz_to_midi(frame.f0)
                } else {
                    None
                }
            })
            .collect();

        let root = self.reference_root(&pitches);
        let total = pitches.len();
        let shifts = pitches
            .iter()
            .enumerate()
            .map(|(i, pitch)| match pitch {
                Some(p) => {
                    let target = self.snap(*p, root);
                    let vibrato = self.vibrato.map_or(0.0, |v| v.at(i, total));
                    (target - p) * self.strength + self.transpose + vibrato
                }
                None => 0.0,
            })
            .collect();

        let curve = CorrectionCurve::new(shifts);
        debug!(root, frames = curve.len(), "pitch correction computed");
        curve
    }

    /// Root MIDI pitch used for the whole contour.
    fn reference_root(&self, pitches: &[Option<f64>]) -> f64 {
        let fixed = f64::from(self.scale.root());
        match self.root_mode {
            RootMode::Fixed => fixed,
            RootMode::Median => {
                match median(pitches.iter().flatten().copied().collect()) {
                    Some(m) => {
                        let class = fixed.rem_euclid(12.0);
                        class + 12.0 * ((m - class) / 12.0).round()
                    }
                    None => fixed,
                }
            }
        }
    }

    /// Nearest scale tone to `pitch`, as a MIDI pitch.
    ///
    /// The search stays within the octave `pitch` falls in; ties go to the
    /// smaller offset.
    pub fn snap(&self, pitch: f64, root: f64) -> f64 {
        let relative = pitch - root;
        let octave = (relative / 12.0).floor();
        let offset = relative - 12.0 * octave;

        let mut chosen = 0.0;
        let mut best = f64::INFINITY;
        for candidate in self.scale.offsets().iter().map(|&o| f64::from(o)) {
            let distance = (offset - candidate).abs();
            if distance < best {
                best = distance;
                chosen = candidate;
            }
        }
        root + 12.0 * octave + chosen
    }
}
