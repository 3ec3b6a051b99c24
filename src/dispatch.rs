//! Effect identifiers, the table of effect pipelines, and the dispatcher
//! that runs them with a pass-through fallback.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::AudioBuffer;
use crate::config::EngineConfig;
use crate::dsp::{Normalization, pre_emphasis};
use crate::effects::{
    DelayLine, RateConverter, RobotVoice, RoughSettings, RoughVoice, SpectralFrameProcessor,
    reverse, varispeed,
};
use crate::error::{EffectError, Result};
use crate::pitch::{NoteQuantizer, PitchAnalyzer, RootMode, ScaleDefinition, Vibrato};
use crate::resynth::{ResynthesisStrategy, Resynthesizer};

/// Logical identifiers for the built-in effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Robot,
    Rough,
    Echo,
    Slow,
    Fast,
    Reverse,
    Autotune,
    Autotune2,
    Autotune3,
    Deep,
}

impl EffectKind {
    /// Every effect, in menu order.
    pub const ALL: [EffectKind; 10] = [
        EffectKind::Robot,
        EffectKind::Rough,
        EffectKind::Echo,
        EffectKind::Slow,
        EffectKind::Fast,
        EffectKind::Reverse,
        EffectKind::Autotune,
        EffectKind::Autotune2,
        EffectKind::Autotune3,
        EffectKind::Deep,
    ];

    pub fn all() -> &'static [EffectKind] {
        &Self::ALL
    }

    pub fn id(self) -> &'static str {
        match self {
            EffectKind::Robot => "robot",
            EffectKind::Rough => "rough",
            EffectKind::Echo => "echo",
            EffectKind::Slow => "slow",
            EffectKind::Fast => "fast",
            EffectKind::Reverse => "reverse",
            EffectKind::Autotune => "autotune",
            EffectKind::Autotune2 => "autotune2",
            EffectKind::Autotune3 => "autotune3",
            EffectKind::Deep => "deep",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Robot => "Robot Voice",
            EffectKind::Rough => "Rough Voice",
            EffectKind::Echo => "Echo",
            EffectKind::Slow => "Slow Motion",
            EffectKind::Fast => "Fast Forward",
            EffectKind::Reverse => "Reverse",
            EffectKind::Autotune => "Autotune",
            EffectKind::Autotune2 => "Hard Autotune",
            EffectKind::Autotune3 => "Musical Autotune",
            EffectKind::Deep => "Deep Voice",
        }
    }
}

impl FromStr for EffectKind {
    type Err = EffectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.id() == id)
            .ok_or_else(|| EffectError::UnknownEffect(s.to_string()))
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Everything a pitch-correction pipeline needs: analysis, quantization,
/// resynthesis and optional post-processing.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchCorrectionConfig {
    pub analyzer: PitchAnalyzer,
    pub quantizer: NoteQuantizer,
    pub strategy: ResynthesisStrategy,
    /// Pre-emphasis coefficient applied after resynthesis
    pub post_emphasis: Option<f64>,
    /// Seed of the vocoder's noise generator
    pub seed: u64,
}

impl PitchCorrectionConfig {
    /// Mild correction: three quarters of the way to the nearest tone.
    pub fn mild(scale: ScaleDefinition) -> Self {
        Self {
            analyzer: PitchAnalyzer::default(),
            quantizer: NoteQuantizer::new(scale, 0.75),
            strategy: ResynthesisStrategy::Vocoder,
            post_emphasis: None,
            seed: Resynthesizer::DEFAULT_SEED,
        }
    }

    /// Hard correction around the speaker's own register, with a slight
    /// wobble, rebuilt frame by frame.
    pub fn aggressive(scale: ScaleDefinition) -> Self {
        Self {
            quantizer: NoteQuantizer::new(scale, 1.0)
                .with_root_mode(RootMode::Median)
                .with_vibrato(Vibrato::new(0.15, 3.0)),
            strategy: ResynthesisStrategy::FrameShift,
            ..Self::mild(ScaleDefinition::default())
        }
    }

    /// Hard correction an octave up with vibrato and a brightened top end.
    pub fn musical(scale: ScaleDefinition) -> Self {
        Self {
            quantizer: NoteQuantizer::new(scale, 1.0)
                .with_transpose(12.0)
                .with_vibrato(Vibrato::new(0.5, 6.0)),
            post_emphasis: Some(0.97),
            ..Self::mild(ScaleDefinition::default())
        }
    }

    /// Same settings on a different scale.
    fn with_scale(&self, scale: ScaleDefinition) -> Self {
        let old = &self.quantizer;
        let mut quantizer = NoteQuantizer::new(scale, old.strength())
            .with_root_mode(old.root_mode())
            .with_transpose(old.transpose());
        if let Some(vibrato) = old.vibrato() {
            quantizer = quantizer.with_vibrato(vibrato);
        }
        Self {
            quantizer,
            ..self.clone()
        }
    }

    fn run(&self, buffer: AudioBuffer) -> Result<AudioBuffer> {
        let contour = self.analyzer.analyze(&buffer);
        if !contour.has_voiced() {
            debug!("no voiced frames, passing audio through");
            return Ok(buffer);
        }
        let curve = self.quantizer.quantize(&contour);
        let mut output = Resynthesizer::new(self.strategy)
            .with_seed(self.seed)
            .apply(&buffer, &contour, &curve)?;
        if let Some(coef) = self.post_emphasis {
            pre_emphasis(output.samples_mut(), coef);
        }
        Ok(output)
    }
}

/// The pipeline behind one effect, with all of its constants.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectSpec {
    Robot(RobotVoice),
    Rough(RoughSettings),
    Echo(DelayLine),
    Resample(RateConverter),
    Reverse,
    PitchCorrection(PitchCorrectionConfig),
    /// Linear-interpolation speed change; `rate < 1` is slower and deeper
    Varispeed { rate: f64 },
}

impl EffectSpec {
    /// Final level treatment of the pipeline's output.
    pub fn normalization(&self) -> Normalization {
        match self {
            EffectSpec::Robot(_)
            | EffectSpec::Rough(_)
            | EffectSpec::Echo(_)
            | EffectSpec::PitchCorrection(_) => Normalization::Peak,
            EffectSpec::Resample(_) | EffectSpec::Reverse | EffectSpec::Varispeed { .. } => {
                Normalization::Limit
            }
        }
    }

    /// Short name used in logs and errors.
    pub fn stage(&self) -> &'static str {
        match self {
            EffectSpec::Robot(_) => "robot",
            EffectSpec::Rough(_) => "rough",
            EffectSpec::Echo(_) => "echo",
            EffectSpec::Resample(_) => "resample",
            EffectSpec::Reverse => "reverse",
            EffectSpec::PitchCorrection(_) => "pitch-correction",
            EffectSpec::Varispeed { .. } => "varispeed",
        }
    }

    /// Runs the pipeline, without the final normalization.
    pub fn run(&self, buffer: AudioBuffer) -> Result<AudioBuffer> {
        match self {
            EffectSpec::Robot(robot) => {
                Ok(SpectralFrameProcessor::default().process(buffer, &mut robot.clone()))
            }
            EffectSpec::Rough(settings) => {
                Ok(SpectralFrameProcessor::default().process(buffer, &mut RoughVoice::new(*settings)))
            }
            EffectSpec::Echo(delay) => Ok(delay.process(buffer)),
            EffectSpec::Resample(converter) => converter.process(buffer),
            EffectSpec::Reverse => Ok(reverse(buffer)),
            EffectSpec::PitchCorrection(config) => config.run(buffer),
            EffectSpec::Varispeed { rate } => Ok(varispeed(buffer, *rate)),
        }
    }
}

/// Maps every [`EffectKind`] to its [`EffectSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct EffectTable {
    specs: HashMap<EffectKind, EffectSpec>,
}

static BUILTIN: Lazy<Arc<EffectTable>> = Lazy::new(|| Arc::new(EffectTable::with_builtin()));

impl EffectTable {
    /// The built-in pipelines with their default constants.
    pub fn with_builtin() -> Self {
        let scale = ScaleDefinition::default();
        let specs = EffectKind::ALL
            .iter()
            .map(|&kind| {
                let spec = match kind {
                    EffectKind::Robot => EffectSpec::Robot(RobotVoice::default()),
                    EffectKind::Rough => EffectSpec::Rough(RoughSettings::default()),
                    EffectKind::Echo => EffectSpec::Echo(DelayLine::echo()),
                    EffectKind::Slow => EffectSpec::Resample(RateConverter::slow()),
                    EffectKind::Fast => EffectSpec::Resample(RateConverter::fast()),
                    EffectKind::Reverse => EffectSpec::Reverse,
                    EffectKind::Autotune => {
                        EffectSpec::PitchCorrection(PitchCorrectionConfig::mild(scale.clone()))
                    }
                    EffectKind::Autotune2 => {
                        EffectSpec::PitchCorrection(PitchCorrectionConfig::aggressive(scale.clone()))
                    }
                    EffectKind::Autotune3 => {
                        EffectSpec::PitchCorrection(PitchCorrectionConfig::musical(scale.clone()))
                    }
                    EffectKind::Deep => EffectSpec::Varispeed { rate: 0.7 },
                };
                (kind, spec)
            })
            .collect();
        Self { specs }
    }

    /// Shared handle to the built-in table.
    pub fn builtin() -> Arc<EffectTable> {
        Arc::clone(&BUILTIN)
    }

    /// The built-in table with the configured constants applied.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.analysis.validate()?;
        let scale = config.autotune.scale_definition()?;
        let mut table = Self::with_builtin();
        for spec in table.specs.values_mut() {
            match spec {
                EffectSpec::Robot(robot) => *robot = config.robot,
                EffectSpec::Rough(settings) => *settings = config.rough,
                EffectSpec::Echo(delay) => *delay = config.echo,
                EffectSpec::PitchCorrection(pitch) => {
                    *pitch = PitchCorrectionConfig {
                        analyzer: config.analysis,
                        seed: config.autotune.seed,
                        ..pitch.with_scale(scale.clone())
                    };
                }
                EffectSpec::Resample(_) | EffectSpec::Reverse | EffectSpec::Varispeed { .. } => {}
            }
        }
        Ok(table)
    }

    pub fn get(&self, kind: EffectKind) -> Option<&EffectSpec> {
        self.specs.get(&kind)
    }

    /// Replaces the pipeline of one effect.
    pub fn insert(&mut self, kind: EffectKind, spec: EffectSpec) {
        self.specs.insert(kind, spec);
    }
}

impl Default for EffectTable {
    fn default() -> Self {
        Self::with_builtin()
    }
}

/// Result of [`EffectDispatcher::apply`].
///
/// When `error` is set, `buffer` is the untouched input.
#[derive(Debug)]
pub struct EffectOutcome {
    pub buffer: AudioBuffer,
    pub error: Option<EffectError>,
}

impl EffectOutcome {
    /// Whether the effect failed and the input was returned instead.
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }

    pub fn into_buffer(self) -> AudioBuffer {
        self.buffer
    }
}

/// Runs effects by kind or identifier.
///
/// Stage failures never escape: the caller gets the original buffer back
/// together with the error. Only an unknown identifier passed to
/// [`EffectDispatcher::apply_id`] is an error.
///
/// # Examples
///
/// ```
/// use voxshift::{AudioBuffer, EffectDispatcher, EffectKind};
///
/// let dispatcher = EffectDispatcher::new();
/// let input = AudioBuffer::new(vec![0.1, 0.2, 0.3], 16_000);
///
/// let outcome = dispatcher.apply(input, EffectKind::Reverse);
/// assert!(!outcome.is_fallback());
/// assert_eq!(outcome.buffer.samples(), &[0.3, 0.2, 0.1]);
///
/// let silence = AudioBuffer::new(vec![0.0; 8], 16_000);
/// assert!(dispatcher.apply_id(silence, "chorus").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct EffectDispatcher {
    table: Arc<EffectTable>,
}

impl EffectDispatcher {
    /// Dispatcher over the built-in effect table.
    pub fn new() -> Self {
        Self {
            table: EffectTable::builtin(),
        }
    }

    pub fn with_table(table: EffectTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self::with_table(EffectTable::from_config(config)?))
    }

    pub fn table(&self) -> &EffectTable {
        &self.table
    }

    /// Applies `kind` to `buffer`.
    ///
    /// Empty buffers and buffers with a zero sample rate are returned as
    /// they are. If the pipeline fails or produces non-finite samples, the
    /// original buffer is returned with the error attached.
    pub fn apply(&self, buffer: AudioBuffer, kind: EffectKind) -> EffectOutcome {
        if let Err(reason) = buffer.validate() {
            debug!(effect = kind.id(), %reason, "nothing to process");
            return EffectOutcome {
                buffer,
                error: None,
            };
        }

        let Some(spec) = self.table.get(kind) else {
            return Self::fallback(buffer, kind, EffectError::UnknownEffect(kind.id().to_string()));
        };

        debug!(effect = kind.id(), samples = buffer.len(), "applying effect");
        let original = buffer.clone();
        let result = spec.run(buffer).and_then(|output| {
            if output.samples().iter().all(|s| s.is_finite()) {
                Ok(output)
            } else {
                Err(EffectError::NonFinite { stage: spec.stage() })
            }
        });

        match result {
            Ok(mut output) => {
                spec.normalization().apply(output.samples_mut());
                EffectOutcome {
                    buffer: output,
                    error: None,
                }
            }
            Err(error) => Self::fallback(original, kind, error),
        }
    }

    /// Applies the effect named `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::UnknownEffect`] when `id` names no effect.
    pub fn apply_id(&self, buffer: AudioBuffer, id: &str) -> Result<EffectOutcome> {
        let kind: EffectKind = id.parse()?;
        Ok(self.apply(buffer, kind))
    }

    fn fallback(original: AudioBuffer, kind: EffectKind, error: EffectError) -> EffectOutcome {
        warn!(effect = kind.id(), %error, "effect failed, returning original audio");
        EffectOutcome {
            buffer: original,
            error: Some(error),
        }
    }
}

impl Default for EffectDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
