use std::f64::consts::TAU;

use voxshift::effects::DelayLine;
use voxshift::pitch::{PitchAnalyzer, hz_to_midi};
use voxshift::{AudioBuffer, EffectDispatcher, EffectError, EffectKind, EffectSpec, EngineConfig};

const RATE: u32 = 16_000;

fn sine(freq: f64, seconds: f64, amplitude: f64) -> AudioBuffer {
    let len = (seconds * f64::from(RATE)) as usize;
    let samples = (0..len)
        .map(|i| amplitude * (TAU * freq * i as f64 / f64::from(RATE)).sin())
        .collect();
    AudioBuffer::new(samples, RATE)
}

#[test]
fn test_reverse_sine() {
    let input = sine(440.0, 1.0, 0.5);
    let outcome = EffectDispatcher::new().apply(input.clone(), EffectKind::Reverse);

    assert!(outcome.error.is_none());
    let mut expected = input.samples().to_vec();
    expected.reverse();
    assert_eq!(outcome.buffer.samples(), expected.as_slice());
    assert_eq!(outcome.buffer.sample_rate(), RATE);
}

#[test]
fn test_autotune_on_silence() {
    let input = AudioBuffer::new(vec![0.0; 2 * RATE as usize], RATE);
    let outcome = EffectDispatcher::new().apply(input, EffectKind::Autotune);

    assert!(!outcome.is_fallback());
    assert_eq!(outcome.buffer.len(), 2 * RATE as usize);
    assert!(outcome.buffer.is_silent());
}

#[test]
fn test_echo_on_sine() {
    let input = sine(440.0, 1.0, 0.5);
    let dispatcher = EffectDispatcher::new();
    assert_eq!(
        dispatcher.table().get(EffectKind::Echo),
        Some(&EffectSpec::Echo(DelayLine::new(0.3, 3, 0.5)))
    );

    let outcome = dispatcher.apply(input.clone(), EffectKind::Echo);
    assert!(outcome.error.is_none());
    let output = outcome.buffer;
    assert_eq!(output.len(), input.len());
    assert!((output.peak() - 1.0).abs() < 1e-9);

    // before the first repeat the output is the input up to one gain factor
    let delay = (0.3 * f64::from(RATE)) as usize;
    let gain = output.samples()[..delay]
        .iter()
        .zip(&input.samples()[..delay])
        .find(|(_, dry)| dry.abs() > 0.1)
        .map(|(wet, dry)| wet / dry)
        .unwrap();
    for (wet, dry) in output.samples()[..delay].iter().zip(input.samples()) {
        assert!((wet - gain * dry).abs() < 1e-9);
    }
}

#[test]
fn test_autotune_keeps_scale_tone() {
    // 220 Hz is A3, already a C major tone
    let input = sine(220.0, 1.0, 0.5);
    let outcome = EffectDispatcher::new().apply(input, EffectKind::Autotune);
    assert!(outcome.error.is_none(), "fell back: {:?}", outcome.error);
    assert_eq!(outcome.buffer.len(), RATE as usize);

    let contour = PitchAnalyzer::default().analyze(&outcome.buffer);
    let median = contour.median_f0().unwrap();
    let cents = 100.0 * (hz_to_midi(median).unwrap() - 57.0);
    assert!(cents.abs() < 10.0, "median {} Hz is {} cents off", median, cents);
}

#[test]
fn test_unknown_effect_is_reported() {
    let input = sine(440.0, 0.1, 0.5);
    let result = EffectDispatcher::new().apply_id(input, "chorus");
    assert!(matches!(result, Err(EffectError::UnknownEffect(id)) if id == "chorus"));
}

#[test]
fn test_every_effect_by_id() {
    let dispatcher = EffectDispatcher::new();
    for kind in EffectKind::all() {
        let outcome = dispatcher
            .apply_id(sine(330.0, 0.5, 0.5), &kind.id().to_uppercase())
            .unwrap();
        assert!(outcome.error.is_none(), "{} fell back: {:?}", kind, outcome.error);
        assert!(outcome.buffer.peak() <= 1.0 + 1e-9);
        assert!(!outcome.buffer.is_silent());
    }
}

#[test]
fn test_configured_echo() {
    let config = EngineConfig::from_toml_str("[echo]\ndelay_time = 0.1\nrepeats = 0").unwrap();
    let dispatcher = EffectDispatcher::from_config(&config).unwrap();

    let input = sine(440.0, 0.5, 0.25);
    let outcome = dispatcher.apply(input.clone(), EffectKind::Echo);
    // no repeats: just the normalized input
    for (out, inp) in outcome.buffer.samples().iter().zip(input.samples()) {
        assert!((out - inp / input.peak()).abs() < 1e-9);
    }
}
