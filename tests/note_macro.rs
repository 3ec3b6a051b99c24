use voxshift::note;
use voxshift::pitch::{midi_to_hz, parse_note};

#[test]
fn test_note_macro_with_octave() {
    assert_eq!(note!("C4"), 60);
    assert_eq!(note!("A4"), 69);
    assert!((midi_to_hz(f64::from(note!("A4"))) - 440.0).abs() < 1e-9);
}

#[test]
fn test_note_macro_without_octave() {
    // Defaults to octave 4
    assert_eq!(note!("C"), 60);
    assert_eq!(note!("G"), 67);
}

#[test]
fn test_note_macro_sharps_and_flats() {
    assert_eq!(note!("C#4"), 61);
    assert_eq!(note!("Bb3"), 58);
    assert_eq!(note!("F#3"), note!("Gb3"));
}

#[test]
fn test_note_macro_different_octaves() {
    assert_eq!(note!("C5"), 72);
    assert_eq!(note!("C-1"), 0);
    assert_eq!(note!("G9"), 127);
}

#[test]
fn test_note_macro_agrees_with_runtime_parser() {
    assert_eq!(parse_note("D3").unwrap(), note!("D3"));
    assert_eq!(parse_note("eb5").unwrap(), note!("Eb5"));
}

#[test]
fn test_note_macro_enharmonic_octaves() {
    assert_eq!(note!("B#3"), 60);
    assert_eq!(note!("Cb4"), 59);
    assert_eq!(note!("B#3"), parse_note("B#3").unwrap());
}
