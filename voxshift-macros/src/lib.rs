use proc_macro::TokenStream;
use quote::quote;
use syn::{LitStr, parse_macro_input};

/// Resolves a note name to its MIDI note number at compile time.
///
/// Scale roots and transposition targets are written as note names in
/// source, but the pitch code works in MIDI numbers. This macro parses the
/// name while compiling and expands to a plain `u8` literal, so a typo in a
/// preset is a compile error instead of a runtime one.
///
/// # Format
///
/// `<pitch>[octave]` where:
/// - `pitch` is one of C, D, E, F, G, A, B with an optional `#` or `b`
/// - `octave` is optional and defaults to 4; when present it must be -1 to 9
///
/// # Examples
///
/// ```ignore
/// use voxshift::note;
///
/// assert_eq!(note!("C4"), 60);
/// assert_eq!(note!("A"), 69);
/// assert_eq!(note!("Bb3"), 58);
/// ```
#[proc_macro]
pub fn note(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as LitStr);
    let name = input.value();

    match parse_note(&name) {
        Ok((class, octave)) => match to_midi(class, octave) {
            Some(midi) => TokenStream::from(quote! { #midi }),
            None => {
                let error_msg = format!("note '{}' is outside the MIDI range", name);
                TokenStream::from(quote! { compile_error!(#error_msg) })
            }
        },
        Err(e) => {
            let error_msg = format!("invalid note name '{}': {}", name, e);
            TokenStream::from(quote! { compile_error!(#error_msg) })
        }
    }
}

fn parse_pitch_class(s: &str) -> Result<u8, String> {
    let upper = s.to_uppercase();
    let class = match upper.as_str() {
        "C" | "B#" => 0,
        "C#" | "DB" => 1,
        "D" => 2,
        "D#" | "EB" => 3,
        "E" | "FB" => 4,
        "F" | "E#" => 5,
        "F#" | "GB" => 6,
        "G" => 7,
        "G#" | "AB" => 8,
        "A" => 9,
        "A#" | "BB" => 10,
        "B" | "CB" => 11,
        _ => return Err(format!("unknown pitch class '{}'", s)),
    };
    Ok(class)
}

fn parse_note(s: &str) -> Result<(u8, i8), String> {
    if s.is_empty() {
        return Err("empty string".to_string());
    }

    let octave_start = s.chars().position(|c| c.is_ascii_digit() || c == '-');

    let (class_str, octave) = match octave_start {
        Some(0) => return Err("missing pitch class".to_string()),
        Some(pos) => {
            let octave_str = &s[pos..];
            let octave = octave_str
                .parse::<i8>()
                .map_err(|_| format!("invalid octave '{}'", octave_str))?;
            if !(-1..=9).contains(&octave) {
                return Err(format!("octave {} out of range (-1 to 9)", octave));
            }
            (&s[..pos], octave)
        }
        None => (s, 4),
    };

    let class = parse_pitch_class(class_str)?;
    // B# and Cb belong to the neighbouring octave
    let carry = match class_str.to_uppercase().as_str() {
        "B#" => 1,
        "CB" => -1,
        _ => 0,
    };
    Ok((class, octave + carry))
}

fn to_midi(class: u8, octave: i8) -> Option<u8> {
    let midi = (i16::from(octave) + 1) * 12 + i16::from(class);
    u8::try_from(midi).ok().filter(|m| *m <= 127)
}
