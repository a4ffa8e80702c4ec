use crate::error::{Error, Result};

/// Sharp-only spellings, indexed by pitch class.
const NOTE_NAMES_SHARP: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Convert a MIDI pitch number to scientific pitch notation, e.g. `60` ->
/// `"C4"`, `54` -> `"F#3"`. Pitches above 127 are rejected.
pub fn pitch_to_name(pitch: u8) -> Result<String> {
    if pitch > 127 {
        return Err(Error::InvalidPitch(pitch.to_string()));
    }
    let name = NOTE_NAMES_SHARP[(pitch % 12) as usize];
    let octave = (pitch / 12) as i32 - 1;
    Ok(format!("{}{}", name, octave))
}

/// Inverse of [`pitch_to_name`]: parse `"F#3"` or `"C-1"` back to a MIDI
/// pitch number. The octave suffix may be negative.
pub fn name_to_pitch(name: &str) -> Result<u8> {
    // Split the trailing sign/digits (octave) from the note part.
    let split = name
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit() || *c == '-')
        .last()
        .map(|(i, _)| i)
        .unwrap_or(name.len());
    let (note_part, octave_part) = name.split_at(split);

    let index = NOTE_NAMES_SHARP
        .iter()
        .position(|&n| n == note_part)
        .ok_or_else(|| Error::InvalidPitch(name.to_string()))?;
    let octave: i32 = octave_part
        .parse()
        .map_err(|_| Error::InvalidPitch(name.to_string()))?;

    let pitch = (octave + 1) * 12 + index as i32;
    if !(0..=127).contains(&pitch) {
        return Err(Error::InvalidPitch(name.to_string()));
    }
    Ok(pitch as u8)
}
