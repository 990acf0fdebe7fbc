//! Pitch naming for MIDI note numbers.
//!
//! Sharps only, octave = `note / 12 - 1`, so MIDI 60 is `C4` and 61 is `C#4`.

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Highest valid MIDI note number.
pub const MAX_PITCH: u8 = 127;

/// Name a MIDI note number. Numbers above 127 are rendered raw.
pub fn pitch_name(note: u8) -> String {
    if note > MAX_PITCH {
        return note.to_string();
    }
    let octave = (note / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES[(note % 12) as usize], octave)
}

/// Join the names of a chord, lowest first, with `+`.
pub fn chord_name(pitches: &[u8]) -> String {
    let mut sorted = pitches.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .map(|&p| pitch_name(p))
        .collect::<Vec<_>>()
        .join("+")
}
