//! # Track Text Formatter
//!
//! Renders laid-out tracks as text and assembles the document.
//!
//! ## Output format
//! ```text
//! Key: C
//!
//! T0 Piano:
//! | 1 dyn(mf) C4/4 E4/4 dyn(mp) G4/2 |
//!
//! T1 Bass:
//! | 1 R/1 | C2+G2/1 |
//! ```
//!
//! ## Token grammar
//! - Note: `<Letter>[#]<Octave><duration>`, e.g. `C#4/8.`
//! - Chord: pitches lowest first joined by `+`, one duration: `C4+E4+G4/2`
//! - Rest: `R<duration>`
//! - Dynamic: `dyn(<symbol>)`
//! - Time signature change: `[3/4]`
//! - Bar line: `|`, or `| <n>` when it shows the measure number
//!
//! Adjacent bar tokens collapse into one; when one of them is numbered the
//! number stays on the surviving bar.

use crate::layout::{LayoutToken, MusicalObject, Track};
use crate::pitch::chord_name;

/// Body of a track without musical objects.
pub const EMPTY_BODY: &str = "| 1 |";

/// Render one object as a token.
pub fn render_object(object: &MusicalObject) -> String {
    match object {
        MusicalObject::NoteOrChord {
            pitches, duration, ..
        } => format!("{}{}", chord_name(pitches), duration),
        MusicalObject::Rest { duration, .. } => format!("R{}", duration),
        MusicalObject::Dynamic { dynamic, .. } => format!("dyn({})", dynamic),
        MusicalObject::TimeSigMarker { signature, .. } => format!("[{}]", signature),
    }
}

/// Render the body line of a track from its token sequence.
pub fn render_body(tokens: &[LayoutToken]) -> String {
    if !tokens.iter().any(|t| matches!(t, LayoutToken::Object(_))) {
        return EMPTY_BODY.to_string();
    }

    let mut parts: Vec<String> = Vec::with_capacity(tokens.len());
    let mut last_was_bar = false;

    for token in tokens {
        match token {
            LayoutToken::Bar { measure, numbered } => {
                let text = if *numbered {
                    format!("| {}", measure)
                } else {
                    "|".to_string()
                };
                if last_was_bar {
                    // collapse; a number replaces a plain bar
                    if *numbered {
                        if let Some(last) = parts.last_mut() {
                            *last = text;
                        }
                    }
                } else {
                    parts.push(text);
                }
                last_was_bar = true;
            }
            LayoutToken::Object(object) => {
                parts.push(render_object(object));
                last_was_bar = false;
            }
        }
    }

    parts.join(" ")
}

/// Header line of a track block.
pub fn track_header(index: usize, name: &str) -> String {
    format!("T{} {}:", index, name)
}

/// `T<index> <name>:\n<body>`
pub fn render_track(track: &Track, tokens: &[LayoutToken]) -> String {
    format!("{}\n{}", track_header(track.index, &track.name), render_body(tokens))
}

/// Block standing in for a track that could not be laid out.
pub fn render_failed_track(index: usize, name: &str, reason: &str) -> String {
    format!("{}\nERROR: {}", track_header(index, name), reason)
}

/// `Key: <key>` followed by the track blocks, separated by blank lines.
pub fn render_document(key: &str, blocks: &[String]) -> String {
    let mut sections = Vec::with_capacity(blocks.len() + 1);
    sections.push(format!("Key: {}", key));
    sections.extend(blocks.iter().cloned());
    sections.join("\n\n")
}
