//! Converts MIDI event streams into a compact, line-oriented text notation.
//!
//! ```text
//! Key: C
//!
//! T0 Piano:
//! | 1 dyn(mf) C4/4 E4/4 dyn(mp) G4/2 |
//! ```
//!
//! The pipeline runs per track: [`normalize`] pairs note on/off messages,
//! [`layout`] places notes, chords, rests and markers into measures and
//! [`format`] renders the result. Recoverable input problems never abort a
//! run; they come back as [`Diagnostic`] values next to the text.

pub mod config;
pub mod diagnostics;
pub mod dynamics;
pub mod error;
pub mod events;
pub mod format;
pub mod layout;
pub mod midi;
pub mod normalize;
pub mod output;
pub mod pitch;
pub mod quantize;

pub use config::ConvertConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::ConvertError;
pub use events::{RawMessage, Song, TimeSignature, TrackInput};
pub use quantize::{quantize, DurationCode};

use events::Tick;
use std::path::Path;

/// Result of one conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Convert a song to text.
/// This is the main entry point for the library.
pub fn convert(song: &Song, config: &ConvertConfig) -> Conversion {
    let mut diags = Diagnostics::new();
    let text = render_song(song, config, &mut diags);
    Conversion {
        text,
        diagnostics: diags.into_vec(),
    }
}

/// Convert Standard MIDI File bytes.
pub fn convert_bytes(bytes: &[u8], config: &ConvertConfig) -> Result<Conversion, ConvertError> {
    let mut diags = Diagnostics::new();
    let song = midi::read_song(bytes, config, &mut diags)?;
    let text = render_song(&song, config, &mut diags);
    Ok(Conversion {
        text,
        diagnostics: diags.into_vec(),
    })
}

/// Convert a `.mid` file.
pub fn convert_file(path: &Path, config: &ConvertConfig) -> Result<Conversion, ConvertError> {
    let mut diags = Diagnostics::new();
    let song = midi::read_song_file(path, config, &mut diags)?;
    let text = render_song(&song, config, &mut diags);
    Ok(Conversion {
        text,
        diagnostics: diags.into_vec(),
    })
}

fn resolve_ticks_per_beat(declared: i64, config: &ConvertConfig, diags: &mut Diagnostics) -> Tick {
    match Tick::try_from(declared) {
        Ok(tpb) if tpb > 0 => tpb,
        _ => {
            diags.report(
                Severity::Warning,
                DiagnosticKind::InvalidTicksPerBeat,
                None,
                None,
                format!(
                    "Invalid ticks per beat {}, using {}",
                    declared, config.default_ticks_per_beat
                ),
            );
            config.default_ticks_per_beat
        }
    }
}

fn render_song(song: &Song, config: &ConvertConfig, diags: &mut Diagnostics) -> String {
    let ticks_per_beat = resolve_ticks_per_beat(song.ticks_per_beat, config, diags);
    tracing::info!(
        ticks_per_beat,
        tracks = song.tracks.len(),
        "Rendering song in {}",
        song.key
    );

    let mut blocks = Vec::with_capacity(song.tracks.len());
    for (index, input) in song.tracks.iter().enumerate() {
        let events = normalize::normalize_track(index, &input.messages, ticks_per_beat, diags);
        let block = match layout::layout_track(
            index,
            &input.name,
            &events,
            ticks_per_beat,
            song.time_signature,
            config,
            diags,
        ) {
            Ok(track) => {
                let tokens = layout::interleave_bars(&track, config);
                format::render_track(&track, &tokens)
            }
            Err(e) => {
                diags.report(
                    Severity::Error,
                    DiagnosticKind::InvalidMeasureLength,
                    Some(index),
                    None,
                    format!("Skipping track '{}': {}", input.name, e),
                );
                format::render_failed_track(index, &input.name, &e.to_string())
            }
        };
        blocks.push(block);
    }

    format::render_document(&song.key, &blocks)
}
