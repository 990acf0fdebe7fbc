//! # Standard MIDI File Reader
//!
//! Builds the `Song` the conversion works on from SMF bytes, using `midly`.
//!
//! - Ticks per beat come from the header; SMPTE timing yields 0 and a warning
//! - Key, tempo and time signature are the first ones found in track 0
//! - Each track keeps its note, tempo and time-signature messages
//!
//! Dropped messages (controllers, program changes, text events) hand their
//! delta time to the next kept message so absolute positions stay correct.

use crate::config::ConvertConfig;
use crate::diagnostics::{DiagnosticKind, Diagnostics, Severity};
use crate::error::ConvertError;
use crate::events::{RawMessage, Song, TimeSignature, TrackInput};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::path::Path;

/// Parse SMF bytes into a `Song`.
pub fn read_song(
    bytes: &[u8],
    config: &ConvertConfig,
    diags: &mut Diagnostics,
) -> Result<Song, ConvertError> {
    let smf = Smf::parse(bytes).map_err(|e| ConvertError::Midi(e.to_string()))?;

    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(tpb) => i64::from(tpb.as_int()),
        Timing::Timecode(fps, subframe) => {
            // resolved to the configured default (with a diagnostic) by `convert`
            tracing::debug!(
                "SMPTE timing ({} fps, {} subframes) has no ticks per beat",
                fps.as_f32(),
                subframe
            );
            0
        }
    };

    let mut song = Song::new(ticks_per_beat);
    song.key = config.default_key.clone();
    song.time_signature = config.default_time_signature;
    song.tempo_bpm = config.default_tempo;

    if let Some(first) = smf.tracks.first() {
        scan_initial_metadata(first, &mut song, diags);
    }
    tracing::info!(
        key = %song.key,
        time_signature = %song.time_signature,
        tempo = song.tempo_bpm,
        "Initial metadata"
    );

    for (index, track) in smf.tracks.iter().enumerate() {
        song.tracks.push(TrackInput {
            name: track_name(track).unwrap_or_else(|| format!("Unnamed Track {}", index)),
            messages: raw_messages(index, track, diags),
        });
    }

    tracing::info!("Read {} tracks", song.tracks.len());
    Ok(song)
}

/// Read a `.mid` file into a `Song`.
pub fn read_song_file(
    path: &Path,
    config: &ConvertConfig,
    diags: &mut Diagnostics,
) -> Result<Song, ConvertError> {
    let bytes = std::fs::read(path).map_err(|e| ConvertError::io(path, e))?;
    tracing::info!("Loaded MIDI file {}", path.display());
    read_song(&bytes, config, diags)
}

/// First key signature, tempo and time signature of the track (each at most once).
fn scan_initial_metadata(track: &[TrackEvent<'_>], song: &mut Song, diags: &mut Diagnostics) {
    let mut key_found = false;
    let mut tempo_found = false;
    let mut time_sig_found = false;

    for event in track {
        match event.kind {
            TrackEventKind::Meta(MetaMessage::KeySignature(sharps, minor)) if !key_found => {
                song.key = key_name(sharps, minor);
                key_found = true;
            }
            TrackEventKind::Meta(MetaMessage::Tempo(us)) if !tempo_found => {
                song.tempo_bpm = tempo_bpm(us.as_int());
                tempo_found = true;
            }
            TrackEventKind::Meta(MetaMessage::TimeSignature(num, den_pow, _, _)) if !time_sig_found => {
                song.time_signature = TimeSignature::new(num, denominator(den_pow, 0, diags));
                time_sig_found = true;
            }
            _ => {}
        }
        if key_found && tempo_found && time_sig_found {
            break;
        }
    }
}

fn track_name(track: &[TrackEvent<'_>]) -> Option<String> {
    track.iter().find_map(|event| match event.kind {
        TrackEventKind::Meta(MetaMessage::TrackName(bytes)) => Some(
            String::from_utf8_lossy(bytes)
                .trim_matches(|c: char| c.is_whitespace() || c == '\0')
                .to_string(),
        ),
        _ => None,
    })
}

fn raw_messages(index: usize, track: &[TrackEvent<'_>], diags: &mut Diagnostics) -> Vec<RawMessage> {
    let mut messages = Vec::new();
    // delta of dropped events, owed to the next kept message
    let mut pending: u32 = 0;

    for event in track {
        let delta = pending.saturating_add(event.delta.as_int());
        let message = match event.kind {
            TrackEventKind::Midi { message, .. } => match message {
                MidiMessage::NoteOn { key, vel } => Some(RawMessage::NoteOn {
                    pitch: key.as_int(),
                    velocity: vel.as_int(),
                    delta,
                }),
                MidiMessage::NoteOff { key, .. } => Some(RawMessage::NoteOff {
                    pitch: key.as_int(),
                    delta,
                }),
                _ => None,
            },
            TrackEventKind::Meta(MetaMessage::Tempo(us)) => Some(RawMessage::SetTempo {
                bpm: tempo_bpm(us.as_int()),
                delta,
            }),
            TrackEventKind::Meta(MetaMessage::TimeSignature(num, den_pow, _, _)) => {
                Some(RawMessage::TimeSignature {
                    numerator: num,
                    denominator: denominator(den_pow, index, diags),
                    delta,
                })
            }
            _ => None,
        };

        match message {
            Some(m) => {
                messages.push(m);
                pending = 0;
            }
            None => pending = delta,
        }
    }

    messages
}

/// Convert the stored power of two into a denominator; 0 when it does not fit.
fn denominator(power: u8, track: usize, diags: &mut Diagnostics) -> u8 {
    if power > 7 {
        diags.report(
            Severity::Warning,
            DiagnosticKind::InvalidTimeSignature,
            Some(track),
            None,
            format!("Time signature denominator 2^{} is not supported", power),
        );
        return 0;
    }
    1u8 << power
}

/// Microseconds per quarter note to BPM, rounded to two decimals.
pub fn tempo_bpm(us_per_quarter: u32) -> f64 {
    if us_per_quarter == 0 {
        return 0.0;
    }
    let bpm = 60_000_000.0 / f64::from(us_per_quarter);
    (bpm * 100.0).round() / 100.0
}

/// Key name from a key-signature meta event (sharps > 0, flats < 0).
pub fn key_name(sharps: i8, minor: bool) -> String {
    const MAJOR: [&str; 15] = [
        "Cb", "Gb", "Db", "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#",
    ];
    const MINOR: [&str; 15] = [
        "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#", "G#", "D#", "A#",
    ];

    let index = (i32::from(sharps.clamp(-7, 7)) + 7) as usize;
    if minor {
        format!("{}m", MINOR[index])
    } else {
        MAJOR[index].to_string()
    }
}
