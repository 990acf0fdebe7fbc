//! # Event Normalizer
//!
//! Turns one track's raw delta-timed messages into notes with absolute start
//! ticks and lengths, plus time-signature and tempo events.
//!
//! ## Pairing rules
//! - Note on (velocity > 0) opens a note. If the same pitch is already open,
//!   the earlier note is closed at the current tick first (re-trigger).
//! - Note off, or note on with velocity 0, closes the open note of that pitch.
//!   A note off without an open note is ignored.
//! - Notes of length 0 are dropped.
//! - Notes still open when the track ends get a length of one beat.
//!
//! The result is stably sorted by tick, so events on the same tick keep the
//! order in which they were emitted.
//!
//! ## Example
//! ```rust
//! use miditext::diagnostics::Diagnostics;
//! use miditext::events::{RawMessage, TrackEvent};
//! use miditext::normalize::normalize_track;
//!
//! let messages = vec![RawMessage::note_on(60, 80, 0), RawMessage::note_off(60, 480)];
//! let mut diags = Diagnostics::new();
//! let events = normalize_track(0, &messages, 480, &mut diags);
//! assert!(matches!(events[0], TrackEvent::Note(n) if n.duration_ticks == 480));
//! ```

use crate::diagnostics::{DiagnosticKind, Diagnostics, Severity};
use crate::events::{
    NoteEvent, RawMessage, TempoEvent, Tick, TimeSigEvent, TimeSignature, TrackEvent,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
struct OpenNote {
    start_tick: Tick,
    velocity: u8,
    /// Position in opening order, for a deterministic end-of-track flush
    seq: u64,
}

/// Normalize the raw messages of one track.
///
/// `ticks_per_beat` must already be resolved (> 0); it is the fallback length
/// of notes left open at the end of the track.
pub fn normalize_track(
    track_index: usize,
    messages: &[RawMessage],
    ticks_per_beat: Tick,
    diags: &mut Diagnostics,
) -> Vec<TrackEvent> {
    let mut current_tick: Tick = 0;
    let mut open: BTreeMap<u8, OpenNote> = BTreeMap::new();
    let mut next_seq: u64 = 0;
    let mut events: Vec<TrackEvent> = Vec::new();

    for message in messages {
        current_tick += Tick::from(message.delta());

        match *message {
            RawMessage::NoteOn {
                pitch, velocity, ..
            } if velocity > 0 => {
                if let Some(prev) = open.remove(&pitch) {
                    let duration = current_tick - prev.start_tick;
                    diags.report(
                        Severity::Warning,
                        DiagnosticKind::RetriggeredNote,
                        Some(track_index),
                        Some(current_tick),
                        format!(
                            "Note {} re-triggered; previous note (start {}) closed with duration {}",
                            pitch, prev.start_tick, duration
                        ),
                    );
                    if duration > 0 {
                        events.push(TrackEvent::Note(NoteEvent {
                            start_tick: prev.start_tick,
                            pitch,
                            velocity: prev.velocity,
                            duration_ticks: duration,
                        }));
                    }
                }

                open.insert(
                    pitch,
                    OpenNote {
                        start_tick: current_tick,
                        velocity,
                        seq: next_seq,
                    },
                );
                next_seq += 1;
            }

            RawMessage::NoteOn { pitch, .. } | RawMessage::NoteOff { pitch, .. } => {
                match open.remove(&pitch) {
                    Some(note) => {
                        let duration = current_tick - note.start_tick;
                        if duration > 0 {
                            events.push(TrackEvent::Note(NoteEvent {
                                start_tick: note.start_tick,
                                pitch,
                                velocity: note.velocity,
                                duration_ticks: duration,
                            }));
                        } else {
                            diags.report(
                                Severity::Info,
                                DiagnosticKind::ZeroDurationNote,
                                Some(track_index),
                                Some(note.start_tick),
                                format!("Ignoring note {} with zero duration", pitch),
                            );
                        }
                    }
                    None => {
                        diags.report(
                            Severity::Info,
                            DiagnosticKind::OrphanNoteOff,
                            Some(track_index),
                            Some(current_tick),
                            format!("Note off for {} without a sounding note", pitch),
                        );
                    }
                }
            }

            RawMessage::TimeSignature {
                numerator,
                denominator,
                ..
            } => {
                tracing::debug!(
                    track = track_index,
                    tick = current_tick,
                    "Time signature change to {}/{}",
                    numerator,
                    denominator
                );
                events.push(TrackEvent::TimeSig(TimeSigEvent {
                    tick: current_tick,
                    signature: TimeSignature::new(numerator, denominator),
                }));
            }

            RawMessage::SetTempo { bpm, .. } => {
                tracing::debug!(
                    track = track_index,
                    tick = current_tick,
                    "Tempo change to {} BPM",
                    bpm
                );
                events.push(TrackEvent::Tempo(TempoEvent {
                    tick: current_tick,
                    bpm,
                }));
            }
        }
    }

    if !open.is_empty() {
        let mut dangling: Vec<(u8, OpenNote)> = open.into_iter().collect();
        dangling.sort_by_key(|(_, note)| note.seq);

        for (pitch, note) in dangling {
            diags.report(
                Severity::Warning,
                DiagnosticKind::DanglingNote,
                Some(track_index),
                Some(note.start_tick),
                format!(
                    "Note {} still sounding at end of track; using fallback duration {}",
                    pitch, ticks_per_beat
                ),
            );
            events.push(TrackEvent::Note(NoteEvent {
                start_tick: note.start_tick,
                pitch,
                velocity: note.velocity,
                duration_ticks: ticks_per_beat,
            }));
        }
    }

    // sort_by_key is stable: equal ticks keep emission order
    events.sort_by_key(|e| e.tick());
    events
}
