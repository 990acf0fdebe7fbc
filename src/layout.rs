//! # Temporal Layout Engine
//!
//! Lays out the normalized events of one track as musical objects (notes and
//! chords, rests, dynamic markers, time-signature markers), then interleaves
//! bar lines.
//!
//! ## Pass 1: objects ([`layout_track`])
//! Walks the tick-sorted events with three pieces of state:
//! - `last_event_end_tick`: where the last note/chord (or rest) ended
//! - `current_dynamic`: the last dynamic marker emitted
//! - the rest threshold from the configuration
//!
//! Before a note group or time-signature event at tick `T`, a silent gap
//! `T - last_event_end_tick` of at least `min_rest_ticks` becomes a rest
//! placed at `last_event_end_tick`. Notes sharing a start tick become one
//! chord whose length is the longest member. Tempo events are skipped.
//!
//! ## Pass 2: bar lines ([`interleave_bars`])
//! Measure length is computed once from the initial time signature:
//! `ticks_per_beat * numerator * 4 / denominator`. Later time-signature
//! events only produce inline markers; they never change measure length.
//! Each object lands in measure `tick / ticks_per_measure + 1` and one bar
//! token is emitted per crossed boundary. After the last object, bar lines
//! continue up to the measure holding the track's end tick, and the sequence
//! always closes with a bar token.
//!
//! ## Related Modules
//! - `normalize` - produces the input events
//! - `quantize` - durations of notes, chords and rests
//! - `format` - renders the token sequence

use crate::config::ConvertConfig;
use crate::diagnostics::{DiagnosticKind, Diagnostics, Severity};
use crate::dynamics::Dynamic;
use crate::events::{NoteEvent, Tick, TimeSignature, TrackEvent};
use crate::pitch::MAX_PITCH;
use crate::quantize::{quantize_detailed, DurationCode, NoteValue};
use thiserror::Error;

/// One laid-out element of a track.
#[derive(Debug, Clone, PartialEq)]
pub enum MusicalObject {
    /// A lone note or a chord; pitches sorted by MIDI number
    NoteOrChord {
        tick: Tick,
        pitches: Vec<u8>,
        duration: DurationCode,
    },
    Rest { tick: Tick, duration: DurationCode },
    Dynamic { tick: Tick, dynamic: Dynamic },
    TimeSigMarker { tick: Tick, signature: TimeSignature },
}

impl MusicalObject {
    pub fn tick(&self) -> Tick {
        match self {
            MusicalObject::NoteOrChord { tick, .. }
            | MusicalObject::Rest { tick, .. }
            | MusicalObject::Dynamic { tick, .. }
            | MusicalObject::TimeSigMarker { tick, .. } => *tick,
        }
    }

    fn is_whole_rest(&self) -> bool {
        matches!(
            self,
            MusicalObject::Rest {
                duration: DurationCode::Known {
                    value: NoteValue::Whole,
                    dotted: false
                },
                ..
            }
        )
    }
}

/// A laid-out track.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub index: usize,
    pub name: String,
    /// Frozen from the initial time signature, always > 0
    pub ticks_per_measure: Tick,
    /// `last_event_end_tick` after the last event
    pub end_tick: Tick,
    /// Sorted by tick
    pub objects: Vec<MusicalObject>,
}

/// Output of the bar-line pass.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutToken {
    Object(MusicalObject),
    /// Bar line opening `measure`; `numbered` bars show the measure number
    Bar { measure: u64, numbered: bool },
}

/// Per-track structural failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("could not compute measure length for {signature} at {ticks_per_beat} ticks per beat")]
    InvalidMeasureLength {
        signature: TimeSignature,
        ticks_per_beat: Tick,
    },
}

/// Ticks per measure for a time signature.
///
/// A denominator of 0 falls back to 4/4. Returns an error when the result is
/// still not positive (numerator 0).
pub fn ticks_per_measure(
    ticks_per_beat: Tick,
    signature: TimeSignature,
) -> Result<Tick, LayoutError> {
    let ticks = if signature.denominator == 0 {
        tracing::warn!("Time signature denominator 0; measuring as 4/4");
        ticks_per_beat * 4
    } else {
        // truncates like an integer cast of the float product
        (ticks_per_beat as f64
            * f64::from(signature.numerator)
            * (4.0 / f64::from(signature.denominator))) as Tick
    };

    if ticks == 0 {
        return Err(LayoutError::InvalidMeasureLength {
            signature,
            ticks_per_beat,
        });
    }
    Ok(ticks)
}

/// Layout state for one track
struct LayoutState<'a> {
    track_index: usize,
    ticks_per_beat: Tick,
    config: &'a ConvertConfig,
    last_event_end_tick: Tick,
    current_dynamic: Option<Dynamic>,
    objects: Vec<MusicalObject>,
}

impl<'a> LayoutState<'a> {
    fn quantize(&self, ticks: Tick, tick: Tick, what: &str, diags: &mut Diagnostics) -> DurationCode {
        let q = quantize_detailed(
            ticks as i64,
            self.ticks_per_beat as i64,
            self.config.max_quantization_error,
        );
        if q.code.is_unknown() {
            diags.report(
                Severity::Warning,
                DiagnosticKind::UnquantizableDuration,
                Some(self.track_index),
                Some(tick),
                format!("Could not quantize {} of {} ticks", what, ticks),
            );
        } else if q.low_confidence {
            diags.report(
                Severity::Warning,
                DiagnosticKind::LowConfidenceDuration,
                Some(self.track_index),
                Some(tick),
                format!(
                    "{} of {} ticks ({:.3} beats) is {:.3} beats from the nearest value {}; using it anyway",
                    what, ticks, q.beats, q.error_beats, q.code
                ),
            );
        }
        q.code
    }

    /// Emit a rest for the silence before `tick`, if it is long enough.
    fn fill_gap(&mut self, tick: Tick, diags: &mut Diagnostics) {
        if tick <= self.last_event_end_tick {
            return;
        }
        let gap = tick - self.last_event_end_tick;
        if gap < self.config.min_rest_ticks {
            return;
        }
        let start = self.last_event_end_tick;
        let duration = self.quantize(gap, start, "rest", diags);
        self.objects.push(MusicalObject::Rest {
            tick: start,
            duration,
        });
        self.last_event_end_tick = tick;
    }

    fn push_group(&mut self, group: &[NoteEvent], diags: &mut Diagnostics) {
        let first = group[0];
        let tick = first.start_tick;

        self.fill_gap(tick, diags);

        if self.config.dynamics {
            let dynamic = match self.config.velocity_table.dynamic_for(first.velocity) {
                Some(d) if first.velocity <= 127 => d,
                _ => {
                    diags.report(
                        Severity::Warning,
                        DiagnosticKind::InvalidVelocity,
                        Some(self.track_index),
                        Some(tick),
                        format!("No dynamic for velocity {}; using mf", first.velocity),
                    );
                    Dynamic::Mf
                }
            };
            if self.current_dynamic != Some(dynamic) {
                self.objects.push(MusicalObject::Dynamic { tick, dynamic });
                self.current_dynamic = Some(dynamic);
            }
        }

        let mut pitches: Vec<u8> = Vec::with_capacity(group.len());
        for note in group {
            if note.pitch > MAX_PITCH {
                diags.report(
                    Severity::Warning,
                    DiagnosticKind::InvalidPitch,
                    Some(self.track_index),
                    Some(tick),
                    format!("Pitch {} is outside 0-127; rendered as a number", note.pitch),
                );
            }
            pitches.push(note.pitch);
        }
        pitches.sort_unstable();

        // chord lasts as long as its longest note
        let max_duration = group.iter().map(|n| n.duration_ticks).max().unwrap_or(0);
        let what = if group.len() > 1 { "chord" } else { "note" };
        let duration = self.quantize(max_duration, tick, what, diags);

        self.objects.push(MusicalObject::NoteOrChord {
            tick,
            pitches,
            duration,
        });
        self.last_event_end_tick = tick + max_duration;
    }
}

/// Pass 1: lay out the events of one track as musical objects.
///
/// `ticks_per_beat` must already be resolved (> 0). Fails only when the
/// measure length cannot be computed; the caller skips the track then.
pub fn layout_track(
    index: usize,
    name: &str,
    events: &[TrackEvent],
    ticks_per_beat: Tick,
    initial_signature: TimeSignature,
    config: &ConvertConfig,
    diags: &mut Diagnostics,
) -> Result<Track, LayoutError> {
    let measure_ticks = ticks_per_measure(ticks_per_beat, initial_signature)?;
    tracing::debug!(
        track = index,
        "Using {} ticks per measure (from {})",
        measure_ticks,
        initial_signature
    );

    let mut state = LayoutState {
        track_index: index,
        ticks_per_beat,
        config,
        last_event_end_tick: 0,
        current_dynamic: None,
        objects: Vec::new(),
    };

    // Tempo changes carry no notation
    let events: Vec<&TrackEvent> = events
        .iter()
        .filter(|e| !matches!(e, TrackEvent::Tempo(_)))
        .collect();

    let mut i = 0;
    while i < events.len() {
        match events[i] {
            TrackEvent::Note(first) => {
                let mut group = vec![*first];
                let mut j = i + 1;
                while let Some(TrackEvent::Note(next)) = events.get(j) {
                    if next.start_tick != first.start_tick {
                        break;
                    }
                    group.push(*next);
                    j += 1;
                }
                state.push_group(&group, diags);
                i = j;
            }
            TrackEvent::TimeSig(ts) => {
                state.fill_gap(ts.tick, diags);
                state.objects.push(MusicalObject::TimeSigMarker {
                    tick: ts.tick,
                    signature: ts.signature,
                });
                i += 1;
            }
            TrackEvent::Tempo(_) => i += 1,
        }
    }

    let LayoutState {
        last_event_end_tick,
        mut objects,
        ..
    } = state;

    // A rest may start before a marker emitted without a gap
    objects.sort_by_key(|o| o.tick());

    Ok(Track {
        index,
        name: name.to_string(),
        ticks_per_measure: measure_ticks,
        end_tick: last_event_end_tick,
        objects,
    })
}

/// Pass 2: interleave bar lines with the objects of a track.
pub fn interleave_bars(track: &Track, config: &ConvertConfig) -> Vec<LayoutToken> {
    let interval = config.bar_number_interval.max(1);
    let bar = |measure: u64| LayoutToken::Bar {
        measure,
        numbered: measure == 1 || measure % interval == 0,
    };

    let tpm = track.ticks_per_measure.max(1);
    let mut tokens = vec![bar(1)];
    let mut current_measure: u64 = 1;

    for object in &track.objects {
        let measure = object.tick() / tpm + 1;
        while current_measure < measure {
            current_measure += 1;
            tokens.push(bar(current_measure));
        }

        if config.elide_whole_measure_rests && object.is_whole_rest() && object.tick() % tpm == 0 {
            tracing::debug!(
                track = track.index,
                tick = object.tick(),
                "Whole-measure rest left to the bar lines"
            );
            continue;
        }
        tokens.push(LayoutToken::Object(object.clone()));
    }

    let final_measure = track.end_tick / tpm + 1;
    while current_measure < final_measure {
        current_measure += 1;
        tokens.push(bar(current_measure));
    }

    if !matches!(tokens.last(), Some(LayoutToken::Bar { .. })) {
        tokens.push(LayoutToken::Bar {
            measure: current_measure + 1,
            numbered: false,
        });
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{TempoEvent, TimeSigEvent};

    fn note(start_tick: Tick, pitch: u8, velocity: u8, duration_ticks: Tick) -> TrackEvent {
        TrackEvent::Note(NoteEvent {
            start_tick,
            pitch,
            velocity,
            duration_ticks,
        })
    }

    fn no_dynamics() -> ConvertConfig {
        ConvertConfig {
            dynamics: false,
            ..ConvertConfig::default()
        }
    }

    fn layout(events: &[TrackEvent], config: &ConvertConfig) -> (Track, Diagnostics) {
        let mut diags = Diagnostics::new();
        let track = layout_track(0, "Test", events, 480, TimeSignature::default(), config, &mut diags).unwrap();
        (track, diags)
    }

    #[test]
    fn test_ticks_per_measure() {
        assert_eq!(ticks_per_measure(480, TimeSignature::new(4, 4)), Ok(1920));
        assert_eq!(ticks_per_measure(480, TimeSignature::new(3, 4)), Ok(1440));
        assert_eq!(ticks_per_measure(480, TimeSignature::new(6, 8)), Ok(1440));
        assert_eq!(ticks_per_measure(480, TimeSignature::new(2, 2)), Ok(1920));
        assert_eq!(ticks_per_measure(96, TimeSignature::new(5, 4)), Ok(480));
        // denominator 0 measures as 4/4
        assert_eq!(ticks_per_measure(480, TimeSignature::new(3, 0)), Ok(1920));
        assert!(ticks_per_measure(480, TimeSignature::new(0, 4)).is_err());
    }

    #[test]
    fn test_sequential_notes() {
        let events = [note(0, 60, 80, 480), note(480, 64, 80, 480), note(960, 67, 70, 960)];
        let (track, diags) = layout(&events, &no_dynamics());
        assert_eq!(track.objects.len(), 3);
        assert_eq!(track.end_tick, 1920);
        assert_eq!(
            track.objects[2],
            MusicalObject::NoteOrChord {
                tick: 960,
                pitches: vec![67],
                duration: DurationCode::plain(NoteValue::Half)
            }
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_chord_sorted_with_max_duration() {
        let events = [note(0, 67, 80, 240), note(0, 60, 80, 480), note(0, 64, 80, 360)];
        let (track, _) = layout(&events, &no_dynamics());
        assert_eq!(
            track.objects,
            vec![MusicalObject::NoteOrChord {
                tick: 0,
                pitches: vec![60, 64, 67],
                duration: DurationCode::plain(NoteValue::Quarter)
            }]
        );
        assert_eq!(track.end_tick, 480);
    }

    #[test]
    fn test_rest_threshold() {
        let config = no_dynamics();
        let min = config.min_rest_ticks;

        let events = [note(0, 60, 80, 480), note(480 + min - 1, 62, 80, 480)];
        let (track, _) = layout(&events, &config);
        assert!(!track.objects.iter().any(|o| matches!(o, MusicalObject::Rest { .. })));

        let events = [note(0, 60, 80, 480), note(480 + min, 62, 80, 480)];
        let (track, _) = layout(&events, &config);
        let rests: Vec<_> = track
            .objects
            .iter()
            .filter(|o| matches!(o, MusicalObject::Rest { .. }))
            .collect();
        assert_eq!(rests.len(), 1);
        assert_eq!(rests[0].tick(), 480);
    }

    #[test]
    fn test_rest_at_track_start() {
        let events = [note(960, 60, 80, 480)];
        let (track, _) = layout(&events, &no_dynamics());
        assert_eq!(
            track.objects[0],
            MusicalObject::Rest {
                tick: 0,
                duration: DurationCode::plain(NoteValue::Half)
            }
        );
    }

    #[test]
    fn test_dynamic_markers_only_on_change() {
        let events = [
            note(0, 60, 80, 480),
            note(480, 62, 90, 480),
            note(960, 64, 20, 480),
        ];
        let (track, _) = layout(&events, &ConvertConfig::default());
        let dynamics: Vec<Dynamic> = track
            .objects
            .iter()
            .filter_map(|o| match o {
                MusicalObject::Dynamic { dynamic, .. } => Some(*dynamic),
                _ => None,
            })
            .collect();
        assert_eq!(dynamics, vec![Dynamic::Mf, Dynamic::Pp]);
        // marker precedes its note
        assert!(matches!(track.objects[0], MusicalObject::Dynamic { tick: 0, .. }));
        assert!(matches!(track.objects[1], MusicalObject::NoteOrChord { tick: 0, .. }));
    }

    #[test]
    fn test_chord_dynamic_uses_first_note() {
        let events = [note(0, 67, 20, 480), note(0, 60, 120, 480)];
        let (track, _) = layout(&events, &ConvertConfig::default());
        assert_eq!(track.objects[0], MusicalObject::Dynamic { tick: 0, dynamic: Dynamic::Pp });
    }

    #[test]
    fn test_invalid_velocity_falls_back_to_mf() {
        let events = [note(0, 60, 200, 480)];
        let (track, diags) = layout(&events, &ConvertConfig::default());
        assert_eq!(track.objects[0], MusicalObject::Dynamic { tick: 0, dynamic: Dynamic::Mf });
        assert_eq!(diags.iter().next().unwrap().kind, DiagnosticKind::InvalidVelocity);
    }

    #[test]
    fn test_time_signature_marker_does_not_change_measure() {
        let events = [
            TrackEvent::TimeSig(TimeSigEvent {
                tick: 0,
                signature: TimeSignature::new(4, 4),
            }),
            note(0, 60, 80, 1920),
            TrackEvent::TimeSig(TimeSigEvent {
                tick: 1920,
                signature: TimeSignature::new(3, 4),
            }),
            note(1920, 62, 80, 1920),
        ];
        let (track, _) = layout(&events, &no_dynamics());
        assert_eq!(track.ticks_per_measure, 1920);
        assert_eq!(track.objects.len(), 4);
        assert!(matches!(track.objects[2], MusicalObject::TimeSigMarker { tick: 1920, .. }));
    }

    #[test]
    fn test_tempo_events_ignored() {
        let events = [
            note(0, 60, 80, 480),
            TrackEvent::Tempo(TempoEvent { tick: 960, bpm: 90.0 }),
            note(1920, 62, 80, 480),
        ];
        let (track, _) = layout(&events, &no_dynamics());
        // one rest from 480 to 1920, not split at the tempo change
        let rests: Vec<_> = track
            .objects
            .iter()
            .filter(|o| matches!(o, MusicalObject::Rest { .. }))
            .collect();
        assert_eq!(rests.len(), 1);
        assert_eq!(
            *rests[0],
            MusicalObject::Rest {
                tick: 480,
                duration: DurationCode::dotted(NoteValue::Half)
            }
        );
    }

    #[test]
    fn test_rest_before_marker_then_no_double_rest() {
        let events = [
            note(0, 60, 80, 480),
            TrackEvent::TimeSig(TimeSigEvent {
                tick: 1920,
                signature: TimeSignature::new(3, 4),
            }),
            note(1920, 62, 80, 480),
        ];
        let (track, _) = layout(&events, &no_dynamics());
        let rest_count = track
            .objects
            .iter()
            .filter(|o| matches!(o, MusicalObject::Rest { .. }))
            .count();
        assert_eq!(rest_count, 1);
    }

    #[test]
    fn test_low_confidence_reported() {
        // 5 beats: one beat away from a whole note
        let events = [note(0, 60, 80, 2400)];
        let (track, diags) = layout(&events, &no_dynamics());
        assert!(matches!(
            track.objects[0],
            MusicalObject::NoteOrChord { duration: DurationCode::Known { value: NoteValue::Whole, dotted: false }, .. }
        ));
        assert_eq!(diags.iter().next().unwrap().kind, DiagnosticKind::LowConfidenceDuration);
    }

    #[test]
    fn test_invalid_measure_length() {
        let mut diags = Diagnostics::new();
        let result = layout_track(
            1,
            "Broken",
            &[note(0, 60, 80, 480)],
            480,
            TimeSignature::new(0, 4),
            &ConvertConfig::default(),
            &mut diags,
        );
        assert!(matches!(result, Err(LayoutError::InvalidMeasureLength { .. })));
    }

    fn bars(tokens: &[LayoutToken]) -> Vec<(u64, bool)> {
        tokens
            .iter()
            .filter_map(|t| match t {
                LayoutToken::Bar { measure, numbered } => Some((*measure, *numbered)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_bar_lines_between_measures() {
        let events = [note(0, 60, 80, 1920), note(1920, 62, 80, 1920)];
        let (track, _) = layout(&events, &no_dynamics());
        let tokens = interleave_bars(&track, &no_dynamics());
        assert!(matches!(tokens[0], LayoutToken::Bar { measure: 1, numbered: true }));
        assert!(matches!(tokens[1], LayoutToken::Object(_)));
        assert!(matches!(tokens[2], LayoutToken::Bar { measure: 2, numbered: false }));
        assert!(matches!(tokens[3], LayoutToken::Object(_)));
        assert!(matches!(tokens[4], LayoutToken::Bar { measure: 3, numbered: false }));
        assert_eq!(tokens.len(), 5);
    }

    #[test]
    fn test_bar_per_skipped_measure() {
        // note in measure 1, next in measure 7: bars 2..=7 all emitted
        let events = [note(0, 60, 80, 480), note(1920 * 6, 62, 80, 480)];
        let config = ConvertConfig {
            min_rest_ticks: u64::MAX,
            ..no_dynamics()
        };
        let (track, _) = layout(&events, &config);
        let tokens = interleave_bars(&track, &config);
        let numbers = bars(&tokens);
        assert_eq!(
            numbers,
            vec![(1, true), (2, false), (3, false), (4, false), (5, true), (6, false), (7, false), (8, false)]
        );
    }

    #[test]
    fn test_trailing_bars_reach_end_tick() {
        // one long note over three measures
        let events = [note(0, 60, 80, 1920 * 3 - 480)];
        let (track, _) = layout(&events, &no_dynamics());
        let tokens = interleave_bars(&track, &no_dynamics());
        assert_eq!(bars(&tokens), vec![(1, true), (2, false), (3, false)]);
        assert!(matches!(tokens.last(), Some(LayoutToken::Bar { .. })));
    }

    #[test]
    fn test_empty_track_has_opening_bar_only() {
        let (track, _) = layout(&[], &ConvertConfig::default());
        assert!(track.objects.is_empty());
        let tokens = interleave_bars(&track, &ConvertConfig::default());
        assert_eq!(tokens, vec![LayoutToken::Bar { measure: 1, numbered: true }]);
    }

    #[test]
    fn test_whole_measure_rest_elision() {
        let events = [note(0, 60, 80, 1920), note(3840, 62, 80, 1920)];
        let config = ConvertConfig {
            elide_whole_measure_rests: true,
            ..no_dynamics()
        };
        let (track, _) = layout(&events, &config);
        assert!(track.objects.iter().any(|o| o.is_whole_rest()));
        let tokens = interleave_bars(&track, &config);
        assert!(!tokens
            .iter()
            .any(|t| matches!(t, LayoutToken::Object(o) if o.is_whole_rest())));

        let kept = interleave_bars(&track, &no_dynamics());
        assert!(kept
            .iter()
            .any(|t| matches!(t, LayoutToken::Object(o) if o.is_whole_rest())));
    }
}
