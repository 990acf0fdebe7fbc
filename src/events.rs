//! # Event Types
//!
//! Input and intermediate records of the conversion pipeline.
//!
//! ## Type Hierarchy
//! ```text
//! Song
//!   ├── ticks_per_beat (as declared, may be <= 0)
//!   ├── key, time_signature, tempo_bpm (initial values)
//!   └── Vec<TrackInput>
//!         ├── name
//!         └── Vec<RawMessage> (NoteOn | NoteOff | TimeSignature | SetTempo)
//!
//! TrackEvent (normalized, absolute ticks)
//!   ├── Note(NoteEvent)         start_tick, pitch, velocity, duration_ticks
//!   ├── TimeSig(TimeSigEvent)   tick, signature
//!   └── Tempo(TempoEvent)       tick, bpm
//! ```
//!
//! ## Key Concepts
//!
//! ### Delta vs absolute time
//! Raw messages carry the tick distance to the previous message of the same
//! track (`delta`). The normalizer sums them into absolute ticks.
//!
//! ### Time signature denominators
//! `denominator` holds the real note value (4 for quarter, 8 for eighth),
//! not the power of two stored inside MIDI files.
//!
//! ## Related Modules
//! - `normalize` - turns `RawMessage` lists into `TrackEvent` lists
//! - `layout` - consumes `TrackEvent` lists
//! - `midi` - builds a `Song` from Standard MIDI File bytes

use std::fmt;

/// Absolute position or length in MIDI ticks.
pub type Tick = u64;

/// Fallback when the source declares no usable ticks-per-beat.
pub const DEFAULT_TICKS_PER_BEAT: u64 = 480;

/// Time signature (e.g., 4/4, 3/4, 6/8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl TimeSignature {
    pub const fn new(numerator: u8, denominator: u8) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// One raw timed message of a track, as extracted from the source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawMessage {
    /// Note on. A velocity of 0 is treated as a note off.
    NoteOn { pitch: u8, velocity: u8, delta: u32 },
    NoteOff { pitch: u8, delta: u32 },
    TimeSignature {
        numerator: u8,
        denominator: u8,
        delta: u32,
    },
    SetTempo { bpm: f64, delta: u32 },
}

impl RawMessage {
    /// Ticks since the previous message of the track.
    pub fn delta(&self) -> u32 {
        match self {
            RawMessage::NoteOn { delta, .. }
            | RawMessage::NoteOff { delta, .. }
            | RawMessage::TimeSignature { delta, .. }
            | RawMessage::SetTempo { delta, .. } => *delta,
        }
    }

    pub fn note_on(pitch: u8, velocity: u8, delta: u32) -> Self {
        RawMessage::NoteOn {
            pitch,
            velocity,
            delta,
        }
    }

    pub fn note_off(pitch: u8, delta: u32) -> Self {
        RawMessage::NoteOff { pitch, delta }
    }
}

/// A resolved note with absolute start and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub start_tick: Tick,
    pub pitch: u8,
    pub velocity: u8,
    /// Always > 0
    pub duration_ticks: Tick,
}

impl NoteEvent {
    pub fn end_tick(&self) -> Tick {
        self.start_tick + self.duration_ticks
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSigEvent {
    pub tick: Tick,
    pub signature: TimeSignature,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoEvent {
    pub tick: Tick,
    pub bpm: f64,
}

/// A normalized event of one track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackEvent {
    Note(NoteEvent),
    TimeSig(TimeSigEvent),
    Tempo(TempoEvent),
}

impl TrackEvent {
    pub fn tick(&self) -> Tick {
        match self {
            TrackEvent::Note(n) => n.start_tick,
            TrackEvent::TimeSig(t) => t.tick,
            TrackEvent::Tempo(t) => t.tick,
        }
    }
}

/// One track of the input: a name and its raw messages in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackInput {
    pub name: String,
    pub messages: Vec<RawMessage>,
}

impl TrackInput {
    pub fn new(name: impl Into<String>, messages: Vec<RawMessage>) -> Self {
        Self {
            name: name.into(),
            messages,
        }
    }
}

/// Everything a conversion run needs to know about the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    /// As declared by the source; values <= 0 fall back to 480
    pub ticks_per_beat: i64,
    pub key: String,
    pub time_signature: TimeSignature,
    pub tempo_bpm: f64,
    pub tracks: Vec<TrackInput>,
}

impl Song {
    /// A song with the default key (C), 4/4 and 120 BPM and no tracks.
    pub fn new(ticks_per_beat: i64) -> Self {
        Self {
            ticks_per_beat,
            key: "C".to_string(),
            time_signature: TimeSignature::default(),
            tempo_bpm: 120.0,
            tracks: Vec::new(),
        }
    }

    pub fn with_track(mut self, track: TrackInput) -> Self {
        self.tracks.push(track);
        self
    }
}
