//! # Duration Quantizer
//!
//! Maps an arbitrary tick length to the nearest standard note value.
//!
//! ## Algorithm
//! 1. Reject `ticks <= 0` or `ticks_per_beat <= 0` with the unknown code `/?`
//! 2. Convert to beats: `ticks / ticks_per_beat` (a beat is always a quarter
//!    note, whatever the time signature says)
//! 3. Scan [`DURATION_TABLE`] for the smallest absolute difference. The scan
//!    only replaces the best match on a strictly smaller difference, so a tie
//!    goes to the entry listed first.
//! 4. If even the best difference exceeds the allowed error, the code is still
//!    returned but marked low-confidence.
//!
//! ## Example
//! ```rust
//! use miditext::quantize::{quantize, DurationCode, NoteValue};
//!
//! assert_eq!(quantize(480, 480), DurationCode::plain(NoteValue::Quarter));
//! assert_eq!(quantize(720, 480).to_string(), "/4.");
//! assert_eq!(quantize(0, 480), DurationCode::Unknown);
//! ```

use std::fmt;

/// Default upper bound, in beats, for a confident match.
pub const DEFAULT_MAX_ERROR_BEATS: f64 = 0.25;

/// Base note values, longest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteValue {
    DoubleWhole,
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    SixtyFourth,
}

impl NoteValue {
    /// Length in quarter-note beats
    pub fn beats(&self) -> f64 {
        match self {
            NoteValue::DoubleWhole => 8.0,
            NoteValue::Whole => 4.0,
            NoteValue::Half => 2.0,
            NoteValue::Quarter => 1.0,
            NoteValue::Eighth => 0.5,
            NoteValue::Sixteenth => 0.25,
            NoteValue::ThirtySecond => 0.125,
            NoteValue::SixtyFourth => 0.0625,
        }
    }

    /// The number written after the slash
    pub fn label(&self) -> &'static str {
        match self {
            NoteValue::DoubleWhole => "0.5",
            NoteValue::Whole => "1",
            NoteValue::Half => "2",
            NoteValue::Quarter => "4",
            NoteValue::Eighth => "8",
            NoteValue::Sixteenth => "16",
            NoteValue::ThirtySecond => "32",
            NoteValue::SixtyFourth => "64",
        }
    }
}

/// Symbolic duration: a note value, optionally dotted, or unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationCode {
    Known { value: NoteValue, dotted: bool },
    /// Rendered as `/?`
    Unknown,
}

impl DurationCode {
    pub const fn plain(value: NoteValue) -> Self {
        DurationCode::Known {
            value,
            dotted: false,
        }
    }

    pub const fn dotted(value: NoteValue) -> Self {
        DurationCode::Known {
            value,
            dotted: true,
        }
    }

    /// Nominal length in beats (dotted = 1.5x).
    pub fn beats(&self) -> Option<f64> {
        match self {
            DurationCode::Known { value, dotted } => {
                let base = value.beats();
                Some(if *dotted { base * 1.5 } else { base })
            }
            DurationCode::Unknown => None,
        }
    }

    /// Nominal length in ticks, rounded to the nearest tick.
    pub fn to_ticks(&self, ticks_per_beat: i64) -> Option<i64> {
        if ticks_per_beat <= 0 {
            return None;
        }
        self.beats()
            .map(|beats| (beats * ticks_per_beat as f64).round() as i64)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, DurationCode::Unknown)
    }
}

impl fmt::Display for DurationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationCode::Known { value, dotted } => {
                write!(f, "/{}", value.label())?;
                if *dotted {
                    f.write_str(".")?;
                }
                Ok(())
            }
            DurationCode::Unknown => f.write_str("/?"),
        }
    }
}

/// Candidate table. Order matters: equal distances resolve to the earlier
/// entry.
pub const DURATION_TABLE: [(f64, DurationCode); 13] = [
    (8.0, DurationCode::plain(NoteValue::DoubleWhole)),
    (4.0, DurationCode::plain(NoteValue::Whole)),
    (3.0, DurationCode::dotted(NoteValue::Half)),
    (2.0, DurationCode::plain(NoteValue::Half)),
    (1.5, DurationCode::dotted(NoteValue::Quarter)),
    (1.0, DurationCode::plain(NoteValue::Quarter)),
    (0.75, DurationCode::dotted(NoteValue::Eighth)),
    (0.5, DurationCode::plain(NoteValue::Eighth)),
    (0.375, DurationCode::dotted(NoteValue::Sixteenth)),
    (0.25, DurationCode::plain(NoteValue::Sixteenth)),
    (0.1875, DurationCode::dotted(NoteValue::ThirtySecond)),
    (0.125, DurationCode::plain(NoteValue::ThirtySecond)),
    (0.0625, DurationCode::plain(NoteValue::SixtyFourth)),
];

/// Full result of one quantization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantization {
    pub code: DurationCode,
    /// Input length in beats (0.0 for invalid input)
    pub beats: f64,
    /// Distance in beats to the chosen table entry
    pub error_beats: f64,
    /// The nearest entry is further away than the allowed error
    pub low_confidence: bool,
}

impl Quantization {
    fn unknown() -> Self {
        Self {
            code: DurationCode::Unknown,
            beats: 0.0,
            error_beats: 0.0,
            low_confidence: false,
        }
    }
}

/// Quantize with the default tolerance and return only the code.
pub fn quantize(ticks: i64, ticks_per_beat: i64) -> DurationCode {
    quantize_detailed(ticks, ticks_per_beat, DEFAULT_MAX_ERROR_BEATS).code
}

/// Quantize and report how good the match is.
pub fn quantize_detailed(ticks: i64, ticks_per_beat: i64, max_error_beats: f64) -> Quantization {
    if ticks <= 0 || ticks_per_beat <= 0 {
        return Quantization::unknown();
    }

    let beats = ticks as f64 / ticks_per_beat as f64;

    let mut best: Option<(f64, DurationCode)> = None;
    for (value, code) in DURATION_TABLE.iter() {
        let difference = (beats - value).abs();
        match best {
            Some((best_difference, _)) if difference >= best_difference => {}
            _ => best = Some((difference, *code)),
        }
    }

    match best {
        Some((error_beats, code)) => Quantization {
            code,
            beats,
            error_beats,
            low_confidence: error_beats > max_error_beats,
        },
        None => Quantization::unknown(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_plain_values() {
        let tpb = 480;
        assert_eq!(quantize(tpb, tpb).to_string(), "/4");
        assert_eq!(quantize(2 * tpb, tpb).to_string(), "/2");
        assert_eq!(quantize(4 * tpb, tpb).to_string(), "/1");
        assert_eq!(quantize(8 * tpb, tpb).to_string(), "/0.5");
        assert_eq!(quantize(tpb / 2, tpb).to_string(), "/8");
        assert_eq!(quantize(tpb / 16, tpb).to_string(), "/64");
    }

    #[test]
    fn test_exact_dotted_values() {
        assert_eq!(quantize(1440, 480).to_string(), "/2.");
        assert_eq!(quantize(720, 480).to_string(), "/4.");
        assert_eq!(quantize(360, 480).to_string(), "/8.");
        assert_eq!(quantize(180, 480).to_string(), "/16.");
        assert_eq!(quantize(90, 480).to_string(), "/32.");
    }

    #[test]
    fn test_other_resolutions() {
        assert_eq!(quantize(96, 96).to_string(), "/4");
        assert_eq!(quantize(48, 96).to_string(), "/8");
        assert_eq!(quantize(384, 96).to_string(), "/1");
    }

    #[test]
    fn test_nearest_neighbor() {
        // 2.083 beats: 0.083 from half, 0.917 from dotted half
        assert_eq!(quantize(1000, 480).to_string(), "/2");
        // 0.9 beats: closest to quarter
        assert_eq!(quantize(432, 480).to_string(), "/4");
        // 1.3 beats: 0.2 from dotted quarter, 0.3 from quarter
        assert_eq!(quantize(624, 480).to_string(), "/4.");
    }

    #[test]
    fn test_tie_prefers_first_entry() {
        // 2.5 beats sits exactly between dotted half (3.0) and half (2.0)
        assert_eq!(quantize(1200, 480).to_string(), "/2.");
        // 6 beats is exactly between double whole (8.0) and whole (4.0)
        assert_eq!(quantize(2880, 480).to_string(), "/0.5");
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(quantize(0, 480), DurationCode::Unknown);
        assert_eq!(quantize(-5, 480), DurationCode::Unknown);
        assert_eq!(quantize(480, 0), DurationCode::Unknown);
        assert_eq!(quantize(480, -480), DurationCode::Unknown);
        assert_eq!(DurationCode::Unknown.to_string(), "/?");
    }

    #[test]
    fn test_very_long_durations_still_match() {
        let q = quantize_detailed(480 * 20, 480, DEFAULT_MAX_ERROR_BEATS);
        assert_eq!(q.code.to_string(), "/0.5");
        assert!(q.low_confidence);
        assert!((q.error_beats - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_low_confidence_flag() {
        // 5.0 beats: 1.0 from whole
        let q = quantize_detailed(2400, 480, 0.25);
        assert_eq!(q.code.to_string(), "/1");
        assert!(q.low_confidence);

        let q = quantize_detailed(2400, 480, 1.5);
        assert!(!q.low_confidence);

        // within tolerance
        let q = quantize_detailed(500, 480, 0.25);
        assert_eq!(q.code.to_string(), "/4");
        assert!(!q.low_confidence);
    }

    #[test]
    fn test_requantize_nominal_ticks() {
        for tpb in [96_i64, 120, 384, 480, 960] {
            for ticks in (1..=tpb * 9).step_by(7) {
                let code = quantize(ticks, tpb);
                let nominal = code.to_ticks(tpb).unwrap();
                assert_eq!(quantize(nominal, tpb), code, "ticks={} tpb={}", ticks, tpb);
            }
        }
    }

    #[test]
    fn test_to_ticks() {
        assert_eq!(DurationCode::dotted(NoteValue::Quarter).to_ticks(480), Some(720));
        assert_eq!(DurationCode::plain(NoteValue::Whole).to_ticks(96), Some(384));
        assert_eq!(DurationCode::Unknown.to_ticks(480), None);
        assert_eq!(DurationCode::plain(NoteValue::Whole).to_ticks(0), None);
    }
}
