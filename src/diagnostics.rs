//! # Diagnostics
//!
//! Non-fatal findings collected during a conversion run.
//!
//! Every recoverable anomaly (a re-triggered note, a dangling note at the end
//! of a track, a duration far from any standard value, a track that had to be
//! skipped) becomes one [`Diagnostic`]. They are returned alongside the text
//! in [`Conversion`](crate::Conversion) and never dropped. Each push is also
//! logged through `tracing` at the matching level.

use serde::Serialize;
use std::fmt;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Degenerate input that was dropped without changing the result much
    Info,
    /// Input was repaired or approximated
    Warning,
    /// Part of the output was replaced by an error marker
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// What kind of anomaly a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// The source declared ticks-per-beat <= 0 (or SMPTE timing)
    InvalidTicksPerBeat,
    /// A note-on arrived for a pitch that was still sounding
    RetriggeredNote,
    /// A note was still open when its track ended
    DanglingNote,
    /// A note-off arrived for a pitch that was not sounding
    OrphanNoteOff,
    /// A note closed on the same tick it opened
    ZeroDurationNote,
    /// A pitch number outside 0-127
    InvalidPitch,
    /// A velocity outside 0-127
    InvalidVelocity,
    /// A time-signature denominator that cannot be represented
    InvalidTimeSignature,
    /// The nearest standard duration is further away than the tolerance
    LowConfidenceDuration,
    /// A duration could not be quantized at all
    UnquantizableDuration,
    /// The measure length computed to zero; the track was skipped
    InvalidMeasureLength,
}

/// One non-fatal finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick: Option<u64>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        if let Some(track) = self.track {
            write!(f, " [track {}", track)?;
            if let Some(tick) = self.tick {
                write!(f, " @ {}", tick)?;
            }
            write!(f, "]")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Accumulator handed through the pipeline.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and log it.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Info => tracing::debug!(kind = ?diagnostic.kind, "{}", diagnostic),
            Severity::Warning => tracing::warn!(kind = ?diagnostic.kind, "{}", diagnostic),
            Severity::Error => tracing::error!(kind = ?diagnostic.kind, "{}", diagnostic),
        }
        self.items.push(diagnostic);
    }

    pub fn report(
        &mut self,
        severity: Severity,
        kind: DiagnosticKind,
        track: Option<usize>,
        tick: Option<u64>,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic {
            severity,
            kind,
            track,
            tick,
            message: message.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
