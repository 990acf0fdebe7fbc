//! # Configuration
//!
//! Every tunable of the conversion, passed explicitly to the pipeline.
//!
//! ## YAML format
//! All keys are optional; missing keys keep their defaults.
//! ```yaml
//! default-ticks-per-beat: 480
//! default-key: C
//! default-time-signature: 4/4
//! default-tempo: 120
//! min-rest-ticks: 5
//! max-quantization-error: 0.25   # beats
//! bar-number-interval: 5
//! dynamics: true
//! elide-whole-measure-rests: false
//! velocity-thresholds:
//!   ppp: 16
//!   pp: 32
//!   p: 63
//!   mp: 79
//!   mf: 95
//!   f: 111
//!   ff: 126
//!   fff: 127
//! ```
//!
//! ## Example
//! ```rust
//! use miditext::ConvertConfig;
//!
//! let config = ConvertConfig::from_yaml_str("min-rest-ticks: 10\ndynamics: false").unwrap();
//! assert_eq!(config.min_rest_ticks, 10);
//! assert!(!config.dynamics);
//! ```

use crate::dynamics::{Dynamic, VelocityTable};
use crate::error::ConvertError;
use crate::events::{TimeSignature, DEFAULT_TICKS_PER_BEAT};
use crate::quantize::DEFAULT_MAX_ERROR_BEATS;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Conversion settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertConfig {
    /// Used when the source declares ticks-per-beat <= 0
    pub default_ticks_per_beat: u64,
    /// Used when the source has no key signature
    pub default_key: String,
    /// Used when the source has no time signature
    pub default_time_signature: TimeSignature,
    pub default_tempo: f64,
    /// Silent gaps shorter than this are absorbed instead of becoming rests
    pub min_rest_ticks: u64,
    /// Quantization error (in beats) above which a warning is raised
    pub max_quantization_error: f64,
    pub velocity_table: VelocityTable,
    /// Bar lines carry their measure number on measure 1 and every n-th measure
    pub bar_number_interval: u64,
    /// Emit `dyn(..)` markers
    pub dynamics: bool,
    /// Drop plain whole rests that start on a measure boundary
    pub elide_whole_measure_rests: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            default_ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            default_key: "C".to_string(),
            default_time_signature: TimeSignature::default(),
            default_tempo: 120.0,
            min_rest_ticks: 5,
            max_quantization_error: DEFAULT_MAX_ERROR_BEATS,
            velocity_table: VelocityTable::default(),
            bar_number_interval: 5,
            dynamics: true,
            elide_whole_measure_rests: false,
        }
    }
}

/// Raw configuration for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawConfig {
    pub default_ticks_per_beat: Option<u64>,
    pub default_key: Option<String>,
    pub default_time_signature: Option<String>,
    pub default_tempo: Option<f64>,
    pub min_rest_ticks: Option<u64>,
    pub max_quantization_error: Option<f64>,
    pub bar_number_interval: Option<u64>,
    pub dynamics: Option<bool>,
    pub elide_whole_measure_rests: Option<bool>,
    pub velocity_thresholds: Option<BTreeMap<String, u8>>,
}

impl ConvertConfig {
    /// Parse a YAML document. An empty document yields the defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConvertError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| ConvertError::Config(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Read and parse a YAML configuration file.
    pub fn from_path(path: &Path) -> Result<Self, ConvertError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        Self::from_yaml_str(&content)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConvertError> {
        let defaults = Self::default();

        let default_ticks_per_beat = match raw.default_ticks_per_beat {
            Some(0) => {
                return Err(ConvertError::Config(
                    "default-ticks-per-beat must be positive".to_string(),
                ))
            }
            Some(tpb) => tpb,
            None => defaults.default_ticks_per_beat,
        };

        let default_time_signature = match &raw.default_time_signature {
            Some(ts) => parse_time_signature(ts)?,
            None => defaults.default_time_signature,
        };

        let default_tempo = match raw.default_tempo {
            Some(bpm) if !(bpm.is_finite() && bpm > 0.0) => {
                return Err(ConvertError::Config(format!(
                    "default-tempo must be a positive number, got {}",
                    bpm
                )))
            }
            Some(bpm) => bpm,
            None => defaults.default_tempo,
        };

        let max_quantization_error = match raw.max_quantization_error {
            Some(err) if !(err.is_finite() && err >= 0.0) => {
                return Err(ConvertError::Config(format!(
                    "max-quantization-error must be a non-negative number, got {}",
                    err
                )))
            }
            Some(err) => err,
            None => defaults.max_quantization_error,
        };

        let bar_number_interval = match raw.bar_number_interval {
            Some(0) => {
                return Err(ConvertError::Config(
                    "bar-number-interval must be positive".to_string(),
                ))
            }
            Some(n) => n,
            None => defaults.bar_number_interval,
        };

        let velocity_table = match raw.velocity_thresholds {
            Some(map) => parse_velocity_thresholds(&map)?,
            None => defaults.velocity_table,
        };

        Ok(Self {
            default_ticks_per_beat,
            default_key: raw
                .default_key
                .map(|k| k.trim().to_string())
                .unwrap_or(defaults.default_key),
            default_time_signature,
            default_tempo,
            min_rest_ticks: raw.min_rest_ticks.unwrap_or(defaults.min_rest_ticks),
            max_quantization_error,
            velocity_table,
            bar_number_interval,
            dynamics: raw.dynamics.unwrap_or(defaults.dynamics),
            elide_whole_measure_rests: raw
                .elide_whole_measure_rests
                .unwrap_or(defaults.elide_whole_measure_rests),
        })
    }
}

fn parse_time_signature(s: &str) -> Result<TimeSignature, ConvertError> {
    let parts: Vec<&str> = s.split('/').collect();
    if parts.len() != 2 {
        return Err(ConvertError::Config(format!(
            "Invalid time signature: {} (expected N/D)",
            s
        )));
    }

    let numerator: u8 = parts[0]
        .trim()
        .parse()
        .map_err(|_| ConvertError::Config(format!("Invalid time signature numerator: {}", parts[0])))?;
    let denominator: u8 = parts[1]
        .trim()
        .parse()
        .map_err(|_| ConvertError::Config(format!("Invalid time signature denominator: {}", parts[1])))?;

    if numerator == 0 || denominator == 0 {
        return Err(ConvertError::Config(format!(
            "Time signature parts must be positive: {}",
            s
        )));
    }

    Ok(TimeSignature::new(numerator, denominator))
}

fn parse_velocity_thresholds(map: &BTreeMap<String, u8>) -> Result<VelocityTable, ConvertError> {
    if map.is_empty() {
        return Err(ConvertError::Config(
            "velocity-thresholds must not be empty".to_string(),
        ));
    }
    let mut entries = Vec::with_capacity(map.len());
    for (symbol, bound) in map {
        let dynamic: Dynamic = symbol.parse().map_err(ConvertError::Config)?;
        if *bound > 127 {
            return Err(ConvertError::Config(format!(
                "Velocity threshold for {} must be <= 127, got {}",
                symbol, bound
            )));
        }
        entries.push((dynamic, *bound));
    }
    Ok(VelocityTable::new(entries))
}
