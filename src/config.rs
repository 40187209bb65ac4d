//! Sonification configuration — tracks, scales, tempo.
//!
//! These types mirror the JSON the studio UI exchanges, so every field uses
//! the app's camelCase names. All clamping happens here: a configuration is
//! normalized on use, never rejected for out-of-range slider values.

use serde::{Deserialize, Serialize};

/// The fixed set of instrument voices a track can be mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Instrument {
    SustainedPad,
    PluckedTone,
    PercussionKit,
}

impl Instrument {
    /// Name of the wavetable preset this instrument resolves to.
    ///
    /// Builtin synth definitions are registered under these names at session
    /// creation; catalog loads replace them with the hosted wavetable fonts.
    pub fn preset_name(self) -> &'static str {
        match self {
            Instrument::SustainedPad => "FluidR3_GM/Pad 2 (warm)",
            Instrument::PluckedTone => "FluidR3_GM/Acoustic Guitar (nylon)",
            Instrument::PercussionKit => "FluidR3_GM/Standard Kit",
        }
    }

    pub fn is_melodic(self) -> bool {
        !matches!(self, Instrument::PercussionKit)
    }
}

/// Rhythm mode for melodic tracks. Ignored for percussion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rhythm {
    Sustained,
    ArpeggioAscending,
    ArpeggioDescending,
}

/// Musical key the melodic mapping is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Major,
    Minor,
}

/// Value window a track responds to. Data points outside the window are
/// skipped (no note that frame), they do not re-anchor the pitch mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterRange {
    pub min: f64,
    pub max: f64,
}

impl FilterRange {
    /// Invariant `min <= max`, restored by pulling `min` down onto `max`.
    pub fn normalized(self) -> FilterRange {
        FilterRange { min: self.min.min(self.max), max: self.max }
    }

    pub fn contains(&self, value: f64) -> bool {
        let r = self.normalized();
        value >= r.min && value <= r.max
    }
}

impl Default for FilterRange {
    fn default() -> Self {
        FilterRange { min: f64::NEG_INFINITY, max: f64::INFINITY }
    }
}

/// One voice: a pollutant series mapped onto an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Pollutant code, key into the series map (e.g. "NO2", "PM10").
    pub pollutant: String,
    pub instrument: Instrument,
    /// Register shift for melodic instruments (MIDI octave of the tonic).
    #[serde(default = "default_octave")]
    pub octave: i32,
    #[serde(default = "default_rhythm")]
    pub rhythm: Rhythm,
    #[serde(default)]
    pub filter_range: FilterRange,
    /// Gain multiplier, clamped to [0, 1] on use.
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default)]
    pub is_muted: bool,
}

fn default_octave() -> i32 {
    4
}

fn default_rhythm() -> Rhythm {
    Rhythm::Sustained
}

fn default_volume() -> f64 {
    1.0
}

impl Track {
    pub fn gain(&self) -> f64 {
        self.volume.clamp(0.0, 1.0)
    }
}

/// Percussion band thresholds as ratios of the series range.
///
/// The 0.2/0.6 split mimics the original intent of percussion density
/// tracking pollution severity; kept configurable rather than hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercussionBands {
    pub low_ratio: f64,
    pub high_ratio: f64,
}

impl Default for PercussionBands {
    fn default() -> Self {
        PercussionBands { low_ratio: 0.2, high_ratio: 0.6 }
    }
}

/// A full sonification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SonifyOptions {
    pub tracks: Vec<Track>,
    #[serde(default = "default_key")]
    pub key: Key,
    /// Seconds per data frame, shared by all tracks so they stay in lockstep.
    pub step_duration: f64,
    /// Number of frames to cover — the length of the visual series being
    /// synchronized against, which may differ from any one track's data.
    pub master_length: usize,
    #[serde(default)]
    pub percussion: PercussionBands,
}

fn default_key() -> Key {
    Key::Major
}

impl SonifyOptions {
    /// Total playback/render duration in seconds.
    pub fn total_duration_sec(&self) -> f64 {
        self.master_length as f64 * self.step_duration
    }
}
