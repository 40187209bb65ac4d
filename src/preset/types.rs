//! Wavetable preset schema.
//!
//! Maps directly to the `preset.json` format of the hosted instrument
//! library the catalog feature fetches from: a descriptor with either a
//! sampler definition (key-mapped sample zones) or a synth patch
//! (oscillator + envelope) for the builtin voices.

use serde::{Deserialize, Serialize};

// ── Preset Descriptor (top-level) ───────────────────────────

/// Top-level preset descriptor. Each `preset.json` contains one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetDescriptor {
    /// Unique identifier (e.g., "fluidr3-gm-pad-2-warm").
    pub id: String,
    /// Registry name used by tracks (e.g., "FluidR3_GM/Pad 2 (warm)").
    pub name: String,
    /// Searchable tags (e.g., ["melodic", "pad", "gm:89"]).
    #[serde(default)]
    pub tags: Vec<String>,
    /// The instrument definition itself.
    pub instrument: InstrumentNode,
}

/// The two instrument shapes the engine can voice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InstrumentNode {
    Synth { config: SynthConfig },
    Sampler { config: SamplerConfig },
}

// ── Synth patches ───────────────────────────────────────────

/// An oscillator-based patch — the builtin voices are these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    pub waveform: WaveformType,
    /// Detune in cents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detune: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<AdsrConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveformType {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

// ── Sampler presets ─────────────────────────────────────────

/// A key-mapped wavetable instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Sample zones covering the MIDI key range.
    pub zones: Vec<SampleZone>,
    /// Drum kits trigger zones one-shot at native pitch.
    #[serde(default, rename = "isDrumKit")]
    pub is_drum_kit: bool,
    /// Optional envelope override applied to every zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<AdsrConfig>,
}

/// A single sample zone within a sampler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleZone {
    #[serde(rename = "keyRange")]
    pub key_range: KeyRange,
    pub pitch: ZonePitch,
    /// Native sample rate of the audio data.
    #[serde(rename = "sampleRate")]
    pub sample_rate: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#loop: Option<LoopPoints>,
    pub audio: AudioReference,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KeyRange {
    pub low: u8,
    pub high: u8,
}

/// Pitch information for a sample zone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZonePitch {
    /// The MIDI note the sample was recorded at (0-127).
    #[serde(rename = "rootNote")]
    pub root_note: u8,
    /// Fine tune offset in cents (-100 to +100).
    #[serde(default, rename = "fineTuneCents")]
    pub fine_tune_cents: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoopPoints {
    pub start: u64,
    pub end: u64,
}

/// Reference to a zone's audio data — inline or hosted next to the preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AudioReference {
    /// Raw 16-bit PCM, base64 encoded.
    InlinePcm {
        data: String,
        #[serde(rename = "bitsPerSample")]
        bits_per_sample: u8,
    },
    /// Compressed audio file, base64 encoded.
    InlineFile { data: String, codec: AudioCodec },
    /// External URL (relative to the preset.json location).
    External {
        url: String,
        codec: AudioCodec,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sha256: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Wav,
    Mp3,
}

// ── ADSR Envelope ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdsrConfig {
    /// Attack time in seconds.
    pub attack: f64,
    /// Decay time in seconds.
    pub decay: f64,
    /// Sustain level [0.0, 1.0].
    pub sustain: f64,
    /// Release time in seconds.
    pub release: f64,
}

// ── Catalog index (from index.json) ─────────────────────────

/// An entry in the hosted library's root `index.json`. Enough metadata to
/// locate a preset by name without loading the full definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    /// Relative path to preset.json in the library.
    pub path: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// The root index.json structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryIndex {
    pub version: u32,
    pub presets: Vec<CatalogEntry>,
}

// ── Playback rate ───────────────────────────────────────────

/// Playback-rate multiplier for a sample to sound at the target pitch.
/// 1.0 = original speed, 2.0 = one octave up.
pub fn sample_playback_rate(target_midi_note: u8, root_note: u8, fine_tune_cents: f64) -> f64 {
    let semitone_diff = target_midi_note as f64 - root_note as f64 - fine_tune_cents / 100.0;
    (2.0_f64).powf(semitone_diff / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_rate_root_note() {
        let rate = sample_playback_rate(60, 60, 0.0);
        assert!((rate - 1.0).abs() < 0.0001, "root note rate should be 1.0, got {rate}");
    }

    #[test]
    fn playback_rate_octave_up_and_down() {
        assert!((sample_playback_rate(72, 60, 0.0) - 2.0).abs() < 0.0001);
        assert!((sample_playback_rate(48, 60, 0.0) - 0.5).abs() < 0.0001);
    }

    #[test]
    fn playback_rate_fine_tune() {
        let rate = sample_playback_rate(60, 60, -6.0);
        let expected = (2.0_f64).powf(6.0 / 1200.0);
        assert!(
            (rate - expected).abs() < 0.0001,
            "fineTune -6 cents should compensate to ~{expected}, got {rate}"
        );
    }

    #[test]
    fn descriptor_json_round_trip() {
        let json = r#"{
            "id": "fluidr3-gm-standard-kit",
            "name": "FluidR3_GM/Standard Kit",
            "tags": ["percussion", "kit"],
            "instrument": {
                "type": "sampler",
                "config": {
                    "isDrumKit": true,
                    "zones": [{
                        "keyRange": { "low": 36, "high": 36 },
                        "pitch": { "rootNote": 36 },
                        "sampleRate": 44100,
                        "audio": { "type": "inline-pcm", "data": "AAA=", "bitsPerSample": 16 }
                    }]
                }
            }
        }"#;
        let descriptor: PresetDescriptor = serde_json::from_str(json).expect("descriptor parses");
        match &descriptor.instrument {
            InstrumentNode::Sampler { config } => {
                assert!(config.is_drum_kit);
                assert_eq!(config.zones.len(), 1);
                assert_eq!(config.zones[0].pitch.root_note, 36);
                assert_eq!(config.zones[0].pitch.fine_tune_cents, 0.0);
            }
            other => panic!("expected sampler, got {other:?}"),
        }
    }

    #[test]
    fn synth_descriptor_parses() {
        let json = r#"{
            "id": "builtin-pad",
            "name": "Builtin/Pad",
            "instrument": {
                "type": "synth",
                "config": {
                    "waveform": "triangle",
                    "envelope": { "attack": 0.08, "decay": 0.2, "sustain": 0.8, "release": 0.3 }
                }
            }
        }"#;
        let descriptor: PresetDescriptor = serde_json::from_str(json).unwrap();
        match descriptor.instrument {
            InstrumentNode::Synth { config } => {
                assert_eq!(config.waveform, WaveformType::Triangle);
                assert!(config.envelope.is_some());
            }
            other => panic!("expected synth, got {other:?}"),
        }
    }
}
