//! Note builder — turns pollutant series + configuration into note events.
//!
//! This is the deterministic heart of the engine: the full note list for a
//! pass is computed up front from `(series, options)`, never incrementally,
//! so realtime playback and the offline export render stay sample-locked on
//! identical output. No I/O happens here.

use serde::{Deserialize, Serialize};

use crate::config::{Key, PercussionBands, Rhythm, SonifyOptions, Track};
use crate::error::{ConfigError, SonifyError};
use crate::series::{SeriesMap, SeriesStats};

/// Semitone offsets of the 7-tone scales, from the tonic.
pub const MAJOR_DEGREES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];
pub const MINOR_DEGREES: [i32; 7] = [0, 2, 3, 5, 7, 8, 10];

const SCALE_LEN: usize = 7;

/// GM drum map notes for the percussion bands.
pub const KICK: u8 = 36;
pub const SNARE: u8 = 38;
pub const CLOSED_HAT: u8 = 42;

/// Fraction of a step (or arpeggio sub-step) a note actually sounds.
const DUTY_CYCLE: f64 = 0.9;

/// One discrete sound trigger. Immutable value, serialized with the app's
/// field names so the web exporter consumes the list as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    /// Index of the originating track in the configuration.
    pub track_id: usize,
    #[serde(rename = "instrumentPresetName")]
    pub preset_name: String,
    pub midi_note: u8,
    pub start_time_sec: f64,
    pub duration_sec: f64,
    pub gain: f64,
    pub is_percussive: bool,
}

/// The builder output: all notes for one pass plus the timing frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteList {
    /// Notes grouped by track, frame-ascending within each track. Each note
    /// carries its own absolute time; consumers must not rely on any global
    /// sort order beyond that.
    pub notes: Vec<NoteEvent>,
    pub master_length: usize,
    pub step_duration: f64,
    pub total_duration_sec: f64,
}

/// Build the complete note list for frames `0..master_length`.
///
/// Tracks are processed in configuration order. A muted track, an unknown
/// pollutant, or a series with no finite values contributes zero notes —
/// only a non-positive `step_duration` or a zero `master_length` is an error.
pub fn build_notes(data: &SeriesMap, options: &SonifyOptions) -> Result<NoteList, SonifyError> {
    if !options.step_duration.is_finite() || options.step_duration <= 0.0 {
        return Err(ConfigError::NonPositiveStepDuration { value: options.step_duration }.into());
    }
    if options.master_length == 0 {
        return Err(ConfigError::ZeroMasterLength.into());
    }

    let mut notes = Vec::new();
    for (track_id, track) in options.tracks.iter().enumerate() {
        if track.is_muted {
            continue;
        }
        let Some(series) = data.get(&track.pollutant) else {
            continue;
        };
        let Some(stats) = SeriesStats::scan(series) else {
            continue;
        };

        let frames = series.len().min(options.master_length);
        for i in 0..frames {
            let v = series[i].value;
            if !v.is_finite() || !track.filter_range.contains(v) {
                continue;
            }
            let time = i as f64 * options.step_duration;
            if track.instrument.is_melodic() {
                emit_melodic(&mut notes, track_id, track, options.key, v, stats, time, options.step_duration);
            } else {
                emit_percussion(
                    &mut notes,
                    track_id,
                    track,
                    v,
                    stats,
                    &options.percussion,
                    time,
                    options.step_duration,
                );
            }
        }
    }

    Ok(NoteList {
        notes,
        master_length: options.master_length,
        step_duration: options.step_duration,
        total_duration_sec: options.total_duration_sec(),
    })
}

// ── Melodic mapping ─────────────────────────────────────────

fn scale_degrees(key: Key) -> &'static [i32; 7] {
    match key {
        Key::Major => &MAJOR_DEGREES,
        Key::Minor => &MINOR_DEGREES,
    }
}

/// Linear remap of `v` from `[in_min, in_max]` onto `[out_min, out_max]`.
fn map_range(v: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    out_min + (v - in_min) / (in_max - in_min) * (out_max - out_min)
}

/// Map a value onto an index over `2 × 7 − 1` scale steps (two octaves of
/// the scale minus the duplicated top tonic), floor-based so equal-width
/// value bands land on each step. A flat series maps to the midpoint step.
fn scale_step_index(v: f64, stats: SeriesStats) -> usize {
    let top = (2 * SCALE_LEN - 1) as i64;
    if stats.is_flat() {
        return top as usize / 2;
    }
    let mapped = map_range(v, stats.min, stats.max, 0.0, top as f64);
    (mapped.floor() as i64).clamp(0, top) as usize
}

/// MIDI pitch of a scale step: tonic register + degree, stepping up an
/// octave every `SCALE_LEN` steps.
pub fn midi_for_step(key: Key, octave: i32, index: usize) -> u8 {
    let degrees = scale_degrees(key);
    let semis = 12 * octave + degrees[index % SCALE_LEN] + 12 * (index / SCALE_LEN) as i32;
    semis.clamp(0, 127) as u8
}

fn transpose(midi: u8, semitones: i32) -> u8 {
    (midi as i32 + semitones).clamp(0, 127) as u8
}

#[allow(clippy::too_many_arguments)]
fn emit_melodic(
    notes: &mut Vec<NoteEvent>,
    track_id: usize,
    track: &Track,
    key: Key,
    v: f64,
    stats: SeriesStats,
    time: f64,
    step: f64,
) {
    let base = midi_for_step(key, track.octave, scale_step_index(v, stats));
    let preset = track.instrument.preset_name();
    let gain = track.gain();

    match track.rhythm {
        Rhythm::Sustained => notes.push(NoteEvent {
            track_id,
            preset_name: preset.to_string(),
            midi_note: base,
            start_time_sec: time,
            duration_sec: DUTY_CYCLE * step,
            gain,
            is_percussive: false,
        }),
        Rhythm::ArpeggioAscending | Rhythm::ArpeggioDescending => {
            let third = if key == Key::Major { 4 } else { 3 };
            let mut chord = [base, transpose(base, third), transpose(base, 7)];
            if track.rhythm == Rhythm::ArpeggioDescending {
                chord.reverse();
            }
            let sub = step / 3.0;
            for (k, &midi) in chord.iter().enumerate() {
                notes.push(NoteEvent {
                    track_id,
                    preset_name: preset.to_string(),
                    midi_note: midi,
                    start_time_sec: time + k as f64 * sub,
                    duration_sec: DUTY_CYCLE * sub,
                    gain,
                    is_percussive: false,
                });
            }
        }
    }
}

// ── Percussion mapping ──────────────────────────────────────

/// Split the series range into severity bands. The lowest band gets a lone
/// bass drum, anything above it a closed hat, and the top band layers a
/// snare on the hat — 0, 1 or 2 hits per frame.
#[allow(clippy::too_many_arguments)]
fn emit_percussion(
    notes: &mut Vec<NoteEvent>,
    track_id: usize,
    track: &Track,
    v: f64,
    stats: SeriesStats,
    bands: &PercussionBands,
    time: f64,
    step: f64,
) {
    let low = stats.min + bands.low_ratio * stats.span();
    let high = stats.min + bands.high_ratio * stats.span();

    let mut hit = |midi: u8| {
        notes.push(NoteEvent {
            track_id,
            preset_name: track.instrument.preset_name().to_string(),
            midi_note: midi,
            start_time_sec: time,
            duration_sec: DUTY_CYCLE * step,
            gain: track.gain(),
            is_percussive: true,
        })
    };

    if v <= low {
        hit(KICK);
    } else {
        hit(CLOSED_HAT);
        if v >= high {
            hit(SNARE);
        }
    }
}
