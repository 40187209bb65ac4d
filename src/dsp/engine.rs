//! Audio engine — offline-renders a note list to audio samples.
//!
//! The engine owns the loaded-preset registry, schedules note events at
//! their absolute sample offsets, and produces a mono f64 buffer of exactly
//! `master_length × step_duration` seconds. There is no fallback voice: a
//! note naming an unregistered preset fails the whole render up front, so
//! the export can never silently swap instruments.

use std::collections::HashMap;

use crate::builder::NoteList;
use crate::config::Instrument;
use crate::error::{PresetError, SonifyError};
use crate::preset::{AdsrConfig, SynthConfig, WaveformType};

use super::mixer::Mixer;
use super::percussion;
use super::sampler::{Sampler, SamplerVoice};
use super::voice::SynthVoice;

/// A registered preset — a builtin synth patch or a wavetable sampler.
#[derive(Debug, Clone)]
pub enum RegisteredPreset {
    Synth(SynthConfig),
    Sampler(Sampler),
}

/// MIDI note number to frequency, A4 (69) = `tuning_pitch` Hz.
pub fn midi_to_frequency(midi: u8, tuning_pitch: f64) -> f64 {
    tuning_pitch * (2.0_f64).powf((midi as f64 - 69.0) / 12.0)
}

/// A note resolved to sample offsets, awaiting activation.
struct ScheduledNote {
    start_sample: usize,
    release_sample: usize,
    midi: u8,
    gain: f64,
    percussive: bool,
    preset_name: String,
}

/// A sounding voice of either kind.
enum ActiveVoice {
    Synth(SynthVoice),
    Sampler(SamplerVoice),
}

impl ActiveVoice {
    fn next_sample(&mut self) -> f64 {
        match self {
            ActiveVoice::Synth(v) => v.next_sample(),
            ActiveVoice::Sampler(v) => v.next_sample(),
        }
    }

    fn note_off(&mut self) {
        match self {
            ActiveVoice::Synth(v) => v.note_off(),
            ActiveVoice::Sampler(v) => v.note_off(),
        }
    }

    fn is_finished(&self) -> bool {
        match self {
            ActiveVoice::Synth(v) => v.is_finished(),
            ActiveVoice::Sampler(v) => v.is_finished(),
        }
    }

    fn release_sample(&self) -> usize {
        match self {
            ActiveVoice::Synth(v) => v.release_sample,
            ActiveVoice::Sampler(v) => v.release_sample,
        }
    }
}

/// The rendering engine.
pub struct AudioEngine {
    pub sample_rate: f64,
    max_voices: usize,
    registry: HashMap<String, RegisteredPreset>,
}

impl AudioEngine {
    /// An engine with an empty preset registry.
    pub fn new(sample_rate: f64) -> Self {
        AudioEngine { sample_rate, max_voices: 64, registry: HashMap::new() }
    }

    /// An engine preloaded with the builtin voices for the fixed instrument
    /// set, registered under the same names catalog fonts would use.
    pub fn with_builtins(sample_rate: f64) -> Self {
        let mut engine = AudioEngine::new(sample_rate);
        engine.register_preset(
            Instrument::SustainedPad.preset_name().to_string(),
            RegisteredPreset::Synth(SynthConfig {
                waveform: WaveformType::Triangle,
                detune: None,
                envelope: Some(AdsrConfig { attack: 0.08, decay: 0.2, sustain: 0.8, release: 0.25 }),
            }),
        );
        engine.register_preset(
            Instrument::PluckedTone.preset_name().to_string(),
            RegisteredPreset::Synth(SynthConfig {
                waveform: WaveformType::Sine,
                detune: None,
                envelope: Some(AdsrConfig { attack: 0.005, decay: 0.18, sustain: 0.0, release: 0.05 }),
            }),
        );
        engine.register_preset(
            Instrument::PercussionKit.preset_name().to_string(),
            RegisteredPreset::Sampler(percussion::standard_kit(sample_rate as u32)),
        );
        engine
    }

    /// Register (or replace) a preset under a name.
    pub fn register_preset(&mut self, name: String, preset: RegisteredPreset) {
        self.registry.insert(name, preset);
    }

    pub fn has_preset(&self, name: &str) -> bool {
        self.registry.contains_key(name)
    }

    /// Error unless every preset the note list references is registered.
    pub fn check_presets(&self, notes: &NoteList) -> Result<(), SonifyError> {
        for note in &notes.notes {
            if !self.has_preset(&note.preset_name) {
                return Err(PresetError::UnknownPreset { name: note.preset_name.clone() }.into());
            }
        }
        Ok(())
    }

    /// Render a note list to a mono f64 buffer of exactly
    /// `total_duration_sec` at the engine sample rate.
    pub fn render(&self, note_list: &NoteList) -> Result<Vec<f64>, SonifyError> {
        self.check_presets(note_list)?;

        let total_samples = (note_list.total_duration_sec * self.sample_rate) as usize;

        let mut scheduled: Vec<ScheduledNote> = note_list
            .notes
            .iter()
            .map(|n| {
                let start = (n.start_time_sec * self.sample_rate) as usize;
                ScheduledNote {
                    start_sample: start,
                    release_sample: start + (n.duration_sec * self.sample_rate) as usize,
                    midi: n.midi_note,
                    gain: n.gain,
                    percussive: n.is_percussive,
                    preset_name: n.preset_name.clone(),
                }
            })
            .collect();
        scheduled.sort_by_key(|n| n.start_sample);

        let block_size = 128;
        let mut mixer = Mixer::new();
        let mut voices: Vec<ActiveVoice> = Vec::new();
        let mut output = vec![0.0_f64; total_samples];
        let mut next_note = 0;

        let mut block_start = 0;
        while block_start < total_samples {
            let block_end = (block_start + block_size).min(total_samples);

            while next_note < scheduled.len() && scheduled[next_note].start_sample < block_end {
                let note = &scheduled[next_note];
                next_note += 1;
                if voices.len() >= self.max_voices {
                    continue;
                }
                if let Some(voice) = self.activate(note) {
                    voices.push(voice);
                }
            }

            for voice in voices.iter_mut() {
                let release = voice.release_sample();
                if release >= block_start && release < block_end {
                    voice.note_off();
                }
            }

            mixer.clear(block_end - block_start);
            for voice in voices.iter_mut() {
                if voice.is_finished() {
                    continue;
                }
                for i in 0..(block_end - block_start) {
                    mixer.add(i, voice.next_sample());
                }
            }
            mixer.write_to(&mut output[block_start..block_end]);

            voices.retain(|v| !v.is_finished());
            block_start = block_end;
        }

        Ok(output)
    }

    /// Build the voice for a scheduled note. Returns `None` when a drum kit
    /// has no zone for the note — a data gap, not an error.
    fn activate(&self, note: &ScheduledNote) -> Option<ActiveVoice> {
        // check_presets ran before scheduling, so the lookup cannot miss.
        let preset = self.registry.get(&note.preset_name)?;
        match preset {
            RegisteredPreset::Synth(config) => {
                let freq = midi_to_frequency(note.midi, 440.0);
                let mut voice = SynthVoice::new(config, self.sample_rate, freq, note.gain);
                voice.release_sample = note.release_sample;
                Some(ActiveVoice::Synth(voice))
            }
            RegisteredPreset::Sampler(sampler) => {
                let zone = sampler.find_zone(note.midi)?;
                let mut voice = if sampler.is_drum_kit && note.percussive {
                    SamplerVoice::one_shot(zone, note.gain, self.sample_rate)
                } else {
                    SamplerVoice::pitched(
                        zone,
                        note.midi,
                        note.gain,
                        self.sample_rate,
                        sampler.envelope.as_ref(),
                    )
                };
                voice.release_sample = note.release_sample;
                Some(ActiveVoice::Sampler(voice))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{NoteEvent, CLOSED_HAT, KICK};

    fn pad_note(start: f64, midi: u8) -> NoteEvent {
        NoteEvent {
            track_id: 0,
            preset_name: Instrument::SustainedPad.preset_name().to_string(),
            midi_note: midi,
            start_time_sec: start,
            duration_sec: 0.225,
            gain: 1.0,
            is_percussive: false,
        }
    }

    fn list_of(notes: Vec<NoteEvent>, master_length: usize, step: f64) -> NoteList {
        NoteList {
            notes,
            master_length,
            step_duration: step,
            total_duration_sec: master_length as f64 * step,
        }
    }

    #[test]
    fn render_length_is_exact() {
        let engine = AudioEngine::with_builtins(44100.0);
        let list = list_of(vec![pad_note(0.0, 60)], 4, 0.25);
        let audio = engine.render(&list).unwrap();
        assert_eq!(audio.len(), 44100);
    }

    #[test]
    fn render_is_non_silent_and_bounded() {
        let engine = AudioEngine::with_builtins(44100.0);
        let list = list_of(vec![pad_note(0.0, 60), pad_note(0.25, 64)], 2, 0.25);
        let audio = engine.render(&list).unwrap();

        let max = audio.iter().fold(0.0_f64, |m, &s| m.max(s.abs()));
        assert!(max > 0.01, "rendered audio should be non-silent, max={max}");
        assert!(audio.iter().all(|&s| s.abs() <= 1.0), "output must stay in [-1, 1]");
    }

    #[test]
    fn render_is_deterministic() {
        let engine = AudioEngine::with_builtins(22050.0);
        let list = list_of(
            vec![
                pad_note(0.0, 60),
                NoteEvent {
                    track_id: 1,
                    preset_name: Instrument::PercussionKit.preset_name().to_string(),
                    midi_note: KICK,
                    start_time_sec: 0.0,
                    duration_sec: 0.225,
                    gain: 1.0,
                    is_percussive: true,
                },
            ],
            2,
            0.25,
        );
        let a = engine.render(&list).unwrap();
        let b = engine.render(&list).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_note_list_renders_silence() {
        let engine = AudioEngine::with_builtins(44100.0);
        let list = list_of(vec![], 2, 0.25);
        let audio = engine.render(&list).unwrap();
        assert_eq!(audio.len(), 22050);
        assert!(audio.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn unknown_preset_fails_before_rendering() {
        let engine = AudioEngine::with_builtins(44100.0);
        let mut note = pad_note(0.0, 60);
        note.preset_name = "FluidR3_GM/Ocarina".to_string();
        let err = engine.render(&list_of(vec![note], 1, 0.25)).unwrap_err();
        assert!(err.to_string().contains("Ocarina"), "got: {err}");
    }

    #[test]
    fn drum_notes_route_through_the_kit() {
        let engine = AudioEngine::with_builtins(44100.0);
        let kit = Instrument::PercussionKit.preset_name().to_string();
        let list = list_of(
            vec![
                NoteEvent {
                    track_id: 0,
                    preset_name: kit.clone(),
                    midi_note: CLOSED_HAT,
                    start_time_sec: 0.0,
                    duration_sec: 0.225,
                    gain: 1.0,
                    is_percussive: true,
                },
            ],
            1,
            0.25,
        );
        let audio = engine.render(&list).unwrap();
        let max = audio.iter().fold(0.0_f64, |m, &s| m.max(s.abs()));
        assert!(max > 0.01, "drum hit should be audible, max={max}");
    }

    #[test]
    fn gain_zero_note_is_silent() {
        let engine = AudioEngine::with_builtins(44100.0);
        let mut note = pad_note(0.0, 60);
        note.gain = 0.0;
        let audio = engine.render(&list_of(vec![note], 1, 0.25)).unwrap();
        assert!(audio.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn midi_to_frequency_reference_points() {
        assert!((midi_to_frequency(69, 440.0) - 440.0).abs() < 0.001);
        assert!((midi_to_frequency(60, 440.0) - 261.626).abs() < 0.01);
        assert!((midi_to_frequency(69, 432.0) - 432.0).abs() < 0.001);
    }
}
