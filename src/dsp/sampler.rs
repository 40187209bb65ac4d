//! Wavetable sample playback.
//!
//! Key-mapped zones played back with linear-interpolation resampling.
//! Melodic zones are repitched from their root note and may loop while the
//! gate is held; drum-kit zones play one-shot at native pitch and ignore
//! note-off — the engine's "drum channel".

use crate::preset::{sample_playback_rate, AdsrConfig, SampleZone};

use super::envelope::Envelope;

/// A mono sample buffer loaded into memory.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    pub data: Vec<f64>,
    /// Native sample rate of the audio.
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(data: Vec<f64>, sample_rate: u32) -> Self {
        SampleBuffer { data, sample_rate }
    }

    /// Create from 16-bit signed PCM.
    pub fn from_i16(pcm: &[i16], sample_rate: u32) -> Self {
        SampleBuffer::new(pcm.iter().map(|&s| s as f64 / 32768.0).collect(), sample_rate)
    }

    /// Create from f32 samples.
    pub fn from_f32(samples: &[f32], sample_rate: u32) -> Self {
        SampleBuffer::new(samples.iter().map(|&s| s as f64).collect(), sample_rate)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Linear interpolation at a fractional read position.
    pub fn read_interpolated(&self, position: f64) -> f64 {
        if self.data.is_empty() || position < 0.0 {
            return 0.0;
        }
        let idx = position as usize;
        if idx + 1 >= self.data.len() {
            return self.data.get(idx).copied().unwrap_or(0.0);
        }
        let frac = position - idx as f64;
        self.data[idx] * (1.0 - frac) + self.data[idx + 1] * frac
    }
}

/// A zone ready to play: descriptor fields flattened next to its audio.
#[derive(Debug, Clone)]
pub struct LoadedZone {
    pub key_range_low: u8,
    pub key_range_high: u8,
    pub root_note: u8,
    pub fine_tune_cents: f64,
    pub loop_start: Option<u64>,
    pub loop_end: Option<u64>,
    pub buffer: SampleBuffer,
}

impl LoadedZone {
    /// Pair a zone descriptor with its decoded audio.
    pub fn from_zone(zone: &SampleZone, buffer: SampleBuffer) -> Self {
        LoadedZone {
            key_range_low: zone.key_range.low,
            key_range_high: zone.key_range.high,
            root_note: zone.pitch.root_note,
            fine_tune_cents: zone.pitch.fine_tune_cents,
            loop_start: zone.r#loop.as_ref().map(|l| l.start),
            loop_end: zone.r#loop.as_ref().map(|l| l.end),
            buffer,
        }
    }

    pub fn contains_note(&self, midi_note: u8) -> bool {
        (self.key_range_low..=self.key_range_high).contains(&midi_note)
    }
}

/// A wavetable instrument with loaded zones.
#[derive(Debug, Clone)]
pub struct Sampler {
    pub zones: Vec<LoadedZone>,
    pub is_drum_kit: bool,
    /// Envelope applied to melodic zone playback.
    pub envelope: Option<AdsrConfig>,
}

impl Sampler {
    pub fn new(zones: Vec<LoadedZone>, is_drum_kit: bool) -> Self {
        Sampler { zones, is_drum_kit, envelope: None }
    }

    /// First zone whose key range covers the note.
    pub fn find_zone(&self, midi_note: u8) -> Option<&LoadedZone> {
        self.zones.iter().find(|z| z.contains_note(midi_note))
    }
}

/// Sampler envelope defaults: full sustain, short click-free edges.
const SAMPLER_ADSR: AdsrConfig = AdsrConfig { attack: 0.005, decay: 0.1, sustain: 1.0, release: 0.1 };

/// A playing sampler voice.
#[derive(Debug, Clone)]
pub struct SamplerVoice {
    buffer: SampleBuffer,
    /// Fractional read position into the buffer.
    position: f64,
    /// Buffer samples consumed per output sample.
    step: f64,
    loop_start: Option<u64>,
    loop_end: Option<u64>,
    envelope: Option<Envelope>,
    gain: f64,
    released: bool,
    finished: bool,
    pub release_sample: usize,
}

impl SamplerVoice {
    /// Melodic playback: repitched from the zone root to `midi_note`.
    pub fn pitched(
        zone: &LoadedZone,
        midi_note: u8,
        gain: f64,
        engine_rate: f64,
        adsr: Option<&AdsrConfig>,
    ) -> Self {
        let rate = sample_playback_rate(midi_note, zone.root_note, zone.fine_tune_cents);
        let step = rate * zone.buffer.sample_rate as f64 / engine_rate;
        let mut envelope = Envelope::from_config(engine_rate, adsr.unwrap_or(&SAMPLER_ADSR));
        envelope.gate_on();
        SamplerVoice {
            buffer: zone.buffer.clone(),
            position: 0.0,
            step,
            loop_start: zone.loop_start,
            loop_end: zone.loop_end,
            envelope: Some(envelope),
            gain,
            released: false,
            finished: false,
            release_sample: usize::MAX,
        }
    }

    /// Drum playback: native pitch, no gating, runs to the end of the hit.
    pub fn one_shot(zone: &LoadedZone, gain: f64, engine_rate: f64) -> Self {
        SamplerVoice {
            buffer: zone.buffer.clone(),
            position: 0.0,
            step: zone.buffer.sample_rate as f64 / engine_rate,
            loop_start: None,
            loop_end: None,
            envelope: None,
            gain,
            released: false,
            finished: false,
            release_sample: usize::MAX,
        }
    }

    /// Gate off. A no-op for one-shot (drum) voices.
    pub fn note_off(&mut self) {
        self.released = true;
        if let Some(env) = self.envelope.as_mut() {
            env.gate_off();
        }
    }

    pub fn next_sample(&mut self) -> f64 {
        if self.finished {
            return 0.0;
        }

        let raw = self.buffer.read_interpolated(self.position);
        self.position += self.step;

        // Sustain loop: wrap while the gate is held.
        if !self.released {
            if let (Some(start), Some(end)) = (self.loop_start, self.loop_end) {
                let (start, end) = (start as f64, end as f64);
                if end > start && self.position >= end {
                    self.position = start + (self.position - end);
                }
            }
        }
        if self.position >= self.buffer.len() as f64 {
            self.finished = true;
        }

        let env = match self.envelope.as_mut() {
            Some(env) => {
                let level = env.next_sample();
                if env.is_finished() {
                    self.finished = true;
                }
                level
            }
            None => 1.0,
        };
        raw * env * self.gain
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
