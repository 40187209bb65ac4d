//! Procedural drum hits for the builtin percussion kit.
//!
//! Classic analog-style recipes: a pitch-swept sine kick, a tone+noise
//! snare, and a high-passed noise closed hat. Noise comes from a fixed-seed
//! LCG so every synthesized kit is bit-identical across runs.

use std::f64::consts::TAU;

use crate::builder::{CLOSED_HAT, KICK, SNARE};

use super::sampler::{LoadedZone, SampleBuffer, Sampler};

/// Deterministic white-noise source.
struct NoiseLcg(u32);

impl NoiseLcg {
    fn new(seed: u32) -> Self {
        NoiseLcg(seed)
    }

    /// Next value in [-1, 1].
    fn next(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (self.0 >> 8) as f64 / ((1u32 << 24) as f64) * 2.0 - 1.0
    }
}

/// Bass drum: sine body swept 150 Hz → 45 Hz with an exponential decay.
pub fn synth_kick(sample_rate: u32) -> SampleBuffer {
    let duration = 0.35;
    let n = (sample_rate as f64 * duration) as usize;
    let mut data = Vec::with_capacity(n);
    let mut phase = 0.0_f64;
    for i in 0..n {
        let t = i as f64 / sample_rate as f64;
        let freq = 45.0 + 105.0 * (-t * 28.0).exp();
        phase += freq / sample_rate as f64;
        let body = (phase * TAU).sin();
        let env = (-t * 9.0).exp();
        data.push(body * env * 0.95);
    }
    SampleBuffer::new(data, sample_rate)
}

/// Snare: 190 Hz tone under a bright noise crack.
pub fn synth_snare(sample_rate: u32) -> SampleBuffer {
    let duration = 0.22;
    let n = (sample_rate as f64 * duration) as usize;
    let mut data = Vec::with_capacity(n);
    let mut rng = NoiseLcg::new(0x5EED_5A1E);
    let mut phase = 0.0_f64;
    for i in 0..n {
        let t = i as f64 / sample_rate as f64;
        phase += 190.0 / sample_rate as f64;
        let tone = (phase * TAU).sin() * (-t * 30.0).exp();
        let noise = rng.next() * (-t * 18.0).exp();
        data.push((tone * 0.4 + noise * 0.6) * 0.9);
    }
    SampleBuffer::new(data, sample_rate)
}

/// Closed hat: short high-passed noise burst.
pub fn synth_closed_hat(sample_rate: u32) -> SampleBuffer {
    let duration = 0.08;
    let n = (sample_rate as f64 * duration) as usize;
    let mut data = Vec::with_capacity(n);
    let mut rng = NoiseLcg::new(0x00C1_05ED);
    let mut prev = 0.0_f64;
    for i in 0..n {
        let t = i as f64 / sample_rate as f64;
        let white = rng.next();
        // First-difference high-pass keeps only the metallic top end.
        // The difference spans [-2, 2], so scale accordingly.
        let bright = white - prev;
        prev = white;
        data.push(bright * (-t * 60.0).exp() * 0.35);
    }
    SampleBuffer::new(data, sample_rate)
}

fn drum_zone(midi_note: u8, buffer: SampleBuffer) -> LoadedZone {
    LoadedZone {
        key_range_low: midi_note,
        key_range_high: midi_note,
        root_note: midi_note,
        fine_tune_cents: 0.0,
        loop_start: None,
        loop_end: None,
        buffer,
    }
}

/// The builtin "Standard Kit": kick, snare and closed hat zones on their
/// GM drum-map notes.
pub fn standard_kit(sample_rate: u32) -> Sampler {
    Sampler::new(
        vec![
            drum_zone(KICK, synth_kick(sample_rate)),
            drum_zone(SNARE, synth_snare(sample_rate)),
            drum_zone(CLOSED_HAT, synth_closed_hat(sample_rate)),
        ],
        true,
    )
}
