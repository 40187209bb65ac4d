//! Band-limited oscillators (PolyBLEP anti-aliasing).

use std::f64::consts::PI;

use crate::preset::WaveformType;

/// A band-limited oscillator for the builtin synth patches.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: WaveformType,
    pub frequency: f64,
    /// Detune in cents.
    pub detune: f64,
    phase: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new(waveform: WaveformType, sample_rate: f64) -> Self {
        Oscillator {
            waveform,
            frequency: 440.0,
            detune: 0.0,
            phase: 0.0,
            sample_rate,
        }
    }

    /// Phase increment per sample, detune applied.
    fn phase_inc(&self) -> f64 {
        let freq = self.frequency * (2.0_f64).powf(self.detune / 1200.0);
        freq / self.sample_rate
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    pub fn next_sample(&mut self) -> f64 {
        let inc = self.phase_inc();
        let sample = match self.waveform {
            WaveformType::Sine => (2.0 * PI * self.phase).sin(),
            WaveformType::Sawtooth => {
                // Naive ramp with the wrap discontinuity corrected.
                (2.0 * self.phase - 1.0) - poly_blep(self.phase, inc)
            }
            WaveformType::Square => {
                let mut value = if self.phase < 0.5 { 1.0 } else { -1.0 };
                value += poly_blep(self.phase, inc);
                value - poly_blep((self.phase + 0.5) % 1.0, inc)
            }
            WaveformType::Triangle => {
                // Piecewise linear; discontinuity-free so no correction term.
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
        };

        self.phase += inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        sample
    }
}

/// Polynomial band-limited step correction around waveform discontinuities.
/// `t` is the phase [0, 1), `dt` the per-sample phase increment.
fn poly_blep(t: f64, dt: f64) -> f64 {
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}
