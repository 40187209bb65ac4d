//! Synth voice — one oscillator shaped by an ADSR envelope.

use crate::preset::SynthConfig;

use super::envelope::Envelope;
use super::oscillator::Oscillator;

/// A playing note on a builtin synth patch.
#[derive(Debug, Clone)]
pub struct SynthVoice {
    oscillator: Oscillator,
    envelope: Envelope,
    /// Note gain [0, 1].
    gain: f64,
    /// Sample offset when this voice should be released (gate off).
    pub release_sample: usize,
    finished: bool,
}

impl SynthVoice {
    /// Create a voice for a patch and start it at the given frequency.
    pub fn new(config: &SynthConfig, sample_rate: f64, frequency: f64, gain: f64) -> Self {
        let mut osc = Oscillator::new(config.waveform, sample_rate);
        osc.frequency = frequency;
        if let Some(detune) = config.detune {
            osc.detune = detune;
        }

        let mut env = match &config.envelope {
            Some(adsr) => Envelope::from_config(sample_rate, adsr),
            None => Envelope::new(sample_rate),
        };
        env.gate_on();

        SynthVoice {
            oscillator: osc,
            envelope: env,
            gain,
            release_sample: usize::MAX,
            finished: false,
        }
    }

    pub fn note_off(&mut self) {
        self.envelope.gate_off();
    }

    pub fn next_sample(&mut self) -> f64 {
        if self.finished {
            return 0.0;
        }
        let sample = self.oscillator.next_sample() * self.envelope.next_sample() * self.gain;
        if self.envelope.is_finished() {
            self.finished = true;
        }
        sample
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
