//! ADSR envelope shared by synth and sampler voices.

use crate::preset::AdsrConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Linear-segment ADSR gain generator.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub attack: f64,
    pub decay: f64,
    /// Sustain level [0, 1].
    pub sustain: f64,
    pub release: f64,

    sample_rate: f64,
    stage: Stage,
    level: f64,
    /// Level at the moment the current stage began; attack retriggers and
    /// release both ramp from here instead of jumping.
    stage_start_level: f64,
    stage_samples: usize,
    stage_pos: usize,
}

impl Envelope {
    pub fn new(sample_rate: f64) -> Self {
        Envelope {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
            sample_rate,
            stage: Stage::Idle,
            level: 0.0,
            stage_start_level: 0.0,
            stage_samples: 0,
            stage_pos: 0,
        }
    }

    /// Create an envelope from a preset's ADSR block.
    pub fn from_config(sample_rate: f64, config: &AdsrConfig) -> Self {
        let mut env = Envelope::new(sample_rate);
        env.attack = config.attack.max(0.0);
        env.decay = config.decay.max(0.0);
        env.sustain = config.sustain.clamp(0.0, 1.0);
        env.release = config.release.max(0.0);
        env
    }

    pub fn gate_on(&mut self) {
        self.enter(Stage::Attack, self.attack);
    }

    pub fn gate_off(&mut self) {
        if self.stage != Stage::Idle {
            self.enter(Stage::Release, self.release);
        }
    }

    fn enter(&mut self, stage: Stage, seconds: f64) {
        self.stage = stage;
        self.stage_start_level = self.level;
        self.stage_samples = (seconds * self.sample_rate) as usize;
        self.stage_pos = 0;
    }

    /// Next gain value [0, 1].
    pub fn next_sample(&mut self) -> f64 {
        match self.stage {
            Stage::Idle => {
                self.level = 0.0;
            }
            Stage::Attack => {
                self.level = self.ramp_to(1.0);
                if self.stage_done() {
                    self.level = 1.0;
                    self.enter(Stage::Decay, self.decay);
                }
            }
            Stage::Decay => {
                self.level = self.ramp_to(self.sustain);
                if self.stage_done() {
                    self.level = self.sustain;
                    self.stage = Stage::Sustain;
                }
            }
            Stage::Sustain => {
                self.level = self.sustain;
            }
            Stage::Release => {
                self.level = self.ramp_to(0.0);
                if self.stage_done() {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                }
            }
        }
        self.level
    }

    fn ramp_to(&mut self, target: f64) -> f64 {
        if self.stage_samples == 0 {
            self.stage_pos = 1;
            return target;
        }
        let t = self.stage_pos as f64 / self.stage_samples as f64;
        self.stage_pos += 1;
        self.stage_start_level + (target - self.stage_start_level) * t
    }

    fn stage_done(&self) -> bool {
        self.stage_pos >= self.stage_samples
    }

    /// True once the release has fully decayed.
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let env = Envelope::new(44100.0);
        assert!(env.is_finished());
    }

    #[test]
    fn attack_reaches_full_level() {
        let mut env = Envelope::new(44100.0);
        env.attack = 0.01;
        env.gate_on();

        let mut max_level: f64 = 0.0;
        for _ in 0..500 {
            max_level = max_level.max(env.next_sample());
        }
        assert!((max_level - 1.0).abs() < 0.01, "attack should reach ~1.0, got {max_level}");
    }

    #[test]
    fn sustain_holds_at_configured_level() {
        let mut env = Envelope::from_config(
            44100.0,
            &AdsrConfig { attack: 0.001, decay: 0.001, sustain: 0.6, release: 0.1 },
        );
        env.gate_on();
        for _ in 0..500 {
            env.next_sample();
        }
        let s = env.next_sample();
        assert!((s - 0.6).abs() < 0.01, "should sustain at 0.6, got {s}");
    }

    #[test]
    fn release_decays_to_idle() {
        let mut env = Envelope::from_config(
            44100.0,
            &AdsrConfig { attack: 0.001, decay: 0.001, sustain: 0.7, release: 0.01 },
        );
        env.gate_on();
        for _ in 0..500 {
            env.next_sample();
        }
        env.gate_off();
        for _ in 0..1000 {
            env.next_sample();
        }
        assert!(env.is_finished(), "should be finished after release");
        assert!(env.next_sample().abs() < 0.001);
    }

    #[test]
    fn output_always_in_range() {
        let mut env = Envelope::from_config(
            44100.0,
            &AdsrConfig { attack: 0.01, decay: 0.05, sustain: 0.5, release: 0.1 },
        );
        env.gate_on();
        for _ in 0..10_000 {
            let s = env.next_sample();
            assert!((0.0..=1.0).contains(&s), "envelope out of range: {s}");
        }
        env.gate_off();
        for _ in 0..10_000 {
            let s = env.next_sample();
            assert!((0.0..=1.0).contains(&s), "envelope out of range after release: {s}");
        }
        assert!(env.is_finished());
    }

    #[test]
    fn zero_length_stages_jump_straight_through() {
        let mut env = Envelope::from_config(
            44100.0,
            &AdsrConfig { attack: 0.0, decay: 0.0, sustain: 0.4, release: 0.0 },
        );
        env.gate_on();
        env.next_sample();
        let s = env.next_sample();
        assert!((s - 0.4).abs() < 1e-9, "should sit at sustain immediately, got {s}");
        env.gate_off();
        env.next_sample();
        assert!(env.is_finished());
    }
}
