//! Decode fetched preset definitions into playable instruments.
//!
//! Inline audio payloads (base64 PCM or compressed files) decode here
//! synchronously; externally hosted zone audio is fetched by the manager
//! and handed in as raw bytes.

use std::collections::HashMap;
use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::dsp::engine::RegisteredPreset;
use crate::dsp::sampler::{LoadedZone, SampleBuffer, Sampler};
use crate::error::PresetError;
use crate::preset::{AudioCodec, AudioReference, InstrumentNode, PresetDescriptor, SampleZone};

fn decode_err(name: &str, reason: impl ToString) -> PresetError {
    PresetError::Decode { name: name.to_string(), reason: reason.to_string() }
}

/// Build a playable preset from its descriptor.
///
/// `external_audio` maps the URLs of `External` zone references to their
/// fetched bytes; every URL the descriptor names must be present.
pub fn build_preset(
    descriptor: &PresetDescriptor,
    external_audio: &HashMap<String, Vec<u8>>,
) -> Result<RegisteredPreset, PresetError> {
    match &descriptor.instrument {
        InstrumentNode::Synth { config } => Ok(RegisteredPreset::Synth(config.clone())),
        InstrumentNode::Sampler { config } => {
            let mut zones = Vec::with_capacity(config.zones.len());
            for zone in &config.zones {
                let buffer = decode_zone_audio(&descriptor.name, zone, external_audio)?;
                zones.push(LoadedZone::from_zone(zone, buffer));
            }
            let mut sampler = Sampler::new(zones, config.is_drum_kit);
            sampler.envelope = config.envelope;
            Ok(RegisteredPreset::Sampler(sampler))
        }
    }
}

fn decode_zone_audio(
    name: &str,
    zone: &SampleZone,
    external_audio: &HashMap<String, Vec<u8>>,
) -> Result<SampleBuffer, PresetError> {
    match &zone.audio {
        AudioReference::InlinePcm { data, bits_per_sample } => {
            if *bits_per_sample != 16 {
                return Err(decode_err(name, format!("unsupported bitsPerSample {bits_per_sample}")));
            }
            let bytes = BASE64.decode(data).map_err(|e| decode_err(name, e))?;
            if bytes.len() % 2 != 0 {
                return Err(decode_err(name, "inline PCM has an odd byte length"));
            }
            let pcm: Vec<i16> = bytes
                .chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]))
                .collect();
            Ok(SampleBuffer::from_i16(&pcm, zone.sample_rate))
        }
        AudioReference::InlineFile { data, codec } => {
            let bytes = BASE64.decode(data).map_err(|e| decode_err(name, e))?;
            decode_bytes(name, *codec, &bytes)
        }
        AudioReference::External { url, codec, .. } => {
            let bytes = external_audio.get(url).ok_or_else(|| PresetError::Fetch {
                name: name.to_string(),
                reason: format!("zone audio {url} was not fetched"),
            })?;
            decode_bytes(name, *codec, bytes)
        }
    }
}

/// Decode a compressed audio file to a mono buffer at its native rate.
pub fn decode_bytes(name: &str, codec: AudioCodec, bytes: &[u8]) -> Result<SampleBuffer, PresetError> {
    match codec {
        AudioCodec::Wav => decode_wav(name, bytes),
        AudioCodec::Mp3 => decode_mp3(name, bytes),
    }
}

fn decode_wav(name: &str, bytes: &[u8]) -> Result<SampleBuffer, PresetError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).map_err(|e| decode_err(name, e))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f64 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| decode_err(name, e))?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| v as f64))
            .collect::<Result<_, _>>()
            .map_err(|e| decode_err(name, e))?,
    };

    Ok(SampleBuffer::new(downmix(&interleaved, channels), spec.sample_rate))
}

fn decode_mp3(name: &str, bytes: &[u8]) -> Result<SampleBuffer, PresetError> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(bytes));
    let mut data: Vec<f64> = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = frame.sample_rate as u32;
                let channels = frame.channels.max(1);
                let interleaved: Vec<f64> =
                    frame.data.iter().map(|&s| s as f64 / 32768.0).collect();
                data.extend(downmix(&interleaved, channels));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(decode_err(name, e)),
        }
    }

    if data.is_empty() || sample_rate == 0 {
        return Err(decode_err(name, "MP3 stream contained no audio frames"));
    }
    Ok(SampleBuffer::new(data, sample_rate))
}

/// Average interleaved channels down to mono.
fn downmix(interleaved: &[f64], channels: usize) -> Vec<f64> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f64>() / frame.len() as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::{KeyRange, SamplerConfig, ZonePitch};

    fn inline_pcm_descriptor(samples: &[i16]) -> PresetDescriptor {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        PresetDescriptor {
            id: "test-kit".to_string(),
            name: "Test/Kit".to_string(),
            tags: vec![],
            instrument: InstrumentNode::Sampler {
                config: SamplerConfig {
                    zones: vec![SampleZone {
                        key_range: KeyRange { low: 36, high: 36 },
                        pitch: ZonePitch { root_note: 36, fine_tune_cents: 0.0 },
                        sample_rate: 44100,
                        r#loop: None,
                        audio: AudioReference::InlinePcm {
                            data: BASE64.encode(&bytes),
                            bits_per_sample: 16,
                        },
                    }],
                    is_drum_kit: true,
                    envelope: None,
                },
            },
        }
    }

    #[test]
    fn inline_pcm_decodes_to_zone_buffer() {
        let descriptor = inline_pcm_descriptor(&[0, 16384, -16384]);
        let preset = build_preset(&descriptor, &HashMap::new()).unwrap();
        match preset {
            RegisteredPreset::Sampler(sampler) => {
                assert!(sampler.is_drum_kit);
                let zone = sampler.find_zone(36).unwrap();
                assert_eq!(zone.buffer.len(), 3);
                assert!((zone.buffer.data[1] - 0.5).abs() < 0.001);
                assert!((zone.buffer.data[2] + 0.5).abs() < 0.001);
            }
            other => panic!("expected sampler, got synth: {other:?}"),
        }
    }

    #[test]
    fn unsupported_pcm_depth_is_a_decode_error() {
        let mut descriptor = inline_pcm_descriptor(&[0]);
        if let InstrumentNode::Sampler { config } = &mut descriptor.instrument {
            if let AudioReference::InlinePcm { bits_per_sample, .. } = &mut config.zones[0].audio {
                *bits_per_sample = 24;
            }
        }
        let err = build_preset(&descriptor, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("bitsPerSample"), "got: {err}");
    }

    #[test]
    fn missing_external_audio_is_a_fetch_error() {
        let mut descriptor = inline_pcm_descriptor(&[0]);
        if let InstrumentNode::Sampler { config } = &mut descriptor.instrument {
            config.zones[0].audio = AudioReference::External {
                url: "zones/kick.wav".to_string(),
                codec: AudioCodec::Wav,
                sha256: None,
            };
        }
        let err = build_preset(&descriptor, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("kick.wav"), "got: {err}");
    }

    #[test]
    fn wav_bytes_decode_and_downmix() {
        // Write a two-channel WAV in memory, then decode it back to mono.
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &(l, r) in &[(16384i16, 0i16), (0, -16384), (8192, 8192)] {
                writer.write_sample(l).unwrap();
                writer.write_sample(r).unwrap();
            }
            writer.finalize().unwrap();
        }

        let buffer = decode_bytes("Test/Wav", AudioCodec::Wav, cursor.get_ref()).unwrap();
        assert_eq!(buffer.sample_rate, 22050);
        assert_eq!(buffer.len(), 3);
        assert!((buffer.data[0] - 0.25).abs() < 0.001, "channels should average");
        assert!((buffer.data[1] + 0.25).abs() < 0.001);
    }

    #[test]
    fn synth_descriptor_passes_through() {
        let descriptor = PresetDescriptor {
            id: "builtin-pad".to_string(),
            name: "Builtin/Pad".to_string(),
            tags: vec![],
            instrument: InstrumentNode::Synth {
                config: crate::preset::SynthConfig {
                    waveform: crate::preset::WaveformType::Sawtooth,
                    detune: Some(5.0),
                    envelope: None,
                },
            },
        };
        match build_preset(&descriptor, &HashMap::new()).unwrap() {
            RegisteredPreset::Synth(config) => {
                assert_eq!(config.waveform, crate::preset::WaveformType::Sawtooth);
                assert_eq!(config.detune, Some(5.0));
            }
            other => panic!("expected synth, got {other:?}"),
        }
    }
}
