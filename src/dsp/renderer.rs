//! WAV renderer — the export boundary hands the muxer a finished file.

use crate::builder::NoteList;
use crate::error::SonifyError;

use super::engine::AudioEngine;

/// Render a note list to a 16-bit stereo PCM WAV byte buffer.
pub fn render_wav(note_list: &NoteList, sample_rate: u32) -> Result<Vec<u8>, SonifyError> {
    let engine = AudioEngine::with_builtins(sample_rate as f64);
    render_wav_with(&engine, note_list)
}

/// Same, against an engine whose registry the caller has populated.
pub fn render_wav_with(engine: &AudioEngine, note_list: &NoteList) -> Result<Vec<u8>, SonifyError> {
    let mono = engine.render(note_list)?;
    let mut pcm = Vec::with_capacity(mono.len() * 2);
    for &s in &mono {
        let sample = (s * 32767.0).round().clamp(-32768.0, 32767.0) as i16;
        pcm.push(sample); // L
        pcm.push(sample); // R
    }
    Ok(encode_wav(&pcm, engine.sample_rate as u32, 2))
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NoteEvent;
    use crate::config::Instrument;

    fn short_list() -> NoteList {
        NoteList {
            notes: vec![NoteEvent {
                track_id: 0,
                preset_name: Instrument::PluckedTone.preset_name().to_string(),
                midi_note: 60,
                start_time_sec: 0.0,
                duration_sec: 0.225,
                gain: 1.0,
                is_percussive: false,
            }],
            master_length: 2,
            step_duration: 0.25,
            total_duration_sec: 0.5,
        }
    }

    #[test]
    fn wav_header_is_valid() {
        let wav = render_wav(&short_list(), 44100).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");

        let sr = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
        assert_eq!(sr, 44100);
        let channels = u16::from_le_bytes([wav[22], wav[23]]);
        assert_eq!(channels, 2);
    }

    #[test]
    fn wav_data_size_matches_duration() {
        let wav = render_wav(&short_list(), 44100).unwrap();
        // 0.5s * 44100 samples * 2 channels * 2 bytes
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size, 88200);
        assert_eq!(wav.len(), 44 + 88200);
    }

    #[test]
    fn wav_contains_audio() {
        let wav = render_wav(&short_list(), 22050).unwrap();
        let non_silent = wav[44..]
            .chunks_exact(2)
            .any(|b| i16::from_le_bytes([b[0], b[1]]) != 0);
        assert!(non_silent, "rendered WAV should contain non-silent audio");
    }
}
