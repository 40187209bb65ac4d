pub mod builder;
pub mod config;
pub mod dsp;
pub mod error;
pub mod preset;
pub mod scheduler;
pub mod series;

use wasm_bindgen::prelude::*;

pub use builder::{build_notes, NoteEvent, NoteList};
pub use config::{FilterRange, Instrument, Key, PercussionBands, Rhythm, SonifyOptions, Track};
pub use error::SonifyError;
pub use scheduler::{AudioClock, AudioSession, NoteSink, PlaybackState, SystemClock};
pub use series::{SeriesMap, SeriesPoint};

use dsp::engine::AudioEngine;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the sonaire-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Offline pass with the builtin voices: build the note list and render it
/// to a mono f64 buffer of exactly `master_length × step_duration` seconds.
/// The exporter muxes this against frames rendered at `1 / step_duration`.
pub fn render_offline(
    data: &SeriesMap,
    options: &SonifyOptions,
    sample_rate: u32,
) -> Result<Vec<f64>, SonifyError> {
    let notes = build_notes(data, options)?;
    let engine = AudioEngine::with_builtins(sample_rate as f64);
    engine.render(&notes)
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

fn parse_inputs(series: JsValue, options: JsValue) -> Result<(SeriesMap, SonifyOptions), JsValue> {
    let data: SeriesMap = serde_wasm_bindgen::from_value(series).map_err(js_err)?;
    let options: SonifyOptions = serde_wasm_bindgen::from_value(options).map_err(js_err)?;
    Ok((data, options))
}

/// WASM-exposed: build the note event list for a configuration.
#[wasm_bindgen]
pub fn build_notes_js(series: JsValue, options: JsValue) -> Result<JsValue, JsValue> {
    let (data, options) = parse_inputs(series, options)?;
    let notes = build_notes(&data, &options).map_err(js_err)?;
    serde_wasm_bindgen::to_value(&notes).map_err(js_err)
}

/// WASM-exposed: render a sonification to a WAV byte array.
#[wasm_bindgen]
pub fn render_sonification_wav(
    series: JsValue,
    options: JsValue,
    sample_rate: u32,
) -> Result<Vec<u8>, JsValue> {
    let (data, options) = parse_inputs(series, options)?;
    let notes = build_notes(&data, &options).map_err(js_err)?;
    dsp::renderer::render_wav(&notes, sample_rate).map_err(js_err)
}

/// WASM-exposed: render a sonification to mono f32 samples.
/// Returns the raw audio buffer for AudioWorklet playback.
#[wasm_bindgen]
pub fn render_sonification_samples(
    series: JsValue,
    options: JsValue,
    sample_rate: u32,
) -> Result<Vec<f32>, JsValue> {
    let (data, options) = parse_inputs(series, options)?;
    let samples = render_offline(&data, &options, sample_rate).map_err(js_err)?;
    Ok(samples.iter().map(|&s| s as f32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn demo_inputs() -> (SeriesMap, SonifyOptions) {
        let mut data = HashMap::new();
        data.insert(
            "NO2".to_string(),
            (1..=4)
                .map(|i| SeriesPoint { date: format!("201{i}"), value: 10.0 * i as f64 })
                .collect(),
        );
        data.insert(
            "PM10".to_string(),
            (1..=4)
                .map(|i| SeriesPoint { date: format!("201{i}"), value: 25.0 * i as f64 })
                .collect(),
        );
        let options = SonifyOptions {
            tracks: vec![
                Track {
                    pollutant: "NO2".to_string(),
                    instrument: Instrument::SustainedPad,
                    octave: 4,
                    rhythm: Rhythm::Sustained,
                    filter_range: FilterRange::default(),
                    volume: 0.9,
                    is_muted: false,
                },
                Track {
                    pollutant: "PM10".to_string(),
                    instrument: Instrument::PercussionKit,
                    octave: 4,
                    rhythm: Rhythm::Sustained,
                    filter_range: FilterRange::default(),
                    volume: 0.8,
                    is_muted: false,
                },
            ],
            key: Key::Minor,
            step_duration: 0.25,
            master_length: 4,
            percussion: PercussionBands::default(),
        };
        (data, options)
    }

    #[test]
    fn offline_render_covers_the_exact_duration() {
        let (data, options) = demo_inputs();
        let audio = render_offline(&data, &options, 22050).unwrap();
        assert_eq!(audio.len(), 22050); // 4 frames * 0.25s at 22.05 kHz
        let max = audio.iter().fold(0.0_f64, |m, &s| m.max(s.abs()));
        assert!(max > 0.01, "demo mix should be audible, max={max}");
    }

    #[test]
    fn build_and_render_are_deterministic_end_to_end() {
        let (data, options) = demo_inputs();
        assert_eq!(build_notes(&data, &options).unwrap(), build_notes(&data, &options).unwrap());
        assert_eq!(
            render_offline(&data, &options, 22050).unwrap(),
            render_offline(&data, &options, 22050).unwrap()
        );
    }

    #[test]
    fn offline_and_session_render_agree() {
        let (data, options) = demo_inputs();
        let session = AudioSession::new(22050.0);
        assert_eq!(
            session.render_offline(&data, &options).unwrap(),
            render_offline(&data, &options, 22050).unwrap()
        );
    }
}
