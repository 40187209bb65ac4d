//! Preset manager — resolves instrument names against a hosted library.
//!
//! The manager performs at most one fetch+decode per distinct preset name
//! per session: later resolves hit the in-memory loaded registry, and the
//! disk cache spares refetches across sessions. Failures propagate — a
//! preset that cannot be loaded never gets a substitute sound.

use std::collections::HashMap;

use crate::dsp::engine::{AudioEngine, RegisteredPreset};
use crate::error::PresetError;
use crate::preset::{AudioReference, CatalogEntry, InstrumentNode, LibraryIndex, PresetDescriptor};

use super::cache::{digest_hex, DiskCache};
use super::loader;

/// Locate a catalog entry by registry name.
pub fn entry_for<'a>(index: &'a LibraryIndex, name: &str) -> Option<&'a CatalogEntry> {
    index.presets.iter().find(|e| e.name == name)
}

pub struct PresetManager {
    client: reqwest::Client,
    base_url: String,
    cache: Option<DiskCache>,
    index: Option<LibraryIndex>,
    loaded: HashMap<String, RegisteredPreset>,
}

impl PresetManager {
    /// A manager for the library hosted at `base_url` (the directory that
    /// contains `index.json`).
    pub fn new(base_url: impl Into<String>) -> Self {
        PresetManager {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            cache: DiskCache::open(),
            index: None,
            loaded: HashMap::new(),
        }
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    /// Resolve a preset name, fetching and decoding it on first use.
    pub async fn resolve(&mut self, name: &str) -> Result<&RegisteredPreset, PresetError> {
        if !self.loaded.contains_key(name) {
            let preset = self.load(name).await?;
            self.loaded.insert(name.to_string(), preset);
        }
        Ok(&self.loaded[name])
    }

    /// Copy every loaded preset into an engine's registry, replacing the
    /// builtin voices of the same names.
    pub fn register_into(&self, engine: &mut AudioEngine) {
        for (name, preset) in &self.loaded {
            engine.register_preset(name.clone(), preset.clone());
        }
    }

    async fn load(&mut self, name: &str) -> Result<RegisteredPreset, PresetError> {
        let entry = self.find_entry(name).await?;
        let bytes = self.fetch_cached(name, &entry.path, entry.sha256.as_deref()).await?;
        let descriptor: PresetDescriptor = serde_json::from_slice(&bytes)
            .map_err(|e| PresetError::Decode { name: name.to_string(), reason: e.to_string() })?;

        let mut external_audio = HashMap::new();
        if let InstrumentNode::Sampler { config } = &descriptor.instrument {
            for zone in &config.zones {
                if let AudioReference::External { url, sha256, .. } = &zone.audio {
                    if !external_audio.contains_key(url) {
                        let audio = self.fetch_cached(name, url, sha256.as_deref()).await?;
                        external_audio.insert(url.clone(), audio);
                    }
                }
            }
        }

        loader::build_preset(&descriptor, &external_audio)
    }

    async fn find_entry(&mut self, name: &str) -> Result<CatalogEntry, PresetError> {
        if self.index.is_none() {
            let url = self.absolute_url("index.json");
            let bytes = self.get(&url, "catalog index").await?;
            let index: LibraryIndex = serde_json::from_slice(&bytes).map_err(|e| {
                PresetError::Decode { name: "catalog index".to_string(), reason: e.to_string() }
            })?;
            self.index = Some(index);
        }
        self.index
            .as_ref()
            .and_then(|index| entry_for(index, name))
            .cloned()
            .ok_or_else(|| PresetError::UnknownPreset { name: name.to_string() })
    }

    fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url.trim_end_matches('/'), path)
        }
    }

    /// Fetch a library path, consulting the disk cache first and verifying
    /// the catalog checksum when one is given.
    async fn fetch_cached(
        &mut self,
        name: &str,
        path: &str,
        sha256: Option<&str>,
    ) -> Result<Vec<u8>, PresetError> {
        let url = self.absolute_url(path);
        if let Some(cache) = &self.cache {
            if let Some(bytes) = cache.read(&url) {
                match sha256 {
                    Some(want) if digest_hex(&bytes) != want => {
                        // Stale or corrupt cache entry: fall through and refetch.
                    }
                    _ => return Ok(bytes),
                }
            }
        }

        let bytes = self.get(&url, name).await?;
        if let Some(want) = sha256 {
            if digest_hex(&bytes) != want {
                return Err(PresetError::ChecksumMismatch { name: name.to_string() });
            }
        }
        if let Some(cache) = &self.cache {
            let _ = cache.write(&url, &bytes);
        }
        Ok(bytes)
    }

    async fn get(&self, url: &str, name: &str) -> Result<Vec<u8>, PresetError> {
        let fetch_err = |reason: String| PresetError::Fetch { name: name.to_string(), reason };
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?
            .error_for_status()
            .map_err(|e| fetch_err(e.to_string()))?;
        Ok(response.bytes().await.map_err(|e| fetch_err(e.to_string()))?.to_vec())
    }
}
