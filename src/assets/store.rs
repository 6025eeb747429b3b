use std::time::Instant;

use crate::assets::audio::AudioAsset;
use crate::assets::decode::{Asset, decode_asset};
use crate::project::model::MediaSource;

/// Identifies one asset-list generation.
///
/// A batch decoded for an older generation is discarded at commit time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenerationToken(u64);

/// Sources captured for one generation, not yet decoded.
#[derive(Clone, Debug)]
pub struct DecodeBatch {
    token: GenerationToken,
    sources: Vec<MediaSource>,
}

impl DecodeBatch {
    /// Generation this batch was captured for.
    pub fn token(&self) -> GenerationToken {
        self.token
    }

    /// Number of sources in the batch.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// `true` when the batch holds no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Decode every source. Failed sources are skipped and logged.
    ///
    /// Needs no access to the library, so it may run on another thread.
    #[tracing::instrument(skip_all, fields(generation = self.token.0, sources = self.len()))]
    pub fn decode(self) -> DecodedBatch {
        let mut assets = Vec::with_capacity(self.sources.len());
        let mut failed = 0usize;
        for (source_index, source) in self.sources.iter().enumerate() {
            let t0 = Instant::now();
            match decode_asset(source, source_index) {
                Ok(asset) => {
                    tracing::debug!(
                        source_index,
                        width = asset.width,
                        height = asset.height,
                        elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
                        "decoded image"
                    );
                    assets.push(asset);
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(source_index, mime = %source.mime, error = %e, "skipping image that failed to decode");
                }
            }
        }
        DecodedBatch {
            token: self.token,
            assets,
            failed,
        }
    }
}

/// Result of decoding a [`DecodeBatch`].
#[derive(Clone, Debug)]
pub struct DecodedBatch {
    token: GenerationToken,
    assets: Vec<Asset>,
    failed: usize,
}

impl DecodedBatch {
    /// Generation the batch was decoded for.
    pub fn token(&self) -> GenerationToken {
        self.token
    }

    /// Successfully decoded assets, in source order.
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Number of sources that failed to decode.
    pub fn failed(&self) -> usize {
        self.failed
    }
}

/// The engine's decoded media for the current project inputs.
///
/// The image list is never mutated in place: each source-list change starts a new generation and
/// the decoded list replaces the old one wholesale on commit.
#[derive(Debug, Default)]
pub struct AssetLibrary {
    generation: u64,
    images: Vec<Asset>,
    audio: Option<AudioAsset>,
}

impl AssetLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation.
    pub fn generation(&self) -> GenerationToken {
        GenerationToken(self.generation)
    }

    /// Start a new generation for `sources`. Any batch from an earlier generation becomes stale.
    pub fn begin(&mut self, sources: Vec<MediaSource>) -> DecodeBatch {
        self.generation = self.generation.wrapping_add(1);
        DecodeBatch {
            token: GenerationToken(self.generation),
            sources,
        }
    }

    /// Install a decoded batch if it belongs to the current generation.
    ///
    /// Returns `false` (and keeps the current images) for a stale batch.
    pub fn commit(&mut self, decoded: DecodedBatch) -> bool {
        if decoded.token != self.generation() {
            tracing::warn!(
                batch = decoded.token.0,
                current = self.generation,
                "discarding stale decode batch"
            );
            return false;
        }
        self.images = decoded.assets;
        true
    }

    /// Begin, decode and commit in one step.
    pub fn load(&mut self, sources: Vec<MediaSource>) -> &[Asset] {
        let decoded = self.begin(sources).decode();
        self.commit(decoded);
        &self.images
    }

    /// Decoded images of the current generation.
    pub fn images(&self) -> &[Asset] {
        &self.images
    }

    /// Replace the audio track.
    pub fn set_audio(&mut self, audio: Option<AudioAsset>) {
        self.audio = audio;
    }

    /// Current audio track, if any.
    pub fn audio(&self) -> Option<&AudioAsset> {
        self.audio.as_ref()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
