use crate::foundation::error::{CineforgeError, CineforgeResult};
use crate::project::model::MediaSource;

/// The project's single optional background audio track.
///
/// Only the container is sniffed here; the encoder that muxes it decides whether it is usable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioAsset {
    source: MediaSource,
}

impl AudioAsset {
    /// Accept `source` as an audio track if it is non-empty and tagged as audio (or video with an
    /// audio stream, e.g. `video/mp4`).
    pub fn new(source: MediaSource) -> CineforgeResult<Self> {
        if source.bytes.is_empty() {
            return Err(CineforgeError::validation("audio source is empty"));
        }
        let mime = source.mime.to_ascii_lowercase();
        if !(mime.starts_with("audio/") || mime.starts_with("video/")) {
            return Err(CineforgeError::validation(format!(
                "'{}' is not an audio type",
                source.mime
            )));
        }
        Ok(Self { source })
    }

    /// MIME type of the encoded track.
    pub fn mime(&self) -> &str {
        &self.source.mime
    }

    /// Encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.source.bytes
    }

    /// Conventional file extension for the track's MIME type.
    pub fn extension(&self) -> &'static str {
        match self.source.mime.to_ascii_lowercase().as_str() {
            "audio/mpeg" | "audio/mp3" => "mp3",
            "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
            "audio/ogg" => "ogg",
            "audio/opus" => "opus",
            "audio/flac" => "flac",
            "audio/aac" => "aac",
            "audio/mp4" | "video/mp4" => "m4a",
            "audio/webm" | "video/webm" => "webm",
            _ => "bin",
        }
    }
}

/// Host capability that plays the audio track audibly while a capture records.
///
/// Failures never abort a capture.
pub trait AudioPlayback {
    /// Start playback from the beginning.
    fn play(&mut self) -> CineforgeResult<()>;
    /// Pause playback.
    fn pause(&mut self);
}
