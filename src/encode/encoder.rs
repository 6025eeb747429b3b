use std::path::{Path, PathBuf};

use crate::assets::audio::AudioAsset;
use crate::foundation::core::FrameSize;
use crate::foundation::error::{CineforgeError, CineforgeResult};
use crate::render::surface::FrameRGBA;

/// A container plus codec pairing an [`Encoder`] may produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EncodingProfile {
    /// Content type of the finished artifact.
    pub mime_type: &'static str,
    /// File extension for the container.
    pub extension: &'static str,
    /// `ffmpeg` muxer name.
    pub muxer: &'static str,
    /// `ffmpeg` video encoder name.
    pub video_encoder: &'static str,
    /// `ffmpeg` audio encoder name.
    pub audio_encoder: &'static str,
}

/// MP4 with H.264 video and AAC audio.
pub const MP4_H264_AAC: EncodingProfile = EncodingProfile {
    mime_type: "video/mp4;codecs=avc1.42E01E,mp4a.40.2",
    extension: "mp4",
    muxer: "mp4",
    video_encoder: "libx264",
    audio_encoder: "aac",
};

/// WebM with VP9 video and Opus audio.
pub const WEBM_VP9_OPUS: EncodingProfile = EncodingProfile {
    mime_type: "video/webm;codecs=vp9,opus",
    extension: "webm",
    muxer: "webm",
    video_encoder: "libvpx-vp9",
    audio_encoder: "libopus",
};

/// Generic WebM, used when nothing preferred is supported.
pub const WEBM_FALLBACK: EncodingProfile = EncodingProfile {
    mime_type: "video/webm",
    extension: "webm",
    muxer: "webm",
    video_encoder: "libvpx",
    audio_encoder: "libvorbis",
};

/// Encodings in order of preference. The last entry is the unconditional fallback.
pub const ENCODING_PREFERENCES: [EncodingProfile; 3] = [MP4_H264_AAC, WEBM_VP9_OPUS, WEBM_FALLBACK];

/// First preferred encoding `encoder` supports, else the fallback.
pub fn select_encoding(encoder: &dyn Encoder) -> EncodingProfile {
    ENCODING_PREFERENCES
        .iter()
        .copied()
        .find(|p| encoder.is_supported(p))
        .unwrap_or(WEBM_FALLBACK)
}

/// Audio track handed to an encoder at start.
///
/// A source backed by a temporary file deletes it when dropped.
#[derive(Debug)]
pub struct AudioSource {
    mime: String,
    path: Option<PathBuf>,
    remove_on_drop: bool,
}

impl AudioSource {
    /// A track the encoder keeps in memory.
    pub fn in_memory(mime: impl Into<String>) -> Self {
        Self {
            mime: mime.into(),
            path: None,
            remove_on_drop: false,
        }
    }

    /// A track read from an existing file.
    pub fn file(mime: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            mime: mime.into(),
            path: Some(path.into()),
            remove_on_drop: false,
        }
    }

    pub(crate) fn temp_file(mime: impl Into<String>, path: PathBuf) -> Self {
        Self {
            mime: mime.into(),
            path: Some(path),
            remove_on_drop: true,
        }
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Drop for AudioSource {
    fn drop(&mut self) {
        if self.remove_on_drop
            && let Some(path) = self.path.take()
        {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Stream parameters fixed when an encoder starts.
#[derive(Debug)]
pub struct EncoderConfig {
    /// Frame size in pixels.
    pub size: FrameSize,
    /// Output frame rate.
    pub fps: u32,
    /// Target video bitrate in bits per second.
    pub video_bitrate: u32,
    /// Chosen encoding.
    pub profile: EncodingProfile,
    /// Audio track to mux, if one could be opened.
    pub audio: Option<AudioSource>,
}

/// A finished encoded video.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    /// Content type, matching the encoding used.
    pub mime_type: String,
    /// Container file extension.
    pub extension: String,
    /// Encoded bytes.
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// `cineforge-<unix_ms>.<ext>`
    pub fn suggested_file_name(&self, unix_ms: u128) -> String {
        format!("cineforge-{unix_ms}.{}", self.extension)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Encoder contract used by the Capture Driver.
///
/// Ordering contract: `push_frame` is called with strictly increasing timestamps between `start`
/// and `stop`.
pub trait Encoder {
    /// Whether this encoder can produce `profile`.
    fn is_supported(&self, profile: &EncodingProfile) -> bool;
    /// Prepare `audio` for muxing. Failure means the capture continues without audio.
    fn open_audio(&mut self, audio: &AudioAsset) -> CineforgeResult<AudioSource>;
    /// Begin a stream.
    fn start(&mut self, cfg: EncoderConfig) -> CineforgeResult<()>;
    /// Submit the frame rendered for `timestamp_ms`.
    fn push_frame(&mut self, timestamp_ms: f64, frame: &FrameRGBA) -> CineforgeResult<()>;
    /// Finish the stream and return the artifact.
    fn stop(&mut self) -> CineforgeResult<Artifact>;
}

/// Encoder that keeps raw frames in memory, for tests and embedding.
///
/// The artifact is the concatenation of every submitted frame's bytes.
#[derive(Debug)]
pub struct InMemoryEncoder {
    supported: Vec<EncodingProfile>,
    fail_audio: bool,
    cfg: Option<EncoderConfig>,
    timestamps: Vec<f64>,
    bytes: Vec<u8>,
}

impl Default for InMemoryEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEncoder {
    /// Supports every preferred encoding.
    pub fn new() -> Self {
        Self::supporting(&ENCODING_PREFERENCES)
    }

    /// Supports only `profiles`.
    pub fn supporting(profiles: &[EncodingProfile]) -> Self {
        Self {
            supported: profiles.to_vec(),
            fail_audio: false,
            cfg: None,
            timestamps: Vec::new(),
            bytes: Vec::new(),
        }
    }

    /// Make `open_audio` fail.
    pub fn with_failing_audio(mut self) -> Self {
        self.fail_audio = true;
        self
    }

    /// Configuration of the current or last stream.
    pub fn config(&self) -> Option<&EncoderConfig> {
        self.cfg.as_ref()
    }

    /// Timestamps submitted so far, in order.
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }
}

impl Encoder for InMemoryEncoder {
    fn is_supported(&self, profile: &EncodingProfile) -> bool {
        self.supported.contains(profile)
    }

    fn open_audio(&mut self, audio: &AudioAsset) -> CineforgeResult<AudioSource> {
        if self.fail_audio {
            return Err(CineforgeError::encode("audio track unavailable"));
        }
        Ok(AudioSource::in_memory(audio.mime()))
    }

    fn start(&mut self, cfg: EncoderConfig) -> CineforgeResult<()> {
        if cfg.fps == 0 {
            return Err(CineforgeError::validation("fps must be non-zero"));
        }
        self.cfg = Some(cfg);
        self.timestamps.clear();
        self.bytes.clear();
        Ok(())
    }

    fn push_frame(&mut self, timestamp_ms: f64, frame: &FrameRGBA) -> CineforgeResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| CineforgeError::encode("encoder not started"))?;
        if frame.width != cfg.size.width || frame.height != cfg.size.height {
            return Err(CineforgeError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.size.width, cfg.size.height
            )));
        }
        if let Some(&last) = self.timestamps.last()
            && timestamp_ms <= last
        {
            return Err(CineforgeError::encode(
                "encoder received out-of-order frame timestamp",
            ));
        }
        self.timestamps.push(timestamp_ms);
        self.bytes.extend_from_slice(&frame.data);
        Ok(())
    }

    fn stop(&mut self) -> CineforgeResult<Artifact> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| CineforgeError::encode("encoder not started"))?;
        Ok(Artifact {
            mime_type: cfg.profile.mime_type.to_owned(),
            extension: cfg.profile.extension.to_owned(),
            bytes: std::mem::take(&mut self.bytes),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/encoder.rs"]
mod tests;
