use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::foundation::core::FrameSize;
use crate::foundation::error::CineforgeError;

/// Output aspect ratio. Fixes the output pixel dimensions.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum AspectRatio {
    /// 16:9, 1280x720.
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16, 1080x1920.
    #[serde(rename = "9:16")]
    Portrait,
    /// 1:1, 1080x1080.
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    /// Output pixel dimensions for this ratio.
    pub fn frame_size(self) -> FrameSize {
        match self {
            Self::Landscape => FrameSize::new(1280, 720),
            Self::Portrait => FrameSize::new(1080, 1920),
            Self::Square => FrameSize::new(1080, 1080),
        }
    }

    /// Human-readable `w:h` label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Square => "1:1",
        }
    }
}

impl FromStr for AspectRatio {
    type Err = CineforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "16:9" => Ok(Self::Landscape),
            "9:16" => Ok(Self::Portrait),
            "1:1" => Ok(Self::Square),
            other => Err(CineforgeError::validation(format!(
                "unknown aspect ratio '{other}' (expected 16:9, 9:16 or 1:1)"
            ))),
        }
    }
}

/// Visual style. Affects post-processing only, never timing.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum VisualStyle {
    /// Color grade, vignette and 2.35:1 letterbox bars.
    #[default]
    Cinematic,
    /// Color grade and vignette.
    Modern,
    /// No post-processing.
    Minimal,
}

impl VisualStyle {
    /// Lowercase name as used in project files.
    pub fn name(self) -> &'static str {
        match self {
            Self::Cinematic => "cinematic",
            Self::Modern => "modern",
            Self::Minimal => "minimal",
        }
    }
}

impl FromStr for VisualStyle {
    type Err = CineforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cinematic" => Ok(Self::Cinematic),
            "modern" => Ok(Self::Modern),
            "minimal" => Ok(Self::Minimal),
            other => Err(CineforgeError::validation(format!(
                "unknown style '{other}' (expected cinematic, modern or minimal)"
            ))),
        }
    }
}

/// Aspect ratio plus visual style.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct StyleConfig {
    /// Output aspect ratio.
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// Post-processing style.
    #[serde(default)]
    pub style: VisualStyle,
}

impl StyleConfig {
    /// Create a style configuration.
    pub fn new(aspect_ratio: AspectRatio, style: VisualStyle) -> Self {
        Self {
            aspect_ratio,
            style,
        }
    }

    /// Output pixel dimensions.
    pub fn frame_size(&self) -> FrameSize {
        self.aspect_ratio.frame_size()
    }
}

/// Short promotional copy drawn over the video.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TextFields {
    /// Product name, shown as the intro title.
    pub product_name: String,
    /// Tagline, shown under the title.
    pub tagline: String,
    /// One caption per source image, by position.
    pub captions: Vec<String>,
    /// Call-to-action label inside the price card button.
    pub call_to_action: String,
    /// Price label.
    pub price: String,
}

impl TextFields {
    /// Caption for the source image at `source_index`, if one was given and is not blank.
    pub fn caption(&self, source_index: usize) -> Option<&str> {
        self.captions
            .get(source_index)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
    }
}

/// Raw media bytes tagged with a MIME type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaSource {
    /// Encoded bytes.
    pub bytes: Arc<Vec<u8>>,
    /// MIME type, e.g. `image/png` or `audio/mpeg`.
    pub mime: String,
}

impl MediaSource {
    /// Wrap encoded bytes with their MIME type.
    pub fn new(bytes: impl Into<Vec<u8>>, mime: impl Into<String>) -> Self {
        Self {
            bytes: Arc::new(bytes.into()),
            mime: mime.into(),
        }
    }

    /// `true` for `image/svg+xml` sources.
    pub fn is_svg(&self) -> bool {
        self.mime.eq_ignore_ascii_case("image/svg+xml")
    }

    /// Guess a MIME type from a file extension.
    pub fn mime_for_path(path: &Path) -> &'static str {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "svg" => "image/svg+xml",
            "mp3" => "audio/mpeg",
            "wav" => "audio/wav",
            "ogg" | "oga" => "audio/ogg",
            "m4a" => "audio/mp4",
            "aac" => "audio/aac",
            "flac" => "audio/flac",
            "opus" => "audio/opus",
            _ => image::ImageFormat::from_path(path)
                .map(|f| f.to_mime_type())
                .unwrap_or("application/octet-stream"),
        }
    }
}
