use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::assets::text::FontSet;
use crate::foundation::error::{CineforgeError, CineforgeResult};
use crate::project::model::{MediaSource, StyleConfig, TextFields};

/// On-disk project description read by the host binary.
///
/// ```json
/// {
///   "images": ["shots/front.jpg", "shots/side.png"],
///   "audio": "bed.mp3",
///   "font": "fonts/Inter-Regular.ttf",
///   "font_bold": "fonts/Inter-Bold.ttf",
///   "text": { "product_name": "Aurora Lamp", "price": "$49" },
///   "style": { "aspect_ratio": "16:9", "style": "cinematic" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectFile {
    /// Image paths, in display order.
    pub images: Vec<PathBuf>,
    /// Optional background audio path.
    pub audio: Option<PathBuf>,
    /// Optional regular-weight font path. Without one, text is not drawn.
    pub font: Option<PathBuf>,
    /// Optional bold font path, used for the price label.
    pub font_bold: Option<PathBuf>,
    /// Promotional copy.
    pub text: TextFields,
    /// Aspect ratio and visual style.
    pub style: StyleConfig,
}

impl ProjectFile {
    /// Parse a project from JSON text.
    pub fn from_json_str(s: &str) -> CineforgeResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| CineforgeError::serde(format!("project json parse failed: {e}")))
    }

    /// Read and parse a project file.
    pub fn from_path(path: &Path) -> CineforgeResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read project file '{}'", path.display()))?;
        Self::from_json_str(&text)
    }
}

/// A project with its media read into memory.
#[derive(Clone, Debug)]
pub struct LoadedProject {
    /// Image sources in project order.
    pub images: Vec<MediaSource>,
    /// Audio source, when the project names one.
    pub audio: Option<MediaSource>,
    /// Fonts, when the project names a regular face.
    pub fonts: Option<FontSet>,
    /// Promotional copy.
    pub text: TextFields,
    /// Aspect ratio and visual style.
    pub style: StyleConfig,
}

impl LoadedProject {
    /// Read a project file and every file it references.
    ///
    /// Relative paths resolve against the directory holding the project file. A missing media
    /// file is an error here; undecodable bytes are not, they are skipped later at decode time.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> CineforgeResult<Self> {
        let file = ProjectFile::from_path(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_file(file, base)
    }

    /// Resolve and read the media of an already parsed project.
    pub fn from_file(file: ProjectFile, base_dir: &Path) -> CineforgeResult<Self> {
        let images = file
            .images
            .iter()
            .map(|p| read_media(&resolve(base_dir, p)))
            .collect::<CineforgeResult<Vec<_>>>()?;

        let audio = file
            .audio
            .as_deref()
            .map(|p| read_media(&resolve(base_dir, p)))
            .transpose()?;

        let fonts = match file.font.as_deref() {
            Some(regular) => {
                let bold = file.font_bold.as_deref().map(|p| resolve(base_dir, p));
                Some(FontSet::from_paths(
                    &resolve(base_dir, regular),
                    bold.as_deref(),
                )?)
            }
            None => {
                if file.font_bold.is_some() {
                    return Err(CineforgeError::validation(
                        "project names font_bold without a regular font",
                    ));
                }
                None
            }
        };

        Ok(Self {
            images,
            audio,
            fonts,
            text: file.text,
            style: file.style,
        })
    }
}

fn resolve(base_dir: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn read_media(path: &Path) -> CineforgeResult<MediaSource> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read media file '{}'", path.display()))?;
    Ok(MediaSource::new(bytes, MediaSource::mime_for_path(path)))
}
