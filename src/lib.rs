//! Cineforge turns a handful of product images and a few lines of copy into a short promotional
//! video.
//!
//! The engine is built around one pure function, [`render_frame`], that paints the frame for a
//! timeline time onto a [`DrawingSurface`]. Two drivers call it:
//!
//! - [`PreviewDriver`] loops the timeline on the host's frame clock
//! - [`CaptureDriver`] steps through it once and feeds an [`Encoder`]
//!
//! Scene timing comes from [`Timeline::build`]; per-image camera moves from [`motion_path`].
#![forbid(unsafe_code)]

pub mod assets;
pub mod drive;
pub mod encode;
pub mod foundation;
pub mod project;
pub mod render;
pub mod timeline;

pub use crate::foundation::core::{FrameSize, Point, Rect, Rgba8};
pub use crate::foundation::error::{CineforgeError, CineforgeResult};

pub use crate::assets::audio::{AudioAsset, AudioPlayback};
pub use crate::assets::decode::{Asset, AssetId, decode_asset};
pub use crate::assets::store::{AssetLibrary, DecodeBatch, DecodedBatch};
pub use crate::assets::text::FontSet;
pub use crate::drive::capture::{CaptureDriver, CaptureOpts, CaptureReport};
pub use crate::drive::preview::PreviewDriver;
pub use crate::drive::ticker::{FrameTicker, SteppedTicker, WallTicker};
pub use crate::encode::encoder::{Artifact, Encoder, EncodingProfile, InMemoryEncoder};
pub use crate::encode::ffmpeg::{FfmpegEncoder, FfmpegEncoderOpts};
pub use crate::project::file::{LoadedProject, ProjectFile};
pub use crate::project::model::{AspectRatio, MediaSource, StyleConfig, TextFields, VisualStyle};
pub use crate::render::cpu::CpuSurface;
pub use crate::render::frame::{RenderInput, render_frame};
pub use crate::render::surface::{DrawingSurface, FrameRGBA};
pub use crate::timeline::builder::Timeline;
pub use crate::timeline::motion::motion_path;
