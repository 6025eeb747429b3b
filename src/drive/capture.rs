use crate::assets::audio::{AudioAsset, AudioPlayback};
use crate::drive::ticker::FrameTicker;
use crate::encode::encoder::{
    Artifact, ENCODING_PREFERENCES, Encoder, EncoderConfig, EncodingProfile, select_encoding,
};
use crate::foundation::error::{CineforgeError, CineforgeResult};
use crate::render::frame::{RenderInput, render_frame};
use crate::render::surface::DrawingSurface;

/// Capture frame rate.
pub const CAPTURE_FPS: u32 = 30;
/// Target video bitrate in bits per second.
pub const DEFAULT_VIDEO_BITRATE: u32 = 8_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureOpts {
    pub fps: u32,
    /// Default: `$CINEFORGE_VIDEO_BITRATE` when set to a positive integer, else
    /// [`DEFAULT_VIDEO_BITRATE`].
    pub video_bitrate: u32,
}

impl Default for CaptureOpts {
    fn default() -> Self {
        let video_bitrate = std::env::var("CINEFORGE_VIDEO_BITRATE")
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_VIDEO_BITRATE);
        Self {
            fps: CAPTURE_FPS,
            video_bitrate,
        }
    }
}

impl CaptureOpts {
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_video_bitrate(mut self, bits_per_second: u32) -> Self {
        self.video_bitrate = bits_per_second;
        self
    }
}

/// Outcome of one capture.
#[derive(Clone, Debug)]
pub struct CaptureReport {
    pub artifact: Artifact,
    pub profile: EncodingProfile,
    /// Frames handed to the encoder.
    pub frames_submitted: u64,
    /// Whether the audio track made it into the stream.
    pub audio_included: bool,
    /// Timeline length that was recorded.
    pub duration_ms: u64,
}

/// Records one full pass of the timeline through an [`Encoder`].
///
/// The driver samples the timeline on the ticker's clock, so a slow renderer yields a lower
/// effective frame rate rather than a longer video. Audio problems are logged and the capture
/// continues without sound.
#[derive(Default)]
pub struct CaptureDriver {
    opts: CaptureOpts,
    playback: Option<Box<dyn AudioPlayback>>,
}

impl CaptureDriver {
    pub fn new(opts: CaptureOpts) -> Self {
        Self {
            opts,
            playback: None,
        }
    }

    /// Play the audio track audibly while recording.
    pub fn with_playback(mut self, playback: Box<dyn AudioPlayback>) -> Self {
        self.playback = Some(playback);
        self
    }

    pub fn opts(&self) -> CaptureOpts {
        self.opts
    }

    #[tracing::instrument(skip_all, fields(total_ms = input.timeline.total_duration_ms()))]
    pub fn capture(
        &mut self,
        ticker: &mut dyn FrameTicker,
        surface: &mut dyn DrawingSurface,
        input: &RenderInput<'_>,
        audio: Option<&AudioAsset>,
        encoder: &mut dyn Encoder,
    ) -> CineforgeResult<CaptureReport> {
        if self.opts.fps == 0 {
            return Err(CineforgeError::validation("capture fps must be non-zero"));
        }
        let size = surface.size();
        let total_ms = input.timeline.total_duration_ms();

        // The video source must hold a frame before the encoder starts reading it.
        render_frame(surface, &input.at(0.0));

        let profile = select_encoding(encoder);
        if profile != ENCODING_PREFERENCES[0] {
            tracing::warn!(
                mime = profile.mime_type,
                "preferred encoding unsupported; falling back"
            );
        }

        let audio_source = match audio {
            Some(a) => match encoder.open_audio(a) {
                Ok(src) => Some(src),
                Err(e) => {
                    tracing::warn!(error = %e, "audio track unavailable; capturing video only");
                    None
                }
            },
            None => None,
        };
        let audio_included = audio_source.is_some();

        encoder.start(EncoderConfig {
            size,
            fps: self.opts.fps,
            video_bitrate: self.opts.video_bitrate,
            profile,
            audio: audio_source,
        })?;
        tracing::info!(
            width = size.width,
            height = size.height,
            fps = self.opts.fps,
            mime = profile.mime_type,
            audio = audio_included,
            "capture started"
        );

        let playing = audio.is_some() && self.start_playback();

        let frames = match record(ticker, surface, input, encoder) {
            Ok(n) => n,
            Err(e) => {
                if let Err(stop_err) = encoder.stop() {
                    tracing::debug!(error = %stop_err, "encoder stop after failed capture");
                }
                if playing {
                    self.pause_playback();
                }
                return Err(e);
            }
        };

        let artifact = encoder.stop();
        if playing {
            self.pause_playback();
        }
        let artifact = artifact?;

        tracing::info!(
            frames,
            bytes = artifact.len(),
            mime = %artifact.mime_type,
            "capture finished"
        );
        Ok(CaptureReport {
            artifact,
            profile,
            frames_submitted: frames,
            audio_included,
            duration_ms: total_ms,
        })
    }

    fn start_playback(&mut self) -> bool {
        let Some(p) = self.playback.as_mut() else {
            return false;
        };
        match p.play() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "audio playback failed to start");
                false
            }
        }
    }

    fn pause_playback(&mut self) {
        if let Some(p) = self.playback.as_mut() {
            p.pause();
        }
    }
}

/// Render and submit frames until the ticker passes the end of the timeline. The last frame is
/// always the one at `total - 1`.
fn record(
    ticker: &mut dyn FrameTicker,
    surface: &mut dyn DrawingSurface,
    input: &RenderInput<'_>,
    encoder: &mut dyn Encoder,
) -> CineforgeResult<u64> {
    let total = input.timeline.total_duration_ms() as f64;
    let last_t = (total - 1.0).max(0.0);
    let start = ticker.next_frame();
    let mut now = start;
    let mut last: Option<f64> = None;
    let mut frames = 0u64;

    loop {
        let elapsed = now - start;
        let done = elapsed >= last_t;
        let t = if done { last_t } else { elapsed.max(0.0) };

        if last.is_none_or(|l| t > l) {
            render_frame(surface, &input.at(t));
            let frame = surface.read_frame();
            encoder.push_frame(t, &frame)?;
            last = Some(t);
            frames += 1;
        }

        if done {
            return Ok(frames);
        }
        now = ticker.next_frame();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/drive/capture.rs"]
mod tests;
