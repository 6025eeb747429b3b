use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use super::*;
use crate::assets::decode::{Asset, AssetId};
use crate::drive::ticker::SteppedTicker;
use crate::encode::encoder::{
    AudioSource, InMemoryEncoder, MP4_H264_AAC, WEBM_FALLBACK, WEBM_VP9_OPUS,
};
use crate::foundation::core::{FrameSize, Point, Rect, Rgba8};
use crate::project::model::{MediaSource, StyleConfig, TextFields};
use crate::render::surface::{
    ColorGrade, FrameRGBA, LinearGradient, RadialGradient, TextMetrics, TextStyle,
};
use crate::timeline::builder::Timeline;

const W: u32 = 8;
const H: u32 = 4;

/// Cheap surface whose read-back encodes the number of clears so far.
#[derive(Default)]
struct CountingSurface {
    clears: u32,
}

impl DrawingSurface for CountingSurface {
    fn size(&self) -> FrameSize {
        FrameSize::new(W, H)
    }
    fn clear(&mut self, _: Rgba8) {
        self.clears += 1;
    }
    fn fill_rect(&mut self, _: Rect, _: Rgba8) {}
    fn fill_rounded_rect(&mut self, _: Rect, _: f64, _: Rgba8) {}
    fn draw_image(&mut self, _: &Asset, _: Rect, _: f32) {}
    fn fill_linear_gradient(&mut self, _: Rect, _: &LinearGradient) {}
    fn fill_radial_gradient(&mut self, _: Rect, _: &RadialGradient) {}
    fn measure_text(&mut self, _: &str, _: &TextStyle) -> Option<TextMetrics> {
        None
    }
    fn draw_text(&mut self, _: &str, _: Point, _: &TextStyle) {}
    fn apply_color_grade(&mut self, _: ColorGrade) {}
    fn read_frame(&mut self) -> FrameRGBA {
        FrameRGBA {
            width: W,
            height: H,
            data: vec![(self.clears % 251) as u8; (W * H * 4) as usize],
            premultiplied: true,
        }
    }
}

/// Host clock with an arbitrary period.
struct EveryMs {
    now: f64,
    step: f64,
}

impl FrameTicker for EveryMs {
    fn next_frame(&mut self) -> f64 {
        self.now += self.step;
        self.now
    }
}

#[derive(Default)]
struct PlaybackLog {
    plays: u32,
    pauses: u32,
}

struct FakePlayback(Rc<RefCell<PlaybackLog>>);

impl AudioPlayback for FakePlayback {
    fn play(&mut self) -> CineforgeResult<()> {
        self.0.borrow_mut().plays += 1;
        Ok(())
    }
    fn pause(&mut self) {
        self.0.borrow_mut().pauses += 1;
    }
}

fn assets(n: usize) -> Vec<Asset> {
    (0..n)
        .map(|i| Asset {
            id: AssetId(i as u64 + 1),
            source_index: i,
            width: 2,
            height: 2,
            rgba8_premul: Arc::new(vec![255; 16]),
        })
        .collect()
}

fn audio() -> AudioAsset {
    AudioAsset::new(MediaSource::new(vec![1, 2, 3, 4], "audio/mpeg")).unwrap()
}

struct Fixture {
    timeline: Timeline,
    assets: Vec<Asset>,
    text: TextFields,
    style: StyleConfig,
}

impl Fixture {
    fn new(n: usize) -> Self {
        Self {
            timeline: Timeline::build(n),
            assets: assets(n),
            text: TextFields::default(),
            style: StyleConfig::default(),
        }
    }

    fn input(&self, has_audio: bool) -> RenderInput<'_> {
        RenderInput {
            time_ms: 0.0,
            timeline: &self.timeline,
            assets: &self.assets,
            has_audio,
            text: &self.text,
            style: &self.style,
        }
    }
}

fn opts() -> CaptureOpts {
    CaptureOpts {
        fps: CAPTURE_FPS,
        video_bitrate: DEFAULT_VIDEO_BITRATE,
    }
}

#[test]
fn three_images_at_thirty_fps_submit_412_frames() {
    let fx = Fixture::new(3);
    let mut surface = CountingSurface::default();
    let mut encoder = InMemoryEncoder::new();
    let mut ticker = SteppedTicker::new(CAPTURE_FPS);

    let report = CaptureDriver::new(opts())
        .capture(&mut ticker, &mut surface, &fx.input(false), None, &mut encoder)
        .unwrap();

    assert_eq!(report.duration_ms, 13_700);
    assert_eq!(report.frames_submitted, 412);
    assert_eq!(report.profile, MP4_H264_AAC);
    assert!(!report.audio_included);
    assert!(report.artifact.mime_type.starts_with("video/mp4"));
    assert_eq!(report.artifact.len(), 412 * (W * H * 4) as usize);

    let ts = encoder.timestamps();
    assert_eq!(ts.len(), 412);
    assert_eq!(ts[0], 0.0);
    assert_eq!(*ts.last().unwrap(), 13_699.0);
    assert!(ts.windows(2).all(|w| w[0] < w[1]));

    // Priming render plus one per submitted frame.
    assert_eq!(surface.clears, 413);
    let cfg = encoder.config().unwrap();
    assert_eq!(cfg.size, FrameSize::new(W, H));
    assert_eq!(cfg.fps, 30);
    assert_eq!(cfg.video_bitrate, 8_000_000);
}

#[test]
fn ticker_offset_does_not_shift_timeline() {
    let fx = Fixture::new(0);
    let mut encoder = InMemoryEncoder::new();
    let mut ticker = SteppedTicker::starting_at(98_765.0, 10);

    let report = CaptureDriver::new(opts())
        .capture(
            &mut ticker,
            &mut CountingSurface::default(),
            &fx.input(false),
            None,
            &mut encoder,
        )
        .unwrap();

    // 0, 100, .., 1400, then the clamped final frame.
    assert_eq!(report.frames_submitted, 16);
    assert_eq!(encoder.timestamps()[0], 0.0);
    assert_eq!(*encoder.timestamps().last().unwrap(), 1_499.0);
}

#[test]
fn falls_back_when_preferred_encodings_are_unsupported() {
    let fx = Fixture::new(1);
    let mut encoder = InMemoryEncoder::supporting(&[]);
    let report = CaptureDriver::new(opts())
        .capture(
            &mut SteppedTicker::new(CAPTURE_FPS),
            &mut CountingSurface::default(),
            &fx.input(false),
            None,
            &mut encoder,
        )
        .unwrap();
    assert_eq!(report.profile, WEBM_FALLBACK);
    assert_eq!(report.artifact.mime_type, "video/webm");
    assert_eq!(report.artifact.extension, "webm");

    let mut encoder = InMemoryEncoder::supporting(&[WEBM_VP9_OPUS]);
    let report = CaptureDriver::new(opts())
        .capture(
            &mut SteppedTicker::new(CAPTURE_FPS),
            &mut CountingSurface::default(),
            &fx.input(false),
            None,
            &mut encoder,
        )
        .unwrap();
    assert_eq!(report.profile, WEBM_VP9_OPUS);
}

#[test]
fn audio_is_muxed_and_played_back() {
    let fx = Fixture::new(1);
    let log = Rc::new(RefCell::new(PlaybackLog::default()));
    let mut encoder = InMemoryEncoder::new();
    let mut driver =
        CaptureDriver::new(opts()).with_playback(Box::new(FakePlayback(Rc::clone(&log))));

    let track = audio();
    let report = driver
        .capture(
            &mut SteppedTicker::new(CAPTURE_FPS),
            &mut CountingSurface::default(),
            &fx.input(true),
            Some(&track),
            &mut encoder,
        )
        .unwrap();

    assert!(report.audio_included);
    let cfg = encoder.config().unwrap();
    assert_eq!(cfg.audio.as_ref().map(|a| a.mime()), Some("audio/mpeg"));
    assert_eq!(log.borrow().plays, 1);
    assert_eq!(log.borrow().pauses, 1);
}

#[test]
fn audio_failure_degrades_to_video_only() {
    let fx = Fixture::new(2);
    let mut encoder = InMemoryEncoder::new().with_failing_audio();
    let track = audio();
    let report = CaptureDriver::new(opts())
        .capture(
            &mut SteppedTicker::new(CAPTURE_FPS),
            &mut CountingSurface::default(),
            &fx.input(true),
            Some(&track),
            &mut encoder,
        )
        .unwrap();

    assert!(!report.audio_included);
    assert!(encoder.config().unwrap().audio.is_none());
    assert!(!report.artifact.is_empty());
}

#[test]
fn slow_renderer_lowers_frame_rate_not_duration() {
    let fx = Fixture::new(0);
    let mut encoder = InMemoryEncoder::new();
    // A host clock that only ticks every 700 ms.
    let mut ticker = EveryMs { now: -700.0, step: 700.0 };
    let report = CaptureDriver::new(opts())
        .capture(
            &mut ticker,
            &mut CountingSurface::default(),
            &fx.input(false),
            None,
            &mut encoder,
        )
        .unwrap();
    assert_eq!(encoder.timestamps(), &[0.0, 700.0, 1400.0, 1499.0]);
    assert_eq!(report.frames_submitted, 4);
}

#[test]
fn zero_fps_is_rejected() {
    let fx = Fixture::new(0);
    let err = CaptureDriver::new(opts().with_fps(0))
        .capture(
            &mut SteppedTicker::new(CAPTURE_FPS),
            &mut CountingSurface::default(),
            &fx.input(false),
            None,
            &mut InMemoryEncoder::new(),
        )
        .unwrap_err();
    assert!(matches!(err, CineforgeError::Validation(_)));
}

/// Wraps the in-memory encoder, rejecting frames after `accept` and counting stops.
struct FlakyEncoder {
    inner: InMemoryEncoder,
    accept: usize,
    pushed: usize,
    stops: u32,
}

impl FlakyEncoder {
    fn new(accept: usize) -> Self {
        Self {
            inner: InMemoryEncoder::new(),
            accept,
            pushed: 0,
            stops: 0,
        }
    }
}

impl Encoder for FlakyEncoder {
    fn is_supported(&self, profile: &EncodingProfile) -> bool {
        self.inner.is_supported(profile)
    }
    fn open_audio(&mut self, audio: &AudioAsset) -> CineforgeResult<AudioSource> {
        self.inner.open_audio(audio)
    }
    fn start(&mut self, cfg: EncoderConfig) -> CineforgeResult<()> {
        self.inner.start(cfg)
    }
    fn push_frame(&mut self, timestamp_ms: f64, frame: &FrameRGBA) -> CineforgeResult<()> {
        if self.pushed == self.accept {
            return Err(CineforgeError::encode("sink closed"));
        }
        self.pushed += 1;
        self.inner.push_frame(timestamp_ms, frame)
    }
    fn stop(&mut self) -> CineforgeResult<Artifact> {
        self.stops += 1;
        self.inner.stop()
    }
}

#[test]
fn failed_frame_stops_encoder_and_pauses_audio() {
    let fx = Fixture::new(1);
    let log = Rc::new(RefCell::new(PlaybackLog::default()));
    let mut encoder = FlakyEncoder::new(5);
    let mut driver =
        CaptureDriver::new(opts()).with_playback(Box::new(FakePlayback(Rc::clone(&log))));

    let track = audio();
    let err = driver
        .capture(
            &mut SteppedTicker::new(CAPTURE_FPS),
            &mut CountingSurface::default(),
            &fx.input(true),
            Some(&track),
            &mut encoder,
        )
        .unwrap_err();

    assert!(matches!(err, CineforgeError::Encode(_)));
    assert_eq!(encoder.pushed, 5);
    assert_eq!(encoder.stops, 1);
    assert_eq!(log.borrow().plays, 1);
    assert_eq!(log.borrow().pauses, 1);

    // The stopped encoder accepts a fresh stream.
    encoder.accept = usize::MAX;
    let report = driver
        .capture(
            &mut SteppedTicker::new(CAPTURE_FPS),
            &mut CountingSurface::default(),
            &fx.input(false),
            None,
            &mut encoder,
        )
        .unwrap();
    assert_eq!(encoder.stops, 2);
    assert!(report.frames_submitted > 0);
}
