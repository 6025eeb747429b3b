use super::*;
use crate::assets::decode::Asset;
use crate::drive::ticker::SteppedTicker;
use crate::foundation::core::{Point, Rect, Rgba8};
use crate::project::model::{StyleConfig, TextFields, VisualStyle};
use crate::render::surface::{
    ColorGrade, FrameRGBA, LinearGradient, RadialGradient, TextMetrics, TextStyle,
};
use crate::timeline::builder::Timeline;

/// Counts frames; ignores draws.
#[derive(Default)]
struct NullSurface {
    clears: u32,
}

impl DrawingSurface for NullSurface {
    fn size(&self) -> FrameSize {
        FrameSize::new(16, 9)
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
            width: 16,
            height: 9,
            data: vec![0; 16 * 9 * 4],
            premultiplied: true,
        }
    }
}

fn input<'a>(
    timeline: &'a Timeline,
    text: &'a TextFields,
    style: &'a StyleConfig,
) -> RenderInput<'a> {
    RenderInput {
        time_ms: 0.0,
        timeline,
        assets: &[],
        has_audio: false,
        text,
        style,
    }
}

#[test]
fn first_callback_sets_origin_and_time_wraps() {
    let timeline = Timeline::build(0);
    let text = TextFields::default();
    let style = StyleConfig::default();
    let input = input(&timeline, &text, &style);
    let mut surface = NullSurface::default();
    let mut driver = PreviewDriver::new();

    assert_eq!(driver.on_frame(10.0, &mut surface, &input), None);
    driver.start();
    assert_eq!(driver.on_frame(5000.0, &mut surface, &input), Some(0.0));
    assert_eq!(driver.on_frame(5400.0, &mut surface, &input), Some(400.0));
    assert_eq!(driver.on_frame(6600.0, &mut surface, &input), Some(100.0));
    assert_eq!(driver.frames_in_loop(), 3);
    assert_eq!(surface.clears, 3);

    driver.stop();
    assert!(!driver.is_running());
    assert_eq!(driver.on_frame(7000.0, &mut surface, &input), None);
    assert_eq!(surface.clears, 3);
}

#[test]
fn changed_inputs_restart_the_loop() {
    let timeline = Timeline::build(0);
    let text = TextFields::default();
    let style = StyleConfig::default();
    let before = input(&timeline, &text, &style);

    let mut driver = PreviewDriver::new();
    let mut surface = NullSurface::default();
    driver.start();
    driver.on_frame(0.0, &mut surface, &before);
    assert_eq!(driver.on_frame(900.0, &mut surface, &before), Some(900.0));

    let renamed = TextFields {
        product_name: "New name".to_owned(),
        ..TextFields::default()
    };
    let after = input(&timeline, &renamed, &style);
    assert_eq!(driver.on_frame(1000.0, &mut surface, &after), Some(0.0));
    assert_eq!(driver.restarts(), 1);
    assert_eq!(driver.on_frame(1250.0, &mut surface, &after), Some(250.0));

    let minimal = StyleConfig {
        style: VisualStyle::Minimal,
        ..style
    };
    let restyled = input(&timeline, &renamed, &minimal);
    assert_eq!(driver.on_frame(1300.0, &mut surface, &restyled), Some(0.0));
    assert_eq!(driver.restarts(), 2);
}

#[test]
fn key_ignores_time_only() {
    let timeline = Timeline::build(0);
    let text = TextFields::default();
    let style = StyleConfig::default();
    let a = input(&timeline, &text, &style);
    let size = FrameSize::new(16, 9);
    assert_eq!(PreviewKey::of(&a, size), PreviewKey::of(&a.at(1234.0), size));
    let with_audio = RenderInput {
        has_audio: true,
        ..a
    };
    assert_ne!(PreviewKey::of(&a, size), PreviewKey::of(&with_audio, size));
    assert_ne!(PreviewKey::of(&a, size), PreviewKey::of(&a, FrameSize::new(9, 16)));
}

#[test]
fn run_for_renders_until_duration() {
    let timeline = Timeline::build(0);
    let text = TextFields::default();
    let style = StyleConfig::default();
    let input = input(&timeline, &text, &style);
    let mut surface = NullSurface::default();
    let mut driver = PreviewDriver::new();
    let mut ticker = SteppedTicker::new(10);
    let mut seen = Vec::new();
    let frames = driver
        .run_for(&mut ticker, &mut surface, &input, 2000.0, |t, _| {
            seen.push(t);
            Ok(())
        })
        .unwrap();
    assert_eq!(frames, 20);
    assert_eq!(seen[0], 0.0);
    assert_eq!(seen[15], 0.0);
    assert!(seen.iter().all(|t| *t < 1500.0));
}
