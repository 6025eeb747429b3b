use std::sync::Arc;

use super::*;
use crate::assets::decode::AssetId;
use crate::project::model::{AspectRatio, VisualStyle};
use crate::render::cpu::CpuSurface;
use crate::render::surface::{
    ColorGrade, FrameRGBA, RadialGradient, TextAnchor, TextMetrics,
};

fn solid(w: u32, h: u32, px: [u8; 4], source_index: usize) -> Asset {
    Asset {
        id: AssetId(source_index as u64 + 1),
        source_index,
        width: w,
        height: h,
        rgba8_premul: Arc::new(px.repeat((w * h) as usize)),
    }
}

fn text() -> TextFields {
    TextFields {
        product_name: "Aurora".to_owned(),
        tagline: "Light, reimagined".to_owned(),
        captions: vec!["first".to_owned(), "second".to_owned(), "third".to_owned()],
        call_to_action: "Shop now".to_owned(),
        price: "$49".to_owned(),
    }
}

fn render(style: VisualStyle, assets: &[Asset], t: f64) -> FrameRGBA {
    let timeline = Timeline::build(assets.len());
    let text = text();
    let style = StyleConfig::new(AspectRatio::Landscape, style);
    let input = RenderInput {
        time_ms: t,
        timeline: &timeline,
        assets,
        has_audio: false,
        text: &text,
        style: &style,
    };
    let mut s = CpuSurface::new(FrameSize::new(160, 90)).unwrap();
    render_frame(&mut s, &input);
    s.read_frame()
}

#[derive(Debug, PartialEq)]
enum Op {
    Clear,
    Rect,
    Rounded,
    Image(usize, Rect),
    Linear,
    Radial,
    Text(String),
    Grade,
}

struct Recording {
    size: FrameSize,
    ops: Vec<Op>,
    texts: Vec<(String, Point, TextAnchor)>,
    measures: usize,
}

impl DrawingSurface for Recording {
    fn size(&self) -> FrameSize {
        self.size
    }
    fn clear(&mut self, _: Rgba8) {
        self.ops.push(Op::Clear);
    }
    fn fill_rect(&mut self, _: Rect, _: Rgba8) {
        self.ops.push(Op::Rect);
    }
    fn fill_rounded_rect(&mut self, _: Rect, _: f64, _: Rgba8) {
        self.ops.push(Op::Rounded);
    }
    fn draw_image(&mut self, image: &Asset, dst: Rect, _: f32) {
        self.ops.push(Op::Image(image.source_index, dst));
    }
    fn fill_linear_gradient(&mut self, _: Rect, _: &LinearGradient) {
        self.ops.push(Op::Linear);
    }
    fn fill_radial_gradient(&mut self, _: Rect, _: &RadialGradient) {
        self.ops.push(Op::Radial);
    }
    fn measure_text(&mut self, text: &str, _: &TextStyle) -> Option<TextMetrics> {
        self.measures += 1;
        Some(TextMetrics {
            width: text.len() as f64 * 10.0,
            height: 20.0,
        })
    }
    fn draw_text(&mut self, text: &str, at: Point, style: &TextStyle) {
        if !text.is_empty() {
            self.ops.push(Op::Text(text.to_owned()));
            self.texts.push((text.to_owned(), at, style.anchor));
        }
    }
    fn apply_color_grade(&mut self, _: ColorGrade) {
        self.ops.push(Op::Grade);
    }
    fn read_frame(&mut self) -> FrameRGBA {
        FrameRGBA {
            width: self.size.width,
            height: self.size.height,
            data: Vec::new(),
            premultiplied: true,
        }
    }
}

fn record(style: VisualStyle, assets: &[Asset], t: f64) -> Vec<Op> {
    record_with(style, assets, &text(), t).ops
}

fn record_with(style: VisualStyle, assets: &[Asset], text: &TextFields, t: f64) -> Recording {
    let timeline = Timeline::build(assets.len());
    let style = StyleConfig::new(AspectRatio::Landscape, style);
    let input = RenderInput {
        time_ms: t,
        timeline: &timeline,
        assets,
        has_audio: true,
        text,
        style: &style,
    };
    let mut s = Recording {
        size: FrameSize::new(1280, 720),
        ops: Vec::new(),
        texts: Vec::new(),
        measures: 0,
    };
    render_frame(&mut s, &input);
    s
}

#[test]
fn fit_cover_covers_and_keeps_aspect() {
    let cases = [
        (400.0, 300.0, 1280.0, 720.0),
        (300.0, 900.0, 1280.0, 720.0),
        (1000.0, 1000.0, 1080.0, 1920.0),
        (1.0, 1.0, 1080.0, 1080.0),
    ];
    for (sw, sh, dw, dh) in cases {
        let r = fit_cover(sw, sh, dw, dh);
        assert!(r.width() >= dw - 1e-9 && r.height() >= dh - 1e-9, "{r:?}");
        assert!((r.width() / r.height() - sw / sh).abs() < 1e-9);
        assert!((r.center().x - dw / 2.0).abs() < 1e-9);
        assert!((r.center().y - dh / 2.0).abs() < 1e-9);
    }
    assert_eq!(fit_cover(0.0, 10.0, 20.0, 30.0), Rect::new(0.0, 0.0, 20.0, 30.0));
}

#[test]
fn ken_burns_rect_always_covers_frame() {
    let frame = FrameSize::new(1280, 720);
    for i in 0..6 {
        for p in [0.0, 0.3, 0.999] {
            let r = ken_burns_rect(640, 640, frame, motion_path(i).at(p));
            assert!(r.x0 <= 1e-9 && r.y0 <= 1e-9, "{i} {p} {r:?}");
            assert!(r.x1 >= frame.w() - 1e-9 && r.y1 >= frame.h() - 1e-9, "{i} {p} {r:?}");
        }
    }
}

#[test]
fn rendering_is_pure() {
    let assets = vec![solid(8, 6, [200, 120, 40, 255], 0), solid(5, 9, [10, 90, 220, 255], 1)];
    for t in [0.0, 800.0, 2500.0, 6000.0, 8200.0, 9950.0] {
        assert_eq!(
            render(VisualStyle::Cinematic, &assets, t),
            render(VisualStyle::Cinematic, &assets, t),
            "t={t}"
        );
    }
}

#[test]
fn reused_surface_renders_same_pixels() {
    let assets = vec![solid(8, 6, [200, 120, 40, 255], 0)];
    let timeline = Timeline::build(1);
    let text = text();
    let style = StyleConfig::new(AspectRatio::Landscape, VisualStyle::Modern);
    let input = RenderInput {
        time_ms: 3000.0,
        timeline: &timeline,
        assets: &assets,
        has_audio: false,
        text: &text,
        style: &style,
    };
    let mut s = CpuSurface::new(FrameSize::new(64, 36)).unwrap();
    render_frame(&mut s, &input);
    let first = s.read_frame();
    render_frame(&mut s, &input.at(5900.0));
    render_frame(&mut s, &input);
    assert_eq!(s.read_frame(), first);
}

#[test]
fn minimal_style_is_the_unmodified_scene() {
    let assets = vec![solid(8, 6, [200, 120, 40, 255], 0)];
    let timeline = Timeline::build(1);
    let text = text();
    let style = StyleConfig::new(AspectRatio::Landscape, VisualStyle::Minimal);
    for t in [100.0, 2500.0, 5000.0, 6400.0] {
        let input = RenderInput {
            time_ms: t,
            timeline: &timeline,
            assets: &assets,
            has_audio: false,
            text: &text,
            style: &style,
        };
        let mut a = CpuSurface::new(FrameSize::new(160, 90)).unwrap();
        let mut b = CpuSurface::new(FrameSize::new(160, 90)).unwrap();
        render_frame(&mut a, &input);
        render_scene(&mut b, &input);
        assert_eq!(a.read_frame(), b.read_frame(), "t={t}");
    }

    let ops = record(VisualStyle::Minimal, &assets, 2500.0);
    assert!(!ops.contains(&Op::Grade));
    assert!(!ops.contains(&Op::Radial));
}

#[test]
fn vignette_darkens_corners() {
    let assets = vec![solid(4, 4, [255, 255, 255, 255], 0)];
    // Price card: no bars, no image.
    let minimal = render(VisualStyle::Minimal, &assets, 5000.0);
    let modern = render(VisualStyle::Modern, &assets, 5000.0);
    let sum = |p: [u8; 4]| u32::from(p[0]) + u32::from(p[1]) + u32::from(p[2]);
    for (x, y) in [(0, 0), (159, 0), (0, 89), (159, 89)] {
        assert!(
            sum(modern.pixel(x, y).unwrap()) < sum(minimal.pixel(x, y).unwrap()),
            "corner {x},{y}"
        );
    }
}

#[test]
fn cinematic_bars_are_black() {
    let assets = vec![solid(4, 4, [255, 255, 255, 255], 0)];
    let frame = render(VisualStyle::Cinematic, &assets, 2500.0);
    // 160x90: bar = round((90 - 160 / 2.35) / 2) = 11
    for x in [0, 80, 159] {
        assert_eq!(frame.pixel(x, 0), Some([0, 0, 0, 255]));
        assert_eq!(frame.pixel(x, 10), Some([0, 0, 0, 255]));
        assert_eq!(frame.pixel(x, 89), Some([0, 0, 0, 255]));
        assert_eq!(frame.pixel(x, 79), Some([0, 0, 0, 255]));
    }
    assert_ne!(frame.pixel(80, 45), Some([0, 0, 0, 255]));
}

#[test]
fn outro_ends_black() {
    let assets = vec![solid(4, 4, [255, 255, 255, 255], 0)];
    let frame = render(VisualStyle::Minimal, &assets, 1e9);
    for p in frame.data.chunks_exact(4) {
        assert!(p[0] <= 1 && p[1] <= 1 && p[2] <= 1, "{p:?}");
    }
}

#[test]
fn intro_fades_in_over_first_asset() {
    let assets = vec![solid(4, 4, [255, 255, 255, 255], 0)];
    let ops = record(VisualStyle::Minimal, &assets, 0.0);
    assert_eq!(ops[0], Op::Clear);
    assert!(matches!(ops[1], Op::Image(0, _)));
    assert_eq!(ops[2], Op::Rect);
    assert!(ops.contains(&Op::Text("Aurora".to_owned())));
    assert!(ops.contains(&Op::Text("Light, reimagined".to_owned())));
}

#[test]
fn caption_follows_source_position() {
    // The image at source position 1 failed to decode; the second asset came from position 2.
    let assets = vec![
        solid(4, 4, [255, 0, 0, 255], 0),
        solid(4, 4, [0, 255, 0, 255], 2),
    ];
    let ops = record(VisualStyle::Modern, &assets, 5000.0);
    assert!(matches!(ops[1], Op::Image(2, _)));
    assert!(ops.contains(&Op::Text("third".to_owned())));
    assert!(!ops.contains(&Op::Text("second".to_owned())));
    assert_eq!(ops.last(), Some(&Op::Radial));
}

#[test]
fn no_assets_renders_text_only_intro() {
    let ops = record(VisualStyle::Cinematic, &[], 700.0);
    assert!(!ops.iter().any(|op| matches!(op, Op::Image(..))));
    assert!(ops.contains(&Op::Text("Aurora".to_owned())));
    // clear, overlay, two texts, grade, vignette, two bars
    assert_eq!(ops.iter().filter(|op| **op == Op::Rect).count(), 3);
}

#[test]
fn price_card_draws_pill_and_labels() {
    let assets = vec![solid(4, 4, [255, 255, 255, 255], 0)];
    let ops = record(VisualStyle::Minimal, &assets, 5000.0);
    assert_eq!(
        ops,
        vec![
            Op::Clear,
            Op::Linear,
            Op::Text("$49".to_owned()),
            Op::Rounded,
            Op::Text("Shop now".to_owned()),
        ]
    );
}

#[test]
fn intro_lines_sit_at_fixed_positions() {
    let short = text();
    let mut long = text();
    long.product_name = "Aurora Ambient Desk Lamp with Wireless Charging Base".to_owned();

    for fields in [&short, &long] {
        let rec = record_with(VisualStyle::Minimal, &[], fields, 500.0);
        assert_eq!(rec.measures, 0);
        assert_eq!(
            rec.texts,
            vec![
                (
                    fields.product_name.clone(),
                    Point::new(1280.0 * 0.08, 720.0 * 0.52),
                    TextAnchor::Bottom
                ),
                (
                    "Light, reimagined".to_owned(),
                    Point::new(1280.0 * 0.08, 720.0 * 0.55),
                    TextAnchor::Top
                ),
            ]
        );
    }
}
