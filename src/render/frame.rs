use crate::assets::decode::Asset;
use crate::foundation::core::{FrameSize, Point, Rect, Rgba8};
use crate::foundation::math::ramp;
use crate::project::model::{StyleConfig, TextFields};
use crate::render::post::apply_post;
use crate::render::surface::{
    DrawingSurface, GradientStop, LinearGradient, TextAlign, TextAnchor, TextStyle,
};
use crate::timeline::builder::{SceneKind, Timeline};
use crate::timeline::motion::{MotionPath, MotionSample, motion_path};

// Font sizes as fractions of the frame's short side.
const TITLE_SIZE: f64 = 0.085;
const SUBTITLE_SIZE: f64 = 0.04;
const CAPTION_SIZE: f64 = 0.045;
const PRICE_SIZE: f64 = 0.14;
const CTA_SIZE: f64 = 0.045;

/// Wrap width as a fraction of frame width.
const TEXT_WRAP: f64 = 0.84;
/// Bottom edge of the intro title and top edge of the subtitle, as fractions of frame height.
const TITLE_LINE: f64 = 0.52;
const SUBTITLE_LINE: f64 = 0.55;
/// Fraction of a scene over which text fades in.
const FADE_IN_SPAN: f64 = 2.0 / 3.0;

const INTRO_OVERLAY: Rgba8 = Rgba8::new(0, 0, 0, 115);
const CAPTION_SHADE: Rgba8 = Rgba8::new(0, 0, 0, 140);
const PRICE_BG_START: Rgba8 = Rgba8::opaque(20, 24, 38);
const PRICE_BG_END: Rgba8 = Rgba8::opaque(58, 32, 82);
const PILL_TEXT: Rgba8 = Rgba8::opaque(17, 24, 39);

/// Everything one frame depends on. Borrowed for a single call, never retained.
#[derive(Clone, Copy, Debug)]
pub struct RenderInput<'a> {
    /// Requested instant in milliseconds; clamped to the timeline.
    pub time_ms: f64,
    pub timeline: &'a Timeline,
    /// Decoded images; image scene `i` draws `assets[i]`.
    pub assets: &'a [Asset],
    /// Whether the project has an audio track. Does not change pixels.
    pub has_audio: bool,
    pub text: &'a TextFields,
    pub style: &'a StyleConfig,
}

impl RenderInput<'_> {
    /// The same inputs at another instant.
    pub fn at(&self, time_ms: f64) -> Self {
        Self { time_ms, ..*self }
    }
}

/// Draw rectangle that scales `src` uniformly to fully cover `dst`, centered.
///
/// A degenerate source yields the destination rectangle.
pub fn fit_cover(src_w: f64, src_h: f64, dst_w: f64, dst_h: f64) -> Rect {
    if src_w <= 0.0 || src_h <= 0.0 {
        return Rect::new(0.0, 0.0, dst_w, dst_h);
    }
    let scale = (dst_w / src_w).max(dst_h / src_h);
    let (w, h) = (src_w * scale, src_h * scale);
    let x = (dst_w - w) / 2.0;
    let y = (dst_h - h) / 2.0;
    Rect::new(x, y, x + w, y + h)
}

/// Cover-fitted draw rectangle for `image`, scaled and panned by `motion`.
///
/// Pan fractions pick which part of the overflow stays visible, so the frame is always covered.
pub fn ken_burns_rect(image_w: u32, image_h: u32, frame: FrameSize, motion: MotionSample) -> Rect {
    let cover = fit_cover(f64::from(image_w), f64::from(image_h), frame.w(), frame.h());
    let w = cover.width() * motion.scale;
    let h = cover.height() * motion.scale;
    let x = -(w - frame.w()) * motion.pan_x;
    let y = -(h - frame.h()) * motion.pan_y;
    Rect::new(x, y, x + w, y + h)
}

/// Render one frame: the scene at `input.time_ms` followed by style post-processing.
///
/// Pure apart from writing `surface`: identical inputs give identical pixels.
pub fn render_frame(surface: &mut dyn DrawingSurface, input: &RenderInput<'_>) {
    render_scene(surface, input);
    apply_post(surface, input.style.style);
}

/// Render the scene at `input.time_ms` without post-processing.
pub fn render_scene(surface: &mut dyn DrawingSurface, input: &RenderInput<'_>) {
    let (scene, progress) = input.timeline.locate(input.time_ms);
    let frame = surface.size();

    surface.clear(Rgba8::BLACK);
    match scene.kind {
        SceneKind::Intro => draw_intro(surface, input, progress, frame),
        SceneKind::Image { asset_index } => {
            draw_image_scene(surface, input, asset_index, progress, frame)
        }
        SceneKind::Price => draw_price_card(surface, input, ramp(progress, FADE_IN_SPAN), frame),
        SceneKind::Outro => {
            draw_price_card(surface, input, 1.0, frame);
            surface.fill_rect(frame.rect(), Rgba8::BLACK.with_opacity(progress as f32));
        }
    }
}

fn draw_with_motion(
    surface: &mut dyn DrawingSurface,
    asset: &Asset,
    motion: MotionSample,
    frame: FrameSize,
) {
    let dst = ken_burns_rect(asset.width, asset.height, frame, motion);
    surface.draw_image(asset, dst, 1.0);
}

fn draw_intro(surface: &mut dyn DrawingSurface, input: &RenderInput<'_>, p: f64, frame: FrameSize) {
    if let Some(asset) = input.assets.first() {
        draw_with_motion(surface, asset, MotionPath::INTRO.at(p), frame);
    }
    surface.fill_rect(frame.rect(), INTRO_OVERLAY);

    let alpha = ramp(p, FADE_IN_SPAN) as f32;
    let base = frame.short_side();
    let x = frame.w() * 0.08;
    let wrap = frame.w() * TEXT_WRAP;

    // Wrapped titles grow upward from the title line; the subtitle never moves.
    let title_style = TextStyle::new((base * TITLE_SIZE) as f32, Rgba8::WHITE.with_opacity(alpha))
        .bold()
        .wrapped_at(wrap)
        .aligned(TextAlign::Left, TextAnchor::Bottom);
    surface.draw_text(
        input.text.product_name.trim(),
        Point::new(x, frame.h() * TITLE_LINE),
        &title_style,
    );

    let subtitle_style = TextStyle::new(
        (base * SUBTITLE_SIZE) as f32,
        Rgba8::new(255, 255, 255, 217).with_opacity(alpha),
    )
    .wrapped_at(wrap);
    surface.draw_text(
        input.text.tagline.trim(),
        Point::new(x, frame.h() * SUBTITLE_LINE),
        &subtitle_style,
    );
}

fn draw_image_scene(
    surface: &mut dyn DrawingSurface,
    input: &RenderInput<'_>,
    asset_index: usize,
    p: f64,
    frame: FrameSize,
) {
    let asset = input.assets.get(asset_index);
    if let Some(asset) = asset {
        draw_with_motion(surface, asset, motion_path(asset_index).at(p), frame);
    }

    let shade_top = frame.h() * 0.55;
    surface.fill_linear_gradient(
        Rect::new(0.0, shade_top, frame.w(), frame.h()),
        &LinearGradient {
            start: Point::new(0.0, shade_top),
            end: Point::new(0.0, frame.h()),
            stops: vec![
                GradientStop::new(0.0, Rgba8::TRANSPARENT),
                GradientStop::new(1.0, CAPTION_SHADE),
            ],
        },
    );

    let source_index = asset.map_or(asset_index, |a| a.source_index);
    if let Some(caption) = input.text.caption(source_index) {
        let style = TextStyle::new(
            (frame.short_side() * CAPTION_SIZE) as f32,
            Rgba8::WHITE,
        )
        .aligned(TextAlign::Left, TextAnchor::Bottom)
        .wrapped_at(frame.w() * TEXT_WRAP);
        surface.draw_text(
            caption,
            Point::new(frame.w() * 0.06, frame.h() * 0.9),
            &style,
        );
    }
}

fn draw_price_card(
    surface: &mut dyn DrawingSurface,
    input: &RenderInput<'_>,
    alpha: f64,
    frame: FrameSize,
) {
    surface.fill_linear_gradient(
        frame.rect(),
        &LinearGradient {
            start: Point::new(0.0, 0.0),
            end: Point::new(frame.w(), frame.h()),
            stops: vec![
                GradientStop::new(0.0, PRICE_BG_START),
                GradientStop::new(1.0, PRICE_BG_END),
            ],
        },
    );

    let alpha = alpha as f32;
    let base = frame.short_side();
    let cx = frame.w() / 2.0;

    let price_style = TextStyle::new((base * PRICE_SIZE) as f32, Rgba8::WHITE.with_opacity(alpha))
        .bold()
        .aligned(TextAlign::Center, TextAnchor::Middle)
        .wrapped_at(frame.w() * TEXT_WRAP);
    surface.draw_text(
        input.text.price.trim(),
        Point::new(cx, frame.h() * 0.42),
        &price_style,
    );

    let cta = input.text.call_to_action.trim();
    if cta.is_empty() {
        return;
    }
    let cta_px = base * CTA_SIZE;
    let cta_style = TextStyle::new(cta_px as f32, PILL_TEXT.with_opacity(alpha))
        .bold()
        .aligned(TextAlign::Center, TextAnchor::Middle);
    // Without fonts the pill keeps a width proportional to the label length.
    let label_w = surface
        .measure_text(cta, &cta_style)
        .map_or(cta.chars().count() as f64 * cta_px * 0.55, |m| m.width);

    let pill_h = cta_px * 2.2;
    let pill_w = label_w + cta_px * 2.4;
    let cy = frame.h() * 0.62;
    let pill = Rect::new(
        cx - pill_w / 2.0,
        cy - pill_h / 2.0,
        cx + pill_w / 2.0,
        cy + pill_h / 2.0,
    );
    surface.fill_rounded_rect(pill, pill_h / 2.0, Rgba8::WHITE.with_opacity(alpha));
    surface.draw_text(cta, Point::new(cx, cy), &cta_style);
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
