use std::collections::HashMap;
use std::sync::Arc;

use crate::assets::decode::{Asset, AssetId};
use crate::assets::text::{FontSet, FontWeight, TextBrushRgba8, TextLayoutEngine};
use crate::foundation::core::{Affine, FrameSize, Point, Rect, Rgba8, Rgba8Premul};
use crate::foundation::error::{CineforgeError, CineforgeResult};
use crate::foundation::math::mul_div255_u8;
use crate::render::surface::{
    ColorGrade, DrawingSurface, FrameRGBA, LinearGradient, RadialGradient, TextAlign, TextAnchor,
    TextMetrics, TextStyle, sample_stops,
};

/// Decoded images kept as `vello_cpu` paints. Cleared wholesale when full.
const IMAGE_CACHE_CAPACITY: usize = 64;

struct CpuText {
    engine: TextLayoutEngine,
    regular: vello_cpu::peniko::FontData,
    bold: vello_cpu::peniko::FontData,
}

/// Software [`DrawingSurface`] powered by `vello_cpu`.
///
/// Vector draws (rects, images, glyphs) are batched into a render context. `vello_cpu` renders
/// into a fresh buffer, so a batch is rendered into a scratch pixmap and composited
/// premultiplied-over the committed pixmap before any pixel operation or readback.
pub struct CpuSurface {
    size: FrameSize,
    pixmap: vello_cpu::Pixmap,
    scratch: vello_cpu::Pixmap,
    ctx: vello_cpu::RenderContext,
    pending: bool,
    image_cache: HashMap<AssetId, vello_cpu::Image>,
    text: Option<CpuText>,
    warned_no_fonts: bool,
}

impl CpuSurface {
    /// Create a surface without fonts. Text draws are skipped.
    pub fn new(size: FrameSize) -> CineforgeResult<Self> {
        let w: u16 = size
            .width
            .try_into()
            .map_err(|_| CineforgeError::validation("surface width exceeds u16"))?;
        let h: u16 = size
            .height
            .try_into()
            .map_err(|_| CineforgeError::validation("surface height exceeds u16"))?;
        if w == 0 || h == 0 {
            return Err(CineforgeError::validation(
                "surface width/height must be non-zero",
            ));
        }

        Ok(Self {
            size,
            pixmap: vello_cpu::Pixmap::new(w, h),
            scratch: vello_cpu::Pixmap::new(w, h),
            ctx: vello_cpu::RenderContext::new(w, h),
            pending: false,
            image_cache: HashMap::new(),
            text: None,
            warned_no_fonts: false,
        })
    }

    /// Register `fonts` for text drawing.
    pub fn with_fonts(mut self, fonts: &FontSet) -> CineforgeResult<Self> {
        let engine = TextLayoutEngine::new(fonts)?;
        let font_data = |bytes: &Arc<Vec<u8>>| {
            vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(bytes.as_ref().clone()),
                0,
            )
        };
        self.text = Some(CpuText {
            engine,
            regular: font_data(fonts.bytes_for(FontWeight::Regular)),
            bold: font_data(fonts.bytes_for(FontWeight::Bold)),
        });
        Ok(self)
    }

    /// `true` when text can be drawn.
    pub fn has_fonts(&self) -> bool {
        self.text.is_some()
    }

    fn flush_pending(&mut self) {
        if !self.pending {
            return;
        }
        self.pending = false;
        self.ctx.flush();
        self.scratch.data_as_u8_slice_mut().fill(0);
        self.ctx.render_to_pixmap(&mut self.scratch);
        self.ctx.reset();
        premul_over_in_place(
            self.pixmap.data_as_u8_slice_mut(),
            self.scratch.data_as_u8_slice(),
        );
    }

    fn image_paint(&mut self, image: &Asset) -> Option<vello_cpu::Image> {
        if let Some(p) = self.image_cache.get(&image.id) {
            return Some(p.clone());
        }
        match rgba_premul_to_image(&image.rgba8_premul, image.width, image.height) {
            Ok(paint) => {
                if self.image_cache.len() >= IMAGE_CACHE_CAPACITY {
                    self.image_cache.clear();
                }
                self.image_cache.insert(image.id, paint.clone());
                Some(paint)
            }
            Err(e) => {
                tracing::warn!(source_index = image.source_index, error = %e, "image cannot be drawn");
                None
            }
        }
    }

    fn layout_text(
        &mut self,
        text: &str,
        style: &TextStyle,
    ) -> Option<parley::Layout<TextBrushRgba8>> {
        let Some(t) = self.text.as_mut() else {
            if !self.warned_no_fonts {
                self.warned_no_fonts = true;
                tracing::warn!("no fonts loaded; text is not drawn");
            }
            return None;
        };
        let brush = TextBrushRgba8 {
            r: style.color.r,
            g: style.color.g,
            b: style.color.b,
            a: style.color.a,
        };
        let max_width = style.max_width.map(|w| w.max(1.0) as f32);
        match t
            .engine
            .layout(text, style.weight, style.size_px, brush, max_width)
        {
            Ok(layout) => Some(layout),
            Err(e) => {
                tracing::warn!(error = %e, "text layout failed");
                None
            }
        }
    }

    fn fill_shape_color(&mut self, color: Rgba8, fill: impl FnOnce(&mut vello_cpu::RenderContext)) {
        if color.a == 0 {
            return;
        }
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
        fill(&mut self.ctx);
        self.pending = true;
    }

    /// Blend a per-pixel color over the committed pixmap inside `rect`.
    fn shade_rect(&mut self, rect: Rect, mut color_at: impl FnMut(Point) -> Rgba8) {
        self.flush_pending();
        let Some((x0, x1, y0, y1)) = pixel_span(rect, self.size) else {
            return;
        };
        let stride = self.size.width as usize * 4;
        let data = self.pixmap.data_as_u8_slice_mut();
        for y in y0..y1 {
            for x in x0..x1 {
                let c = color_at(Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5));
                if c.a == 0 {
                    continue;
                }
                let i = y as usize * stride + x as usize * 4;
                blend_px(&mut data[i..i + 4], c.premul());
            }
        }
    }
}

impl DrawingSurface for CpuSurface {
    fn size(&self) -> FrameSize {
        self.size
    }

    fn clear(&mut self, color: Rgba8) {
        self.ctx.reset();
        self.pending = false;
        let px = color.premul().to_array();
        for d in self.pixmap.data_as_u8_slice_mut().chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba8) {
        let r = rect_to_cpu(rect);
        self.fill_shape_color(color, |ctx| ctx.fill_rect(&r));
    }

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f64, color: Rgba8) {
        use vello_cpu::kurbo::Shape as _;
        let path = vello_cpu::kurbo::RoundedRect::new(
            rect.x0,
            rect.y0,
            rect.x1,
            rect.y1,
            radius.max(0.0),
        )
        .to_path(0.1);
        self.fill_shape_color(color, |ctx| ctx.fill_path(&path));
    }

    fn draw_image(&mut self, image: &Asset, dst: Rect, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        if opacity <= 0.0 || dst.width() <= 0.0 || dst.height() <= 0.0 {
            return;
        }
        let Some(paint) = self.image_paint(image) else {
            return;
        };

        let tr = Affine::translate((dst.x0, dst.y0))
            * Affine::scale_non_uniform(
                dst.width() / f64::from(image.width),
                dst.height() / f64::from(image.height),
            );
        self.ctx.set_transform(affine_to_cpu(tr));
        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint(paint);
        if opacity < 1.0 {
            self.ctx.push_opacity_layer(opacity);
        }
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(image.width),
            f64::from(image.height),
        ));
        if opacity < 1.0 {
            self.ctx.pop_layer();
        }
        self.pending = true;
    }

    fn fill_linear_gradient(&mut self, rect: Rect, gradient: &LinearGradient) {
        let d = gradient.end - gradient.start;
        let len2 = d.hypot2();
        self.shade_rect(rect, |p| {
            let t = if len2 <= f64::EPSILON {
                0.0
            } else {
                (p - gradient.start).dot(d) / len2
            };
            sample_stops(&gradient.stops, t as f32)
        });
    }

    fn fill_radial_gradient(&mut self, rect: Rect, gradient: &RadialGradient) {
        let span = gradient.outer_radius - gradient.inner_radius;
        self.shade_rect(rect, |p| {
            let dist = (p - gradient.center).hypot();
            let t = if span <= f64::EPSILON {
                if dist < gradient.inner_radius { 0.0 } else { 1.0 }
            } else {
                (dist - gradient.inner_radius) / span
            };
            sample_stops(&gradient.stops, t as f32)
        });
    }

    fn measure_text(&mut self, text: &str, style: &TextStyle) -> Option<TextMetrics> {
        let layout = self.layout_text(text, style)?;
        Some(TextMetrics {
            width: f64::from(layout.width()),
            height: f64::from(layout.height()),
        })
    }

    fn draw_text(&mut self, text: &str, at: Point, style: &TextStyle) {
        if text.trim().is_empty() || style.color.a == 0 {
            return;
        }
        let Some(layout) = self.layout_text(text, style) else {
            return;
        };
        let Some(font) = self.text.as_ref().map(|t| match style.weight {
            FontWeight::Regular => t.regular.clone(),
            FontWeight::Bold => t.bold.clone(),
        }) else {
            return;
        };

        let (w, h) = (f64::from(layout.width()), f64::from(layout.height()));
        let x = match style.align {
            TextAlign::Left => at.x,
            TextAlign::Center => at.x - w / 2.0,
        };
        let y = match style.anchor {
            TextAnchor::Top => at.y,
            TextAnchor::Middle => at.y - h / 2.0,
            TextAnchor::Bottom => at.y - h,
        };

        self.ctx.set_transform(affine_to_cpu(Affine::translate((x, y))));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                self.ctx
                    .glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        self.pending = true;
    }

    fn apply_color_grade(&mut self, grade: ColorGrade) {
        self.flush_pending();
        color_matrix_rgba8_premul_in_place(self.pixmap.data_as_u8_slice_mut(), grade.to_matrix());
    }

    fn read_frame(&mut self) -> FrameRGBA {
        self.flush_pending();
        FrameRGBA {
            width: self.size.width,
            height: self.size.height,
            data: self.pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        }
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

/// Whole pixels whose centers fall inside `rect`, clamped to the frame.
fn pixel_span(rect: Rect, size: FrameSize) -> Option<(u32, u32, u32, u32)> {
    let clamp = |v: f64, max: u32| -> u32 { (v - 0.5).ceil().clamp(0.0, f64::from(max)) as u32 };
    let x0 = clamp(rect.x0.min(rect.x1), size.width);
    let x1 = clamp(rect.x0.max(rect.x1), size.width);
    let y0 = clamp(rect.y0.min(rect.y1), size.height);
    let y1 = clamp(rect.y0.max(rect.y1), size.height);
    (x0 < x1 && y0 < y1).then_some((x0, x1, y0, y1))
}

fn rgba_premul_to_image(
    bytes_premul: &[u8],
    width: u32,
    height: u32,
) -> CineforgeResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(bytes_premul, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> CineforgeResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| CineforgeError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| CineforgeError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(CineforgeError::render("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect::<Vec<_>>();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

fn blend_px(d: &mut [u8], s: Rgba8Premul) {
    let inv = 255u16 - u16::from(s.a);
    d[0] = s.r.saturating_add(mul_div255_u8(u16::from(d[0]), inv));
    d[1] = s.g.saturating_add(mul_div255_u8(u16::from(d[1]), inv));
    d[2] = s.b.saturating_add(mul_div255_u8(u16::from(d[2]), inv));
    d[3] = s.a.saturating_add(mul_div255_u8(u16::from(d[3]), inv));
}

fn premul_over_in_place(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        if s[3] == 0 {
            continue;
        }
        blend_px(
            d,
            Rgba8Premul {
                r: s[0],
                g: s[1],
                b: s[2],
                a: s[3],
            },
        );
    }
}

fn color_matrix_rgba8_premul_in_place(data: &mut [u8], m: [f32; 20]) {
    for d in data.chunks_exact_mut(4) {
        let pa = f32::from(d[3]) / 255.0;
        if pa <= 0.0 {
            continue;
        }
        let r = f32::from(d[0]) / 255.0 / pa;
        let g = f32::from(d[1]) / 255.0 / pa;
        let b = f32::from(d[2]) / 255.0 / pa;
        let a = pa;

        let out_r = (m[0] * r + m[1] * g + m[2] * b + m[3] * a + m[4]).clamp(0.0, 1.0);
        let out_g = (m[5] * r + m[6] * g + m[7] * b + m[8] * a + m[9]).clamp(0.0, 1.0);
        let out_b = (m[10] * r + m[11] * g + m[12] * b + m[13] * a + m[14]).clamp(0.0, 1.0);
        let out_a = (m[15] * r + m[16] * g + m[17] * b + m[18] * a + m[19]).clamp(0.0, 1.0);

        d[0] = (out_r * out_a * 255.0).round().clamp(0.0, 255.0) as u8;
        d[1] = (out_g * out_a * 255.0).round().clamp(0.0, 255.0) as u8;
        d[2] = (out_b * out_a * 255.0).round().clamp(0.0, 255.0) as u8;
        d[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
