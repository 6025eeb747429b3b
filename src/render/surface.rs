use crate::assets::decode::Asset;
use crate::assets::text::FontWeight;
use crate::foundation::core::{FrameSize, Point, Rect, Rgba8};

/// A rendered frame as RGBA8 pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Pixel at `(x, y)` as `[r, g, b, a]`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        self.data.get(i..i + 4).map(|p| [p[0], p[1], p[2], p[3]])
    }

    /// Pixel data with straight alpha, as image files expect.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        if !self.premultiplied {
            return self.data.clone();
        }
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 {
                px[..3].fill(0);
                continue;
            }
            if a < 255 {
                for c in &mut px[..3] {
                    *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
                }
            }
        }
        out
    }
}

/// Horizontal placement of text relative to its anchor point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextAlign {
    /// Anchor is the left edge.
    #[default]
    Left,
    /// Anchor is the horizontal center.
    Center,
}

/// Vertical placement of text relative to its anchor point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextAnchor {
    /// Anchor is the top of the text block.
    #[default]
    Top,
    /// Anchor is the vertical middle.
    Middle,
    /// Anchor is the bottom of the text block.
    Bottom,
}

/// How a text draw looks and where it sits relative to its anchor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub size_px: f32,
    pub weight: FontWeight,
    pub color: Rgba8,
    pub align: TextAlign,
    pub anchor: TextAnchor,
    /// Wrap width; `None` keeps the text on one line.
    pub max_width: Option<f64>,
}

impl TextStyle {
    /// Regular, top-left anchored, unwrapped text.
    pub fn new(size_px: f32, color: Rgba8) -> Self {
        Self {
            size_px,
            weight: FontWeight::Regular,
            color,
            align: TextAlign::Left,
            anchor: TextAnchor::Top,
            max_width: None,
        }
    }

    pub fn bold(mut self) -> Self {
        self.weight = FontWeight::Bold;
        self
    }

    pub fn aligned(mut self, align: TextAlign, anchor: TextAnchor) -> Self {
        self.align = align;
        self.anchor = anchor;
        self
    }

    pub fn wrapped_at(mut self, max_width: f64) -> Self {
        self.max_width = Some(max_width);
        self
    }
}

/// Laid-out size of a text block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
}

/// One color stop; `offset` is in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Rgba8,
}

impl GradientStop {
    pub const fn new(offset: f32, color: Rgba8) -> Self {
        Self { offset, color }
    }
}

/// Linear gradient along `start -> end`, padded with the end colors outside it.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearGradient {
    pub start: Point,
    pub end: Point,
    pub stops: Vec<GradientStop>,
}

/// Radial gradient between two concentric circles.
#[derive(Clone, Debug, PartialEq)]
pub struct RadialGradient {
    pub center: Point,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub stops: Vec<GradientStop>,
}

/// Sample a stop list at `t`, padding with the first and last colors.
pub fn sample_stops(stops: &[GradientStop], t: f32) -> Rgba8 {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return Rgba8::TRANSPARENT;
    };
    if t <= first.offset {
        return first.color;
    }
    if t >= last.offset {
        return last.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            if span <= f32::EPSILON {
                return b.color;
            }
            return a.color.lerp(b.color, (t - a.offset) / span);
        }
    }
    last.color
}

/// Contrast, saturation and brightness factors; `1.0` leaves a channel unchanged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorGrade {
    pub contrast: f32,
    pub saturation: f32,
    pub brightness: f32,
}

impl ColorGrade {
    pub const IDENTITY: Self = Self {
        contrast: 1.0,
        saturation: 1.0,
        brightness: 1.0,
    };

    /// Row-major 4x5 matrix over normalized straight-alpha RGBA: contrast, then saturation, then
    /// brightness. Alpha passes through.
    pub fn to_matrix(self) -> [f32; 20] {
        // 3x4 affine blocks: [m00 m01 m02 off0; ...]
        type Affine3 = [[f32; 4]; 3];

        let c = self.contrast;
        let contrast: Affine3 = [
            [c, 0.0, 0.0, 0.5 * (1.0 - c)],
            [0.0, c, 0.0, 0.5 * (1.0 - c)],
            [0.0, 0.0, c, 0.5 * (1.0 - c)],
        ];

        let s = self.saturation;
        let saturation: Affine3 = [
            [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s, 0.0],
            [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s, 0.0],
            [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s, 0.0],
        ];

        let b = self.brightness;
        let brightness: Affine3 = [
            [b, 0.0, 0.0, 0.0],
            [0.0, b, 0.0, 0.0],
            [0.0, 0.0, b, 0.0],
        ];

        // `after(before(x))`
        fn then(before: &Affine3, after: &Affine3) -> Affine3 {
            let mut out = [[0.0f32; 4]; 3];
            for (r, row) in out.iter_mut().enumerate() {
                for (col, cell) in row.iter_mut().enumerate().take(3) {
                    *cell = (0..3).map(|k| after[r][k] * before[k][col]).sum();
                }
                row[3] = (0..3).map(|k| after[r][k] * before[k][3]).sum::<f32>() + after[r][3];
            }
            out
        }

        let m = then(&then(&contrast, &saturation), &brightness);
        [
            m[0][0], m[0][1], m[0][2], 0.0, m[0][3], //
            m[1][0], m[1][1], m[1][2], 0.0, m[1][3], //
            m[2][0], m[2][1], m[2][2], 0.0, m[2][3], //
            0.0, 0.0, 0.0, 1.0, 0.0,
        ]
    }
}

/// Drawing capability the Frame Renderer paints through.
///
/// Coordinates are frame pixels with the origin at the top left. Colors are straight alpha.
/// Implementations must be deterministic: the same call sequence yields the same pixels.
pub trait DrawingSurface {
    /// Pixel dimensions.
    fn size(&self) -> FrameSize;

    /// Replace every pixel with `color`.
    fn clear(&mut self, color: Rgba8);

    /// Fill `rect` with a solid color, blended over existing content.
    fn fill_rect(&mut self, rect: Rect, color: Rgba8);

    /// Fill `rect` with corners rounded by `radius`.
    fn fill_rounded_rect(&mut self, rect: Rect, radius: f64, color: Rgba8);

    /// Draw `image` stretched into `dst` at `opacity`. Parts of `dst` outside the frame are
    /// cropped.
    fn draw_image(&mut self, image: &Asset, dst: Rect, opacity: f32);

    /// Fill `rect` with a linear gradient.
    fn fill_linear_gradient(&mut self, rect: Rect, gradient: &LinearGradient);

    /// Fill `rect` with a radial gradient.
    fn fill_radial_gradient(&mut self, rect: Rect, gradient: &RadialGradient);

    /// Size `text` would occupy, or `None` when the surface cannot draw text.
    fn measure_text(&mut self, text: &str, style: &TextStyle) -> Option<TextMetrics>;

    /// Draw `text` anchored at `at`. A no-op when the surface has no fonts.
    fn draw_text(&mut self, text: &str, at: Point, style: &TextStyle);

    /// Apply a color grade to every pixel drawn so far.
    fn apply_color_grade(&mut self, grade: ColorGrade);

    /// Read back the current contents.
    fn read_frame(&mut self) -> FrameRGBA;
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
