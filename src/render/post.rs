use crate::foundation::core::{FrameSize, Point, Rect, Rgba8};
use crate::project::model::VisualStyle;
use crate::render::surface::{ColorGrade, DrawingSurface, GradientStop, RadialGradient};

/// Visible aspect ratio left between cinematic letterbox bars.
pub const LETTERBOX_ASPECT: f64 = 2.35;

pub const CINEMATIC_GRADE: ColorGrade = ColorGrade {
    contrast: 1.12,
    saturation: 1.08,
    brightness: 1.02,
};

pub const MODERN_GRADE: ColorGrade = ColorGrade {
    contrast: 1.06,
    saturation: 1.15,
    brightness: 1.04,
};

const VIGNETTE_EDGE: Rgba8 = Rgba8::new(0, 0, 0, 128);

/// Color grade for `style`, if it has one.
pub fn color_grade_for(style: VisualStyle) -> Option<ColorGrade> {
    match style {
        VisualStyle::Cinematic => Some(CINEMATIC_GRADE),
        VisualStyle::Modern => Some(MODERN_GRADE),
        VisualStyle::Minimal => None,
    }
}

/// Height of each letterbox bar: `max(0, (H - W / 2.35) / 2)`, rounded to whole pixels.
pub fn letterbox_bar_height(frame: FrameSize) -> f64 {
    ((frame.h() - frame.w() / LETTERBOX_ASPECT) / 2.0)
        .max(0.0)
        .round()
}

/// Vignette centered on the frame: clear within 30% of the short side, reaching ~50% black at
/// the corners.
pub fn vignette(frame: FrameSize) -> RadialGradient {
    RadialGradient {
        center: Point::new(frame.w() / 2.0, frame.h() / 2.0),
        inner_radius: frame.short_side() * 0.3,
        outer_radius: frame.w().hypot(frame.h()) / 2.0,
        stops: vec![
            GradientStop::new(0.0, Rgba8::TRANSPARENT),
            GradientStop::new(1.0, VIGNETTE_EDGE),
        ],
    }
}

/// Whole-frame post-processing for `style`. Minimal leaves the frame untouched.
pub fn apply_post(surface: &mut dyn DrawingSurface, style: VisualStyle) {
    let Some(grade) = color_grade_for(style) else {
        return;
    };
    let frame = surface.size();
    surface.apply_color_grade(grade);
    surface.fill_radial_gradient(frame.rect(), &vignette(frame));

    if style == VisualStyle::Cinematic {
        let bar = letterbox_bar_height(frame);
        if bar > 0.0 {
            surface.fill_rect(Rect::new(0.0, 0.0, frame.w(), bar), Rgba8::BLACK);
            surface.fill_rect(
                Rect::new(0.0, frame.h() - bar, frame.w(), frame.h()),
                Rgba8::BLACK,
            );
        }
    }
}
