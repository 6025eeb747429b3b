use crate::foundation::math::lerp;

/// A linear pan/zoom path over one scene.
///
/// Pan values are fractions of the overflow between the scaled image and the frame: `0.0` shows
/// the left (top) edge, `1.0` the right (bottom) edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionPath {
    pub start_scale: f64,
    pub end_scale: f64,
    pub start_pan_x: f64,
    pub end_pan_x: f64,
    pub start_pan_y: f64,
    pub end_pan_y: f64,
}

/// Motion evaluated at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionSample {
    pub scale: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl MotionPath {
    /// Slow centered zoom used behind the intro title.
    pub const INTRO: Self = Self::new(1.04, 1.08, 0.5, 0.5, 0.5, 0.5);

    pub const fn new(
        start_scale: f64,
        end_scale: f64,
        start_pan_x: f64,
        end_pan_x: f64,
        start_pan_y: f64,
        end_pan_y: f64,
    ) -> Self {
        Self {
            start_scale,
            end_scale,
            start_pan_x,
            end_pan_x,
            start_pan_y,
            end_pan_y,
        }
    }

    /// Linear interpolation at `progress` (clamped to `[0, 1]`).
    pub fn at(&self, progress: f64) -> MotionSample {
        let t = progress.clamp(0.0, 1.0);
        MotionSample {
            scale: lerp(self.start_scale, self.end_scale, t),
            pan_x: lerp(self.start_pan_x, self.end_pan_x, t),
            pan_y: lerp(self.start_pan_y, self.end_pan_y, t),
        }
    }
}

/// Fixed Ken Burns presets, cycled by image ordinal.
pub const MOTION_PRESETS: [MotionPath; 6] = [
    // zoom in, pan right
    MotionPath::new(1.05, 1.18, 0.3, 0.7, 0.5, 0.5),
    // zoom out, pan left
    MotionPath::new(1.18, 1.05, 0.7, 0.3, 0.5, 0.5),
    // zoom in, pan up
    MotionPath::new(1.06, 1.16, 0.5, 0.5, 0.7, 0.3),
    // zoom out, pan down
    MotionPath::new(1.16, 1.06, 0.5, 0.5, 0.3, 0.7),
    // zoom in toward lower right
    MotionPath::new(1.04, 1.2, 0.35, 0.6, 0.35, 0.6),
    // held zoom, slow drift
    MotionPath::new(1.12, 1.12, 0.2, 0.8, 0.55, 0.45),
];

/// Motion for the image scene at ordinal `index`.
pub fn motion_path(index: usize) -> MotionPath {
    MOTION_PRESETS[index % MOTION_PRESETS.len()]
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/motion.rs"]
mod tests;
