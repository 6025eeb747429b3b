/// Duration of the intro scene.
pub const INTRO_MS: u64 = 1500;
/// Duration of each image scene.
pub const PER_IMAGE_MS: u64 = 3200;
/// Duration of the price card scene.
pub const PRICE_MS: u64 = 1800;
/// Duration of the fade-out scene.
pub const OUTRO_MS: u64 = 800;

/// What a scene draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SceneKind {
    /// Title card over the first image.
    Intro,
    /// One product image with Ken Burns motion and its caption.
    Image {
        /// Ordinal among image scenes; indexes the decoded asset list.
        asset_index: usize,
    },
    /// Price and call-to-action card.
    Price,
    /// Fade to black.
    Outro,
}

/// A time-bounded segment `[start_ms, end_ms)` of the video.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Scene {
    pub kind: SceneKind,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl Scene {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    /// Fraction of the scene elapsed at `t_ms`, in `[0, 1]`.
    pub fn progress_at(&self, t_ms: f64) -> f64 {
        let span = self.duration_ms() as f64;
        if span <= 0.0 {
            return 0.0;
        }
        ((t_ms - self.start_ms as f64) / span).clamp(0.0, 1.0)
    }
}

/// Total video length for `asset_count` images.
pub fn total_duration_ms(asset_count: usize) -> u64 {
    if asset_count == 0 {
        return INTRO_MS;
    }
    INTRO_MS + asset_count as u64 * PER_IMAGE_MS + PRICE_MS + OUTRO_MS
}

/// Ordered, gap-free scene list covering `[0, total_duration_ms)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timeline {
    scenes: Vec<Scene>,
    total_duration_ms: u64,
}

impl Timeline {
    /// Build the timeline for `asset_count` images.
    ///
    /// With no images the timeline is a single intro scene.
    pub fn build(asset_count: usize) -> Self {
        let mut scenes = Vec::with_capacity(asset_count + 3);
        let mut cursor = 0u64;
        let mut push = |kind: SceneKind, len: u64| {
            scenes.push(Scene {
                kind,
                start_ms: cursor,
                end_ms: cursor + len,
            });
            cursor += len;
        };

        push(SceneKind::Intro, INTRO_MS);
        if asset_count > 0 {
            for asset_index in 0..asset_count {
                push(SceneKind::Image { asset_index }, PER_IMAGE_MS);
            }
            push(SceneKind::Price, PRICE_MS);
            push(SceneKind::Outro, OUTRO_MS);
        }

        let total = total_duration_ms(asset_count);
        debug_assert_eq!(scenes.last().map(|s| s.end_ms), Some(total));
        Self {
            scenes,
            total_duration_ms: total,
        }
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms
    }

    /// Number of image scenes.
    pub fn image_count(&self) -> usize {
        self.scenes
            .iter()
            .filter(|s| matches!(s.kind, SceneKind::Image { .. }))
            .count()
    }

    /// Clamp a render time to `[0, total_duration_ms - 1]`. NaN maps to 0.
    pub fn clamp_time(&self, t_ms: f64) -> f64 {
        let last = self.total_duration_ms.saturating_sub(1) as f64;
        if t_ms.is_nan() {
            return 0.0;
        }
        t_ms.clamp(0.0, last)
    }

    /// Scene containing `t_ms` (after clamping) and the local progress within it.
    pub fn locate(&self, t_ms: f64) -> (&Scene, f64) {
        let t = self.clamp_time(t_ms);
        let idx = self
            .scenes
            .partition_point(|s| (s.end_ms as f64) <= t)
            .min(self.scenes.len() - 1);
        let scene = &self.scenes[idx];
        (scene, scene.progress_at(t))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/builder.rs"]
mod tests;
