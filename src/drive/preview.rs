use crate::drive::ticker::FrameTicker;
use crate::foundation::core::FrameSize;
use crate::foundation::error::CineforgeResult;
use crate::foundation::math::Fnv1a64;
use crate::render::frame::{RenderInput, render_frame};
use crate::render::surface::DrawingSurface;

/// Fingerprint of everything that shapes preview output apart from time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PreviewKey(pub u64);

impl PreviewKey {
    pub fn of(input: &RenderInput<'_>, size: FrameSize) -> Self {
        let mut h = Fnv1a64::new_default();
        h.write_u64(input.timeline.total_duration_ms());
        h.write_u64(input.assets.len() as u64);
        for a in input.assets {
            h.write_u64(a.id.0);
        }
        h.write_u8(u8::from(input.has_audio));

        let t = input.text;
        h.write_str(&t.product_name);
        h.write_str(&t.tagline);
        h.write_u64(t.captions.len() as u64);
        for c in &t.captions {
            h.write_str(c);
        }
        h.write_str(&t.call_to_action);
        h.write_str(&t.price);

        h.write_str(input.style.aspect_ratio.label());
        h.write_str(input.style.style.name());
        h.write_u64(u64::from(size.width));
        h.write_u64(u64::from(size.height));
        Self(h.finish())
    }
}

#[derive(Debug)]
struct PreviewLoop {
    key: PreviewKey,
    origin_ms: f64,
    frames: u64,
}

/// Continuous, looping caller of the Frame Renderer.
///
/// The first callback after `start` records the origin; each callback renders
/// `(now - origin) mod total`. When the inputs' [`PreviewKey`] changes the loop is discarded and
/// a fresh one begins at the next callback's time.
#[derive(Debug, Default)]
pub struct PreviewDriver {
    running: bool,
    current: Option<PreviewLoop>,
    restarts: u64,
}

impl PreviewDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the driver. Any previous loop is discarded.
    pub fn start(&mut self) {
        self.running = true;
        self.current = None;
    }

    /// Disarm the driver; later callbacks render nothing.
    pub fn stop(&mut self) {
        self.running = false;
        self.current = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Loops discarded because inputs changed.
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    /// Frames rendered by the current loop.
    pub fn frames_in_loop(&self) -> u64 {
        self.current.as_ref().map_or(0, |l| l.frames)
    }

    /// Host per-frame callback. Returns the rendered timeline time, or `None` when stopped.
    pub fn on_frame(
        &mut self,
        now_ms: f64,
        surface: &mut dyn DrawingSurface,
        input: &RenderInput<'_>,
    ) -> Option<f64> {
        if !self.running {
            return None;
        }

        let key = PreviewKey::of(input, surface.size());
        if let Some(l) = self.current.as_ref()
            && l.key != key
        {
            tracing::debug!(frames = l.frames, "preview inputs changed; restarting loop");
            self.restarts += 1;
            self.current = None;
        }
        let state = self.current.get_or_insert(PreviewLoop {
            key,
            origin_ms: now_ms,
            frames: 0,
        });

        let total = input.timeline.total_duration_ms().max(1) as f64;
        let elapsed = (now_ms - state.origin_ms).rem_euclid(total);
        render_frame(surface, &input.at(elapsed));
        state.frames += 1;
        Some(elapsed)
    }

    /// Drive the loop from `ticker` for `duration_ms` of host time, calling `on_rendered` after
    /// each frame with the rendered timeline time. Returns the number of frames rendered.
    pub fn run_for(
        &mut self,
        ticker: &mut dyn FrameTicker,
        surface: &mut dyn DrawingSurface,
        input: &RenderInput<'_>,
        duration_ms: f64,
        mut on_rendered: impl FnMut(f64, &mut dyn DrawingSurface) -> CineforgeResult<()>,
    ) -> CineforgeResult<u64> {
        if !self.running {
            self.start();
        }
        let mut frames = 0u64;
        let mut first: Option<f64> = None;
        loop {
            let now = ticker.next_frame();
            let began = *first.get_or_insert(now);
            if now - began >= duration_ms {
                break;
            }
            let Some(t) = self.on_frame(now, surface, input) else {
                break;
            };
            frames += 1;
            on_rendered(t, surface)?;
        }
        Ok(frames)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/drive/preview.rs"]
mod tests;
