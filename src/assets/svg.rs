use anyhow::Context as _;

use crate::foundation::error::{CineforgeError, CineforgeResult};

/// Longest side, in pixels, an SVG is rasterized at.
pub const MAX_SVG_RASTER_DIM: u32 = 4096;

pub(crate) fn parse_svg(bytes: &[u8]) -> CineforgeResult<usvg::Tree> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;
    Ok(tree)
}

/// Raster size for an SVG at its intrinsic size, scaled down to fit [`MAX_SVG_RASTER_DIM`].
pub(crate) fn intrinsic_raster_size(tree: &usvg::Tree) -> CineforgeResult<(u32, u32)> {
    let size = tree.size();
    let (w, h) = (f64::from(size.width()), f64::from(size.height()));
    if !w.is_finite() || !h.is_finite() || w <= 0.0 || h <= 0.0 {
        return Err(CineforgeError::decode("svg has invalid width/height"));
    }

    let long = w.max(h);
    let scale = if long > f64::from(MAX_SVG_RASTER_DIM) {
        f64::from(MAX_SVG_RASTER_DIM) / long
    } else {
        1.0
    };
    let px = |v: f64| (((v * scale) - 1e-6).ceil() as u32).clamp(1, MAX_SVG_RASTER_DIM);
    Ok((px(w), px(h)))
}

pub(crate) fn rasterize_svg_to_premul_rgba8(
    tree: &usvg::Tree,
    width: u32,
    height: u32,
) -> CineforgeResult<Vec<u8>> {
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| CineforgeError::decode("failed to allocate svg pixmap"))?;

    let sx = (width as f32) / tree.size().width();
    let sy = (height as f32) / tree.size().height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);

    resvg::render(tree, xform, &mut pixmap.as_mut());
    Ok(pixmap.data().to_vec())
}
