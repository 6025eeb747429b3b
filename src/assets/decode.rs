use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::error::{CineforgeError, CineforgeResult};
use crate::foundation::math::Fnv1a64;
use crate::project::model::MediaSource;

/// Largest accepted image side in pixels.
pub const MAX_IMAGE_DIM: u32 = 16_384;

/// Content hash identifying a decoded asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u64);

impl AssetId {
    /// Hash encoded bytes together with their position in the source list.
    pub fn for_source(source: &MediaSource, source_index: usize) -> Self {
        let mut h = Fnv1a64::new_default();
        h.write_u64(source_index as u64);
        h.write_str(&source.mime);
        h.write_bytes(&source.bytes);
        Self(h.finish())
    }
}

/// A decoded, renderable image.
#[derive(Clone, Debug)]
pub struct Asset {
    /// Content hash, stable across decodes of the same source.
    pub id: AssetId,
    /// Position of the source in the project's image list.
    pub source_index: usize,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 pixels, row-major.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Decode one image source into an [`Asset`].
///
/// SVG sources are rasterized; everything else goes through `image`.
pub fn decode_asset(source: &MediaSource, source_index: usize) -> CineforgeResult<Asset> {
    let (width, height, rgba8_premul) = if source.is_svg() {
        let tree = crate::assets::svg::parse_svg(&source.bytes)?;
        let (w, h) = crate::assets::svg::intrinsic_raster_size(&tree)?;
        (w, h, crate::assets::svg::rasterize_svg_to_premul_rgba8(&tree, w, h)?)
    } else {
        decode_raster(&source.bytes)?
    };

    Ok(Asset {
        id: AssetId::for_source(source, source_index),
        source_index,
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

fn decode_raster(bytes: &[u8]) -> CineforgeResult<(u32, u32, Vec<u8>)> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let (width, height) = (dyn_img.width(), dyn_img.height());
    check_dimensions(width, height)?;

    let mut rgba8 = dyn_img.to_rgba8().into_raw();
    premultiply_rgba8_in_place(&mut rgba8);
    Ok((width, height, rgba8))
}

pub(crate) fn check_dimensions(width: u32, height: u32) -> CineforgeResult<()> {
    if width == 0 || height == 0 {
        return Err(CineforgeError::decode("image has zero width or height"));
    }
    if width > MAX_IMAGE_DIM || height > MAX_IMAGE_DIM {
        return Err(CineforgeError::decode(format!(
            "image too large: {width}x{height} (max {MAX_IMAGE_DIM}x{MAX_IMAGE_DIM})"
        )));
    }
    Ok(())
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 255 {
            continue;
        }
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((u16::from(px[0]) * a + 127) / 255) as u8;
        px[1] = ((u16::from(px[1]) * a + 127) / 255) as u8;
        px[2] = ((u16::from(px[2]) * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
