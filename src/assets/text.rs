use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::error::{CineforgeError, CineforgeResult};

/// Font weights the renderer asks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontWeight {
    /// Body text.
    #[default]
    Regular,
    /// Headline text. Falls back to the regular face when no bold face is loaded.
    Bold,
}

/// Font faces available to a drawing surface.
#[derive(Clone, Debug)]
pub struct FontSet {
    regular: Arc<Vec<u8>>,
    bold: Option<Arc<Vec<u8>>>,
}

impl FontSet {
    /// Use `regular` (TTF/OTF bytes) for every weight.
    pub fn new(regular: Vec<u8>) -> CineforgeResult<Self> {
        if regular.is_empty() {
            return Err(CineforgeError::validation("font bytes are empty"));
        }
        Ok(Self {
            regular: Arc::new(regular),
            bold: None,
        })
    }

    /// Add a dedicated bold face.
    pub fn with_bold(mut self, bold: Vec<u8>) -> CineforgeResult<Self> {
        if bold.is_empty() {
            return Err(CineforgeError::validation("bold font bytes are empty"));
        }
        self.bold = Some(Arc::new(bold));
        Ok(self)
    }

    /// Read font files from disk.
    pub fn from_paths(regular: &Path, bold: Option<&Path>) -> CineforgeResult<Self> {
        let bytes = std::fs::read(regular)
            .with_context(|| format!("read font '{}'", regular.display()))?;
        let mut set = Self::new(bytes)?;
        if let Some(bold) = bold {
            let bytes = std::fs::read(bold)
                .with_context(|| format!("read font '{}'", bold.display()))?;
            set = set.with_bold(bytes)?;
        }
        Ok(set)
    }

    /// Bytes of the face used for `weight`.
    pub fn bytes_for(&self, weight: FontWeight) -> &Arc<Vec<u8>> {
        match (weight, &self.bold) {
            (FontWeight::Bold, Some(bold)) => bold,
            _ => &self.regular,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// Stateful helper that shapes text with Parley against a registered [`FontSet`].
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    regular_family: String,
    bold_family: String,
}

impl TextLayoutEngine {
    /// Register the faces of `fonts` once and keep their family names.
    pub(crate) fn new(fonts: &FontSet) -> CineforgeResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let regular_family = register(&mut font_ctx, fonts.bytes_for(FontWeight::Regular))?;
        let bold_family = match fonts.bold.as_ref() {
            Some(bold) => register(&mut font_ctx, bold)?,
            None => regular_family.clone(),
        };
        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            regular_family,
            bold_family,
        })
    }

    /// Shape and lay out `text`, wrapping at `max_width_px` when given.
    pub(crate) fn layout(
        &mut self,
        text: &str,
        weight: FontWeight,
        size_px: f32,
        brush: TextBrushRgba8,
        max_width_px: Option<f32>,
    ) -> CineforgeResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(CineforgeError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let (family, parley_weight) = match weight {
            FontWeight::Regular => (
                self.regular_family.clone(),
                parley::style::FontWeight::NORMAL,
            ),
            FontWeight::Bold => (self.bold_family.clone(), parley::style::FontWeight::BOLD),
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family)),
        ));
        builder.push_default(parley::style::StyleProperty::FontWeight(parley_weight));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        if let Some(w) = max_width_px {
            layout.break_all_lines(Some(w));
            layout.align(
                Some(w),
                parley::Alignment::Start,
                parley::AlignmentOptions::default(),
            );
        } else {
            layout.break_all_lines(None);
        }

        Ok(layout)
    }
}

fn register(font_ctx: &mut parley::FontContext, bytes: &Arc<Vec<u8>>) -> CineforgeResult<String> {
    let families = font_ctx
        .collection
        .register_fonts(parley::fontique::Blob::from(bytes.as_ref().clone()), None);
    let family_id = families
        .first()
        .map(|(id, _)| *id)
        .ok_or_else(|| CineforgeError::validation("no font families registered from font bytes"))?;

    Ok(font_ctx
        .collection
        .family_name(family_id)
        .ok_or_else(|| CineforgeError::validation("registered font family has no name"))?
        .to_string())
}
