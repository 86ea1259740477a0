//! Fonts the browser finished loading, read from `document.fonts`

use crate::css::unquote_family;
use crate::model::LoadedFont;
use crate::scripts::{PageScript, RawLoadedFont};
use crate::{PageEvaluator, Result};

/// Reads the live font registry once `document.fonts.ready` resolves.
///
/// The registry does not expose where a font came from, so the records carry
/// no source URLs; those are attached by merging with font-face rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadedFontExtractor;

impl LoadedFontExtractor {
    pub fn new() -> Self {
        LoadedFontExtractor
    }

    pub async fn extract<P>(&self, page: &P) -> Result<Vec<LoadedFont>>
    where
        P: PageEvaluator + ?Sized,
    {
        let script = PageScript::LoadedFonts;
        let raw = page.evaluate(&script).await?;
        let fonts: Vec<RawLoadedFont> = script.decode(&raw)?;
        Ok(fonts.into_iter().map(to_loaded_font).collect())
    }
}

fn to_loaded_font(raw: RawLoadedFont) -> LoadedFont {
    LoadedFont {
        family: unquote_family(&raw.family),
        style: raw.style,
        weight: raw.weight,
        stretch: raw.stretch,
        display: raw.display.filter(|d| !d.is_empty()),
    }
}
