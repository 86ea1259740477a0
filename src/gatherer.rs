//! The fonts gatherer: concurrent extraction and identity merge

use log::debug;

use crate::font_faces::FontFaceExtractor;
use crate::loaded_fonts::LoadedFontExtractor;
use crate::model::{CanonicalFontRecord, FontFaceRule, LoadedFont};
use crate::{AuditConfig, PageEvaluator, Result};

/// Attach to each loaded font the sources of the first rule with the same
/// `(family, style, weight)`.
///
/// Output order follows `loaded`. Fonts without a matching rule keep empty
/// sources. The loaded font's own `display` wins; the rule's is used only
/// when the registry reported none.
pub fn merge(loaded: Vec<LoadedFont>, rules: &[FontFaceRule]) -> Vec<CanonicalFontRecord> {
    loaded
        .into_iter()
        .map(|font| {
            let matched = rules.iter().find(|rule| rule.identity() == font.identity());
            let mut record = CanonicalFontRecord::unmatched(font);
            if let Some(rule) = matched {
                record.sources = rule.sources.clone();
                if record.display.is_none() {
                    record.display = Some(rule.display.clone());
                }
            }
            record
        })
        .collect()
}

/// Runs both extractors against a page and merges their output
#[derive(Debug, Clone, Default)]
pub struct FontsGatherer {
    font_faces: FontFaceExtractor,
    loaded_fonts: LoadedFontExtractor,
}

impl FontsGatherer {
    pub fn new(config: &AuditConfig) -> Self {
        Self {
            font_faces: FontFaceExtractor::new(config),
            loaded_fonts: LoadedFontExtractor::new(),
        }
    }

    /// Use a pre-configured font-face extractor (e.g. with an event callback).
    pub fn with_font_face_extractor(mut self, extractor: FontFaceExtractor) -> Self {
        self.font_faces = extractor;
        self
    }

    /// Collect canonical font records from a loaded page.
    pub async fn after_pass<P>(&self, page: &P) -> Result<Vec<CanonicalFontRecord>>
    where
        P: PageEvaluator + ?Sized,
    {
        let (loaded, rules) = futures::try_join!(
            self.loaded_fonts.extract(page),
            self.font_faces.extract(page)
        )?;
        debug!(
            "gathered {} loaded fonts and {} font-face rules",
            loaded.len(),
            rules.len()
        );
        Ok(merge(loaded, &rules))
    }
}
