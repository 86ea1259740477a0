//! RFox Web Font Audit
//!
//! Finds web fonts that block rendering because their `@font-face` rule has
//! no mitigating `font-display` strategy, and estimates how much time they
//! cost the page.
//!
//! The crate is split the same way a page audit runs:
//!
//! - **Gathering**: two payloads are evaluated concurrently in the live page
//!   (`FontFaceExtractor` reads stylesheet `@font-face` rules, reloading
//!   cross-origin sheets with anonymous CORS when their rules are hidden;
//!   `LoadedFontExtractor` reads `document.fonts`). The results are merged
//!   by `(family, style, weight)` into canonical font records.
//! - **Auditing**: fonts without `optional`, `swap` or `fallback` display are
//!   matched against font network requests, and the time from navigation
//!   start until each fetch completed is summed and scored.
//!
//! # Example
//!
//! ```no_run
//! use rfwebfonts::{AuditConfig, FontsGatherer, StaticArtifacts, WebFontsAudit};
//!
//! # async fn run(page: &dyn rfwebfonts::PageEvaluator) -> rfwebfonts::Result<()> {
//! let config = AuditConfig::default();
//! let fonts = FontsGatherer::new(&config).after_pass(page).await?;
//!
//! let artifacts = StaticArtifacts::new(Vec::new(), Default::default());
//! let result = WebFontsAudit::new(config).audit(&fonts, &artifacts).await?;
//! println!("{} ({})", result.score, result.display_value);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use futures::future::BoxFuture;

pub mod error;
pub use error::{Error, Result};

pub mod audit;
pub mod css;
pub mod font_faces;
pub mod format;
pub mod gatherer;
pub mod loaded_fonts;
pub mod model;
pub mod score;
pub mod scripts;

// Async facade over a synchronous engine running on a worker thread
pub mod async_api;

#[cfg(feature = "cdp")]
pub mod cdp;

pub use audit::{
    compute_wasted_time, filter_unsafe, ArtifactProvider, AuditMeta, AuditResult, StaticArtifacts,
    WebFontsAudit,
};
pub use font_faces::{FontFaceExtractor, StylesheetEvent};
pub use gatherer::{merge, FontsGatherer};
pub use loaded_fonts::LoadedFontExtractor;
pub use model::{
    CanonicalFontRecord, FontFaceRule, LoadedFont, NetworkRecord, ResourceType, TraceOfTab,
    TraceTimestamps, WastedTimeEntry, WastedTimeReport,
};
pub use score::ScoreCurve;
pub use scripts::PageScript;

/// Display strategies that keep text visible while a font downloads.
pub const DEFAULT_ALLOWED_FONT_DISPLAYS: [&str; 3] = ["optional", "swap", "fallback"];

/// Configuration for gathering and auditing
///
/// # Examples
///
/// ```
/// let cfg = rfwebfonts::AuditConfig::default();
/// assert!(cfg.allowed_font_displays.iter().any(|d| d == "swap"));
/// ```
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// `font-display` values that count as mitigating
    pub allowed_font_displays: Vec<String>,
    /// Maximum number of cross-origin stylesheet reloads in flight at once
    pub reload_concurrency: usize,
    /// Curve mapping total wasted milliseconds to a score
    pub score_curve: ScoreCurve,
    /// Rounding granularity for the formatted wasted times
    pub display_granularity_ms: f64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            allowed_font_displays: DEFAULT_ALLOWED_FONT_DISPLAYS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            reload_concurrency: 4,
            score_curve: ScoreCurve::default(),
            display_granularity_ms: 1.0,
        }
    }
}

impl AuditConfig {
    /// Reject settings that would make the audit meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.reload_concurrency == 0 {
            return Err(Error::ConfigError("reload_concurrency must be at least 1".into()));
        }
        if self.display_granularity_ms.is_nan() || self.display_granularity_ms <= 0.0 {
            return Err(Error::ConfigError(format!(
                "display_granularity_ms must be positive, got {}",
                self.display_granularity_ms
            )));
        }
        self.score_curve.validate()
    }
}

/// Configuration for a browser backend
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// User agent string to send with requests
    pub user_agent: String,
    /// Viewport dimensions
    pub viewport: Viewport,
    /// Timeout for page loads in milliseconds
    pub timeout_ms: u64,
    /// Custom HTTP headers
    pub headers: HashMap<String, String>,
    /// How long to let the page settle after navigation, in milliseconds
    pub settle_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/115.0 RFOX/0.3"
                .to_string(),
            viewport: Viewport::default(),
            timeout_ms: 30000,
            headers: HashMap::new(),
            settle_ms: 500,
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Channel that evaluates a payload inside the audited page
///
/// Implementations return the JSON text the payload resolved to. A payload
/// that throws must surface as `Error::ScriptError`.
pub trait PageEvaluator: Send + Sync {
    fn evaluate<'a>(&'a self, script: &'a PageScript) -> BoxFuture<'a, Result<String>>;
}

impl<T: PageEvaluator + ?Sized> PageEvaluator for &T {
    fn evaluate<'a>(&'a self, script: &'a PageScript) -> BoxFuture<'a, Result<String>> {
        (**self).evaluate(script)
    }
}

/// Synchronous browser backend driven by the async facade
pub trait Engine {
    /// Create a new engine instance with the given configuration
    fn new(config: EngineConfig) -> Result<Self>
    where
        Self: Sized;

    /// Load a URL and wait for the page to be ready
    fn load_url(&mut self, url: &str) -> Result<()>;

    /// Evaluate a script in the page's global context, awaiting a returned
    /// promise, and return its string result
    fn evaluate_script_in_page(&mut self, script: &str) -> Result<String>;

    /// Close the engine and clean up resources
    fn close(self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuditConfig::default();
        assert_eq!(config.allowed_font_displays, vec!["optional", "swap", "fallback"]);
        assert_eq!(config.reload_concurrency, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let zero = AuditConfig {
            reload_concurrency: 0,
            ..Default::default()
        };
        assert!(matches!(zero.validate(), Err(Error::ConfigError(_))));

        let nan = AuditConfig {
            display_granularity_ms: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_viewport() {
        let viewport = Viewport::default();
        assert_eq!(viewport.width, 1280);
        assert_eq!(viewport.height, 720);
        assert_eq!(EngineConfig::default().settle_ms, 500);
    }
}
