//! Font-face rule extraction from the page's stylesheets
//!
//! Each stylesheet moves through `Direct -> Done` when its rules can be read,
//! or `Direct -> Reloading -> Done` when they are hidden by a cross-origin
//! restriction. A reload swaps the owner node for an anonymous-CORS clone and
//! reads the clone's rules once it has loaded. A sheet is reloaded at most
//! once per extraction; if the reload fails the sheet contributes no rules.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::{debug, warn};

use crate::css::normalize_rule;
use crate::model::FontFaceRule;
use crate::scripts::{PageScript, RawReload, RawStylesheet};
use crate::{AuditConfig, PageEvaluator, Result};

const LOG_TARGET: &str = "rfwebfonts::stylesheet";

type OnStylesheetHandler = Arc<dyn Fn(&StylesheetEvent) + Send + Sync>;

/// Lifecycle of a stylesheet during extraction
#[derive(Debug, Clone, PartialEq)]
pub enum StylesheetEvent {
    /// Rules were read directly
    Inspected {
        sheet_id: i64,
        href: Option<String>,
        rules: usize,
    },
    /// Rules were hidden; the owner node is being replaced by a CORS clone
    ReloadStarted { sheet_id: i64, href: Option<String> },
    /// The clone loaded and its rules were read
    Reloaded { sheet_id: i64, rules: usize },
    /// The clone failed to load or still hid its rules
    ReloadFailed { sheet_id: i64, href: Option<String> },
    /// Rules were hidden and the sheet has no owner node to reload
    Unreachable { sheet_id: i64, href: Option<String> },
}

impl fmt::Display for StylesheetEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let href = |h: &Option<String>| h.clone().unwrap_or_else(|| "<inline>".to_string());
        match self {
            StylesheetEvent::Inspected { sheet_id, href: h, rules } => {
                write!(f, "sheet {} ({}) inspected: {} font-face rules", sheet_id, href(h), rules)
            }
            StylesheetEvent::ReloadStarted { sheet_id, href: h } => {
                write!(f, "sheet {} ({}) hides its rules, reloading with CORS", sheet_id, href(h))
            }
            StylesheetEvent::Reloaded { sheet_id, rules } => {
                write!(f, "sheet {} reloaded: {} font-face rules", sheet_id, rules)
            }
            StylesheetEvent::ReloadFailed { sheet_id, href: h } => {
                write!(f, "sheet {} ({}) reload failed, rules dropped", sheet_id, href(h))
            }
            StylesheetEvent::Unreachable { sheet_id, href: h } => {
                write!(f, "sheet {} ({}) hides its rules and cannot be reloaded", sheet_id, href(h))
            }
        }
    }
}

#[derive(Debug)]
enum SheetState {
    Direct(RawStylesheet),
    Reloading { sheet_id: i64, base: Option<String>, href: Option<String> },
    Done(Vec<FontFaceRule>),
}

/// Collects `@font-face` rules from every stylesheet of a page
#[derive(Clone)]
pub struct FontFaceExtractor {
    reload_concurrency: usize,
    on_event: Option<OnStylesheetHandler>,
}

impl fmt::Debug for FontFaceExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontFaceExtractor")
            .field("reload_concurrency", &self.reload_concurrency)
            .field("on_event", &self.on_event.is_some())
            .finish()
    }
}

impl Default for FontFaceExtractor {
    fn default() -> Self {
        Self::new(&AuditConfig::default())
    }
}

impl FontFaceExtractor {
    pub fn new(config: &AuditConfig) -> Self {
        Self {
            reload_concurrency: config.reload_concurrency.max(1),
            on_event: None,
        }
    }

    /// Register a callback for stylesheet lifecycle events.
    pub fn on_stylesheet_event<F>(&mut self, cb: F)
    where
        F: Fn(&StylesheetEvent) + Send + Sync + 'static,
    {
        self.on_event = Some(Arc::new(cb));
    }

    /// Remove previously registered stylesheet callback if any
    pub fn clear_on_stylesheet_event(&mut self) {
        self.on_event = None;
    }

    fn emit(&self, event: StylesheetEvent) {
        match &event {
            StylesheetEvent::ReloadFailed { .. } | StylesheetEvent::Unreachable { .. } => {
                warn!(target: LOG_TARGET, "{}", event)
            }
            _ => debug!(target: LOG_TARGET, "{}", event),
        }
        if let Some(cb) = &self.on_event {
            cb(&event);
        }
    }

    /// Extract all font-face rules, in stylesheet order.
    ///
    /// Fails only when the stylesheet listing itself cannot be evaluated or
    /// decoded. Problems with individual cross-origin sheets are absorbed.
    pub async fn extract<P>(&self, page: &P) -> Result<Vec<FontFaceRule>>
    where
        P: PageEvaluator + ?Sized,
    {
        let listing = PageScript::StylesheetFontFaces;
        let raw = page.evaluate(&listing).await?;
        let sheets: Vec<RawStylesheet> = listing.decode(&raw)?;

        let mut reloaded = HashSet::new();
        let states: Vec<SheetState> = sheets
            .into_iter()
            .map(|sheet| self.inspect(SheetState::Direct(sheet), &mut reloaded))
            .collect();

        let finished: Vec<SheetState> = stream::iter(states)
            .map(|state| self.finish(page, state))
            .buffered(self.reload_concurrency)
            .collect()
            .await;

        Ok(finished
            .into_iter()
            .flat_map(|state| match state {
                SheetState::Done(rules) => rules,
                _ => Vec::new(),
            })
            .collect())
    }

    // Direct -> Done | Reloading
    fn inspect(&self, state: SheetState, reloaded: &mut HashSet<i64>) -> SheetState {
        let sheet = match state {
            SheetState::Direct(sheet) => sheet,
            other => return other,
        };
        let base = sheet.href.clone().or_else(|| sheet.base_url.clone());

        if sheet.accessible {
            let rules: Vec<FontFaceRule> = sheet
                .rules
                .iter()
                .map(|r| normalize_rule(r, base.as_deref()))
                .collect();
            self.emit(StylesheetEvent::Inspected {
                sheet_id: sheet.id,
                href: sheet.href.clone(),
                rules: rules.len(),
            });
            return SheetState::Done(rules);
        }

        // Negative ids mark sheets without an owner node in the page.
        if !sheet.has_owner_node || sheet.id < 0 || !reloaded.insert(sheet.id) {
            self.emit(StylesheetEvent::Unreachable {
                sheet_id: sheet.id,
                href: sheet.href,
            });
            return SheetState::Done(Vec::new());
        }

        SheetState::Reloading {
            sheet_id: sheet.id,
            base,
            href: sheet.href,
        }
    }

    // Reloading -> Done
    async fn finish<P>(&self, page: &P, state: SheetState) -> SheetState
    where
        P: PageEvaluator + ?Sized,
    {
        let (sheet_id, base, href) = match state {
            SheetState::Reloading { sheet_id, base, href } => (sheet_id, base, href),
            other => return other,
        };

        self.emit(StylesheetEvent::ReloadStarted {
            sheet_id,
            href: href.clone(),
        });

        let script = PageScript::ReloadStylesheet { sheet_id };
        let outcome = match page.evaluate(&script).await {
            Ok(raw) => script.decode::<RawReload>(&raw),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(reload) if reload.loaded => {
                let rules: Vec<FontFaceRule> = reload
                    .rules
                    .iter()
                    .map(|r| normalize_rule(r, base.as_deref()))
                    .collect();
                self.emit(StylesheetEvent::Reloaded {
                    sheet_id,
                    rules: rules.len(),
                });
                SheetState::Done(rules)
            }
            Ok(_) => {
                self.emit(StylesheetEvent::ReloadFailed { sheet_id, href });
                SheetState::Done(Vec::new())
            }
            Err(e) => {
                debug!(target: LOG_TARGET, "sheet {} reload error: {}", sheet_id, e);
                self.emit(StylesheetEvent::ReloadFailed { sheet_id, href });
                SheetState::Done(Vec::new())
            }
        }
    }
}
