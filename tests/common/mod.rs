//! In-memory page used by the integration tests
#![allow(dead_code)]

use std::sync::Mutex;

use futures::future::BoxFuture;
use rfwebfonts::{Error, PageEvaluator, PageScript, Result};
use serde_json::{json, Value};

/// What happens when a cross-origin sheet's owner node is swapped for a clone
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReloadOutcome {
    /// The clone fires `load` and exposes its rules
    Loads,
    /// The clone fires `error`
    Errors,
    /// The evaluation channel rejects the payload
    Rejects,
}

#[derive(Debug, Clone)]
pub struct FakeSheet {
    pub id: i64,
    pub href: Option<String>,
    pub has_owner_node: bool,
    pub cross_origin: bool,
    pub reload: ReloadOutcome,
    pub rules: Vec<Value>,
}

impl FakeSheet {
    pub fn inline(id: i64, rules: Vec<Value>) -> Self {
        Self {
            id,
            href: None,
            has_owner_node: true,
            cross_origin: false,
            reload: ReloadOutcome::Loads,
            rules,
        }
    }

    pub fn linked(id: i64, href: &str, rules: Vec<Value>) -> Self {
        Self {
            href: Some(href.to_string()),
            ..Self::inline(id, rules)
        }
    }

    pub fn cross_origin(id: i64, href: &str, rules: Vec<Value>, reload: ReloadOutcome) -> Self {
        Self {
            cross_origin: true,
            reload,
            ..Self::linked(id, href, rules)
        }
    }
}

/// Raw `CSSFontFaceRule.style` values; pass "" for unset descriptors.
pub fn raw_rule(family: &str, weight: &str, display: &str, src: &str) -> Value {
    json!({
        "family": family,
        "style": "",
        "weight": weight,
        "stretch": "",
        "display": display,
        "src": src,
    })
}

pub fn loaded_font(family: &str, weight: &str, display: &str) -> Value {
    json!({
        "display": display,
        "family": family,
        "stretch": "normal",
        "style": "normal",
        "weight": weight,
    })
}

#[derive(Default)]
struct Dom {
    sheets: Vec<FakeSheet>,
    reloads: Vec<i64>,
    calls: Vec<&'static str>,
}

pub struct FakePage {
    base_url: String,
    loaded_fonts: Vec<Value>,
    fail_listing: bool,
    dom: Mutex<Dom>,
}

impl FakePage {
    pub fn new(sheets: Vec<FakeSheet>, loaded_fonts: Vec<Value>) -> Self {
        Self {
            base_url: "https://site.example/index.html".to_string(),
            loaded_fonts,
            fail_listing: false,
            dom: Mutex::new(Dom {
                sheets,
                ..Default::default()
            }),
        }
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn reloads(&self) -> Vec<i64> {
        self.dom.lock().unwrap().reloads.clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.dom.lock().unwrap().calls.clone()
    }

    fn list(&self, dom: &Dom) -> Value {
        let sheets: Vec<Value> = dom
            .sheets
            .iter()
            .map(|s| {
                json!({
                    "id": s.id,
                    "href": s.href,
                    "baseUrl": self.base_url,
                    "hasOwnerNode": s.has_owner_node,
                    "accessible": !s.cross_origin,
                    "rules": if s.cross_origin { Vec::new() } else { s.rules.clone() },
                })
            })
            .collect();
        Value::Array(sheets)
    }

    fn reload(dom: &mut Dom, sheet_id: i64) -> Result<Value> {
        dom.reloads.push(sheet_id);
        let Some(sheet) = dom.sheets.iter_mut().find(|s| s.id == sheet_id) else {
            return Ok(json!({ "id": sheet_id, "loaded": false, "rules": [] }));
        };
        match sheet.reload {
            ReloadOutcome::Loads => {
                sheet.cross_origin = false;
                Ok(json!({ "id": sheet_id, "loaded": true, "rules": sheet.rules }))
            }
            ReloadOutcome::Errors => Ok(json!({ "id": sheet_id, "loaded": false, "rules": [] })),
            ReloadOutcome::Rejects => Err(Error::ScriptError("TypeError: parentNode is null".into())),
        }
    }
}

impl PageEvaluator for FakePage {
    fn evaluate<'a>(&'a self, script: &'a PageScript) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            // The load event (or the font registry) settles on a later tick.
            tokio::task::yield_now().await;

            let mut dom = self.dom.lock().unwrap();
            dom.calls.push(script.name());
            let value = match script {
                PageScript::LoadedFonts => Value::Array(self.loaded_fonts.clone()),
                PageScript::StylesheetFontFaces => {
                    if self.fail_listing {
                        return Err(Error::ScriptError("Execution context was destroyed".into()));
                    }
                    self.list(&dom)
                }
                PageScript::ReloadStylesheet { sheet_id } => Self::reload(&mut dom, *sheet_id)?,
            };
            Ok(value.to_string())
        })
    }
}
