//! In-page payloads sent over the page-evaluation channel
//!
//! Each payload is a self-contained expression that resolves to a JSON
//! string. Nothing is captured from the Rust side except the sheet id of a
//! reload, which is substituted into a fixed template. Results are decoded
//! into the wire types below and checked before they reach the extractors.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Attribute used to give stylesheet owner nodes a stable id across reloads.
pub const SHEET_ID_ATTR: &str = "data-rf-sheet-id";

// Shared helpers: tagging owner nodes and reading font-face rules of a sheet.
// `readRules` returns null when the sheet's rules cannot be inspected.
const PRELUDE: &str = r#"
    const ATTR = 'data-rf-sheet-id';
    function sheetId(node) {
        if (!node || !node.getAttribute) return null;
        let id = node.getAttribute(ATTR);
        if (id === null) {
            window.__rfSheetSeq = (window.__rfSheetSeq || 0) + 1;
            id = String(window.__rfSheetSeq);
            node.setAttribute(ATTR, id);
        }
        return Number(id);
    }
    function readRules(sheet) {
        let cssRules;
        try {
            cssRules = sheet.cssRules;
        } catch (err) {
            return null;
        }
        if (!cssRules) return null;
        const rules = [];
        for (const rule of Array.from(cssRules)) {
            if (typeof CSSFontFaceRule !== 'undefined' && rule instanceof CSSFontFaceRule) {
                const s = rule.style;
                rules.push({
                    family: s.getPropertyValue('font-family'),
                    style: s.getPropertyValue('font-style'),
                    weight: s.getPropertyValue('font-weight'),
                    stretch: s.getPropertyValue('font-stretch'),
                    display: s.getPropertyValue('font-display'),
                    src: s.getPropertyValue('src'),
                });
            }
        }
        return rules;
    }
"#;

const STYLESHEET_FONT_FACES_TEMPLATE: &str = r#"(function() {
    {{PRELUDE}}
    const out = [];
    let orphan = 0;
    for (const sheet of Array.from(document.styleSheets)) {
        const node = sheet.ownerNode;
        let id = sheetId(node);
        if (id === null) {
            orphan += 1;
            id = -orphan;
        }
        const rules = readRules(sheet);
        out.push({
            id: id,
            href: sheet.href,
            baseUrl: document.baseURI,
            hasOwnerNode: !!(node && node.parentNode),
            accessible: rules !== null,
            rules: rules || [],
        });
    }
    return JSON.stringify(out);
})()"#;

const RELOAD_STYLESHEET_TEMPLATE: &str = r#"(async function() {
    {{PRELUDE}}
    const id = {{SHEET_ID}};
    const oldNode = document.querySelector('[' + ATTR + '="' + id + '"]');
    if (!oldNode || !oldNode.parentNode) {
        return JSON.stringify({ id: id, loaded: false, rules: [] });
    }
    const newNode = oldNode.cloneNode(true);
    const loaded = await new Promise(function(resolve) {
        newNode.addEventListener('load', function() { resolve(true); }, { once: true });
        newNode.addEventListener('error', function() { resolve(false); }, { once: true });
        newNode.crossOrigin = 'anonymous';
        oldNode.parentNode.insertBefore(newNode, oldNode);
        oldNode.remove();
    });
    const rules = loaded && newNode.sheet ? readRules(newNode.sheet) : null;
    return JSON.stringify({ id: id, loaded: rules !== null, rules: rules || [] });
})()"#;

const LOADED_FONTS_SCRIPT: &str = r#"(async function() {
    await document.fonts.ready;
    const fonts = Array.from(document.fonts)
        .filter(function(f) { return f.status === 'loaded'; })
        .map(function(f) {
            return {
                display: f.display,
                family: f.family,
                stretch: f.stretch,
                style: f.style,
                weight: f.weight,
            };
        });
    return JSON.stringify(fonts);
})()"#;

/// A payload that can be evaluated in the audited page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageScript {
    /// Wait for `document.fonts.ready` and list fonts with status `loaded`
    LoadedFonts,
    /// List every stylesheet with its font-face rules, or mark it inaccessible
    StylesheetFontFaces,
    /// Replace one stylesheet's owner node with an anonymous-CORS clone and
    /// read the clone's font-face rules once it loads
    ReloadStylesheet { sheet_id: i64 },
}

impl PageScript {
    pub fn name(&self) -> &'static str {
        match self {
            PageScript::LoadedFonts => "LoadedFonts",
            PageScript::StylesheetFontFaces => "StylesheetFontFaces",
            PageScript::ReloadStylesheet { .. } => "ReloadStylesheet",
        }
    }

    /// Render the JavaScript source for this payload.
    pub fn source(&self) -> String {
        match self {
            PageScript::LoadedFonts => LOADED_FONTS_SCRIPT.to_string(),
            PageScript::StylesheetFontFaces => {
                STYLESHEET_FONT_FACES_TEMPLATE.replace("{{PRELUDE}}", PRELUDE)
            }
            PageScript::ReloadStylesheet { sheet_id } => RELOAD_STYLESHEET_TEMPLATE
                .replace("{{PRELUDE}}", PRELUDE)
                .replace("{{SHEET_ID}}", &sheet_id.to_string()),
        }
    }

    /// Decode the JSON text returned by this payload.
    pub(crate) fn decode<T: DeserializeOwned>(&self, raw: &str) -> Result<T> {
        serde_json::from_str(raw).map_err(|e| Error::InvalidPayload {
            script: self.name(),
            reason: e.to_string(),
        })
    }
}

/// Raw `CSSFontFaceRule.style` values; unset descriptors are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFontFaceRule {
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub stretch: String,
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub src: String,
}

/// One entry of `document.styleSheets` as reported by `StylesheetFontFaces`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStylesheet {
    pub id: i64,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    pub has_owner_node: bool,
    pub accessible: bool,
    #[serde(default)]
    pub rules: Vec<RawFontFaceRule>,
}

/// Outcome of a `ReloadStylesheet` payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawReload {
    pub id: i64,
    pub loaded: bool,
    #[serde(default)]
    pub rules: Vec<RawFontFaceRule>,
}

/// One `FontFace` from `document.fonts`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawLoadedFont {
    #[serde(default)]
    pub display: Option<String>,
    pub family: String,
    pub stretch: String,
    pub style: String,
    pub weight: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_source_embeds_sheet_id() {
        let src = PageScript::ReloadStylesheet { sheet_id: 7 }.source();
        assert!(src.contains("const id = 7;"));
        assert!(src.contains("crossOrigin = 'anonymous'"));
        assert!(!src.contains("{{"));
    }

    #[test]
    fn stylesheet_source_includes_prelude() {
        let src = PageScript::StylesheetFontFaces.source();
        assert!(src.contains("function readRules"));
        assert!(src.contains(SHEET_ID_ATTR));
        assert!(!src.contains("{{PRELUDE}}"));
    }

    #[test]
    fn decode_rejects_wrong_shape() {
        let err = PageScript::LoadedFonts
            .decode::<Vec<RawLoadedFont>>(r#"{"not":"a list"}"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPayload { script: "LoadedFonts", .. }));
    }

    #[test]
    fn decode_stylesheet_listing() {
        let raw = r#"[{"id":1,"href":null,"baseUrl":"https://x/","hasOwnerNode":true,
            "accessible":true,"rules":[{"family":"\"Roboto\"","style":"","weight":"400",
            "stretch":"","display":"","src":"url(\"/r.woff2\")"}]}]"#;
        let sheets: Vec<RawStylesheet> = PageScript::StylesheetFontFaces.decode(raw).unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].rules[0].weight, "400");
        assert_eq!(sheets[0].href, None);
    }
}
