//! Font evidence and timing types shared by the gatherer and the audit

use serde::{Deserialize, Serialize};

/// The `(family, style, weight)` triple used to pair loaded fonts with rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontIdentity<'a> {
    pub family: &'a str,
    pub style: &'a str,
    pub weight: &'a str,
}

/// One `@font-face` block as declared in a stylesheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontFaceRule {
    pub family: String,
    pub style: String,
    pub weight: String,
    pub stretch: String,
    pub display: String,
    /// Absolute source URLs in declaration order (may be empty)
    #[serde(default, rename = "src")]
    pub sources: Vec<String>,
}

impl FontFaceRule {
    pub fn identity(&self) -> FontIdentity<'_> {
        FontIdentity {
            family: &self.family,
            style: &self.style,
            weight: &self.weight,
        }
    }
}

/// A font the browser reports with status `loaded`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedFont {
    pub family: String,
    pub style: String,
    pub weight: String,
    pub stretch: String,
    #[serde(default)]
    pub display: Option<String>,
}

impl LoadedFont {
    pub fn identity(&self) -> FontIdentity<'_> {
        FontIdentity {
            family: &self.family,
            style: &self.style,
            weight: &self.weight,
        }
    }
}

/// A loaded font merged with the source URLs of its declaring rule
///
/// Serialized with the field names of the `Fonts` artifact so gathered
/// output can be fed straight back into the audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFontRecord {
    pub family: String,
    pub style: String,
    pub weight: String,
    pub stretch: String,
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default, rename = "src")]
    pub sources: Vec<String>,
}

impl CanonicalFontRecord {
    /// Build a record for `font` with no known sources.
    pub fn unmatched(font: LoadedFont) -> Self {
        Self {
            family: font.family,
            style: font.style,
            weight: font.weight,
            stretch: font.stretch,
            display: font.display,
            sources: Vec::new(),
        }
    }

    pub fn identity(&self) -> FontIdentity<'_> {
        FontIdentity {
            family: &self.family,
            style: &self.style,
            weight: &self.weight,
        }
    }
}

/// Resource type of a network request, as named by the DevTools protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceType {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    TextTrack,
    #[serde(rename = "XHR")]
    Xhr,
    Fetch,
    EventSource,
    WebSocket,
    Manifest,
    #[serde(other)]
    Other,
}

/// A finished network request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    pub url: String,
    pub resource_type: ResourceType,
    /// Completion time in seconds on the trace clock
    pub end_time: f64,
}

impl NetworkRecord {
    pub fn end_time_ms(&self) -> f64 {
        self.end_time * 1000.0
    }
}

/// Key timestamps of the traced page load, in microseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceTimestamps {
    pub navigation_start: f64,
    #[serde(default)]
    pub first_contentful_paint: Option<f64>,
}

impl TraceTimestamps {
    pub fn navigation_start_ms(&self) -> f64 {
        self.navigation_start / 1000.0
    }

    pub fn first_contentful_paint_ms(&self) -> Option<f64> {
        self.first_contentful_paint.map(|us| us / 1000.0)
    }
}

/// Processed trace of the audited tab
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceOfTab {
    pub timestamps: TraceTimestamps,
}

/// Blocking time attributed to one font fetch
#[derive(Debug, Clone, PartialEq)]
pub struct WastedTimeEntry {
    pub url: String,
    pub wasted_time_ms: f64,
}

/// Per-fetch wasted time plus the total, in network record order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WastedTimeReport {
    pub entries: Vec<WastedTimeEntry>,
    pub total_wasted_ms: f64,
}
