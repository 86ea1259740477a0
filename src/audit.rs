//! The `webfonts` audit: unsafe font filtering, wasted time and the result
//!
//! Wasted time for a font fetch is measured from navigation start to the
//! moment the fetch completed. It is not clipped to first contentful paint,
//! and values are passed through unclamped: a fetch that appears to finish
//! before navigation start (trace clock skew) yields a negative entry.

use std::collections::HashSet;

use futures::future::BoxFuture;
use log::debug;
use serde::Serialize;

use crate::format::format_milliseconds;
use crate::model::{
    CanonicalFontRecord, NetworkRecord, ResourceType, TraceOfTab, TraceTimestamps, WastedTimeEntry,
    WastedTimeReport,
};
use crate::{AuditConfig, Result};

/// Whether `record` lacks a mitigating `font-display` value.
pub fn is_unsafe(record: &CanonicalFontRecord, allowed_displays: &[String]) -> bool {
    match record.display.as_deref() {
        None | Some("") => true,
        Some(display) => !allowed_displays.iter().any(|d| d == display),
    }
}

/// Keep the records whose display is missing or not in `allowed_displays`.
pub fn filter_unsafe<'a>(
    records: &'a [CanonicalFontRecord],
    allowed_displays: &[String],
) -> Vec<&'a CanonicalFontRecord> {
    records
        .iter()
        .filter(|r| is_unsafe(r, allowed_displays))
        .collect()
}

/// Match font network records against the sources of unsafe fonts and
/// measure each match from navigation start.
pub fn compute_wasted_time(
    unsafe_fonts: &[&CanonicalFontRecord],
    network_records: &[NetworkRecord],
    timestamps: &TraceTimestamps,
) -> WastedTimeReport {
    let unsafe_sources: HashSet<&str> = unsafe_fonts
        .iter()
        .flat_map(|r| r.sources.iter().map(String::as_str))
        .collect();
    let navigation_start_ms = timestamps.navigation_start_ms();

    let entries: Vec<WastedTimeEntry> = network_records
        .iter()
        .filter(|r| r.resource_type == ResourceType::Font)
        .filter(|r| unsafe_sources.contains(r.url.as_str()))
        .map(|r| WastedTimeEntry {
            url: r.url.clone(),
            wasted_time_ms: r.end_time_ms() - navigation_start_ms,
        })
        .collect();
    let total_wasted_ms = entries.iter().map(|e| e.wasted_time_ms).sum();

    WastedTimeReport {
        entries,
        total_wasted_ms,
    }
}

/// Supplies the network and trace artifacts of the audited load
pub trait ArtifactProvider: Send + Sync {
    fn network_records(&self) -> BoxFuture<'_, Result<Vec<NetworkRecord>>>;
    fn trace_of_tab(&self) -> BoxFuture<'_, Result<TraceOfTab>>;
}

/// Artifacts that were computed ahead of time
#[derive(Debug, Clone, Default)]
pub struct StaticArtifacts {
    network_records: Vec<NetworkRecord>,
    trace: TraceOfTab,
}

impl StaticArtifacts {
    pub fn new(network_records: Vec<NetworkRecord>, trace: TraceOfTab) -> Self {
        Self {
            network_records,
            trace,
        }
    }
}

impl ArtifactProvider for StaticArtifacts {
    fn network_records(&self) -> BoxFuture<'_, Result<Vec<NetworkRecord>>> {
        Box::pin(async move { Ok(self.network_records.clone()) })
    }

    fn trace_of_tab(&self) -> BoxFuture<'_, Result<TraceOfTab>> {
        Box::pin(async move { Ok(self.trace) })
    }
}

/// Static description of the audit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditMeta {
    pub name: &'static str,
    pub description: &'static str,
    pub failure_description: &'static str,
    pub help_text: &'static str,
    pub required_artifacts: &'static [&'static str],
}

/// Column of the details table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableHeading {
    pub key: &'static str,
    pub item_type: &'static str,
    pub text: &'static str,
}

/// Row of the details table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WastedTimeItem {
    pub url: String,
    pub wasted_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDetails {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub headings: Vec<TableHeading>,
    pub items: Vec<WastedTimeItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedInfo {
    pub wasted_ms: f64,
}

/// Result handed to the report layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub score: f64,
    pub raw_value: f64,
    pub display_value: String,
    pub extended_info: ExtendedInfo,
    pub details: TableDetails,
}

/// Flags fonts without a mitigating `font-display` and scores their cost
#[derive(Debug, Clone, Default)]
pub struct WebFontsAudit {
    config: AuditConfig,
}

impl WebFontsAudit {
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    pub fn meta() -> AuditMeta {
        AuditMeta {
            name: "webfonts",
            description: "uses font-display",
            failure_description: "Your fonts are blocking FCP!",
            help_text: "Use font-display: optional, swap or fallback so text stays visible while web fonts load.",
            required_artifacts: &["traces", "Fonts"],
        }
    }

    /// Run the audit over gathered fonts.
    ///
    /// Network records and trace timestamps are requested concurrently; a
    /// failure of either provider fails the audit.
    pub async fn audit<A>(&self, fonts: &[CanonicalFontRecord], artifacts: &A) -> Result<AuditResult>
    where
        A: ArtifactProvider + ?Sized,
    {
        self.config.validate()?;

        let unsafe_fonts = filter_unsafe(fonts, &self.config.allowed_font_displays);
        let (trace, network_records) =
            futures::try_join!(artifacts.trace_of_tab(), artifacts.network_records())?;

        let report = compute_wasted_time(&unsafe_fonts, &network_records, &trace.timestamps);
        debug!(
            "{} of {} fonts lack font-display, {} fetches matched, {:.1}ms wasted",
            unsafe_fonts.len(),
            fonts.len(),
            report.entries.len(),
            report.total_wasted_ms
        );

        Ok(self.build_result(&report))
    }

    fn build_result(&self, report: &WastedTimeReport) -> AuditResult {
        let granularity = self.config.display_granularity_ms;
        let items = report
            .entries
            .iter()
            .map(|e| WastedTimeItem {
                url: e.url.clone(),
                wasted_time: format_milliseconds(e.wasted_time_ms, granularity),
            })
            .collect();

        AuditResult {
            score: self.config.score_curve.score_for_wasted_ms(report.total_wasted_ms),
            raw_value: report.total_wasted_ms,
            display_value: format_milliseconds(report.total_wasted_ms, granularity),
            extended_info: ExtendedInfo {
                wasted_ms: report.total_wasted_ms,
            },
            details: TableDetails {
                kind: "table",
                headings: vec![
                    TableHeading {
                        key: "url",
                        item_type: "url",
                        text: "Font URL",
                    },
                    TableHeading {
                        key: "wastedTime",
                        item_type: "text",
                        text: "Time it took",
                    },
                ],
                items,
            },
        }
    }
}
