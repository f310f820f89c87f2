//! Running the view pipeline for one request and rendering it as text

use pencompat_core::{
    filter_rows, format_row, project, Dataset, DeviceKind, Diagnostics, FormatOptions,
    FormattedCell, FormattedRow, SearchError, Stats, ViewMode,
};
use serde::Serialize;
use std::fmt::Write as _;

use crate::source::Snapshot;

/// Parameters of one render pass
#[derive(Debug, Clone, Default)]
pub struct ViewRequest {
    pub view: ViewMode,
    pub query: String,
    pub options: FormatOptions,
}

/// Display-ready rows plus the counts for them
#[derive(Debug, Clone, Serialize)]
pub struct RenderedView {
    pub view: ViewMode,
    pub options: FormatOptions,
    pub rows: Vec<FormattedRow>,
    pub stats: Stats,
}

impl RenderedView {
    /// Copy payload: one line per row
    pub fn to_plain_text(&self) -> String {
        self.rows
            .iter()
            .map(FormattedRow::to_plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Terminal table with a summary line.
    ///
    /// One line per row, or with `one_per_line` a block per row listing
    /// each device on its own indented line.
    pub fn to_table(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            if self.options.one_per_line {
                for line in cell_lines(&row.tablets) {
                    let _ = writeln!(out, "  {}", line);
                }
                let _ = writeln!(out, "    <->");
                for line in cell_lines(&row.pens) {
                    let _ = writeln!(out, "  {}", line);
                }
                let _ = writeln!(out);
            } else {
                let _ = writeln!(out, "{}  <->  {}", cell_line(&row.tablets), cell_line(&row.pens));
            }
        }
        let s = &self.stats;
        let _ = writeln!(
            out,
            "{} rows, {}/{} tablets, {}/{} pens",
            s.visible_rows, s.visible_tablets, s.total_tablets, s.visible_pens, s.total_pens
        );
        out
    }
}

fn cell_lines(cell: &FormattedCell) -> Vec<String> {
    match cell {
        FormattedCell::Flat { items, .. } => items.clone(),
        FormattedCell::Grouped { groups } => groups
            .iter()
            .flat_map(|g| {
                std::iter::once(format!("{}:", g.label))
                    .chain(g.items.iter().map(|item| format!("  {}", item)))
            })
            .collect(),
    }
}

fn cell_line(cell: &FormattedCell) -> String {
    match cell {
        FormattedCell::Flat { items, .. } => items.join(", "),
        FormattedCell::Grouped { groups } => groups
            .iter()
            .map(|g| format!("{}: {}", g.label, g.items.join(", ")))
            .collect::<Vec<_>>()
            .join(" | "),
    }
}

/// Project, filter, format and count
pub fn render(dataset: &Dataset, request: &ViewRequest) -> Result<RenderedView, SearchError> {
    let rows = project(dataset, request.view);
    let visible = filter_rows(&rows, &request.query, dataset)?;
    let stats = Stats::compute(&visible, dataset);
    let rows = visible
        .iter()
        .map(|row| format_row(row, dataset, &request.options))
        .collect();

    Ok(RenderedView {
        view: request.view,
        options: request.options,
        rows,
        stats,
    })
}

/// Human-readable diagnostics report: per-source findings, then the
/// definition checks across all sources
pub fn diagnostics_report(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for report in &snapshot.reports {
        write_section(&mut out, &report.location, &report.diagnostics);
    }
    write_section(&mut out, "all sources", &snapshot.definitions);
    out
}

fn write_section(out: &mut String, title: &str, diag: &Diagnostics) {
    let _ = writeln!(out, "== {} ({} warnings)", title, diag.len());

    let missing_tablets = diag.missing_tablet_ids();
    if !missing_tablets.is_empty() {
        let _ = writeln!(out, "Missing tablet definitions:");
        for id in missing_tablets {
            let _ = writeln!(out, "  {}", id);
        }
    }

    let missing_pens = diag.missing_pen_ids();
    if !missing_pens.is_empty() {
        let _ = writeln!(out, "Missing pen definitions:");
        for (id, tablets) in missing_pens {
            let tablets: Vec<&str> = tablets.iter().map(String::as_str).collect();
            let _ = writeln!(out, "  {} (used with {})", id, tablets.join(", "));
        }
    }

    for kind in [DeviceKind::Tablet, DeviceKind::Pen] {
        let unknown = diag.unknown_families(kind);
        if !unknown.is_empty() {
            let _ = writeln!(out, "Unknown {} families: {}", kind, unknown.join(", "));
        }
        let unused = diag.unused(kind);
        if !unused.is_empty() {
            let _ = writeln!(out, "Unused {} definitions: {}", kind, unused.join(", "));
        }
    }

    let without_id = diag.without_id();
    if !without_id.is_empty() {
        let _ = writeln!(out, "Definitions without id: {}", without_id.join(", "));
    }
}
