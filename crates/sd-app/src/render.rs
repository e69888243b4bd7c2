//! Plain-text rendering of the dashboard

use sd_core::TimeSeriesPoint;
use sd_views::{abbreviate_number, format_change, DashboardView, PanelView};
use std::fmt::Write;

/// Most recent points printed per panel
const MAX_ROWS: usize = 6;

pub fn render_view(view: &DashboardView) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "== Sales dashboard [{}] ==", view.selection);
    let _ = write!(out, "Status: {}", view.status);
    if view.is_placeholder {
        out.push_str(" (showing previous selection)");
    }
    out.push('\n');
    if let Some(error) = &view.error {
        let _ = writeln!(out, "Error: {}", error);
    }

    if view.is_empty {
        out.push_str("\nNo data loaded yet.\n");
        return out;
    }

    let value = |v: Option<f64>| v.map(abbreviate_number).unwrap_or_else(|| "-".to_string());
    let _ = writeln!(
        out,
        "\nSales this month: {} (previous {}, change {})",
        value(view.kpi.current_value()),
        value(view.kpi.comparison_value()),
        format_change(view.kpi.change_percentage()),
    );

    if let Some(narrative) = view.narrative.as_ref().filter(|n| !n.narrative.is_empty()) {
        let _ = writeln!(out, "\n{}", narrative.narrative);
    }

    for panel in &view.panels {
        render_panel(&mut out, panel);
    }
    out
}

fn render_panel(out: &mut String, panel: &PanelView) {
    let _ = writeln!(out, "\n-- {} [{}] ({}) --", panel.title, panel.kind, panel.range);
    if panel.points.is_empty() {
        out.push_str("   no points in range\n");
        return;
    }

    let skipped = panel.points.len().saturating_sub(MAX_ROWS);
    if skipped > 0 {
        let _ = writeln!(out, "   ... {} earlier points", skipped);
    }
    for point in &panel.points[skipped..] {
        let _ = writeln!(out, "   {}", render_point(point));
    }
}

fn render_point(point: &TimeSeriesPoint) -> String {
    let cell = |v: Option<f64>| v.map(abbreviate_number).unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "{}  actual {:>8}  predicted {:>8}",
        point.date,
        cell(point.actual),
        cell(point.predicted)
    );
    if let (Some(lower), Some(upper)) = (point.lower_bound, point.upper_bound) {
        let _ = write!(line, "  [{} .. {}]", abbreviate_number(lower), abbreviate_number(upper));
    }
    line
}
