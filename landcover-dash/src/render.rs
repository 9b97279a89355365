//! Rendu texte du tableau de bord

use std::collections::BTreeSet;
use std::fmt::Write as _;

use landcover::parser::boundary::BoundaryLayer;
use landcover::view::NamedSeries;
use landcover::{DashboardView, FeatureSummary, HierarchyGroup, Year};

use crate::report::{format_area, format_change};

const BAR_WIDTH: usize = 30;

/// Barre horizontale proportionnelle à `value / max`
fn bar(value: f64, max: f64) -> String {
    let len = if max > 0.0 {
        ((value / max) * BAR_WIDTH as f64).round() as usize
    } else {
        0
    };
    "#".repeat(len.min(BAR_WIDTH))
}

/// Tableau années x classes d'une série temporelle
pub fn render_series(series: &[NamedSeries]) -> String {
    let years: BTreeSet<Year> = series
        .iter()
        .flat_map(|s| s.points.keys().copied())
        .collect();

    let mut out = String::new();
    let _ = write!(out, "{:<32}", "");
    for year in &years {
        let _ = write!(out, "{:>12}", year);
    }
    out.push('\n');

    for s in series {
        let _ = write!(out, "{:<32}", truncate(&s.name, 31));
        for year in &years {
            match s.points.get(year) {
                Some(&area) => {
                    let _ = write!(out, "{:>12}", format_area(area));
                }
                None => {
                    let _ = write!(out, "{:>12}", "-");
                }
            }
        }
        out.push('\n');
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Tableau de bord complet
pub fn render_dashboard(view: &DashboardView) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== {} ===", view.source);
    let _ = writeln!(
        out,
        "Years {}-{}, {} rows, {} total",
        view.filter.year_min,
        view.filter.year_max,
        view.record_count,
        format_area(view.total_area)
    );
    let _ = writeln!(
        out,
        "Territories: {} of {} ({:.1}%)",
        view.territories.count, view.territories.total, view.territories.percent
    );

    if !view.metrics.is_empty() {
        let _ = writeln!(out, "\n--- METRICS ---");
        for m in &view.metrics {
            let _ = writeln!(
                out,
                "{:<32} {:>12} ({} since {})",
                truncate(&m.name, 31),
                format_area(m.final_area),
                format_change(m.delta),
                m.initial_year
            );
        }
    }

    if !view.time_series.is_empty() {
        let _ = writeln!(out, "\n--- TIME SERIES ---");
        out.push_str(&render_series(&view.time_series));
    }

    if !view.territory_ranking.is_empty() {
        let _ = writeln!(out, "\n--- TERRITORIES ---");
        let max = view.territory_ranking.first().map_or(0.0, |t| t.area);
        for t in &view.territory_ranking {
            let _ = writeln!(
                out,
                "{:<32} {:>12} {}",
                truncate(&t.name, 31),
                format_area(t.area),
                bar(t.area, max)
            );
        }
    }

    if !view.coverage_ranking.is_empty() {
        let _ = writeln!(out, "\n--- COVERAGES ---");
        let max = view.coverage_ranking.first().map_or(0.0, |c| c.area);
        for c in &view.coverage_ranking {
            let _ = writeln!(
                out,
                "{:<32} {:>12} {}",
                truncate(&c.name, 31),
                format_area(c.area),
                bar(c.area, max)
            );
        }
    }

    if !view.table.is_empty() {
        let _ = writeln!(out, "\n--- TABLE ---");
        for row in &view.table {
            let year = row.year.map_or_else(|| "-".to_string(), |y| y.to_string());
            let _ = writeln!(
                out,
                "{:<24} {:<28} {:>6} {:>12}",
                truncate(&row.territory_name, 23),
                truncate(&row.coverage_name, 27),
                year,
                format_area(row.area)
            );
        }
    }

    out
}

pub fn print_dashboard(view: &DashboardView) {
    print!("{}", render_dashboard(view));
}

fn render_group(out: &mut String, group: &HierarchyGroup, depth: usize) {
    let id = group.id.map(|id| format!(" [{}]", id)).unwrap_or_default();
    let _ = writeln!(
        out,
        "{}{} {} {}{}",
        "  ".repeat(depth),
        group.color,
        group.level,
        group.name,
        id
    );
    for item in &group.sub_items {
        render_group(out, item, depth + 1);
    }
}

/// Légende hiérarchique indentée
pub fn render_legend(legend: &[HierarchyGroup]) -> String {
    let mut out = String::new();
    for group in legend {
        render_group(&mut out, group, 0);
    }
    out
}

pub fn print_legend(legend: &[HierarchyGroup]) {
    print!("{}", render_legend(legend));
}

/// Popup d'une feature
pub fn render_feature(summary: &FeatureSummary) -> String {
    let mut out = String::new();
    let title = summary
        .name
        .as_deref()
        .or(summary.territory.as_deref())
        .unwrap_or("?");
    let _ = writeln!(
        out,
        "{} (id_area {})",
        title,
        summary.id_area.as_deref().unwrap_or("-")
    );
    for (column, value) in &summary.metadata {
        let _ = writeln!(out, "  {}: {}", column, value);
    }
    let _ = writeln!(out, "  Total: {}", format_area(summary.total_area));
    if let Some((first, last)) = summary.year_span {
        let _ = writeln!(out, "  Years: {}-{}", first, last);
    }
    for s in &summary.series {
        let _ = writeln!(out, "  {:<30} {:>12}", truncate(&s.name, 29), format_area(s.total));
    }
    out
}

pub fn print_features(summaries: &[FeatureSummary]) {
    println!("=== {} features ===", summaries.len());
    for summary in summaries {
        print!("{}", render_feature(summary));
    }
}

/// Emprise de la couche, pour le cadrage de la carte
pub fn print_layer_bounds(layer: &BoundaryLayer) {
    if let Some(bounds) = layer.bounds() {
        println!(
            "Bounds: [{:.4}, {:.4}] - [{:.4}, {:.4}]",
            bounds.min().x,
            bounds.min().y,
            bounds.max().x,
            bounds.max().y
        );
    }
}
