//! Display-boundary formatting and chart-series assembly. Numbers are
//! formatted exactly once, here; nothing downstream of this module ever
//! parses a formatted string back into a value.

use crate::types::{
    ChartSeries, DetailDisplayRow, DetailScope, PeriodDerived, PeriodDisplayRow, SummaryStats,
};
use crate::util::{format_currency, format_int, format_pct};
use std::fmt::Write;

const BAR_WIDTH: usize = 40;

/// Dash shown where a metric is disabled for this deployment.
const NOT_TRACKED: &str = "-";

/// Detail table, one row per rep, fixed column order:
/// targets, raw counts, derived counts, conversion, revenue.
pub fn detail_table(scope: &DetailScope) -> Vec<DetailDisplayRow> {
    scope
        .rows
        .iter()
        .map(|row| DetailDisplayRow {
            rep: row.rep.to_string(),
            revenue_target: format_currency(row.revenue_target),
            meeting_target: format_int(row.meeting_target),
            planned: format_int(row.counts.planned),
            scheduled: format_int(row.counts.scheduled),
            completed: format_int(row.counts.completed),
            unsuccessful: row
                .unsuccessful
                .map(format_int)
                .unwrap_or_else(|| NOT_TRACKED.to_string()),
            conversion: format_pct(row.conversion_rate),
            target_gap: format_int(row.target_gap),
            revenue: format_currency(row.revenue),
        })
        .collect()
}

/// Per-period consolidation table for the workbook source.
pub fn period_table(rows: &[PeriodDerived]) -> Vec<PeriodDisplayRow> {
    rows.iter()
        .map(|r| PeriodDisplayRow {
            period: r.period.clone(),
            planned: format_int(r.counts.planned),
            scheduled: format_int(r.counts.scheduled),
            completed: format_int(r.counts.completed),
            unsuccessful: format_int(r.unsuccessful),
            conversion: format_pct(r.conversion_rate),
        })
        .collect()
}

/// The summary figures shown as tiles and exported to JSON.
pub fn summary_stats(scope: &DetailScope) -> SummaryStats {
    let t = &scope.totals;
    SummaryStats {
        reps_in_scope: scope.rows.len(),
        total_planned: t.counts.planned,
        total_scheduled: t.counts.scheduled,
        total_completed: t.counts.completed,
        total_unsuccessful: t.unsuccessful,
        conversion_rate: t.conversion_rate,
        total_revenue: t.revenue,
        total_revenue_target: t.revenue_target,
        total_meeting_target: t.meeting_target,
        revenue_gap: t.revenue_target - t.revenue,
        meeting_gap: t.target_gap,
    }
}

/// Revenue by rep, one series.
pub fn revenue_series(scope: &DetailScope) -> ChartSeries {
    ChartSeries {
        metric: "Receita".to_string(),
        points: scope
            .rows
            .iter()
            .map(|r| (r.rep.to_string(), r.revenue))
            .collect(),
    }
}

/// Activity funnel by rep: planned, scheduled, completed as grouped
/// series over the same categories.
pub fn funnel_series(scope: &DetailScope) -> Vec<ChartSeries> {
    let series = |metric: &str, pick: fn(&crate::types::DerivedRow) -> u64| ChartSeries {
        metric: metric.to_string(),
        points: scope
            .rows
            .iter()
            .map(|r| (r.rep.to_string(), pick(r) as f64))
            .collect(),
    };
    vec![
        series("Previstas", |r| r.counts.planned),
        series("Agendadas", |r| r.counts.scheduled),
        series("Realizadas", |r| r.counts.completed),
    ]
}

/// Funnel over periods for the workbook view.
pub fn period_funnel_series(rows: &[PeriodDerived]) -> Vec<ChartSeries> {
    let series = |metric: &str, pick: fn(&PeriodDerived) -> u64| ChartSeries {
        metric: metric.to_string(),
        points: rows
            .iter()
            .map(|r| (r.period.clone(), pick(r) as f64))
            .collect(),
    };
    vec![
        series("Previstas", |r| r.counts.planned),
        series("Agendadas", |r| r.counts.scheduled),
        series("Realizadas", |r| r.counts.completed),
        series("Não Realizadas", |r| r.unsuccessful),
    ]
}

/// Render grouped series as horizontal console bars, scaled to the
/// largest value across all series so groups stay comparable.
pub fn render_bar_chart(title: &str, series: &[ChartSeries]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", title);
    let max = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(_, v)| *v))
        .fold(0.0_f64, f64::max);
    if max <= 0.0 || series.iter().all(|s| s.points.is_empty()) {
        let _ = writeln!(out, "(no data)");
        return out;
    }
    let label_width = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(c, _)| c.chars().count()))
        .max()
        .unwrap_or(0);
    let metric_width = series.iter().map(|s| s.metric.chars().count()).max().unwrap_or(0);
    let categories: Vec<&str> = series[0].points.iter().map(|(c, _)| c.as_str()).collect();
    for (i, category) in categories.iter().enumerate() {
        for s in series {
            let Some((_, value)) = s.points.get(i) else { continue };
            let filled = ((value / max) * BAR_WIDTH as f64).round() as usize;
            let _ = writeln!(
                out,
                "{:<label_width$}  {:<metric_width$}  {}{} {}",
                category,
                s.metric,
                "█".repeat(filled),
                "░".repeat(BAR_WIDTH - filled),
                crate::util::format_number(*value, 2),
            );
        }
        let _ = writeln!(out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActivityCounts, DerivedRow, RepId, ScopeTotals};

    fn scope_with_one_rep() -> DetailScope {
        let counts = ActivityCounts {
            planned: 1000,
            scheduled: 60,
            completed: 40,
            cancelled: 5,
            no_show: 15,
        };
        let row = DerivedRow {
            rep: RepId::parse("Ana").unwrap(),
            counts,
            revenue: 12345.678,
            revenue_target: 20000.0,
            meeting_target: 70,
            unsuccessful: Some(20),
            conversion_rate: 4.0,
            target_gap: 10,
        };
        DetailScope {
            rows: vec![row],
            totals: ScopeTotals {
                counts,
                revenue: 12345.678,
                revenue_target: 20000.0,
                meeting_target: 70,
                unsuccessful: Some(20),
                conversion_rate: 4.0,
                target_gap: 10,
            },
            has_outcomes: true,
        }
    }

    #[test]
    fn detail_rows_use_fixed_formats() {
        let table = detail_table(&scope_with_one_rep());
        let row = &table[0];
        assert_eq!(row.rep, "Ana");
        assert_eq!(row.revenue, "12,345.68");
        assert_eq!(row.revenue_target, "20,000.00");
        assert_eq!(row.planned, "1,000");
        assert_eq!(row.conversion, "4.0%");
        assert_eq!(row.unsuccessful, "20");
        assert_eq!(row.target_gap, "10");
    }

    #[test]
    fn disabled_unsuccessful_shows_a_dash() {
        let mut scope = scope_with_one_rep();
        scope.has_outcomes = false;
        scope.rows[0].unsuccessful = None;
        let table = detail_table(&scope);
        assert_eq!(table[0].unsuccessful, NOT_TRACKED);
    }

    #[test]
    fn summary_reflects_totals_not_rows() {
        let stats = summary_stats(&scope_with_one_rep());
        assert_eq!(stats.reps_in_scope, 1);
        assert_eq!(stats.total_planned, 1000);
        assert_eq!(stats.revenue_gap, 20000.0 - 12345.678);
        assert_eq!(stats.meeting_gap, 10);
    }

    #[test]
    fn revenue_series_keeps_numeric_values() {
        let series = revenue_series(&scope_with_one_rep());
        assert_eq!(series.metric, "Receita");
        assert_eq!(series.points, vec![("Ana".to_string(), 12345.678)]);
    }

    #[test]
    fn funnel_has_one_series_per_metric() {
        let series = funnel_series(&scope_with_one_rep());
        let metrics: Vec<&str> = series.iter().map(|s| s.metric.as_str()).collect();
        assert_eq!(metrics, vec!["Previstas", "Agendadas", "Realizadas"]);
        assert_eq!(series[0].points[0].1, 1000.0);
    }

    #[test]
    fn bar_chart_handles_empty_and_scales_to_max() {
        let empty = render_bar_chart(
            "Receita por SDR",
            &[ChartSeries {
                metric: "Receita".into(),
                points: vec![],
            }],
        );
        assert!(empty.contains("(no data)"));

        let chart = render_bar_chart(
            "Receita por SDR",
            &[ChartSeries {
                metric: "Receita".into(),
                points: vec![("Ana".into(), 100.0), ("Bruno".into(), 50.0)],
            }],
        );
        assert!(chart.contains("Ana"));
        assert!(chart.contains("Bruno"));
        // The max value fills the whole bar.
        assert!(chart.contains(&"█".repeat(BAR_WIDTH)));
    }
}
