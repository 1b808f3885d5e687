//! Filter-then-group stage. A record survives only if its period is in
//! the period filter AND its rep is in the rep filter; survivors are
//! grouped by rep (feeds) or by period (workbook) with per-column sums.
//! Empty filter sets simply produce empty groupings.

use crate::types::{
    ActivityCounts, ActivityTable, Period, PeriodSheet, RepId, SaleRecord, TargetRecord,
    TargetSums,
};
use std::collections::{BTreeMap, HashSet};

pub fn aggregate_activity_by_rep(
    table: &ActivityTable,
    periods: &HashSet<Period>,
    reps: &HashSet<RepId>,
) -> BTreeMap<RepId, ActivityCounts> {
    let mut grouped: BTreeMap<RepId, ActivityCounts> = BTreeMap::new();
    for rec in &table.rows {
        if !periods.contains(&rec.period) || !reps.contains(&rec.rep) {
            continue;
        }
        grouped
            .entry(rec.rep.clone())
            .or_default()
            .add(&rec.counts);
    }
    grouped
}

pub fn aggregate_sales_by_rep(
    sales: &[SaleRecord],
    periods: &HashSet<Period>,
    reps: &HashSet<RepId>,
) -> BTreeMap<RepId, f64> {
    let mut grouped: BTreeMap<RepId, f64> = BTreeMap::new();
    for rec in sales {
        if !periods.contains(&rec.period) || !reps.contains(&rec.rep) {
            continue;
        }
        *grouped.entry(rec.rep.clone()).or_default() += rec.amount;
    }
    grouped
}

pub fn aggregate_targets_by_rep(
    targets: &[TargetRecord],
    periods: &HashSet<Period>,
    reps: &HashSet<RepId>,
) -> BTreeMap<RepId, TargetSums> {
    let mut grouped: BTreeMap<RepId, TargetSums> = BTreeMap::new();
    for rec in targets {
        if !periods.contains(&rec.period) || !reps.contains(&rec.rep) {
            continue;
        }
        let entry = grouped.entry(rec.rep.clone()).or_default();
        entry.revenue_target += rec.revenue_target;
        entry.meeting_target += rec.meeting_target;
    }
    grouped
}

/// Workbook path: one summed row per selected period, no rep dimension,
/// in sheet order.
pub fn aggregate_sheets_by_period(
    sheets: &[PeriodSheet],
    periods: &HashSet<Period>,
) -> Vec<(Period, ActivityCounts)> {
    sheets
        .iter()
        .filter(|s| periods.contains(&s.period))
        .map(|s| {
            let mut sum = ActivityCounts::default();
            for row in &s.rows {
                sum.add(&row.counts);
            }
            (s.period.clone(), sum)
        })
        .collect()
}
