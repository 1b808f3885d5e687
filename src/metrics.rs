//! Derived figures that are never stored in the source tables:
//! unsuccessful count, conversion rate, target gap, and scope totals.
//! Everything here is numeric; formatting is the presenter's job.

use crate::types::{
    ActivityCounts, DerivedRow, DetailScope, Period, PeriodDerived, RepId, ScopeTotals,
    TargetSums,
};
use std::collections::{BTreeMap, BTreeSet};

/// `completed / planned * 100`, defined as 0 when nothing was planned.
/// Inputs are unsigned, so the result is never negative and never NaN.
pub fn conversion_rate(completed: u64, planned: u64) -> f64 {
    if planned == 0 {
        0.0
    } else {
        completed as f64 / planned as f64 * 100.0
    }
}

/// Build the detail view from the three grouped tables.
///
/// The rep key set is the outer union: a rep present in only one table
/// still gets a row, with zeros substituted for the tables that never
/// mentioned them. Totals are summed over exactly the rows produced, so
/// they always reflect the active filter.
pub fn derive_detail(
    activity: &BTreeMap<RepId, ActivityCounts>,
    sales: &BTreeMap<RepId, f64>,
    targets: &BTreeMap<RepId, TargetSums>,
    has_outcomes: bool,
) -> DetailScope {
    let mut keys: BTreeSet<&RepId> = BTreeSet::new();
    keys.extend(activity.keys());
    keys.extend(sales.keys());
    keys.extend(targets.keys());

    let mut rows = Vec::with_capacity(keys.len());
    let mut totals = ScopeTotals {
        unsuccessful: has_outcomes.then_some(0),
        ..ScopeTotals::default()
    };

    for rep in keys {
        let counts = activity.get(rep).copied().unwrap_or_default();
        let revenue = sales.get(rep).copied().unwrap_or(0.0);
        let target = targets.get(rep).copied().unwrap_or_default();

        let unsuccessful = has_outcomes.then(|| counts.cancelled + counts.no_show);
        let row = DerivedRow {
            rep: rep.clone(),
            counts,
            revenue,
            revenue_target: target.revenue_target,
            meeting_target: target.meeting_target,
            unsuccessful,
            conversion_rate: conversion_rate(counts.completed, counts.planned),
            target_gap: target.meeting_target as i64 - counts.scheduled as i64,
        };

        totals.counts.add(&row.counts);
        totals.revenue += row.revenue;
        totals.revenue_target += row.revenue_target;
        totals.meeting_target += row.meeting_target;
        if let (Some(total), Some(u)) = (totals.unsuccessful.as_mut(), row.unsuccessful) {
            *total += u;
        }
        rows.push(row);
    }

    // Scope conversion is recomputed from the totals, not averaged over
    // per-rep rates.
    totals.conversion_rate = conversion_rate(totals.counts.completed, totals.counts.planned);
    totals.target_gap = totals.meeting_target as i64 - totals.counts.scheduled as i64;

    DetailScope {
        rows,
        totals,
        has_outcomes,
    }
}

/// Per-period derivation for the workbook consolidation view. Workbook
/// sheets always carry the outcome columns, so "unsuccessful" is
/// unconditional here.
pub fn derive_periods(grouped: &[(Period, ActivityCounts)]) -> Vec<PeriodDerived> {
    grouped
        .iter()
        .map(|(period, counts)| PeriodDerived {
            period: period.clone(),
            counts: *counts,
            unsuccessful: counts.cancelled + counts.no_show,
            conversion_rate: conversion_rate(counts.completed, counts.planned),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rep(name: &str) -> RepId {
        RepId::parse(name).unwrap()
    }

    fn counts(planned: u64, scheduled: u64, completed: u64, cancelled: u64, no_show: u64) -> ActivityCounts {
        ActivityCounts {
            planned,
            scheduled,
            completed,
            cancelled,
            no_show,
        }
    }

    #[test]
    fn conversion_is_zero_when_nothing_planned() {
        assert_eq!(conversion_rate(0, 0), 0.0);
        assert_eq!(conversion_rate(5, 0), 0.0);
    }

    #[test]
    fn conversion_is_completed_over_planned() {
        assert_eq!(conversion_rate(40, 100), 40.0);
        assert_eq!(conversion_rate(1, 4), 25.0);
        // 1/3 is not exactly representable; allow the usual slack.
        assert!((conversion_rate(1, 3) - 100.0 / 3.0).abs() < 1e-12);
        // Never NaN, never negative, even at the edges.
        assert!(conversion_rate(0, 7) == 0.0);
        assert!(!conversion_rate(u64::MAX, 1).is_nan());
    }

    #[test]
    fn worked_example_unsuccessful_and_conversion() {
        let mut activity = BTreeMap::new();
        activity.insert(rep("A"), counts(100, 60, 40, 5, 15));
        let scope = derive_detail(&activity, &BTreeMap::new(), &BTreeMap::new(), true);
        let row = &scope.rows[0];
        assert_eq!(row.unsuccessful, Some(20));
        assert_eq!(row.conversion_rate, 40.0);
    }

    #[test]
    fn worked_example_target_gap() {
        let mut activity = BTreeMap::new();
        activity.insert(rep("A"), counts(0, 60, 0, 0, 0));
        let mut targets = BTreeMap::new();
        targets.insert(
            rep("A"),
            TargetSums {
                revenue_target: 0.0,
                meeting_target: 70,
            },
        );
        let scope = derive_detail(&activity, &BTreeMap::new(), &targets, true);
        assert_eq!(scope.rows[0].target_gap, 10);
    }

    #[test]
    fn gap_goes_negative_when_target_is_beaten() {
        let mut activity = BTreeMap::new();
        activity.insert(rep("A"), counts(0, 80, 0, 0, 0));
        let mut targets = BTreeMap::new();
        targets.insert(
            rep("A"),
            TargetSums {
                revenue_target: 0.0,
                meeting_target: 70,
            },
        );
        let scope = derive_detail(&activity, &BTreeMap::new(), &targets, true);
        assert_eq!(scope.rows[0].target_gap, -10);
    }

    #[test]
    fn outer_union_keeps_targets_only_reps() {
        let mut targets = BTreeMap::new();
        targets.insert(
            rep("Carla"),
            TargetSums {
                revenue_target: 5_000.0,
                meeting_target: 20,
            },
        );
        let scope = derive_detail(&BTreeMap::new(), &BTreeMap::new(), &targets, true);
        assert_eq!(scope.rows.len(), 1);
        let row = &scope.rows[0];
        assert_eq!(row.rep.as_str(), "Carla");
        assert_eq!(row.counts, ActivityCounts::default());
        assert_eq!(row.revenue, 0.0);
        assert_eq!(row.unsuccessful, Some(0));
        assert_eq!(row.conversion_rate, 0.0);
        assert_eq!(row.target_gap, 20);
    }

    #[test]
    fn union_merges_all_three_tables() {
        let mut activity = BTreeMap::new();
        activity.insert(rep("A"), counts(10, 5, 3, 0, 0));
        let mut sales = BTreeMap::new();
        sales.insert(rep("B"), 900.0);
        let mut targets = BTreeMap::new();
        targets.insert(
            rep("C"),
            TargetSums {
                revenue_target: 100.0,
                meeting_target: 1,
            },
        );
        let scope = derive_detail(&activity, &sales, &targets, false);
        let names: Vec<&str> = scope.rows.iter().map(|r| r.rep.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn empty_inputs_produce_empty_scope_with_zero_totals() {
        let scope = derive_detail(&BTreeMap::new(), &BTreeMap::new(), &BTreeMap::new(), true);
        assert!(scope.rows.is_empty());
        assert_eq!(scope.totals.counts, ActivityCounts::default());
        assert_eq!(scope.totals.revenue, 0.0);
        assert_eq!(scope.totals.conversion_rate, 0.0);
        assert_eq!(scope.totals.unsuccessful, Some(0));
    }

    #[test]
    fn totals_sum_over_scope_and_recompute_conversion() {
        let mut activity = BTreeMap::new();
        activity.insert(rep("A"), counts(100, 60, 40, 5, 15));
        activity.insert(rep("B"), counts(50, 30, 30, 2, 3));
        let mut sales = BTreeMap::new();
        sales.insert(rep("A"), 1_000.0);
        sales.insert(rep("B"), 500.0);
        let scope = derive_detail(&activity, &sales, &BTreeMap::new(), true);
        assert_eq!(scope.totals.counts.planned, 150);
        assert_eq!(scope.totals.counts.completed, 70);
        assert_eq!(scope.totals.revenue, 1_500.0);
        assert_eq!(scope.totals.unsuccessful, Some(25));
        // 70/150, not the mean of 40% and 60%.
        assert!((scope.totals.conversion_rate - 70.0 / 150.0 * 100.0).abs() < 1e-12);
    }

    #[test]
    fn outcomes_disabled_means_no_unsuccessful_anywhere() {
        let mut activity = BTreeMap::new();
        activity.insert(rep("A"), counts(10, 5, 3, 0, 0));
        let scope = derive_detail(&activity, &BTreeMap::new(), &BTreeMap::new(), false);
        assert_eq!(scope.rows[0].unsuccessful, None);
        assert_eq!(scope.totals.unsuccessful, None);
    }

    #[test]
    fn period_derivation_matches_the_consolidation_rules() {
        let grouped = vec![
            ("Jan".to_string(), counts(100, 60, 40, 5, 15)),
            ("Fev".to_string(), counts(0, 0, 0, 0, 0)),
        ];
        let derived = derive_periods(&grouped);
        assert_eq!(derived[0].unsuccessful, 20);
        assert_eq!(derived[0].conversion_rate, 40.0);
        assert_eq!(derived[1].unsuccessful, 0);
        assert_eq!(derived[1].conversion_rate, 0.0);
    }
}
