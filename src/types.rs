use serde::Serialize;
use std::fmt;
use tabled::Tabled;

/// A period label: a month name in the feed tables, a sheet name in the
/// workbook. Categorical only; the dashboard never parses it as a date.
pub type Period = String;

/// Sales-representative identity.
///
/// Constructed only through [`RepId::parse`], which refuses the
/// placeholder values spreadsheet exports produce for blank cells: the
/// empty string, a literal or numeric zero, and `nan` in any casing.
/// Rows carrying such a cell are dropped by the loader, so downstream
/// code never has to filter sentinels out of the identity universe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RepId(String);

impl RepId {
    pub fn parse(raw: &str) -> Option<RepId> {
        let t = raw.trim();
        if t.is_empty() || t.eq_ignore_ascii_case("nan") {
            return None;
        }
        if let Ok(v) = t.parse::<f64>() {
            if v == 0.0 {
                return None;
            }
        }
        Some(RepId(t.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The five activity counts tracked per row. Missing cells are filled
/// with zero at load time, so these are always plain non-negative sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityCounts {
    pub planned: u64,
    pub scheduled: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub no_show: u64,
}

impl ActivityCounts {
    pub fn add(&mut self, other: &ActivityCounts) {
        self.planned += other.planned;
        self.scheduled += other.scheduled;
        self.completed += other.completed;
        self.cancelled += other.cancelled;
        self.no_show += other.no_show;
    }
}

/// One activity-log row from the feed source.
#[derive(Debug, Clone)]
pub struct ActivityRecord {
    pub rep: RepId,
    pub period: Period,
    pub counts: ActivityCounts,
}

/// The activity table plus a table-level fact the deriver needs: whether
/// the source actually carried the Canceladas/No-show columns. When it
/// did not, the "unsuccessful" metric is disabled rather than reported
/// as a misleading zero.
#[derive(Debug, Clone)]
pub struct ActivityTable {
    pub rows: Vec<ActivityRecord>,
    pub has_outcomes: bool,
}

/// One sales-log row: revenue attributed to a rep in a period.
#[derive(Debug, Clone)]
pub struct SaleRecord {
    pub rep: RepId,
    pub period: Period,
    pub amount: f64,
}

/// One targets-log row: revenue and meeting-count targets per rep/period.
#[derive(Debug, Clone)]
pub struct TargetRecord {
    pub rep: RepId,
    pub period: Period,
    pub revenue_target: f64,
    pub meeting_target: u64,
}

/// One row of a workbook sheet. The SDR column is optional there; a
/// sheet without it still contributes to the per-period consolidation.
#[derive(Debug, Clone)]
pub struct SheetRow {
    pub rep: Option<RepId>,
    pub counts: ActivityCounts,
}

/// One workbook sheet, i.e. one period. Sheet order is source order and
/// is preserved all the way to display.
#[derive(Debug, Clone)]
pub struct PeriodSheet {
    pub period: Period,
    pub rows: Vec<SheetRow>,
}

/// Summed target figures for one grouping key.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TargetSums {
    pub revenue_target: f64,
    pub meeting_target: u64,
}

/// Numeric per-rep row after derivation. Formatting happens later, in
/// the presenter; nothing here is ever a display string.
#[derive(Debug, Clone)]
pub struct DerivedRow {
    pub rep: RepId,
    pub counts: ActivityCounts,
    pub revenue: f64,
    pub revenue_target: f64,
    pub meeting_target: u64,
    /// `cancelled + no_show`; `None` when the source omitted the
    /// outcome columns.
    pub unsuccessful: Option<u64>,
    /// `completed / planned * 100`, 0.0 when planned is 0.
    pub conversion_rate: f64,
    /// `meeting_target - scheduled`; positive means behind target.
    pub target_gap: i64,
}

/// Totals over every key in the active filter scope.
#[derive(Debug, Clone, Default)]
pub struct ScopeTotals {
    pub counts: ActivityCounts,
    pub revenue: f64,
    pub revenue_target: f64,
    pub meeting_target: u64,
    pub unsuccessful: Option<u64>,
    pub conversion_rate: f64,
    pub target_gap: i64,
}

/// The detail view: one derived row per rep in scope, plus scope totals.
#[derive(Debug, Clone)]
pub struct DetailScope {
    pub rows: Vec<DerivedRow>,
    pub totals: ScopeTotals,
    pub has_outcomes: bool,
}

/// Per-period numeric row for the workbook consolidation view.
#[derive(Debug, Clone)]
pub struct PeriodDerived {
    pub period: Period,
    pub counts: ActivityCounts,
    pub unsuccessful: u64,
    pub conversion_rate: f64,
}

/// Display row for the detail table. All fields are pre-formatted
/// strings; the numeric values live in [`DerivedRow`] and are never
/// parsed back out of these.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DetailDisplayRow {
    #[serde(rename = "SDR")]
    #[tabled(rename = "SDR")]
    pub rep: String,
    #[serde(rename = "Meta_Receita")]
    #[tabled(rename = "Meta_Receita")]
    pub revenue_target: String,
    #[serde(rename = "Meta_Reunioes")]
    #[tabled(rename = "Meta_Reunioes")]
    pub meeting_target: String,
    #[serde(rename = "Previstas")]
    #[tabled(rename = "Previstas")]
    pub planned: String,
    #[serde(rename = "Agendadas")]
    #[tabled(rename = "Agendadas")]
    pub scheduled: String,
    #[serde(rename = "Realizadas")]
    #[tabled(rename = "Realizadas")]
    pub completed: String,
    #[serde(rename = "Não Realizadas")]
    #[tabled(rename = "Não Realizadas")]
    pub unsuccessful: String,
    #[serde(rename = "Conversão %")]
    #[tabled(rename = "Conversão %")]
    pub conversion: String,
    #[serde(rename = "Gap Meta")]
    #[tabled(rename = "Gap Meta")]
    pub target_gap: String,
    #[serde(rename = "Receita")]
    #[tabled(rename = "Receita")]
    pub revenue: String,
}

/// Display row for the per-period consolidation table.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PeriodDisplayRow {
    #[serde(rename = "Mês")]
    #[tabled(rename = "Mês")]
    pub period: String,
    #[serde(rename = "Previstas")]
    #[tabled(rename = "Previstas")]
    pub planned: String,
    #[serde(rename = "Agendadas")]
    #[tabled(rename = "Agendadas")]
    pub scheduled: String,
    #[serde(rename = "Realizadas")]
    #[tabled(rename = "Realizadas")]
    pub completed: String,
    #[serde(rename = "Não Realizadas")]
    #[tabled(rename = "Não Realizadas")]
    pub unsuccessful: String,
    #[serde(rename = "Conversão %")]
    #[tabled(rename = "Conversão %")]
    pub conversion: String,
}

/// One metric rendered as a bar series: (category, value) pairs where
/// categories are rep names or period labels.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    pub metric: String,
    pub points: Vec<(String, f64)>,
}

/// Summary figures exported to JSON alongside the detail table.
#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub reps_in_scope: usize,
    pub total_planned: u64,
    pub total_scheduled: u64,
    pub total_completed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_unsuccessful: Option<u64>,
    pub conversion_rate: f64,
    pub total_revenue: f64,
    pub total_revenue_target: f64,
    pub total_meeting_target: u64,
    pub revenue_gap: f64,
    pub meeting_gap: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rep_id_accepts_ordinary_names() {
        assert_eq!(RepId::parse("Ana").unwrap().as_str(), "Ana");
        assert_eq!(RepId::parse("  Bruno  ").unwrap().as_str(), "Bruno");
    }

    #[test]
    fn rep_id_rejects_placeholder_cells() {
        assert!(RepId::parse("").is_none());
        assert!(RepId::parse("   ").is_none());
        assert!(RepId::parse("0").is_none());
        assert!(RepId::parse("0.0").is_none());
        assert!(RepId::parse("nan").is_none());
        assert!(RepId::parse("NaN").is_none());
    }

    #[test]
    fn rep_id_keeps_nonzero_numeric_names() {
        // A rep keyed by an employee number is still a valid identity.
        assert_eq!(RepId::parse("1042").unwrap().as_str(), "1042");
    }

    #[test]
    fn activity_counts_sum_componentwise() {
        let mut a = ActivityCounts {
            planned: 10,
            scheduled: 6,
            completed: 4,
            cancelled: 1,
            no_show: 2,
        };
        a.add(&ActivityCounts {
            planned: 5,
            scheduled: 3,
            completed: 2,
            cancelled: 0,
            no_show: 1,
        });
        assert_eq!(a.planned, 15);
        assert_eq!(a.scheduled, 9);
        assert_eq!(a.completed, 6);
        assert_eq!(a.cancelled, 1);
        assert_eq!(a.no_show, 3);
    }
}
