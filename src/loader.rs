use crate::error::DashError;
use crate::types::{
    ActivityCounts, ActivityRecord, ActivityTable, Period, PeriodSheet, RepId, SaleRecord,
    SheetRow, TargetRecord,
};
use crate::util::{cell_to_string, parse_count, parse_money};
use calamine::{open_workbook_auto, Reader};
use chrono::{DateTime, Duration, Utc};
use csv::ReaderBuilder;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How long a fetched source may be reused before the caller re-fetches.
pub const CACHE_TTL_SECS: i64 = 300;

const HTTP_TIMEOUT_SECS: u64 = 30;

/// Where the data comes from: a local multi-sheet workbook, or the three
/// published CSV feeds (each a URL or a local path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    Workbook { path: PathBuf },
    Feeds {
        activity: String,
        sales: String,
        targets: String,
    },
}

impl SourceConfig {
    /// Resolve the source from the environment. `METAS_WORKBOOK` wins;
    /// otherwise the three feed endpoints, defaulting to local sample
    /// files next to the binary.
    pub fn from_env() -> SourceConfig {
        if let Ok(path) = std::env::var("METAS_WORKBOOK") {
            return SourceConfig::Workbook {
                path: PathBuf::from(path),
            };
        }
        let var = |name: &str, fallback: &str| {
            std::env::var(name).unwrap_or_else(|_| fallback.to_string())
        };
        SourceConfig::Feeds {
            activity: var("METAS_ACTIVITY_URL", "data/atividades.csv"),
            sales: var("METAS_SALES_URL", "data/vendas.csv"),
            targets: var("METAS_TARGETS_URL", "data/metas.csv"),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SourceConfig::Workbook { path } => format!("workbook {}", path.display()),
            SourceConfig::Feeds { activity, .. } => format!("feeds at {}", activity),
        }
    }
}

/// Load diagnostics, printed after each fetch in the console.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    /// Rows dropped because the identity or period cell was a
    /// placeholder (empty, zero, `nan`).
    pub skipped_placeholder: usize,
}

/// The three logical feed tables.
#[derive(Debug, Clone)]
pub struct FeedTables {
    pub activity: ActivityTable,
    pub sales: Vec<SaleRecord>,
    pub targets: Vec<TargetRecord>,
}

/// Everything the loader hands downstream, by source kind.
#[derive(Debug, Clone)]
pub enum LoadedData {
    Workbook(Vec<PeriodSheet>),
    Feeds(FeedTables),
}

impl LoadedData {
    /// Known periods in source order: sheet order for workbooks, first
    /// appearance across the three tables for feeds. The last entry is
    /// the "most recent" period used as the default selection.
    pub fn periods(&self) -> Vec<Period> {
        match self {
            LoadedData::Workbook(sheets) => {
                sheets.iter().map(|s| s.period.clone()).collect()
            }
            LoadedData::Feeds(t) => {
                let mut seen: Vec<Period> = Vec::new();
                let mut push = |p: &Period| {
                    if !seen.iter().any(|s| s == p) {
                        seen.push(p.clone());
                    }
                };
                for r in &t.activity.rows {
                    push(&r.period);
                }
                for r in &t.sales {
                    push(&r.period);
                }
                for r in &t.targets {
                    push(&r.period);
                }
                seen
            }
        }
    }

    /// Union of rep identities over every table, sorted by name.
    pub fn reps(&self) -> Vec<RepId> {
        let mut set: BTreeSet<RepId> = BTreeSet::new();
        match self {
            LoadedData::Workbook(sheets) => {
                for sheet in sheets {
                    for row in &sheet.rows {
                        if let Some(rep) = &row.rep {
                            set.insert(rep.clone());
                        }
                    }
                }
            }
            LoadedData::Feeds(t) => {
                for r in &t.activity.rows {
                    set.insert(r.rep.clone());
                }
                for r in &t.sales {
                    set.insert(r.rep.clone());
                }
                for r in &t.targets {
                    set.insert(r.rep.clone());
                }
            }
        }
        set.into_iter().collect()
    }
}

/// Explicit cache value: what was fetched, from where, and when. The
/// caller checks freshness before each run; the loader itself holds no
/// process-wide state.
#[derive(Debug, Clone)]
pub struct CachedLoad {
    pub source: SourceConfig,
    pub data: LoadedData,
    pub report: LoadReport,
    pub fetched_at: DateTime<Utc>,
}

impl CachedLoad {
    pub fn fetch(source: SourceConfig) -> Result<CachedLoad, DashError> {
        let started = std::time::Instant::now();
        let (data, report) = load(&source)?;
        info!(
            source = %source.describe(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            kept = report.kept_rows,
            skipped = report.skipped_placeholder,
            "source loaded"
        );
        Ok(CachedLoad {
            source,
            data,
            report,
            fetched_at: Utc::now(),
        })
    }

    /// True while this entry may still stand in for a fetch of `source`.
    pub fn is_fresh_for(&self, source: &SourceConfig, now: DateTime<Utc>) -> bool {
        self.source == *source
            && now.signed_duration_since(self.fetched_at) < Duration::seconds(CACHE_TTL_SECS)
    }

    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.fetched_at).num_seconds()
    }
}

/// Load the source in one shot. Never returns partial data: any
/// retrieval or schema failure aborts the whole load.
pub fn load(source: &SourceConfig) -> Result<(LoadedData, LoadReport), DashError> {
    match source {
        SourceConfig::Workbook { path } => {
            let (sheets, report) = load_workbook(path)?;
            Ok((LoadedData::Workbook(sheets), report))
        }
        SourceConfig::Feeds {
            activity,
            sales,
            targets,
        } => {
            let mut report = LoadReport::default();
            let activity_text = fetch_text(activity)?;
            let activity = parse_activity_csv(&activity_text, activity, &mut report)?;
            let sales_text = fetch_text(sales)?;
            let sales = parse_sales_csv(&sales_text, sales, &mut report)?;
            let targets_text = fetch_text(targets)?;
            let targets = parse_targets_csv(&targets_text, targets, &mut report)?;
            Ok((
                LoadedData::Feeds(FeedTables {
                    activity,
                    sales,
                    targets,
                }),
                report,
            ))
        }
    }
}

/// Fetch one endpoint as text: HTTP GET for URLs, a plain read for
/// local paths. Both failure modes become a retrieval error with the
/// endpoint named in the message.
fn fetch_text(endpoint: &str) -> Result<String, DashError> {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        debug!(endpoint, "fetching feed over http");
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| DashError::retrieval(endpoint, e))?;
        client
            .get(endpoint)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(|e| DashError::retrieval(endpoint, e))
    } else {
        std::fs::read_to_string(endpoint).map_err(|e| DashError::retrieval(endpoint, e))
    }
}

// Declared schemas. Column matching is case-insensitive after trimming,
// so `previstas ` in a sloppy export still resolves.
const ACTIVITY_REQUIRED: &[&str] = &["SDR", "Mês", "Previstas", "Agendadas", "Realizadas"];
const ACTIVITY_OPTIONAL: &[&str] = &["Canceladas", "No-show"];
const SALES_REQUIRED: &[&str] = &["SDR", "Mês", "Valor"];
const TARGETS_REQUIRED: &[&str] = &["SDR", "Mês", "Meta_Receita", "Meta_Reunioes"];
const SHEET_REQUIRED: &[&str] = &["Previstas", "Agendadas", "Canceladas", "No-show", "Realizadas"];
const SHEET_OPTIONAL: &[&str] = &["SDR"];
const NO_OPTIONAL: &[&str] = &[];

/// Canonical column name -> index in the source header row.
struct ColumnMap(HashMap<&'static str, usize>);

impl ColumnMap {
    /// Validate a header row against a declared schema. Reports every
    /// missing required column at once rather than failing on the first
    /// lookup.
    fn resolve<'a>(
        table: &str,
        required: &'static [&'static str],
        optional: &'static [&'static str],
        headers: impl Iterator<Item = &'a str>,
    ) -> Result<ColumnMap, DashError> {
        let mut index: HashMap<String, usize> = HashMap::new();
        for (i, h) in headers.enumerate() {
            index.entry(h.trim().to_lowercase()).or_insert(i);
        }
        let mut cols: HashMap<&'static str, usize> = HashMap::new();
        let mut missing: Vec<String> = Vec::new();
        for &name in required {
            match index.get(&name.to_lowercase()) {
                Some(&i) => {
                    cols.insert(name, i);
                }
                None => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(DashError::Schema {
                table: table.to_string(),
                missing,
            });
        }
        for &name in optional {
            if let Some(&i) = index.get(&name.to_lowercase()) {
                cols.insert(name, i);
            }
        }
        Ok(ColumnMap(cols))
    }

    fn get(&self, name: &str) -> Option<usize> {
        self.0.get(name).copied()
    }

    fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
}

fn parse_activity_csv(
    text: &str,
    endpoint: &str,
    report: &mut LoadReport,
) -> Result<ActivityTable, DashError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(text.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| DashError::retrieval(endpoint, e))?
        .clone();
    let cols = ColumnMap::resolve("atividades", ACTIVITY_REQUIRED, ACTIVITY_OPTIONAL, headers.iter())?;
    // Both outcome columns or neither; a lone one cannot feed the
    // "unsuccessful" sum.
    let has_outcomes = cols.has("Canceladas") && cols.has("No-show");

    let mut rows = Vec::new();
    for rec in rdr.records() {
        let rec = rec.map_err(|e| DashError::retrieval(endpoint, e))?;
        report.total_rows += 1;
        let get = |name: &str| cols.get(name).and_then(|i| rec.get(i));
        let Some(rep) = get("SDR").and_then(RepId::parse) else {
            report.skipped_placeholder += 1;
            continue;
        };
        let period = get("Mês").map(str::trim).unwrap_or("").to_string();
        if period.is_empty() {
            report.skipped_placeholder += 1;
            continue;
        }
        let counts = ActivityCounts {
            planned: parse_count(get("Previstas")),
            scheduled: parse_count(get("Agendadas")),
            completed: parse_count(get("Realizadas")),
            cancelled: parse_count(get("Canceladas")),
            no_show: parse_count(get("No-show")),
        };
        report.kept_rows += 1;
        rows.push(ActivityRecord { rep, period, counts });
    }
    Ok(ActivityTable { rows, has_outcomes })
}

fn parse_sales_csv(
    text: &str,
    endpoint: &str,
    report: &mut LoadReport,
) -> Result<Vec<SaleRecord>, DashError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(text.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| DashError::retrieval(endpoint, e))?
        .clone();
    let cols = ColumnMap::resolve("vendas", SALES_REQUIRED, NO_OPTIONAL, headers.iter())?;

    let mut rows = Vec::new();
    for rec in rdr.records() {
        let rec = rec.map_err(|e| DashError::retrieval(endpoint, e))?;
        report.total_rows += 1;
        let get = |name: &str| cols.get(name).and_then(|i| rec.get(i));
        let Some(rep) = get("SDR").and_then(RepId::parse) else {
            report.skipped_placeholder += 1;
            continue;
        };
        let period = get("Mês").map(str::trim).unwrap_or("").to_string();
        if period.is_empty() {
            report.skipped_placeholder += 1;
            continue;
        }
        let amount = parse_money(get("Valor"));
        report.kept_rows += 1;
        rows.push(SaleRecord {
            rep,
            period,
            amount,
        });
    }
    Ok(rows)
}

fn parse_targets_csv(
    text: &str,
    endpoint: &str,
    report: &mut LoadReport,
) -> Result<Vec<TargetRecord>, DashError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(text.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| DashError::retrieval(endpoint, e))?
        .clone();
    let cols = ColumnMap::resolve("metas", TARGETS_REQUIRED, NO_OPTIONAL, headers.iter())?;

    let mut rows = Vec::new();
    for rec in rdr.records() {
        let rec = rec.map_err(|e| DashError::retrieval(endpoint, e))?;
        report.total_rows += 1;
        let get = |name: &str| cols.get(name).and_then(|i| rec.get(i));
        let Some(rep) = get("SDR").and_then(RepId::parse) else {
            report.skipped_placeholder += 1;
            continue;
        };
        let period = get("Mês").map(str::trim).unwrap_or("").to_string();
        if period.is_empty() {
            report.skipped_placeholder += 1;
            continue;
        }
        report.kept_rows += 1;
        rows.push(TargetRecord {
            rep,
            period,
            revenue_target: parse_money(get("Meta_Receita")),
            meeting_target: parse_count(get("Meta_Reunioes")),
        });
    }
    Ok(rows)
}

/// Read every sheet of the workbook; each sheet is one period and must
/// carry the five activity columns. The SDR column is optional there.
fn load_workbook(path: &Path) -> Result<(Vec<PeriodSheet>, LoadReport), DashError> {
    let mut wb = open_workbook_auto(path)
        .map_err(|e| DashError::retrieval(path.display().to_string(), e))?;
    let names = wb.sheet_names().to_owned();
    let mut report = LoadReport::default();
    let mut sheets = Vec::new();

    for name in names {
        let range = wb.worksheet_range(&name).map_err(|e| {
            DashError::retrieval(format!("{} sheet '{}'", path.display(), name), e)
        })?;
        let mut rows_iter = range.rows();
        let headers: Vec<String> = rows_iter
            .next()
            .map(|r| r.iter().map(cell_to_string).collect())
            .unwrap_or_default();
        let cols = ColumnMap::resolve(
            &name,
            SHEET_REQUIRED,
            SHEET_OPTIONAL,
            headers.iter().map(String::as_str),
        )?;

        let mut sheet_rows = Vec::new();
        for row in rows_iter {
            let cell = |n: &str| cols.get(n).and_then(|i| row.get(i)).map(cell_to_string);
            let counts = ActivityCounts {
                planned: parse_count(cell("Previstas").as_deref()),
                scheduled: parse_count(cell("Agendadas").as_deref()),
                completed: parse_count(cell("Realizadas").as_deref()),
                cancelled: parse_count(cell("Canceladas").as_deref()),
                no_show: parse_count(cell("No-show").as_deref()),
            };
            let rep = cell("SDR").as_deref().and_then(RepId::parse);
            // Trailing blank rows are common in hand-edited sheets.
            if rep.is_none() && counts == ActivityCounts::default() {
                continue;
            }
            report.total_rows += 1;
            report.kept_rows += 1;
            sheet_rows.push(SheetRow { rep, counts });
        }
        sheets.push(PeriodSheet {
            period: name.trim().to_string(),
            rows: sheet_rows,
        });
    }
    Ok((sheets, report))
}
