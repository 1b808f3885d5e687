// Entry point and menu flow.
//
// The dashboard is a strict request/response pipeline: every render
// rereads the cached tables, refilters, reaggregates, rederives and
// reformats. Nothing survives between renders except the loader cache,
// which expires on a fixed TTL.
//
// - Option [1] loads (or refreshes) the configured source, printing
//   load diagnostics.
// - Option [2] prompts for period/rep selections and renders the
//   summary tiles, the two bar charts and the detail table, exporting
//   the table to CSV and the summary figures to JSON.

use metas_dash::aggregate::{
    aggregate_activity_by_rep, aggregate_sales_by_rep, aggregate_sheets_by_period,
    aggregate_targets_by_rep,
};
use metas_dash::loader::{CachedLoad, LoadedData, SourceConfig};
use metas_dash::metrics::{derive_detail, derive_periods};
use metas_dash::present::{
    detail_table, funnel_series, period_funnel_series, period_table, render_bar_chart,
    revenue_series, summary_stats,
};
use metas_dash::types::{Period, RepId};
use metas_dash::util::{format_currency, format_int, format_pct};
use metas_dash::{output, types};

use chrono::Utc;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::debug;

// Simple in-memory app state so a fresh load survives across menu
// round-trips within the TTL window.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { cache: None }));

struct AppState {
    cache: Option<CachedLoad>,
}

/// Read a single line of input after printing a prompt.
fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Get data for the configured source, reusing the cached load while it
/// is fresh. Returns `None` after printing the failure, so callers just
/// fall back to the menu.
fn ensure_data() -> Option<CachedLoad> {
    let source = SourceConfig::from_env();
    let now = Utc::now();
    {
        let state = APP_STATE.lock().unwrap();
        if let Some(cache) = &state.cache {
            if cache.is_fresh_for(&source, now) {
                debug!(age_secs = cache.age_secs(now), "reusing cached load");
                return Some(cache.clone());
            }
        }
    }
    match CachedLoad::fetch(source) {
        Ok(loaded) => {
            let mut state = APP_STATE.lock().unwrap();
            state.cache = Some(loaded.clone());
            Some(loaded)
        }
        Err(e) => {
            eprintln!("Error: {}\n", e);
            None
        }
    }
}

/// Handle option [1]: load or refresh, then print load diagnostics.
fn handle_load() {
    let Some(loaded) = ensure_data() else { return };
    println!(
        "Loaded {} ({} rows read, {} kept)",
        loaded.source.describe(),
        format_int(loaded.report.total_rows as i64),
        format_int(loaded.report.kept_rows as i64)
    );
    if loaded.report.skipped_placeholder > 0 {
        println!(
            "Note: {} rows skipped for placeholder SDR/period cells.",
            format_int(loaded.report.skipped_placeholder as i64)
        );
    }
    let periods = loaded.data.periods();
    println!(
        "Periods: {}  |  SDRs: {}\n",
        periods.join(", "),
        format_int(loaded.data.reps().len() as i64)
    );
}

/// Numbered multi-select over `options`. Blank keeps the default
/// (`all` or most recent), `all` selects everything, `none` selects
/// nothing, otherwise a comma-separated list of numbers.
fn select_indices(label: &str, options: &[String], default_all: bool) -> Vec<usize> {
    println!("{}:", label);
    for (i, opt) in options.iter().enumerate() {
        println!("  [{}] {}", i + 1, opt);
    }
    let default_desc = if default_all { "all" } else { "most recent" };
    let input = read_line(&format!(
        "Select (numbers comma-separated, 'all', 'none'; blank = {}): ",
        default_desc
    ));
    match input.to_lowercase().as_str() {
        "" => {
            if default_all {
                (0..options.len()).collect()
            } else {
                // Most recent = last in source order.
                options.len().checked_sub(1).map(|i| vec![i]).unwrap_or_default()
            }
        }
        "all" => (0..options.len()).collect(),
        "none" => Vec::new(),
        other => other
            .split(',')
            .filter_map(|tok| tok.trim().parse::<usize>().ok())
            .filter(|n| (1..=options.len()).contains(n))
            .map(|n| n - 1)
            .collect(),
    }
}

fn print_summary(stats: &types::SummaryStats) {
    println!("Resumo ({} SDRs em escopo)", stats.reps_in_scope);
    println!(
        "  Receita: {} / Meta: {} (gap {})",
        format_currency(stats.total_revenue),
        format_currency(stats.total_revenue_target),
        format_currency(stats.revenue_gap)
    );
    println!(
        "  Agendadas: {} / Meta: {} (gap {})",
        format_int(stats.total_scheduled),
        format_int(stats.total_meeting_target),
        format_int(stats.meeting_gap)
    );
    println!(
        "  Previstas: {}  Realizadas: {}  Conversão: {}",
        format_int(stats.total_planned),
        format_int(stats.total_completed),
        format_pct(stats.conversion_rate)
    );
    if let Some(u) = stats.total_unsuccessful {
        println!("  Não realizadas: {}", format_int(u));
    }
    println!();
}

/// Handle option [2]: one full pipeline run under the chosen filters.
fn handle_render() {
    let Some(loaded) = ensure_data() else { return };

    let period_names = loaded.data.periods();
    if period_names.is_empty() {
        println!("No periods found in the source.\n");
        return;
    }
    let selected = select_indices("Mês", &period_names, false);
    let periods: HashSet<Period> = selected.iter().map(|&i| period_names[i].clone()).collect();

    match &loaded.data {
        LoadedData::Feeds(tables) => {
            let rep_ids = loaded.data.reps();
            let rep_names: Vec<String> = rep_ids.iter().map(|r| r.to_string()).collect();
            let selected = select_indices("SDR", &rep_names, true);
            let reps: HashSet<RepId> = selected.iter().map(|&i| rep_ids[i].clone()).collect();
            println!();

            let activity = aggregate_activity_by_rep(&tables.activity, &periods, &reps);
            let sales = aggregate_sales_by_rep(&tables.sales, &periods, &reps);
            let targets = aggregate_targets_by_rep(&tables.targets, &periods, &reps);
            let scope = derive_detail(&activity, &sales, &targets, tables.activity.has_outcomes);

            let stats = summary_stats(&scope);
            print_summary(&stats);
            println!("{}", render_bar_chart("Receita por SDR", &[revenue_series(&scope)]));
            println!("{}", render_bar_chart("Funil de atividades por SDR", &funnel_series(&scope)));
            let table = detail_table(&scope);
            output::print_table("Detalhe por SDR", &table);

            if let Err(e) = output::write_csv("detalhe_sdr.csv", &table) {
                eprintln!("Write error: {}", e);
            }
            if let Err(e) = output::write_json("resumo.json", &stats) {
                eprintln!("Write error: {}", e);
            }
            println!("(Detail exported to detalhe_sdr.csv, summary to resumo.json)\n");
        }
        LoadedData::Workbook(sheets) => {
            println!();
            let grouped = aggregate_sheets_by_period(sheets, &periods);
            let derived = derive_periods(&grouped);
            let table = period_table(&derived);
            output::print_table("Resumo Consolidado por Mês", &table);
            println!("{}", render_bar_chart("Atividades por Mês", &period_funnel_series(&derived)));

            if let Err(e) = output::write_csv("resumo_mensal.csv", &table) {
                eprintln!("Write error: {}", e);
            }
            println!("(Consolidation exported to resumo_mensal.csv)\n");
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    loop {
        println!("Dashboard de Consolidação de Metas");
        println!("[1] Load / refresh data");
        println!("[2] Render dashboard");
        println!("[3] Exit\n");
        match read_line("Enter choice: ").as_str() {
            "1" => handle_load(),
            "2" => handle_render(),
            "3" => {
                println!("Exiting.");
                break;
            }
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
}
