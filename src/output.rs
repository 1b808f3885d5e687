use crate::error::DashError;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Export display rows to CSV with their renamed (Portuguese) headers.
pub fn write_csv<T: Serialize>(path: &str, rows: &[T]) -> Result<(), DashError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), DashError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Print a full table in markdown style, with a heading line. An empty
/// row set renders as a placeholder rather than an empty grid.
pub fn print_table<T>(title: &str, rows: &[T])
where
    T: Tabled + Clone,
{
    println!("{}", title);
    if rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(rows.iter().cloned()).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
