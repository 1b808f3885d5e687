// Parsing and number-formatting helpers.
//
// This module centralizes all the "dirty" cell handling so the rest of
// the code can assume clean, typed values. The null-filling rule lives
// here: a missing or empty numeric cell is zero, matching how the source
// spreadsheets treat blanks.
use calamine::Data;
use num_format::{Locale, ToFormattedString};

/// Parse a count cell into `u64`.
///
/// - Trims whitespace and strips thousands separators.
/// - Empty/missing cells are zero.
/// - Accepts decimal renderings of whole numbers (`"10.0"`), which
///   spreadsheet exports produce for integer columns.
/// - Anything unparsable or negative is treated as zero rather than
///   poisoning the whole row.
pub fn parse_count(s: Option<&str>) -> u64 {
    let Some(s) = s else { return 0 };
    let s = s.trim().replace(',', "");
    if s.is_empty() {
        return 0;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v.round() as u64,
        _ => 0,
    }
}

/// Parse a monetary cell into `f64`, with the same null-filling rule as
/// [`parse_count`]. Values are non-negative by source convention;
/// negatives are clamped to zero.
pub fn parse_money(s: Option<&str>) -> f64 {
    let Some(s) = s else { return 0.0 };
    let s = s.trim().replace(',', "");
    if s.is_empty() {
        return 0.0;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

/// Render a workbook cell as text, trimming strings and collapsing
/// whole-number floats (`3.0`) to their integer rendering so identity
/// and period keys round-trip the way a CSV export would show them.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

/// Format a floating-point value with a fixed number of decimal places
/// and locale-aware thousands separators (e.g. `1,234,567.89`).
pub fn format_number(n: f64, decimals: usize) -> String {
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    // Fixed-decimal first, so rounding happens before the comma insertion.
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Currency display: two decimals, thousands separators.
pub fn format_currency(n: f64) -> String {
    format_number(n, 2)
}

/// Percentage display: one decimal plus `%`. Small values, so no
/// thousands separators needed.
pub fn format_pct(n: f64) -> String {
    format!("{:.1}%", n)
}

/// Thin wrapper around `num-format` for integer-like values, used for
/// counts in both tables and console messages (e.g. `9,855 rows`).
pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
