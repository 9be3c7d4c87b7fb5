//! Currency and date formatting used by the document templates.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Suffix appended to every yen amount.
pub const YEN_SUFFIX: &str = "円";

// ============================================================================
// CURRENCY
// ============================================================================

/// Format an amount with thousands separators and no decimals, e.g. `1,234円`.
///
/// Non-finite values render as `0円`.
pub fn currency(value: f64) -> String {
    format!("{}{}", grouped(value), YEN_SUFFIX)
}

/// Thousands-grouped integer without a unit suffix.
pub fn grouped(value: f64) -> String {
    let rounded = if value.is_finite() { value.round() } else { 0.0 };
    // i64 covers any realistic yen amount; saturate instead of wrapping.
    let n = rounded.clamp(i64::MIN as f64, i64::MAX as f64) as i64;

    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Grouped number followed by an arbitrary unit (`12,000km`, `1,500cc`).
pub fn quantity(value: f64, unit: &str) -> String {
    format!("{}{}", grouped(value), unit)
}

// ============================================================================
// DATES
// ============================================================================

/// Normalize a date string to `YYYY/MM/DD`.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY.MM.DD`, RFC 3339 timestamps and
/// naive `YYYY-MM-DDTHH:MM:SS` timestamps. Empty or unrecognised input renders
/// as an empty string.
pub fn date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    match parse_date(raw) {
        Some(d) => d.format("%Y/%m/%d").to_string(),
        None => {
            tracing::debug!(len = raw.len(), "unrecognised date value, rendering empty");
            String::new()
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    for pattern in ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, pattern) {
            return Some(d);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(dt.date());
        }
    }
    None
}

/// Render a list of bonus months as `7月・12月`.
pub fn months(list: &[u32]) -> String {
    list.iter()
        .filter(|m| (1..=12).contains(*m))
        .map(|m| format!("{}月", m))
        .collect::<Vec<_>>()
        .join("・")
}
