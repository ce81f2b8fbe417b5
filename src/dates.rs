use chrono::{DateTime, Datelike, NaiveDate};

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agt", "Sep", "Okt", "Nov", "Des",
];

/// Parses a stored delivery date. Accepts plain `YYYY-MM-DD`, RFC 3339
/// timestamps (the calendar date in the timestamp's own offset) and anything
/// that starts with a `YYYY-MM-DD` prefix.
pub fn parse_delivery_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Key used to count distinct working days.
pub fn date_key(raw: &str) -> String {
    match parse_delivery_date(raw) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => raw.trim().to_string(),
    }
}

/// `dd MMM` chart label, e.g. `02 Jan` or `17 Agt`.
pub fn day_label(raw: &str) -> String {
    match parse_delivery_date(raw) {
        Some(date) => format_day_label(date),
        None => raw.trim().to_string(),
    }
}

pub fn format_day_label(date: NaiveDate) -> String {
    format!("{:02} {}", date.day(), MONTH_LABELS[date.month0() as usize])
}
