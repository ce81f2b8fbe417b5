use crate::dates::parse_delivery_date;
use crate::errors::AppError;
use crate::models::ShipmentRecord;
use chrono::NaiveDate;
use serde::Deserialize;

/// Raw query-string filters, as sent by the dashboard's filter bar.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub names: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ShipmentFilter {
    pub range: Option<(NaiveDate, NaiveDate)>,
    pub names: Vec<String>,
}

impl ShipmentQuery {
    /// The date range only applies when both bounds are present.
    pub fn to_filter(&self) -> Result<ShipmentFilter, AppError> {
        let start = parse_bound(self.start_date.as_deref(), "startDate")?;
        let end = parse_bound(self.end_date.as_deref(), "endDate")?;
        let range = start.zip(end);

        let names = self
            .names
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        Ok(ShipmentFilter { range, names })
    }
}

impl ShipmentFilter {
    pub fn matches(&self, record: &ShipmentRecord) -> bool {
        if let Some((start, end)) = self.range {
            match parse_delivery_date(&record.delivery_date) {
                Some(date) if date >= start && date <= end => {}
                _ => return false,
            }
        }

        self.names.is_empty() || self.names.iter().any(|name| *name == record.driver_name)
    }

    pub fn apply(&self, records: &[ShipmentRecord]) -> Vec<ShipmentRecord> {
        records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }
}

fn parse_bound(raw: Option<&str>, field: &str) -> Result<Option<NaiveDate>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::bad_request(format!("{field} must be YYYY-MM-DD"))),
    }
}
