use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// One delivery attempt report as filed by a driver.
///
/// Accepts both the camelCase API keys and the spreadsheet column headers the
/// records were originally kept under. Count fields never fail to parse; see
/// [`coerce_count`]. Keys this type does not know are kept in `extra` so a
/// rewrite of the data file never drops them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentRecord {
    #[serde(alias = "SUBMIT ID", default, deserialize_with = "lenient_text")]
    pub submit_id: String,
    #[serde(alias = "SUBMIT DATE", default, deserialize_with = "lenient_text")]
    pub submit_date: String,
    #[serde(alias = "NIK", default, deserialize_with = "lenient_text")]
    pub driver_id: String,
    #[serde(alias = "NAMA", default, deserialize_with = "lenient_text")]
    pub driver_name: String,
    #[serde(alias = "TANGGAL", default, deserialize_with = "lenient_text")]
    pub delivery_date: String,
    #[serde(alias = "SHIPMENT", default, deserialize_with = "lenient_text")]
    pub shipment_code: String,
    #[serde(alias = "JUMLAH TOKO", default, deserialize_with = "lenient_count")]
    pub store_count: u64,
    #[serde(alias = "TERKIRIM", default, deserialize_with = "lenient_count")]
    pub delivered_count: u64,
    #[serde(alias = "GAGAL", default, deserialize_with = "lenient_count")]
    pub failed_count: u64,
    #[serde(
        alias = "ALASAN",
        default,
        deserialize_with = "lenient_reason",
        skip_serializing_if = "Option::is_none"
    )]
    pub failure_reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Driver profile. Profile fields are free text as entered on the profile page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    #[serde(alias = "NIK", default, deserialize_with = "lenient_text")]
    pub driver_id: String,
    #[serde(alias = "NAMA LENGKAP", default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(
        alias = "UNIT",
        default,
        deserialize_with = "lenient_reason",
        skip_serializing_if = "Option::is_none"
    )]
    pub unit: Option<String>,
    #[serde(
        alias = "TEMPAT LAHIR",
        default,
        deserialize_with = "lenient_reason",
        skip_serializing_if = "Option::is_none"
    )]
    pub birth_place: Option<String>,
    #[serde(
        alias = "TANGGAL LAHIR",
        default,
        deserialize_with = "lenient_reason",
        skip_serializing_if = "Option::is_none"
    )]
    pub birth_date: Option<String>,
    #[serde(
        alias = "ALAMAT",
        default,
        deserialize_with = "lenient_reason",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<String>,
    #[serde(
        alias = "JENIS SIM",
        default,
        deserialize_with = "lenient_reason",
        skip_serializing_if = "Option::is_none"
    )]
    pub license_type: Option<String>,
    #[serde(
        alias = "SIM",
        default,
        deserialize_with = "lenient_reason",
        skip_serializing_if = "Option::is_none"
    )]
    pub license_number: Option<String>,
    #[serde(
        alias = "MASA BERLAKU",
        default,
        deserialize_with = "lenient_reason",
        skip_serializing_if = "Option::is_none"
    )]
    pub license_expiry: Option<String>,
    #[serde(
        alias = "NO. TELP",
        default,
        deserialize_with = "lenient_reason",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<String>,
    #[serde(
        alias = "EMAIL",
        default,
        deserialize_with = "lenient_reason",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<String>,
    #[serde(
        alias = "FOTO PROFILE",
        default,
        deserialize_with = "lenient_reason",
        skip_serializing_if = "Option::is_none"
    )]
    pub photo_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppData {
    pub shipments: Vec<ShipmentRecord>,
    pub drivers: Vec<Driver>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerRole {
    Admin,
    Personal,
    /// Anything the session layer hands us that is neither of the above.
    Unrecognized,
}

impl ViewerRole {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "admin" => Self::Admin,
            "personal" => Self::Personal,
            _ => Self::Unrecognized,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerContext {
    pub role: ViewerRole,
    pub display_name: Option<String>,
}

impl ViewerContext {
    pub fn admin() -> Self {
        Self {
            role: ViewerRole::Admin,
            display_name: None,
        }
    }

    pub fn personal(display_name: impl Into<String>) -> Self {
        Self {
            role: ViewerRole::Personal,
            display_name: Some(display_name.into()),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ViewerRole::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Distinct delivery dates ("HK").
    pub working_day_count: usize,
    /// Stores targeted ("DP").
    pub total_store_count: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyPoint {
    pub label: String,
    pub delivered: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub driver_name: String,
    pub total_store: u64,
    pub total_delivered: u64,
    pub delivered_pct: String,
    pub failed_pct: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitSlice {
    pub name: &'static str,
    pub value: u64,
}

/// Overall delivered/failed distribution. Serialized as the `{name, value}`
/// list the pie chart consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverallSplit {
    pub delivered: u64,
    pub failed: u64,
}

impl OverallSplit {
    pub fn slices(&self) -> [SplitSlice; 2] {
        [
            SplitSlice {
                name: "Terkirim",
                value: self.delivered,
            },
            SplitSlice {
                name: "Gagal",
                value: self.failed,
            },
        ]
    }
}

impl Serialize for OverallSplit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.slices().serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub visible_records: Vec<ShipmentRecord>,
    #[serde(flatten)]
    pub totals: Totals,
    pub overall_split: OverallSplit,
    pub daily_series: Vec<DailyPoint>,
    /// Only present for admin viewers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<Vec<RankingEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShipment {
    #[serde(default, deserialize_with = "lenient_text")]
    pub submit_id: String,
    #[serde(default, deserialize_with = "lenient_reason")]
    pub submit_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub driver_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub driver_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub delivery_date: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub shipment_code: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub store_count: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub delivered_count: u64,
    #[serde(default, deserialize_with = "lenient_reason")]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentUpdate {
    #[serde(default, deserialize_with = "lenient_text")]
    pub delivery_date: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub shipment_code: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub store_count: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub delivered_count: u64,
    #[serde(default, deserialize_with = "lenient_reason")]
    pub failure_reason: Option<String>,
}

/// Envelope shared by every successful API response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            status: "success",
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success",
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Numbers and numeric strings become counts. Anything missing, non-numeric,
/// negative or non-finite becomes 0; fractions are truncated. Integer JSON
/// numbers are taken exactly.
pub fn coerce_count(value: &Value) -> u64 {
    let number = match value {
        Value::Number(number) => match number.as_u64() {
            Some(count) => return count,
            None => number.as_f64(),
        },
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                Some(0.0)
            } else {
                text.parse::<f64>().ok()
            }
        }
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() && n > 0.0 => n.trunc() as u64,
        _ => 0,
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(coerce_count).unwrap_or(0))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
    })
}

fn lenient_reason<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = lenient_text(deserializer)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}
