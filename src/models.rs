//! Data model for the sensor dashboard: cell values as they arrive from the
//! sheet, the optional-field record schema they normalize into, and the
//! time-indexed `Dataset` the presentation layer consumes.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// Canonical name of the resolved time column in every dataset.
pub const TIMESTAMP_COLUMN: &str = "Timestamp";

/// One cell as decoded from the sheet API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    // ---
    Empty,
    Number(f64),
    Bool(bool),
    Text(String),
}

impl CellValue {
    // ---
    pub fn from_json(value: serde_json::Value) -> Self {
        // ---
        match value {
            serde_json::Value::Null => CellValue::Empty,
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(CellValue::Number)
                .unwrap_or(CellValue::Empty),
            serde_json::Value::Bool(b) => CellValue::Bool(b),
            serde_json::Value::String(s) if s.is_empty() => CellValue::Empty,
            serde_json::Value::String(s) => CellValue::Text(s),
            // Arrays/objects never appear in a values range; treat as blank.
            _ => CellValue::Empty,
        }
    }

    /// Coerce to a float. Numeric-looking text coerces; anything else is
    /// treated as missing rather than an error.
    pub fn as_f64(&self) -> Option<f64> {
        // ---
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Empty | CellValue::Bool(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

// ---

/// Inferred type of one sheet column after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Timestamp,
    Integer,
    Float,
    Text,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        let s = match self {
            ColumnType::Timestamp => "timestamp",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
        };
        f.write_str(s)
    }
}

/// Name and inferred type of one dataset column, in sheet column order.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
}

// ---

/// The sensor quantities the loader recognizes by column name.
///
/// The producing firmware writes Spanish headers; English equivalents are
/// accepted so a renamed sheet keeps working. Matching is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorField {
    Voltage,
    CurrentIna,
    Power,
    CurrentAcs,
    Temperature,
    Humidity,
}

impl SensorField {
    // ---
    pub const ALL: [SensorField; 6] = [
        SensorField::Voltage,
        SensorField::CurrentIna,
        SensorField::Power,
        SensorField::CurrentAcs,
        SensorField::Temperature,
        SensorField::Humidity,
    ];

    /// Canonical column name used everywhere downstream of normalization.
    pub fn name(self) -> &'static str {
        // ---
        match self {
            SensorField::Voltage => "Voltage",
            SensorField::CurrentIna => "CurrentINA",
            SensorField::Power => "Power",
            SensorField::CurrentAcs => "CurrentACS",
            SensorField::Temperature => "Temperature",
            SensorField::Humidity => "Humidity",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        // ---
        match self {
            SensorField::Voltage => &["Voltage", "Voltaje"],
            SensorField::CurrentIna => &["CurrentINA", "CorrienteINA"],
            SensorField::Power => &["Power", "Potencia"],
            SensorField::CurrentAcs => &["CurrentACS", "CorrienteACS"],
            SensorField::Temperature => &["Temperature", "Temperatura"],
            SensorField::Humidity => &["Humidity", "Humedad"],
        }
    }

    /// Match a raw sheet header against the recognized field aliases.
    pub fn from_header(header: &str) -> Option<SensorField> {
        // ---
        let header = header.trim();
        SensorField::ALL.into_iter().find(|field| {
            field
                .aliases()
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(header))
        })
    }
}

// ---

/// One normalized reading: a resolved timestamp plus an optional typed slot
/// per recognized sensor field. Columns the loader does not recognize are
/// preserved verbatim in `extra`.
#[derive(Debug, Clone, Serialize)]
pub struct SensorRecord {
    // ---
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "Voltage", skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    #[serde(rename = "CurrentINA", skip_serializing_if = "Option::is_none")]
    pub current_ina: Option<f64>,
    #[serde(rename = "Power", skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    #[serde(rename = "CurrentACS", skip_serializing_if = "Option::is_none")]
    pub current_acs: Option<f64>,
    #[serde(rename = "Temperature", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(rename = "Humidity", skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, CellValue>,
}

impl SensorRecord {
    // ---
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        // ---
        SensorRecord {
            timestamp,
            voltage: None,
            current_ina: None,
            power: None,
            current_acs: None,
            temperature: None,
            humidity: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn field(&self, field: SensorField) -> Option<f64> {
        // ---
        match field {
            SensorField::Voltage => self.voltage,
            SensorField::CurrentIna => self.current_ina,
            SensorField::Power => self.power,
            SensorField::CurrentAcs => self.current_acs,
            SensorField::Temperature => self.temperature,
            SensorField::Humidity => self.humidity,
        }
    }

    pub fn set_field(&mut self, field: SensorField, value: Option<f64>) {
        // ---
        match field {
            SensorField::Voltage => self.voltage = value,
            SensorField::CurrentIna => self.current_ina = value,
            SensorField::Power => self.power = value,
            SensorField::CurrentAcs => self.current_acs = value,
            SensorField::Temperature => self.temperature = value,
            SensorField::Humidity => self.humidity = value,
        }
    }
}

// ---

/// The normalized, time-indexed dataset the presenter works from.
///
/// Invariant after load: every row carries a resolved timestamp (parsed from
/// the sheet or synthesized), and `columns` lists the timestamp column first
/// followed by the remaining columns in sheet order.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    // ---
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<SensorRecord>,
    /// True when no timestamp-like column existed and the time axis was
    /// generated at a fixed 10-second spacing.
    pub synthetic_time_axis: bool,
}

impl Dataset {
    // ---
    pub fn empty() -> Self {
        // ---
        Dataset {
            columns: Vec::new(),
            rows: Vec::new(),
            synthetic_time_axis: false,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Columns usable as chart series: numeric type, timestamp excluded,
    /// in sheet column order.
    pub fn numeric_columns(&self) -> Vec<String> {
        // ---
        self.columns
            .iter()
            .filter(|c| c.ty.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Extract one column as floats, row order preserved, missing values as
    /// `None`. Returns `None` if the dataset has no such column.
    pub fn series(&self, name: &str) -> Option<Vec<Option<f64>>> {
        // ---
        if !self.has_column(name) {
            return None;
        }
        let values = if let Some(field) = SensorField::from_header(name) {
            self.rows.iter().map(|r| r.field(field)).collect()
        } else {
            self.rows
                .iter()
                .map(|r| r.extra.get(name).and_then(CellValue::as_f64))
                .collect()
        };
        Some(values)
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.rows.iter().map(|r| r.timestamp).collect()
    }

    /// Mean of one numeric column, skipping missing values. `None` when the
    /// column is absent or holds no values.
    pub fn mean(&self, name: &str) -> Option<f64> {
        // ---
        let values: Vec<f64> = self.series(name)?.into_iter().flatten().collect();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Value of one column in the last row (latest = last in sheet order).
    pub fn latest(&self, name: &str) -> Option<f64> {
        // ---
        self.series(name)?.last().copied().flatten()
    }

    pub fn head(&self, n: usize) -> &[SensorRecord] {
        &self.rows[..self.rows.len().min(n)]
    }

    pub fn tail(&self, n: usize) -> &[SensorRecord] {
        &self.rows[self.rows.len().saturating_sub(n)..]
    }
}
