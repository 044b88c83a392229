//! Dataset loading: fetch the sheet, coerce the loosely-typed table into a
//! typed time-indexed [`Dataset`], and memoize the outcome for a fixed
//! window so render cycles do not hammer the remote API.
//!
//! Every failure (credentials, network, malformed sheet) is caught at this
//! boundary and surfaced as [`LoadOutcome::Failed`] with a display message;
//! nothing downstream ever sees an error type.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::models::{
    CellValue, ColumnInfo, ColumnType, Dataset, SensorField, SensorRecord, TIMESTAMP_COLUMN,
};
use crate::sheets::{SheetTable, SheetsClient};

// ---

/// Headers accepted as the time column, tried in order: the combined
/// date-time names first, then the plain `Timestamp` fallback.
const TIMESTAMP_ALIASES: &[&str] = &["DateTime", "FechaHora", "Timestamp"];

/// Spacing of the synthesized time axis when the sheet has no time column.
const SYNTHETIC_STEP_SECS: i64 = 10;

/// Text formats tried when parsing timestamp cells, before RFC 3339.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

// ---

/// What a load attempt produced. A legitimately empty sheet is `Loaded` with
/// an empty dataset, distinguishable from `Failed`; the dashboard sends both
/// to the fallback view but with different messages.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Loaded(Dataset),
    Failed { message: String },
}

impl LoadOutcome {
    pub fn dataset(&self) -> Option<&Dataset> {
        // ---
        match self {
            LoadOutcome::Loaded(ds) => Some(ds),
            LoadOutcome::Failed { .. } => None,
        }
    }
}

// ---

/// Single-slot memo: one cached outcome plus the instant it was fetched.
#[derive(Default)]
struct Memo {
    slot: Option<MemoSlot>,
}

struct MemoSlot {
    outcome: LoadOutcome,
    fetched_at: Instant,
}

impl Memo {
    // ---
    fn get(&self, now: Instant, ttl: Duration) -> Option<LoadOutcome> {
        // ---
        self.slot
            .as_ref()
            .filter(|s| now.duration_since(s.fetched_at) < ttl)
            .map(|s| s.outcome.clone())
    }

    fn put(&mut self, outcome: LoadOutcome, fetched_at: Instant) {
        // ---
        self.slot = Some(MemoSlot {
            outcome,
            fetched_at,
        });
    }

    fn clear(&mut self) {
        self.slot = None;
    }
}

// ---

/// Fetches and normalizes the remote sheet, memoizing the result.
///
/// The memo lock is held across the fetch, so concurrent cache misses
/// serialize into a single remote call whose result all callers share.
pub struct Loader {
    // ---
    sheets: SheetsClient,
    ttl: Duration,
    memo: Mutex<Memo>,
}

impl Loader {
    // ---
    pub fn new(sheets: SheetsClient, ttl: Duration) -> Self {
        // ---
        Loader {
            sheets,
            ttl,
            memo: Mutex::new(Memo::default()),
        }
    }

    /// Memoized load. Success and failure are cached alike for the full
    /// window; `refresh` is the escape hatch.
    pub async fn load(&self) -> LoadOutcome {
        // ---
        let mut memo = self.memo.lock().await;
        if let Some(outcome) = memo.get(Instant::now(), self.ttl) {
            debug!("Returning memoized dataset");
            return outcome;
        }

        debug!("Memo miss, fetching from remote sheet");
        let outcome = self.fetch_outcome().await;
        memo.put(outcome.clone(), Instant::now());
        outcome
    }

    /// Manual refresh: drop the memo and force a fresh fetch.
    pub async fn refresh(&self) -> LoadOutcome {
        // ---
        let mut memo = self.memo.lock().await;
        memo.clear();

        info!("Manual refresh requested, fetching from remote sheet");
        let outcome = self.fetch_outcome().await;
        memo.put(outcome.clone(), Instant::now());
        outcome
    }

    async fn fetch_outcome(&self) -> LoadOutcome {
        // ---
        match self.try_fetch().await {
            Ok(ds) => {
                info!("Loaded {} records from sheet", ds.len());
                LoadOutcome::Loaded(ds)
            }
            Err(e) => {
                error!("Failed to load sensor data: {:#}", e);
                LoadOutcome::Failed {
                    message: format!("{:#}", e),
                }
            }
        }
    }

    async fn try_fetch(&self) -> Result<Dataset> {
        // ---
        let table = self.sheets.fetch_table().await?;
        normalize(table, Utc::now())
    }
}

// ---

/// Coerce the raw sheet table into a typed dataset.
///
/// Resolves the time column by alias (synthesizing an evenly-spaced axis
/// ending at `fetched_at` when none exists), maps recognized sensor columns
/// onto the typed record slots, and preserves the rest as extra columns with
/// inferred types.
pub fn normalize(table: SheetTable, fetched_at: DateTime<Utc>) -> Result<Dataset> {
    // ---
    if table.headers.is_empty() {
        return Ok(Dataset::empty());
    }

    let ts_index = resolve_timestamp_column(&table.headers);
    let row_count = table.rows.len();

    let timestamps: Vec<DateTime<Utc>> = match ts_index {
        Some(idx) => table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                parse_timestamp(&row[idx])
                    .with_context(|| format!("row {}: bad timestamp cell", i + 2))
            })
            .collect::<Result<_>>()?,
        None => synthesize_timestamps(row_count, fetched_at),
    };

    let mut rows: Vec<SensorRecord> = timestamps.into_iter().map(SensorRecord::new).collect();

    let mut columns = vec![ColumnInfo {
        name: TIMESTAMP_COLUMN.to_owned(),
        ty: ColumnType::Timestamp,
    }];

    for (col, header) in table.headers.iter().enumerate() {
        if Some(col) == ts_index || header.is_empty() {
            continue;
        }

        let cells: Vec<&CellValue> = table.rows.iter().map(|row| &row[col]).collect();
        let field = SensorField::from_header(header);
        let name = field.map(|f| f.name().to_owned()).unwrap_or_else(|| header.clone());

        columns.push(ColumnInfo {
            name: name.clone(),
            ty: infer_column_type(&cells),
        });

        for (record, raw) in rows.iter_mut().zip(&table.rows) {
            match field {
                Some(f) => record.set_field(f, raw[col].as_f64()),
                None => {
                    record.extra.insert(name.clone(), raw[col].clone());
                }
            }
        }
    }

    Ok(Dataset {
        columns,
        rows,
        synthetic_time_axis: ts_index.is_none(),
    })
}

/// First header matching a timestamp alias, alias priority over position.
fn resolve_timestamp_column(headers: &[String]) -> Option<usize> {
    // ---
    TIMESTAMP_ALIASES.iter().find_map(|alias| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(alias))
    })
}

/// Evenly-spaced fallback axis: N strictly increasing instants 10 s apart,
/// ending at the fetch time.
fn synthesize_timestamps(count: usize, fetched_at: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    // ---
    (0..count)
        .map(|i| {
            let back = (count - 1 - i) as i64 * SYNTHETIC_STEP_SECS;
            fetched_at - chrono::Duration::seconds(back)
        })
        .collect()
}

/// Parse one timestamp cell. Text cells try the known formats then RFC 3339;
/// numeric cells are taken as Unix epoch seconds. Anything else fails the
/// load, matching the all-or-nothing contract of the time axis.
fn parse_timestamp(cell: &CellValue) -> Result<DateTime<Utc>> {
    // ---
    match cell {
        CellValue::Text(s) => {
            let s = s.trim();
            for fmt in TIMESTAMP_FORMATS {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Ok(naive.and_utc());
                }
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(dt.with_timezone(&Utc));
            }
            bail!("unrecognized timestamp format: '{}'", s)
        }
        CellValue::Number(n) => DateTime::from_timestamp(*n as i64, 0)
            .ok_or_else(|| anyhow::anyhow!("epoch timestamp out of range: {}", n)),
        CellValue::Empty => bail!("empty timestamp cell"),
        CellValue::Bool(_) => bail!("boolean value in timestamp column"),
    }
}

/// Infer a column type from its cells: numeric if every non-empty cell
/// coerces, integer if those values are all whole, text otherwise.
fn infer_column_type(cells: &[&CellValue]) -> ColumnType {
    // ---
    let mut saw_value = false;
    let mut all_integer = true;

    for cell in cells.iter().filter(|c| !c.is_empty()) {
        match cell.as_f64() {
            Some(v) => {
                saw_value = true;
                if v.fract() != 0.0 {
                    all_integer = false;
                }
            }
            None => return ColumnType::Text,
        }
    }

    if !saw_value {
        ColumnType::Text
    } else if all_integer {
        ColumnType::Integer
    } else {
        ColumnType::Float
    }
}
