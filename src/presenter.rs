//! View-model derivation for the dashboard: summary metrics, chart traces,
//! structure/tail previews, and the fallback body shown when no data loads.
//!
//! Everything here is a pure function of a [`Dataset`]; the HTTP layer only
//! assembles these pieces, and the actual widget rendering stays in whatever
//! front end consumes the JSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::models::{ColumnInfo, Dataset, SensorRecord};

// ---

/// Fixed trace palette, cycled by selection order.
pub const CHART_PALETTE: [&str; 6] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b",
];

const HEAD_PREVIEW_ROWS: usize = 5;
const TAIL_PREVIEW_ROWS: usize = 10;

// ---

/// The four headline numbers. Absent columns stay `None` and render as "n/a".
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    // ---
    pub record_count: usize,
    pub average_voltage: Option<f64>,
    pub latest_temperature: Option<f64>,
    pub latest_humidity: Option<f64>,
}

pub fn summarize(ds: &Dataset) -> Summary {
    // ---
    Summary {
        record_count: ds.len(),
        average_voltage: ds.mean("Voltage"),
        latest_temperature: ds.latest("Temperature"),
        latest_humidity: ds.latest("Humidity"),
    }
}

/// One display tile: label plus pre-formatted value.
#[derive(Debug, Clone, Serialize)]
pub struct MetricTile {
    pub label: &'static str,
    pub value: String,
}

pub fn metric_tiles(summary: &Summary) -> Vec<MetricTile> {
    // ---
    fn fmt(value: Option<f64>, precision: usize, unit: &str) -> String {
        match value {
            Some(v) => format!("{:.*} {}", precision, v, unit),
            None => "n/a".to_owned(),
        }
    }

    vec![
        MetricTile {
            label: "Total records",
            value: summary.record_count.to_string(),
        },
        MetricTile {
            label: "Average voltage",
            value: fmt(summary.average_voltage, 2, "V"),
        },
        MetricTile {
            label: "Current temperature",
            value: fmt(summary.latest_temperature, 1, "°C"),
        },
        MetricTile {
            label: "Current humidity",
            value: fmt(summary.latest_humidity, 1, "%"),
        },
    ]
}

// ---

/// Resolve the chart selection from an optional comma-separated request.
///
/// No parameter means the default (first two numeric columns); an explicit
/// empty selection stays empty; unknown names are dropped silently.
pub fn select_series(ds: &Dataset, requested: Option<&str>) -> Vec<String> {
    // ---
    let numeric = ds.numeric_columns();
    match requested {
        None => numeric.into_iter().take(2).collect(),
        Some(csv) => csv
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter(|s| numeric.iter().any(|c| c == s))
            .map(str::to_owned)
            .collect(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Chart {
    // ---
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub traces: Vec<Trace>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Trace {
    pub name: String,
    pub color: &'static str,
    pub points: Vec<TracePoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TracePoint {
    pub t: DateTime<Utc>,
    pub y: Option<f64>,
}

/// Build the multi-series time chart. Zero selected series (or an empty
/// dataset) suppresses the chart entirely.
pub fn chart(ds: &Dataset, selected: &[String]) -> Option<Chart> {
    // ---
    if selected.is_empty() || ds.is_empty() {
        return None;
    }

    let timestamps = ds.timestamps();
    let traces = selected
        .iter()
        .enumerate()
        .filter_map(|(i, name)| {
            let values = ds.series(name)?;
            Some(Trace {
                name: name.clone(),
                color: CHART_PALETTE[i % CHART_PALETTE.len()],
                points: timestamps
                    .iter()
                    .zip(values)
                    .map(|(&t, y)| TracePoint { t, y })
                    .collect(),
            })
        })
        .collect::<Vec<_>>();

    if traces.is_empty() {
        return None;
    }

    Some(Chart {
        title: "Sensor readings over time",
        x_label: "Time",
        y_label: "Value",
        traces,
    })
}

// ---

/// Data-structure inspector: column names, inferred types, first rows.
#[derive(Debug, Clone, Serialize)]
pub struct Structure {
    pub columns: Vec<ColumnInfo>,
    pub head: Vec<SensorRecord>,
}

pub fn structure(ds: &Dataset) -> Structure {
    // ---
    Structure {
        columns: ds.columns.clone(),
        head: ds.head(HEAD_PREVIEW_ROWS).to_vec(),
    }
}

pub fn tail(ds: &Dataset) -> Vec<SensorRecord> {
    ds.tail(TAIL_PREVIEW_ROWS).to_vec()
}

// ---

/// Fallback body: the error state plus a fixed example of the record shape
/// the sheet is expected to produce, as a troubleshooting aid.
#[derive(Debug, Clone, Serialize)]
pub struct Fallback {
    // ---
    pub status: &'static str,
    pub message: String,
    pub expected_schema: ExampleSchema,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExampleSchema {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

pub fn fallback(message: impl Into<String>) -> Fallback {
    // ---
    Fallback {
        status: "error",
        message: message.into(),
        expected_schema: example_schema(),
    }
}

fn example_schema() -> ExampleSchema {
    // ---
    ExampleSchema {
        columns: vec![
            "Timestamp",
            "Voltage",
            "CurrentINA",
            "Power",
            "CurrentACS",
            "Temperature",
            "Humidity",
        ],
        rows: vec![
            vec![
                json!("2024-01-01 10:00:00"),
                json!(3.3),
                json!(150.5),
                json!(495.0),
                json!(145.0),
                json!(25.5),
                json!(60.0),
            ],
            vec![
                json!("2024-01-01 10:00:10"),
                json!(3.2),
                json!(148.2),
                json!(480.0),
                json!(143.5),
                json!(25.6),
                json!(59.8),
            ],
        ],
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::loader::normalize;
    use crate::models::CellValue;
    use crate::sheets::SheetTable;

    fn dataset(headers: &[&str], rows: Vec<Vec<CellValue>>) -> Dataset {
        // ---
        let table = SheetTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        };
        normalize(table, Utc::now()).unwrap()
    }

    fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    fn sample_dataset() -> Dataset {
        // ---
        dataset(
            &["FechaHora", "Voltaje", "Temperatura", "Humedad"],
            vec![
                vec![
                    CellValue::Text("2024-01-01 10:00:00".into()),
                    num(3.3),
                    num(25.5),
                    num(60.0),
                ],
                vec![
                    CellValue::Text("2024-01-01 10:00:10".into()),
                    num(3.2),
                    num(25.6),
                    num(59.8),
                ],
            ],
        )
    }

    #[test]
    fn test_summary_values() {
        // ---
        let summary = summarize(&sample_dataset());
        assert_eq!(summary.record_count, 2);
        assert_eq!(summary.average_voltage, Some(3.25));
        assert_eq!(summary.latest_temperature, Some(25.6));
        assert_eq!(summary.latest_humidity, Some(59.8));
    }

    #[test]
    fn test_metric_tiles_degrade_to_na() {
        // ---
        let ds = dataset(
            &["FechaHora", "Voltaje"],
            vec![vec![CellValue::Text("2024-01-01 10:00:00".into()), num(3.3)]],
        );
        let tiles = metric_tiles(&summarize(&ds));

        assert_eq!(tiles.len(), 4);
        assert_eq!(tiles[0].value, "1");
        assert_eq!(tiles[1].value, "3.30 V");
        assert_eq!(tiles[2].value, "n/a");
        assert_eq!(tiles[3].value, "n/a");
    }

    #[test]
    fn test_default_selection_is_first_two_numeric() {
        // ---
        let ds = sample_dataset();
        assert_eq!(select_series(&ds, None), vec!["Voltage", "Temperature"]);
    }

    #[test]
    fn test_explicit_empty_selection_stays_empty() {
        // ---
        let ds = sample_dataset();
        assert!(select_series(&ds, Some("")).is_empty());
    }

    #[test]
    fn test_unknown_selections_are_dropped() {
        // ---
        let ds = sample_dataset();
        assert_eq!(
            select_series(&ds, Some("Humidity,Timestamp,Nope")),
            vec!["Humidity"]
        );
    }

    #[test]
    fn test_zero_series_suppresses_chart() {
        // ---
        let ds = sample_dataset();
        assert!(chart(&ds, &[]).is_none());
    }

    #[test]
    fn test_empty_dataset_never_charts() {
        // ---
        let ds = Dataset::empty();
        assert!(chart(&ds, &["Voltage".to_owned()]).is_none());
    }

    #[test]
    fn test_chart_traces_follow_selection_order() {
        // ---
        let ds = sample_dataset();
        let selected = vec!["Temperature".to_owned(), "Voltage".to_owned()];
        let chart = chart(&ds, &selected).unwrap();

        assert_eq!(chart.traces.len(), 2);
        assert_eq!(chart.traces[0].name, "Temperature");
        assert_eq!(chart.traces[0].color, CHART_PALETTE[0]);
        assert_eq!(chart.traces[1].color, CHART_PALETTE[1]);
        assert_eq!(chart.traces[0].points.len(), 2);
        assert_eq!(chart.traces[0].points[1].y, Some(25.6));
    }

    #[test]
    fn test_palette_cycles_past_six_series() {
        // ---
        let headers = ["FechaHora", "A", "B", "C", "D", "E", "F", "G"];
        let row = vec![
            CellValue::Text("2024-01-01 10:00:00".into()),
            num(1.5),
            num(2.5),
            num(3.5),
            num(4.5),
            num(5.5),
            num(6.5),
            num(7.5),
        ];
        let ds = dataset(&headers, vec![row]);

        let selected = ds.numeric_columns();
        assert_eq!(selected.len(), 7);

        let chart = chart(&ds, &selected).unwrap();
        assert_eq!(chart.traces[6].color, CHART_PALETTE[0]);
    }

    #[test]
    fn test_structure_and_tail_previews() {
        // ---
        let ds = sample_dataset();
        let s = structure(&ds);
        assert_eq!(s.columns.len(), 4);
        assert_eq!(s.head.len(), 2);
        assert_eq!(tail(&ds).len(), 2);
    }

    #[test]
    fn test_fallback_carries_example_schema() {
        // ---
        let fb = fallback("no records");
        assert_eq!(fb.status, "error");
        assert_eq!(fb.expected_schema.columns.len(), 7);
        assert_eq!(fb.expected_schema.rows.len(), 2);
        assert_eq!(
            fb.expected_schema.columns.len(),
            fb.expected_schema.rows[0].len()
        );
    }
}
