//! JSON export of the dashboard state.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use stationwatch_core::{OutageEvent, Snapshot, StationStatus};

const STATUSES: [StationStatus; 4] = [
    StationStatus::Ok,
    StationStatus::Invalid,
    StationStatus::Stale,
    StationStatus::Offline,
];

/// Build the export document for a snapshot and the outage log.
pub fn build_export(snapshot: &Snapshot, outages: &[OutageEvent]) -> Value {
    let counts = snapshot.count_by_status();

    let mut summary = Map::new();
    summary.insert("taken_at".to_string(), json!(snapshot.taken_at.to_rfc3339()));
    summary.insert("total_stations".to_string(), json!(snapshot.len()));
    for status in STATUSES {
        summary.insert(
            status.label().to_lowercase(),
            json!(counts.get(&status).copied().unwrap_or(0)),
        );
    }
    summary.insert(
        "readings_total".to_string(),
        json!(snapshot.iter().map(|s| s.readings_total).sum::<u64>()),
    );
    summary.insert(
        "open_outages".to_string(),
        json!(outages.iter().filter(|o| o.is_open()).count()),
    );

    let outages: Vec<Value> = outages
        .iter()
        .map(|o| {
            json!({
                "station_id": o.station_id,
                "start": o.start.to_rfc3339(),
                "end": o.end.map(|end| end.to_rfc3339()),
                "duration_secs": o.duration(snapshot.taken_at).num_milliseconds() as f64 / 1000.0,
            })
        })
        .collect();

    json!({
        "summary": Value::Object(summary),
        "stations": snapshot.stations,
        "outages": outages,
    })
}

/// Write the export document as pretty JSON.
pub fn write_export(path: &Path, snapshot: &Snapshot, outages: &[OutageEvent]) -> Result<()> {
    let export = build_export(snapshot, outages);
    let text = serde_json::to_string_pretty(&export)?;

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(text.as_bytes())?;
    file.write_all(b"\n")?;

    Ok(())
}
