//! Medication snapshot decoding.
//!
//! Callers read the files; this module turns CSV or JSON text into
//! [`MedicationRecord`]s and checks record invariants.

use std::collections::HashSet;

use crate::config::{ColumnMapping, SnapshotFormat};
use crate::error::ReconError;
use crate::model::{MedicationRecord, MedicationSource};

pub fn parse_records(
    source: MedicationSource,
    data: &str,
    format: SnapshotFormat,
    columns: &ColumnMapping,
) -> Result<Vec<MedicationRecord>, ReconError> {
    match format {
        SnapshotFormat::Csv => load_csv_records(source, data, columns),
        SnapshotFormat::Json => load_json_records(source, data),
    }
}

/// Decode a CSV snapshot.
///
/// `id` and `display_name` columns are required. Dose, unit, route and
/// frequency columns are optional; absent columns and empty cells become `None`.
pub fn load_csv_records(
    source: MedicationSource,
    csv_data: &str,
    columns: &ColumnMapping,
) -> Result<Vec<MedicationRecord>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| parse_error(source, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let position = |name: &str| headers.iter().position(|h| h == name);
    let required = |name: &str| -> Result<usize, ReconError> {
        position(name).ok_or_else(|| ReconError::MissingColumn {
            source: source.to_string(),
            column: name.into(),
        })
    };

    let id_idx = required(columns.id.as_str())?;
    let name_idx = required(columns.display_name.as_str())?;
    let dose_idx = position(columns.dose.as_str());
    let unit_idx = position(columns.unit.as_str());
    let route_idx = position(columns.route.as_str());
    let frequency_idx = position(columns.frequency.as_str());

    let mut records = Vec::new();

    for row in reader.records() {
        let row = row.map_err(|e| parse_error(source, e))?;
        let cell = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| row.get(i))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        records.push(MedicationRecord {
            id: row.get(id_idx).unwrap_or("").to_string(),
            display_name: row.get(name_idx).unwrap_or("").to_string(),
            dose: cell(dose_idx),
            unit: cell(unit_idx),
            route: cell(route_idx),
            frequency: cell(frequency_idx),
            source,
        });
    }

    Ok(records)
}

/// Decode a JSON array of records. Each record's `source` is forced to the
/// list it was loaded into.
pub fn load_json_records(source: MedicationSource, json: &str) -> Result<Vec<MedicationRecord>, ReconError> {
    let mut records: Vec<MedicationRecord> =
        serde_json::from_str(json).map_err(|e| parse_error(source, e))?;
    for record in &mut records {
        record.source = source;
    }
    Ok(records)
}

/// Enforce record invariants: non-blank display name, non-blank id, and ids
/// unique within the list.
pub fn validate_records(source: MedicationSource, records: &[MedicationRecord]) -> Result<(), ReconError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(records.len());
    for record in records {
        if record.id.trim().is_empty() {
            return Err(ReconError::SnapshotParse {
                source: source.to_string(),
                message: format!("record '{}' has a blank id", record.display_name),
            });
        }
        if record.display_name.trim().is_empty() {
            return Err(ReconError::MissingDisplayName {
                source: source.to_string(),
                record_id: record.id.clone(),
            });
        }
        if !seen.insert(record.id.as_str()) {
            return Err(ReconError::DuplicateRecord {
                source: source.to_string(),
                record_id: record.id.clone(),
            });
        }
    }
    Ok(())
}

fn parse_error(source: MedicationSource, e: impl std::fmt::Display) -> ReconError {
    ReconError::SnapshotParse {
        source: source.to_string(),
        message: e.to_string(),
    }
}
