//! CSV export of a user's intake history.

use std::path::Path;

use crate::types::IntakeEvent;
use crate::Result;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    taken_at: String,
    amount_ml: f64,
    note: Option<String>,
}

impl From<&IntakeEvent> for CsvRow {
    fn from(event: &IntakeEvent) -> Self {
        CsvRow {
            id: event.id.to_string(),
            taken_at: event.taken_at.to_rfc3339(),
            amount_ml: event.amount_ml,
            note: event.note.clone(),
        }
    }
}

/// Write intake events to a CSV file, oldest first
///
/// Returns the number of rows written. An existing file is replaced.
pub fn export_events(events: &[IntakeEvent], path: &Path) -> Result<usize> {
    let mut sorted: Vec<&IntakeEvent> = events.iter().collect();
    sorted.sort_by_key(|e| e.taken_at);

    let mut writer = csv::Writer::from_path(path)?;
    if sorted.is_empty() {
        // serialize() emits headers lazily, so write them ourselves
        writer.write_record(["id", "taken_at", "amount_ml", "note"])?;
    }
    for event in &sorted {
        writer.serialize(CsvRow::from(*event))?;
    }
    writer.flush()?;

    tracing::info!("Exported {} intake events to {:?}", sorted.len(), path);
    Ok(sorted.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use uuid::Uuid;

    fn event_at(offset_min: i64, amount: f64, note: Option<&str>) -> IntakeEvent {
        let base: DateTime<Utc> = DateTime::parse_from_rfc3339("2024-06-01T20:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        IntakeEvent {
            id: Uuid::new_v4(),
            taken_at: base + Duration::minutes(offset_min),
            amount_ml: amount,
            note: note.map(Into::into),
        }
    }

    #[test]
    fn export_writes_headers_and_rows_oldest_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.csv");

        // Newest-first input, as held by the event log
        let events = vec![event_at(60, 3.0, Some("second")), event_at(0, 2.0, None)];
        let written = export_events(&events, &path).unwrap();
        assert_eq!(written, 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("id,taken_at,amount_ml,note"));
        let first_row = lines.next().unwrap();
        assert!(first_row.contains("2024-06-01T20:00:00"));
        assert!(first_row.ends_with(",2.0,"));
        let second_row = lines.next().unwrap();
        assert!(second_row.contains("2024-06-01T21:00:00"));
        assert!(second_row.ends_with(",3.0,second"));
    }

    #[test]
    fn export_of_empty_history_writes_headers_only() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("empty.csv");

        let written = export_events(&[], &path).unwrap();
        assert_eq!(written, 0);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), "id,taken_at,amount_ml,note");
    }
}
