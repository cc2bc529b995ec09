//! In-memory review session: the uploaded table plus the latest detection
//! results and reviewer flags. One session per process, created on upload,
//! replaced wholesale by the next upload.

use std::sync::Mutex;

use shared::{CorrectionUpdate, Label, NewsRecord, SessionRow, SessionView};

use crate::correction::merge;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("row {0} is out of range")]
    RowOutOfRange(usize),
}

#[derive(Debug, Clone)]
pub struct TableRow {
    pub record: NewsRecord,
    pub result_detection: Option<Label>,
    pub detection_error: Option<String>,
    pub correction: bool,
}

#[derive(Debug)]
pub struct DashboardSession {
    rows: Vec<TableRow>,
}

impl DashboardSession {
    pub fn new(records: Vec<NewsRecord>) -> Self {
        let rows = records
            .into_iter()
            .map(|record| TableRow {
                record,
                result_detection: None,
                detection_error: None,
                correction: false,
            })
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn records(&self) -> Vec<NewsRecord> {
        self.rows.iter().map(|r| r.record.clone()).collect()
    }

    /// Store one detection pass. Failed rows keep their previous label and
    /// carry the error message instead; all reviewer flags reset, since they
    /// referred to the previous results.
    pub fn apply_detections(&mut self, outcomes: Vec<Result<Label, String>>) {
        for (row, outcome) in self.rows.iter_mut().zip(outcomes) {
            match outcome {
                Ok(label) => {
                    row.result_detection = Some(label);
                    row.detection_error = None;
                }
                Err(message) => {
                    row.detection_error = Some(message);
                }
            }
            row.correction = false;
        }
    }

    /// Apply reviewer flag toggles. Row numbers are 1-based, matching the
    /// numbering shown in the grid.
    pub fn set_corrections(&mut self, updates: &[CorrectionUpdate]) -> Result<(), SessionError> {
        for update in updates {
            if update.row == 0 || update.row > self.rows.len() {
                return Err(SessionError::RowOutOfRange(update.row));
            }
        }
        for update in updates {
            self.rows[update.row - 1].correction = update.correction;
        }
        Ok(())
    }

    /// Rows the reviewer flagged, paired with their detection label. Rows
    /// without a detection result cannot be corrected and are skipped.
    pub fn flagged_rows(&self) -> Vec<(&NewsRecord, Label)> {
        self.rows
            .iter()
            .filter(|row| row.correction)
            .filter_map(|row| row.result_detection.map(|label| (&row.record, label)))
            .collect()
    }

    /// (detection, ground truth) pairs for rows that have both.
    pub fn evaluation_pairs(&self) -> Vec<(Label, Label)> {
        self.rows
            .iter()
            .filter_map(|row| match (row.result_detection, row.record.label) {
                (Some(detection), Some(truth)) => Some((detection, truth)),
                _ => None,
            })
            .collect()
    }

    /// Snapshot for the grid. The model shown is the caller's current
    /// selection; the session itself does not pin one, so switching models
    /// between runs takes effect on the next detection.
    pub fn view(&self, model: &str) -> SessionView {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| SessionRow {
                index: i + 1,
                record: row.record.clone(),
                result_detection: row.result_detection,
                detection_error: row.detection_error.clone(),
                correction: row.correction,
                result_correction: row
                    .result_detection
                    .map(|label| merge(label, row.correction)),
            })
            .collect();
        SessionView {
            model: model.to_string(),
            rows,
        }
    }
}

/// Application state handed to every handler: the chosen model and the
/// current session, both behind their own locks.
pub struct SessionState {
    pub selected_model: Mutex<String>,
    pub session: Mutex<Option<DashboardSession>>,
}

impl SessionState {
    pub fn new(default_model: &str) -> Self {
        Self {
            selected_model: Mutex::new(default_model.to_string()),
            session: Mutex::new(None),
        }
    }
}
