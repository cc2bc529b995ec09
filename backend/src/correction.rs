//! Reviewer corrections: the flag-driven label flip and the row shape that
//! gets persisted to the correction log.

use chrono::Utc;
use chrono_tz::Asia::Jakarta;
use serde::{Deserialize, Serialize};
use shared::{Label, NewsRecord};

/// Flip the detected label iff the reviewer flagged the row.
///
/// Total over all four (label, flag) combinations and pure, so re-applying
/// with the same inputs always yields the same output.
pub fn merge(detection: Label, correction: bool) -> Label {
    if correction { detection.flip() } else { detection }
}

/// Wall-clock format stored alongside each correction.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Save-time timestamp in Jakarta local time (WIB).
pub fn jakarta_timestamp() -> String {
    Utc::now()
        .with_timezone(&Jakarta)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// One persisted correction. Field order and serde renames define the CSV
/// layout of the stored object, so reordering fields here changes the wire
/// format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectedRow {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Label_id")]
    pub label_id: Option<i64>,
    #[serde(rename = "Label")]
    pub label: Option<Label>,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "Fact")]
    pub fact: String,
    #[serde(rename = "References")]
    pub references: String,
    #[serde(rename = "Classification")]
    pub classification: String,
    #[serde(rename = "Datasource")]
    pub datasource: String,
    #[serde(rename = "Result_Detection")]
    pub result_detection: Label,
    #[serde(rename = "Result_Correction")]
    pub result_correction: Label,
}

impl CorrectedRow {
    pub fn new(
        record: &NewsRecord,
        detection: Label,
        correction: bool,
        timestamp: String,
    ) -> Self {
        Self {
            timestamp,
            label_id: record.label_id,
            label: record.label,
            title: record.title.clone(),
            content: record.content.clone(),
            fact: record.fact.clone(),
            references: record.references.clone(),
            classification: record.classification.clone(),
            datasource: record.datasource.clone(),
            result_detection: detection,
            result_correction: merge(detection, correction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_matches_the_truth_table() {
        assert_eq!(merge(Label::NonHoax, true), Label::Hoax);
        assert_eq!(merge(Label::Hoax, true), Label::NonHoax);
        assert_eq!(merge(Label::Hoax, false), Label::Hoax);
        assert_eq!(merge(Label::NonHoax, false), Label::NonHoax);
    }

    #[test]
    fn merge_is_stable_under_reapplication() {
        for detection in [Label::Hoax, Label::NonHoax] {
            for flag in [true, false] {
                assert_eq!(merge(detection, flag), merge(detection, flag));
            }
        }
    }

    #[test]
    fn corrected_row_carries_the_flipped_label() {
        let record = NewsRecord {
            title: "Judul".into(),
            content: "Isi berita".into(),
            fact: "Salah".into(),
            references: "https://example.test".into(),
            classification: "Disinformasi".into(),
            datasource: "turnbackhoax".into(),
            label: Some(Label::Hoax),
            label_id: Some(1),
        };

        let flagged = CorrectedRow::new(&record, Label::NonHoax, true, "ts".into());
        assert_eq!(flagged.result_detection, Label::NonHoax);
        assert_eq!(flagged.result_correction, Label::Hoax);

        let unflagged = CorrectedRow::new(&record, Label::NonHoax, false, "ts".into());
        assert_eq!(unflagged.result_correction, Label::NonHoax);
    }

    #[test]
    fn jakarta_timestamp_has_the_stored_shape() {
        let ts = jakarta_timestamp();
        // e.g. 2024-06-01 13:45:09
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], " ");
        assert_eq!(&ts[13..14], ":");
    }
}
