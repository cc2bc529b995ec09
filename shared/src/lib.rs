use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Classification label produced by the detector and persisted in corrections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum Label {
    #[serde(rename = "HOAX")]
    #[strum(serialize = "HOAX")]
    Hoax,
    #[serde(rename = "NON-HOAX")]
    #[strum(serialize = "NON-HOAX")]
    NonHoax,
}

impl Label {
    pub fn flip(self) -> Self {
        match self {
            Label::Hoax => Label::NonHoax,
            Label::NonHoax => Label::Hoax,
        }
    }
}

/// One news item as uploaded by the reviewer.
///
/// Field names follow the CSV header of the upload format, so the same
/// struct drives both the csv codec and the JSON API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsRecord {
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
    #[serde(rename = "Label")]
    pub label: Option<Label>,
    #[serde(rename = "Label_id")]
    pub label_id: Option<i64>,
}

/// One row of the editable session table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRow {
    pub index: usize,
    #[serde(flatten)]
    pub record: NewsRecord,
    pub result_detection: Option<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_error: Option<String>,
    pub correction: bool,
    /// Preview of the label that would be persisted for this row.
    pub result_correction: Option<Label>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub model: String,
    pub rows: Vec<SessionRow>,
}

/// Binary confusion counts with HOAX as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

/// Model performance over the rows that carry both a ground-truth label and
/// a detection result. Undefined ratios are reported as 0.0, never NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
    pub confusion: ConfusionCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectSingleRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectSingleResponse {
    pub model: String,
    pub label: Label,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectModelRequest {
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelListResponse {
    pub models: Vec<String>,
    pub selected: Option<String>,
}

/// Reviewer toggle for one row of the session table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionUpdate {
    pub row: usize,
    pub correction: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResponse {
    pub appended: usize,
    pub object: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn label_round_trips_through_strings() {
        assert_eq!(Label::from_str("HOAX").unwrap(), Label::Hoax);
        assert_eq!(Label::from_str("NON-HOAX").unwrap(), Label::NonHoax);
        assert_eq!(Label::Hoax.to_string(), "HOAX");
        assert_eq!(Label::NonHoax.to_string(), "NON-HOAX");
        assert!(Label::from_str("hoax").is_err());
    }

    #[test]
    fn label_serde_uses_wire_names() {
        assert_eq!(serde_json::to_string(&Label::Hoax).unwrap(), "\"HOAX\"");
        assert_eq!(
            serde_json::from_str::<Label>("\"NON-HOAX\"").unwrap(),
            Label::NonHoax
        );
    }

    #[test]
    fn confusion_counts_serialize_without_the_raw_identifier_suffix() {
        let counts = ConfusionCounts {
            tp: 1,
            tn: 2,
            fp: 3,
            fn_: 4,
        };
        let json = serde_json::to_string(&counts).unwrap();
        assert!(json.contains("\"fn\":4"));
        assert!(!json.contains("fn_"));
        let back: ConfusionCounts = serde_json::from_str(&json).unwrap();
        assert_eq!(back, counts);
    }

    #[test]
    fn flip_is_an_involution() {
        assert_eq!(Label::Hoax.flip(), Label::NonHoax);
        assert_eq!(Label::NonHoax.flip(), Label::Hoax);
        assert_eq!(Label::Hoax.flip().flip(), Label::Hoax);
    }
}
