//! Append-to-object persistence for reviewer corrections.
//!
//! The log is one CSV object with a fixed header. Appending is a
//! read-modify-write cycle guarded by a conditional put on the object
//! version, retried a bounded number of times, so two concurrent saves
//! cannot silently drop each other's rows.

use std::sync::Arc;

use crate::correction::CorrectedRow;
use crate::storage::blob_store::{BlobStore, StorageError};

/// Fixed object name, kept from the retraining pipeline this feeds.
pub const CORRECTION_OBJECT: &str = "koreksi_pengguna_file.csv";

/// Column order of the stored object. Must stay in sync with the serde
/// renames on `CorrectedRow`.
pub const HEADER: [&str; 11] = [
    "Timestamp",
    "Label_id",
    "Label",
    "Title",
    "Content",
    "Fact",
    "References",
    "Classification",
    "Datasource",
    "Result_Detection",
    "Result_Correction",
];

const MAX_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct CorrectionLog {
    store: Arc<dyn BlobStore>,
    object: String,
}

impl CorrectionLog {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            object: CORRECTION_OBJECT.to_string(),
        }
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    /// Append `rows` after all existing rows, creating the object if absent.
    /// Returns the number of rows appended.
    pub async fn append(&self, rows: &[CorrectedRow]) -> Result<usize, StorageError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut attempt = 0;
        loop {
            attempt += 1;

            let (mut all_rows, expected) = match self.store.fetch(&self.object).await? {
                Some((bytes, version)) => (decode(&bytes)?, Some(version)),
                None => (Vec::new(), None),
            };
            let existing = all_rows.len();
            all_rows.extend(rows.iter().cloned());

            let body = encode(&all_rows)?;
            match self
                .store
                .put(&self.object, body, "text/csv", expected.as_ref())
                .await
            {
                Ok(()) => {
                    log::info!(
                        "appended {} correction rows to {} ({} existing)",
                        rows.len(),
                        self.object,
                        existing
                    );
                    return Ok(rows.len());
                }
                Err(StorageError::PreconditionFailed(_)) if attempt < MAX_ATTEMPTS => {
                    log::warn!(
                        "{} changed during save, retrying (attempt {attempt})",
                        self.object
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}

pub fn decode(bytes: &[u8]) -> Result<Vec<CorrectedRow>, StorageError> {
    let mut reader = csv::Reader::from_reader(bytes);
    reader
        .deserialize()
        .collect::<Result<Vec<CorrectedRow>, _>>()
        .map_err(|e| StorageError::Malformed(e.to_string()))
}

pub fn encode(rows: &[CorrectedRow]) -> Result<Vec<u8>, StorageError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(HEADER)
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| StorageError::Backend(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::blob_store::memory::InMemoryBlobStore;
    use crate::storage::blob_store::Version;
    use async_trait::async_trait;
    use shared::Label;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn row(title: &str, detection: Label, corrected: Label) -> CorrectedRow {
        CorrectedRow {
            timestamp: "2024-06-01 10:00:00".into(),
            label_id: Some(1),
            label: Some(Label::Hoax),
            title: title.into(),
            content: format!("isi {title}"),
            fact: "Salah".into(),
            references: "https://ref.test".into(),
            classification: "Disinformasi".into(),
            datasource: "twitter".into(),
            result_detection: detection,
            result_correction: corrected,
        }
    }

    #[actix_web::test]
    async fn creates_the_object_with_header_and_rows() {
        let store = Arc::new(InMemoryBlobStore::new());
        let log = CorrectionLog::new(store.clone());

        let appended = log
            .append(&[row("a", Label::NonHoax, Label::Hoax)])
            .await
            .unwrap();
        assert_eq!(appended, 1);

        let raw = store.raw(CORRECTION_OBJECT).unwrap();
        let text = String::from_utf8(raw).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), HEADER.join(","));
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("NON-HOAX,HOAX"));
    }

    #[actix_web::test]
    async fn preserves_existing_rows_in_order() {
        let store = Arc::new(InMemoryBlobStore::new());
        let log = CorrectionLog::new(store.clone());

        let first: Vec<_> = (0..3)
            .map(|i| row(&format!("m{i}"), Label::Hoax, Label::NonHoax))
            .collect();
        log.append(&first).await.unwrap();

        let second = vec![
            row("n0", Label::NonHoax, Label::Hoax),
            row("n1", Label::Hoax, Label::NonHoax),
        ];
        log.append(&second).await.unwrap();

        let stored = decode(&store.raw(CORRECTION_OBJECT).unwrap()).unwrap();
        assert_eq!(stored.len(), 5);
        let titles: Vec<_> = stored.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["m0", "m1", "m2", "n0", "n1"]);
        assert_eq!(stored[..3], first[..]);
    }

    #[actix_web::test]
    async fn appending_nothing_writes_nothing() {
        let store = Arc::new(InMemoryBlobStore::new());
        let log = CorrectionLog::new(store.clone());

        assert_eq!(log.append(&[]).await.unwrap(), 0);
        assert!(!store.exists(CORRECTION_OBJECT).await.unwrap());
    }

    #[actix_web::test]
    async fn malformed_stored_object_is_reported_not_overwritten() {
        let store = Arc::new(InMemoryBlobStore::new());
        store.seed(CORRECTION_OBJECT, b"not,a,valid\nheader".to_vec());
        let log = CorrectionLog::new(store.clone());

        let err = log
            .append(&[row("a", Label::Hoax, Label::Hoax)])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Malformed(_)));
        assert_eq!(store.raw(CORRECTION_OBJECT).unwrap(), b"not,a,valid\nheader");
    }

    /// Fails the first conditional put as if a concurrent writer won, then
    /// delegates to the inner store.
    struct ContendedStore {
        inner: InMemoryBlobStore,
        raced: AtomicBool,
    }

    #[async_trait]
    impl BlobStore for ContendedStore {
        async fn fetch(&self, key: &str) -> Result<Option<(Vec<u8>, Version)>, StorageError> {
            self.inner.fetch(key).await
        }

        async fn put(
            &self,
            key: &str,
            bytes: Vec<u8>,
            content_type: &str,
            expected: Option<&Version>,
        ) -> Result<(), StorageError> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                // Another writer slipped in a row between fetch and put.
                let winner = encode(&[row("intruder", Label::Hoax, Label::NonHoax)])?;
                self.inner.put(key, winner, content_type, expected).await?;
                return Err(StorageError::PreconditionFailed(key.to_string()));
            }
            self.inner.put(key, bytes, content_type, expected).await
        }

        async fn exists(&self, key: &str) -> Result<bool, StorageError> {
            self.inner.exists(key).await
        }
    }

    #[actix_web::test]
    async fn lost_race_retries_and_keeps_both_writers_rows() {
        let store = Arc::new(ContendedStore {
            inner: InMemoryBlobStore::new(),
            raced: AtomicBool::new(false),
        });
        let log = CorrectionLog::new(store.clone());

        log.append(&[row("ours", Label::NonHoax, Label::Hoax)])
            .await
            .unwrap();

        let stored = decode(&store.inner.raw(CORRECTION_OBJECT).unwrap()).unwrap();
        let titles: Vec<_> = stored.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["intruder", "ours"]);
    }
}
