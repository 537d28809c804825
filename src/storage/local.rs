//! Local CSV file storage implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::RhymeRecord;
use crate::storage::CorpusStorage;

/// Append-only CSV corpus on the local filesystem.
#[derive(Debug, Clone)]
pub struct CsvStorage {
    path: PathBuf,
}

impl CsvStorage {
    /// Create a storage writing to the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize records into one CSV chunk, with the header when requested.
    fn encode(records: &[RhymeRecord], with_header: bool) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(with_header)
            .from_writer(Vec::new());
        for record in records {
            writer.serialize(record)?;
        }
        writer
            .into_inner()
            .map_err(|e| AppError::Io(e.into_error()))
    }

    /// A missing or zero-length file has no header yet.
    async fn needs_header(&self) -> Result<bool> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.len() == 0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_chunk(&self, records: &[RhymeRecord]) -> Result<usize> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = Self::encode(records, self.needs_header().await?)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        file.sync_all().await?;

        Ok(records.len())
    }
}

#[async_trait]
impl CorpusStorage for CsvStorage {
    async fn append_group(&self, head: char, records: &[RhymeRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        self.write_chunk(records).await.map_err(|e| {
            AppError::persistence(
                self.path.display().to_string(),
                format!("group {head}: {e}"),
            )
        })
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Read every record of a persisted corpus, validating each row.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<RhymeRecord>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();

    for (row, result) in reader.deserialize::<RhymeRecord>().enumerate() {
        let record = result?;
        record.validate().map_err(|e| {
            AppError::parse(format!("{} row {}: {e}", path.display(), row + 2))
        })?;
        records.push(record);
    }

    Ok(records)
}
