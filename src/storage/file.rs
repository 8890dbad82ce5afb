//! Directory-backed episode store
//!
//! Layout: `<root>/<YYYY-MM-DD>/<episode-id>.json`, one pretty-printed JSON
//! document per record. The date partition makes records discoverable by day
//! without an index. Each write goes to a temporary file first and is renamed
//! into place, so readers never observe a half-written record.

use crate::error::{EpisodicError, Result};
use crate::storage::EpisodeStore;
use crate::types::{EpisodeId, EpisodeRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const PARTITION_FORMAT: &str = "%Y-%m-%d";

/// Episode store rooted at a directory
#[derive(Debug, Clone)]
pub struct FileEpisodeStore {
    root: PathBuf,
}

impl FileEpisodeStore {
    /// Open (creating if needed) a store rooted at `root`
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or is not a directory.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            EpisodicError::Store(format!("Failed to create store directory {}: {}", root.display(), e))
        })?;

        let metadata = tokio::fs::metadata(&root).await?;
        if !metadata.is_dir() {
            return Err(EpisodicError::Store(format!(
                "Store location is not a directory: {}",
                root.display()
            )));
        }

        Ok(Self { root })
    }

    /// Open an existing store for reading; never creates anything
    ///
    /// # Errors
    ///
    /// Returns error if `root` is missing or is not a directory.
    pub async fn open_existing(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        match tokio::fs::metadata(&root).await {
            Ok(metadata) if metadata.is_dir() => Ok(Self { root }),
            Ok(_) => Err(EpisodicError::Store(format!(
                "Store location is not a directory: {}",
                root.display()
            ))),
            Err(e) => Err(EpisodicError::Store(format!(
                "Store directory {} is not readable: {}",
                root.display(),
                e
            ))),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn partition_dir(&self, date: NaiveDate) -> PathBuf {
        self.root.join(date.format(PARTITION_FORMAT).to_string())
    }

    /// Path a record is (or would be) stored at
    pub fn record_path(&self, record: &EpisodeRecord) -> PathBuf {
        self.partition_dir(record.timestamp.date_naive())
            .join(format!("{}.json", record.id))
    }

    /// Date partitions present in the store, oldest first
    pub async fn list_days(&self) -> Result<Vec<NaiveDate>> {
        let mut days = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(day) = entry
                .file_name()
                .to_str()
                .and_then(|name| NaiveDate::parse_from_str(name, PARTITION_FORMAT).ok())
            {
                days.push(day);
            }
        }
        days.sort();
        Ok(days)
    }

    /// All records for one day, ordered by timestamp
    ///
    /// Files that fail to parse are skipped with a warning.
    pub async fn list_day(&self, date: NaiveDate) -> Result<Vec<EpisodeRecord>> {
        let dir = self.partition_dir(date);
        if !tokio::fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_record(&path).await {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable episode {}: {}", path.display(), e),
            }
        }

        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    /// Fetch one record by day and id
    pub async fn get(&self, date: NaiveDate, id: EpisodeId) -> Result<EpisodeRecord> {
        let path = self.partition_dir(date).join(format!("{}.json", id));
        if !tokio::fs::try_exists(&path).await? {
            return Err(EpisodicError::EpisodeNotFound(id.to_string()));
        }
        read_record(&path).await
    }
}

async fn read_record(path: &Path) -> Result<EpisodeRecord> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

#[async_trait]
impl EpisodeStore for FileEpisodeStore {
    async fn write(&self, record: &EpisodeRecord) -> Result<()> {
        let path = self.record_path(record);
        let dir = path
            .parent()
            .ok_or_else(|| EpisodicError::Store(format!("No partition for {}", path.display())))?;
        tokio::fs::create_dir_all(dir).await?;

        let json = serde_json::to_vec_pretty(record)?;
        let tmp = path.with_extension("json.tmp");

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&json).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        debug!("Wrote episode {} to {}", record.id, path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}
