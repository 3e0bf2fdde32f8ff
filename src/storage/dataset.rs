use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use tracing::debug;

use super::entities::{FetchResult, PersistedDataset};

const DATASET_FILE: &str = "reading_data.json";

/// Owns the data directory: the canonical dataset file plus the append-only
/// archive of raw fetches.
pub struct DatasetStore {
    data_dir: PathBuf,
}

impl DatasetStore {
    pub fn new(data_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&data_dir)?;

        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join(DATASET_FILE)
    }

    /// A missing dataset file is an empty dataset, not an error.
    pub async fn load(&self) -> Result<PersistedDataset> {
        match tokio::fs::read(self.dataset_path()).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No dataset at {:?}, starting empty", self.dataset_path());
                Ok(PersistedDataset::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The dataset is only ever replaced wholesale, never patched in place.
    pub async fn save(&self, dataset: &PersistedDataset) -> Result<()> {
        let mut buffer = serde_json::to_vec_pretty(dataset)?;
        buffer.push(b'\n');
        tokio::fs::write(self.dataset_path(), buffer).await?;
        Ok(())
    }

    /// Writes the run's raw capture next to the dataset, named by fetch time
    /// so earlier archives are never overwritten.
    pub async fn archive_fetch(&self, fetch: &FetchResult) -> Result<PathBuf> {
        let name = format!("fetch_{}.json", fetch.fetched_at.format("%Y-%m-%dT%H%M%S"));
        let path = self.data_dir.join(name);
        let mut buffer = serde_json::to_vec_pretty(fetch)?;
        buffer.push(b'\n');
        tokio::fs::write(&path, buffer).await?;
        Ok(path)
    }
}
