//! Persisted per-pair saved counts, so repeated runs can pick up where they left off.
//!
//! The file looks like `{ "real": { "dogs": 6 }, "ai": {} }`.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::catalog::{Catalog, Category, ImageType};
use crate::error::FetchError;
use crate::storage::write_then_rename;

/// Saved counts by image type, then category.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Progress(BTreeMap<String, BTreeMap<String, u32>>);

impl Progress {
    fn ensure_types(&mut self, catalog: &Catalog) {
        for image_type in catalog.image_types() {
            self.0.entry(image_type.to_string()).or_default();
        }
    }

    /// Saved count for a pair, zero if unknown.
    pub fn get(&self, image_type: &ImageType, category: &Category) -> u32 {
        self.0
            .get(image_type.as_str())
            .and_then(|categories| categories.get(category.as_str()))
            .copied()
            .unwrap_or(0)
    }

    /// Records what's on disk for a pair, capped at the target. Returns the stored value.
    pub fn record(
        &mut self,
        image_type: &ImageType,
        category: &Category,
        on_disk: u32,
        target: u32,
    ) -> u32 {
        let value = on_disk.min(target);
        self.0
            .entry(image_type.to_string())
            .or_default()
            .insert(category.to_string(), value);
        value
    }

    /// Sum over every pair.
    pub fn total(&self) -> u32 {
        self.0.values().flat_map(|categories| categories.values()).sum()
    }

    /// Reads the progress file; a missing file is zero progress.
    pub async fn load(path: &Path, catalog: &Catalog) -> Result<Self, FetchError> {
        let mut progress = match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice::<Progress>(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("No progress file at {}, starting fresh", path.display());
                Progress::default()
            }
            Err(err) => return Err(err.into()),
        };
        progress.ensure_types(catalog);
        Ok(progress)
    }

    /// Writes the progress file atomically, pretty printed.
    pub async fn save(&self, path: &Path) -> Result<(), FetchError> {
        let bytes = serde_json::to_vec_pretty(self)?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut temp = path.as_os_str().to_owned();
        temp.push(".tmp");
        write_then_rename(Path::new(&temp), path, &bytes).await
    }
}

/// Progress plus the file it lives in, shared between the run driver and web handlers.
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    progress: Mutex<Progress>,
}

impl ProgressStore {
    /// Loads (or starts) the progress file at `path`.
    pub async fn open(path: impl Into<PathBuf>, catalog: &Catalog) -> Result<Self, FetchError> {
        let path = path.into();
        let progress = Progress::load(&path, catalog).await?;
        info!(
            "Loaded progress from {} ({} images recorded)",
            path.display(),
            progress.total()
        );
        Ok(Self {
            path,
            progress: Mutex::new(progress),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current progress.
    pub async fn snapshot(&self) -> Progress {
        self.progress.lock().await.clone()
    }

    /// Records a pair's on-disk count and persists the whole document.
    pub async fn record(
        &self,
        image_type: &ImageType,
        category: &Category,
        on_disk: u32,
        target: u32,
    ) -> Result<u32, FetchError> {
        let mut progress = self.progress.lock().await;
        let value = progress.record(image_type, category, on_disk, target);
        progress.save(&self.path).await?;
        Ok(value)
    }
}
