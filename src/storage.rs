//! The on-disk image tree: `<base>/<category>/<image_type>/<image_type>_<category>_<n>.jpg`

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::catalog::{Category, ImageType};
use crate::error::FetchError;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// What's already saved for one category/type pair.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PairListing {
    /// Number of image files in the directory
    pub count: u32,
    /// Highest `n` among files named like ours
    pub max_index: u32,
}

impl PairListing {
    /// The first index that can't collide with anything already saved.
    pub fn next_index(&self) -> u32 {
        self.count.max(self.max_index) + 1
    }
}

/// Root of the saved image tree.
#[derive(Clone, Debug)]
pub struct ImageStore {
    base: PathBuf,
}

impl ImageStore {
    /// Store rooted at `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// The root directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Directory holding one pair's images.
    pub fn pair_dir(&self, category: &Category, image_type: &ImageType) -> PathBuf {
        self.base.join(category.as_str()).join(image_type.as_str())
    }

    /// File name for the `index`th image of a pair.
    pub fn file_name(image_type: &ImageType, category: &Category, index: u32) -> String {
        format!("{image_type}_{category}_{index}.jpg")
    }

    /// Creates the pair directory if it's missing.
    pub async fn ensure_dir(
        &self,
        category: &Category,
        image_type: &ImageType,
    ) -> Result<PathBuf, FetchError> {
        let dir = self.pair_dir(category, image_type);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Counts saved images and finds the highest used index. A missing directory is empty.
    pub async fn scan(
        &self,
        category: &Category,
        image_type: &ImageType,
    ) -> Result<PairListing, FetchError> {
        let dir = self.pair_dir(category, image_type);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(PairListing::default()),
            Err(err) => return Err(err.into()),
        };

        let prefix = format!("{image_type}_{category}_");
        let mut listing = PairListing::default();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if name.starts_with('.') || !is_image_file(&path) {
                continue;
            }
            listing.count += 1;
            let index = Path::new(name)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.strip_prefix(&prefix))
                .and_then(|n| n.parse::<u32>().ok());
            if let Some(index) = index {
                listing.max_index = listing.max_index.max(index);
            }
        }
        Ok(listing)
    }

    /// Number of images already saved for a pair.
    pub async fn count_existing(
        &self,
        category: &Category,
        image_type: &ImageType,
    ) -> Result<u32, FetchError> {
        Ok(self.scan(category, image_type).await?.count)
    }

    /// Writes `bytes` as image `index` of the pair. Never replaces an existing file, and
    /// a crash mid-write only ever leaves a hidden `.part` file behind.
    pub async fn save(
        &self,
        category: &Category,
        image_type: &ImageType,
        index: u32,
        bytes: &[u8],
    ) -> Result<PathBuf, FetchError> {
        let dir = self.ensure_dir(category, image_type).await?;
        let name = Self::file_name(image_type, category, index);
        let target = dir.join(&name);
        if tokio::fs::try_exists(&target).await? {
            return Err(FetchError::Conflict(format!(
                "{} already exists",
                target.display()
            )));
        }
        let temp = dir.join(format!(".{name}.part"));
        write_then_rename(&temp, &target, bytes).await?;
        debug!("Saved {}", target.display());
        Ok(target)
    }

    /// Saves at the next free index and returns that index.
    pub async fn save_next(
        &self,
        category: &Category,
        image_type: &ImageType,
        bytes: &[u8],
    ) -> Result<(u32, PathBuf), FetchError> {
        let mut index = self.scan(category, image_type).await?.next_index();
        loop {
            match self.save(category, image_type, index, bytes).await {
                Ok(path) => return Ok((index, path)),
                Err(FetchError::Conflict(_)) => index += 1,
                Err(err) => return Err(err),
            }
        }
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Writes to `temp` and renames it over `target`, cleaning up on failure.
pub(crate) async fn write_then_rename(
    temp: &Path,
    target: &Path,
    bytes: &[u8],
) -> Result<(), FetchError> {
    if let Err(err) = tokio::fs::write(temp, bytes).await {
        let _ = tokio::fs::remove_file(temp).await;
        return Err(err.into());
    }
    if let Err(err) = tokio::fs::rename(temp, target).await {
        let _ = tokio::fs::remove_file(temp).await;
        return Err(err.into());
    }
    Ok(())
}
