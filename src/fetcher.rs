//! The quota-driven fetch loop.
//!
//! For one category/type pair: work out how many images are missing, pull a batch of
//! candidates, and walk it asking the decider about each one until the quota is met, the
//! batch runs out, or the decider says skip/quit. The run driver does that for every
//! pair and keeps the progress file in step with what is actually on disk.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::candidate::{Candidate, CandidateSummary};
use crate::catalog::{Catalog, Category, ImageType};
use crate::constants::{DEFAULT_BATCH_MULTIPLIER, DEFAULT_DOWNLOAD_DELAY, DEFAULT_TARGET_COUNT};
use crate::decision::{Decider, Decision};
use crate::error::FetchError;
use crate::normalize::{NormalizeOptions, normalize_image_blocking};
use crate::progress::ProgressStore;
use crate::retrieve::Retriever;
use crate::sources::CandidateSource;
use crate::storage::ImageStore;

/// Tunables for a fetch run.
#[derive(Clone, Debug)]
pub struct FetchConfig {
    /// Wanted images per category/type pair
    pub target_count: u32,
    /// Candidates requested per missing image
    pub batch_multiplier: u32,
    /// Pause after every download attempt
    pub download_delay: Duration,
    /// Saved image geometry and quality
    pub normalize: NormalizeOptions,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            target_count: DEFAULT_TARGET_COUNT,
            batch_multiplier: DEFAULT_BATCH_MULTIPLIER,
            download_delay: DEFAULT_DOWNLOAD_DELAY,
            normalize: NormalizeOptions::default(),
        }
    }
}

/// How a single pair ended up.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PairOutcome {
    /// Already at quota, nothing was fetched
    AlreadySatisfied {
        /// Images on disk
        existing: u32,
    },
    /// Quota met or candidates exhausted
    Completed {
        /// Images on disk before the call
        existing: u32,
        /// Images saved by the call
        saved: u32,
    },
    /// The decider skipped the rest of this pair
    Skipped {
        /// Images on disk before the call
        existing: u32,
        /// Images saved before the skip
        saved: u32,
    },
    /// The source had nothing to offer; the only failed outcome
    NoCandidates {
        /// Images on disk
        existing: u32,
    },
    /// The decider asked to stop the whole run
    Quit {
        /// Images on disk before the call
        existing: u32,
        /// Images saved before the quit
        saved: u32,
    },
}

impl PairOutcome {
    /// Images saved during the call.
    pub fn saved(&self) -> u32 {
        match self {
            Self::AlreadySatisfied { .. } | Self::NoCandidates { .. } => 0,
            Self::Completed { saved, .. } | Self::Skipped { saved, .. } | Self::Quit { saved, .. } => {
                *saved
            }
        }
    }

    /// Images on disk before the call.
    pub fn existing(&self) -> u32 {
        match self {
            Self::AlreadySatisfied { existing }
            | Self::NoCandidates { existing }
            | Self::Completed { existing, .. }
            | Self::Skipped { existing, .. }
            | Self::Quit { existing, .. } => *existing,
        }
    }

    /// False only when no candidates were available.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::NoCandidates { .. })
    }

    /// True when the run has to stop.
    pub fn is_quit(&self) -> bool {
        matches!(self, Self::Quit { .. })
    }

    /// Short name for summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AlreadySatisfied { .. } => "already satisfied",
            Self::Completed { .. } => "completed",
            Self::Skipped { .. } => "skipped",
            Self::NoCandidates { .. } => "no candidates",
            Self::Quit { .. } => "quit",
        }
    }
}

/// One pair's line in a run report.
#[derive(Clone, Debug, Serialize)]
pub struct PairReport {
    /// Category
    pub category: Category,
    /// Image type
    pub image_type: ImageType,
    /// What happened, when the pair could be attempted at all
    #[serde(flatten)]
    pub outcome: Option<PairOutcome>,
    /// Why the pair couldn't be attempted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PairReport {
    /// True if the pair ran and didn't come up empty.
    pub fn is_success(&self) -> bool {
        self.outcome.is_some_and(|outcome| outcome.is_success())
    }
}

/// Everything a run did.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    /// Pairs in the order they were processed
    pub pairs: Vec<PairReport>,
    /// Whether the run was stopped by a quit decision
    pub quit: bool,
}

impl RunReport {
    /// Images saved across all pairs.
    pub fn total_saved(&self) -> u32 {
        self.pairs
            .iter()
            .filter_map(|pair| pair.outcome)
            .map(|outcome| outcome.saved())
            .sum()
    }

    /// Pairs that failed, either up front or for lack of candidates.
    pub fn failed(&self) -> usize {
        self.pairs.iter().filter(|pair| !pair.is_success()).count()
    }
}

/// Drives category/type pairs towards their quota.
#[derive(Debug)]
pub struct CategoryFetcher<S, D, R> {
    catalog: Catalog,
    store: ImageStore,
    source: S,
    decider: D,
    retriever: R,
    config: FetchConfig,
    save_lock: Option<Arc<Mutex<()>>>,
}

impl<S, D, R> CategoryFetcher<S, D, R>
where
    S: CandidateSource,
    D: Decider,
    R: Retriever,
{
    /// Wires up a fetcher.
    pub fn new(
        catalog: Catalog,
        store: ImageStore,
        source: S,
        decider: D,
        retriever: R,
        config: FetchConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            source,
            decider,
            retriever,
            config,
            save_lock: None,
        }
    }

    /// Shares a lock with other writers of the same image tree. Each save happens under
    /// it, after re-checking the quota against what is on disk.
    pub fn with_save_lock(mut self, lock: Arc<Mutex<()>>) -> Self {
        self.save_lock = Some(lock);
        self
    }

    /// Brings one pair up to `target_count` images, or as close as the candidates and the
    /// decider allow. Only bad input and filesystem trouble are errors; an empty batch is
    /// [`PairOutcome::NoCandidates`].
    pub async fn fetch_category(
        &mut self,
        category: &Category,
        image_type: &ImageType,
        target_count: u32,
    ) -> Result<PairOutcome, FetchError> {
        if !self.catalog.contains_category(category) {
            return Err(FetchError::UnknownCategory(category.to_string()));
        }
        if !self.catalog.contains_image_type(image_type) {
            return Err(FetchError::UnknownImageType(image_type.to_string()));
        }
        if target_count == 0 {
            return Err(FetchError::InvalidInput(
                "target count must be at least 1".to_string(),
            ));
        }

        info!("Starting {image_type} images for category: {category}");
        self.store.ensure_dir(category, image_type).await?;
        let listing = self.store.scan(category, image_type).await?;
        let existing = listing.count;
        let needed = target_count.saturating_sub(existing);
        if needed == 0 {
            info!("Category {category} ({image_type}) already has {existing} images");
            return Ok(PairOutcome::AlreadySatisfied { existing });
        }
        info!("Need {needed} more images (have {existing}/{target_count})");

        let batch_size = needed.saturating_mul(self.config.batch_multiplier.max(1));
        let candidates = self
            .source
            .candidates(image_type, category, batch_size)
            .await;
        if candidates.is_empty() {
            warn!("No {image_type} images found for {category}");
            return Ok(PairOutcome::NoCandidates { existing });
        }

        let mut next_index = listing.next_index();
        let mut saved = 0;
        for (position, candidate) in candidates.iter().enumerate() {
            if saved >= needed {
                break;
            }
            let summary =
                CandidateSummary::new(candidate, position + 1, saved, category, image_type);
            match self.decider.decide(&summary).await {
                Decision::Quit => {
                    info!("Quitting download process");
                    return Ok(PairOutcome::Quit { existing, saved });
                }
                Decision::SkipCategory => {
                    info!("Skipping {category} ({image_type})");
                    return Ok(PairOutcome::Skipped { existing, saved });
                }
                Decision::Reject => {
                    debug!("Rejected candidate {} for {category}", position + 1);
                    continue;
                }
                Decision::Approve => {}
            }

            {
                let _guard = match &self.save_lock {
                    Some(lock) => Some(lock.lock().await),
                    None => None,
                };
                // someone else may have filled the pair while we waited on the decider
                let on_disk = self.store.count_existing(category, image_type).await?;
                if on_disk >= target_count {
                    info!(
                        "Category {category} ({image_type}) reached {on_disk} images meanwhile"
                    );
                    break;
                }

                match self
                    .download(candidate, category, image_type, next_index)
                    .await
                {
                    Ok((index, path)) => {
                        saved += 1;
                        next_index = index + 1;
                        info!("Saved: {}", path.display());
                    }
                    Err(err) if err.is_transient() => {
                        warn!("Failed to download {}: {}", candidate.url, err)
                    }
                    Err(err) => {
                        error!("Can't save {category} ({image_type}) image: {err}");
                        return Err(err);
                    }
                }
            }

            if saved < needed && !self.config.download_delay.is_zero() {
                tokio::time::sleep(self.config.download_delay).await;
            }
        }

        info!("Completed {category} ({image_type}): {saved} images downloaded");
        Ok(PairOutcome::Completed { existing, saved })
    }

    /// Retrieve, normalize, save. Nothing is written unless all three succeed.
    async fn download(
        &self,
        candidate: &Candidate,
        category: &Category,
        image_type: &ImageType,
        index: u32,
    ) -> Result<(u32, PathBuf), FetchError> {
        let bytes = self.retriever.retrieve(&candidate.url).await?;
        let jpeg = normalize_image_blocking(bytes, self.config.normalize).await?;
        match self.store.save(category, image_type, index, &jpeg).await {
            Ok(path) => Ok((index, path)),
            Err(FetchError::Conflict(_)) => {
                debug!("Index {index} was taken, looking for the next free one");
                self.store.save_next(category, image_type, &jpeg).await
            }
            Err(err) => Err(err),
        }
    }

    /// Adds up to `count` images to a pair on top of what is already there, then records
    /// the new on-disk count.
    pub async fn fetch_more(
        &mut self,
        category: &Category,
        image_type: &ImageType,
        count: u32,
        progress: &ProgressStore,
    ) -> Result<PairOutcome, FetchError> {
        let existing = self.store.count_existing(category, image_type).await?;
        let target = existing.saturating_add(count);
        let outcome = self.fetch_category(category, image_type, target).await?;
        let on_disk = self.store.count_existing(category, image_type).await?;
        progress
            .record(image_type, category, on_disk, on_disk.max(self.config.target_count))
            .await?;
        Ok(outcome)
    }

    /// Walks every category x image type pair with the configured target, recording
    /// progress after each pair. Stops early only on a quit decision.
    pub async fn run(
        &mut self,
        categories: &[Category],
        image_types: &[ImageType],
        progress: &ProgressStore,
    ) -> RunReport {
        let target = self.config.target_count;
        let mut report = RunReport::default();

        'categories: for category in categories {
            for image_type in image_types {
                let outcome = match self.fetch_category(category, image_type, target).await {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        error!("Can't fetch {category} ({image_type}): {err}");
                        report.pairs.push(PairReport {
                            category: category.clone(),
                            image_type: image_type.clone(),
                            outcome: None,
                            error: Some(err.to_string()),
                        });
                        continue;
                    }
                };

                self.record_progress(category, image_type, progress).await;
                report.pairs.push(PairReport {
                    category: category.clone(),
                    image_type: image_type.clone(),
                    outcome: Some(outcome),
                    error: None,
                });
                if outcome.is_quit() {
                    report.quit = true;
                    break 'categories;
                }
            }
        }

        info!(
            "Run finished: {} images saved, {} pairs failed{}",
            report.total_saved(),
            report.failed(),
            if report.quit { ", stopped by quit" } else { "" }
        );
        report
    }

    async fn record_progress(
        &self,
        category: &Category,
        image_type: &ImageType,
        progress: &ProgressStore,
    ) {
        let on_disk = match self.store.count_existing(category, image_type).await {
            Ok(count) => count,
            Err(err) => {
                warn!("Can't count saved images for {category} ({image_type}): {err}");
                return;
            }
        };
        if let Err(err) = progress
            .record(image_type, category, on_disk, self.config.target_count)
            .await
        {
            warn!(
                "Failed to save progress to {}: {}",
                progress.path().display(),
                err
            );
        }
    }
}
