//! Config handling: logging, and turning parsed options into the runtime pieces.

use std::path::PathBuf;
use std::time::Duration;

use tracing::log::LevelFilter;

use crate::catalog::Catalog;
use crate::cli::StoreOptions;
use crate::constants::{DEFAULT_CATEGORIES, DEFAULT_IMAGE_TYPES};
use crate::error::FetchError;
use crate::fetcher::FetchConfig;
use crate::progress::ProgressStore;
use crate::storage::ImageStore;

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), FetchError> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("reqwest", LevelFilter::Warn)
            .with_module_level("tower_http", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    } else {
        // image decoders are chatty at debug
        logger = logger.with_module_level("zune_jpeg", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        FetchError::Io(std::io::Error::other(err))
    })
}

/// Everything a binary needs to start fetching, resolved from the command line.
#[derive(Clone, Debug)]
pub struct Settings {
    /// The category/type set
    pub catalog: Catalog,
    /// The image tree
    pub store: ImageStore,
    /// Where progress is persisted
    pub progress_file: PathBuf,
    /// Fetch tunables
    pub fetch: FetchConfig,
}

impl Settings {
    /// Resolves store options, with `delay_ms` as the pause after each download.
    pub fn from_options(options: &StoreOptions, delay_ms: u64) -> Result<Self, FetchError> {
        if options.target_count == 0 {
            return Err(FetchError::InvalidInput(
                "--target-count must be at least 1".to_string(),
            ));
        }
        let categories: Vec<String> = match &options.catalog {
            Some(list) => split_list(list),
            None => DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
        };
        let image_types: Vec<String> = match &options.image_types {
            Some(list) => split_list(list),
            None => DEFAULT_IMAGE_TYPES.iter().map(|s| s.to_string()).collect(),
        };
        Ok(Self {
            catalog: Catalog::new(categories, image_types)?,
            store: ImageStore::new(options.base_path.clone()),
            progress_file: options.progress_file.clone(),
            fetch: FetchConfig {
                target_count: options.target_count,
                download_delay: Duration::from_millis(delay_ms),
                ..FetchConfig::default()
            },
        })
    }

    /// Loads the progress file for this catalog.
    pub async fn open_progress(&self) -> Result<ProgressStore, FetchError> {
        ProgressStore::open(self.progress_file.clone(), &self.catalog).await
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::DownloaderOptions;
    use clap::Parser;

    #[test]
    fn defaults_resolve() {
        let options = DownloaderOptions::try_parse_from(["imgfetch"]).expect("parse");
        let settings = Settings::from_options(&options.store, options.delay_ms).expect("settings");
        assert_eq!(settings.catalog.categories().len(), 20);
        assert_eq!(settings.catalog.image_types().len(), 2);
        assert_eq!(settings.fetch.target_count, 6);
        assert_eq!(settings.fetch.download_delay, Duration::from_millis(500));
        assert_eq!(settings.fetch.batch_multiplier, 2);
        assert_eq!(settings.store.base(), std::path::Path::new("./images"));
    }

    #[test]
    fn catalog_override_and_zero_target() {
        let options = DownloaderOptions::try_parse_from([
            "imgfetch",
            "--catalog",
            "birds, fish,",
            "--image-types",
            "real",
        ])
        .expect("parse");
        let settings = Settings::from_options(&options.store, 0).expect("settings");
        assert_eq!(settings.catalog.categories().len(), 2);
        assert!(settings.catalog.image_type("ai").is_err());
        assert_eq!(settings.fetch.download_delay, Duration::ZERO);

        let options =
            DownloaderOptions::try_parse_from(["imgfetch", "--target-count", "0"]).expect("parse");
        assert!(matches!(
            Settings::from_options(&options.store, 500),
            Err(FetchError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn progress_opens_empty_per_type() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("progress.json");
        let options = DownloaderOptions::try_parse_from([
            "imgfetch",
            "--progress-file",
            file.to_str().expect("utf8 path"),
        ])
        .expect("parse");
        let settings = Settings::from_options(&options.store, 500).expect("settings");
        let progress = settings.open_progress().await.expect("progress");
        assert_eq!(progress.snapshot().await.total(), 0);
    }
}
