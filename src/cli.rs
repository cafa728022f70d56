//! CLI parsers for the binaries
use clap::{Args, Parser, ValueEnum};
use std::num::NonZeroU16;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_BASE_PATH, DEFAULT_PROGRESS_FILE, DEFAULT_TARGET_COUNT, GENERATOR_DELAY_MS,
};

#[derive(Args, Debug, Clone)]
/// Options shared by everything that writes into the image tree
pub struct StoreOptions {
    #[clap(long, default_value = DEFAULT_BASE_PATH, env = "IMGFETCH_BASE_PATH")]
    /// Root of the image tree, images land in `<base>/<category>/<type>/`.
    /// Env: IMGFETCH_BASE_PATH
    pub base_path: PathBuf,

    #[clap(long, default_value = DEFAULT_PROGRESS_FILE, env = "IMGFETCH_PROGRESS_FILE")]
    /// JSON file tracking saved counts between runs.
    /// Env: IMGFETCH_PROGRESS_FILE
    pub progress_file: PathBuf,

    #[clap(long, default_value_t = DEFAULT_TARGET_COUNT, env = "IMGFETCH_TARGET_COUNT")]
    /// Images wanted per category/type pair.
    /// Env: IMGFETCH_TARGET_COUNT
    pub target_count: u32,

    #[clap(long, env = "IMGFETCH_CATALOG")]
    /// Comma-separated category set, replaces the built-in list.
    /// Env: IMGFETCH_CATALOG
    pub catalog: Option<String>,

    #[clap(long, env = "IMGFETCH_IMAGE_TYPES")]
    /// Comma-separated image type set, defaults to `real,ai`.
    /// Env: IMGFETCH_IMAGE_TYPES
    pub image_types: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
/// Who approves candidates
pub enum Policy {
    /// Ask on the console
    Console,
    /// Approve the first image of each pair, reject the rest
    ApproveFirst,
    /// Approve everything
    ApproveAll,
}

#[derive(Parser, Debug)]
#[command(name = "imgfetch")]
/// Download category images with an approval step
pub struct DownloaderOptions {
    #[clap(long, help = "Enable debug logging", env = "IMGFETCH_DEBUG")]
    /// Enable debug logging. Env: IMGFETCH_DEBUG
    pub debug: bool,

    #[command(flatten)]
    /// Image tree and catalog
    pub store: StoreOptions,

    #[clap(long, env = "IMGFETCH_TYPES")]
    /// Image types to fetch this run, eg `real,ai`. Asks when not given.
    /// Env: IMGFETCH_TYPES
    pub types: Option<String>,

    #[clap(long, env = "IMGFETCH_CATEGORIES")]
    /// Categories to fetch this run, defaults to the whole catalog.
    /// Env: IMGFETCH_CATEGORIES
    pub categories: Option<String>,

    #[clap(long, value_enum, default_value = "console", env = "IMGFETCH_POLICY")]
    /// Approval policy. Env: IMGFETCH_POLICY
    pub policy: Policy,

    #[clap(long, default_value = "500", env = "IMGFETCH_DELAY_MS")]
    /// Pause after each download, in milliseconds. Env: IMGFETCH_DELAY_MS
    pub delay_ms: u64,
}

#[derive(Parser, Debug)]
#[command(name = "imgfetch_server")]
/// Serve the fetch/approve/download operations over HTTP
pub struct ServerOptions {
    #[clap(long, help = "Enable debug logging", env = "IMGFETCH_DEBUG")]
    /// Enable debug logging. Env: IMGFETCH_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "5001", env = "IMGFETCH_PORT")]
    /// http listener, defaults to `5001`.
    /// Env: IMGFETCH_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "IMGFETCH_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: IMGFETCH_LISTEN_ADDRESS
    pub listen_address: String,

    #[command(flatten)]
    /// Image tree and catalog
    pub store: StoreOptions,

    #[clap(long, default_value = "500", env = "IMGFETCH_DELAY_MS")]
    /// Pause after each download in background runs, in milliseconds.
    /// Env: IMGFETCH_DELAY_MS
    pub delay_ms: u64,
}

#[derive(Parser, Debug)]
#[command(name = "face_downloader")]
/// Menu tool for pulling generated face images into `people/ai`
pub struct FaceDownloaderOptions {
    #[clap(long, help = "Enable debug logging", env = "IMGFETCH_DEBUG")]
    /// Enable debug logging. Env: IMGFETCH_DEBUG
    pub debug: bool,

    #[command(flatten)]
    /// Image tree and catalog
    pub store: StoreOptions,

    #[clap(long, default_value_t = GENERATOR_DELAY_MS, env = "IMGFETCH_GENERATOR_DELAY_MS")]
    /// Pause between generator calls, in milliseconds.
    /// Env: IMGFETCH_GENERATOR_DELAY_MS
    pub delay_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn parsers_are_consistent() {
        DownloaderOptions::command().debug_assert();
        ServerOptions::command().debug_assert();
        FaceDownloaderOptions::command().debug_assert();
    }

    #[test]
    fn downloader_defaults() {
        let options = DownloaderOptions::try_parse_from(["imgfetch"]).expect("parse");
        assert_eq!(options.policy, Policy::Console);
        assert_eq!(options.store.target_count, 6);
        assert_eq!(options.delay_ms, 500);
        assert!(options.types.is_none());
    }

    #[test]
    fn policy_and_server_flags() {
        let options = DownloaderOptions::try_parse_from([
            "imgfetch",
            "--policy",
            "approve-first",
            "--types",
            "real",
        ])
        .expect("parse");
        assert_eq!(options.policy, Policy::ApproveFirst);
        assert_eq!(options.types.as_deref(), Some("real"));

        let server = ServerOptions::try_parse_from(["imgfetch_server", "--port", "8080"])
            .expect("parse");
        assert_eq!(server.port.get(), 8080);
        assert_eq!(server.listen_address, "127.0.0.1");
        assert!(ServerOptions::try_parse_from(["imgfetch_server", "--port", "0"]).is_err());

        let faces = FaceDownloaderOptions::try_parse_from(["face_downloader"]).expect("parse");
        assert_eq!(faces.delay_ms, 2000);
    }
}
