//! Shared constants/defaults for things
//!

use std::time::Duration;

/// Default categories, in the order the downloader walks them.
pub const DEFAULT_CATEGORIES: [&str; 20] = [
    "dogs",
    "cats",
    "cars",
    "food",
    "nature",
    "buildings",
    "people",
    "animals",
    "art",
    "technology",
    "sports",
    "music",
    "fashion",
    "travel",
    "space",
    "fantasy",
    "abstract",
    "vintage",
    "minimalist",
    "surreal",
];

/// Image type backed by the stock-photo search.
pub const IMAGE_TYPE_REAL: &str = "real";
/// Image type backed by the AI-art search and the generator.
pub const IMAGE_TYPE_AI: &str = "ai";

/// Default image types.
pub const DEFAULT_IMAGE_TYPES: [&str; 2] = [IMAGE_TYPE_REAL, IMAGE_TYPE_AI];

/// Where saved images go by default
pub const DEFAULT_BASE_PATH: &str = "./images";

/// Default progress file
pub const DEFAULT_PROGRESS_FILE: &str = "download_progress.json";

/// Default number of images wanted per category/type pair.
pub const DEFAULT_TARGET_COUNT: u32 = 6;

/// How many candidates to request per missing image.
pub const DEFAULT_BATCH_MULTIPLIER: u32 = 2;

/// Canonical saved image width.
pub const CANONICAL_WIDTH: u32 = 800;
/// Canonical saved image height.
pub const CANONICAL_HEIGHT: u32 = 600;
/// JPEG quality for saved images.
pub const JPEG_QUALITY: u8 = 85;

/// Stock-photo search endpoint.
pub const UNSPLASH_SEARCH_URL: &str = "https://unsplash.com/napi/search/photos";
/// AI-art search endpoint.
pub const LEXICA_SEARCH_URL: &str = "https://lexica.art/api/v1/search";
/// Face generator endpoint, every GET returns a new image.
pub const FACE_GENERATOR_URL: &str = "https://thispersondoesnotexist.com/image";

/// Timeout for search API calls.
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for image downloads.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(15);
/// Timeout for generator endpoints, which render on request.
pub const GENERATOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between per-candidate downloads.
pub const DEFAULT_DOWNLOAD_DELAY: Duration = Duration::from_millis(500);
/// Pause between generator calls, in milliseconds.
pub const GENERATOR_DELAY_MS: u64 = 2000;

/// Generator images fetched by the menu tool when no count is given.
pub const DEFAULT_GENERATOR_COUNT: u32 = 10;

/// Most generator images the menu tool will take in one go.
pub const MAX_GENERATOR_COUNT: u32 = 100;

/// Publicly available AI image datasets: name, url, categories covered.
pub const AI_DATASETS: [(&str, &str, &[&str]); 2] = [
    (
        "AI Generated Faces",
        "https://huggingface.co/datasets/ashraq/fake-faces",
        &["people"],
    ),
    (
        "AI Generated Animals",
        "https://huggingface.co/datasets/ashraq/fake-animals",
        &["dogs", "cats", "animals"],
    ),
];

/// Max characters of an AI prompt shown as a description.
pub const PROMPT_DESCRIPTION_CHARS: usize = 100;

/// Upper bound on candidates the server hands out per request.
pub const MAX_CANDIDATES_PER_REQUEST: u32 = 50;

/// User agent sent to remote services
pub const USER_AGENT: &str = concat!("imgfetch/", env!("CARGO_PKG_VERSION"));
