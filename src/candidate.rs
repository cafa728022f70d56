//! Candidate records, normalized from whatever shape each remote source returns.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::catalog::{Category, ImageType};
use crate::constants::PROMPT_DESCRIPTION_CHARS;

const NO_DESCRIPTION: &str = "No description";

/// A not-yet-downloaded image reference plus the metadata shown for approval.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Candidate {
    /// Where to download the image from
    #[serde(default)]
    pub url: String,
    /// Short human readable description
    #[serde(default)]
    pub description: String,
    /// Photographer, or who generated it
    #[serde(default)]
    pub author: String,
    /// Name of the source that produced it
    #[serde(default)]
    pub source: String,
}

impl Candidate {
    /// Builds a candidate, returning `None` when the URL can't be downloaded from.
    pub fn new(url: &str, description: &str, author: &str, source: &str) -> Option<Self> {
        if !is_retrievable_url(url) {
            debug!("Dropping {source} candidate with unusable url {url:?}");
            return None;
        }
        Some(Self {
            url: url.to_string(),
            description: description.to_string(),
            author: author.to_string(),
            source: source.to_string(),
        })
    }
}

/// http(s) and inline `data:` URLs are the only ones we know how to fetch.
pub fn is_retrievable_url(url: &str) -> bool {
    match url::Url::parse(url.trim()) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https" | "data"),
        Err(_) => false,
    }
}

/// What a decision source gets to look at.
#[derive(Clone, Debug, Serialize)]
pub struct CandidateSummary {
    /// Image URL
    pub url: String,
    /// Short description or prompt text
    pub description: String,
    /// Author or generator name
    pub author: String,
    /// 1-based position of the candidate in its batch
    pub ordinal: usize,
    /// How many candidates were saved so far for this pair
    pub approved_so_far: u32,
    /// The category being filled
    pub category: Category,
    /// The image type being filled
    pub image_type: ImageType,
}

impl CandidateSummary {
    /// Summarize a candidate for approval.
    pub fn new(
        candidate: &Candidate,
        ordinal: usize,
        approved_so_far: u32,
        category: &Category,
        image_type: &ImageType,
    ) -> Self {
        Self {
            url: candidate.url.clone(),
            description: candidate.description.clone(),
            author: candidate.author.clone(),
            ordinal,
            approved_so_far,
            category: category.clone(),
            image_type: image_type.clone(),
        }
    }
}

#[derive(Deserialize, Default)]
struct UnsplashUrls {
    #[serde(default)]
    regular: Option<String>,
}

#[derive(Deserialize, Default)]
struct UnsplashUser {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct UnsplashPhoto {
    #[serde(default)]
    urls: UnsplashUrls,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    alt_description: Option<String>,
    #[serde(default)]
    user: UnsplashUser,
}

#[derive(Deserialize)]
struct LexicaImage {
    #[serde(default)]
    src: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
}

/// Normalizes one stock-photo search record.
pub fn from_unsplash(record: Value) -> Option<Candidate> {
    let photo: UnsplashPhoto = serde_json::from_value(record).ok()?;
    let url = photo.urls.regular?;
    let description = photo
        .description
        .or(photo.alt_description)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());
    let author = photo.user.name.unwrap_or_else(|| "Unknown".to_string());
    Candidate::new(&url, &description, &author, "unsplash")
}

/// Normalizes one AI-art search record; long prompts are cut down.
pub fn from_lexica(record: Value) -> Option<Candidate> {
    let image: LexicaImage = serde_json::from_value(record).ok()?;
    let url = image.src?;
    let description = match image.prompt {
        Some(prompt) if !prompt.trim().is_empty() => {
            prompt.chars().take(PROMPT_DESCRIPTION_CHARS).collect()
        }
        _ => NO_DESCRIPTION.to_string(),
    };
    Candidate::new(&url, &description, "AI Generated", "lexica")
}

/// Pulls the record list out of a search response body and normalizes every usable entry.
pub fn parse_search_body(
    body: &[u8],
    key: &str,
    normalize: fn(Value) -> Option<Candidate>,
) -> Result<Vec<Candidate>, serde_json::Error> {
    let mut parsed: Value = serde_json::from_slice(body)?;
    let records = match parsed.get_mut(key).map(Value::take) {
        Some(Value::Array(records)) => records,
        _ => Vec::new(),
    };
    Ok(records.into_iter().filter_map(normalize).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unsplash_record_normalizes() {
        let record = json!({
            "urls": {"regular": "https://images.example.com/a.jpg", "small": "x"},
            "description": null,
            "alt_description": "a brown dog on grass",
            "user": {"name": "Jane Doe"}
        });
        let candidate = from_unsplash(record).expect("candidate");
        assert_eq!(candidate.url, "https://images.example.com/a.jpg");
        assert_eq!(candidate.description, "a brown dog on grass");
        assert_eq!(candidate.author, "Jane Doe");
        assert_eq!(candidate.source, "unsplash");
    }

    #[test]
    fn unsplash_record_defaults() {
        let record = json!({"urls": {"regular": "https://images.example.com/b.jpg"}});
        let candidate = from_unsplash(record).expect("candidate");
        assert_eq!(candidate.description, "No description");
        assert_eq!(candidate.author, "Unknown");
    }

    #[test]
    fn records_without_url_are_dropped() {
        assert!(from_unsplash(json!({"description": "no urls"})).is_none());
        assert!(from_unsplash(json!({"urls": {"regular": ""}})).is_none());
        assert!(from_lexica(json!({"src": "not a url"})).is_none());
        assert!(from_lexica(json!({"src": "ftp://example.com/a.png"})).is_none());
    }

    #[test]
    fn lexica_prompt_is_truncated() {
        let prompt = "a".repeat(250);
        let record = json!({"src": "https://lexica.example/1.webp", "prompt": prompt});
        let candidate = from_lexica(record).expect("candidate");
        assert_eq!(candidate.description.chars().count(), 100);
        assert_eq!(candidate.author, "AI Generated");
    }

    #[test]
    fn parse_search_body_skips_bad_records() {
        let body = serde_json::to_vec(&json!({
            "results": [
                {"urls": {"regular": "https://images.example.com/1.jpg"}},
                {"urls": "garbage"},
                {"urls": {"regular": "https://images.example.com/2.jpg"}}
            ]
        }))
        .expect("serialize");
        let candidates = parse_search_body(&body, "results", from_unsplash).expect("parse");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].url, "https://images.example.com/2.jpg");

        let empty = parse_search_body(b"{\"other\": []}", "results", from_unsplash)
            .expect("parse");
        assert!(empty.is_empty());
        assert!(parse_search_body(b"<html>", "results", from_unsplash).is_err());
    }

    #[test]
    fn data_urls_are_retrievable() {
        assert!(is_retrievable_url("data:image/png;base64,AAAA"));
        assert!(is_retrievable_url("https://example.com/a.jpg"));
        assert!(!is_retrievable_url("file:///etc/passwd"));
    }
}
