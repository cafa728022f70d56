use serde_json::Value;
use tracing::{debug, warn};

use crate::candidate::{Candidate, from_lexica, from_unsplash, parse_search_body};
use crate::catalog::{Category, ImageType};
use crate::constants::{LEXICA_SEARCH_URL, SEARCH_TIMEOUT, UNSPLASH_SEARCH_URL};

use super::CandidateSource;

/// A JSON search API: GET with query params, records under one key of the body.
#[derive(Clone, Debug)]
pub struct SearchSource {
    name: &'static str,
    client: reqwest::Client,
    endpoint: String,
    query_param: &'static str,
    extra_params: &'static [(&'static str, &'static str)],
    results_key: &'static str,
    normalize: fn(Value) -> Option<Candidate>,
}

impl SearchSource {
    /// Unsplash photo search, results under `results`.
    pub fn unsplash(client: reqwest::Client) -> Self {
        Self {
            name: "unsplash",
            client,
            endpoint: UNSPLASH_SEARCH_URL.to_string(),
            query_param: "query",
            extra_params: &[("orientation", "landscape")],
            results_key: "results",
            normalize: from_unsplash,
        }
    }

    /// Lexica search, results under `images`.
    pub fn lexica(client: reqwest::Client) -> Self {
        Self {
            name: "lexica",
            client,
            endpoint: LEXICA_SEARCH_URL.to_string(),
            query_param: "q",
            extra_params: &[("size", "landscape")],
            results_key: "images",
            normalize: from_lexica,
        }
    }

    /// Same API shape at a different URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// The URL being queried.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Runs one search. Every failure is logged and yields nothing.
    pub async fn search(&self, category: &Category, count: u32) -> Vec<Candidate> {
        let mut params: Vec<(&str, String)> = vec![
            (self.query_param, category.to_string()),
            ("per_page", count.to_string()),
        ];
        params.extend(
            self.extra_params
                .iter()
                .map(|(key, value)| (*key, (*value).to_string())),
        );

        let resp = match self
            .client
            .get(&self.endpoint)
            .query(&params)
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                warn!("Error fetching from {}: {}", self.name, err);
                return Vec::new();
            }
        };

        let status = resp.status();
        if !status.is_success() {
            warn!("{} API returned status {}", self.name, status);
            return Vec::new();
        }

        let body = match resp.bytes().await {
            Ok(body) => body,
            Err(err) => {
                warn!("Failed reading {} response: {}", self.name, err);
                return Vec::new();
            }
        };

        match parse_search_body(&body, self.results_key, self.normalize) {
            Ok(mut candidates) => {
                candidates.truncate(count as usize);
                debug!(
                    "{} returned {} candidates for {}",
                    self.name,
                    candidates.len(),
                    category
                );
                candidates
            }
            Err(err) => {
                warn!("Failed to parse {} response: {}", self.name, err);
                Vec::new()
            }
        }
    }
}

impl CandidateSource for SearchSource {
    async fn candidates(
        &self,
        _image_type: &ImageType,
        category: &Category,
        count: u32,
    ) -> Vec<Candidate> {
        self.search(category, count).await
    }
}
