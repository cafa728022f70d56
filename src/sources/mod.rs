//! Where candidates come from.
//!
//! A source never fails loudly: transport errors, bad statuses and junk bodies are logged
//! and come back as an empty batch, which the fetcher reads as "nothing available now".

use std::future::Future;

use tracing::{debug, warn};

use crate::candidate::Candidate;
use crate::catalog::{Catalog, Category, ImageType};
use crate::constants::{IMAGE_TYPE_AI, IMAGE_TYPE_REAL, USER_AGENT};
use crate::error::FetchError;

mod generator;
mod search;

pub use generator::GeneratorSource;
pub use search::SearchSource;

/// Produces an ordered, finite batch of candidates for a pair.
pub trait CandidateSource: Send + Sync {
    /// Up to `count` candidates, possibly fewer, possibly none.
    fn candidates(
        &self,
        image_type: &ImageType,
        category: &Category,
        count: u32,
    ) -> impl Future<Output = Vec<Candidate>> + Send;
}

/// The production routing: stock photos for `real`, AI-art search (then the generator)
/// for `ai`.
#[derive(Clone, Debug)]
pub struct HttpSources {
    real: SearchSource,
    ai: SearchSource,
    generator: GeneratorSource,
}

impl HttpSources {
    /// Default endpoints sharing one client. The generator covers whichever of its
    /// categories the catalog has.
    pub fn new(catalog: &Catalog) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_sources(
            SearchSource::unsplash(client.clone()),
            SearchSource::lexica(client),
            GeneratorSource::faces(catalog),
        ))
    }

    /// Custom sources, eg pointing at a mirror.
    pub fn with_sources(real: SearchSource, ai: SearchSource, generator: GeneratorSource) -> Self {
        Self {
            real,
            ai,
            generator,
        }
    }

    /// Names of the configured backends, for display.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![
            format!("{}: {}", IMAGE_TYPE_REAL, self.real.endpoint()),
            format!("{}: {}", IMAGE_TYPE_AI, self.ai.endpoint()),
        ];
        let fallback = self.generator.categories();
        if !fallback.is_empty() {
            lines.push(format!(
                "{} (fallback for {}): {}",
                IMAGE_TYPE_AI,
                fallback
                    .iter()
                    .map(Category::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                self.generator.endpoint()
            ));
        }
        lines
    }
}

impl CandidateSource for HttpSources {
    async fn candidates(
        &self,
        image_type: &ImageType,
        category: &Category,
        count: u32,
    ) -> Vec<Candidate> {
        match image_type.as_str() {
            IMAGE_TYPE_REAL => self.real.search(category, count).await,
            IMAGE_TYPE_AI => {
                let found = self.ai.search(category, count).await;
                if found.is_empty() && self.generator.supports(category) {
                    debug!("Falling back to generator for {category}");
                    return self.generator.generate(category, count);
                }
                found
            }
            other => {
                warn!("No candidate source configured for image type {other}");
                Vec::new()
            }
        }
    }
}
