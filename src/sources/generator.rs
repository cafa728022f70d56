use crate::candidate::Candidate;
use crate::catalog::{Catalog, Category, ImageType};
use crate::constants::FACE_GENERATOR_URL;

use super::CandidateSource;

/// An endpoint that renders a fresh image on every GET.
///
/// No request is made until download time; each candidate just gets its own
/// cache-busting URL so repeated downloads don't come back identical.
#[derive(Clone, Debug)]
pub struct GeneratorSource {
    name: &'static str,
    endpoint: String,
    categories: Vec<Category>,
}

impl GeneratorSource {
    /// The face generator, good for `people` only, and only if the catalog has it.
    pub fn faces(catalog: &Catalog) -> Self {
        let people = catalog.category("people").ok();
        Self::new(
            "thispersondoesnotexist",
            FACE_GENERATOR_URL,
            people.into_iter().collect(),
        )
    }

    /// Any generator endpoint.
    pub fn new(name: &'static str, endpoint: impl Into<String>, categories: Vec<Category>) -> Self {
        Self {
            name,
            endpoint: endpoint.into(),
            categories,
        }
    }

    /// Endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Categories the generator can produce.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// True if the generator produces images of this category.
    pub fn supports(&self, category: &Category) -> bool {
        self.categories.contains(category)
    }

    /// `count` distinct candidate URLs, or nothing for unsupported categories.
    pub fn generate(&self, category: &Category, count: u32) -> Vec<Candidate> {
        if !self.supports(category) {
            return Vec::new();
        }
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        (1..=count)
            .filter_map(|n| {
                let nonce: u64 = rand::random();
                let url = format!("{}{separator}v={nonce:016x}", self.endpoint);
                Candidate::new(
                    &url,
                    &format!("AI generated {category} {n}"),
                    "AI Generated",
                    self.name,
                )
            })
            .collect()
    }
}

impl CandidateSource for GeneratorSource {
    async fn candidates(
        &self,
        _image_type: &ImageType,
        category: &Category,
        count: u32,
    ) -> Vec<Candidate> {
        self.generate(category, count)
    }
}
