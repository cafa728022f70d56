//! The fixed set of categories and image types, defined once and handed to whoever needs it.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::constants::{DEFAULT_CATEGORIES, DEFAULT_IMAGE_TYPES};
use crate::error::FetchError;

/// Names end up as directory and file name parts, so keep them boring.
#[allow(clippy::unwrap_used)]
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap());

fn normalize_name(name: &str) -> Result<String, FetchError> {
    let name = name.trim().to_ascii_lowercase();
    if NAME_RE.is_match(&name) {
        Ok(name)
    } else {
        Err(FetchError::InvalidName(name))
    }
}

/// A thematic label like `dogs`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
pub struct Category(String);

/// Which kind of source a candidate came from, eg `real` or `ai`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
pub struct ImageType(String);

impl Category {
    /// Borrow the name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ImageType {
    /// Borrow the name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The configured categories and image types.
#[derive(Clone, Debug, Serialize)]
pub struct Catalog {
    categories: Vec<Category>,
    image_types: Vec<ImageType>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|name| Category((*name).to_string()))
                .collect(),
            image_types: DEFAULT_IMAGE_TYPES
                .iter()
                .map(|name| ImageType((*name).to_string()))
                .collect(),
        }
    }
}

impl Catalog {
    /// Build a catalog from names, normalizing case and dropping duplicates.
    pub fn new<C, T>(categories: C, image_types: T) -> Result<Self, FetchError>
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        let mut catalog = Self {
            categories: Vec::new(),
            image_types: Vec::new(),
        };
        for name in categories {
            let category = Category(normalize_name(name.as_ref())?);
            if !catalog.categories.contains(&category) {
                catalog.categories.push(category);
            }
        }
        for name in image_types {
            let image_type = ImageType(normalize_name(name.as_ref())?);
            if !catalog.image_types.contains(&image_type) {
                catalog.image_types.push(image_type);
            }
        }
        if catalog.categories.is_empty() {
            return Err(FetchError::InvalidInput("no categories configured".to_string()));
        }
        if catalog.image_types.is_empty() {
            return Err(FetchError::InvalidInput("no image types configured".to_string()));
        }
        Ok(catalog)
    }

    /// All categories, in configured order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// All image types, in configured order.
    pub fn image_types(&self) -> &[ImageType] {
        &self.image_types
    }

    /// Looks up a category, rejecting anything outside the configured set.
    pub fn category(&self, name: &str) -> Result<Category, FetchError> {
        let name = normalize_name(name)?;
        self.categories
            .iter()
            .find(|category| category.0 == name)
            .cloned()
            .ok_or(FetchError::UnknownCategory(name))
    }

    /// Looks up an image type, rejecting anything outside the configured set.
    pub fn image_type(&self, name: &str) -> Result<ImageType, FetchError> {
        let name = normalize_name(name)?;
        self.image_types
            .iter()
            .find(|image_type| image_type.0 == name)
            .cloned()
            .ok_or(FetchError::UnknownImageType(name))
    }

    /// True if the category is configured.
    pub fn contains_category(&self, category: &Category) -> bool {
        self.categories.contains(category)
    }

    /// True if the image type is configured.
    pub fn contains_image_type(&self, image_type: &ImageType) -> bool {
        self.image_types.contains(image_type)
    }

    /// Parses a comma-separated category list, eg `dogs, cats`.
    pub fn select_categories(&self, list: &str) -> Result<Vec<Category>, FetchError> {
        let mut selected = Vec::new();
        for name in list.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            let category = self.category(name)?;
            if !selected.contains(&category) {
                selected.push(category);
            }
        }
        if selected.is_empty() {
            return Err(FetchError::InvalidInput("no valid categories selected".to_string()));
        }
        Ok(selected)
    }

    /// Parses a comma-separated image type list, eg `real,ai`.
    pub fn select_image_types(&self, list: &str) -> Result<Vec<ImageType>, FetchError> {
        let mut selected = Vec::new();
        for name in list.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            let image_type = self.image_type(name)?;
            if !selected.contains(&image_type) {
                selected.push(image_type);
            }
        }
        if selected.is_empty() {
            return Err(FetchError::InvalidInput("no valid image types selected".to_string()));
        }
        Ok(selected)
    }
}
