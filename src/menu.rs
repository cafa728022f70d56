//! Text menus for the interactive binaries.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use crate::catalog::{Catalog, Category, ImageType};
use crate::console::Console;
use crate::constants::{
    AI_DATASETS, DEFAULT_GENERATOR_COUNT, IMAGE_TYPE_AI, IMAGE_TYPE_REAL, MAX_GENERATOR_COUNT,
};
use crate::error::FetchError;
use crate::sources::HttpSources;

/// What the downloader should walk: categories (outer) by image types (inner).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Selection {
    /// Categories in processing order
    pub categories: Vec<Category>,
    /// Image types per category
    pub image_types: Vec<ImageType>,
}

const SELECTION_MENU: [&str; 5] = [
    "What would you like to download?",
    "1. Real images only",
    "2. AI images only",
    "3. Both real and AI images",
    "4. Specific categories only",
];

/// Asks what to download. `None` when input runs out.
pub fn ask_selection<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
) -> io::Result<Option<Selection>> {
    console.say("")?;
    for line in SELECTION_MENU {
        console.say(line)?;
    }
    loop {
        let Some(choice) = console.ask("Enter choice (1-4): ")? else {
            return Ok(None);
        };
        let wanted: &[&str] = match choice.as_str() {
            "1" => &[IMAGE_TYPE_REAL],
            "2" => &[IMAGE_TYPE_AI],
            "3" | "4" => &[IMAGE_TYPE_REAL, IMAGE_TYPE_AI],
            _ => {
                console.say("Please enter a number from 1 to 4")?;
                continue;
            }
        };
        let image_types = match catalog.select_image_types(&wanted.join(",")) {
            Ok(image_types) => image_types,
            Err(err) => {
                console.say(&format!("{err}"))?;
                continue;
            }
        };
        let categories = if choice == "4" {
            match ask_categories(console, catalog)? {
                Some(categories) => categories,
                None => return Ok(None),
            }
        } else {
            catalog.categories().to_vec()
        };
        return Ok(Some(Selection {
            categories,
            image_types,
        }));
    }
}

fn ask_categories<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
) -> io::Result<Option<Vec<Category>>> {
    let names: Vec<&str> = catalog.categories().iter().map(Category::as_str).collect();
    console.say(&format!("Available categories: {}", names.join(", ")))?;
    loop {
        let Some(answer) = console.ask("Enter categories (comma-separated): ")? else {
            return Ok(None);
        };
        match catalog.select_categories(&answer) {
            Ok(categories) => return Ok(Some(categories)),
            Err(err) => console.say(&format!("No valid categories selected: {err}"))?,
        }
    }
}

/// Entries of the generator menu.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GeneratorMenuChoice {
    /// Pull generated people into `people/ai`
    Download,
    /// List the known AI datasets
    ShowDatasets,
    /// List categories and image types
    ListCatalog,
    /// Leave
    Exit,
}

impl FromStr for GeneratorMenuChoice {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Self::Download),
            "2" => Ok(Self::ShowDatasets),
            "3" => Ok(Self::ListCatalog),
            "4" => Ok(Self::Exit),
            _ => Err(FetchError::InvalidInput("Invalid choice".to_string())),
        }
    }
}

/// The generator menu lines.
pub const GENERATOR_MENU: [&str; 5] = [
    "Options:",
    "1. Download AI-generated people (ThisPersonDoesNotExist)",
    "2. Show Hugging Face AI datasets",
    "3. List categories and image types",
    "4. Exit",
];

/// Parses a "how many" answer; empty means the default.
pub fn parse_count(answer: &str) -> Result<u32, FetchError> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(DEFAULT_GENERATOR_COUNT);
    }
    match answer.parse::<u32>() {
        Ok(0) => Err(FetchError::InvalidInput("count must be at least 1".to_string())),
        Ok(count) if count > MAX_GENERATOR_COUNT => Err(FetchError::InvalidInput(format!(
            "count must be at most {MAX_GENERATOR_COUNT}"
        ))),
        Ok(count) => Ok(count),
        Err(_) => Err(FetchError::InvalidInput(format!(
            "{answer:?} is not a number"
        ))),
    }
}

/// Prints the known AI datasets and how to use them.
pub fn show_datasets<R: BufRead, W: Write>(console: &mut Console<R, W>) -> io::Result<()> {
    console.say("Available AI datasets:")?;
    for (n, (name, url, categories)) in AI_DATASETS.iter().enumerate() {
        console.say(&format!("{}. {} - {}", n + 1, name, url))?;
        console.say(&format!("   Categories: {}", categories.join(", ")))?;
    }
    console.say("")?;
    console.say("To use these datasets, download the files from the dataset page and")?;
    console.say("place them in the matching <category>/ai folder.")
}

/// Prints the catalog and where candidates for each type come from.
pub fn show_catalog<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &Catalog,
    sources: &HttpSources,
) -> io::Result<()> {
    let categories: Vec<&str> = catalog.categories().iter().map(Category::as_str).collect();
    let image_types: Vec<&str> = catalog.image_types().iter().map(ImageType::as_str).collect();
    console.say(&format!("Categories: {}", categories.join(", ")))?;
    console.say(&format!("Image types: {}", image_types.join(", ")))?;
    console.say("Sources:")?;
    for line in sources.describe() {
        console.say(&format!("  {line}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(console: Console<&[u8], Vec<u8>>) -> String {
        String::from_utf8(console.into_output()).expect("utf8")
    }

    #[test]
    fn both_types_over_every_category() {
        let catalog = Catalog::default();
        let mut console = Console::new(&b"3\n"[..], Vec::new());
        let selection = ask_selection(&mut console, &catalog)
            .expect("io")
            .expect("selection");
        assert_eq!(selection.categories.len(), 20);
        assert_eq!(
            selection.image_types,
            catalog.select_image_types("real,ai").expect("types")
        );
    }

    #[test]
    fn specific_categories_reprompt_until_valid() {
        let catalog = Catalog::default();
        let mut console = Console::new(&b"7\n4\nlizards\ndogs, cars\n"[..], Vec::new());
        let selection = ask_selection(&mut console, &catalog)
            .expect("io")
            .expect("selection");
        assert_eq!(
            selection.categories,
            catalog.select_categories("dogs,cars").expect("categories")
        );
        assert_eq!(selection.image_types.len(), 2);
        let text = output(console);
        assert!(text.contains("Please enter a number from 1 to 4"));
        assert!(text.contains("No valid categories selected"));
    }

    #[test]
    fn selection_eof_is_none() {
        let catalog = Catalog::default();
        let mut console = Console::new(&b""[..], Vec::new());
        assert!(ask_selection(&mut console, &catalog).expect("io").is_none());
    }

    #[test]
    fn menu_choices_and_counts() {
        assert_eq!(
            "1".parse::<GeneratorMenuChoice>().expect("1"),
            GeneratorMenuChoice::Download
        );
        assert_eq!(
            " 4 ".parse::<GeneratorMenuChoice>().expect("4"),
            GeneratorMenuChoice::Exit
        );
        let err = "9".parse::<GeneratorMenuChoice>().expect_err("9");
        assert!(err.to_string().contains("Invalid choice"));

        assert_eq!(parse_count("").expect("default"), 10);
        assert_eq!(parse_count(" 3 ").expect("three"), 3);
        assert!(parse_count("lots").is_err());
        assert!(parse_count("0").is_err());
        assert_eq!(parse_count("100").expect("cap"), 100);
        assert!(parse_count("101").is_err());
        assert!(parse_count("4294967295").is_err());
    }

    #[test]
    fn datasets_are_listed() {
        let mut console = Console::new(&b""[..], Vec::new());
        show_datasets(&mut console).expect("io");
        let text = output(console);
        assert!(text.contains("1. AI Generated Faces - https://huggingface.co/datasets/ashraq/fake-faces"));
        assert!(text.contains("   Categories: dogs, cats, animals"));
    }
}
