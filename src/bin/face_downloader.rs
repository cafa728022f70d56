use std::io::{BufRead, Write};

use anyhow::Result;
use clap::Parser;
use imgfetch::catalog::Catalog;
use imgfetch::cli::FaceDownloaderOptions;
use imgfetch::config::{Settings, setup_logging};
use imgfetch::console::{Console, StdConsole};
use imgfetch::constants::IMAGE_TYPE_AI;
use imgfetch::decision::ScriptedDecider;
use imgfetch::fetcher::{CategoryFetcher, FetchConfig, PairOutcome};
use imgfetch::menu::{
    GENERATOR_MENU, GeneratorMenuChoice, parse_count, show_catalog, show_datasets,
};
use imgfetch::progress::ProgressStore;
use imgfetch::retrieve::HttpRetriever;
use imgfetch::sources::{GeneratorSource, HttpSources};
use imgfetch::storage::ImageStore;

struct Downloader {
    catalog: Catalog,
    store: ImageStore,
    config: FetchConfig,
    progress: ProgressStore,
}

impl Downloader {
    /// Pulls `count` more generated images for every category the generator covers.
    async fn download<R: BufRead, W: Write>(
        &self,
        console: &mut Console<R, W>,
        count: u32,
    ) -> Result<()> {
        let generator = GeneratorSource::faces(&self.catalog);
        if generator.categories().is_empty() {
            console.say("The catalog has no category the generator can produce")?;
            return Ok(());
        }
        let image_type = self.catalog.image_type(IMAGE_TYPE_AI)?;
        let mut fetcher = CategoryFetcher::new(
            self.catalog.clone(),
            self.store.clone(),
            generator.clone(),
            ScriptedDecider::approve_all(),
            HttpRetriever::for_generator()?,
            self.config.clone(),
        );

        // goes past the configured target; progress records the real count
        for category in generator.categories() {
            console.say(&format!(
                "Downloading {count} AI-generated {category} images..."
            ))?;
            let outcome = fetcher
                .fetch_more(category, &image_type, count, &self.progress)
                .await?;
            match outcome {
                PairOutcome::NoCandidates { .. } => {
                    console.say("The generator offered nothing")?
                }
                outcome => console.say(&format!(
                    "Saved {} of {} into {}",
                    outcome.saved(),
                    count,
                    self.store.pair_dir(category, &image_type).display()
                ))?,
            }
        }
        Ok(())
    }
}

async fn menu_loop(downloader: &Downloader, sources: &HttpSources) -> Result<()> {
    let mut console = StdConsole::stdio();
    console.say("AI Image Downloader - Manual Process")?;
    loop {
        console.say("")?;
        for line in GENERATOR_MENU {
            console.say(line)?;
        }
        let Some(answer) = console.ask("Enter choice (1-4): ")? else {
            break;
        };
        match answer.parse::<GeneratorMenuChoice>() {
            Ok(GeneratorMenuChoice::Download) => {
                let Some(answer) = console.ask("How many person images? (default 10): ")?
                else {
                    break;
                };
                match parse_count(&answer) {
                    Ok(count) => downloader.download(&mut console, count).await?,
                    Err(err) => console.say(&err.to_string())?,
                }
            }
            Ok(GeneratorMenuChoice::ShowDatasets) => show_datasets(&mut console)?,
            Ok(GeneratorMenuChoice::ListCatalog) => {
                show_catalog(&mut console, &downloader.catalog, sources)?
            }
            Ok(GeneratorMenuChoice::Exit) => {
                console.say("Goodbye!")?;
                break;
            }
            Err(_) => console.say("Invalid choice")?,
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = FaceDownloaderOptions::parse();

    setup_logging(options.debug)?;

    let settings = Settings::from_options(&options.store, options.delay_ms)?;
    let progress = settings.open_progress().await?;
    let downloader = Downloader {
        catalog: settings.catalog,
        store: settings.store,
        config: settings.fetch,
        progress,
    };
    let sources = HttpSources::new(&downloader.catalog)?;
    menu_loop(&downloader, &sources).await
}
