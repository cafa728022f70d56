use anyhow::{Context, Result};
use clap::Parser;
use imgfetch::catalog::Catalog;
use imgfetch::cli::{DownloaderOptions, Policy};
use imgfetch::config::{Settings, setup_logging};
use imgfetch::console::StdConsole;
use imgfetch::decision::{ConsoleDecider, Decider, ScriptedDecider};
use imgfetch::fetcher::{CategoryFetcher, FetchConfig, RunReport};
use imgfetch::menu::{Selection, ask_selection};
use imgfetch::progress::ProgressStore;
use imgfetch::retrieve::HttpRetriever;
use imgfetch::sources::HttpSources;
use imgfetch::storage::ImageStore;
use tracing::error;

fn selection_from_options(
    options: &DownloaderOptions,
    catalog: &Catalog,
) -> Result<Option<Selection>> {
    if options.types.is_none() && options.categories.is_none() {
        return Ok(None);
    }
    let categories = match &options.categories {
        Some(list) => catalog.select_categories(list)?,
        None => catalog.categories().to_vec(),
    };
    let image_types = match &options.types {
        Some(list) => catalog.select_image_types(list)?,
        None => catalog.image_types().to_vec(),
    };
    Ok(Some(Selection {
        categories,
        image_types,
    }))
}

async fn run_with<D: Decider>(
    catalog: Catalog,
    store: ImageStore,
    config: FetchConfig,
    selection: &Selection,
    progress: &ProgressStore,
    decider: D,
) -> Result<RunReport> {
    let sources = HttpSources::new(&catalog)?;
    let mut fetcher = CategoryFetcher::new(
        catalog,
        store,
        sources,
        decider,
        HttpRetriever::new()?,
        config,
    );
    Ok(fetcher
        .run(&selection.categories, &selection.image_types, progress)
        .await)
}

fn print_summary(report: &RunReport) {
    println!();
    println!("Download summary:");
    for pair in &report.pairs {
        match (&pair.outcome, &pair.error) {
            (Some(outcome), _) => println!(
                "  {:<12} {:<4} {:<17} {} saved, {} already there",
                pair.category,
                pair.image_type,
                outcome.label(),
                outcome.saved(),
                outcome.existing()
            ),
            (None, Some(err)) => {
                println!("  {:<12} {:<4} failed: {}", pair.category, pair.image_type, err)
            }
            (None, None) => {}
        }
    }
    println!(
        "Saved {} images, {} pairs failed",
        report.total_saved(),
        report.failed()
    );
    if report.quit {
        println!("Stopped early on request.");
    } else {
        println!("Download process completed!");
    }
}

async fn run(options: DownloaderOptions) -> Result<()> {
    let Settings {
        catalog,
        store,
        progress_file,
        fetch: config,
    } = Settings::from_options(&options.store, options.delay_ms)?;

    println!("Image downloader");
    println!("Target: {} images per category/type", config.target_count);
    println!("Base path: {}", store.base().display());

    let mut console = StdConsole::stdio();
    let selection = match selection_from_options(&options, &catalog)? {
        Some(selection) => selection,
        None => match ask_selection(&mut console, &catalog)? {
            Some(selection) => selection,
            None => {
                println!("Nothing selected.");
                return Ok(());
            }
        },
    };

    let progress = ProgressStore::open(progress_file.clone(), &catalog)
        .await
        .with_context(|| format!("can't load progress from {}", progress_file.display()))?;

    let report = match options.policy {
        Policy::Console => {
            run_with(
                catalog,
                store,
                config,
                &selection,
                &progress,
                ConsoleDecider::new(console),
            )
            .await?
        }
        Policy::ApproveFirst => {
            run_with(
                catalog,
                store,
                config,
                &selection,
                &progress,
                ScriptedDecider::approve_first(),
            )
            .await?
        }
        Policy::ApproveAll => {
            run_with(
                catalog,
                store,
                config,
                &selection,
                &progress,
                ScriptedDecider::approve_all(),
            )
            .await?
        }
    };
    print_summary(&report);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = DownloaderOptions::parse();

    setup_logging(options.debug)?;

    if let Err(err) = run(options).await {
        error!("{:#}", err);
        return Err(err);
    }
    Ok(())
}
