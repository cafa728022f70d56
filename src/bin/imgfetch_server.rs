use anyhow::{Context, Result};
use clap::Parser;
use imgfetch::cli::ServerOptions;
use imgfetch::config::{Settings, setup_logging};
use imgfetch::retrieve::HttpRetriever;
use imgfetch::sources::HttpSources;
use imgfetch::web::{AppState, setup_server};
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = ServerOptions::parse();

    setup_logging(cli.debug)?;

    let settings = Settings::from_options(&cli.store, cli.delay_ms)?;
    let progress = settings.open_progress().await.with_context(|| {
        format!(
            "can't load progress from {}",
            settings.progress_file.display()
        )
    })?;

    let sources = HttpSources::new(&settings.catalog)?;
    let state = AppState::new(
        settings.catalog,
        settings.store,
        sources,
        HttpRetriever::new()?,
        settings.fetch,
        progress,
    );

    if let Err(err) = setup_server(&cli.listen_address, cli.port, state).await {
        error!("Application error: {}", err);
        return Err(err);
    }
    Ok(())
}
