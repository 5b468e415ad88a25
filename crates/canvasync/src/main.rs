use anyhow::{Context, Result};
use canvasync_auth::Credentials;
use clap::Parser;

mod cli;
mod config;
mod logging;
mod sync;

use cli::App;
use config::Config;

fn main() -> Result<()> {
    let app = App::parse();
    logging::init_logging(app.verbose);

    let config = Config::load(app.config.as_deref())?.merge(&app);
    let credentials = Credentials::new(&app.username, &app.password);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config::available_cores())
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    runtime.block_on(run(&app, &config, &credentials))
}

async fn run(app: &App, config: &Config, credentials: &Credentials) -> Result<()> {
    match &app.url {
        Some(url) => {
            let path = sync::fetch_one(config, credentials, url, app.filename.as_deref()).await?;
            println!("saved {}", path.display());
        }
        None => {
            let report = sync::sync_all(config, credentials).await?;
            sync::print_summary(&report);
        }
    }
    Ok(())
}
