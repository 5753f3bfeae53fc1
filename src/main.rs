use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod auth;
mod catalog;
mod cli;
mod config;
#[cfg(test)]
mod tests;
mod video;
mod web;

use app::AppFactory;
use config::Config;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();

    match args.command {
        cli::Command::Daemon {} => {
            let paths = AppFactory::get_paths()?;
            let config = Config::load_with(&paths.base_path)?;
            let app = Arc::new(AppFactory::create_app_service(&paths, config)?);

            // the blocking http client must be dropped outside the runtime
            let result = web::start_daemon(app.clone());
            drop(app);
            result
        }

        cli::Command::Meta {
            url,
            require_view_count,
        } => {
            let paths = AppFactory::get_paths()?;
            let mut config = Config::load_with(&paths.base_path)?;
            config.video.require_view_count |= require_view_count;

            let fetcher = AppFactory::create_video_fetcher(&config)?;
            let meta = fetcher.fetch_metadata(&url)?;

            println!("{}", serde_json::to_string_pretty(&meta)?);
            Ok(())
        }

        cli::Command::VideoId { url } => {
            println!("{}", video::extract_video_id(&url)?);
            Ok(())
        }
    }
}
