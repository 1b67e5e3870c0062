pub mod args;
pub mod commands;
pub mod logging;

use crate::args::Cli;
use crate::logging::Logger;
use anyhow::{Context, Result};
use clap::Parser;
use mstore::MetaStore;
use mstore::config::load_config;
use mstore_domain::config::AppConfig;
use mstore_vfs::LocalFileSystem;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config: AppConfig = load_config(cli.config.as_ref())?;
    if let Some(root) = cli.root {
        config.root = root;
    }
    if let Some(codec) = cli.codec {
        config.store.codec = codec;
    }

    let _logger = Logger::init(env!("CARGO_PKG_NAME"), &config.log, cli.verbose)?;
    debug!(root = %config.root.display(), codec = %config.store.codec, "Configuration resolved");

    let fs = LocalFileSystem::builder()
        .root(&config.root)
        .create(config.create)
        .connect()
        .await
        .with_context(|| format!("Cannot open store root {}", config.root.display()))?;

    let store = MetaStore::builder().filesystem(fs).config(&config.store).open().await?;

    let mut stdout = std::io::stdout().lock();
    commands::run(&store, cli.command, &mut stdout).await
}
