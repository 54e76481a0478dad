//! rarc - A command-line client for Phabricator
//!
//! Lists revisions and resolves users, repositories and PHIDs through the
//! Conduit API, caching idempotent lookups on disk.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rarc::cache::{CacheStore, CallCache};
use rarc::cli::{Cli, Command};
use rarc::commands;
use rarc::config::{CacheLocation, Settings};
use rarc::data::{ConduitClient, Context};

/// Initializes logging to stderr
///
/// Defaults to warnings only, or debug output with `--verbose`; `RUST_LOG`
/// overrides both.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "rarc=debug" } else { "rarc=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn open_store(location: &CacheLocation) -> CacheStore {
    match location {
        CacheLocation::Default => CacheStore::with_default_dir(),
        CacheLocation::Dir(dir) => CacheStore::open(dir),
        CacheLocation::MemoryOnly => CacheStore::in_memory(),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::from_cli(&cli);
    let cache = CallCache::new(Arc::new(open_store(&settings.cache)));

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Command::Cache { action } = &cli.command {
        commands::cache::run(cache.store(), *action, &mut out)?;
        return Ok(());
    }

    let api = settings.api()?;
    tracing::debug!(url = %api.url, "using conduit");
    let ctx = Context::new(ConduitClient::new(&api.url, &api.token), cache);

    match &cli.command {
        Command::Whoami => commands::whoami::run(&ctx, &settings, &mut out).await?,
        Command::Diff(args) => {
            let workdir = std::env::current_dir().context("Failed to get the current directory")?;
            commands::diff::run(&ctx, &settings, args, &workdir, &mut out).await?
        }
        Command::Phid { phids } => commands::phid::run(&ctx, &settings, phids, &mut out).await?,
        Command::Cache { .. } => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
