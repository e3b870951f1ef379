use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fundwise_core::ingest::amfi::AmfiLiveClient;
use fundwise_core::ingest::profiles::write_profiles;

mod snapshot;

#[derive(Debug, Parser)]
#[command(name = "fundwise_worker")]
struct Args {
    /// Historical dataset: CSV, or a file in the AMFI NAVAll.txt layout.
    #[arg(long)]
    hist_file: PathBuf,

    /// Output path for the profile snapshot. Defaults to the configured
    /// FUND_PROFILES_PATH.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Do everything except writing the snapshot.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = fundwise_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let live = AmfiLiveClient::from_settings(&settings)?;
    let catalog = snapshot::build_profile_snapshot(&live, &args.hist_file)
        .await
        .context("profile snapshot build failed")?;

    if args.dry_run {
        tracing::info!(
            dry_run = true,
            funds = catalog.len(),
            "profile snapshot built (dry-run, not written)"
        );
        return Ok(());
    }

    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(&settings.fund_profiles_path));
    write_profiles(&out, &catalog).context("profile snapshot write failed")?;

    tracing::info!(
        path = %out.display(),
        funds = catalog.len(),
        "profile snapshot written"
    );

    Ok(())
}

fn init_sentry(settings: &fundwise_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
