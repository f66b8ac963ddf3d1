use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use tokio::runtime::Runtime;

use vault_backup::cli::Args;
use vault_backup::cloud::client::create_s3_client;
use vault_backup::cloud::streaming::S3ObjectStore;
use vault_backup::config::{require_bucket, AmbientConfig, S3Settings, TransferSettings, VaultSettings};
use vault_backup::naming::current_snapshot_key;
use vault_backup::security::safe_error_message;
use vault_backup::transfer::{run_transfer, TransferJob, TransferReport};
use vault_backup::vault::auth::CredentialResolver;
use vault_backup::vault::client::VaultStore;
use vault_backup::vault::secrets::materialize;

fn main() {
    let args = Args::parse();

    if let Err(e) = initialize_logging(args.verbose) {
        eprintln!("{:#}", e);
    }

    let runtime = match Runtime::new().context("Failed to create Tokio runtime") {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(run(args)) {
        Ok(report) => {
            info!("Vault snapshot uploaded as {}", report.location.key);
        }
        Err(e) => {
            error!("{}", safe_error_message("Vault backup failed", &format!("{:#}", e)));
            std::process::exit(1);
        }
    }
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ).context("Failed to initialize logger")?;
    Ok(())
}

/// One backup run: authenticate, materialize settings, stream the snapshot.
async fn run(args: Args) -> Result<TransferReport> {
    let mut ambient = AmbientConfig::from_env();
    let settings = TransferSettings::from_cli(args.buffer_size, args.part_size)?;

    // Without a secret nothing can supply the bucket later, so fail before
    // touching the network.
    let location = args.secret_location();
    if !location.is_configured() {
        require_bucket(&ambient)?;
    }

    let vault = Arc::new(VaultStore::new(VaultSettings::from_ambient(&ambient)?)?);

    let mut resolver = CredentialResolver::new();
    let session = resolver.resolve(&args.auth_options(), &ambient, vault.as_ref()).await?;

    let materialized = materialize(vault.as_ref(), &session, &location, &mut ambient).await?;
    if location.is_configured() {
        debug!(
            "Applied {} settings from {}/{} ({} skipped)",
            materialized.applied.len(),
            location.mount,
            location.path,
            materialized.skipped.len()
        );
    }

    let s3 = S3Settings::from_ambient(&ambient)?;
    let client = create_s3_client(&s3)?;
    let store = S3ObjectStore::from_client(client, settings.part_size);

    let job = TransferJob::new(s3.bucket, current_snapshot_key());
    info!("Streaming Vault snapshot to s3://{}/{}", job.bucket, job.key);

    let report = run_transfer(vault, session, &store, &job, settings).await?;
    Ok(report)
}
