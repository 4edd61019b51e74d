//! safe-sync: reconcile a Safe-Sync repository with the transaction service
//! and the chain, submit pending proposals and commit the result.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use shared_types::Address;
use ss_01_entity_store::DiskBackend;
use sync_runtime::container::{DEFAULT_DELEGATE_KEY_ENV, DEFAULT_MULTI_SEND};
use sync_runtime::{Collaborators, SyncConfig, SyncRunner};
use sync_telemetry::{init_telemetry, TelemetryConfig};
use tracing::error;

fn parse_address(raw: &str) -> Result<Address, String> {
    let bytes = hex::decode(raw.trim_start_matches("0x")).map_err(|e| e.to_string())?;
    if bytes.len() != 20 {
        return Err(format!("expected 20 bytes, got {}", bytes.len()));
    }
    Ok(Address::from_slice(&bytes))
}

/// Reconcile Safes, transactions and proposals with their on-chain state.
#[derive(Parser, Debug)]
#[command(name = "safe-sync")]
#[command(about = "Sync a Safe-Sync repository and submit pending proposals")]
struct Args {
    /// Repository root containing safes/, eoas/, transactions/ and proposals/
    #[arg(long, env = "SAFE_SYNC_ROOT", default_value = ".")]
    root: PathBuf,

    #[arg(long, env = "SAFE_SYNC_CHAIN_ID", default_value_t = 1)]
    chain_id: u64,

    /// Transaction service base URL
    #[arg(long, env = "SAFE_SYNC_SERVICE_URL", default_value = "https://safe-transaction-mainnet.safe.global")]
    service_url: String,

    /// JSON-RPC endpoint used for getTransactionHash and eth_getCode
    #[arg(long, env = "SAFE_SYNC_RPC_URL", default_value = "http://127.0.0.1:8545")]
    rpc_url: String,

    /// Simulator command; the request arguments are appended
    #[arg(long, env = "SAFE_SYNC_SIMULATOR", num_args = 1.., value_delimiter = ' ', default_value = "safe-sync-simulate")]
    simulator: Vec<String>,

    /// MultiSendCallOnly contract used to batch several calls
    #[arg(long, env = "SAFE_SYNC_MULTI_SEND", value_parser = parse_address)]
    multi_send: Option<Address>,

    /// Directory for per-proposal manifests
    #[arg(long, env = "SAFE_SYNC_MANIFEST_DIR")]
    manifest_dir: Option<PathBuf>,

    /// Hash everything but submit and commit nothing; print the diff
    #[arg(long, env = "SAFE_SYNC_DRY_RUN")]
    dry_run: bool,

    /// Skip refreshing Safe state from the transaction service
    #[arg(long, env = "SAFE_SYNC_OFFLINE")]
    offline: bool,

    /// Environment variable holding the delegate's private key
    #[arg(long, default_value = DEFAULT_DELEGATE_KEY_ENV)]
    delegate_key_env: String,

    /// Webhook receiving proposal notifications
    #[arg(long, env = "SAFE_SYNC_NOTIFY_WEBHOOK")]
    notify_webhook: Option<String>,

    /// `origin` attached to proposed transactions
    #[arg(long, env = "SAFE_SYNC_ORIGIN", default_value = "safe-sync")]
    origin: String,

    /// Print run metrics in Prometheus text format when done
    #[arg(long)]
    metrics: bool,
}

impl Args {
    fn config(&self) -> SyncConfig {
        SyncConfig {
            root: self.root.clone(),
            chain_id: self.chain_id,
            service_url: self.service_url.clone(),
            rpc_url: self.rpc_url.clone(),
            simulator: self.simulator.clone(),
            multi_send: self.multi_send.unwrap_or(DEFAULT_MULTI_SEND),
            manifest_dir: self.manifest_dir.clone(),
            dry_run: self.dry_run,
            offline: self.offline,
            delegate_key_env: self.delegate_key_env.clone(),
            notify_webhook: self.notify_webhook.clone(),
            origin: self.origin.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let telemetry = init_telemetry(TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    let config = args.config();
    config.validate().context("Invalid configuration")?;
    let parts = Collaborators::from_config(&config)?;
    let backend = Box::new(DiskBackend::new(config.root.clone()));
    let runner = SyncRunner::new(config, parts, telemetry.metrics);

    let report = match runner.run(backend).await {
        Ok(report) => report,
        Err(err) => {
            error!(error = %err, "Sync run failed; nothing committed");
            return Err(err).context("Sync run failed");
        }
    };

    if runner.config().dry_run {
        if let Some(diff) = report.diff.as_deref().filter(|d| !d.is_empty()) {
            println!("{diff}");
        }
        for manifest in &report.manifests {
            print!("{}", manifest.to_json().context("Failed to encode manifest")?);
        }
    }
    print!("{}", report.summary());
    if args.metrics {
        print!("{}", runner.metrics().render().context("Failed to render metrics")?);
    }
    Ok(())
}
