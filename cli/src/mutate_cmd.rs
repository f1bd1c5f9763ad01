//! `ytqf add` / `ytqf remove`.
//!
//! Runs both sides of the relay in-process: a [`Bridge`] holding the
//! session and a [`RelayClient`] issuing the request, joined by one
//! [`LocalBus`].

use std::sync::Arc;

use anyhow::Context;
use anyhow::bail;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use ytqf_bus::ContextOrigin;
use ytqf_bus::LocalBus;
use ytqf_bus::MessageBus;
use ytqf_bus::RelayClient;
use ytqf_core::Bridge;
use ytqf_core::FavoritesStore;
use ytqf_core::MutationExecutor;
use ytqf_core::RelayConfig;
use ytqf_core::favorites::default_target;
use ytqf_core::favorites::parse_collection_id;
use ytqf_protocol::MutationResult;
use ytqf_protocol::Operation;

#[derive(Debug, Parser)]
pub struct MutateArgs {
    /// Item (video) ID.
    pub item_id: String,

    /// Collection ID or URL. Defaults to the pinned favorite, else the first.
    pub collection: Option<String>,

    /// Output as JSON.
    #[arg(long = "json", short = 'j')]
    pub json: bool,
}

pub async fn run(operation: Operation, args: &MutateArgs, config: &RelayConfig) -> anyhow::Result<()> {
    let collection_id = resolve_collection(args.collection.as_deref(), config)?;
    let detail = relay(operation, &args.item_id, &collection_id, config).await?;

    match detail {
        Some(detail) if args.json => {
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
        Some(detail) => println!("{}", describe(&detail)),
        None if args.json => println!("null"),
        None => println!("Done"),
    }
    Ok(())
}

fn resolve_collection(explicit: Option<&str>, config: &RelayConfig) -> anyhow::Result<String> {
    if let Some(input) = explicit {
        return Ok(parse_collection_id(input)?);
    }
    let store = FavoritesStore::open(config.favorites_file.clone())
        .with_context(|| format!("failed to read {}", config.favorites_file.display()))?;
    let favorites = store.list()?;
    match default_target(&favorites) {
        Some(favorite) => {
            tracing::debug!(id = %favorite.id, title = %favorite.title, "using favorite collection");
            Ok(favorite.id.clone())
        }
        None => bail!("No favorite playlists configured yet."),
    }
}

async fn relay(
    operation: Operation,
    item_id: &str,
    collection_id: &str,
    config: &RelayConfig,
) -> anyhow::Result<Option<MutationResult>> {
    let executor = MutationExecutor::from_config(config).context("failed to build HTTP client")?;

    let bus: Arc<dyn MessageBus> = Arc::new(LocalBus::new());
    let origin = ContextOrigin::unique();
    let shutdown = CancellationToken::new();
    let bridge = Bridge::new(Arc::clone(&bus), origin, Arc::new(executor)).spawn(shutdown.clone());

    let client = RelayClient::with_timeout(bus, origin, config.request_timeout());
    let outcome = client.send(operation, item_id, collection_id).await;

    shutdown.cancel();
    if let Err(e) = bridge.await {
        tracing::warn!("bridge task ended abnormally: {e}");
    }
    Ok(outcome?)
}

fn describe(detail: &MutationResult) -> String {
    format!(
        "{} ({} via {})",
        detail.message, detail.collection_id, detail.endpoint
    )
}
