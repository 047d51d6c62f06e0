use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use market_chain::{create_executor, ExecutorService};
use market_config::{Config, ConfigLoader};
use market_core::{EngineBuilder, EngineSettings, GasPolicy, MarketplaceEngine};
use market_session::{AutoConfirm, ConfirmationInterface, Session, TerminalConfirm};
use market_store::{create_store, StoreService};
use market_types::{ListingEvent, MarketEvent, PurchaseEvent, Uint};

mod api;

#[derive(Parser)]
#[command(name = "market-service")]
#[command(about = "ApeChain NFT marketplace service", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	#[arg(short, long, value_name = "FILE", default_value = "config/local.toml")]
	config: PathBuf,

	#[arg(long, env = "MARKET_LOG_LEVEL", default_value = "info")]
	log_level: String,
}

#[derive(Subcommand)]
enum Commands {
	/// Start the listing API server
	Serve,
	/// Validate the configuration file
	Validate,
	/// Print the listing table
	Listings,
	/// List a token at a price in APE
	List { token_id: Uint, price: Decimal },
	/// Change the price of an existing listing
	Update { token_id: Uint, price: Decimal },
	/// Buy a listed token
	Buy {
		token_id: Uint,
		/// Answer yes to every confirmation prompt
		#[arg(long)]
		yes: bool,
	},
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	// Initialize tracing
	setup_tracing(&cli.log_level)?;

	// Handle commands
	match cli.command {
		Some(Commands::Serve) | None => serve(&cli.config).await,
		Some(Commands::Validate) => validate_config(&cli.config).await,
		Some(Commands::Listings) => show_listings(&cli.config).await,
		Some(Commands::List { token_id, price }) => list_token(&cli.config, token_id, price).await,
		Some(Commands::Update { token_id, price }) => {
			update_token(&cli.config, token_id, price).await
		}
		Some(Commands::Buy { token_id, yes }) => buy_token(&cli.config, token_id, yes).await,
	}
}

async fn serve(config_path: &Path) -> Result<()> {
	info!("Starting listing API service");

	let config = load_config(config_path).await?;
	let store = Arc::new(StoreService::new(
		create_store(&config.store).context("Failed to create listing store")?,
	));
	let state = api::AppState {
		store,
		ipfs_gateway: config.media.ipfs_gateway.clone(),
	};

	api::serve(state, &config.api.bind_address, setup_shutdown_signal()).await
}

async fn validate_config(config_path: &Path) -> Result<()> {
	info!("Validating configuration file: {:?}", config_path);

	let config = load_config(config_path).await?;

	info!("Configuration is valid");
	info!("Chain ID: {}", config.chain.chain_id);
	info!("Settlement contract: {}", config.chain.settlement_contract);
	info!("Collection contract: {}", config.chain.collection_contract);
	info!("Store backend: {}", config.store.backend);
	info!("Listing duration: {}s", config.listing.duration_secs);
	info!("API bind address: {}", config.api.bind_address);

	Ok(())
}

async fn show_listings(config_path: &Path) -> Result<()> {
	let config = load_config(config_path).await?;
	let store = StoreService::new(
		create_store(&config.store).context("Failed to create listing store")?,
	);

	let rows = store.listings().await.context("Failed to read listings")?;
	if rows.is_empty() {
		println!("no rows");
		return Ok(());
	}

	println!("{:<12} {:<20} {:<14} {}", "TOKEN", "STATE", "PRICE (APE)", "SELLER");
	for row in rows {
		let price = row
			.price
			.map(|p| p.to_string())
			.unwrap_or_else(|| "-".to_string());
		let seller = row
			.seller_address
			.map(|a| a.to_string())
			.unwrap_or_else(|| "-".to_string());
		println!(
			"{:<12} {:<20} {:<14} {}",
			row.token_id.to_string(),
			row.state().to_string(),
			price,
			seller
		);
	}

	Ok(())
}

async fn list_token(config_path: &Path, token_id: Uint, price: Decimal) -> Result<()> {
	let config = load_config(config_path).await?;
	let (engine, session) = connect(&config, Arc::new(TerminalConfirm)).await?;
	let _events = spawn_event_logger(&engine);

	let fingerprint = engine
		.list(&session, token_id, price)
		.await
		.context("Failed to create listing")?;
	println!(
		"Listed token {} at {} APE (order hash {})",
		token_id, price, fingerprint
	);

	Ok(())
}

async fn update_token(config_path: &Path, token_id: Uint, price: Decimal) -> Result<()> {
	let config = load_config(config_path).await?;
	let (engine, session) = connect(&config, Arc::new(TerminalConfirm)).await?;
	let _events = spawn_event_logger(&engine);

	let fingerprint = engine
		.update_price(&session, token_id, price)
		.await
		.context("Failed to update listing")?;
	println!(
		"Re-listed token {} at {} APE (order hash {})",
		token_id, price, fingerprint
	);

	Ok(())
}

async fn buy_token(config_path: &Path, token_id: Uint, yes: bool) -> Result<()> {
	let config = load_config(config_path).await?;
	let confirmations: Arc<dyn ConfirmationInterface> = if yes {
		Arc::new(AutoConfirm::new(true))
	} else {
		Arc::new(TerminalConfirm)
	};
	let (engine, session) = connect(&config, confirmations).await?;
	let _events = spawn_event_logger(&engine);

	info!(%token_id, buyer = %session.address, "starting purchase");
	match engine.buy(&session, token_id).await {
		Ok(outcome) => {
			println!(
				"Purchase complete: token {} for {} APE (tx {})",
				token_id,
				outcome.amount.format_native(),
				outcome.tx_hash
			);
			Ok(())
		}
		Err(err) => {
			if err.requires_relist() {
				warn!("the listing is unusable and must be re-created by the seller");
			}
			Err(err.into())
		}
	}
}

async fn load_config(config_path: &Path) -> Result<Config> {
	ConfigLoader::new()
		.with_file(config_path)
		.load()
		.await
		.context("Failed to load configuration")
}

async fn connect(
	config: &Config,
	confirmations: Arc<dyn ConfirmationInterface>,
) -> Result<(MarketplaceEngine, Session)> {
	let executor = Arc::new(ExecutorService::new(
		create_executor(&config.chain).context("Failed to create chain executor")?,
	));
	let store = Arc::new(StoreService::new(
		create_store(&config.store).context("Failed to create listing store")?,
	));

	let session = Session::connect(&executor, confirmations)
		.await
		.context("Failed to connect session")?;

	let engine = EngineBuilder::new(EngineSettings {
		listing_duration_secs: config.listing.duration_secs,
		gas: GasPolicy {
			margin_percent: config.gas.margin_percent,
			fallback_limit: config.gas.fallback_limit,
		},
	})
	.with_executor(executor)
	.with_store(store)
	.build()
	.context("Failed to build engine")?;

	Ok((engine, session))
}

/// Forwards engine events to the log so long-running steps, approval
/// grants and receipt waits in particular, stay visible.
fn spawn_event_logger(engine: &MarketplaceEngine) -> tokio::task::JoinHandle<()> {
	let mut receiver = engine.event_bus().subscribe();
	tokio::spawn(async move {
		while let Ok(event) = receiver.recv().await {
			match event {
				MarketEvent::Listing(ListingEvent::ApprovalRequested { seller, tx_hash }) => {
					info!(%seller, %tx_hash, "approval transaction submitted, waiting for inclusion");
				}
				MarketEvent::Listing(ListingEvent::Created { token_id, .. }) => {
					debug!(%token_id, "listing event: created");
				}
				MarketEvent::Listing(ListingEvent::PriceUpdated { token_id, .. }) => {
					debug!(%token_id, "listing event: price updated");
				}
				MarketEvent::Purchase(PurchaseEvent::Started { token_id, .. }) => {
					debug!(%token_id, "purchase event: started");
				}
				MarketEvent::Purchase(PurchaseEvent::FallbackGasConfirmed {
					token_id,
					gas_limit,
				}) => {
					info!(%token_id, gas_limit, "fallback gas limit confirmed");
				}
				MarketEvent::Purchase(PurchaseEvent::TransactionPending { token_id, tx_hash }) => {
					info!(%token_id, %tx_hash, "settlement transaction submitted, waiting for inclusion");
				}
				MarketEvent::Purchase(PurchaseEvent::Completed { token_id, .. }) => {
					debug!(%token_id, "purchase event: completed");
				}
				MarketEvent::Purchase(PurchaseEvent::Failed { token_id, reason }) => {
					warn!(%token_id, reason, "purchase failed");
				}
			}
		}
	})
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();

	Ok(())
}

async fn setup_shutdown_signal() {
	let ctrl_c = async {
		signal::ctrl_c()
			.await
			.expect("failed to install Ctrl+C handler");
	};

	#[cfg(unix)]
	let terminate = async {
		signal::unix::signal(signal::unix::SignalKind::terminate())
			.expect("failed to install signal handler")
			.recv()
			.await;
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
