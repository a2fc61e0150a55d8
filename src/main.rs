//! Flow Oracle Updater Service
//!
//! Main entry point for the FLOW/USD price oracle updater.
//! This service:
//! - Fetches the spot price from an external feed on a fixed interval
//! - Commits it to the on-chain `PriceOracle` contract and waits for the seal
//! - Persists every observation and derives per-protocol APY snapshots

use flow_oracle_updater::config::{AppConfig, LogFormat};
use flow_oracle_updater::database::{create_pool, run_migrations, Database};
use flow_oracle_updater::error::{AppError, AppResult};
use flow_oracle_updater::flow_client::{FlowAccessClient, FlowAddress, LedgerAccess, TransactionSigner};
use flow_oracle_updater::price_feed::CoinGeckoPriceFeed;
use flow_oracle_updater::repositories::PgRecordStore;
use flow_oracle_updater::services::{
    unexpected_exit, AnalyticsEngine, CycleOrchestrator, LedgerSubmitter, Scheduler,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("flow_oracle_updater={},sqlx=warn", config.log_level).into()
    });

    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// Connect to the access node and check the configured key can sign for the account
async fn connect_ledger(config: &AppConfig) -> AppResult<LedgerSubmitter> {
    let flow = &config.flow;
    let account: FlowAddress = flow.account_address.parse().map_err(AppError::Config)?;
    let contract: FlowAddress = flow.contract_address.parse().map_err(AppError::Config)?;

    info!("Connecting to Flow access node {}...", flow.access_node);
    let client = FlowAccessClient::connect(&flow.access_node).await.map_err(|e| {
        error!("Failed to connect to Flow access node: {}", e);
        AppError::Ledger(e)
    })?;

    if let Err(e) = client.ping().await {
        warn!("Flow access node ping failed: {}", e);
    }
    info!("✓ Connected to Flow access node {}", client.endpoint());

    let on_chain = client.get_account(account).await.map_err(|e| {
        error!("Failed to load account {}: {}", account, e);
        AppError::Ledger(e)
    })?;
    let key = on_chain.key(flow.key_index).ok_or_else(|| {
        AppError::Config(format!(
            "Account {} has no key at index {}",
            account, flow.key_index
        ))
    })?;
    let signer = TransactionSigner::for_account_key(&flow.private_key_hex, key)
        .map_err(AppError::Config)?;

    info!(
        "✓ Signer verified for {} key #{} ({:?}/{:?})",
        account,
        flow.key_index,
        signer.signature_algorithm(),
        signer.hash_algorithm()
    );
    if on_chain.balance == 0 {
        warn!("Account {} has zero FLOW balance, transactions will fail to pay fees", account);
    } else {
        info!("Account {} balance: {} (1e-8 FLOW)", account, on_chain.balance);
    }
    info!("✓ PriceOracle contract at {}", contract);

    Ok(LedgerSubmitter::new(Arc::new(client), signer, account, flow.key_index, contract)
        .with_gas_limit(flow.gas_limit)
        .with_poll_interval(flow.seal_poll_interval()))
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    init_tracing(&config);

    info!("Flow oracle updater starting");
    info!("Log level: {}", config.log_level);
    info!("Symbol: {}", config.oracle.symbol);
    info!("Update interval: {:?}", config.oracle.update_interval());

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Database(e)
    })?;
    let database = Database::new(pool.clone());

    info!("Database connection pool created successfully");
    info!("Max connections: {}", config.database.max_connections);

    if config.database.run_migrations {
        info!("Running database migrations...");
        run_migrations(&pool).await.map_err(|e| {
            error!("Database migration failed: {}", e);
            AppError::Database(e)
        })?;
        info!("Database migrations completed successfully");
    }

    // =========================================================================
    // CORE SERVICES INITIALIZATION
    // =========================================================================
    let price_feed = CoinGeckoPriceFeed::new(&config.oracle.price_feed_url)?
        .with_coin_id(&config.oracle.symbol, &config.oracle.coin_id)
        .with_max_attempts(config.oracle.price_fetch_max_attempts);
    info!("✓ Price feed initialized ({})", config.oracle.price_feed_url);

    let analytics = AnalyticsEngine::new(
        config.oracle.protocols.clone(),
        config.oracle.min_apy,
        config.oracle.max_apy,
    );
    info!(
        "✓ Analytics initialized for {} protocols",
        analytics.protocols().len()
    );

    let mut orchestrator = CycleOrchestrator::new(
        config.oracle.symbol.clone(),
        Arc::new(price_feed),
        Arc::new(PgRecordStore::new(pool.clone())),
        analytics,
    )
    .with_seal_timeout(config.flow.seal_timeout());

    if config.oracle.skip_blockchain {
        warn!("SKIP_BLOCKCHAIN set - prices will only be stored in the database");
    } else {
        let submitter = connect_ledger(&config).await?;
        orchestrator = orchestrator.with_submitter(Arc::new(submitter));
        info!("✓ Ledger submitter initialized");
    }

    // =========================================================================
    // BACKGROUND TASKS
    // =========================================================================
    let scheduler = Scheduler::new(Arc::new(orchestrator)).with_interval(config.oracle.update_interval());
    let cancel = CancellationToken::new();

    let scheduler_cancel = cancel.clone();
    let mut scheduler_handle = tokio::spawn(async move { scheduler.run(scheduler_cancel).await });
    info!("✓ Scheduler started");
    info!("Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    let unexpected = tokio::select! {
        _ = tokio::signal::ctrl_c() => None,
        joined = &mut scheduler_handle => Some(joined),
    };

    let result = match unexpected {
        None => {
            info!("Shutdown signal received, shutting down gracefully...");
            cancel.cancel();
            match scheduler_handle.await {
                Ok(cycles) => {
                    info!("Scheduler finished after {} cycles", cycles);
                    Ok(())
                }
                Err(e) => {
                    error!("Scheduler task failed: {}", e);
                    Err(AppError::Scheduler(format!("task failed during shutdown: {}", e)))
                }
            }
        }
        Some(joined) => {
            let err = unexpected_exit(joined);
            error!("{}", err);
            Err(err)
        }
    };

    database.close().await;
    info!("Flow oracle updater shutdown complete");
    result
}
