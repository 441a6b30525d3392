use dotenvy::dotenv;
use gig_escrow::{
    api::{self, AppState},
    config::{self, database},
    core::{
        ChatService, GigLifecycleManager, ManualPayoutGateway, MilestoneEscrowEngine,
        clock::{SystemClock, UuidGenerator},
    },
    errors::{Error, Result},
};
use std::{env, net::SocketAddr, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();

    // 3. Load marketplace configuration (file, then env overrides, then validation)
    let marketplace = Arc::new(
        config::load_app_configuration()
            .inspect_err(|e| error!("Failed to load configuration: {}", e))?,
    );

    // 4. Connect and make sure every table exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Wire the managers
    let db = Arc::new(db);
    let clock = Arc::new(SystemClock);
    let ids = Arc::new(UuidGenerator);
    let gateway = Arc::new(ManualPayoutGateway::new(ids.clone()));
    let gigs = GigLifecycleManager::new(
        Arc::clone(&db),
        Arc::clone(&marketplace),
        clock.clone(),
        ids.clone(),
    );
    let escrow = MilestoneEscrowEngine::new(
        Arc::clone(&db),
        &marketplace,
        gateway,
        clock.clone(),
        ids.clone(),
    )?;
    let chats = ChatService::new(db, clock, ids);

    // 6. Serve
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let addr: SocketAddr = bind_addr.parse().map_err(|e| Error::Config {
        message: format!("Invalid BIND_ADDR '{bind_addr}': {e}"),
    })?;
    api::serve(addr, AppState::new(gigs, escrow, chats)).await
}
