use anyhow::Context;
use skyway_api::{app, Adapters, AppState, AuthConfig};
use skyway_core::notification::Notifier;
use skyway_store::app_config::{Config, EmailMode};
use skyway_store::{
    ConsoleNotifier, DbClient, FileTicketStore, PostgresBookingRepository, PostgresFlightCatalog,
    PostgresInventoryLedger, PostgresPaymentMethodRepository, PostgresUserRepository, RedisClient, SmtpNotifier,
    TracingEventSink,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skyway_api=debug,skyway_booking=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Skyway API on port {}", config.server.port);

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;
    let pool = db.pool.clone();

    let notifier: Arc<dyn Notifier> = match config.email.mode {
        EmailMode::Console => Arc::new(ConsoleNotifier::new()),
        EmailMode::Smtp => Arc::new(SmtpNotifier::new(&config.email).context("Invalid SMTP settings")?),
    };

    let adapters = Adapters {
        catalog: Arc::new(PostgresFlightCatalog::new(pool.clone())),
        ledger: Arc::new(PostgresInventoryLedger::new(pool.clone())),
        bookings: Arc::new(PostgresBookingRepository::new(pool.clone())),
        users: Arc::new(PostgresUserRepository::new(pool.clone())),
        payment_methods: Arc::new(PostgresPaymentMethodRepository::new(pool)),
        ticketing: Arc::new(FileTicketStore::new(
            &config.ticketing.storage_dir,
            &config.ticketing.public_base_url,
        )),
        notifier,
        events: Arc::new(TracingEventSink::new()),
    };

    let mut state = AppState::new(
        adapters,
        AuthConfig { secret: config.auth.jwt_secret.clone() },
        config.search.clone(),
    )
    .with_ticket_files(&config.ticketing.storage_dir);

    match &config.redis {
        Some(redis) => {
            let client = RedisClient::new(&redis.url)
                .await
                .context("Failed to connect to Redis")?;
            state = state.with_rate_limit(Arc::new(client), config.rate_limit.clone());
        }
        None => tracing::warn!("No Redis configured, rate limiting disabled"),
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state).into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
