use skyway_booking::{BookingManager, ProfileService, SideEffectDispatcher, WalletService};
use skyway_catalog::{BroadcastingLedger, FlightSearchService, SearchRules};
use skyway_core::events::BookingEventSink;
use skyway_core::notification::Notifier;
use skyway_core::repository::{
    BookingRepository, FlightCatalog, InventoryLedger, PaymentMethodRepository, UserRepository,
};
use skyway_core::ticketing::Ticketing;
use skyway_shared::models::events::SeatAvailabilityEvent;
use skyway_store::app_config::RateLimitConfig;
use skyway_store::RedisClient;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

/// Storage and delivery backends. Postgres-backed in production, in-memory in tests.
pub struct Adapters {
    pub catalog: Arc<dyn FlightCatalog>,
    pub ledger: Arc<dyn InventoryLedger>,
    pub bookings: Arc<dyn BookingRepository>,
    pub users: Arc<dyn UserRepository>,
    pub payment_methods: Arc<dyn PaymentMethodRepository>,
    pub ticketing: Arc<dyn Ticketing>,
    pub notifier: Arc<dyn Notifier>,
    pub events: Arc<dyn BookingEventSink>,
}

#[derive(Clone)]
pub struct RateLimiter {
    pub redis: Arc<RedisClient>,
    pub config: RateLimitConfig,
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingManager>,
    pub search: Arc<FlightSearchService>,
    pub catalog: Arc<dyn FlightCatalog>,
    pub profiles: Arc<ProfileService>,
    pub wallet: Arc<WalletService>,
    pub auth: AuthConfig,
    pub rate_limiter: Option<RateLimiter>,
    pub tickets_dir: Option<PathBuf>,
    /// Fed by every seat reservation and release.
    pub seat_updates: broadcast::Sender<SeatAvailabilityEvent>,
}

impl AppState {
    pub fn new(adapters: Adapters, auth: AuthConfig, search_rules: SearchRules) -> Self {
        let (seat_updates, _) = broadcast::channel(100);
        let ledger: Arc<dyn InventoryLedger> =
            Arc::new(BroadcastingLedger::new(adapters.ledger, seat_updates.clone()));

        let side_effects = SideEffectDispatcher::new(
            adapters.ticketing,
            adapters.notifier,
            adapters.events,
            adapters.bookings.clone(),
        );
        let bookings = BookingManager::new(
            adapters.catalog.clone(),
            ledger.clone(),
            adapters.bookings,
            adapters.users.clone(),
            adapters.payment_methods.clone(),
            side_effects,
        );

        Self {
            bookings: Arc::new(bookings),
            search: Arc::new(FlightSearchService::new(
                adapters.catalog.clone(),
                ledger,
                search_rules,
            )),
            catalog: adapters.catalog,
            profiles: Arc::new(ProfileService::new(adapters.users)),
            wallet: Arc::new(WalletService::new(adapters.payment_methods)),
            auth,
            rate_limiter: None,
            tickets_dir: None,
            seat_updates,
        }
    }

    pub fn with_rate_limit(mut self, redis: Arc<RedisClient>, config: RateLimitConfig) -> Self {
        self.rate_limiter = Some(RateLimiter { redis, config });
        self
    }

    /// Serve stored ticket documents under `/tickets`.
    pub fn with_ticket_files(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tickets_dir = Some(dir.into());
        self
    }
}
