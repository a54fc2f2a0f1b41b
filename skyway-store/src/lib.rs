pub mod account_repo;
pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod events;
pub mod flight_repo;
pub mod inventory_repo;
pub mod mailer;
pub mod redis_repo;
pub mod ticket_store;

pub use account_repo::{PostgresPaymentMethodRepository, PostgresUserRepository};
pub use app_config::Config;
pub use booking_repo::PostgresBookingRepository;
pub use database::DbClient;
pub use events::TracingEventSink;
pub use flight_repo::PostgresFlightCatalog;
pub use inventory_repo::PostgresInventoryLedger;
pub use mailer::{ConsoleNotifier, SmtpNotifier};
pub use redis_repo::RedisClient;
pub use ticket_store::FileTicketStore;
