pub mod changes;
pub mod fulfillment;
pub mod manager;
pub mod memory;
pub mod profile;
pub mod wallet;

#[cfg(test)]
mod test_support;

pub use changes::PassengerChanges;
pub use fulfillment::SideEffectDispatcher;
pub use manager::BookingManager;
pub use memory::{InMemoryBookingRepository, InMemoryPaymentMethodRepository, InMemoryUserRepository};
pub use profile::ProfileService;
pub use wallet::WalletService;
