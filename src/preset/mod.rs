pub mod types;
pub use types::*;

#[cfg(feature = "catalog")]
pub mod cache;
#[cfg(feature = "catalog")]
pub mod loader;
#[cfg(feature = "catalog")]
pub mod manager;
