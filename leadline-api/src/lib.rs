pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod helpers;

#[cfg(test)]
pub(crate) mod testing;

pub use database::Database;
pub use engine::Engine;
pub use error::LeadError;
