pub mod audit;
pub mod clock;
pub mod database;
pub mod notifier;
pub mod sanitize;
pub mod storage;
