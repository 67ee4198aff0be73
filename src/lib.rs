pub mod app;
pub mod config;
pub mod db;
pub mod exchange_rate;

pub use config::DbConfig;
pub use db::ConnectionManager;
pub use exchange_rate::{ExchangeRate, NewExchangeRate};
