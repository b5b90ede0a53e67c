pub mod accounts;
pub mod app;
pub mod auth;
pub mod clock;
pub mod config;
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod ledger;
pub mod manager;
pub mod models;
pub mod stats;
pub mod storage;
pub mod state;

pub use app::router;
pub use config::Config;
pub use manager::LedgerManager;
pub use state::AppState;
pub use storage::{JsonFileStore, Store};
