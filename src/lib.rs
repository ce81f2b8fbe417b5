pub mod app;
pub mod config;
pub mod dates;
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod query;
pub mod state;
pub mod stats;
pub mod storage;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use stats::aggregate;
pub use storage::load_data;
