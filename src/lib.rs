pub mod audit;
pub mod authz;
pub mod cache;
pub mod context;
pub mod db;
pub mod errors;
pub mod lifecycle;
pub mod models;
pub mod reports;
pub mod settings;
pub mod stats;
pub mod store;
pub mod utils;

// Re-export commonly used items for callers and tests
pub use errors::{AppError, AppResult};

pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
