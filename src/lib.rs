pub mod cli;
pub mod config;
pub mod conn;
pub mod engine;
pub mod reconcile;
pub mod store;

pub use config::Opts;
pub use conn::{ConnectionManager, RetryPolicy};
pub use reconcile::{Reconciler, SweepStats};
