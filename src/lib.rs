pub mod app;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod merge;
pub mod models;
pub mod stats;
pub mod storage;
pub mod ui;

pub use app::{run, run_at, RunSummary};
pub use config::{Args, Config, Environment};
pub use errors::TrafficError;
pub use fetch::GitHubClient;
pub use storage::{load_dataset, save_dataset};
pub use ui::{render_report, write_report};
