//! CLI module - argument parsing and one runner per subcommand

pub mod args;
pub mod dataset;
pub mod evaluate;
pub mod explain;
pub mod predict;
pub mod threshold;
pub mod train;

pub use args::{resolve_families, ChurnConfig, Cli, Commands};
pub use dataset::PreparedDataset;
pub use evaluate::run_evaluate;
pub use explain::run_explain;
pub use predict::{default_prediction_path, run_predict, score_frame, PredictionOutcome};
pub use threshold::run_tune_threshold;
pub use train::run_train;
