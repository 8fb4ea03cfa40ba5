//! Pipeline module - data preparation, models, metrics and artifacts

pub mod artifact;
pub mod loader;
pub mod metrics;
pub mod models;
pub mod preprocess;
pub mod schema;
pub mod split;
pub mod target;

pub use artifact::*;
pub use loader::*;
pub use metrics::*;
pub use models::{Classifier, FittedModel, ModelFamily, ModelSettings};
pub use preprocess::*;
pub use schema::*;
pub use split::*;
pub use target::*;
