//! churnkit: customer churn modelling library
//!
//! Loads a tabular customer dataset, trains several classifiers behind one
//! preprocessing pipeline, evaluates them on a held-out split, tunes a
//! decision threshold, explains the linear model and scores new CSV files.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
