//! `churnkit explain` - export the strongest logistic regression weights

use std::path::PathBuf;

use anyhow::Result;

use super::args::ChurnConfig;
use crate::pipeline::{ChurnPipeline, ModelFamily};
use crate::report::{display_feature_weights, export_top_features, rank_coefficients, top_negative, top_positive};
use crate::utils::{print_step_header, print_success};

/// Write the `top` most positive and most negative coefficients of the
/// logistic regression pipeline. Returns the (positive, negative) file paths.
pub fn run_explain(config: &ChurnConfig, top: usize) -> Result<(PathBuf, PathBuf)> {
    print_step_header(1, "Explain Logistic Regression");

    let pipeline = ChurnPipeline::load_family(&config.models_dir, ModelFamily::LogReg)?;
    let model = pipeline
        .model
        .linear()
        .ok_or_else(|| anyhow::anyhow!("Pipeline '{}' does not hold a linear model", pipeline.family))?;

    let names = pipeline.preprocessor.feature_names();
    let ranked = rank_coefficients(&names, &model.coefficients)?;

    display_feature_weights("Pro-churn features", &top_positive(&ranked, top));
    display_feature_weights("Anti-churn features", &top_negative(&ranked, top));
    println!();

    let (positive, negative) = export_top_features(&config.reports_dir, &ranked, top)?;
    print_success(&format!("Wrote {} and {}", positive.display(), negative.display()));

    Ok((positive, negative))
}
