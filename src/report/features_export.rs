//! Linear model coefficient export

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

/// Features pushing towards churn, strongest first
pub const TOP_POSITIVE_FILE: &str = "logreg_top_positive_features.csv";

/// Features pushing away from churn, strongest first
pub const TOP_NEGATIVE_FILE: &str = "logreg_top_negative_features.csv";

/// One expanded feature and its coefficient
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWeight {
    pub feature: String,
    pub weight: f64,
}

/// Pair names with coefficients and sort ascending by weight (stable)
pub fn rank_coefficients(names: &[String], coefficients: &[f64]) -> Result<Vec<FeatureWeight>> {
    if names.len() != coefficients.len() {
        anyhow::bail!(
            "Model has {} coefficients but the preprocessor produces {} features",
            coefficients.len(),
            names.len()
        );
    }

    let mut weights: Vec<FeatureWeight> = names
        .iter()
        .zip(coefficients)
        .map(|(feature, &weight)| FeatureWeight {
            feature: feature.clone(),
            weight,
        })
        .collect();
    weights.sort_by(|a, b| a.weight.total_cmp(&b.weight));
    Ok(weights)
}

/// Largest `k` weights, most positive first.
///
/// This is the reverse of taking the tail of the ascending ranking: row one of
/// the positive CSV is always the strongest churn driver.
pub fn top_positive(ranked: &[FeatureWeight], k: usize) -> Vec<FeatureWeight> {
    ranked.iter().rev().take(k).cloned().collect()
}

/// Smallest `k` weights, most negative first
pub fn top_negative(ranked: &[FeatureWeight], k: usize) -> Vec<FeatureWeight> {
    ranked.iter().take(k).cloned().collect()
}

/// Write weights as CSV with a `feature,weight` header
pub fn write_feature_weights_csv(path: &Path, weights: &[FeatureWeight]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let mut file = File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

    writeln!(file, "feature,weight")?;
    for w in weights {
        writeln!(file, "{},{}", escape_csv_field(&w.feature), w.weight)?;
    }

    Ok(())
}

/// Write both top-k files into the reports directory
pub fn export_top_features(reports_dir: &Path, ranked: &[FeatureWeight], k: usize) -> Result<(PathBuf, PathBuf)> {
    let positive_path = reports_dir.join(TOP_POSITIVE_FILE);
    let negative_path = reports_dir.join(TOP_NEGATIVE_FILE);
    write_feature_weights_csv(&positive_path, &top_positive(ranked, k))?;
    write_feature_weights_csv(&negative_path, &top_negative(ranked, k))?;
    Ok((positive_path, negative_path))
}

/// Escape a field for CSV (handle commas and quotes)
fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Print one weight list as an indented table
pub fn display_feature_weights(title: &str, weights: &[FeatureWeight]) {
    println!();
    println!("    {}", style(title).white().bold());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Feature").add_attribute(Attribute::Bold),
        Cell::new("Weight").add_attribute(Attribute::Bold),
    ]);

    for w in weights {
        let color = if w.weight >= 0.0 { Color::Red } else { Color::Green };
        table.add_row(vec![
            Cell::new(&w.feature),
            Cell::new(format!("{:+.4}", w.weight)).fg(color),
        ]);
    }

    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    #[test]
    fn test_rank_and_split() {
        let ranked = rank_coefficients(&names(4), &[0.5, -1.0, 2.0, -0.1]).unwrap();

        let positive = top_positive(&ranked, 2);
        let negative = top_negative(&ranked, 2);
        let pos: Vec<&str> = positive.iter().map(|w| w.feature.as_str()).collect();
        let neg: Vec<&str> = negative.iter().map(|w| w.feature.as_str()).collect();
        assert_eq!(pos, vec!["f2", "f0"]);
        assert_eq!(neg, vec!["f1", "f3"]);
    }

    #[test]
    fn test_short_lists_are_truncated() {
        let ranked = rank_coefficients(&names(3), &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(top_positive(&ranked, 15).len(), 3);
        assert_eq!(top_negative(&ranked, 15).len(), 3);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(rank_coefficients(&names(2), &[1.0]).is_err());
    }

    #[test]
    fn test_csv_output() {
        let dir = TempDir::new().unwrap();
        let ranked = rank_coefficients(
            &["Contract_Month-to-month".to_string(), "a,b".to_string()],
            &[0.75, -0.25],
        )
        .unwrap();

        let (pos, neg) = export_top_features(dir.path(), &ranked, 1).unwrap();
        assert_eq!(
            std::fs::read_to_string(pos).unwrap(),
            "feature,weight\nContract_Month-to-month,0.75\n"
        );
        assert_eq!(std::fs::read_to_string(neg).unwrap(), "feature,weight\n\"a,b\",-0.25\n");
    }

    #[test]
    fn test_files_list_strongest_weight_first() {
        let dir = TempDir::new().unwrap();
        let ranked = rank_coefficients(&names(5), &[0.1, 0.9, -0.4, 0.5, -1.2]).unwrap();

        let (pos, neg) = export_top_features(dir.path(), &ranked, 3).unwrap();
        assert_eq!(
            std::fs::read_to_string(pos).unwrap(),
            "feature,weight\nf1,0.9\nf3,0.5\nf0,0.1\n"
        );
        assert_eq!(
            std::fs::read_to_string(neg).unwrap(),
            "feature,weight\nf4,-1.2\nf2,-0.4\nf0,0.1\n"
        );
    }
}
