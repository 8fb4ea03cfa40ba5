//! Held-out evaluation reports: markdown table, confusion CSVs, console table

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::{ModelFamily, ModelScore};

/// Markdown report file name inside the reports directory
pub const METRICS_FILE: &str = "metrics.md";

const MARKDOWN_HEADER: &str = "| Model | Accuracy | ROC-AUC | Precision | Recall | F1 |";
const MARKDOWN_ALIGN: &str = "|------:|---------:|--------:|----------:|-------:|---:|";

/// Score of one model family on the held-out split
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedModel {
    pub family: ModelFamily,
    pub score: ModelScore,
}

/// Sort by descending ROC-AUC; ties keep their input order
pub fn rank_by_auc(mut models: Vec<EvaluatedModel>) -> Vec<EvaluatedModel> {
    models.sort_by(|a, b| b.score.roc_auc.total_cmp(&a.score.roc_auc));
    models
}

/// Render the metrics table as markdown, one row per model in the given order
pub fn render_metrics_markdown(models: &[EvaluatedModel]) -> String {
    let mut lines = vec![MARKDOWN_HEADER.to_string(), MARKDOWN_ALIGN.to_string()];
    for m in models {
        lines.push(format!(
            "| {} | {:.4} | {:.4} | {:.4} | {:.4} | {:.4} |",
            m.family,
            m.score.accuracy,
            m.score.roc_auc,
            m.score.precision,
            m.score.recall,
            m.score.f1
        ));
    }
    lines.join("\n")
}

/// Write `metrics.md` into the reports directory
pub fn write_metrics_markdown(reports_dir: &Path, models: &[EvaluatedModel]) -> Result<PathBuf> {
    fs::create_dir_all(reports_dir)
        .with_context(|| format!("Failed to create directory: {}", reports_dir.display()))?;
    let path = reports_dir.join(METRICS_FILE);
    fs::write(&path, render_metrics_markdown(models))
        .with_context(|| format!("Failed to write metrics report: {}", path.display()))?;
    Ok(path)
}

/// `confusion_<family>.csv`
pub fn confusion_path(reports_dir: &Path, family: ModelFamily) -> PathBuf {
    reports_dir.join(format!("confusion_{}.csv", family.name()))
}

/// Write a 2x2 confusion matrix as two CSV lines (`tn,fp` then `fn,tp`)
pub fn write_confusion_csv(reports_dir: &Path, family: ModelFamily, confusion: &[[usize; 2]; 2]) -> Result<PathBuf> {
    fs::create_dir_all(reports_dir)
        .with_context(|| format!("Failed to create directory: {}", reports_dir.display()))?;
    let path = confusion_path(reports_dir, family);
    let content = format!(
        "{},{}\n{},{}\n",
        confusion[0][0], confusion[0][1], confusion[1][0], confusion[1][1]
    );
    fs::write(&path, content)
        .with_context(|| format!("Failed to write confusion matrix: {}", path.display()))?;
    Ok(path)
}

/// Print the ranked metrics as an indented console table
pub fn display_metrics_table(models: &[EvaluatedModel]) {
    println!();
    println!(
        "    {} {}",
        style("📈").cyan(),
        style("HELD-OUT METRICS").white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        ["Model", "Accuracy", "ROC-AUC", "Precision", "Recall", "F1"]
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
    );

    for (rank, m) in models.iter().enumerate() {
        let name = Cell::new(m.family.name());
        let name = if rank == 0 {
            name.fg(Color::Green).add_attribute(Attribute::Bold)
        } else {
            name
        };
        let mut row = vec![name];
        for value in [m.score.accuracy, m.score.roc_auc, m.score.precision, m.score.recall, m.score.f1] {
            row.push(Cell::new(format!("{:.4}", value)).set_alignment(CellAlignment::Right));
        }
        table.add_row(row);
    }

    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}
