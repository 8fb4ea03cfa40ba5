//! Training run summary

use std::path::PathBuf;
use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::ModelFamily;

/// What happened to one model family during training
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingStatus {
    Trained {
        accuracy: f64,
        roc_auc: f64,
        artifact: PathBuf,
        elapsed: Duration,
    },
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub family: ModelFamily,
    pub status: TrainingStatus,
}

impl TrainingOutcome {
    pub fn roc_auc(&self) -> Option<f64> {
        match self.status {
            TrainingStatus::Trained { roc_auc, .. } => Some(roc_auc),
            _ => None,
        }
    }
}

/// Summary of one `train` run
#[derive(Debug, Default)]
pub struct TrainingSummary {
    pub rows: usize,
    pub positives: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub outcomes: Vec<TrainingOutcome>,
}

impl TrainingSummary {
    pub fn new(rows: usize, positives: usize, train_rows: usize, test_rows: usize) -> Self {
        Self {
            rows,
            positives,
            train_rows,
            test_rows,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, family: ModelFamily, status: TrainingStatus) {
        self.outcomes.push(TrainingOutcome { family, status });
    }

    pub fn trained_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.roc_auc().is_some()).count()
    }

    /// Trained families by descending ROC-AUC, then skipped/failed ones in
    /// training order
    pub fn ranked(&self) -> Vec<&TrainingOutcome> {
        let mut trained: Vec<&TrainingOutcome> = self.outcomes.iter().filter(|o| o.roc_auc().is_some()).collect();
        trained.sort_by(|a, b| {
            b.roc_auc()
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&a.roc_auc().unwrap_or(f64::NEG_INFINITY))
        });
        trained.extend(self.outcomes.iter().filter(|o| o.roc_auc().is_none()));
        trained
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("TRAINING SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!(
            "      Rows: {}  Churn rate: {:.1}%  Train/test: {}/{}",
            self.rows,
            if self.rows > 0 {
                self.positives as f64 / self.rows as f64 * 100.0
            } else {
                0.0
            },
            self.train_rows,
            self.test_rows
        );
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Model").add_attribute(Attribute::Bold),
            Cell::new("Accuracy").add_attribute(Attribute::Bold),
            Cell::new("ROC-AUC").add_attribute(Attribute::Bold),
            Cell::new("Time").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

        for outcome in self.ranked() {
            let name = Cell::new(outcome.family.name());
            match &outcome.status {
                TrainingStatus::Trained {
                    accuracy,
                    roc_auc,
                    artifact,
                    elapsed,
                } => table.add_row(vec![
                    name,
                    Cell::new(format!("{:.4}", accuracy)),
                    Cell::new(format!("{:.4}", roc_auc)).fg(Color::Green),
                    Cell::new(format!("{:.2}s", elapsed.as_secs_f64())),
                    Cell::new(format!("saved {}", artifact.display())),
                ]),
                TrainingStatus::Skipped(reason) => table.add_row(vec![
                    name,
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new(format!("skipped: {}", reason)).fg(Color::Yellow),
                ]),
                TrainingStatus::Failed(error) => table.add_row(vec![
                    name,
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new(format!("failed: {}", error)).fg(Color::Red),
                ]),
            };
        }

        for line in table.to_string().lines() {
            println!("    {}", line);
        }
    }
}
