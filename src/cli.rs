//! Command-line front end: the operator-facing shell around the pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::inference::{score_table, ScoredTable};
use crate::insights::Insights;
use crate::model::ModelArtifacts;
use crate::report::{write_report, ReportSettings, ReportSummary};
use crate::schema::{manual_entry_fields, FeatureSchema};
use crate::settings::SettingsStore;
use crate::table::{read_csv, InputRecord, Table};

/// Score engine telemetry for failure risk and build maintenance reports
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "enginehealth")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (created by `init-config`)
    #[arg(short, long, global = true, default_value = "dashboard.json")]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Score a CSV of engine readings and print the results
    Score {
        /// CSV file with engine data
        #[arg(short, long)]
        input: PathBuf,

        /// Rows to show in the preview
        #[arg(long, default_value_t = 10)]
        preview: usize,

        /// Print the summary and insights as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Score a CSV and write the full PDF report
    Report {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, default_value = "maintenance_report.pdf")]
        output: PathBuf,

        #[arg(long, default_value_t = 10)]
        preview: usize,
    },

    /// Score a single manually entered reading
    Manual {
        /// Field override as NAME=VALUE; unset form fields are 0.0
        #[arg(long = "value", value_name = "NAME=VALUE")]
        values: Vec<String>,

        /// Also write the PDF report here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the default settings file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,

        /// Report title to store instead of the default
        #[arg(long)]
        title: Option<String>,

        /// Table columns per chunk to store instead of the default
        #[arg(long)]
        columns_per_page: Option<usize>,
    },
}

pub fn execute(cli: &Cli, settings: &SettingsStore) -> Result<()> {
    match &cli.command {
        Command::InitConfig {
            force,
            title,
            columns_per_page,
        } => init_config(settings, *force, title.clone(), *columns_per_page),
        Command::Score {
            input,
            preview,
            json,
        } => {
            let artifacts = load_artifacts(settings)?;
            let scored = score_file(input, &artifacts)?;
            if *json {
                println!("{}", score_json(&scored)?);
            } else {
                print_results(&scored, *preview);
            }
            Ok(())
        }
        Command::Report {
            input,
            output,
            preview,
        } => {
            let artifacts = load_artifacts(settings)?;
            let scored = score_file(input, &artifacts)?;
            print_results(&scored, *preview);
            emit_report(&scored, &settings.report(), output)
        }
        Command::Manual { values, output } => {
            let artifacts = load_artifacts(settings)?;
            let record = manual_record(values)?;
            let table = Table::from_records(&[record])?;
            let scored = score_table(&table, &FeatureSchema::turbofan(), &artifacts)?;
            print_results(&scored, 1);
            match output {
                Some(path) => emit_report(&scored, &settings.report(), path),
                None => Ok(()),
            }
        }
    }
}

fn init_config(
    settings: &SettingsStore,
    force: bool,
    title: Option<String>,
    columns_per_page: Option<usize>,
) -> Result<()> {
    if settings.path().exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            settings.path().display()
        );
    }
    let mut report = settings.report();
    if let Some(title) = title {
        report.title = title;
    }
    if let Some(columns) = columns_per_page {
        report.columns_per_page = columns;
    }
    settings.update_report(report)?;
    println!("Wrote default settings to {}", settings.path().display());
    Ok(())
}

fn load_artifacts(settings: &SettingsStore) -> Result<ModelArtifacts> {
    ModelArtifacts::load(&settings.artifacts()).context("Failed to load model artifacts")
}

fn score_file(input: &Path, artifacts: &ModelArtifacts) -> Result<ScoredTable> {
    let raw = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let table = read_csv(&raw)
        .with_context(|| format!("{} is not a readable table", input.display()))?;
    let scored = score_table(&table, &FeatureSchema::turbofan(), artifacts)
        .with_context(|| format!("Prediction failed for {}", input.display()))?;
    Ok(scored)
}

fn emit_report(scored: &ScoredTable, report: &ReportSettings, output: &Path) -> Result<()> {
    write_report(scored, report, Some(Utc::now()), output)
        .with_context(|| format!("Failed to generate report {}", output.display()))?;
    println!("Report saved to {}", output.display());
    Ok(())
}

/// Machine-readable result of `score --json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreSummary {
    summary: ReportSummary,
    insights: Insights,
}

fn score_json(scored: &ScoredTable) -> Result<String> {
    let output = ScoreSummary {
        summary: ReportSummary::from_scored(scored),
        insights: Insights::from_scored(scored),
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Manual form fields at 0.0, then each `NAME=VALUE` override in order.
pub fn manual_record(values: &[String]) -> Result<InputRecord> {
    let mut record = InputRecord::new();
    for name in manual_entry_fields() {
        record.set(name, 0.0);
    }
    for pair in values {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{pair}'"))?;
        let value: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("'{}' is not a number for {}", value.trim(), name.trim()))?;
        record.set(name.trim(), value);
    }
    Ok(record)
}

fn print_results(scored: &ScoredTable, preview: usize) {
    println!("Prediction Results");
    println!("{}", render_table(&scored.table().head(preview)));

    let insights = Insights::from_scored(scored);
    println!();
    println!("Engines at Risk: {}", insights.at_risk);
    println!("Healthy Engines: {}", insights.healthy);

    println!();
    println!("Alerts");
    if insights.alerts.is_empty() {
        println!("  All engines currently healthy.");
    }
    for alert in &insights.alerts {
        println!(
            "  Engine {} predicted to fail soon (Prob: {})",
            alert.engine, alert.probability
        );
    }
    println!();
    println!("Recommendations");
    println!("  {}", insights.recommendation);
}

/// Fixed-width text rendering of a table for the terminal.
pub fn render_table(table: &Table) -> String {
    let cells: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect();
    let widths: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            cells
                .iter()
                .map(|row| row[idx].len())
                .chain(std::iter::once(name.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = pad_fields(table.columns().iter().map(String::as_str), &widths);
    for row in &cells {
        out.push('\n');
        out.push_str(&pad_fields(row.iter().map(String::as_str), &widths));
    }
    out
}

fn pad_fields<'a>(fields: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    fields
        .zip(widths)
        .map(|(field, &width)| format!("{field:>width$}"))
        .collect::<Vec<_>>()
        .join("  ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    #[test]
    fn parses_subcommands_and_globals() {
        let cli = Cli::try_parse_from([
            "enginehealth",
            "--config",
            "fleet.json",
            "report",
            "--input",
            "engines.csv",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("fleet.json"));
        assert_eq!(
            cli.command,
            Command::Report {
                input: PathBuf::from("engines.csv"),
                output: PathBuf::from("maintenance_report.pdf"),
                preview: 10,
            }
        );
    }

    #[test]
    fn score_json_carries_summary_and_alerts() {
        let scored = crate::report::layout::tests::scored_rows(4);

        let value: serde_json::Value = serde_json::from_str(&score_json(&scored).unwrap()).unwrap();

        assert_eq!(value["summary"]["total"], 4);
        assert_eq!(value["summary"]["atRisk"], 2);
        assert_eq!(value["insights"]["healthy"], 2);
        let engines: Vec<u64> = value["insights"]["alerts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["engine"].as_u64().unwrap())
            .collect();
        assert_eq!(engines, vec![1, 3]);
    }

    #[test]
    fn init_config_stores_overrides_and_refuses_to_clobber() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("dashboard.json");
        let settings = SettingsStore::new(path.clone()).unwrap();

        init_config(&settings, false, Some("Fleet A".into()), Some(6)).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.report().title, "Fleet A");
        assert_eq!(reopened.report().columns_per_page, 6);
        assert!(init_config(&reopened, false, None, None).is_err());
        assert!(init_config(&reopened, true, None, None).is_ok());
    }

    #[test]
    fn manual_record_starts_from_form_defaults() {
        let record = manual_record(&[
            "sensor_2 = 1.5".to_string(),
            "operational_setting_1=0.25".to_string(),
        ])
        .unwrap();

        let names: Vec<&str> = record.names().collect();
        assert_eq!(names.len(), 8);
        assert_eq!(record.get("sensor_2"), Some(1.5));
        assert_eq!(record.get("operational_setting_1"), Some(0.25));
        assert_eq!(record.get("sensor_5"), Some(0.0));
    }

    #[test]
    fn manual_record_rejects_bad_pairs() {
        assert!(manual_record(&["sensor_2".to_string()]).is_err());
        assert!(manual_record(&["sensor_2=abc".to_string()]).is_err());
    }

    #[test]
    fn render_table_right_aligns_columns() {
        let mut table = Table::new(vec!["a".into(), "long_name".into()]).unwrap();
        table.push_row(vec![Cell::Int(10), Cell::Float(0.5)]).unwrap();

        let text = render_table(&table);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], " a  long_name");
        assert_eq!(lines[1], "10        0.5");
    }
}
