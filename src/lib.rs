pub mod align;
pub mod cli;
pub mod inference;
pub mod insights;
pub mod model;
pub mod report;
pub mod schema;
pub mod settings;
pub mod table;
pub mod utils;

use clap::Parser;
use log::LevelFilter;

use cli::Cli;
use settings::SettingsStore;

pub use align::{align_features, AlignedTable};
pub use inference::{predict, score, score_table, InferenceError, Predictions, ScoredTable};
pub use insights::Insights;
pub use model::{ArtifactError, ModelArtifacts};
pub use report::{generate_report, write_report, ReportError, ReportSettings};
pub use schema::FeatureSchema;
pub use table::{read_csv, Cell, InputRecord, SchemaMismatchError, Table};

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG still overrides the flag
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    utils::init_logging(level);

    log::info!("enginehealth starting up...");

    let settings = SettingsStore::new(cli.config.clone())?;
    cli::execute(&cli, &settings)
}
