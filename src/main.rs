//! Churn feature pipeline entrypoint: load the event log, build and prune the
//! feature table, persist it to the local store and print a one-line summary.

use churn_features::{
    config::PipelineConfig, events::EventLog, logging::StructuredLogger, pipeline::ChurnPipeline,
    storage::FeatureStore,
};
use std::path::PathBuf;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("CHURN_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let mut config = PipelineConfig::load(&config_path);
    if let Some(input) = std::env::args_os().nth(1) {
        config.input_path = PathBuf::from(input);
    }

    StructuredLogger::init(config.log.json, &config.log.level);

    info!(
        input = %config.input_path.display(),
        data_dir = %config.data_dir.display(),
        threshold = config.reduce.threshold,
        "churn feature pipeline starting"
    );

    let events = EventLog::load(&config.input_path)?;
    let pipeline = ChurnPipeline::new(config.clone());
    let output = pipeline.run(events)?;

    std::fs::create_dir_all(&config.data_dir)?;
    let store = FeatureStore::open(&config.data_dir.join("features.db"))?;
    let run_id = store.save_run(&output.reduction, &config.label.column, config.reduce.threshold)?;

    let report = output.report(Some(run_id.as_str()));
    StructuredLogger::emit_json(&report, &mut std::io::stdout().lock())?;
    info!(run_id = %run_id, "churn feature pipeline finished");

    Ok(())
}
