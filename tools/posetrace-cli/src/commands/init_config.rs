//! Write the default pipeline config.

use std::path::PathBuf;

use posetrace_common::config::{config_file_path, AppConfig};
use posetrace_tracking_core::config::PipelineConfig;

pub fn run(path: PathBuf, force: bool, app: Option<&AppConfig>) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let config = PipelineConfig::default();
    config
        .save(&path)
        .map_err(|e| anyhow::anyhow!("Failed to write pipeline config: {e}"))?;
    println!("Pipeline config written to: {}", path.display());
    println!("  Classes: {}", config.classes.len());
    println!("  Tracked points: {}", config.tracked_points.len());
    println!("  Relations: {}", config.relations.len());

    if let Some(app) = app {
        let mut app = app.clone();
        app.pipeline_config = Some(std::fs::canonicalize(&path).unwrap_or(path));
        app.save()
            .map_err(|e| anyhow::anyhow!("Failed to write app config: {e}"))?;
        println!("App config written to: {}", config_file_path().display());
    }

    Ok(())
}
