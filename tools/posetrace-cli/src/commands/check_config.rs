//! Validate a pipeline config file.

use std::path::PathBuf;

use posetrace_landmark_model::landmark::SubjectClass;
use posetrace_tracking_core::config::PipelineConfig;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Checking pipeline config: {}", path.display());

    let config = PipelineConfig::load(&path)
        .map_err(|e| anyhow::anyhow!("Invalid pipeline config: {e}"))?;

    let dest = config.dest_rect;
    println!(
        "[OK] Destination rect: {}x{} at ({}, {})",
        dest.width, dest.height, dest.offset_x, dest.offset_y
    );
    println!("[OK] Mirror: {}", config.mirror);

    for class in SubjectClass::ALL {
        match config.classes.get(&class) {
            Some(class_config) => println!(
                "[OK] {class}: {} landmarks, smoothing rate {}, {} named",
                class_config.landmark_count,
                class_config.smoothing_rate,
                class_config.landmark_names.len()
            ),
            None => println!("[WARN] {class}: not configured, standard settings apply"),
        }
    }

    println!("[OK] Tracked points: {}", config.tracked_points.len());
    for selector in &config.tracked_points {
        println!("     {selector}");
    }
    println!("[OK] Relations: {}", config.relations.len());
    for name in config.relations.keys() {
        println!("     {name}");
    }

    println!();
    println!("Config is valid.");
    Ok(())
}
