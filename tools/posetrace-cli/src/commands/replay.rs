//! Run the pipeline over a recorded frame stream.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;

use posetrace_common::config::AppConfig;
use posetrace_frame_source::sources::ReplaySource;
use posetrace_landmark_model::landmark::SubjectClass;
use posetrace_tracking_core::config::PipelineConfig;
use posetrace_tracking_core::fallback::TrackingState;
use posetrace_tracking_core::pipeline::TrackingPipeline;

use super::{surface_viewport, RelationEdges};
use crate::SurfaceArgs;

pub fn run(
    frames: PathBuf,
    output: Option<PathBuf>,
    events_only: bool,
    mut config: PipelineConfig,
    surface: &SurfaceArgs,
    app: &AppConfig,
) -> anyhow::Result<()> {
    eprintln!("Replaying frames from: {}", frames.display());

    let source = ReplaySource::from_path(&frames)
        .with_context(|| format!("Failed to load frame stream {}", frames.display()))?;
    let source_size = match source.header() {
        Some(header) => (header.source_width, header.source_height),
        None => (app.render.source_width, app.render.source_height),
    };
    eprintln!("  Loaded {} frames", source.len());

    let viewport = surface_viewport(surface, source_size, app, &mut config)?;
    let mut pipeline = TrackingPipeline::new(&config).context("Invalid pipeline config")?;
    pipeline.set_dest_rect(viewport.dest_rect())?;

    let mut writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    let mut edges = RelationEdges::default();
    let mut stale_frames = 0u64;
    for frame in source.frames() {
        let out = pipeline.process(frame);
        if SubjectClass::ALL
            .iter()
            .any(|&class| out.state(class) == TrackingState::Stale)
        {
            stale_frames += 1;
        }

        let changes = edges.update(&out);
        if events_only {
            for (name, active) in changes {
                let event = serde_json::json!({
                    "timestamp_ns": out.timestamp_ns,
                    "relation": name,
                    "event": if active { "start" } else { "end" },
                });
                writeln!(writer, "{event}")?;
            }
        } else {
            serde_json::to_writer(&mut writer, &out)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;

    eprintln!("  Processed {} frames", pipeline.frames_processed());
    eprintln!("  Frames with a stale class: {stale_frames}");
    for class in SubjectClass::ALL {
        if let Some(class_pipeline) = pipeline.class(class) {
            eprintln!(
                "  {class}: {:?}, {} rejected",
                class_pipeline.state(),
                class_pipeline.rejected_frames()
            );
        }
    }
    for (name, starts) in edges.starts() {
        eprintln!("  Relation '{name}' started {starts} time(s)");
    }
    if let Some(path) = output {
        eprintln!("  Output written to: {}", path.display());
    }

    Ok(())
}
