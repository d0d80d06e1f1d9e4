//! Drive the pipeline from a synthetic detector on its own task.
//!
//! The detector publishes into the frame slot at its own rate while this
//! command ticks the pipeline at the render rate, the way a UI would.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tokio::time::MissedTickBehavior;

use posetrace_common::clock::{FrameAge, FrameClock, RateController};
use posetrace_common::config::AppConfig;
use posetrace_frame_source::sources::{Dropout, SyntheticConfig, SyntheticSource};
use posetrace_frame_source::{DetectorFeed, FrameRecorder, LandmarkSource};
use posetrace_landmark_model::frame::FrameStreamHeader;
use posetrace_landmark_model::landmark::SubjectClass;
use posetrace_tracking_core::config::PipelineConfig;
use posetrace_tracking_core::handoff::frame_slot;
use posetrace_tracking_core::pipeline::TrackingPipeline;

use super::{surface_viewport, RelationEdges};
use crate::SurfaceArgs;

/// Frames older than this at render time are reported in the summary.
const LATE_FRAME_MS: f64 = 100.0;

pub struct SimulateOptions {
    pub duration_secs: f64,
    pub fps: u32,
    pub tick_hz: u32,
    pub hands: usize,
    pub dropouts: Vec<Dropout>,
    pub record: Option<PathBuf>,
    pub config: PipelineConfig,
    pub surface: SurfaceArgs,
    pub app: AppConfig,
}

pub async fn run(options: SimulateOptions) -> anyhow::Result<()> {
    let SimulateOptions {
        duration_secs,
        fps,
        tick_hz,
        hands,
        dropouts,
        record,
        mut config,
        surface,
        app,
    } = options;

    if !(duration_secs.is_finite() && duration_secs > 0.0) {
        anyhow::bail!("Duration must be a positive number of seconds, got {duration_secs}");
    }
    if tick_hz == 0 {
        anyhow::bail!("Tick rate must be positive");
    }

    let source = SyntheticSource::new(SyntheticConfig {
        fps,
        hands,
        dropouts,
        ..SyntheticConfig::default()
    })
    .context("Invalid synthetic source")?;
    let source_size = source.source_size();

    let viewport = surface_viewport(&surface, source_size, &app, &mut config)?;
    let mut pipeline = TrackingPipeline::new(&config).context("Invalid pipeline config")?;
    pipeline.set_dest_rect(viewport.dest_rect())?;

    let clock = FrameClock::start();
    let recorder = match &record {
        Some(path) => {
            let header = FrameStreamHeader {
                schema_version: "1.0".to_string(),
                epoch_wall: clock.epoch_wall().to_string(),
                source_width: source_size.0,
                source_height: source_size.1,
                source: source.name().to_string(),
            };
            let recorder = FrameRecorder::new(path.clone(), &header)
                .with_context(|| format!("Failed to create recording {}", path.display()))?;
            Some(recorder)
        }
        None => None,
    };

    println!(
        "Simulating {duration_secs}s: detector {fps} fps, render {tick_hz} Hz, {hands} hand(s)"
    );

    let (publisher, mut reader) = frame_slot();
    let feed = DetectorFeed::spawn(Box::new(source), publisher, recorder);

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / tick_hz as f64));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let deadline = tokio::time::sleep(Duration::from_secs_f64(duration_secs));
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut status = RateController::new(1);
    let mut edges = RelationEdges::default();
    let mut ticks = 0u64;
    let mut late_frames = 0u64;
    let mut max_age_ms = 0.0f64;

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = &mut ctrl_c => {
                println!("Interrupted");
                break;
            }
            _ = ticker.tick() => {
                ticks += 1;
                let Some(out) = pipeline.tick(&mut reader) else {
                    continue;
                };

                let now_ns = clock.elapsed_ns();
                let age = FrameAge {
                    frame_ns: out.timestamp_ns,
                    consumed_ns: now_ns,
                };
                max_age_ms = max_age_ms.max(age.age_ms());
                if age.exceeds_threshold_ms(LATE_FRAME_MS) {
                    late_frames += 1;
                }

                for (name, active) in edges.update(&out) {
                    println!(
                        "[{:>8.3}s] {name}: {}",
                        FrameClock::ns_to_secs(out.timestamp_ns),
                        if active { "start" } else { "end" }
                    );
                }

                if status.should_tick(now_ns) {
                    tracing::info!(
                        hand = ?out.state(SubjectClass::Hand),
                        face = ?out.state(SubjectClass::Face),
                        body = ?out.state(SubjectClass::Body),
                        seq = reader.last_seq(),
                        skipped = reader.skipped_frames(),
                        age_ms = age.age_ms(),
                        "Pipeline status"
                    );
                }
            }
        }
    }

    feed.stop();
    let stats = feed.join().await?;

    println!();
    println!("Simulation summary");
    println!("{}", "=".repeat(50));
    println!("  Elapsed: {:.2}s", clock.elapsed_secs());
    println!("  Detector frames published: {}", stats.frames_published);
    println!("  Detector errors: {}", stats.errors);
    println!("  Render ticks: {ticks}");
    println!("  Frames processed: {}", pipeline.frames_processed());
    println!("  Frames never rendered: {}", reader.skipped_frames());
    println!("  Max frame age: {max_age_ms:.1}ms ({late_frames} over {LATE_FRAME_MS}ms)");
    for class in SubjectClass::ALL {
        println!("  {class}: {:?}", pipeline.state(class));
    }
    for (name, starts) in edges.starts() {
        println!("  Relation '{name}' started {starts} time(s)");
    }
    if let Some(path) = record {
        println!("  Recording written to: {}", path.display());
    }

    Ok(())
}
