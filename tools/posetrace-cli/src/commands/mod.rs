pub mod check_config;
pub mod init_config;
pub mod replay;
pub mod simulate;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;

use posetrace_common::config::AppConfig;
use posetrace_landmark_model::viewport::Viewport;
use posetrace_tracking_core::config::PipelineConfig;
use posetrace_tracking_core::output::FrameOutput;

use crate::SurfaceArgs;

/// Resolve the pipeline config: explicit path, then the app config's path,
/// then the built-in defaults (with the app's mirror setting).
pub fn load_pipeline_config(path: Option<&Path>, app: &AppConfig) -> anyhow::Result<PipelineConfig> {
    match path.or(app.pipeline_config.as_deref()) {
        Some(path) => {
            let config = PipelineConfig::load(path)
                .with_context(|| format!("Failed to load pipeline config {}", path.display()))?;
            tracing::info!(path = %path.display(), "Using pipeline config");
            Ok(config)
        }
        None => {
            tracing::info!("Using built-in pipeline config");
            Ok(PipelineConfig {
                mirror: app.render.mirror,
                ..PipelineConfig::default()
            })
        }
    }
}

/// Build the render surface and apply mirror overrides to `config`.
pub fn surface_viewport(
    surface: &SurfaceArgs,
    source_size: (u32, u32),
    app: &AppConfig,
    config: &mut PipelineConfig,
) -> anyhow::Result<Viewport> {
    let canvas_w = surface.canvas_width.unwrap_or(app.render.canvas_width);
    let canvas_h = surface.canvas_height.unwrap_or(app.render.canvas_height);
    let viewport = Viewport::new(
        source_size.0 as f64,
        source_size.1 as f64,
        canvas_w as f64,
        canvas_h as f64,
        surface.fit.into(),
    )
    .context("Invalid render surface")?;

    config.dest_rect = viewport.dest_rect();
    if let Some(mirror) = surface.mirror {
        config.mirror = mirror;
    }

    tracing::debug!(
        canvas_w,
        canvas_h,
        source_w = source_size.0,
        source_h = source_size.1,
        dest = ?config.dest_rect,
        "Render surface ready"
    );
    Ok(viewport)
}

/// Turns per-frame relation readings into start/end edges.
#[derive(Debug, Default)]
pub struct RelationEdges {
    active: BTreeMap<String, bool>,
    starts: BTreeMap<String, u64>,
}

impl RelationEdges {
    /// Relations whose event changed this frame, with their new value.
    /// Unavailable readings count as inactive.
    pub fn update(&mut self, output: &FrameOutput) -> Vec<(String, bool)> {
        let mut changed = Vec::new();
        for relation in &output.relations {
            let now = relation.reading.value().is_some_and(|v| v.active());
            let before = self.active.insert(relation.name.clone(), now).unwrap_or(false);
            if now != before {
                if now {
                    *self.starts.entry(relation.name.clone()).or_default() += 1;
                }
                changed.push((relation.name.clone(), now));
            }
        }
        changed
    }

    /// How many times each relation started.
    pub fn starts(&self) -> &BTreeMap<String, u64> {
        &self.starts
    }
}
