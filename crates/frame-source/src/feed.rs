//! The detector task.
//!
//! The feed runs independently of the render loop: it pulls frames from its
//! source at the source's own cadence and publishes each one into the
//! handoff slot, overwriting whatever the reader has not consumed yet.
//! Stopping the feed aborts the task; there is no flag to poll.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use posetrace_common::error::{PosetraceError, PosetraceResult};
use posetrace_tracking_core::handoff::FramePublisher;

use crate::recorder::FrameRecorder;
use crate::LandmarkSource;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Summary of a finished feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    /// Frames published into the slot.
    pub frames_published: u64,
    /// Inference cycles that failed and were skipped.
    pub errors: u64,
    /// Whether the source ran out (as opposed to the feed being stopped).
    pub exhausted: bool,
}

#[derive(Debug, Default)]
struct Counters {
    published: AtomicU64,
    errors: AtomicU64,
}

/// Handle to a running detector task.
#[derive(Debug)]
pub struct DetectorFeed {
    handle: JoinHandle<PosetraceResult<()>>,
    counters: Arc<Counters>,
    source_name: String,
}

impl DetectorFeed {
    /// Spawn `source` on the current tokio runtime.
    pub fn spawn(
        source: Box<dyn LandmarkSource>,
        publisher: FramePublisher,
        recorder: Option<FrameRecorder>,
    ) -> Self {
        let counters = Arc::new(Counters::default());
        let source_name = source.name().to_string();
        let handle = tokio::spawn(run(source, publisher, recorder, counters.clone()));
        Self {
            handle,
            counters,
            source_name,
        }
    }

    /// Stop scheduling the detector. Frames already published stay in the slot.
    pub fn stop(&self) {
        tracing::info!(source = %self.source_name, "Stopping detector feed");
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Frames published so far.
    pub fn frames_published(&self) -> u64 {
        self.counters.published.load(Ordering::Relaxed)
    }

    /// Wait for the task to end, either by exhausting its source or after
    /// `stop`.
    pub async fn join(self) -> PosetraceResult<FeedStats> {
        let exhausted = match self.handle.await {
            Ok(result) => {
                result?;
                true
            }
            Err(e) if e.is_cancelled() => false,
            Err(e) => {
                return Err(PosetraceError::detector(format!(
                    "detector task failed: {e}"
                )))
            }
        };
        Ok(FeedStats {
            frames_published: self.counters.published.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            exhausted,
        })
    }
}

async fn run(
    mut source: Box<dyn LandmarkSource>,
    mut publisher: FramePublisher,
    mut recorder: Option<FrameRecorder>,
    counters: Arc<Counters>,
) -> PosetraceResult<()> {
    let period = source.frame_interval().max(MIN_INTERVAL);
    tracing::info!(
        source = %source.name(),
        interval_ms = period.as_secs_f64() * 1000.0,
        recording = recorder.is_some(),
        "Detector feed started"
    );

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        match source.next_frame() {
            Ok(Some(frame)) => {
                if let Some(recorder) = recorder.as_mut() {
                    recorder.write_frame(&frame)?;
                }
                let seq = publisher.publish(frame);
                counters.published.store(seq, Ordering::Relaxed);
            }
            Ok(None) => break,
            Err(e) => {
                counters.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(source = %source.name(), error = %e, "Detector cycle failed");
            }
        }
    }

    if let Some(recorder) = recorder.as_mut() {
        recorder.flush()?;
    }
    tracing::info!(
        source = %source.name(),
        frames = publisher.published(),
        "Detector feed exhausted"
    );
    Ok(())
}
