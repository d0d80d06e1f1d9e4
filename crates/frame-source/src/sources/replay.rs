//! Replay of recorded frame streams.

use std::path::Path;
use std::time::Duration;

use posetrace_common::error::{PosetraceError, PosetraceResult};
use posetrace_landmark_model::frame::{parse_frames, parse_header, Frame, FrameStreamHeader};

use crate::LandmarkSource;

const DEFAULT_INTERVAL: Duration = Duration::from_nanos(33_333_333);

/// Plays back a list of frames at the recorded cadence.
///
/// When looping, timestamps keep increasing across passes so the stream
/// stays monotonic.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    frames: Vec<Frame>,
    header: Option<FrameStreamHeader>,
    index: usize,
    looping: bool,
    loop_offset_ns: u64,
    interval: Duration,
}

impl ReplaySource {
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        let interval = average_interval(&frames);
        Self {
            frames,
            header: None,
            index: 0,
            looping: false,
            loop_offset_ns: 0,
            interval,
        }
    }

    /// Load a JSONL stream written by `FrameRecorder` (or by hand).
    pub fn from_path(path: &Path) -> PosetraceResult<Self> {
        if !path.exists() {
            return Err(PosetraceError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let frames = parse_frames(&content)?;
        let header = parse_header(&content);

        tracing::info!(
            path = %path.display(),
            frames = frames.len(),
            has_header = header.is_some(),
            "Loaded frame stream"
        );

        let mut source = Self::from_frames(frames);
        source.header = header;
        Ok(source)
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Override the recorded cadence.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn header(&self) -> Option<&FrameStreamHeader> {
        self.header.as_ref()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames of one full pass, in order, without looping offsets.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    fn span_ns(&self) -> u64 {
        match (self.frames.first(), self.frames.last()) {
            (Some(first), Some(last)) => last.timestamp_ns.saturating_sub(first.timestamp_ns),
            _ => 0,
        }
    }
}

impl LandmarkSource for ReplaySource {
    fn next_frame(&mut self) -> PosetraceResult<Option<Frame>> {
        if self.index >= self.frames.len() {
            if !self.looping || self.frames.is_empty() {
                return Ok(None);
            }
            self.index = 0;
            self.loop_offset_ns += self.span_ns() + self.interval.as_nanos() as u64;
        }

        let mut frame = self.frames[self.index].clone();
        frame.timestamp_ns += self.loop_offset_ns;
        self.index += 1;
        Ok(Some(frame))
    }

    fn name(&self) -> &str {
        "replay"
    }

    fn frame_interval(&self) -> Duration {
        self.interval
    }

    fn source_size(&self) -> (u32, u32) {
        self.header
            .as_ref()
            .map(|h| (h.source_width, h.source_height))
            .unwrap_or((640, 480))
    }
}

fn average_interval(frames: &[Frame]) -> Duration {
    if frames.len() < 2 {
        return DEFAULT_INTERVAL;
    }
    let first = frames[0].timestamp_ns;
    let last = frames[frames.len() - 1].timestamp_ns;
    let average = last.saturating_sub(first) / (frames.len() as u64 - 1);
    if average == 0 {
        DEFAULT_INTERVAL
    } else {
        Duration::from_nanos(average)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(timestamps: &[u64]) -> Vec<Frame> {
        timestamps.iter().map(|t| Frame::empty(*t)).collect()
    }

    #[test]
    fn test_plays_once_then_exhausts() {
        let mut source = ReplaySource::from_frames(frames(&[0, 10, 20]));
        let mut seen = Vec::new();
        while let Some(frame) = source.next_frame().unwrap() {
            seen.push(frame.timestamp_ns);
        }
        assert_eq!(seen, vec![0, 10, 20]);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_cadence_follows_recording() {
        let source = ReplaySource::from_frames(frames(&[0, 40_000_000, 80_000_000]));
        assert_eq!(source.frame_interval(), Duration::from_millis(40));

        let single = ReplaySource::from_frames(frames(&[5]));
        assert_eq!(single.frame_interval(), DEFAULT_INTERVAL);
    }

    #[test]
    fn test_looping_keeps_timestamps_monotonic() {
        let mut source = ReplaySource::from_frames(frames(&[100, 110, 120])).with_looping(true);
        let timestamps: Vec<u64> = (0..7)
            .map(|_| source.next_frame().unwrap().unwrap().timestamp_ns)
            .collect();
        assert_eq!(timestamps, vec![100, 110, 120, 130, 140, 150, 160]);
    }

    #[test]
    fn test_empty_looping_source_exhausts() {
        let mut source = ReplaySource::from_frames(vec![]).with_looping(true);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_missing_file() {
        let err = ReplaySource::from_path(Path::new("/nonexistent/frames.jsonl")).unwrap_err();
        assert!(matches!(err, PosetraceError::FileNotFound { .. }));
    }

    #[test]
    fn test_from_path_reads_header() {
        let dir = std::env::temp_dir().join("posetrace_test_replay");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("frames.jsonl");
        std::fs::write(
            &path,
            "# {\"schema_version\":\"1.0\",\"epoch_wall\":\"2026-01-01T00:00:00Z\",\"source_width\":1280,\"source_height\":720}\n{\"t\":0}\n{\"t\":50000000}\n",
        )
        .unwrap();

        let source = ReplaySource::from_path(&path).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.source_size(), (1280, 720));
        assert_eq!(source.frame_interval(), Duration::from_millis(50));

        std::fs::remove_dir_all(&dir).ok();
    }
}
