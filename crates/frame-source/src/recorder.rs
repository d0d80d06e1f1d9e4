//! Append-only JSONL recorder for detector frames.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use posetrace_common::error::PosetraceResult;
use posetrace_landmark_model::frame::{Frame, FrameStreamHeader};

const FLUSH_EVERY: u64 = 300;

/// Writes frames to a JSONL file, header first.
pub struct FrameRecorder {
    writer: BufWriter<File>,
    path: PathBuf,
    frames_written: u64,
}

impl FrameRecorder {
    /// Create (or truncate) `path` and write the header as a `#` comment line.
    pub fn new(path: impl Into<PathBuf>, header: &FrameStreamHeader) -> PosetraceResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "# {}", serde_json::to_string(header)?)?;

        tracing::debug!(path = %path.display(), "Recording frames");
        Ok(Self {
            writer,
            path,
            frames_written: 0,
        })
    }

    /// Append one frame as a JSONL line.
    pub fn write_frame(&mut self, frame: &Frame) -> PosetraceResult<()> {
        serde_json::to_writer(&mut self.writer, frame)?;
        self.writer.write_all(b"\n")?;
        self.frames_written += 1;

        // Roughly every ten seconds at detector rate.
        if self.frames_written % FLUSH_EVERY == 0 {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> PosetraceResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for FrameRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRecorder")
            .field("path", &self.path)
            .field("frames_written", &self.frames_written)
            .finish()
    }
}

impl Drop for FrameRecorder {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posetrace_landmark_model::frame::{parse_frames, parse_header};
    use posetrace_landmark_model::landmark::{LandmarkPoint, LandmarkSet, SubjectClass};

    fn header() -> FrameStreamHeader {
        FrameStreamHeader {
            schema_version: "1.0".to_string(),
            epoch_wall: "2026-01-01T00:00:00Z".to_string(),
            source_width: 640,
            source_height: 480,
            source: "test".to_string(),
        }
    }

    #[test]
    fn test_recorded_stream_parses_back() {
        let dir = std::env::temp_dir().join("posetrace_test_recorder");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("frames.jsonl");

        let frames = vec![
            Frame::empty(0).with_class(
                SubjectClass::Hand,
                vec![LandmarkSet::filled(21, LandmarkPoint::new(0.5, 0.5))],
            ),
            Frame::empty(33_333_333),
        ];

        {
            let mut recorder = FrameRecorder::new(&path, &header()).unwrap();
            for frame in &frames {
                recorder.write_frame(frame).unwrap();
            }
            assert_eq!(recorder.frames_written(), 2);
            // Dropped without an explicit flush.
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# "));
        assert_eq!(parse_header(&content).unwrap().source, "test");
        assert_eq!(parse_frames(&content).unwrap(), frames);

        std::fs::remove_dir_all(&dir).ok();
    }
}
