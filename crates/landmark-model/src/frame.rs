//! Detector frames and frame streams.
//!
//! A frame is produced once per detector inference cycle. Recorded streams
//! use JSONL: an optional `# {header}` comment line followed by one frame
//! object per line.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::landmark::{LandmarkSet, SubjectClass};

/// Monotonic timestamp in nanoseconds since the feed started.
pub type TimestampNs = u64;

/// One detector result: every detected instance, per subject class.
///
/// A class with an empty list (or no entry at all) means "nothing detected
/// this frame", which is a valid signal rather than an error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    /// Monotonic nanoseconds since the feed started.
    #[serde(rename = "t")]
    pub timestamp_ns: TimestampNs,

    /// Detected instances keyed by class, in detector order.
    #[serde(default)]
    pub subjects: BTreeMap<SubjectClass, Vec<LandmarkSet>>,
}

impl Frame {
    /// An empty frame (no detections for any class).
    pub fn empty(timestamp_ns: TimestampNs) -> Self {
        Self {
            timestamp_ns,
            subjects: BTreeMap::new(),
        }
    }

    /// Add the instances of one class, replacing any previous entry.
    pub fn with_class(mut self, class: SubjectClass, instances: Vec<LandmarkSet>) -> Self {
        self.subjects.insert(class, instances);
        self
    }

    /// Instances detected for `class`, empty when the class is absent.
    pub fn instances(&self, class: SubjectClass) -> &[LandmarkSet] {
        self.subjects.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Classes that carry an entry in this frame (possibly empty).
    pub fn classes(&self) -> impl Iterator<Item = SubjectClass> + '_ {
        self.subjects.keys().copied()
    }

    /// Total number of detected instances across all classes.
    pub fn instance_count(&self) -> usize {
        self.subjects.values().map(Vec::len).sum()
    }

    /// Timestamp as fractional seconds since the feed started.
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp_ns as f64 / 1_000_000_000.0
    }
}

/// Metadata written as the first line of a recorded frame stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameStreamHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,

    /// Wall-clock time at the start of the stream (RFC 3339).
    pub epoch_wall: String,

    /// Source video dimensions in pixels.
    pub source_width: u32,
    pub source_height: u32,

    /// Name of the producing source (e.g. "synthetic", "replay").
    #[serde(default)]
    pub source: String,
}

/// Parse frames from JSONL content, skipping blank lines and `#` comments.
pub fn parse_frames(jsonl: &str) -> Result<Vec<Frame>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Extract the stream header from the first comment line, if present.
pub fn parse_header(jsonl: &str) -> Option<FrameStreamHeader> {
    let first = jsonl.lines().map(str::trim).find(|line| !line.is_empty())?;
    let header = first.strip_prefix('#')?;
    serde_json::from_str(header.trim()).ok()
}

/// Serialize frames to JSONL format.
pub fn serialize_frames(frames: &[Frame]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for frame in frames {
        output.push_str(&serde_json::to_string(frame)?);
        output.push('\n');
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::LandmarkPoint;

    fn hand(x: f64, y: f64) -> LandmarkSet {
        LandmarkSet::filled(21, LandmarkPoint::new(x, y))
    }

    #[test]
    fn test_absent_class_reads_as_no_instances() {
        let frame = Frame::empty(0).with_class(SubjectClass::Hand, vec![hand(0.5, 0.5)]);
        assert_eq!(frame.instances(SubjectClass::Hand).len(), 1);
        assert!(frame.instances(SubjectClass::Face).is_empty());
        assert_eq!(frame.instance_count(), 1);
    }

    #[test]
    fn test_json_format_uses_short_timestamp_and_class_keys() {
        let frame = Frame::empty(1_234).with_class(
            SubjectClass::Body,
            vec![LandmarkSet::new(vec![LandmarkPoint::new(0.5, 0.25)])],
        );
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"t\":1234"));
        assert!(json.contains("\"body\":[[{\"x\":0.5,\"y\":0.25}]]"));
    }

    #[test]
    fn test_frame_without_subjects_parses() {
        let parsed: Frame = serde_json::from_str(r#"{"t":5}"#).unwrap();
        assert_eq!(parsed, Frame::empty(5));
    }

    #[test]
    fn test_parse_frames_skips_header_comment() {
        let jsonl = "# {\"schema_version\":\"1.0\",\"epoch_wall\":\"2026-01-01T00:00:00Z\",\"source_width\":640,\"source_height\":480}\n\
                     {\"t\":0,\"subjects\":{\"hand\":[]}}\n\n\
                     {\"t\":33000000}\n";
        let frames = parse_frames(jsonl).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].timestamp_ns, 33_000_000);

        let header = parse_header(jsonl).unwrap();
        assert_eq!(header.source_width, 640);
        assert_eq!(header.source, "");
    }

    #[test]
    fn test_parse_header_absent() {
        assert!(parse_header("{\"t\":0}\n").is_none());
    }

    #[test]
    fn test_jsonl_roundtrip() {
        let frames = vec![
            Frame::empty(0).with_class(SubjectClass::Hand, vec![hand(0.1, 0.2), hand(0.8, 0.2)]),
            Frame::empty(33_000_000).with_class(SubjectClass::Hand, vec![]),
        ];
        let jsonl = serialize_frames(&frames).unwrap();
        assert_eq!(parse_frames(&jsonl).unwrap(), frames);
    }
}
