//! Landmark source implementations.
//!
//! Each source provides a different way to obtain detector frames. A live
//! camera detector plugs in by implementing `LandmarkSource`.

pub mod replay;
pub mod synthetic;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use posetrace_common::error::PosetraceResult;

pub use replay::ReplaySource;
pub use synthetic::{Dropout, SyntheticConfig, SyntheticSource};

use crate::LandmarkSource;

/// Which source to open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    Replay {
        path: PathBuf,
        #[serde(default)]
        looping: bool,
    },
    Synthetic(SyntheticConfig),
}

impl Default for SourceSpec {
    fn default() -> Self {
        Self::Synthetic(SyntheticConfig::default())
    }
}

/// Open the source described by `spec`.
pub fn open_source(spec: &SourceSpec) -> PosetraceResult<Box<dyn LandmarkSource>> {
    let source: Box<dyn LandmarkSource> = match spec {
        SourceSpec::Replay { path, looping } => {
            Box::new(ReplaySource::from_path(path)?.with_looping(*looping))
        }
        SourceSpec::Synthetic(config) => Box::new(SyntheticSource::new(config.clone())?),
    };
    tracing::info!(source = %source.name(), "Opened landmark source");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_default_is_synthetic() {
        let source = open_source(&SourceSpec::default()).unwrap();
        assert_eq!(source.name(), "synthetic");
    }

    #[test]
    fn test_open_missing_replay_fails() {
        let spec = SourceSpec::Replay {
            path: PathBuf::from("/nonexistent/frames.jsonl"),
            looping: false,
        };
        assert!(open_source(&spec).is_err());
    }

    #[test]
    fn test_spec_json_shape() {
        let spec: SourceSpec =
            serde_json::from_str(r#"{"kind":"replay","path":"session.jsonl"}"#).unwrap();
        assert_eq!(
            spec,
            SourceSpec::Replay {
                path: PathBuf::from("session.jsonl"),
                looping: false
            }
        );

        let spec: SourceSpec = serde_json::from_str(r#"{"kind":"synthetic","fps":15}"#).unwrap();
        match spec {
            SourceSpec::Synthetic(config) => {
                assert_eq!(config.fps, 15);
                assert_eq!(config.hands, 2);
            }
            other => panic!("unexpected spec {other:?}"),
        }
    }
}
