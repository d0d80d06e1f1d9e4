//! Single-slot frame handoff between the detector and the render tick.
//!
//! The producer overwrites the slot on every published frame; there is no
//! queue and no backpressure. Readers always observe a complete frame
//! because the slot holds an `Arc<Frame>` that is swapped as a unit.

use std::sync::Arc;

use tokio::sync::watch;

use posetrace_landmark_model::frame::Frame;

#[derive(Debug, Clone)]
struct Published {
    seq: u64,
    frame: Arc<Frame>,
}

/// Create a connected publisher/reader pair with an empty slot.
pub fn frame_slot() -> (FramePublisher, FrameReader) {
    let (tx, rx) = watch::channel(None);
    (
        FramePublisher { tx, published: 0 },
        FrameReader::from_receiver(rx),
    )
}

/// Writing side of the slot. Owned by the detector task.
#[derive(Debug)]
pub struct FramePublisher {
    tx: watch::Sender<Option<Published>>,
    published: u64,
}

impl FramePublisher {
    /// Replace whatever is in the slot with `frame`. Never blocks, and
    /// succeeds even when no reader is attached.
    ///
    /// Returns the frame's sequence number (1-based).
    pub fn publish(&mut self, frame: Frame) -> u64 {
        self.published += 1;
        self.tx.send_replace(Some(Published {
            seq: self.published,
            frame: Arc::new(frame),
        }));
        self.published
    }

    /// Attach another reader.
    pub fn reader(&self) -> FrameReader {
        FrameReader::from_receiver(self.tx.subscribe())
    }

    /// Number of frames published so far.
    pub fn published(&self) -> u64 {
        self.published
    }
}

/// Reading side of the slot. Owned by the render loop.
#[derive(Debug, Clone)]
pub struct FrameReader {
    rx: watch::Receiver<Option<Published>>,
    last_seq: u64,
    skipped: u64,
}

impl FrameReader {
    fn from_receiver(rx: watch::Receiver<Option<Published>>) -> Self {
        Self {
            rx,
            last_seq: 0,
            skipped: 0,
        }
    }

    /// The currently published frame, or `None` if nothing was published yet.
    ///
    /// Repeated calls without a new publish return the same frame.
    pub fn latest(&mut self) -> Option<Arc<Frame>> {
        let published = self.rx.borrow_and_update().clone()?;
        if published.seq > self.last_seq + 1 {
            self.skipped += published.seq - self.last_seq - 1;
        }
        self.last_seq = self.last_seq.max(published.seq);
        Some(published.frame)
    }

    /// Whether a frame was published since the last `latest` call.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next publish. Returns `false` once the publisher is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Sequence number of the last frame returned by `latest`.
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Frames overwritten before this reader saw them.
    pub fn skipped_frames(&self) -> u64 {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_slot() {
        let (_publisher, mut reader) = frame_slot();
        assert!(reader.latest().is_none());
        assert!(!reader.has_changed());
    }

    #[test]
    fn test_last_write_wins() {
        let (mut publisher, mut reader) = frame_slot();
        publisher.publish(Frame::empty(1));
        publisher.publish(Frame::empty(2));
        assert_eq!(publisher.publish(Frame::empty(3)), 3);

        assert!(reader.has_changed());
        assert_eq!(reader.latest().unwrap().timestamp_ns, 3);
        assert_eq!(reader.skipped_frames(), 2);
        assert!(!reader.has_changed());

        // Re-reading returns the same frame without counting skips.
        assert_eq!(reader.latest().unwrap().timestamp_ns, 3);
        assert_eq!(reader.skipped_frames(), 2);
        assert_eq!(reader.last_seq(), 3);
    }

    #[test]
    fn test_publish_without_reader() {
        let (mut publisher, reader) = frame_slot();
        drop(reader);
        publisher.publish(Frame::empty(7));
        let mut late = publisher.reader();
        assert_eq!(late.latest().unwrap().timestamp_ns, 7);
    }

    #[tokio::test]
    async fn test_reader_sees_complete_frames_across_tasks() {
        let (mut publisher, mut reader) = frame_slot();

        let producer = tokio::spawn(async move {
            for t in 1..=50u64 {
                publisher.publish(Frame::empty(t));
                tokio::task::yield_now().await;
            }
        });

        let mut last = 0;
        while reader.changed().await {
            let frame = reader.latest().unwrap();
            assert!(frame.timestamp_ns > last);
            last = frame.timestamp_ns;
        }
        producer.await.unwrap();

        // The final frame is still readable after the publisher is gone.
        assert_eq!(reader.latest().unwrap().timestamp_ns, 50);
        assert_eq!(reader.last_seq(), 50);
    }
}
