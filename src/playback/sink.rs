use crossbeam::channel::{Receiver, Sender};
use log::debug;

use crate::playback::notes::VisualNoteSpan;

/// Receiver of resolved note spans, cleared and refilled on every active
/// frame.
pub trait NoteSink: Send {
    fn clear(&mut self);
    fn publish(&mut self, spans: &[VisualNoteSpan]);
}

/// Keeps the latest frame's spans in memory
#[derive(Debug, Default)]
pub struct VecSink {
    spans: Vec<VisualNoteSpan>,
    published: u64,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> &[VisualNoteSpan] {
        &self.spans
    }

    /// Spans published since creation, across every frame
    pub fn published(&self) -> u64 {
        self.published
    }
}

impl NoteSink for VecSink {
    fn clear(&mut self) {
        self.spans.clear();
    }

    fn publish(&mut self, spans: &[VisualNoteSpan]) {
        self.published += spans.len() as u64;
        self.spans.extend_from_slice(spans);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkMessage {
    Clear,
    Spans(Vec<VisualNoteSpan>),
}

/// Forwards spans to a consumer on another thread
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<SinkMessage>,
    disconnected: bool,
}

impl ChannelSink {
    pub fn new(sender: Sender<SinkMessage>) -> Self {
        Self {
            sender,
            disconnected: false,
        }
    }

    /// An unbounded sink plus the receiving end for the consumer
    pub fn unbounded() -> (Self, Receiver<SinkMessage>) {
        let (sender, receiver) = crossbeam::channel::unbounded();
        (Self::new(sender), receiver)
    }

    fn send(&mut self, message: SinkMessage) {
        if self.disconnected {
            return;
        }
        if self.sender.send(message).is_err() {
            debug!("Note consumer hung up, dropping further spans");
            self.disconnected = true;
        }
    }
}

impl NoteSink for ChannelSink {
    fn clear(&mut self) {
        self.send(SinkMessage::Clear);
    }

    fn publish(&mut self, spans: &[VisualNoteSpan]) {
        if !spans.is_empty() {
            self.send(SinkMessage::Spans(spans.to_vec()));
        }
    }
}
