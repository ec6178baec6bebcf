//! Terminal feedback for the binary: a spinner while a file loads and a
//! note counter while it plays.

mod progress;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::playback::SinkMessage;
use crate::smf::{LoadProgress, LoadStage};

pub use progress::{create_load_spinner, create_playback_bar};

const REFRESH: Duration = Duration::from_millis(100);

/// Spinner thread following a [`LoadProgress`]
pub struct LoadSpinner {
    done: Sender<()>,
    handle: JoinHandle<()>,
}

impl LoadSpinner {
    pub fn spawn(progress: Arc<LoadProgress>) -> Self {
        let (done, finished) = bounded(1);
        let handle = thread::spawn(move || {
            let pb = create_load_spinner();
            loop {
                pb.set_message(load_message(&progress));
                pb.tick();
                match finished.recv_timeout(REFRESH) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    _ => break,
                }
            }
            pb.finish_and_clear();
        });
        Self { done, handle }
    }

    pub fn finish(self) {
        let _ = self.done.send(());
        let _ = self.handle.join();
    }
}

pub fn load_message(progress: &LoadProgress) -> String {
    match progress.stage() {
        LoadStage::FindingTrackPositions => {
            format!("{}: {} found", progress.stage(), progress.found_tracks())
        }
        LoadStage::CreatingTracks => format!(
            "{}: {}/{}",
            progress.stage(),
            progress.created_tracks(),
            progress.found_tracks()
        ),
        LoadStage::PreparingForStreaming => format!(
            "{}: {}/{} tracks scanned",
            progress.stage(),
            progress.scanned_tracks(),
            progress.found_tracks()
        ),
        stage => stage.to_string(),
    }
}

/// What the note consumer saw
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteTally {
    pub spans: u64,
    pub frames: u64,
}

/// Drains sink messages on its own thread until the sender side hangs up,
/// advancing a progress bar by every span received.
pub fn spawn_note_consumer(
    receiver: Receiver<SinkMessage>,
    note_count: u64,
) -> JoinHandle<NoteTally> {
    thread::spawn(move || {
        let pb = create_playback_bar(note_count);
        let mut tally = NoteTally::default();
        for message in receiver {
            match message {
                SinkMessage::Clear => tally.frames += 1,
                SinkMessage::Spans(spans) => {
                    tally.spans += spans.len() as u64;
                    pb.inc(spans.len() as u64);
                }
            }
        }
        pb.finish_with_message("done");
        tally
    })
}
