use indicatif::{ProgressBar, ProgressStyle};

pub fn create_load_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix("Loading");
    pb
}

/// Bar counting resolved notes against the file's note count
pub fn create_playback_bar(note_count: u64) -> ProgressBar {
    let pb = ProgressBar::new(note_count);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:.bold} [{bar:40.cyan}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("⣀⣤⣦⣶⣷⣿ "),
    );
    pb.set_prefix("Notes");
    pb
}
