use clap::Parser;
use log::{error, info};
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tickstream::{
    cli::Args, config::Settings, logging, ui, utils::format_time, ChannelSink, FrameOutcome,
    LoadProgress, MidiFile, PlaybackScheduler, WorkerPool,
};

fn main() {
    let args = Args::parse();
    initialize_logging(args.verbose);

    if let Err(err) = run(&args) {
        error!("{}", err);
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

fn initialize_logging(verbosity: u8) {
    match logging::init_logger(verbosity) {
        Ok(path) => info!("Application starting, logging to {}", path.display()),
        Err(err) => eprintln!("Logging to file disabled: {}", err),
    }
}

fn run(args: &Args) -> tickstream::Result<()> {
    let settings = Settings::load(args.config_path(), &args.overrides())?;
    let pool = Arc::new(WorkerPool::new(settings.pool_multiplier)?);

    let file = load_file(&args.file, pool)?;
    print_summary(&file);

    if args.info {
        file.close();
        return Ok(());
    }
    play(file, &settings, args.realtime)
}

fn load_file(path: &Path, pool: Arc<WorkerPool>) -> tickstream::Result<MidiFile> {
    let progress = Arc::new(LoadProgress::new());
    let spinner = ui::LoadSpinner::spawn(progress.clone());
    let result = MidiFile::open_with_progress(path, pool, &progress);
    spinner.finish();
    result
}

fn print_summary(file: &MidiFile) {
    println!("File:          {}", file.file_name().unwrap_or("?"));
    println!(
        "Tracks:        {} (header says {})",
        file.track_count(),
        file.track_count_header()
    );
    println!("Ticks:         {}", file.tick_count());
    println!("Length:        {}", format_time(file.length()));
    println!("Tempo changes: {}", file.tempo_change_count());
    println!("PPQ:           {}", file.time_division());
    println!("Notes:         {}", file.note_count());
}

fn play(file: MidiFile, settings: &Settings, realtime: bool) -> tickstream::Result<()> {
    let (sink, receiver) = ChannelSink::unbounded();
    let consumer = ui::spawn_note_consumer(receiver, file.note_count());
    let mut scheduler = PlaybackScheduler::new(file, sink, settings.playback_options());
    let frame = settings.frame_duration();
    let frame_length = Duration::from_secs_f64(frame);

    scheduler.start();
    let started = Instant::now();
    let mut frames: u64 = 0;
    let closed = loop {
        let frame_start = Instant::now();
        frames += 1;
        if let FrameOutcome::Finished { closed } = scheduler.advance(frame)? {
            break closed.len();
        }
        if realtime {
            if let Some(rest) = frame_length.checked_sub(frame_start.elapsed()) {
                thread::sleep(rest);
            }
        }
    };

    let passed = scheduler.passed_notes();
    let file = scheduler.into_file();
    let tally = consumer.join().unwrap_or_default();

    println!(
        "Played {} frames ({} of song time) in {:.2?}",
        frames,
        format_time(frames as f64 * frame),
        started.elapsed()
    );
    println!(
        "Notes started: {}, spans drawn: {}, closed at the end: {}",
        passed, tally.spans, closed
    );
    file.close();
    Ok(())
}
