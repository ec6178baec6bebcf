#[cfg(test)]
mod tests {
    use clap::Parser;
    use std::path::PathBuf;
    use tickstream::cli::Args;
    use tickstream::config::{Overrides, Settings};

    #[test]
    fn test_args_with_only_a_file() {
        let args = Args::parse_from(["tickstream", "song.mid"]);
        assert_eq!(args.file, PathBuf::from("song.mid"));
        assert!(args.config.is_none());
        assert!(!args.info);
        assert!(!args.realtime);
        assert_eq!(args.verbose, 0);
        assert_eq!(args.overrides(), Overrides::default());
    }

    #[test]
    fn test_args_become_overrides() {
        let args = Args::parse_from([
            "tickstream",
            "--fps",
            "30",
            "--lookahead",
            "4",
            "--threads-multiplier",
            "1",
            "-vv",
            "--info",
            "song.mid",
        ]);
        assert_eq!(args.verbose, 2);
        assert!(args.info);

        let mut settings = Settings::default();
        settings.apply(&args.overrides());
        assert_eq!(settings.frames_per_second, 30.0);
        assert_eq!(settings.lookahead_quarters, 4);
        assert_eq!(settings.pool_multiplier, 1);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_file_is_required() {
        assert!(Args::try_parse_from(["tickstream"]).is_err());
        assert!(Args::try_parse_from(["tickstream", "a.mid", "--lookahead", "x"]).is_err());
    }
}
