mod common;

#[cfg(test)]
mod tests {
    use super::common::{self, chunk, header, smf, TrackBuilder};
    use std::fs;
    use std::sync::Arc;
    use tickstream::error::StructuralError;
    use tickstream::smf::ByteRange;
    use tickstream::{Error, LoadProgress, LoadStage, MidiFile, WorkerPool};

    fn two_tracks() -> Vec<Vec<u8>> {
        vec![
            TrackBuilder::new()
                .note_on(0, 0, 60, 100)
                .note_on(0, 0, 64, 100)
                .note_off(240, 0, 60)
                .note_off(240, 0, 64)
                .end(480),
            TrackBuilder::new()
                .note_on(120, 9, 36, 127)
                .note_on(240, 9, 36, 0)
                .end(960),
        ]
    }

    #[test]
    fn test_metadata_after_load() {
        common::init_logging();
        let file = MidiFile::from_bytes(smf(1, 480, &two_tracks())).unwrap();
        assert_eq!(file.format_type(), 1);
        assert_eq!(file.time_division(), 480);
        assert_eq!(file.track_count(), 2);
        assert_eq!(file.track_count_header(), 2);
        assert_eq!(file.tick_count(), 960);
        assert_eq!(file.note_count(), 3);
        assert_eq!(file.tracks()[1].length_in_ticks(), 960);
        assert_eq!(file.file_name(), None);
        assert!((file.length() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_other_formats_are_structural_errors() {
        for format in [0, 2] {
            let err = MidiFile::from_bytes(smf(format, 480, &two_tracks())).unwrap_err();
            assert!(err.is_structural());
            assert!(matches!(
                err,
                Error::Structural(StructuralError::UnsupportedFormat(f)) if f == format
            ));
        }
    }

    #[test]
    fn test_header_faults() {
        let mut smpte = smf(1, 480, &two_tracks());
        smpte[12] = 0xE7;
        smpte[13] = 0x28;
        assert!(matches!(
            MidiFile::from_bytes(smpte),
            Err(Error::Structural(StructuralError::SmpteDivision(0xE728)))
        ));

        let mut riff = smf(1, 480, &two_tracks());
        riff[..4].copy_from_slice(b"RIFF");
        assert!(matches!(
            MidiFile::from_bytes(riff),
            Err(Error::Structural(StructuralError::BadSignature))
        ));

        assert!(MidiFile::from_bytes(Vec::new()).unwrap_err().is_structural());
    }

    #[test]
    fn test_unknown_chunks_are_skipped() {
        let tracks = two_tracks();
        let mut bytes = header(1, 2, 480);
        bytes.extend(chunk(b"MTrk", &tracks[0]));
        bytes.extend(chunk(b"JUNK", &[0xFF; 11]));
        bytes.extend(chunk(b"MTrk", &tracks[1]));

        let file = MidiFile::from_bytes(bytes).unwrap();
        assert_eq!(file.track_count(), 2);
        let ranges: Vec<ByteRange> = file.tracks().iter().map(|t| t.range()).collect();
        assert!(ranges[0].offset < ranges[1].offset);
        assert!(!ranges[0].overlaps(&ranges[1]));
        assert_eq!(ranges[1].offset, ranges[0].end() + 8 + 11 + 8);
    }

    #[test]
    fn test_header_count_may_disagree_with_chunks() {
        let mut bytes = header(1, 5, 96);
        bytes.extend(chunk(b"MTrk", &TrackBuilder::new().end(0)));
        let file = MidiFile::from_bytes(bytes).unwrap();
        assert_eq!(file.track_count_header(), 5);
        assert_eq!(file.track_count(), 1);
        assert_eq!(file.tick_count(), 0);
    }

    #[test]
    fn test_truncated_track_chunk_is_malformed() {
        let mut bytes = smf(1, 480, &two_tracks());
        bytes.truncate(bytes.len() - 3);
        let err = MidiFile::from_bytes(bytes).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_progress_reaches_streaming() {
        let pool = Arc::new(WorkerPool::with_threads(3).unwrap());
        let progress = LoadProgress::new();
        let file =
            MidiFile::from_bytes_with_progress(smf(1, 480, &two_tracks()), pool.clone(), &progress)
                .unwrap();
        assert_eq!(progress.stage(), LoadStage::Streaming);
        assert_eq!(progress.found_tracks(), 2);
        assert_eq!(progress.created_tracks(), 2);
        assert_eq!(progress.scanned_tracks(), 2);
        assert_eq!(file.pool().threads(), 3);
        assert!(Arc::ptr_eq(file.pool(), &pool));
    }

    #[test]
    fn test_open_reads_from_disk() {
        let path = std::env::temp_dir().join(format!("tickstream-open-{}.mid", std::process::id()));
        fs::write(&path, smf(1, 480, &two_tracks())).unwrap();

        let mut file = MidiFile::open(&path).unwrap();
        assert_eq!(file.file_name(), path.file_name().and_then(|n| n.to_str()));
        assert_eq!(file.path(), Some(path.as_path()));
        assert_eq!(file.events_between(0, 240).unwrap().len(), 6);
        file.close();

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_a_resource_error() {
        let path = std::env::temp_dir().join("tickstream-definitely-missing.mid");
        match MidiFile::open(&path) {
            Err(Error::Resource { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected a resource error, got {:?}", other),
        }
    }

    #[test]
    fn test_reset_cursors_rewinds_every_track() {
        let mut file = MidiFile::from_bytes(smf(1, 480, &two_tracks())).unwrap();
        let first = file.events_between(0, 960).unwrap().to_vec();
        assert!(file.tracks().iter().all(|t| !t.cursor().is_at_start()));

        file.reset_cursors();
        assert!(file.tracks().iter().all(|t| t.cursor().is_at_start()));
        assert_eq!(file.events_between(0, 960).unwrap().to_vec(), first);
    }
}
