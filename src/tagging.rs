//! Turning raw split files into named, tagged distribution files.
//!
//! Every raw track goes through rename, transcode, tag and removal of the
//! renamed raw file, in that order.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::cue_sheet::{Sheet, Track};
use crate::error::{CueTagError, Result};
use crate::source::SplitContainer;
use crate::tools::{TagWriter, TrackTags, Transcoder, SPLIT_PREFIX};
use crate::workspace::WorkspaceTransaction;

/// Extension of the tagged output files
pub const TARGET_EXTENSION: &str = "mp3";

static RAW_TRACK_PATTERN: OnceLock<Regex> = OnceLock::new();

fn raw_track_pattern() -> &'static Regex {
    RAW_TRACK_PATTERN.get_or_init(|| {
        let pattern = format!(r"^{}(\d+)\.([^.]+)$", regex::escape(SPLIT_PREFIX));
        Regex::new(&pattern).expect("split track pattern is valid")
    })
}

/// A file written by the splitter, not yet renamed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTrackFile {
    /// Index embedded in the file name
    pub number: u32,
    pub path: PathBuf,
}

impl RawTrackFile {
    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Make a track title usable as a file name. Tags keep the original title.
pub fn safe_file_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    match stem.trim() {
        "" | "." | ".." => "_".to_string(),
        _ => stem,
    }
}

pub struct TaggingPipeline<'a> {
    transcoder: &'a dyn Transcoder,
    tagger: &'a dyn TagWriter,
    bitrate: &'a str,
}

impl<'a> TaggingPipeline<'a> {
    pub fn new(transcoder: &'a dyn Transcoder, tagger: &'a dyn TagWriter, bitrate: &'a str) -> Self {
        Self {
            transcoder,
            tagger,
            bitrate,
        }
    }

    /// Raw split files created during this run, ordered by index
    pub fn find_raw_tracks(
        txn: &WorkspaceTransaction,
        container: SplitContainer,
    ) -> Result<Vec<RawTrackFile>> {
        let mut raw = Vec::new();

        for entry in fs::read_dir(txn.dir())? {
            let entry = entry?;
            let name = entry.file_name();
            if !txn.is_new(&name) {
                continue;
            }
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(caps) = raw_track_pattern().captures(name) else {
                continue;
            };
            if &caps[2] != container.extension() {
                continue;
            }
            match caps[1].parse::<u32>() {
                Ok(number) => raw.push(RawTrackFile {
                    number,
                    path: entry.path(),
                }),
                Err(e) => warn!("Ignoring {}: bad track index ({})", name, e),
            }
        }

        raw.sort_by_key(|r| r.number);
        debug!("Found {} raw track files", raw.len());
        Ok(raw)
    }

    /// Rename, transcode and tag every raw file. Raw files and sheet tracks
    /// must match one to one; this is checked before the first file is touched.
    pub fn process(
        &self,
        sheet: &Sheet,
        raw: &[RawTrackFile],
        container: SplitContainer,
    ) -> Result<Vec<PathBuf>> {
        let mut pairs = Vec::with_capacity(raw.len());
        for file in raw {
            let track = sheet
                .track(file.number)
                .ok_or_else(|| CueTagError::UnmatchedTrackReference {
                    file: file.file_name(),
                    number: file.number,
                })?;
            pairs.push((file, track));
        }

        if let Some(track) = sheet
            .tracks
            .values()
            .find(|t| !raw.iter().any(|file| file.number == t.number))
        {
            return Err(CueTagError::MissingTrackFile {
                number: track.number,
                title: track.title.clone(),
            });
        }

        let mut outputs = Vec::with_capacity(pairs.len());
        for (file, track) in pairs {
            outputs.push(self.process_one(sheet, file, track, container)?);
        }
        Ok(outputs)
    }

    fn process_one(
        &self,
        sheet: &Sheet,
        file: &RawTrackFile,
        track: &Track,
        container: SplitContainer,
    ) -> Result<PathBuf> {
        let dir = file.path.parent().unwrap_or_else(|| Path::new("."));
        let stem = safe_file_stem(&track.title);
        let renamed = dir.join(format!("{}.{}", stem, container.extension()));
        let target = dir.join(format!("{}.{}", stem, TARGET_EXTENSION));

        for path in [&renamed, &target] {
            if path.exists() {
                return Err(CueTagError::OutputExists(path.clone()));
            }
        }

        fs::rename(&file.path, &renamed)?;
        self.transcoder.transcode(&renamed, &target, self.bitrate)?;
        self.tagger
            .write_tags(&target, &TrackTags::new(&sheet.header, track))?;
        fs::remove_file(&renamed)?;

        info!("Track {:02}: {}", track.number, target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue_sheet::CueSheetParser;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct CopyTranscoder;

    impl Transcoder for CopyTranscoder {
        fn transcode(&self, input: &Path, output: &Path, _bitrate: &str) -> Result<()> {
            fs::copy(input, output)?;
            Ok(())
        }

        fn convert(&self, input: &Path, output: &Path) -> Result<()> {
            fs::copy(input, output)?;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingTagger {
        written: RefCell<Vec<(String, TrackTags)>>,
    }

    impl TagWriter for RecordingTagger {
        fn write_tags(&self, path: &Path, tags: &TrackTags) -> Result<()> {
            assert!(path.exists(), "tagging a missing file");
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.written.borrow_mut().push((name, tags.clone()));
            Ok(())
        }
    }

    const SHEET: &str = "PERFORMER \"Artist\"\nTITLE \"Album\"\nFILE \"disc.flac\" WAVE\n  TRACK 01 AUDIO\n    TITLE \"Intro\"\n  TRACK 02 AUDIO\n    TITLE \"AC/DC\"\n";

    #[test]
    fn test_find_raw_tracks_only_new_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("split-track09.flac"), b"old").unwrap();
        let txn = WorkspaceTransaction::open(temp_dir.path()).unwrap();

        fs::write(temp_dir.path().join("split-track02.flac"), b"2").unwrap();
        fs::write(temp_dir.path().join("split-track01.flac"), b"1").unwrap();
        fs::write(temp_dir.path().join("split-track03.wav"), b"3").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), b"x").unwrap();

        let raw = TaggingPipeline::find_raw_tracks(&txn, SplitContainer::Flac).unwrap();
        let numbers: Vec<u32> = raw.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_process_renames_transcodes_and_tags() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let sheet = CueSheetParser::parse(SHEET).unwrap();
        let txn = WorkspaceTransaction::open(temp_dir.path()).unwrap();
        fs::write(temp_dir.path().join("split-track01.flac"), b"1").unwrap();
        fs::write(temp_dir.path().join("split-track02.flac"), b"2").unwrap();

        let tagger = RecordingTagger::default();
        let pipeline = TaggingPipeline::new(&CopyTranscoder, &tagger, "320k");
        let raw = TaggingPipeline::find_raw_tracks(&txn, SplitContainer::Flac).unwrap();
        let outputs = pipeline.process(&sheet, &raw, SplitContainer::Flac).unwrap();

        assert_eq!(
            outputs,
            vec![
                temp_dir.path().join("Intro.mp3"),
                temp_dir.path().join("AC_DC.mp3")
            ]
        );
        assert!(!temp_dir.path().join("Intro.flac").exists());
        assert!(!temp_dir.path().join("split-track01.flac").exists());

        let written = tagger.written.borrow();
        assert_eq!(written[1].0, "AC_DC.mp3");
        assert_eq!(written[1].1.title, "AC/DC");
        assert_eq!(written[1].1.track_number, 2);
        assert_eq!(written[0].1.album, "Album");
        assert_eq!(written[0].1.artist, "Artist");
        assert_eq!(written[0].1.album_artist, "Artist");
    }

    #[test]
    fn test_unmatched_index_fails_before_any_rename() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let sheet = CueSheetParser::parse(SHEET).unwrap();
        let txn = WorkspaceTransaction::open(temp_dir.path()).unwrap();
        fs::write(temp_dir.path().join("split-track01.flac"), b"1").unwrap();
        fs::write(temp_dir.path().join("split-track07.flac"), b"7").unwrap();

        let tagger = RecordingTagger::default();
        let pipeline = TaggingPipeline::new(&CopyTranscoder, &tagger, "320k");
        let raw = TaggingPipeline::find_raw_tracks(&txn, SplitContainer::Flac).unwrap();
        let err = pipeline.process(&sheet, &raw, SplitContainer::Flac).unwrap_err();

        assert!(matches!(
            err,
            CueTagError::UnmatchedTrackReference { number: 7, .. }
        ));
        assert!(temp_dir.path().join("split-track01.flac").exists());
        assert!(tagger.written.borrow().is_empty());
    }

    #[test]
    fn test_track_without_split_file_fails_before_any_rename() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let sheet = CueSheetParser::parse(SHEET).unwrap();
        let txn = WorkspaceTransaction::open(temp_dir.path()).unwrap();
        fs::write(temp_dir.path().join("split-track01.flac"), b"1").unwrap();

        let tagger = RecordingTagger::default();
        let pipeline = TaggingPipeline::new(&CopyTranscoder, &tagger, "320k");
        let raw = TaggingPipeline::find_raw_tracks(&txn, SplitContainer::Flac).unwrap();
        let err = pipeline.process(&sheet, &raw, SplitContainer::Flac).unwrap_err();

        match err {
            CueTagError::MissingTrackFile { number, title } => {
                assert_eq!(number, 2);
                assert_eq!(title, "AC/DC");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(temp_dir.path().join("split-track01.flac").exists());
        assert!(!temp_dir.path().join("Intro.mp3").exists());
        assert!(tagger.written.borrow().is_empty());
    }

    #[test]
    fn test_existing_output_is_not_overwritten() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("Intro.mp3"), b"keep me").unwrap();
        let sheet = CueSheetParser::parse(SHEET).unwrap();
        let txn = WorkspaceTransaction::open(temp_dir.path()).unwrap();
        fs::write(temp_dir.path().join("split-track01.flac"), b"1").unwrap();

        let tagger = RecordingTagger::default();
        let pipeline = TaggingPipeline::new(&CopyTranscoder, &tagger, "320k");
        let raw = TaggingPipeline::find_raw_tracks(&txn, SplitContainer::Flac).unwrap();
        let err = pipeline.process(&sheet, &raw, SplitContainer::Flac).unwrap_err();

        assert!(matches!(err, CueTagError::OutputExists(_)));
        assert_eq!(fs::read(temp_dir.path().join("Intro.mp3")).unwrap(), b"keep me");
    }

    #[test]
    fn test_safe_file_stem() {
        assert_eq!(safe_file_stem("Song Two"), "Song Two");
        assert_eq!(safe_file_stem("A/B\\C"), "A_B_C");
        assert_eq!(safe_file_stem(".."), "_");
    }
}
