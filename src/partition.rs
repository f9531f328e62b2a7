//! Splitting of multi-file CUE sheets.
//!
//! Lines before the first `FILE` directive form the shared header. Every
//! `FILE` line starts a new block, and each block becomes a standalone sheet
//! made of the header followed by the block's own lines.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nom::{
    bytes::complete::tag,
    character::complete::{char, space1},
    sequence::tuple,
    IResult,
};
use tracing::debug;

use crate::error::Result;

/// A sheet scoped to exactly one `FILE` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubSheet {
    /// 1-based position of the `FILE` block in the source sheet
    pub index: usize,
    pub content: String,
}

pub struct SheetPartitioner;

impl SheetPartitioner {
    pub fn partition_file(path: &Path) -> Result<Vec<SubSheet>> {
        let file = File::open(path)?;
        Self::partition(BufReader::new(file))
    }

    /// Stream a sheet line by line and cut it at every `FILE` directive.
    /// A sheet without any `FILE` line yields no sub-sheets.
    pub fn partition<R: BufRead>(reader: R) -> Result<Vec<SubSheet>> {
        let mut header = String::new();
        let mut blocks: Vec<String> = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if Self::is_file_directive(&line) {
                blocks.push(String::new());
            }
            let target = blocks.last_mut().unwrap_or(&mut header);
            target.push_str(&line);
            target.push('\n');
        }

        debug!("Partitioned CUE sheet into {} FILE blocks", blocks.len());

        Ok(blocks
            .into_iter()
            .enumerate()
            .map(|(i, block)| SubSheet {
                index: i + 1,
                content: format!("{}{}", header, block),
            })
            .collect())
    }

    /// `FILE "<path>" ...` at the start of a line. The path may be empty
    /// here, it only has to be quoted.
    fn is_file_directive(line: &str) -> bool {
        let parsed: IResult<&str, _> = tuple((tag("FILE"), space1, char('"')))(line);
        matches!(parsed, Ok((rest, _)) if rest.contains('"'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue_sheet::CueSheetParser;
    use std::collections::BTreeMap;

    const TWO_FILE_SHEET: &str = r#"REM DATE 2001
PERFORMER "Artist"
TITLE "Double"
FILE "side-a.flac" WAVE
  TRACK 01 AUDIO
    TITLE "One"
    INDEX 01 00:00:00
  TRACK 02 AUDIO
    TITLE "Two"
    INDEX 01 03:00:00
FILE "side-b.flac" WAVE
  TRACK 03 AUDIO
    TITLE "Three"
    INDEX 01 00:00:00
  TRACK 04 AUDIO
    TITLE "Four"
    INDEX 01 02:30:00
"#;

    #[test]
    fn test_partition_count_matches_file_directives() {
        let subs = SheetPartitioner::partition(TWO_FILE_SHEET.as_bytes()).unwrap();

        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].index, 1);
        assert_eq!(subs[1].index, 2);
        for sub in &subs {
            assert!(sub.content.starts_with("REM DATE 2001\nPERFORMER \"Artist\"\nTITLE \"Double\"\n"));
        }
        assert!(subs[0].content.contains("side-a.flac"));
        assert!(!subs[0].content.contains("side-b.flac"));
        assert!(subs[1].content.contains("FILE \"side-b.flac\" WAVE\n  TRACK 03 AUDIO"));
    }

    #[test]
    fn test_partition_preserves_every_track_once() {
        let full = CueSheetParser::parse(TWO_FILE_SHEET).unwrap();
        let subs = SheetPartitioner::partition(TWO_FILE_SHEET.as_bytes()).unwrap();

        let mut union = BTreeMap::new();
        for sub in &subs {
            let sheet = CueSheetParser::parse(&sub.content).unwrap();
            assert_eq!(sheet.header, full.header);
            for (number, track) in sheet.tracks {
                assert!(union.insert(number, track).is_none(), "duplicate track {}", number);
            }
        }

        assert_eq!(union, full.tracks);

        let second = CueSheetParser::parse(&subs[1].content).unwrap();
        assert_eq!(second.first_track_number(), Some(3));
        assert_eq!(second.referenced_file.as_deref(), Some("side-b.flac"));
    }

    #[test]
    fn test_sheet_without_file_directive_yields_nothing() {
        let content = "PERFORMER \"A\"\nTITLE \"B\"\n  TRACK 01 AUDIO\n    TITLE \"One\"\n";
        let subs = SheetPartitioner::partition(content.as_bytes()).unwrap();
        assert!(subs.is_empty());
    }

    #[test]
    fn test_file_directive_detection() {
        assert!(SheetPartitioner::is_file_directive("FILE \"a.flac\" WAVE"));
        assert!(SheetPartitioner::is_file_directive("FILE \"\" WAVE"));
        assert!(!SheetPartitioner::is_file_directive("  FILE \"a.flac\" WAVE"));
        assert!(!SheetPartitioner::is_file_directive("FILE a.flac WAVE"));
        assert!(!SheetPartitioner::is_file_directive("FILE \"unterminated"));
        assert!(!SheetPartitioner::is_file_directive("REM FILE \"a.flac\""));
    }
}
