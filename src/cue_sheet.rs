use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::{digit1, space1},
    combinator::map_res,
    error::{Error as NomError, ErrorKind},
    sequence::{pair, preceded, terminated},
    IResult,
};
use tracing::debug;

use crate::error::{CueTagError, HeaderField, Result};

/// Represents a single track in a CUE sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub number: u32,
    pub title: String,
}

/// Album-level fields shared by every track of the sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetHeader {
    pub performer: String,
    pub title: String,
}

/// Represents a parsed CUE sheet
#[derive(Debug, Clone)]
pub struct Sheet {
    pub header: SheetHeader,
    /// Tracks keyed by number, in ascending order
    pub tracks: BTreeMap<u32, Track>,
    /// Path from the last `FILE` directive, if any
    pub referenced_file: Option<String>,
}

impl Sheet {
    /// Lowest track number in the sheet, used as the split start index
    pub fn first_track_number(&self) -> Option<u32> {
        self.tracks.keys().next().copied()
    }

    pub fn track(&self, number: u32) -> Option<&Track> {
        self.tracks.get(&number)
    }
}

/// A single recognized line of a CUE sheet
#[derive(Debug, PartialEq, Eq)]
enum Directive<'a> {
    File(&'a str),
    AlbumTitle(&'a str),
    AlbumPerformer(&'a str),
    Track(u32),
    TrackTitle(&'a str),
    Other,
}

/// Line-oriented CUE sheet parser
pub struct CueSheetParser;

impl CueSheetParser {
    /// Parse a CUE sheet file that has already been normalized to UTF-8
    pub fn parse_file(path: &Path) -> Result<Sheet> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse CUE sheet content.
    ///
    /// A `TRACK` line opens a pending track that the next indented `TITLE`
    /// closes. A second `TRACK` before any `TITLE` drops the pending one.
    pub fn parse(content: &str) -> Result<Sheet> {
        let mut performer = None;
        let mut title = None;
        let mut referenced_file = None;
        let mut tracks = BTreeMap::new();
        let mut pending: Option<u32> = None;

        for line in content.lines() {
            match Self::classify(line) {
                Directive::File(path) => referenced_file = Some(path.to_string()),
                Directive::AlbumTitle(value) => title = Some(value.to_string()),
                Directive::AlbumPerformer(value) => performer = Some(value.to_string()),
                Directive::Track(number) => {
                    if let Some(lost) = pending.replace(number) {
                        debug!("Track {} has no TITLE before track {}, dropping it", lost, number);
                    }
                }
                Directive::TrackTitle(value) => {
                    if let Some(number) = pending.take() {
                        tracks.insert(
                            number,
                            Track {
                                number,
                                title: value.to_string(),
                            },
                        );
                    }
                }
                Directive::Other => {}
            }
        }

        let performer = performer.ok_or(CueTagError::MissingHeaderField(HeaderField::Performer))?;
        let title = title.ok_or(CueTagError::MissingHeaderField(HeaderField::Title))?;

        debug!(
            "Parsed CUE sheet '{}' by '{}' with {} tracks",
            title,
            performer,
            tracks.len()
        );

        Ok(Sheet {
            header: SheetHeader { performer, title },
            tracks,
            referenced_file,
        })
    }

    /// Work out what a single line means. Keywords are case-sensitive and
    /// indentation separates album fields from track fields.
    fn classify(line: &str) -> Directive<'_> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Ok((_, path)) = Self::keyword_value("FILE")(line) {
            return Directive::File(path);
        }
        if let Ok((_, value)) = Self::keyword_value("TITLE")(line) {
            return Directive::AlbumTitle(value);
        }
        if let Ok((_, value)) = Self::keyword_value("PERFORMER")(line) {
            return Directive::AlbumPerformer(value);
        }

        // Everything below only applies to indented lines
        let Ok((rest, _)) = space1::<_, NomError<&str>>(line) else {
            return Directive::Other;
        };
        if let Ok((_, number)) = Self::track_number(rest) {
            return Directive::Track(number);
        }
        if let Ok((_, value)) = Self::keyword_value("TITLE")(rest) {
            return Directive::TrackTitle(value);
        }

        Directive::Other
    }

    /// Parse `KEYWORD "value"`
    fn keyword_value<'a>(keyword: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
        preceded(pair(tag(keyword), space1), Self::parse_quoted_string)
    }

    /// Parse `TRACK <number> <type>`
    fn track_number(input: &str) -> IResult<&str, u32> {
        preceded(
            pair(tag("TRACK"), space1),
            map_res(terminated(digit1, space1), |s: &str| s.parse::<u32>()),
        )(input)
    }

    /// Parse quoted string. Repeated opening or closing quotes are tolerated,
    /// but the value must be non-empty and closed.
    fn parse_quoted_string(input: &str) -> IResult<&str, &str> {
        let (rest, _) = take_while1(|c: char| c == '"')(input)?;
        let close = rest
            .rfind('"')
            .ok_or_else(|| nom::Err::Error(NomError::new(rest, ErrorKind::Char)))?;
        let value = rest[..close].trim_end_matches('"');
        if value.is_empty() {
            return Err(nom::Err::Error(NomError::new(rest, ErrorKind::TakeUntil)));
        }
        Ok((&rest[close + 1..], value))
    }
}
