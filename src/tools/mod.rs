//! Seams to the external collaborators: splitter, transcoder, tag writer and
//! embedded sheet reader. Each call blocks until the collaborator is done.

pub mod ffmpeg;
pub mod id3_tags;
pub mod shntool;

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tracing::debug;

use crate::breakpoints::Breakpoint;
use crate::cue_sheet::{SheetHeader, Track};
use crate::error::{CueTagError, Result};
use crate::source::SplitContainer;

pub use ffmpeg::{FfmpegTranscoder, FfprobeSheetReader};
pub use id3_tags::Id3TagWriter;
pub use shntool::ShntoolSplitter;

/// File name prefix of raw tracks written by the splitter
pub const SPLIT_PREFIX: &str = "split-track";

/// Everything the splitter needs to cut one audio file
#[derive(Debug)]
pub struct SplitRequest<'a> {
    pub audio: &'a Path,
    pub breakpoints: &'a [Breakpoint],
    /// Number given to the first output file
    pub start_index: u32,
    pub container: SplitContainer,
    pub output_dir: &'a Path,
}

pub trait Splitter {
    /// Compute the split points of a single-file sheet
    fn breakpoints(&self, sheet: &Path) -> Result<Vec<Breakpoint>>;

    /// Cut the audio at the given points into `split-track<NN>.<ext>` files
    fn split(&self, request: &SplitRequest<'_>) -> Result<()>;
}

pub trait Transcoder {
    /// Encode `input` into the lossy distribution format at `bitrate`.
    /// Never overwrites `output`.
    fn transcode(&self, input: &Path, output: &Path, bitrate: &str) -> Result<()>;

    /// Lossless conversion, container chosen from the output extension.
    /// Overwrites `output`.
    fn convert(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Tag values for one output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags {
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    pub title: String,
    pub track_number: u32,
}

impl TrackTags {
    pub fn new(header: &SheetHeader, track: &Track) -> Self {
        Self {
            artist: header.performer.clone(),
            album: header.title.clone(),
            album_artist: header.performer.clone(),
            title: track.title.clone(),
            track_number: track.number,
        }
    }
}

pub trait TagWriter {
    fn write_tags(&self, path: &Path, tags: &TrackTags) -> Result<()>;
}

pub trait EmbeddedSheetReader {
    /// Cue sheet text embedded in an audio file, if it carries one
    fn read_embedded_sheet(&self, audio: &Path) -> Result<Option<String>>;
}

/// Run an external tool to completion, feeding `stdin` if given. A non-zero
/// exit status is an error.
pub(crate) fn run_tool(command: &mut Command, tool: &str, stdin: Option<&str>) -> Result<Output> {
    debug!("Running {:?}", command);

    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|source| CueTagError::ToolSpawn {
        tool: tool.to_string(),
        source,
    })?;

    if let Some(input) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(input.as_bytes())?;
            // pipe dropped here so the tool sees EOF
        }
    }

    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(CueTagError::ExternalToolFailure {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output)
}
