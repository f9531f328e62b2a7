use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Header fields that every sheet must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    Performer,
    Title,
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderField::Performer => write!(f, "PERFORMER"),
            HeaderField::Title => write!(f, "TITLE"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CueTagError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CUE sheet is missing the top-level {0} field")]
    MissingHeaderField(HeaderField),
    #[error("No CUE sheet found in {0}")]
    NoSheetFound(PathBuf),
    #[error("No audio file found for {0}")]
    NoAudioFileFound(String),
    #[error("CUE sheet contains no FILE directives")]
    NoFileDirectives,
    #[error("CUE sheet for {0} contains no tracks")]
    NoTracks(String),
    #[error("Failed to start {tool}: {source}")]
    ToolSpawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} failed ({status}): {stderr}")]
    ExternalToolFailure {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("Split output {file} has no matching track {number} in the CUE sheet")]
    UnmatchedTrackReference { file: String, number: u32 },
    #[error("Splitter wrote {found} of {expected} track files for {audio}")]
    IncompleteSplit {
        audio: String,
        expected: usize,
        found: usize,
    },
    #[error("No split output for track {number} ({title})")]
    MissingTrackFile { number: u32, title: String },
    #[error("Refusing to overwrite existing file {0}")]
    OutputExists(PathBuf),
    #[error("Invalid breakpoint: {0}")]
    InvalidBreakpoint(String),
    #[error("Unknown text encoding: {0}")]
    UnknownEncoding(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Tag error: {0}")]
    Tag(#[from] id3::Error),
    #[error("Unreadable ffprobe output: {0}")]
    ProbeOutput(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CueTagError>;

impl CueTagError {
    /// Process exit code for this class of failure
    pub fn exit_code(&self) -> i32 {
        match self {
            CueTagError::InvalidArgument(_) | CueTagError::UnknownEncoding(_) => 2,
            CueTagError::NoSheetFound(_)
            | CueTagError::NoAudioFileFound(_)
            | CueTagError::NoFileDirectives => 3,
            CueTagError::MissingHeaderField(_)
            | CueTagError::NoTracks(_)
            | CueTagError::InvalidBreakpoint(_) => 4,
            CueTagError::ToolSpawn { .. }
            | CueTagError::ExternalToolFailure { .. }
            | CueTagError::ProbeOutput(_)
            | CueTagError::IncompleteSplit { .. } => 5,
            CueTagError::UnmatchedTrackReference { .. } | CueTagError::MissingTrackFile { .. } => 6,
            CueTagError::Io(_) | CueTagError::OutputExists(_) | CueTagError::Tag(_) => 1,
        }
    }
}
