//! Input source kinds and what each of them can do.

use crate::error::{CueTagError, Result};

/// Single-file containers handled in alternate mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlternateFormat {
    Ape,
    WavPack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Sheet and audio discovered in the working directory, split to FLAC
    Standard,
    /// One audio file given on the command line, sheet embedded in it
    AlternateContainer(AlternateFormat),
}

/// Where the sheet comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetAcquisition {
    /// Scan the working directory for a `.cue` file
    Discover,
    /// Read the cue sheet embedded in the input audio file
    Generate,
}

/// Container the splitter writes raw tracks in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitContainer {
    Flac,
    Ape,
    Wv,
}

impl SplitContainer {
    pub fn extension(&self) -> &'static str {
        match self {
            SplitContainer::Flac => "flac",
            SplitContainer::Ape => "ape",
            SplitContainer::Wv => "wv",
        }
    }

    /// ffmpeg can decode all of these but has no APE encoder
    pub fn supports_round_trip(&self) -> bool {
        !matches!(self, SplitContainer::Ape)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub sheet: SheetAcquisition,
    pub container: SplitContainer,
}

impl SourceKind {
    /// Map the `--format` flag. No value or `flac` selects the standard mode.
    pub fn from_format(format: Option<&str>) -> Result<Self> {
        let Some(format) = format else {
            return Ok(SourceKind::Standard);
        };
        match format.trim().to_ascii_lowercase().as_str() {
            "flac" => Ok(SourceKind::Standard),
            "ape" => Ok(SourceKind::AlternateContainer(AlternateFormat::Ape)),
            "wv" | "wavpack" => Ok(SourceKind::AlternateContainer(AlternateFormat::WavPack)),
            other => Err(CueTagError::InvalidArgument(format!(
                "unsupported --format '{}' (expected flac, ape or wv)",
                other
            ))),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            SourceKind::Standard => Capabilities {
                sheet: SheetAcquisition::Discover,
                container: SplitContainer::Flac,
            },
            SourceKind::AlternateContainer(AlternateFormat::Ape) => Capabilities {
                sheet: SheetAcquisition::Generate,
                container: SplitContainer::Ape,
            },
            SourceKind::AlternateContainer(AlternateFormat::WavPack) => Capabilities {
                sheet: SheetAcquisition::Generate,
                container: SplitContainer::Wv,
            },
        }
    }
}
