//! Optional lossless round trip of the source audio before splitting.
//!
//! The file is decoded to a fresh WAV scratch file next to itself and
//! re-encoded over the original, which evens out encoder quirks that confuse
//! the splitter.

use std::path::Path;

use tempfile::{Builder, TempPath};
use tracing::{debug, info};

use crate::error::Result;
use crate::tools::Transcoder;
use crate::workspace::SCRATCH_PREFIX;

pub struct TranscodeStep<'a> {
    transcoder: &'a dyn Transcoder,
}

impl<'a> TranscodeStep<'a> {
    pub fn new(transcoder: &'a dyn Transcoder) -> Self {
        Self { transcoder }
    }

    /// Reserve a unique `.wav` path beside `audio`. Removed on drop, so a
    /// failed conversion leaves nothing behind.
    fn intermediate(audio: &Path) -> Result<TempPath> {
        let dir = match audio.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file = Builder::new()
            .prefix(SCRATCH_PREFIX)
            .suffix(".wav")
            .tempfile_in(dir)?;
        Ok(file.into_temp_path())
    }

    pub fn run(&self, audio: &Path) -> Result<()> {
        let intermediate = Self::intermediate(audio)?;
        debug!("Intermediate file {}", intermediate.display());

        info!("Round-tripping {} through WAV", audio.display());
        self.transcoder.convert(audio, &intermediate)?;
        self.transcoder.convert(&intermediate, audio)?;

        intermediate.close()?;
        Ok(())
    }
}
