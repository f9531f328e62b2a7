use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::source::SplitContainer;
use crate::tools::{SplitRequest, Splitter};

/// One (sheet, audio file) pair to split
#[derive(Debug, Clone, Copy)]
pub struct ExtractionJob<'a> {
    pub sheet_path: &'a Path,
    pub audio: &'a Path,
    /// Lowest track number in the sheet, so output numbering stays global
    /// across multi-file discs
    pub start_index: u32,
    pub container: SplitContainer,
}

/// Drives the splitter for one sub-sheet. The splitter's output files are
/// not checked here; the tagging stage correlates whatever appears.
pub struct ExtractionEngine<'a> {
    splitter: &'a dyn Splitter,
}

impl<'a> ExtractionEngine<'a> {
    pub fn new(splitter: &'a dyn Splitter) -> Self {
        Self { splitter }
    }

    /// Split the audio into `output_dir`. Returns the number of tracks the
    /// splitter was asked to produce.
    pub fn extract(&self, job: &ExtractionJob<'_>, output_dir: &Path) -> Result<usize> {
        let breakpoints = self.splitter.breakpoints(job.sheet_path)?;
        let expected = breakpoints.len() + 1;

        info!(
            "Extracting {} tracks from {} starting at {}",
            expected,
            job.audio.display(),
            job.start_index
        );

        self.splitter.split(&SplitRequest {
            audio: job.audio,
            breakpoints: &breakpoints,
            start_index: job.start_index,
            container: job.container,
            output_dir,
        })?;

        Ok(expected)
    }
}
