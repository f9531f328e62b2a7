//! Stand-ins for the external tools, shared by the integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use cuetag::breakpoints::Breakpoint;
use cuetag::tools::{EmbeddedSheetReader, SplitRequest, Splitter, Transcoder, SPLIT_PREFIX};
use cuetag::{CueTagError, Result};

/// Emits one breakpoint per track after the first and writes one raw file per
/// segment, numbered from the requested start index
#[derive(Default)]
pub struct FakeSplitter {
    pub start_indexes: RefCell<Vec<u32>>,
    /// Fail the nth split call (1-based) after writing its files
    pub fail_on_call: Option<usize>,
    /// Extra bogus index to write alongside the real ones
    pub stray_index: Option<u32>,
    /// Write one file fewer than asked for, still reporting success
    pub short_output: bool,
}

impl Splitter for FakeSplitter {
    fn breakpoints(&self, sheet: &Path) -> Result<Vec<Breakpoint>> {
        let content = fs::read_to_string(sheet)?;
        let tracks = content
            .lines()
            .filter(|l| l.trim_start().starts_with("TRACK "))
            .count() as u64;
        Ok((1..tracks.max(1)).map(|i| Breakpoint::CdFrames(i * 75 * 180)).collect())
    }

    fn split(&self, request: &SplitRequest<'_>) -> Result<()> {
        self.start_indexes.borrow_mut().push(request.start_index);
        let mut count = request.breakpoints.len() as u32 + 1;
        if self.short_output {
            count -= 1;
        }
        let ext = request.container.extension();

        for i in 0..count {
            let name = format!("{}{:02}.{}", SPLIT_PREFIX, request.start_index + i, ext);
            fs::write(request.output_dir.join(name), b"raw audio")?;
        }
        if let Some(stray) = self.stray_index {
            let name = format!("{}{:02}.{}", SPLIT_PREFIX, stray, ext);
            fs::write(request.output_dir.join(name), b"raw audio")?;
        }

        if self.fail_on_call == Some(self.start_indexes.borrow().len()) {
            return Err(CueTagError::ExternalToolFailure {
                tool: "shnsplit".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Copies bytes instead of encoding
#[derive(Default)]
pub struct CopyTranscoder {
    pub conversions: RefCell<Vec<(PathBuf, PathBuf)>>,
}

impl Transcoder for CopyTranscoder {
    fn transcode(&self, input: &Path, output: &Path, _bitrate: &str) -> Result<()> {
        assert!(!output.exists(), "transcode must not overwrite");
        fs::copy(input, output)?;
        Ok(())
    }

    fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        self.conversions
            .borrow_mut()
            .push((input.to_path_buf(), output.to_path_buf()));
        fs::copy(input, output)?;
        Ok(())
    }
}

pub struct StaticSheetReader(pub Option<String>);

impl EmbeddedSheetReader for StaticSheetReader {
    fn read_embedded_sheet(&self, _audio: &Path) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

/// Sorted entry names of a directory
pub fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
