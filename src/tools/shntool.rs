use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use super::{run_tool, SplitRequest, Splitter, SPLIT_PREFIX};
use crate::breakpoints::{parse_breakpoints, Breakpoint};
use crate::error::Result;

/// Splitter backed by `cuebreakpoints` and `shnsplit` from shntool/cuetools
pub struct ShntoolSplitter {
    cuebreakpoints: PathBuf,
    shnsplit: PathBuf,
}

impl ShntoolSplitter {
    pub fn new(cuebreakpoints: impl Into<PathBuf>, shnsplit: impl Into<PathBuf>) -> Self {
        Self {
            cuebreakpoints: cuebreakpoints.into(),
            shnsplit: shnsplit.into(),
        }
    }

    /// Arguments for `shnsplit`; the split points go to its stdin
    fn split_args(request: &SplitRequest<'_>) -> Vec<OsString> {
        vec![
            "-c".into(),
            request.start_index.to_string().into(),
            "-O".into(),
            "never".into(),
            "-a".into(),
            SPLIT_PREFIX.into(),
            "-o".into(),
            request.container.extension().into(),
            "-d".into(),
            request.output_dir.as_os_str().to_owned(),
            request.audio.as_os_str().to_owned(),
        ]
    }
}

/// One breakpoint per line in `m:ss.nnn` form. `shnsplit` only takes
/// CD-frame timestamps for CD-quality audio, milliseconds work for any rate.
pub fn format_breakpoints(points: &[Breakpoint]) -> String {
    points
        .iter()
        .map(|p| format!("{}\n", Breakpoint::Millis(p.as_millis())))
        .collect()
}

impl Splitter for ShntoolSplitter {
    fn breakpoints(&self, sheet: &Path) -> Result<Vec<Breakpoint>> {
        let output = run_tool(
            Command::new(&self.cuebreakpoints).arg(sheet),
            "cuebreakpoints",
            None,
        )?;
        parse_breakpoints(&String::from_utf8_lossy(&output.stdout))
    }

    fn split(&self, request: &SplitRequest<'_>) -> Result<()> {
        info!(
            "Splitting {} at {} points, numbering from {}",
            request.audio.display(),
            request.breakpoints.len(),
            request.start_index
        );
        run_tool(
            Command::new(&self.shnsplit).args(Self::split_args(request)),
            "shnsplit",
            Some(&format_breakpoints(request.breakpoints)),
        )?;
        Ok(())
    }
}
