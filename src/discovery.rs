//! Locating the sheet and audio inputs in the working directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{CueTagError, Result};
use crate::source::SplitContainer;
use crate::workspace::SCRATCH_PREFIX;

const SHEET_EXTENSION: &str = "cue";

pub struct InputDiscovery;

impl InputDiscovery {
    /// Find a file with the given extension (case-insensitive). When several
    /// match, the last one in directory iteration order wins.
    pub fn find_by_extension(dir: &Path, extension: &str) -> Result<Option<PathBuf>> {
        let mut found = None;

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let is_scratch = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(SCRATCH_PREFIX))
                .unwrap_or(false);
            if is_scratch {
                continue;
            }

            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case(extension))
                .unwrap_or(false);
            if matches {
                if let Some(previous) = found.replace(path) {
                    warn!(
                        "Several .{} files found, ignoring {}",
                        extension,
                        previous.display()
                    );
                }
            }
        }

        Ok(found)
    }

    pub fn find_sheet(dir: &Path) -> Result<PathBuf> {
        let sheet = Self::find_by_extension(dir, SHEET_EXTENSION)?
            .ok_or_else(|| CueTagError::NoSheetFound(dir.to_path_buf()))?;
        info!("Using CUE sheet {}", sheet.display());
        Ok(sheet)
    }

    /// Sheet paths that are absolute or climb out with `..` are cut down to
    /// their file name, so the audio always lives inside the workspace.
    fn confined(referenced: &str) -> PathBuf {
        let path = Path::new(referenced);
        let stays_inside = path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if stays_inside {
            return path.to_path_buf();
        }
        let name = path.file_name().map(PathBuf::from).unwrap_or_default();
        warn!(
            "{} points outside the working directory, looking for {} instead",
            referenced,
            name.display()
        );
        name
    }

    /// Resolve the audio file a sheet refers to.
    ///
    /// Tries the referenced path, then the same name with the split
    /// container's extension (sheets often say `.wav` for a `.flac` image),
    /// then, if `scan` is set, any file with that extension in `dir`.
    pub fn resolve_audio(
        dir: &Path,
        referenced: Option<&str>,
        container: SplitContainer,
        scan: bool,
    ) -> Result<PathBuf> {
        if let Some(referenced) = referenced {
            let path = dir.join(Self::confined(referenced));
            if path.is_file() {
                return Ok(path);
            }
            let renamed = path.with_extension(container.extension());
            if renamed.is_file() {
                debug!("{} not found, using {}", path.display(), renamed.display());
                return Ok(renamed);
            }
        }

        if scan {
            if let Some(path) = Self::find_by_extension(dir, container.extension())? {
                info!("Using audio file {}", path.display());
                return Ok(path);
            }
        }

        Err(CueTagError::NoAudioFileFound(
            referenced.unwrap_or("CUE sheet").to_string(),
        ))
    }
}
