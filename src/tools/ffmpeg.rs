use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use tracing::debug;

use super::{run_tool, EmbeddedSheetReader, Transcoder};
use crate::error::Result;

/// Transcoder backed by the `ffmpeg` command line tool
pub struct FfmpegTranscoder {
    ffmpeg: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    fn base_command(&self) -> Command {
        let mut command = Command::new(&self.ffmpeg);
        command.args(["-hide_banner", "-nostdin", "-loglevel", "error"]);
        command
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, input: &Path, output: &Path, bitrate: &str) -> Result<()> {
        debug!("Transcoding {} at {}", input.display(), bitrate);
        let mut command = self.base_command();
        command
            .arg("-n")
            .arg("-i")
            .arg(input)
            .args(["-ab", bitrate])
            .arg(output);
        run_tool(&mut command, "ffmpeg", None)?;
        Ok(())
    }

    fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        debug!("Converting {} to {}", input.display(), output.display());
        let mut command = self.base_command();
        command.arg("-y").arg("-i").arg(input).arg(output);
        run_tool(&mut command, "ffmpeg", None)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Reads the `CUESHEET` tag of APE/WavPack files through `ffprobe`
pub struct FfprobeSheetReader {
    ffprobe: PathBuf,
}

impl FfprobeSheetReader {
    pub fn new(ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }

    fn cue_sheet_from_probe(json: &[u8]) -> Result<Option<String>> {
        let probe: ProbeOutput = serde_json::from_slice(json)?;
        Ok(probe
            .format
            .tags
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("cuesheet"))
            .map(|(_, sheet)| sheet)
            .filter(|sheet| !sheet.trim().is_empty()))
    }
}

impl EmbeddedSheetReader for FfprobeSheetReader {
    fn read_embedded_sheet(&self, audio: &Path) -> Result<Option<String>> {
        let output = run_tool(
            Command::new(&self.ffprobe)
                .args(["-v", "quiet", "-print_format", "json", "-show_format"])
                .arg(audio),
            "ffprobe",
            None,
        )?;
        Self::cue_sheet_from_probe(&output.stdout)
    }
}
