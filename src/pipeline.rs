//! Run orchestration.
//!
//! One run opens a workspace transaction, acquires and normalizes the sheet,
//! partitions it per `FILE` block and then, for every block: parse, optional
//! round trip, split, tag. Any error rolls the workspace back.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::config::Config;
use crate::cue_sheet::{CueSheetParser, Sheet};
use crate::discovery::InputDiscovery;
use crate::encoding::{EncodingBridge, SheetEncoding};
use crate::error::{CueTagError, Result};
use crate::extraction::{ExtractionEngine, ExtractionJob};
use crate::partition::{SheetPartitioner, SubSheet};
use crate::source::{Capabilities, SheetAcquisition, SourceKind};
use crate::tagging::TaggingPipeline;
use crate::tools::{EmbeddedSheetReader, Splitter, TagWriter, Transcoder};
use crate::transcode::TranscodeStep;
use crate::workspace::WorkspaceTransaction;

/// Per-run settings
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source: SourceKind,
    /// Round-trip the source audio before splitting
    pub convert: bool,
    /// Audio file for the alternate container mode
    pub input: Option<PathBuf>,
    pub bitrate: String,
    pub sheet_encoding: SheetEncoding,
}

impl RunOptions {
    pub fn from_config(config: &Config, source: SourceKind, convert: bool, input: Option<PathBuf>) -> Self {
        Self {
            source,
            convert,
            input,
            bitrate: config.bitrate.clone(),
            sheet_encoding: config.sheet_encoding,
        }
    }
}

/// The external collaborators a run talks to
#[derive(Clone, Copy)]
pub struct Toolchain<'a> {
    pub splitter: &'a dyn Splitter,
    pub transcoder: &'a dyn Transcoder,
    pub tagger: &'a dyn TagWriter,
    pub sheet_reader: &'a dyn EmbeddedSheetReader,
}

/// Outcome of a committed run
#[derive(Debug, Default)]
pub struct RunReport {
    pub sheets: usize,
    pub outputs: Vec<PathBuf>,
}

/// A sub-sheet ready for extraction
#[derive(Debug)]
struct SheetJob {
    index: usize,
    sheet: Sheet,
    sheet_path: PathBuf,
    audio: PathBuf,
    start_index: u32,
}

pub struct Pipeline<'a> {
    dir: PathBuf,
    options: RunOptions,
    tools: Toolchain<'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(dir: impl Into<PathBuf>, options: RunOptions, tools: Toolchain<'a>) -> Self {
        Self {
            dir: dir.into(),
            options,
            tools,
        }
    }

    /// Run to completion. On failure every file created since the start of
    /// the run is deleted before the error is returned.
    pub fn run(&self) -> Result<RunReport> {
        let mut txn = WorkspaceTransaction::open(&self.dir)?;
        txn.begin();

        match self.execute(&mut txn) {
            Ok(report) => {
                txn.commit();
                info!(
                    "Done: {} tracks from {} sheets",
                    report.outputs.len(),
                    report.sheets
                );
                Ok(report)
            }
            Err(e) => {
                error!("{}", e);
                let removed = txn.rollback();
                info!("Rolled back {} new entries", removed.len());
                Err(e)
            }
        }
    }

    fn execute(&self, txn: &mut WorkspaceTransaction) -> Result<RunReport> {
        let capabilities = self.options.source.capabilities();
        if self.options.convert && !capabilities.container.supports_round_trip() {
            return Err(CueTagError::InvalidArgument(format!(
                "--conv is not supported for .{} sources",
                capabilities.container.extension()
            )));
        }

        let text = self.acquire_sheet(capabilities.sheet)?;
        let normalized = txn.create_scratch(".cue", &text)?;

        let sub_sheets = SheetPartitioner::partition_file(&normalized)?;
        if sub_sheets.is_empty() {
            return Err(CueTagError::NoFileDirectives);
        }
        let single_file = sub_sheets.len() == 1;

        let mut report = RunReport::default();
        for sub in &sub_sheets {
            let job = self.prepare_job(txn, sub, capabilities, single_file)?;
            report.outputs.extend(self.run_job(txn, &job, capabilities)?);
            report.sheets += 1;
        }

        Ok(report)
    }

    fn acquire_sheet(&self, acquisition: SheetAcquisition) -> Result<String> {
        match acquisition {
            SheetAcquisition::Discover => {
                if self.options.input.is_some() {
                    warn!("--input is only used with --format ape or wv, ignoring it");
                }
                let sheet = InputDiscovery::find_sheet(&self.dir)?;
                EncodingBridge::normalize_file(&sheet, self.options.sheet_encoding)
            }
            SheetAcquisition::Generate => {
                let input = self.alternate_input()?;
                self.tools
                    .sheet_reader
                    .read_embedded_sheet(input)?
                    .ok_or_else(|| CueTagError::NoSheetFound(input.to_path_buf()))
            }
        }
    }

    fn alternate_input(&self) -> Result<&Path> {
        let input = self.options.input.as_deref().ok_or_else(|| {
            CueTagError::InvalidArgument("--input is required with --format ape or wv".to_string())
        })?;
        if !input.is_file() {
            return Err(CueTagError::NoAudioFileFound(input.display().to_string()));
        }
        Ok(input)
    }

    fn prepare_job(
        &self,
        txn: &mut WorkspaceTransaction,
        sub: &SubSheet,
        capabilities: Capabilities,
        single_file: bool,
    ) -> Result<SheetJob> {
        let sheet_path = txn.create_scratch(".cue", &sub.content)?;
        let sheet = CueSheetParser::parse_file(&sheet_path)?;

        let audio = match capabilities.sheet {
            SheetAcquisition::Discover => InputDiscovery::resolve_audio(
                &self.dir,
                sheet.referenced_file.as_deref(),
                capabilities.container,
                single_file,
            )?,
            SheetAcquisition::Generate => self.alternate_input()?.to_path_buf(),
        };

        let start_index = sheet.first_track_number().ok_or_else(|| {
            CueTagError::NoTracks(audio.display().to_string())
        })?;

        info!(
            "Sheet {}: {} tracks from {}",
            sub.index,
            sheet.tracks.len(),
            audio.display()
        );

        Ok(SheetJob {
            index: sub.index,
            sheet,
            sheet_path,
            audio,
            start_index,
        })
    }

    fn run_job(
        &self,
        txn: &WorkspaceTransaction,
        job: &SheetJob,
        capabilities: Capabilities,
    ) -> Result<Vec<PathBuf>> {
        if self.options.convert {
            TranscodeStep::new(self.tools.transcoder).run(&job.audio)?;
        }

        let expected = ExtractionEngine::new(self.tools.splitter).extract(
            &ExtractionJob {
                sheet_path: &job.sheet_path,
                audio: &job.audio,
                start_index: job.start_index,
                container: capabilities.container,
            },
            txn.dir(),
        )?;

        let raw = TaggingPipeline::find_raw_tracks(txn, capabilities.container)?;
        if raw.len() < expected {
            return Err(CueTagError::IncompleteSplit {
                audio: job.audio.display().to_string(),
                expected,
                found: raw.len(),
            });
        }
        let outputs = TaggingPipeline::new(
            self.tools.transcoder,
            self.tools.tagger,
            &self.options.bitrate,
        )
        .process(&job.sheet, &raw, capabilities.container)?;

        info!("Sheet {}: tagged {} files", job.index, outputs.len());
        Ok(outputs)
    }
}
