use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::info;

use cuetag::config::{parse_bool_flag, Config};
use cuetag::source::SourceKind;
use cuetag::tools::{FfmpegTranscoder, FfprobeSheetReader, Id3TagWriter, ShntoolSplitter};
use cuetag::{CueTagError, Pipeline, RunOptions, Toolchain};

/// Split a CUE sheet + disc image into individually tagged MP3 tracks
#[derive(Parser, Debug)]
#[command(name = "cuetag")]
#[command(about = "Split a CUE/audio disc image into tagged MP3 tracks")]
#[command(version)]
struct Args {
    /// Round-trip the source audio through WAV before splitting
    #[arg(long, value_name = "BOOL", value_parser = parse_bool_flag, default_value = "false")]
    conv: bool,

    /// Source format: flac (default, directory scan), ape or wv (single file with embedded cue)
    #[arg(long)]
    format: Option<String>,

    /// Audio file for --format ape|wv
    #[arg(long)]
    input: Option<PathBuf>,

    /// Working directory holding the disc image
    #[arg(short = 'C', long, default_value = ".")]
    dir: PathBuf,

    /// MP3 bitrate, overrides CUETAG_BITRATE
    #[arg(long, env = "CUETAG_BITRATE")]
    bitrate: Option<String>,
}

fn main() {
    // Use RUST_LOG env var if set, otherwise default to info level
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        println!("{}", e);
        process::exit(e.exit_code());
    }
}

fn run(args: Args) -> Result<(), CueTagError> {
    let mut config = Config::load()?;
    if let Some(bitrate) = args.bitrate {
        config.bitrate = bitrate;
    }

    let source = SourceKind::from_format(args.format.as_deref())?;
    info!("Source: {:?}, round trip: {}", source, args.conv);

    let splitter = ShntoolSplitter::new(&config.tools.cuebreakpoints, &config.tools.shnsplit);
    let transcoder = FfmpegTranscoder::new(&config.tools.ffmpeg);
    let sheet_reader = FfprobeSheetReader::new(&config.tools.ffprobe);
    let tools = Toolchain {
        splitter: &splitter,
        transcoder: &transcoder,
        tagger: &Id3TagWriter,
        sheet_reader: &sheet_reader,
    };

    let options = RunOptions::from_config(&config, source, args.conv, args.input);
    Pipeline::new(args.dir, options, tools).run()?;
    Ok(())
}
