use std::path::PathBuf;

use tracing::{debug, info};

use crate::encoding::SheetEncoding;
use crate::error::Result;

const DEFAULT_BITRATE: &str = "320k";

/// Application configuration.
/// Loads a .env file when one is present, then reads the environment.
#[derive(Clone, Debug)]
pub struct Config {
    /// Bitrate handed to the MP3 encoder
    pub bitrate: String,
    /// How legacy (non UTF-8) sheets are decoded
    pub sheet_encoding: SheetEncoding,
    pub tools: ToolPaths,
}

/// External executables, bare names are looked up on PATH
#[derive(Clone, Debug)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub cuebreakpoints: PathBuf,
    pub shnsplit: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        if dotenvy::dotenv().is_ok() {
            info!("Config: loaded .env file");
        } else {
            debug!("Config: no .env file found");
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from a variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bitrate = lookup("CUETAG_BITRATE").unwrap_or_else(|| DEFAULT_BITRATE.to_string());

        let sheet_encoding = match lookup("CUETAG_SHEET_ENCODING") {
            Some(label) => SheetEncoding::from_label(&label)?,
            None => SheetEncoding::default(),
        };

        let tool = |key: &str, default: &str| {
            lookup(key)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };
        let tools = ToolPaths {
            ffmpeg: tool("CUETAG_FFMPEG", "ffmpeg"),
            ffprobe: tool("CUETAG_FFPROBE", "ffprobe"),
            cuebreakpoints: tool("CUETAG_CUEBREAKPOINTS", "cuebreakpoints"),
            shnsplit: tool("CUETAG_SHNSPLIT", "shnsplit"),
        };

        debug!(
            "Config: bitrate {}, sheet encoding {:?}",
            bitrate, sheet_encoding
        );

        Ok(Self {
            bitrate,
            sheet_encoding,
            tools,
        })
    }
}

/// Parse a bool-like command line value
pub fn parse_bool_flag(value: &str) -> std::result::Result<bool, String> {
    match value.to_lowercase().as_str() {
        "yes" | "true" | "t" | "y" | "1" => Ok(true),
        "no" | "false" | "f" | "n" | "0" => Ok(false),
        _ => Err(format!("Boolean value expected, got '{}'", value)),
    }
}
