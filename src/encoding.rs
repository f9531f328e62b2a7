use std::fs;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, WINDOWS_1251};
use tracing::{debug, warn};

use crate::error::{CueTagError, Result};

/// How to decode a sheet that is not valid UTF-8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetEncoding {
    /// Guess with chardetng
    Detect,
    Fixed(&'static Encoding),
}

impl Default for SheetEncoding {
    fn default() -> Self {
        SheetEncoding::Fixed(WINDOWS_1251)
    }
}

impl SheetEncoding {
    /// Accepts `auto` or any WHATWG encoding label (`windows-1251`, `cp1251`, `latin1`...)
    pub fn from_label(label: &str) -> Result<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("auto") {
            return Ok(SheetEncoding::Detect);
        }
        Encoding::for_label(label.as_bytes())
            .map(SheetEncoding::Fixed)
            .ok_or_else(|| CueTagError::UnknownEncoding(label.to_string()))
    }
}

/// Converts raw sheet bytes into UTF-8 text before parsing
pub struct EncodingBridge;

impl EncodingBridge {
    pub fn normalize_file(path: &Path, encoding: SheetEncoding) -> Result<String> {
        let bytes = fs::read(path)?;
        Ok(Self::normalize(&bytes, encoding, &path.display().to_string()))
    }

    /// Valid UTF-8 passes through untouched (minus a BOM), anything else is
    /// decoded with the configured or detected encoding.
    pub fn normalize(bytes: &[u8], encoding: SheetEncoding, name: &str) -> String {
        if let Ok(text) = std::str::from_utf8(bytes) {
            debug!("{} is already UTF-8", name);
            return text.strip_prefix('\u{feff}').unwrap_or(text).to_string();
        }

        let encoding = match encoding {
            SheetEncoding::Fixed(encoding) => encoding,
            SheetEncoding::Detect => {
                let mut detector = EncodingDetector::new();
                detector.feed(bytes, true);
                detector.guess(None, true)
            }
        };

        let (decoded, _, had_errors) = encoding.decode(bytes);

        if had_errors {
            warn!(
                "Decoding errors occurred while reading {} with encoding {}",
                name,
                encoding.name()
            );
        } else {
            debug!("Decoded {} from {}", name, encoding.name());
        }

        decoded.into_owned()
    }
}
