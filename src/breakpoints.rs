//! Typed split points.
//!
//! `cuebreakpoints` prints one timestamp per line, either `m:ss.ff` (CD
//! frames, 75 per second) or `m:ss.nnn` (milliseconds). They are parsed here
//! and handed to the splitter as values instead of being piped through a
//! text filter.

use std::fmt;

use nom::{
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res},
    sequence::{preceded, separated_pair, tuple},
    IResult,
};

use crate::error::{CueTagError, Result};

const FRAMES_PER_SECOND: u64 = 75;

/// Offset from the start of the audio file at which a new track begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breakpoint {
    CdFrames(u64),
    Millis(u64),
}

impl Breakpoint {
    pub fn as_millis(&self) -> u64 {
        match *self {
            Breakpoint::CdFrames(frames) => frames * 1000 / FRAMES_PER_SECOND,
            Breakpoint::Millis(ms) => ms,
        }
    }

    /// Parse a single `m:ss.ff` or `m:ss.nnn` timestamp
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let (_, ((minutes, seconds), fraction)) = Self::timestamp(input)
            .map_err(|_| CueTagError::InvalidBreakpoint(input.to_string()))?;

        if seconds >= 60 {
            return Err(CueTagError::InvalidBreakpoint(input.to_string()));
        }
        let whole_seconds = minutes * 60 + seconds;

        match fraction.len() {
            2 => {
                let frames: u64 = fraction
                    .parse()
                    .map_err(|_| CueTagError::InvalidBreakpoint(input.to_string()))?;
                if frames >= FRAMES_PER_SECOND {
                    return Err(CueTagError::InvalidBreakpoint(input.to_string()));
                }
                Ok(Breakpoint::CdFrames(whole_seconds * FRAMES_PER_SECOND + frames))
            }
            3 => {
                let ms: u64 = fraction
                    .parse()
                    .map_err(|_| CueTagError::InvalidBreakpoint(input.to_string()))?;
                Ok(Breakpoint::Millis(whole_seconds * 1000 + ms))
            }
            _ => Err(CueTagError::InvalidBreakpoint(input.to_string())),
        }
    }

    fn timestamp(input: &str) -> IResult<&str, ((u64, u64), &str)> {
        all_consuming(tuple((
            separated_pair(
                map_res(digit1, |s: &str| s.parse::<u64>()),
                char(':'),
                map_res(digit1, |s: &str| s.parse::<u64>()),
            ),
            preceded(char('.'), digit1),
        )))(input)
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Breakpoint::CdFrames(total) => {
                let seconds = total / FRAMES_PER_SECOND;
                write!(
                    f,
                    "{}:{:02}.{:02}",
                    seconds / 60,
                    seconds % 60,
                    total % FRAMES_PER_SECOND
                )
            }
            Breakpoint::Millis(total) => {
                let seconds = total / 1000;
                write!(f, "{}:{:02}.{:03}", seconds / 60, seconds % 60, total % 1000)
            }
        }
    }
}

/// Parse the full output of `cuebreakpoints`, one timestamp per line
pub fn parse_breakpoints(output: &str) -> Result<Vec<Breakpoint>> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Breakpoint::parse)
        .collect()
}
