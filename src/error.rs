//! Contains detailed error representation.
//!
//! See the main [`Error`] which contains a variant for each failure class of
//! the pipeline. Structured detail lives in the respective kind enums, which
//! work similar to `std::io::Error::kind`.

use core::fmt;
use std::io;

use snafu::prelude::*;

/// The generic error type for crop pipeline operations.
///
/// This high level enum allows, by variant matching, a rough separation of
/// concerns between unrecognized input, structurally broken input, the
/// caller, and the encoding sink.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    /// The input does not carry a GIF signature and cannot be decoded here.
    ///
    /// Callers are expected to fall back to treating the source as an opaque
    /// image rather than retrying.
    #[snafu(display("stream signature {found:02x?} is not \"GIF\""))]
    UnsupportedFormat {
        /// The first three bytes of the input.
        found: [u8; 3],
    },

    /// The input is recognizably a GIF but structurally invalid.
    #[snafu(display("malformed GIF stream: {kind}"))]
    MalformedStream { kind: MalformedKind },

    /// The input ended before a required field could be read.
    #[snafu(display("GIF stream truncated at byte offset {offset}"))]
    TruncatedStream { offset: usize },

    /// The re-encoding sink could not produce output.
    #[snafu(context(false))]
    #[snafu(display("animation re-encoding failed"))]
    EncodeFailed { source: gif::EncodingError },

    /// An error was encountered in input arguments.
    #[snafu(display("bad parameter: {kind}"))]
    Parameter { kind: ParameterErrorKind },

    /// An error occurred while interacting with the environment.
    #[snafu(context(false))]
    #[snafu(display("i/o error"))]
    Io { source: io::Error },
}

/// Details how a GIF stream violates the format.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum MalformedKind {
    /// An LZW code referenced a dictionary slot that is not populated yet.
    InvalidLzwCode { code: u16, limit: u16 },
    /// The LZW minimum code size byte is outside the representable range.
    BadMinimumCodeSize { size: u8 },
    /// A pixel index does not fit the frame's color table.
    IndexOutOfRange { index: u8, table_len: usize },
    /// An image block arrived with neither a local nor a global color table.
    MissingColorTable,
    /// The logical screen declares a zero width or height.
    ZeroDimensions,
    /// A top-level block introducer is not a known block type.
    UnknownBlock { introducer: u8 },
    /// A base64 data URL payload could not be decoded.
    DataUrl,
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MalformedKind::InvalidLzwCode { code, limit } => {
                write!(f, "LZW code {code} references unpopulated slot (next free: {limit})")
            }
            MalformedKind::BadMinimumCodeSize { size } => {
                write!(f, "LZW minimum code size {size} is outside 2..=11")
            }
            MalformedKind::IndexOutOfRange { index, table_len } => {
                write!(f, "pixel index {index} outside color table of {table_len} entries")
            }
            MalformedKind::MissingColorTable => {
                write!(f, "frame has no local color table and no global one exists")
            }
            MalformedKind::ZeroDimensions => {
                write!(f, "logical screen has zero width or height")
            }
            MalformedKind::UnknownBlock { introducer } => {
                write!(f, "unknown block introducer 0x{introducer:02x}")
            }
            MalformedKind::DataUrl => write!(f, "invalid base64 data URL payload"),
        }
    }
}

/// Details how a parameter is malformed.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParameterErrorKind {
    /// The dimensions passed cannot be represented by the target format.
    DimensionMismatch,
    /// The animation contains no frames to work with.
    NoFrames,
}

impl fmt::Display for ParameterErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ParameterErrorKind::DimensionMismatch => write!(f, "dimensions out of range"),
            ParameterErrorKind::NoFrames => write!(f, "animation contains no frames"),
        }
    }
}

impl Error {
    pub(crate) fn malformed(kind: MalformedKind) -> Error {
        MalformedStreamSnafu { kind }.build()
    }

    pub(crate) fn truncated(offset: usize) -> Error {
        TruncatedStreamSnafu { offset }.build()
    }

    pub(crate) fn parameter(kind: ParameterErrorKind) -> Error {
        ParameterSnafu { kind }.build()
    }
}

/// Result of a crop pipeline operation.
pub type CropResult<T> = Result<T, Error>;
