use thiserror::Error;

use crate::reflection::SectionKind;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Lookups that simply find nothing (a type without field metadata, an unresolvable symbolic
/// reference, an opaque type without a registered reader) are **not** errors; they return
/// `Ok(None)`. Errors are reserved for input that cannot be parsed.
///
/// # Error Categories
///
/// ## Fatal format errors
/// - [`Error::SectionTooSmall`] - A record claims more bytes than its section holds. The image
///   and this parser disagree on the metadata format version, and no further data from that
///   image should be trusted.
///
/// ## Parsing Errors
/// - [`Error::OutOfBounds`] - Attempted to read beyond a buffer
/// - [`Error::Malformed`] - Corrupted or invalid record contents
/// - [`Error::NotSupported`] - Unsupported container format
/// - [`Error::Empty`] - Empty input provided
///
/// ## I/O and External Errors
/// - [`Error::Io`] - Filesystem or output sink errors
/// - [`Error::GoblinErr`] - ELF/Mach-O parsing errors from the goblin crate
///
/// ## Type Construction Errors
/// - [`Error::RecursionLimit`] - Maximum decode or substitution depth exceeded
///
/// # Examples
///
/// ```rust,no_run
/// use reflscope::{Error, Image};
/// use std::path::Path;
///
/// match Image::from_file(Path::new("libSample.so")) {
///     Ok(image) => println!("Loaded {} bytes", image.len()),
///     Err(Error::NotSupported) => eprintln!("Container format is not supported"),
///     Err(e) if e.is_fatal() => eprintln!("Reflection metadata version mismatch: {e}"),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A record inside a reflection section would extend past the end of the section.
    ///
    /// This is the only fatal error of the crate: it means the producer of the metadata and
    /// this parser disagree on the record format, and continuing would interpret adjacent
    /// memory as records.
    #[error("reflection section too small - {kind} record at offset {offset} needs {needed} bytes, {remaining} remain")]
    SectionTooSmall {
        /// The kind of section being iterated
        kind: SectionKind,
        /// Byte offset of the offending record from the start of its section
        offset: u64,
        /// The number of bytes the record declares (or its fixed header needs)
        needed: u64,
        /// The number of bytes left in the section
        remaining: u64,
    },

    /// The data is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This container format is not supported.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// I/O error, either while opening an image or while writing a dump.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Error from the goblin crate during ELF/Mach-O parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// Recursion limit reached.
    ///
    /// Decoding a demangle tree and substituting generic arguments are both recursive; the
    /// depth is bounded by [`crate::BuilderConfig::max_recursion_depth`].
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),
}

impl Error {
    /// Returns `true` if this error means the image's reflection metadata cannot be trusted
    /// at all and the caller should stop reading it.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::SectionTooSmall { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_too_small_is_fatal() {
        let error = Error::SectionTooSmall {
            kind: SectionKind::Field,
            offset: 16,
            needed: 40,
            remaining: 12,
        };

        assert!(error.is_fatal());
        assert!(error.to_string().contains("needs 40 bytes, 12 remain"));
    }

    #[test]
    fn parse_errors_are_not_fatal() {
        assert!(!Error::OutOfBounds.is_fatal());
        assert!(!malformed_error!("bad stride {}", 3).is_fatal());
        assert!(!Error::RecursionLimit(100).is_fatal());
    }
}
