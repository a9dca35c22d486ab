//! Low-level byte stream parser for reflection record decoding.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor-based binary data
//! parser used for reading descriptor headers, scanning mangled names and decoding the textual
//! metadata source encoding of closure captures. All access is bounds-checked.
//!
//! # Key Components
//!
//! ## Navigation Methods
//! - [`crate::file::parser::Parser::seek`] - Move to specific position
//! - [`crate::file::parser::Parser::advance`] - Move forward by one byte
//! - [`crate::file::parser::Parser::advance_by`] - Move forward by specified bytes
//! - [`crate::file::parser::Parser::pos`] - Get current position
//!
//! ## Data Access Methods
//! - [`crate::file::parser::Parser::read_le`] - Read primitive types (little-endian)
//! - [`crate::file::parser::Parser::peek_byte`] - Peek at current byte without advancing
//! - [`crate::file::parser::Parser::read_decimal`] - Read an unsigned decimal number
//! - [`crate::file::parser::Parser::read_cstr`] - Read a NUL terminated byte string
//!
//! # Usage Examples
//!
//! ```rust
//! use reflscope::Parser;
//!
//! // Field record: flags, mangled type name offset, field name offset
//! let data = [0x02, 0x00, 0x00, 0x00, 0xF8, 0xFF, 0xFF, 0xFF, 0x10, 0x00, 0x00, 0x00];
//! let mut parser = Parser::new(&data);
//!
//! let flags = parser.read_le::<u32>()?;
//! let type_name = parser.read_le::<i32>()?;
//! assert_eq!((flags, type_name), (2, -8));
//!
//! parser.seek(8)?;
//! assert_eq!(parser.read_le::<i32>()?, 0x10);
//! # Ok::<(), reflscope::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, RecordIO},
    Result,
};

/// A cursor over a byte slice.
///
/// The parser maintains an internal position and refuses every read that would run past the
/// end of its data, so truncated or corrupted records surface as
/// [`crate::Error::OutOfBounds`].
///
/// # Examples
///
/// ```rust
/// use reflscope::Parser;
///
/// let mut parser = Parser::new(b"G0S_");
/// assert_eq!(parser.read_le::<u8>()?, b'G');
/// assert_eq!(parser.read_decimal()?, 0);
/// assert_eq!(parser.peek_byte()?, b'S');
/// # Ok::<(), reflscope::Error>(())
/// ```
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new Parser from a byte slice
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the data
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if there is more data to parse
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move to a specific position
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by one byte
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing would exceed the data length.
    pub fn advance(&mut self) -> Result<()> {
        self.advance_by(1)
    }

    /// Move the position forward by the specified amount of bytes
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(end) if end <= self.data.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(out_of_bounds_error!()),
        }
    }

    /// Get the current position
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Get access to the full underlying data
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Get the bytes that have not been consumed yet
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    /// Peek at the next byte without advancing the position
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is at or beyond the data length.
    pub fn peek_byte(&self) -> Result<u8> {
        if self.position >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(self.data[self.position])
    }

    /// Read a type `T` from the current position in little-endian and advance
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading `T` would exceed the data length.
    pub fn read_le<T: RecordIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read an unsigned decimal number made of ASCII digits.
    ///
    /// At least one digit must be present. Reading stops at the first non-digit byte, which is
    /// not consumed.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no digit is present or the number overflows a
    /// `u32`, and [`crate::Error::OutOfBounds`] at the end of data.
    pub fn read_decimal(&mut self) -> Result<u32> {
        if !self.peek_byte()?.is_ascii_digit() {
            return Err(malformed_error!(
                "Expected decimal digit at offset {}",
                self.position
            ));
        }

        let mut value: u32 = 0;
        while let Ok(byte) = self.peek_byte() {
            if !byte.is_ascii_digit() {
                break;
            }

            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u32::from(byte - b'0')))
                .ok_or_else(|| malformed_error!("Decimal number overflows at {}", self.position))?;
            self.position += 1;
        }

        Ok(value)
    }

    /// Read bytes up to (not including) the next NUL, consuming the terminator.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if no terminator exists before the end of data.
    pub fn read_cstr(&mut self) -> Result<&'a [u8]> {
        let rest = self.remaining();
        let Some(length) = rest.iter().position(|&b| b == 0) else {
            return Err(out_of_bounds_error!());
        };

        self.position += length + 1;
        Ok(&rest[..length])
    }
}
