//! Cursor-based byte stream parser for class-file decoding.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a bounds-checked cursor over a
//! byte slice. The class-file reader and the constant pool decoder use it to walk the
//! big-endian structures of a `.class` entry.
//!
//! # Usage Examples
//!
//! ```rust
//! use jarscope::Parser;
//!
//! let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_be::<u32>()?, 0xCAFE_BABE);
//! parser.advance_by(2)?;
//! assert_eq!(parser.read_be::<u16>()?, 52);
//! assert!(!parser.has_more_data());
//! # Ok::<(), jarscope::Error>(())
//! ```

use crate::{
    file::io::{read_be_at, ClassIO},
    Error::OutOfBounds,
    Result,
};

/// A generic binary data parser for reading class-file structures.
///
/// The parser maintains an internal position cursor and provides bounds checking to prevent
/// buffer overruns when reading malformed or truncated class files.
///
/// # Examples
///
/// ```rust
/// use jarscope::Parser;
///
/// let data = [0x00, 0x03, 0x41, 0x42, 0x43];
/// let mut parser = Parser::new(&data);
///
/// let len = parser.read_be::<u16>()?;
/// assert_eq!(parser.read_bytes(len as usize)?, b"ABC");
/// # Ok::<(), jarscope::Error>(())
/// ```
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of bytes between the cursor and the end of the buffer.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Move the current position to the specified index.
    ///
    /// Seeking to exactly the end of the buffer is allowed, reads from there fail.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(OutOfBounds);
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Arguments
    /// * `step` - Amount of bytes to advance
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(end) if end <= self.data.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(OutOfBounds),
        }
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Get access to the underlying data buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Read a value of type `T` in big-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading `T` would exceed the data length.
    pub fn read_be<T: ClassIO>(&mut self) -> Result<T> {
        read_be_at::<T>(self.data, &mut self.position)
    }

    /// Borrow the next `len` bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let start = self.position;
        self.advance_by(len)?;
        Ok(&self.data[start..self.position])
    }
}
