//! Big-endian reading utilities for class-file parsing.
//!
//! Every multi-byte quantity in a JVM class file is stored big-endian. This module provides the
//! [`crate::file::io::ClassIO`] trait and bounds-checked helpers that the
//! [`crate::file::parser::Parser`] and the bytecode decoder build on.
//!
//! # Supported Types
//! - **Unsigned integers**: `u8`, `u16`, `u32`, `u64`
//! - **Signed integers**: `i8`, `i16`, `i32`, `i64`
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use jarscope::file::io::read_be_at;
//!
//! let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34];
//! let mut offset = 0;
//!
//! let magic: u32 = read_be_at(&data, &mut offset)?;  // offset: 0 -> 4
//! let major: u16 = read_be_at(&data, &mut offset)?;  // offset: 4 -> 6
//!
//! assert_eq!(magic, 0xCAFE_BABE);
//! assert_eq!(major, 52);
//! # Ok::<(), jarscope::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Trait for types that can be decoded from big-endian class-file bytes.
///
/// All implementations only work with primitive types and perform pure conversions, so they are
/// thread-safe.
pub trait ClassIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_class_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl ClassIO for $ty {
                type Bytes = [u8; $len];

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }
            }
        )*
    };
}

impl_class_io! {
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
}

/// Safely reads a value of type `T` in big-endian byte order from the start of a buffer.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is shorter than `T`.
pub fn read_be<T: ClassIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_be_at(data, &mut offset)
}

/// Safely reads a value of type `T` in big-endian byte order at `offset`, advancing it.
///
/// # Arguments
///
/// * `data` - The byte buffer to read from
/// * `offset` - Mutable reference to the offset position (will be advanced after reading)
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if reading would exceed the buffer length.
pub fn read_be_at<T: ClassIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_be_bytes(read))
}
