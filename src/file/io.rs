//! Low-level byte order and safe reading utilities for reflection record parsing.
//!
//! This module provides endian-aware, bounds-checked reading of primitive values from byte
//! buffers. Every header and entry of a reflection record is read through these functions, so
//! a truncated buffer surfaces as [`crate::Error::OutOfBounds`] instead of a panic.
//!
//! # Key Components
//!
//! - [`crate::file::io::RecordIO`] - Trait describing how a primitive is decoded from bytes
//! - [`crate::file::io::read_le`] - Read a value from the start of a buffer
//! - [`crate::file::io::read_le_at`] - Read a value at an offset and advance the offset
//!
//! Reflection metadata is emitted in the byte order of the target. All targets this crate
//! supports are little-endian, so only little-endian helpers exist.
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use reflscope::file::io::read_le_at;
//!
//! // A builtin type descriptor header: name offset, size, alignment, stride, extra inhabitants
//! let data = [0x10, 0, 0, 0, 8, 0, 0, 0, 8, 0, 1, 0, 8, 0, 0, 0, 0, 0, 0, 0];
//! let mut offset = 0;
//!
//! let name: i32 = read_le_at(&data, &mut offset)?;
//! let size: u32 = read_le_at(&data, &mut offset)?;
//! assert_eq!((name, size, offset), (0x10, 8, 8));
//! # Ok::<(), reflscope::Error>(())
//! ```

use crate::Result;

/// Trait for implementing type-specific safe binary data reading operations.
///
/// Each implementation defines a `Bytes` associated type that represents the fixed-size byte
/// array required for that particular type (e.g., `[u8; 4]` for `u32`).
pub trait RecordIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_record_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl RecordIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_record_io! {
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
}

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer holds fewer than `size_of::<T>()` bytes.
pub fn read_le<T: RecordIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`, advancing the
/// offset past the value on success.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if reading would exceed the buffer, including when
/// `offset` itself overflows.
pub fn read_le_at<T: RecordIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(out_of_bounds_error!());
    };

    *offset = end;
    Ok(T::from_le_bytes(read))
}
