//! Bounded, typed views over reflection sections and their forward iterators.
//!
//! A [`ReflectionSection`] covers `size` bytes starting at a [`RemoteRef`] and interprets them
//! as back-to-back records of one kind. Iteration reads each record's header, derives the full
//! record length from it, and checks that the record fits into what remains of the section.
//! A record that does not fit yields [`crate::Error::SectionTooSmall`] and ends the iteration.

use std::marker::PhantomData;

use crate::{reflection::SectionKind, remote::RemoteRef, Error, Result};

/// Trait for descriptor records stored back-to-back in a reflection section.
///
/// ## Implementation Requirements
///
/// `parse` reads only the fixed header of [`SectionRecord::HEADER_SIZE`] bytes. The full
/// length, returned by [`SectionRecord::record_size`], is computed from the header and
/// includes the header itself.
pub trait SectionRecord<'a>: Sized {
    /// The section kind this record lives in
    const KIND: SectionKind;

    /// Size in bytes of the fixed record header
    const HEADER_SIZE: usize;

    /// Parse the record header located at `start`.
    ///
    /// ## Errors
    ///
    /// Returns an error if the header cannot be read.
    fn parse(start: RemoteRef<'a>) -> Result<Self>;

    /// Total length of the record in bytes, header included.
    ///
    /// Saturates at `u64::MAX` so that corrupted counts are caught by the bounds check of the
    /// iterator instead of wrapping around.
    fn record_size(&self) -> u64;
}

/// A typed, bounded view over a section of records of kind `K`.
#[derive(Clone, Copy, Debug)]
pub struct ReflectionSection<'a, K> {
    start: RemoteRef<'a>,
    size: u64,
    _kind: PhantomData<K>,
}

/// Section of [`crate::reflection::FieldDescriptor`] records
pub type FieldSection<'a> = ReflectionSection<'a, super::FieldDescriptor<'a>>;
/// Section of [`crate::reflection::AssociatedTypeDescriptor`] records
pub type AssociatedTypeSection<'a> = ReflectionSection<'a, super::AssociatedTypeDescriptor<'a>>;
/// Section of [`crate::reflection::BuiltinTypeDescriptor`] records
pub type BuiltinTypeSection<'a> = ReflectionSection<'a, super::BuiltinTypeDescriptor<'a>>;
/// Section of [`crate::reflection::CaptureDescriptor`] records
pub type CaptureSection<'a> = ReflectionSection<'a, super::CaptureDescriptor<'a>>;

impl<'a, K: SectionRecord<'a>> ReflectionSection<'a, K> {
    /// Create a section of `size` bytes starting at `start`.
    ///
    /// ## Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `size` local bytes are available
    /// at `start`.
    pub fn new(start: RemoteRef<'a>, size: u64) -> Result<Self> {
        if (start.local().len() as u64) < size {
            return Err(out_of_bounds_error!());
        }

        Ok(ReflectionSection {
            start,
            size,
            _kind: PhantomData,
        })
    }

    /// An empty section, used for images that lack a section of this kind.
    #[must_use]
    pub fn empty(start: RemoteRef<'a>) -> Self {
        ReflectionSection {
            start,
            size: 0,
            _kind: PhantomData,
        }
    }

    /// Returns a fresh iterator over the records of this section.
    #[must_use]
    pub fn iter(&self) -> SectionIter<'a, K> {
        SectionIter {
            current: self.start,
            consumed: 0,
            size: self.size,
            done: self.size == 0,
            _kind: PhantomData,
        }
    }

    /// Reference to the first byte of the section.
    #[must_use]
    pub fn start(&self) -> RemoteRef<'a> {
        self.start
    }

    /// Section length in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns `true` if the section holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Remote address of the first byte.
    #[must_use]
    pub fn start_address(&self) -> u64 {
        self.start.address()
    }

    /// Remote address one past the last byte.
    #[must_use]
    pub fn end_address(&self) -> u64 {
        self.start.address().saturating_add(self.size)
    }
}

impl<'a, K: SectionRecord<'a>> IntoIterator for &ReflectionSection<'a, K> {
    type Item = Result<K>;
    type IntoIter = SectionIter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Forward iterator over the records of a [`ReflectionSection`].
///
/// Yields `Err(Error::SectionTooSmall)` once if a record does not fit and is exhausted after
/// any error.
pub struct SectionIter<'a, K> {
    current: RemoteRef<'a>,
    consumed: u64,
    size: u64,
    done: bool,
    _kind: PhantomData<K>,
}

impl<'a, K: SectionRecord<'a>> SectionIter<'a, K> {
    fn too_small(&mut self, needed: u64) -> Error {
        self.done = true;
        Error::SectionTooSmall {
            kind: K::KIND,
            offset: self.consumed,
            needed,
            remaining: self.size - self.consumed,
        }
    }

    fn step(&mut self) -> Result<K> {
        let remaining = self.size - self.consumed;
        if remaining < K::HEADER_SIZE as u64 {
            return Err(self.too_small(K::HEADER_SIZE as u64));
        }

        let record = K::parse(self.current)?;
        let length = record.record_size();
        if length > remaining {
            return Err(self.too_small(length));
        }

        let Ok(delta) = i64::try_from(length) else {
            return Err(self.too_small(length));
        };
        self.consumed += length;
        if self.consumed < self.size {
            self.current = self.current.at_byte_offset(delta)?;
        }

        Ok(record)
    }
}

impl<'a, K: SectionRecord<'a>> Iterator for SectionIter<'a, K> {
    type Item = Result<K>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.step();
        if result.is_err() || self.consumed >= self.size {
            self.done = true;
        }

        Some(result)
    }
}

impl<'a, K: SectionRecord<'a>> std::iter::FusedIterator for SectionIter<'a, K> {}

/// A section without record structure: the type reference and reflection string pools.
#[derive(Clone, Copy, Debug)]
pub struct GenericSection<'a> {
    start: RemoteRef<'a>,
    size: u64,
}

impl<'a> GenericSection<'a> {
    /// Create a raw section of `size` bytes starting at `start`.
    ///
    /// ## Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `size` local bytes are available.
    pub fn new(start: RemoteRef<'a>, size: u64) -> Result<Self> {
        if (start.local().len() as u64) < size {
            return Err(out_of_bounds_error!());
        }

        Ok(GenericSection { start, size })
    }

    /// The section bytes.
    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        let len = usize::try_from(self.size).unwrap_or(usize::MAX);
        &self.start.local()[..len.min(self.start.local().len())]
    }

    /// Remote address of the first byte.
    #[must_use]
    pub fn start_address(&self) -> u64 {
        self.start.address()
    }

    /// Section length in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns `true` if `local` points into this section.
    #[must_use]
    pub fn contains_local(&self, local: &[u8]) -> bool {
        let start = self.start.local_address();
        let pointer = local.as_ptr() as usize;
        pointer >= start && ((pointer - start) as u64) < self.size
    }

    /// Returns `true` if the remote `address` lies inside this section.
    #[must_use]
    pub fn contains_remote(&self, address: u64) -> bool {
        address >= self.start.address() && address - self.start.address() < self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::{BuiltinTypeDescriptor, CaptureDescriptor};

    fn builtin(size: u32) -> Vec<u8> {
        let mut bytes = vec![0u8; 20];
        bytes[4..8].copy_from_slice(&size.to_le_bytes());
        bytes[8..12].copy_from_slice(&size.to_le_bytes());
        bytes[12..16].copy_from_slice(&size.to_le_bytes());
        bytes
    }

    #[test]
    fn exact_fit_yields_every_record() {
        let mut bytes = builtin(1);
        bytes.extend(builtin(2));
        bytes.extend(builtin(4));

        let section = BuiltinTypeSection::new(RemoteRef::new(0x100, &bytes), 60).unwrap();
        let sizes: Vec<u32> = section.iter().map(|d| d.unwrap().size).collect();
        assert_eq!(sizes, vec![1, 2, 4]);

        // Iteration is repeatable
        assert_eq!(section.iter().count(), 3);
        assert_eq!(section.end_address(), 0x100 + 60);
    }

    #[test]
    fn trailing_partial_header_is_fatal() {
        let mut bytes = builtin(8);
        bytes.extend([0u8; 10]);

        let section = BuiltinTypeSection::new(RemoteRef::new(0, &bytes), 30).unwrap();
        let results: Vec<_> = section.iter().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        match &results[1] {
            Err(Error::SectionTooSmall {
                kind,
                offset,
                needed,
                remaining,
            }) => {
                assert_eq!(*kind, SectionKind::Builtin);
                assert_eq!((*offset, *needed, *remaining), (20, 20, 10));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn declared_length_past_end_is_fatal() {
        // Field descriptor claiming 4 records of 12 bytes with only one present
        let mut bytes = vec![0u8; 28];
        bytes[10..12].copy_from_slice(&12u16.to_le_bytes());
        bytes[12..16].copy_from_slice(&4u32.to_le_bytes());

        let section = FieldSection::new(RemoteRef::new(0, &bytes), 28).unwrap();
        let mut iter = section.iter();
        let first = iter.next().unwrap();
        assert!(matches!(
            first,
            Err(Error::SectionTooSmall { needed: 64, remaining: 28, .. })
        ));
        assert!(first.unwrap_err().is_fatal());
        assert!(iter.next().is_none());
    }

    #[test]
    fn capture_length_sums_both_tables() {
        // 1 capture type and 2 metadata sources: 12 + 4 + 16 bytes
        let mut bytes = vec![0u8; 32];
        bytes[0..4].copy_from_slice(&1u32.to_le_bytes());
        bytes[4..8].copy_from_slice(&2u32.to_le_bytes());

        let section = CaptureSection::new(RemoteRef::new(0, &bytes), 32).unwrap();
        let records: Vec<CaptureDescriptor> =
            section.iter().collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_size(), 32);
    }

    #[test]
    fn empty_and_oversized_sections() {
        let bytes = builtin(1);
        let empty = ReflectionSection::<BuiltinTypeDescriptor>::empty(RemoteRef::new(0, &bytes));
        assert!(empty.is_empty());
        assert_eq!(empty.iter().count(), 0);

        assert!(matches!(
            FieldSection::new(RemoteRef::new(0, &bytes), 21),
            Err(Error::OutOfBounds)
        ));
    }

    #[test]
    fn generic_section_containment() {
        let bytes = [0u8; 32];
        let section = GenericSection::new(RemoteRef::from_bytes(0x8000, &bytes, 8).unwrap(), 16)
            .unwrap();

        assert_eq!(section.bytes().len(), 16);
        assert!(section.contains_local(&bytes[8..]));
        assert!(section.contains_local(&bytes[23..]));
        assert!(!section.contains_local(&bytes[24..]));
        assert!(!section.contains_local(&bytes[..]));
        assert!(section.contains_remote(0x8008));
        assert!(!section.contains_remote(0x8018));
    }
}
