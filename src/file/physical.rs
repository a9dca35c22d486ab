//! Memory-mapped image files.
//!
//! [`Physical`] maps an image file read-only into the address space of the process, so that
//! the reflection sections of large binaries can be walked without reading the whole file.

use std::{fs, path::Path};

use memmap2::Mmap;

use super::Backend;
use crate::Result;

/// A memory-mapped image file.
#[derive(Debug)]
pub struct Physical {
    data: Mmap,
}

impl Physical {
    /// Map the file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Io`] if the file cannot be opened or mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path)?;
        // The mapping stays valid as long as no other process truncates the file.
        let data = unsafe { Mmap::map(&file) }?;

        Ok(Physical { data })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(out_of_bounds_error!());
        };

        self.data.get(offset..offset_end).ok_or(out_of_bounds_error!())
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn missing_file() {
        let result = Physical::new("/nonexistent/path/to/libSample.so");
        match result {
            Err(Error::Io(error)) => assert_eq!(error.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }

    #[test]
    fn mapped_contents() {
        let path = std::env::temp_dir().join("reflscope_physical_mapped_contents.bin");
        std::fs::write(&path, [0x7F, b'E', b'L', b'F', 0x02, 0x01]).unwrap();

        let physical = Physical::new(&path).unwrap();
        assert_eq!(physical.len(), 6);
        assert_eq!(physical.data_slice(1, 3).unwrap(), b"ELF");
        assert!(physical.data_slice(4, 3).is_err());

        std::fs::remove_file(&path).unwrap();
    }
}
