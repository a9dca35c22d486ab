use super::Backend;
use crate::Result;

/// Image backed by an owned buffer
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Take ownership of an image buffer
    ///
    /// ## Arguments
    /// * 'data' - The image bytes
    pub fn new(data: Vec<u8>) -> Memory {
        Memory { data }
    }
}

impl Backend for Memory {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(out_of_bounds_error!());
        };

        self.data.get(offset..offset_end).ok_or(out_of_bounds_error!())
    }

    fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
