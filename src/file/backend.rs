//! Byte sources an [`super::Archive`] can read from.

use std::{fs, path::Path};

use memmap2::Mmap;

use crate::Result;

/// Source of archive bytes.
///
/// Archives are opened from disk through a memory map, and from owned buffers in tests and for
/// nested archives. Implementations are shared across scan workers and must be thread-safe.
pub trait Backend: Send + Sync {
    /// The complete archive.
    fn data(&self) -> &[u8];

    /// Size of the archive in bytes.
    fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` for a zero-length source.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A read-only memory map of an archive file.
#[derive(Debug)]
pub struct MappedFile(Mmap);

impl MappedFile {
    /// Map the file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file can not be opened or mapped.
    pub fn open(path: &Path) -> Result<MappedFile> {
        let file = fs::File::open(path)?;
        // The classpath is treated as immutable while a session runs.
        let map = unsafe { Mmap::map(&file) }?;
        Ok(MappedFile(map))
    }
}

impl Backend for MappedFile {
    fn data(&self) -> &[u8] {
        &self.0
    }
}

impl Backend for Vec<u8> {
    fn data(&self) -> &[u8] {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn mapped_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"PK\x03\x04").unwrap();
        file.flush().unwrap();

        let mapped = MappedFile::open(file.path()).unwrap();
        assert_eq!(mapped.len(), 4);
        assert_eq!(&mapped.data()[..2], b"PK");
        assert!(!mapped.is_empty());
    }

    #[test]
    fn mapped_file_missing() {
        assert!(matches!(
            MappedFile::open(Path::new("/definitely/not/here.jar")),
            Err(crate::Error::FileError(_))
        ));
    }

    #[test]
    fn owned_buffer() {
        let buffer: Vec<u8> = Vec::new();
        assert!(Backend::is_empty(&buffer));
    }
}
