//! Archive abstraction and low-level binary parsing.
//!
//! This module provides access to the binary containers of a Java classpath (`.jar` archives
//! and `.jmod` runtime modules) and the primitives used to decode the class files inside them.
//!
//! # Key Components
//!
//! ## Core Types
//! - [`crate::file::Archive`] - An opened zip container with entry lookup and reading
//! - [`crate::file::Backend`] - Trait for different data sources (disk files, memory buffers)
//!
//! ## Parsing Infrastructure
//! - [`crate::file::parser::Parser`] - Cursor interface used by the class-file reader
//! - [`crate::file::io`] - Big-endian reading helpers
//!
//! ## Backend Implementations
//! - [`crate::file::MappedFile`] - Memory-mapped archive on disk
//! - `Vec<u8>` - Owned in-memory archive
//!
//! # Entry Naming
//!
//! Class names are handled in their dotted form (`org.example.ModuleA`) everywhere in the
//! crate. [`crate::file::class_entry_name`] and [`crate::file::class_name_of_entry`] convert
//! between that form and zip entry paths (`org/example/ModuleA.class`).
//!
//! # Examples
//!
//! ```rust,no_run
//! use jarscope::file::Archive;
//!
//! let mut archive = Archive::open("lib/commons-io-2.11.0.jar")?;
//! println!("{} class entries", archive.class_entries().len());
//!
//! if archive.contains("org/apache/commons/io/FileUtils.class") {
//!     let bytes = archive.read("org/apache/commons/io/FileUtils.class")?;
//!     println!("{} bytes", bytes.len());
//! }
//! # Ok::<(), jarscope::Error>(())
//! ```

pub mod io;
pub mod parser;

mod backend;

pub use backend::{Backend, MappedFile};

use std::{
    io::{Cursor, Read},
    path::{Path, PathBuf},
};

use zip::ZipArchive;

use crate::Result;

/// Adapter that lets the zip reader seek over any [`Backend`].
struct Source(Box<dyn Backend>);

impl AsRef<[u8]> for Source {
    fn as_ref(&self) -> &[u8] {
        self.0.data()
    }
}

/// Suffix of compiled class entries.
pub const CLASS_SUFFIX: &str = ".class";

/// Prefix under which `.jmod` runtime modules store their class entries.
pub const JMOD_CLASSES_PREFIX: &str = "classes/";

/// Converts a dotted class name into its archive entry path.
///
/// ```rust
/// assert_eq!(
///     jarscope::file::class_entry_name("org.example.ModuleA"),
///     "org/example/ModuleA.class"
/// );
/// ```
#[must_use]
pub fn class_entry_name(class_name: &str) -> String {
    format!("{}{CLASS_SUFFIX}", class_name.replace('.', "/"))
}

/// Converts an archive entry path back into a dotted class name.
///
/// Returns `None` for entries that are not class files. The `classes/` prefix of `.jmod`
/// modules is stripped.
#[must_use]
pub fn class_name_of_entry(entry: &str) -> Option<String> {
    let stem = entry.strip_suffix(CLASS_SUFFIX)?;
    let stem = stem.strip_prefix(JMOD_CLASSES_PREFIX).unwrap_or(stem);
    Some(stem.replace('/', "."))
}

/// An opened archive.
///
/// Wraps a [`zip::ZipArchive`] over a memory-mapped file. Reading an entry requires `&mut self`
/// since the zip reader keeps a cursor; callers that share archives across threads open one
/// `Archive` per worker.
pub struct Archive {
    path: PathBuf,
    zip: ZipArchive<Cursor<Source>>,
}

impl Archive {
    /// Opens and memory-maps the archive at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file can not be opened or mapped, and
    /// [`crate::Error::ArchiveError`] if it is not a readable zip container.
    pub fn open(path: impl AsRef<Path>) -> Result<Archive> {
        let path = path.as_ref();
        let mapped = MappedFile::open(path)?;
        Archive::from_backend(path.to_path_buf(), Box::new(mapped))
    }

    /// Reads an archive from an in-memory buffer. `path` is only used as a label.
    ///
    /// # Errors
    /// Returns [`crate::Error::ArchiveError`] if the buffer is not a readable zip container.
    pub fn from_mem(path: impl Into<PathBuf>, data: Vec<u8>) -> Result<Archive> {
        Archive::from_backend(path.into(), Box::new(data))
    }

    fn from_backend(path: PathBuf, backend: Box<dyn Backend>) -> Result<Archive> {
        let zip = ZipArchive::new(Cursor::new(Source(backend)))?;
        Ok(Archive { path, zip })
    }

    /// Path the archive was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries, directories included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zip.len()
    }

    /// Returns `true` if the archive has no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zip.len() == 0
    }

    /// Iterates over all entry names in central-directory order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.zip.file_names()
    }

    /// All entries ending in `.class`.
    #[must_use]
    pub fn class_entries(&self) -> Vec<String> {
        self.zip
            .file_names()
            .filter(|name| name.ends_with(CLASS_SUFFIX))
            .map(str::to_string)
            .collect()
    }

    /// Returns `true` if at least one entry is a class file.
    #[must_use]
    pub fn has_class_entries(&self) -> bool {
        self.zip
            .file_names()
            .any(|name| name.ends_with(CLASS_SUFFIX))
    }

    /// Returns `true` if an entry with exactly this name exists.
    #[must_use]
    pub fn contains(&self, entry: &str) -> bool {
        self.zip.index_for_name(entry).is_some()
    }

    /// Returns `true` if any entry lives below the directory `dir` (given with `/` separators).
    ///
    /// Archives are not required to carry explicit directory entries, so this checks entry
    /// prefixes instead of looking for `dir/` itself.
    #[must_use]
    pub fn contains_dir(&self, dir: &str) -> bool {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        self.zip.file_names().any(|name| name.starts_with(&prefix))
    }

    /// First entry name satisfying `predicate`.
    pub fn find_entry<P>(&self, mut predicate: P) -> Option<String>
    where
        P: FnMut(&str) -> bool,
    {
        self.zip
            .file_names()
            .find(|name| predicate(name))
            .map(str::to_string)
    }

    /// Reads the complete content of an entry.
    ///
    /// # Errors
    /// Returns [`crate::Error::ArchiveError`] if the entry does not exist or can not be
    /// decompressed.
    pub fn read(&mut self, entry: &str) -> Result<Vec<u8>> {
        let mut file = self.zip.by_name(entry)?;
        let mut buffer = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

/// Returns `true` for archives that hold the platform runtime (`rt.jar`, `*.jmod`).
#[must_use]
pub fn is_runtime_archive(path: &Path) -> bool {
    let is_rt = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name == "rt.jar");
    let is_jmod = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == "jmod");
    is_rt || is_jmod
}
