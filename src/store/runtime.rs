//! The platform runtime image: `rt.jar` or the `.jmod` modules of a JDK.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock},
};

use crate::{
    file::{class_entry_name, Archive, JMOD_CLASSES_PREFIX},
    Result,
};

/// One runtime archive with a pool of open handles.
///
/// A handle is checked out for the duration of one read, so concurrent lookups each work on
/// their own handle. The pool grows to the number of readers seen at once.
struct RuntimeArchive {
    path: PathBuf,
    idle: Mutex<Vec<Archive>>,
}

impl RuntimeArchive {
    fn entry_name(&self, class_name: &str) -> String {
        let entry = class_entry_name(class_name);
        let is_jmod = self
            .path
            .extension()
            .is_some_and(|extension| extension == "jmod");
        if is_jmod {
            format!("{JMOD_CLASSES_PREFIX}{entry}")
        } else {
            entry
        }
    }

    fn with_archive<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Archive) -> Result<T>,
    {
        let pooled = lock!(self.idle).pop();
        let mut archive = match pooled {
            Some(archive) => archive,
            None => Archive::open(&self.path)?,
        };
        let result = f(&mut archive);
        lock!(self.idle).push(archive);
        result
    }
}

/// The set of archives holding the platform runtime classes.
///
/// Archives are registered either up front from the configuration or when the dependency
/// resolver comes across an `rt.jar` on the classpath. Lookups go through the archives in
/// registration order and the first one holding the class entry wins.
#[derive(Default)]
pub struct RuntimeImage {
    archives: RwLock<Vec<Arc<RuntimeArchive>>>,
}

impl RuntimeImage {
    /// Create an image from the given archives.
    pub fn new<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let image = RuntimeImage::default();
        for path in paths {
            image.register(&path);
        }
        image
    }

    /// Add an archive. Returns `false` if it was already registered.
    pub fn register(&self, path: &Path) -> bool {
        let mut archives = write_lock!(self.archives);
        if archives.iter().any(|archive| archive.path == path) {
            return false;
        }
        archives.push(Arc::new(RuntimeArchive {
            path: path.to_path_buf(),
            idle: Mutex::new(Vec::new()),
        }));
        true
    }

    /// Returns `true` if `path` is one of the runtime archives.
    pub fn contains(&self, path: &Path) -> bool {
        read_lock!(self.archives)
            .iter()
            .any(|archive| archive.path == path)
    }

    /// Paths of all runtime archives.
    pub fn paths(&self) -> Vec<PathBuf> {
        read_lock!(self.archives)
            .iter()
            .map(|archive| archive.path.clone())
            .collect()
    }

    /// Returns `true` if no runtime archive is known.
    pub fn is_empty(&self) -> bool {
        read_lock!(self.archives).is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<RuntimeArchive>> {
        read_lock!(self.archives).clone()
    }

    /// The runtime archive holding a literal entry for `class_name`.
    pub fn locate(&self, class_name: &str) -> Option<PathBuf> {
        self.snapshot().into_iter().find_map(|archive| {
            let entry = archive.entry_name(class_name);
            match archive.with_archive(|zip| Ok(zip.contains(&entry))) {
                Ok(true) => Some(archive.path.clone()),
                Ok(false) => None,
                Err(error) => {
                    log::warn!(
                        "Failed to open runtime archive {}: {error}",
                        archive.path.display()
                    );
                    None
                }
            }
        })
    }

    /// Read the class file bytes of `class_name` together with the archive they came from.
    ///
    /// # Errors
    /// Returns the error of the first archive that holds the entry but fails to read it.
    pub fn read_class(&self, class_name: &str) -> Result<Option<(PathBuf, Vec<u8>)>> {
        for archive in self.snapshot() {
            let entry = archive.entry_name(class_name);
            let bytes = archive.with_archive(|zip| {
                if zip.contains(&entry) {
                    zip.read(&entry).map(Some)
                } else {
                    Ok(None)
                }
            });

            match bytes {
                Ok(Some(bytes)) => return Ok(Some((archive.path.clone(), bytes))),
                Ok(None) => {}
                Err(crate::Error::FileError(error)) => {
                    log::warn!(
                        "Failed to open runtime archive {}: {error}",
                        archive.path.display()
                    );
                }
                Err(error) => return Err(error),
            }
        }
        Ok(None)
    }

    /// Forget all archives.
    pub fn clear(&self) {
        write_lock!(self.archives).clear();
    }
}
