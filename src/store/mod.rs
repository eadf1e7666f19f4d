//! Parsed class descriptors, cached per archive.
//!
//! The [`ClassStore`] turns archive entries into [`ClassDescriptor`]s. Whole archives are parsed
//! at once and cached as [`ArchiveContents`]; classes of archives too large to cache, and of the
//! platform runtime, are read one at a time and cached individually. Unreadable archives and
//! broken class entries are memoized in the shared [`crate::dependencies::DependencyIndex`] and
//! never retried until [`ClassStore::reset`]. A broken entry is memoized for its archive only, so
//! another archive providing the same class is still consulted.
//!
//! # Key Components
//!
//! - [`ClassStore`] - Loading, lookup and caching of descriptors
//! - [`ExpiringCache`] - The get-or-compute cache behind every store level
//! - [`RuntimeImage`] - Access to the platform runtime classes

mod cache;
mod runtime;

pub use cache::ExpiringCache;
pub use runtime::RuntimeImage;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use dashmap::DashSet;

use crate::{
    classfile::{ClassDescriptor, ClassDescriptorRc},
    config::SearchConfig,
    dependencies::{ClassLocation, DependencyResolver},
    file::{class_entry_name, Archive, JMOD_CLASSES_PREFIX},
    Error, Result,
};

/// All parsed classes of one archive, keyed by dotted class name.
#[derive(Debug, Clone)]
pub struct ArchiveContents {
    path: PathBuf,
    classes: HashMap<String, ClassDescriptorRc>,
}

impl ArchiveContents {
    fn empty(path: &Path) -> Self {
        ArchiveContents {
            path: path.to_path_buf(),
            classes: HashMap::new(),
        }
    }

    /// The archive these classes came from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The class named `class_name`.
    pub fn get(&self, class_name: &str) -> Option<ClassDescriptorRc> {
        self.classes.get(class_name).cloned()
    }

    /// Number of parsed classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no class was parsed.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// All classes, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassDescriptorRc> {
        self.classes.values()
    }
}

/// Loads and caches class descriptors.
///
/// Lookups by name go through the [`DependencyResolver`] to find the owning archive first. The
/// store shares the resolver's failure memos, so an archive that failed to resolve is also never
/// parsed, and the other way round.
pub struct ClassStore {
    config: Arc<SearchConfig>,
    resolver: Arc<DependencyResolver>,
    archives: ExpiringCache<PathBuf, Arc<ArchiveContents>>,
    classes: ExpiringCache<(PathBuf, String), Option<ClassDescriptorRc>>,
    runtime_classes: ExpiringCache<String, Option<ClassDescriptorRc>>,
    oversized: DashSet<PathBuf>,
}

impl ClassStore {
    /// Create an empty store on top of `resolver`.
    pub fn new(config: Arc<SearchConfig>, resolver: Arc<DependencyResolver>) -> Self {
        let policy = config.class_cache;
        ClassStore {
            config,
            resolver,
            archives: ExpiringCache::new(policy),
            classes: ExpiringCache::new(policy),
            runtime_classes: ExpiringCache::new(policy),
            oversized: DashSet::new(),
        }
    }

    /// The resolver used to locate classes.
    pub fn resolver(&self) -> &Arc<DependencyResolver> {
        &self.resolver
    }

    /// Returns `true` if `path` holds more classes than the store caches.
    pub fn is_oversized(&self, path: &Path) -> bool {
        self.oversized.contains(path)
    }

    /// Parse every class of an archive.
    ///
    /// Unreadable archives, archives without class entries, and archives with more broken
    /// entries than tolerated are marked failed and yield empty contents. Oversized archives are
    /// returned in full but not cached.
    pub fn load_archive(&self, path: &Path) -> Arc<ArchiveContents> {
        if self.resolver.index().is_failed_archive(path) {
            return Arc::new(ArchiveContents::empty(path));
        }
        if self.oversized.contains(path) {
            return self.read_archive_logged(path);
        }

        let contents = self
            .archives
            .get_or_init(path.to_path_buf(), || self.read_archive_logged(path));

        if contents.len() > self.config.max_cached_classes_per_archive
            && self.oversized.insert(path.to_path_buf())
        {
            self.archives.remove(&path.to_path_buf());
            log::warn!(
                "Archive {} holds {} classes, not caching it",
                path.display(),
                contents.len()
            );
        }
        contents
    }

    fn read_archive_logged(&self, path: &Path) -> Arc<ArchiveContents> {
        match self.read_archive(path) {
            Ok(contents) => Arc::new(contents),
            Err(error) => {
                log::warn!("Failed to load archive {}: {error}", path.display());
                self.resolver.index().mark_failed_archive(path);
                Arc::new(ArchiveContents::empty(path))
            }
        }
    }

    fn read_archive(&self, path: &Path) -> Result<ArchiveContents> {
        let mut archive = Archive::open(path)?;
        if !archive.has_class_entries() {
            return Err(Error::EmptyArchive(path.to_path_buf()));
        }

        let entries: Vec<String> = archive
            .class_entries()
            .into_iter()
            .filter(|entry| !self.config.is_excluded_entry(entry))
            .collect();

        let mut classes = HashMap::with_capacity(entries.len());
        let mut failures = 0;
        for entry in entries {
            match archive
                .read(&entry)
                .and_then(|bytes| ClassDescriptor::parse(&bytes))
            {
                Ok(class) => {
                    classes.insert(class.name.clone(), Arc::new(class));
                }
                Err(error) => {
                    failures += 1;
                    if self.config.verbose {
                        log::debug!("Failed to parse {entry} in {}: {error}", path.display());
                    }
                    if failures > self.config.max_entry_failures {
                        return Err(Error::TooManyFailures {
                            path: path.to_path_buf(),
                            failures,
                        });
                    }
                }
            }
        }

        Ok(ArchiveContents {
            path: path.to_path_buf(),
            classes,
        })
    }

    /// Resolve a class from the platform runtime image.
    ///
    /// A class the image does not hold stays located in the runtime; only its descriptor is
    /// unavailable, and that absence is cached like a descriptor.
    pub fn get_from_runtime(&self, class_name: &str) -> Option<ClassDescriptorRc> {
        let class = self
            .runtime_classes
            .get_or_init(class_name.to_string(), || {
                match self.resolver.runtime().read_class(class_name) {
                    Ok(Some((path, bytes))) => self.parse_single(&path, class_name, &bytes),
                    Ok(None) => None,
                    Err(error) => {
                        log::warn!("Failed to read runtime class {class_name}: {error}");
                        None
                    }
                }
            });

        if class.is_none() && self.config.verbose {
            log::debug!("Runtime class {class_name} is not available");
        }
        class
    }

    /// Resolve a class by name through its owning archive.
    ///
    /// Returns `None` for unresolvable classes and while no archive has been resolved.
    pub fn get_by_name(&self, class_name: &str) -> Option<ClassDescriptorRc> {
        match self.resolver.locate_class(class_name) {
            Ok(ClassLocation::Archive(path)) => self.get_in_archive(&path, class_name),
            Ok(ClassLocation::Runtime) => self.get_from_runtime(class_name),
            Ok(ClassLocation::NotFound) | Err(_) => None,
        }
    }

    /// Resolve a class from a specific archive.
    pub fn get_in_archive(&self, path: &Path, class_name: &str) -> Option<ClassDescriptorRc> {
        if self.resolver.index().is_failed_archive(path) {
            return None;
        }
        if !self.oversized.contains(path) && !self.resolver.is_runtime_archive(path) {
            let class = self.load_archive(path).get(class_name);
            if class.is_some() || !self.oversized.contains(path) {
                return class;
            }
        }

        let key = (path.to_path_buf(), class_name.to_string());
        self.classes
            .get_or_init(key, || self.read_single(path, class_name))
    }

    fn read_single(&self, path: &Path, class_name: &str) -> Option<ClassDescriptorRc> {
        if self.resolver.index().is_unreadable_class(path, class_name) {
            return None;
        }

        let mut entry = class_entry_name(class_name);
        if path.extension().is_some_and(|extension| extension == "jmod") {
            entry.insert_str(0, JMOD_CLASSES_PREFIX);
        }

        let bytes = Archive::open(path).and_then(|mut archive| archive.read(&entry));
        match bytes {
            Ok(bytes) => self.parse_single(path, class_name, &bytes),
            Err(error) => {
                if self.config.verbose {
                    log::debug!("Can not read {entry} from {}: {error}", path.display());
                }
                self.resolver.index().mark_unreadable_class(path, class_name);
                None
            }
        }
    }

    fn parse_single(&self, path: &Path, class_name: &str, bytes: &[u8]) -> Option<ClassDescriptorRc> {
        match ClassDescriptor::parse(bytes) {
            Ok(class) => Some(Arc::new(class)),
            Err(error) => {
                log::warn!(
                    "Failed to parse {class_name} from {}: {error}",
                    path.display()
                );
                self.resolver.index().mark_unreadable_class(path, class_name);
                None
            }
        }
    }

    /// Classes of an archive whose package is exactly `package`, sorted by name.
    pub fn classes_in_package(&self, path: &Path, package: &str) -> Vec<ClassDescriptorRc> {
        let contents = self.load_archive(path);
        let mut classes: Vec<ClassDescriptorRc> = contents
            .iter()
            .filter(|class| class.package() == package)
            .cloned()
            .collect();
        classes.sort_by(|left, right| left.name.cmp(&right.name));
        classes
    }

    /// Cache and failure counts.
    pub fn stats(&self) -> StoreStats {
        let index = self.resolver.index().stats();
        let archive_classes: usize = self.archives.values().iter().map(|c| c.len()).sum();
        let single_classes = self.classes.values().iter().flatten().count()
            + self.runtime_classes.values().iter().flatten().count();

        StoreStats {
            cached_archives: self.archives.len(),
            cached_classes: archive_classes + single_classes,
            failed_archives: index.failed_archives,
            failed_classes: index.failed_classes + index.unreadable_classes,
            oversized_archives: self.oversized.len(),
        }
    }

    /// Drop every cached descriptor and the oversized flags.
    pub fn reset(&self) {
        self.archives.clear();
        self.classes.clear();
        self.runtime_classes.clear();
        self.oversized.clear();
    }
}

/// Sizes reported by [`ClassStore::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Archives with cached contents
    pub cached_archives: usize,
    /// Cached class descriptors
    pub cached_classes: usize,
    /// Archives that could not be loaded
    pub failed_archives: usize,
    /// Classes that could not be located, plus broken class entries
    pub failed_classes: usize,
    /// Archives too large to cache
    pub oversized_archives: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "cached archives: {}", self.cached_archives)?;
        writeln!(f, "cached classes: {}", self.cached_classes)?;
        writeln!(f, "failed archives: {}", self.failed_archives)?;
        writeln!(f, "failed classes: {}", self.failed_classes)?;
        write!(f, "oversized archives: {}", self.oversized_archives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{example_jar, ClassFileBuilder, JarBuilder};

    fn store(config: SearchConfig, dir: &Path) -> ClassStore {
        let config = Arc::new(config);
        let resolver = Arc::new(DependencyResolver::new(
            Arc::clone(&config),
            Arc::new(RuntimeImage::new(config.runtime_archives.clone())),
        ));
        resolver.resolve_directory(dir).unwrap();
        ClassStore::new(config, resolver)
    }

    #[test]
    fn load_example_archive() {
        let dir = tempfile::tempdir().unwrap();
        let jar = example_jar(dir.path());
        let store = store(SearchConfig::default(), dir.path());

        let contents = store.load_archive(&jar);
        assert_eq!(contents.len(), 8);
        assert_eq!(contents.path(), jar.as_path());
        assert!(Arc::ptr_eq(&contents, &store.load_archive(&jar)));

        let module_a = store.get_by_name("org.example.ModuleA").unwrap();
        assert_eq!(module_a.super_name(), Some("org.example.ModuleBase"));
        assert!(Arc::ptr_eq(&module_a, &contents.get("org.example.ModuleA").unwrap()));

        let stats = store.stats();
        assert_eq!(stats.cached_archives, 1);
        assert_eq!(stats.cached_classes, 8);
        assert!(stats.to_string().contains("cached classes: 8"));
    }

    #[test]
    fn excluded_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let jar = JarBuilder::new()
            .class(ClassFileBuilder::class("com.acme.Api"))
            .class(ClassFileBuilder::class("com.acme.test.ApiTest"))
            .class(ClassFileBuilder::class("clojure.core$_conj"))
            .write(dir.path(), "acme.jar");
        let store = store(SearchConfig::default(), dir.path());

        let contents = store.load_archive(&jar);
        assert_eq!(contents.len(), 1);
        assert!(contents.get("com.acme.Api").is_some());
    }

    #[test]
    fn broken_entries_up_to_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let tolerable = JarBuilder::new()
            .class(ClassFileBuilder::class("com.acme.Api"))
            .raw("com/acme/Broken1.class", vec![0xCA, 0xFE, 0xBA, 0xBE])
            .raw("com/acme/Broken2.class", vec![0x00])
            .write(dir.path(), "tolerable.jar");
        let broken = JarBuilder::new()
            .class(ClassFileBuilder::class("net.bad.Api"))
            .raw("net/bad/B1.class", vec![0x00])
            .raw("net/bad/B2.class", vec![0x00])
            .raw("net/bad/B3.class", vec![0x00])
            .raw("net/bad/B4.class", vec![0x00])
            .write(dir.path(), "broken.jar");
        let store = store(SearchConfig::default(), dir.path());

        assert_eq!(store.load_archive(&tolerable).len(), 1);
        assert!(store.load_archive(&broken).is_empty());
        assert!(store.resolver().index().is_failed_archive(&broken));
        assert!(store.get_by_name("net.bad.Api").is_none());
        assert_eq!(store.stats().failed_archives, 1);
    }

    #[test]
    fn archive_without_classes_fails() {
        let dir = tempfile::tempdir().unwrap();
        let jar = JarBuilder::new()
            .raw("org/example/readme.txt", b"hello".to_vec())
            .write(dir.path(), "resources.jar");
        example_jar(dir.path());
        let store = store(SearchConfig::default(), dir.path());

        assert!(store.load_archive(&jar).is_empty());
        assert!(store.resolver().index().is_failed_archive(&jar));
    }

    #[test]
    fn oversized_archives_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let jar = example_jar(dir.path());
        let store = store(
            SearchConfig::default().with_max_cached_classes_per_archive(4),
            dir.path(),
        );

        assert_eq!(store.load_archive(&jar).len(), 8);
        assert!(store.is_oversized(&jar));
        assert_eq!(store.stats().cached_archives, 0);
        assert_eq!(store.stats().oversized_archives, 1);

        let first = store.get_by_name("org.example.ModuleB").unwrap();
        let second = store.get_by_name("org.example.ModuleB").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.stats().cached_classes, 1);
    }

    #[test]
    fn runtime_classes_from_rt_jar() {
        let dir = tempfile::tempdir().unwrap();
        JarBuilder::new()
            .class(ClassFileBuilder::interface("java.util.List"))
            .write(dir.path(), "jre/rt.jar");
        example_jar(dir.path());
        let store = store(SearchConfig::default(), dir.path());

        let list = store.get_by_name("java.util.List").unwrap();
        assert!(list.is_interface());
        assert!(store.get_from_runtime("java.io.File").is_none());
        assert!(!store.resolver().index().is_failed_class("java.io.File"));
        assert!(store.get_by_name("java.io.File").is_none());
        assert_eq!(
            store.resolver().locate_class("java.io.File").unwrap(),
            ClassLocation::Runtime
        );
    }

    #[test]
    fn broken_copy_does_not_hide_intact_copy() {
        let dir = tempfile::tempdir().unwrap();
        let broken = JarBuilder::new()
            .class(ClassFileBuilder::class("org.shared.Other"))
            .raw("org/shared/Shared.class", vec![0xCA, 0xFE, 0xBA, 0xBE])
            .write(dir.path(), "broken.jar");
        let intact = JarBuilder::new()
            .class(ClassFileBuilder::class("org.shared.Shared"))
            .write(dir.path(), "intact.jar");
        let store = store(
            SearchConfig::default().with_max_cached_classes_per_archive(0),
            dir.path(),
        );

        assert!(store.get_in_archive(&broken, "org.shared.Shared").is_none());
        let index = store.resolver().index();
        assert!(index.is_unreadable_class(&broken, "org.shared.Shared"));
        assert!(!index.is_failed_class("org.shared.Shared"));
        assert!(!index.is_failed_archive(&broken));

        let shared = store.get_in_archive(&intact, "org.shared.Shared").unwrap();
        assert_eq!(shared.name, "org.shared.Shared");
        assert!(store.get_in_archive(&broken, "org.shared.Shared").is_none());
        assert_eq!(store.stats().failed_classes, 1);
    }

    #[test]
    fn package_listing_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let jar = example_jar(dir.path());
        let store = store(SearchConfig::default(), dir.path());

        let names: Vec<String> = store
            .classes_in_package(&jar, "org.example.util")
            .iter()
            .map(|class| class.name.clone())
            .collect();
        assert_eq!(
            names,
            vec![
                "org.example.util.FileUtil".to_string(),
                "org.example.util.StringUtil".to_string()
            ]
        );
        assert_eq!(store.classes_in_package(&jar, "org.example").len(), 6);
    }

    #[test]
    fn reset_drops_caches() {
        let dir = tempfile::tempdir().unwrap();
        let jar = example_jar(dir.path());
        let store = store(SearchConfig::default(), dir.path());
        store.load_archive(&jar);
        store.reset();
        assert_eq!(store.stats().cached_archives, 0);
        assert_eq!(store.load_archive(&jar).len(), 8);
    }
}
