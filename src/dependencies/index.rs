//! The shared, concurrently populated dependency indices.

use std::{
    collections::{BTreeSet, HashSet},
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use crossbeam_skiplist::SkipMap;
use dashmap::{DashMap, DashSet};

use crate::dependencies::{is_within_package, ArtifactIdentity, IdentitySource};

/// Everything learned about one archive during resolution.
#[derive(Debug, Clone)]
pub struct ArchiveRecord {
    /// Archive location
    pub path: PathBuf,
    /// Artifact identity, if a trustworthy one was found
    pub identity: Option<ArtifactIdentity>,
    /// Where the identity came from
    pub source: IdentitySource,
    /// Identities of the declared dependencies
    pub dependencies: Vec<ArtifactIdentity>,
    /// Package identities registered for this archive
    pub packages: Vec<String>,
    /// Whether a `pom.xml` was found and parsed
    pub has_build_descriptor: bool,
    /// Whether this is a platform runtime archive
    pub is_runtime: bool,
    classes: HashSet<String>,
}

impl ArchiveRecord {
    pub(crate) fn new(path: PathBuf, classes: HashSet<String>) -> Self {
        ArchiveRecord {
            path,
            identity: None,
            source: IdentitySource::None,
            dependencies: Vec::new(),
            packages: Vec::new(),
            has_build_descriptor: false,
            is_runtime: false,
            classes,
        }
    }

    /// Returns `true` if the archive has a class entry for the dotted `class_name`.
    #[must_use]
    pub fn contains_class(&self, class_name: &str) -> bool {
        self.classes.contains(class_name)
    }

    /// Number of class entries.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

type RecordSlot = Arc<OnceLock<Option<Arc<ArchiveRecord>>>>;

/// Package, identity and failure indices over all resolved archives.
///
/// The package and identity indices are ordered skip lists so that prefix queries are range
/// scans; the sets they map to are concurrent, so resolution of many archives can register
/// into them in parallel.
#[derive(Default)]
pub struct DependencyIndex {
    records: DashMap<PathBuf, RecordSlot>,
    packages: SkipMap<String, DashSet<PathBuf>>,
    declarers: SkipMap<String, DashSet<PathBuf>>,
    miss: DashSet<PathBuf>,
    missing_build_descriptor: DashSet<PathBuf>,
    failed_archives: DashSet<PathBuf>,
    failed_classes: DashSet<String>,
    unreadable_classes: DashSet<(PathBuf, String)>,
}

impl DependencyIndex {
    /// The record slot for `path`, created empty if unknown.
    pub(crate) fn slot(&self, path: &Path) -> RecordSlot {
        if let Some(slot) = self.records.get(path) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.records.entry(path.to_path_buf()).or_default().value())
    }

    /// The record of a resolved archive.
    pub fn record(&self, path: &Path) -> Option<Arc<ArchiveRecord>> {
        let slot = self.records.get(path).map(|slot| Arc::clone(slot.value()))?;
        slot.get().cloned().flatten()
    }

    /// Paths of all successfully resolved archives, sorted.
    pub fn archives(&self) -> BTreeSet<PathBuf> {
        self.records
            .iter()
            .filter(|entry| entry.value().get().is_some_and(Option::is_some))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of successfully resolved archives.
    pub fn archive_count(&self) -> usize {
        self.records
            .iter()
            .filter(|entry| entry.value().get().is_some_and(Option::is_some))
            .count()
    }

    /// Add `path` to the archives providing `package`.
    pub(crate) fn register_package(&self, package: &str, path: &Path) {
        self.packages
            .get_or_insert_with(package.to_string(), DashSet::new)
            .value()
            .insert(path.to_path_buf());
    }

    /// Record that `path` declares a dependency on `identity`.
    pub(crate) fn register_declarer(&self, identity: &ArtifactIdentity, path: &Path) {
        self.declarers
            .get_or_insert_with(identity.to_string(), DashSet::new)
            .value()
            .insert(path.to_path_buf());
    }

    pub(crate) fn mark_miss(&self, path: &Path) {
        self.miss.insert(path.to_path_buf());
    }

    pub(crate) fn mark_missing_build_descriptor(&self, path: &Path) {
        self.missing_build_descriptor.insert(path.to_path_buf());
    }

    /// Remember that an archive could not be read.
    pub fn mark_failed_archive(&self, path: &Path) {
        self.failed_archives.insert(path.to_path_buf());
    }

    /// Returns `true` if an archive could not be read.
    pub fn is_failed_archive(&self, path: &Path) -> bool {
        self.failed_archives.contains(path)
    }

    /// Remember that no archive on the classpath provides a class.
    pub fn mark_failed_class(&self, class_name: &str) {
        self.failed_classes.insert(class_name.to_string());
    }

    /// Returns `true` if a class is memoized as not locatable.
    pub fn is_failed_class(&self, class_name: &str) -> bool {
        self.failed_classes.contains(class_name)
    }

    /// Remember that the copy of a class inside `path` could not be read or parsed.
    ///
    /// Other archives providing the same class are unaffected.
    pub fn mark_unreadable_class(&self, path: &Path, class_name: &str) {
        self.unreadable_classes
            .insert((path.to_path_buf(), class_name.to_string()));
    }

    /// Returns `true` if the copy of a class inside `path` is memoized as unreadable.
    pub fn is_unreadable_class(&self, path: &Path, class_name: &str) -> bool {
        self.unreadable_classes
            .contains(&(path.to_path_buf(), class_name.to_string()))
    }

    /// Archives providing the longest registered package that prefixes `name`.
    ///
    /// Prefixes are tried on `.` boundaries from the full name down to the first segment. All
    /// archives registered for the winning prefix are returned.
    pub fn longest_prefix(&self, name: &str) -> BTreeSet<PathBuf> {
        self.prefix_levels(name).into_iter().next().unwrap_or_default()
    }

    /// Archive sets of every registered package prefixing `name`, longest first.
    pub fn prefix_levels(&self, name: &str) -> Vec<BTreeSet<PathBuf>> {
        let mut levels = Vec::new();
        let mut candidate = name;
        loop {
            if let Some(entry) = self.packages.get(candidate) {
                let archives: BTreeSet<PathBuf> =
                    entry.value().iter().map(|path| path.key().clone()).collect();
                if !archives.is_empty() {
                    levels.push(archives);
                }
            }
            match candidate.rfind('.') {
                Some(index) => candidate = &candidate[..index],
                None => break,
            }
        }
        levels
    }

    /// Archives that declared exactly `identity`.
    pub fn declarers(&self, identity: &str) -> BTreeSet<PathBuf> {
        self.declarers
            .get(identity)
            .map(|entry| entry.value().iter().map(|path| path.key().clone()).collect())
            .unwrap_or_default()
    }

    /// Archives that declared any identity within `package`.
    pub fn declarers_within(&self, package: &str) -> BTreeSet<PathBuf> {
        self.declarers
            .range(package.to_string()..)
            .take_while(|entry| entry.key().starts_with(package))
            .filter(|entry| is_within_package(entry.key(), package))
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .map(|path| path.key().clone())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Archives without a trustworthy identity.
    pub fn miss_set(&self) -> BTreeSet<PathBuf> {
        self.miss.iter().map(|path| path.key().clone()).collect()
    }

    /// Archives without a build descriptor.
    pub fn missing_build_descriptor_set(&self) -> BTreeSet<PathBuf> {
        self.missing_build_descriptor
            .iter()
            .map(|path| path.key().clone())
            .collect()
    }

    /// Returns `true` if no package has been registered.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Sizes of the individual indices.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            archives: self.archive_count(),
            packages: self.packages.len(),
            package_entries: self.packages.iter().map(|entry| entry.value().len()).sum(),
            declared_identities: self.declarers.len(),
            declarer_entries: self.declarers.iter().map(|entry| entry.value().len()).sum(),
            miss: self.miss.len(),
            missing_build_descriptor: self.missing_build_descriptor.len(),
            failed_archives: self.failed_archives.len(),
            failed_classes: self.failed_classes.len(),
            unreadable_classes: self.unreadable_classes.len(),
        }
    }

    /// Drop the failure memos.
    pub fn clear_failures(&self) {
        self.failed_archives.clear();
        self.failed_classes.clear();
        self.unreadable_classes.clear();
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.records.clear();
        self.packages.clear();
        self.declarers.clear();
        self.miss.clear();
        self.missing_build_descriptor.clear();
        self.clear_failures();
    }
}

/// Index sizes, see [`DependencyIndex::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Resolved archives
    pub archives: usize,
    /// Distinct registered packages
    pub packages: usize,
    /// Package to archive pairs
    pub package_entries: usize,
    /// Distinct declared dependency identities
    pub declared_identities: usize,
    /// Identity to declaring archive pairs
    pub declarer_entries: usize,
    /// Archives without identity
    pub miss: usize,
    /// Archives without build descriptor
    pub missing_build_descriptor: usize,
    /// Archives that failed to load
    pub failed_archives: usize,
    /// Classes no archive provides
    pub failed_classes: usize,
    /// Archive and class pairs whose class entry is broken
    pub unreadable_classes: usize,
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "archives: {}", self.archives)?;
        writeln!(
            f,
            "packages: {} ({} entries)",
            self.packages, self.package_entries
        )?;
        writeln!(
            f,
            "declared dependencies: {} ({} entries)",
            self.declared_identities, self.declarer_entries
        )?;
        writeln!(f, "without identity: {}", self.miss)?;
        writeln!(f, "without pom: {}", self.missing_build_descriptor)?;
        writeln!(f, "failed archives: {}", self.failed_archives)?;
        writeln!(f, "failed classes: {}", self.failed_classes)?;
        write!(f, "unreadable classes: {}", self.unreadable_classes)
    }
}
