use std::{
    collections::{BTreeSet, HashSet, VecDeque},
    path::{Path, PathBuf},
    sync::Arc,
};

use dashmap::DashMap;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::{
    classfile::Visibility,
    config::SearchConfig,
    dependencies::{
        entry_dir, file_name_identity, package_groups, ArchiveRecord, ArtifactIdentity, DependencyIndex,
        IdentitySource, IndexStats, Manifest, PomModel,
    },
    file::{class_name_of_entry, is_runtime_archive, Archive, JMOD_CLASSES_PREFIX},
    signature::CallSignature,
    store::{ExpiringCache, RuntimeImage},
    Error, Result,
};

const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";

/// Where a class lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassLocation {
    /// A classpath archive holding the class entry
    Archive(PathBuf),
    /// The platform runtime
    Runtime,
    /// Nowhere on the classpath
    NotFound,
}

/// Direction of a dependency closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// Towards archives that depend on the start archive
    Upward,
    /// Towards archives the start archive depends on
    Downward,
}

/// Maps classes to archives and archives to their dependency closures.
///
/// Archives are inspected once each ([`DependencyResolver::resolve`]); what is learned goes into
/// the shared [`DependencyIndex`]. Class locations and closures are derived lazily from the index
/// and cached; both caches are dropped whenever another archive is resolved.
pub struct DependencyResolver {
    config: Arc<SearchConfig>,
    index: DependencyIndex,
    runtime: Arc<RuntimeImage>,
    locations: ExpiringCache<String, ClassLocation>,
    closures: DashMap<(PathBuf, Direction), Arc<BTreeSet<PathBuf>>>,
}

impl DependencyResolver {
    /// Create an empty resolver.
    pub fn new(config: Arc<SearchConfig>, runtime: Arc<RuntimeImage>) -> Self {
        let locations = ExpiringCache::new(config.location_cache);
        DependencyResolver {
            config,
            index: DependencyIndex::default(),
            runtime,
            locations,
            closures: DashMap::new(),
        }
    }

    /// The underlying indices.
    pub fn index(&self) -> &DependencyIndex {
        &self.index
    }

    /// The platform runtime image.
    pub fn runtime(&self) -> &Arc<RuntimeImage> {
        &self.runtime
    }

    /// Inspect one archive and register what it provides and declares.
    ///
    /// Repeated calls for the same path do nothing. A failure is reported by the call that
    /// inspected the archive; the archive is then memoized as failed.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] or [`crate::Error::ArchiveError`] if the archive can
    /// not be opened or read.
    pub fn resolve(&self, path: &Path) -> Result<()> {
        let slot = self.index.slot(path);
        let mut outcome = Ok(());
        let mut inspected = false;

        let record = slot.get_or_init(|| {
            inspected = true;
            match self.inspect(path) {
                Ok(record) => Some(Arc::new(record)),
                Err(error) => {
                    log::warn!("Failed to resolve archive {}: {error}", path.display());
                    self.index.mark_failed_archive(path);
                    outcome = Err(error);
                    None
                }
            }
        });

        if inspected {
            if let Some(record) = record {
                self.register(record);
            }
        }
        outcome
    }

    /// Resolve every `.jar` below `dir`.
    ///
    /// Returns the number of archives resolved successfully.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotADirectory`] if `dir` is not a directory.
    pub fn resolve_directory(&self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            return Err(Error::NotADirectory(dir.to_path_buf()));
        }

        let jars: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry
                        .path()
                        .extension()
                        .is_some_and(|extension| extension.eq_ignore_ascii_case("jar"))
            })
            .map(walkdir::DirEntry::into_path)
            .collect();

        let resolved = jars
            .par_iter()
            .filter(|jar| self.resolve(jar).is_ok())
            .count();

        let stats = self.index.stats();
        log::info!(
            "Loaded {resolved} of {} archives from {}",
            jars.len(),
            dir.display()
        );
        log::info!("Archives without identity: {}", stats.miss);
        log::info!(
            "Archives without pom: {}",
            stats.missing_build_descriptor
        );
        Ok(resolved)
    }

    fn inspect(&self, path: &Path) -> Result<ArchiveRecord> {
        let mut archive = Archive::open(path)?;
        let entries = archive.class_entries();
        let is_jmod = path.extension().is_some_and(|extension| extension == "jmod");

        let classes: HashSet<String> = entries
            .iter()
            .filter_map(|entry| class_name_of_entry(entry))
            .collect();
        let mut record = ArchiveRecord::new(path.to_path_buf(), classes);
        record.is_runtime = is_runtime_archive(path);

        let pom_entry = archive
            .find_entry(|name| name.starts_with("META-INF/") && name.ends_with("/pom.xml"));
        if let Some(pom_entry) = pom_entry {
            let bytes = archive.read(&pom_entry)?;
            match PomModel::parse(&bytes) {
                Ok(pom) => {
                    record.has_build_descriptor = true;
                    record.dependencies = pom.dependency_identities();
                    if let Some(identity) = pom.identity() {
                        if archive.contains_dir(&identity.as_dir()) {
                            record.packages.push(identity.to_string());
                        }
                        record.identity = Some(identity);
                        record.source = IdentitySource::BuildDescriptor;
                    }
                }
                Err(error) => {
                    if self.config.verbose {
                        log::debug!(
                            "Unreadable {pom_entry} in {}: {error}",
                            path.display()
                        );
                    }
                }
            }
        }

        if record.identity.is_none() {
            if let Some(identity) = manifest_identity(&mut archive)? {
                record.identity = Some(identity);
                record.source = IdentitySource::Manifest;
            } else if let Some(identity) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(file_name_identity)
            {
                record.identity = Some(identity);
                record.source = IdentitySource::FileName;
            }
        }

        if record.packages.is_empty() {
            let dirs = entries.iter().filter_map(|entry| {
                let entry = if is_jmod {
                    entry.strip_prefix(JMOD_CLASSES_PREFIX).unwrap_or(entry)
                } else {
                    entry
                };
                entry_dir(entry)
            });
            record.packages = package_groups(dirs, self.config.min_common_prefix_depth);
        }

        Ok(record)
    }

    fn register(&self, record: &ArchiveRecord) {
        for package in &record.packages {
            self.index.register_package(package, &record.path);
        }
        for dependency in &record.dependencies {
            self.index.register_declarer(dependency, &record.path);
        }
        if record.identity.is_none() {
            self.index.mark_miss(&record.path);
        }
        if !record.has_build_descriptor {
            self.index.mark_missing_build_descriptor(&record.path);
        }
        if record.is_runtime && self.runtime.register(&record.path) {
            log::info!("Using runtime archive {}", record.path.display());
        }

        self.closures.clear();
        self.locations.clear();

        if self.config.verbose {
            log::debug!(
                "Resolved {}: identity {} ({}), {} packages, {} dependencies",
                record.path.display(),
                record
                    .identity
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string),
                record.source,
                record.packages.len(),
                record.dependencies.len()
            );
        }
    }

    /// The record of a resolved archive.
    pub fn record(&self, path: &Path) -> Option<Arc<ArchiveRecord>> {
        self.index.record(path)
    }

    /// Returns `true` for runtime archives, configured or discovered.
    pub fn is_runtime_archive(&self, path: &Path) -> bool {
        self.runtime.contains(path) || is_runtime_archive(path)
    }

    /// Find the archive holding `class_name`.
    ///
    /// Tried in order: a literal entry in a runtime archive, the archives of the longest
    /// registered package prefix (checked for the literal entry, falling back to shorter
    /// prefixes), then the configured runtime package prefixes. A class memoized as not found
    /// skips only the archive lookup; runtime resolution always wins over the memo.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotInitialized`] if no archive has been resolved yet.
    pub fn locate_class(&self, class_name: &str) -> Result<ClassLocation> {
        if self.index.is_empty() {
            return Err(Error::NotInitialized);
        }
        if let Some(location) = self.locations.get(&class_name.to_string()) {
            return Ok(location);
        }

        let location = self.find_location(class_name);
        match location {
            ClassLocation::NotFound => {
                if self.config.verbose {
                    log::debug!("Can not locate class {class_name}");
                }
                self.index.mark_failed_class(class_name);
            }
            _ => self
                .locations
                .insert(class_name.to_string(), location.clone()),
        }
        Ok(location)
    }

    fn find_location(&self, class_name: &str) -> ClassLocation {
        if self.runtime.locate(class_name).is_some() {
            return ClassLocation::Runtime;
        }

        if !self.index.is_failed_class(class_name) {
            let in_archive = self
                .index
                .prefix_levels(class_name)
                .into_iter()
                .flatten()
                .find(|path| {
                    self.index
                        .record(path)
                        .is_some_and(|record| record.contains_class(class_name))
                });
            if let Some(path) = in_archive {
                return ClassLocation::Archive(path);
            }
        }

        if self.config.is_runtime_package(class_name) {
            return ClassLocation::Runtime;
        }
        ClassLocation::NotFound
    }

    /// The transitive dependency closure of an archive, including the archive itself.
    pub fn dependency_closure(&self, path: &Path, direction: Direction) -> Arc<BTreeSet<PathBuf>> {
        let key = (path.to_path_buf(), direction);
        if let Some(closure) = self.closures.get(&key) {
            return Arc::clone(closure.value());
        }

        let mut closure = BTreeSet::from([path.to_path_buf()]);
        let mut worklist = VecDeque::from([path.to_path_buf()]);
        while let Some(current) = worklist.pop_front() {
            for next in self.neighbours(&current, direction) {
                if closure.insert(next.clone()) {
                    worklist.push_back(next);
                }
            }
        }

        let closure = Arc::new(closure);
        self.closures.insert(key, Arc::clone(&closure));
        closure
    }

    fn neighbours(&self, path: &Path, direction: Direction) -> BTreeSet<PathBuf> {
        let Some(record) = self.index.record(path) else {
            return BTreeSet::new();
        };

        match direction {
            Direction::Upward => {
                let exact = record
                    .identity
                    .as_ref()
                    .map(|identity| self.index.declarers(identity.as_str()))
                    .unwrap_or_default();
                if !exact.is_empty() {
                    return exact;
                }
                if record.identity.is_none() || !record.has_build_descriptor {
                    return record
                        .packages
                        .iter()
                        .flat_map(|package| self.index.declarers_within(package))
                        .collect();
                }
                BTreeSet::new()
            }
            Direction::Downward => record
                .dependencies
                .iter()
                .flat_map(|dependency| self.index.longest_prefix(dependency.as_str()))
                .collect(),
        }
    }

    /// The archives that may contain callers of `signature`.
    ///
    /// Public members of runtime classes may be called from anywhere; other public members from
    /// their archive's upward closure and from every archive without identity. Non-public
    /// members only from their own archive. Failed archives are always excluded, runtime archives
    /// unless runtime scanning is enabled.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotInitialized`] if no archive has been resolved yet.
    pub fn caller_search_scope(&self, signature: &CallSignature) -> Result<BTreeSet<PathBuf>> {
        let location = self.locate_class(&signature.owner)?;

        let scope: BTreeSet<PathBuf> = match (signature.visibility(), location) {
            (_, ClassLocation::NotFound) => {
                if self.config.verbose {
                    log::debug!("No archive for {}, empty caller scope", signature.owner);
                }
                BTreeSet::new()
            }
            (Visibility::Public, ClassLocation::Runtime) => {
                let mut all = self.index.archives();
                if self.config.runtime_scan {
                    all.extend(self.runtime.paths());
                }
                all
            }
            (Visibility::Public, ClassLocation::Archive(path)) => {
                let mut scope = (*self.dependency_closure(&path, Direction::Upward)).clone();
                scope.extend(self.index.miss_set());
                scope
            }
            (_, ClassLocation::Archive(path)) => BTreeSet::from([path]),
            (_, ClassLocation::Runtime) => {
                self.runtime.locate(&signature.owner).into_iter().collect()
            }
        };

        Ok(scope
            .into_iter()
            .filter(|path| !self.index.is_failed_archive(path))
            .filter(|path| self.config.runtime_scan || !self.is_runtime_archive(path))
            .collect())
    }

    /// Sizes of all indices and caches.
    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            index: self.index.stats(),
            runtime_archives: self.runtime.paths().len(),
            cached_locations: self.locations.len(),
            cached_closures: self.closures.len(),
        }
    }

    /// Drop cached locations, closures and failure memos. Resolved archives are kept.
    pub fn reset(&self) {
        self.locations.clear();
        self.closures.clear();
        self.index.clear_failures();
    }
}

fn manifest_identity(archive: &mut Archive) -> Result<Option<ArtifactIdentity>> {
    let Some(entry) = archive.find_entry(|name| name.eq_ignore_ascii_case(MANIFEST_ENTRY)) else {
        return Ok(None);
    };
    let bytes = archive.read(&entry)?;
    Ok(Manifest::parse(&String::from_utf8_lossy(&bytes)).identity())
}

/// Index and cache sizes of a [`DependencyResolver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    /// Index sizes
    pub index: IndexStats,
    /// Known runtime archives
    pub runtime_archives: usize,
    /// Cached class locations
    pub cached_locations: usize,
    /// Memoized closures
    pub cached_closures: usize,
}

impl std::fmt::Display for ResolverStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "runtime archives: {}", self.runtime_archives)?;
        writeln!(f, "cached locations: {}", self.cached_locations)?;
        write!(f, "cached closures: {}", self.cached_closures)
    }
}
