//! Analyzer configuration.
//!
//! [`SearchConfig`] holds every switch and threshold of the classpath analysis, and
//! [`CachePolicy`] the eviction rules of each owned cache. Both are plain values with a
//! [`Default`] impl and chained `with_*` setters:
//!
//! ```rust
//! use std::time::Duration;
//! use jarscope::{CachePolicy, SearchConfig};
//!
//! let config = SearchConfig::default()
//!     .with_verbose(true)
//!     .with_zero_arg_backtracking(true)
//!     .with_allowed_interface_prefix("org.springframework.")
//!     .with_class_cache(CachePolicy::unbounded().with_time_to_idle(Duration::from_secs(600)));
//!
//! assert!(config.verbose);
//! assert_eq!(config.max_entry_failures, 3);
//! ```

use std::{path::PathBuf, time::Duration};

/// Eviction rules of one cache.
///
/// An entry is dropped once it is older than `time_to_live`, or once it has not been read for
/// `time_to_idle`. When more than `max_entries` live entries remain, the least recently read
/// ones go first. `None` disables the respective rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachePolicy {
    /// Maximum age since insertion
    pub time_to_live: Option<Duration>,
    /// Maximum time since the last read
    pub time_to_idle: Option<Duration>,
    /// Maximum number of live entries
    pub max_entries: Option<usize>,
}

impl CachePolicy {
    /// A policy that never evicts.
    #[must_use]
    pub const fn unbounded() -> Self {
        CachePolicy {
            time_to_live: None,
            time_to_idle: None,
            max_entries: None,
        }
    }

    /// A policy with all three limits set.
    #[must_use]
    pub const fn new(time_to_live: Duration, time_to_idle: Duration, max_entries: usize) -> Self {
        CachePolicy {
            time_to_live: Some(time_to_live),
            time_to_idle: Some(time_to_idle),
            max_entries: Some(max_entries),
        }
    }

    /// Set the maximum age.
    #[must_use]
    pub const fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Set the maximum idle time.
    #[must_use]
    pub const fn with_time_to_idle(mut self, tti: Duration) -> Self {
        self.time_to_idle = Some(tti);
        self
    }

    /// Set the maximum number of entries.
    #[must_use]
    pub const fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Returns `true` if no rule is set.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.time_to_live.is_none() && self.time_to_idle.is_none() && self.max_entries.is_none()
    }
}

/// Packages that only the platform runtime provides.
///
/// Used when a class is in no resolved archive. `javax.` is only listed per package, most of it
/// ships as ordinary libraries.
pub const DEFAULT_RUNTIME_PACKAGES: &[&str] = &[
    "java.",
    "jdk.",
    "sun.",
    "com.sun.",
    "javax.xml.",
    "javax.naming.",
    "javax.script.",
    "javax.crypto.",
    "javax.net.",
    "javax.security.",
    "javax.management.",
    "javax.sql.",
    "org.w3c.dom.",
    "org.xml.sax.",
];

/// Class entry path fragments that are never parsed.
pub const DEFAULT_EXCLUDED_ENTRY_FRAGMENTS: &[&str] = &["META-INF/", "/test/", "_"];

/// Configuration of an [`crate::Analyzer`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct SearchConfig {
    /// Include runtime archives in the caller scope of public members
    pub runtime_scan: bool,
    /// Expand call targets whose descriptor takes no parameters
    pub zero_arg_backtracking: bool,
    /// Emit per-resolution diagnostics at debug level
    pub verbose: bool,
    /// Runtime interfaces under these prefixes are still followed when upgrading
    pub allowed_interface_prefixes: Vec<String>,
    /// Leading package segments two directories must share to be grouped
    pub min_common_prefix_depth: usize,
    /// Class parse failures tolerated per archive before the archive is given up
    pub max_entry_failures: usize,
    /// Archives with more classes than this are scanned but not cached
    pub max_cached_classes_per_archive: usize,
    /// Parsed class caches
    pub class_cache: CachePolicy,
    /// Class name to archive resolutions
    pub location_cache: CachePolicy,
    /// Declaring type lookups
    pub declaring_type_cache: CachePolicy,
    /// `rt.jar` or `.jmod` archives forming the platform runtime
    pub runtime_archives: Vec<PathBuf>,
    /// Package prefixes assumed to live in the runtime
    pub runtime_packages: Vec<String>,
    /// Class entries whose path contains one of these are skipped
    pub excluded_entry_fragments: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            runtime_scan: false,
            zero_arg_backtracking: false,
            verbose: false,
            allowed_interface_prefixes: Vec::new(),
            min_common_prefix_depth: 2,
            max_entry_failures: 3,
            max_cached_classes_per_archive: 3000,
            class_cache: CachePolicy::new(
                Duration::from_secs(30),
                Duration::from_secs(120),
                3000,
            ),
            location_cache: CachePolicy::new(
                Duration::from_secs(120),
                Duration::from_secs(300),
                1000,
            ),
            declaring_type_cache: CachePolicy::unbounded()
                .with_time_to_idle(Duration::from_secs(300)),
            runtime_archives: Vec::new(),
            runtime_packages: DEFAULT_RUNTIME_PACKAGES
                .iter()
                .map(ToString::to_string)
                .collect(),
            excluded_entry_fragments: DEFAULT_EXCLUDED_ENTRY_FRAGMENTS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl SearchConfig {
    /// Include runtime archives in public-member scopes.
    #[must_use]
    pub fn with_runtime_scan(mut self, enabled: bool) -> Self {
        self.runtime_scan = enabled;
        self
    }

    /// Expand zero-parameter targets.
    #[must_use]
    pub fn with_zero_arg_backtracking(mut self, enabled: bool) -> Self {
        self.zero_arg_backtracking = enabled;
        self
    }

    /// Enable debug diagnostics.
    #[must_use]
    pub fn with_verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Exempt runtime interfaces under `prefix` from upgrade pruning.
    #[must_use]
    pub fn with_allowed_interface_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.allowed_interface_prefixes.push(prefix.into());
        self
    }

    /// Set the grouping depth of the package heuristic.
    #[must_use]
    pub fn with_min_common_prefix_depth(mut self, depth: usize) -> Self {
        self.min_common_prefix_depth = depth;
        self
    }

    /// Set the per-archive parse failure threshold.
    #[must_use]
    pub fn with_max_entry_failures(mut self, failures: usize) -> Self {
        self.max_entry_failures = failures;
        self
    }

    /// Set the archive size ceiling for caching.
    #[must_use]
    pub fn with_max_cached_classes_per_archive(mut self, classes: usize) -> Self {
        self.max_cached_classes_per_archive = classes;
        self
    }

    /// Set the parsed class cache policy.
    #[must_use]
    pub fn with_class_cache(mut self, policy: CachePolicy) -> Self {
        self.class_cache = policy;
        self
    }

    /// Set the class location cache policy.
    #[must_use]
    pub fn with_location_cache(mut self, policy: CachePolicy) -> Self {
        self.location_cache = policy;
        self
    }

    /// Set the declaring type cache policy.
    #[must_use]
    pub fn with_declaring_type_cache(mut self, policy: CachePolicy) -> Self {
        self.declaring_type_cache = policy;
        self
    }

    /// Add a runtime archive (`rt.jar` or a `.jmod` module).
    #[must_use]
    pub fn with_runtime_archive(mut self, path: impl Into<PathBuf>) -> Self {
        self.runtime_archives.push(path.into());
        self
    }

    /// Replace the runtime package prefixes.
    #[must_use]
    pub fn with_runtime_packages<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runtime_packages = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the excluded class entry fragments.
    #[must_use]
    pub fn with_excluded_entry_fragments<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_entry_fragments = fragments.into_iter().map(Into::into).collect();
        self
    }

    /// Returns `true` if a class entry should be skipped.
    #[must_use]
    pub fn is_excluded_entry(&self, entry: &str) -> bool {
        self.excluded_entry_fragments
            .iter()
            .any(|fragment| entry.contains(fragment.as_str()))
    }

    /// Returns `true` if `class_name` falls under a runtime package prefix.
    #[must_use]
    pub fn is_runtime_package(&self, class_name: &str) -> bool {
        self.runtime_packages
            .iter()
            .any(|prefix| class_name.starts_with(prefix.as_str()))
    }

    /// Returns `true` if `type_name` falls under an allowed interface prefix.
    #[must_use]
    pub fn is_allowed_interface(&self, type_name: &str) -> bool {
        self.allowed_interface_prefixes
            .iter()
            .any(|prefix| type_name.starts_with(prefix.as_str()))
    }
}
