//! The entry point tying resolver, store, hierarchy and search together.

use std::{path::Path, sync::Arc};

use crate::{
    config::SearchConfig,
    dependencies::{DependencyResolver, ResolverStats},
    hierarchy::TypeHierarchy,
    search::{CallerTree, SearchEngine},
    signature::CallSignature,
    store::{ClassStore, RuntimeImage, StoreStats},
    Result,
};

/// Backward call-graph search over one classpath.
///
/// An `Analyzer` owns every cache of a search session. Resolve the classpath once, then run any
/// number of searches, concurrently if needed.
///
/// # Examples
///
/// ```rust,no_run
/// use jarscope::{Analyzer, SearchConfig};
///
/// let analyzer = Analyzer::new(SearchConfig::default().with_verbose(true));
/// let archives = analyzer.resolve_classpath("/opt/app/lib")?;
/// println!("{archives} archives");
///
/// let tree = analyzer.find_callers("java.io.File#delete#null#1", true)?;
/// for node in &tree {
///     println!("{} ({})", node.signature, node.kind);
/// }
/// # Ok::<(), jarscope::Error>(())
/// ```
pub struct Analyzer {
    config: Arc<SearchConfig>,
    resolver: Arc<DependencyResolver>,
    store: Arc<ClassStore>,
    hierarchy: TypeHierarchy,
}

impl Analyzer {
    /// Create an analyzer with empty caches.
    pub fn new(config: SearchConfig) -> Self {
        let config = Arc::new(config);
        let runtime = Arc::new(RuntimeImage::new(config.runtime_archives.clone()));
        let resolver = Arc::new(DependencyResolver::new(Arc::clone(&config), runtime));
        let store = Arc::new(ClassStore::new(Arc::clone(&config), Arc::clone(&resolver)));
        let hierarchy = TypeHierarchy::new(&config, Arc::clone(&store));

        Analyzer {
            config,
            resolver,
            store,
            hierarchy,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The archive dependency resolver.
    pub fn resolver(&self) -> &DependencyResolver {
        &self.resolver
    }

    /// The class descriptor store.
    pub fn store(&self) -> &ClassStore {
        &self.store
    }

    /// The type hierarchy resolver.
    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    /// Resolve every `.jar` below `root`, returning how many were resolved successfully.
    ///
    /// May be called more than once; archives already known are skipped.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotADirectory`] if `root` is not a directory.
    pub fn resolve_classpath(&self, root: impl AsRef<Path>) -> Result<usize> {
        self.resolver.resolve_directory(root.as_ref())
    }

    /// Resolve one additional archive.
    ///
    /// # Errors
    /// Returns the error that made the archive unreadable.
    pub fn resolve_archive(&self, path: impl AsRef<Path>) -> Result<()> {
        self.resolver.resolve(path.as_ref())
    }

    /// Find all transitive callers of the method given as `owner#name#descriptor-or-null#access`.
    ///
    /// With `upgrade`, each method is generalized to its most abstract declaration before its
    /// callers are searched.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidSignature`] for malformed signatures and
    /// [`crate::Error::NotInitialized`] if no classpath has been resolved.
    pub fn find_callers(&self, signature: &str, upgrade: bool) -> Result<CallerTree> {
        let target = CallSignature::parse(signature)?;
        self.find_callers_of(&target, upgrade)
    }

    /// Find all transitive callers of `target`.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotInitialized`] if no classpath has been resolved.
    pub fn find_callers_of(&self, target: &CallSignature, upgrade: bool) -> Result<CallerTree> {
        SearchEngine::new(&self.config, &self.store, &self.hierarchy).find_callers(target, upgrade)
    }

    /// Drop cached classes, locations and declarers, and forget all failures.
    ///
    /// Resolved archives stay resolved.
    pub fn reset(&self) {
        self.store.reset();
        self.hierarchy.reset();
        self.resolver.reset();
    }

    /// Cache and index sizes.
    pub fn stats(&self) -> AnalyzerStats {
        AnalyzerStats {
            resolver: self.resolver.stats(),
            store: self.store.stats(),
        }
    }
}

/// Sizes reported by [`Analyzer::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyzerStats {
    /// Dependency indices and resolver caches
    pub resolver: ResolverStats,
    /// Descriptor caches
    pub store: StoreStats,
}

impl std::fmt::Display for AnalyzerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.resolver)?;
        write!(f, "{}", self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{search::NodeKind, test::example_jar, Error};

    #[test]
    fn analyzer_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Analyzer>();
    }

    #[test]
    fn end_to_end_example() {
        let dir = tempfile::tempdir().unwrap();
        example_jar(dir.path());
        let analyzer = Analyzer::new(SearchConfig::default());
        assert_eq!(analyzer.resolve_classpath(dir.path()).unwrap(), 1);

        let tree = analyzer
            .find_callers("java.io.File#renameTo#(Ljava/io/File;)Z#1", true)
            .unwrap();
        let nodes: Vec<(String, NodeKind)> = tree
            .iter()
            .map(|node| (node.signature.to_string(), node.kind))
            .collect();
        assert_eq!(
            nodes,
            vec![
                ("java.io.File#renameTo#(Ljava/io/File;)Z#1".to_string(), NodeKind::Target),
                ("org.example.ModuleA#test1#()V#1".to_string(), NodeKind::Caller),
                ("org.example.ModuleBase#test1#()V#1".to_string(), NodeKind::Declaration),
            ]
        );

        let stats = analyzer.stats();
        assert_eq!(stats.resolver.index.archives, 1);
        assert_eq!(stats.store.cached_archives, 1);
    }

    #[test]
    fn errors_reaching_the_caller() {
        let analyzer = Analyzer::new(SearchConfig::default());
        assert!(matches!(
            analyzer.find_callers("java.io.File#delete", true),
            Err(Error::InvalidSignature(_))
        ));
        assert!(matches!(
            analyzer.find_callers("java.io.File#delete#(I)Z#1", true),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(
            analyzer.resolve_classpath("/nonexistent/classpath"),
            Err(Error::NotADirectory(_))
        ));
    }

    #[test]
    fn reset_forgets_failures() {
        let dir = tempfile::tempdir().unwrap();
        example_jar(dir.path());
        let analyzer = Analyzer::new(SearchConfig::default());
        analyzer.resolve_classpath(dir.path()).unwrap();

        assert!(analyzer.store().get_by_name("org.example.Missing").is_none());
        assert!(analyzer.resolver().index().is_failed_class("org.example.Missing"));

        analyzer.reset();
        assert!(!analyzer.resolver().index().is_failed_class("org.example.Missing"));
        assert_eq!(analyzer.stats().store.cached_archives, 0);
        assert_eq!(analyzer.stats().resolver.index.archives, 1);
    }
}
