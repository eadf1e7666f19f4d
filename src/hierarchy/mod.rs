//! Supertype, interface and declaring-type queries.
//!
//! All queries walk the explicit adjacency of [`crate::classfile::ClassDescriptor`]s loaded
//! through the [`ClassStore`]. A class that can not be resolved ends its branch of the walk; it
//! is never an error. Walks stop at the [`crate::classfile::Supertype::Root`] sentinel, and
//! cyclic hierarchies (which only broken classpaths produce) are cut.

use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use crate::{
    classfile::ClassDescriptorRc, config::SearchConfig, signature::MethodType, store::ClassStore,
    store::ExpiringCache,
};

type DeclaringKey = (String, String, MethodType);

/// Answers hierarchy questions over the classes of a [`ClassStore`].
pub struct TypeHierarchy {
    store: Arc<ClassStore>,
    declaring: ExpiringCache<DeclaringKey, Option<String>>,
}

impl TypeHierarchy {
    /// Create a resolver reading classes from `store`.
    pub fn new(config: &SearchConfig, store: Arc<ClassStore>) -> Self {
        TypeHierarchy {
            store,
            declaring: ExpiringCache::new(config.declaring_type_cache),
        }
    }

    /// The store classes are read from.
    pub fn store(&self) -> &Arc<ClassStore> {
        &self.store
    }

    fn class(&self, name: &str) -> Option<ClassDescriptorRc> {
        self.store.get_by_name(name)
    }

    /// The most abstract type declaring `name` with `method_type` for `owner`.
    ///
    /// Interfaces are searched depth-first before the superclass, and every ancestor before
    /// `owner` itself. `owner` only answers if no ancestor declares the method. A wildcard type
    /// matches by name alone.
    ///
    /// ```rust,no_run
    /// use jarscope::{signature::MethodType, Analyzer, SearchConfig};
    ///
    /// let analyzer = Analyzer::new(SearchConfig::default());
    /// analyzer.resolve_classpath("lib")?;
    ///
    /// let declarer = analyzer
    ///     .hierarchy()
    ///     .declaring_type("org.example.ModuleA", "test1", &MethodType::descriptor("()V"));
    /// assert_eq!(declarer.as_deref(), Some("org.example.ModuleBase"));
    /// # Ok::<(), jarscope::Error>(())
    /// ```
    pub fn declaring_type(&self, owner: &str, name: &str, method_type: &MethodType) -> Option<String> {
        let key = (owner.to_string(), name.to_string(), method_type.clone());
        self.declaring.get_or_init(key, || {
            let mut in_progress = HashSet::new();
            self.find_declaring_type(owner, name, method_type, &mut in_progress)
        })
    }

    fn find_declaring_type(
        &self,
        owner: &str,
        name: &str,
        method_type: &MethodType,
        in_progress: &mut HashSet<String>,
    ) -> Option<String> {
        if !in_progress.insert(owner.to_string()) {
            return None;
        }

        let found = self.class(owner).and_then(|class| {
            let from_ancestors = class
                .interfaces
                .iter()
                .map(String::as_str)
                .chain(class.super_name())
                .find_map(|ancestor| {
                    self.find_declaring_type(ancestor, name, method_type, in_progress)
                });

            from_ancestors.or_else(|| {
                class
                    .declares(name, method_type)
                    .then(|| class.name.clone())
            })
        });

        in_progress.remove(owner);
        found
    }

    /// Like [`TypeHierarchy::declaring_type`], but only answers with an interface.
    pub fn interface_declaring_type(
        &self,
        owner: &str,
        name: &str,
        method_type: &MethodType,
    ) -> Option<String> {
        let declarer = self.declaring_type(owner, name, method_type)?;
        self.is_interface(&declarer).then_some(declarer)
    }

    /// Returns `true` if `type_name` resolves to an interface.
    pub fn is_interface(&self, type_name: &str) -> bool {
        self.class(type_name)
            .is_some_and(|class| class.is_interface())
    }

    /// Every interface implemented by `type_name`, its superinterfaces and its superclasses.
    pub fn all_interfaces(&self, type_name: &str) -> BTreeSet<String> {
        let mut interfaces = BTreeSet::new();
        let mut visited = HashSet::new();
        self.collect_interfaces(type_name, &mut interfaces, &mut visited);
        interfaces
    }

    fn collect_interfaces(
        &self,
        type_name: &str,
        interfaces: &mut BTreeSet<String>,
        visited: &mut HashSet<String>,
    ) {
        if !visited.insert(type_name.to_string()) {
            return;
        }
        let Some(class) = self.class(type_name) else {
            return;
        };
        for interface in &class.interfaces {
            interfaces.insert(interface.clone());
            self.collect_interfaces(interface, interfaces, visited);
        }
        if let Some(super_name) = class.super_name() {
            self.collect_interfaces(super_name, interfaces, visited);
        }
    }

    /// The superclass chain of `type_name`, topmost first, without the root class.
    pub fn all_supertypes(&self, type_name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = self.class(type_name);
        while let Some(class) = current {
            let Some(super_name) = class.super_name() else {
                break;
            };
            if super_name == type_name || chain.iter().any(|seen| seen == super_name) {
                break;
            }
            chain.push(super_name.to_string());
            current = self.class(super_name);
        }
        chain.reverse();
        chain
    }

    /// Returns `true` if `child` is `parent` or inherits from it.
    pub fn is_subtype_of(&self, child: &str, parent: &str) -> bool {
        if child == parent {
            return true;
        }
        self.all_supertypes(child).iter().any(|ancestor| ancestor == parent)
            || self.all_interfaces(child).contains(parent)
    }

    /// Returns `true` if both types are equal, share a superclass, or share an interface.
    pub fn have_common_ancestor(&self, left: &str, right: &str) -> bool {
        if left == right {
            return true;
        }
        let left_supers: HashSet<String> = self.all_supertypes(left).into_iter().collect();
        if self
            .all_supertypes(right)
            .iter()
            .any(|ancestor| left_supers.contains(ancestor))
        {
            return true;
        }
        !self
            .all_interfaces(left)
            .is_disjoint(&self.all_interfaces(right))
    }

    /// Forget memoized declaring types.
    pub fn reset(&self) {
        self.declaring.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{example_jar, resolved_store, ClassFileBuilder, JarBuilder, MethodDef};

    const A: &str = "org.example.ModuleA";
    const B: &str = "org.example.ModuleB";
    const BASE: &str = "org.example.ModuleBase";
    const CHILDREN: &str = "org.example.ModuleAChildren";
    const COMMON: &str = "org.example.Common";

    fn example_hierarchy(dir: &std::path::Path) -> TypeHierarchy {
        example_jar(dir);
        let config = SearchConfig::default();
        TypeHierarchy::new(&config, resolved_store(dir, config.clone()))
    }

    fn void() -> MethodType {
        MethodType::descriptor("()V")
    }

    #[test]
    fn topmost_declarer() {
        let dir = tempfile::tempdir().unwrap();
        let hierarchy = example_hierarchy(dir.path());

        assert_eq!(hierarchy.declaring_type(A, "test1", &void()).as_deref(), Some(BASE));
        assert_eq!(hierarchy.declaring_type(A, "common", &void()).as_deref(), Some(COMMON));
        assert_eq!(
            hierarchy.declaring_type(B, "test1", &MethodType::Wildcard).as_deref(),
            Some(BASE)
        );
        assert_eq!(
            hierarchy.declaring_type(CHILDREN, "moduleATest1", &void()).as_deref(),
            Some(A)
        );
        assert_eq!(hierarchy.declaring_type(BASE, "test1", &void()).as_deref(), Some(BASE));
        assert_eq!(hierarchy.declaring_type(A, "test1", &MethodType::descriptor("(I)V")), None);
        assert_eq!(hierarchy.declaring_type("org.example.Gone", "test1", &void()), None);
    }

    #[test]
    fn interface_only_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let hierarchy = example_hierarchy(dir.path());

        assert_eq!(hierarchy.interface_declaring_type(A, "test1", &void()), None);
        assert_eq!(
            hierarchy.interface_declaring_type(A, "common1", &void()).as_deref(),
            Some(COMMON)
        );
        assert!(hierarchy.is_interface(COMMON));
        assert!(!hierarchy.is_interface(BASE));
    }

    #[test]
    fn supertypes_and_interfaces() {
        let dir = tempfile::tempdir().unwrap();
        let hierarchy = example_hierarchy(dir.path());

        assert_eq!(
            hierarchy.all_supertypes(CHILDREN),
            vec![BASE.to_string(), A.to_string()]
        );
        assert!(hierarchy.all_supertypes(BASE).is_empty());
        assert_eq!(
            hierarchy.all_interfaces(CHILDREN),
            BTreeSet::from([COMMON.to_string()])
        );

        assert!(hierarchy.is_subtype_of(CHILDREN, COMMON));
        assert!(hierarchy.is_subtype_of(CHILDREN, BASE));
        assert!(hierarchy.is_subtype_of(A, A));
        assert!(!hierarchy.is_subtype_of(BASE, A));
        assert!(!hierarchy.is_subtype_of("org.example.ModuleC", BASE));

        assert!(hierarchy.have_common_ancestor(A, B));
        assert!(hierarchy.have_common_ancestor(CHILDREN, B));
        assert!(!hierarchy.have_common_ancestor(A, "org.example.ModuleC"));
    }

    #[test]
    fn cycles_terminate() {
        let dir = tempfile::tempdir().unwrap();
        JarBuilder::new()
            .class(ClassFileBuilder::class("net.loop.Left").super_class("net.loop.Right"))
            .class(
                ClassFileBuilder::class("net.loop.Right")
                    .super_class("net.loop.Left")
                    .method(MethodDef::public("run", "()V")),
            )
            .class(ClassFileBuilder::interface("net.loop.Up").implements("net.loop.Down"))
            .class(ClassFileBuilder::interface("net.loop.Down").implements("net.loop.Up"))
            .write(dir.path(), "loop.jar");
        let config = SearchConfig::default();
        let hierarchy = TypeHierarchy::new(&config, resolved_store(dir.path(), config.clone()));

        assert_eq!(
            hierarchy
                .declaring_type("net.loop.Left", "run", &void())
                .as_deref(),
            Some("net.loop.Right")
        );
        assert_eq!(hierarchy.declaring_type("net.loop.Left", "stop", &void()), None);
        assert_eq!(hierarchy.all_supertypes("net.loop.Left"), vec!["net.loop.Right".to_string()]);
        assert_eq!(
            hierarchy.all_interfaces("net.loop.Up"),
            BTreeSet::from(["net.loop.Down".to_string(), "net.loop.Up".to_string()])
        );
        assert!(hierarchy.is_subtype_of("net.loop.Up", "net.loop.Down"));
    }
}
