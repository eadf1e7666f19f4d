//! Call-site matching inside method bodies.
//!
//! An [`InstructionScanner`] is bound to one method name and type. It decides whether a method
//! body calls that method on a given owner, treating two owners as the same when they resolve to
//! the same declaring type. Callers found inside synthetic lambda bodies are attributed to the
//! method that encloses the lambda.

use std::sync::OnceLock;

use dashmap::DashMap;
use regex::Regex;

use crate::{
    classfile::{ClassDescriptor, MethodDescriptor},
    config::SearchConfig,
    hierarchy::TypeHierarchy,
    signature::{CallSignature, MethodType},
};

/// Methods never reported as callers.
const EXCLUDED_ENTRY_POINTS: &[&str] = &["main", "<clinit>"];

static SYNTHETIC_NAME: OnceLock<Regex> = OnceLock::new();

fn synthetic_name() -> &'static Regex {
    SYNTHETIC_NAME.get_or_init(|| {
        Regex::new(r"^.*\$([^$]+)\$\d+$").expect("synthetic name pattern is a valid regex")
    })
}

/// Returns `true` for methods that are never reported as callers.
#[must_use]
pub fn is_excluded_entry_point(name: &str) -> bool {
    EXCLUDED_ENTRY_POINTS.contains(&name)
}

/// The enclosing method name of a synthetic lambda body.
///
/// ```rust
/// use jarscope::scanner::normalize_synthetic_name;
///
/// assert_eq!(normalize_synthetic_name("lambda$process$0"), Some("process"));
/// assert_eq!(normalize_synthetic_name("process"), None);
/// ```
#[must_use]
pub fn normalize_synthetic_name(name: &str) -> Option<&str> {
    synthetic_name()
        .captures(name)
        .and_then(|captures| captures.get(1))
        .map(|enclosing| enclosing.as_str())
}

/// Finds call sites of one method name and type.
pub struct InstructionScanner<'a> {
    hierarchy: &'a TypeHierarchy,
    name: String,
    method_type: MethodType,
    verbose: bool,
    equivalence: DashMap<(String, String), bool>,
}

impl<'a> InstructionScanner<'a> {
    /// Create a scanner for calls of `name` with `method_type`.
    pub fn new(
        config: &SearchConfig,
        hierarchy: &'a TypeHierarchy,
        name: impl Into<String>,
        method_type: MethodType,
    ) -> Self {
        InstructionScanner {
            hierarchy,
            name: name.into(),
            method_type,
            verbose: config.verbose,
            equivalence: DashMap::new(),
        }
    }

    /// Create a scanner for the name and type of `target`.
    pub fn for_target(config: &SearchConfig, hierarchy: &'a TypeHierarchy, target: &CallSignature) -> Self {
        InstructionScanner::new(config, hierarchy, target.name.clone(), target.method_type.clone())
    }

    /// Returns `true` if `method` contains a call to `target`.
    ///
    /// A call site matches on name, on descriptor unless the target type is a wildcard, and on
    /// owner: either literally, or because both owners resolve to the same declaring type.
    pub fn method_calls(&self, method: &MethodDescriptor, target: &CallSignature) -> bool {
        debug_assert_eq!(target.name, self.name);
        method.calls.iter().any(|call| {
            call.name == self.name
                && self.method_type.matches(&call.descriptor)
                && self.owners_match(&call.owner, &target.owner)
        })
    }

    fn owners_match(&self, call_owner: &str, target_owner: &str) -> bool {
        if call_owner == target_owner {
            return true;
        }

        let key = (call_owner.to_string(), target_owner.to_string());
        if let Some(known) = self.equivalence.get(&key) {
            return *known;
        }

        let equivalent = self.canonical_owner(call_owner) == self.canonical_owner(target_owner);
        if !equivalent && self.verbose {
            log::debug!(
                "No match [{}|{}]: {call_owner} !>> {target_owner}",
                self.name,
                self.method_type.is_wildcard()
            );
        }
        self.equivalence.insert(key, equivalent);
        equivalent
    }

    fn canonical_owner(&self, owner: &str) -> String {
        self.hierarchy
            .declaring_type(owner, &self.name, &self.method_type)
            .unwrap_or_else(|| owner.to_string())
    }

    /// All methods of `class` calling `target`, sorted and without duplicates.
    ///
    /// Entry points such as `main` and the target itself are skipped. Calls made from lambda
    /// bodies are reported as calls from the enclosing method.
    pub fn callers_in_class(&self, class: &ClassDescriptor, target: &CallSignature) -> Vec<CallSignature> {
        let mut callers: Vec<CallSignature> = class
            .methods
            .iter()
            .filter(|method| !is_excluded_entry_point(&method.name))
            .filter(|method| !target.is_method(&class.name, &method.name, &method.descriptor))
            .filter(|method| self.method_calls(method, target))
            .flat_map(|method| attribute(class, method))
            .collect();
        callers.sort();
        callers.dedup();
        callers
    }
}

/// The signatures a matching `method` is reported as.
fn attribute(class: &ClassDescriptor, method: &MethodDescriptor) -> Vec<CallSignature> {
    let Some(enclosing) = normalize_synthetic_name(&method.name) else {
        return vec![CallSignature::new(
            class.name.clone(),
            method.name.clone(),
            MethodType::descriptor(method.descriptor.clone()),
            method.access.bits(),
        )];
    };

    let overloads = widest_overloads(class, enclosing);
    match overloads.as_slice() {
        [] => vec![CallSignature::new(
            class.name.clone(),
            enclosing,
            MethodType::Wildcard,
            method.access.bits(),
        )],
        [single] => vec![CallSignature::new(
            class.name.clone(),
            single.name.clone(),
            MethodType::descriptor(single.descriptor.clone()),
            single.access.bits(),
        )],
        tied => tied
            .iter()
            .map(|overload| {
                CallSignature::new(
                    class.name.clone(),
                    overload.name.clone(),
                    MethodType::Wildcard,
                    overload.access.bits(),
                )
            })
            .collect(),
    }
}

/// Overloads of `name` taking the most parameters.
fn widest_overloads<'c>(class: &'c ClassDescriptor, name: &str) -> Vec<&'c MethodDescriptor> {
    let mut widest: Vec<&MethodDescriptor> = Vec::new();
    let mut max_parameters = None;
    for method in class.methods_named(name) {
        let parameters = method.parameter_count().unwrap_or(0);
        match max_parameters {
            Some(max) if parameters < max => {}
            Some(max) if parameters == max => widest.push(method),
            _ => {
                max_parameters = Some(parameters);
                widest.clear();
                widest.push(method);
            }
        }
    }
    widest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{example_jar, resolved_store, ClassFileBuilder, JarBuilder, MethodDef};

    fn hierarchy(dir: &std::path::Path) -> TypeHierarchy {
        let config = SearchConfig::default();
        TypeHierarchy::new(&config, resolved_store(dir, config.clone()))
    }

    fn parse(class: ClassFileBuilder) -> ClassDescriptor {
        ClassDescriptor::parse(&class.build()).unwrap()
    }

    fn signature(value: &str) -> CallSignature {
        CallSignature::parse(value).unwrap()
    }

    fn scan(hierarchy: &TypeHierarchy, class: &ClassDescriptor, target: &str) -> Vec<String> {
        let target = signature(target);
        InstructionScanner::for_target(&SearchConfig::default(), hierarchy, &target)
            .callers_in_class(class, &target)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn entry_points_and_synthetic_names() {
        assert!(is_excluded_entry_point("main"));
        assert!(is_excluded_entry_point("<clinit>"));
        assert!(!is_excluded_entry_point("<init>"));

        assert_eq!(normalize_synthetic_name("lambda$static$12"), Some("static"));
        assert_eq!(normalize_synthetic_name("lambda$new$0"), Some("new"));
        assert_eq!(normalize_synthetic_name("access$000"), None);
        assert_eq!(normalize_synthetic_name("run"), None);
    }

    #[test]
    fn owners_resolving_to_one_declarer_match() {
        let dir = tempfile::tempdir().unwrap();
        example_jar(dir.path());
        let hierarchy = hierarchy(dir.path());
        let store = hierarchy.store();

        let children = store.get_by_name("org.example.ModuleAChildren").unwrap();
        assert_eq!(
            scan(&hierarchy, &children, "org.example.ModuleA#moduleATest1#()V#1"),
            vec!["org.example.ModuleAChildren#moduleAChildrenTest1#()V#1"]
        );

        let string_util = store.get_by_name("org.example.util.StringUtil").unwrap();
        assert!(scan(&hierarchy, &string_util, "org.example.ModuleBase#test1#null#1").is_empty());
        assert_eq!(
            scan(&hierarchy, &string_util, "org.example.ModuleC#test1#()V#1"),
            vec!["org.example.util.StringUtil#describe#(Ljava/lang/Object;)Ljava/lang/String;#9"]
        );
    }

    #[test]
    fn descriptors_must_match_unless_wildcard() {
        let dir = tempfile::tempdir().unwrap();
        example_jar(dir.path());
        let hierarchy = hierarchy(dir.path());
        let module_a = hierarchy.store().get_by_name("org.example.ModuleA").unwrap();

        assert_eq!(
            scan(&hierarchy, &module_a, "java.io.File#renameTo#null#1"),
            vec!["org.example.ModuleA#test1#()V#1"]
        );
        assert!(scan(&hierarchy, &module_a, "java.io.File#renameTo#(Ljava/lang/String;)Z#1").is_empty());
        assert!(scan(&hierarchy, &module_a, "java.io.File#delete#null#1").is_empty());
    }

    #[test]
    fn lambda_bodies_attribute_to_widest_overload() {
        let dir = tempfile::tempdir().unwrap();
        example_jar(dir.path());
        let hierarchy = hierarchy(dir.path());
        let module_c = hierarchy.store().get_by_name("org.example.ModuleC").unwrap();

        assert_eq!(
            scan(&hierarchy, &module_c, "org.example.util.FileUtil#delete#(Ljava/lang/String;)Z#9"),
            vec!["org.example.ModuleC#process#(Ljava/util/List;)V#1"]
        );

        let target = "org.example.util.FileUtil#delete#null#9";
        let call = |spec: MethodDef| {
            spec.invoke_static("org.example.util.FileUtil", "delete", "(Ljava/lang/String;)Z")
        };
        let tied = parse(
            ClassFileBuilder::class("com.acme.Tied")
                .method(MethodDef::new("run", "()V", 0x0001))
                .method(MethodDef::new("run", "(I)V", 0x0001))
                .method(MethodDef::new("run", "(J)V", 0x0004))
                .method(call(MethodDef::new("lambda$run$0", "()V", 0x100A))),
        );
        assert_eq!(
            scan(&hierarchy, &tied, target),
            vec!["com.acme.Tied#run#null#1", "com.acme.Tied#run#null#4"]
        );

        let orphan = parse(
            ClassFileBuilder::class("com.acme.Orphan")
                .method(call(MethodDef::new("lambda$gone$3", "()V", 0x100A))),
        );
        assert_eq!(
            scan(&hierarchy, &orphan, target),
            vec!["com.acme.Orphan#gone#null#4106"]
        );
    }

    #[test]
    fn entry_points_and_self_calls_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        example_jar(dir.path());
        let hierarchy = hierarchy(dir.path());
        let class = parse(
            ClassFileBuilder::class("com.acme.Loop")
                .method(
                    MethodDef::new("main", "([Ljava/lang/String;)V", 0x0009)
                        .invoke_virtual("com.acme.Loop", "step", "(I)V"),
                )
                .method(
                    MethodDef::new("<clinit>", "()V", 0x0008)
                        .invoke_virtual("com.acme.Loop", "step", "(I)V"),
                )
                .method(MethodDef::public("step", "(I)V").invoke_virtual("com.acme.Loop", "step", "(I)V"))
                .method(MethodDef::public("walk", "(I)V").invoke_virtual("com.acme.Loop", "step", "(I)V")),
        );
        assert_eq!(
            scan(&hierarchy, &class, "com.acme.Loop#step#(I)V#1"),
            vec!["com.acme.Loop#walk#(I)V#1"]
        );
    }

    #[test]
    fn equivalence_is_cached_per_owner_pair() {
        let dir = tempfile::tempdir().unwrap();
        example_jar(dir.path());
        JarBuilder::new()
            .class(
                ClassFileBuilder::class("net.user.Client").method(
                    MethodDef::public("go", "()V")
                        .invoke_virtual("org.example.ModuleB", "test1", "()V")
                        .invoke_virtual("org.example.ModuleC", "test1", "()V"),
                ),
            )
            .write(dir.path(), "client.jar");
        let hierarchy = hierarchy(dir.path());
        let client = hierarchy.store().get_by_name("net.user.Client").unwrap();

        let target = signature("org.example.ModuleBase#test1#()V#1");
        let scanner = InstructionScanner::for_target(&SearchConfig::default(), &hierarchy, &target);
        assert!(scanner.method_calls(&client.methods[0], &target));
        assert_eq!(scanner.equivalence.len(), 1);
        assert!(scanner.method_calls(&client.methods[0], &target));
        assert_eq!(scanner.equivalence.len(), 1);
    }
}
