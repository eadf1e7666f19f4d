//! Backward call-graph search.
//!
//! Starting from a target method, the [`SearchEngine`] repeatedly asks which methods call the
//! current one, scanning only the archives that can see it, and grows a [`CallerTree`] from the
//! answers. The traversal is an explicit worklist with one visited set per search, so a method
//! is expanded at most once and cycles in the call graph end in leaves.
//!
//! With upgrading enabled, every node is first generalized to the most abstract type declaring
//! its method, and the search continues from that declaration. This finds callers that invoke
//! the method through a supertype or an interface.
//!
//! # Key Components
//!
//! - [`SearchEngine`] - The worklist traversal
//! - [`CallerTree`] / [`NodeKind`] - The result

mod tree;

pub use tree::{CallerTree, Iter, NodeKind};

use std::{
    collections::{HashSet, VecDeque},
    path::Path,
};

use rayon::prelude::*;

use crate::{
    classfile::{package_of, ClassDescriptorRc, Visibility},
    config::SearchConfig,
    dependencies::ClassLocation,
    hierarchy::TypeHierarchy,
    scanner::InstructionScanner,
    signature::CallSignature,
    store::ClassStore,
    Result,
};

struct Node {
    signature: CallSignature,
    kind: NodeKind,
    children: Vec<usize>,
}

/// Builds caller trees over a resolved classpath.
pub struct SearchEngine<'a> {
    config: &'a SearchConfig,
    store: &'a ClassStore,
    hierarchy: &'a TypeHierarchy,
}

impl<'a> SearchEngine<'a> {
    /// Create an engine over the given components.
    pub fn new(config: &'a SearchConfig, store: &'a ClassStore, hierarchy: &'a TypeHierarchy) -> Self {
        SearchEngine {
            config,
            store,
            hierarchy,
        }
    }

    /// Find all transitive callers of `target`.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotInitialized`] if no archive has been resolved.
    pub fn find_callers(&self, target: &CallSignature, upgrade: bool) -> Result<CallerTree> {
        let mut nodes = vec![Node {
            signature: target.clone(),
            kind: NodeKind::Target,
            children: Vec::new(),
        }];
        let mut visited: HashSet<CallSignature> = HashSet::new();
        let mut worklist = VecDeque::from([0_usize]);

        while let Some(index) = worklist.pop_front() {
            let stated = nodes[index].signature.clone();
            let mut current = (index, stated.clone());

            if upgrade {
                match self.upgrade(&stated)? {
                    Upgrade::Keep => {}
                    Upgrade::Prune => continue,
                    Upgrade::To(declaration) => {
                        if visited.contains(&declaration) {
                            continue;
                        }
                        let child = push(&mut nodes, index, declaration.clone(), NodeKind::Declaration);
                        current = (child, declaration);
                    }
                }
            }

            let (index, signature) = current;
            if !visited.insert(signature.clone()) {
                continue;
            }
            if self.config.verbose {
                if signature == stated {
                    log::debug!("Scan: {signature}");
                } else {
                    log::debug!("Scan: {signature} | From: {stated}");
                }
            }
            if signature.method_type.takes_no_arguments() && !self.config.zero_arg_backtracking {
                continue;
            }

            for caller in self.callers_of(&signature)? {
                let child = push(&mut nodes, index, caller, NodeKind::Caller);
                worklist.push_back(child);
            }
        }

        Ok(assemble(nodes))
    }

    fn upgrade(&self, signature: &CallSignature) -> Result<Upgrade> {
        let Some(declarer) =
            self.hierarchy
                .declaring_type(&signature.owner, &signature.name, &signature.method_type)
        else {
            return Ok(Upgrade::Keep);
        };
        if declarer == signature.owner {
            return Ok(Upgrade::Keep);
        }

        let runtime_interface = self.store.resolver().locate_class(&declarer)? == ClassLocation::Runtime
            && self.hierarchy.is_interface(&declarer);
        if runtime_interface
            && !self.config.is_allowed_interface(&declarer)
            && !signature.method_type.is_wildcard()
        {
            if self.config.verbose {
                log::debug!("Not upgrading {signature} to runtime interface {declarer}");
            }
            return Ok(Upgrade::Prune);
        }

        Ok(Upgrade::To(signature.with_owner(declarer)))
    }

    /// Direct callers of `signature` across its search scope, sorted.
    fn callers_of(&self, signature: &CallSignature) -> Result<Vec<CallSignature>> {
        let scope = self.store.resolver().caller_search_scope(signature)?;
        let scanner = InstructionScanner::for_target(self.config, self.hierarchy, signature);
        let found = boxcar::Vec::new();

        scope.par_iter().for_each(|path| {
            for class in self.candidate_classes(path, signature) {
                for caller in scanner.callers_in_class(&class, signature) {
                    found.push(caller);
                }
            }
        });

        let mut callers: Vec<CallSignature> = found.iter().map(|(_, caller)| caller.clone()).collect();
        callers.sort();
        callers.dedup();
        Ok(callers)
    }

    /// Classes of `path` that can see `signature`.
    fn candidate_classes(&self, path: &Path, signature: &CallSignature) -> Vec<ClassDescriptorRc> {
        match signature.visibility() {
            Visibility::Private => self
                .store
                .get_in_archive(path, &signature.owner)
                .into_iter()
                .collect(),
            Visibility::Protected | Visibility::Package => self
                .store
                .classes_in_package(path, package_of(&signature.owner)),
            Visibility::Public => self.store.load_archive(path).iter().cloned().collect(),
        }
    }
}

enum Upgrade {
    Keep,
    Prune,
    To(CallSignature),
}

fn push(nodes: &mut Vec<Node>, parent: usize, signature: CallSignature, kind: NodeKind) -> usize {
    let index = nodes.len();
    nodes.push(Node {
        signature,
        kind,
        children: Vec::new(),
    });
    nodes[parent].children.push(index);
    index
}

/// Turn the node arena into a tree. Children always follow their parent in the arena.
fn assemble(nodes: Vec<Node>) -> CallerTree {
    let mut built: Vec<Option<CallerTree>> = Vec::with_capacity(nodes.len());
    built.resize_with(nodes.len(), || None);

    for (index, node) in nodes.into_iter().enumerate().rev() {
        let children = node
            .children
            .iter()
            .filter_map(|child| built[*child].take())
            .collect();
        built[index] = Some(CallerTree {
            signature: node.signature,
            kind: node.kind,
            children,
        });
    }

    built
        .into_iter()
        .next()
        .flatten()
        .unwrap_or_else(|| unreachable!("the arena always holds the target node"))
}
