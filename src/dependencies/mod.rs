//! Archive dependency resolution.
//!
//! Every archive on the classpath is inspected once to learn three things: which artifact it is
//! (its identity), which artifacts it depends on, and which package names it provides. Identities
//! come from an embedded `pom.xml`, the manifest, or an Ant-style file name, in that order;
//! archives without any of these still get package identities from their class directories.
//!
//! The results feed the shared [`DependencyIndex`], which [`DependencyResolver`] queries to
//! locate classes and to compute the set of archives that may contain callers of a method.
//!
//! # Key Components
//!
//! - [`DependencyResolver`] - Resolution, class location and caller scopes
//! - [`DependencyIndex`] - Package, declarer and failure indices
//! - [`PomModel`] / [`Manifest`] - Identity and dependency sources
//! - [`package_groups`] - Package identities for archives without a build descriptor

mod heuristic;
mod identity;
mod index;
mod manifest;
mod pom;
mod resolver;

pub use heuristic::{entry_dir, package_groups};
pub use identity::{is_within_package, ArtifactIdentity, IdentitySource};
pub use index::{ArchiveRecord, DependencyIndex, IndexStats};
pub use manifest::{file_name_identity, Manifest};
pub use pom::{Coordinates, PomModel};
pub use resolver::{ClassLocation, DependencyResolver, Direction, ResolverStats};
