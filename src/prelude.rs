//! # jarscope Prelude
//!
//! The types needed for a typical search session, for glob imports.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all jarscope operations
pub use crate::Error;

/// The result type used throughout jarscope
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Search session over one classpath
pub use crate::Analyzer;

/// Search and cache configuration
pub use crate::config::{CachePolicy, SearchConfig};

// ================================================================================================
// Signatures and Results
// ================================================================================================

/// Call signatures in the `owner#name#descriptor-or-null#access` form
pub use crate::signature::{CallSignature, MethodType};

/// The caller tree of a search
pub use crate::search::{CallerTree, NodeKind};

// ================================================================================================
// Components
// ================================================================================================

/// Parsed classes and methods
pub use crate::classfile::{ClassDescriptor, MethodDescriptor, Visibility};

/// Class location and dependency scopes
pub use crate::dependencies::{ClassLocation, DependencyResolver};

/// Class descriptor caching
pub use crate::store::ClassStore;

/// Hierarchy queries
pub use crate::hierarchy::TypeHierarchy;
