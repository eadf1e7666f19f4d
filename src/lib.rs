// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
// - 'file/backend.rs' uses mmap to map archives into memory

//! # jarscope
//!
//! Backward call-graph search over a Java classpath.
//!
//! Given a method such as `java.io.File#delete`, `jarscope` finds every method on the classpath
//! that can reach it, and the methods calling those, and so on, producing a tree of callers.
//! It reads `.jar` archives directly (memory-mapped, no JVM required), works out which archive
//! depends on which, and scans only the archives that can actually see a method.
//!
//! ## Features
//!
//! - **Direct class file decoding** - A small class-file reader extracting exactly the call sites
//! - **Dependency-aware scoping** - `pom.xml`, manifest and package heuristics decide which
//!   archives may call a method
//! - **Polymorphism-aware matching** - Calls through subclasses, superclasses and interfaces are
//!   recognized without conflating unrelated overrides
//! - **Lambda attribution** - Calls from lambda bodies are reported on the enclosing method
//! - **Concurrent** - Archives are scanned in parallel; caches are shared and lock-sharded
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jarscope::prelude::*;
//!
//! let analyzer = Analyzer::new(SearchConfig::default());
//! analyzer.resolve_classpath("/opt/app/lib")?;
//!
//! let tree = analyzer.find_callers("java.io.File#renameTo#(Ljava/io/File;)Z#1", true)?;
//! for caller in tree.leaves() {
//!     println!("entry: {}", caller.signature);
//! }
//! # Ok::<(), jarscope::Error>(())
//! ```
//!
//! ## Signatures
//!
//! Methods are named as `owner#name#descriptor#access`: the dotted owner type, the method name,
//! the JVM descriptor (or `null` to match every overload), and the decimal access flags. Only
//! the visibility bits of the access flags are used; they decide where callers can live.
//!
//! ## Architecture
//!
//! - [`file`] and [`classfile`] - Archive access and class-file decoding
//! - [`dependencies`] - Archive identities, dependency closures and class location
//! - [`store`] - Cached class descriptors
//! - [`hierarchy`] - Supertype and declaring-type queries
//! - [`scanner`] - Call-site matching inside one class
//! - [`search`] - The worklist building the caller tree
//! - [`Analyzer`] - The session owning all of the above
//!
//! Logging goes through the `log` facade; the library never installs a logger. Summary lines are
//! logged at `info`, per-archive failures at `warn`, and with [`SearchConfig::verbose`] every
//! skipped or unresolvable lookup at `debug`.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use jarscope::prelude::*;
///
/// let analyzer = Analyzer::new(SearchConfig::default().with_runtime_scan(true));
/// let tree: CallerTree = analyzer.find_callers("java.lang.Runtime#exec#null#1", true)?;
/// # Ok::<(), jarscope::Error>(())
/// ```
pub mod prelude;

pub mod bytecode;
pub mod classfile;
pub mod config;
pub mod dependencies;
pub mod file;
pub mod hierarchy;
pub mod scanner;
pub mod search;
pub mod signature;
pub mod store;

mod analyzer;

/// `jarscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `jarscope` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use jarscope::{Analyzer, Error, SearchConfig};
///
/// let analyzer = Analyzer::new(SearchConfig::default());
/// match analyzer.resolve_classpath("/opt/app/lib") {
///     Ok(count) => println!("resolved {count} archives"),
///     Err(Error::NotADirectory(path)) => println!("{} is not a directory", path.display()),
///     Err(e) => println!("Error: {e}"),
/// }
/// ```
pub use error::Error;

/// The search session and its cache statistics.
pub use analyzer::{Analyzer, AnalyzerStats};

pub use config::{CachePolicy, SearchConfig};
pub use search::{CallerTree, NodeKind};
pub use signature::{CallSignature, MethodType};

/// Cursor over class file bytes, see [`file::parser::Parser`].
///
/// # Example
///
/// ```rust
/// use jarscope::Parser;
///
/// let mut parser = Parser::new(&[0xCA, 0xFE, 0xBA, 0xBE]);
/// assert_eq!(parser.read_be::<u32>()?, 0xCAFE_BABE);
/// # Ok::<(), jarscope::Error>(())
/// ```
pub use file::parser::Parser;
