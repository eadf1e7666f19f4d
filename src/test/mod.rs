//! Shared fixtures for the unit tests: class file and jar builders plus the example layout.

mod archive;

pub use archive::JarBuilder;
pub use builders::{ClassFileBuilder, MethodDef};
pub use fixtures::{example_jar, example_jar_without_override, resolved_store};
