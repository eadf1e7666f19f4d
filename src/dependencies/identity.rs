//! Artifact identities and where they came from.

use std::{fmt, sync::OnceLock};

use regex::Regex;
use strum::Display;

static IDENTITY_PATTERN: OnceLock<Regex> = OnceLock::new();

fn identity_pattern() -> &'static Regex {
    IDENTITY_PATTERN
        .get_or_init(|| Regex::new(r"^[\w.-]+$").expect("identity pattern is a valid regex"))
}

/// A dotted artifact identity such as `com.fasterxml.jackson.core.jackson-databind`.
///
/// Only values made of word characters, `.` and `-` that contain at least one `.` are valid.
/// Single-segment names (`core`, `utils`) are too generic to be joined against packages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactIdentity(String);

impl ArtifactIdentity {
    /// Validate a candidate, trimming surrounding whitespace.
    pub fn parse(candidate: &str) -> Option<Self> {
        let candidate = candidate.trim();
        if candidate.contains('.') && identity_pattern().is_match(candidate) {
            Some(ArtifactIdentity(candidate.to_string()))
        } else {
            None
        }
    }

    /// Identity of a maven `groupId:artifactId` pair.
    pub fn from_coordinates(group_id: &str, artifact_id: &str) -> Option<Self> {
        ArtifactIdentity::parse(&format!("{}.{}", group_id.trim(), artifact_id.trim()))
    }

    /// The identity as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identity as an archive directory path, `org.example.example` -> `org/example/example`.
    #[must_use]
    pub fn as_dir(&self) -> String {
        self.0.replace('.', "/")
    }

    /// Returns `true` if the identity equals `package` or continues it after a `.`.
    #[must_use]
    pub fn is_within(&self, package: &str) -> bool {
        is_within_package(&self.0, package)
    }
}

impl fmt::Display for ArtifactIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Returns `true` if `name` equals `package` or starts with `package.`.
#[must_use]
pub fn is_within_package(name: &str, package: &str) -> bool {
    name.strip_prefix(package)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

/// Which archive metadata an identity was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum IdentitySource {
    /// An embedded `META-INF/**/pom.xml`
    BuildDescriptor,
    /// `META-INF/MANIFEST.MF` headers
    Manifest,
    /// An Ant-style `group_artifact-version.jar` file name
    FileName,
    /// Nothing trustworthy was found
    None,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        assert!(ArtifactIdentity::parse("org.example.example").is_some());
        assert!(ArtifactIdentity::parse(" commons-io.commons-io ").is_some());
        assert!(ArtifactIdentity::parse("example").is_none());
        assert!(ArtifactIdentity::parse("Java Runtime Environment").is_none());
        assert!(ArtifactIdentity::parse("${project.groupId}.core").is_none());
        assert_eq!(
            ArtifactIdentity::from_coordinates("org.example", "example")
                .unwrap()
                .as_dir(),
            "org/example/example"
        );
    }

    #[test]
    fn package_boundaries() {
        let identity = ArtifactIdentity::parse("org.example.example").unwrap();
        assert!(identity.is_within("org.example"));
        assert!(identity.is_within("org.example.example"));
        assert!(!identity.is_within("org.exam"));
        assert!(is_within_package("org.example.Foo", "org.example"));
        assert!(!is_within_package("org.examples.Foo", "org.example"));
        assert_eq!(IdentitySource::BuildDescriptor.to_string(), "build-descriptor");
    }
}
