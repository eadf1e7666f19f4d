//! Maven `pom.xml` reading.
//!
//! Only the coordinates needed for dependency joins are extracted: the project's own
//! `groupId`/`artifactId` (with the parent's `groupId` as fallback) and the coordinates of each
//! `<dependencies>/<dependency>`. Managed dependencies, plugins and profiles are ignored.

use quick_xml::{events::Event, Reader};

use crate::{dependencies::ArtifactIdentity, Result};

const PROJECT_GROUP: &str = "${project.groupId}";
const PROJECT_ARTIFACT: &str = "${project.artifactId}";

/// Coordinates of a declared dependency, placeholders unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coordinates {
    /// `groupId`
    pub group_id: Option<String>,
    /// `artifactId`
    pub artifact_id: Option<String>,
}

/// The parts of a pom that matter for dependency resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomModel {
    /// `project/groupId`
    pub group_id: Option<String>,
    /// `project/artifactId`
    pub artifact_id: Option<String>,
    /// `project/parent/groupId`
    pub parent_group_id: Option<String>,
    /// `project/dependencies/dependency`
    pub dependencies: Vec<Coordinates>,
}

impl PomModel {
    /// Parse a `pom.xml` document.
    ///
    /// # Errors
    /// Returns [`crate::Error::XmlError`] for documents that are not well-formed.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(data);
        reader.config_mut().trim_text(true);

        let mut model = PomModel::default();
        let mut path: Vec<String> = Vec::new();
        let mut buffer = Vec::new();

        loop {
            match reader.read_event_into(&mut buffer)? {
                Event::Start(element) => {
                    let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
                    if name == "dependency" && path_is(&path, &["project", "dependencies"]) {
                        model.dependencies.push(Coordinates::default());
                    }
                    path.push(name);
                }
                Event::End(_) => {
                    path.pop();
                }
                Event::Text(text) => {
                    let value = text.unescape()?.trim().to_string();
                    if !value.is_empty() {
                        model.assign(&path, value);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buffer.clear();
        }

        Ok(model)
    }

    fn assign(&mut self, path: &[String], value: String) {
        if path_is(path, &["project", "groupId"]) {
            self.group_id = Some(value);
        } else if path_is(path, &["project", "artifactId"]) {
            self.artifact_id = Some(value);
        } else if path_is(path, &["project", "parent", "groupId"]) {
            self.parent_group_id = Some(value);
        } else if let Some(dependency) = self.dependencies.last_mut() {
            if path_is(path, &["project", "dependencies", "dependency", "groupId"]) {
                dependency.group_id = Some(value);
            } else if path_is(path, &["project", "dependencies", "dependency", "artifactId"]) {
                dependency.artifact_id = Some(value);
            }
        }
    }

    /// Effective project group, falling back to the parent's.
    #[must_use]
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or(self.parent_group_id.as_deref())
    }

    /// `groupId.artifactId` of the project itself.
    #[must_use]
    pub fn identity(&self) -> Option<ArtifactIdentity> {
        ArtifactIdentity::from_coordinates(self.effective_group_id()?, self.artifact_id.as_deref()?)
    }

    /// Identities of all declared dependencies with project placeholders substituted.
    ///
    /// Dependencies with missing coordinates or unresolvable placeholders are dropped.
    #[must_use]
    pub fn dependency_identities(&self) -> Vec<ArtifactIdentity> {
        let group = self.effective_group_id().unwrap_or_default();
        let artifact = self.artifact_id.as_deref().unwrap_or_default();
        let substitute = |value: &str| {
            value
                .replace(PROJECT_GROUP, group)
                .replace(PROJECT_ARTIFACT, artifact)
        };

        let mut identities: Vec<ArtifactIdentity> = self
            .dependencies
            .iter()
            .filter_map(|dependency| {
                let group_id = substitute(dependency.group_id.as_deref()?);
                let artifact_id = substitute(dependency.artifact_id.as_deref()?);
                ArtifactIdentity::from_coordinates(&group_id, &artifact_id)
            })
            .collect();
        identities.sort();
        identities.dedup();
        identities
    }
}

fn path_is(path: &[String], expected: &[&str]) -> bool {
    path.len() == expected.len() && path.iter().zip(expected).all(|(a, b)| a == b)
}
