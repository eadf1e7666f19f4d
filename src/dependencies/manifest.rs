//! `META-INF/MANIFEST.MF` reading and identity derivation.

use std::sync::OnceLock;

use regex::Regex;

use crate::dependencies::ArtifactIdentity;

static ANT_FILE_NAME: OnceLock<Regex> = OnceLock::new();

fn ant_file_name() -> &'static Regex {
    ANT_FILE_NAME.get_or_init(|| {
        Regex::new(r"^([\w.-]+)_([\w-]+)-((\d+\.\d+(\.\d+)*|\d+)[\w+.-]*\.jar)$")
            .expect("file name pattern is a valid regex")
    })
}

type Section = Vec<(String, String)>;

/// A parsed manifest: the main section and the per-entry sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    main: Section,
    entries: Vec<Section>,
}

impl Manifest {
    /// Parse manifest text. Continuation lines (starting with one space) are joined, malformed
    /// lines are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut sections: Vec<Section> = vec![Vec::new()];
        let mut logical: Vec<String> = Vec::new();

        let flush = |logical: &mut Vec<String>, sections: &mut Vec<Section>| {
            for line in logical.drain(..) {
                if let Some((name, value)) = line.split_once(':') {
                    if let Some(section) = sections.last_mut() {
                        section.push((name.trim().to_string(), value.trim().to_string()));
                    }
                }
            }
        };

        for raw in text.lines() {
            let line = raw.trim_end_matches('\r');
            if let Some(continuation) = line.strip_prefix(' ') {
                if let Some(last) = logical.last_mut() {
                    last.push_str(continuation);
                }
            } else if line.is_empty() {
                flush(&mut logical, &mut sections);
                if sections.last().is_some_and(|section| !section.is_empty()) {
                    sections.push(Vec::new());
                }
            } else {
                logical.push(line.to_string());
            }
        }
        flush(&mut logical, &mut sections);
        sections.retain(|section| !section.is_empty());

        let mut sections = sections.into_iter();
        Manifest {
            main: sections.next().unwrap_or_default(),
            entries: sections.collect(),
        }
    }

    /// Value of a main section header, names compared case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        find(&self.main, name)
    }

    /// Values of a header across all per-entry sections.
    pub fn entry_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter_map(move |section| find(section, name))
    }

    /// The first trustworthy identity, trying the headers in their fixed order.
    #[must_use]
    pub fn identity(&self) -> Option<ArtifactIdentity> {
        let symbolic_name = self
            .get("Bundle-SymbolicName")
            .map(|value| cut_at(value, ';'));

        let main_candidates = [
            self.get("Automatic-Module-Name").map(str::to_string),
            self.get("Implementation-Vendor-Id").map(str::to_string),
            self.get("Implementation-Title")
                .map(|value| cut_at(value, ';').replace('#', ".")),
            symbolic_name.map(str::to_string),
            self.import_package_identity(symbolic_name),
        ];

        main_candidates
            .into_iter()
            .flatten()
            .chain(
                self.entry_values("Implementation-Title")
                    .map(|value| cut_at(value, ';').replace('#', ".")),
            )
            .find_map(|candidate| ArtifactIdentity::parse(&candidate))
    }

    fn import_package_identity(&self, symbolic_name: Option<&str>) -> Option<String> {
        let symbolic_name = symbolic_name?;
        let imports = self.get("Import-Package")?;
        let first = imports
            .split([',', ';'])
            .next()
            .map(str::trim)
            .filter(|package| !package.is_empty())?;
        Some(format!("{first}.{symbolic_name}"))
    }
}

fn find<'a>(section: &'a Section, name: &str) -> Option<&'a str> {
    section
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn cut_at(value: &str, separator: char) -> &str {
    value.split(separator).next().unwrap_or(value).trim()
}

/// Identity from an Ant-style file name such as `org.eclipse.core_runtime-20070801.jar`.
///
/// The name must contain exactly one `_`, separating group and artifact.
#[must_use]
pub fn file_name_identity(file_name: &str) -> Option<ArtifactIdentity> {
    if file_name.matches('_').count() != 1 {
        return None;
    }
    let captures = ant_file_name().captures(file_name)?;
    ArtifactIdentity::from_coordinates(captures.get(1)?.as_str(), captures.get(2)?.as_str())
}
