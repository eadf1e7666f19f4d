//! Jar builder used by the unit tests.

use std::{
    io::{Cursor, Write},
    path::{Path, PathBuf},
};

use zip::{write::SimpleFileOptions, ZipWriter};

use crate::{file::class_entry_name, test::ClassFileBuilder};

/// Collects entries and writes them as a zip archive.
#[derive(Default, Clone)]
pub struct JarBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl JarBuilder {
    pub fn new() -> Self {
        JarBuilder::default()
    }

    pub fn raw(mut self, name: &str, data: Vec<u8>) -> Self {
        self.entries.push((name.to_string(), data));
        self
    }

    /// Add a class under its entry path.
    pub fn class(self, class: ClassFileBuilder) -> Self {
        let entry = class_entry_name(class.name());
        self.raw(&entry, class.build())
    }

    pub fn classes(self, classes: impl IntoIterator<Item = ClassFileBuilder>) -> Self {
        classes.into_iter().fold(self, JarBuilder::class)
    }

    /// Add `META-INF/MANIFEST.MF` with the given header lines.
    pub fn manifest(self, lines: &[&str]) -> Self {
        let mut text = String::from("Manifest-Version: 1.0\r\n");
        for line in lines {
            text.push_str(line);
            text.push_str("\r\n");
        }
        text.push_str("\r\n");
        self.raw("META-INF/MANIFEST.MF", text.into_bytes())
    }

    /// Add a maven `pom.xml` declaring `group:artifact` and the given dependencies.
    pub fn pom(self, group: &str, artifact: &str, dependencies: &[(&str, &str)]) -> Self {
        let mut xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<project>\n  <modelVersion>4.0.0</modelVersion>\n  <groupId>{group}</groupId>\n  <artifactId>{artifact}</artifactId>\n  <version>1.0.0</version>\n  <dependencies>\n"
        );
        for (dep_group, dep_artifact) in dependencies {
            xml.push_str(&format!(
                "    <dependency>\n      <groupId>{dep_group}</groupId>\n      <artifactId>{dep_artifact}</artifactId>\n      <version>1.0.0</version>\n    </dependency>\n"
            ));
        }
        xml.push_str("  </dependencies>\n</project>\n");
        self.pom_xml(group, artifact, &xml)
    }

    /// Add a hand-written `pom.xml` under `META-INF/maven/group/artifact/`.
    pub fn pom_xml(self, group: &str, artifact: &str, xml: &str) -> Self {
        let entry = format!("META-INF/maven/{group}/{artifact}/pom.xml");
        self.raw(&entry, xml.as_bytes().to_vec())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in &self.entries {
            writer
                .start_file(name.as_str(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// Write the archive as `dir/file_name`.
    pub fn write(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, self.to_bytes()).unwrap();
        path
    }
}
