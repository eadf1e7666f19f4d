//! Minimal class file and jar writers for the integration tests.

#![allow(dead_code)]

use std::{
    io::{Cursor, Write},
    path::{Path, PathBuf},
};

use zip::{write::SimpleFileOptions, ZipWriter};

pub const PUBLIC: u16 = 0x0001;
pub const PRIVATE: u16 = 0x0002;
pub const STATIC: u16 = 0x0008;
pub const ABSTRACT: u16 = 0x0400;

#[derive(Default)]
struct Pool {
    bytes: Vec<u8>,
    count: u16,
}

impl Pool {
    fn entry(&mut self, tag: u8, body: &[u8]) -> u16 {
        self.count += 1;
        self.bytes.push(tag);
        self.bytes.extend_from_slice(body);
        self.count
    }

    fn utf8(&mut self, value: &str) -> u16 {
        let mut body = (value.len() as u16).to_be_bytes().to_vec();
        body.extend_from_slice(value.as_bytes());
        self.entry(1, &body)
    }

    fn class(&mut self, dotted: &str) -> u16 {
        let name = self.utf8(&dotted.replace('.', "/"));
        self.entry(7, &name.to_be_bytes())
    }

    fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str, interface: bool) -> u16 {
        let class = self.class(owner);
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let mut nat = name.to_be_bytes().to_vec();
        nat.extend_from_slice(&descriptor.to_be_bytes());
        let nat = self.entry(12, &nat);
        let mut body = class.to_be_bytes().to_vec();
        body.extend_from_slice(&nat.to_be_bytes());
        self.entry(if interface { 11 } else { 10 }, &body)
    }
}

struct Method {
    name: String,
    descriptor: String,
    access: u16,
    calls: Vec<(u8, String, String, String)>,
}

/// Writes one class file with methods whose bodies are only call instructions.
pub struct ClassWriter {
    name: String,
    super_name: String,
    interfaces: Vec<String>,
    access: u16,
    methods: Vec<Method>,
}

impl ClassWriter {
    pub fn class(name: &str) -> Self {
        ClassWriter {
            name: name.to_string(),
            super_name: "java.lang.Object".to_string(),
            interfaces: Vec::new(),
            access: 0x0021,
            methods: Vec::new(),
        }
    }

    pub fn interface(name: &str) -> Self {
        ClassWriter {
            access: 0x0601,
            ..ClassWriter::class(name)
        }
    }

    pub fn extends(mut self, name: &str) -> Self {
        self.super_name = name.to_string();
        self
    }

    pub fn implements(mut self, name: &str) -> Self {
        self.interfaces.push(name.to_string());
        self
    }

    pub fn method(mut self, name: &str, descriptor: &str, access: u16) -> Self {
        self.methods.push(Method {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access,
            calls: Vec::new(),
        });
        self
    }

    fn call(mut self, opcode: u8, owner: &str, name: &str, descriptor: &str) -> Self {
        if let Some(method) = self.methods.last_mut() {
            method
                .calls
                .push((opcode, owner.to_string(), name.to_string(), descriptor.to_string()));
        }
        self
    }

    /// Append an `invokevirtual` to the last added method.
    pub fn calls_virtual(self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.call(0xb6, owner, name, descriptor)
    }

    pub fn calls_static(self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.call(0xb8, owner, name, descriptor)
    }

    pub fn calls_interface(self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.call(0xb9, owner, name, descriptor)
    }

    pub fn entry_name(&self) -> String {
        format!("{}.class", self.name.replace('.', "/"))
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = Pool::default();
        let this = pool.class(&self.name);
        let super_index = pool.class(&self.super_name);
        let interfaces: Vec<u16> = self.interfaces.iter().map(|name| pool.class(name)).collect();
        let code_name = pool.utf8("Code");

        let mut methods = Vec::new();
        for method in &self.methods {
            let name = pool.utf8(&method.name);
            let descriptor = pool.utf8(&method.descriptor);
            methods.extend_from_slice(&method.access.to_be_bytes());
            methods.extend_from_slice(&name.to_be_bytes());
            methods.extend_from_slice(&descriptor.to_be_bytes());

            if method.access & ABSTRACT != 0 {
                methods.extend_from_slice(&0u16.to_be_bytes());
                continue;
            }

            let mut code = Vec::new();
            for (opcode, owner, name, descriptor) in &method.calls {
                let interface = *opcode == 0xb9;
                let index = pool.method_ref(owner, name, descriptor, interface);
                code.push(*opcode);
                code.extend_from_slice(&index.to_be_bytes());
                if interface {
                    code.extend_from_slice(&[1, 0]);
                }
            }
            code.push(0xb1);

            methods.extend_from_slice(&1u16.to_be_bytes());
            methods.extend_from_slice(&code_name.to_be_bytes());
            methods.extend_from_slice(&((12 + code.len()) as u32).to_be_bytes());
            methods.extend_from_slice(&8u16.to_be_bytes());
            methods.extend_from_slice(&8u16.to_be_bytes());
            methods.extend_from_slice(&(code.len() as u32).to_be_bytes());
            methods.extend_from_slice(&code);
            methods.extend_from_slice(&0u16.to_be_bytes());
            methods.extend_from_slice(&0u16.to_be_bytes());
        }

        let mut out = 0xCAFE_BABEu32.to_be_bytes().to_vec();
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&52u16.to_be_bytes());
        out.extend_from_slice(&(pool.count + 1).to_be_bytes());
        out.extend_from_slice(&pool.bytes);
        out.extend_from_slice(&self.access.to_be_bytes());
        out.extend_from_slice(&this.to_be_bytes());
        out.extend_from_slice(&super_index.to_be_bytes());
        out.extend_from_slice(&(interfaces.len() as u16).to_be_bytes());
        for index in interfaces {
            out.extend_from_slice(&index.to_be_bytes());
        }
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&(self.methods.len() as u16).to_be_bytes());
        out.extend_from_slice(&methods);
        out.extend_from_slice(&0u16.to_be_bytes());
        out
    }
}

/// Write `dir/file_name` holding a maven `pom.xml` and the given classes.
pub fn write_jar(
    dir: &Path,
    file_name: &str,
    coordinates: (&str, &str),
    dependencies: &[(&str, &str)],
    classes: &[ClassWriter],
) -> PathBuf {
    let (group, artifact) = coordinates;
    let mut pom = format!(
        "<project>\n  <groupId>{group}</groupId>\n  <artifactId>{artifact}</artifactId>\n  <version>1.0.0</version>\n  <dependencies>\n"
    );
    for (dep_group, dep_artifact) in dependencies {
        pom.push_str(&format!(
            "    <dependency>\n      <groupId>{dep_group}</groupId>\n      <artifactId>{dep_artifact}</artifactId>\n      <version>1.0.0</version>\n    </dependency>\n"
        ));
    }
    pom.push_str("  </dependencies>\n</project>\n");

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(
            format!("META-INF/maven/{group}/{artifact}/pom.xml"),
            SimpleFileOptions::default(),
        )
        .unwrap();
    writer.write_all(pom.as_bytes()).unwrap();
    for class in classes {
        writer
            .start_file(class.entry_name(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(&class.build()).unwrap();
    }
    let bytes = writer.finish().unwrap().into_inner();

    let path = dir.join(file_name);
    std::fs::write(&path, bytes).unwrap();
    path
}
