//! Synthetic class files and jars for tests and benchmarks.
//!
//! Builds byte-exact class files with just enough structure for the type
//! index to read: constant pool, access flags, this/super/interfaces and
//! optional fields and methods. No bytecode is emitted.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const ACC_PUBLIC: u16 = 0x0001;
const ACC_INTERFACE: u16 = 0x0200;
const ACC_ABSTRACT: u16 = 0x0400;
const ACC_ANNOTATION: u16 = 0x2000;

/// Builder for a minimal class file.
#[derive(Debug, Clone)]
pub struct ClassFileBuilder {
    name: String,
    access_flags: u16,
    super_name: String,
    interfaces: Vec<String>,
    long_constants: Vec<i64>,
    fields: Vec<String>,
    methods: Vec<String>,
}

impl ClassFileBuilder {
    /// A public class extending `java.lang.Object`.
    pub fn class(name: &str) -> Self {
        Self {
            name: name.to_string(),
            access_flags: ACC_PUBLIC,
            super_name: "java.lang.Object".to_string(),
            interfaces: Vec::new(),
            long_constants: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// A public annotation type (`@interface`).
    pub fn annotation(name: &str) -> Self {
        let mut builder = Self::class(name);
        builder.access_flags = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT | ACC_ANNOTATION;
        builder
            .interfaces
            .push("java.lang.annotation.Annotation".to_string());
        builder
    }

    pub fn with_long_constant(mut self, value: i64) -> Self {
        self.long_constants.push(value);
        self
    }

    pub fn with_field(mut self, name: &str) -> Self {
        self.fields.push(name.to_string());
        self
    }

    pub fn with_method(mut self, name: &str) -> Self {
        self.methods.push(name.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = ConstantPoolWriter::default();
        let this_class = pool.class(&self.name);
        let super_class = pool.class(&self.super_name);
        let interfaces: Vec<u16> = self.interfaces.iter().map(|i| pool.class(i)).collect();
        for value in &self.long_constants {
            pool.long(*value);
        }
        let deprecated = pool.utf8("Deprecated");
        let fields: Vec<(u16, u16)> = self
            .fields
            .iter()
            .map(|f| (pool.utf8(f), pool.utf8("I")))
            .collect();
        let methods: Vec<(u16, u16)> = self
            .methods
            .iter()
            .map(|m| (pool.utf8(m), pool.utf8("()V")))
            .collect();

        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&52u16.to_be_bytes());
        out.extend_from_slice(&pool.count().to_be_bytes());
        out.extend_from_slice(&pool.bytes);
        out.extend_from_slice(&self.access_flags.to_be_bytes());
        out.extend_from_slice(&this_class.to_be_bytes());
        out.extend_from_slice(&super_class.to_be_bytes());
        out.extend_from_slice(&(interfaces.len() as u16).to_be_bytes());
        for index in interfaces {
            out.extend_from_slice(&index.to_be_bytes());
        }
        out.extend_from_slice(&(fields.len() as u16).to_be_bytes());
        for (name, descriptor) in fields {
            write_member(&mut out, name, descriptor, None);
        }
        out.extend_from_slice(&(methods.len() as u16).to_be_bytes());
        for (name, descriptor) in methods {
            write_member(&mut out, name, descriptor, Some(deprecated));
        }
        out.extend_from_slice(&0u16.to_be_bytes());
        out
    }
}

fn write_member(out: &mut Vec<u8>, name: u16, descriptor: u16, attribute: Option<u16>) {
    out.extend_from_slice(&ACC_PUBLIC.to_be_bytes());
    out.extend_from_slice(&name.to_be_bytes());
    out.extend_from_slice(&descriptor.to_be_bytes());
    match attribute {
        Some(attribute_name) => {
            out.extend_from_slice(&1u16.to_be_bytes());
            out.extend_from_slice(&attribute_name.to_be_bytes());
            out.extend_from_slice(&0u32.to_be_bytes());
        }
        None => out.extend_from_slice(&0u16.to_be_bytes()),
    }
}

#[derive(Default)]
struct ConstantPoolWriter {
    bytes: Vec<u8>,
    next_index: u16,
}

impl ConstantPoolWriter {
    fn reserve(&mut self, slots: u16) -> u16 {
        if self.next_index == 0 {
            self.next_index = 1;
        }
        let index = self.next_index;
        self.next_index += slots;
        index
    }

    fn count(&self) -> u16 {
        self.next_index.max(1)
    }

    fn utf8(&mut self, value: &str) -> u16 {
        let index = self.reserve(1);
        self.bytes.push(1);
        self.bytes
            .extend_from_slice(&(value.len() as u16).to_be_bytes());
        self.bytes.extend_from_slice(value.as_bytes());
        index
    }

    fn class(&mut self, dotted_name: &str) -> u16 {
        let name_index = self.utf8(&dotted_name.replace('.', "/"));
        let index = self.reserve(1);
        self.bytes.push(7);
        self.bytes.extend_from_slice(&name_index.to_be_bytes());
        index
    }

    fn long(&mut self, value: i64) -> u16 {
        let index = self.reserve(2);
        self.bytes.push(5);
        self.bytes.extend_from_slice(&value.to_be_bytes());
        index
    }
}

/// Bytes of a plain public class.
pub fn class_bytes(name: &str) -> Vec<u8> {
    ClassFileBuilder::class(name).build()
}

/// Relative path of a class file for a binary name (`demo.Hello` → `demo/Hello.class`).
pub fn class_file_path(name: &str) -> PathBuf {
    PathBuf::from(format!("{}.class", name.replace('.', "/")))
}

/// Write `bytes` as the class file for `name` under `dir`, creating parent
/// directories. Returns the written path.
pub fn write_class_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let target = dir.join(class_file_path(name));
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).expect("create class file parent directory");
    }
    fs::write(&target, bytes).expect("write class file");
    target
}

/// Write a jar containing the given `(binary name, class bytes)` entries.
pub fn write_jar(path: &Path, classes: &[(&str, Vec<u8>)]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create jar parent directory");
    }
    let file = fs::File::create(path).expect("create jar");
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    writer
        .start_file("META-INF/MANIFEST.MF", options)
        .expect("start manifest entry");
    writer
        .write_all(b"Manifest-Version: 1.0\n")
        .expect("write manifest");
    for (name, bytes) in classes {
        let entry = class_file_path(name).to_string_lossy().replace('\\', "/");
        writer.start_file(entry, options).expect("start jar entry");
        writer.write_all(bytes).expect("write jar entry");
    }
    writer.finish().expect("finish jar");
}
