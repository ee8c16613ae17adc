//! Deterministic fixture workspace generator for benchmarks and tests.
//!
//! Generates a workspace of Java projects, each with a `classpath.json`
//! manifest, a jar of Spring annotation types under `lib/`, and controller
//! and service sources under `src/main/java`.
//!
//! All output is deterministic, so benchmarks are reproducible.

use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::class_files::{write_jar, ClassFileBuilder};

/// Annotation types packed into every fixture project's jar.
pub const SPRING_ANNOTATIONS: &[&str] = &[
    "org.springframework.web.bind.annotation.RequestMapping",
    "org.springframework.web.bind.annotation.GetMapping",
    "org.springframework.web.bind.annotation.PostMapping",
    "org.springframework.web.bind.annotation.PutMapping",
    "org.springframework.web.bind.annotation.DeleteMapping",
    "org.springframework.web.bind.annotation.PatchMapping",
    "org.springframework.web.bind.annotation.RestController",
    "org.springframework.stereotype.Component",
    "org.springframework.stereotype.Service",
    "org.springframework.stereotype.Repository",
    "org.springframework.stereotype.Controller",
    "org.springframework.context.annotation.Bean",
    "org.springframework.context.annotation.Configuration",
    "org.springframework.beans.factory.annotation.Autowired",
];

pub const MANIFEST: &str = r#"{
  "entries": [
    { "kind": "source", "path": "src/main/java", "outputFolder": "target/classes" },
    { "kind": "binary", "path": "lib/spring.jar" }
  ]
}
"#;

/// Configuration for generating a fixture workspace.
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub project_count: usize,
    /// Controller/service pairs per project.
    pub files_per_project: usize,
    pub mappings_per_controller: usize,
}

impl FixtureConfig {
    /// Small workspace: 2 projects, 5 pairs each, 3 mappings per controller.
    pub fn small() -> Self {
        Self {
            project_count: 2,
            files_per_project: 5,
            mappings_per_controller: 3,
        }
    }

    /// Medium workspace: 5 projects, 20 pairs each, 5 mappings per controller.
    pub fn medium() -> Self {
        Self {
            project_count: 5,
            files_per_project: 20,
            mappings_per_controller: 5,
        }
    }

    /// Large workspace: 10 projects, 50 pairs each, 8 mappings per controller.
    pub fn large() -> Self {
        Self {
            project_count: 10,
            files_per_project: 50,
            mappings_per_controller: 8,
        }
    }

    /// Symbols a scan with the built-in providers yields: per controller one
    /// `@RestController`, one `@Autowired` and its mappings; per service one
    /// `@Service`.
    pub fn expected_symbol_count(&self) -> usize {
        self.project_count * self.files_per_project * (self.mappings_per_controller + 3)
    }

    pub fn source_file_count(&self) -> usize {
        self.project_count * self.files_per_project * 2
    }
}

fn generate_controller(project: usize, index: usize, config: &FixtureConfig) -> String {
    let mut content = String::new();
    writeln!(content, "package com.example.p{};", project).unwrap();
    content.push('\n');
    writeln!(
        content,
        "import org.springframework.beans.factory.annotation.Autowired;"
    )
    .unwrap();
    writeln!(content, "import org.springframework.web.bind.annotation.*;").unwrap();
    content.push('\n');
    writeln!(content, "@RestController").unwrap();
    writeln!(content, "public class Controller{} {{", index).unwrap();
    writeln!(content, "    @Autowired").unwrap();
    writeln!(content, "    private Service{} service;", index).unwrap();

    for m in 0..config.mappings_per_controller {
        content.push('\n');
        if m % 2 == 0 {
            writeln!(content, "    @GetMapping(\"/p{}/c{}/m{}\")", project, index, m).unwrap();
        } else {
            writeln!(
                content,
                "    @PostMapping(path = \"/p{}/c{}/m{}\")",
                project, index, m
            )
            .unwrap();
        }
        writeln!(content, "    public String handle{}(String body) {{", m).unwrap();
        writeln!(content, "        return service.toString() + body;").unwrap();
        writeln!(content, "    }}").unwrap();
    }
    writeln!(content, "}}").unwrap();
    content
}

fn generate_service(project: usize, index: usize) -> String {
    let mut content = String::new();
    writeln!(content, "package com.example.p{};", project).unwrap();
    content.push('\n');
    writeln!(content, "import org.springframework.stereotype.Service;").unwrap();
    content.push('\n');
    writeln!(content, "@Service").unwrap();
    writeln!(content, "public class Service{} {{", index).unwrap();
    writeln!(content, "    public int size() {{ return {}; }}", index).unwrap();
    writeln!(content, "}}").unwrap();
    content
}

/// Write the annotation jar every fixture project depends on.
pub fn write_spring_jar(path: &Path) {
    let classes: Vec<(&str, Vec<u8>)> = SPRING_ANNOTATIONS
        .iter()
        .map(|name| (*name, ClassFileBuilder::annotation(name).build()))
        .collect();
    write_jar(path, &classes);
}

/// Create a temporary fixture workspace from the given configuration.
///
/// Calling this twice with the same `FixtureConfig` produces byte-identical
/// files.
pub fn create_fixture_workspace(config: &FixtureConfig) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory for fixture workspace");
    write_fixture_workspace(temp_dir.path(), config);
    temp_dir
}

/// Write fixture projects into an existing directory. Returns project roots.
pub fn write_fixture_workspace(dir: &Path, config: &FixtureConfig) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    for p in 0..config.project_count {
        let root = dir.join(format!("project-{}", p));
        let sources = root
            .join("src/main/java/com/example")
            .join(format!("p{}", p));
        fs::create_dir_all(&sources)
            .unwrap_or_else(|e| panic!("Failed to create {}: {}", sources.display(), e));
        fs::create_dir_all(root.join("target/classes")).expect("create output folder");
        fs::write(root.join("classpath.json"), MANIFEST).expect("write manifest");
        write_spring_jar(&root.join("lib/spring.jar"));

        for i in 0..config.files_per_project {
            fs::write(
                sources.join(format!("Controller{}.java", i)),
                generate_controller(p, i, config),
            )
            .expect("write controller");
            fs::write(
                sources.join(format!("Service{}.java", i)),
                generate_service(p, i),
            )
            .expect("write service");
        }
        roots.push(root);
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_grow() {
        let small = FixtureConfig::small();
        let medium = FixtureConfig::medium();
        let large = FixtureConfig::large();
        assert!(small.source_file_count() < medium.source_file_count());
        assert!(medium.source_file_count() < large.source_file_count());
        assert_eq!(small.expected_symbol_count(), 2 * 5 * 6);
    }

    #[test]
    fn test_layout() {
        let config = FixtureConfig::small();
        let workspace = create_fixture_workspace(&config);
        let root = workspace.path().join("project-1");
        assert!(root.join("classpath.json").is_file());
        assert!(root.join("lib/spring.jar").is_file());
        assert!(root
            .join("src/main/java/com/example/p1/Controller4.java")
            .is_file());
        assert!(root.join("src/main/java/com/example/p1/Service0.java").is_file());
    }

    #[test]
    fn test_deterministic_output() {
        let config = FixtureConfig::small();
        let ws1 = create_fixture_workspace(&config);
        let ws2 = create_fixture_workspace(&config);

        for rel in [
            "project-0/classpath.json",
            "project-0/src/main/java/com/example/p0/Controller2.java",
            "project-1/src/main/java/com/example/p1/Service3.java",
            "project-1/lib/spring.jar",
        ] {
            let a = fs::read(ws1.path().join(rel)).unwrap();
            let b = fs::read(ws2.path().join(rel)).unwrap();
            assert_eq!(a, b, "{} should be identical across runs", rel);
        }
    }

    #[test]
    fn test_controller_content() {
        let config = FixtureConfig {
            project_count: 1,
            files_per_project: 1,
            mappings_per_controller: 2,
        };
        let content = generate_controller(0, 0, &config);
        assert!(content.contains("@GetMapping(\"/p0/c0/m0\")"));
        assert!(content.contains("@PostMapping(path = \"/p0/c0/m1\")"));
        assert!(content.contains("@RestController"));
    }

    #[test]
    fn test_generated_files_parse_without_errors() {
        use crate::parser_pool::with_parser;

        let config = FixtureConfig::small();
        for content in [generate_controller(0, 0, &config), generate_service(0, 0)] {
            let tree = with_parser(|parser| parser.parse(&content, None))
                .flatten()
                .expect("parse fixture source");
            assert!(
                !tree.root_node().has_error(),
                "fixture should parse cleanly:\n{}",
                content
            );
        }
    }
}
