//! Test helpers shared by unit tests, integration tests and benchmarks.

pub mod class_files;
pub mod fixture_workspace;
