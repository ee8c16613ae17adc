// lib.rs — Library crate behind the `sprig` binary, also used by benches/ and tests/.

pub mod backend;
pub mod change_feed;
pub mod classfile;
pub mod classpath;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod file_snapshot;
pub mod front_end;
pub mod handler;
pub mod parser_pool;
pub mod perf;
pub mod project;
pub mod providers;
pub mod scanner;
pub mod symbols;
pub mod type_index;
pub mod utf16;
// test_utils is available in test builds and when the `test-support` feature is enabled.
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
