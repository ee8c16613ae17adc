// cli/mod.rs — one-shot subcommands run without the language server

pub mod symbols;
