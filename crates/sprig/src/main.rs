//
// main.rs
//
// Entry point: language server over stdio or one-shot subcommands
//

use std::env;

use sprig::{backend, cli};

fn print_usage() {
    println!(
        "sprig {}, a workspace symbol server for annotated JVM projects.",
        env!("CARGO_PKG_VERSION")
    );
    print!(
        r#"
Usage: sprig [OPTIONS]
       sprig symbols <path> [--json] [--reserved-prefix <p>]... [--threads <n>] [--manifest <name>]

Available options:

--stdio                      Start the LSP server using stdio transport
--version                    Print the version
--help                       Print this help message

Subcommands:

symbols <path>               Scan <path> once and print its workspace symbols

"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut argv = env::args();
    argv.next(); // skip executable name

    let mut use_stdio = false;

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--stdio" => use_stdio = true,
            "--version" => {
                println!("sprig {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_usage();
                return Ok(());
            }
            "symbols" => {
                env_logger::init();
                let args = cli::symbols::parse_args(&mut argv).map_err(|e| anyhow::anyhow!(e))?;
                let outcome = tokio::task::spawn_blocking({
                    let args = args.clone();
                    move || cli::symbols::run_symbols(&args)
                })
                .await??;
                if args.json {
                    cli::symbols::print_outcome_json(&outcome)?;
                } else {
                    cli::symbols::print_outcome(&outcome, &args.path.canonicalize()?);
                }
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("Unknown argument: '{other}'"));
            }
        }
    }

    if !use_stdio {
        print_usage();
        return Ok(());
    }

    env_logger::init();

    backend::start_lsp().await
}
