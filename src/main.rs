#![forbid(unsafe_code)]

//! glsched — CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run_cli(&args) {
        eprintln!("glsched: {e}");
        std::process::exit(1);
    }
}
