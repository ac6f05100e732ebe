use calibre2komga::cli::{Cli, init_logging, run_cli};
use calibre2komga::output::OutputFormatter;
use clap::Parser;
use std::process;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run_cli(&cli) {
        OutputFormatter::error(&e.to_string());
        process::exit(e.exit_code());
    }
}
