//! CLI entry point for seam-consistent tile stylization

use clap::Parser;
use seamweave::io::cli::{Cli, CommandRunner};
use seamweave::io::logging::init_logging;

fn main() -> seamweave::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet);
    let mut runner = CommandRunner::new(cli);
    runner.run()
}
