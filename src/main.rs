use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueHint};

use hackvm::bootstrap::ENTRY_FUNCTION;
use hackvm::driver::{self, BootstrapMode, Options};
use hackvm::logging;

/// Translate VM code to Hack assembly
#[derive(Debug, Parser)]
#[command(name = "hackvm", version, arg_required_else_help = true)]
struct Cli {
    /// A VM language file or directory of files
    #[arg(value_name = "INPUT", value_hint = ValueHint::AnyPath)]
    input: PathBuf,

    /// Output file (defaults to <stem>.asm, or <dir>/<dir>.asm)
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Always emit the bootstrap, even for a single file
    #[arg(long, conflicts_with = "no_bootstrap")]
    bootstrap: bool,

    /// Never emit the bootstrap, even for a directory
    #[arg(long)]
    no_bootstrap: bool,

    /// Function called by the bootstrap
    #[arg(long, value_name = "NAME", default_value = ENTRY_FUNCTION)]
    entry: String,

    /// Omit the `// <command>` annotation lines
    #[arg(long)]
    no_comments: bool,

    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn options(&self) -> Options {
        let bootstrap = if self.bootstrap {
            BootstrapMode::Always
        } else if self.no_bootstrap {
            BootstrapMode::Never
        } else {
            BootstrapMode::Auto
        };
        Options {
            bootstrap,
            entry: self.entry.clone(),
            annotate: !self.no_comments,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = logging::init(cli.verbose) {
        eprintln!("failed to initialize logging: {err}");
    }

    match driver::run(&cli.input, cli.output.as_deref(), &cli.options()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
