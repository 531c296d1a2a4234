//! s3up - upload glob-selected files to S3-compatible object storage

mod commands;
mod exit_code;
mod output;
mod tracing_init;

use clap::Parser;

use crate::commands::upload::UploadArgs;
use crate::output::OutputConfig;
use crate::tracing_init::TracingConfig;

/// Upload files matching glob patterns to an S3-compatible bucket
#[derive(Parser, Debug)]
#[command(name = "s3up", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    upload: UploadArgs,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Only print warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_init::init_tracing(&TracingConfig::from_flags(
        cli.debug,
        cli.quiet,
        cli.no_color,
    ));

    let output_config = OutputConfig {
        no_color: cli.no_color,
        quiet: cli.quiet,
    };

    let code = commands::upload::execute(cli.upload, output_config).await;
    std::process::exit(code.as_i32());
}
