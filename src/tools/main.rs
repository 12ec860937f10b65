use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use nd_flopp_tools::restore;

const AFTER_HELP: &str = "\
This tool recreates an ND filesystem image from floppy disks or floppy disk
images originally made with the SINTRAN-III backup utility \"WINCH-TO-FLOPP\".
If no output file is specified with -o then this tool only writes information
about the backup volume(s).";

#[derive(Parser, Debug)]
#[clap(
    name = "flopp-to-winch",
    about = "Restore an ND filesystem image from WINCH-TO-FLOPP backup volumes",
    after_help = AFTER_HELP,
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Cli {
    /// Write decoded image to <OUTPUT_FILE>.
    /// The file is updated if it exists already, so volumes can be added
    /// one or more at a time.
    #[clap(short = 'o', value_name = "OUTPUT_FILE")]
    output: Option<PathBuf>,

    /// Print this help and exit
    #[clap(short = 'h', action = ArgAction::SetTrue)]
    help: bool,

    /// Show version number and exit
    #[clap(short = 'V', action = ArgAction::SetTrue)]
    version: bool,

    /// Backup volume files or floppy devices, processed left to right
    #[clap(name = "VOLUME_FILE")]
    volumes: Vec<PathBuf>,
}

fn usage() -> Result<ExitCode> {
    let help = Cli::command().render_help();
    write!(io::stderr(), "{help}").context("writing usage")?;
    Ok(ExitCode::FAILURE)
}

fn run() -> Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            writeln!(io::stderr(), "{}", err.render()).context("writing usage")?;
            return usage();
        }
    };

    if cli.version {
        // Exits with failure like the help, scripts rely on it
        writeln!(
            io::stderr(),
            "flopp-to-winch: Tool to restore image from backup floppies, version {}",
            clap::crate_version!()
        )
        .context("writing version")?;
        return Ok(ExitCode::FAILURE);
    }

    if cli.help || cli.volumes.is_empty() {
        return usage();
    }

    let summary = restore(
        &cli.volumes,
        cli.output.as_deref(),
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    );
    io::stdout().flush().context("flushing volume report")?;

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("flopp-to-winch: {err:#}");
            ExitCode::FAILURE
        }
    }
}
