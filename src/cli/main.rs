use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use photo_md::config::Config;
use photo_md::driver::{self, Failure};
use photo_md::operation::Console;

#[derive(Parser, Debug)]
#[command(
    name = "md",
    version,
    about = "View, check and edit photo metadata across EXIF, IPTC and XMP",
    after_help = "\
Usage: md [batch] [next|prev|first|all|select] [operation...] [file...]

Operations:                  Fields:
  show [field...]              a(rtist)       d(atetime)   t(itle)
  tags [field...]              c(aption)      g(ps)        l(ocation)
  check [field...]             k(eyword)s     person/people
  set field value              face(s)        place(s)
  add field value              group(s)       topic(s)
  remove field value           all
  clear field
  choose field
  copy [field...]
  reset [field...]
  read caption
  write caption"
)]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Path to config file (default: $MD_CONFIG or ~/.config/md/config.json)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write a default config file and exit
    #[arg(long = "init-config")]
    init_config: bool,

    /// Operations and files
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    if cli.init_config {
        let path = Config::default().save(cli.config.as_deref())?;
        println!("Default config written to {}", path.display());
        return Ok(0);
    }

    let config = Config::load(cli.config.as_deref())?;

    // Set up logging
    let log_level = if cli.verbose || config.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let defaults = config.default_fields()?;
    let invocation = match driver::parse_command_line(&cli.args, &defaults) {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("ERROR: {e}");
            eprintln!("Run `md --help` for usage.");
            return Ok(2);
        }
    };
    log::debug!("{invocation:?}");

    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let cwd = cwd.to_string_lossy();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut output = stdout.lock();
    let mut console = Console {
        input: &mut input,
        output: &mut output,
    };

    let result = driver::execute(invocation, &config, &cwd, &mut console);
    output.flush().ok();
    match result {
        Ok(summary) => {
            for path in &summary.failed {
                log::debug!("failed: {path}");
            }
            Ok(summary.exit_code() as u8)
        }
        Err(e) => {
            eprintln!("ERROR: {e}");
            Ok(exit_status(&e))
        }
    }
}

fn exit_status(e: &Failure) -> u8 {
    e.exit_code() as u8
}
