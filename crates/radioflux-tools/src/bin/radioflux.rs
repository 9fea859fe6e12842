//! radioflux: report beam-normalized flux densities of regions in FITS maps.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use radioflux::pipeline::DEFAULT_FOREGROUND;
use radioflux::{Diagnostics, FluxOptions, FluxPipeline, ReportRow};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "radioflux")]
#[command(about = "Measure the flux density inside DS9 regions of radio maps")]
#[command(version)]
struct Cli {
    /// FITS images to measure.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Foreground region file.
    #[arg(short, long, default_value = DEFAULT_FOREGROUND)]
    foreground: PathBuf,

    /// Background region file; its RMS gives the error column.
    #[arg(short, long)]
    background: Option<PathBuf>,

    /// Report each foreground region separately.
    #[arg(short, long)]
    individual: bool,

    /// Subtract the mean of the background region.
    #[arg(short, long)]
    subtract: bool,

    /// Log debugging detail to stderr.
    #[arg(short, long)]
    verbose: bool,

    /// Continue with the next image after a failure.
    #[arg(long)]
    keep_going: bool,
}

impl Cli {
    fn options(&self) -> FluxOptions {
        FluxOptions {
            foreground: self.foreground.clone(),
            background: self.background.clone(),
            individual: self.individual,
            subtract_background: self.subtract,
        }
    }
}

fn format_rows(rows: &[ReportRow]) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&row.to_string());
        out.push('\n');
    }
    out
}

/// Measure every image. Returns the report and the number of failed images.
fn run(cli: &Cli) -> CliResult<(String, usize)> {
    let pipeline = FluxPipeline::new(cli.options());
    let mut out = String::new();
    let mut failed = 0;
    for path in &cli.files {
        let mut diagnostics = Diagnostics::new();
        match pipeline.process(path, &mut diagnostics) {
            Ok(rows) => out.push_str(&format_rows(&rows)),
            Err(e) if cli.keep_going => {
                eprintln!("{}: {}", path.display(), e);
                failed += 1;
            }
            Err(e) => return Err(format!("{}: {}", path.display(), e).into()),
        }
    }
    Ok((out, failed))
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok((output, failed)) => {
            print!("{}", output);
            if failed > 0 {
                process::exit(1);
            }
        }
        Err(msg) => {
            eprintln!("{}", msg);
            process::exit(1);
        }
    }
}
