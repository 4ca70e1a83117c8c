use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uireplay::manager::{Backend, Manager, TraceBackend, UinputBackend};
use uireplay::parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Script to replay, or `-` to read it from stdin
    script: String,

    /// uinput node to create devices through
    #[arg(long, env = "UIREPLAY_UINPUT", default_value = "/dev/uinput")]
    uinput: PathBuf,

    /// Print the device calls as JSON lines instead of creating devices
    #[arg(long)]
    dry_run: bool,
}

fn open_script(script: &str) -> anyhow::Result<Box<dyn BufRead>> {
    if script == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(script).with_context(|| format!("failed to open script {}", script))?;
    Ok(Box::new(BufReader::new(file)))
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries sync and vibration reports
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let reader = open_script(&args.script)?;
    let (dialect, mut source) = parser::open(reader).context("failed to read script")?;
    tracing::info!("Replaying {} script {}", dialect, args.script);

    let backend: Box<dyn Backend> = if args.dry_run {
        Box::new(TraceBackend::stdout())
    } else {
        tracing::debug!("Using uinput node {}", args.uinput.display());
        Box::new(UinputBackend::with_path(&args.uinput))
    };

    let mut manager = Manager::new(backend);
    if let Err(e) = manager.run(source.as_mut()) {
        tracing::error!("Replay failed: {}", e);
        return Err(e.into());
    }

    tracing::info!("Replay finished");
    Ok(())
}
