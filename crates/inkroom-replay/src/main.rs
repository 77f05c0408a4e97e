//! Inkroom replay: runs a recorded canvas session and writes its exports.

mod replay;

use clap::Parser;
use inkroom_core::CanvasConfig;
use std::path::PathBuf;

/// Replay a JSON event script against an in-memory room and export the result.
#[derive(Debug, Parser)]
#[command(name = "inkroom-replay", version)]
struct Args {
    /// Script of canvas events, remote edits and presence changes.
    script: PathBuf,
    /// Directory the SVG, PNG and JSON exports are written to.
    #[arg(long, short, default_value = "out")]
    out_dir: PathBuf,
    /// Canvas config (JSON). Defaults apply when omitted.
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// File stem for the exports.
    #[arg(long, default_value = "canvas")]
    name: String,
    /// Connection id of the local user.
    #[arg(long, default_value_t = 1)]
    connection_id: u32,
}

fn main() {
    env_logger::init();
    log::info!("Starting Inkroom replay");

    let args = Args::parse();
    if let Err(e) = run(&args) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), replay::ReplayError> {
    let config = match &args.config {
        Some(path) => CanvasConfig::load(path)?,
        None => CanvasConfig::default(),
    };
    let script = replay::Script::load(&args.script)?;
    let session = replay::replay(&script, config, args.connection_id)?;
    for path in session.write_exports(&args.out_dir, &args.name)? {
        println!("{}", path.display());
    }
    Ok(())
}
