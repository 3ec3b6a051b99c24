use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};
use voxshift::io::{read_wav, write_wav};
use voxshift::{EffectDispatcher, EffectKind, EngineConfig};

/// Apply a voice effect to a WAV file.
#[derive(Debug, Parser)]
#[command(name = "voxshift", version, about)]
struct Args {
    /// Input WAV file
    #[arg(required_unless_present = "list")]
    input: Option<PathBuf>,

    /// Where to write the processed WAV file
    #[arg(required_unless_present = "list")]
    output: Option<PathBuf>,

    /// Effect identifier, e.g. `robot` or `autotune`
    #[arg(short, long, default_value = "robot")]
    effect: String,

    /// TOML file overriding the built-in effect settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the available effects and exit
    #[arg(long)]
    list: bool,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    if args.list {
        for kind in EffectKind::all() {
            println!("{:<10} {}", kind.id(), kind.name());
        }
        return Ok(());
    }

    let (Some(input), Some(output)) = (args.input, args.output) else {
        bail!("both an input and an output file are required");
    };
    let kind: EffectKind = args.effect.parse()?;

    let dispatcher = match &args.config {
        Some(path) => {
            let config = EngineConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            EffectDispatcher::from_config(&config).context("invalid effect configuration")?
        }
        None => EffectDispatcher::new(),
    };

    let buffer = read_wav(&input).with_context(|| format!("failed to read {}", input.display()))?;
    info!(
        effect = kind.id(),
        seconds = buffer.duration_secs(),
        sample_rate = buffer.sample_rate(),
        "processing"
    );

    let outcome = dispatcher.apply(buffer, kind);
    if let Some(error) = &outcome.error {
        eprintln!("warning: {} failed ({}), writing the original audio", kind.name(), error);
    }

    write_wav(&output, &outcome.buffer)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(output = %output.display(), "done");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
