use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use spryte::io;
use spryte::replay::{Replayer, Script};
use spryte::{Document, Settings, SharedConfig};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_SETTINGS: &str = "spryte.toml";

#[derive(Parser)]
#[command(name = "spryte", version, about = "Pixel art sprite tool")]
struct Cli {
    /// Settings file (defaults to ./spryte.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print size and frame information about a sprite
    Info { file: PathBuf },

    /// Convert a png, gif or spryte file to png, gif, svg or spryte
    Convert { input: PathBuf, output: PathBuf },

    /// Replay a recorded editing script
    Replay {
        script: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Export every history step of the selected frame instead of the
        /// final frames
        #[arg(long)]
        history: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("spryte=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spryte=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings = match path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None if Path::new(DEFAULT_SETTINGS).exists() => Settings::load(Path::new(DEFAULT_SETTINGS))?,
        None => Settings::default(),
    };
    Ok(settings)
}

fn shared_config(settings: &Settings) -> Result<SharedConfig> {
    Ok(settings.canvas_config()?.shared())
}

fn info_command(file: &Path, config: SharedConfig) -> Result<()> {
    let (width, height) = io::probe_dimensions(file);
    let document =
        Document::open(file, config).with_context(|| format!("failed to open {}", file.display()))?;

    println!("File: {}", file.display());
    println!("Dimensions: {}x{}", width, height);
    println!("Frames: {}", document.frame_count());
    for (index, pixelmap) in document.pixelmaps().iter().enumerate() {
        println!("  frame {}: {} pixels", index, pixelmap.len());
    }
    Ok(())
}

fn convert_command(input: &Path, output: &Path, config: SharedConfig) -> Result<()> {
    let mut document =
        Document::open(input, config).with_context(|| format!("failed to open {}", input.display()))?;
    let written = document.save(output)?;

    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn replay_command(script: &Path, output: &Path, history: bool, config: SharedConfig) -> Result<()> {
    let script = Script::from_file(script)?;
    info!(
        width = script.width,
        height = script.height,
        actions = script.actions.len(),
        "replaying script"
    );

    let mut replayer = Replayer::new(config);
    replayer.run(&script)?;

    let written = if history {
        let frames = replayer.history_frames();
        let delay = replayer.document().config().borrow().frame_delay_ms();
        println!("Exporting {} history steps", frames.len());
        io::save(&frames, output, delay)?
    } else {
        replayer.into_document().save(output)?
    };

    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = load_settings(cli.config.as_deref())?;
    let config = shared_config(&settings)?;

    match cli.command {
        Command::Info { file } => info_command(&file, config),
        Command::Convert { input, output } => convert_command(&input, &output, config),
        Command::Replay {
            script,
            output,
            history,
        } => replay_command(&script, &output, history, config),
    }
}
