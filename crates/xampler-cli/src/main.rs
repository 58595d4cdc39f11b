//! xampler - inspect sample instruments and simulate triggers
//!
//! Loads a JSON descriptor or an SFZ file, shows how its regions
//! consolidate, and plays notes against the offline engine.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use xampler_core::{
    EngineHandles, InstrumentDescriptor, OfflineEngine, Sampler, SamplerConfig, WavBufferPool,
};

#[derive(Parser)]
#[command(name = "xampler")]
#[command(author, version, about = "Sample instrument inspector and offline player", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (default: ~/.config/xampler/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory asset paths are resolved under (default: the instrument's directory)
    #[arg(long, global = true)]
    asset_root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the consolidated regions
    Regions {
        /// Instrument file (.json or .sfz)
        file: PathBuf,
    },
    /// Print the sample assets and whether they were found
    Assets {
        /// Instrument file (.json or .sfz)
        file: PathBuf,
    },
    /// Resolve the playback parameters of one trigger
    Params {
        /// Instrument file (.json or .sfz)
        file: PathBuf,
        /// MIDI note number
        #[arg(short, long)]
        note: i32,
        /// Lookup velocity (0-127)
        #[arg(short, long, default_value = "127")]
        velocity: i32,
    },
    /// Trigger notes against the offline engine
    Play {
        /// Instrument file (.json or .sfz)
        file: PathBuf,
        /// Notes to trigger together, e.g. 60,64,67
        #[arg(short, long, value_delimiter = ',', required = true)]
        notes: Vec<i32>,
        /// Start time in seconds
        #[arg(short, long, default_value = "0")]
        time: f64,
        /// Velocity as a fraction (0.0-1.0)
        #[arg(short, long, default_value = "1.0")]
        velocity: f64,
    },
    /// Create a default configuration file
    InitConfig,
    /// Show the configuration file path
    ConfigPath,
}

/// A sampler wired to the offline engine.
struct Session {
    sampler: Sampler,
    offline: Arc<OfflineEngine>,
    pool: Arc<WavBufferPool>,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let file = match &cli.command {
        Commands::InitConfig => {
            let path = SamplerConfig::create_default_config_file()?;
            println!("Created default config at: {}", path.display());
            return Ok(());
        }
        Commands::ConfigPath => {
            let path = SamplerConfig::config_path()?;
            println!("{}", path.display());
            return Ok(());
        }
        Commands::Regions { file }
        | Commands::Assets { file }
        | Commands::Params { file, .. }
        | Commands::Play { file, .. } => file.clone(),
    };

    // Load config
    let mut config = match &cli.config {
        Some(path) => SamplerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SamplerConfig::load_or_default(),
    };

    // Apply CLI overrides
    if let Some(root) = cli.asset_root {
        config.asset_root = Some(root);
    }

    let session = open_session(&file, config)?;

    match cli.command {
        Commands::Regions { .. } => {
            let json = serde_json::to_string_pretty(session.sampler.regions())
                .context("Failed to serialize regions")?;
            println!("{}", json);
        }
        Commands::Assets { .. } => {
            for asset in session.sampler.assets() {
                let path = session.pool.resolve(&asset.path);
                let status = if path.exists() { "ok" } else { "missing" };
                println!("{:<8} {} -> {}", status, asset.path, path.display());
            }
        }
        Commands::Params { note, velocity, .. } => {
            match session.sampler.get_trigger_params(note, velocity) {
                Some(params) => println!(
                    "{}",
                    serde_json::to_string_pretty(&params).context("Failed to serialize parameters")?
                ),
                None => println!("No region found for note {} velocity {}", note, velocity),
            }
        }
        Commands::Play {
            notes,
            time,
            velocity,
            ..
        } => play(&session, notes, time, velocity)?,
        Commands::InitConfig | Commands::ConfigPath => {}
    }

    Ok(())
}

fn open_session(file: &Path, config: SamplerConfig) -> Result<Session> {
    let descriptor = InstrumentDescriptor::from_path(file)
        .with_context(|| format!("Failed to load instrument {}", file.display()))?;

    let root = match &config.asset_root {
        Some(root) => root.clone(),
        None => file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    log::debug!("Resolving assets under {}", root.display());

    let pool = Arc::new(WavBufferPool::new(root));
    let offline = Arc::new(OfflineEngine::new());
    let engine = EngineHandles::new(pool.clone(), offline.clone(), offline.clone());
    let sampler = Sampler::new(&descriptor, engine, config);

    Ok(Session {
        sampler,
        offline,
        pool,
    })
}

fn play(session: &Session, notes: Vec<i32>, time: f64, velocity: f64) -> Result<()> {
    session
        .sampler
        .trigger_attack_with_velocity(notes, time, velocity);

    let starts = session.offline.starts();
    println!(
        "{}",
        serde_json::to_string_pretty(&starts).context("Failed to serialize scheduled starts")?
    );
    println!(
        "{} of {} sources started, {} voices active",
        starts.len(),
        session.offline.sources_created(),
        session.sampler.voices().active_count()
    );

    let finished = session.offline.finish_all();
    println!(
        "Finished {} voices, {} still active",
        finished,
        session.sampler.voices().active_count()
    );
    Ok(())
}
