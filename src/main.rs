use std::path::PathBuf;

use anyhow::Context as _;
use asset_orchestrator::{
    AssetManager, LoadOutcome, LoaderConfig, MemoryAudio, MemoryFetchEngine,
};
use clap::Parser;
use log::info;

/// Run one load session from a manifest against the in-memory collaborators
#[derive(Parser, Debug)]
#[command(name = "asset-orchestrator", version)]
struct Cli {
    /// Asset manifest JSON
    manifest: PathBuf,

    /// Asset list to load; every autoload list when omitted
    list: Option<String>,

    /// Loader config JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report on the background signals
    #[arg(long, default_value_t = false)]
    background: bool,

    /// Finish sounds in reverse order of their fetch
    #[arg(long, default_value_t = false)]
    reverse_decodes: bool,
}

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => LoaderConfig::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => LoaderConfig::default(),
    };
    let manifest = std::fs::read_to_string(&cli.manifest)
        .with_context(|| format!("reading manifest {}", cli.manifest.display()))?;

    let mut manager = AssetManager::new(config, MemoryFetchEngine::new(), MemoryAudio::new());
    manager.set_data(&manifest)?;

    let background = cli.background || cli.list.is_none();
    let signals = if background {
        manager.background_signals_mut()
    } else {
        manager.signals_mut()
    };
    signals.load_start.subscribe(|_| info!("Load started"));
    signals.file_start.subscribe(|key| info!("Fetching '{}'", key));
    signals.file_complete.subscribe(|p| {
        info!(
            "{:>6.2}% ({}/{}) {}",
            p.progress,
            p.file_index,
            p.total_files,
            p.key.as_deref().unwrap_or("-")
        )
    });
    signals.load_complete.subscribe(|_| info!("All files fetched"));
    signals
        .load_complete_and_audio_decoded
        .subscribe(|_| info!("Ready"));

    let outcome = match &cli.list {
        Some(id) => manager.load_assets(id, cli.background)?,
        None => manager.load_queue()?,
    };
    info!("Load outcome: {:?}", outcome);
    if !matches!(outcome, LoadOutcome::Started { .. }) {
        return Ok(());
    }

    // Drive the fake transfers one file per frame, then the decodes
    while manager.fetch_engine_mut().complete_next().is_some() {
        manager.update()?;
    }
    manager.update()?;

    let mut pending = manager.audio().pending().to_vec();
    if cli.reverse_decodes {
        pending.reverse();
    }
    for key in pending {
        manager.audio_mut().decode(&key);
        manager.update()?;
    }

    for list in manager.catalog().lists() {
        info!(
            "{:<20} {}",
            list.id,
            if manager.has_loaded_assets(&list.id) {
                "loaded"
            } else {
                "not loaded"
            }
        );
    }

    Ok(())
}
