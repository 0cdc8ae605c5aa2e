use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lightshow_core::{
    ConfigManager, HierarchyStore, InboundHandler, InboundOutcome, LogTransport, MemoryStore,
    PlaybackController, RunOutcome, Settings, ShowId,
};
use lightshow_devices::DeviceLibrary;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Plays light shows as timed device commands.
#[derive(Parser, Debug)]
#[command(name = "lightshow")]
#[command(about = "Hierarchical light show player")]
struct Args {
    /// Settings file (default: data/options.json)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored shows
    List,
    /// List patched devices and the commands each device type understands
    Devices {
        /// Print the command catalog as JSON
        #[arg(long)]
        json: bool,
    },
    /// Play one show until it finishes or Ctrl-C is pressed
    Play { show_id: ShowId },
    /// Feed `<topic> <payload>` lines from stdin to the show command handler
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    let mut config = ConfigManager::new(args.config);
    let settings = config
        .load()
        .with_context(|| format!("loading {}", config.path().display()))?;

    env_logger::Builder::new()
        .filter_level(settings.log_filter())
        .parse_default_env()
        .init();

    if settings.has_broker() {
        log::info!(
            "Broker {} is configured but unused here; commands go to the log",
            settings.mqtt_host
        );
    }

    let store = Arc::new(open_store(&settings)?);

    match args.command {
        Command::List => list(store.as_ref()),
        Command::Devices { json } => devices(store.as_ref(), json),
        Command::Play { show_id } => play(store, show_id).await,
        Command::Serve => serve(store, &settings).await,
    }
}

fn open_store(settings: &Settings) -> anyhow::Result<MemoryStore> {
    if !settings.store_path.exists() {
        log::warn!(
            "{} does not exist, starting with no shows",
            settings.store_path.display()
        );
        return Ok(MemoryStore::new());
    }

    MemoryStore::load(&settings.store_path)
        .with_context(|| format!("loading shows from {}", settings.store_path.display()))
}

fn list(store: &MemoryStore) -> anyhow::Result<()> {
    for show in store.get_shows()? {
        let commands = match store.get_show_recursive(show.id) {
            Ok(full) => format!("{} commands per pass", full.dispatch_count()),
            Err(e) => format!("unplayable: {}", e),
        };

        println!(
            "{:>4}  {:<24} topic={:<16} repeat={:<5} {}",
            show.id, show.name, show.topic, show.repeat, commands
        );
    }
    Ok(())
}

fn devices(store: &MemoryStore, json: bool) -> anyhow::Result<()> {
    let library = DeviceLibrary::new();

    if json {
        println!("{}", library.to_json()?);
        return Ok(());
    }

    for device in store.devices() {
        let kind = library
            .get(device.device_type)
            .map_or("unknown", |t| t.name.as_str());
        println!("{:>4}  {:<24} {:<24} {}", device.id, device.name, device.topic, kind);
    }

    for device_type in library.all() {
        println!();
        println!("{}:", device_type.name);
        for command in &device_type.commands {
            println!("  {:<16} {}", command.name, command.description);
        }
    }
    Ok(())
}

async fn play(store: Arc<MemoryStore>, show_id: ShowId) -> anyhow::Result<()> {
    let controller = PlaybackController::new(store, Arc::new(LogTransport));
    controller.start(show_id).await?;

    tokio::select! {
        outcome = controller.join(show_id) => {
            if outcome == Some(RunOutcome::Completed) {
                println!("Show {} finished", show_id);
            }
        }
        result = tokio::signal::ctrl_c() => {
            result.context("waiting for Ctrl-C")?;
            println!("Stopping show {}", show_id);
            controller.shutdown().await;
        }
    }
    Ok(())
}

async fn serve(store: Arc<MemoryStore>, settings: &Settings) -> anyhow::Result<()> {
    let controller = Arc::new(PlaybackController::new(store, Arc::new(LogTransport)));

    for filter in controller.announce_shows().await? {
        log::info!("Listening on {}", filter);
    }

    let handler = InboundHandler::new(
        Arc::clone(&controller),
        settings.message_history,
        settings.inbound_grace(),
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            result = tokio::signal::ctrl_c() => {
                result.context("waiting for Ctrl-C")?;
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        let Some((topic, payload)) = line.trim().split_once(' ') else {
            log::warn!("Expected '<topic> <payload>', got '{}'", line);
            continue;
        };

        match handler.handle(topic, payload.trim()).await {
            InboundOutcome::Rejected(reason) => println!("rejected: {}", reason),
            InboundOutcome::Ignored => println!("ignored: still initializing"),
            outcome => log::debug!("{} -> {:?}", topic, outcome),
        }
    }

    controller.shutdown().await;
    Ok(())
}
