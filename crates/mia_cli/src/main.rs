use anyhow::Context;
use clap::{Parser, Subcommand};
use mia_client::{Backend, HttpBackend, MockBackend};
use mia_core::{FileIdentityStore, IdentityStore, MemoryIdentityStore, MiaConfig, SessionStore};
use mia_flows::{Bootstrap, BootstrapOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod render;
mod repl;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(short, long, default_value = "mia.toml")]
    config: PathBuf,

    /// Backend base URL, e.g. http://localhost:8001
    #[arg(long, env = "MIA_BACKEND_URL")]
    backend_url: Option<String>,

    /// Directory for device-local state
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Talk to a built-in offline backend instead of a server
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default)]
enum Command {
    /// Chat with your companion, creating one first if needed
    #[default]
    Chat,
    /// Show the saved companion and its stats
    Status,
    /// Forget the companion saved on this device
    Reset,
    /// List the predefined personalities
    Personalities,
    /// Check that the backend is up
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mia=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = MiaConfig::load_or_default(&args.config);
    if let Some(url) = args.backend_url {
        config.backend.base_url = url;
    }
    if let Some(dir) = args.data_dir {
        config.storage.data_dir = Some(dir);
    }

    // Offline sessions never touch the saved companion
    let (backend, identity): (Arc<dyn Backend>, Arc<dyn IdentityStore>) = if args.mock {
        info!("Using the offline mock backend");
        (
            Arc::new(MockBackend::demo()),
            Arc::new(MemoryIdentityStore::new()),
        )
    } else {
        let backend = HttpBackend::from_config(&config.backend)
            .with_context(|| format!("Invalid backend URL: {}", config.backend.base_url))?;
        info!("Using backend at {}", backend.api_root());
        let identity = FileIdentityStore::new(config.data_dir());
        (Arc::new(backend), Arc::new(identity))
    };
    let session = Arc::new(SessionStore::new(identity));

    match args.command.unwrap_or_default() {
        Command::Chat => {
            repl::Repl::new(backend, session, config)?.run().await?;
        }
        Command::Status => {
            match Bootstrap::new(backend, session.clone()).run().await {
                BootstrapOutcome::Resumed(companion) => {
                    let snapshot = session.get();
                    let mood = snapshot
                        .stats
                        .as_ref()
                        .map(|s| s.mood.clone())
                        .unwrap_or_default();
                    println!("{}", render::header(&companion, &mood));
                    if let Some(stats) = &snapshot.stats {
                        println!("{}", render::stats_block(stats));
                    }
                    if let Some(seen) = companion.last_interaction_at() {
                        println!("  Last chat: {}", seen.format("%Y-%m-%d %H:%M UTC"));
                    }
                }
                BootstrapOutcome::NoCompanion => {
                    println!("No companion yet. Run `mia chat` to create one.");
                }
            }
        }
        Command::Reset => {
            match session.persisted_id()? {
                Some(id) => {
                    session.clear();
                    println!("Forgot companion {}.", id);
                }
                None => println!("Nothing to reset."),
            }
        }
        Command::Personalities => {
            let catalog = backend.list_personalities().await?;
            for (i, option) in catalog.iter().enumerate() {
                println!("{}", render::personality(i, option));
            }
        }
        Command::Health => {
            let health = backend.health().await?;
            match health.service {
                Some(service) => println!("{} ({})", health.status, service),
                None => println!("{}", health.status),
            }
        }
    }

    Ok(())
}
