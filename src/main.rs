use anyhow::{anyhow, Result};
use is_terminal::IsTerminal;
use srpd::config::{Config, SharedConfig};
use srpd::daemon::Daemon;
use srpd::publisher::{MdnsPublisher, Publisher, StaticPublisher};
use srpd::server::PublisherEvent;
use srpd::store::{FileStore, MemoryStore, SettingsStore};
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let mut first_args = std::env::args().take(2);
    let (program_name, config_file) = (
        first_args.next().unwrap_or("srpd".to_string()),
        first_args.next(),
    );

    let config = config_init(&program_name, config_file)?;
    let store = store_from_config(&config)?;
    let publisher = publisher_from_config(&config)?;

    if std::io::stdout().is_terminal() {
        println!("{}", srpd::banner::ANTENNA);
    }

    let daemon = Daemon::new(&config, publisher, store);
    let handle = daemon.handle();
    let daemon_handle = tokio::spawn(daemon.run());

    handle.enable(true).await?;
    // Both publisher implementations announce synchronously, so the entry
    // is effective as soon as enabling returns.
    handle.publisher_event(PublisherEvent::EntryAdded).await?;

    if let Some(api_bind_addr) = config.api_bind_addr {
        tracing::info!("API listening on {api_bind_addr}");
        let api_server = srpd::api::server::new(api_bind_addr, config.api_timeout, handle.clone());
        let api_handle = tokio::spawn(api_server);

        tokio::select! {
            _ = signal::ctrl_c() => {
                tracing::info!("quitting from signal");
            },
            Ok(daemon_res) = daemon_handle => {
                daemon_res?;
            }
            Ok(api_res) = api_handle => {
                if let Err(err) = api_res {
                    return Err(err.into());
                }
            }
        }
    } else {
        tokio::select! {
            _ = signal::ctrl_c() => {
                tracing::info!("quitting from signal");
            },
            Ok(daemon_res) = daemon_handle => {
                daemon_res?;
            }
        }
    }

    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "srpd=info".into()),
        )
        .init();
}

fn config_init(program_name: &str, config_file: Option<String>) -> Result<SharedConfig> {
    match config_file {
        None => Err(anyhow!("usage: {program_name} /path/to/config.json")),
        Some(config_file) => {
            let config = Config::try_from_file(&config_file)?;
            tracing::debug!("loaded config from {config_file}");
            Ok(Arc::new(config))
        }
    }
}

fn store_from_config(config: &SharedConfig) -> Result<Box<dyn SettingsStore>> {
    match &config.port_store_path {
        Some(state_path) => {
            tracing::debug!("using file-backed settings store: {state_path:?}");
            Ok(Box::new(FileStore::try_from_file(state_path)?))
        }
        None => {
            tracing::debug!("using in-memory settings store");
            Ok(Box::new(MemoryStore::new()))
        }
    }
}

fn publisher_from_config(config: &SharedConfig) -> Result<Box<dyn Publisher>> {
    match &config.advertise {
        Some(advertise) => {
            tracing::debug!("advertising over mDNS from {}", advertise.address);
            Ok(Box::new(MdnsPublisher::new(advertise.clone())?))
        }
        None => Ok(Box::new(StaticPublisher::new())),
    }
}
