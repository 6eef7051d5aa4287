use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};

use float_watch::api::{ListingClient, SteamMarketClient};
use float_watch::core::{logging, Config, HealthChecker, WorkerSettings};
use float_watch::monitoring::{
    drain_events, EventBus, MonitorEvent, MonitorStatus, MonitorSupervisor, PollMetrics,
};
use float_watch::watchlist::{ImageCache, ItemRegistrar, WatchlistStore};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// CLI arguments for float-watch.
#[derive(Parser, Debug)]
#[command(name = "float-watch")]
#[command(about = "Watches Steam market listings for items with a wanted float and price")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add an item to the watchlist from its inspect link
    Add {
        #[arg(short, long)]
        link: String,
        /// Target float, e.g. 0.18
        #[arg(short, long)]
        float: String,
        /// Target price, e.g. 12.00 or $12.00
        #[arg(short, long)]
        price: String,
        /// Download the item image even if it is already cached
        #[arg(long)]
        force_refresh_image: bool,
    },
    /// Remove an item from the watchlist
    Remove { label: String },
    /// Print the watchlist
    List,
    /// Monitor the watchlist until every item is resolved or Ctrl-C
    Watch {
        /// Comma-separated labels to watch instead of the whole list
        #[arg(long, value_delimiter = ',')]
        only: Option<Vec<String>>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    logging::init_logging(&config.monitoring.log_level);

    tracing::info!("🚀 Float Watch starting...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let settings = WorkerSettings::load_or_create(&config.storage.settings_path)
        .await
        .with_context(|| format!("Failed to load settings from {:?}", config.storage.settings_path))?;

    let store = WatchlistStore::load(&config.storage.watchlist_path)
        .await
        .with_context(|| format!("Failed to load watchlist from {:?}", config.storage.watchlist_path))?;
    let store = Arc::new(Mutex::new(store));

    let client: Arc<dyn ListingClient> = Arc::new(
        SteamMarketClient::new(config.marketplace.clone(), settings.client_options())
            .context("Failed to build marketplace client")?,
    );

    match args.command.unwrap_or(Command::Watch { only: None }) {
        Command::Add {
            link,
            float,
            price,
            force_refresh_image,
        } => {
            let images = Arc::new(ImageCache::open(&config.storage.image_cache_dir).await?);
            let registrar = ItemRegistrar::new(client, store, images)
                .with_force_refresh_image(force_refresh_image);
            let item = registrar
                .register(&link, &float, &price)
                .await
                .context("Could not add item")?;
            println!("Added '{}' (float ≤ {}, price ≤ {})", item.label, item.target_float, item.target_price);
        }
        Command::Remove { label } => {
            let images = Arc::new(ImageCache::open(&config.storage.image_cache_dir).await?);
            let registrar = ItemRegistrar::new(client, store, images);
            if registrar.unregister(&label).await? {
                println!("Removed '{}'", label);
            } else {
                println!("'{}' is not on the watchlist", label);
            }
        }
        Command::List => {
            let store = store.lock().await;
            if store.is_empty() {
                println!("Watchlist is empty");
            }
            for item in store.all() {
                println!(
                    "{}  {}  float ≤ {}  price ≤ {}",
                    item.rarity_color, item.label, item.target_float, item.target_price
                );
            }
        }
        Command::Watch { only } => {
            run_watch(&config, &settings, store, client, only).await?;
        }
    }

    Ok(())
}

async fn run_watch(
    config: &Config,
    settings: &WorkerSettings,
    store: Arc<Mutex<WatchlistStore>>,
    client: Arc<dyn ListingClient>,
    only: Option<Vec<String>>,
) -> Result<()> {
    let (items, unknown) = store.lock().await.select(only.as_deref());
    for label in &unknown {
        tracing::warn!("'{}' is not on the watchlist, ignoring it", label);
    }
    if items.is_empty() {
        tracing::warn!("Nothing to watch; add items with `float-watch add`");
        return Ok(());
    }

    let events = Arc::new(EventBus::new(config.monitoring.event_capacity));
    let metrics = Arc::new(PollMetrics::new());
    let supervisor = MonitorSupervisor::new(
        client,
        Arc::new(settings.proxy_pool()),
        settings.monitor_settings(),
        events.clone(),
        metrics.clone(),
    );

    // Initialize health checker
    let health_checker = Arc::new(HealthChecker::new(supervisor.clone(), metrics));
    let (health_stop, health_stop_rx) = oneshot::channel();
    let health_server = tokio::spawn(serve_health(
        health_checker.clone(),
        config.monitoring.health_port,
        health_stop_rx,
    ));

    let reporter = tokio::spawn(drain_events(events.subscribe(), notify));

    for (label, result) in supervisor.start_all(&items).await {
        if let Err(e) = result {
            tracing::error!("❌ Could not start monitor for '{}': {}", label, e);
        }
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    let mut ticks: u64 = 0;

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                }
                tracing::info!("🛑 Shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                ticks += 1;
                health_checker.refresh().await;

                if ticks % 12 == 0 {
                    let status = health_checker.get_status().await;
                    tracing::info!(
                        "Status: {} ({} monitors, {} polls, uptime: {}s)",
                        status.status,
                        status.active_monitors.len(),
                        status.polls.polls,
                        status.uptime_seconds
                    );
                }

                if supervisor.active_count().await == 0 {
                    tracing::info!("All monitors finished");
                    break;
                }
            }
        }
    }

    supervisor.stop_all().await;
    let saved = {
        let store = store.lock().await;
        let result = store.persist().await.map(|_| store.path().to_path_buf());
        result
    };

    // The reporter ends once every holder of the event bus is gone, which
    // includes monitor tasks still publishing their terminal event.
    let _ = health_stop.send(());
    if tokio::time::timeout(SHUTDOWN_GRACE, health_server).await.is_err() {
        tracing::warn!("Health endpoint did not shut down in time");
    }
    drop(health_checker);
    drop(supervisor);
    drop(events);
    if tokio::time::timeout(SHUTDOWN_GRACE, reporter).await.is_err() {
        tracing::warn!("Some monitor events may not have been reported");
    }

    let path = saved.context("Failed to save watchlist")?;
    tracing::info!("💾 Watchlist saved to {:?}", path);
    Ok(())
}

fn notify(event: &MonitorEvent) {
    let reason = event.reason.as_deref().unwrap_or("");
    match event.status {
        MonitorStatus::Matched => {
            tracing::info!("🔔 '{}' matched: {}", event.label, reason);
            println!("MATCH  {}  {}", event.label, reason);
        }
        MonitorStatus::Failed => tracing::warn!("🔔 '{}' failed: {}", event.label, reason),
        MonitorStatus::Stopped => tracing::info!("🔔 '{}' stopped", event.label),
        MonitorStatus::Polling | MonitorStatus::Idle => {
            tracing::debug!("'{}' is {}", event.label, event.status)
        }
    }
}

async fn serve_health(health_checker: Arc<HealthChecker>, port: u16, stop: oneshot::Receiver<()>) {
    use warp::Filter;

    let health = warp::get()
        .and(warp::path("health"))
        .and(warp::path::end())
        .and(warp::any().map(move || health_checker.clone()))
        .and_then(|checker: Arc<HealthChecker>| async move {
            let status = checker.get_status().await;
            Ok::<_, warp::Rejection>(warp::reply::json(&status))
        });

    let stopped = async move {
        let _ = stop.await;
    };
    match warp::serve(health).try_bind_with_graceful_shutdown(([0, 0, 0, 0], port), stopped) {
        Ok((addr, server)) => {
            tracing::info!("✅ Health endpoint listening on {}", addr);
            server.await;
        }
        Err(e) => tracing::error!("❌ Could not bind health endpoint on port {}: {}", port, e),
    }
}
