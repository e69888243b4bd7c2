//! Main application entry point

use anyhow::{Context, Result};
use chrono::Local;
use sd_core::Dimension;
use sd_data::{
    AnalyticsProvider, CacheStore, FetchOrchestrator, HttpProvider, MemoryPreferenceStore,
    PreferenceStore, SqlitePreferenceStore,
};
use sd_views::DashboardSession;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod demo;
mod render;

use commands::{Command, HELP};
use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;

    let provider: Arc<dyn AnalyticsProvider> = match &config.provider {
        Some(provider_config) => Arc::new(HttpProvider::new(provider_config)?),
        None => Arc::new(demo::provider(Local::now().date_naive())),
    };
    info!(
        provider = provider.provider_name(),
        demo = config.demo,
        "Starting sales dashboard"
    );

    let preferences: Arc<dyn PreferenceStore> = if config.demo {
        Arc::new(MemoryPreferenceStore::default())
    } else {
        let store = SqlitePreferenceStore::open(&config.preferences_db, config.user_id.clone())
            .await
            .with_context(|| format!("failed to open {}", config.preferences_db.display()))?;
        Arc::new(store)
    };

    let orchestrator = FetchOrchestrator::with_timeout(provider, config.request_timeout);
    let store = Arc::new(CacheStore::new(Handle::current()));
    let session = DashboardSession::new(orchestrator, store, preferences)?;

    session.start().await;
    println!("{}", render::render_view(&session.view()));
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        if command == Command::Quit {
            break;
        }
        if let Err(e) = run(&session, command).await {
            error!("{:#}", e);
            println!("error: {:#}", e);
        }
    }

    info!("Shutting down");
    Ok(())
}

async fn run(session: &DashboardSession, command: Command) -> Result<()> {
    match command {
        Command::Set(dimension, value) => {
            session.set_filter(dimension, value);
            println!("{}", render::render_view(&session.view()));
        }
        Command::Range(panel, preset) => {
            let spec = session.set_panel_range(panel, &preset)?;
            println!("{} now shows {}", panel, spec.label());
        }
        Command::Options(dimension) => {
            let dimensions = match dimension {
                Some(dimension) => vec![dimension],
                None => Dimension::ALL.to_vec(),
            };
            for dimension in dimensions {
                println!("{}: all, {}", dimension, session.options(dimension).join(", "));
            }
        }
        Command::Show => println!("{}", render::render_view(&session.view())),
        Command::Wait => println!("{}", render::render_view(&session.settle().await)),
        Command::Save => {
            let saved = session.save_preferences().await?;
            println!(
                "Saved preferences: sectors={:?} regions={:?} services={:?}",
                saved.sectors, saved.regions, saved.services
            );
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}
