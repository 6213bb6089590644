//! Parrot: record yourself, play it back, compare with reference clips.

mod app;
mod app_command;
mod clip_fetcher;
mod config;
mod error;
mod index_store;
mod input_handler;
mod status_view;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    clip_fetcher::HttpClipFetcher,
    error::{AppError, Result as AppResult},
    index_store::IndexStore,
    input_handler::InputHandler,
    status_view::StatusView,
};

use crate::config::Config;

use std::sync::Arc;

use parrot_core::{CpalHardware, SequenceNavigator, SessionCoordinator};
use tokio::sync::{mpsc, watch};
use tracing::error;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "parrot=info,parrot_core=info";

/// Application entry point.
fn main() {
    // Logs go to stderr so the status line on stdout stays readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        error!("Config validation failed: {:?}", e);
        std::process::exit(1);
    }

    let (recordings_dir, cache_dir, data_dir) = match (
        config.recordings_dir(),
        config.clip_cache_dir(),
        Config::data_dir(),
    ) {
        (Ok(r), Ok(c), Ok(d)) => (r, c, d),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            error!("Failed to resolve application directories: {:?}", e);
            std::process::exit(1);
        }
    };

    let fetcher = match HttpClipFetcher::new(Some(cache_dir)) {
        Ok(f) => Arc::new(f),
        Err(e) => {
            error!("Failed to create clip fetcher: {:?}", e);
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            std::process::exit(1);
        }
    };

    rt.block_on(async {
        let hardware = CpalHardware::new(recordings_dir, fetcher, config.status_interval());
        let coordinator =
            SessionCoordinator::new(Arc::new(hardware), config.coordinator_options());
        let snapshot = coordinator.subscribe();

        let index_store = IndexStore::in_dir(&data_dir);
        let navigator = SequenceNavigator::new(index_store.load(), config.clip_template());

        let (command_tx, command_rx) = mpsc::channel(32);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let input_handler = InputHandler::new(command_tx);

        let app = App {
            coordinator,
            snapshot,
            navigator,
            index_store,
            view: StatusView::new(),
            config,
            command_rx,
            shutdown_tx,
        };

        tokio::join!(
            async {
                if let Err(e) = input_handler.run(shutdown_rx).await {
                    error!(error = ?e, "Input handler error");
                }
            },
            async {
                if let Err(e) = app.run().await {
                    error!(error = ?e, "App error");
                }
            }
        );
    });

    // The stdin forwarder may still be blocked on read.
    rt.shutdown_background();
}
