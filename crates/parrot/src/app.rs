use crate::{
    AppCommand, AppResult, IndexStore, StatusView,
    config::Config,
    status_view::{HELP_TEXT, PERMISSION_DENIED_MESSAGE},
};

use parrot_core::{MAX_RATE, MIN_RATE, SequenceNavigator, SessionCoordinator, SessionState};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, instrument, warn};

/// Main application state.
///
/// Owns the session coordinator and is the only task that drives it:
/// typed commands and hardware statuses are handled one at a time. The
/// status line is rendered from the coordinator's published snapshot.
pub struct App {
    pub(crate) coordinator: SessionCoordinator,
    pub(crate) snapshot: watch::Receiver<SessionState>,
    pub(crate) navigator: SequenceNavigator,
    pub(crate) index_store: IndexStore,
    pub(crate) view: StatusView,
    pub(crate) config: Config,
    pub(crate) command_rx: mpsc::Receiver<AppCommand>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
}

impl App {
    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("Parrot starting");

        if !self.coordinator.request_permissions().await {
            println!("{}", PERMISSION_DENIED_MESSAGE);
        }
        println!("{}", HELP_TEXT);
        self.render();

        loop {
            tokio::select! {
                Some(cmd) = self.command_rx.recv() => {
                    if cmd == AppCommand::Shutdown {
                        info!("Shutdown requested");
                        break;
                    }
                    if let Err(e) = self.handle_command(cmd.clone()).await {
                        error!(command = ?cmd, error = %e, "Command failed");
                    }
                    self.render();
                }

                Some(event) = self.coordinator.next_event() => {
                    self.coordinator.handle_event(event).await;
                    self.render();
                }

                else => {
                    info!("All channels closed, shutting down");
                    break;
                }
            }
        }

        let _ = self.shutdown_tx.send(true);
        info!("Parrot shut down successfully");

        Ok(())
    }

    #[instrument(skip(self))]
    async fn handle_command(&mut self, cmd: AppCommand) -> AppResult<()> {
        if cmd.needs_audio() && !self.coordinator.state().has_recording_permission {
            println!("{}", PERMISSION_DENIED_MESSAGE);
            return Ok(());
        }

        match cmd {
            AppCommand::Record => self.coordinator.on_record_button_pressed().await?,
            AppCommand::PlayPause => self.coordinator.on_play_pause_pressed().await?,
            AppCommand::Stop => self.coordinator.on_stop_pressed().await?,
            AppCommand::Mute => self.coordinator.on_mute_toggled().await?,
            AppCommand::Volume(volume) => self.coordinator.set_volume(volume).await?,
            AppCommand::Rate(slider) => {
                let rate = slider * self.config.playback.rate_scale;
                if !(MIN_RATE..=MAX_RATE).contains(&rate) {
                    println!(
                        "Rate {:.2}x is not supported, pick a value between {:.1}x and {:.1}x",
                        rate, MIN_RATE, MAX_RATE
                    );
                    return Ok(());
                }
                let correct_pitch = self.coordinator.state().should_correct_pitch;
                self.coordinator.set_rate(rate, correct_pitch).await;
            }
            AppCommand::Pitch => self.coordinator.toggle_pitch_correction().await,
            AppCommand::Seek(fraction) => {
                self.coordinator.begin_seek().await?;
                self.coordinator.commit_seek(fraction).await?;
            }
            AppCommand::PlayCurrent => self.play_current().await?,
            AppCommand::Next => self.step(1).await?,
            AppCommand::Previous => self.step(-1).await?,
            AppCommand::Status => {
                let state = self.snapshot.borrow().clone();
                println!("{}", StatusView::describe(&state, self.navigator.current()));
            }
            AppCommand::Help => println!("{}", HELP_TEXT),
            AppCommand::Shutdown => {}
        }

        Ok(())
    }

    async fn step(&mut self, delta: i64) -> AppResult<()> {
        let index = self.navigator.advance(delta);
        if let Err(e) = self.index_store.save(index) {
            warn!(index, error = %e, "Failed to persist clip index");
        }
        self.play_current().await
    }

    async fn play_current(&mut self) -> AppResult<()> {
        let locator = self.navigator.current_locator();
        info!(index = self.navigator.current(), locator = %locator, "Playing reference clip");
        self.coordinator.play_reference(locator).await?;
        Ok(())
    }

    fn render(&mut self) {
        let index = self.navigator.current();
        let state = self.snapshot.borrow_and_update().clone();
        if let Some(line) = self.view.refresh(&state, index) {
            println!("{}", line);
        }
    }
}
