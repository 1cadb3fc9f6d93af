//! Per-invocation client wiring: settings, session store, gateway, event output.
//!
//! Notices go to stderr so stdout only carries command results.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use wilma_client::api::{ForecastApi, LogsApi, PollsApi, UsersApi};
use wilma_client::{EventBus, Gateway, NoticeLevel, SessionEvent, SessionStore};
use wilma_core::storage::{FileStorage, MemoryStorage, Storage};
use wilma_core::Settings;

/// Command-line overrides, applied on top of file and environment settings.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub forecast_url: Option<String>,
    pub storage: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(self, settings: &mut Settings) {
        if let Some(url) = self.api_url {
            settings.api.base_url = url;
        }
        if let Some(url) = self.forecast_url {
            settings.forecast.base_url = url;
        }
        if let Some(path) = self.storage {
            settings.session.storage_path = Some(path);
        }
    }
}

pub struct Context {
    pub settings: Settings,
    pub gateway: Arc<Gateway>,
}

impl Context {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let storage: Arc<dyn Storage> = match settings.storage_path() {
            Some(path) => {
                debug!(path = %path.display(), "Using file storage");
                Arc::new(FileStorage::new(path))
            }
            None => {
                debug!("No home directory, session will not persist");
                Arc::new(MemoryStorage::new())
            }
        };
        let session = Arc::new(SessionStore::load(storage));
        let gateway = Arc::new(Gateway::new(&settings, session, EventBus::default())?);
        Ok(Self { settings, gateway })
    }

    pub fn users(&self) -> UsersApi {
        UsersApi::new(Arc::clone(&self.gateway))
    }

    pub fn polls(&self) -> PollsApi {
        PollsApi::new(Arc::clone(&self.gateway))
    }

    pub fn logs(&self) -> LogsApi {
        LogsApi::new(Arc::clone(&self.gateway))
    }

    pub fn forecast(&self) -> ForecastApi {
        ForecastApi::new(Arc::clone(&self.gateway))
    }

    /// Fail early with a hint when there is no stored session.
    pub fn require_login(&self) -> anyhow::Result<()> {
        if self.gateway.session().is_authenticated() {
            Ok(())
        } else {
            anyhow::bail!("Not logged in. Run: wilma auth login")
        }
    }

    /// Print gateway events to stderr until the bus closes.
    pub fn spawn_event_printer(&self) -> JoinHandle<()> {
        let rx = self.gateway.events();
        tokio::spawn(print_events(rx))
    }
}

async fn print_events(mut rx: broadcast::Receiver<SessionEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let mut err = io::stderr();
                let _ = write_event(&mut err, &event);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                debug!(skipped = n, "Event printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Render one event as a single line.
pub fn write_event(w: &mut impl Write, event: &SessionEvent) -> io::Result<()> {
    match event {
        SessionEvent::Notice { level, message } => {
            let tag = match level {
                NoticeLevel::Info => "info",
                NoticeLevel::Success => "ok",
                NoticeLevel::Error => "error",
            };
            writeln!(w, "[{tag}] {message}")
        }
        SessionEvent::RedirectToLogin => writeln!(w, "Run `wilma auth login` to sign in again"),
    }
}
