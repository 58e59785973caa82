//! Desktop notification and terminal bell for finished intervals.

use std::io::{self, Write};

use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::config::NotificationConfig;
use crate::timer::Notifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification dispatch failed: {0}")]
    Dispatch(String),
    #[error("could not ring the bell: {0}")]
    Sound(#[from] io::Error),
}

/// Sends notifications through the desktop notification service and rings
/// the terminal bell.
///
/// The notification service can stall (D-Bus on Linux), and so can a piped
/// stdout, so both channels hand their work to tokio's blocking pool and
/// return immediately. Failures are logged from there.
pub struct DesktopNotifier {
    config: NotificationConfig,
    runtime: Option<Handle>,
}

impl DesktopNotifier {
    pub fn new(config: NotificationConfig) -> Self {
        Self {
            config,
            runtime: Handle::try_current().ok(),
        }
    }

    fn dispatch(&self, job: impl FnOnce() + Send + 'static) -> Result<(), NotifyError> {
        let Some(runtime) = &self.runtime else {
            return Err(NotifyError::Dispatch("no async runtime available".into()));
        };
        runtime.spawn_blocking(job);
        Ok(())
    }
}

fn ring_bell() -> io::Result<()> {
    let mut out = io::stdout();
    out.write_all(b"\x07")?;
    out.flush()
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        if !self.config.desktop {
            return Ok(());
        }

        let title = title.to_string();
        let message = message.to_string();
        self.dispatch(move || {
            match notify_rust::Notification::new()
                .summary(&title)
                .body(&message)
                .appname("tomato")
                .show()
            {
                Ok(_) => debug!("Sent notification: {}", title),
                Err(e) => warn!("Failed to send notification: {}", e),
            }
        })
    }

    fn play_sound(&self) -> Result<(), NotifyError> {
        if !self.config.sound {
            return Ok(());
        }
        self.dispatch(|| {
            if let Err(e) = ring_bell() {
                warn!("{}", NotifyError::Sound(e));
            }
        })
    }
}
