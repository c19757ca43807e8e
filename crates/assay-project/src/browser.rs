//! Opening docs pages

use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{ProjectError, Result};

/// Opens URLs for the operator
pub trait Browser {
    /// Open `url`
    ///
    /// # Errors
    /// Returns error if no viewer could be launched
    fn open(&self, url: &str) -> Result<()>;
}

/// Platform opener (`open`, `xdg-open`, `start`)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl SystemBrowser {
    fn command(url: &str) -> Command {
        if cfg!(target_os = "macos") {
            let mut command = Command::new("open");
            command.arg(url);
            command
        } else if cfg!(target_os = "windows") {
            let mut command = Command::new("cmd");
            command.args(["/C", "start", "", url]);
            command
        } else {
            let mut command = Command::new("xdg-open");
            command.arg(url);
            command
        }
    }
}

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        debug!(%url, "opening browser");
        Self::command(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(drop)
            .map_err(|e| ProjectError::Browser {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}
