//! The browser automation seam.
//!
//! [`BrowserChannel`] is the opaque "open this URL" capability the scheduler
//! drives. [`AppleScriptChannel`] implements it for macOS browsers by shelling
//! out to `osascript`.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use nexus_shared::{NexusError, Result};

/// External capability that opens URLs in a browser.
///
/// Implementations need not be safe to call concurrently; the scheduler never
/// has more than one call in flight.
#[async_trait]
pub trait BrowserChannel: Send + Sync {
    /// `Ok(true)` when the target is running. When it is not, implementations
    /// should request a launch and return `Ok(false)`; the caller waits and
    /// asks again.
    async fn ensure_target_running(&self) -> Result<bool>;

    /// Open `url` in a new window (private if requested).
    async fn open_in_new_window(&self, url: &str, private: bool) -> Result<()>;

    /// Open `url` as a new tab in the front window.
    async fn open_as_tab(&self, url: &str) -> Result<()>;

    /// Name for logs.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// AppleScript
// ---------------------------------------------------------------------------

/// Drives a scriptable macOS browser (Safari by default) through `osascript`.
///
/// The script process is killed if its call is dropped, so a timed-out call
/// never overlaps the next one.
#[derive(Debug, Clone)]
pub struct AppleScriptChannel {
    app: String,
    program: String,
}

impl AppleScriptChannel {
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            program: "osascript".to_string(),
        }
    }

    /// Run scripts through `program` instead of `osascript`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, script: &str) -> Result<String> {
        debug!(app = %self.app, program = %self.program, "running osascript");
        let output = Command::new(&self.program)
            .arg("-e")
            .arg(script)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| NexusError::Channel(format!("failed to spawn {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NexusError::Channel(format!(
                "osascript exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for AppleScriptChannel {
    fn default() -> Self {
        Self::new("Safari")
    }
}

#[async_trait]
impl BrowserChannel for AppleScriptChannel {
    async fn ensure_target_running(&self) -> Result<bool> {
        let running = self.run(&process_check_script(&self.app)).await? == "true";
        if !running {
            info!(app = %self.app, "browser not running, launching");
            self.run(&activate_script(&self.app)).await?;
        }
        Ok(running)
    }

    async fn open_in_new_window(&self, url: &str, private: bool) -> Result<()> {
        let script = if private {
            private_window_script(&self.app, url)
        } else {
            new_window_script(&self.app, url)
        };
        self.run(&script).await.map(|_| ())
    }

    async fn open_as_tab(&self, url: &str) -> Result<()> {
        self.run(&new_tab_script(&self.app, url)).await.map(|_| ())
    }

    fn name(&self) -> &str {
        &self.app
    }
}

// ---------------------------------------------------------------------------
// Scripts
// ---------------------------------------------------------------------------

/// Escape a value for use inside an AppleScript string literal.
fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn process_check_script(app: &str) -> String {
    format!(
        r#"tell application "System Events" to (name of processes) contains "{}""#,
        quote(app)
    )
}

fn activate_script(app: &str) -> String {
    format!(r#"tell application "{}" to activate"#, quote(app))
}

fn new_window_script(app: &str, url: &str) -> String {
    format!(
        r#"tell application "{app}"
    make new document with properties {{URL:"{url}"}}
    activate
end tell"#,
        app = quote(app),
        url = quote(url)
    )
}

/// Private windows are not scriptable directly: send the menu shortcut, then
/// point the new front document at the URL.
fn private_window_script(app: &str, url: &str) -> String {
    format!(
        r#"tell application "{app}" to activate
tell application "System Events" to keystroke "n" using {{command down, shift down}}
delay 0.5
tell application "{app}" to set URL of front document to "{url}""#,
        app = quote(app),
        url = quote(url)
    )
}

fn new_tab_script(app: &str, url: &str) -> String {
    format!(
        r#"tell application "{app}"
    tell front window
        make new tab with properties {{URL:"{url}"}}
    end tell
end tell"#,
        app = quote(app),
        url = quote(url)
    )
}
