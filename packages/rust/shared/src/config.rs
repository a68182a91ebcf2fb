//! Application configuration for Nexus.
//!
//! User config lives at `~/.nexus/nexus.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NexusError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "nexus.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".nexus";

/// Default bookmark file name inside the config directory.
const BOOKMARKS_FILE_NAME: &str = "bookmarks_v2.json";

// ---------------------------------------------------------------------------
// Config structs (matching nexus.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// URL extraction settings.
    #[serde(default)]
    pub extraction: ExtractionSection,

    /// Browser dispatch pacing.
    #[serde(default)]
    pub dispatch: DispatchSection,

    /// Bookmark store location and well-known folders.
    #[serde(default)]
    pub bookmarks: BookmarksSection,
}

/// `[extraction]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSection {
    /// Input longer than this many characters is truncated before processing.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// Candidates longer than this are rejected.
    #[serde(default = "default_max_url_len")]
    pub max_url_len: usize,

    /// Schemes accepted on candidates that carry one.
    #[serde(default = "default_supported_protocols")]
    pub supported_protocols: Vec<String>,

    /// Run the multi-pattern extractor; `false` uses only the combined fallback pattern.
    #[serde(default = "default_true")]
    pub enhanced: bool,

    /// URL-shortener hosts matched ahead of the generic patterns.
    #[serde(default = "default_shorteners")]
    pub shorteners: Vec<String>,

    /// Extensions that mark a bare `name.ext` candidate as a filename.
    #[serde(default = "default_blocked_extensions")]
    pub blocked_extensions: Vec<String>,
}

impl Default for ExtractionSection {
    fn default() -> Self {
        Self {
            max_input_chars: default_max_input_chars(),
            max_url_len: default_max_url_len(),
            supported_protocols: default_supported_protocols(),
            enhanced: true,
            shorteners: default_shorteners(),
            blocked_extensions: default_blocked_extensions(),
        }
    }
}

fn default_max_input_chars() -> usize {
    10_000
}
fn default_max_url_len() -> usize {
    2048
}
fn default_supported_protocols() -> Vec<String> {
    ["http", "https", "ftp", "ftps"].map(String::from).to_vec()
}
fn default_shorteners() -> Vec<String> {
    [
        "bit.ly",
        "tinyurl.com",
        "t.co",
        "goo.gl",
        "short.link",
        "is.gd",
        "v.gd",
        "ow.ly",
        "buff.ly",
        "rebrand.ly",
        "tiny.cc",
        "shorturl.at",
    ]
    .map(String::from)
    .to_vec()
}
fn default_blocked_extensions() -> Vec<String> {
    [
        "txt", "md", "png", "jpg", "jpeg", "gif", "svg", "pdf", "doc", "docx", "xls", "xlsx",
        "ppt", "pptx", "zip", "rar", "7z", "py", "js", "css", "html", "mp3", "mp4", "avi", "mov",
        "mkv", "exe", "dmg", "pkg", "deb", "rpm",
    ]
    .map(String::from)
    .to_vec()
}
fn default_true() -> bool {
    true
}

/// `[dispatch]` section. All delays are in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSection {
    /// Groups with more URLs than this are opened in staggered sub-batches.
    #[serde(default = "default_stagger_threshold")]
    pub stagger_threshold: usize,

    /// Maximum URLs per staggered sub-batch.
    #[serde(default = "default_max_same_host_batch")]
    pub max_same_host_batch: usize,

    /// Lower bound of the randomized base delay.
    #[serde(default = "default_delay_min_ms")]
    pub delay_min_ms: u64,

    /// Upper bound of the randomized base delay.
    #[serde(default = "default_delay_max_ms")]
    pub delay_max_ms: u64,

    /// Fixed penalty added when pacing a known host.
    #[serde(default = "default_same_host_extra_delay_ms")]
    pub same_host_extra_delay_ms: u64,

    /// Added once per staggered sub-batch index.
    #[serde(default = "default_progressive_delay_increment_ms")]
    pub progressive_delay_increment_ms: u64,

    /// Inter-group jitter bounds.
    #[serde(default = "default_jitter_min_ms")]
    pub jitter_min_ms: u64,
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,

    /// Jitter bounds for the settle pause after the first URL of a session.
    #[serde(default = "default_settle_jitter_min_ms")]
    pub settle_jitter_min_ms: u64,
    #[serde(default = "default_settle_jitter_max_ms")]
    pub settle_jitter_max_ms: u64,

    /// How many times the browser readiness check runs before giving up.
    #[serde(default = "default_readiness_attempts")]
    pub readiness_attempts: u32,

    /// Pause between readiness checks.
    #[serde(default = "default_readiness_retry_delay_ms")]
    pub readiness_retry_delay_ms: u64,

    /// Pause after asking the browser to launch.
    #[serde(default = "default_launch_settle_ms")]
    pub launch_settle_ms: u64,

    /// Upper bound on any single automation call.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Open the first window in private mode.
    #[serde(default = "default_true")]
    pub private_mode: bool,

    /// Application name targeted by the automation channel.
    #[serde(default = "default_browser")]
    pub browser: String,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            stagger_threshold: default_stagger_threshold(),
            max_same_host_batch: default_max_same_host_batch(),
            delay_min_ms: default_delay_min_ms(),
            delay_max_ms: default_delay_max_ms(),
            same_host_extra_delay_ms: default_same_host_extra_delay_ms(),
            progressive_delay_increment_ms: default_progressive_delay_increment_ms(),
            jitter_min_ms: default_jitter_min_ms(),
            jitter_max_ms: default_jitter_max_ms(),
            settle_jitter_min_ms: default_settle_jitter_min_ms(),
            settle_jitter_max_ms: default_settle_jitter_max_ms(),
            readiness_attempts: default_readiness_attempts(),
            readiness_retry_delay_ms: default_readiness_retry_delay_ms(),
            launch_settle_ms: default_launch_settle_ms(),
            call_timeout_ms: default_call_timeout_ms(),
            private_mode: true,
            browser: default_browser(),
        }
    }
}

fn default_stagger_threshold() -> usize {
    5
}
fn default_max_same_host_batch() -> usize {
    3
}
fn default_delay_min_ms() -> u64 {
    3000
}
fn default_delay_max_ms() -> u64 {
    5000
}
fn default_same_host_extra_delay_ms() -> u64 {
    2000
}
fn default_progressive_delay_increment_ms() -> u64 {
    500
}
fn default_jitter_min_ms() -> u64 {
    500
}
fn default_jitter_max_ms() -> u64 {
    1200
}
fn default_settle_jitter_min_ms() -> u64 {
    500
}
fn default_settle_jitter_max_ms() -> u64 {
    1000
}
fn default_readiness_attempts() -> u32 {
    3
}
fn default_readiness_retry_delay_ms() -> u64 {
    1000
}
fn default_launch_settle_ms() -> u64 {
    2000
}
fn default_call_timeout_ms() -> u64 {
    15_000
}
fn default_browser() -> String {
    "Safari".into()
}

/// `[bookmarks]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarksSection {
    /// Bookmark file path. Defaults to `~/.nexus/bookmarks_v2.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Top-level folders guaranteed to exist after every load.
    #[serde(default = "default_well_known_folders")]
    pub well_known_folders: Vec<String>,
}

impl Default for BookmarksSection {
    fn default() -> Self {
        Self {
            file: None,
            well_known_folders: default_well_known_folders(),
        }
    }
}

fn default_well_known_folders() -> Vec<String> {
    ["News", "Apple", "Misc", "Google", "Github", "Fun"]
        .map(String::from)
        .to_vec()
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime extraction configuration.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub max_input_chars: usize,
    pub max_url_len: usize,
    /// Lower-cased scheme allow-list.
    pub supported_protocols: Vec<String>,
    pub enhanced: bool,
    pub shorteners: Vec<String>,
    /// Lower-cased extensions without the leading dot.
    pub blocked_extensions: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ExtractConfig {
    fn from(config: &AppConfig) -> Self {
        let section = &config.extraction;
        Self {
            max_input_chars: section.max_input_chars,
            max_url_len: section.max_url_len,
            supported_protocols: section
                .supported_protocols
                .iter()
                .map(|p| p.to_ascii_lowercase())
                .collect(),
            enhanced: section.enhanced,
            shorteners: section.shorteners.clone(),
            blocked_extensions: section
                .blocked_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }
}

/// Runtime dispatch configuration, every delay as a [`Duration`].
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub stagger_threshold: usize,
    pub max_same_host_batch: usize,
    pub delay_min: Duration,
    pub delay_max: Duration,
    pub same_host_extra_delay: Duration,
    pub progressive_delay_increment: Duration,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
    pub settle_jitter_min: Duration,
    pub settle_jitter_max: Duration,
    pub readiness_attempts: u32,
    pub readiness_retry_delay: Duration,
    pub launch_settle: Duration,
    pub call_timeout: Duration,
    pub private_mode: bool,
    pub browser: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for DispatchConfig {
    fn from(config: &AppConfig) -> Self {
        let d = &config.dispatch;
        Self {
            stagger_threshold: d.stagger_threshold,
            max_same_host_batch: d.max_same_host_batch,
            delay_min: Duration::from_millis(d.delay_min_ms),
            delay_max: Duration::from_millis(d.delay_max_ms),
            same_host_extra_delay: Duration::from_millis(d.same_host_extra_delay_ms),
            progressive_delay_increment: Duration::from_millis(d.progressive_delay_increment_ms),
            jitter_min: Duration::from_millis(d.jitter_min_ms),
            jitter_max: Duration::from_millis(d.jitter_max_ms),
            settle_jitter_min: Duration::from_millis(d.settle_jitter_min_ms),
            settle_jitter_max: Duration::from_millis(d.settle_jitter_max_ms),
            readiness_attempts: d.readiness_attempts,
            readiness_retry_delay: Duration::from_millis(d.readiness_retry_delay_ms),
            launch_settle: Duration::from_millis(d.launch_settle_ms),
            call_timeout: Duration::from_millis(d.call_timeout_ms),
            private_mode: d.private_mode,
            browser: d.browser.clone(),
        }
    }
}

/// Runtime bookmark store configuration with the file path resolved.
#[derive(Debug, Clone)]
pub struct BookmarksConfig {
    pub file: PathBuf,
    pub well_known_folders: Vec<String>,
}

impl TryFrom<&AppConfig> for BookmarksConfig {
    type Error = NexusError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let file = match &config.bookmarks.file {
            Some(path) => expand_home(path)?,
            None => config_dir()?.join(BOOKMARKS_FILE_NAME),
        };
        Ok(Self {
            file,
            well_known_folders: config.bookmarks.well_known_folders.clone(),
        })
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| NexusError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.nexus/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| NexusError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.nexus/nexus.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| NexusError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| NexusError::config(format!("failed to parse {}: {e}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| NexusError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| NexusError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| NexusError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject configurations the core components cannot run with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let x = &config.extraction;
    if x.supported_protocols.is_empty() {
        return Err(NexusError::config(
            "extraction.supported_protocols must not be empty",
        ));
    }
    if x.max_input_chars == 0 || x.max_url_len == 0 {
        return Err(NexusError::config(
            "extraction length limits must be greater than zero",
        ));
    }

    let d = &config.dispatch;
    let ranges = [
        ("delay", d.delay_min_ms, d.delay_max_ms),
        ("jitter", d.jitter_min_ms, d.jitter_max_ms),
        ("settle_jitter", d.settle_jitter_min_ms, d.settle_jitter_max_ms),
    ];
    for (name, min, max) in ranges {
        if min > max {
            return Err(NexusError::config(format!(
                "dispatch.{name}_min_ms ({min}) exceeds dispatch.{name}_max_ms ({max})"
            )));
        }
    }
    if d.max_same_host_batch == 0 {
        return Err(NexusError::config(
            "dispatch.max_same_host_batch must be at least 1",
        ));
    }
    if d.readiness_attempts == 0 {
        return Err(NexusError::config(
            "dispatch.readiness_attempts must be at least 1",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("max_input_chars"));
        assert!(toml_str.contains("bit.ly"));
        assert!(toml_str.contains("Safari"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.extraction.max_input_chars, 10_000);
        assert_eq!(parsed.dispatch.stagger_threshold, 5);
        assert_eq!(parsed.bookmarks.well_known_folders.len(), 6);
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let toml_str = r#"
[dispatch]
delay_min_ms = 100
delay_max_ms = 200

[bookmarks]
file = "/tmp/nexus/bookmarks.json"
well_known_folders = ["Inbox"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.dispatch.delay_min_ms, 100);
        assert_eq!(config.dispatch.max_same_host_batch, 3);
        assert_eq!(config.extraction.max_url_len, 2048);

        let bookmarks = BookmarksConfig::try_from(&config).expect("resolve");
        assert_eq!(bookmarks.file, PathBuf::from("/tmp/nexus/bookmarks.json"));
        assert_eq!(bookmarks.well_known_folders, vec!["Inbox".to_string()]);
    }

    #[test]
    fn dispatch_config_from_app_config() {
        let dispatch = DispatchConfig::from(&AppConfig::default());
        assert_eq!(dispatch.delay_min, Duration::from_secs(3));
        assert_eq!(dispatch.delay_max, Duration::from_secs(5));
        assert_eq!(dispatch.same_host_extra_delay, Duration::from_secs(2));
        assert_eq!(dispatch.readiness_attempts, 3);
    }

    #[test]
    fn extract_config_normalizes_lists() {
        let mut app = AppConfig::default();
        app.extraction.supported_protocols = vec!["HTTPS".into()];
        app.extraction.blocked_extensions = vec![".PDF".into()];
        let extract = ExtractConfig::from(&app);
        assert_eq!(extract.supported_protocols, vec!["https".to_string()]);
        assert_eq!(extract.blocked_extensions, vec!["pdf".to_string()]);
    }

    #[test]
    fn validation_rejects_inverted_ranges() {
        let mut config = AppConfig::default();
        config.dispatch.jitter_min_ms = 900;
        config.dispatch.jitter_max_ms = 100;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("jitter_min_ms"));
    }

    #[test]
    fn validation_rejects_zero_batch() {
        let mut config = AppConfig::default();
        config.dispatch.max_same_host_batch = 0;
        assert!(validate_config(&config).is_err());

        assert!(validate_config(&AppConfig::default()).is_ok());
    }
}
