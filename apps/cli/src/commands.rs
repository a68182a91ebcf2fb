//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use nexus_bookmarks::{BookmarkNode, BookmarkStore};
use nexus_dispatch::{AppleScriptChannel, DispatchReport, Scheduler, StatusReporter};
use nexus_extract::{ClipboardPayload, Extractor};
use nexus_shared::{
    AppConfig, BookmarksConfig, DispatchConfig, ExtractConfig, init_config, load_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Nexus: extract, bookmark, and open URLs.
#[derive(Parser)]
#[command(
    name = "nexus",
    version,
    about = "Extract URLs from pasted text, organize them as bookmarks, and open them with anti-throttling pacing.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Where to read pasted content from.
#[derive(clap::Args, Debug)]
pub(crate) struct InputArgs {
    /// Read from a file instead of stdin.
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Treat the input as an HTML clipboard payload (anchor targets win).
    #[arg(long)]
    pub html: bool,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Print the canonical URLs found in the input.
    Extract {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Extract URLs and open them in the browser.
    Open {
        #[command(flatten)]
        input: InputArgs,

        /// Open the first window in private mode.
        #[arg(long, conflicts_with = "no_private")]
        private: bool,

        /// Open the first window in normal mode.
        #[arg(long)]
        no_private: bool,
    },

    /// Extract URLs and file them into bookmark folders by domain.
    Save {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Bookmark management.
    Bookmarks {
        #[command(subcommand)]
        action: BookmarksAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Bookmark subcommands.
#[derive(Subcommand)]
pub(crate) enum BookmarksAction {
    /// Print the bookmark tree.
    List {
        /// Only show entries whose name or URL contains this text.
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Write the bookmark tree to a JSON file.
    Export {
        /// Destination path.
        path: PathBuf,
    },
    /// Open every bookmark under a top-level folder.
    Open {
        /// Folder name.
        folder: String,

        /// Open the first window in private mode.
        #[arg(long, conflicts_with = "no_private")]
        private: bool,

        /// Open the first window in normal mode.
        #[arg(long)]
        no_private: bool,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "nexus=info",
        1 => "nexus=debug",
        _ => "nexus=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    // Init must work even when the existing file is invalid.
    if let Command::Config {
        action: ConfigAction::Init,
    } = cli.command
    {
        return cmd_config_init();
    }
    let config = load_config()?;

    match cli.command {
        Command::Extract { input } => cmd_extract(&config, &input),
        Command::Open {
            input,
            private,
            no_private,
        } => cmd_open(&config, &input, private_flag(private, no_private)).await,
        Command::Save { input } => cmd_save(&config, &input),
        Command::Bookmarks { action } => match action {
            BookmarksAction::List { search } => cmd_bookmarks_list(&config, search.as_deref()),
            BookmarksAction::Export { path } => cmd_bookmarks_export(&config, &path),
            BookmarksAction::Open {
                folder,
                private,
                no_private,
            } => {
                cmd_bookmarks_open(&config, &folder, private_flag(private, no_private)).await
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

/// `Some(true)` for `--private`, `Some(false)` for `--no-private`, else the
/// configured default applies.
fn private_flag(private: bool, no_private: bool) -> Option<bool> {
    match (private, no_private) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Extraction commands
// ---------------------------------------------------------------------------

fn read_input(file: Option<&Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) => {
            std::fs::read(path).wrap_err_with(|| format!("cannot read {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .wrap_err("cannot read stdin")?;
            Ok(buf)
        }
    }
}

fn extract_from(config: &AppConfig, input: &InputArgs) -> Result<Vec<String>> {
    let bytes = read_input(input.file.as_deref())?;
    let extractor = Extractor::new(ExtractConfig::from(config));

    let urls = if input.html {
        let payload = ClipboardPayload::Html {
            html: String::from_utf8_lossy(&bytes).into_owned(),
            text: None,
        };
        extractor.extract_payload(&payload)
    } else {
        extractor.extract_lossy(&bytes)
    };

    info!(count = urls.len(), html = input.html, "extracted urls");
    Ok(urls)
}

fn cmd_extract(config: &AppConfig, input: &InputArgs) -> Result<()> {
    for url in extract_from(config, input)? {
        println!("{url}");
    }
    Ok(())
}

async fn cmd_open(config: &AppConfig, input: &InputArgs, private: Option<bool>) -> Result<()> {
    let urls = extract_from(config, input)?;
    if urls.is_empty() {
        return Err(eyre!("no URLs found in input"));
    }
    dispatch(config, urls, private).await
}

fn cmd_save(config: &AppConfig, input: &InputArgs) -> Result<()> {
    let urls = extract_from(config, input)?;
    if urls.is_empty() {
        return Err(eyre!("no URLs found in input"));
    }

    let store = open_store(config)?;
    let mut nodes = store.load();
    let filed = nexus_bookmarks::file_by_domain(&mut nodes, &urls);
    if !store.save(&nodes) {
        return Err(eyre!("failed to save bookmarks to {}", store.path().display()));
    }

    println!("Saved {filed} bookmarks to {}", store.path().display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Bookmark commands
// ---------------------------------------------------------------------------

fn open_store(config: &AppConfig) -> Result<BookmarkStore> {
    Ok(BookmarkStore::new(BookmarksConfig::try_from(config)?))
}

fn cmd_bookmarks_list(config: &AppConfig, search: Option<&str>) -> Result<()> {
    let store = open_store(config)?;
    let nodes = store.load();
    let shown = match search {
        Some(query) => nexus_bookmarks::filter(&nodes, query),
        None => nodes,
    };

    if shown.is_empty() {
        println!("No matching bookmarks.");
        return Ok(());
    }
    print_tree(&shown, 0);
    println!();
    println!("{} bookmarks", nexus_bookmarks::count_bookmarks(&shown));
    Ok(())
}

fn print_tree(nodes: &[BookmarkNode], depth: usize) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            BookmarkNode::Folder { name, children } => {
                println!("{indent}{name}/");
                print_tree(children, depth + 1);
            }
            BookmarkNode::Bookmark { name, url } => {
                println!("{indent}{name}  <{url}>");
            }
        }
    }
}

fn cmd_bookmarks_export(config: &AppConfig, path: &Path) -> Result<()> {
    let store = open_store(config)?;
    let nodes = store.load();
    BookmarkStore::export(&nodes, path)?;
    println!(
        "Exported {} bookmarks to {}",
        nexus_bookmarks::count_bookmarks(&nodes),
        path.display()
    );
    Ok(())
}

async fn cmd_bookmarks_open(config: &AppConfig, folder: &str, private: Option<bool>) -> Result<()> {
    let store = open_store(config)?;
    let nodes = store.load();
    let node = nodes
        .iter()
        .find(|n| n.is_folder() && n.name().eq_ignore_ascii_case(folder))
        .ok_or_else(|| eyre!("no top-level folder named '{folder}'"))?;

    let urls = nexus_bookmarks::collect_urls(node);
    if urls.is_empty() {
        return Err(eyre!("folder '{}' has no bookmarks", node.name()));
    }
    dispatch(config, urls, private).await
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

async fn dispatch(config: &AppConfig, urls: Vec<String>, private: Option<bool>) -> Result<()> {
    let dispatch_config = DispatchConfig::from(config);
    let private_mode = private.unwrap_or(dispatch_config.private_mode);
    let channel = Arc::new(AppleScriptChannel::new(dispatch_config.browser.clone()));
    let scheduler = Arc::new(Scheduler::new(dispatch_config, channel));

    info!(count = urls.len(), private_mode, "opening urls");
    let status = Arc::new(CliStatus::new(urls.len()));
    let report = scheduler
        .spawn_dispatch(urls, private_mode, status)
        .await
        .wrap_err("dispatch task failed")?;

    println!();
    println!("  Opened: {}", report.opened());
    println!("  Failed: {}", report.failed());
    println!("  Time:   {:.1}s", report.elapsed.as_secs_f64());
    println!();

    if !report.ready {
        return Err(eyre!("browser did not become ready"));
    }
    if !report.success() {
        return Err(eyre!("{} URLs failed to open", report.failed()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI status reporter
// ---------------------------------------------------------------------------

/// Dispatch status as an indicatif spinner plus one line per URL.
struct CliStatus {
    spinner: ProgressBar,
}

impl CliStatus {
    fn new(total: usize) -> Self {
        let spinner = ProgressBar::new(total as u64);
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        spinner.set_message("Checking browser");
        Self { spinner }
    }
}

impl StatusReporter for CliStatus {
    fn group_started(&self, host: &str, count: usize) {
        self.spinner.set_message(format!("{host} ({count})"));
    }

    fn url_opened(&self, url: &str, ok: bool) {
        let mark = if ok { "ok  " } else { "FAIL" };
        self.spinner.println(format!("  {mark} {url}"));
        self.spinner.inc(1);
    }

    fn done(&self, _report: &DispatchReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn parses_open_flags() {
        let cli = Cli::parse_from(["nexus", "open", "--file", "links.txt", "--no-private"]);
        match cli.command {
            Command::Open {
                input,
                private,
                no_private,
            } => {
                assert_eq!(input.file, Some(PathBuf::from("links.txt")));
                assert!(!input.html);
                assert_eq!(private_flag(private, no_private), Some(false));
            }
            _ => panic!("expected open"),
        }
    }

    #[test]
    fn private_flags_conflict() {
        assert!(Cli::try_parse_from(["nexus", "open", "--private", "--no-private"]).is_err());
    }

    #[test]
    fn private_defaults_to_config() {
        assert_eq!(private_flag(false, false), None);
        assert_eq!(private_flag(true, false), Some(true));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "nexus",
            "bookmarks",
            "list",
            "-s",
            "rust",
            "-vv",
            "--log-format",
            "json",
        ]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert!(matches!(
            cli.command,
            Command::Bookmarks {
                action: BookmarksAction::List { search: Some(ref s) }
            } if s == "rust"
        ));
    }

    #[test]
    fn reads_input_file() {
        let path = std::env::temp_dir().join(format!("nexus_cli_input_{}.txt", Uuid::now_v7()));
        std::fs::write(&path, "see https://example.com and notes.txt").expect("write");
        let config = AppConfig::default();
        let input = InputArgs {
            file: Some(path.clone()),
            html: false,
        };
        assert_eq!(
            extract_from(&config, &input).expect("extract"),
            vec!["https://example.com".to_string()]
        );
        std::fs::remove_file(path).ok();
    }
}
