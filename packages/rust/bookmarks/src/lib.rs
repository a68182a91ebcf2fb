//! Hierarchical bookmark store backed by a single JSON document.
//!
//! [`BookmarkStore`] owns three sibling paths: the primary `X.json`, the
//! previous version `X.bak`, and the write staging file `X.tmp`. Saves stage
//! the full document, rotate the primary to the backup, then rename the
//! staging file into place, so the primary path only ever holds a complete
//! document.
//!
//! Neither [`BookmarkStore::load`] nor [`BookmarkStore::save`] returns an
//! error: load falls back to the well-known folders, save reports `false`.

mod node;
pub mod tree;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use nexus_shared::{BookmarksConfig, NexusError, Result};

pub use node::BookmarkNode;
pub use tree::{
    bookmark_name, collect_urls, count_bookmarks, file_by_domain, filter, find_or_create_folder,
    insert_at, remove_at,
};

/// Crash-safe persistence for the bookmark tree.
#[derive(Debug, Clone)]
pub struct BookmarkStore {
    path: PathBuf,
    well_known_folders: Vec<String>,
    #[cfg(test)]
    fail_point: Option<FailPoint>,
}

/// Points in [`BookmarkStore::save`] where tests can force a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailPoint {
    AfterStage,
    AfterRotate,
}

impl BookmarkStore {
    pub fn new(config: BookmarksConfig) -> Self {
        Self {
            path: config.file,
            well_known_folders: config.well_known_folders,
            #[cfg(test)]
            fail_point: None,
        }
    }

    /// Primary document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("bak")
    }

    pub fn staging_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }

    /// The well-known folders, empty, in configured order.
    pub fn defaults(&self) -> Vec<BookmarkNode> {
        self.well_known_folders
            .iter()
            .map(|name| BookmarkNode::folder(name.as_str()))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    /// Read the tree from disk.
    ///
    /// A missing file yields the defaults without writing anything. An
    /// unreadable or malformed file is logged and also yields the defaults.
    /// Missing well-known folders are appended and the result re-saved.
    #[tracing::instrument(skip_all, fields(path = %self.path.display()))]
    pub fn load(&self) -> Vec<BookmarkNode> {
        if !self.path.exists() {
            tracing::info!("no bookmark file, using defaults");
            return self.defaults();
        }

        let mut nodes = match self.read() {
            Ok(nodes) => nodes,
            Err(e) => {
                tracing::error!(error = %e, "failed to load bookmarks, using defaults");
                return self.defaults();
            }
        };

        let added = self.ensure_well_known(&mut nodes);
        if added > 0 {
            tracing::info!(added, "restored missing well-known folders");
            if !self.save(&nodes) {
                tracing::warn!("could not persist restored folders");
            }
        }

        tracing::info!(count = nodes.len(), "loaded top-level bookmark nodes");
        nodes
    }

    fn read(&self) -> Result<Vec<BookmarkNode>> {
        let content =
            fs::read_to_string(&self.path).map_err(|e| NexusError::io(&self.path, e))?;
        serde_json::from_str(&content).map_err(|e| NexusError::parse(e.to_string()))
    }

    /// Append any missing well-known top-level folder; returns how many.
    fn ensure_well_known(&self, nodes: &mut Vec<BookmarkNode>) -> usize {
        let mut added = 0;
        for name in &self.well_known_folders {
            let present = nodes.iter().any(|n| n.is_folder() && n.name() == name);
            if !present {
                nodes.push(BookmarkNode::folder(name.as_str()));
                added += 1;
            }
        }
        added
    }

    // -----------------------------------------------------------------------
    // Save
    // -----------------------------------------------------------------------

    /// Persist the tree. Returns `false` (after logging) on any failure.
    #[tracing::instrument(skip_all, fields(path = %self.path.display()))]
    pub fn save(&self, nodes: &[BookmarkNode]) -> bool {
        match self.write_atomic(nodes) {
            Ok(()) => {
                tracing::info!(count = nodes.len(), "saved bookmarks");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to save bookmarks");
                self.recover();
                false
            }
        }
    }

    fn write_atomic(&self, nodes: &[BookmarkNode]) -> Result<()> {
        let json = serde_json::to_string_pretty(nodes)
            .map_err(|e| NexusError::Storage(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| NexusError::io(parent, e))?;
        }

        let staging = self.staging_path();
        write_synced(&staging, json.as_bytes())?;
        self.inject(FailPoint::AfterStage)?;

        let backup = self.backup_path();
        if self.path.exists() {
            fs::rename(&self.path, &backup).map_err(|e| NexusError::io(&backup, e))?;
        }
        self.inject(FailPoint::AfterRotate)?;

        fs::rename(&staging, &self.path).map_err(|e| NexusError::io(&self.path, e))
    }

    /// Put the backup back if the primary is gone, and drop any staging file.
    fn recover(&self) {
        let backup = self.backup_path();
        if backup.exists() && !self.path.exists() {
            match fs::rename(&backup, &self.path) {
                Ok(()) => tracing::info!("restored bookmarks from backup"),
                Err(e) => tracing::error!(error = %e, "CRITICAL: failed to restore backup"),
            }
        }

        let staging = self.staging_path();
        if staging.exists() {
            if let Err(e) = fs::remove_file(&staging) {
                tracing::warn!(error = %e, path = %staging.display(), "could not remove staging file");
            }
        }
    }

    fn inject(&self, _at: FailPoint) -> Result<()> {
        #[cfg(test)]
        if self.fail_point == Some(_at) {
            return Err(NexusError::Storage("injected failure".into()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Export
    // -----------------------------------------------------------------------

    /// Write the tree as pretty JSON to an arbitrary path (no rotation).
    pub fn export(nodes: &[BookmarkNode], path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(nodes)
            .map_err(|e| NexusError::Storage(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| NexusError::io(parent, e))?;
        }
        fs::write(path, json).map_err(|e| NexusError::io(path, e))?;
        tracing::info!(
            path = %path.display(),
            count = tree::count_bookmarks(nodes),
            "exported bookmarks"
        );
        Ok(())
    }
}

/// Write `bytes` to `path` and fsync before returning.
fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path).map_err(|e| NexusError::io(path, e))?;
    file.write_all(bytes).map_err(|e| NexusError::io(path, e))?;
    file.sync_all().map_err(|e| NexusError::io(path, e))
}
