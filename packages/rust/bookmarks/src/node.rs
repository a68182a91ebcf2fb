//! The bookmark tree node and its JSON shape.
//!
//! On disk a node is `{"name": .., "type": "folder", "children": [..]}` or
//! `{"name": .., "type": "bookmark", "url": ..}`. Reading is permissive: any
//! `type` other than `"folder"` (including none) is a bookmark, and a folder
//! without `children` is empty.

use serde::{Deserialize, Serialize};

/// A folder or a bookmark in the hierarchical store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", try_from = "RawNode")]
pub enum BookmarkNode {
    Folder {
        name: String,
        children: Vec<BookmarkNode>,
    },
    Bookmark {
        name: String,
        url: String,
    },
}

impl BookmarkNode {
    /// An empty folder.
    pub fn folder(name: impl Into<String>) -> Self {
        Self::Folder {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// A leaf bookmark.
    pub fn bookmark(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Bookmark {
            name: name.into(),
            url: url.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Folder { name, .. } | Self::Bookmark { name, .. } => name,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder { .. })
    }

    /// The bookmark's URL; `None` for folders.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Bookmark { url, .. } => Some(url),
            Self::Folder { .. } => None,
        }
    }

    /// A folder's children; empty for bookmarks.
    pub fn children(&self) -> &[BookmarkNode] {
        match self {
            Self::Folder { children, .. } => children,
            Self::Bookmark { .. } => &[],
        }
    }

    /// Mutable access to a folder's children; `None` for bookmarks.
    pub fn children_mut(&mut self) -> Option<&mut Vec<BookmarkNode>> {
        match self {
            Self::Folder { children, .. } => Some(children),
            Self::Bookmark { .. } => None,
        }
    }
}

/// Wire form accepted on read.
#[derive(Debug, Deserialize)]
struct RawNode {
    name: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    children: Option<Vec<RawNode>>,
    #[serde(default)]
    url: Option<String>,
}

impl TryFrom<RawNode> for BookmarkNode {
    type Error = String;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        if raw.kind.as_deref() == Some("folder") {
            let children = raw
                .children
                .unwrap_or_default()
                .into_iter()
                .map(BookmarkNode::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Self::Folder {
                name: raw.name,
                children,
            });
        }

        match raw.url {
            Some(url) => Ok(Self::Bookmark {
                name: raw.name,
                url,
            }),
            None => Err(format!("bookmark '{}' has no url", raw.name)),
        }
    }
}
