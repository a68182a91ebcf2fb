//! Typed operations over a bookmark forest.
//!
//! These are pure edits on `Vec<BookmarkNode>`; persisting the result is the
//! caller's job via [`BookmarkStore::save`](crate::BookmarkStore::save).

use url::Url;

use crate::node::BookmarkNode;

/// Folder used for URLs whose host cannot be determined.
pub const FALLBACK_FOLDER: &str = "Other";

/// Paths at least this long are left out of generated names.
const MAX_TITLE_PATH_LEN: usize = 30;

/// Return the top-level folder called `name`, appending an empty one if absent.
pub fn find_or_create_folder<'a>(
    nodes: &'a mut Vec<BookmarkNode>,
    name: &str,
) -> &'a mut BookmarkNode {
    let index = match nodes.iter().position(|n| n.is_folder() && n.name() == name) {
        Some(index) => index,
        None => {
            nodes.push(BookmarkNode::folder(name));
            nodes.len() - 1
        }
    };
    &mut nodes[index]
}

/// File each URL into a top-level folder named after its host.
///
/// Returns the number of bookmarks added.
pub fn file_by_domain(nodes: &mut Vec<BookmarkNode>, urls: &[String]) -> usize {
    let mut filed = 0;
    for url in urls {
        let folder_name = domain_folder_name(url);
        let folder = find_or_create_folder(nodes, &folder_name);
        if let Some(children) = folder.children_mut() {
            children.push(BookmarkNode::bookmark(bookmark_name(url), url.as_str()));
            filed += 1;
        }
    }
    tracing::debug!(count = filed, "filed bookmarks by domain");
    filed
}

/// Human-readable name for a URL: `"Host - Path Title"` for short paths,
/// otherwise just `"Host"`.
pub fn bookmark_name(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return "Bookmark".to_string();
    };
    let Some(host) = parsed.host_str() else {
        return "Bookmark".to_string();
    };

    let host = capitalize(strip_www(host));
    let path = parsed.path().trim_matches('/');
    if !path.is_empty() && path.chars().count() < MAX_TITLE_PATH_LEN {
        format!("{host} - {}", title_case(&path.replace('/', " ")))
    } else {
        host
    }
}

/// Case-insensitive search over names and URLs.
///
/// A matching folder is kept whole; a non-matching folder is kept with only
/// its matching descendants, and dropped if none match.
pub fn filter(nodes: &[BookmarkNode], query: &str) -> Vec<BookmarkNode> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return nodes.to_vec();
    }
    nodes
        .iter()
        .filter_map(|node| filter_node(node, &query))
        .collect()
}

fn filter_node(node: &BookmarkNode, query: &str) -> Option<BookmarkNode> {
    match node {
        BookmarkNode::Bookmark { name, url } => {
            let hit = name.to_lowercase().contains(query) || url.to_lowercase().contains(query);
            hit.then(|| node.clone())
        }
        BookmarkNode::Folder { name, children } => {
            if name.to_lowercase().contains(query) {
                return Some(node.clone());
            }
            let kept: Vec<BookmarkNode> = children
                .iter()
                .filter_map(|child| filter_node(child, query))
                .collect();
            (!kept.is_empty()).then(|| BookmarkNode::Folder {
                name: name.clone(),
                children: kept,
            })
        }
    }
}

/// Remove and return the node at an index path (`[2, 0]` = first child of
/// the third top-level node). `None` when the path does not resolve.
pub fn remove_at(nodes: &mut Vec<BookmarkNode>, path: &[usize]) -> Option<BookmarkNode> {
    let (&last, parents) = path.split_last()?;
    let siblings = resolve_children(nodes, parents)?;
    (last < siblings.len()).then(|| siblings.remove(last))
}

/// Insert `node` so that it ends up at `path`. The final index may equal the
/// sibling count (append). Returns the node back when the path is invalid.
pub fn insert_at(
    nodes: &mut Vec<BookmarkNode>,
    path: &[usize],
    node: BookmarkNode,
) -> Result<(), BookmarkNode> {
    let Some((&last, parents)) = path.split_last() else {
        return Err(node);
    };
    match resolve_children(nodes, parents) {
        Some(siblings) if last <= siblings.len() => {
            siblings.insert(last, node);
            Ok(())
        }
        _ => Err(node),
    }
}

fn resolve_children<'a>(
    nodes: &'a mut Vec<BookmarkNode>,
    path: &[usize],
) -> Option<&'a mut Vec<BookmarkNode>> {
    let mut current = nodes;
    for &index in path {
        current = current.get_mut(index)?.children_mut()?;
    }
    Some(current)
}

/// Every URL under `node`, depth first.
pub fn collect_urls(node: &BookmarkNode) -> Vec<String> {
    let mut urls = Vec::new();
    push_urls(node, &mut urls);
    urls
}

fn push_urls(node: &BookmarkNode, out: &mut Vec<String>) {
    match node {
        BookmarkNode::Bookmark { url, .. } => out.push(url.clone()),
        BookmarkNode::Folder { children, .. } => {
            for child in children {
                push_urls(child, out);
            }
        }
    }
}

/// Total number of leaf bookmarks in the forest.
pub fn count_bookmarks(nodes: &[BookmarkNode]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            BookmarkNode::Bookmark { .. } => 1,
            BookmarkNode::Folder { children, .. } => count_bookmarks(children),
        })
        .sum()
}

// ---------------------------------------------------------------------------
// Naming helpers
// ---------------------------------------------------------------------------

fn domain_folder_name(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|h| capitalize(strip_www(h))))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_FOLDER.to_string())
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<BookmarkNode> {
        vec![
            BookmarkNode::Folder {
                name: "News".into(),
                children: vec![
                    BookmarkNode::bookmark("Hacker News", "https://news.ycombinator.com"),
                    BookmarkNode::Folder {
                        name: "Tech".into(),
                        children: vec![BookmarkNode::bookmark("LWN", "https://lwn.net")],
                    },
                ],
            },
            BookmarkNode::folder("Fun"),
            BookmarkNode::bookmark("Rust", "https://www.rust-lang.org"),
        ]
    }

    #[test]
    fn find_or_create_reuses_existing_folder() {
        let mut nodes = sample();
        find_or_create_folder(&mut nodes, "News");
        assert_eq!(nodes.len(), 3);

        let created = find_or_create_folder(&mut nodes, "Work");
        assert_eq!(created.name(), "Work");
        assert_eq!(nodes.len(), 4);
    }

    #[test]
    fn find_or_create_ignores_bookmarks_with_same_name() {
        let mut nodes = vec![BookmarkNode::bookmark("Rust", "https://rust-lang.org")];
        find_or_create_folder(&mut nodes, "Rust");
        assert_eq!(nodes.len(), 2);
        assert!(nodes[1].is_folder());
    }

    #[test]
    fn files_urls_under_capitalized_host() {
        let mut nodes = vec![BookmarkNode::folder("Github.com")];
        let urls = vec![
            "https://www.github.com/rust-lang/rust".to_string(),
            "https://docs.rs/tokio".to_string(),
            "https://github.com/".to_string(),
        ];

        assert_eq!(file_by_domain(&mut nodes, &urls), 3);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].name(), "Github.com");
        assert_eq!(nodes[0].children().len(), 2);
        assert_eq!(nodes[1].name(), "Docs.rs");
        assert_eq!(
            nodes[1].children()[0],
            BookmarkNode::bookmark("Docs.rs - Tokio", "https://docs.rs/tokio")
        );
    }

    #[test]
    fn unparsable_urls_go_to_other() {
        let mut nodes = Vec::new();
        file_by_domain(&mut nodes, &["not a url".to_string()]);
        assert_eq!(nodes[0].name(), FALLBACK_FOLDER);
        assert_eq!(nodes[0].children()[0].name(), "Bookmark");
    }

    #[test]
    fn names_include_short_paths_only() {
        assert_eq!(
            bookmark_name("https://www.example.com/blog/my-post"),
            "Example.com - Blog My-Post"
        );
        assert_eq!(bookmark_name("https://example.com/"), "Example.com");
        assert_eq!(
            bookmark_name("https://example.com/a/very/long/path/that/keeps/going"),
            "Example.com"
        );
        assert_eq!(bookmark_name("garbage"), "Bookmark");
    }

    #[test]
    fn filter_keeps_matching_branches() {
        let nodes = sample();

        let hits = filter(&nodes, "LWN");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name(), "News");
        assert_eq!(hits[0].children().len(), 1);
        assert_eq!(hits[0].children()[0].name(), "Tech");

        let by_url = filter(&nodes, "rust-lang");
        assert_eq!(by_url, vec![BookmarkNode::bookmark("Rust", "https://www.rust-lang.org")]);

        let folder_hit = filter(&nodes, "news");
        assert_eq!(folder_hit[0].children().len(), 2);

        assert_eq!(filter(&nodes, "  "), nodes);
        assert!(filter(&nodes, "nothing-matches").is_empty());
    }

    #[test]
    fn remove_and_insert_by_path() {
        let mut nodes = sample();

        let lwn = remove_at(&mut nodes, &[0, 1, 0]).expect("removed");
        assert_eq!(lwn.name(), "LWN");
        assert!(nodes[0].children()[1].children().is_empty());

        insert_at(&mut nodes, &[1, 0], lwn).expect("inserted");
        assert_eq!(nodes[1].children()[0].name(), "LWN");

        assert!(remove_at(&mut nodes, &[9]).is_none());
        assert!(remove_at(&mut nodes, &[2, 0]).is_none());
        assert!(remove_at(&mut nodes, &[]).is_none());

        let orphan = BookmarkNode::folder("Orphan");
        let back = insert_at(&mut nodes, &[2, 0], orphan).unwrap_err();
        assert_eq!(back.name(), "Orphan");

        insert_at(&mut nodes, &[3], BookmarkNode::folder("Last")).expect("append");
        assert_eq!(nodes[3].name(), "Last");
    }

    #[test]
    fn collects_and_counts() {
        let nodes = sample();
        assert_eq!(
            collect_urls(&nodes[0]),
            vec!["https://news.ycombinator.com".to_string(), "https://lwn.net".to_string()]
        );
        assert_eq!(collect_urls(&nodes[2]), vec!["https://www.rust-lang.org".to_string()]);
        assert_eq!(count_bookmarks(&nodes), 3);
    }

    #[test]
    fn title_case_matches_word_boundaries() {
        assert_eq!(title_case("hello WORLD 2nd"), "Hello World 2Nd");
        assert_eq!(capitalize("GITHUB.COM"), "Github.com");
    }
}
