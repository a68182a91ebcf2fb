//! Grouping by host and the ordered dispatch plan.
//!
//! Planning is pure: it fixes which URLs go in which batch and where the
//! pauses fall. Pause lengths are sampled later, at the moment of sleeping.

use url::Url;

use nexus_shared::DispatchConfig;

/// Group key for URLs whose host cannot be parsed.
pub const UNKNOWN_HOST: &str = "unknown";

/// URLs sharing one lower-cased host, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainGroup {
    pub host: String,
    pub urls: Vec<String>,
}

impl DomainGroup {
    pub fn is_known_host(&self) -> bool {
        self.host != UNKNOWN_HOST
    }
}

/// One contiguous run of channel calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchBatch {
    pub host: String,
    pub urls: Vec<String>,
    /// The first URL opens the session's window; everything else is a tab.
    pub is_first_of_session: bool,
    pub private_mode: bool,
}

/// Kind of wait between batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// After the window-opening URL of a staggered first group.
    Settle,
    /// After sub-batch `n` of a staggered group.
    SubBatch(usize),
    /// Between two groups.
    InterGroup { known_host: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    BeginGroup { host: String, count: usize },
    Open(DispatchBatch),
    Wait(Pause),
}

/// Partition `urls` by host, keeping first-seen order of hosts and of URLs
/// within each host.
pub fn group_by_host(urls: &[String]) -> Vec<DomainGroup> {
    let mut groups: Vec<DomainGroup> = Vec::new();
    for url in urls {
        let host = host_key(url);
        match groups.iter_mut().find(|g| g.host == host) {
            Some(group) => group.urls.push(url.clone()),
            None => groups.push(DomainGroup {
                host,
                urls: vec![url.clone()],
            }),
        }
    }
    groups
}

fn host_key(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| UNKNOWN_HOST.to_string())
}

/// Lay out the full sequence of batches and pauses for one dispatch.
///
/// Only the first group's first URL opens a window. A group larger than
/// `stagger_threshold` opens its head URL alone, pauses, then sends the rest
/// in chunks of `max_same_host_batch` with growing pauses between chunks.
/// No pause follows the last chunk of a group or the last group.
pub fn plan(groups: &[DomainGroup], config: &DispatchConfig, private_mode: bool) -> Vec<Step> {
    let chunk_size = config.max_same_host_batch.max(1);
    let mut steps = Vec::new();

    for (index, group) in groups.iter().enumerate() {
        let first_group = index == 0;
        let batch = |urls: &[String], is_first_of_session: bool| {
            Step::Open(DispatchBatch {
                host: group.host.clone(),
                urls: urls.to_vec(),
                is_first_of_session,
                private_mode,
            })
        };

        steps.push(Step::BeginGroup {
            host: group.host.clone(),
            count: group.urls.len(),
        });

        if group.urls.len() > config.stagger_threshold {
            let (head, rest) = group.urls.split_at(1);
            steps.push(batch(head, first_group));
            steps.push(Step::Wait(if first_group {
                Pause::Settle
            } else {
                Pause::SubBatch(0)
            }));

            let chunks: Vec<&[String]> = rest.chunks(chunk_size).collect();
            let last = chunks.len().saturating_sub(1);
            for (n, chunk) in chunks.into_iter().enumerate() {
                steps.push(batch(chunk, false));
                if n < last {
                    steps.push(Step::Wait(Pause::SubBatch(n + 1)));
                }
            }
        } else {
            steps.push(batch(&group.urls, first_group));
        }

        if index + 1 < groups.len() {
            steps.push(Step::Wait(Pause::InterGroup {
                known_host: group.is_known_host(),
            }));
        }
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn batches(steps: &[Step]) -> Vec<&DispatchBatch> {
        steps
            .iter()
            .filter_map(|s| match s {
                Step::Open(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn groups_preserve_first_seen_order() {
        let input = urls(&[
            "https://b.com/1",
            "https://A.com/1",
            "https://b.com/2",
            "https://a.com/2",
            "mailto:nobody",
        ]);
        let groups = group_by_host(&input);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].host, "b.com");
        assert_eq!(groups[0].urls, urls(&["https://b.com/1", "https://b.com/2"]));
        assert_eq!(groups[1].host, "a.com");
        assert_eq!(groups[1].urls, urls(&["https://A.com/1", "https://a.com/2"]));
        assert_eq!(groups[2].host, UNKNOWN_HOST);
        assert!(!groups[2].is_known_host());
    }

    #[test]
    fn small_groups_are_single_batches() {
        let input = urls(&[
            "https://a.com/1",
            "https://a.com/2",
            "https://a.com/3",
            "https://b.com/1",
            "https://b.com/2",
        ]);
        let steps = plan(&group_by_host(&input), &DispatchConfig::default(), true);

        assert_eq!(
            steps,
            vec![
                Step::BeginGroup {
                    host: "a.com".into(),
                    count: 3
                },
                Step::Open(DispatchBatch {
                    host: "a.com".into(),
                    urls: input[..3].to_vec(),
                    is_first_of_session: true,
                    private_mode: true,
                }),
                Step::Wait(Pause::InterGroup { known_host: true }),
                Step::BeginGroup {
                    host: "b.com".into(),
                    count: 2
                },
                Step::Open(DispatchBatch {
                    host: "b.com".into(),
                    urls: input[3..].to_vec(),
                    is_first_of_session: false,
                    private_mode: true,
                }),
            ]
        );
    }

    #[test]
    fn large_first_group_is_staggered() {
        let input: Vec<String> = (1..=8).map(|i| format!("https://a.com/{i}")).collect();
        let steps = plan(&group_by_host(&input), &DispatchConfig::default(), false);

        let opened = batches(&steps);
        assert_eq!(opened.len(), 4);
        assert_eq!(opened[0].urls, input[..1].to_vec());
        assert!(opened[0].is_first_of_session);
        assert_eq!(opened[1].urls, input[1..4].to_vec());
        assert_eq!(opened[2].urls, input[4..7].to_vec());
        assert_eq!(opened[3].urls, input[7..].to_vec());
        assert!(opened[1..].iter().all(|b| !b.is_first_of_session));

        let waits: Vec<Pause> = steps
            .iter()
            .filter_map(|s| match s {
                Step::Wait(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert_eq!(
            waits,
            vec![Pause::Settle, Pause::SubBatch(1), Pause::SubBatch(2)]
        );
        assert!(matches!(steps.last(), Some(Step::Open(_))));
    }

    #[test]
    fn later_staggered_group_reuses_window() {
        let mut input = urls(&["https://a.com/"]);
        input.extend((1..=6).map(|i| format!("https://b.com/{i}")));
        let steps = plan(&group_by_host(&input), &DispatchConfig::default(), true);

        let opened = batches(&steps);
        assert!(opened[0].is_first_of_session);
        assert!(opened[1..].iter().all(|b| !b.is_first_of_session));

        let b_urls: Vec<&String> = opened[1..].iter().flat_map(|b| b.urls.iter()).collect();
        assert_eq!(b_urls.len(), 6);

        assert!(steps.contains(&Step::Wait(Pause::SubBatch(0))));
        assert!(!steps.contains(&Step::Wait(Pause::Settle)));
    }

    #[test]
    fn threshold_boundary_is_not_staggered() {
        let input: Vec<String> = (1..=5).map(|i| format!("https://a.com/{i}")).collect();
        let steps = plan(&group_by_host(&input), &DispatchConfig::default(), true);
        assert_eq!(batches(&steps).len(), 1);
        assert!(!steps.iter().any(|s| matches!(s, Step::Wait(_))));
    }

    #[test]
    fn unknown_group_pause_has_no_host_penalty() {
        let input = urls(&["not-a-url", "https://a.com/"]);
        let steps = plan(&group_by_host(&input), &DispatchConfig::default(), true);
        assert!(steps.contains(&Step::Wait(Pause::InterGroup { known_host: false })));
    }
}
