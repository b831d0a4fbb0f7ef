use std::collections::{HashMap, HashSet};

use crate::api::RequestEvent;

/// Per-source request outcome counts, recomputed from scratch every time
/// the event list changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub ip: String,
    pub total: u64,
    /// 2xx
    pub ok: u64,
    /// 429
    pub blocked: u64,
    /// 5xx
    pub err5xx: u64,
}

/// Groups events by source address.
///
/// Events without a source address or a numeric status are skipped. Each
/// counted event lands in at most one bucket; status classes outside
/// {2xx, 429, 5xx} only increment the total. Rows come back sorted by
/// total descending, ties keeping first-seen order.
pub fn summarize_sources(events: &[RequestEvent]) -> Vec<SourceSummary> {
    let mut rows: Vec<SourceSummary> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for event in events {
        let (Some(ip), Some(status)) = (event.ip.as_deref(), event.status) else {
            continue;
        };
        let slot = match index.get(ip).copied() {
            Some(i) => i,
            None => {
                index.insert(ip.to_string(), rows.len());
                rows.push(SourceSummary {
                    ip: ip.to_string(),
                    total: 0,
                    ok: 0,
                    blocked: 0,
                    err5xx: 0,
                });
                rows.len() - 1
            }
        };
        let row = &mut rows[slot];

        row.total += 1;
        match status {
            200..=299 => row.ok += 1,
            429 => row.blocked += 1,
            500..=599 => row.err5xx += 1,
            _ => {}
        }
    }

    // stable sort keeps first-seen order among equal totals
    rows.sort_by(|a, b| b.total.cmp(&a.total));
    rows
}

/// Statically configured set of addresses classified as attack traffic.
/// Display-only; nothing in the engine behaves differently for them.
#[derive(Debug, Clone, Default)]
pub struct KnownSourceSet {
    addresses: HashSet<String>,
}

impl KnownSourceSet {
    pub fn new<I, S>(addresses: I) -> KnownSourceSet
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KnownSourceSet {
            addresses: addresses.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, ip: &str) -> bool {
        self.addresses.contains(ip)
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(ip: Option<&str>, status: Option<u16>) -> RequestEvent {
        RequestEvent {
            ip: ip.map(str::to_string),
            status,
            ..RequestEvent::default()
        }
    }

    #[test]
    fn groups_and_orders_by_total() {
        let events = [
            event(Some("10.10.10.10"), Some(429)),
            event(Some("10.10.10.10"), Some(200)),
            event(Some("1.2.3.4"), Some(500)),
        ];
        let rows = summarize_sources(&events);
        assert_eq!(
            rows,
            vec![
                SourceSummary {
                    ip: "10.10.10.10".to_string(),
                    total: 2,
                    ok: 1,
                    blocked: 1,
                    err5xx: 0,
                },
                SourceSummary {
                    ip: "1.2.3.4".to_string(),
                    total: 1,
                    ok: 0,
                    blocked: 0,
                    err5xx: 1,
                },
            ]
        );
    }

    #[test]
    fn skips_events_missing_source_or_status() {
        let events = [
            event(None, Some(200)),
            event(Some("1.2.3.4"), None),
            event(Some("1.2.3.4"), Some(200)),
        ];
        let rows = summarize_sources(&events);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total, 1);
    }

    #[test]
    fn unclassified_statuses_count_toward_total_only() {
        let events = [
            event(Some("1.2.3.4"), Some(403)),
            event(Some("1.2.3.4"), Some(301)),
            event(Some("1.2.3.4"), Some(200)),
        ];
        let rows = summarize_sources(&events);
        assert_eq!(rows[0].total, 3);
        assert_eq!(rows[0].ok, 1);
        assert_eq!(rows[0].blocked, 0);
        assert_eq!(rows[0].err5xx, 0);
        assert!(rows[0].ok + rows[0].blocked + rows[0].err5xx <= rows[0].total);
    }

    #[test]
    fn totals_account_for_every_counted_event() {
        let events = [
            event(Some("a"), Some(200)),
            event(Some("b"), Some(429)),
            event(Some("b"), Some(503)),
            event(None, Some(200)),
            event(Some("c"), None),
        ];
        let rows = summarize_sources(&events);
        let counted = events
            .iter()
            .filter(|e| e.ip.is_some() && e.status.is_some())
            .count() as u64;
        assert_eq!(rows.iter().map(|r| r.total).sum::<u64>(), counted);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let events = [
            event(Some("b"), Some(200)),
            event(Some("a"), Some(200)),
            event(Some("c"), Some(200)),
        ];
        let order: Vec<_> = summarize_sources(&events)
            .into_iter()
            .map(|r| r.ip)
            .collect();
        assert_eq!(order, ["b", "a", "c"]);
    }

    #[test]
    fn known_source_set_matches_exact_addresses() {
        let known = KnownSourceSet::new(["10.10.10.10"]);
        assert!(known.contains("10.10.10.10"));
        assert!(!known.contains("10.10.10.11"));
    }
}
