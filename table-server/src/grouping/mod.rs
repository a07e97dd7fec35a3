//! Line-item grouping
//!
//! Collapses raw order lines into deduplicated, quantity-summed lines so
//! kitchen tickets and totals never double-count semantically identical
//! lines. Pure and deterministic: the same multiset of inputs yields the
//! same output regardless of input order, up to first-seen ordering.

use shared::order::OrderItem;

/// A merged ticket/receipt line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedLine {
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub qty: i64,
    pub note: Option<String>,
}

impl GroupedLine {
    pub fn total_cents(&self) -> i64 {
        self.unit_price_cents * self.qty
    }
}

/// Grouping key: normalized (name, unit price, note)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupKey {
    name: String,
    unit_price_cents: i64,
    note: Option<String>,
}

/// Lowercase and collapse all whitespace runs to single spaces
fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalize a free-text note: CRLF to LF, per-line trim and internal
/// whitespace collapse, empty lines dropped, rejoined with `\n`.
/// A note that normalizes to nothing becomes None.
pub fn normalize_note(note: Option<&str>) -> Option<String> {
    let note = note?;
    let normalized: Vec<String> = note
        .replace("\r\n", "\n")
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.join("\n"))
    }
}

/// Merge lines sharing a normalized (name, unit price, note) key.
///
/// Lines with qty <= 0 are dropped before merging, so corrupt input can
/// never zero-out a positive line. First-seen order is preserved.
pub fn group(items: &[OrderItem]) -> Vec<GroupedLine> {
    use std::collections::HashMap;

    let mut out: Vec<GroupedLine> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();

    for item in items {
        if item.qty <= 0 {
            continue;
        }
        let note = normalize_note(item.note.as_deref());
        let key = GroupKey {
            name: normalize_name(&item.name_snapshot),
            unit_price_cents: item.unit_price_cents,
            note: note.clone(),
        };
        match index.get(&key) {
            Some(&i) => out[i].qty += item.qty,
            None => {
                index.insert(key, out.len());
                out.push(GroupedLine {
                    name_snapshot: item.name_snapshot.clone(),
                    unit_price_cents: item.unit_price_cents,
                    qty: item.qty,
                    note,
                });
            }
        }
    }
    out
}
