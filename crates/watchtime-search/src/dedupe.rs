//! Hash-level result merging.
//!
//! Providers frequently return the same release. Results are merged by
//! infohash, first arrival keeping its slot so output order follows
//! provider order. Later duplicates only contribute fields the first
//! arrival was missing, except accuracy (best wins) and title (longest
//! wins).

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::types::MergedResult;

pub fn dedupe(entries: Vec<MergedResult>) -> Vec<MergedResult> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, MergedResult> = HashMap::new();

    for entry in entries {
        match merged.entry(entry.hash.clone()) {
            Entry::Occupied(mut slot) => merge(slot.get_mut(), entry),
            Entry::Vacant(slot) => {
                order.push(entry.hash.clone());
                slot.insert(entry);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|hash| merged.remove(&hash))
        .collect()
}

fn merge(kept: &mut MergedResult, entry: MergedResult) {
    kept.providers.extend(entry.providers);

    if entry.accuracy <= kept.accuracy {
        kept.accuracy = entry.accuracy;
    }
    if entry.title.chars().count() > kept.title.chars().count() {
        kept.title = entry.title;
    }
    if kept.link.is_none() {
        kept.link = entry.link;
    }
    if kept.id.is_none() {
        kept.id = entry.id;
    }
    if kept.seeders == 0 {
        kept.seeders = entry.seeders;
    }
    if kept.leechers == 0 {
        kept.leechers = entry.leechers;
    }
    if kept.downloads == 0 {
        kept.downloads = entry.downloads;
    }
    if kept.size == 0 {
        kept.size = entry.size;
    }
    if kept.date.is_none() {
        kept.date = entry.date;
    }
    if kept.kind.is_none() {
        kept.kind = entry.kind;
    }
}
