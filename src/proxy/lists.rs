//! Helpers for the plain string lists passed between sources, probes and files

use std::collections::HashSet;

/// Remove duplicate entries, keeping the first occurrence of each
pub fn remove_duplicates(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Remove zero-length entries, keeping the order of the rest
pub fn remove_empty(items: Vec<String>) -> Vec<String> {
    items.into_iter().filter(|item| !item.is_empty()).collect()
}

/// Sort entries lexicographically in ascending order
pub fn sort(mut items: Vec<String>) -> Vec<String> {
    items.sort();
    items
}

/// Concatenate two lists, `first` before `second`
pub fn combine(mut first: Vec<String>, second: Vec<String>) -> Vec<String> {
    first.extend(second);
    first
}
