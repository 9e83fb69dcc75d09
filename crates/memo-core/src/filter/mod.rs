//! Tag filter engine.
//!
//! Pure functions over the current snapshot: deriving the tag universe and
//! applying a conjunctive (AND) multi-tag selection. Inputs are never
//! mutated; recomputation on every snapshot or selection change is a cheap
//! linear scan.

use crate::models::Memo;

/// Distinct tags across the snapshot, in first-seen order.
///
/// First-seen order is stable across recomputation for an unchanged
/// snapshot, so a rendered tag row does not reshuffle.
#[must_use]
pub fn tag_universe(memos: &[Memo]) -> Vec<String> {
    let mut universe: Vec<String> = Vec::new();
    for memo in memos {
        for tag in &memo.tags {
            if !universe.contains(tag) {
                universe.push(tag.clone());
            }
        }
    }
    universe
}

/// Memos whose tag list contains every selected tag.
///
/// An empty selection filters nothing and returns the snapshot as-is. Tag
/// equality is literal string equality.
#[must_use]
pub fn apply_filter(memos: &[Memo], selected_tags: &[String]) -> Vec<Memo> {
    if selected_tags.is_empty() {
        return memos.to_vec();
    }
    memos
        .iter()
        .filter(|memo| selected_tags.iter().all(|tag| memo.tags.contains(tag)))
        .cloned()
        .collect()
}

/// Toggle a tag's membership in the selection.
///
/// Removes the tag when present, appends it otherwise. Applying the same
/// toggle twice restores the original selection.
#[must_use]
pub fn toggle_tag(selected_tags: &[String], tag: &str) -> Vec<String> {
    if selected_tags.iter().any(|selected| selected == tag) {
        selected_tags
            .iter()
            .filter(|selected| selected.as_str() != tag)
            .cloned()
            .collect()
    } else {
        let mut next = selected_tags.to_vec();
        next.push(tag.to_string());
        next
    }
}
