//! Update Selector
//!
//! Picks which locally available version the application boots. This is the
//! one decision that determines what code runs, so it is deterministic,
//! synchronous, and side-effect-free: filter to the effective runtime
//! version, take the latest commit, fall back to the embedded bundle.

use crate::update::{SelectedUpdate, UpdateRecord};

/// Observable selector state for a single launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    /// Only the embedded/bundled version exists.
    NoUpdates,
    /// At least one committed record is compatible with this runtime.
    CandidateAvailable,
    /// A boot choice has been made. Terminal for this launch.
    Selected,
}

/// Choose the update to launch from the committed records.
///
/// Candidates are records whose `runtime_version` exactly equals
/// `effective_runtime_version`. Among candidates the latest `committed_at`
/// wins; an identical timestamp (clock coarseness) is broken by
/// lexicographically greatest `id`, so selection is a total order and
/// reproducible. No candidates means the embedded fallback.
pub fn select_update_to_launch(
    records: &[UpdateRecord],
    effective_runtime_version: &str,
) -> SelectedUpdate {
    let best = records
        .iter()
        .filter(|r| r.runtime_version == effective_runtime_version)
        .max_by(|a, b| {
            a.committed_at
                .cmp(&b.committed_at)
                .then_with(|| a.id.cmp(&b.id))
        });

    match best {
        Some(record) => SelectedUpdate::Stored(record.clone()),
        None => SelectedUpdate::Embedded,
    }
}

/// State a selector would report for the given candidate set, before and
/// after the launch decision.
pub fn selector_state(records: &[UpdateRecord], runtime_version: &str, selected: bool) -> SelectorState {
    if selected {
        SelectorState::Selected
    } else if records
        .iter()
        .any(|r| r.runtime_version == runtime_version)
    {
        SelectorState::CandidateAvailable
    } else {
        SelectorState::NoUpdates
    }
}
