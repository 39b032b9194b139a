//! Credential gating: the single check that decides whether a source may be
//! fetched at all.

use super::descriptor::SourceDescriptor;

/// Whether a fetch may be attempted for `descriptor` with `provided`.
///
/// Returns `false` only when the descriptor requires a credential and none
/// (or a blank one) was provided. No network call may be issued for a source
/// when this returns `false`.
#[must_use]
pub fn can_fetch(descriptor: &SourceDescriptor, provided: Option<&str>) -> bool {
    descriptor.credential().is_none() || provided.is_some_and(|value| !value.trim().is_empty())
}
