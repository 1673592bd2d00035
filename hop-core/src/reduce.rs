//! Match-set reduction and response shaping
//!
//! Given the full match set for a query, compute the common root shared by
//! all matches and shape the response as a single go-to path, a scored
//! listing, or a completion list in frecency order.

use crate::matcher::{Match, MatchOutcome};

/// Longest path prefix, at component boundaries, shared by every match.
///
/// The filesystem root is never a useful common root and is suppressed.
/// Requires at least one match.
pub fn common_root(matches: &[Match]) -> Option<String> {
    let first = &matches.first()?.path;
    let mut common: Vec<&str> = first.split('/').collect();
    for m in &matches[1..] {
        let components: Vec<&str> = m.path.split('/').collect();
        let shared = common
            .iter()
            .zip(components.iter())
            .take_while(|(a, b)| a == b)
            .count();
        common.truncate(shared);
        if common.len() <= 1 {
            // Only the empty leading component survived: root-level split.
            return None;
        }
    }
    let root = common.join("/");
    if root.is_empty() || root == "/" {
        None
    } else {
        Some(root)
    }
}

/// The single go-to answer: the common root when one exists, otherwise the
/// best match. `literal_best` disables the common-root preference.
pub fn single(outcome: &MatchOutcome, literal_best: bool) -> String {
    if !literal_best {
        if let Some(root) = common_root(&outcome.matches) {
            return root;
        }
    }
    outcome.best_match().path.clone()
}

/// Human-readable listing: every non-zero-scoring match as a fixed-width
/// score plus path, ascending by score, with a `common:` header when more
/// than one match exists and a common root was found.
pub fn list_lines(outcome: &MatchOutcome) -> Vec<String> {
    let mut scored: Vec<&Match> = outcome
        .matches
        .iter()
        .filter(|m| m.score != 0.0)
        .collect();
    scored.sort_by(|a, b| {
        a.score
            .total_cmp(&b.score)
            .then_with(|| a.path.cmp(&b.path))
    });

    let mut lines = Vec::with_capacity(scored.len() + 1);
    if outcome.matches.len() > 1 {
        if let Some(root) = common_root(&outcome.matches) {
            lines.push(format!("common:    {}", root));
        }
    }
    for m in scored {
        lines.push(format!("{:<10.2} {}", m.score, m.path));
    }
    lines
}

/// Completion feed: every match's path, strictly descending by score.
pub fn completion_paths(outcome: &MatchOutcome) -> Vec<String> {
    let mut matches: Vec<&Match> = outcome.matches.iter().collect();
    matches.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.path.cmp(&b.path))
    });
    matches.into_iter().map(|m| m.path.clone()).collect()
}
