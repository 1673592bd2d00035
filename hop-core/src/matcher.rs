//! Query matching and ranking
//!
//! A query is one or more whitespace-separated tokens matched as an ordered,
//! possibly non-contiguous substring pattern over each candidate path.
//! Matching is evaluated both case-sensitively and case-insensitively; the
//! configured [`CaseMode`] decides which set answers, and a sensitive best
//! match is preferred over an insensitive one whenever both exist.

use crate::config::Config;
use crate::persist::caller_owns_store;
use crate::store::Store;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Case comparison policy for queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMode {
    /// Match verbatim; fall back to case-insensitive when nothing matches.
    #[default]
    Sensitive,
    /// Always compare lower-cased.
    Ignore,
    /// Compare case-insensitively only when the query is all lower-case.
    Smart,
}

impl FromStr for CaseMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sensitive" => Ok(Self::Sensitive),
            "ignore" => Ok(Self::Ignore),
            "smart" => Ok(Self::Smart),
            other => Err(format!("unknown case mode {:?}", other)),
        }
    }
}

/// Score formula applied to matching entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankMode {
    /// Raw visit rank.
    Rank,
    /// `last_access - now`: more recent is higher.
    Time,
    /// Rank weighted by a decaying function of age.
    #[default]
    Frecency,
}

impl FromStr for RankMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "rank" => Ok(Self::Rank),
            "time" => Ok(Self::Time),
            "frecency" => Ok(Self::Frecency),
            other => Err(format!("unknown rank mode {:?}", other)),
        }
    }
}

impl RankMode {
    /// Score an entry under this mode.
    ///
    /// The frecency constants (3.75, 0.0001, 0.25) shape the decay curve
    /// over the seconds-to-years range and are load-bearing for ranking
    /// compatibility; do not adjust them.
    pub fn score(self, rank: f64, last_access: i64, now: i64) -> f64 {
        match self {
            RankMode::Rank => rank,
            RankMode::Time => (last_access - now) as f64,
            RankMode::Frecency => {
                let age = (now - last_access) as f64;
                rank * (3.75 / ((0.0001 * age + 1.0) + 0.25))
            }
        }
    }
}

/// Whether a match was found under verbatim or lower-cased comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Sensitive,
    Insensitive,
}

/// One matching entry with its score under the selected rank mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub path: String,
    pub score: f64,
    pub kind: MatchKind,
}

/// The full match set for a query, plus the selected best match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Every matching entry under the policy-selected comparison.
    pub matches: Vec<Match>,
    /// Index into `matches` of the best entry.
    pub best: usize,
}

impl MatchOutcome {
    pub fn best_match(&self) -> &Match {
        &self.matches[self.best]
    }
}

/// Evaluates a tokenized query against a store.
#[derive(Debug)]
pub struct QueryMatcher {
    tokens: Vec<String>,
    case_mode: CaseMode,
    /// When set, matches must fall strictly inside this directory's subtree.
    anchor: Option<String>,
}

impl QueryMatcher {
    pub fn new(query: &str, case_mode: CaseMode) -> Self {
        Self {
            tokens: query.split_whitespace().map(str::to_string).collect(),
            case_mode,
            anchor: None,
        }
    }

    /// Restrict matches to the subtree of `cwd`.
    pub fn restrict_to_subtree(mut self, cwd: impl Into<String>) -> Self {
        self.anchor = Some(cwd.into());
        self
    }

    fn query_is_lowercase(&self) -> bool {
        !self
            .tokens
            .iter()
            .any(|t| t.chars().any(|c| c.is_uppercase()))
    }

    /// Run the query. `None` is the distinct no-match outcome.
    pub fn run(&self, store: &Store, mode: RankMode, now: i64) -> Option<MatchOutcome> {
        let lower_tokens: Vec<String> = self.tokens.iter().map(|t| t.to_lowercase()).collect();

        let mut sensitive: Vec<Match> = Vec::new();
        let mut insensitive: Vec<Match> = Vec::new();
        for entry in store.entries() {
            let score = mode.score(entry.rank, entry.last_access, now);
            let verbatim = self.matches_path(&entry.path, &self.tokens, false);
            if verbatim {
                sensitive.push(Match {
                    path: entry.path.clone(),
                    score,
                    kind: MatchKind::Sensitive,
                });
            }
            if self.matches_path(&entry.path, &lower_tokens, true) {
                insensitive.push(Match {
                    path: entry.path.clone(),
                    score,
                    kind: if verbatim {
                        MatchKind::Sensitive
                    } else {
                        MatchKind::Insensitive
                    },
                });
            }
        }

        let use_insensitive = match self.case_mode {
            CaseMode::Ignore => true,
            CaseMode::Smart => self.query_is_lowercase(),
            CaseMode::Sensitive => sensitive.is_empty(),
        };
        let matches = if use_insensitive { insensitive } else { sensitive };
        if matches.is_empty() {
            return None;
        }
        let best = select_best(&matches);
        Some(MatchOutcome { matches, best })
    }

    /// Does `path` match every token, in order, within the anchored region?
    fn matches_path(&self, path: &str, tokens: &[String], lowercase: bool) -> bool {
        let haystack = if lowercase {
            path.to_lowercase()
        } else {
            path.to_string()
        };
        let region = match &self.anchor {
            Some(anchor) => {
                let anchor = if lowercase {
                    anchor.to_lowercase()
                } else {
                    anchor.clone()
                };
                let prefix = if anchor.ends_with('/') {
                    anchor
                } else {
                    format!("{}/", anchor)
                };
                match haystack.strip_prefix(&prefix) {
                    Some(rest) => rest.to_string(),
                    None => return false,
                }
            }
            None => haystack,
        };
        tokens_match(&region, tokens)
    }
}

/// Query the persisted store under the configured policies.
///
/// Queries never take the writer lock: the rename-based commit guarantees a
/// reader sees either the pre- or post-commit file. A store owned by
/// another user silently yields no matches.
pub fn run_query(
    config: &Config,
    query: &str,
    mode: RankMode,
    restrict_to_subtree: Option<&Path>,
    now: i64,
) -> Result<Option<MatchOutcome>> {
    if !caller_owns_store(config) {
        return Ok(None);
    }
    let store = Store::load(&config.data_path)?;
    let mut matcher = QueryMatcher::new(query, config.case_mode);
    if let Some(cwd) = restrict_to_subtree {
        matcher = matcher.restrict_to_subtree(cwd.to_string_lossy().into_owned());
    }
    Ok(matcher.run(&store, mode, now))
}

/// Ordered non-contiguous substring match: each token must appear after the
/// end of the previous token's occurrence. Path separators are ordinary
/// characters a token may span.
fn tokens_match(haystack: &str, tokens: &[String]) -> bool {
    let mut pos = 0;
    for token in tokens {
        match haystack[pos..].find(token.as_str()) {
            Some(offset) => pos += offset + token.len(),
            None => return false,
        }
    }
    true
}

/// Index of the best match: a sensitive best beats an insensitive best, then
/// highest score, then lexicographically smaller path (deterministic
/// tie-break in place of map iteration order).
fn select_best(matches: &[Match]) -> usize {
    let any_sensitive = matches.iter().any(|m| m.kind == MatchKind::Sensitive);
    let mut best: Option<usize> = None;
    for (idx, m) in matches.iter().enumerate() {
        if any_sensitive && m.kind != MatchKind::Sensitive {
            continue;
        }
        best = match best {
            None => Some(idx),
            Some(b) => {
                let current = &matches[b];
                if m.score > current.score
                    || (m.score == current.score && m.path < current.path)
                {
                    Some(idx)
                } else {
                    Some(b)
                }
            }
        };
    }
    best.unwrap_or(0)
}
