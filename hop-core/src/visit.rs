//! Visit recording, aging and explicit removal
//!
//! Every visit is a full read-modify-write of the store under the writer
//! lock: prune entries whose directories vanished (keep-list permitting),
//! bump or create the visited entry, run a global decay pass when the rank
//! sum crosses the ceiling, and commit. Visits to the home directory or an
//! excluded root are a no-op before any of that.

use crate::config::Config;
use crate::persist::{self, caller_owns_store, commit, StoreLock};
use crate::store::{Entry, Store};
use crate::{HopError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Multiplier applied to every rank when the sum crosses the ceiling.
const DECAY_FACTOR: f64 = 0.99;

/// Ranks below this are dropped from what is written, keep-list excepted.
const RANK_FLOOR: f64 = 1.0;

/// Per-session state threaded through visit recording.
///
/// Holds the removal-suppression slot: after an explicit removal, the next
/// visit to that same directory is skipped so the entry is not immediately
/// re-added. The slot is backed by a sidecar file next to the data file so
/// it survives across process invocations; it is cleared by the first visit
/// to any other directory, not by a timer.
#[derive(Debug)]
pub struct Session {
    pub last_removed: Option<String>,
    sidecar: PathBuf,
}

impl Session {
    pub fn load(config: &Config) -> Self {
        let sidecar = persist::sidecar_path(&config.data_path, ".last-removed");
        let last_removed = std::fs::read_to_string(&sidecar)
            .ok()
            .map(|s| s.trim_end().to_string())
            .filter(|s| !s.is_empty());
        Self {
            last_removed,
            sidecar,
        }
    }

    fn note_removed(&mut self, path: &str) -> Result<()> {
        std::fs::write(&self.sidecar, format!("{}\n", path))?;
        self.last_removed = Some(path.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        match std::fs::remove_file(&self.sidecar) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.last_removed = None;
        Ok(())
    }
}

/// Resolve the path to record, canonicalizing unless configured not to.
fn resolve(config: &Config, path: &Path) -> PathBuf {
    if config.no_resolve_symlinks {
        return path.to_path_buf();
    }
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Record a visit to `path` at time `now`.
///
/// Lock contention and a foreign-owned store both fail closed: the visit is
/// dropped without error, per the fire-and-forget contract.
pub fn record_visit(config: &Config, session: &mut Session, path: &Path, now: i64) -> Result<()> {
    let path = resolve(config, path);
    let path_str = match path.to_str() {
        Some(s) => s.to_string(),
        None => return Ok(()), // non-UTF-8 paths are not representable
    };

    // Any visit to a different directory clears the suppression slot, even
    // one that will not itself be recorded (home, excluded roots).
    if session.last_removed.as_deref() == Some(path_str.as_str()) {
        debug!("suppressing re-add of freshly removed {}", path_str);
        return Ok(());
    }
    if session.last_removed.is_some() {
        session.clear()?;
    }

    if config.is_excluded(&path) {
        return Ok(());
    }

    if !caller_owns_store(config) {
        return Ok(());
    }
    let _lock = match StoreLock::acquire(&config.data_path) {
        Ok(lock) => lock,
        Err(HopError::StoreLocked) => {
            debug!("store locked by another writer, dropping visit");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let mut store = Store::load(&config.data_path)?;
    prune_missing(&mut store, config);

    match store.remove(&path_str) {
        Some(mut entry) => {
            entry.rank += 1.0;
            entry.last_access = now;
            store.insert(entry);
        }
        None => store.insert(Entry::new(path_str, 1.0, now)),
    }

    if store.rank_sum() > config.max_score {
        debug!("rank sum over {}, applying decay pass", config.max_score);
        for entry in store.entries_mut() {
            entry.rank *= DECAY_FACTOR;
        }
    }
    // Sub-floor ranks never reach the file; keep-protected entries bypass
    // the floor entirely.
    store.retain(|entry| entry.rank >= RANK_FLOOR || config.is_kept(Path::new(&entry.path)));

    commit(config, &store)
}

/// Remove every entry for `path` and arm the re-add suppression slot.
pub fn remove_path(config: &Config, session: &mut Session, path: &Path) -> Result<()> {
    let path = resolve(config, path);
    let path_str = match path.to_str() {
        Some(s) => s.to_string(),
        None => return Ok(()),
    };

    if !caller_owns_store(config) {
        return Ok(());
    }
    let _lock = match StoreLock::acquire(&config.data_path) {
        Ok(lock) => lock,
        Err(HopError::StoreLocked) => {
            warn!("store locked by another writer, removal not applied");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let mut store = Store::load(&config.data_path)?;
    store.retain(|entry| entry.path != path_str);
    commit(config, &store)?;
    session.note_removed(&path_str)
}

/// Drop entries whose directory no longer exists, unless the keep-list
/// protects them. Keep-protected entries also bypass the rank floor.
fn prune_missing(store: &mut Store, config: &Config) {
    store.retain(|entry| {
        let path = Path::new(&entry.path);
        if path.is_dir() || config.is_kept(path) {
            true
        } else {
            debug!("pruning vanished directory {}", entry.path);
            false
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const NOW: i64 = 1_700_000_000;

    /// Config rooted in a canonicalized tempdir so that the symlink
    /// resolution in `record_visit` cannot skew path comparisons.
    fn fixture() -> (TempDir, PathBuf, Config) {
        let dir = TempDir::new().unwrap();
        let base = dir.path().canonicalize().unwrap();
        let home = base.join("home");
        std::fs::create_dir_all(&home).unwrap();
        let config = Config::for_data_path(base.join("data"), home);
        (dir, base, config)
    }

    fn visit_dir(base: &Path, name: &str) -> PathBuf {
        let path = base.join(name);
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    fn load(config: &Config) -> Store {
        Store::load(&config.data_path).unwrap()
    }

    #[test]
    fn repeated_visits_accumulate_rank() {
        let (_dir, base, config) = fixture();
        let target = visit_dir(&base, "proj");

        for i in 0..3 {
            let mut session = Session::load(&config);
            record_visit(&config, &mut session, &target, NOW + i).unwrap();
        }

        let store = load(&config);
        let entry = store.get(target.to_str().unwrap()).unwrap();
        assert_eq!(entry.rank, 3.0);
        assert_eq!(entry.last_access, NOW + 2);
    }

    #[test]
    fn home_visits_are_never_recorded() {
        let (_dir, _base, config) = fixture();
        let home = config.home.clone();
        let mut session = Session::load(&config);
        record_visit(&config, &mut session, &home, NOW).unwrap();
        assert!(load(&config).is_empty());
    }

    #[test]
    fn excluded_roots_are_never_recorded() {
        let (_dir, base, mut config) = fixture();
        let scratch = visit_dir(&base, "scratch");
        config.exclude_dirs = vec![scratch.clone()];
        let below = visit_dir(&base, "scratch/build");

        let mut session = Session::load(&config);
        record_visit(&config, &mut session, &scratch, NOW).unwrap();
        record_visit(&config, &mut session, &below, NOW).unwrap();
        assert!(load(&config).is_empty());
    }

    #[test]
    fn vanished_directories_are_pruned_on_write() {
        let (_dir, base, config) = fixture();
        let gone = visit_dir(&base, "gone");
        let kept = visit_dir(&base, "kept");

        let mut session = Session::load(&config);
        record_visit(&config, &mut session, &gone, NOW).unwrap();
        std::fs::remove_dir(&gone).unwrap();
        record_visit(&config, &mut session, &kept, NOW + 1).unwrap();

        let store = load(&config);
        assert!(store.get(gone.to_str().unwrap()).is_none());
        assert!(store.get(kept.to_str().unwrap()).is_some());
    }

    #[test]
    fn keep_list_protects_vanished_directories() {
        let (_dir, base, mut config) = fixture();
        let usb = visit_dir(&base, "mnt/usb");
        config.keep_dirs = vec![base.join("mnt")];
        let other = visit_dir(&base, "other");

        let mut session = Session::load(&config);
        record_visit(&config, &mut session, &usb, NOW).unwrap();
        std::fs::remove_dir(&usb).unwrap();
        record_visit(&config, &mut session, &other, NOW + 1).unwrap();

        let store = load(&config);
        assert!(store.get(usb.to_str().unwrap()).is_some());
    }

    #[test]
    fn decay_fires_when_rank_sum_crosses_ceiling() {
        let (_dir, base, mut config) = fixture();
        config.max_score = 9.5;
        let a = visit_dir(&base, "a");
        let b = visit_dir(&base, "b");

        let mut session = Session::load(&config);
        for i in 0..9 {
            record_visit(&config, &mut session, &a, NOW + i).unwrap();
        }
        // Sum is now 9; this visit pushes it to 10 and triggers decay.
        record_visit(&config, &mut session, &b, NOW + 9).unwrap();

        let store = load(&config);
        let a_entry = store.get(a.to_str().unwrap()).unwrap();
        assert!((a_entry.rank - 9.0 * 0.99).abs() < 1e-9);
        // The fresh entry decayed to 0.99, below the floor, and was dropped.
        assert!(store.get(b.to_str().unwrap()).is_none());
    }

    #[test]
    fn keep_listed_entries_bypass_the_rank_floor() {
        let (_dir, base, mut config) = fixture();
        config.max_score = 10.0;
        let a = visit_dir(&base, "a");
        let b = visit_dir(&base, "mnt/usb");
        config.keep_dirs = vec![base.join("mnt")];

        let mut session = Session::load(&config);
        for i in 0..10 {
            record_visit(&config, &mut session, &a, NOW + i).unwrap();
        }
        record_visit(&config, &mut session, &b, NOW + 10).unwrap();

        let store = load(&config);
        let b_entry = store.get(b.to_str().unwrap()).unwrap();
        assert!(b_entry.rank < 1.0);
    }

    #[test]
    fn removal_suppresses_the_next_visit_only() {
        let (_dir, base, config) = fixture();
        let target = visit_dir(&base, "proj");
        let elsewhere = visit_dir(&base, "elsewhere");

        let mut session = Session::load(&config);
        record_visit(&config, &mut session, &target, NOW).unwrap();
        remove_path(&config, &mut session, &target).unwrap();
        assert!(load(&config).is_empty());

        // The immediate re-visit (same directory) is suppressed, across a
        // fresh session as the CLI would see it.
        let mut session = Session::load(&config);
        record_visit(&config, &mut session, &target, NOW + 1).unwrap();
        assert!(load(&config).is_empty());

        // Leaving clears the slot; returning records normally.
        let mut session = Session::load(&config);
        record_visit(&config, &mut session, &elsewhere, NOW + 2).unwrap();
        let mut session = Session::load(&config);
        record_visit(&config, &mut session, &target, NOW + 3).unwrap();
        assert!(load(&config).get(target.to_str().unwrap()).is_some());
    }

    #[test]
    fn leaving_via_excluded_directory_clears_suppression() {
        let (_dir, base, mut config) = fixture();
        let target = visit_dir(&base, "proj");
        let scratch = visit_dir(&base, "scratch");
        config.exclude_dirs = vec![scratch.clone()];

        let mut session = Session::load(&config);
        record_visit(&config, &mut session, &target, NOW).unwrap();
        remove_path(&config, &mut session, &target).unwrap();

        // Leaving to an unrecorded directory (here an excluded root, same
        // as cd-ing home) still counts as changing away; the return visit
        // must be recorded normally.
        let mut session = Session::load(&config);
        record_visit(&config, &mut session, &scratch, NOW + 1).unwrap();
        let mut session = Session::load(&config);
        record_visit(&config, &mut session, &target, NOW + 2).unwrap();

        let store = load(&config);
        assert!(store.get(target.to_str().unwrap()).is_some());
        assert!(store.get(scratch.to_str().unwrap()).is_none());
    }

    #[test]
    fn remove_path_drops_only_exact_matches() {
        let (_dir, base, config) = fixture();
        let parent = visit_dir(&base, "proj");
        let child = visit_dir(&base, "proj/sub");

        let mut session = Session::load(&config);
        record_visit(&config, &mut session, &parent, NOW).unwrap();
        record_visit(&config, &mut session, &child, NOW + 1).unwrap();
        remove_path(&config, &mut session, &parent).unwrap();

        let store = load(&config);
        assert!(store.get(parent.to_str().unwrap()).is_none());
        assert!(store.get(child.to_str().unwrap()).is_some());
    }

    #[test]
    fn visit_while_locked_fails_closed() {
        let (_dir, base, config) = fixture();
        let target = visit_dir(&base, "proj");

        let _held = StoreLock::acquire(&config.data_path).unwrap();
        let mut session = Session::load(&config);
        record_visit(&config, &mut session, &target, NOW).unwrap();
        assert!(load(&config).is_empty());
    }
}
