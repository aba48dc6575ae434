// src/guard.rs
//! One-shot execution guard: a lock marker file that, once written, makes every
//! later check report "locked" until someone deletes it by hand.
//!
//! The check-then-act sequence is not atomic across processes. It protects
//! against accidental re-runs, not concurrent ones.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_LOCK_PATH: &str = ".lite/lock.json";
pub const LOCK_NOTE: &str = "one-shot lite lock";

pub const EXIT_OK: i32 = 0;
pub const EXIT_USAGE: i32 = 1;
pub const EXIT_FAILURE: i32 = 2;
pub const EXIT_LOCKED: i32 = 3;

/// On-disk marker document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockMarker {
    #[serde(default)]
    pub locked_at: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    /// `locked_at` is `None` when the marker exists but can't be read.
    Locked { locked_at: Option<String> },
}

impl LockState {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockState::Locked { .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            LockState::Unlocked => EXIT_OK,
            LockState::Locked { .. } => EXIT_LOCKED,
        }
    }

    pub fn message(&self, lock_path: &Path) -> String {
        let hint = format!(
            "To run again, you must delete {} and recreate the workflow file.",
            lock_path.display()
        );
        match self {
            LockState::Unlocked => "[OK] Not locked yet.".to_string(),
            LockState::Locked { locked_at: Some(ts) } => format!(
                "[LOCKED] This run has already been executed once (locked_at={ts}).\n{hint}"
            ),
            LockState::Locked { locked_at: None } => {
                format!("[LOCKED] This run has already been executed once.\n{hint}")
            }
        }
    }
}

/// Second precision, `Z` suffix: `2024-03-01T10:00:00Z`.
pub fn format_lock_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// `locked_at` as recorded, whatever its JSON type. `None` when the document
/// is not an object; `"unknown"` when the key is missing.
fn marker_timestamp(doc: &serde_json::Value) -> Option<String> {
    let fields = doc.as_object()?;
    let shown = match fields.get("locked_at") {
        None => "unknown".to_string(),
        Some(serde_json::Value::String(ts)) => ts.clone(),
        Some(other) => other.to_string(),
    };
    Some(shown)
}

#[derive(Debug, Clone)]
pub struct OneShotGuard {
    path: PathBuf,
}

impl OneShotGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Guard rooted at `root`, using the default `.lite/lock.json` marker.
    pub fn in_root(root: &Path) -> Self {
        Self::new(root.join(DEFAULT_LOCK_PATH))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Presence of the marker decides; an unreadable marker still counts as locked.
    pub fn state(&self) -> LockState {
        if !self.path.exists() {
            return LockState::Unlocked;
        }
        let locked_at = fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
            .and_then(|doc| marker_timestamp(&doc));
        if locked_at.is_none() {
            tracing::warn!(target: "guard", path = %self.path.display(), "lock marker unreadable, treating as locked");
        }
        LockState::Locked { locked_at }
    }

    /// Write the marker, overwriting any previous one.
    pub fn lock(&self, now: DateTime<Utc>) -> Result<LockMarker> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating lock dir {}", parent.display()))?;
        }
        let marker = LockMarker {
            locked_at: Some(format_lock_timestamp(now)),
            note: Some(LOCK_NOTE.to_string()),
        };
        let body = serde_json::to_string_pretty(&marker).context("encoding lock marker")?;
        fs::write(&self.path, body)
            .with_context(|| format!("writing lock marker {}", self.path.display()))?;
        tracing::debug!(target: "guard", path = %self.path.display(), "lock marker written");
        Ok(marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_is_second_precision_zulu() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 5).unwrap()
            + chrono::Duration::milliseconds(750);
        assert_eq!(format_lock_timestamp(t), "2024-03-01T10:00:05Z");
    }

    #[test]
    fn fresh_root_is_unlocked() {
        let tmp = tempfile::tempdir().unwrap();
        let g = OneShotGuard::in_root(tmp.path());
        assert_eq!(g.state(), LockState::Unlocked);
        assert_eq!(g.state().exit_code(), 0);
    }

    #[test]
    fn lock_then_state_reports_timestamp() {
        let tmp = tempfile::tempdir().unwrap();
        let g = OneShotGuard::in_root(tmp.path());
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        g.lock(now).unwrap();
        let st = g.state();
        assert_eq!(
            st,
            LockState::Locked {
                locked_at: Some("2025-01-02T03:04:05Z".into())
            }
        );
        assert_eq!(st.exit_code(), 3);
        assert!(st.message(g.path()).contains("locked_at=2025-01-02T03:04:05Z"));
    }

    #[test]
    fn lock_twice_rewrites_timestamp() {
        let tmp = tempfile::tempdir().unwrap();
        let g = OneShotGuard::in_root(tmp.path());
        g.lock(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()).unwrap();
        g.lock(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()).unwrap();
        assert_eq!(
            g.state(),
            LockState::Locked {
                locked_at: Some("2025-06-01T00:00:00Z".into())
            }
        );
    }

    #[test]
    fn corrupt_marker_fails_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let g = OneShotGuard::in_root(tmp.path());
        fs::create_dir_all(g.path().parent().unwrap()).unwrap();
        fs::write(g.path(), "{not json").unwrap();
        let st = g.state();
        assert_eq!(st, LockState::Locked { locked_at: None });
        assert_eq!(st.exit_code(), 3);
        assert!(st.message(g.path()).starts_with("[LOCKED]"));
    }

    #[test]
    fn non_string_timestamp_is_shown_as_written() {
        let tmp = tempfile::tempdir().unwrap();
        let g = OneShotGuard::new(tmp.path().join("lock.json"));
        fs::write(g.path(), r#"{"locked_at": 123}"#).unwrap();
        let st = g.state();
        assert_eq!(st, LockState::Locked { locked_at: Some("123".into()) });
        assert!(st.message(g.path()).contains("locked_at=123"));

        fs::write(g.path(), r#"{"locked_at": null}"#).unwrap();
        assert_eq!(g.state(), LockState::Locked { locked_at: Some("null".into()) });
    }

    #[test]
    fn non_object_marker_fails_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let g = OneShotGuard::new(tmp.path().join("lock.json"));
        fs::write(g.path(), "[1, 2]").unwrap();
        assert_eq!(g.state(), LockState::Locked { locked_at: None });
    }

    #[test]
    fn marker_without_timestamp_reads_unknown() {
        let tmp = tempfile::tempdir().unwrap();
        let g = OneShotGuard::new(tmp.path().join("lock.json"));
        fs::write(g.path(), r#"{"note": "hand-made"}"#).unwrap();
        assert_eq!(
            g.state(),
            LockState::Locked {
                locked_at: Some("unknown".into())
            }
        );
    }
}
