//! Staged writes.
//!
//! The commit phase is computed as a buffer of `path → write | delete`
//! operations before anything reaches the backend. At most one operation is
//! staged per path, and a write always supersedes a delete of the same path
//! (an entity relocated back onto a freed path).

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// How a path changes on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangeKind {
    Created,
    Edited,
    Deleted,
}

impl ChangeKind {
    fn label(self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Edited => "edited",
            ChangeKind::Deleted => "deleted",
        }
    }
}

/// One staged operation with the content it replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedChange {
    pub kind: ChangeKind,
    /// Content currently on disk.
    pub previous: Option<String>,
    /// Content to write; `None` for deletions.
    pub next: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StagedWrites {
    changes: BTreeMap<PathBuf, StagedChange>,
}

impl StagedWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Stage a write. Replaces any staged delete of the same path.
    pub fn stage_write(&mut self, path: PathBuf, previous: Option<String>, next: String) {
        let kind = if previous.is_some() {
            ChangeKind::Edited
        } else {
            ChangeKind::Created
        };
        self.changes.insert(
            path,
            StagedChange {
                kind,
                previous,
                next: Some(next),
            },
        );
    }

    /// Stage a deletion unless a write for the same path is already staged.
    pub fn stage_delete(&mut self, path: PathBuf, previous: String) {
        if self.changes.get(&path).is_some_and(|c| c.next.is_some()) {
            return;
        }
        self.changes.insert(
            path,
            StagedChange {
                kind: ChangeKind::Deleted,
                previous: Some(previous),
                next: None,
            },
        );
    }

    pub fn get(&self, path: &Path) -> Option<&StagedChange> {
        self.changes.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &StagedChange)> {
        self.changes.iter()
    }

    pub fn summary(&self) -> SaveSummary {
        let mut summary = SaveSummary::default();
        for (path, change) in &self.changes {
            match change.kind {
                ChangeKind::Created => summary.created += 1,
                ChangeKind::Edited => summary.edited += 1,
                ChangeKind::Deleted => summary.deleted += 1,
            }
            summary.changes.push((change.kind, path.clone()));
        }
        summary.commit_message = summary.render_commit_message();
        summary
    }
}

/// Aggregate result of a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub created: usize,
    pub edited: usize,
    pub deleted: usize,
    pub changes: Vec<(ChangeKind, PathBuf)>,
    pub commit_message: String,
}

impl SaveSummary {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    fn render_commit_message(&self) -> String {
        if self.is_empty() {
            return "safe-sync: no changes".to_string();
        }

        let mut message = format!(
            "safe-sync: {} created, {} edited, {} deleted\n",
            self.created, self.edited, self.deleted
        );
        let mut ordered = self.changes.clone();
        ordered.sort();
        for (kind, path) in ordered {
            let _ = write!(message, "\n{}: {}", kind.label(), path.display());
        }
        message
    }
}
