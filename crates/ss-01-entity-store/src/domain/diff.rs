//! Line-based diff of entity files.
//!
//! ALGORITHM: longest common subsequence over lines, walked front to back.
//! Entity files are small pretty-printed JSON documents, so the quadratic
//! table is fine.

use std::fmt::Write as _;
use std::path::Path;

use super::staged::StagedWrites;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine<'a> {
    Same(&'a str),
    Removed(&'a str),
    Added(&'a str),
}

/// Diff `old` against `new` line by line.
pub fn line_diff<'a>(old: &'a str, new: &'a str) -> Vec<DiffLine<'a>> {
    let a: Vec<&str> = old.lines().collect();
    let b: Vec<&str> = new.lines().collect();

    // lcs[i][j] = LCS length of a[i..] and b[j..]
    let mut lcs = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut out = Vec::with_capacity(a.len().max(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            out.push(DiffLine::Same(a[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push(DiffLine::Removed(a[i]));
            i += 1;
        } else {
            out.push(DiffLine::Added(b[j]));
            j += 1;
        }
    }
    out.extend(a[i..].iter().map(|l| DiffLine::Removed(*l)));
    out.extend(b[j..].iter().map(|l| DiffLine::Added(*l)));
    out
}

fn render_file(out: &mut String, path: &Path, old: &str, new: &str) {
    let _ = writeln!(out, "--- a/{}", path.display());
    let _ = writeln!(out, "+++ b/{}", path.display());
    for line in line_diff(old, new) {
        let _ = match line {
            DiffLine::Same(l) => writeln!(out, " {l}"),
            DiffLine::Removed(l) => writeln!(out, "-{l}"),
            DiffLine::Added(l) => writeln!(out, "+{l}"),
        };
    }
}

/// Render every staged change as a unified-style diff.
pub fn render_diff(staged: &StagedWrites) -> String {
    let mut out = String::new();
    for (path, change) in staged.iter() {
        render_file(
            &mut out,
            path,
            change.previous.as_deref().unwrap_or(""),
            change.next.as_deref().unwrap_or(""),
        );
    }
    out
}
