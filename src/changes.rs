use crate::config::Config;
use crate::workspace::Snapshot;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: String,
    pub edits: usize,
}

/// Files that differ between two snapshots, ordered by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub files: Vec<FileChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.iter().map(|change| change.path.clone()).collect()
    }

    pub fn total_edits(&self) -> usize {
        self.files.iter().map(|change| change.edits).sum()
    }
}

pub fn change_set(old: &Snapshot, new: &Snapshot) -> ChangeSet {
    let max_cells = Config::get().diff_max_cells;
    let paths: BTreeSet<&str> = old.document_paths().chain(new.document_paths()).collect();
    let mut files = Vec::new();
    for path in paths {
        let edits = match (old.document(path), new.document(path)) {
            (Some(before), Some(after)) => {
                if Arc::ptr_eq(&before.text, &after.text) || before.text == after.text {
                    continue;
                }
                count_edits(&before.text, &after.text, max_cells)
            }
            (Some(_), None) | (None, Some(_)) => 1,
            (None, None) => continue,
        };
        files.push(FileChange {
            path: path.to_string(),
            edits,
        });
    }
    ChangeSet { files }
}

/// Number of contiguous changed line regions between two texts.
pub fn count_edits(before: &str, after: &str, max_cells: usize) -> usize {
    if before == after {
        return 0;
    }
    let a: Vec<&str> = before.split_inclusive('\n').collect();
    let b: Vec<&str> = after.split_inclusive('\n').collect();

    let prefix = a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let a = &a[prefix..a.len() - suffix];
    let b = &b[prefix..b.len() - suffix];
    if a.is_empty() || b.is_empty() {
        return 1;
    }
    if a.len().saturating_mul(b.len()) > max_cells {
        return 1;
    }
    count_hunks(a, b)
}

fn count_hunks(a: &[&str], b: &[&str]) -> usize {
    let (n, m) = (a.len(), b.len());
    // lcs[i][j] = LCS length of a[i..] and b[j..]
    let mut lcs = vec![0u32; (n + 1) * (m + 1)];
    let idx = |i: usize, j: usize| i * (m + 1) + j;
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[idx(i, j)] = if a[i] == b[j] {
                lcs[idx(i + 1, j + 1)] + 1
            } else {
                lcs[idx(i + 1, j)].max(lcs[idx(i, j + 1)])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    let mut hunks = 0;
    let mut in_hunk = false;
    while i < n || j < m {
        if i < n && j < m && a[i] == b[j] {
            i += 1;
            j += 1;
            in_hunk = false;
            continue;
        }
        if !in_hunk {
            hunks += 1;
            in_hunk = true;
        }
        if j < m && (i == n || lcs[idx(i, j + 1)] >= lcs[idx(i + 1, j)]) {
            j += 1;
        } else {
            i += 1;
        }
    }
    hunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_separate_regions() {
        let before = "a\nb\nc\nd\ne\n";
        let after = "a\nB\nc\nd\nE\n";
        assert_eq!(count_edits(before, after, 1000), 2);
        assert_eq!(count_edits(before, "a\nc\nd\ne\n", 1000), 1);
        assert_eq!(count_edits(before, before, 1000), 0);
    }

    #[test]
    fn oversized_diff_degrades_to_one_region() {
        let before = "a\nb\nc\nd\ne\n";
        let after = "a\nB\nc\nd\nE\n";
        assert_eq!(count_edits(before, after, 1), 1);
    }

    #[test]
    fn change_set_lists_only_changed_documents() {
        let old = Snapshot::builder()
            .document("P", "b.cs", "class B {}\n", None)
            .document("P", "a.cs", "class A {}\n", None)
            .build();
        let new = old.with_document_text("b.cs", "class B2 {}\n").unwrap();
        let changes = change_set(&old, &new);
        assert_eq!(
            changes.files,
            vec![FileChange {
                path: "b.cs".to_string(),
                edits: 1
            }]
        );
        assert!(change_set(&old, &old).is_empty());
    }
}
