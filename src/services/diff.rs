//! Line-based unified diff

use std::fmt::Write;

/// Unchanged lines shown around each change
pub const CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

/// Unified diff of a file between two versions; `None` marks a side where the
/// file does not exist. Returns an empty string when the contents match.
pub fn unified_diff(file_name: &str, old: Option<&str>, new: Option<&str>) -> String {
    let old_lines: Vec<&str> = old.map(|s| s.lines().collect()).unwrap_or_default();
    let new_lines: Vec<&str> = new.map(|s| s.lines().collect()).unwrap_or_default();

    let ops = diff_ops(&old_lines, &new_lines);
    let hunks = group_hunks(&ops);
    if hunks.is_empty() {
        return String::new();
    }

    let old_label = old.map_or_else(|| "/dev/null".to_string(), |_| format!("a/{}", file_name));
    let new_label = new.map_or_else(|| "/dev/null".to_string(), |_| format!("b/{}", file_name));

    // Lines consumed on each side before every op
    let mut positions = Vec::with_capacity(ops.len());
    let (mut old_pos, mut new_pos) = (0usize, 0usize);
    for op in &ops {
        positions.push((old_pos, new_pos));
        match op {
            Op::Equal => {
                old_pos += 1;
                new_pos += 1;
            }
            Op::Delete => old_pos += 1,
            Op::Insert => new_pos += 1,
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "--- {}", old_label);
    let _ = writeln!(out, "+++ {}", new_label);

    for (start, end) in hunks {
        let old_count = ops[start..end].iter().filter(|op| **op != Op::Insert).count();
        let new_count = ops[start..end].iter().filter(|op| **op != Op::Delete).count();
        let (old_before, new_before) = positions[start];
        let old_start = if old_count == 0 { old_before } else { old_before + 1 };
        let new_start = if new_count == 0 { new_before } else { new_before + 1 };

        let _ = writeln!(
            out,
            "@@ -{},{} +{},{} @@",
            old_start, old_count, new_start, new_count
        );
        for index in start..end {
            let (old_at, new_at) = positions[index];
            match ops[index] {
                Op::Equal => {
                    let _ = writeln!(out, " {}", old_lines[old_at]);
                }
                Op::Delete => {
                    let _ = writeln!(out, "-{}", old_lines[old_at]);
                }
                Op::Insert => {
                    let _ = writeln!(out, "+{}", new_lines[new_at]);
                }
            }
        }
    }

    out
}

fn diff_ops(old: &[&str], new: &[&str]) -> Vec<Op> {
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mut ops = vec![Op::Equal; prefix];
    ops.extend(lcs_ops(old_mid, new_mid));
    ops.extend(std::iter::repeat(Op::Equal).take(suffix));
    ops
}

/// Edit script from a longest-common-subsequence table
fn lcs_ops(old: &[&str], new: &[&str]) -> Vec<Op> {
    let (n, m) = (old.len(), new.len());
    let width = m + 1;
    let mut table = vec![0usize; (n + 1) * width];

    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if old[i] == new[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            ops.push(Op::Equal);
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            ops.push(Op::Delete);
            i += 1;
        } else {
            ops.push(Op::Insert);
            j += 1;
        }
    }
    ops.extend(std::iter::repeat(Op::Delete).take(n - i));
    ops.extend(std::iter::repeat(Op::Insert).take(m - j));
    ops
}

/// `[start, end)` op ranges of each hunk, including context
fn group_hunks(ops: &[Op]) -> Vec<(usize, usize)> {
    let mut hunks = Vec::new();
    let mut index = 0;

    while index < ops.len() {
        if ops[index] == Op::Equal {
            index += 1;
            continue;
        }

        let start = index.saturating_sub(CONTEXT_LINES);
        let mut last_change = index;
        let mut cursor = index;
        while cursor < ops.len() {
            if ops[cursor] != Op::Equal {
                last_change = cursor;
                cursor += 1;
                continue;
            }
            let run_start = cursor;
            while cursor < ops.len() && ops[cursor] == Op::Equal {
                cursor += 1;
            }
            // Close gaps small enough for the context of both sides to touch
            if cursor < ops.len() && cursor - run_start <= 2 * CONTEXT_LINES {
                continue;
            }
            break;
        }

        let end = (last_change + 1 + CONTEXT_LINES).min(ops.len());
        hunks.push((start, end));
        index = end;
    }

    hunks
}
