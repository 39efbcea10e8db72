//! Line diff between the running and the rendered configuration.
//!
//! Edit scripts come from `similar`'s Myers diff. Equal runs at either end
//! are context, and when two scripts are equally short the one keeping the
//! earlier lines of the running config as context wins.

use std::fmt;
use std::time::Duration;

use similar::{Algorithm, ChangeTag, TextDiff, TextDiffConfig};

/// Past this, the diff settles for a longer but still valid script.
const DIFF_DEADLINE: Duration = Duration::from_secs(2);

/// One line of an edit script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Context(String),
    Added(String),
    Removed(String),
}

impl DiffLine {
    pub fn text(&self) -> &str {
        match self {
            DiffLine::Context(line) | DiffLine::Added(line) | DiffLine::Removed(line) => line,
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, DiffLine::Context(_))
    }

    fn marker(&self) -> char {
        match self {
            DiffLine::Context(_) => ' ',
            DiffLine::Added(_) => '+',
            DiffLine::Removed(_) => '-',
        }
    }
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.marker(), self.text())
    }
}

/// Edit script from the current to the desired configuration.
///
/// Empty when the inputs are identical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    pub lines: Vec<DiffLine>,
    pub has_changes: bool,
}

impl DiffResult {
    /// Lines that were added.
    pub fn added(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| match l {
            DiffLine::Added(line) => Some(line.as_str()),
            _ => None,
        })
    }

    /// Lines that were removed.
    pub fn removed(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| match l {
            DiffLine::Removed(line) => Some(line.as_str()),
            _ => None,
        })
    }

    /// Replay the script against `current`.
    ///
    /// Returns `None` if a context or removed line does not match `current`
    /// at its position, or if `current` has lines the script never visits.
    pub fn apply(&self, current: &[&str]) -> Option<Vec<String>> {
        if self.lines.is_empty() {
            return Some(current.iter().map(|l| l.to_string()).collect());
        }

        let mut output = Vec::with_capacity(current.len());
        let mut remaining = current.iter();

        for line in &self.lines {
            match line {
                DiffLine::Context(text) => {
                    if remaining.next() != Some(&text.as_str()) {
                        return None;
                    }
                    output.push(text.clone());
                }
                DiffLine::Removed(text) => {
                    if remaining.next() != Some(&text.as_str()) {
                        return None;
                    }
                }
                DiffLine::Added(text) => output.push(text.clone()),
            }
        }

        remaining.next().is_none().then_some(output)
    }
}

fn configure() -> TextDiffConfig {
    let mut config = TextDiff::configure();
    config
        .algorithm(Algorithm::Myers)
        .newline_terminated(false)
        .timeout(DIFF_DEADLINE);
    config
}

/// Compute the edit script turning `current` into `desired`.
pub fn diff_lines(current: &[&str], desired: &[&str]) -> DiffResult {
    if current == desired {
        return DiffResult::default();
    }

    let diff = configure().diff_slices(current, desired);
    let lines: Vec<DiffLine> = diff
        .iter_all_changes()
        .map(|change| {
            let text = change.value().to_string();
            match change.tag() {
                ChangeTag::Equal => DiffLine::Context(text),
                ChangeTag::Delete => DiffLine::Removed(text),
                ChangeTag::Insert => DiffLine::Added(text),
            }
        })
        .collect();

    let has_changes = lines.iter().any(DiffLine::is_change);
    DiffResult { lines, has_changes }
}

/// Unified diff of `current` against `desired` with `context` lines around
/// each hunk, headed by `--- from_label` and `+++ to_label`. Empty when the
/// inputs are identical.
pub fn unified_diff(
    current: &[&str],
    desired: &[&str],
    from_label: &str,
    to_label: &str,
    context: usize,
) -> Vec<String> {
    let diff = configure().diff_slices(current, desired);
    diff.unified_diff()
        .context_radius(context)
        .header(from_label, to_label)
        .to_string()
        .lines()
        .map(str::to_string)
        .collect()
}
