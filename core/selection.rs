use crate::stats::FileStat;
use log;
use serde::Serialize;

/// Files picked to reach a code-line target, with aggregates over the pick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionResult {
    pub selected_files: Vec<FileStat>,
    pub total_code: u64,
    pub total_comment: u64,
    pub total_blank: u64,
    pub total_lines: u64,
    /// The target the selection was made against.
    pub target: u64,
    /// Sum of code lines over every candidate (files with `code > 0`).
    pub total_possible: u64,
    pub candidate_count: usize,
}

impl SelectionResult {
    /// True when even every candidate together falls short of the target.
    pub fn is_shortfall(&self) -> bool {
        self.total_possible < self.target
    }

    /// Paragraph count the document will roughly have: blank lines are dropped
    /// during assembly, comments are kept.
    pub fn estimated_document_lines(&self) -> u64 {
        self.total_code + self.total_comment
    }

    pub fn file_count(&self) -> usize {
        self.selected_files.len()
    }
}

/// Greedy selection: largest files first until the running code sum reaches
/// `target`.
///
/// Files with no code lines are never candidates. Ties keep their input order.
/// When the candidates cannot reach the target they are all selected and the
/// result reports a shortfall. A target of zero selects nothing.
pub fn select_files(stats: &[FileStat], target: u64) -> SelectionResult {
    let mut candidates: Vec<&FileStat> = stats.iter().filter(|s| s.code > 0).collect();
    // `sort_by` is stable.
    candidates.sort_by(|a, b| b.code.cmp(&a.code));

    let total_possible: u64 = candidates.iter().map(|s| s.code).sum();
    let candidate_count = candidates.len();
    log::debug!(
        "Selecting from {} candidates ({} of {} files skipped with no code), {} code lines available, target {}.",
        candidate_count,
        stats.len() - candidate_count,
        stats.len(),
        total_possible,
        target
    );

    let selected: Vec<FileStat> = if total_possible < target {
        log::info!(
            "Only {} code lines available for a target of {}, selecting every candidate.",
            total_possible,
            target
        );
        candidates.into_iter().cloned().collect()
    } else {
        let mut running = 0u64;
        candidates
            .into_iter()
            .take_while(|s| {
                if running >= target {
                    return false;
                }
                running += s.code;
                true
            })
            .cloned()
            .collect()
    };

    let mut result = SelectionResult {
        target,
        total_possible,
        candidate_count,
        ..Default::default()
    };
    for file in &selected {
        result.total_code += file.code;
        result.total_comment += file.comment;
        result.total_blank += file.blank;
        result.total_lines += file.total_lines();
    }
    result.selected_files = selected;

    log::info!(
        "Selected {} files with {} code lines (target {}).",
        result.file_count(),
        result.total_code,
        target
    );
    result
}
