use crate::counter::CountReport;
use crate::error::{AppError, Result};
use log;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Aggregate keys in cloc's `--json --by-file` report.
pub const HEADER_KEY: &str = "header";
pub const SUM_KEY: &str = "SUM";

/// Line counts for one file, path relative to the counted root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileStat {
    pub path: String,
    pub code: u64,
    pub comment: u64,
    pub blank: u64,
}

impl FileStat {
    pub fn new(path: impl Into<String>, code: u64, comment: u64, blank: u64) -> Self {
        Self {
            path: path.into(),
            code,
            comment,
            blank,
        }
    }

    pub fn total_lines(&self) -> u64 {
        self.code + self.comment + self.blank
    }
}

#[derive(Debug, Deserialize)]
struct RawFileMetrics {
    #[serde(default)]
    code: u64,
    #[serde(default)]
    comment: u64,
    #[serde(default)]
    blank: u64,
}

/// Turns a counter report into `FileStat`s, in the order the counter listed
/// the files. "Nothing to count" and an empty report both give an empty list.
pub fn normalize_report(report: CountReport, root: &Path) -> Result<Vec<FileStat>> {
    let raw = match report {
        CountReport::NothingToCount => {
            log::debug!("Counter found nothing to count.");
            return Ok(Vec::new());
        }
        CountReport::Report(raw) => raw,
    };

    let mut stats = Vec::with_capacity(raw.len());
    let mut seen = HashSet::new();
    for (key, value) in raw {
        if key == HEADER_KEY || key == SUM_KEY {
            log::trace!("Skipping aggregate key: {}", key);
            continue;
        }
        let metrics: RawFileMetrics = serde_json::from_value(value).map_err(|e| {
            AppError::StatsParse(format!("Invalid metrics for '{}': {}", key, e))
        })?;
        let path = relativize(&key, root);
        if !seen.insert(path.clone()) {
            log::warn!("Duplicate counter entry for '{}', keeping the first.", path);
            continue;
        }
        log::trace!(
            "Counted {}: code={}, comment={}, blank={}",
            path,
            metrics.code,
            metrics.comment,
            metrics.blank
        );
        stats.push(FileStat {
            path,
            code: metrics.code,
            comment: metrics.comment,
            blank: metrics.blank,
        });
    }
    log::debug!("Normalized {} file stats.", stats.len());
    Ok(stats)
}

fn relativize(reported: &str, root: &Path) -> String {
    let reported_path = Path::new(reported);
    let relative: PathBuf = if reported_path.is_absolute() {
        pathdiff::diff_paths(reported_path, root).unwrap_or_else(|| reported_path.to_path_buf())
    } else {
        reported_path
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    };
    relative.to_string_lossy().into_owned()
}
