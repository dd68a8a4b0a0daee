use crate::assemble::{AssemblyFailure, assemble_blocks};
use crate::config::Config;
use crate::counter::LineCounter;
use crate::error::{AppError, Result};
use crate::render::{DocumentMeta, DocumentRenderer};
use crate::rules::{ResolvedIgnoreRules, get_builtin_ignore_rules, resolve_ignore_rules};
use crate::selection::{SelectionResult, select_files};
use crate::stats::{FileStat, normalize_report};
use log;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything known about a run before any content is read.
#[derive(Debug, Clone)]
pub struct SamplePlan {
    pub root: PathBuf,
    pub rules: ResolvedIgnoreRules,
    pub stats: Vec<FileStat>,
    pub selection: SelectionResult,
}

/// How a plan should end. Only `Ready` proceeds to a document; the other two
/// are neutral outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOutcome {
    NoFiles,
    Shortfall,
    Ready,
}

impl SamplePlan {
    pub fn outcome(&self) -> PlanOutcome {
        if self.stats.is_empty() {
            PlanOutcome::NoFiles
        } else if self.selection.is_shortfall() {
            PlanOutcome::Shortfall
        } else {
            PlanOutcome::Ready
        }
    }
}

#[derive(Debug)]
pub struct DocumentReport {
    pub output_path: PathBuf,
    pub paragraphs: usize,
    pub files_written: usize,
    pub failures: Vec<AssemblyFailure>,
    pub bytes: u64,
}

/// Resolves the ignore rules and counts every file under `root`.
pub fn count_files(
    root: &Path,
    config: &Config,
    counter: &dyn LineCounter,
) -> Result<(ResolvedIgnoreRules, Vec<FileStat>)> {
    let rules = resolve_ignore_rules(get_builtin_ignore_rules(), config.ignore.as_ref());
    log::info!("Counting lines under {}", root.display());
    let report = counter.count(root, &rules.rules)?;
    let stats = normalize_report(report, root)?;
    log::info!("Counted {} files.", stats.len());
    Ok((rules, stats))
}

/// Validates the config, counts the tree and selects files for the target in
/// `config.min_lines`. No file content is read.
pub fn plan_sample(root: &Path, config: &Config, counter: &dyn LineCounter) -> Result<SamplePlan> {
    config.validate()?;
    let (rules, stats) = count_files(root, config, counter)?;
    let selection = select_files(&stats, config.min_lines);
    Ok(SamplePlan {
        root: root.to_path_buf(),
        rules,
        stats,
        selection,
    })
}

/// Reads the selected files, renders them and writes the document to
/// `output_path`, creating parent directories as needed.
///
/// Unreadable files are reported in `DocumentReport::failures` and do not
/// stop the document from being written.
pub fn write_document(
    plan: &SamplePlan,
    config: &Config,
    renderer: &dyn DocumentRenderer,
    output_path: &Path,
) -> Result<DocumentReport> {
    let assembly = assemble_blocks(&plan.selection.selected_files, &plan.root);
    let meta = DocumentMeta::new(config.document.creator.trim());
    let bytes = renderer.render(&assembly.blocks, &meta)?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AppError::DirCreation {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    fs::write(output_path, &bytes).map_err(|e| AppError::FileWrite {
        path: output_path.to_path_buf(),
        source: e,
    })?;
    log::info!(
        "Wrote {} paragraphs ({} bytes) to {}",
        assembly.blocks.len(),
        bytes.len(),
        output_path.display()
    );

    Ok(DocumentReport {
        output_path: output_path.to_path_buf(),
        paragraphs: assembly.blocks.len(),
        files_written: assembly.files_read,
        failures: assembly.failures,
        bytes: bytes.len() as u64,
    })
}
