use crate::error::{AppError, Result};
use crate::stats::FileStat;
use log;
use std::fs;
use std::path::{Path, PathBuf};

const BYTE_ORDER_MARK: char = '\u{FEFF}';

/// One sanitized, non-empty source line. Becomes one document paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock(String);

impl TextBlock {
    pub fn text(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for TextBlock {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A selected file that could not be turned into text blocks.
#[derive(Debug)]
pub struct AssemblyFailure {
    pub path: String,
    pub error: AppError,
}

#[derive(Debug, Default)]
pub struct Assembly {
    pub blocks: Vec<TextBlock>,
    pub failures: Vec<AssemblyFailure>,
    pub files_read: usize,
}

/// Removes control characters other than tab and newline, folds `\r\n` and
/// lone `\r` into `\n`, and drops leading byte-order marks.
///
/// Sanitizing already sanitized text returns it unchanged.
pub fn sanitize_text(raw: &str) -> String {
    let without_controls: String = raw
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect();
    let unified = without_controls.replace("\r\n", "\n").replace('\r', "\n");
    unified.trim_start_matches(BYTE_ORDER_MARK).to_string()
}

/// Splits sanitized text into blocks, dropping lines that are blank after
/// trimming. Kept lines retain their indentation.
pub fn split_blocks(sanitized: &str) -> Vec<TextBlock> {
    sanitized
        .split('\n')
        .filter(|line| !is_blank(line))
        .map(|line| TextBlock(line.to_string()))
        .collect()
}

/// Whitespace or a stray byte-order mark counts as blank.
fn is_blank(line: &str) -> bool {
    line.trim_matches(|c: char| c.is_whitespace() || c == BYTE_ORDER_MARK)
        .is_empty()
}

/// Reads `relative` under `root` as UTF-8 and returns its blocks.
pub fn read_file_blocks(root: &Path, relative: &str) -> Result<Vec<TextBlock>> {
    let path: PathBuf = root.join(relative);
    let bytes = fs::read(&path).map_err(|e| AppError::FileRead {
        path: path.clone(),
        source: e,
    })?;
    let content = String::from_utf8(bytes).map_err(|e| AppError::FileDecode {
        path: path.clone(),
        source: e,
    })?;
    Ok(split_blocks(&sanitize_text(&content)))
}

/// Turns the selected files into blocks in selection order.
///
/// A file that cannot be read or decoded is logged, recorded in
/// `Assembly::failures` and skipped; the remaining files are still assembled.
pub fn assemble_blocks(selected: &[FileStat], root: &Path) -> Assembly {
    log::debug!(
        "Assembling {} files from {}",
        selected.len(),
        root.display()
    );
    let mut assembly = Assembly::default();
    for file in selected {
        match read_file_blocks(root, &file.path) {
            Ok(blocks) => {
                log::trace!("Read {} blocks from {}", blocks.len(), file.path);
                assembly.blocks.extend(blocks);
                assembly.files_read += 1;
            }
            Err(e) => {
                let cause = std::error::Error::source(&e)
                    .map(|s| format!(": {}", s))
                    .unwrap_or_default();
                log::warn!("Skipping {}: {}{}", file.path, e, cause);
                assembly.failures.push(AssemblyFailure {
                    path: file.path.clone(),
                    error: e,
                });
            }
        }
    }
    log::info!(
        "Assembled {} blocks from {} files ({} skipped).",
        assembly.blocks.len(),
        assembly.files_read,
        assembly.failures.len()
    );
    assembly
}
