pub mod assemble;
pub mod config;
pub mod counter;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod rules;
pub mod selection;
pub mod stats;

pub use assemble::{Assembly, AssemblyFailure, TextBlock, assemble_blocks, sanitize_text};
pub use config::{Config, CounterConfig, DocumentConfig};
pub use counter::{ClocCounter, CountReport, LineCounter};
pub use error::{AppError, ErrorKind, Result};
pub use pipeline::{
    DocumentReport, PlanOutcome, SamplePlan, count_files, plan_sample, write_document,
};
pub use render::{DocumentMeta, DocumentRenderer, DocxRenderer};
pub use rules::{IgnoreRuleSet, ResolvedIgnoreRules, get_builtin_ignore_rules, resolve_ignore_rules};
pub use selection::{SelectionResult, select_files};
pub use stats::{FileStat, normalize_report};
