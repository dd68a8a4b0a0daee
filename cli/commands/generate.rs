use crate::cli_args::GenerateArgs;
use crate::load_config_for_command;
use crate::output;
use anyhow::{Context, Result};
use log;
use std::env;
use std::path::Path;
use code2doc_core::{
    self as core, ClocCounter, Config, DocumentRenderer, DocumentReport, DocxRenderer,
    LineCounter, PlanOutcome,
};

pub fn handle_generate_command(args: GenerateArgs, quiet: bool) -> Result<()> {
    let config = load_config_for_command(&args.project_config, Some(&args))
        .context("Failed to load configuration")?;
    config.validate()?;

    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let counter = ClocCounter::from_config(&config)?;
    let base_dir = env::current_dir().context("Failed to read working directory")?;
    let output_path = config.get_effective_output_path(&base_dir);

    let report = run_generate(
        &args,
        &config,
        &project_root,
        &output_path,
        &counter,
        &DocxRenderer::new(),
        quiet,
    )?;
    if let Some(report) = report {
        if !quiet {
            output::print_document_report(&report);
        }
    }
    Ok(())
}

/// Plans the sample and writes the document when the outcome allows it.
/// Returns `None` when nothing was written: a preview, no files, or a shortfall.
fn run_generate(
    args: &GenerateArgs,
    config: &Config,
    project_root: &Path,
    output_path: &Path,
    counter: &dyn LineCounter,
    renderer: &dyn DocumentRenderer,
    quiet: bool,
) -> Result<Option<DocumentReport>> {
    let plan = core::plan_sample(project_root, config, counter)?;

    // Structured output goes to stdout alone, so human-readable notes are skipped.
    let structured = args.dry && args.format_output.format.is_some();
    if args.format_output.format.is_some() && !args.dry {
        log::warn!("--format only applies together with --dry; ignoring it.");
    }
    let chatty = !quiet && !structured;

    if structured {
        output::print_data_or_text(&plan.selection, None, &args.format_output)?;
    }
    match plan.outcome() {
        PlanOutcome::NoFiles => {
            if chatty {
                output::print_no_files();
            }
            return Ok(None);
        }
        PlanOutcome::Shortfall => {
            if chatty {
                output::print_selection_report(&plan.selection);
                output::print_shortfall(&plan.selection);
            }
            return Ok(None);
        }
        PlanOutcome::Ready => {
            if chatty {
                output::print_selection_report(&plan.selection);
            }
        }
    }

    if args.dry {
        log::info!("Preview complete, no document written.");
        return Ok(None);
    }

    let report = core::write_document(&plan, config, renderer, output_path)
        .with_context(|| format!("Failed to write document to {}", output_path.display()))?;
    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli_args::{Cli, Commands};
    use clap::Parser;
    use code2doc_core::counter::parse_report;
    use code2doc_core::{AppError, CountReport, ErrorKind, IgnoreRuleSet};
    use std::fs;
    use tempfile::TempDir;

    const TWO_FILES: &str = r#"{"header":{"n_files":2},"big.rs":{"blank":0,"comment":0,"code":2},"small.rs":{"blank":0,"comment":0,"code":1},"SUM":{"code":3}}"#;

    struct FixedCounter(Option<&'static str>);

    impl LineCounter for FixedCounter {
        fn count(&self, _root: &Path, _rules: &IgnoreRuleSet) -> code2doc_core::Result<CountReport> {
            match self.0 {
                Some(json) => Ok(CountReport::Report(parse_report(json)?)),
                None => Ok(CountReport::NothingToCount),
            }
        }
    }

    fn generate_args(extra: &[&str]) -> GenerateArgs {
        let mut argv = vec!["code2doc", "generate", "--disable-config", "--creator", "Jane"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Some(Commands::Generate(args)) => args,
            other => panic!("expected generate, got {:?}", other),
        }
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("big.rs"), "fn a() {}\nfn b() {}\n").unwrap();
        fs::write(dir.path().join("small.rs"), "fn c() {}\n").unwrap();
        dir
    }

    fn run(
        args: &GenerateArgs,
        counter: &FixedCounter,
        root: &Path,
        out: &Path,
    ) -> Option<DocumentReport> {
        let config = load_config_for_command(&args.project_config, Some(args)).unwrap();
        run_generate(args, &config, root, out, counter, &DocxRenderer::new(), true).unwrap()
    }

    #[test]
    fn test_missing_creator_fails_before_root_lookup() {
        let cli = Cli::parse_from([
            "code2doc",
            "generate",
            "--disable-config",
            "-r",
            "/definitely/not/here",
        ]);
        let Some(Commands::Generate(args)) = cli.command else {
            panic!("expected generate");
        };
        let err = handle_generate_command(args, true).unwrap_err();
        let kind = err.downcast_ref::<AppError>().map(AppError::kind);
        assert_eq!(kind, Some(ErrorKind::Configuration));
    }

    #[test]
    fn test_ready_plan_writes_document() {
        let dir = project();
        let out = dir.path().join("out/sample.docx");
        let args = generate_args(&["-m", "2"]);
        let report = run(&args, &FixedCounter(Some(TWO_FILES)), dir.path(), &out).unwrap();
        assert_eq!(report.files_written, 1);
        assert_eq!(report.paragraphs, 2);
        assert!(out.exists());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = project();
        let out = dir.path().join("sample.docx");
        let args = generate_args(&["-m", "2", "--dry"]);
        assert!(run(&args, &FixedCounter(Some(TWO_FILES)), dir.path(), &out).is_none());
        assert!(!out.exists());
    }

    #[test]
    fn test_structured_dry_run_writes_nothing() {
        let dir = project();
        let out = dir.path().join("sample.docx");
        let args = generate_args(&["-m", "2", "--dry", "-f", "json"]);
        assert!(run(&args, &FixedCounter(Some(TWO_FILES)), dir.path(), &out).is_none());
        assert!(!out.exists());
    }

    #[test]
    fn test_shortfall_writes_nothing() {
        let dir = project();
        let out = dir.path().join("sample.docx");
        let args = generate_args(&["-m", "1000"]);
        assert!(run(&args, &FixedCounter(Some(TWO_FILES)), dir.path(), &out).is_none());
        assert!(!out.exists());
    }

    #[test]
    fn test_no_files_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("sample.docx");
        let args = generate_args(&[]);
        assert!(run(&args, &FixedCounter(None), dir.path(), &out).is_none());
        assert!(!out.exists());
    }
}
