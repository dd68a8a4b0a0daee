use crate::cli_args::{ShowArgs, ShowItem};
use crate::load_config_for_command;
use crate::output::{self, print_data_or_text};
use anyhow::{Context, Result};
use colored::*;
use log;
use serde::Serialize;
use code2doc_core::{
    self as core, ClocCounter, Config, IgnoreRuleSet, ResolvedIgnoreRules, get_builtin_ignore_rules,
    resolve_ignore_rules,
};

#[derive(Debug, Serialize, PartialEq)]
struct RuleEntry {
    kind: &'static str,
    value: String,
    origin: &'static str,
}

#[derive(Debug, Serialize)]
struct RulesView {
    rules: Vec<RuleEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

pub fn handle_show_command(args: ShowArgs, quiet: bool) -> Result<()> {
    let config = load_config_for_command(&args.project_config, None)
        .context("Failed to load configuration for show command")?;

    match &args.item {
        ShowItem::Rules {} => {
            let resolved = resolve_ignore_rules(get_builtin_ignore_rules(), config.ignore.as_ref());
            let view = rules_view(get_builtin_ignore_rules(), &resolved);
            print_data_or_text(&view, Some(format_rules_text(&view)), &args.format_output)
        }
        ShowItem::Config {} => {
            let toml_text =
                toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
            print_data_or_text(&config, Some(toml_text), &args.format_output)
        }
        ShowItem::Stats {} => handle_show_stats(&args, &config, quiet),
    }
}

fn handle_show_stats(args: &ShowArgs, config: &Config, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let counter = ClocCounter::from_config(config)?;
    let (_, stats) = core::count_files(&project_root, config, &counter)?;

    if args.format_output.format.is_some() {
        return print_data_or_text(&stats, None, &args.format_output);
    }
    if !quiet {
        output::print_stats_report(&stats);
    }
    Ok(())
}

/// Labels each resolved entry with whether it came from the built-in list.
fn rules_view(builtin: &IgnoreRuleSet, resolved: &ResolvedIgnoreRules) -> RulesView {
    let origin = |is_builtin: bool| if is_builtin { "builtin" } else { "user" };
    let dirs = resolved.rules.exclude_dir.iter().map(|d| RuleEntry {
        kind: "dir",
        value: d.clone(),
        origin: origin(builtin.exclude_dir.contains(d)),
    });
    let exts = resolved.rules.exclude_ext.iter().map(|e| RuleEntry {
        kind: "ext",
        value: e.clone(),
        origin: origin(builtin.exclude_ext.contains(e)),
    });
    RulesView {
        rules: dirs.chain(exts).collect(),
        warning: resolved.warning.clone(),
    }
}

fn format_rules_text(view: &RulesView) -> String {
    let mut out = String::new();
    for (kind, title) in [("dir", "Excluded directories"), ("ext", "Excluded extensions")] {
        out.push_str(&format!("{}\n", format!("--- {} ---", title).bold()));
        for entry in view.rules.iter().filter(|r| r.kind == kind) {
            let origin = if entry.origin == "user" {
                entry.origin.green()
            } else {
                entry.origin.dimmed()
            };
            out.push_str(&format!("  - {} ({})\n", entry.value.blue(), origin));
        }
        out.push('\n');
    }
    if let Some(warning) = &view.warning {
        out.push_str(&format!("{} {}\n", "Warning:".yellow().bold(), warning));
    }
    out
}
