use crate::cli_args::ConfigArgs;
use crate::output::{confirm_overwrite, write_to_stdout};
use anyhow::{Context, Result};
use colored::*;
use log;
use std::fs;
use std::path::Path;
use code2doc_core::Config;

/// Prints the commented config template, or writes it to
/// `.code2doc/config.toml` under `base_dir` with `--save`.
pub fn handle_config_command(args: &ConfigArgs, base_dir: &Path, quiet: bool) -> Result<()> {
    let template = Config::template();
    if !args.save {
        return write_to_stdout(template);
    }

    let save_path = Config::default_config_path(base_dir);
    if !confirm_overwrite(&save_path, quiet)? {
        println!("Save cancelled.");
        return Ok(());
    }
    if let Some(parent) = save_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(&save_path, template)
        .with_context(|| format!("Failed to write config to {}", save_path.display()))?;
    log::info!("Config template saved to {}", save_path.display());

    if !quiet {
        println!(
            "{} Config saved to: {}",
            "✅".green(),
            save_path.display().to_string().blue()
        );
        println!(
            "Set {} before running {}.",
            "[document].creator".yellow(),
            "code2doc generate".cyan()
        );
    }
    Ok(())
}
