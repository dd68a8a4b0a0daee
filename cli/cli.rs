mod cli_args;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use log;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use cli_args::{Cli, Commands, GenerateArgs, ProjectConfigOpts};
use code2doc_core::{AppError, Config, ErrorKind};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose, cli_args.log_dir.as_deref());

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let core_err = e.downcast_ref::<AppError>();
            let exit_code = match core_err.map(AppError::kind) {
                Some(ErrorKind::Configuration) => 1,
                Some(ErrorKind::FileSystem) | Some(ErrorKind::Assembly) => 2,
                Some(ErrorKind::Counting) => 3,
                Some(ErrorKind::Render) => 4,
                None => 1,
            };

            log::error!("Application failed: {:#}", e);
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            if let Some(err) = core_err {
                eprintln!("{} {}", "Hint:".yellow().bold(), err.hint());
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

/// Sends every formatted record to stderr and to the daily log file.
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

fn open_daily_log(dir: &Path) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.log", chrono::Local::now().format("%Y-%m-%d")));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

fn setup_logging(quiet: bool, verbose: u8, log_dir: Option<&Path>) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log_level);

    let mut log_file_error = None;
    let mut log_file_path = None;
    match log_dir.map(open_daily_log) {
        Some(Ok((path, file))) => {
            // File records need a time of day; the date is in the file name.
            builder
                .format_timestamp_secs()
                .target(env_logger::Target::Pipe(Box::new(TeeWriter { file })));
            log_file_path = Some(path);
        }
        Some(Err(e)) => {
            builder.format_timestamp(None);
            log_file_error = Some(e);
        }
        None => {
            builder.format_timestamp(None);
        }
    }
    builder.init();

    if let Some(path) = log_file_path {
        log::debug!("Appending log records to {}", path.display());
    }
    if let Some(e) = log_file_error {
        log::warn!("Could not open log file, logging to stderr only: {}", e);
    }
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Completion(args) => {
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args, quiet)?;
            }
            Commands::Config(args) => {
                log::debug!("Executing 'config' command...");
                let base_dir = env::current_dir().context("Failed to read working directory")?;
                commands::config::handle_config_command(&args, &base_dir, quiet)?;
            }
            Commands::Generate(args) => {
                log::debug!("Executing 'generate' command...");
                commands::generate::handle_generate_command(args, quiet)?;
            }
            Commands::Show(args) => {
                log::debug!("Executing 'show' command...");
                commands::show::handle_show_command(args, quiet)?;
            }
        },
    }
    Ok(())
}

/// Applies `generate` flags on top of the loaded file. Flags win over the file.
fn merge_config_with_cli_overrides(mut config: Config, args: &GenerateArgs) -> Config {
    log::trace!("Applying generate command CLI overrides to config...");

    if let Some(min_lines) = args.min_lines {
        config.min_lines = min_lines;
    }
    if let Some(creator) = &args.creator {
        config.document.creator = creator.clone();
    }
    if let Some(output) = &args.output {
        config.output_file = output.clone();
    }

    log::trace!("Config after CLI overrides: {:?}", config);
    config
}

/// Loads the config file named by the project options, relative to the
/// working directory, then applies any `generate` overrides.
pub fn load_config_for_command(
    project_opts: &ProjectConfigOpts,
    generate_args: Option<&GenerateArgs>,
) -> Result<Config> {
    let base_dir = env::current_dir().context("Failed to read working directory")?;
    let config_path = Config::resolve_config_path(
        &base_dir,
        project_opts.config.as_ref(),
        project_opts.disable_config,
    )
    .context("Failed to resolve configuration path")?;

    let mut config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(gen_args) = generate_args {
        config = merge_config_with_cli_overrides(config, gen_args);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_win_over_file() {
        let file_config = Config::from_toml_str(
            "min_lines = 100\noutput_file = \"from-file.docx\"\n[document]\ncreator = \"File Author\"\n",
        )
        .unwrap();
        let cli = Cli::parse_from([
            "code2doc",
            "generate",
            "--min-lines",
            "42",
            "--creator",
            "Cli Author",
        ]);
        let Some(Commands::Generate(args)) = cli.command else {
            panic!("expected generate");
        };
        let merged = merge_config_with_cli_overrides(file_config, &args);
        assert_eq!(merged.min_lines, 42);
        assert_eq!(merged.document.creator, "Cli Author");
        assert_eq!(merged.output_file, PathBuf::from("from-file.docx"));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_tee_writer_copies_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let (path, file) = open_daily_log(dir.path()).unwrap();
        let mut tee = TeeWriter { file };
        tee.write_all(b"[INFO] hello\n").unwrap();
        tee.flush().unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "[INFO] hello\n");
    }
}
