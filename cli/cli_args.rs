use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        short = 'r',
        long = "root",
        help = "Directory to sample (default: current dir).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,

    #[arg(
        short = 'c',
        long,
        help = "Path or name of the TOML config file (default: .code2doc/config.toml).",
        value_name = "CONFIG",
        conflicts_with = "disable_config",
        help_heading = "Project Setup"
    )]
    pub config: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config",
        help_heading = "Project Setup"
    )]
    pub disable_config: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FormatOutputOpts {
    #[arg(short = 'f', long, help = "Emit structured output instead of a table.", value_name = "FORMAT", value_parser = ["json", "yaml"], help_heading = "Output Formatting")]
    pub format: Option<String>,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Sample a source tree and assemble it into a Word document.",
    long_about = "code2doc counts the lines of a source tree with cloc, picks the largest files \nuntil a target number of code lines is reached, and writes their non-empty \nlines into a .docx document, one paragraph per line.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  code2doc generate --creator \"Jane Doe\"\n  code2doc generate --dry --min-lines 5000 -f json\n  code2doc show rules\n  code2doc config --save",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Also append log records to DIR/<date>.log."
    )]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "g",
        visible_alias = "gen",
        about = "Select files and write the document."
    )]
    Generate(GenerateArgs),

    #[command(
        visible_alias = "s",
        about = "Show resolved rules, effective configuration or line statistics."
    )]
    Show(ShowArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),

    #[command(about = "Show or save the default configuration file.")]
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,

    #[arg(
        short = 'd',
        long,
        help = "Preview the selection without reading files or writing the document.",
        help_heading = "Output Control"
    )]
    pub dry: bool,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Output document path (default: output.docx).",
        help_heading = "Output Control"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        short = 'm',
        long,
        value_name = "LINES",
        help = "Target number of code lines (default: 3000).",
        help_heading = "Selection"
    )]
    pub min_lines: Option<u64>,

    #[arg(
        long,
        value_name = "NAME",
        help = "Document author (overrides [document].creator).",
        help_heading = "Selection"
    )]
    pub creator: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
    #[command(subcommand)]
    pub item: ShowItem,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ShowItem {
    #[command(about = "Show the resolved exclusion rules and where they come from.")]
    Rules {},
    #[command(about = "Show the effective configuration as TOML.")]
    Config {},
    #[command(about = "Count the tree and list every counted file.")]
    Stats {},
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        long,
        help = "Save the config template to .code2doc/config.toml (prompts overwrite)."
    )]
    pub save: bool,
}
