use crate::error::{AppError, Result};
use log;
use parse_duration::parse;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_DIR: &str = ".code2doc";
pub const DEFAULT_CONFIG_FILENAME: &str = "config.toml";
pub const DEFAULT_OUTPUT_FILE: &str = "output.docx";
pub const DEFAULT_MIN_LINES: u64 = 3000;
pub const DEFAULT_COUNTER_COMMAND: &str = "cloc";
pub const DEFAULT_COUNTER_TIMEOUT: &str = "10m";
pub const ROOT_ENV_VAR: &str = "CODE2DOC_ROOT";

static CONFIG_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../data/config.template.toml"
));

/// Effective settings for one run. Built once, then passed by reference
/// through every pipeline stage.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_min_lines", alias = "minLines")]
    pub min_lines: u64,
    #[serde(default = "default_output_file", alias = "outputFile")]
    pub output_file: PathBuf,
    #[serde(default)]
    pub document: DocumentConfig,
    /// Kept untyped so a malformed section degrades to the built-in rules
    /// instead of failing the whole file. See `rules::resolve_ignore_rules`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<toml::Value>,
    #[serde(default)]
    pub counter: CounterConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DocumentConfig {
    #[serde(default)]
    pub creator: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CounterConfig {
    #[serde(default = "default_counter_command")]
    pub command: String,
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
    #[serde(default = "default_counter_timeout")]
    pub timeout: String,
}

fn default_true() -> bool {
    true
}
fn default_min_lines() -> u64 {
    DEFAULT_MIN_LINES
}
fn default_output_file() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_FILE)
}
fn default_counter_command() -> String {
    DEFAULT_COUNTER_COMMAND.to_string()
}
fn default_counter_timeout() -> String {
    DEFAULT_COUNTER_TIMEOUT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_lines: default_min_lines(),
            output_file: default_output_file(),
            document: DocumentConfig::default(),
            ignore: None,
            counter: CounterConfig::default(),
        }
    }
}
impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            command: default_counter_command(),
            use_gitignore: default_true(),
            timeout: default_counter_timeout(),
        }
    }
}

impl Config {
    pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_str_opt = cli_project_root
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var(ROOT_ENV_VAR).ok().filter(|s| !s.is_empty()));

        let path_to_resolve = match path_str_opt {
            Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        let canonical = path_to_resolve
            .canonicalize()
            .map_err(|e| AppError::TargetPath {
                path: path_to_resolve.clone(),
                source: e,
            })?;
        if !canonical.is_dir() {
            return Err(AppError::NotADirectory(canonical));
        }
        Ok(canonical)
    }

    /// Finds the config file to load. Relative names are looked up in
    /// `DEFAULT_CONFIG_DIR` under `base_dir` (normally the working directory).
    pub fn resolve_config_path(
        base_dir: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        let path_to_check = match cli_config_file {
            Some(p_str) => {
                let expanded_path_cow = shellexpand::tilde(p_str);
                let mut path = PathBuf::from(expanded_path_cow.as_ref());
                let looks_like_path = path.is_absolute()
                    || path.components().count() > 1
                    || p_str.contains(['/', '\\']);

                if looks_like_path {
                    if path.is_relative() {
                        path = base_dir.join(path);
                    }
                    if !path.exists() && path.extension().is_none() {
                        path.set_extension("toml");
                    }
                    if !path.exists() {
                        return Err(AppError::Config(format!(
                            "Specified config file not found at path: {}",
                            path.display()
                        )));
                    }
                    log::debug!("Using specified config file path: {}", path.display());
                    Some(path)
                } else {
                    let filename = if path.extension().is_none_or(|e| e != "toml") {
                        format!("{}.toml", path.to_string_lossy())
                    } else {
                        path.to_string_lossy().to_string()
                    };
                    let full_path = base_dir.join(DEFAULT_CONFIG_DIR).join(filename);
                    if !full_path.exists() {
                        return Err(AppError::Config(format!(
                            "Specified config file '{}' not found in default directory: {}",
                            path.display(),
                            base_dir.join(DEFAULT_CONFIG_DIR).display()
                        )));
                    }
                    log::debug!(
                        "Using specified config filename in default directory: {}",
                        full_path.display()
                    );
                    Some(full_path)
                }
            }
            None => {
                let default_path = Self::default_config_path(base_dir);
                if default_path.exists() {
                    log::debug!("Using default config file path: {}", default_path.display());
                    Some(default_path)
                } else {
                    log::debug!(
                        "No config file specified and default not found at: {}",
                        default_path.display()
                    );
                    None
                }
            }
        };
        Ok(path_to_check)
    }

    pub fn default_config_path(base_dir: &Path) -> PathBuf {
        base_dir
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILENAME)
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::Config(
            format!("Failed to read config file '{}': {}", config_path.display(), e),
        ))?;
        Self::from_toml_str(&toml_content).map_err(|e| match e {
            AppError::TomlParse(msg) => AppError::TomlParse(format!(
                "Error parsing config file '{}': {}. Check TOML syntax and structure.",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn from_toml_str(toml_content: &str) -> Result<Self> {
        toml::from_str::<Config>(toml_content).map_err(|e| AppError::TomlParse(e.to_string()))
    }

    /// Checks everything the pipeline relies on before any I/O happens.
    pub fn validate(&self) -> Result<()> {
        if self.document.creator.trim().is_empty() {
            return Err(AppError::Config(format!(
                "document.creator must be set. Run `code2doc config --save` and fill in [document].creator in {}/{}",
                DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME
            )));
        }
        if self.counter.command.trim().is_empty() {
            return Err(AppError::Config(
                "counter.command must not be empty".to_string(),
            ));
        }
        if self.output_file.as_os_str().is_empty() {
            return Err(AppError::Config(
                "output_file must not be empty".to_string(),
            ));
        }
        self.get_counter_timeout()?;
        Ok(())
    }

    /// `None` means no timeout: an empty string or a zero duration.
    pub fn get_counter_timeout(&self) -> Result<Option<Duration>> {
        let raw = self.counter.timeout.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let duration = parse(raw)?;
        Ok(if duration.is_zero() {
            None
        } else {
            Some(duration)
        })
    }

    pub fn get_effective_output_path(&self, base_dir: &Path) -> PathBuf {
        let expanded = PathBuf::from(
            shellexpand::tilde(&self.output_file.to_string_lossy()).as_ref(),
        );
        if expanded.is_absolute() {
            expanded
        } else {
            base_dir.join(expanded)
        }
    }

    pub fn template() -> &'static str {
        CONFIG_TEMPLATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.min_lines, 3000);
        assert_eq!(config.output_file, PathBuf::from("output.docx"));
        assert_eq!(config.counter.command, "cloc");
        assert!(config.counter.use_gitignore);
        assert!(config.ignore.is_none());
    }

    #[test]
    fn test_template_parses() {
        let config = Config::from_toml_str(Config::template()).unwrap();
        assert_eq!(config.min_lines, DEFAULT_MIN_LINES);
        assert_eq!(config.counter, CounterConfig::default());
        assert!(config.document.creator.is_empty());
        assert!(config.ignore.is_some());
    }

    #[test]
    fn test_camel_case_aliases() {
        let config = Config::from_toml_str(
            r#"
minLines = 1200
outputFile = "sample.docx"

[document]
creator = "Jane"
"#,
        )
        .unwrap();
        assert_eq!(config.min_lines, 1200);
        assert_eq!(config.output_file, PathBuf::from("sample.docx"));
        assert_eq!(config.document.creator, "Jane");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = Config::from_toml_str("max_lines = 5").unwrap_err();
        assert!(matches!(err, AppError::TomlParse(_)));
    }

    #[test]
    fn test_negative_min_lines_is_rejected() {
        assert!(Config::from_toml_str("min_lines = -1").is_err());
    }

    #[test]
    fn test_malformed_ignore_still_loads() {
        let config = Config::from_toml_str(
            r#"
ignore = "node_modules"

[document]
creator = "Jane"
"#,
        )
        .unwrap();
        assert!(matches!(config.ignore, Some(toml::Value::String(_))));
    }

    #[test]
    fn test_validate_requires_creator() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("document.creator"));

        let mut config = Config::default();
        config.document.creator = "   ".to_string();
        assert!(config.validate().is_err());

        config.document.creator = "Jane".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_timeout() {
        let mut config = Config::default();
        config.document.creator = "Jane".to_string();
        config.counter.timeout = "soon".to_string();
        assert!(matches!(
            config.validate().unwrap_err(),
            AppError::DurationParse(_)
        ));
    }

    #[test]
    fn test_counter_timeout() {
        let mut config = Config::default();
        assert_eq!(
            config.get_counter_timeout().unwrap(),
            Some(Duration::from_secs(600))
        );
        config.counter.timeout = "0s".to_string();
        assert_eq!(config.get_counter_timeout().unwrap(), None);
        config.counter.timeout = String::new();
        assert_eq!(config.get_counter_timeout().unwrap(), None);
    }

    #[test]
    fn test_output_path_resolution() {
        let config = Config::default();
        let base = Path::new("/work");
        assert_eq!(
            config.get_effective_output_path(base),
            PathBuf::from("/work/output.docx")
        );

        let mut config = Config::default();
        config.output_file = PathBuf::from("/tmp/out.docx");
        assert_eq!(
            config.get_effective_output_path(base),
            PathBuf::from("/tmp/out.docx")
        );
    }

    #[test]
    fn test_resolve_config_path() {
        let dir = TempDir::new().unwrap();
        let base = dir.path();

        assert_eq!(Config::resolve_config_path(base, None, false).unwrap(), None);

        let default_path = Config::default_config_path(base);
        fs::create_dir_all(default_path.parent().unwrap()).unwrap();
        fs::write(&default_path, "min_lines = 10\n").unwrap();
        assert_eq!(
            Config::resolve_config_path(base, None, false).unwrap(),
            Some(default_path.clone())
        );
        assert_eq!(Config::resolve_config_path(base, None, true).unwrap(), None);

        // Bare name is looked up in the config dir with .toml appended.
        let named = "config".to_string();
        assert_eq!(
            Config::resolve_config_path(base, Some(&named), false).unwrap(),
            Some(default_path)
        );

        let missing = "nope".to_string();
        assert!(matches!(
            Config::resolve_config_path(base, Some(&missing), false).unwrap_err(),
            AppError::Config(_)
        ));
    }

    #[test]
    fn test_load_from_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            "min_lines = 42\n[document]\ncreator = \"Jane\"\n[counter]\ncommand = \"tokei-cloc\"\n",
        )
        .unwrap();
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.min_lines, 42);
        assert_eq!(config.counter.command, "tokei-cloc");
        assert_eq!(config.counter.timeout, DEFAULT_COUNTER_TIMEOUT);

        fs::write(&path, "min_lines = [").unwrap();
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("custom.toml"));
    }

    #[test]
    fn test_determine_project_root() {
        let dir = TempDir::new().unwrap();
        let root = Config::determine_project_root(Some(&dir.path().to_path_buf())).unwrap();
        assert_eq!(root, dir.path().canonicalize().unwrap());

        let missing = dir.path().join("missing");
        assert!(matches!(
            Config::determine_project_root(Some(&missing)).unwrap_err(),
            AppError::TargetPath { .. }
        ));

        let file = dir.path().join("file.rs");
        fs::write(&file, "fn main() {}").unwrap();
        assert!(matches!(
            Config::determine_project_root(Some(&file)).unwrap_err(),
            AppError::NotADirectory(_)
        ));
    }
}
