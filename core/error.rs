use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("TOML Parsing Error: {0}")]
    TomlParse(String),

    #[error("Duration Parsing Error: {0}")]
    DurationParse(String),

    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Target Path Error: Path '{path}'")]
    TargetPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Target path '{0}' is not a directory")]
    NotADirectory(PathBuf),

    #[error("File Read Error: Path '{path}'")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File Decode Error: Path '{path}' is not valid UTF-8")]
    FileDecode {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("File Write Error: Path '{path}'")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory Creation Error: Path '{path}'")]
    DirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Line counter '{0}' not found. Install it or set [counter].command")]
    CounterNotFound(String),

    #[error("Line counter timed out after {0:?}")]
    CounterTimeout(std::time::Duration),

    #[error("Line Counting Error: {0}")]
    Counting(String),

    #[error("Line Counter Output Error: {0}")]
    StatsParse(String),

    #[error("Document Rendering Error: {0}")]
    Render(String),

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),
}

/// Coarse classification used for exit codes and remediation hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    FileSystem,
    Counting,
    Assembly,
    Render,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Config(_)
            | AppError::TomlParse(_)
            | AppError::DurationParse(_)
            | AppError::InvalidArgument(_) => ErrorKind::Configuration,
            AppError::Io(_)
            | AppError::TargetPath { .. }
            | AppError::NotADirectory(_)
            | AppError::DirCreation { .. } => ErrorKind::FileSystem,
            AppError::CounterNotFound(_)
            | AppError::CounterTimeout(_)
            | AppError::Counting(_)
            | AppError::StatsParse(_) => ErrorKind::Counting,
            AppError::FileRead { .. } | AppError::FileDecode { .. } => ErrorKind::Assembly,
            AppError::FileWrite { .. } | AppError::Render(_) => ErrorKind::Render,
        }
    }

    pub fn hint(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Configuration => {
                "Check the configuration file format and make sure all required fields (e.g. document.creator) are set."
            }
            ErrorKind::FileSystem => {
                "Check that the path is correct and that you have permission to access it."
            }
            ErrorKind::Counting => {
                "Check that the target directory contains source files and that cloc is installed."
            }
            ErrorKind::Assembly => "The file was skipped; check its encoding and permissions.",
            ErrorKind::Render => {
                "Check available disk space and write permission for the output directory."
            }
        }
    }
}

impl From<parse_duration::parse::Error> for AppError {
    fn from(err: parse_duration::parse::Error) -> Self {
        AppError::DurationParse(format!("{}. Use a format like '90s' or '10m'", err))
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        AppError::Render(format!("Archive error: {}", err))
    }
}
