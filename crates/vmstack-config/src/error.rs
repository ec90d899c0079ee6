use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("config file {path} must contain a JSON object at the top level")]
    NotAnObject { path: PathBuf },

    #[error("config key not found: {0}")]
    KeyMissing(String),

    #[error("config key '{key}' has the wrong type, expected {expected}")]
    InvalidValue { key: String, expected: &'static str },

    #[error(
        "no config file found. Checked, in order:\n\
        - VMSTACK_CONFIG_PATH environment variable\n\
        - the current directory\n\
        - ./.vmstack/\n\
        - ~/.config/vmstack/"
    )]
    ConfigFileNotFound,
}

pub type Result<T> = std::result::Result<T, ConfigError>;
