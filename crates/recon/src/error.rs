use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ReconError {
    /// JSON parse / deserialization error in the match-rule document.
    ConfigParse(String),
    /// Match-rule or run-configuration validation error.
    ConfigValidation(String),
    /// A source folder does not exist.
    MissingFolder(PathBuf),
    /// IO error (folder scan, artifact write, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingFolder(path) => write!(f, "source folder not found: {}", path.display()),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
