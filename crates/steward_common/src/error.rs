//! Error types for Steward.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StewardError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to read config {path}: {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Required tool not found: {0}")]
    ToolNotFound(String),

    #[error("Command '{command}' failed with exit code {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Command '{0}' timed out after {1}s")]
    Timeout(String, u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StewardError {
    pub fn code(&self) -> i32 {
        match self {
            StewardError::InvalidConfiguration(_) => 10,
            StewardError::ConfigLoad { .. } => 11,
            StewardError::ConfigParse(_) => 12,
            StewardError::ConfigSerialize(_) => 13,
            StewardError::ToolNotFound(_) => 20,
            StewardError::CommandFailed { .. } => 21,
            StewardError::Timeout(_, _) => 22,
            StewardError::Io(_) => 30,
            StewardError::Json(_) => 31,
        }
    }
}

pub type Result<T> = std::result::Result<T, StewardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            StewardError::InvalidConfiguration("x".into()),
            StewardError::ToolNotFound("apt-get".into()),
            StewardError::CommandFailed {
                command: "apt-get update".into(),
                code: Some(100),
                stderr: String::new(),
            },
            StewardError::Timeout("apt-get update".into(), 5),
            StewardError::Io(std::io::Error::other("boom")),
        ];
        let mut codes: Vec<i32> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_mentions_tool() {
        let err = StewardError::ToolNotFound("timeshift".into());
        assert!(err.to_string().contains("timeshift"));
    }
}
