//! Error types for the validation pipeline.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Failed to load module {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("Unknown mutator group: {0}")]
    UnknownMutatorGroup(String),

    #[error("Cannot apply mutation {mutant}: {reason}")]
    Application { mutant: String, reason: String },

    #[error("Module {module} failed verification:\n{details}")]
    Verification { module: String, details: String },

    #[error("Failed to compile module {module}: {reason}")]
    Compilation { module: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl Error {
    /// Pipeline stage the error belongs to, used in the final diagnostic.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Usage(_) | Error::Config(_) => "usage",
            Error::Io(_) | Error::Serialization(_) | Error::Load { .. } => "load",
            Error::UnknownMutatorGroup(_) => "mutator resolution",
            Error::Application { .. } | Error::InvalidState(_) => "apply",
            Error::Verification { .. } => "verify",
            Error::Compilation { .. } => "compile",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_stages() {
        assert_eq!(Error::UnknownMutatorGroup("x".into()).stage(), "mutator resolution");
        assert_eq!(
            Error::Verification {
                module: "m".into(),
                details: String::new()
            }
            .stage(),
            "verify"
        );
        assert_eq!(
            Error::Compilation {
                module: "m".into(),
                reason: "bad".into()
            }
            .stage(),
            "compile"
        );
    }

    #[test]
    fn test_verification_message_names_module() {
        let err = Error::Verification {
            module: "demo.bc".into(),
            details: "function 0 block 0 is empty".into(),
        };
        let message = err.to_string();
        assert!(message.contains("demo.bc"));
        assert!(message.contains("block 0 is empty"));
    }
}
