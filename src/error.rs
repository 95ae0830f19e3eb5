use std::{fmt, io, path::StripPrefixError};

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use serde_yaml::Error as YamlError;
use thiserror::Error;

#[cfg(feature = "service")]
use notify::{Error as NotifyError, ErrorKind as NotifyErrorKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum GraphError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Directory does not exist: {0}")]
    DirectoryNotFound(String),
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("Cannot load document {id}: does not exist in {source_description}")]
    DocumentNotFound {
        id: String,
        source_description: String,
    },
    #[error("Failed to parse markdown in {filename}: {cause}")]
    MarkdownParsing { filename: String, cause: String },
    #[error("File System error: {0}")]
    Io(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Change notification error: {0}")]
    Watch(String),
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// A helpful next step shown to the user alongside an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub message: &'static str,
    pub action: Option<&'static str>,
}

const fn suggest(message: &'static str, action: Option<&'static str>) -> Suggestion {
    Suggestion { message, action }
}

impl GraphError {
    /// One word classification used as the prefix of user facing reports.
    pub fn kind_name(&self) -> &'static str {
        match self {
            GraphError::Configuration(_) => "ConfigurationError",
            GraphError::DirectoryNotFound(_) => "DirectoryNotFoundError",
            GraphError::FileNotFound(_) => "FileNotFoundError",
            GraphError::DocumentNotFound { .. } => "DocumentNotFoundError",
            GraphError::MarkdownParsing { .. } => "MarkdownParsingError",
            GraphError::Io(_) => "IoError",
            GraphError::Serialization(_) => "SerializationError",
            GraphError::Watch(_) => "WatchError",
            GraphError::Unexpected(_) => "UnexpectedError",
        }
    }

    /// Errors the user can fix by changing paths, files or settings.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GraphError::DirectoryNotFound(_)
                | GraphError::FileNotFound(_)
                | GraphError::Configuration(_)
                | GraphError::MarkdownParsing { .. }
        )
    }

    pub fn suggestions(&self) -> Vec<Suggestion> {
        match self {
            GraphError::DirectoryNotFound(_) => vec![
                suggest(
                    "Check that the directory path is correct",
                    Some("Verify the path exists and you have read permissions"),
                ),
                suggest(
                    "Use an absolute path to avoid confusion",
                    Some("Try using the full path like /home/username/notes"),
                ),
                suggest(
                    "Create the directory if it should exist",
                    Some("mkdir -p <directory-path>"),
                ),
            ],
            GraphError::FileNotFound(_) => vec![
                suggest("Check that the file exists and you have read permissions", None),
                suggest("Verify the file hasn't been moved or deleted", None),
                suggest(
                    "Check if the file is in a hidden directory",
                    Some("Use --include-hidden to scan hidden directories"),
                ),
            ],
            GraphError::DocumentNotFound { .. } => vec![
                suggest(
                    "The document ID might be incorrect",
                    Some("Check available document IDs in your repository"),
                ),
                suggest("The document might have been deleted or moved", None),
            ],
            GraphError::MarkdownParsing { .. } => vec![
                suggest(
                    "Check the markdown file for syntax errors",
                    Some("Review frontmatter YAML syntax"),
                ),
                suggest("Verify the file encoding is UTF-8", None),
            ],
            GraphError::Configuration(_) => vec![
                suggest(
                    "Check your configuration file syntax",
                    Some("Verify .markdown-graph.json or markdown-graph.toml"),
                ),
                suggest(
                    "Review configuration options",
                    Some("Run 'markdown-graph --help' for available options"),
                ),
            ],
            _ => vec![
                suggest(
                    "Try running with verbose logging for more details",
                    Some("Use -v or --verbose"),
                ),
                suggest("Check the documentation for troubleshooting tips", None),
            ],
        }
    }
}

/// Log a one-line classification of `error`, followed by numbered suggestions. The underlying
/// cause is only shown when `verbose` is set.
pub fn report_error(error: &GraphError, verbose: bool) {
    tracing::error!("{}: {}", error.kind_name(), error);
    let suggestions = error.suggestions();
    if !suggestions.is_empty() {
        tracing::info!("Suggestions:");
        for (idx, suggestion) in suggestions.iter().enumerate() {
            tracing::info!("  {}. {}", idx + 1, suggestion.message);
            if let Some(action) = suggestion.action {
                tracing::info!("     -> {}", action);
            }
        }
    }
    if verbose {
        tracing::debug!("Caused by: {:?}", error);
    }
}

impl From<StripPrefixError> for GraphError {
    fn from(src: StripPrefixError) -> GraphError {
        GraphError::FileNotFound(format!("Strip prefix failed for path. Error: {src}"))
    }
}

impl From<toml::de::Error> for GraphError {
    fn from(src: toml::de::Error) -> GraphError {
        GraphError::Configuration(format!("Toml deserialization error: {src}"))
    }
}

impl From<JsonError> for GraphError {
    fn from(src: JsonError) -> GraphError {
        GraphError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<YamlError> for GraphError {
    fn from(src: YamlError) -> GraphError {
        GraphError::Serialization(format!("YAML (de)serialization error: {src}"))
    }
}

impl From<io::Error> for GraphError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => GraphError::FileNotFound(format!("{x}")),
            _ => GraphError::Io(format!("IOError: {x}")),
        }
    }
}

impl From<fmt::Error> for GraphError {
    fn from(x: fmt::Error) -> Self {
        GraphError::Unexpected(format!("{x}"))
    }
}

impl From<tokio::task::JoinError> for GraphError {
    fn from(x: tokio::task::JoinError) -> Self {
        GraphError::Unexpected(format!("background task failed: {x}"))
    }
}

#[cfg(feature = "service")]
impl From<NotifyError> for GraphError {
    fn from(notify_error: NotifyError) -> Self {
        match notify_error.kind {
            NotifyErrorKind::Generic(msg) => GraphError::Watch(format!(
                "notify-debouncer: {}, paths: {:?}",
                msg, notify_error.paths
            )),
            NotifyErrorKind::Io(io_error) => GraphError::Watch(format!(
                "notify-debouncer: io error {}, paths: {:?}",
                io_error.kind(),
                notify_error.paths
            )),
            NotifyErrorKind::PathNotFound => GraphError::DirectoryNotFound(format!(
                "notify-debouncer: path(s) not found: {:?}",
                notify_error.paths
            )),
            NotifyErrorKind::WatchNotFound => GraphError::Watch(format!(
                "notify-debouncer: watch not found, paths: {:?}",
                notify_error.paths
            )),
            NotifyErrorKind::InvalidConfig(_) => {
                GraphError::Configuration("notify-debouncer invalid config".to_string())
            }
            NotifyErrorKind::MaxFilesWatch => {
                GraphError::Watch("notify-debouncer max file watch limit reached".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_file_not_found() {
        let err: GraphError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, GraphError::FileNotFound(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn every_kind_has_suggestions() {
        let errors = vec![
            GraphError::Configuration("x".into()),
            GraphError::DirectoryNotFound("x".into()),
            GraphError::FileNotFound("x".into()),
            GraphError::DocumentNotFound {
                id: "x".into(),
                source_description: "in-memory repository".into(),
            },
            GraphError::MarkdownParsing {
                filename: "x.md".into(),
                cause: "bad".into(),
            },
            GraphError::Unexpected("x".into()),
        ];
        for err in errors {
            assert!(!err.suggestions().is_empty(), "{}", err.kind_name());
        }
    }

    #[test]
    fn document_not_found_message_names_source() {
        let err = GraphError::DocumentNotFound {
            id: "foo".into(),
            source_description: "in-memory repository".into(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot load document foo: does not exist in in-memory repository"
        );
        assert!(!err.is_recoverable());
    }
}
