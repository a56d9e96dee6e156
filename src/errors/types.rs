use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Report root not found: no '{issue_dir}' directory or reporter.yaml within 3 levels above {start}")]
    ReportRootNotFound { start: PathBuf, issue_dir: String },

    #[error("Layer directory does not exist: {0}")]
    LayerMissing(PathBuf),

    #[error("Template chain error: {0}")]
    TemplateChain(String),

    #[error("Content error at '{key_path}'{}: {message}", source_suffix(.source_file))]
    ContentMerge {
        key_path: String,
        message: String,
        source_file: Option<PathBuf>,
    },

    #[error("Template {path}: undefined field '{field}'")]
    TemplateRender { path: String, field: String },

    #[error("Template {path}: {message}")]
    TemplateSyntax { path: String, message: String },

    #[error("{} template(s) failed to render:\n{}", .0.len(), list_failures(.0))]
    TemplateFailures(Vec<ReportError>),

    #[error("Evidence {0} has no location and no default location is set")]
    EvidenceLocationMissing(PathBuf),

    #[error("Invalid issue {path}: {message}")]
    Issue { path: PathBuf, message: String },

    #[error("Issue number {number} is used by both '{first}' and '{second}'")]
    NumberingInvariant {
        number: u32,
        first: String,
        second: String,
    },

    #[error("Compilation failed: {0}")]
    Compile(String),

    #[error("IO error on {}: {source}", .path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn source_suffix(source_file: &Option<PathBuf>) -> String {
    source_file
        .as_ref()
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}

fn list_failures(failures: &[ReportError]) -> String {
    failures
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

impl ReportError {
    /// Adapter for `map_err` that attaches the path an I/O call was working on.
    pub fn io_at(path: impl AsRef<Path>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        move |source| ReportError::FileIo { path, source }
    }

    /// Build a content error for a key path, optionally naming the file it came from.
    pub fn content(key_path: impl Into<String>, message: impl Into<String>, source_file: Option<PathBuf>) -> Self {
        ReportError::ContentMerge {
            key_path: key_path.into(),
            message: message.into(),
            source_file,
        }
    }
}
