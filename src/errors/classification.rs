use super::types::ReportError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub fatal: bool,
}

impl ReportError {
    /// Classify this error to determine its type and whether it stops the run.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Optional overlays: a missing layer reads as empty
            ReportError::LayerMissing(_) => ErrorClassification {
                error_type: "LayerMissing",
                fatal: false,
            },

            ReportError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                fatal: true,
            },
            ReportError::ReportRootNotFound { .. } => ErrorClassification {
                error_type: "ReportRootNotFound",
                fatal: true,
            },
            ReportError::TemplateChain(_) => ErrorClassification {
                error_type: "TemplateChainError",
                fatal: true,
            },
            ReportError::ContentMerge { .. } => ErrorClassification {
                error_type: "ContentMergeError",
                fatal: true,
            },
            ReportError::TemplateRender { .. } => ErrorClassification {
                error_type: "TemplateRenderError",
                fatal: true,
            },
            ReportError::TemplateSyntax { .. } => ErrorClassification {
                error_type: "TemplateSyntaxError",
                fatal: true,
            },
            ReportError::TemplateFailures(_) => ErrorClassification {
                error_type: "TemplateRenderError",
                fatal: true,
            },
            ReportError::EvidenceLocationMissing(_) => ErrorClassification {
                error_type: "EvidenceLocationMissing",
                fatal: true,
            },
            ReportError::Issue { .. } => ErrorClassification {
                error_type: "IssueError",
                fatal: true,
            },
            ReportError::NumberingInvariant { .. } => ErrorClassification {
                error_type: "NumberingInvariantViolation",
                fatal: true,
            },
            ReportError::Compile(_) => ErrorClassification {
                error_type: "CompileError",
                fatal: true,
            },
            ReportError::FileIo { .. } => ErrorClassification {
                error_type: "IoError",
                fatal: true,
            },
            ReportError::Io(_) => ErrorClassification {
                error_type: "IoError",
                fatal: true,
            },
            ReportError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                fatal: true,
            },
            ReportError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                fatal: true,
            },
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReportError::Config(_)
            | ReportError::ReportRootNotFound { .. }
            | ReportError::TemplateChain(_) => 2,
            ReportError::ContentMerge { .. }
            | ReportError::TemplateRender { .. }
            | ReportError::TemplateSyntax { .. }
            | ReportError::TemplateFailures(_) => 3,
            ReportError::EvidenceLocationMissing(_)
            | ReportError::Issue { .. }
            | ReportError::NumberingInvariant { .. } => 4,
            ReportError::Compile(_) => 5,
            _ => 1,
        }
    }
}
