use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-report configuration file, looked up in the report root.
pub const CONFIG_FILE: &str = "reporter.yaml";

/// Template every chain falls back to.
pub const BASE_TEMPLATE: &str = "default";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReporterConfig {
    pub template: String,
    pub language: String,
    /// Directory holding one subdirectory per template, relative to the report root.
    pub templates_dir: String,
    pub output_dir: String,
    pub issue_dir: String,
    pub report_file: String,
    pub report_output_file: String,
    pub default_location: Option<String>,
    /// Extensions (without the dot) that are rendered as templates.
    pub extensions: Vec<String>,
    /// Relative path prefixes the resolver never walks into.
    pub excluded: Vec<String>,
    /// Directories holding local YAML fragments, highest priority first.
    pub content_dirs: Vec<String>,
    pub persist_numbers: bool,
    pub template_sources: bool,
    /// Reporter version the report was written for.
    pub reporter_version: Option<String>,
    /// Refuse to generate when `reporter_version` differs from the running version.
    pub enforce_version: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            template: BASE_TEMPLATE.to_string(),
            language: "en".to_string(),
            templates_dir: "templates".to_string(),
            output_dir: ".cache".to_string(),
            issue_dir: "issues".to_string(),
            report_file: "report.tex".to_string(),
            report_output_file: "report.pdf".to_string(),
            default_location: None,
            extensions: ["tex", "cls", "issue", "ini"].iter().map(|s| s.to_string()).collect(),
            excluded: vec![".git".to_string()],
            content_dirs: vec![".".to_string()],
            persist_numbers: true,
            template_sources: false,
            reporter_version: None,
            enforce_version: false,
        }
    }
}

impl ReporterConfig {
    /// Prefixes excluded from every cascade walk: the configured list plus the output directory.
    pub fn excluded_prefixes(&self) -> Vec<String> {
        let mut prefixes = self.excluded.clone();
        if !prefixes.iter().any(|p| p == &self.output_dir) {
            prefixes.push(self.output_dir.clone());
        }
        prefixes
    }

    pub fn output_path(&self, root: &Path) -> PathBuf {
        root.join(&self.output_dir)
    }

    pub fn issue_path(&self, root: &Path) -> PathBuf {
        root.join(&self.issue_dir)
    }

    pub fn templates_path(&self, root: &Path) -> PathBuf {
        root.join(&self.templates_dir)
    }

    pub fn content_layers(&self, root: &Path) -> Vec<PathBuf> {
        self.content_dirs.iter().map(|d| root.join(d)).collect()
    }
}
