use std::path::{Path, PathBuf};
use crate::errors::ReportError;
use super::types::{ReporterConfig, CONFIG_FILE};
use tracing::{debug, warn};

const MAX_CONFIG_BYTES: u64 = 1_048_576;

/// Load `reporter.yaml` from the report root. A missing file yields the defaults.
pub fn parse_config(root: &Path) -> Result<ReporterConfig, ReportError> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        debug!(path = %path.display(), "No config file, using defaults");
        return Ok(ReporterConfig::default());
    }

    let metadata = std::fs::metadata(&path)?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(ReportError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = std::fs::read_to_string(&path)?;
    let config = parse_config_str(&content)
        .map_err(|e| ReportError::Config(format!("{}: {}", path.display(), e)))?;
    debug!(path = %path.display(), template = %config.template, "Loaded config");
    Ok(config)
}

/// Parse and validate config text. An empty document is the default config.
pub fn parse_config_str(content: &str) -> Result<ReporterConfig, ReportError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    let config: ReporterConfig = if yaml.is_null() {
        ReporterConfig::default()
    } else {
        serde_yaml::from_value(yaml)?
    };
    validate_conflicts(&config)?;
    Ok(config)
}

/// Detect semantic conflicts in the parsed configuration.
fn validate_conflicts(config: &ReporterConfig) -> Result<(), ReportError> {
    if normalize(&config.output_dir) == normalize(&config.issue_dir) {
        return Err(ReportError::Config(format!(
            "output_dir and issue_dir both point at '{}'",
            config.output_dir
        )));
    }

    if config.extensions.is_empty() {
        return Err(ReportError::Config("extensions must name at least one template extension".into()));
    }

    if Path::new(&config.report_output_file).components().count() != 1 {
        return Err(ReportError::Config(format!(
            "report_output_file must be a bare file name, got '{}'",
            config.report_output_file
        )));
    }

    if config.content_dirs.is_empty() {
        warn!("No content_dirs configured, local YAML fragments will be ignored");
    }

    Ok(())
}

fn normalize(dir: &str) -> &str {
    dir.trim_start_matches("./").trim_end_matches('/')
}

/// Walk up from `start` (at most three levels) looking for the report root:
/// the directory holding the issue dir or a `reporter.yaml`.
pub fn find_report_root(start: &Path, issue_dir: &str) -> Result<PathBuf, ReportError> {
    let mut current = start.canonicalize()?;
    for _ in 0..3 {
        if current.join(issue_dir).is_dir() || current.join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }
    Err(ReportError::ReportRootNotFound {
        start: start.to_path_buf(),
        issue_dir: issue_dir.to_string(),
    })
}
