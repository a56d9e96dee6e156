use chrono::Local;
use serde_yaml::{Mapping, Value};
use std::path::Path;
use crate::config::{ReporterConfig, CONFIG_FILE};
use crate::errors::ReportError;
use crate::templates::TemplateChain;
use tracing::warn;

/// Version string including the embedded git hash, e.g. `1.0.0 (a1b2c3d)`.
pub fn version_string() -> String {
    let git_hash = option_env!("GIT_HASH").unwrap_or("dev");
    format!("{} ({})", env!("CARGO_PKG_VERSION"), git_hash)
}

pub fn build_timestamp() -> &'static str {
    option_env!("BUILD_TIMESTAMP").unwrap_or("unknown")
}

/// Compare the version pinned in the report configuration with the running one.
///
/// A mismatch is a warning, or a configuration error when `enforce_version` is set.
pub fn check_reporter_version(config: &ReporterConfig, root: &Path) -> Result<(), ReportError> {
    check_version(config, root, env!("CARGO_PKG_VERSION"))
}

fn check_version(config: &ReporterConfig, root: &Path, running: &str) -> Result<(), ReportError> {
    let Some(wanted) = config.reporter_version.as_deref() else {
        return Ok(());
    };
    if wanted == running {
        return Ok(());
    }
    let message = format!(
        "This report should be compiled with reporter version {}, while you are using {}. \
         Please install the correct version or change the reporter_version in the configuration file ({})",
        wanted,
        running,
        root.join(CONFIG_FILE).display()
    );
    if config.enforce_version {
        return Err(ReportError::Config(message));
    }
    warn!(wanted, running, "{}", message);
    Ok(())
}

/// Context entries describing the run itself.
pub fn report_metadata(config: &ReporterConfig, chain: &TemplateChain) -> Result<Mapping, ReportError> {
    let mut meta = Mapping::new();
    meta.insert("config".into(), serde_yaml::to_value(config)?);
    meta.insert("template".into(), chain.name().into());
    meta.insert(
        "template_chain".into(),
        Value::Sequence(chain.names().iter().map(|n| Value::from(n.as_str())).collect()),
    );
    meta.insert("language".into(), config.language.as_str().into());
    meta.insert("reporter_version".into(), version_string().into());
    meta.insert("reporter_build".into(), build_timestamp().into());
    meta.insert("generated_at".into(), Local::now().format("%Y-%m-%d").to_string().into());
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_has_package_version() {
        assert!(version_string().starts_with(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_version_unpinned_or_matching() {
        let root = Path::new("/reports/acme");
        assert!(check_version(&ReporterConfig::default(), root, "1.0.0").is_ok());
        let config = ReporterConfig {
            reporter_version: Some("1.0.0".to_string()),
            enforce_version: true,
            ..Default::default()
        };
        assert!(check_version(&config, root, "1.0.0").is_ok());
    }

    #[test]
    fn test_version_mismatch_warns() {
        let config = ReporterConfig {
            reporter_version: Some("0.9.0".to_string()),
            ..Default::default()
        };
        assert!(check_version(&config, Path::new("/reports/acme"), "1.0.0").is_ok());
    }

    #[test]
    fn test_version_mismatch_enforced() {
        let config = ReporterConfig {
            reporter_version: Some("0.9.0".to_string()),
            enforce_version: true,
            ..Default::default()
        };
        let err = check_version(&config, Path::new("/reports/acme"), "1.0.0").unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
        let msg = err.to_string();
        assert!(msg.contains("reporter version 0.9.0, while you are using 1.0.0"));
        assert!(msg.contains("reporter.yaml"));
    }

    #[test]
    fn test_report_metadata() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("acme")).unwrap();
        let chain = TemplateChain::resolve(root.path(), "acme").unwrap();
        let config = ReporterConfig {
            template: "acme".to_string(),
            language: "nl".to_string(),
            ..Default::default()
        };

        let meta = report_metadata(&config, &chain).unwrap();
        assert_eq!(meta.get("template"), Some(&Value::from("acme")));
        assert_eq!(meta.get("language"), Some(&Value::from("nl")));
        assert_eq!(meta.get("template_chain").unwrap()[1], Value::from("default"));
        assert_eq!(meta.get("config").unwrap()["issue_dir"], Value::from("issues"));
        let date = meta.get("generated_at").and_then(Value::as_str).unwrap();
        assert_eq!(date.len(), 10);
    }
}
