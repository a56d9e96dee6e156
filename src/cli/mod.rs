pub mod commands;
pub mod generate;
pub mod issues;
pub mod maintenance;

pub use commands::{Cli, Commands, GlobalArgs};

use std::path::PathBuf;
use crate::config::{self, ReporterConfig};
use crate::errors::ReportError;
use crate::reporting::Reporter;
use crate::templates::VariantRegistry;

/// The report root: `--root` when given, otherwise searched upwards from the current directory.
pub fn resolve_root(global: &GlobalArgs) -> Result<PathBuf, ReportError> {
    match &global.root {
        Some(root) => {
            let path = PathBuf::from(root);
            if !path.is_dir() {
                return Err(ReportError::Config(format!("Report root {} is not a directory", root)));
            }
            Ok(path.canonicalize()?)
        }
        None => {
            let cwd = std::env::current_dir()?;
            config::find_report_root(&cwd, &ReporterConfig::default().issue_dir)
        }
    }
}

/// Open the report the global arguments point at, applying command-line overrides.
pub fn open_reporter(global: &GlobalArgs) -> Result<Reporter, ReportError> {
    let root = resolve_root(global)?;
    let mut config = config::parse_config(&root)?;
    if let Some(language) = &global.language {
        config.language = language.clone();
    }
    Reporter::with_config(&root, config, &VariantRegistry::builtin())
}
