use std::path::{Path, PathBuf};
use crate::config::BASE_TEMPLATE;
use crate::errors::ReportError;
use tracing::{debug, warn};

/// File inside a template directory listing its parent templates, one per line.
pub const PARENTS_FILE: &str = "parents";

/// Directory inside a template with the files rendered into the output tree.
pub const REPORT_TEMPLATE_DIR: &str = "report";

/// Directory inside a template with images copied as-is.
pub const STATIC_IMAGES_DIR: &str = "static_images";

/// Linear precedence chain of templates, most specific first, ending in the base template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateChain {
    templates_root: PathBuf,
    names: Vec<String>,
}

impl TemplateChain {
    /// Build the chain for `name` from the templates under `templates_root`.
    pub fn resolve(templates_root: &Path, name: &str) -> Result<Self, ReportError> {
        if name != BASE_TEMPLATE && !templates_root.join(name).is_dir() {
            return Err(ReportError::Config(format!(
                "Unknown template '{}': {} does not exist",
                name,
                templates_root.join(name).display()
            )));
        }

        let mut names = Vec::new();
        let mut stack = Vec::new();
        visit(templates_root, name, &mut stack, &mut names)?;
        names.push(BASE_TEMPLATE.to_string());
        debug!(chain = %names.join(" -> "), "Resolved template chain");
        Ok(Self { templates_root: templates_root.to_path_buf(), names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The most specific template.
    pub fn name(&self) -> &str {
        &self.names[0]
    }

    pub fn dirs(&self) -> Vec<PathBuf> {
        self.names.iter().map(|n| self.templates_root.join(n)).collect()
    }

    pub fn report_dirs(&self) -> Vec<PathBuf> {
        self.dirs().into_iter().map(|d| d.join(REPORT_TEMPLATE_DIR)).collect()
    }

    pub fn image_dirs(&self) -> Vec<PathBuf> {
        self.dirs().into_iter().map(|d| d.join(STATIC_IMAGES_DIR)).collect()
    }
}

/// Parent names listed by a template. Blank lines and `#` comments are ignored.
pub fn read_parents(template_dir: &Path) -> Result<Vec<String>, ReportError> {
    let path = template_dir.join(PARENTS_FILE);
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(content
        .lines()
        .map(|l| l.split('#').next().unwrap_or("").trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn visit(
    templates_root: &Path,
    name: &str,
    stack: &mut Vec<String>,
    names: &mut Vec<String>,
) -> Result<(), ReportError> {
    if stack.iter().any(|n| n == name) {
        return Err(ReportError::TemplateChain(format!(
            "cycle in template parents: {} -> {}",
            stack.join(" -> "),
            name
        )));
    }

    let dir = templates_root.join(name);
    if !dir.is_dir() {
        if name == BASE_TEMPLATE {
            debug!(path = %dir.display(), "Base template has no directory");
            return Ok(());
        }
        let missing = ReportError::LayerMissing(dir);
        warn!(template = name, error = %missing, "Parent template missing, skipping");
        return Ok(());
    }

    // The base template is appended last by the caller
    if name != BASE_TEMPLATE && !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }

    stack.push(name.to_string());
    for parent in read_parents(&templates_root.join(name))? {
        if parent == name {
            return Err(ReportError::TemplateChain(format!(
                "template '{}' names itself as a parent",
                name
            )));
        }
        visit(templates_root, &parent, stack, names)?;
    }
    stack.pop();
    Ok(())
}
