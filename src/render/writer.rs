use std::collections::HashSet;
use std::path::{Path, PathBuf};
use serde_yaml::Value;
use crate::cascade::{self, ResolvedFile};
use crate::errors::ReportError;
use super::engine::Template;
use tracing::{debug, info, warn};

/// Knobs for a render pass beyond the core inputs.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Relative path prefixes never resolved from the template layers.
    pub excluded: Vec<String>,
    /// When set, every rendered source is also copied here unrendered.
    pub sources_dir: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct RenderSummary {
    /// Output paths written, in resolution order.
    pub rendered: Vec<PathBuf>,
    /// Output paths left alone because they are protected.
    pub protected: Vec<PathBuf>,
}

/// True when `path` carries one of `extensions` (given with or without a leading dot).
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| extensions.iter().any(|x| x.trim_start_matches('.') == ext))
}

fn is_protected(dest: &Path, protected: &HashSet<PathBuf>) -> bool {
    protected.iter().any(|p| dest.starts_with(p))
}

/// Drop whatever symlink sits at `dest` so a regular file can take its place.
fn clear_symlink(dest: &Path) -> Result<(), ReportError> {
    if dest.is_symlink() {
        if dest.exists() {
            debug!(path = %dest.display(), "Replacing symlink with rendered file");
        } else {
            info!(path = %dest.display(), "Removing broken symlink");
        }
        std::fs::remove_file(dest)?;
    }
    Ok(())
}

/// Render every template file resolved from `template_dirs` into `output_root`.
///
/// Each output path is rendered whole from the highest-priority layer that
/// has it. Files outside `extensions` are left for [`copy_verbatim`].
/// Destinations inside `protected` are never written. Render failures do not
/// stop the pass; all of them are returned together once it completes.
pub fn render(
    context: &Value,
    template_dirs: &[PathBuf],
    output_root: &Path,
    protected: &HashSet<PathBuf>,
    extensions: &[String],
    options: &RenderOptions,
) -> Result<RenderSummary, ReportError> {
    let mut summary = RenderSummary::default();
    let mut failures = Vec::new();

    for entry in cascade::resolve(template_dirs, &options.excluded) {
        let entry = entry?;
        let rel = entry.rel_path();
        if !has_extension(&rel, extensions) {
            continue;
        }
        let dest = output_root.join(&rel);
        if is_protected(&dest, protected) {
            debug!(path = %dest.display(), "Protected path, not rendering");
            summary.protected.push(dest);
            continue;
        }

        let source = std::fs::read_to_string(entry.source_path())
            .map_err(ReportError::io_at(entry.source_path()))?;
        let logical = rel.to_string_lossy().to_string();
        let rendered = match Template::parse(&logical, &source).and_then(|t| t.render(context)) {
            Ok(text) => text,
            Err(e) => {
                warn!(template = %logical, layer = entry.layer, error = %e, "Template failed to render");
                failures.push(e);
                continue;
            }
        };

        write_output(&dest, &rendered)?;
        if let Some(sources_dir) = &options.sources_dir {
            copy_source(&entry, sources_dir)?;
        }
        debug!(template = %logical, layer = entry.layer, "Rendered template");
        summary.rendered.push(dest);
    }

    if !failures.is_empty() {
        return Err(ReportError::TemplateFailures(failures));
    }
    info!(rendered = summary.rendered.len(), protected = summary.protected.len(), "Rendering complete");
    Ok(summary)
}

fn write_output(dest: &Path, text: &str) -> Result<(), ReportError> {
    clear_symlink(dest)?;
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(dest, text).map_err(ReportError::io_at(dest))?;
    Ok(())
}

fn copy_source(entry: &ResolvedFile, sources_dir: &Path) -> Result<(), ReportError> {
    let dest = sources_dir.join(entry.rel_path());
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let source = entry.source_path();
    std::fs::copy(&source, &dest).map_err(ReportError::io_at(&source))?;
    Ok(())
}

/// Copy the non-template files of the cascade into `output_root` unchanged.
pub fn copy_verbatim(
    template_dirs: &[PathBuf],
    output_root: &Path,
    protected: &HashSet<PathBuf>,
    extensions: &[String],
    excluded: &[String],
) -> Result<Vec<PathBuf>, ReportError> {
    let mut copied = Vec::new();
    for entry in cascade::resolve(template_dirs, excluded) {
        let entry = entry?;
        let rel = entry.rel_path();
        if has_extension(&rel, extensions) {
            continue;
        }
        let dest = output_root.join(&rel);
        if is_protected(&dest, protected) {
            continue;
        }
        clear_symlink(&dest)?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let source = entry.source_path();
        std::fs::copy(&source, &dest).map_err(ReportError::io_at(&source))?;
        copied.push(dest);
    }
    debug!(count = copied.len(), "Copied verbatim files");
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn exts() -> Vec<String> {
        vec!["tex".to_string()]
    }

    fn ctx() -> Value {
        serde_yaml::from_str("{title: Acme, client: {name: Acme B.V.}}").unwrap()
    }

    #[test]
    fn test_render_with_fallback() {
        let child = tempfile::tempdir().unwrap();
        let base = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(child.path(), "report.tex", "child \\VAR{title}");
        write(base.path(), "report.tex", "base \\VAR{title}");
        write(base.path(), "parts/intro.tex", "intro for \\VAR{client.name}");
        write(base.path(), "logo.png", "binary");

        let summary = render(
            &ctx(),
            &[child.path().to_path_buf(), base.path().to_path_buf()],
            out.path(),
            &HashSet::new(),
            &exts(),
            &RenderOptions::default(),
        )
        .unwrap();

        assert_eq!(summary.rendered.len(), 2);
        assert_eq!(fs::read_to_string(out.path().join("report.tex")).unwrap(), "child Acme");
        assert_eq!(
            fs::read_to_string(out.path().join("parts/intro.tex")).unwrap(),
            "intro for Acme B.V."
        );
        assert!(!out.path().join("logo.png").exists());
    }

    #[test]
    fn test_protected_path_untouched() {
        let tpl = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(tpl.path(), "report.tex", "rendered");
        write(tpl.path(), "other.tex", "rendered");
        write(out.path(), "report.tex", "user copy");

        let protected: HashSet<PathBuf> = [out.path().join("report.tex")].into_iter().collect();
        let summary = render(
            &ctx(),
            &[tpl.path().to_path_buf()],
            out.path(),
            &protected,
            &exts(),
            &RenderOptions::default(),
        )
        .unwrap();

        assert_eq!(fs::read_to_string(out.path().join("report.tex")).unwrap(), "user copy");
        assert_eq!(fs::read_to_string(out.path().join("other.tex")).unwrap(), "rendered");
        assert_eq!(summary.protected, vec![out.path().join("report.tex")]);
    }

    #[test]
    fn test_collects_all_failures() {
        let tpl = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(tpl.path(), "a.tex", "\\VAR{missing_one}");
        write(tpl.path(), "b.tex", "fine \\VAR{title}");
        write(tpl.path(), "c/d.tex", "\\VAR{client.missing_two}");

        let err = render(
            &ctx(),
            &[tpl.path().to_path_buf()],
            out.path(),
            &HashSet::new(),
            &exts(),
            &RenderOptions::default(),
        )
        .unwrap_err();

        match err {
            ReportError::TemplateFailures(failures) => {
                assert_eq!(failures.len(), 2);
                let text = failures.iter().map(|f| f.to_string()).collect::<Vec<_>>().join("\n");
                assert!(text.contains("a.tex: undefined field 'missing_one'"));
                assert!(text.contains("c/d.tex: undefined field 'client.missing_two'"));
            }
            other => panic!("unexpected error: {}", other),
        }
        // Independent files still render
        assert_eq!(fs::read_to_string(out.path().join("b.tex")).unwrap(), "fine Acme");
        assert!(!out.path().join("a.tex").exists());
    }

    #[test]
    fn test_sources_dir_copy() {
        let tpl = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let sources = tempfile::tempdir().unwrap();
        write(tpl.path(), "sub/x.tex", "\\VAR{title}");

        let options = RenderOptions {
            sources_dir: Some(sources.path().to_path_buf()),
            ..Default::default()
        };
        render(&ctx(), &[tpl.path().to_path_buf()], out.path(), &HashSet::new(), &exts(), &options).unwrap();

        assert_eq!(fs::read_to_string(out.path().join("sub/x.tex")).unwrap(), "Acme");
        assert_eq!(fs::read_to_string(sources.path().join("sub/x.tex")).unwrap(), "\\VAR{title}");
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_replaced() {
        let tpl = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(tpl.path(), "report.tex", "\\VAR{title}");
        let dest = out.path().join("report.tex");
        std::os::unix::fs::symlink(out.path().join("gone.tex"), &dest).unwrap();
        assert!(dest.is_symlink() && !dest.exists());

        render(&ctx(), &[tpl.path().to_path_buf()], out.path(), &HashSet::new(), &exts(), &RenderOptions::default())
            .unwrap();

        assert!(!dest.is_symlink());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "Acme");
    }

    #[cfg(unix)]
    #[test]
    fn test_live_symlink_replaced_not_followed() {
        let tpl = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        write(tpl.path(), "report.tex", "\\VAR{title}");
        write(elsewhere.path(), "target.tex", "keep me");
        let dest = out.path().join("report.tex");
        std::os::unix::fs::symlink(elsewhere.path().join("target.tex"), &dest).unwrap();

        render(&ctx(), &[tpl.path().to_path_buf()], out.path(), &HashSet::new(), &exts(), &RenderOptions::default())
            .unwrap();

        assert!(!dest.is_symlink());
        assert_eq!(fs::read_to_string(elsewhere.path().join("target.tex")).unwrap(), "keep me");
    }

    #[test]
    fn test_copy_verbatim_complements_render() {
        let child = tempfile::tempdir().unwrap();
        let base = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(child.path(), "Makefile", "child make");
        write(base.path(), "Makefile", "base make");
        write(base.path(), "img/logo.png", "png");
        write(base.path(), "report.tex", "\\VAR{title}");

        let copied = copy_verbatim(
            &[child.path().to_path_buf(), base.path().to_path_buf()],
            out.path(),
            &HashSet::new(),
            &exts(),
            &[],
        )
        .unwrap();

        assert_eq!(copied.len(), 2);
        assert_eq!(fs::read_to_string(out.path().join("Makefile")).unwrap(), "child make");
        assert!(out.path().join("img/logo.png").exists());
        assert!(!out.path().join("report.tex").exists());
    }

    #[test]
    fn test_write_error_names_destination() {
        let layer = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(layer.path(), "report.tex", "\\VAR{title}");
        fs::create_dir_all(out.path().join("report.tex")).unwrap();

        let err = render(
            &ctx(),
            &[layer.path().to_path_buf()],
            out.path(),
            &HashSet::new(),
            &exts(),
            &RenderOptions::default(),
        )
        .unwrap_err();

        match err {
            ReportError::FileIo { path, .. } => assert_eq!(path, out.path().join("report.tex")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_has_extension() {
        let exts = vec![".tex".to_string(), "cls".to_string()];
        assert!(has_extension(Path::new("a/b.tex"), &exts));
        assert!(has_extension(Path::new("style.cls"), &exts));
        assert!(!has_extension(Path::new("notes.txt"), &exts));
    }
}
