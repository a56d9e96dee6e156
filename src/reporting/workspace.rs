use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use crate::errors::ReportError;
use tracing::{debug, info, warn};

/// Stem of finalized report copies: `final_report.pdf`, `final_report_v1.pdf`, ...
pub const FINAL_REPORT_STEM: &str = "final_report";

#[cfg(unix)]
fn symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    if src.is_dir() {
        std::os::windows::fs::symlink_dir(src, dst)
    } else {
        std::os::windows::fs::symlink_file(src, dst)
    }
}

/// Link every visible entry of the report root into the output directory.
///
/// Returns the created links; the renderer treats them as protected so
/// user-supplied files win over template output of the same name. Entries
/// that contain the output directory are skipped, as are the names in `skip`
/// (the compiled output file must not be written back through a link).
pub fn link_report_entries(
    root: &Path,
    output_dir: &Path,
    skip: &[&str],
) -> Result<HashSet<PathBuf>, ReportError> {
    std::fs::create_dir_all(output_dir)?;
    let output_canon = output_dir.canonicalize()?;

    let mut entries: Vec<_> = std::fs::read_dir(root)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    let mut links = HashSet::new();
    for entry in entries {
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if name_str.starts_with('.') || skip.contains(&name_str.as_ref()) {
            continue;
        }
        let path = entry.path();
        let target = match path.canonicalize() {
            Ok(target) => target,
            Err(e) if path.is_symlink() => {
                warn!(path = %path.display(), error = %e, "Dangling symlink in report root, not linking");
                continue;
            }
            Err(e) => return Err(ReportError::io_at(&path)(e)),
        };
        if output_canon.starts_with(&target) {
            continue;
        }

        let link = output_dir.join(&name);
        if link.is_symlink() {
            if std::fs::read_link(&link)? == target {
                links.insert(link);
                continue;
            }
            std::fs::remove_file(&link)?;
        } else if link.is_dir() {
            std::fs::remove_dir_all(&link)?;
        } else if link.exists() {
            std::fs::remove_file(&link)?;
        }

        symlink(&target, &link).map_err(ReportError::io_at(&link))?;
        debug!(link = %link.display(), target = %target.display(), "Linked report entry");
        links.insert(link);
    }
    info!(count = links.len(), "Linked report root into output directory");
    Ok(links)
}

/// Remove the output directory. Returns whether there was anything to remove.
pub fn clean(output_dir: &Path) -> Result<bool, ReportError> {
    if !output_dir.exists() {
        return Ok(false);
    }
    std::fs::remove_dir_all(output_dir)?;
    info!(path = %output_dir.display(), "Removed output directory");
    Ok(true)
}

/// Build the rendered tree with `make -C <output_dir>`.
pub fn compile(output_dir: &Path) -> Result<(), ReportError> {
    info!(dir = %output_dir.display(), "Compiling report");
    let status = Command::new("make")
        .arg("-C")
        .arg(output_dir)
        .status()
        .map_err(|e| ReportError::Compile(format!("failed to run make: {}", e)))?;
    if !status.success() {
        return Err(ReportError::Compile(format!("make exited with {}", status)));
    }
    Ok(())
}

/// Copy the compiled output file from the output directory into the report root.
pub fn copy_output(output_dir: &Path, root: &Path, file_name: &str) -> Result<PathBuf, ReportError> {
    let produced = output_dir.join(file_name);
    if !produced.is_file() {
        return Err(ReportError::Compile(format!(
            "expected output {} was not produced",
            produced.display()
        )));
    }
    let dest = root.join(file_name);
    if dest.exists() && dest.canonicalize()? == produced.canonicalize()? {
        return Ok(dest);
    }
    std::fs::copy(&produced, &dest)?;
    info!(path = %dest.display(), "Report written");
    Ok(dest)
}

/// Copy the compiled report in the root to the first free `final_report` name.
pub fn finalize(root: &Path, file_name: &str) -> Result<PathBuf, ReportError> {
    let source = root.join(file_name);
    if !source.is_file() {
        return Err(ReportError::Config(format!(
            "{} does not exist, generate the report first",
            source.display()
        )));
    }
    let extension = Path::new(file_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut dest = root.join(format!("{}{}", FINAL_REPORT_STEM, extension));
    let mut version = 1;
    while dest.exists() {
        dest = root.join(format!("{}_v{}{}", FINAL_REPORT_STEM, version, extension));
        version += 1;
    }
    std::fs::copy(&source, &dest)?;
    info!(path = %dest.display(), "Finalized report");
    Ok(dest)
}
