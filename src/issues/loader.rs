use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use serde_yaml::Value;
use crate::errors::ReportError;
use super::model::{Evidence, Issue};
use tracing::{debug, info};

/// An issue directory: its issue file and the evidence files next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueFiles {
    pub issue: PathBuf,
    pub evidences: Vec<PathBuf>,
}

fn is_issue_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |name| name.starts_with("issue") || name.ends_with(".issue"))
}

/// Find every issue directory below `issue_dir`.
///
/// Files directly inside `issue_dir` are ignored, as are directories without
/// an issue file. Evidence paths are sorted.
pub fn find_issue_files(issue_dir: &Path) -> Result<Vec<IssueFiles>, ReportError> {
    if !issue_dir.is_dir() {
        debug!(path = %issue_dir.display(), "Issue directory missing, no issues");
        return Ok(Vec::new());
    }

    let pattern = format!("{}/**/*", glob::Pattern::escape(&issue_dir.to_string_lossy()));
    let mut per_dir: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    let options = glob::MatchOptions {
        require_literal_leading_dot: true,
        ..Default::default()
    };
    for entry in glob::glob_with(&pattern, options)
        .map_err(|e| ReportError::Config(format!("Invalid glob pattern: {}", e)))?
    {
        let path = entry.map_err(|e| ReportError::Io(e.into_error()))?;
        if !path.is_file() {
            continue;
        }
        let Some(parent) = path.parent() else { continue };
        if parent == issue_dir {
            continue;
        }
        per_dir.entry(parent.to_path_buf()).or_default().push(path);
    }

    let mut found = Vec::new();
    for (dir, mut files) in per_dir {
        files.sort();
        let Some(pos) = files.iter().rposition(|f| is_issue_file(f)) else {
            debug!(dir = %dir.display(), "No issue file, skipping directory");
            continue;
        };
        let issue = files.remove(pos);
        let evidences = files.into_iter().filter(|f| !is_issue_file(f)).collect();
        found.push(IssueFiles { issue, evidences });
    }
    Ok(found)
}

fn read_mapping(path: &Path) -> Result<Value, ReportError> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_yaml::from_str(&content).map_err(|e| ReportError::Issue {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if !value.is_mapping() {
        return Err(ReportError::Issue {
            path: path.to_path_buf(),
            message: "expected a mapping of fields".into(),
        });
    }
    Ok(value)
}

/// Load one evidence record, falling back to `default_location` when it names none.
pub fn load_evidence(path: &Path, default_location: Option<&str>) -> Result<Evidence, ReportError> {
    let value = read_mapping(path)?;
    let mut evidence: Evidence = serde_yaml::from_value(value).map_err(|e| ReportError::Issue {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if evidence.location.trim().is_empty() {
        match default_location {
            Some(location) if !location.trim().is_empty() => evidence.location = location.to_string(),
            _ => return Err(ReportError::EvidenceLocationMissing(path.to_path_buf())),
        }
    }
    Ok(evidence)
}

/// Load an issue record together with its evidence files.
pub fn load_issue(files: &IssueFiles, default_location: Option<&str>) -> Result<Issue, ReportError> {
    let value = read_mapping(&files.issue)?;
    let mut issue: Issue = serde_yaml::from_value(value).map_err(|e| ReportError::Issue {
        path: files.issue.clone(),
        message: e.to_string(),
    })?;

    if issue.title.trim().is_empty() {
        return Err(ReportError::Issue {
            path: files.issue.clone(),
            message: "title is empty".into(),
        });
    }
    if !(0.0..=10.0).contains(&issue.cvss_score) {
        return Err(ReportError::Issue {
            path: files.issue.clone(),
            message: format!("cvss_score {} is outside 0.0..=10.0", issue.cvss_score),
        });
    }

    issue.evidences = files
        .evidences
        .iter()
        .map(|p| load_evidence(p, default_location))
        .collect::<Result<Vec<_>, _>>()?;
    issue.source = Some(files.issue.clone());
    Ok(issue)
}

/// Load every issue below `issue_dir`, in directory order.
pub fn load_issues(issue_dir: &Path, default_location: Option<&str>) -> Result<Vec<Issue>, ReportError> {
    let issues = find_issue_files(issue_dir)?
        .iter()
        .map(|files| load_issue(files, default_location))
        .collect::<Result<Vec<_>, _>>()?;
    info!(count = issues.len(), dir = %issue_dir.display(), "Loaded issues");
    Ok(issues)
}

/// Write assigned numbers back into the issue files they came from.
///
/// Only files whose stored number differs are rewritten, so persisting an
/// unchanged set is a no-op. Returns the number of files written.
pub fn persist_numbers<'a, I>(issues: I) -> Result<usize, ReportError>
where
    I: IntoIterator<Item = &'a Issue>,
{
    let mut written = 0;
    for issue in issues {
        let (Some(path), Some(number)) = (&issue.source, issue.number) else {
            continue;
        };
        let mut value = read_mapping(path)?;
        let stored = value.get("number").and_then(|n| match n {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
        if stored == Some(u64::from(number)) {
            continue;
        }
        if let Value::Mapping(map) = &mut value {
            map.insert("number".into(), Value::from(number));
        }
        atomic_write(path, &serde_yaml::to_string(&value)?)?;
        info!(path = %path.display(), number, "Persisted issue number");
        written += 1;
    }
    Ok(written)
}

/// Atomic file write: write to temp, then rename
fn atomic_write(path: &Path, content: &str) -> Result<(), ReportError> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
