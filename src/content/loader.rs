use std::collections::HashSet;
use std::path::{Path, PathBuf};
use serde_yaml::{Mapping, Value};
use crate::errors::ReportError;
use super::merge::{kind, merge, merge_all};
use tracing::{debug, info};

/// Directory inside a template holding its YAML content.
pub const STATIC_CONTENT_DIR: &str = "static_content";

/// Read one YAML fragment. An empty file is an empty mapping; any other
/// non-mapping root is a content error naming the file.
pub fn load_fragment(path: &Path) -> Result<Value, ReportError> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_yaml::from_str(&content).map_err(|e| {
        ReportError::content("<root>", format!("invalid YAML: {}", e), Some(path.to_path_buf()))
    })?;
    match value {
        Value::Null => Ok(Value::Mapping(Mapping::new())),
        Value::Mapping(_) => Ok(value),
        other => Err(ReportError::content(
            "<root>",
            format!("expected a mapping, found {}", kind(&other)),
            Some(path.to_path_buf()),
        )),
    }
}

fn load_optional(path: &Path) -> Result<Option<Value>, ReportError> {
    if path.is_file() {
        load_fragment(path).map(Some)
    } else {
        Ok(None)
    }
}

/// Static content of a single template: `general.yaml` over `<language>.yaml`.
pub fn load_template_content(template_dir: &Path, language: &str) -> Result<Value, ReportError> {
    let dir = template_dir.join(STATIC_CONTENT_DIR);
    let language_content = load_optional(&dir.join(format!("{}.yaml", language)))?;
    let general = load_optional(&dir.join("general.yaml"))?;
    Ok(merge_all(general.into_iter().chain(language_content)))
}

/// Static content across a template chain (most specific template first).
pub fn load_static_content(template_dirs: &[PathBuf], language: &str) -> Result<Value, ReportError> {
    let mut contexts = Vec::with_capacity(template_dirs.len());
    for dir in template_dirs {
        contexts.push(load_template_content(dir, language)?);
    }
    debug!(templates = template_dirs.len(), language, "Loaded static content");
    Ok(merge_all(contexts))
}

fn is_yaml(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| ext == "yaml" || ext == "yml")
}

fn is_excluded(file_name: &str, excluded: &[String]) -> bool {
    excluded
        .iter()
        .map(|e| e.trim_start_matches("./"))
        .filter(|e| !e.is_empty())
        .any(|e| Path::new(file_name).starts_with(e))
}

/// Top-level YAML file names of one content layer, unsorted.
fn layer_fragments(root: &Path, excluded: &[String], skip: &[&str]) -> Result<Vec<String>, ReportError> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(root).map_err(ReportError::io_at(root))? {
        let entry = entry.map_err(ReportError::io_at(root))?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !is_yaml(&name) || skip.contains(&name.as_str()) || is_excluded(&name, excluded) {
            continue;
        }
        if entry.path().is_file() {
            names.push(name);
        }
    }
    Ok(names)
}

/// Merge the top-level YAML fragments of the local content layers.
///
/// Only the top level of each layer is read. Layers are highest priority
/// first; a fragment shadows the same-named fragment in later layers. Within
/// one layer, later file names win. `skip` names files (such as the config
/// file) that are never content.
pub fn load_local_fragments(
    layers: &[PathBuf],
    excluded: &[String],
    skip: &[&str],
) -> Result<Value, ReportError> {
    let mut seen = HashSet::new();
    let mut fragments = Vec::new();
    for (layer, root) in layers.iter().enumerate() {
        if !root.is_dir() {
            let missing = ReportError::LayerMissing(root.clone());
            debug!(error = %missing, "Treating content layer as empty");
            continue;
        }
        for name in layer_fragments(root, excluded, skip)? {
            if seen.insert(name.clone()) {
                fragments.push((layer, name));
            }
        }
    }
    fragments.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));

    let mut contexts = Vec::with_capacity(fragments.len());
    for (layer, name) in &fragments {
        let path = layers[*layer].join(name);
        info!(path = %path.display(), "Loading local content");
        contexts.push(load_fragment(&path)?);
    }
    Ok(merge_all(contexts))
}

/// Local fragments layered over template static content.
pub fn compose(local: Value, static_content: Value) -> Value {
    merge(local, static_content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_fragment_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "empty.yaml", "");
        assert_eq!(load_fragment(&dir.path().join("empty.yaml")).unwrap(), yaml("{}"));
    }

    #[test]
    fn test_load_fragment_rejects_sequence_root() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "list.yaml", "- a\n- b\n");
        let err = load_fragment(&dir.path().join("list.yaml")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("list.yaml"));
        assert!(msg.contains("a sequence"));
    }

    #[test]
    fn test_template_content_general_over_language() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "static_content/en.yaml", "greeting: Hello\nsign: Regards\n");
        write(dir.path(), "static_content/general.yaml", "sign: Cheers\ncompany: Acme\n");
        let content = load_template_content(dir.path(), "en").unwrap();
        assert_eq!(content, yaml("{greeting: Hello, sign: Cheers, company: Acme}"));
    }

    #[test]
    fn test_static_content_chain_precedence() {
        let child = tempfile::tempdir().unwrap();
        let base = tempfile::tempdir().unwrap();
        write(child.path(), "static_content/general.yaml", "colors: {primary: red}\n");
        write(base.path(), "static_content/general.yaml", "colors: {primary: blue, accent: grey}\nlogo: base.png\n");
        let content = load_static_content(
            &[child.path().to_path_buf(), base.path().to_path_buf()],
            "en",
        )
        .unwrap();
        assert_eq!(content, yaml("{colors: {primary: red, accent: grey}, logo: base.png}"));
    }

    #[test]
    fn test_static_content_missing_template_dir() {
        let dir = tempfile::tempdir().unwrap();
        let content = load_static_content(&[dir.path().join("nope")], "en").unwrap();
        assert_eq!(content, yaml("{}"));
    }

    #[test]
    fn test_local_fragments_top_level_only_and_skip() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "client.yaml", "client: Acme\n");
        write(dir.path(), "reporter.yaml", "template: acme\n");
        write(dir.path(), "issues/xss/issue.yaml", "title: XSS\n");
        let content = load_local_fragments(&[dir.path().to_path_buf()], &[], &["reporter.yaml"]).unwrap();
        assert_eq!(content, yaml("{client: Acme}"));
    }

    #[test]
    fn test_local_fragments_layer_and_name_priority() {
        let work = tempfile::tempdir().unwrap();
        let shared = tempfile::tempdir().unwrap();
        write(work.path(), "a.yaml", "who: work-a\n");
        write(work.path(), "b.yml", "who: work-b\nonly_b: true\n");
        write(shared.path(), "a.yaml", "shadowed: true\n");
        write(shared.path(), "c.yaml", "who: shared-c\nfrom_shared: yes\n");
        let content = load_local_fragments(
            &[work.path().to_path_buf(), shared.path().to_path_buf()],
            &[],
            &[],
        )
        .unwrap();
        assert_eq!(
            content,
            yaml("{who: work-b, only_b: true, from_shared: yes}")
        );
    }

    #[test]
    fn test_local_fragments_excluded_and_missing_layer() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "client.yaml", "client: Acme\n");
        write(dir.path(), "draft.yaml", "client: Draft\n");
        let content = load_local_fragments(
            &[dir.path().join("absent"), dir.path().to_path_buf()],
            &["./draft.yaml".to_string()],
            &[],
        )
        .unwrap();
        assert_eq!(content, yaml("{client: Acme}"));
    }

    #[cfg(unix)]
    #[test]
    fn test_local_fragments_ignore_unreadable_subdir() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "client.yaml", "client: Acme\n");
        write(dir.path(), "private/notes.yaml", "secret: true\n");
        let private = dir.path().join("private");
        fs::set_permissions(&private, fs::Permissions::from_mode(0o000)).unwrap();

        let result = load_local_fragments(&[dir.path().to_path_buf()], &[], &[]);
        fs::set_permissions(&private, fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(result.unwrap(), yaml("{client: Acme}"));
    }

    #[test]
    fn test_compose_local_wins() {
        let composed = compose(yaml("{title: Mine}"), yaml("{title: Template, footer: x}"));
        assert_eq!(composed, yaml("{title: Mine, footer: x}"));
    }
}
