use std::collections::{HashSet, VecDeque};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use crate::errors::ReportError;
use tracing::{debug, trace};

/// A file picked from the highest-priority layer that supplies its relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Position of the supplying layer in the resolution list (0 = highest priority).
    pub layer: usize,
    pub layer_root: PathBuf,
    /// Directory relative to the layer root; empty for top-level files.
    pub rel_dir: PathBuf,
    pub file_name: OsString,
}

impl ResolvedFile {
    pub fn rel_path(&self) -> PathBuf {
        self.rel_dir.join(&self.file_name)
    }

    pub fn source_path(&self) -> PathBuf {
        self.layer_root.join(self.rel_path())
    }
}

/// Start a fresh resolution over `layers` (highest priority first).
///
/// Paths whose relative form starts with one of `excluded` (compared per path
/// component) are never visited. Missing layers are treated as empty.
pub fn resolve<P: AsRef<Path>>(layers: &[P], excluded: &[String]) -> Cascade {
    Cascade {
        layers: layers.iter().map(|l| l.as_ref().to_path_buf()).collect(),
        excluded: excluded
            .iter()
            .map(|e| PathBuf::from(e.trim_start_matches("./")))
            .filter(|e| !e.as_os_str().is_empty())
            .collect(),
        next_layer: 0,
        current: None,
        pending_dirs: Vec::new(),
        pending_files: VecDeque::new(),
        seen: HashSet::new(),
    }
}

/// Lazy walk over the effective file set of an ordered list of layers.
pub struct Cascade {
    layers: Vec<PathBuf>,
    excluded: Vec<PathBuf>,
    next_layer: usize,
    current: Option<usize>,
    pending_dirs: Vec<PathBuf>,
    pending_files: VecDeque<(PathBuf, OsString)>,
    seen: HashSet<PathBuf>,
}

impl Cascade {
    fn is_excluded(&self, rel: &Path) -> bool {
        self.excluded.iter().any(|prefix| rel.starts_with(prefix))
    }

    /// Move to the next layer that exists. Returns false once all layers are done.
    fn advance_layer(&mut self) -> bool {
        while self.next_layer < self.layers.len() {
            let idx = self.next_layer;
            self.next_layer += 1;
            let root = &self.layers[idx];
            if root.is_dir() {
                trace!(layer = idx, root = %root.display(), "Walking layer");
                self.current = Some(idx);
                self.pending_dirs.push(PathBuf::new());
                return true;
            }
            let missing = ReportError::LayerMissing(root.clone());
            debug!(error = %missing, "Treating layer as empty");
        }
        self.current = None;
        false
    }

    /// Read one directory of the current layer, queueing its files and subdirectories.
    fn expand_dir(&mut self, layer: usize, rel_dir: PathBuf) -> Result<(), ReportError> {
        let abs = self.layers[layer].join(&rel_dir);
        let mut entries = std::fs::read_dir(&abs)?
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|e| e.file_name());

        let mut subdirs = Vec::new();
        for entry in entries {
            let name = entry.file_name();
            let rel = rel_dir.join(&name);
            if self.is_excluded(&rel) {
                trace!(path = %rel.display(), "Excluded from cascade");
                continue;
            }
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                subdirs.push(rel);
            } else if file_type.is_file() || entry.path().is_file() {
                self.pending_files.push_back((rel_dir.clone(), name));
            }
        }
        // Reverse so the lexically first subdirectory is popped first
        self.pending_dirs.extend(subdirs.into_iter().rev());
        Ok(())
    }
}

impl Iterator for Cascade {
    type Item = Result<ResolvedFile, ReportError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let layer = match self.current {
                Some(layer) => layer,
                None => {
                    if !self.advance_layer() {
                        return None;
                    }
                    continue;
                }
            };

            if let Some((rel_dir, file_name)) = self.pending_files.pop_front() {
                let rel_path = rel_dir.join(&file_name);
                if !self.seen.insert(rel_path) {
                    continue;
                }
                return Some(Ok(ResolvedFile {
                    layer,
                    layer_root: self.layers[layer].clone(),
                    rel_dir,
                    file_name,
                }));
            }

            match self.pending_dirs.pop() {
                Some(rel_dir) => {
                    if let Err(e) = self.expand_dir(layer, rel_dir) {
                        return Some(Err(e));
                    }
                }
                None => self.current = None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn rel_paths(cascade: Cascade) -> Vec<(String, usize)> {
        cascade
            .map(|r| r.unwrap())
            .map(|f| (f.rel_path().to_string_lossy().to_string(), f.layer))
            .collect()
    }

    #[test]
    fn test_earlier_layer_shadows_later() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        touch(a.path(), "f.tex", "from a");
        touch(b.path(), "f.tex", "from b");
        touch(b.path(), "g.tex", "only b");

        let entries: Vec<ResolvedFile> = resolve(&[a.path(), b.path()], &[])
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        let f = entries.iter().find(|e| e.file_name == "f.tex").unwrap();
        assert_eq!(f.layer, 0);
        assert_eq!(fs::read_to_string(f.source_path()).unwrap(), "from a");
        let g = entries.iter().find(|e| e.file_name == "g.tex").unwrap();
        assert_eq!(g.layer, 1);
    }

    #[test]
    fn test_shadowing_is_per_relative_path() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        touch(a.path(), "sub/f.tex", "");
        touch(b.path(), "f.tex", "");
        touch(b.path(), "sub/f.tex", "");

        let paths = rel_paths(resolve(&[a.path(), b.path()], &[]));
        assert_eq!(
            paths,
            vec![("sub/f.tex".to_string(), 0), ("f.tex".to_string(), 1)]
        );
    }

    #[test]
    fn test_excluded_prefix_never_emitted() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        for layer in [a.path(), b.path()] {
            touch(layer, "cache/out.tex", "");
            touch(layer, "cache/deep/x.tex", "");
        }
        touch(a.path(), "cachefile.tex", "");
        touch(a.path(), "main.tex", "");

        let paths = rel_paths(resolve(&[a.path(), b.path()], &["cache/".to_string()]));
        let names: Vec<&str> = paths.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(names, vec!["cachefile.tex", "main.tex"]);
    }

    #[test]
    fn test_missing_layer_is_empty() {
        let a = tempfile::tempdir().unwrap();
        touch(a.path(), "f.tex", "");
        let missing = a.path().join("does-not-exist");

        let paths = rel_paths(resolve(&[missing.as_path(), a.path()], &[]));
        assert_eq!(paths, vec![("f.tex".to_string(), 1)]);
    }

    #[test]
    fn test_lexical_order_files_before_subdirs() {
        let a = tempfile::tempdir().unwrap();
        touch(a.path(), "b.tex", "");
        touch(a.path(), "a.tex", "");
        touch(a.path(), "z/inner.tex", "");
        touch(a.path(), "m/inner.tex", "");

        let paths = rel_paths(resolve(&[a.path()], &[]));
        let names: Vec<&str> = paths.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(names, vec!["a.tex", "b.tex", "m/inner.tex", "z/inner.tex"]);
    }

    #[test]
    fn test_each_call_restarts() {
        let a = tempfile::tempdir().unwrap();
        touch(a.path(), "f.tex", "");
        let layers = [a.path()];
        assert_eq!(resolve(&layers, &[]).count(), 1);
        touch(a.path(), "g.tex", "");
        assert_eq!(resolve(&layers, &[]).count(), 2);
    }

    #[test]
    fn test_no_layers() {
        let layers: [&Path; 0] = [];
        assert_eq!(resolve(&layers, &[]).count(), 0);
    }
}
