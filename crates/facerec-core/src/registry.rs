//! In-memory enrollment registry and face detection over it.
//!
//! The registry is an ordered list of `(embedding, label)` entries. It is
//! seeded from a directory of reference pictures at startup and afterwards
//! only changes through [`Registry::add`] and [`Registry::remove_all`].
//! Nothing is persisted.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::extractor::{embed_single, is_picture, label_for, ExtractError, Extractor};
use crate::types::{Detection, Embedding, Enrollment, Matcher};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("enrollment label must not be empty")]
    EmptyLabel,
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read reference directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("reference image {path}: {source}")]
    Reference {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },
}

/// What to do with a reference picture that does not yield exactly one face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Stop at the first bad picture.
    #[default]
    Abort,
    /// Log a warning and continue with the remaining pictures.
    Skip,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<Enrollment>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from every picture in `dir`, labelled by file stem.
    ///
    /// Pictures are visited in path order. Each must contain exactly one face.
    pub fn load<E: Extractor + ?Sized>(
        dir: &Path,
        extractor: &mut E,
        policy: LoadPolicy,
    ) -> Result<Self, LoadError> {
        let io_err = |source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut pictures = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let is_file = path.is_file();
            let name_ok = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_picture);
            if is_file && name_ok {
                pictures.push(path);
            }
        }
        pictures.sort();

        let mut registry = Self::new();
        let mut skipped = 0usize;

        for path in pictures {
            match load_reference(&path, extractor) {
                Ok((embedding, label)) => {
                    tracing::debug!(path = %path.display(), label, "reference face loaded");
                    registry.entries.push(Enrollment { embedding, label });
                }
                Err(err) if policy == LoadPolicy::Skip => {
                    tracing::warn!(error = %err, "skipping reference image");
                    skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            dir = %dir.display(),
            entries = registry.len(),
            skipped,
            "registry loaded"
        );

        Ok(registry)
    }

    /// Append an entry. Existing entries with the same label are kept.
    pub fn add(&mut self, embedding: Embedding, label: impl Into<String>) -> Result<(), RegistryError> {
        let label = label.into();
        if label.is_empty() {
            return Err(RegistryError::EmptyLabel);
        }
        self.entries.push(Enrollment { embedding, label });
        Ok(())
    }

    /// Remove every entry carrying `label`. Returns how many were removed.
    pub fn remove_all(&mut self, label: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.label != label);
        before - self.entries.len()
    }

    /// Distinct labels currently enrolled.
    pub fn labels(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.label.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn entries(&self) -> &[Enrollment] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn load_reference<E: Extractor + ?Sized>(
    path: &Path,
    extractor: &mut E,
) -> Result<(Embedding, String), LoadError> {
    let reference_err = |source| LoadError::Reference {
        path: path.to_path_buf(),
        source,
    };

    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let label = label_for(path)
        .ok_or_else(|| reference_err(ExtractError::Decode("file name is not valid UTF-8".into())))?;
    let embedding = embed_single(extractor, &bytes).map_err(reference_err)?;
    Ok((embedding, label))
}

/// Match every probe embedding against the registry.
///
/// `count` is the number of probes; `faces` holds one result per probe in
/// probe order, and is empty when the registry is.
pub fn detect_faces<M: Matcher + ?Sized>(
    probes: &[Embedding],
    registry: &Registry,
    matcher: &M,
) -> Detection {
    let faces = probes
        .iter()
        .filter_map(|probe| matcher.best_match(probe, registry.entries()))
        .collect();

    Detection {
        count: probes.len(),
        faces,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::FakeExtractor;
    use crate::types::{EuclideanMatcher, MatchResult};
    use tempfile::TempDir;

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec())
    }

    fn write(dir: &TempDir, name: &str, contents: &str) {
        std::fs::write(dir.path().join(name), contents).unwrap();
    }

    #[test]
    fn test_add_never_deduplicates() {
        let mut registry = Registry::new();
        registry.add(emb(&[1.0]), "alice").unwrap();
        registry.add(emb(&[1.0]), "alice").unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_add_rejects_empty_label() {
        let mut registry = Registry::new();
        assert!(matches!(registry.add(emb(&[1.0]), ""), Err(RegistryError::EmptyLabel)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_labels_are_distinct() {
        let mut registry = Registry::new();
        registry.add(emb(&[1.0]), "alice").unwrap();
        registry.add(emb(&[2.0]), "bob").unwrap();
        registry.add(emb(&[3.0]), "alice").unwrap();

        let labels = registry.labels();
        assert_eq!(labels, vec!["alice".to_string(), "bob".to_string()]);
        assert_eq!(labels.iter().filter(|l| *l == "alice").count(), 1);
    }

    #[test]
    fn test_remove_all_removes_every_entry_with_label() {
        let mut registry = Registry::new();
        registry.add(emb(&[1.0]), "alice").unwrap();
        registry.add(emb(&[2.0]), "bob").unwrap();
        registry.add(emb(&[3.0]), "alice").unwrap();
        registry.add(emb(&[4.0]), "alice").unwrap();

        assert_eq!(registry.remove_all("alice"), 3);
        assert_eq!(registry.labels(), vec!["bob".to_string()]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_all_missing_label_is_noop() {
        let mut registry = Registry::new();
        registry.add(emb(&[1.0]), "alice").unwrap();

        assert_eq!(registry.remove_all("carol"), 0);
        assert_eq!(registry.labels(), vec!["alice".to_string()]);
    }

    #[test]
    fn test_remove_then_readd() {
        let mut registry = Registry::new();
        registry.add(emb(&[1.0]), "alice").unwrap();
        registry.remove_all("alice");
        assert!(!registry.labels().contains(&"alice".to_string()));

        registry.add(emb(&[2.0]), "alice").unwrap();
        assert_eq!(registry.labels(), vec!["alice".to_string()]);
    }

    #[test]
    fn test_detect_faces_empty_registry() {
        let registry = Registry::new();
        let probes = [emb(&[1.0, 0.0]), emb(&[0.0, 1.0])];

        let detection = detect_faces(&probes, &registry, &EuclideanMatcher);
        assert_eq!(detection, Detection { count: 2, faces: vec![] });
    }

    #[test]
    fn test_detect_faces_exact_match() {
        let mut registry = Registry::new();
        registry.add(emb(&[0.25, 0.75]), "bob").unwrap();

        let detection = detect_faces(&[emb(&[0.25, 0.75])], &registry, &EuclideanMatcher);
        assert_eq!(
            detection,
            Detection {
                count: 1,
                faces: vec![MatchResult { label: "bob".into(), distance: 0.0 }],
            }
        );
    }

    #[test]
    fn test_detect_faces_preserves_probe_order() {
        let mut registry = Registry::new();
        registry.add(emb(&[0.0, 0.0]), "origin").unwrap();
        registry.add(emb(&[10.0, 10.0]), "far").unwrap();

        let probes = [emb(&[9.0, 9.0]), emb(&[1.0, 0.0])];
        let detection = detect_faces(&probes, &registry, &EuclideanMatcher);

        assert_eq!(detection.count, 2);
        let labels: Vec<_> = detection.faces.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["far", "origin"]);
    }

    #[test]
    fn test_detect_faces_no_probes() {
        let mut registry = Registry::new();
        registry.add(emb(&[1.0]), "alice").unwrap();

        let detection = detect_faces(&[], &registry, &EuclideanMatcher);
        assert_eq!(detection, Detection::default());
    }

    #[test]
    fn test_load_labels_by_file_stem() {
        let dir = TempDir::new().unwrap();
        write(&dir, "alice.png", "1,0");
        write(&dir, "bob.JPG", "0,1");
        write(&dir, "notes.txt", "garbage");
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let registry = Registry::load(dir.path(), &mut FakeExtractor, LoadPolicy::Abort).unwrap();

        assert_eq!(registry.labels(), vec!["alice".to_string(), "bob".to_string()]);
        let alice = &registry.entries()[0];
        assert_eq!(alice.label, "alice");
        assert_eq!(alice.embedding.values, vec![1.0, 0.0]);
    }

    #[test]
    fn test_load_aborts_on_multiple_faces() {
        let dir = TempDir::new().unwrap();
        write(&dir, "alice.png", "1,0");
        write(&dir, "group.png", "1,0;0,1");

        let err = Registry::load(dir.path(), &mut FakeExtractor, LoadPolicy::Abort).unwrap_err();
        match err {
            LoadError::Reference { path, source } => {
                assert!(path.ends_with("group.png"));
                assert!(matches!(source, ExtractError::MultipleFaces { count: 2 }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_skip_policy_continues() {
        let dir = TempDir::new().unwrap();
        write(&dir, "alice.png", "1,0");
        write(&dir, "empty.png", "");
        write(&dir, "zed.gif", "0,1");

        let registry = Registry::load(dir.path(), &mut FakeExtractor, LoadPolicy::Skip).unwrap();
        assert_eq!(registry.labels(), vec!["alice".to_string(), "zed".to_string()]);
    }

    #[test]
    fn test_load_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");

        let err = Registry::load(&missing, &mut FakeExtractor, LoadPolicy::Skip).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
