//! Match manifest persistence and manifest-scoped deletion.
//!
//! The manifest is the only state that survives a process exit: a JSON
//! object mapping dataset name to the matched `{image, label}` pairs, written
//! as `log_<base>.json` at the workspace root. Stored paths are
//! workspace-relative with forward slashes so the log stays portable within
//! the same root.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DatacullError;
use crate::progress;

/// One matched sample: workspace-relative image and derived label path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchEntry {
    pub image: String,
    pub label: String,
}

/// Persistent record of cross-dataset duplicate matches, keyed by dataset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchManifest {
    pub datasets: BTreeMap<String, Vec<MatchEntry>>,
}

impl MatchManifest {
    /// The manifest file path for a base dataset, at the workspace root.
    pub fn path_for(root: &Path, base: &str) -> PathBuf {
        root.join(format!("log_{base}.json"))
    }

    /// Write the manifest with stable indentation.
    pub fn save(&self, root: &Path, base: &str) -> Result<PathBuf, DatacullError> {
        let path = Self::path_for(root, base);
        let json = serde_json::to_string_pretty(self).map_err(|source| {
            DatacullError::ManifestWrite {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, json)?;
        Ok(path)
    }

    /// Reload a previously saved manifest.
    ///
    /// A missing file is a recoverable condition for the caller: it signals
    /// "no log yet, do not proceed to deletion".
    pub fn load(root: &Path, base: &str) -> Result<Self, DatacullError> {
        let path = Self::path_for(root, base);
        if !path.is_file() {
            return Err(DatacullError::ManifestNotFound { path });
        }

        let data = fs::read_to_string(&path)?;
        serde_json::from_str(&data).map_err(|source| DatacullError::ManifestParse { path, source })
    }

    /// Total number of files (images + labels) across the given datasets.
    pub fn file_count(&self, targets: &[String]) -> usize {
        targets
            .iter()
            .filter_map(|name| self.datasets.get(name))
            .map(|entries| entries.len() * 2)
            .sum()
    }
}

/// Which manifest slots a deletion run covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteScope {
    /// Every dataset in the manifest except the base.
    AllExceptBase,
    /// Only the base dataset's own matched files.
    BaseOnly,
    /// An explicit subset of dataset names.
    Datasets(Vec<String>),
}

/// Resolve a scope to concrete dataset names, validated against the manifest.
pub fn resolve_delete_targets(
    manifest: &MatchManifest,
    base: &str,
    scope: &DeleteScope,
) -> Result<Vec<String>, DatacullError> {
    match scope {
        DeleteScope::AllExceptBase => Ok(manifest
            .datasets
            .keys()
            .filter(|name| name.as_str() != base)
            .cloned()
            .collect()),
        DeleteScope::BaseOnly => {
            if !manifest.datasets.contains_key(base) {
                return Err(DatacullError::InvalidSelection(format!(
                    "base dataset '{base}' has no manifest slot"
                )));
            }
            Ok(vec![base.to_string()])
        }
        DeleteScope::Datasets(names) => {
            if names.is_empty() {
                return Err(DatacullError::InvalidSelection(
                    "no datasets selected".to_string(),
                ));
            }
            for name in names {
                if !manifest.datasets.contains_key(name) {
                    return Err(DatacullError::InvalidSelection(format!(
                        "dataset '{name}' is not in the manifest"
                    )));
                }
            }
            Ok(names.clone())
        }
    }
}

/// Outcome of one deletion run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    /// Files the run would touch (images + labels in scope).
    pub planned: usize,
    pub deleted: usize,
    /// Files already absent at delete time (logged skips).
    pub missing: usize,
    /// Per-file removal failures (logged, batch continues).
    pub failed: usize,
}

impl fmt::Display for DeleteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Deletion summary:")?;
        writeln!(f, "  planned: {} file(s)", self.planned)?;
        writeln!(f, "  deleted: {}", self.deleted)?;
        writeln!(f, "  missing (skipped): {}", self.missing)?;
        writeln!(f, "  failed: {}", self.failed)
    }
}

/// Delete every matched file of the target datasets, best effort.
///
/// With `dry_run` the delete set is computed and listed but nothing is
/// touched. A missing file or a failed removal is reported per path and
/// never aborts the batch. Callers must have satisfied the confirmation
/// gate before invoking this without `dry_run`.
pub fn delete_matches(
    root: &Path,
    manifest: &MatchManifest,
    targets: &[String],
    dry_run: bool,
) -> DeleteReport {
    let mut report = DeleteReport::default();
    let total = manifest.file_count(targets) as u64;
    let pb = progress::bar(total, if dry_run { "Listing files" } else { "Deleting files" });

    for name in targets {
        let Some(entries) = manifest.datasets.get(name) else {
            continue;
        };

        for entry in entries {
            for rel in [entry.image.as_str(), entry.label.as_str()] {
                pb.inc(1);
                report.planned += 1;
                let path = root.join(rel);

                if dry_run {
                    pb.suspend(|| println!("would delete: {rel}"));
                    continue;
                }

                if !path.exists() {
                    report.missing += 1;
                    pb.suspend(|| eprintln!("File not found (skipped): {}", path.display()));
                    continue;
                }

                match fs::remove_file(&path) {
                    Ok(()) => report.deleted += 1,
                    Err(err) => {
                        report.failed += 1;
                        pb.suspend(|| {
                            eprintln!("Error deleting {}: {err}", path.display());
                        });
                    }
                }
            }
        }
    }

    pb.finish_and_clear();
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(image: &str, label: &str) -> MatchEntry {
        MatchEntry {
            image: image.to_string(),
            label: label.to_string(),
        }
    }

    fn sample_manifest() -> MatchManifest {
        let mut datasets = BTreeMap::new();
        datasets.insert(
            "base".to_string(),
            vec![entry("base/images/a.jpg", "base/labels/a.txt")],
        );
        datasets.insert(
            "other".to_string(),
            vec![
                entry("other/images/a1.jpg", "other/labels/a1.txt"),
                entry("other/images/a2.jpg", "other/labels/a2.txt"),
            ],
        );
        datasets.insert("clean".to_string(), Vec::new());
        MatchManifest { datasets }
    }

    #[test]
    fn save_load_round_trip_preserves_mapping() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let manifest = sample_manifest();

        let path = manifest.save(temp.path(), "base").expect("save manifest");
        assert_eq!(path, temp.path().join("log_base.json"));

        let reloaded = MatchManifest::load(temp.path(), "base").expect("load manifest");
        assert_eq!(reloaded, manifest);
    }

    #[test]
    fn load_without_a_log_is_a_dedicated_error() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let err = MatchManifest::load(temp.path(), "base").unwrap_err();
        assert!(matches!(err, DatacullError::ManifestNotFound { .. }));
    }

    #[test]
    fn scope_all_excludes_base() {
        let manifest = sample_manifest();
        let targets = resolve_delete_targets(&manifest, "base", &DeleteScope::AllExceptBase)
            .expect("resolve targets");
        assert_eq!(targets, vec!["clean", "other"]);
    }

    #[test]
    fn scope_subset_rejects_unknown_names() {
        let manifest = sample_manifest();
        let err = resolve_delete_targets(
            &manifest,
            "base",
            &DeleteScope::Datasets(vec!["ghost".to_string()]),
        )
        .unwrap_err();
        assert!(matches!(err, DatacullError::InvalidSelection(_)));
    }

    #[test]
    fn deleting_missing_files_skips_without_failing() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let manifest = sample_manifest();

        // Nothing exists on disk; every file is a logged skip.
        let report = delete_matches(temp.path(), &manifest, &["other".to_string()], false);
        assert_eq!(report.planned, 4);
        assert_eq!(report.deleted, 0);
        assert_eq!(report.missing, 4);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn delete_removes_both_image_and_label() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(temp.path().join("other/images")).expect("create images");
        fs::create_dir_all(temp.path().join("other/labels")).expect("create labels");
        fs::write(temp.path().join("other/images/a1.jpg"), b"x").expect("write image");
        fs::write(temp.path().join("other/labels/a1.txt"), b"0 1 2 3 4").expect("write label");

        let manifest = sample_manifest();
        let report = delete_matches(temp.path(), &manifest, &["other".to_string()], false);

        assert_eq!(report.deleted, 2);
        assert_eq!(report.missing, 2); // a2 pair never existed
        assert!(!temp.path().join("other/images/a1.jpg").exists());
        assert!(!temp.path().join("other/labels/a1.txt").exists());
    }

    #[test]
    fn dry_run_touches_nothing() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(temp.path().join("other/images")).expect("create images");
        fs::create_dir_all(temp.path().join("other/labels")).expect("create labels");
        fs::write(temp.path().join("other/images/a1.jpg"), b"x").expect("write image");
        fs::write(temp.path().join("other/labels/a1.txt"), b"0 1 2 3 4").expect("write label");

        let manifest = sample_manifest();
        let report = delete_matches(temp.path(), &manifest, &["other".to_string()], true);

        assert_eq!(report.planned, 4);
        assert_eq!(report.deleted, 0);
        assert!(temp.path().join("other/images/a1.jpg").exists());
        assert!(temp.path().join("other/labels/a1.txt").exists());
    }
}
