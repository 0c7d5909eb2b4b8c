//! Label class normalization.
//!
//! Scans every `labels/*.txt` file under a root, records the leading class
//! token of each label line into its own JSON log, and on a later confirmed
//! pass rewrites every leading token to a fixed class id. Shares the
//! filesystem convention with the dedup/partition core (whitespace-delimited
//! lines, first token = class id) but has no data dependency on it.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::catalog::{rel_string, LABEL_EXTENSION};
use crate::error::DatacullError;
use crate::progress;

pub const SCAN_LOG: &str = "class_scan_log.json";

/// Persisted result of a class scan.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassScanLog {
    /// Occurrences of each class token across all scanned files.
    pub class_counts: BTreeMap<String, usize>,
    /// Leading class tokens per label file (workspace-relative path).
    pub file_class_map: BTreeMap<String, Vec<String>>,
}

impl ClassScanLog {
    pub fn path_for(root: &Path) -> PathBuf {
        root.join(SCAN_LOG)
    }

    pub fn save(&self, root: &Path) -> Result<PathBuf, DatacullError> {
        let path = Self::path_for(root);
        let json =
            serde_json::to_string_pretty(self).map_err(|source| DatacullError::ScanLogWrite {
                path: path.clone(),
                source,
            })?;
        fs::write(&path, json)?;
        Ok(path)
    }

    pub fn load(root: &Path) -> Result<Self, DatacullError> {
        let path = Self::path_for(root);
        if !path.is_file() {
            return Err(DatacullError::ScanLogNotFound { path });
        }

        let data = fs::read_to_string(&path)?;
        serde_json::from_str(&data).map_err(|source| DatacullError::ScanLogParse { path, source })
    }
}

/// Outcome of a class rewrite pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FixReport {
    pub files: usize,
    pub lines: usize,
    /// Logged files absent at rewrite time (skipped).
    pub missing: usize,
    /// Per-file read/write failures (logged, batch continued).
    pub failed: usize,
}

impl fmt::Display for FixReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Rewrote {} line(s) across {} file(s); {} missing, {} failed.",
            self.lines, self.files, self.missing, self.failed
        )
    }
}

/// Scan all label files under `root` and build the class log.
pub fn scan_classes(root: &Path) -> Result<ClassScanLog, DatacullError> {
    let files = collect_label_files(root)?;
    let mut log = ClassScanLog::default();

    let pb = progress::bar(files.len() as u64, "Scanning label files");
    for path in files {
        pb.inc(1);
        let content = fs::read_to_string(&path)?;

        let mut found = Vec::new();
        for line in content.lines() {
            if let Some(class_id) = line.split_whitespace().next() {
                found.push(class_id.to_string());
                *log.class_counts.entry(class_id.to_string()).or_insert(0) += 1;
            }
        }

        if !found.is_empty() {
            log.file_class_map.insert(rel_string(root, &path), found);
        }
    }
    pb.finish_and_clear();

    Ok(log)
}

/// Rewrite the leading token of every line in every logged file to `class`.
///
/// Only the first token changes; coordinates and spacing-normalized rest of
/// each line are preserved. A logged file that no longer exists is warned
/// about and skipped, and a read or write failing on a single file is logged
/// and counted without aborting the pass. Callers must have satisfied the
/// confirmation gate.
pub fn fix_classes(root: &Path, log: &ClassScanLog, class: &str) -> FixReport {
    let mut report = FixReport::default();

    let pb = progress::bar(log.file_class_map.len() as u64, "Fixing label files");
    for rel in log.file_class_map.keys() {
        pb.inc(1);
        let path = root.join(rel);
        if !path.is_file() {
            report.missing += 1;
            pb.suspend(|| eprintln!("File not found (skipped): {}", path.display()));
            continue;
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                report.failed += 1;
                pb.suspend(|| eprintln!("Error reading {}: {err}", path.display()));
                continue;
            }
        };

        let mut new_lines = Vec::new();
        for line in content.lines() {
            let mut parts: Vec<&str> = line.split_whitespace().collect();
            if parts.is_empty() {
                continue;
            }
            parts[0] = class;
            new_lines.push(parts.join(" "));
        }

        if let Err(err) = fs::write(&path, new_lines.join("\n") + "\n") {
            report.failed += 1;
            pb.suspend(|| eprintln!("Error writing {}: {err}", path.display()));
            continue;
        }
        report.files += 1;
        report.lines += new_lines.len();
    }
    pb.finish_and_clear();

    report
}

/// All `.txt` files under a `labels` path component, recursively.
fn collect_label_files(root: &Path) -> Result<Vec<PathBuf>, DatacullError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|source| DatacullError::WalkFailed {
            path: root.to_path_buf(),
            message: source.to_string(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let is_label = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(LABEL_EXTENSION));
        let under_labels = path
            .components()
            .any(|c| matches!(c, Component::Normal(name) if name == "labels"));

        if is_label && under_labels {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_label(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("label parent")).expect("create parent");
        fs::write(path, content).expect("write label");
    }

    #[test]
    fn scan_counts_leading_tokens_per_file() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_label(
            temp.path(),
            "ds/labels/a.txt",
            "1 0.5 0.5 0.1 0.1\n3 0.2 0.2 0.1 0.1\n",
        );
        write_label(temp.path(), "ds/labels/b.txt", "1 0.9 0.9 0.1 0.1\n");
        // Outside a labels directory: ignored.
        write_label(temp.path(), "ds/notes/c.txt", "9 0 0 0 0\n");

        let log = scan_classes(temp.path()).expect("scan");
        assert_eq!(log.class_counts["1"], 2);
        assert_eq!(log.class_counts["3"], 1);
        assert!(!log.class_counts.contains_key("9"));
        assert_eq!(log.file_class_map["ds/labels/a.txt"], vec!["1", "3"]);
    }

    #[test]
    fn scan_log_round_trips() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_label(temp.path(), "ds/labels/a.txt", "2 0.1 0.1 0.1 0.1\n");

        let log = scan_classes(temp.path()).expect("scan");
        log.save(temp.path()).expect("save log");
        let reloaded = ClassScanLog::load(temp.path()).expect("load log");
        assert_eq!(reloaded, log);
    }

    #[test]
    fn load_without_log_is_a_dedicated_error() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let err = ClassScanLog::load(temp.path()).unwrap_err();
        assert!(matches!(err, DatacullError::ScanLogNotFound { .. }));
    }

    #[test]
    fn fix_rewrites_only_the_leading_token() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_label(
            temp.path(),
            "ds/labels/a.txt",
            "1 0.5 0.5 0.1 0.1\n3 0.2 0.2 0.1 0.1\n",
        );

        let log = scan_classes(temp.path()).expect("scan");
        let report = fix_classes(temp.path(), &log, "0");
        assert_eq!(report.files, 1);
        assert_eq!(report.lines, 2);
        assert_eq!(report.missing, 0);
        assert_eq!(report.failed, 0);

        let fixed = fs::read_to_string(temp.path().join("ds/labels/a.txt")).expect("read");
        assert_eq!(fixed, "0 0.5 0.5 0.1 0.1\n0 0.2 0.2 0.1 0.1\n");
    }

    #[test]
    fn fix_skips_files_deleted_since_the_scan() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_label(temp.path(), "ds/labels/a.txt", "1 0.5 0.5 0.1 0.1\n");

        let log = scan_classes(temp.path()).expect("scan");
        fs::remove_file(temp.path().join("ds/labels/a.txt")).expect("remove");

        let report = fix_classes(temp.path(), &log, "0");
        assert_eq!(report.files, 0);
        assert_eq!(report.missing, 1);
    }

    #[test]
    fn fix_logs_an_unreadable_file_and_continues() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_label(temp.path(), "ds/labels/good.txt", "1 0.5 0.5 0.1 0.1\n");
        write_label(temp.path(), "ds/labels/mangled.txt", "2 0.1 0.1 0.1 0.1\n");

        let log = scan_classes(temp.path()).expect("scan");

        // Corrupt one logged file so its read fails mid-pass.
        fs::write(temp.path().join("ds/labels/mangled.txt"), [0xff, 0xfe, 0xfd])
            .expect("write invalid utf-8");

        let report = fix_classes(temp.path(), &log, "0");
        assert_eq!(report.failed, 1);
        assert_eq!(report.files, 1);

        let fixed = fs::read_to_string(temp.path().join("ds/labels/good.txt")).expect("read");
        assert_eq!(fixed, "0 0.5 0.5 0.1 0.1\n");
    }
}
