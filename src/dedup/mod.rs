//! Cross-dataset duplicate resolution by filename prefix.
//!
//! Two images are considered duplicates when the first `prefix_len`
//! characters of their filenames match. This is a naming-convention
//! heuristic, not content hashing: distinct images sharing a long filename
//! prefix are indistinguishable here.

pub mod manifest;
pub mod report;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::catalog::{self, label_for_image, rel_string};
use crate::error::DatacullError;
use crate::progress;

pub use manifest::{DeleteReport, DeleteScope, MatchEntry, MatchManifest};
pub use report::MatchReport;

pub const DEFAULT_PREFIX_LEN: usize = 20;

/// Extract the duplicate key for a filename.
///
/// Character-based, so `prefix.chars().count() == min(len, filename chars)`
/// and a multibyte filename can never be split inside a scalar value.
pub fn filename_prefix(name: &str, len: usize) -> String {
    name.chars().take(len).collect()
}

/// Prefix index over one dataset's `images/` tree.
///
/// Maps each prefix to every image (as a path relative to `images/`) that
/// shares it, so a colliding prefix can report *all* matching base files.
#[derive(Debug, Default)]
pub struct PrefixIndex {
    by_prefix: HashMap<String, Vec<String>>,
}

impl PrefixIndex {
    /// Build the index by walking `images_dir` recursively.
    pub fn build(images_dir: &Path, prefix_len: usize) -> Result<Self, DatacullError> {
        let mut by_prefix: HashMap<String, Vec<String>> = HashMap::new();

        for image in catalog::collect_images(images_dir)? {
            let Some(name) = image.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let rel = rel_string(images_dir, &image);
            by_prefix
                .entry(filename_prefix(name, prefix_len))
                .or_default()
                .push(rel);
        }

        Ok(Self { by_prefix })
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.by_prefix.contains_key(prefix)
    }

    /// All image paths (relative to `images/`) sharing `prefix`.
    pub fn files_for(&self, prefix: &str) -> &[String] {
        self.by_prefix.get(prefix).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_prefix.is_empty()
    }
}

/// Scan every non-base dataset for images whose filename prefix also occurs
/// in the base dataset, recording both sides of each collision.
///
/// Every scanned dataset gets a manifest slot, even with zero matches, so
/// downstream deletion treats all datasets uniformly. The base dataset's
/// entries are de-duplicated by `(image, label)` in first-seen order.
pub fn resolve_duplicates(
    root: &Path,
    datasets: &[String],
    base: &str,
    prefix_len: usize,
) -> Result<(MatchManifest, MatchReport), DatacullError> {
    if !datasets.iter().any(|d| d == base) {
        return Err(DatacullError::UnknownDataset {
            name: base.to_string(),
        });
    }

    let base_index = PrefixIndex::build(&root.join(base).join("images"), prefix_len)?;

    let mut slots: BTreeMap<String, Vec<MatchEntry>> = datasets
        .iter()
        .map(|name| (name.clone(), Vec::new()))
        .collect();

    let mut per_dataset: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_matches = 0usize;

    let pb = progress::bar(datasets.len() as u64, "Scanning datasets");
    for dataset in datasets {
        pb.inc(1);
        if dataset == base {
            continue;
        }

        let images_dir = root.join(dataset).join("images");
        let mut matched_here = 0usize;

        for image in catalog::collect_images(&images_dir)? {
            let Some(name) = image.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let prefix = filename_prefix(name, prefix_len);
            if !base_index.contains(&prefix) {
                continue;
            }

            let image_rel = rel_string(&images_dir, &image);
            if let Some(slot) = slots.get_mut(dataset) {
                slot.push(entry_for(dataset, &image_rel));
            }

            // One foreign match fans out to every base file sharing the prefix.
            for base_rel in base_index.files_for(&prefix) {
                if let Some(slot) = slots.get_mut(base) {
                    slot.push(entry_for(base, base_rel));
                }
            }

            matched_here += 1;
            total_matches += 1;
        }

        per_dataset.insert(dataset.clone(), matched_here);
    }
    pb.finish_and_clear();

    if let Some(base_entries) = slots.get_mut(base) {
        dedup_entries(base_entries);
    }
    let base_matches = slots.get(base).map(Vec::len).unwrap_or(0);

    let manifest = MatchManifest { datasets: slots };
    let report = MatchReport {
        base: base.to_string(),
        prefix_len,
        per_dataset,
        base_matches,
        total_matches,
    };

    Ok((manifest, report))
}

fn entry_for(dataset: &str, image_rel: &str) -> MatchEntry {
    let label = label_for_image(Path::new(dataset), Path::new(image_rel));

    MatchEntry {
        image: format!("{dataset}/images/{image_rel}"),
        label: label.to_string_lossy().replace('\\', "/"),
    }
}

fn dedup_entries(entries: &mut Vec<MatchEntry>) {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    entries.retain(|entry| seen.insert((entry.image.clone(), entry.label.clone())));
}
