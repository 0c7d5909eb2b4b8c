//! Ratio-cascaded train/val/test partitioning.
//!
//! The split is carried out in two stages over disjoint folder pools, so the
//! test partition is unseen by construction rather than by post-hoc
//! filtering. The 7:2 train:val split is re-normalized to sum to 1 on its
//! own (7/9 and 2/9), and the test partition is sized at ~1/9 of the train
//! pool, which restores the global 7:2:1 ratio.

pub mod report;

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::catalog::{self, rel_string};
use crate::error::DatacullError;
use crate::progress;

pub use report::SplitReport;

pub const OUTPUT_DIR: &str = "Finaldata";

pub const TRAIN_FRACTION: f64 = 0.7778;
pub const VAL_FRACTION: f64 = 0.2222;
pub const TEST_FRACTION: f64 = 0.1111;

/// Immutable numeric plan for one partition run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PartitionPlan {
    pub train_pool: usize,
    pub test_pool: usize,
    /// Test images required to hold the global 7:2:1 ratio.
    pub wish_test: usize,
    pub train_fraction: f64,
    pub val_fraction: f64,
}

impl PartitionPlan {
    /// Derive the plan from raw pool sizes.
    ///
    /// Fails fast when the test pool cannot cover the wish-test demand; no
    /// copying may begin after this error.
    pub fn new(train_pool: usize, test_pool: usize) -> Result<Self, DatacullError> {
        let wish_test = (train_pool as f64 * TEST_FRACTION) as usize;
        if wish_test > test_pool {
            return Err(DatacullError::TestPoolTooSmall {
                required: wish_test,
                available: test_pool,
            });
        }

        Ok(Self {
            train_pool,
            test_pool,
            wish_test,
            train_fraction: TRAIN_FRACTION,
            val_fraction: VAL_FRACTION,
        })
    }
}

/// Count images across a pool of dataset folders.
///
/// Applies the same membership test as the copy stage: a folder missing
/// `images/` or `labels/` is warned about and counted as zero, so planned
/// pool sizes always equal what the executor will actually gather.
pub fn pool_size(root: &Path, folders: &[String]) -> Result<usize, DatacullError> {
    let mut total = 0;
    for folder in folders {
        let folder_dir = root.join(folder);
        let images_dir = folder_dir.join("images");
        if !images_dir.is_dir() || !folder_dir.join("labels").is_dir() {
            eprintln!("Warning: skipping folder '{folder}' due to missing images/ or labels/");
            continue;
        }
        total += catalog::count_images(&images_dir)?;
    }
    Ok(total)
}

/// Plan a partition for the given train/test folder pools.
pub fn plan_partition(
    root: &Path,
    train_folders: &[String],
    test_folders: &[String],
) -> Result<PartitionPlan, DatacullError> {
    let train_pool = pool_size(root, train_folders)?;
    let test_pool = pool_size(root, test_folders)?;
    PartitionPlan::new(train_pool, test_pool)
}

/// Materialize a plan into the `Finaldata` output tree.
///
/// Copies, never moves. Re-running onto an existing output tree unions old
/// and new copies; callers needing reproducible output must clear it first.
/// `seed` makes the shuffles deterministic for testing; production runs
/// leave it unset.
pub fn execute_split(
    root: &Path,
    train_folders: &[String],
    test_folders: &[String],
    plan: &PartitionPlan,
    seed: Option<u64>,
) -> Result<SplitReport, DatacullError> {
    let out = root.join(OUTPUT_DIR);

    let mut pairs = gather_pairs(root, train_folders)?;
    shuffle(&mut pairs, seed);

    let train_count = (pairs.len() as f64 * plan.train_fraction) as usize;
    let val_pairs = pairs.split_off(train_count);
    let train_pairs = pairs;

    let (train, train_failed) = copy_pairs(&train_pairs, &out, "train", "Copying train")?;
    let (val, val_failed) = copy_pairs(&val_pairs, &out, "val", "Copying val")?;

    let mut test_pairs = gather_pairs(root, test_folders)?;
    shuffle(&mut test_pairs, seed);
    test_pairs.truncate(plan.wish_test.min(test_pairs.len()));
    let (test, test_failed) = copy_pairs(&test_pairs, &out, "test", "Copying test")?;

    Ok(SplitReport {
        train,
        val,
        test,
        total: train + val + test,
        failed: train_failed + val_failed + test_failed,
    })
}

/// One image with its derived label path, both absolute.
type SamplePair = (PathBuf, PathBuf);

/// Flatten every (image, label) pair across the pool's folders.
///
/// A folder missing `images/` or `labels/` is warned about and skipped.
fn gather_pairs(root: &Path, folders: &[String]) -> Result<Vec<SamplePair>, DatacullError> {
    let mut pairs = Vec::new();

    for folder in folders {
        let folder_dir = root.join(folder);
        let images_dir = folder_dir.join("images");
        let labels_dir = folder_dir.join("labels");
        if !images_dir.is_dir() || !labels_dir.is_dir() {
            eprintln!("Warning: skipping folder '{folder}' due to missing images/ or labels/");
            continue;
        }

        for image in catalog::collect_images(&images_dir)? {
            let rel = rel_string(&images_dir, &image);
            let label = catalog::label_for_image(&folder_dir, Path::new(&rel));
            pairs.push((image, label));
        }
    }

    Ok(pairs)
}

fn shuffle(pairs: &mut [SamplePair], seed: Option<u64>) {
    if let Some(seed) = seed {
        let mut rng = StdRng::seed_from_u64(seed);
        pairs.shuffle(&mut rng);
    } else {
        let mut rng = rand::rng();
        pairs.shuffle(&mut rng);
    }
}

/// Copy each pair into `<out>/images/<split>` and `<out>/labels/<split>`.
///
/// Original filenames are preserved. A pair whose label file is absent still
/// has its image copied, with a warning. A copy failing on a single file is
/// logged with the offending path and counted; the batch continues. Returns
/// `(assigned, failed)`: how many pairs this partition received and how many
/// individual file copies failed.
fn copy_pairs(
    pairs: &[SamplePair],
    out: &Path,
    split: &str,
    desc: &'static str,
) -> Result<(usize, usize), DatacullError> {
    let images_dest = out.join("images").join(split);
    let labels_dest = out.join("labels").join(split);
    fs::create_dir_all(&images_dest)?;
    fs::create_dir_all(&labels_dest)?;

    let mut failed = 0;
    let pb = progress::bar(pairs.len() as u64, desc);
    for (image, label) in pairs {
        pb.inc(1);

        let Some(image_name) = image.file_name() else {
            continue;
        };
        if let Err(err) = fs::copy(image, images_dest.join(image_name)) {
            failed += 1;
            pb.suspend(|| eprintln!("Error copying {}: {err}", image.display()));
            continue;
        }

        if label.is_file() {
            if let Some(label_name) = label.file_name() {
                if let Err(err) = fs::copy(label, labels_dest.join(label_name)) {
                    failed += 1;
                    pb.suspend(|| eprintln!("Error copying {}: {err}", label.display()));
                }
            }
        } else {
            pb.suspend(|| eprintln!("Missing label for {}", image.display()));
        }
    }
    pb.finish_and_clear();

    Ok((pairs.len(), failed))
}
