//! Workspace discovery for image/label dataset folders.
//!
//! A dataset is any direct child of the workspace root that contains both an
//! `images/` and a `labels/` subdirectory. Label paths are always derived
//! from image paths, never discovered independently.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::DatacullError;

pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
pub const LABEL_EXTENSION: &str = "txt";

/// Return the names of all dataset folders directly under `root`, sorted.
///
/// Membership is a one-level test: the folder must contain `images/` and
/// `labels/` children. No recursion into grandchildren.
pub fn find_datasets(root: &Path) -> Result<Vec<String>, DatacullError> {
    let mut datasets = Vec::new();

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        if path.join("images").is_dir() && path.join("labels").is_dir() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                datasets.push(name.to_string());
            }
        }
    }

    datasets.sort();
    Ok(datasets)
}

/// Count image files under an `images/` directory, recursively.
///
/// Extension matching is case-insensitive, so `photo.JPG` counts.
pub fn count_images(images_dir: &Path) -> Result<usize, DatacullError> {
    Ok(collect_images(images_dir)?.len())
}

/// Recursively collect every image file under `images_dir`, sorted by path.
pub fn collect_images(images_dir: &Path) -> Result<Vec<PathBuf>, DatacullError> {
    let mut files = Vec::new();

    // Symlinks are not followed, so a link cycle under images/ cannot
    // turn the walk into an error.
    for entry in WalkDir::new(images_dir) {
        let entry = entry.map_err(|source| DatacullError::WalkFailed {
            path: images_dir.to_path_buf(),
            message: source.to_string(),
        })?;

        if entry.file_type().is_file() && is_image_file(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// True if the path carries one of the supported image extensions.
pub fn is_image_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    IMAGE_EXTENSIONS
        .iter()
        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
}

/// Derive the label path for an image at `images/<rel>` inside `dataset_dir`.
///
/// The label lives at `labels/<rel>` with a `.txt` extension, mirroring any
/// subdirectories under `images/`.
pub fn label_for_image(dataset_dir: &Path, image_rel: &Path) -> PathBuf {
    dataset_dir
        .join("labels")
        .join(image_rel.with_extension(LABEL_EXTENSION))
}

/// Workspace-relative path string with forward slashes, for portable logs.
pub fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_dataset(root: &Path, name: &str) {
        fs::create_dir_all(root.join(name).join("images")).expect("create images dir");
        fs::create_dir_all(root.join(name).join("labels")).expect("create labels dir");
    }

    #[test]
    fn find_datasets_requires_both_children() {
        let temp = tempfile::tempdir().expect("create temp dir");
        make_dataset(temp.path(), "full");
        fs::create_dir_all(temp.path().join("images_only/images")).expect("create dir");
        fs::create_dir_all(temp.path().join("labels_only/labels")).expect("create dir");
        fs::write(temp.path().join("stray.txt"), b"not a dataset").expect("write file");

        let found = find_datasets(temp.path()).expect("discover datasets");
        assert_eq!(found, vec!["full"]);
    }

    #[test]
    fn find_datasets_returns_sorted_names() {
        let temp = tempfile::tempdir().expect("create temp dir");
        make_dataset(temp.path(), "zulu");
        make_dataset(temp.path(), "alpha");
        make_dataset(temp.path(), "mike");

        let found = find_datasets(temp.path()).expect("discover datasets");
        assert_eq!(found, vec!["alpha", "mike", "zulu"]);
    }

    #[test]
    fn count_images_is_recursive_and_case_insensitive() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let images = temp.path().join("images");
        fs::create_dir_all(images.join("sub")).expect("create nested dir");

        fs::write(images.join("a.jpg"), b"x").expect("write");
        fs::write(images.join("b.JPEG"), b"x").expect("write");
        fs::write(images.join("sub/c.PNG"), b"x").expect("write");
        fs::write(images.join("notes.txt"), b"x").expect("write");
        fs::write(images.join("d.gif"), b"x").expect("write");

        assert_eq!(count_images(&images).expect("count"), 3);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycles_do_not_break_collection() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let images = temp.path().join("images");
        fs::create_dir_all(&images).expect("create images dir");
        fs::write(images.join("a.jpg"), b"x").expect("write image");

        // A link back to its own parent would loop forever if followed.
        std::os::unix::fs::symlink(&images, images.join("loop")).expect("create symlink");

        assert_eq!(count_images(&images).expect("count"), 1);
    }

    #[test]
    fn label_derivation_mirrors_image_subtree() {
        let dataset = Path::new("richard1");
        assert_eq!(
            label_for_image(dataset, Path::new("frame_0001.jpg")),
            Path::new("richard1/labels/frame_0001.txt")
        );
        assert_eq!(
            label_for_image(dataset, Path::new("batch2/frame_0002.PNG")),
            Path::new("richard1/labels/batch2/frame_0002.txt")
        );
    }
}
