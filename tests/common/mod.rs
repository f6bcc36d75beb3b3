//! Fixture builders shared by the integration tests.

use ndarray::{Array3, Array4, ArrayD, Axis};
use nifti::writer::WriterOptions;
use std::fs;
use std::path::Path;

/// Write `data` as a nifti file, creating parent directories.
pub fn write_volume(path: &Path, data: &ArrayD<f32>) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    WriterOptions::new(path).write_nifti(data).unwrap();
}

/// A (4, 4, n) label with `counts[z]` positive voxels in slice `z`.
pub fn label_volume(counts: &[usize]) -> ArrayD<f32> {
    let mut label = Array3::<f32>::zeros((4, 4, counts.len()));
    for (z, &count) in counts.iter().enumerate() {
        for v in label.index_axis_mut(Axis(2), z).iter_mut().take(count) {
            *v = 1.0;
        }
    }
    label.into_dyn()
}

/// A channel-last (4, 4, n, channels) image where every voxel of slice `z`
/// holds `z * 10 + channel`.
pub fn image_volume(depth: usize, channels: usize) -> ArrayD<f32> {
    let mut image = Array4::<f32>::zeros((4, 4, depth, channels));
    for ((_, _, z, c), v) in image.indexed_iter_mut() {
        *v = (z * 10 + c) as f32;
    }
    image.into_dyn()
}

/// Lays out `imagesTr/` and `labelsTr/` under `data_dir`, one case per entry
/// of `label_counts`, named `case_000.nii.gz`, `case_001.nii.gz`, ...
pub fn write_dataset(data_dir: &Path, label_counts: &[&[usize]], channels: usize) {
    for (i, counts) in label_counts.iter().enumerate() {
        let name = format!("case_{:03}.nii.gz", i);
        write_volume(
            &data_dir.join("imagesTr").join(&name),
            &image_volume(counts.len(), channels),
        );
        write_volume(&data_dir.join("labelsTr").join(&name), &label_volume(counts));
    }
}

/// Sorted file names directly inside `dir`.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
