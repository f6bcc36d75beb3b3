//! Writing selected slices back to disk as nifti files.

use anyhow::{anyhow, Context, Result};
use nifti::writer::WriterOptions;
use nifti::NiftiHeader;
use std::fs;
use std::path::{Path, PathBuf};
extern crate nalgebra as na;
use na::Matrix4;

use crate::common::{Key, SampleData, Volume};

/// Where the output of `key` for the volume at `source` goes:
/// `<output_path>/<key>/<source file name>`.
pub fn output_file(output_path: &Path, key: Key, source: &Path) -> Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| anyhow!("could not parse file name of {}", source.display()))?;
    Ok(output_path.join(key.as_str()).join(name))
}

/// Header for slices that no longer map back to scanner space.
fn identity_header() -> NiftiHeader {
    let mut header = NiftiHeader::default();
    header.set_affine(&Matrix4::<f64>::identity());
    header
}

/// Saves `volume` to `path` as a nifti file with an identity affine.
///
/// Parent directories are created as needed and any existing file at `path`
/// is replaced. A `.gz` extension gets a compressed file.
///
/// # Arguments
///
/// * `volume` - The slice to save, channel axis first.
/// * `path` - The output file, typically from `output_file`.
///
/// # Returns
///
/// `Ok(())` once the file is written, or the I/O or nifti error with `path`
/// attached.
pub fn save_slice(volume: &Volume, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("could not create {}", parent.display()))?;
    }
    let header = identity_header();
    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(volume)
        .with_context(|| format!("could not write {}", path.display()))?;
    Ok(())
}

/// Saves every key of `data` under `output_path` and returns the written
/// files in [`Key::ALL`] order.
pub fn save_sample(data: &SampleData, output_path: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(Key::ALL.len());
    for key in Key::ALL {
        let path = output_file(output_path, key, data.source(key))?;
        save_slice(data.get(key), &path)?;
        written.push(path);
    }
    Ok(written)
}
