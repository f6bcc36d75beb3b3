//! Runs the slice extraction over every sample of a dataset.
//!
//! Samples whose image and label outputs both exist are skipped without being
//! read, which lets an interrupted run pick up where it stopped. A sample with
//! only one of its outputs present is processed again and both files are
//! rewritten. The first failing sample ends the run.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::fs;
use std::path::Path;

use crate::common::{Key, Sample};
use crate::save::{output_file, save_sample};
use crate::transforms::{load_sample, max_label_slice_chain, Transform};

/// How many samples a run wrote and how many it found already done.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
}

/// True when both outputs of `sample` already exist under `output_path`.
pub fn is_processed(sample: &Sample, output_path: &Path) -> Result<bool> {
    for key in Key::ALL {
        if !output_file(output_path, key, sample.path(key))?.exists() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Loads `sample`, runs it through `chain` and saves the result.
pub fn process_sample(sample: &Sample, output_path: &Path, chain: &dyn Transform) -> Result<()> {
    let data = load_sample(sample)?;
    let data = chain
        .apply(data)
        .with_context(|| format!("failed to slice {}", sample.image.display()))?;
    save_sample(&data, output_path)?;
    Ok(())
}

/// Extracts the most labelled slice of every sample into `output_path`.
///
/// The `image/` and `label/` subdirectories are created first, even when
/// `samples` is empty. Samples whose outputs both exist are skipped unread.
///
/// # Arguments
///
/// * `samples` - The image/label pairs to process, in order.
/// * `output_path` - Directory that receives the `image/` and `label/` slices.
///
/// # Returns
///
/// A `RunSummary` with the number of samples written and skipped. The first
/// sample that fails to load, slice or save ends the run with its error.
pub fn run(samples: &[Sample], output_path: &Path) -> Result<RunSummary> {
    for key in Key::ALL {
        let dir = output_path.join(key.as_str());
        fs::create_dir_all(&dir).with_context(|| format!("could not create {}", dir.display()))?;
    }

    let mut summary = RunSummary::default();
    if samples.is_empty() {
        warn!("No samples to process");
        return Ok(summary);
    }

    let chain = max_label_slice_chain();
    let pb = ProgressBar::new(samples.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.green}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    for sample in samples {
        if is_processed(sample, output_path)? {
            pb.suspend(|| debug!("Skipping {}, already processed", sample.image.display()));
            summary.skipped += 1;
        } else {
            // the chain logs too, keep the bar off the terminal meanwhile
            pb.suspend(|| {
                debug!("Processing {}", sample.image.display());
                process_sample(sample, output_path, &chain)
            })?;
            summary.processed += 1;
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        "Processed {} samples, skipped {} already in {}",
        summary.processed,
        summary.skipped,
        output_path.display()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(name: &str) -> Sample {
        Sample::new(
            Path::new("imagesTr").join(name),
            Path::new("labelsTr").join(name),
        )
    }

    #[test]
    fn processed_only_when_both_outputs_exist() {
        let dir = tempdir().unwrap();
        let sample = sample("a.nii.gz");
        assert!(!is_processed(&sample, dir.path()).unwrap());

        fs::create_dir_all(dir.path().join("image")).unwrap();
        fs::write(dir.path().join("image/a.nii.gz"), b"").unwrap();
        assert!(!is_processed(&sample, dir.path()).unwrap());

        fs::create_dir_all(dir.path().join("label")).unwrap();
        fs::write(dir.path().join("label/a.nii.gz"), b"").unwrap();
        assert!(is_processed(&sample, dir.path()).unwrap());
    }

    #[test]
    fn empty_run_still_creates_key_dirs() {
        let dir = tempdir().unwrap();
        let summary = run(&[], dir.path()).unwrap();
        assert_eq!(summary, RunSummary::default());
        assert!(dir.path().join("image").is_dir());
        assert!(dir.path().join("label").is_dir());
    }

    #[test]
    fn missing_source_aborts_run() {
        let dir = tempdir().unwrap();
        let missing = sample("missing.nii.gz");
        assert!(run(&[missing], dir.path()).is_err());
    }
}
